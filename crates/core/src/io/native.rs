//! Native GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Georeferencing uses ModelPixelScaleTag + ModelTiepointTag; the nodata
//! sentinel uses the GDAL_NODATA ASCII tag. The CRS travels as an EPSG code
//! in the GeoKey directory (GeographicTypeGeoKey or ProjectedCSTypeGeoKey).

use crate::error::{Error, Result};
use crate::crs::CRS;
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{ColorType, Gray32Float, Gray64Float, Gray8};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

// GeoKey IDs and values
const GT_MODEL_TYPE: u16 = 1024;
const GT_RASTER_TYPE: u16 = 1025;
const GEOGRAPHIC_TYPE: u16 = 2048;
const PROJECTED_CS_TYPE: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Sample layout used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleType {
    /// `u8` as 8-bit, `f32` as f32, everything else as f64
    #[default]
    Auto,
    Float32,
    Float64,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub sample_type: SampleType,
}

/// Read the first band of a GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(file)
}

/// Read a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    decode_geotiff(Cursor::new(data))
}

fn cast_all<S, T>(buf: Vec<S>) -> Vec<T>
where
    S: num_traits::NumCast + Copy,
    T: RasterElement,
{
    buf.into_iter()
        .map(|v| num_traits::cast(v).unwrap_or_else(T::zero))
        .collect()
}

fn decode_geotiff<T, R>(reader: R) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder =
        Decoder::new(reader).map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;
    let rows = height as usize;
    let cols = width as usize;

    let image = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let data: Vec<T> = match image {
        DecodingResult::U8(buf) => cast_all(buf),
        DecodingResult::U16(buf) => cast_all(buf),
        DecodingResult::U32(buf) => cast_all(buf),
        DecodingResult::U64(buf) => cast_all(buf),
        DecodingResult::I8(buf) => cast_all(buf),
        DecodingResult::I16(buf) => cast_all(buf),
        DecodingResult::I32(buf) => cast_all(buf),
        DecodingResult::I64(buf) => cast_all(buf),
        DecodingResult::F32(buf) => cast_all(buf),
        DecodingResult::F64(buf) => cast_all(buf),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    // Multi-band files decode interleaved; only single-band input is supported.
    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    raster.set_nodata(read_nodata(&mut decoder));
    raster.set_crs(read_crs(&mut decoder));

    Ok(raster)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    let value: f64 = text.trim_matches(char::from(0)).trim().parse().ok()?;
    T::from_f64(value)
}

/// EPSG code from the GeoKey directory: header `[1, 1, 0, count]` followed by
/// `count` entries of `[key, location, count, value]`. Only inline SHORT
/// values (location 0) can hold a code.
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u16_vec(Tag::GeoKeyDirectoryTag).ok()?;
    let count = usize::from(*keys.get(3)?);
    keys.get(4..)?
        .chunks_exact(4)
        .take(count)
        .find(|entry| {
            matches!(entry[0], GEOGRAPHIC_TYPE | PROJECTED_CS_TYPE)
                && entry[1] == 0
                && entry[3] != USER_DEFINED
        })
        .map(|entry| CRS::from_epsg(u32::from(entry[3])))
}

/// GeoKey directory for `crs`; keys must be sorted by ID
fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs.and_then(|c| u16::try_from(c.epsg()).ok().map(|code| (c, code)));
    let model_type = match code {
        Some((crs, _)) if crs.is_geographic() => MODEL_TYPE_GEOGRAPHIC,
        _ => MODEL_TYPE_PROJECTED,
    };

    let mut entries = vec![
        [GT_MODEL_TYPE, 0, 1, model_type],
        [GT_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA],
    ];
    if let Some((crs, code)) = code {
        let key = if crs.is_geographic() { GEOGRAPHIC_TYPE } else { PROJECTED_CS_TYPE };
        entries.push([key, 0, 1, code]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}

/// Write a Raster to a GeoTIFF file
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, file, options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T: RasterElement>(
    raster: &Raster<T>,
    options: Option<GeoTiffOptions>,
) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder =
        TiffEncoder::new(writer).map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let layout = match options.sample_type {
        SampleType::Auto if T::is_float() && std::mem::size_of::<T>() == 4 => Layout::F32,
        SampleType::Auto if !T::is_float() && std::mem::size_of::<T>() == 1 => Layout::Gray8,
        SampleType::Auto | SampleType::Float64 => Layout::F64,
        SampleType::Float32 => Layout::F32,
    };

    match layout {
        Layout::Gray8 => {
            let data: Vec<u8> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(0))
                .collect();
            write_band::<Gray8, _, _>(&mut encoder, raster, &data)
        }
        Layout::F32 => {
            let data: Vec<f32> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
                .collect();
            write_band::<Gray32Float, _, _>(&mut encoder, raster, &data)
        }
        Layout::F64 => {
            let data: Vec<f64> = raster
                .data()
                .iter()
                .map(|&v| num_traits::cast(v).unwrap_or(f64::NAN))
                .collect();
            write_band::<Gray64Float, _, _>(&mut encoder, raster, &data)
        }
    }
}

enum Layout {
    Gray8,
    F32,
    F64,
}

fn write_band<C, T, W>(encoder: &mut TiffEncoder<W>, raster: &Raster<T>, data: &[C::Inner]) -> Result<()>
where
    C: ColorType,
    T: RasterElement,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    let tag_err = |e: tiff::TiffError| Error::Other(format!("Cannot write GeoTIFF tag: {}", e));
    let (rows, cols) = raster.shape();

    let mut image = encoder
        .new_image::<C>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    let geokeys = geokey_directory(raster.crs());

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(tag_err)?;
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(tag_err)?;

    if let Some(nodata) = raster.nodata() {
        let text = nodata.to_string();
        image
            .encoder()
            .write_tag(Tag::GdalNodata, text.as_str())
            .map_err(tag_err)?;
    }

    image
        .write_data(data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}
