//! GeoTIFF boundary I/O through real files.

use ridgeline_core::io::{read_geotiff, write_geotiff, GeoTiffOptions, SampleType};
use ridgeline_core::{GeoTransform, Raster, CRS};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ridgeline-{}-{}", std::process::id(), name))
}

#[test]
fn dem_file_round_trip() {
    let mut dem = Raster::from_vec((0..24).map(|v| v as f64 * 1.5).collect(), 4, 6).unwrap();
    dem.set_transform(GeoTransform::new(-70.5, -33.25, 0.000277, -0.000277));
    dem.set_nodata(Some(-32768.0));
    dem.set_crs(Some(CRS::from_epsg(4326)));
    dem.set(2, 3, -32768.0).unwrap();

    let path = temp_path("dem.tif");
    write_geotiff(&dem, &path, None).unwrap();
    let back: Raster<f64> = read_geotiff(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(back.shape(), (4, 6));
    assert_eq!(back.data(), dem.data());
    assert_eq!(back.nodata(), Some(-32768.0));
    assert_eq!(back.valid_count(), 23);
    assert_eq!(back.crs(), Some(&CRS::from_epsg(4326)));
    let (a, b) = (back.transform(), dem.transform());
    assert!((a.origin_x - b.origin_x).abs() < 1e-12);
    assert!((a.pixel_height - b.pixel_height).abs() < 1e-12);
}

#[test]
fn float32_output_keeps_nan_nodata() {
    let mut tpi = Raster::from_vec(vec![0.25, f64::NAN, -1.5, 2.0], 2, 2).unwrap();
    tpi.set_nodata(Some(f64::NAN));

    let path = temp_path("tpi.tif");
    let options = GeoTiffOptions {
        sample_type: SampleType::Float32,
    };
    write_geotiff(&tpi, &path, Some(options)).unwrap();
    let back: Raster<f64> = read_geotiff(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(back.get(0, 1).unwrap().is_nan());
    assert!(back.is_nodata_at(0, 1).unwrap());
    assert_eq!(back.get(1, 0).unwrap(), -1.5);
    assert_eq!(back.valid_count(), 3);
}

#[test]
fn missing_file_is_io_error() {
    let err = read_geotiff::<f64, _>(temp_path("does-not-exist.tif")).unwrap_err();
    assert!(matches!(err, ridgeline_core::Error::Io(_)));
}
