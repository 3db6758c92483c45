//! GeoTIFF reading and writing for the pipeline boundary
//!
//! The algorithms never touch files; the CLI and tests use these helpers to
//! move `Raster` values in and out of GeoTIFF.

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer, GeoTiffOptions,
    SampleType,
};
