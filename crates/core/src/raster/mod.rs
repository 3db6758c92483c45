//! Raster data structures

mod d8;
mod element;
mod geotransform;
mod grid;

pub use d8::{FlowDir, DIR_NODATA};
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
