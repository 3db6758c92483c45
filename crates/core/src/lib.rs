//! # Ridgeline Core
//!
//! Grid types, georeferencing and boundary I/O shared by the ridgeline
//! terrain-structure pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced 2D grid with an optional nodata sentinel
//! - `GeoTransform`: affine georeferencing carried through every stage
//! - `CRS`: opaque coordinate reference system identifier
//! - `FlowDir`: the nine D8 direction codes
//! - `Algorithm`: uniform trait implemented by every pipeline stage
//! - GeoTIFF reading/writing for the outer boundary (CLI, tests)

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{FlowDir, GeoTransform, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{FlowDir, GeoTransform, Raster, RasterElement};
    pub use crate::Algorithm;
}

/// Core trait for every pipeline stage.
///
/// Stages are pure functions: they read their input, allocate a new output
/// and never keep a reference to the input once `execute` returns.
pub trait Algorithm {
    /// Input type for the stage
    type Input;
    /// Output type for the stage
    type Output;
    /// Parameters controlling the stage
    type Params: Default;
    /// Error type for stage execution
    type Error: std::error::Error;

    /// Returns the stage name
    fn name(&self) -> &'static str;

    /// Returns a description of what the stage does
    fn description(&self) -> &'static str;

    /// Execute the stage
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
