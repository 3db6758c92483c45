//! # Ridgeline Algorithms
//!
//! Terrain-structure stages for ridgeline. Every stage is a pure function
//! from input grid(s) and explicit parameters to a new grid.
//!
//! ## Modules
//!
//! - **hydrology**: depression filling, D8 flow direction, flow accumulation,
//!   stream extraction
//! - **interfluve**: distance-to-stream and TPI classifiers, mask combiner
//! - **pipeline**: runs every stage on one DEM

mod maybe_rayon;

pub mod hydrology;
pub mod interfluve;
pub mod pipeline;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        extract_streams, fill_depressions, flow_accumulation, flow_direction,
        flow_direction_with_diagnostics, ExtractStreams, FillDepressions, FillParams,
        FlowAccumulation, FlowDirection, RoutingDiagnostics, StreamParams,
    };
    pub use crate::interfluve::{
        classify_by_distance, classify_by_relief, combine_masks, ClassifyByDistance,
        ClassifyByRelief, CombineMasks, DistanceParams, ReliefParams,
    };
    pub use crate::pipeline::{run_pipeline, InterfluveOutputs, InterfluveParams, InterfluvePipeline};
    pub use ridgeline_core::prelude::*;
}
