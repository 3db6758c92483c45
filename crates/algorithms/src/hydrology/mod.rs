//! Hydrological analysis algorithms
//!
//! The drainage half of the pipeline, in the order it runs:
//! - Priority-Flood: depression filling with optional flat resolution
//! - Flow direction: D8 single flow direction with outlet diagnostics
//! - Flow accumulation: upstream cell counts (queue, wavefront, weighted)
//! - Stream network: accumulation threshold

pub(crate) mod flow_accumulation;
pub(crate) mod flow_direction;
pub(crate) mod priority_flood;
mod stream_network;

pub use flow_accumulation::{
    flow_accumulation, flow_accumulation_wavefront, flow_accumulation_weighted, FlowAccumulation,
};
pub use flow_direction::{
    flow_direction, flow_direction_with_diagnostics, FlowDirection, OutletKind, RoutingDiagnostics,
};
pub use priority_flood::{fill_depressions, FillDepressions, FillParams};
pub use stream_network::{extract_streams, ExtractStreams, StreamParams};
