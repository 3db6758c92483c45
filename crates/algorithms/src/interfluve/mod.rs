//! Interfluve classification
//!
//! Two independent ways of flagging upland terrain between drainage lines,
//! and the combiner that intersects them:
//! - Distance: cells farther than a threshold from the nearest stream cell
//! - Relief: cells standing above their local mean elevation (TPI)
//! - Combine: logical AND of two masks

mod combine;
mod distance;
mod relief;

pub use combine::{combine_masks, CombineMasks};
pub use distance::{classify_by_distance, distance_to_streams, ClassifyByDistance, DistanceParams};
pub use relief::{classify_by_relief, local_mean, ClassifyByRelief, ReliefParams};
