//! Stream network extraction
//!
//! Thresholds a flow accumulation raster: cells with accumulation
//! >= threshold are stream cells.
//!
//! The output is a binary mask (1 = stream, 0 = not a stream or nodata).

use crate::maybe_rayon::*;
use ridgeline_core::raster::Raster;
use ridgeline_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for stream network extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamParams {
    /// Minimum accumulation, in cells, for a stream cell. Must be >= 1.
    /// Default: 1000
    pub threshold: u64,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self { threshold: 1000 }
    }
}

impl StreamParams {
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::invalid_parameter("threshold", self.threshold, "must be at least 1"));
        }
        Ok(())
    }
}

/// Stream extraction algorithm
#[derive(Debug, Clone, Default)]
pub struct ExtractStreams;

impl Algorithm for ExtractStreams {
    type Input = Raster<u64>;
    type Output = Raster<u8>;
    type Params = StreamParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Extract Streams"
    }

    fn description(&self) -> &'static str {
        "Binary stream mask from a flow accumulation threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        extract_streams(&input, params)
    }
}

/// Extract the stream mask from flow accumulation.
///
/// # Arguments
/// * `flow_acc` - Flow accumulation raster (from `flow_accumulation`)
/// * `params` - Stream threshold
///
/// # Returns
/// Raster<u8> with 1 = stream cell, 0 = non-stream or nodata cell
pub fn extract_streams(flow_acc: &Raster<u64>, params: StreamParams) -> Result<Raster<u8>> {
    params.validate()?;
    let threshold = params.threshold;

    let (rows, cols) = flow_acc.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let acc = unsafe { flow_acc.get_unchecked(row, col) };
                    u8::from(!flow_acc.is_nodata(acc) && acc >= threshold)
                })
                .collect::<Vec<u8>>()
        })
        .collect();

    let stream_cells = data.iter().filter(|&&v| v == 1).count();
    tracing::debug!(threshold, stream_cells, "stream extraction complete");

    flow_acc.derive(data, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_accumulation::flow_accumulation;
    use crate::hydrology::flow_direction::flow_direction;
    use crate::hydrology::priority_flood::{fill_depressions, FillParams};
    use ridgeline_core::GeoTransform;

    fn south_slope(rows: usize, cols: usize) -> Raster<f64> {
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                dem.set(row, col, (rows - row) as f64 * 10.0).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_stream_threshold() {
        let filled = fill_depressions(&south_slope(10, 10), FillParams::default()).unwrap();
        let fdir = flow_direction(&filled).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();

        let streams = extract_streams(&facc, StreamParams { threshold: 5 }).unwrap();

        // Headwater row accumulates only itself
        for col in 0..10 {
            assert_eq!(streams.get(0, col).unwrap(), 0, "col {}", col);
        }
        assert_eq!(streams.get(9, 5).unwrap(), 1);
    }

    #[test]
    fn test_binary_output() {
        let fdir = flow_direction(&south_slope(5, 5)).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();
        let streams = extract_streams(&facc, StreamParams { threshold: 2 }).unwrap();

        assert!(streams.data().iter().all(|&v| v == 0 || v == 1));
        assert_eq!(streams.nodata(), None);
    }

    #[test]
    fn test_high_threshold_no_streams() {
        let fdir = flow_direction(&south_slope(5, 5)).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();
        let streams = extract_streams(&facc, StreamParams::default()).unwrap();
        assert!(streams.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_threshold_is_monotonic() {
        let fdir = flow_direction(&south_slope(8, 6)).unwrap();
        let facc = flow_accumulation(&fdir).unwrap();

        let mut previous = extract_streams(&facc, StreamParams { threshold: 1 }).unwrap();
        for threshold in 2..=10 {
            let current = extract_streams(&facc, StreamParams { threshold }).unwrap();
            for (&now, &before) in current.data().iter().zip(previous.data()) {
                assert!(now <= before, "threshold {} added a stream cell", threshold);
            }
            previous = current;
        }
    }

    #[test]
    fn test_nodata_is_never_a_stream() {
        let mut facc = Raster::from_vec(vec![5u64, 0, 7, 1], 2, 2).unwrap();
        facc.set_nodata(Some(0));

        let streams = extract_streams(&facc, StreamParams { threshold: 1 }).unwrap();
        let values: Vec<u8> = streams.data().iter().copied().collect();
        assert_eq!(values, vec![1, 0, 1, 1]);
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let facc: Raster<u64> = Raster::filled(2, 2, 1);
        let err = extract_streams(&facc, StreamParams { threshold: 0 }).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }
}
