//! Interfluve pipeline
//!
//! Chains every stage on one DEM:
//!
//! ```text
//! dem -> fill -> route -> accumulate -> extract streams
//!                                          |
//!                            distance classifier --+
//!                                                  +-> combine
//! filled -> relief classifier ---------------------+
//! ```
//!
//! Each stage allocates its own output; the driver only moves grids along.

use crate::hydrology::{
    extract_streams, fill_depressions, flow_accumulation, flow_direction_with_diagnostics, FillParams,
    RoutingDiagnostics, StreamParams,
};
use crate::interfluve::{classify_by_distance, classify_by_relief, combine_masks, DistanceParams, ReliefParams};
use ridgeline_core::raster::Raster;
use ridgeline_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for every stage of the pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfluveParams {
    pub fill: FillParams,
    pub streams: StreamParams,
    pub distance: DistanceParams,
    pub relief: ReliefParams,
}

impl InterfluveParams {
    /// Check every stage's parameters before any work is done
    pub fn validate(&self) -> Result<()> {
        self.streams.validate()?;
        self.distance.validate()?;
        self.relief.validate()
    }
}

/// Every grid the pipeline produces
#[derive(Debug, Clone)]
pub struct InterfluveOutputs {
    /// 1 where the input DEM has data, 0 where it is nodata
    pub footprint: Raster<u8>,
    pub filled: Raster<f64>,
    pub flow_dir: Raster<u8>,
    pub routing: RoutingDiagnostics,
    pub flow_acc: Raster<u64>,
    pub streams: Raster<u8>,
    pub interfluves_distance: Raster<u8>,
    pub tpi: Raster<f64>,
    pub interfluves_tpi: Raster<u8>,
    pub interfluves_combined: Raster<u8>,
}

/// Run the whole pipeline on `dem`.
///
/// Parameters are validated first. The relief classifier runs on the filled
/// surface. Cells that are nodata in the DEM are 0 in every mask. The first
/// failing stage aborts the run and nothing is returned.
pub fn run_pipeline(dem: &Raster<f64>, params: &InterfluveParams) -> Result<InterfluveOutputs> {
    params.validate()?;
    let (rows, cols) = dem.shape();
    let footprint = dem.valid_mask();
    tracing::info!(rows, cols, valid = dem.valid_count(), "starting interfluve pipeline");

    tracing::info!(fix_flats = params.fill.fix_flats, "filling depressions");
    let filled = fill_depressions(dem, params.fill)?;

    tracing::info!("routing flow (D8)");
    let (flow_dir, routing) = flow_direction_with_diagnostics(&filled)?;
    if routing.unresolved_flats > 0 {
        tracing::warn!(cells = routing.unresolved_flats, "interior cells left without a flow direction");
    }

    tracing::info!("accumulating flow");
    let flow_acc = flow_accumulation(&flow_dir)?;

    tracing::info!(threshold = params.streams.threshold, "extracting streams");
    let streams = extract_streams(&flow_acc, params.streams)?;

    tracing::info!(threshold_cells = params.distance.threshold_cells, "classifying interfluves by distance");
    let by_distance = classify_by_distance(&streams, params.distance)?;
    let interfluves_distance = combine_masks(&by_distance, &footprint)?;

    tracing::info!(
        window = params.relief.window,
        threshold = params.relief.threshold,
        "classifying interfluves by TPI"
    );
    let (tpi, interfluves_tpi) = classify_by_relief(&filled, params.relief)?;

    tracing::info!("combining interfluve masks");
    let interfluves_combined = combine_masks(&interfluves_distance, &interfluves_tpi)?;

    Ok(InterfluveOutputs {
        footprint,
        filled,
        flow_dir,
        routing,
        flow_acc,
        streams,
        interfluves_distance,
        tpi,
        interfluves_tpi,
        interfluves_combined,
    })
}

/// Whole-pipeline algorithm
#[derive(Debug, Clone, Default)]
pub struct InterfluvePipeline;

impl Algorithm for InterfluvePipeline {
    type Input = Raster<f64>;
    type Output = InterfluveOutputs;
    type Params = InterfluveParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Interfluve Pipeline"
    }

    fn description(&self) -> &'static str {
        "Fill, route, accumulate, extract streams and classify interfluves"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        run_pipeline(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::GeoTransform;

    /// Cone rising away from a low corner, with a nodata strip
    fn cone() -> Raster<f64> {
        let n = 30;
        let mut dem = Raster::new(n, n);
        dem.set_transform(GeoTransform::new(500_000.0, 9_000_000.0, 30.0, -30.0));
        dem.set_nodata(Some(-32768.0));
        for row in 0..n {
            for col in 0..n {
                let z = ((row * row + col * col) as f64).sqrt();
                dem.set(row, col, z).unwrap();
            }
        }
        for row in 0..n {
            dem.set(row, n - 1, -32768.0).unwrap();
        }
        dem
    }

    #[test]
    fn test_params_round_trip_through_json() {
        let params = InterfluveParams {
            streams: StreamParams { threshold: 42 },
            relief: ReliefParams { window: 5, threshold: 1.5 },
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: InterfluveParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);

        // Missing sections fall back to defaults
        let partial: InterfluveParams = serde_json::from_str(r#"{"streams": {"threshold": 7}}"#).unwrap();
        assert_eq!(partial.streams.threshold, 7);
        assert_eq!(partial.relief, ReliefParams::default());
        assert!(partial.fill.fix_flats);
    }

    #[test]
    fn test_invalid_params_abort_before_work() {
        let params = InterfluveParams {
            relief: ReliefParams { window: 4, threshold: 0.5 },
            ..Default::default()
        };
        let err = run_pipeline(&cone(), &params).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "window", .. }));
    }

    #[test]
    fn test_empty_dem_aborts() {
        let mut dem: Raster<f64> = Raster::filled(4, 4, -1.0);
        dem.set_nodata(Some(-1.0));
        let err = run_pipeline(&dem, &InterfluveParams::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyGrid));
    }

    #[test]
    fn test_outputs_share_shape_and_georeferencing() {
        let dem = cone();
        let params = InterfluveParams {
            streams: StreamParams { threshold: 20 },
            distance: DistanceParams { threshold_cells: 3.0 },
            relief: ReliefParams { window: 3, threshold: 0.1 },
            ..Default::default()
        };
        let out = run_pipeline(&dem, &params).unwrap();

        assert_eq!(out.filled.shape(), dem.shape());
        assert_eq!(out.flow_dir.transform(), dem.transform());
        assert_eq!(out.interfluves_combined.transform(), dem.transform());
        assert_eq!(out.flow_acc.valid_count(), dem.valid_count());
        assert_eq!(out.routing.nodata, 30);

        // Nodata strip is 0 in every mask
        for row in 0..30 {
            assert_eq!(out.footprint.get(row, 29).unwrap(), 0);
            assert_eq!(out.streams.get(row, 29).unwrap(), 0);
            assert_eq!(out.interfluves_distance.get(row, 29).unwrap(), 0);
            assert_eq!(out.interfluves_tpi.get(row, 29).unwrap(), 0);
            assert_eq!(out.interfluves_combined.get(row, 29).unwrap(), 0);
        }

        for ((&c, &d), &t) in out
            .interfluves_combined
            .data()
            .iter()
            .zip(out.interfluves_distance.data())
            .zip(out.interfluves_tpi.data())
        {
            assert_eq!(c, d & t);
        }
    }
}
