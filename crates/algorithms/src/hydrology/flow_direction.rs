//! D8 flow direction
//!
//! Routes each cell to its single steepest downslope neighbor among eight.
//!
//! Direction encoding (see [`FlowDir`]):
//! ```text
//!   8  1  2
//!   7  0  3
//!   6  5  4
//! ```
//! `0` = NONE (no lower neighbor), `255` = nodata.

use crate::maybe_rayon::*;
use ndarray::Array2;
use ridgeline_core::raster::{FlowDir, Raster, DIR_NODATA};
use ridgeline_core::{Algorithm, Error, Result};

/// Why a valid cell received NONE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutletKind {
    /// On the grid edge or next to nodata: water leaves the grid here
    Boundary,
    /// Interior cell with no lower neighbor: an unfilled pit or flat
    UnresolvedFlat,
}

/// Per-grid routing counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingDiagnostics {
    /// Cells assigned one of the eight real directions
    pub routed: usize,
    pub boundary_outlets: usize,
    pub unresolved_flats: usize,
    pub nodata: usize,
}

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Steepest-descent D8 flow direction from a filled DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a filled DEM.
///
/// The descent to each neighbor is `(center - neighbor) / distance` with
/// distance 1 for orthogonal and √2 for diagonal neighbors, in cell units.
/// The largest strictly positive descent wins; ties keep the first direction
/// in the order N, NE, E, SE, S, SW, W, NW. Out-of-grid and nodata
/// neighbors are never candidates. Cells with no lower neighbor get NONE;
/// nodata cells get [`DIR_NODATA`].
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    flow_direction_with_diagnostics(dem).map(|(dirs, _)| dirs)
}

/// [`flow_direction`] plus counts that separate boundary outlets from
/// unresolved interior flats. Both store NONE in the direction grid.
pub fn flow_direction_with_diagnostics(dem: &Raster<f64>) -> Result<(Raster<u8>, RoutingDiagnostics)> {
    let (rows, cols) = dem.shape();
    let valid = dem.data().mapv(|v| !dem.is_nodata(v));

    let rows_out: Vec<(Vec<u8>, RoutingDiagnostics)> = (0..rows)
        .into_par_iter()
        .map(|row| route_row(dem, &valid, row))
        .collect();

    let mut diagnostics = RoutingDiagnostics::default();
    let mut data = Vec::with_capacity(rows * cols);
    for (row_data, d) in rows_out {
        data.extend(row_data);
        diagnostics.routed += d.routed;
        diagnostics.boundary_outlets += d.boundary_outlets;
        diagnostics.unresolved_flats += d.unresolved_flats;
        diagnostics.nodata += d.nodata;
    }

    tracing::debug!(
        routed = diagnostics.routed,
        boundary_outlets = diagnostics.boundary_outlets,
        unresolved_flats = diagnostics.unresolved_flats,
        "D8 routing complete"
    );

    let output = dem.derive(data, Some(DIR_NODATA))?;
    Ok((output, diagnostics))
}

fn route_row(dem: &Raster<f64>, valid: &Array2<bool>, row: usize) -> (Vec<u8>, RoutingDiagnostics) {
    let (rows, cols) = dem.shape();
    let mut row_data = vec![DIR_NODATA; cols];
    let mut diag = RoutingDiagnostics::default();

    for (col, out) in row_data.iter_mut().enumerate() {
        if !valid[(row, col)] {
            diag.nodata += 1;
            continue;
        }
        let center = unsafe { dem.get_unchecked(row, col) };

        let mut max_drop = 0.0_f64;
        let mut best = FlowDir::None;
        let mut on_boundary = row == 0 || col == 0 || row == rows - 1 || col == cols - 1;

        for dir in FlowDir::ALL {
            let Some((nr, nc)) = dir.step(row, col, rows, cols) else {
                continue;
            };
            if !valid[(nr, nc)] {
                on_boundary = true;
                continue;
            }

            let neighbor = unsafe { dem.get_unchecked(nr, nc) };
            let drop = (center - neighbor) / dir.distance();
            if drop > max_drop {
                max_drop = drop;
                best = dir;
            }
        }

        *out = best.code();
        match outlet_kind(best, on_boundary) {
            None => diag.routed += 1,
            Some(OutletKind::Boundary) => diag.boundary_outlets += 1,
            Some(OutletKind::UnresolvedFlat) => diag.unresolved_flats += 1,
        }
    }

    (row_data, diag)
}

fn outlet_kind(dir: FlowDir, on_boundary: bool) -> Option<OutletKind> {
    match (dir, on_boundary) {
        (FlowDir::None, true) => Some(OutletKind::Boundary),
        (FlowDir::None, false) => Some(OutletKind::UnresolvedFlat),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::GeoTransform;

    fn dem_from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(rows, cols);
        dem.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_flow_direction_slope_east() {
        let dem = dem_from_fn(5, 5, |_, col| (5 - col) as f64 * 10.0);
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), FlowDir::E.code());
    }

    #[test]
    fn test_flow_direction_slope_south() {
        let dem = dem_from_fn(5, 5, |row, _| (5 - row) as f64 * 10.0);
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), FlowDir::S.code());
    }

    #[test]
    fn test_flow_direction_diagonal() {
        let dem = dem_from_fn(5, 5, |row, col| (10 - row - col) as f64 * 10.0);
        let fdir = flow_direction(&dem).unwrap();
        // S and E drop 10, SE drops 20/√2 ≈ 14.1
        assert_eq!(fdir.get(2, 2).unwrap(), FlowDir::SE.code());
    }

    #[test]
    fn test_tie_break_prefers_first_in_priority_order() {
        // W and E are equally steep: E comes first in N, NE, E, ... order
        let dem = dem_from_fn(3, 3, |_, col| if col == 1 { 5.0 } else { 1.0 });
        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(1, 1).unwrap(), FlowDir::E.code());
    }

    #[test]
    fn test_pit_is_unresolved_flat() {
        let mut dem = Raster::filled(5, 5, 10.0);
        dem.set(2, 2, 1.0).unwrap();

        let (fdir, diag) = flow_direction_with_diagnostics(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), FlowDir::None.code());
        assert_eq!(diag.unresolved_flats, 1);
        assert_eq!(diag.routed, 8);
        assert_eq!(diag.boundary_outlets, 16);
    }

    #[test]
    fn test_edge_outlet_is_boundary() {
        // Plane tilted north: top row cells have nowhere lower to go
        let dem = dem_from_fn(4, 4, |row, _| row as f64);
        let (fdir, diag) = flow_direction_with_diagnostics(&dem).unwrap();

        for col in 0..4 {
            assert_eq!(fdir.get(0, col).unwrap(), FlowDir::None.code());
            assert_eq!(fdir.get(3, col).unwrap(), FlowDir::N.code());
        }
        assert_eq!(diag.boundary_outlets, 4);
        assert_eq!(diag.unresolved_flats, 0);
        assert_eq!(diag.routed, 12);
    }

    #[test]
    fn test_nodata_is_never_a_target() {
        let mut dem = dem_from_fn(3, 3, |_, col| (3 - col) as f64);
        dem.set_nodata(Some(-9999.0));
        dem.set(1, 2, -9999.0).unwrap();

        let (fdir, diag) = flow_direction_with_diagnostics(&dem).unwrap();
        assert_eq!(fdir.get(1, 2).unwrap(), DIR_NODATA);
        assert_eq!(fdir.nodata(), Some(DIR_NODATA));
        // Center cannot drain into the hole, so it takes NE or SE instead
        assert_eq!(fdir.get(1, 1).unwrap(), FlowDir::NE.code());
        assert_eq!(diag.nodata, 1);
    }

    #[test]
    fn test_pit_beside_nodata_is_boundary_outlet() {
        let mut dem = dem_from_fn(5, 5, |row, col| if (row, col) == (2, 2) { 1.0 } else { 10.0 });
        dem.set_nodata(Some(-9999.0));
        dem.set(2, 3, -9999.0).unwrap();

        let (fdir, diag) = flow_direction_with_diagnostics(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), FlowDir::None.code());
        assert_eq!(fdir.get(1, 1).unwrap(), FlowDir::SE.code());
        assert_eq!(fdir.get(3, 2).unwrap(), FlowDir::N.code());

        // 16 edge cells plus the pit, which touches the hole
        assert_eq!(diag.boundary_outlets, 17);
        assert_eq!(diag.unresolved_flats, 0);
        assert_eq!(diag.routed, 7);
        assert_eq!(diag.nodata, 1);
    }
}
