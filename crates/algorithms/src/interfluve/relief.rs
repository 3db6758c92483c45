//! Relief (TPI) interfluves
//!
//! TPI = z - mean(window around z). Positive values sit above their
//! surroundings (ridges, uplands); cells with TPI above a threshold are
//! interfluves.
//!
//! The window is square, includes the center, and mirrors the grid at its
//! edges without repeating the edge cell (`... 2 1 | 0 1 2 ...`). Nodata
//! cells never enter the mean.

use crate::maybe_rayon::*;
use ridgeline_core::raster::Raster;
use ridgeline_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for the relief classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefParams {
    /// Window side in cells; odd and >= 3. Default: 9
    pub window: usize,
    /// TPI above which a cell is an interfluve, in elevation units.
    /// Default: 0.5
    pub threshold: f64,
}

impl Default for ReliefParams {
    fn default() -> Self {
        Self {
            window: 9,
            threshold: 0.5,
        }
    }
}

impl ReliefParams {
    pub fn validate(&self) -> Result<()> {
        validate_window(self.window)?;
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(Error::invalid_parameter(
                "threshold",
                self.threshold,
                "must be finite and > 0",
            ));
        }
        Ok(())
    }
}

fn validate_window(window: usize) -> Result<()> {
    if window < 3 || window % 2 == 0 {
        return Err(Error::invalid_parameter("window", window, "must be odd and >= 3"));
    }
    Ok(())
}

/// Relief classifier algorithm
#[derive(Debug, Clone, Default)]
pub struct ClassifyByRelief;

impl Algorithm for ClassifyByRelief {
    type Input = Raster<f64>;
    type Output = (Raster<f64>, Raster<u8>);
    type Params = ReliefParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Interfluves by TPI"
    }

    fn description(&self) -> &'static str {
        "Topographic Position Index and the mask of cells above a TPI threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        classify_by_relief(&input, params)
    }
}

/// Mirror an out-of-range index back into `0..n`, not repeating the edge.
fn reflect_index(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let m = i.rem_euclid(period);
    if m >= n as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Mean of the valid cells in the `window x window` neighborhood of every
/// cell, with reflected edges.
///
/// Computed for nodata centers too. Cells whose window holds no valid value
/// are NaN, which is also the output nodata.
pub fn local_mean(elevation: &Raster<f64>, window: usize) -> Result<Raster<f64>> {
    validate_window(window)?;
    let (rows, cols) = elevation.shape();
    let half = (window / 2) as isize;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                let mut count = 0u32;

                for dr in -half..=half {
                    let nr = reflect_index(row as isize + dr, rows);
                    for dc in -half..=half {
                        let nc = reflect_index(col as isize + dc, cols);
                        let v = unsafe { elevation.get_unchecked(nr, nc) };
                        if !elevation.is_nodata(v) {
                            sum += v;
                            count += 1;
                        }
                    }
                }

                if count > 0 {
                    *out = sum / count as f64;
                }
            }

            row_data
        })
        .collect();

    elevation.derive(data, Some(f64::NAN))
}

/// Topographic Position Index and the interfluve mask derived from it.
///
/// Returns `(tpi, mask)`. TPI is NaN where the cell is nodata or its window
/// has no valid value; the mask is 1 iff TPI > `params.threshold` and 0
/// everywhere else, including those NaN cells.
pub fn classify_by_relief(
    elevation: &Raster<f64>,
    params: ReliefParams,
) -> Result<(Raster<f64>, Raster<u8>)> {
    params.validate()?;

    let mean = local_mean(elevation, params.window)?;
    let tpi_data: Vec<f64> = elevation
        .data()
        .iter()
        .zip(mean.data().iter())
        .map(|(&z, &m)| if elevation.is_nodata(z) { f64::NAN } else { z - m })
        .collect();

    // NaN compares false, so undefined TPI never becomes an interfluve
    let mask_data: Vec<u8> = tpi_data.iter().map(|&t| u8::from(t > params.threshold)).collect();

    tracing::debug!(
        window = params.window,
        threshold = params.threshold,
        interfluve_cells = mask_data.iter().filter(|&&v| v == 1).count(),
        "relief classification complete"
    );

    let tpi = elevation.derive(tpi_data, Some(f64::NAN))?;
    let mask = elevation.derive(mask_data, None)?;
    Ok((tpi, mask))
}
