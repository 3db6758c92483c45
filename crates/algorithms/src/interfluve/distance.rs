//! Distance-to-stream interfluves
//!
//! Exact Euclidean distance transform (Felzenszwalb & Huttenlocher 2012):
//! a 1-D lower envelope of parabolas per row, then per column, on squared
//! distances. Both passes are O(n) per line and lines run in parallel.

use crate::maybe_rayon::*;
use ridgeline_core::raster::Raster;
use ridgeline_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};

/// Parameters for the distance classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceParams {
    /// Cells strictly farther than this from a stream, in cell units, are
    /// interfluves. Default: 15
    pub threshold_cells: f64,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self { threshold_cells: 15.0 }
    }
}

impl DistanceParams {
    pub fn validate(&self) -> Result<()> {
        let t = self.threshold_cells;
        if !t.is_finite() || t <= 0.0 {
            return Err(Error::invalid_parameter("threshold_cells", t, "must be finite and > 0"));
        }
        Ok(())
    }
}

/// Distance classifier algorithm
#[derive(Debug, Clone, Default)]
pub struct ClassifyByDistance;

impl Algorithm for ClassifyByDistance {
    type Input = Raster<u8>;
    type Output = Raster<u8>;
    type Params = DistanceParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Interfluves by Distance"
    }

    fn description(&self) -> &'static str {
        "Cells farther than a threshold from the nearest stream cell"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        classify_by_distance(&input, params)
    }
}

/// Squared distance from each index to the nearest finite site of `f`,
/// where `f[q]` is the squared distance already carried by site `q`.
///
/// Infinite entries are not sites. A line without sites stays infinite.
fn squared_edt_1d(f: &[f64]) -> Vec<f64> {
    let n = f.len();
    // Parabola vertices of the lower envelope and the x where each takes over
    let mut sites: Vec<usize> = Vec::with_capacity(n);
    let mut starts: Vec<f64> = Vec::with_capacity(n);

    let intersect = |p: usize, q: usize| {
        let (pf, qf) = (p as f64, q as f64);
        ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * (qf - pf))
    };

    for q in (0..n).filter(|&q| f[q].is_finite()) {
        loop {
            match (sites.last(), starts.last()) {
                (Some(&p), Some(&start)) => {
                    let s = intersect(p, q);
                    if s <= start {
                        sites.pop();
                        starts.pop();
                        continue;
                    }
                    sites.push(q);
                    starts.push(s);
                }
                _ => {
                    sites.push(q);
                    starts.push(f64::NEG_INFINITY);
                }
            }
            break;
        }
    }

    if sites.is_empty() {
        return vec![f64::INFINITY; n];
    }

    let mut k = 0;
    (0..n)
        .map(|q| {
            let x = q as f64;
            while k + 1 < sites.len() && starts[k + 1] < x {
                k += 1;
            }
            let p = sites[k];
            let dx = x - p as f64;
            dx * dx + f[p]
        })
        .collect()
}

/// Exact Euclidean distance, in cell units, from every cell to the nearest
/// stream cell (any nonzero, non-nodata value).
///
/// Stream cells hold 0. With no stream cells every value is `f64::INFINITY`.
pub fn distance_to_streams(streams: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = streams.shape();

    // Pass 1: along rows
    let along_rows: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let line: Vec<f64> = (0..cols)
                .map(|col| {
                    let v = unsafe { streams.get_unchecked(row, col) };
                    if v != 0 && !streams.is_nodata(v) {
                        0.0
                    } else {
                        f64::INFINITY
                    }
                })
                .collect();
            squared_edt_1d(&line)
        })
        .collect();

    // Pass 2: along columns, on the row results
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let line: Vec<f64> = (0..rows).map(|row| along_rows[row * cols + col]).collect();
            squared_edt_1d(&line)
        })
        .collect();

    let mut data = vec![f64::INFINITY; rows * cols];
    for (col, column) in columns.iter().enumerate() {
        for (row, &d2) in column.iter().enumerate() {
            data[row * cols + col] = d2.sqrt();
        }
    }

    streams.derive(data, None)
}

/// Flag cells whose distance to the nearest stream exceeds
/// `params.threshold_cells`.
///
/// A grid with no stream cells is all interfluve (all ones).
pub fn classify_by_distance(streams: &Raster<u8>, params: DistanceParams) -> Result<Raster<u8>> {
    params.validate()?;

    let distance = distance_to_streams(streams)?;
    let data: Vec<u8> = distance
        .data()
        .iter()
        .map(|&d| u8::from(d > params.threshold_cells))
        .collect();

    tracing::debug!(
        threshold_cells = params.threshold_cells,
        interfluve_cells = data.iter().filter(|&&v| v == 1).count(),
        "distance classification complete"
    );

    streams.derive(data, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mask_with(rows: usize, cols: usize, cells: &[(usize, usize)]) -> Raster<u8> {
        let mut mask = Raster::new(rows, cols);
        for &(r, c) in cells {
            mask.set(r, c, 1).unwrap();
        }
        mask
    }

    /// Nearest-site search over every stream cell
    fn brute_force(mask: &Raster<u8>) -> Vec<f64> {
        let (rows, cols) = mask.shape();
        let sites: Vec<(usize, usize)> = mask
            .data()
            .indexed_iter()
            .filter(|&(_, &v)| v == 1)
            .map(|(idx, _)| idx)
            .collect();
        let mut out = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                let best = sites
                    .iter()
                    .map(|&(r, c)| {
                        let dr = row as f64 - r as f64;
                        let dc = col as f64 - c as f64;
                        (dr * dr + dc * dc).sqrt()
                    })
                    .fold(f64::INFINITY, f64::min);
                out.push(best);
            }
        }
        out
    }

    #[test]
    fn test_single_stream_cell() {
        let mask = mask_with(5, 5, &[(2, 2)]);
        let dist = distance_to_streams(&mask).unwrap();

        assert_eq!(dist.get(2, 2).unwrap(), 0.0);
        assert_relative_eq!(dist.get(2, 4).unwrap(), 2.0);
        assert_relative_eq!(dist.get(0, 0).unwrap(), 8.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(dist.get(4, 3).unwrap(), 5.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_matches_brute_force() {
        let cells = [(0, 7), (3, 1), (3, 2), (6, 9), (9, 0), (11, 5)];
        let mask = mask_with(12, 10, &cells);
        let dist = distance_to_streams(&mask).unwrap();

        for (&got, want) in dist.data().iter().zip(brute_force(&mask)) {
            assert_relative_eq!(got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_all_stream_grid_is_zero() {
        let mask: Raster<u8> = Raster::filled(6, 4, 1);
        let dist = distance_to_streams(&mask).unwrap();
        assert!(dist.data().iter().all(|&d| d == 0.0));

        let interfluves = classify_by_distance(&mask, DistanceParams { threshold_cells: 0.5 }).unwrap();
        assert!(interfluves.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_no_streams_is_all_interfluve() {
        let mask: Raster<u8> = Raster::new(4, 7);
        let dist = distance_to_streams(&mask).unwrap();
        assert!(dist.data().iter().all(|d| d.is_infinite()));

        let interfluves = classify_by_distance(&mask, DistanceParams::default()).unwrap();
        assert!(interfluves.data().iter().all(|&v| v == 1));
    }

    #[test]
    fn test_threshold_is_strict() {
        // Row of 7 with the stream at col 0: distances 0..6
        let mask = mask_with(1, 7, &[(0, 0)]);
        let interfluves = classify_by_distance(&mask, DistanceParams { threshold_cells: 3.0 }).unwrap();
        let values: Vec<u8> = interfluves.data().iter().copied().collect();
        assert_eq!(values, vec![0, 0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let mask: Raster<u8> = Raster::new(2, 2);
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = classify_by_distance(&mask, DistanceParams { threshold_cells: t }).unwrap_err();
            assert!(matches!(err, Error::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_edt_1d_envelope() {
        let inf = f64::INFINITY;
        let out = squared_edt_1d(&[inf, 0.0, inf, inf, inf, 0.0]);
        assert_eq!(out, vec![1.0, 0.0, 1.0, 4.0, 1.0, 0.0]);
        assert!(squared_edt_1d(&[inf, inf]).iter().all(|v| v.is_infinite()));
    }
}
