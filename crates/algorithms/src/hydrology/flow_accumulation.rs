//! Flow accumulation
//!
//! Counts the cells draining through every cell of a D8 direction grid.
//! The direction grid is a forest of in-trees rooted at NONE cells, so the
//! count is a single topological pass (Kahn's algorithm) with no recursion.
//! Every valid cell contributes itself, so headwater cells hold 1.

use crate::maybe_rayon::*;
use ridgeline_core::raster::{FlowDir, Raster, DIR_NODATA};
use ridgeline_core::{Algorithm, Error, Result};
use std::collections::VecDeque;
use std::ops::AddAssign;

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<u64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Upstream contributing cell count from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

/// Drainage graph decoded from a direction grid, in flat row-major indices
struct FlowGraph {
    receivers: Vec<Option<usize>>,
    valid: Vec<bool>,
    in_degree: Vec<u32>,
    valid_count: usize,
}

impl FlowGraph {
    /// Decode and validate every direction code.
    ///
    /// Unknown codes and codes pointing off the grid or into nodata are
    /// rejected here, so traversal only has cycles left to detect.
    fn build(dirs: &Raster<u8>) -> Result<Self> {
        let (rows, cols) = dirs.shape();
        let n = rows * cols;
        let is_void = |code: u8| code == DIR_NODATA || dirs.is_nodata(code);

        let mut receivers = vec![None; n];
        let mut valid = vec![false; n];
        let mut in_degree = vec![0u32; n];
        let mut valid_count = 0;

        for ((row, col), &code) in dirs.data().indexed_iter() {
            if is_void(code) {
                continue;
            }
            let idx = row * cols + col;
            valid[idx] = true;
            valid_count += 1;

            let dir = FlowDir::from_code(code).ok_or_else(|| {
                Error::InvalidFlowGraph(format!("unknown direction code {} at ({}, {})", code, row, col))
            })?;
            if dir == FlowDir::None {
                continue;
            }

            let (nr, nc) = dir.step(row, col, rows, cols).ok_or_else(|| {
                Error::InvalidFlowGraph(format!("cell ({}, {}) drains off the grid via {:?}", row, col, dir))
            })?;
            if is_void(dirs.data()[(nr, nc)]) {
                return Err(Error::InvalidFlowGraph(format!(
                    "cell ({}, {}) drains into nodata at ({}, {})",
                    row, col, nr, nc
                )));
            }

            let target = nr * cols + nc;
            receivers[idx] = Some(target);
            in_degree[target] += 1;
        }

        Ok(Self {
            receivers,
            valid,
            in_degree,
            valid_count,
        })
    }

    /// Cells with nothing draining into them
    fn sources(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.valid.len()).filter(|&i| self.valid[i] && self.in_degree[i] == 0)
    }

    fn cycle_error(&self, processed: usize) -> Error {
        Error::InvalidFlowGraph(format!(
            "cycle in flow directions: {} of {} valid cells never reached an outlet",
            self.valid_count - processed,
            self.valid_count
        ))
    }
}

/// Kahn traversal: push each finalized value into its receiver.
fn accumulate<V: Copy + AddAssign>(mut graph: FlowGraph, mut acc: Vec<V>) -> Result<Vec<V>> {
    let mut queue: VecDeque<usize> = graph.sources().collect();
    let mut processed = 0usize;

    while let Some(idx) = queue.pop_front() {
        processed += 1;
        let Some(target) = graph.receivers[idx] else {
            continue;
        };

        let upstream = acc[idx];
        acc[target] += upstream;
        graph.in_degree[target] -= 1;
        if graph.in_degree[target] == 0 {
            queue.push_back(target);
        }
    }

    if processed < graph.valid_count {
        return Err(graph.cycle_error(processed));
    }
    Ok(acc)
}

fn unit_counts(graph: &FlowGraph) -> Vec<u64> {
    graph.valid.iter().map(|&v| u64::from(v)).collect()
}

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// Valid cells start at 1 and pass their total to the cell they drain into
/// once all of their own upstream cells are done. Nodata cells (code 255 or
/// the grid's nodata) hold 0, which is also the output's nodata value.
///
/// # Errors
/// `InvalidFlowGraph` if a code is unknown, points off the grid or into
/// nodata, or the directions contain a cycle.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<u64>> {
    let graph = FlowGraph::build(flow_dir)?;
    let initial = unit_counts(&graph);
    let acc = accumulate(graph, initial)?;

    tracing::debug!(max = acc.iter().copied().max().unwrap_or(0), "flow accumulation complete");
    flow_dir.derive(acc, Some(0))
}

/// Round-based flow accumulation.
///
/// Every cell whose upstream count reaches zero in the same round forms the
/// frontier; frontier contributions are computed in parallel, then merged
/// into their receivers before the next round. Gives the same result as
/// [`flow_accumulation`].
pub fn flow_accumulation_wavefront(flow_dir: &Raster<u8>) -> Result<Raster<u64>> {
    let mut graph = FlowGraph::build(flow_dir)?;
    let mut acc = unit_counts(&graph);

    let mut frontier: Vec<usize> = graph.sources().collect();
    let mut processed = 0usize;
    let mut rounds = 0usize;

    while !frontier.is_empty() {
        processed += frontier.len();
        rounds += 1;

        let contributions: Vec<(usize, u64)> = frontier
            .par_iter()
            .filter_map(|&idx| graph.receivers[idx].map(|target| (target, acc[idx])))
            .collect();

        let mut next = Vec::new();
        for (target, upstream) in contributions {
            acc[target] += upstream;
            graph.in_degree[target] -= 1;
            if graph.in_degree[target] == 0 {
                next.push(target);
            }
        }
        frontier = next;
    }

    if processed < graph.valid_count {
        return Err(graph.cycle_error(processed));
    }

    tracing::debug!(rounds, "wavefront accumulation complete");
    flow_dir.derive(acc, Some(0))
}

/// Weighted flow accumulation: each valid cell contributes its weight
/// instead of 1. Nodata weights contribute 0; cells that are nodata in the
/// direction grid come out as NaN.
pub fn flow_accumulation_weighted(flow_dir: &Raster<u8>, weights: &Raster<f64>) -> Result<Raster<f64>> {
    flow_dir.ensure_same_shape(weights)?;

    let graph = FlowGraph::build(flow_dir)?;
    let initial: Vec<f64> = weights
        .data()
        .iter()
        .zip(&graph.valid)
        .map(|(&w, &valid)| match valid {
            false => f64::NAN,
            true if weights.is_nodata(w) => 0.0,
            true => w,
        })
        .collect();
    let acc = accumulate(graph, initial)?;

    flow_dir.derive(acc, Some(f64::NAN))
}
