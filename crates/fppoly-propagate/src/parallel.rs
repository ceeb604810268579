//! Per-layer neuron updates on a scoped worker pool.
//!
//! Every neuron of a freshly added layer is bounded by an independent
//! back-substitution. The neurons are split into contiguous chunks, one
//! per worker; workers read the finalized earlier layers and write only
//! their own chunk, so no locking is needed. A pool is built for each call
//! and joined before it returns.

use crate::backsub::BackSubstitution;
use crate::network::{Network, Neuron};
use crate::types::Side;
use fppoly_core::{AffineExpr, FppolyError, Result, RoundingConfig, RoundingGuard};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Configuration for per-layer parallelism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Maximum number of worker threads.
    /// None means `std::thread::available_parallelism`.
    pub max_threads: Option<usize>,

    /// Minimum number of neurons in a layer before workers are spawned.
    /// Smaller layers are updated on the calling thread.
    pub min_neurons_for_parallel: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_threads: None,
            min_neurons_for_parallel: 64,
        }
    }
}

impl ParallelConfig {
    /// Number of workers to use.
    pub fn threads(&self) -> usize {
        self.max_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }
}

/// Back-substituted lower and upper expressions of one neuron, over the
/// input dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicBounds {
    pub lexpr: AffineExpr,
    pub uexpr: AffineExpr,
}

/// Contiguous ranges covering `0..n`: one per neuron when `n < workers`,
/// otherwise `workers` ranges of `n / workers` with the remainder in the
/// last one.
pub fn chunk_ranges(n: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    if n < workers {
        return (0..n).map(|i| i..i + 1).collect();
    }
    let size = n / workers;
    (0..workers)
        .map(|w| {
            let start = w * size;
            let end = if w + 1 == workers { n } else { start + size };
            start..end
        })
        .collect()
}

/// Bound every neuron of layer `layerno` from its forward expression.
///
/// When `keep_exprs` is set, the back-substituted expressions are returned
/// per neuron (used for the output layer); otherwise the result is empty.
pub fn update_state(
    cfg: &RoundingConfig,
    parallel: &ParallelConfig,
    net: &mut Network,
    layerno: usize,
    keep_exprs: bool,
) -> Result<Vec<SymbolicBounds>> {
    let start_time = Instant::now();
    let num_layers = net.layers.len();
    if layerno >= num_layers {
        return Err(FppolyError::InvalidLayer {
            layer: layerno,
            num_layers,
        });
    }

    let (prev, rest) = net.layers.split_at_mut(layerno);
    let neurons = &mut rest[0].neurons;
    let n = neurons.len();
    let ctx = BackSubstitution::new(cfg, prev, &net.input, net.polytope.as_ref());
    let mut exprs: Vec<Option<SymbolicBounds>> = vec![None; if keep_exprs { n } else { 0 }];

    let threads = parallel.threads();
    if n < parallel.min_neurons_for_parallel || threads == 1 {
        debug!(
            "Updating layer {} serially ({} neurons < threshold {})",
            layerno, n, parallel.min_neurons_for_parallel
        );
        let _round_up = RoundingGuard::upward();
        let mut slots = exprs.iter_mut();
        for (i, neuron) in neurons.iter_mut().enumerate() {
            update_neuron(&ctx, layerno, i, neuron, slots.next());
        }
    } else {
        let ranges = chunk_ranges(n, threads);
        info!(
            "Updating layer {}: {} neurons in {} chunks",
            layerno,
            n,
            ranges.len()
        );
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.min(ranges.len()))
            .build()
            .map_err(|e| FppolyError::ThreadPool(format!("Failed to create thread pool: {}", e)))?;

        let ctx = &ctx;
        let mut rest_neurons: &mut [Neuron] = neurons;
        let mut rest_exprs: &mut [Option<SymbolicBounds>] = &mut exprs;
        pool.scope(|s| {
            for range in ranges {
                let (chunk, tail) = std::mem::take(&mut rest_neurons).split_at_mut(range.len());
                rest_neurons = tail;
                let slots = if keep_exprs {
                    let (slots, tail) = std::mem::take(&mut rest_exprs).split_at_mut(range.len());
                    rest_exprs = tail;
                    slots
                } else {
                    &mut []
                };
                s.spawn(move |_| {
                    let _round_up = RoundingGuard::upward();
                    let mut slots = slots.iter_mut();
                    for (offset, neuron) in chunk.iter_mut().enumerate() {
                        update_neuron(ctx, layerno, range.start + offset, neuron, slots.next());
                    }
                });
            }
        });
    }

    debug!(
        "Layer {} updated in {}ms",
        layerno,
        start_time.elapsed().as_millis()
    );
    Ok(exprs.into_iter().flatten().collect())
}

fn update_neuron(
    ctx: &BackSubstitution<'_>,
    layerno: usize,
    index: usize,
    neuron: &mut Neuron,
    slot: Option<&mut Option<SymbolicBounds>>,
) {
    let Some(forward) = neuron.forward_expr.as_ref() else {
        return;
    };
    let lexpr = ctx.substitute(forward.clone(), Side::Lower, layerno);
    let uexpr = ctx.substitute(forward.clone(), Side::Upper, layerno);
    neuron.lb = ctx.concretize(&lexpr, Side::Lower);
    neuron.ub = ctx.concretize(&uexpr, Side::Upper);
    trace!(
        "Layer {} neuron {}: [{}, {}]",
        layerno,
        index,
        -neuron.lb,
        neuron.ub
    );
    if let Some(slot) = slot {
        *slot = Some(SymbolicBounds { lexpr, uexpr });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_cover_all_neurons() {
        assert_eq!(chunk_ranges(3, 8), vec![0..1, 1..2, 2..3]);
        assert_eq!(chunk_ranges(10, 3), vec![0..3, 3..6, 6..10]);
        assert!(chunk_ranges(0, 4).is_empty());
    }
}
