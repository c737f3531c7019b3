//! Memory-bounded phased multiplication of 3D matrices
//!
//! `C = A × B` with A split by columns and B by rows. Every layer multiplies
//! its A against a slice of its B with SUMMA; the partial products are then
//! reduced across the fiber so each fiber member ends up with its own column
//! slab of C. B is processed in phases so that only one slice of the partial
//! product is alive at a time.

use log::{info, warn};
use std::mem::size_of;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::comm::{Payload, ReduceOp};
use crate::config::MultiplyConfig;
use crate::constants::{
    INPUT_MEMORY_FACTOR, INTERMEDIATE_MEMORY_FACTOR, OUTPUT_MEMORY_FACTOR, SELECT_ENTRY_BYTES,
    SELECT_SCRATCH_ARRAYS,
};
use crate::dist::prune::PrunePolicy;
use crate::dist::{SpParMat, SpParMat3D};
use crate::error::{Error, Result};
use crate::exchange::exchange_chunks;
use crate::grid::SplitAxis;
use crate::local::merge_tuples;
use crate::matrix::SparseMatrixCSC;
use crate::semiring::Semiring;

/// Wall-clock breakdown of a phased multiplication on one process
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiplyStats {
    /// Number of phases actually run
    pub phases: usize,
    /// Phase-count estimation, including the symbolic SUMMA pass
    pub symbolic: Duration,
    /// Layer SUMMA multiplications
    pub multiply: Duration,
    /// Chunk exchanges across the fiber
    pub reduction: Duration,
    /// Merging of the received chunks
    pub merge: Duration,
    /// Pruning of the phase results
    pub prune: Duration,
}

/// Smallest phase count that keeps `a × b` inside the per-process budget
///
/// Inputs and output are charged in full; the intermediate product and the
/// selection scratch are divided among the phases. The estimate is agreed on
/// over the world, as is a budget violation.
pub fn calculate_number_of_phases<T>(
    a: &SpParMat3D<T>,
    b: &SpParMat3D<T>,
    config: &MultiplyConfig,
) -> Result<usize>
where
    T: Payload + Sync,
{
    let grid = a.grid();
    let world = grid.world();
    let per_nnz = (2 * size_of::<usize>() + size_of::<T>()) as i64;

    // Inputs
    let max_nnz = world.all_reduce(a.local().nnz(), ReduceOp::Max)? as i64;
    let input_mem = max_nnz * per_nnz * INPUT_MEMORY_FACTOR;

    // Intermediate product of the layer SUMMA
    let flops = a.layer().estimate_nnz_summa(b.layer())?;
    let max_flops = grid.fiber().all_reduce(flops, ReduceOp::Max)? as i64;
    let intermediate_mem = max_flops * per_nnz * INTERMEDIATE_MEMORY_FACTOR;

    // Output and selection scratch, with at most `k` entries per column
    let sqrt_p = (world.size() as f64).sqrt();
    let local_cols = b.local().n_cols.max(1) as i64;
    let per_col = ((max_flops as f64 * sqrt_p) / local_cols as f64).ceil() as i64;
    let k = (config.select_num.max(config.recover_num) as i64).min(per_col);
    let select_mem = local_cols * k * SELECT_ENTRY_BYTES * SELECT_SCRATCH_ARRAYS;
    let output_nnz = ((local_cols * k) as f64 / sqrt_p) as i64;
    let output_mem = output_nnz * per_nnz * OUTPUT_MEMORY_FACTOR;

    let budget = i64::try_from(config.per_process_memory).unwrap_or(i64::MAX);
    let remaining = world.all_reduce(budget - input_mem - output_mem, ReduceOp::Min)?;
    if remaining <= 0 {
        return Err(Error::MemoryBudgetExceeded { remaining });
    }

    let phases = ((intermediate_mem + select_mem) as f64 / remaining as f64).ceil() as usize;
    world.all_reduce(phases.max(1), ReduceOp::Max)
}

impl<T> SpParMat3D<T>
where
    T: Payload + Sync,
{
    /// Computes `self × b` in phases under the configured memory budget
    ///
    /// `self` is reshaped to a column split and `b` to a row split first if
    /// needed. The product is column split and lives on `self`'s grid.
    ///
    /// # Returns
    ///
    /// The product and the timing breakdown of this process
    pub fn mem_efficient_spgemm<SR, P>(
        &self,
        b: &Self,
        config: &MultiplyConfig,
        prune: &P,
    ) -> Result<(Self, MultiplyStats)>
    where
        SR: Semiring<T>,
        P: PrunePolicy<T>,
    {
        let a_reshaped;
        let a = if self.axis() == SplitAxis::Columns {
            self
        } else {
            a_reshaped = self.reshape(SplitAxis::Columns)?;
            &a_reshaped
        };
        let b_reshaped;
        let b = if b.axis() == SplitAxis::Rows {
            b
        } else {
            b_reshaped = b.reshape(SplitAxis::Rows)?;
            &b_reshaped
        };

        let (a_cols, b_rows) = (a.ncol()?, b.nrow()?);
        if a_cols != b_rows {
            return Err(Error::DimensionMismatch { a_cols, b_rows });
        }

        let grid = a.grid();
        let is_root = grid.world().rank() == 0;
        let n_workers = config.system_params.n_threads.max(1);
        let mut stats = MultiplyStats::default();

        let mut phases = config.phases;
        if phases < 1 || phases >= a_cols {
            if is_root {
                warn!(
                    "phase count {} is out of range for {} inner columns, resetting to 1",
                    phases, a_cols
                );
            }
            phases = 1;
        }

        let start = Instant::now();
        let estimated = calculate_number_of_phases(a, b, config)?;
        stats.symbolic = start.elapsed();
        phases = phases.max(estimated);
        stats.phases = phases;
        if is_root {
            info!(
                "phased SpGEMM: {} phases ({} estimated), symbolic stage {:?}",
                phases, estimated, stats.symbolic
            );
        }

        // Fiber column split of B, each fiber chunk cut into `phases` pieces
        let divisions = b.col_split_distribution_of_layer()?;
        let pieces: Vec<SparseMatrixCSC<T>> = b
            .local()
            .col_split_by(&divisions)
            .into_iter()
            .flat_map(|chunk| chunk.col_split(phases))
            .collect();

        let layer_grid = Arc::clone(grid.layer_grid());
        let n_rows = a.local().n_rows;
        let n_cols = divisions[grid.rank_in_fiber()];
        let mut result = SpParMat::new(
            SparseMatrixCSC::zeros(n_rows, n_cols),
            Arc::clone(&layer_grid),
        );

        for phase in 0..phases {
            // Keep this phase's pieces, blank out the others
            let blocks = pieces
                .iter()
                .enumerate()
                .map(|(idx, piece)| {
                    if idx % phases == phase {
                        piece.clone()
                    } else {
                        SparseMatrixCSC::zeros(piece.n_rows, piece.n_cols)
                    }
                })
                .collect();
            let b_phase = SpParMat::new(
                SparseMatrixCSC::col_concatenate(blocks),
                Arc::clone(&layer_grid),
            );

            let t = Instant::now();
            let c_phase = a.layer().mult::<SR>(&b_phase, n_workers)?;
            stats.multiply += t.elapsed();

            let t = Instant::now();
            let chunks = c_phase.into_local().col_split_by(&divisions);
            let received = exchange_chunks(chunks, grid.fiber())?;
            stats.reduction += t.elapsed();

            let t = Instant::now();
            let partials = received.iter().map(SparseMatrixCSC::to_tuples).collect();
            let merged = merge_tuples::<SR, T>(partials, n_rows, n_cols, n_workers);
            let mut phase_result = SpParMat::new(
                SparseMatrixCSC::from_sorted_tuples(merged),
                Arc::clone(&layer_grid),
            );
            stats.merge += t.elapsed();

            let t = Instant::now();
            prune.prune(&mut phase_result)?;
            stats.prune += t.elapsed();

            result.add_assign_with::<SR>(&phase_result);
        }

        if is_root {
            info!(
                "phased SpGEMM: multiply {:?}, reduction {:?}, merge {:?}, prune {:?}",
                stats.multiply, stats.reduction, stats.merge, stats.prune
            );
        }

        Ok((
            Self::from_layer(result.into_local(), Arc::clone(grid), SplitAxis::Columns),
            stats,
        ))
    }
}
