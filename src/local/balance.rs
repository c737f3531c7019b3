//! Flop estimation and flop-balanced column partitioning
//!
//! The local multiply hands each worker a contiguous range of output columns.
//! Ranges are cut on the prefix sum of the estimated work per column so every
//! worker receives about the same number of multiplications.

use rayon::prelude::*;

use crate::matrix::SparseMatrixCSC;
use crate::utils::exclusive_scan;

/// Estimated multiplications needed for every column of `A × B`
///
/// The estimate of column `j` is the sum of the lengths of the columns of A
/// selected by the row indices of column `j` of B. It is also an upper bound
/// on the nonzeros of that output column.
pub fn column_costs<T>(a: &SparseMatrixCSC<T>, b: &SparseMatrixCSC<T>) -> Vec<usize>
where
    T: Copy + Send + Sync,
{
    (0..b.n_cols)
        .into_par_iter()
        .map(|j| {
            let start = b.col_ptr[j];
            let end = b.col_ptr[j + 1];
            b.row_idx[start..end].iter().map(|&k| a.col_nnz(k)).sum()
        })
        .collect()
}

/// Partitions columns into `n_workers` contiguous ranges of similar cost
///
/// Returns `n_workers + 1` boundaries; worker `t` owns columns
/// `bounds[t]..bounds[t + 1]`. Boundary `t` is the first column whose
/// exclusive prefix cost reaches `t / n_workers` of the total, so a worker's
/// share exceeds the average by less than the most expensive single column.
pub fn partition_by_flops(costs: &[usize], n_workers: usize) -> Vec<usize> {
    let n_workers = n_workers.max(1);
    let prefix = exclusive_scan(costs);
    let total = prefix[costs.len()] as u128;

    let mut bounds = Vec::with_capacity(n_workers + 1);
    bounds.push(0);
    for t in 1..n_workers {
        let target = t as u128 * total;
        let cut = prefix.partition_point(|&p| (p as u128) * (n_workers as u128) < target);
        bounds.push(cut.min(costs.len()));
    }
    bounds.push(costs.len());
    bounds
}

/// Per-worker cost of a partition
pub fn worker_loads(costs: &[usize], bounds: &[usize]) -> Vec<usize> {
    bounds
        .windows(2)
        .map(|w| costs[w[0]..w[1]].iter().sum())
        .collect()
}
