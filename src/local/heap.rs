//! Column-wise heap multiply of two local blocks
//!
//! Column `j` of `C = A × B` is the semiring combination of the columns of A
//! selected by the nonzeros of column `j` of B. Each selected column is a run
//! sorted by row; a min-heap over the run heads yields the products in row
//! order so equal rows are coalesced as they come out of the heap.

use dary_heap::QuaternaryHeap;
use log::debug;
use rayon::prelude::*;
use std::cmp::Reverse;
use std::ops::Range;

use crate::local::balance::{column_costs, partition_by_flops};
use crate::matrix::{SpTuples, SparseMatrixCSC, Triplet};
use crate::semiring::Semiring;

/// Multiplies two local blocks with one worker per rayon thread
///
/// # Arguments
///
/// * `a` - Left block (m × k)
/// * `b` - Right block (k × n)
///
/// # Returns
///
/// The product as tuples sorted by (column, row), without duplicates
pub fn local_spgemm<SR, T>(a: &SparseMatrixCSC<T>, b: &SparseMatrixCSC<T>) -> SpTuples<T>
where
    SR: Semiring<T>,
    T: Copy + Send + Sync,
{
    local_spgemm_with::<SR, T>(a, b, rayon::current_num_threads())
}

/// Multiplies two local blocks with an explicit number of workers
///
/// # Panics
///
/// Panics if the inner dimensions differ.
pub fn local_spgemm_with<SR, T>(
    a: &SparseMatrixCSC<T>,
    b: &SparseMatrixCSC<T>,
    n_workers: usize,
) -> SpTuples<T>
where
    SR: Semiring<T>,
    T: Copy + Send + Sync,
{
    let (n_rows, n_cols, parts) = multiply_parts::<SR, T>(a, b, n_workers);
    assemble(n_rows, n_cols, parts)
}

/// Multiplies two local blocks, releasing them before the output is compacted
///
/// Consuming the operands lets a caller that no longer needs them keep peak
/// memory at inputs-or-output rather than inputs-plus-output.
pub fn local_spgemm_owned<SR, T>(
    a: SparseMatrixCSC<T>,
    b: SparseMatrixCSC<T>,
    n_workers: usize,
) -> SpTuples<T>
where
    SR: Semiring<T>,
    T: Copy + Send + Sync,
{
    let (n_rows, n_cols, parts) = multiply_parts::<SR, T>(&a, &b, n_workers);
    drop(a);
    drop(b);
    assemble(n_rows, n_cols, parts)
}

fn multiply_parts<SR, T>(
    a: &SparseMatrixCSC<T>,
    b: &SparseMatrixCSC<T>,
    n_workers: usize,
) -> (usize, usize, Vec<Vec<Triplet<T>>>)
where
    SR: Semiring<T>,
    T: Copy + Send + Sync,
{
    assert_eq!(a.n_cols, b.n_rows, "Matrix dimensions must be compatible for multiplication");

    let n_rows = a.n_rows;
    let n_cols = b.n_cols;
    if a.is_zero() || b.is_zero() {
        return (n_rows, n_cols, Vec::new());
    }

    // 1. Estimate the work of every output column
    let costs = column_costs(a, b);

    // 2. Cut the columns into flop-balanced ranges
    let bounds = partition_by_flops(&costs, n_workers);
    debug!(
        "local SpGEMM: {} x {} times {} x {}, {} flops over {} workers",
        a.n_rows,
        a.n_cols,
        b.n_rows,
        b.n_cols,
        costs.iter().sum::<usize>(),
        bounds.len() - 1
    );

    // 3. Every worker multiplies its range with its own heap
    let parts = bounds
        .par_windows(2)
        .map(|w| multiply_columns::<SR, T>(a, b, w[0]..w[1], &costs))
        .collect();

    (n_rows, n_cols, parts)
}

/// Heap-merge multiply of the output columns in `cols`
fn multiply_columns<SR, T>(
    a: &SparseMatrixCSC<T>,
    b: &SparseMatrixCSC<T>,
    cols: Range<usize>,
    costs: &[usize],
) -> Vec<Triplet<T>>
where
    SR: Semiring<T>,
    T: Copy,
{
    // Scratch is sized once for the widest column in the range
    let heap_size = cols.clone().map(|j| b.col_nnz(j)).max().unwrap_or(0);
    let mut heap: QuaternaryHeap<Reverse<(usize, usize)>> =
        QuaternaryHeap::with_capacity(heap_size);
    let mut runs: Vec<(usize, usize)> = Vec::with_capacity(heap_size);
    let mut out: Vec<Triplet<T>> = Vec::with_capacity(costs[cols.clone()].iter().sum());

    for j in cols {
        let b_start = b.col_ptr[j];
        let b_end = b.col_ptr[j + 1];

        runs.clear();
        for (run, &k) in b.row_idx[b_start..b_end].iter().enumerate() {
            let start = a.col_ptr[k];
            let end = a.col_ptr[k + 1];
            runs.push((start, end));
            if start < end {
                heap.push(Reverse((a.row_idx[start], run)));
            }
        }

        let col_start = out.len();
        while let Some(Reverse((row, run))) = heap.pop() {
            let pos = runs[run].0;

            if let Some(product) = SR::multiply(&a.values[pos], &b.values[b_start + run]) {
                let last = out.len();
                if last > col_start && out[last - 1].0 == row {
                    out[last - 1].2 = SR::add(&out[last - 1].2, &product);
                } else {
                    out.push((row, j, product));
                }
            }

            runs[run].0 += 1;
            if runs[run].0 < runs[run].1 {
                heap.push(Reverse((a.row_idx[runs[run].0], run)));
            }
        }
    }

    out
}

/// Copies the per-worker outputs into one right-sized buffer
fn assemble<T>(n_rows: usize, n_cols: usize, parts: Vec<Vec<Triplet<T>>>) -> SpTuples<T> {
    let total = parts.iter().map(Vec::len).sum();
    let mut tuples = Vec::with_capacity(total);
    for part in parts {
        tuples.extend(part);
    }
    SpTuples::new(n_rows, n_cols, tuples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semiring::{MinPlus, PlusTimes};

    // A = [1 2; 0 3], B = [4 5; 6 7], C = [16 19; 18 21]
    fn dense_pair() -> (SparseMatrixCSC<i64>, SparseMatrixCSC<i64>) {
        let a = SparseMatrixCSC::new(2, 2, vec![0, 1, 3], vec![0, 0, 1], vec![1, 2, 3]);
        let b = SparseMatrixCSC::new(2, 2, vec![0, 2, 4], vec![0, 1, 0, 1], vec![4, 6, 5, 7]);
        (a, b)
    }

    #[test]
    fn test_small_product() {
        let (a, b) = dense_pair();
        let c = local_spgemm_with::<PlusTimes, _>(&a, &b, 2);
        assert_eq!(c.tuples, vec![(0, 0, 16), (1, 0, 18), (0, 1, 19), (1, 1, 21)]);
    }

    #[test]
    fn test_worker_count_does_not_change_result() {
        let (a, b) = dense_pair();
        let one = local_spgemm_with::<PlusTimes, _>(&a, &b, 1);
        let many = local_spgemm_with::<PlusTimes, _>(&a, &b, 7);
        assert_eq!(one, many);
    }

    #[test]
    fn test_zero_operand_short_circuits() {
        let a = SparseMatrixCSC::<i64>::zeros(4, 3);
        let b = SparseMatrixCSC::<i64>::identity(3);
        let c = local_spgemm::<PlusTimes, _>(&a, &b);
        assert_eq!((c.n_rows, c.n_cols, c.nnz()), (4, 3, 0));
    }

    #[test]
    fn test_annihilated_products_are_dropped() {
        // A column 0 holds infinity, so only A(1,1) * B(1,0) survives
        let a = SparseMatrixCSC::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![i64::MAX, 2]);
        let b = SparseMatrixCSC::new(2, 1, vec![0, 2], vec![0, 1], vec![1, 3]);
        let c = local_spgemm::<MinPlus, _>(&a, &b);
        assert_eq!(c.tuples, vec![(1, 0, 5)]);
    }

    #[test]
    fn test_owned_matches_borrowed() {
        let (a, b) = dense_pair();
        let borrowed = local_spgemm_with::<PlusTimes, _>(&a, &b, 3);
        let owned = local_spgemm_owned::<PlusTimes, _>(a, b, 3);
        assert_eq!(borrowed, owned);
    }

    #[test]
    #[should_panic(expected = "Matrix dimensions must be compatible")]
    fn test_dimension_mismatch_panics() {
        let a = SparseMatrixCSC::<i64>::identity(2);
        let b = SparseMatrixCSC::<i64>::identity(3);
        local_spgemm::<PlusTimes, _>(&a, &b);
    }
}
