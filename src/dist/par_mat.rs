//! 2D block-distributed sparse matrix
//!
//! Every process of a [`CommGrid`] holds one local block. Global shape
//! queries are collective: row counts are summed down a process column,
//! column counts along a process row.

use log::debug;
use std::sync::Arc;

use crate::comm::{Payload, ReduceOp};
use crate::error::{Error, Result};
use crate::exchange::{broadcast_block, exchange_tuples};
use crate::grid::{block_extent, CommGrid};
use crate::local::{local_spgemm_with, merge_tuples};
use crate::matrix::{SpTuples, SparseMatrixCSC, Triplet};
use crate::semiring::Semiring;

/// A sparse matrix distributed over a 2D process grid
#[derive(Debug, Clone)]
pub struct SpParMat<T> {
    local: SparseMatrixCSC<T>,
    grid: Arc<CommGrid>,
}

impl<T> SpParMat<T>
where
    T: Payload + Sync,
{
    /// Wraps this process's local block
    pub fn new(local: SparseMatrixCSC<T>, grid: Arc<CommGrid>) -> Self {
        Self { local, grid }
    }

    /// Builds the block-distributed matrix from a triplet list every process
    /// holds in full; each process keeps only the entries it owns
    ///
    /// Duplicate coordinates are folded with `combine`.
    pub fn from_global_triplets<F>(
        grid: Arc<CommGrid>,
        m: usize,
        n: usize,
        triplets: &[Triplet<T>],
        combine: F,
    ) -> Self
    where
        F: Fn(T, T) -> T,
    {
        let me = grid.world().rank();
        let mine = triplets
            .iter()
            .filter_map(|&(grow, gcol, val)| {
                let (owner, lrow, lcol) = grid.owner(m, n, grow, gcol);
                (owner == me).then_some((lrow, lcol, val))
            })
            .collect();

        let (rows, cols) = grid.local_dims(m, n);
        Self::new(SparseMatrixCSC::from_tuples(rows, cols, mine, combine), grid)
    }

    /// Routes locally-indexed tuples to their owners and builds the blocks
    ///
    /// `buckets[d]` holds the entries destined for world rank `d`, already in
    /// the receiver's local coordinates. Duplicates are folded with `combine`.
    /// Collective over the grid's world.
    pub fn sparse_common<F>(
        grid: Arc<CommGrid>,
        m: usize,
        n: usize,
        buckets: Vec<Vec<Triplet<T>>>,
        combine: F,
    ) -> Result<Self>
    where
        F: Fn(T, T) -> T,
    {
        let received = exchange_tuples(buckets, grid.world())?;
        let (rows, cols) = grid.local_dims(m, n);
        Ok(Self::new(SparseMatrixCSC::from_tuples(rows, cols, received, combine), grid))
    }

    pub fn local(&self) -> &SparseMatrixCSC<T> {
        &self.local
    }

    pub fn local_mut(&mut self) -> &mut SparseMatrixCSC<T> {
        &mut self.local
    }

    pub fn into_local(self) -> SparseMatrixCSC<T> {
        self.local
    }

    pub fn grid(&self) -> &Arc<CommGrid> {
        &self.grid
    }

    /// Global number of rows (collective over my process column)
    pub fn nrow(&self) -> Result<usize> {
        self.grid.col_world().all_reduce(self.local.n_rows, ReduceOp::Sum)
    }

    /// Global number of columns (collective over my process row)
    pub fn ncol(&self) -> Result<usize> {
        self.grid.row_world().all_reduce(self.local.n_cols, ReduceOp::Sum)
    }

    /// Global number of nonzeros (collective over the grid)
    pub fn nnz(&self) -> Result<usize> {
        self.grid.world().all_reduce(self.local.nnz(), ReduceOp::Sum)
    }

    /// Every nonzero in global coordinates, sorted by (column, row), on every process
    ///
    /// Block offsets come from the actual local extents, so the matrix does
    /// not have to follow the block distribution.
    pub fn find(&self) -> Result<SpTuples<T>> {
        let heights = self.grid.col_world().all_gather(self.local.n_rows)?;
        let widths = self.grid.row_world().all_gather(self.local.n_cols)?;
        let row_offset: usize = heights[..self.grid.my_row()].iter().sum();
        let col_offset: usize = widths[..self.grid.my_col()].iter().sum();

        let world = self.grid.world();
        let rows: Vec<usize> = self.local.triplet_iter().map(|(i, _, _)| i + row_offset).collect();
        let cols: Vec<usize> = self.local.triplet_iter().map(|(_, j, _)| j + col_offset).collect();
        let values: Vec<T> = self.local.values.clone();

        let rows = world.all_gather_v(&rows)?;
        let cols = world.all_gather_v(&cols)?;
        let values = world.all_gather_v(&values)?;
        let mut all: Vec<Triplet<T>> = rows
            .into_iter()
            .zip(cols)
            .zip(values)
            .map(|((row, col), value)| (row, col, value))
            .collect();
        all.sort_by_key(|&(row, col, _)| (col, row));

        Ok(SpTuples::new(heights.iter().sum(), widths.iter().sum(), all))
    }

    /// Elementwise `self += other` on the local blocks under `SR::add`
    ///
    /// # Panics
    ///
    /// Panics if the local blocks differ in shape.
    pub fn add_assign_with<SR: Semiring<T>>(&mut self, other: &Self) {
        self.local.add_assign_with::<SR>(&other.local);
    }

    /// Checks that `A × B` can run as SUMMA on this grid
    ///
    /// The grid must be square and the column extents of A's blocks must
    /// match the row extents of B's blocks stage by stage. The verdict is
    /// agreed on over the whole grid.
    fn check_summa(&self, b: &Self) -> Result<()> {
        let grid = &self.grid;
        if !grid.is_square()
            || grid.grid_rows() != b.grid.grid_rows()
            || grid.grid_cols() != b.grid.grid_cols()
        {
            return Err(Error::GridMismatch(format!(
                "SUMMA needs both operands on one square grid, got {} x {} and {} x {}",
                grid.grid_rows(),
                grid.grid_cols(),
                b.grid.grid_rows(),
                b.grid.grid_cols()
            )));
        }

        let (a_cols, b_rows) = (self.ncol()?, b.nrow()?);
        let a_cols = grid.world().all_reduce(a_cols, ReduceOp::Max)?;
        let b_rows = grid.world().all_reduce(b_rows, ReduceOp::Max)?;
        if a_cols != b_rows {
            return Err(Error::DimensionMismatch { a_cols, b_rows });
        }

        let a_widths = grid.row_world().all_gather(self.local.n_cols)?;
        let b_heights = grid.col_world().all_gather(b.local.n_rows)?;
        let aligned = grid.world().all_reduce(usize::from(a_widths == b_heights), ReduceOp::Min)?;
        if aligned == 0 {
            return Err(Error::GridMismatch(
                "column blocks of A do not line up with row blocks of B".to_string(),
            ));
        }
        Ok(())
    }

    /// Synchronous SUMMA multiply `self × b` on a square grid
    ///
    /// Stage `k` broadcasts `A(i, k)` along process row `i` and `B(k, j)`
    /// along process column `j`; the stage products are multiplied with the
    /// local heap kernel and merged into the local block of `C(i, j)`.
    pub fn mult<SR: Semiring<T>>(&self, b: &Self, n_workers: usize) -> Result<Self> {
        self.check_summa(b)?;

        let grid = &self.grid;
        let stages = grid.grid_rows();
        let (n_rows, n_cols) = (self.local.n_rows, b.local.n_cols);

        let mut partials = Vec::with_capacity(stages);
        for k in 0..stages {
            let a_root = (grid.my_col() == k).then_some(&self.local);
            let a_block = broadcast_block(a_root, k, grid.row_world())?;
            let b_root = (grid.my_row() == k).then_some(&b.local);
            let b_block = broadcast_block(b_root, k, grid.col_world())?;
            partials.push(local_spgemm_with::<SR, T>(&a_block, &b_block, n_workers));
        }

        let merged = merge_tuples::<SR, T>(partials, n_rows, n_cols, n_workers);
        debug!(
            "rank {}: SUMMA over {} stages produced {} nonzeros",
            grid.world().rank(),
            stages,
            merged.nnz()
        );

        Ok(Self::new(SparseMatrixCSC::from_sorted_tuples(merged), Arc::clone(grid)))
    }

    /// Symbolic estimate of the multiplications this process performs in
    /// `self × b`, an upper bound on its output nonzeros
    ///
    /// Only column counts of A and row indices of B are broadcast.
    pub fn estimate_nnz_summa(&self, b: &Self) -> Result<usize> {
        self.check_summa(b)?;

        let grid = &self.grid;
        let a_counts: Vec<usize> = (0..self.local.n_cols).map(|j| self.local.col_nnz(j)).collect();

        let mut flops = 0;
        for k in 0..grid.grid_rows() {
            let counts = grid
                .row_world()
                .broadcast_vec((grid.my_col() == k).then(|| a_counts.clone()), k)?;
            let rows = grid
                .col_world()
                .broadcast_vec((grid.my_row() == k).then(|| b.local.row_idx.clone()), k)?;
            flops += rows.iter().map(|&r| counts[r]).sum::<usize>();
        }
        Ok(flops)
    }
}

/// Block offsets `(row, col)` of my block of an `m × n` matrix under the
/// block distribution
pub(crate) fn block_offsets(grid: &CommGrid, m: usize, n: usize) -> (usize, usize) {
    (
        block_extent(m, grid.grid_rows(), grid.my_row()).start,
        block_extent(n, grid.grid_cols(), grid.my_col()).start,
    )
}
