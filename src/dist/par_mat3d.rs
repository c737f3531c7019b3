//! 3D-distributed sparse matrix and its 2D↔3D redistributions
//!
//! A 3D matrix is one 2D matrix per layer. Along the fiber, the layers share
//! out either the rows or the columns of what a single layer-0 block would
//! hold, depending on the [`SplitAxis`]. Two strategies fix where the data
//! lands ([`Distribution`]): the special one moves whole sub-blocks between
//! fiber members, the generic one routes individual triplets to their 3D
//! owner.

use log::debug;
use std::sync::Arc;

use crate::comm::{Comm, Payload, ReduceOp};
use crate::dist::par_mat::block_offsets;
use crate::dist::SpParMat;
use crate::error::{Error, Result};
use crate::exchange::{exchange_chunks, exchange_tuples};
use crate::grid::{block_extent, CommGrid, CommGrid3D, Distribution, SplitAxis};
use crate::matrix::{SpTuples, SparseMatrixCSC, Triplet};

/// A sparse matrix distributed over a 3D process grid
#[derive(Debug, Clone)]
pub struct SpParMat3D<T> {
    layer: SpParMat<T>,
    grid: Arc<CommGrid3D>,
    axis: SplitAxis,
}

/// Concatenates blocks received over the fiber along the axis opposite to
/// the one they were split on
fn stitch<T: Copy>(blocks: Vec<SparseMatrixCSC<T>>, split: SplitAxis) -> SparseMatrixCSC<T> {
    match split {
        SplitAxis::Columns => SparseMatrixCSC::row_concatenate(blocks),
        SplitAxis::Rows => SparseMatrixCSC::col_concatenate(blocks),
    }
}

fn placeholders<T: Copy>(count: usize) -> Vec<SparseMatrixCSC<T>> {
    (0..count).map(|_| SparseMatrixCSC::zeros(0, 0)).collect()
}

impl<T> SpParMat3D<T>
where
    T: Payload + Sync,
{
    /// Wraps a layer-local block that already follows the 3D layout
    pub fn from_layer(local: SparseMatrixCSC<T>, grid: Arc<CommGrid3D>, axis: SplitAxis) -> Self {
        let layer = SpParMat::new(local, Arc::clone(grid.layer_grid()));
        Self { layer, grid, axis }
    }

    /// Redistributes a block-distributed 2D matrix onto a new 3D grid
    ///
    /// Collective over the 2D matrix's world.
    pub fn from_2d(
        a: &SpParMat<T>,
        layers: usize,
        axis: SplitAxis,
        distribution: Distribution,
    ) -> Result<Self> {
        let grid = Arc::new(CommGrid3D::new(a.grid().world(), layers, distribution)?);
        Self::from_2d_on(a, grid, axis)
    }

    /// Redistributes a block-distributed 2D matrix onto an existing 3D grid
    ///
    /// The special strategy needs `a` on the `(R·s) × (C·s)` grid the 3D
    /// grid was carved from.
    pub fn from_2d_on(a: &SpParMat<T>, grid: Arc<CommGrid3D>, axis: SplitAxis) -> Result<Self> {
        match grid.distribution() {
            Distribution::Special => Self::special_from_2d(a, grid, axis),
            Distribution::Generic => Self::generic_from_2d(a, grid, axis),
        }
    }

    fn special_from_2d(a: &SpParMat<T>, grid: Arc<CommGrid3D>, axis: SplitAxis) -> Result<Self> {
        let (rows2d, cols2d) = grid.shape().grid2d();
        if a.grid().grid_rows() != rows2d || a.grid().grid_cols() != cols2d {
            return Err(Error::GridMismatch(format!(
                "special layout expects a {} x {} 2D grid, got {} x {}",
                rows2d,
                cols2d,
                a.grid().grid_rows(),
                a.grid().grid_cols()
            )));
        }

        let s = grid.shape().sqrt_layers();
        let f = grid.rank_in_fiber();
        let chunks = match axis {
            SplitAxis::Columns => a.local().col_split(s),
            SplitAxis::Rows => a.local().row_split(s),
        };

        // Chunk i of my block goes to the i-th member of my half of the fiber
        let mut send = placeholders(grid.grid_layers());
        for (i, chunk) in chunks.into_iter().enumerate() {
            let dst = match axis {
                SplitAxis::Columns => (f / s) * s + i,
                SplitAxis::Rows => (f % s) * s + i,
            };
            send[dst] = chunk;
        }

        let received = exchange_chunks(send, grid.fiber())?;
        let local = stitch(received, axis);
        debug!(
            "rank {}: special 2D to 3D gave a {} x {} layer block",
            grid.world().rank(),
            local.n_rows,
            local.n_cols
        );
        Ok(Self::from_layer(local, grid, axis))
    }

    fn generic_from_2d(a: &SpParMat<T>, grid: Arc<CommGrid3D>, axis: SplitAxis) -> Result<Self> {
        let (m, n) = (a.nrow()?, a.ncol()?);
        let (row_offset, col_offset) = block_offsets(a.grid(), m, n);
        let shape = grid.shape();

        let mut buckets: Vec<Vec<Triplet<T>>> =
            (0..shape.processes()).map(|_| Vec::new()).collect();
        for (i, j, val) in a.local().triplet_iter() {
            let (owner, lrow, lcol) = shape.owner(m, n, i + row_offset, j + col_offset, axis);
            buckets[owner].push((lrow, lcol, val));
        }

        let mut received = exchange_tuples(buckets, grid.world())?;
        received.sort_unstable_by_key(|&(row, col, _)| (col, row));
        let (rows, cols) = shape.local_dim(m, n, grid.world().rank(), axis);
        let local = SparseMatrixCSC::from_sorted_tuples(SpTuples::new(rows, cols, received));

        Ok(Self::from_layer(local, grid, axis))
    }

    /// Redistributes back onto a block-distributed 2D matrix, inverting
    /// whichever strategy built this one
    ///
    /// The 2D grid is the `(R·s) × (C·s)` grid for the special layout and the
    /// most square grid of the world otherwise. Collective over the world.
    pub fn convert_2d(&self) -> Result<SpParMat<T>> {
        match self.grid.distribution() {
            Distribution::Special => self.special_to_2d(),
            Distribution::Generic => self.generic_to_2d(),
        }
    }

    fn special_to_2d(&self) -> Result<SpParMat<T>> {
        let (m, n) = (self.nrow()?, self.ncol()?);
        let shape = self.grid.shape();
        let s = shape.sqrt_layers();
        let (rows2d, cols2d) = shape.grid2d();
        let coords = self.grid.coords();
        let f = coords.layer;
        let local = self.layer.local();

        // Cut the layer block along the 2D blocks of my super row / column
        // and hand each piece to the 2D process owning it
        let mut send = placeholders(shape.layers);
        match self.axis {
            SplitAxis::Columns => {
                let heights: Vec<usize> = (0..s)
                    .map(|k| block_extent(m, rows2d, coords.row * s + k).len())
                    .collect();
                for (k, piece) in local.row_split_by(&heights).into_iter().enumerate() {
                    send[(f / s) * s + k] = piece;
                }
            }
            SplitAxis::Rows => {
                let widths: Vec<usize> = (0..s)
                    .map(|k| block_extent(n, cols2d, coords.col * s + k).len())
                    .collect();
                for (k, piece) in local.col_split_by(&widths).into_iter().enumerate() {
                    send[k * s + f / s] = piece;
                }
            }
        }

        let received = exchange_chunks(send, self.grid.fiber())?;
        let block = match self.axis {
            SplitAxis::Columns => SparseMatrixCSC::col_concatenate(received),
            SplitAxis::Rows => SparseMatrixCSC::row_concatenate(received),
        };

        let grid2d = CommGrid::with_shape(self.grid.world().duplicate()?, rows2d, cols2d)?;
        Ok(SpParMat::new(block, Arc::new(grid2d)))
    }

    fn generic_to_2d(&self) -> Result<SpParMat<T>> {
        let (m, n) = (self.nrow()?, self.ncol()?);
        let shape = self.grid.shape();
        let coords = self.grid.coords();
        let rows = block_extent(m, shape.rows, coords.row);
        let cols = block_extent(n, shape.cols, coords.col);
        let (row_offset, col_offset) = match self.axis {
            SplitAxis::Columns => (
                rows.start,
                cols.start + block_extent(cols.len(), shape.layers, coords.layer).start,
            ),
            SplitAxis::Rows => (
                rows.start + block_extent(rows.len(), shape.layers, coords.layer).start,
                cols.start,
            ),
        };

        let grid2d = Arc::new(CommGrid::new(self.grid.world().duplicate()?)?);
        let mut buckets: Vec<Vec<Triplet<T>>> =
            (0..shape.processes()).map(|_| Vec::new()).collect();
        for (i, j, val) in self.layer.local().triplet_iter() {
            let (owner, lrow, lcol) = grid2d.owner(m, n, i + row_offset, j + col_offset);
            buckets[owner].push((lrow, lcol, val));
        }

        SpParMat::sparse_common(grid2d, m, n, buckets, |x, _| x)
    }

    /// Copy of this matrix split along `axis`
    ///
    /// Collective over the world when the axis changes.
    pub fn reshape(&self, axis: SplitAxis) -> Result<Self> {
        if axis == self.axis {
            return Ok(self.clone());
        }

        match self.grid.distribution() {
            Distribution::Special => {
                let a2d = self.convert_2d()?;
                Self::from_2d_on(&a2d, Arc::clone(&self.grid), axis)
            }
            Distribution::Generic => {
                let layers = self.grid.grid_layers();
                let chunks = match axis {
                    SplitAxis::Columns => self.layer.local().col_split(layers),
                    SplitAxis::Rows => self.layer.local().row_split(layers),
                };
                let received = exchange_chunks(chunks, self.grid.fiber())?;
                Ok(Self::from_layer(stitch(received, axis), Arc::clone(&self.grid), axis))
            }
        }
    }

    pub fn layer(&self) -> &SpParMat<T> {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut SpParMat<T> {
        &mut self.layer
    }

    /// This process's local block
    pub fn local(&self) -> &SparseMatrixCSC<T> {
        self.layer.local()
    }

    pub fn grid(&self) -> &Arc<CommGrid3D> {
        &self.grid
    }

    pub fn axis(&self) -> SplitAxis {
        self.axis
    }

    pub fn distribution(&self) -> Distribution {
        self.grid.distribution()
    }

    fn fiber(&self) -> &Comm {
        self.grid.fiber()
    }

    /// Global number of rows
    pub fn nrow(&self) -> Result<usize> {
        let rows = self.layer.nrow()?;
        match self.axis {
            SplitAxis::Rows => self.fiber().all_reduce(rows, ReduceOp::Sum),
            SplitAxis::Columns => Ok(rows),
        }
    }

    /// Global number of columns
    pub fn ncol(&self) -> Result<usize> {
        let cols = self.layer.ncol()?;
        match self.axis {
            SplitAxis::Columns => self.fiber().all_reduce(cols, ReduceOp::Sum),
            SplitAxis::Rows => Ok(cols),
        }
    }

    /// Global number of nonzeros
    pub fn nnz(&self) -> Result<usize> {
        let layer_nnz = self.layer.nnz()?;
        self.fiber().all_reduce(layer_nnz, ReduceOp::Sum)
    }

    /// Owner of global entry `(grow, gcol)` of an `m × n` matrix in this
    /// matrix's layout: `(world rank, local row, local column)`
    pub fn owner(&self, m: usize, n: usize, grow: usize, gcol: usize) -> (usize, usize, usize) {
        self.grid.shape().owner(m, n, grow, gcol, self.axis)
    }

    /// Local extents this process holds for an `m × n` matrix in this layout
    pub fn local_dim(&self, m: usize, n: usize) -> (usize, usize) {
        self.grid.shape().local_dim(m, n, self.grid.world().rank(), self.axis)
    }

    /// Column widths, per fiber member, of this process's layer block when
    /// it is redistributed column-wise across the fiber
    ///
    /// The widths sum to the local column count. Collective over my process
    /// row for the special layout.
    pub fn col_split_distribution_of_layer(&self) -> Result<Vec<usize>> {
        let shape = self.grid.shape();
        match shape.distribution {
            Distribution::Special => {
                let s = shape.sqrt_layers();
                let (_, cols2d) = shape.grid2d();
                let total = self.layer.ncol()?;
                let first = self.grid.coords().col * s;

                let mut divisions = Vec::with_capacity(shape.layers);
                for k in first..first + s {
                    let width = block_extent(total, cols2d, k).len();
                    divisions.extend((0..s).map(|j| block_extent(width, s, j).len()));
                }
                Ok(divisions)
            }
            Distribution::Generic => {
                let width = self.local().n_cols;
                Ok((0..shape.layers).map(|j| block_extent(width, shape.layers, j).len()).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::launch;

    fn sample() -> Vec<Triplet<i64>> {
        (0..7).flat_map(|i| [(i, i, i as i64 + 1), (i, (i + 3) % 7, 10)]).collect()
    }

    #[test]
    fn test_generic_dims_and_owner() {
        let results = launch(8, |comm| {
            let grid = Arc::new(CommGrid::new(comm).unwrap());
            let a = SpParMat::from_global_triplets(grid, 7, 7, &sample(), |x, y| x + y);
            let a3 = SpParMat3D::from_2d(&a, 2, SplitAxis::Columns, Distribution::Generic).unwrap();
            let dims = (a3.nrow().unwrap(), a3.ncol().unwrap(), a3.nnz().unwrap());
            let local = (a3.local().n_rows, a3.local().n_cols);
            (dims, local == a3.local_dim(7, 7))
        })
        .unwrap();

        for (dims, local_ok) in results {
            assert_eq!(dims, (7, 7, 14));
            assert!(local_ok);
        }
    }

    #[test]
    fn test_special_rejects_non_square_layers() {
        let results = launch(2, |comm| {
            let grid = Arc::new(CommGrid::new(comm).unwrap());
            let a = SpParMat::from_global_triplets(grid, 3, 3, &[(0, 0, 1)], |x, y| x + y);
            SpParMat3D::from_2d(&a, 2, SplitAxis::Rows, Distribution::Special).map(|_| ())
        })
        .unwrap();
        assert!(results.iter().all(|r| *r == Err(Error::InvalidLayerCount { layers: 2 })));
    }

    #[test]
    fn test_col_split_distribution_sums_to_local_cols() {
        let results = launch(4, |comm| {
            let grid = Arc::new(CommGrid::new(comm).unwrap());
            let a = SpParMat::from_global_triplets(grid, 7, 7, &sample(), |x, y| x + y);
            let mut sums = Vec::new();
            for dist in [Distribution::Special, Distribution::Generic] {
                let b = SpParMat3D::from_2d(&a, 4, SplitAxis::Rows, dist).unwrap();
                let divisions = b.col_split_distribution_of_layer().unwrap();
                sums.push((divisions.len(), divisions.iter().sum::<usize>(), b.local().n_cols));
            }
            sums
        })
        .unwrap();

        for sums in results {
            for (len, sum, cols) in sums {
                assert_eq!(len, 4);
                assert_eq!(sum, cols);
            }
        }
    }
}
