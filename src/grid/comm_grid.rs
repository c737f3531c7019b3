//! 2D process grid with row and column groups

use crate::comm::Comm;
use crate::error::{Error, Result};
use crate::grid::layout::{block_extent, block_owner, square_factors};

/// A `rows × cols` grid over a group, ranks laid out row-major
#[derive(Debug)]
pub struct CommGrid {
    world: Comm,
    row_world: Comm,
    col_world: Comm,
    rows: usize,
    cols: usize,
}

impl CommGrid {
    /// Builds the most square grid over `world`
    pub fn new(world: Comm) -> Result<Self> {
        let (rows, cols) = square_factors(world.size());
        Self::with_shape(world, rows, cols)
    }

    /// Builds a grid of the given shape over `world`
    ///
    /// Collective over `world`.
    pub fn with_shape(world: Comm, rows: usize, cols: usize) -> Result<Self> {
        if rows * cols != world.size() {
            return Err(Error::InvalidGrid {
                processes: world.size(),
                detail: format!("a {} x {} grid", rows, cols),
            });
        }

        let my_row = world.rank() / cols;
        let my_col = world.rank() % cols;
        let row_world = world.split(my_row, my_col)?;
        let col_world = world.split(my_col, my_row)?;

        Ok(Self {
            world,
            row_world,
            col_world,
            rows,
            cols,
        })
    }

    /// The whole grid
    pub fn world(&self) -> &Comm {
        &self.world
    }

    /// Processes of my grid row, ranked by column
    pub fn row_world(&self) -> &Comm {
        &self.row_world
    }

    /// Processes of my grid column, ranked by row
    pub fn col_world(&self) -> &Comm {
        &self.col_world
    }

    pub fn grid_rows(&self) -> usize {
        self.rows
    }

    pub fn grid_cols(&self) -> usize {
        self.cols
    }

    /// My grid row
    pub fn my_row(&self) -> usize {
        self.col_world.rank()
    }

    /// My grid column
    pub fn my_col(&self) -> usize {
        self.row_world.rank()
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Owner of global entry `(grow, gcol)` of an `m × n` matrix under the
    /// block distribution, with its local coordinates
    pub fn owner(&self, m: usize, n: usize, grow: usize, gcol: usize) -> (usize, usize, usize) {
        let (prow, lrow) = block_owner(m, self.rows, grow);
        let (pcol, lcol) = block_owner(n, self.cols, gcol);
        (prow * self.cols + pcol, lrow, lcol)
    }

    /// Extent of my block of an `m × n` matrix under the block distribution
    pub fn local_dims(&self, m: usize, n: usize) -> (usize, usize) {
        (
            block_extent(m, self.rows, self.my_row()).len(),
            block_extent(n, self.cols, self.my_col()).len(),
        )
    }
}
