//! Pure geometry of the 2D and 3D process grids
//!
//! Everything here is a function of the grid shape alone, so ownership and
//! local extents can be computed (and tested) without any communication.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::utils::isqrt;

/// How a 3D matrix is laid out over the fiber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    /// Layers carry square sub-blocks of an underlying `(R·s) × (C·s)` 2D
    /// grid; requires a perfect-square layer count `s²`
    Special,
    /// Every layer-0 block is subdivided evenly across the layers
    Generic,
}

/// The axis along which a 3D matrix is split across the layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitAxis {
    /// Each fiber member holds a slab of rows of its layer block
    Rows,
    /// Each fiber member holds a slab of columns of its layer block
    Columns,
}

/// Position of a process in a 3D grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCoords {
    /// Layer index, equal to the rank inside the fiber
    pub layer: usize,
    /// Process row inside the layer
    pub row: usize,
    /// Process column inside the layer
    pub col: usize,
}

/// Range of indices owned by part `idx` when `total` indices are cut into
/// `parts` blocks of `total / parts`, the last block absorbing the remainder
#[inline]
pub fn block_extent(total: usize, parts: usize, idx: usize) -> Range<usize> {
    let per = total / parts;
    let start = idx * per;
    let end = if idx + 1 == parts { total } else { start + per };
    start..end
}

/// Part owning global index `g` under [`block_extent`], and the offset of
/// `g` inside that part
///
/// With a zero block size every index belongs to the last part.
#[inline]
pub fn block_owner(total: usize, parts: usize, g: usize) -> (usize, usize) {
    let per = total / parts;
    if per == 0 {
        return (parts - 1, g);
    }
    let part = (g / per).min(parts - 1);
    (part, g - part * per)
}

/// Most square factorization `rows × cols` of `n` with `rows <= cols`
pub fn square_factors(n: usize) -> (usize, usize) {
    let mut rows = isqrt(n).max(1);
    while n % rows != 0 {
        rows -= 1;
    }
    (rows, n / rows)
}

/// Shape of a 3D process grid: `layers` copies of a `rows × cols` layer grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid3DShape {
    /// Number of layers (fiber length)
    pub layers: usize,
    /// Process rows of one layer
    pub rows: usize,
    /// Process columns of one layer
    pub cols: usize,
    /// Redistribution strategy
    pub distribution: Distribution,
}

impl Grid3DShape {
    /// Derives the layer grid for `processes` processes and `layers` layers
    ///
    /// The generic layout uses the most square factorization of
    /// `processes / layers`. The special layout factors the whole world into
    /// its default 2D grid and groups it into `s × s` super blocks.
    pub fn new(processes: usize, layers: usize, distribution: Distribution) -> Result<Self> {
        if layers == 0 || processes % layers != 0 {
            return Err(Error::InvalidGrid {
                processes,
                detail: format!("{} layers", layers),
            });
        }

        let (rows, cols) = match distribution {
            Distribution::Generic => square_factors(processes / layers),
            Distribution::Special => {
                let s = isqrt(layers);
                if s * s != layers {
                    return Err(Error::InvalidLayerCount { layers });
                }
                let (rows2d, cols2d) = square_factors(processes);
                if rows2d % s != 0 || cols2d % s != 0 {
                    return Err(Error::InvalidGrid {
                        processes,
                        detail: format!(
                            "{} x {} super blocks of a {} x {} grid",
                            s, s, rows2d, cols2d
                        ),
                    });
                }
                (rows2d / s, cols2d / s)
            }
        };

        Ok(Self {
            layers,
            rows,
            cols,
            distribution,
        })
    }

    /// Total number of processes
    #[inline]
    pub fn processes(&self) -> usize {
        self.layers * self.rows * self.cols
    }

    /// Side `s` of the super blocks of the special layout (1 for generic)
    #[inline]
    pub fn sqrt_layers(&self) -> usize {
        match self.distribution {
            Distribution::Special => isqrt(self.layers),
            Distribution::Generic => 1,
        }
    }

    /// Shape of the underlying 2D grid of the special layout
    #[inline]
    pub fn grid2d(&self) -> (usize, usize) {
        let s = self.sqrt_layers();
        (self.rows * s, self.cols * s)
    }

    /// Rank of a process inside its layer, row-major
    #[inline]
    pub fn rank_in_layer(&self, coords: GridCoords) -> usize {
        coords.row * self.cols + coords.col
    }

    /// Coordinates of a world rank
    pub fn coords(&self, rank: usize) -> GridCoords {
        match self.distribution {
            Distribution::Generic => {
                let per_layer = self.rows * self.cols;
                let in_layer = rank % per_layer;
                GridCoords {
                    layer: rank / per_layer,
                    row: in_layer / self.cols,
                    col: in_layer % self.cols,
                }
            }
            Distribution::Special => {
                let s = self.sqrt_layers();
                let (_, cols2d) = self.grid2d();
                let row2d = rank / cols2d;
                let col2d = rank % cols2d;
                GridCoords {
                    layer: (col2d % s) * s + row2d % s,
                    row: row2d / s,
                    col: col2d / s,
                }
            }
        }
    }

    /// World rank of the process at `(layer, row, col)`
    pub fn rank_of(&self, layer: usize, row: usize, col: usize) -> usize {
        match self.distribution {
            Distribution::Generic => layer * self.rows * self.cols + row * self.cols + col,
            Distribution::Special => {
                let s = self.sqrt_layers();
                let (_, cols2d) = self.grid2d();
                let row2d = row * s + layer % s;
                let col2d = col * s + layer / s;
                row2d * cols2d + col2d
            }
        }
    }

    /// Owner of global entry `(grow, gcol)` of an `m × n` matrix split along
    /// `axis`, with the entry's local coordinates on that owner
    ///
    /// # Returns
    ///
    /// `(world rank, local row, local column)`
    pub fn owner(
        &self,
        m: usize,
        n: usize,
        grow: usize,
        gcol: usize,
        axis: SplitAxis,
    ) -> (usize, usize, usize) {
        match self.distribution {
            Distribution::Generic => {
                let (prow, lrow0) = block_owner(m, self.rows, grow);
                let (pcol, lcol0) = block_owner(n, self.cols, gcol);
                match axis {
                    SplitAxis::Columns => {
                        let width = block_extent(n, self.cols, pcol).len();
                        let (layer, lcol) = block_owner(width, self.layers, lcol0);
                        (self.rank_of(layer, prow, pcol), lrow0, lcol)
                    }
                    SplitAxis::Rows => {
                        let height = block_extent(m, self.rows, prow).len();
                        let (layer, lrow) = block_owner(height, self.layers, lrow0);
                        (self.rank_of(layer, prow, pcol), lrow, lcol0)
                    }
                }
            }
            Distribution::Special => {
                let s = self.sqrt_layers();
                let (rows2d, cols2d) = self.grid2d();
                let (row2d, lrow2d) = block_owner(m, rows2d, grow);
                let (col2d, lcol2d) = block_owner(n, cols2d, gcol);
                let (row, col) = (row2d / s, col2d / s);
                match axis {
                    SplitAxis::Columns => {
                        // Rows of the whole super row are stacked on the receiver
                        let width = block_extent(n, cols2d, col2d).len();
                        let (chunk, lcol) = block_owner(width, s, lcol2d);
                        let layer = (col2d % s) * s + chunk;
                        let lrow = grow - block_extent(m, rows2d, row * s).start;
                        (self.rank_of(layer, row, col), lrow, lcol)
                    }
                    SplitAxis::Rows => {
                        let height = block_extent(m, rows2d, row2d).len();
                        let (chunk, lrow) = block_owner(height, s, lrow2d);
                        let layer = (row2d % s) * s + chunk;
                        let lcol = gcol - block_extent(n, cols2d, col * s).start;
                        (self.rank_of(layer, row, col), lrow, lcol)
                    }
                }
            }
        }
    }

    /// Local extents `(rows, cols)` held by `rank` for an `m × n` matrix
    /// split along `axis`; consistent with [`Grid3DShape::owner`]
    pub fn local_dim(&self, m: usize, n: usize, rank: usize, axis: SplitAxis) -> (usize, usize) {
        let GridCoords { layer, row, col } = self.coords(rank);
        match self.distribution {
            Distribution::Generic => {
                let rows = block_extent(m, self.rows, row).len();
                let cols = block_extent(n, self.cols, col).len();
                match axis {
                    SplitAxis::Columns => (rows, block_extent(cols, self.layers, layer).len()),
                    SplitAxis::Rows => (block_extent(rows, self.layers, layer).len(), cols),
                }
            }
            Distribution::Special => {
                let s = self.sqrt_layers();
                let (rows2d, cols2d) = self.grid2d();
                let super_rows = block_extent(m, rows2d, row * s).start
                    ..block_extent(m, rows2d, row * s + s - 1).end;
                let super_cols = block_extent(n, cols2d, col * s).start
                    ..block_extent(n, cols2d, col * s + s - 1).end;
                match axis {
                    SplitAxis::Columns => {
                        let width = block_extent(n, cols2d, col * s + layer / s).len();
                        (super_rows.len(), block_extent(width, s, layer % s).len())
                    }
                    SplitAxis::Rows => {
                        let height = block_extent(m, rows2d, row * s + layer / s).len();
                        (block_extent(height, s, layer % s).len(), super_cols.len())
                    }
                }
            }
        }
    }
}
