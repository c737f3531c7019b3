//! 3D process grid: layered 2D grids tied together by fibers

use std::sync::Arc;

use crate::comm::Comm;
use crate::error::Result;
use crate::grid::comm_grid::CommGrid;
use crate::grid::layout::{Distribution, Grid3DShape, GridCoords};

/// Process topology of a 3D matrix
///
/// Holds three groups: the world, the 2D grid of my layer, and my fiber
/// (the processes sharing my layer position across all layers, ranked by
/// layer). Immutable once built and shared through `Arc`.
#[derive(Debug)]
pub struct CommGrid3D {
    world: Comm,
    layer: Arc<CommGrid>,
    fiber: Comm,
    shape: Grid3DShape,
    coords: GridCoords,
}

impl CommGrid3D {
    /// Builds the 3D grid over a duplicate of `world`
    ///
    /// Collective over `world`. Fails with the same error on every member
    /// when the process count does not fit the requested layout.
    pub fn new(world: &Comm, layers: usize, distribution: Distribution) -> Result<Self> {
        let shape = Grid3DShape::new(world.size(), layers, distribution)?;
        let coords = shape.coords(world.rank());
        let rank_in_layer = shape.rank_in_layer(coords);

        let world = world.duplicate()?;
        let layer_comm = world.split(coords.layer, rank_in_layer)?;
        let fiber = world.split(rank_in_layer, coords.layer)?;
        let layer = Arc::new(CommGrid::with_shape(layer_comm, shape.rows, shape.cols)?);

        Ok(Self {
            world,
            layer,
            fiber,
            shape,
            coords,
        })
    }

    pub fn world(&self) -> &Comm {
        &self.world
    }

    /// The 2D grid of my layer
    pub fn layer_grid(&self) -> &Arc<CommGrid> {
        &self.layer
    }

    /// My fiber, ranked by layer
    pub fn fiber(&self) -> &Comm {
        &self.fiber
    }

    pub fn shape(&self) -> &Grid3DShape {
        &self.shape
    }

    pub fn coords(&self) -> GridCoords {
        self.coords
    }

    pub fn distribution(&self) -> Distribution {
        self.shape.distribution
    }

    pub fn grid_layers(&self) -> usize {
        self.shape.layers
    }

    pub fn grid_rows(&self) -> usize {
        self.shape.rows
    }

    pub fn grid_cols(&self) -> usize {
        self.shape.cols
    }

    pub fn rank_in_fiber(&self) -> usize {
        self.fiber.rank()
    }

    pub fn rank_in_layer(&self) -> usize {
        self.layer.world().rank()
    }

    /// World rank of the process at `(layer, row, col)`
    pub fn rank_of(&self, layer: usize, row: usize, col: usize) -> usize {
        self.shape.rank_of(layer, row, col)
    }
}
