//! Process grids: pure layout arithmetic plus the 2D and 3D group handles

pub mod comm_grid;
pub mod comm_grid3d;
pub mod layout;

pub use comm_grid::CommGrid;
pub use comm_grid3d::CommGrid3D;
pub use layout::{
    block_extent, block_owner, square_factors, Distribution, GridCoords, Grid3DShape, SplitAxis,
};
