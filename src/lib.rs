//! # spgemm3d: memory-bounded 3D distributed sparse matrix multiplication
//!
//! Sparse general matrix-matrix multiplication (SpGEMM) over a cluster of
//! cooperating processes arranged in a 3D grid, parametrized by a semiring so
//! the same engine serves numerical products and graph algorithms such as
//! breadth-first search via max-plus products.
//!
//! ## Overview
//!
//! - **Processes**: [`comm::launch`] runs a fixed group of processes, each on
//!   its own thread, talking only through [`Comm`] collectives.
//! - **Grids**: [`CommGrid`] is a 2D grid; [`CommGrid3D`] stacks layers of
//!   2D grids and ties them together with fibers.
//! - **Matrices**: [`SpParMat`] is block distributed over a 2D grid,
//!   [`SpParMat3D`] over a 3D grid with its layers sharing out the rows or
//!   the columns.
//! - **Local kernels**: a flop-balanced heap multiply and a parallel
//!   multiway merge, both on the rayon pool.
//!
//! ## Algorithm
//!
//! The phased multiply `A × B` keeps A split by columns and B by rows
//! across the fiber:
//!
//! 1. **Phase estimation**: a symbolic SUMMA pass sizes the intermediate
//!    product against the per-process memory budget.
//! 2. **Per phase**: every layer multiplies its A by one slice of its B
//!    with SUMMA, the partial products are exchanged and merged across the
//!    fiber, pruned, and accumulated into the result.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use spgemm3d::{
//!     comm, CommGrid, Distribution, MultiplyConfig, NoPrune, PlusTimes, SpParMat, SpParMat3D,
//!     SplitAxis,
//! };
//!
//! let products = comm::launch(4, |world| {
//!     let grid = Arc::new(CommGrid::new(world).unwrap());
//!     let triplets: Vec<_> = (0..6).map(|i| (i, (i + 1) % 6, 2.0)).collect();
//!     let a = SpParMat::from_global_triplets(grid, 6, 6, &triplets, |x, y| x + y);
//!
//!     let a3 = SpParMat3D::from_2d(&a, 4, SplitAxis::Columns, Distribution::Generic).unwrap();
//!     let b3 = a3.reshape(SplitAxis::Rows).unwrap();
//!     let (c, _stats) = a3
//!         .mem_efficient_spgemm::<PlusTimes, _>(&b3, &MultiplyConfig::default(), &NoPrune)
//!         .unwrap();
//!     c.nnz().unwrap()
//! })
//! .unwrap();
//!
//! assert!(products.iter().all(|&nnz| nnz == 6));
//! ```

pub mod comm;
pub mod config;
pub mod constants;
pub mod dist;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod local;
pub mod matrix;
pub mod semiring;
pub mod utils;

// Re-export primary components
pub use comm::{launch, Comm, Payload, ReduceOp};
pub use config::{MultiplyConfig, SystemParameters};
pub use dist::{
    calculate_number_of_phases, HardThreshold, MultiplyStats, NoPrune, PrunePolicy, SpParMat,
    SpParMat3D,
};
pub use error::{Error, Result};
pub use exchange::{broadcast_block, exchange_chunks, exchange_tuples, BlockProfile};
pub use grid::{CommGrid, CommGrid3D, Distribution, Grid3DShape, GridCoords, SplitAxis};
pub use local::{local_spgemm, local_spgemm_owned, local_spgemm_with, multiway_merge};
pub use matrix::{SpTuples, SparseMatrixCSC, Triplet};
pub use semiring::{MaxPlus, MinPlus, PlusTimes, SelectMax, Semiring};
pub use utils::{from_sprs_csc, to_sprs_csc};
