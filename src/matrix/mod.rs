// Local sparse blocks and their structural operations

pub mod csc;
pub mod ops;
pub mod tuples;

pub use csc::SparseMatrixCSC;
pub use tuples::{SpTuples, Triplet};
