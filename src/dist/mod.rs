//! Distributed matrices: the 2D block-distributed matrix, the 3D matrix
//! built on top of it, and the phased 3D multiply

pub mod par_mat;
pub mod par_mat3d;
pub mod prune;
pub mod spgemm3d;

pub use par_mat::SpParMat;
pub use par_mat3d::SpParMat3D;
pub use prune::{HardThreshold, NoPrune, PrunePolicy};
pub use spgemm3d::{calculate_number_of_phases, MultiplyStats};
