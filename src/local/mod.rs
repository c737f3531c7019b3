//! Single-process kernels: the flop-balanced heap multiply and the multiway merge
//!
//! Both kernels run fork-join regions on the rayon pool. Work is partitioned
//! once per region from a static estimate; workers only touch their own
//! scratch and output ranges.

pub mod balance;
pub mod heap;
pub mod merge;

pub use balance::{column_costs, partition_by_flops, worker_loads};
pub use heap::{local_spgemm, local_spgemm_owned, local_spgemm_with};
pub use merge::{merge_tuples, multiway_merge};
