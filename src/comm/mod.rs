//! Process groups and their collectives
//!
//! Every process owns one [`Comm`] per group it belongs to. A group is backed
//! either by MPI (with the `mpi` feature, see [`Comm::from_mpi`]) or by an
//! in-process channel mesh whose members are threads started by [`launch`].
//! Every collective must be entered by all members of the group in the same
//! program order.
//!
//! Collectives move flat buffers of [`Payload`] values. Variable-size
//! exchanges take the per-peer counts of one concatenated send buffer, trade
//! the counts first and size the receive buffer from their prefix sum.

pub mod cluster;
mod mesh;
#[cfg(feature = "mpi")]
mod mpi_backend;

pub use cluster::launch;

use std::fmt;
use std::ops::Add;

use self::mesh::Mesh;
use crate::error::Result;

/// Plain values a collective can move
#[cfg(not(feature = "mpi"))]
pub trait Payload: Copy + Default + Send + 'static {}

#[cfg(not(feature = "mpi"))]
impl<T: Copy + Default + Send + 'static> Payload for T {}

/// Plain values a collective can move
#[cfg(feature = "mpi")]
pub trait Payload: Copy + Default + Send + 'static + ::mpi::datatype::Equivalence {}

#[cfg(feature = "mpi")]
impl<T: Copy + Default + Send + 'static + ::mpi::datatype::Equivalence> Payload for T {}

/// Reduction applied by [`Comm::all_reduce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    /// Combines two values
    pub fn apply<T: PartialOrd + Add<Output = T>>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => {
                if b > a {
                    b
                } else {
                    a
                }
            }
            ReduceOp::Min => {
                if b < a {
                    b
                } else {
                    a
                }
            }
        }
    }
}

enum Backend {
    Threads(Mesh),
    #[cfg(feature = "mpi")]
    Mpi(::mpi::topology::SimpleCommunicator),
}

/// Handle of one process on a group of processes
pub struct Comm {
    rank: usize,
    size: usize,
    backend: Backend,
}

impl Comm {
    pub(crate) fn from_mesh(mesh: Mesh) -> Self {
        Self {
            rank: mesh.rank(),
            size: mesh.size(),
            backend: Backend::Threads(mesh),
        }
    }

    /// Wraps an MPI communicator, typically `universe.world()`
    #[cfg(feature = "mpi")]
    pub fn from_mpi(comm: ::mpi::topology::SimpleCommunicator) -> Self {
        use ::mpi::traits::Communicator;

        Self {
            rank: comm.rank() as usize,
            size: comm.size() as usize,
            backend: Backend::Mpi(comm),
        }
    }

    /// Rank of this process inside the group
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of members of the group
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns once every member has entered the barrier
    pub fn barrier(&self) -> Result<()> {
        match &self.backend {
            Backend::Threads(mesh) => mesh.all_gather(()).map(|_| ()),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => {
                use ::mpi::traits::CommunicatorCollectives;
                comm.barrier();
                Ok(())
            }
        }
    }

    /// Sends `items[d]` to member `d` and returns what every member sent us,
    /// indexed by source rank
    ///
    /// # Panics
    ///
    /// Panics if `items` does not hold exactly one item per member.
    pub fn all_to_all<T: Payload>(&self, items: &[T]) -> Result<Vec<T>> {
        assert_eq!(items.len(), self.size, "all_to_all needs one item per group member");

        match &self.backend {
            Backend::Threads(mesh) => mesh.all_to_all(items),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => Ok(mpi_backend::all_to_all(comm, items)),
        }
    }

    /// Payload phase of a variable-size exchange whose counts are already
    /// known on both sides
    ///
    /// `data` is the concatenation of the pieces for every member, `counts[d]`
    /// the length of member `d`'s piece, and `recv_counts[s]` what member `s`
    /// announced for us. The result is ordered by source rank.
    ///
    /// # Panics
    ///
    /// Panics if the counts do not cover every member or do not add up to
    /// `data.len()`.
    pub fn all_to_all_varcount<T: Payload>(
        &self,
        data: &[T],
        counts: &[usize],
        recv_counts: &[usize],
    ) -> Result<Vec<T>> {
        assert_eq!(counts.len(), self.size, "Send counts must cover every group member");
        assert_eq!(recv_counts.len(), self.size, "Receive counts must cover every group member");
        assert_eq!(counts.iter().sum::<usize>(), data.len(), "Send counts must cover the buffer");

        match &self.backend {
            Backend::Threads(mesh) => mesh.all_to_all_varcount(data, counts, recv_counts),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => {
                Ok(mpi_backend::all_to_all_varcount(comm, data, counts, recv_counts))
            }
        }
    }

    /// Variable-size personalized exchange
    ///
    /// The counts travel first; the returned counts tell how many items each
    /// source contributed to the returned buffer.
    pub fn all_to_all_v<T: Payload>(
        &self,
        data: &[T],
        counts: &[usize],
    ) -> Result<(Vec<usize>, Vec<T>)> {
        let recv_counts = self.all_to_all(counts)?;
        let received = self.all_to_all_varcount(data, counts, &recv_counts)?;
        Ok((recv_counts, received))
    }

    /// Gathers one value from every member on every member, indexed by rank
    pub fn all_gather<T: Payload>(&self, value: T) -> Result<Vec<T>> {
        match &self.backend {
            Backend::Threads(mesh) => mesh.all_gather(value),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => Ok(mpi_backend::all_gather(comm, value)),
        }
    }

    /// Concatenates every member's `local` buffer in rank order, on every member
    pub fn all_gather_v<T: Payload>(&self, local: &[T]) -> Result<Vec<T>> {
        let counts = self.all_gather(local.len())?;
        match &self.backend {
            Backend::Threads(mesh) => mesh.all_gather_varcount(local, &counts),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => Ok(mpi_backend::all_gather_varcount(comm, local, &counts)),
        }
    }

    /// Reduces one value per member with `op`, on every member
    ///
    /// The in-process backend folds in rank order, so the result is the same
    /// everywhere even where floating-point addition is not associative.
    pub fn all_reduce<T>(&self, value: T, op: ReduceOp) -> Result<T>
    where
        T: Payload + PartialOrd + Add<Output = T>,
    {
        match &self.backend {
            Backend::Threads(mesh) => {
                let values = mesh.all_gather(value)?;
                Ok(values.into_iter().reduce(|a, b| op.apply(a, b)).unwrap_or(value))
            }
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => Ok(mpi_backend::all_reduce(comm, value, op)),
        }
    }

    /// Copies the root's buffer to every member
    ///
    /// Only the root's argument is read. A root without a buffer makes every
    /// member return [`Error::MissingRootValue`](crate::Error::MissingRootValue).
    pub fn broadcast_vec<T: Payload>(&self, value: Option<Vec<T>>, root: usize) -> Result<Vec<T>> {
        match &self.backend {
            Backend::Threads(mesh) => mesh.broadcast_vec(value, root),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => mpi_backend::broadcast_vec(comm, value, root),
        }
    }

    /// Copies the root's value to every member
    pub fn broadcast<T: Payload>(&self, value: Option<T>, root: usize) -> Result<T> {
        let data = self.broadcast_vec(value.map(|v| vec![v]), root)?;
        Ok(data[0])
    }

    /// Splits the group into subgroups of equal `color`
    ///
    /// Members of a subgroup are ranked by `(key, rank)`.
    pub fn split(&self, color: usize, key: usize) -> Result<Comm> {
        match &self.backend {
            Backend::Threads(mesh) => mesh.split(color, key).map(Comm::from_mesh),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => mpi_backend::split(comm, color, key).map(Comm::from_mpi),
        }
    }

    /// Creates an independent group with the same members and ranks
    pub fn duplicate(&self) -> Result<Comm> {
        match &self.backend {
            Backend::Threads(mesh) => mesh.split(0, self.rank).map(Comm::from_mesh),
            #[cfg(feature = "mpi")]
            Backend::Mpi(comm) => {
                use ::mpi::traits::Communicator;
                Ok(Comm::from_mpi(comm.duplicate()))
            }
        }
    }
}

impl fmt::Debug for Comm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.backend {
            Backend::Threads(_) => "threads",
            #[cfg(feature = "mpi")]
            Backend::Mpi(_) => "mpi",
        };
        f.debug_struct("Comm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .field("backend", &backend)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn single() -> Comm {
        let mut ends = mesh::mesh(1);
        Comm::from_mesh(ends.remove(0))
    }

    #[test]
    fn test_single_member_group() {
        let comm = single();
        assert_eq!(comm.all_to_all(&[7]).unwrap(), vec![7]);
        assert_eq!(comm.all_reduce(3, ReduceOp::Sum).unwrap(), 3);
        assert_eq!(comm.broadcast(Some(2.5), 0).unwrap(), 2.5);
        assert_eq!(comm.all_gather_v(&[4u32, 5]).unwrap(), vec![4, 5]);
        let dup = comm.duplicate().unwrap();
        assert_eq!((dup.rank(), dup.size()), (0, 1));
    }

    #[test]
    fn test_reduce_ops() {
        assert_eq!(ReduceOp::Sum.apply(2, 5), 7);
        assert_eq!(ReduceOp::Max.apply(-2i64, -5), -2);
        assert_eq!(ReduceOp::Min.apply(2.0, 0.5), 0.5);
    }

    #[test]
    fn test_missing_root_buffer() {
        let comm = single();
        assert_eq!(comm.broadcast_vec::<u8>(None, 0), Err(Error::MissingRootValue { root: 0 }));
    }
}
