//! MPI backend over rsmpi communicators
//!
//! Requires the `mpi` feature and an MPI installation. The caller keeps the
//! universe returned by `mpi::initialize()` alive for as long as any [`Comm`]
//! built on it is in use.
//!
//! [`Comm`]: crate::comm::Comm

use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::{Color, SimpleCommunicator};
use mpi::traits::*;
use mpi::Count;

use crate::comm::{Payload, ReduceOp};
use crate::error::{Error, Result};

impl ReduceOp {
    fn system(self) -> SystemOperation {
        match self {
            ReduceOp::Sum => SystemOperation::sum(),
            ReduceOp::Max => SystemOperation::max(),
            ReduceOp::Min => SystemOperation::min(),
        }
    }
}

/// Offsets of every peer's piece inside a concatenated buffer
fn displacements(counts: &[Count]) -> Vec<Count> {
    counts
        .iter()
        .scan(0, |acc, &x| {
            let offset = *acc;
            *acc += x;
            Some(offset)
        })
        .collect()
}

fn to_counts(counts: &[usize]) -> Vec<Count> {
    counts.iter().map(|&c| c as Count).collect()
}

pub(crate) fn all_to_all<T: Payload>(comm: &SimpleCommunicator, items: &[T]) -> Vec<T> {
    let mut received = vec![T::default(); comm.size() as usize];
    comm.all_to_all_into(items, &mut received[..]);
    received
}

pub(crate) fn all_to_all_varcount<T: Payload>(
    comm: &SimpleCommunicator,
    data: &[T],
    counts: &[usize],
    recv_counts: &[usize],
) -> Vec<T> {
    let counts = to_counts(counts);
    let recv_counts = to_counts(recv_counts);
    let displs = displacements(&counts);
    let recv_displs = displacements(&recv_counts);

    let total: Count = recv_counts.iter().sum();
    let mut received = vec![T::default(); total as usize];
    {
        let send_partition = Partition::new(data, &counts[..], &displs[..]);
        let mut recv_partition =
            PartitionMut::new(&mut received[..], &recv_counts[..], &recv_displs[..]);
        comm.all_to_all_varcount_into(&send_partition, &mut recv_partition);
    }
    received
}

pub(crate) fn all_gather<T: Payload>(comm: &SimpleCommunicator, value: T) -> Vec<T> {
    let mut gathered = vec![T::default(); comm.size() as usize];
    comm.all_gather_into(&value, &mut gathered[..]);
    gathered
}

pub(crate) fn all_gather_varcount<T: Payload>(
    comm: &SimpleCommunicator,
    local: &[T],
    counts: &[usize],
) -> Vec<T> {
    let counts = to_counts(counts);
    let displs = displacements(&counts);

    let total: Count = counts.iter().sum();
    let mut gathered = vec![T::default(); total as usize];
    {
        let mut partition = PartitionMut::new(&mut gathered[..], &counts[..], &displs[..]);
        comm.all_gather_varcount_into(local, &mut partition);
    }
    gathered
}

pub(crate) fn all_reduce<T: Payload>(comm: &SimpleCommunicator, value: T, op: ReduceOp) -> T {
    let mut reduced = value;
    comm.all_reduce_into(&value, &mut reduced, op.system());
    reduced
}

/// The root announces whether it has a value and its length, then the data
/// follows
pub(crate) fn broadcast_vec<T: Payload>(
    comm: &SimpleCommunicator,
    value: Option<Vec<T>>,
    root: usize,
) -> Result<Vec<T>> {
    let root_process = comm.process_at_rank(root as i32);

    let mut header = match &value {
        Some(data) => [1usize, data.len()],
        None => [0, 0],
    };
    root_process.broadcast_into(&mut header[..]);
    if header[0] == 0 {
        return Err(Error::MissingRootValue { root });
    }

    let mut data = value.unwrap_or_else(|| vec![T::default(); header[1]]);
    if header[1] > 0 {
        root_process.broadcast_into(&mut data[..]);
    }
    Ok(data)
}

pub(crate) fn split(
    comm: &SimpleCommunicator,
    color: usize,
    key: usize,
) -> Result<SimpleCommunicator> {
    comm.split_by_color_with_key(Color::with_value(color as i32), key as i32)
        .ok_or(Error::SplitFailed { color })
}
