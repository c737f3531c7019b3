//! In-process cluster launcher

use log::debug;
use std::thread;

use crate::comm::mesh::mesh;
use crate::comm::Comm;
use crate::error::{Error, Result};

/// Runs `f` once per process, each on its own thread with its world handle
///
/// Returns the per-process results indexed by world rank, or the first
/// [`Error::ProcessPanicked`] if any process panicked. A process that dies
/// drops its channels, so peers blocked on it observe a disconnect instead
/// of waiting forever.
///
/// # Panics
///
/// Panics if `nprocs` is zero.
pub fn launch<F, R>(nprocs: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(Comm) -> R + Sync,
    R: Send,
{
    assert!(nprocs > 0, "A cluster needs at least one process");
    debug!("launching {} processes", nprocs);

    let outcomes: Vec<thread::Result<R>> = thread::scope(|scope| {
        let handles: Vec<_> = mesh(nprocs)
            .into_iter()
            .map(|ends| {
                let f = &f;
                scope.spawn(move || f(Comm::from_mesh(ends)))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join()).collect()
    });

    outcomes
        .into_iter()
        .enumerate()
        .map(|(rank, outcome)| outcome.map_err(|_| Error::ProcessPanicked { rank }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_and_sizes() {
        let ids = launch(4, |comm| (comm.rank(), comm.size())).unwrap();
        assert_eq!(ids, vec![(0, 4), (1, 4), (2, 4), (3, 4)]);
    }

    #[test]
    fn test_panic_is_reported() {
        let result = launch(3, |comm| {
            if comm.rank() == 1 {
                panic!("boom");
            }
            comm.rank()
        });
        assert_eq!(result, Err(Error::ProcessPanicked { rank: 1 }));
    }
}
