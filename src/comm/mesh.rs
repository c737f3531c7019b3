//! In-process backend: one unbounded FIFO channel per ordered pair of members
//!
//! Sends never block and messages between two members arrive in the order
//! they were sent. A member that goes away drops its channel ends, so peers
//! observe [`Error::Disconnected`] instead of blocking forever.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::any::Any;

use crate::error::{Error, Result};
use crate::utils::exclusive_scan;

type Message = Box<dyn Any + Send>;

/// Channel ends of one member of an in-process group
pub(crate) struct Mesh {
    rank: usize,
    size: usize,
    /// `senders[dst]` delivers to member `dst`
    senders: Vec<Sender<Message>>,
    /// `receivers[src]` yields what member `src` sent to us
    receivers: Vec<Receiver<Message>>,
}

/// Creates the channel ends of a fresh group of `size` members, indexed by rank
pub(crate) fn mesh(size: usize) -> Vec<Mesh> {
    let mut senders: Vec<Vec<Sender<Message>>> =
        (0..size).map(|_| Vec::with_capacity(size)).collect();
    let mut receivers: Vec<Vec<Receiver<Message>>> =
        (0..size).map(|_| Vec::with_capacity(size)).collect();

    for src in 0..size {
        for dst in 0..size {
            let (tx, rx) = unbounded();
            senders[src].push(tx);
            receivers[dst].push(rx);
        }
    }

    senders
        .into_iter()
        .zip(receivers)
        .enumerate()
        .map(|(rank, (senders, receivers))| Mesh {
            rank,
            size,
            senders,
            receivers,
        })
        .collect()
}

impl Mesh {
    pub(crate) fn rank(&self) -> usize {
        self.rank
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    fn send<T: Send + 'static>(&self, dst: usize, value: T) -> Result<()> {
        self.senders[dst]
            .send(Box::new(value))
            .map_err(|_| Error::Disconnected { peer: dst })
    }

    fn recv<T: 'static>(&self, src: usize) -> Result<T> {
        let message = self.receivers[src]
            .recv()
            .map_err(|_| Error::Disconnected { peer: src })?;
        message
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| Error::PayloadType { peer: src })
    }

    pub(crate) fn all_to_all<T: Copy + Send + 'static>(&self, items: &[T]) -> Result<Vec<T>> {
        for (dst, &item) in items.iter().enumerate() {
            self.send(dst, item)?;
        }
        (0..self.size).map(|src| self.recv(src)).collect()
    }

    /// Ships `data[displs[d]..displs[d + 1]]` to member `d` and places what
    /// member `s` sent at offset `recv_displs[s]` of one receive buffer
    pub(crate) fn all_to_all_varcount<T>(
        &self,
        data: &[T],
        counts: &[usize],
        recv_counts: &[usize],
    ) -> Result<Vec<T>>
    where
        T: Copy + Default + Send + 'static,
    {
        let displs = exclusive_scan(counts);
        for dst in 0..self.size {
            self.send(dst, data[displs[dst]..displs[dst + 1]].to_vec())?;
        }

        let recv_displs = exclusive_scan(recv_counts);
        let mut received = vec![T::default(); recv_displs[self.size]];
        for src in 0..self.size {
            let piece: Vec<T> = self.recv(src)?;
            if piece.len() != recv_counts[src] {
                return Err(Error::CountMismatch {
                    peer: src,
                    expected: recv_counts[src],
                    got: piece.len(),
                });
            }
            received[recv_displs[src]..recv_displs[src + 1]].copy_from_slice(&piece);
        }
        Ok(received)
    }

    pub(crate) fn all_gather<T: Copy + Send + 'static>(&self, value: T) -> Result<Vec<T>> {
        for dst in 0..self.size {
            self.send(dst, value)?;
        }
        (0..self.size).map(|src| self.recv(src)).collect()
    }

    pub(crate) fn all_gather_varcount<T>(&self, local: &[T], counts: &[usize]) -> Result<Vec<T>>
    where
        T: Copy + Default + Send + 'static,
    {
        let recv_displs = exclusive_scan(counts);
        for dst in 0..self.size {
            self.send(dst, local.to_vec())?;
        }

        let mut gathered = vec![T::default(); recv_displs[self.size]];
        for src in 0..self.size {
            let piece: Vec<T> = self.recv(src)?;
            if piece.len() != counts[src] {
                return Err(Error::CountMismatch {
                    peer: src,
                    expected: counts[src],
                    got: piece.len(),
                });
            }
            gathered[recv_displs[src]..recv_displs[src + 1]].copy_from_slice(&piece);
        }
        Ok(gathered)
    }

    /// Only the root's `value` is read; a root without one fails every member
    pub(crate) fn broadcast_vec<T>(&self, value: Option<Vec<T>>, root: usize) -> Result<Vec<T>>
    where
        T: Clone + Send + 'static,
    {
        if self.rank == root {
            for dst in (0..self.size).filter(|&dst| dst != root) {
                self.send(dst, value.clone())?;
            }
            value.ok_or(Error::MissingRootValue { root })
        } else {
            self.recv::<Option<Vec<T>>>(root)?
                .ok_or(Error::MissingRootValue { root })
        }
    }

    /// Members of a subgroup are ranked by `(key, rank)`. The lowest ranked
    /// member builds the subgroup's channels and hands every other member its
    /// ends.
    pub(crate) fn split(&self, color: usize, key: usize) -> Result<Mesh> {
        for dst in 0..self.size {
            self.send(dst, (color, key))?;
        }
        let mut members = Vec::new();
        for src in 0..self.size {
            let (c, k): (usize, usize) = self.recv(src)?;
            if c == color {
                members.push((k, src));
            }
        }
        members.sort_unstable();

        let leader = members[0].1;
        if self.rank == leader {
            let mut ends = mesh(members.len());
            let own = ends.remove(0);
            for (&(_, peer), end) in members[1..].iter().zip(ends) {
                self.send(peer, end)?;
            }
            Ok(own)
        } else {
            self.recv::<Mesh>(leader)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_member_exchange() {
        let mut ends = mesh(1);
        let end = ends.remove(0);
        assert_eq!(end.all_to_all(&[7]).unwrap(), vec![7]);
        assert_eq!(end.all_to_all_varcount(&[1, 2, 3], &[3], &[3]).unwrap(), vec![1, 2, 3]);
        assert_eq!(end.broadcast_vec(Some(vec!["x"]), 0).unwrap(), vec!["x"]);
        let sub = end.split(0, 0).unwrap();
        assert_eq!((sub.rank(), sub.size()), (0, 1));
    }

    #[test]
    fn test_payload_type_error() {
        let mut ends = mesh(1);
        let end = ends.remove(0);
        end.send(0, 1u32).unwrap();
        assert_eq!(end.recv::<String>(0), Err(Error::PayloadType { peer: 0 }));
    }

    #[test]
    fn test_announced_count_drives_receive() {
        let mut ends = mesh(1);
        let end = ends.remove(0);
        // Two items shipped while the receiver was told to expect three
        assert_eq!(
            end.all_to_all_varcount(&[1u8, 2], &[2], &[3]),
            Err(Error::CountMismatch {
                peer: 0,
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_disconnected_peer() {
        let mut ends = mesh(2);
        let second = ends.pop().unwrap();
        drop(ends);
        assert_eq!(second.recv::<u32>(0), Err(Error::Disconnected { peer: 0 }));
    }
}
