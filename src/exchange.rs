//! Variable-size all-to-all exchanges of triplets and whole blocks
//!
//! Both exchanges follow the same two-phase protocol: every member first
//! announces what it is about to send (a count or a block profile), then the
//! payload travels as one concatenated buffer per coordinate array whose
//! receive partition is the prefix sum of the announced counts.

use log::debug;

use crate::comm::{Comm, Payload};
use crate::error::Result;
use crate::matrix::{SparseMatrixCSC, Triplet};

/// Shape and size of one block announced ahead of its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockProfile {
    /// Stored entries
    pub nnz: usize,
    /// Rows of the block
    pub n_rows: usize,
    /// Columns of the block
    pub n_cols: usize,
}

impl BlockProfile {
    /// Profile of an existing block
    pub fn of<T: Copy>(block: &SparseMatrixCSC<T>) -> Self {
        Self {
            nnz: block.nnz(),
            n_rows: block.n_rows,
            n_cols: block.n_cols,
        }
    }

    fn to_words(self) -> [usize; 3] {
        [self.nnz, self.n_rows, self.n_cols]
    }

    fn from_words(words: &[usize]) -> Self {
        Self {
            nnz: words[0],
            n_rows: words[1],
            n_cols: words[2],
        }
    }
}

/// Coordinate arrays of a triplet list, in list order
struct Columns<T> {
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
}

impl<T: Copy> Columns<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, (row, col, value): Triplet<T>) {
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    fn into_triplets(self) -> Vec<Triplet<T>> {
        self.rows
            .into_iter()
            .zip(self.cols)
            .zip(self.values)
            .map(|((row, col), value)| (row, col, value))
            .collect()
    }
}

/// Ships the coordinate arrays with counts both sides already agree on
fn ship<T: Payload>(
    send: &Columns<T>,
    counts: &[usize],
    recv_counts: &[usize],
    comm: &Comm,
) -> Result<Columns<T>> {
    Ok(Columns {
        rows: comm.all_to_all_varcount(&send.rows, counts, recv_counts)?,
        cols: comm.all_to_all_varcount(&send.cols, counts, recv_counts)?,
        values: comm.all_to_all_varcount(&send.values, counts, recv_counts)?,
    })
}

/// Sends `buckets[d]` to member `d` and returns everything received as one
/// buffer, ordered by source rank
///
/// # Panics
///
/// Panics if there is not exactly one bucket per group member.
pub fn exchange_tuples<T: Payload>(
    buckets: Vec<Vec<Triplet<T>>>,
    comm: &Comm,
) -> Result<Vec<Triplet<T>>> {
    let counts: Vec<usize> = buckets.iter().map(Vec::len).collect();
    let mut send = Columns::with_capacity(counts.iter().sum());
    for triplet in buckets.into_iter().flatten() {
        send.push(triplet);
    }

    // 1. Counts, 2. the concatenated coordinate arrays
    let recv_counts = comm.all_to_all(&counts)?;
    let received = ship(&send, &counts, &recv_counts, comm)?.into_triplets();

    debug!(
        "rank {}: exchanged tuples, sent {} received {}",
        comm.rank(),
        send.rows.len(),
        received.len()
    );
    Ok(received)
}

/// Sends block `chunks[d]` to member `d` and returns the blocks received,
/// ordered by source rank
///
/// Blocks travel as triplets in chunk-local coordinates behind a profile per
/// block. Every received block has exactly the shape its sender declared, so
/// empty placeholders arrive as empty blocks of the right size.
///
/// # Panics
///
/// Panics if there is not exactly one chunk per group member.
pub fn exchange_chunks<T: Payload>(
    chunks: Vec<SparseMatrixCSC<T>>,
    comm: &Comm,
) -> Result<Vec<SparseMatrixCSC<T>>> {
    assert_eq!(chunks.len(), comm.size(), "exchange_chunks needs one chunk per group member");

    // 1. Profiles travel first, three words per block
    let words: Vec<usize> = chunks
        .iter()
        .flat_map(|chunk| BlockProfile::of(chunk).to_words())
        .collect();
    let (_, received_words) = comm.all_to_all_v(&words, &vec![3; comm.size()])?;
    let profiles: Vec<BlockProfile> = received_words
        .chunks_exact(3)
        .map(BlockProfile::from_words)
        .collect();

    // 2. Then the entries, column-major within every block
    let counts: Vec<usize> = chunks.iter().map(SparseMatrixCSC::nnz).collect();
    let recv_counts: Vec<usize> = profiles.iter().map(|profile| profile.nnz).collect();
    let mut send = Columns::with_capacity(counts.iter().sum());
    for chunk in &chunks {
        chunk.triplet_iter().for_each(|triplet| send.push(triplet));
    }
    drop(chunks);
    let mut received = ship(&send, &counts, &recv_counts, comm)?.into_triplets().into_iter();

    // 3. Rebuild every block with its declared shape; the receive buffer is
    // partitioned by the announced entry counts
    let blocks = profiles
        .into_iter()
        .map(|profile| assemble_block(profile, received.by_ref().take(profile.nnz).collect()))
        .collect();
    Ok(blocks)
}

/// Rebuilds a block from its entries in the column-major order they were
/// sent in, keeping the row order inside every column
fn assemble_block<T: Copy>(profile: BlockProfile, tuples: Vec<Triplet<T>>) -> SparseMatrixCSC<T> {
    let mut col_ptr = vec![0; profile.n_cols + 1];
    let mut row_idx = Vec::with_capacity(tuples.len());
    let mut values = Vec::with_capacity(tuples.len());

    for (row, col, value) in tuples {
        assert!(
            col < profile.n_cols,
            "Column index {} out of bounds (n_cols = {})",
            col,
            profile.n_cols
        );
        col_ptr[col + 1] += 1;
        row_idx.push(row);
        values.push(value);
    }
    for j in 0..profile.n_cols {
        col_ptr[j + 1] += col_ptr[j];
    }

    SparseMatrixCSC::new(profile.n_rows, profile.n_cols, col_ptr, row_idx, values)
}

/// Copies the root's block to every member of `comm`
///
/// Only the root's `block` is read.
pub fn broadcast_block<T: Payload>(
    block: Option<&SparseMatrixCSC<T>>,
    root: usize,
    comm: &Comm,
) -> Result<SparseMatrixCSC<T>> {
    let shape = comm.broadcast_vec(block.map(|b| vec![b.n_rows, b.n_cols]), root)?;
    let col_ptr = comm.broadcast_vec(block.map(|b| b.col_ptr.clone()), root)?;
    let row_idx = comm.broadcast_vec(block.map(|b| b.row_idx.clone()), root)?;
    let values = comm.broadcast_vec(block.map(|b| b.values.clone()), root)?;
    Ok(SparseMatrixCSC::new(shape[0], shape[1], col_ptr, row_idx, values))
}
