//! Structural operations on local blocks: split, concatenate, transpose, accumulate

use num_traits::Num;
use std::ops::AddAssign;

use crate::matrix::SparseMatrixCSC;
use crate::semiring::{PlusTimes, Semiring};

impl<T: Copy> SparseMatrixCSC<T> {
    /// Splits the columns into `n_chunks` contiguous pieces
    ///
    /// Every piece gets `n_cols / n_chunks` columns and the last piece absorbs
    /// the remainder. Pieces keep the full row count.
    pub fn col_split(&self, n_chunks: usize) -> Vec<Self> {
        assert!(n_chunks > 0, "Can not split into zero chunks");
        let per = self.n_cols / n_chunks;
        let mut divisions = vec![per; n_chunks];
        divisions[n_chunks - 1] = self.n_cols - per * (n_chunks - 1);
        self.col_split_by(&divisions)
    }

    /// Splits the columns at explicit boundaries
    ///
    /// # Arguments
    ///
    /// * `divisions` - Column count of each piece, in order; must sum to `n_cols`
    pub fn col_split_by(&self, divisions: &[usize]) -> Vec<Self> {
        assert_eq!(
            divisions.iter().sum::<usize>(),
            self.n_cols,
            "Column divisions must cover all columns"
        );

        let mut pieces = Vec::with_capacity(divisions.len());
        let mut first = 0;
        for &width in divisions {
            pieces.push(self.col_slice(first, first + width));
            first += width;
        }
        pieces
    }

    /// Copies columns `[first, last)` into a new block
    pub fn col_slice(&self, first: usize, last: usize) -> Self {
        let start = self.col_ptr[first];
        let end = self.col_ptr[last];
        let col_ptr = self.col_ptr[first..=last].iter().map(|&p| p - start).collect();

        Self::new(
            self.n_rows,
            last - first,
            col_ptr,
            self.row_idx[start..end].to_vec(),
            self.values[start..end].to_vec(),
        )
    }

    /// Places blocks side by side
    ///
    /// The result has the maximum row count of the pieces and the sum of their
    /// column counts, so `0 × 0` placeholders contribute nothing.
    pub fn col_concatenate(blocks: Vec<Self>) -> Self {
        let n_rows = blocks.iter().map(|b| b.n_rows).max().unwrap_or(0);
        let n_cols = blocks.iter().map(|b| b.n_cols).sum();
        let nnz = blocks.iter().map(|b| b.nnz()).sum();

        let mut col_ptr = Vec::with_capacity(n_cols + 1);
        let mut row_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        col_ptr.push(0);

        for block in blocks {
            let offset = row_idx.len();
            col_ptr.extend(block.col_ptr[1..].iter().map(|&p| p + offset));
            row_idx.extend(block.row_idx);
            values.extend(block.values);
        }

        Self::new(n_rows, n_cols, col_ptr, row_idx, values)
    }

    /// Splits the rows at explicit boundaries
    pub fn row_split_by(&self, divisions: &[usize]) -> Vec<Self> {
        self.transpose()
            .col_split_by(divisions)
            .into_iter()
            .map(|piece| piece.transpose())
            .collect()
    }

    /// Splits the rows into `n_chunks` pieces, the last absorbing the remainder
    pub fn row_split(&self, n_chunks: usize) -> Vec<Self> {
        self.transpose()
            .col_split(n_chunks)
            .into_iter()
            .map(|piece| piece.transpose())
            .collect()
    }

    /// Stacks blocks on top of each other
    pub fn row_concatenate(blocks: Vec<Self>) -> Self {
        let transposed = blocks.into_iter().map(|b| b.transpose()).collect();
        Self::col_concatenate(transposed).transpose()
    }

    /// Returns the transposed block
    pub fn transpose(&self) -> Self {
        // Count non-zeros per row, these become the new columns
        let mut col_ptr = vec![0; self.n_rows + 1];
        for &row in &self.row_idx {
            col_ptr[row + 1] += 1;
        }
        for i in 0..self.n_rows {
            col_ptr[i + 1] += col_ptr[i];
        }

        let nnz = self.nnz();
        let mut row_idx = vec![0; nnz];
        let mut values = Vec::with_capacity(nnz);
        let mut slots: Vec<Option<T>> = vec![None; nnz];
        let mut next = col_ptr.clone();

        // Walking columns in order keeps the new rows sorted
        for j in 0..self.n_cols {
            for (i, &val) in self.col_iter(j) {
                let pos = next[i];
                row_idx[pos] = j;
                slots[pos] = Some(val);
                next[i] += 1;
            }
        }
        values.extend(slots.into_iter().flatten());

        Self::new(self.n_cols, self.n_rows, col_ptr, row_idx, values)
    }

    /// Elementwise accumulation `self += other` under a semiring's `add`
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn add_assign_with<SR: Semiring<T>>(&mut self, other: &Self) {
        assert_eq!(
            (self.n_rows, self.n_cols),
            (other.n_rows, other.n_cols),
            "Elementwise accumulation needs matching shapes"
        );
        if other.is_zero() {
            return;
        }

        let nnz = self.nnz() + other.nnz();
        let mut col_ptr = Vec::with_capacity(self.n_cols + 1);
        let mut row_idx = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);
        col_ptr.push(0);

        for j in 0..self.n_cols {
            let mut lhs = self.col_iter(j).peekable();
            let mut rhs = other.col_iter(j).peekable();

            loop {
                match (lhs.peek(), rhs.peek()) {
                    (Some(&(ri, lv)), Some(&(rj, rv))) => {
                        if ri == rj {
                            row_idx.push(ri);
                            values.push(SR::add(lv, rv));
                            lhs.next();
                            rhs.next();
                        } else if ri < rj {
                            row_idx.push(ri);
                            values.push(*lv);
                            lhs.next();
                        } else {
                            row_idx.push(rj);
                            values.push(*rv);
                            rhs.next();
                        }
                    }
                    (Some(&(ri, lv)), None) => {
                        row_idx.push(ri);
                        values.push(*lv);
                        lhs.next();
                    }
                    (None, Some(&(rj, rv))) => {
                        row_idx.push(rj);
                        values.push(*rv);
                        rhs.next();
                    }
                    (None, None) => break,
                }
            }

            col_ptr.push(row_idx.len());
        }

        self.col_ptr = col_ptr;
        self.row_idx = row_idx;
        self.values = values;
    }

    /// Drops every entry whose value fails `keep`, in place
    pub fn retain<F: Fn(&T) -> bool>(&mut self, keep: F) {
        let mut write = 0;
        let mut start = 0;
        for j in 0..self.n_cols {
            let end = self.col_ptr[j + 1];
            for pos in start..end {
                if keep(&self.values[pos]) {
                    self.row_idx[write] = self.row_idx[pos];
                    self.values[write] = self.values[pos];
                    write += 1;
                }
            }
            start = end;
            self.col_ptr[j + 1] = write;
        }
        self.row_idx.truncate(write);
        self.values.truncate(write);
    }
}

impl<T: Copy + Num> AddAssign<&SparseMatrixCSC<T>> for SparseMatrixCSC<T> {
    fn add_assign(&mut self, other: &SparseMatrixCSC<T>) {
        self.add_assign_with::<PlusTimes>(other);
    }
}
