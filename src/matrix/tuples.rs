//! Shaped lists of coordinate triplets

/// A `(row, col, value)` coordinate triplet
pub type Triplet<T> = (usize, usize, T);

/// A list of triplets together with the shape of the block they describe
///
/// This is the output format of the local multiply and the multiway merge.
/// Producers in this crate emit tuples sorted by (column, row) with no
/// duplicate coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct SpTuples<T> {
    /// Number of rows of the described block
    pub n_rows: usize,

    /// Number of columns of the described block
    pub n_cols: usize,

    /// The nonzero entries
    pub tuples: Vec<Triplet<T>>,
}

impl<T> SpTuples<T> {
    /// Wraps a tuple list with its shape
    pub fn new(n_rows: usize, n_cols: usize, tuples: Vec<Triplet<T>>) -> Self {
        Self { n_rows, n_cols, tuples }
    }

    /// An empty list of the given shape
    pub fn empty(n_rows: usize, n_cols: usize) -> Self {
        Self::new(n_rows, n_cols, Vec::new())
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.tuples.len()
    }

    /// True when the entries are strictly increasing in (column, row)
    pub fn is_sorted(&self) -> bool {
        self.tuples
            .windows(2)
            .all(|w| (w[0].1, w[0].0) < (w[1].1, w[1].0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sorted() {
        let sorted = SpTuples::new(3, 3, vec![(2, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0)]);
        assert!(sorted.is_sorted());

        let duplicate = SpTuples::new(3, 3, vec![(0, 1, 1.0), (0, 1, 2.0)]);
        assert!(!duplicate.is_sorted());

        assert!(SpTuples::<f64>::empty(4, 4).is_sorted());
    }
}
