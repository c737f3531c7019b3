//! Parallel multiway merge with coordinate coalescing
//!
//! Combines several (column, row)-sorted tuple lists into one sorted list in
//! which every coordinate appears once, equal coordinates folded with the
//! semiring's `add`.

use itertools::kmerge_by;
use log::debug;
use rayon::prelude::*;

use crate::matrix::{SpTuples, Triplet};
use crate::semiring::Semiring;

/// Merges sorted, internally deduplicated tuple lists
///
/// # Arguments
///
/// * `lists` - Tuple lists, each sorted by (column, row) without duplicates
/// * `n_workers` - Number of ranges the coalescing pass is split into
///
/// # Returns
///
/// One list sorted by (column, row) with no duplicate coordinate
pub fn multiway_merge<SR, T>(lists: Vec<Vec<Triplet<T>>>, n_workers: usize) -> Vec<Triplet<T>>
where
    SR: Semiring<T>,
    T: Copy + Send + Sync,
{
    let n_lists = lists.len();
    let total: usize = lists.iter().map(Vec::len).sum();

    // 1. k-way merge into one globally sorted sequence
    let mut merged: Vec<Triplet<T>> = Vec::with_capacity(total);
    merged.extend(kmerge_by(lists, |x: &Triplet<T>, y: &Triplet<T>| {
        (x.1, x.0) < (y.1, y.0)
    }));

    // 2. Coalesce every fixed range in parallel
    let n_workers = n_workers.max(1);
    let per_worker = total / n_workers;
    let mut ranges: Vec<&mut [Triplet<T>]> = Vec::with_capacity(n_workers);
    let mut rest = merged.as_mut_slice();
    for t in 0..n_workers {
        let len = if t == n_workers - 1 { rest.len() } else { per_worker };
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        ranges.push(head);
        rest = tail;
    }
    let kept: Vec<usize> = ranges
        .into_par_iter()
        .map(|range| coalesce_range::<SR, T>(range))
        .collect();

    let mut start: Vec<usize> = (0..n_workers).map(|t| t * per_worker).collect();
    let end: Vec<usize> = start.iter().zip(&kept).map(|(&s, &k)| s + k).collect();

    // 3. Fold duplicates straddling range boundaries, last boundary first
    for t in (1..n_workers).rev() {
        if end[t] > start[t] && end[t - 1] > start[t - 1] {
            let tail = end[t - 1] - 1;
            let head = start[t];
            if merged[tail].0 == merged[head].0 && merged[tail].1 == merged[head].1 {
                merged[tail].2 = SR::add(&merged[tail].2, &merged[head].2);
                start[t] += 1;
            }
        }
    }

    // 4. Compact into a right-sized buffer
    let size: usize = start.iter().zip(&end).map(|(&s, &e)| e - s).sum();
    let mut out = Vec::with_capacity(size);
    for t in 0..n_workers {
        out.extend_from_slice(&merged[start[t]..end[t]]);
    }

    debug!("multiway merge: {} lists, {} entries reduced to {}", n_lists, total, size);
    out
}

/// Merges shaped tuple lists that all describe blocks of the same shape
///
/// # Panics
///
/// Panics if the shapes differ.
pub fn merge_tuples<SR, T>(
    parts: Vec<SpTuples<T>>,
    n_rows: usize,
    n_cols: usize,
    n_workers: usize,
) -> SpTuples<T>
where
    SR: Semiring<T>,
    T: Copy + Send + Sync,
{
    let lists = parts
        .into_iter()
        .map(|part| {
            assert_eq!(
                (part.n_rows, part.n_cols),
                (n_rows, n_cols),
                "Merged tuple lists must share one shape"
            );
            part.tuples
        })
        .collect();

    SpTuples::new(n_rows, n_cols, multiway_merge::<SR, T>(lists, n_workers))
}

/// Folds adjacent equal coordinates with a trailing write cursor
///
/// Returns the number of entries kept at the front of `range`.
fn coalesce_range<SR, T>(range: &mut [Triplet<T>]) -> usize
where
    SR: Semiring<T>,
    T: Copy,
{
    if range.is_empty() {
        return 0;
    }

    let mut cursor = 0;
    for i in 1..range.len() {
        if range[i].0 == range[cursor].0 && range[i].1 == range[cursor].1 {
            range[cursor].2 = SR::add(&range[cursor].2, &range[i].2);
        } else {
            cursor += 1;
            range[cursor] = range[i];
        }
    }
    cursor + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semiring::PlusTimes;

    #[test]
    fn test_merge_and_coalesce() {
        let lists = vec![
            vec![(0, 0, 1), (2, 0, 1), (1, 1, 1)],
            vec![(2, 0, 5), (1, 1, 2), (0, 2, 3)],
            vec![],
        ];
        let merged = multiway_merge::<PlusTimes, i64>(lists, 2);
        assert_eq!(merged, vec![(0, 0, 1), (2, 0, 6), (1, 1, 3), (0, 2, 3)]);
    }

    #[test]
    fn test_duplicates_straddling_every_boundary() {
        // One coordinate repeated across all worker ranges
        let lists: Vec<Vec<(usize, usize, i64)>> = (0..8).map(|_| vec![(3, 3, 1)]).collect();
        for workers in 1..10 {
            let merged = multiway_merge::<PlusTimes, i64>(lists.clone(), workers);
            assert_eq!(merged, vec![(3, 3, 8)], "workers = {}", workers);
        }
    }

    #[test]
    fn test_coalesce_range() {
        let mut range = vec![(0, 0, 1), (0, 0, 2), (1, 0, 3), (1, 0, 4), (0, 1, 5)];
        let kept = coalesce_range::<PlusTimes, i64>(&mut range);
        assert_eq!(kept, 3);
        assert_eq!(&range[..kept], &[(0, 0, 3), (1, 0, 7), (0, 1, 5)]);
    }

    #[test]
    fn test_merge_tuples_keeps_shape() {
        let parts = vec![
            SpTuples::new(4, 2, vec![(1, 0, 1.0)]),
            SpTuples::new(4, 2, vec![(1, 0, 2.0), (3, 1, 1.0)]),
        ];
        let merged = merge_tuples::<PlusTimes, f64>(parts, 4, 2, 3);
        assert_eq!((merged.n_rows, merged.n_cols), (4, 2));
        assert_eq!(merged.tuples, vec![(1, 0, 3.0), (3, 1, 1.0)]);
    }
}
