//! Basic tests for local blocks, tuples and sprs conversions

use spgemm3d::{from_sprs_csc, to_sprs_csc, SpTuples, SparseMatrixCSC};

// [1 2 0]
// [0 3 0]
// [4 0 5]
fn sample() -> SparseMatrixCSC<f64> {
    SparseMatrixCSC::new(
        3,
        3,
        vec![0, 2, 4, 5],
        vec![0, 2, 0, 1, 2],
        vec![1.0, 4.0, 2.0, 3.0, 5.0],
    )
}

#[test]
fn test_matrix_creation_csc() {
    let matrix = sample();
    assert_eq!(matrix.n_rows, 3);
    assert_eq!(matrix.n_cols, 3);
    assert_eq!(matrix.nnz(), 5);

    let first_col: Vec<_> = matrix.col_iter(0).collect();
    assert_eq!(first_col, vec![(0, &1.0), (2, &4.0)]);
    assert_eq!(matrix.col_nnz(2), 1);
}

#[test]
#[should_panic]
fn test_inconsistent_arrays_panic() {
    SparseMatrixCSC::new(2, 2, vec![0, 1, 3], vec![0, 1], vec![1.0, 2.0]);
}

#[test]
fn test_tuples_round_trip() {
    let matrix = sample();
    let tuples = matrix.to_tuples();
    assert!(tuples.is_sorted());
    assert_eq!(tuples.tuples[1], (2, 0, 4.0));
    assert_eq!(SparseMatrixCSC::from_sorted_tuples(tuples), matrix);
}

#[test]
fn test_from_tuples_combines_duplicates() {
    let entries = vec![(1, 1, 2.0), (0, 0, 1.0), (1, 1, 3.0)];
    let matrix = SparseMatrixCSC::from_tuples(2, 2, entries, |x, y| x + y);
    assert_eq!(matrix.values, vec![1.0, 5.0]);
    assert_eq!(matrix.row_idx, vec![0, 1]);
}

#[test]
#[should_panic(expected = "strictly increasing")]
fn test_unsorted_tuples_panic() {
    SparseMatrixCSC::from_sorted_tuples(SpTuples::new(2, 2, vec![(1, 0, 1.0), (0, 0, 1.0)]));
}

#[test]
fn test_split_and_concatenate_with_placeholders() {
    let matrix = sample();
    let mut pieces = matrix.row_split(2);
    assert_eq!(pieces.iter().map(|p| p.n_rows).collect::<Vec<_>>(), vec![1, 2]);
    pieces.push(SparseMatrixCSC::zeros(0, 0));
    assert_eq!(SparseMatrixCSC::row_concatenate(pieces), matrix);
}

#[test]
fn test_sprs_round_trip() {
    let matrix = sample();
    let sprs_mat = to_sprs_csc(&matrix);
    assert!(sprs_mat.is_csc());
    assert_eq!(sprs_mat.get(2, 0), Some(&4.0));
    assert_eq!(sprs_mat.get(1, 0), None);

    // CSR input is converted on the way back
    let back = from_sprs_csc(sprs_mat.to_csr());
    assert_eq!(back, matrix);
}
