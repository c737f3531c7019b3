//! Utilities for converting local blocks to and from sprs matrices

use crate::matrix::SparseMatrixCSC;
use sprs::CsMat;

/// Converts a local block to an sprs `CsMat` in CSC storage
pub fn to_sprs_csc<T>(matrix: &SparseMatrixCSC<T>) -> CsMat<T>
where 
    T: Copy,
{
    CsMat::new_csc(
        (matrix.n_rows, matrix.n_cols),
        matrix.col_ptr.clone(),
        matrix.row_idx.clone(),
        matrix.values.clone(),
    )
}

/// Converts any sprs `CsMat` into a local block
pub fn from_sprs_csc<T>(matrix: CsMat<T>) -> SparseMatrixCSC<T>
where
    T: Copy + Default,
{
    // Ensure matrix is in CSC format
    let matrix = if matrix.is_csc() {
        matrix
    } else {
        matrix.to_csc()
    };
    
    let shape = matrix.shape();
    let (indptr, indices, data) = matrix.into_raw_storage();
    
    SparseMatrixCSC::new(
        shape.0,
        shape.1,
        indptr,
        indices,
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_csc_roundtrip() {
        let matrix = SparseMatrixCSC::new(
            3, 3,
            vec![0, 2, 4, 5],
            vec![0, 2, 0, 1, 2],
            vec![1.0f64, 4.0, 2.0, 3.0, 5.0],
        );
        
        let sprs_mat = to_sprs_csc(&matrix);
        let roundtrip = from_sprs_csc(sprs_mat);
        
        assert_eq!(roundtrip, matrix);
    }

    #[test]
    fn test_csr_input_is_converted() {
        let matrix = SparseMatrixCSC::new(
            2, 3,
            vec![0, 1, 1, 2],
            vec![1, 0],
            vec![7i64, 9],
        );

        let csr = to_sprs_csc(&matrix).to_csr();
        assert_eq!(from_sprs_csc(csr), matrix);
    }
}
