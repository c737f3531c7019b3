//! Utility functions and helpers

pub mod formats;

pub use formats::{from_sprs_csc, to_sprs_csc};

/// Computes an exclusive prefix sum (scan) for a vector
///
/// The result has one more element than the input; its last element is the
/// total, and `result[i]` is the offset of item `i` in a concatenated buffer.
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;
    
    result.push(0); // First element is always 0
    
    for &val in input {
        sum += val;
        result.push(sum);
    }
    
    result
}

/// Integer square root, truncating
pub fn isqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    // Correct float rounding in either direction
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}
