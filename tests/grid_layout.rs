//! Tests for the 3D ownership mapping

use std::collections::HashSet;

use spgemm3d::{Distribution, Grid3DShape, SplitAxis};

const SHAPES: [(usize, usize, Distribution); 6] = [
    (4, 4, Distribution::Special),
    (16, 4, Distribution::Special),
    (8, 4, Distribution::Special),
    (8, 2, Distribution::Generic),
    (3, 3, Distribution::Generic),
    (12, 3, Distribution::Generic),
];

const MATRICES: [(usize, usize); 5] = [(1, 1), (3, 2), (7, 7), (10, 13), (16, 16)];

#[test]
fn test_owner_is_a_bijection_onto_local_slots() {
    for &(p, layers, dist) in &SHAPES {
        let shape = Grid3DShape::new(p, layers, dist).unwrap();
        for axis in [SplitAxis::Rows, SplitAxis::Columns] {
            for &(m, n) in &MATRICES {
                let mut seen = HashSet::new();
                for grow in 0..m {
                    for gcol in 0..n {
                        let (rank, lrow, lcol) = shape.owner(m, n, grow, gcol, axis);
                        assert!(rank < p);
                        let (rows, cols) = shape.local_dim(m, n, rank, axis);
                        assert!(
                            lrow < rows && lcol < cols,
                            "{:?} {:?} p={} L={} {}x{}: ({}, {}) -> rank {} ({}, {}) outside {}x{}",
                            dist, axis, p, layers, m, n, grow, gcol, rank, lrow, lcol, rows, cols
                        );
                        assert!(seen.insert((rank, lrow, lcol)));
                    }
                }
            }
        }
    }
}

#[test]
fn test_local_dims_cover_the_matrix() {
    for &(p, layers, dist) in &SHAPES {
        let shape = Grid3DShape::new(p, layers, dist).unwrap();
        for axis in [SplitAxis::Rows, SplitAxis::Columns] {
            for &(m, n) in &MATRICES {
                let slots: usize = (0..p)
                    .map(|rank| {
                        let (rows, cols) = shape.local_dim(m, n, rank, axis);
                        rows * cols
                    })
                    .sum();
                assert_eq!(slots, m * n, "{:?} {:?} p={} L={} {}x{}", dist, axis, p, layers, m, n);
            }
        }
    }
}

#[test]
fn test_fiber_local_dims_add_up_along_the_split() {
    let shape = Grid3DShape::new(8, 2, Distribution::Generic).unwrap();
    let (m, n) = (9, 11);
    for row in 0..shape.rows {
        for col in 0..shape.cols {
            let fiber = |layer| shape.rank_of(layer, row, col);
            let widths: usize = (0..shape.layers)
                .map(|layer| shape.local_dim(m, n, fiber(layer), SplitAxis::Columns).1)
                .sum();
            let heights: usize = (0..shape.layers)
                .map(|layer| shape.local_dim(m, n, fiber(layer), SplitAxis::Rows).0)
                .sum();
            assert_eq!(widths, if col + 1 == shape.cols { n - n / 2 } else { n / 2 });
            assert_eq!(heights, if row + 1 == shape.rows { m - m / 2 } else { m / 2 });
        }
    }
}

#[test]
fn test_layer_grid_shapes() {
    let special = Grid3DShape::new(16, 4, Distribution::Special).unwrap();
    assert_eq!((special.rows, special.cols, special.grid2d()), (2, 2, (4, 4)));

    let generic = Grid3DShape::new(12, 3, Distribution::Generic).unwrap();
    assert_eq!((generic.rows, generic.cols), (2, 2));
}
