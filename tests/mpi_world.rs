//! Phased multiply over the MPI world communicator.
//!
//! Runs on any square world size, e.g. `mpirun -n 4 cargo test --features mpi --test mpi_world`.

#![cfg(feature = "mpi")]

use std::sync::Arc;

use spgemm3d::{
    to_sprs_csc, Comm, CommGrid, Distribution, MultiplyConfig, NoPrune, PlusTimes, ReduceOp,
    SpParMat, SpParMat3D, SparseMatrixCSC, SplitAxis, Triplet,
};

fn pattern(n: usize, seed: usize) -> Vec<Triplet<i64>> {
    let mut triplets = Vec::new();
    for j in 0..n {
        for i in 0..n {
            if (i * 3 + j * 5 + seed) % 4 == 0 {
                triplets.push((i, j, ((i + j + seed) % 5 + 1) as i64));
            }
        }
    }
    triplets
}

#[test]
fn test_world_multiply_matches_sprs() {
    let universe = mpi::initialize().expect("failed to initialize MPI");
    let world = Comm::from_mpi(universe.world());
    let size = world.size();
    assert_eq!(world.all_reduce(1usize, ReduceOp::Sum).unwrap(), size);

    let n = 12;
    let (a_triplets, b_triplets) = (pattern(n, 0), pattern(n, 1));
    let grid = Arc::new(CommGrid::new(world).unwrap());
    let a = SpParMat::from_global_triplets(Arc::clone(&grid), n, n, &a_triplets, |x, y| x + y);
    let b = SpParMat::from_global_triplets(grid, n, n, &b_triplets, |x, y| x + y);

    let a3 = SpParMat3D::from_2d(&a, 1, SplitAxis::Columns, Distribution::Generic).unwrap();
    let b3 = SpParMat3D::from_2d_on(&b, Arc::clone(a3.grid()), SplitAxis::Rows).unwrap();
    let config = MultiplyConfig::with_phases(2);
    let (c, stats) = a3.mem_efficient_spgemm::<PlusTimes, _>(&b3, &config, &NoPrune).unwrap();
    assert!(stats.phases >= 2);

    let mut found = c.convert_2d().unwrap().find().unwrap().tuples;
    found.sort_by_key(|&(i, j, _)| (j, i));

    let a = SparseMatrixCSC::from_tuples(n, n, a_triplets, |x, y| x + y);
    let b = SparseMatrixCSC::from_tuples(n, n, b_triplets, |x, y| x + y);
    let product = (&to_sprs_csc(&a) * &to_sprs_csc(&b)).to_csc();
    let mut expected: Vec<Triplet<i64>> = product.iter().map(|(&v, (i, j))| (i, j, v)).collect();
    expected.sort_by_key(|&(i, j, _)| (j, i));
    assert_eq!(found, expected);
}
