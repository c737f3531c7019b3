//! Tests for the in-process cluster and its collectives

use spgemm3d::{comm, Error, ReduceOp};

#[test]
fn test_collectives() {
    let results = comm::launch(5, |world| {
        let me = world.rank();
        let sum = world.all_reduce(me, ReduceOp::Sum).unwrap();
        let max = world.all_reduce(me as i64 - 2, ReduceOp::Max).unwrap();
        let gathered = world.all_gather(me * 10).unwrap();
        let root_value = world.broadcast((me == 3).then_some(0.25), 3).unwrap();
        let personal = world.all_to_all(&(0..5).map(|d| me * 100 + d).collect::<Vec<_>>()).unwrap();
        world.barrier().unwrap();
        (sum, max, gathered, root_value, personal)
    })
    .unwrap();

    for (rank, (sum, max, gathered, root_value, personal)) in results.into_iter().enumerate() {
        assert_eq!(sum, 10);
        assert_eq!(max, 2);
        assert_eq!(gathered, vec![0, 10, 20, 30, 40]);
        assert_eq!(root_value, 0.25);
        assert_eq!(personal, (0..5).map(|src| src * 100 + rank).collect::<Vec<_>>());
    }
}

#[test]
fn test_all_to_all_v() {
    let results = comm::launch(3, |world| {
        let me = world.rank();
        // Member `d` gets `d` copies of the sender's rank
        let data: Vec<usize> = (0..3).flat_map(|d| vec![me; d]).collect();
        world.all_to_all_v(&data, &[0, 1, 2]).unwrap()
    })
    .unwrap();

    assert_eq!(results[0], (vec![0, 0, 0], vec![]));
    assert_eq!(results[1], (vec![1, 1, 1], vec![0, 1, 2]));
    assert_eq!(results[2], (vec![2, 2, 2], vec![0, 0, 1, 1, 2, 2]));
}

#[test]
fn test_all_gather_v() {
    let results = comm::launch(4, |world| {
        let me = world.rank() as u32;
        world.all_gather_v(&vec![me; me as usize]).unwrap()
    })
    .unwrap();

    assert!(results.iter().all(|all| *all == vec![1, 2, 2, 3, 3, 3]));
}

#[test]
fn test_split_groups() {
    let results = comm::launch(6, |world| {
        // Even and odd ranks, ranked in reverse
        let group = world.split(world.rank() % 2, 10 - world.rank()).unwrap();
        let members = group.all_gather(world.rank()).unwrap();
        (group.rank(), group.size(), members)
    })
    .unwrap();

    assert_eq!(results[0], (2, 3, vec![4, 2, 0]));
    assert_eq!(results[5], (0, 3, vec![5, 3, 1]));
}

#[test]
fn test_missing_broadcast_value() {
    let results = comm::launch(3, |world| world.broadcast::<u32>(None, 1)).unwrap();
    assert!(results.iter().all(|r| *r == Err(Error::MissingRootValue { root: 1 })));
}

#[test]
fn test_panicking_process() {
    let result = comm::launch(2, |world| {
        if world.rank() == 0 {
            panic!("process failure");
        }
        // The peer observes the disconnect instead of blocking
        world.all_gather(1u32)
    });
    assert_eq!(result.unwrap_err(), Error::ProcessPanicked { rank: 0 });
}
