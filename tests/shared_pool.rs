use pool_containers::{
    Allocator, Hash, HashConfig, HashStrategy, Link, List, Mempool, SharedPool, StdHash,
};
use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Invariant: a list and a hash can draw links from one pool, and each
/// returns exactly its own links.
#[test]
fn list_and_hash_share_one_pool() {
    let pool: SharedPool<Link<u32>> = SharedPool::new();
    let mut list = List::with_allocator(&pool);
    let mut hash = Hash::with_allocator(StdHash::new(), &pool);
    for i in 0..64 {
        list.append(i);
        hash.insert_unique(i * 2).unwrap();
    }
    assert_eq!(pool.len(), 128);

    list.reset();
    assert_eq!(pool.len(), 64);
    assert!(hash.contains(&126));

    for i in 0..32 {
        assert_eq!(hash.remove(&(i * 2)), Some(i * 2));
    }
    assert_eq!(pool.len(), 32);
    drop(hash);
    drop(list);
    assert!(pool.is_empty());
}

/// Invariant: slots freed by one structure are recycled by another.
#[test]
fn freed_links_are_recycled_across_structures() {
    let pool: SharedPool<Link<u64>> = SharedPool::new();
    {
        let mut a = List::with_allocator(&pool);
        for i in 0..100 {
            a.append(i);
        }
    }
    let fresh_after_first = pool.stats().fresh;
    {
        let mut b = List::with_allocator(&pool);
        for i in 0..100 {
            b.prepend(i);
        }
        assert_eq!(b.to_vec().first(), Some(&99));
    }
    let stats = pool.stats();
    assert_eq!(stats.fresh, fresh_after_first);
    assert_eq!(stats.recycled, 100);
    assert_eq!(stats.freed, 200);
}

/// Invariant: after an unlink, only the pool's owner can reclaim the
/// orphaned links, and only once every borrower is gone.
#[test]
fn unlink_leaves_reclaim_to_pool_owner() {
    let mut pool: SharedPool<Link<String>> = SharedPool::from_pool(Mempool::new());
    {
        let config = HashConfig::small();
        let mut h =
            Hash::with_config(StdHash::new(), config, Allocator::shared(&pool)).unwrap();
        for w in ["a", "b", "c"] {
            h.insert_unique(w.to_string()).unwrap();
        }
        h.unlink();
        assert!(h.is_empty());
        assert_eq!(pool.len(), 3);
        h.insert_unique("d".to_string()).unwrap();
    }
    assert_eq!(pool.len(), 3);
    pool.truncate();
    assert!(pool.is_empty());
    assert_eq!(pool.into_inner().stats().truncations, 1);
}

#[test]
fn owned_allocators_are_independent() {
    let mut l1 = List::new();
    let mut l2 = List::new();
    l1.append("x");
    l2.append("y");
    assert!(l1.is_allocator_owned() && l2.is_allocator_owned());
    l1.unlink_destroy();
    assert_eq!(l2.to_vec(), vec!["y"]);
}

// Hashes by value after checking the neighbouring table, counting each check.
struct Neighbour<'t, 'p> {
    other: &'t Hash<'p, u32>,
    consulted: Cell<usize>,
}

impl HashStrategy<u32> for Neighbour<'_, '_> {
    fn hash(&self, v: &u32) -> u64 {
        let _ = self.other.contains(v);
        self.consulted.set(self.consulted.get() + 1);
        u64::from(*v)
    }

    fn equal(&self, a: &u32, b: &u32) -> bool {
        a == b
    }
}

/// Invariant: grow and shrink may run strategy code that reads another
/// table on the same pool.
#[test]
fn resize_while_strategy_reads_a_neighbour_on_the_pool() {
    let pool: SharedPool<Link<u32>> = SharedPool::new();
    let mut other = Hash::with_allocator(StdHash::new(), &pool);
    for i in (0..200).step_by(3) {
        other.insert_unique(i).unwrap();
    }
    let strategy = Neighbour {
        other: &other,
        consulted: Cell::new(0),
    };
    let mut h = Hash::with_config(strategy, HashConfig::small(), Allocator::shared(&pool)).unwrap();
    for i in 0..61 {
        h.insert_unique(i).unwrap();
    }
    assert_eq!(h.resize_actions(), 1);
    assert_eq!(h.slot_count(), 31);
    // One hash per insert plus one per entry relinked by the grow.
    assert_eq!(h.strategy().consulted.get(), 122);

    for i in 0..54 {
        assert_eq!(h.remove(&i), Some(i));
    }
    assert_eq!(h.resize_actions(), 2);
    assert_eq!(h.slot_count(), 15);
    assert!((54..61).all(|i| h.contains(&i)));
    assert_eq!(other.len(), 67);
    assert_eq!(pool.len(), other.len() + h.len());
}

/// Invariant: an entry guard borrows the whole pool. Neighbours can still
/// look things up through it but cannot allocate until it is released.
#[test]
fn entry_guard_blocks_allocation_on_the_shared_pool() {
    let pool: SharedPool<Link<u32>> = SharedPool::new();
    let mut a = Hash::with_allocator(StdHash::new(), &pool);
    let mut b = Hash::with_allocator(StdHash::new(), &pool);
    let hd = a.insert_unique(1).unwrap();
    b.insert_unique(2).unwrap();
    {
        let held = a.get(hd).unwrap();
        assert!(b.contains(&2));
        let res = catch_unwind(AssertUnwindSafe(|| b.insert_unique(3)));
        assert!(res.is_err(), "insert must not allocate under a held entry");
        assert_eq!(*held, 1);
    }
    assert_eq!(b.len(), 1);
    b.insert_unique(3).unwrap();
    assert!(b.contains(&3));
    assert_eq!(pool.len(), 3);
}
