//! Hash: separate-chaining hash table whose chains are pooled list links.
//!
//! Two layers:
//! - [`RawHash`] knows slots, chains, sizing and the pool. Every entry point
//!   takes a precomputed hash and the closures it needs (equality, rehash),
//!   so callers that compare through indirection (see
//!   [`HashArray`](crate::HashArray)) can drive it directly.
//! - [`Hash`] binds a [`HashStrategy`] to a `RawHash`.
//!
//! Entries never move between pool blocks: a resize relinks the existing
//! links into new chains. A [`Handle`] therefore stays valid until its entry
//! is removed or the table is truncated.

use crate::array::Array;
use crate::config::HashConfig;
use crate::error::Result;
use crate::list::{Chain, Link};
use crate::mempool::{Allocator, Block, SharedPool};
use crate::reentrancy::DebugReentrancy;
use crate::strategy::{HashStrategy, StdHash};
use core::cell::{Ref, RefMut};
use log::{debug, log, warn, Level};
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(Block);

impl Handle {
    pub fn block(&self) -> Block {
        self.0
    }

    pub fn value<'h, T, S>(&self, hash: &'h Hash<'_, T, S>) -> Option<Ref<'h, T>> {
        hash.get(*self)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertError {
    /// An equal element is already stored; its handle is attached.
    #[error("an equal element is already present")]
    DuplicateKey(Handle),
}

/// Snapshot of chain lengths and resize activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HashStats {
    pub slots: usize,
    /// Sum of chain lengths.
    pub elements: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub longest_chain: usize,
    pub empty_slots: usize,
    pub resize_checks: usize,
    pub resize_actions: usize,
}

#[inline]
fn slot_index(hash: u64, slots: usize) -> usize {
    (hash % slots as u64) as usize
}

/// Relink every entry into `new_count` fresh chains. No link is reallocated.
///
/// `rehash` runs under a shared borrow of the pool and may read other
/// structures on it; the exclusive borrow is taken only for relinking.
fn rebuild<T, R>(
    slots: &mut Array<Chain>,
    alloc: &Allocator<'_, Link<T>>,
    new_count: usize,
    mut rehash: R,
) where
    R: FnMut(&T) -> u64,
{
    let mut moves: Array<(Block, usize)> = Array::new();
    {
        let pool = alloc.borrow();
        for chain in slots.iter() {
            let mut cur = chain.first();
            while let Some(b) = cur {
                let link = &pool[b];
                moves.push((b, slot_index(rehash(link.data()), new_count)));
                cur = link.next();
            }
        }
    }
    let mut fresh: Array<Chain> = Array::new();
    fresh.resize(new_count);
    let mut pool = alloc.borrow_mut();
    for &(b, at) in moves.iter() {
        fresh[at].link_back(&mut *pool, b);
    }
    debug!("hash resize: {} -> {} slots", slots.len(), new_count);
    *slots = fresh;
}

pub struct RawHash<'a, T> {
    elem_count: usize,
    slots: Array<Chain>,
    alloc: Allocator<'a, Link<T>>,
    config: HashConfig,
    resize_checks: usize,
    resize_actions: usize,
    reentrancy: DebugReentrancy,
}

impl<'a, T> RawHash<'a, T> {
    pub fn new(config: HashConfig, alloc: Allocator<'a, Link<T>>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, alloc))
    }

    // `config` must already be valid.
    pub(crate) fn build(config: HashConfig, alloc: Allocator<'a, Link<T>>) -> Self {
        let mut slots = Array::new();
        slots.resize(config.initial_slots);
        Self {
            elem_count: 0,
            slots,
            alloc,
            config,
            resize_checks: 0,
            resize_actions: 0,
            reentrancy: DebugReentrancy::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elem_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elem_count == 0
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Insertions and removals that evaluated the resize policy.
    pub fn resize_checks(&self) -> usize {
        self.resize_checks
    }

    /// Resizes actually performed.
    pub fn resize_actions(&self) -> usize {
        self.resize_actions
    }

    pub fn is_allocator_owned(&self) -> bool {
        self.alloc.is_owned()
    }

    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// First entry in `hash`'s chain for which `eq` holds.
    pub fn find_with<E>(&self, hash: u64, eq: E) -> Option<Handle>
    where
        E: FnMut(&T) -> bool,
    {
        let _g = self.reentrancy.enter("lookup");
        let pool = self.alloc.borrow();
        let at = slot_index(hash, self.slots.len());
        self.slots[at].find(&*pool, eq).map(|(_, b)| Handle(b))
    }

    /// Append `v` to its chain without looking for an equal entry.
    ///
    /// `rehash` must give every stored entry the hash it was inserted with;
    /// it runs only if the insertion triggers a grow.
    pub fn insert_unchecked<R>(&mut self, hash: u64, v: T, rehash: R) -> Handle
    where
        R: FnMut(&T) -> u64,
    {
        let g = self.reentrancy.enter("insert");
        let at = slot_index(hash, self.slots.len());
        let b = self.slots[at].push_back(&mut *self.alloc.borrow_mut(), v);
        self.elem_count += 1;
        self.resize_checks += 1;
        if let Some(target) = self.config.grow_target(self.elem_count, self.slots.len()) {
            self.resize_actions += 1;
            g.relabel("grow");
            rebuild(&mut self.slots, &self.alloc, target, rehash);
        }
        Handle(b)
    }

    /// Insert `v` unless `eq(stored, &v)` holds for an entry in its chain.
    pub fn insert_unique_with<E, R>(
        &mut self,
        hash: u64,
        v: T,
        mut eq: E,
        rehash: R,
    ) -> Result<Handle, InsertError>
    where
        E: FnMut(&T, &T) -> bool,
        R: FnMut(&T) -> u64,
    {
        {
            let _g = self.reentrancy.enter("insert");
            let pool = self.alloc.borrow();
            let at = slot_index(hash, self.slots.len());
            if let Some((_, b)) = self.slots[at].find(&*pool, |stored| eq(stored, &v)) {
                return Err(InsertError::DuplicateKey(Handle(b)));
            }
        }
        Ok(self.insert_unchecked(hash, v, rehash))
    }

    /// Remove and return the first entry in `hash`'s chain matching `eq`.
    pub fn remove_with<E, R>(&mut self, hash: u64, eq: E, rehash: R) -> Option<T>
    where
        E: FnMut(&T) -> bool,
        R: FnMut(&T) -> u64,
    {
        let g = self.reentrancy.enter("remove");
        let at = slot_index(hash, self.slots.len());
        let (pred, _) = self.slots[at].find(&*self.alloc.borrow(), eq)?;
        let v = self.slots[at].remove_after(&mut *self.alloc.borrow_mut(), pred)?;
        self.elem_count -= 1;
        self.resize_checks += 1;
        if let Some(target) = self
            .config
            .shrink_target(self.elem_count, self.slots.len())
        {
            self.resize_actions += 1;
            g.relabel("shrink");
            rebuild(&mut self.slots, &self.alloc, target, rehash);
        }
        Some(v)
    }

    /// The entry behind `h`. The guard borrows the entire pool; see [`Hash`].
    pub fn get(&self, h: Handle) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.alloc.borrow(), |pool| pool.get(h.0).map(Link::data)).ok()
    }

    /// Mutable access to a stored entry. Changing what the entry hashes or
    /// compares by leaves it in the wrong chain.
    pub fn get_mut(&mut self, h: Handle) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.alloc.borrow_mut(), |pool| {
            pool.get_mut(h.0).map(Link::data_mut)
        })
        .ok()
    }

    /// Visit every entry, slot by slot, in chain order.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(Handle, &T),
    {
        let pool = self.alloc.borrow();
        for chain in self.slots.iter() {
            let mut cur = chain.first();
            while let Some(b) = cur {
                let link = &pool[b];
                f(Handle(b), link.data());
                cur = link.next();
            }
        }
    }

    /// Remove every entry, keeping the current slot count.
    ///
    /// An owned pool is truncated in one step; with a shared pool each link
    /// is returned to it, so other borrowers are unaffected.
    pub fn truncate(&mut self) {
        match &self.alloc {
            Allocator::Owned(cell) => {
                for chain in self.slots.iter_mut() {
                    chain.detach();
                }
                cell.borrow_mut().truncate();
            }
            Allocator::Shared(pool) => {
                let mut pool = pool.cell().borrow_mut();
                for chain in self.slots.iter_mut() {
                    chain.release(&mut *pool);
                }
            }
        }
        self.elem_count = 0;
    }

    /// Forget every entry in O(slots) without per-link frees.
    ///
    /// With a shared pool the links stay allocated until the pool's owner
    /// truncates or drops it.
    pub fn unlink(&mut self) {
        for chain in self.slots.iter_mut() {
            chain.detach();
        }
        match &self.alloc {
            Allocator::Owned(cell) => cell.borrow_mut().truncate(),
            Allocator::Shared(_) if self.elem_count > 0 => {
                warn!(
                    "hash unlink orphans {} links in a shared pool",
                    self.elem_count
                );
            }
            Allocator::Shared(_) => {}
        }
        self.elem_count = 0;
    }

    pub fn unlink_destroy(mut self) {
        self.unlink();
    }

    pub fn statistics(&self) -> HashStats {
        let slots = self.slots.len();
        let mean = self.elem_count as f64 / slots as f64;
        let (mut elements, mut longest_chain, mut empty_slots) = (0, 0, 0);
        let mut sq = 0.0;
        for chain in self.slots.iter() {
            let l = chain.len();
            elements += l;
            longest_chain = longest_chain.max(l);
            if l == 0 {
                empty_slots += 1;
            }
            let d = l as f64 - mean;
            sq += d * d;
        }
        HashStats {
            slots,
            elements,
            mean,
            std_dev: (sq / slots as f64).sqrt(),
            longest_chain,
            empty_slots,
            resize_checks: self.resize_checks,
            resize_actions: self.resize_actions,
        }
    }

    pub fn log_statistics(&self, level: Level) {
        let s = self.statistics();
        log!(
            level,
            "hash: {} elements in {} slots, chain length {:.3} +- {:.3}, longest {}, {} empty; {} of {} resize checks acted",
            s.elements,
            s.slots,
            s.mean,
            s.std_dev,
            s.longest_chain,
            s.empty_slots,
            s.resize_actions,
            s.resize_checks
        );
    }
}

impl<'a, T> Drop for RawHash<'a, T> {
    fn drop(&mut self) {
        if let Allocator::Shared(pool) = &self.alloc {
            match pool.cell().try_borrow_mut() {
                Ok(mut pool) => {
                    for chain in self.slots.iter_mut() {
                        chain.release(&mut *pool);
                    }
                }
                Err(_) => warn!(
                    "hash dropped while its pool is borrowed; {} links orphaned",
                    self.elem_count
                ),
            }
        }
    }
}

/// Hash table of unique values under a [`HashStrategy`].
///
/// [`get`](Self::get), [`get_mut`](Self::get_mut) and
/// [`lookup_mut`](Self::lookup_mut) hand out `Ref`/`RefMut` guards into the
/// whole pool, not just one entry. Holding one while another structure on
/// the same shared pool allocates or frees panics, the same as any other
/// `RefCell` double borrow. Lookups on those structures are fine.
pub struct Hash<'a, T, S = StdHash> {
    raw: RawHash<'a, T>,
    strategy: S,
}

impl<T, S: Default> Hash<'static, T, S> {
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<T, S: Default> Default for Hash<'static, T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> Hash<'static, T, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            raw: RawHash::build(HashConfig::default(), Allocator::owned()),
            strategy,
        }
    }
}

impl<'a, T, S> Hash<'a, T, S> {
    /// A table that borrows its links from `pool`.
    pub fn with_allocator(strategy: S, pool: &'a SharedPool<Link<T>>) -> Self {
        Self {
            raw: RawHash::build(HashConfig::default(), Allocator::shared(pool)),
            strategy,
        }
    }

    pub fn with_config(
        strategy: S,
        config: HashConfig,
        alloc: Allocator<'a, Link<T>>,
    ) -> Result<Self> {
        Ok(Self {
            raw: RawHash::new(config, alloc)?,
            strategy,
        })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn raw(&self) -> &RawHash<'a, T> {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn slot_count(&self) -> usize {
        self.raw.slot_count()
    }

    pub fn resize_checks(&self) -> usize {
        self.raw.resize_checks()
    }

    pub fn resize_actions(&self) -> usize {
        self.raw.resize_actions()
    }

    pub fn is_allocator_owned(&self) -> bool {
        self.raw.is_allocator_owned()
    }

    pub fn get(&self, h: Handle) -> Option<Ref<'_, T>> {
        self.raw.get(h)
    }

    pub fn get_mut(&mut self, h: Handle) -> Option<RefMut<'_, T>> {
        self.raw.get_mut(h)
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(Handle, &T),
    {
        self.raw.for_each(f)
    }

    pub fn truncate(&mut self) {
        self.raw.truncate()
    }

    pub fn unlink(&mut self) {
        self.raw.unlink()
    }

    pub fn unlink_destroy(self) {
        self.raw.unlink_destroy()
    }

    pub fn statistics(&self) -> HashStats {
        self.raw.statistics()
    }

    pub fn log_statistics(&self, level: Level) {
        self.raw.log_statistics(level)
    }
}

impl<'a, T, S> Hash<'a, T, S>
where
    S: HashStrategy<T>,
{
    pub fn lookup(&self, v: &T) -> Option<Handle> {
        let strategy = &self.strategy;
        self.raw
            .find_with(strategy.hash(v), |stored| strategy.equal(stored, v))
    }

    pub fn contains(&self, v: &T) -> bool {
        self.lookup(v).is_some()
    }

    /// The stored entry equal to `v`, for in-place updates of fields the
    /// strategy ignores.
    pub fn lookup_mut(&mut self, v: &T) -> Option<RefMut<'_, T>> {
        let h = self.lookup(v)?;
        self.raw.get_mut(h)
    }

    /// Insert `v` if no equal entry exists. On a duplicate `v` is dropped
    /// and the existing entry's handle returned in the error.
    pub fn insert_unique(&mut self, v: T) -> Result<Handle, InsertError> {
        let strategy = &self.strategy;
        let hash = strategy.hash(&v);
        self.raw.insert_unique_with(
            hash,
            v,
            |stored, new| strategy.equal(stored, new),
            |stored| strategy.hash(stored),
        )
    }

    /// Remove the entry equal to `v`, returning it.
    pub fn remove(&mut self, v: &T) -> Option<T> {
        let strategy = &self.strategy;
        self.raw.remove_with(
            strategy.hash(v),
            |stored| strategy.equal(stored, v),
            |stored| strategy.hash(stored),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::FnHash;

    fn zero(_: &u32) -> u64 {
        0
    }

    fn same(a: &u32, b: &u32) -> bool {
        a == b
    }

    fn colliding() -> FnHash<fn(&u32) -> u64, fn(&u32, &u32) -> bool> {
        FnHash::new(zero as fn(&u32) -> u64, same as fn(&u32, &u32) -> bool)
    }

    /// Invariant: a duplicate insert is a no-op that reports the existing
    /// entry.
    #[test]
    fn insert_unique_rejects_duplicates() {
        let mut h: Hash<u32> = Hash::new();
        let first = h.insert_unique(7).unwrap();
        match h.insert_unique(7) {
            Err(InsertError::DuplicateKey(existing)) => assert_eq!(existing, first),
            other => panic!("expected duplicate, got {:?}", other),
        }
        assert_eq!(h.len(), 1);
        assert_eq!(*first.value(&h).unwrap(), 7);
    }

    #[test]
    fn lookup_after_insert_not_after_remove() {
        let mut h: Hash<String> = Hash::new();
        for w in ["alpha", "beta", "gamma"] {
            h.insert_unique(w.to_string()).unwrap();
        }
        let beta = h.lookup(&"beta".to_string()).unwrap();
        assert_eq!(h.remove(&"beta".to_string()).as_deref(), Some("beta"));
        assert!(h.get(beta).is_none());
        assert!(!h.contains(&"beta".to_string()));
        assert!(h.contains(&"gamma".to_string()));
        assert_eq!(h.remove(&"beta".to_string()), None);
        assert_eq!(h.len(), 2);
    }

    /// Invariant: entries sharing one chain stay distinguishable.
    #[test]
    fn collisions_share_one_chain() {
        let mut h = Hash::with_strategy(colliding());
        for i in 0..50u32 {
            h.insert_unique(i).unwrap();
        }
        assert!(h.insert_unique(25).is_err());
        let s = h.statistics();
        assert_eq!(s.longest_chain, 50);
        assert_eq!(s.empty_slots, s.slots - 1);
        assert_eq!(h.remove(&0), Some(0));
        assert_eq!(h.remove(&49), Some(49));
        assert_eq!(h.remove(&25), Some(25));
        for i in 0..50u32 {
            assert_eq!(h.contains(&i), !matches!(i, 0 | 25 | 49));
        }
    }

    /// Invariant: the table grows once the load passes `max_load`, shrinks
    /// back when mostly empty, and every entry survives both.
    #[test]
    fn grows_and_shrinks_with_load() {
        let mut h: Hash<u32> =
            Hash::with_config(StdHash::new(), HashConfig::small(), Allocator::owned())
                .unwrap();
        let handles: Vec<Handle> = (0..61).map(|i| h.insert_unique(i).unwrap()).collect();
        assert_eq!(h.slot_count(), 31);
        assert_eq!(h.resize_actions(), 1);
        assert_eq!(h.resize_checks(), 61);
        for (i, &hd) in handles.iter().enumerate() {
            assert_eq!(h.lookup(&(i as u32)), Some(hd), "handle moved by resize");
        }
        for i in 0..54 {
            h.remove(&i).unwrap();
        }
        assert_eq!(h.len(), 7);
        assert_eq!(h.slot_count(), 15);
        assert_eq!(h.resize_actions(), 2);
        for i in 54..61 {
            assert!(h.contains(&i));
        }
        h.remove(&54);
        assert_eq!(h.slot_count(), 15, "never below min_slots");
    }

    #[test]
    fn bad_config_is_rejected() {
        let config = HashConfig {
            max_load: 0,
            ..HashConfig::default()
        };
        let res = Hash::<u32>::with_config(StdHash::new(), config, Allocator::owned());
        assert!(res.is_err());
    }

    /// Invariant: chain lengths always sum to the element count.
    #[test]
    fn statistics_account_for_every_entry() {
        let mut h: Hash<u64> = Hash::new();
        for i in 0..2000u64 {
            h.insert_unique(i * 7919).unwrap();
        }
        let s = h.statistics();
        assert_eq!(s.elements, 2000);
        assert_eq!(s.slots, h.slot_count());
        assert!((s.mean - 2000.0 / s.slots as f64).abs() < 1e-9);
        assert!(s.longest_chain >= 1);
        h.log_statistics(Level::Debug);
    }

    #[test]
    fn lookup_mut_updates_in_place() {
        let s = FnHash::new(
            |v: &(u32, u32)| u64::from(v.0),
            |a: &(u32, u32), b: &(u32, u32)| a.0 == b.0,
        );
        let mut h: Hash<'_, (u32, u32), _> = Hash::with_strategy(s);
        h.insert_unique((1, 10)).unwrap();
        h.lookup_mut(&(1, 0)).unwrap().1 = 11;
        let hd = h.lookup(&(1, 0)).unwrap();
        assert_eq!(*h.get(hd).unwrap(), (1, 11));
    }

    /// Invariant: hashes sharing a pool give every link back on truncate
    /// and drop.
    #[test]
    fn shared_pool_truncate_and_drop() {
        let pool: SharedPool<Link<u32>> = SharedPool::new();
        {
            let mut a = Hash::with_allocator(StdHash::new(), &pool);
            let mut b = Hash::with_allocator(StdHash::new(), &pool);
            for i in 0..100u32 {
                a.insert_unique(i).unwrap();
                b.insert_unique(i + 1000).unwrap();
            }
            assert!(!a.is_allocator_owned());
            assert_eq!(pool.len(), 200);
            a.truncate();
            assert!(a.is_empty());
            assert_eq!(pool.len(), 100);
            assert!(b.contains(&1050));
            a.insert_unique(5).unwrap();
        }
        assert!(pool.is_empty());
    }

    #[test]
    fn unlink_on_owned_and_shared() {
        let mut owned: Hash<u32> = Hash::new();
        owned.insert_unique(1).unwrap();
        owned.unlink();
        assert!(owned.is_empty());
        assert!(!owned.contains(&1));
        owned.insert_unique(1).unwrap();
        assert!(owned.contains(&1));

        let mut pool: SharedPool<Link<u32>> = SharedPool::new();
        {
            let mut h = Hash::with_allocator(StdHash::new(), &pool);
            h.insert_unique(1).unwrap();
            h.insert_unique(2).unwrap();
            h.unlink_destroy();
        }
        assert_eq!(pool.len(), 2);
        pool.truncate();
        assert!(pool.is_empty());
    }

    #[test]
    fn for_each_visits_every_entry() {
        let mut h: Hash<u32> = Hash::new();
        for i in 0..300 {
            h.insert_unique(i).unwrap();
        }
        let mut seen = Vec::new();
        h.for_each(|hd, v| {
            seen.push(*v);
            assert_eq!(*h.get(hd).unwrap(), *v);
        });
        seen.sort_unstable();
        assert_eq!(seen, (0..300).collect::<Vec<_>>());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn strategy_reentering_its_table_panics() {
        use core::cell::Cell;

        struct Reenter {
            table: Cell<*const ()>,
        }

        impl HashStrategy<u32> for Reenter {
            fn hash(&self, _v: &u32) -> u64 {
                0
            }
            fn equal(&self, a: &u32, b: &u32) -> bool {
                let t = self.table.get();
                if !t.is_null() {
                    let table = unsafe { &*(t as *const Hash<'static, u32, Reenter>) };
                    let _ = table.contains(a);
                }
                a == b
            }
        }

        let mut h: Hash<'static, u32, Reenter> = Hash::with_strategy(Reenter {
            table: Cell::new(core::ptr::null()),
        });
        h.insert_unique(1).unwrap();
        h.strategy().table.set(&h as *const _ as *const ());
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| h.contains(&2)));
        let msg = res
            .expect_err("expected reentrancy to panic in debug builds")
            .downcast::<String>()
            .map(|s| *s)
            .unwrap_or_default();
        assert!(msg.contains("lookup on a hash table that is inside lookup"), "{msg}");
        h.strategy().table.set(core::ptr::null());
        assert!(h.contains(&1));
    }
}
