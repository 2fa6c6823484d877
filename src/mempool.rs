//! Mempool: fixed-type block pool with LIFO recycling, plus the allocator
//! plumbing that lets lists and hashes own or share a pool.
//!
//! Blocks live in a `SlotMap`, which bump-allocates new slots at the end of
//! its storage and threads freed slots on a stack, so `alloc` after `free`
//! hands back the most recently freed slot. Blocks are addressed by
//! generational [`Block`] keys: a key whose block was freed or truncated
//! never resolves again, even after its physical slot is reissued. That
//! takes the place of poisoning freed memory.
//!
//! Sharing
//! - [`Allocator::Owned`]: the structure owns its pool and drops it whole.
//! - [`Allocator::Shared`]: the structure borrows a [`SharedPool`] for `'a`.
//!   The borrow checker keeps the pool alive for as long as any borrower,
//!   and `SharedPool::truncate` needs `&mut`, so no borrower can observe a
//!   truncation.

use crate::config::MempoolConfig;
use crate::error::{ContainerError, Result};
use core::cell::{Ref, RefCell, RefMut};
use core::ops::{Index, IndexMut};
use log::debug;
use slotmap::{new_key_type, Key, SlotMap};

new_key_type! {
    /// Generational key of one pool block.
    pub struct Block;
}

impl Block {
    /// Physical slot index inside the pool. Reissued blocks share a slot
    /// with the block that was freed before them.
    pub fn slot(&self) -> u32 {
        (self.data().as_ffi() & 0xffff_ffff) as u32
    }
}

/// Allocation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MempoolStats {
    /// Allocations served from never-used slots.
    pub fresh: u64,
    /// Allocations served from the free stack.
    pub recycled: u64,
    pub freed: u64,
    pub truncations: u64,
}

pub struct Mempool<T> {
    blocks: SlotMap<Block, T>,
    // Distinct slots ever created; blocks.len() below this means a free slot exists.
    slots_issued: usize,
    stats: MempoolStats,
}

impl<T> Mempool<T> {
    pub fn new() -> Self {
        Self {
            blocks: SlotMap::with_key(),
            slots_issued: 0,
            stats: MempoolStats::default(),
        }
    }

    pub fn with_config(config: MempoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            blocks: SlotMap::with_capacity_and_key(config.initial_capacity),
            slots_issued: 0,
            stats: MempoolStats::default(),
        })
    }

    #[inline]
    pub fn elem_size(&self) -> usize {
        core::mem::size_of::<T>()
    }

    /// Number of live blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn stats(&self) -> MempoolStats {
        self.stats
    }

    /// Store `v` in a recycled block if one is free, else in a fresh one.
    pub fn alloc(&mut self, v: T) -> Block {
        if self.blocks.len() < self.slots_issued {
            self.stats.recycled += 1;
        } else {
            self.slots_issued += 1;
            self.stats.fresh += 1;
        }
        self.blocks.insert(v)
    }

    /// Return a block to the pool, handing back its contents.
    ///
    /// `None` if `b` was already freed or truncated.
    pub fn free(&mut self, b: Block) -> Option<T> {
        debug_assert!(self.blocks.contains_key(b), "free of a stale block");
        let v = self.blocks.remove(b)?;
        self.stats.freed += 1;
        Some(v)
    }

    /// Checked free.
    pub fn try_free(&mut self, b: Block) -> Result<T> {
        let v = self.blocks.remove(b).ok_or(ContainerError::StaleBlock)?;
        self.stats.freed += 1;
        Ok(v)
    }

    pub fn contains(&self, b: Block) -> bool {
        self.blocks.contains_key(b)
    }

    pub fn get(&self, b: Block) -> Option<&T> {
        self.blocks.get(b)
    }

    pub fn get_mut(&mut self, b: Block) -> Option<&mut T> {
        self.blocks.get_mut(b)
    }

    pub fn try_get(&self, b: Block) -> Result<&T> {
        self.blocks.get(b).ok_or(ContainerError::StaleBlock)
    }

    /// Invalidate every issued block but keep the storage for reuse.
    pub fn truncate(&mut self) {
        debug!(
            "mempool truncate: {} live blocks, {} slots kept",
            self.blocks.len(),
            self.slots_issued
        );
        self.blocks.clear();
        self.stats.truncations += 1;
    }
}

impl<T> Default for Mempool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Block> for Mempool<T> {
    type Output = T;
    fn index(&self, b: Block) -> &T {
        &self.blocks[b]
    }
}

impl<T> IndexMut<Block> for Mempool<T> {
    fn index_mut(&mut self, b: Block) -> &mut T {
        &mut self.blocks[b]
    }
}

/// A pool that several lists or hashes can borrow at once.
pub struct SharedPool<T> {
    cell: RefCell<Mempool<T>>,
}

impl<T> SharedPool<T> {
    pub fn new() -> Self {
        Self::from_pool(Mempool::new())
    }

    pub fn from_pool(pool: Mempool<T>) -> Self {
        Self {
            cell: RefCell::new(pool),
        }
    }

    /// Live blocks across every borrower.
    pub fn len(&self) -> usize {
        self.cell.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.borrow().is_empty()
    }

    pub fn stats(&self) -> MempoolStats {
        self.cell.borrow().stats()
    }

    /// Reclaim every block. Requires that no structure borrows the pool.
    pub fn truncate(&mut self) {
        self.cell.get_mut().truncate();
    }

    pub fn into_inner(self) -> Mempool<T> {
        self.cell.into_inner()
    }

    pub(crate) fn cell(&self) -> &RefCell<Mempool<T>> {
        &self.cell
    }
}

impl<T> Default for SharedPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Block source for a list or hash: its own pool, or a borrowed one.
pub enum Allocator<'a, T> {
    Owned(RefCell<Mempool<T>>),
    Shared(&'a SharedPool<T>),
}

impl<'a, T> Allocator<'a, T> {
    pub fn owned() -> Self {
        Allocator::Owned(RefCell::new(Mempool::new()))
    }

    pub fn shared(pool: &'a SharedPool<T>) -> Self {
        Allocator::Shared(pool)
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Allocator::Owned(_))
    }

    pub(crate) fn cell(&self) -> &RefCell<Mempool<T>> {
        match self {
            Allocator::Owned(cell) => cell,
            Allocator::Shared(pool) => pool.cell(),
        }
    }

    pub(crate) fn borrow(&self) -> Ref<'_, Mempool<T>> {
        self.cell().borrow()
    }

    pub(crate) fn borrow_mut(&self) -> RefMut<'_, Mempool<T>> {
        self.cell().borrow_mut()
    }
}

impl<'a, T> Default for Allocator<'a, T> {
    fn default() -> Self {
        Self::owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Invariant: live blocks never alias and `len` counts unfreed blocks.
    #[test]
    fn live_blocks_are_distinct() {
        let mut p: Mempool<u32> = Mempool::new();
        let blocks: Vec<Block> = (0..100).map(|i| p.alloc(i)).collect();
        let slots: HashSet<u32> = blocks.iter().map(Block::slot).collect();
        assert_eq!(slots.len(), 100);
        assert_eq!(p.len(), 100);
        for (i, &b) in blocks.iter().enumerate() {
            assert_eq!(p[b], i as u32);
        }
        for &b in &blocks[..30] {
            p.free(b).unwrap();
        }
        assert_eq!(p.len(), 70);
    }

    /// Invariant: the free stack is LIFO; a reissued slot gets a new key so
    /// the old key stays dead.
    #[test]
    fn free_then_alloc_recycles_slot() {
        let mut p: Mempool<&'static str> = Mempool::new();
        let a = p.alloc("a");
        let b = p.alloc("b");
        assert_eq!(p.free(a), Some("a"));
        assert_eq!(p.free(b), Some("b"));
        let c = p.alloc("c");
        assert_eq!(c.slot(), b.slot());
        assert_ne!(c, b);
        assert!(p.get(b).is_none());
        assert_eq!(p.try_get(b), Err(ContainerError::StaleBlock));
        assert_eq!(p.try_free(a), Err(ContainerError::StaleBlock));
        let stats = p.stats();
        assert_eq!(stats.fresh, 2);
        assert_eq!(stats.recycled, 1);
        assert_eq!(stats.freed, 2);
    }

    /// Invariant: truncate kills every key and later allocations reuse the
    /// kept storage instead of growing it.
    #[test]
    fn truncate_invalidates_and_reuses() {
        let mut p: Mempool<u64> = Mempool::new();
        let old: Vec<Block> = (0..10).map(|i| p.alloc(i)).collect();
        p.truncate();
        assert!(p.is_empty());
        assert!(old.iter().all(|&b| !p.contains(b)));
        for i in 0..10 {
            p.alloc(i);
        }
        let stats = p.stats();
        assert_eq!(stats.fresh, 10);
        assert_eq!(stats.recycled, 10);
        assert_eq!(stats.truncations, 1);
    }

    #[test]
    fn shared_pool_counts_across_borrowers() {
        let mut shared: SharedPool<i32> = SharedPool::new();
        {
            let a1 = Allocator::shared(&shared);
            let a2 = Allocator::shared(&shared);
            a1.borrow_mut().alloc(1);
            a2.borrow_mut().alloc(2);
            assert!(!a1.is_owned());
        }
        assert_eq!(shared.len(), 2);
        shared.truncate();
        assert!(shared.is_empty());
        assert_eq!(shared.into_inner().stats().fresh, 2);
    }
}
