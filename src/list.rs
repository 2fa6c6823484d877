//! Singly linked list whose links live in a [`Mempool`].
//!
//! [`Chain`] is the bare head (`first`, `last`, count). All link surgery
//! happens on a chain with the pool passed in, so a hash table can keep an
//! array of chains over one pool. [`List`] pairs a chain with an
//! [`Allocator`] and is the public structure.

use crate::mempool::{Allocator, Block, Mempool, SharedPool};
use core::cell::{Ref, RefCell, RefMut};
use log::warn;

/// One list node: the payload and the key of the next node.
#[derive(Debug)]
pub struct Link<T> {
    data: T,
    next: Option<Block>,
}

impl<T> Link<T> {
    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut T {
        &mut self.data
    }

    pub fn next(&self) -> Option<Block> {
        self.next
    }
}

/// List head. Invariants: `first.is_none() == (len == 0)`, and the `last`
/// link has no successor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Chain {
    len: usize,
    first: Option<Block>,
    last: Option<Block>,
}

impl Chain {
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn first(&self) -> Option<Block> {
        self.first
    }

    #[inline]
    pub(crate) fn last(&self) -> Option<Block> {
        self.last
    }

    pub(crate) fn push_back<T>(&mut self, pool: &mut Mempool<Link<T>>, data: T) -> Block {
        let b = pool.alloc(Link { data, next: None });
        self.link_back(pool, b);
        b
    }

    /// Append an already allocated link.
    pub(crate) fn link_back<T>(&mut self, pool: &mut Mempool<Link<T>>, b: Block) {
        pool[b].next = None;
        match self.last {
            Some(last) => pool[last].next = Some(b),
            None => self.first = Some(b),
        }
        self.last = Some(b);
        self.len += 1;
    }

    pub(crate) fn push_front<T>(&mut self, pool: &mut Mempool<Link<T>>, data: T) -> Block {
        let b = pool.alloc(Link {
            data,
            next: self.first,
        });
        if self.last.is_none() {
            self.last = Some(b);
        }
        self.first = Some(b);
        self.len += 1;
        b
    }

    /// Insert after `pred`; `None` inserts at the head.
    pub(crate) fn insert_after<T>(
        &mut self,
        pool: &mut Mempool<Link<T>>,
        pred: Option<Block>,
        data: T,
    ) -> Block {
        let Some(p) = pred else {
            return self.push_front(pool, data);
        };
        let next = pool[p].next;
        let b = pool.alloc(Link { data, next });
        pool[p].next = Some(b);
        if self.last == Some(p) {
            self.last = Some(b);
        }
        self.len += 1;
        b
    }

    /// Detach the link after `pred` (the head for `None`) without freeing it.
    pub(crate) fn unlink_after<T>(
        &mut self,
        pool: &mut Mempool<Link<T>>,
        pred: Option<Block>,
    ) -> Option<Block> {
        let victim = match pred {
            None => self.first?,
            Some(p) => pool.get(p)?.next?,
        };
        let next = pool[victim].next;
        match pred {
            None => self.first = next,
            Some(p) => pool[p].next = next,
        }
        if self.last == Some(victim) {
            self.last = pred;
        }
        self.len -= 1;
        Some(victim)
    }

    pub(crate) fn remove_after<T>(
        &mut self,
        pool: &mut Mempool<Link<T>>,
        pred: Option<Block>,
    ) -> Option<T> {
        let b = self.unlink_after(pool, pred)?;
        pool.free(b).map(|link| link.data)
    }

    /// Free every link, O(N).
    pub(crate) fn release<T>(&mut self, pool: &mut Mempool<Link<T>>) {
        while self.remove_after(pool, None).is_some() {}
        debug_assert_eq!(*self, Chain::default());
    }

    /// Forget every link without touching the pool, O(1).
    pub(crate) fn detach(&mut self) {
        *self = Chain::default();
    }

    /// First link whose data satisfies `f`, with its predecessor.
    pub(crate) fn find<T, F>(
        &self,
        pool: &Mempool<Link<T>>,
        mut f: F,
    ) -> Option<(Option<Block>, Block)>
    where
        F: FnMut(&T) -> bool,
    {
        let mut pred = None;
        let mut cur = self.first;
        while let Some(b) = cur {
            let link = &pool[b];
            if f(&link.data) {
                return Some((pred, b));
            }
            pred = Some(b);
            cur = link.next;
        }
        None
    }
}

/// Linked list over an owned or shared pool.
///
/// With an owned pool, dropping the list drops the pool in one step. With a
/// shared pool, every link is returned to the pool, O(N).
///
/// Accessors hand out `Ref`/`RefMut` guards into the pool. Holding one while
/// another structure on the same shared pool allocates panics, the same as
/// any other `RefCell` double borrow.
pub struct List<'a, T> {
    chain: Chain,
    alloc: Allocator<'a, Link<T>>,
}

impl<T> List<'static, T> {
    pub fn new() -> Self {
        Self {
            chain: Chain::default(),
            alloc: Allocator::owned(),
        }
    }
}

impl<T> Default for List<'static, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> List<'a, T> {
    /// A list that borrows its links from `pool`.
    pub fn with_allocator(pool: &'a SharedPool<Link<T>>) -> Self {
        Self {
            chain: Chain::default(),
            alloc: Allocator::shared(pool),
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.len() == 0
    }

    pub fn is_allocator_owned(&self) -> bool {
        self.alloc.is_owned()
    }

    pub fn first(&self) -> Option<Block> {
        self.chain.first()
    }

    pub fn last(&self) -> Option<Block> {
        self.chain.last()
    }

    /// Successor of `b`; `None` at the tail or for a dead block.
    pub fn next(&self, b: Block) -> Option<Block> {
        self.alloc.borrow().get(b).and_then(Link::next)
    }

    pub fn get(&self, b: Block) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.alloc.borrow(), |pool| pool.get(b).map(Link::data)).ok()
    }

    pub fn get_mut(&mut self, b: Block) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.alloc.borrow_mut(), |pool| {
            pool.get_mut(b).map(Link::data_mut)
        })
        .ok()
    }

    pub fn append(&mut self, data: T) -> Block {
        self.chain.push_back(&mut *self.alloc.borrow_mut(), data)
    }

    pub fn prepend(&mut self, data: T) -> Block {
        self.chain.push_front(&mut *self.alloc.borrow_mut(), data)
    }

    /// Insert after `pred`, or at the head for `None`.
    ///
    /// `pred` must be a link of this list.
    pub fn insert(&mut self, pred: Option<Block>, data: T) -> Block {
        self.chain
            .insert_after(&mut *self.alloc.borrow_mut(), pred, data)
    }

    /// Remove the link after `pred`, or the head for `None`.
    ///
    /// `None` when there is nothing after `pred`.
    pub fn remove(&mut self, pred: Option<Block>) -> Option<T> {
        self.chain
            .remove_after(&mut *self.alloc.borrow_mut(), pred)
    }

    pub fn pop(&mut self) -> Option<T> {
        self.remove(None)
    }

    /// Block keys from head to tail.
    pub fn iter(&self) -> Blocks<'_, T> {
        Blocks {
            pool: self.alloc.cell(),
            cur: self.chain.first(),
        }
    }

    /// Remove every element, returning links to the pool. Memory neutral.
    pub fn reset(&mut self) {
        self.chain.release(&mut *self.alloc.borrow_mut());
    }

    /// Drop every element in O(1) without per-link frees.
    ///
    /// An owned pool is truncated in the same step. With a shared pool the
    /// links stay allocated in the pool until it is truncated or dropped.
    pub fn unlink(&mut self) {
        match &self.alloc {
            Allocator::Owned(cell) => cell.borrow_mut().truncate(),
            Allocator::Shared(_) if self.chain.len() > 0 => {
                warn!(
                    "list unlink orphans {} links in a shared pool",
                    self.chain.len()
                );
            }
            Allocator::Shared(_) => {}
        }
        self.chain.detach();
    }

    /// Unlink, then drop without visiting the links.
    pub fn unlink_destroy(mut self) {
        self.unlink();
    }
}

impl<'a, T: Clone> List<'a, T> {
    pub fn to_vec(&self) -> Vec<T> {
        let pool = self.alloc.borrow();
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.chain.first();
        while let Some(b) = cur {
            let link = &pool[b];
            out.push(link.data.clone());
            cur = link.next;
        }
        out
    }
}

impl<'a, T> Drop for List<'a, T> {
    fn drop(&mut self) {
        if let Allocator::Shared(pool) = &self.alloc {
            match pool.cell().try_borrow_mut() {
                Ok(mut pool) => self.chain.release(&mut *pool),
                Err(_) => warn!(
                    "list dropped while its pool is borrowed; {} links orphaned",
                    self.chain.len()
                ),
            }
        }
    }
}

/// Iterator over the block keys of a [`List`].
pub struct Blocks<'l, T> {
    pool: &'l RefCell<Mempool<Link<T>>>,
    cur: Option<Block>,
}

impl<'l, T> Iterator for Blocks<'l, T> {
    type Item = Block;
    fn next(&mut self) -> Option<Block> {
        let b = self.cur?;
        self.cur = self.pool.borrow().get(b).and_then(Link::next);
        Some(b)
    }
}
