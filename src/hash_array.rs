//! HashArray: an [`Array`] of unique values in first-seen order, indexed by
//! a [`RawHash`] of positions.
//!
//! The hash stores `usize` positions only. Its equality and rehash closures
//! look the value up in the array, so a lookup compares the needle against
//! `a[i]` rather than against the index.

use crate::array::Array;
use crate::config::HashConfig;
use crate::error::Result;
use crate::hash::RawHash;
use crate::mempool::Allocator;
use crate::strategy::{HashStrategy, StdHash};
use thiserror::Error;

/// `insert_unique` found an equal value already stored at `position`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("equal value already stored at position {position}")]
pub struct Duplicate {
    pub position: usize,
}

pub struct HashArray<T, S = StdHash> {
    a: Array<T>,
    h: RawHash<'static, usize>,
    strategy: S,
}

impl<T, S: Default> HashArray<T, S> {
    pub fn new() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<T, S: Default> Default for HashArray<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> HashArray<T, S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self {
            a: Array::new(),
            h: RawHash::build(HashConfig::default(), Allocator::owned()),
            strategy,
        }
    }

    pub fn with_config(strategy: S, config: HashConfig) -> Result<Self> {
        Ok(Self {
            a: Array::new(),
            h: RawHash::new(config, Allocator::owned())?,
            strategy,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&T> {
        self.a.get(position)
    }

    pub fn as_slice(&self) -> &[T] {
        self.a.as_slice()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.a.iter()
    }

    /// The index hash, for statistics.
    pub fn index(&self) -> &RawHash<'static, usize> {
        &self.h
    }

    /// Remove every value.
    pub fn truncate(&mut self) {
        self.h.truncate();
        self.a.clear();
    }

    /// Keep the values, drop the index.
    pub fn rip(self) -> Array<T> {
        self.a
    }
}

impl<T, S> HashArray<T, S>
where
    S: HashStrategy<T>,
{
    /// Position of the stored value equal to `v`.
    pub fn lookup(&self, v: &T) -> Option<usize> {
        self.lookup_hashed(self.strategy.hash(v), v)
    }

    fn lookup_hashed(&self, hash: u64, v: &T) -> Option<usize> {
        let (a, strategy) = (&self.a, &self.strategy);
        let found = self.h.find_with(hash, |&i| strategy.equal(&a[i], v))?;
        self.h.get(found).map(|i| *i)
    }

    pub fn contains(&self, v: &T) -> bool {
        self.lookup(v).is_some()
    }

    /// Append `v` unless an equal value is stored. New values always land at
    /// the end of the array.
    pub fn insert_unique(&mut self, v: T) -> Result<usize, Duplicate> {
        let hash = self.strategy.hash(&v);
        if let Some(position) = self.lookup_hashed(hash, &v) {
            return Err(Duplicate { position });
        }
        let position = self.a.len();
        self.a.push(v);
        let (a, strategy) = (&self.a, &self.strategy);
        self.h
            .insert_unchecked(hash, position, |&i| strategy.hash(&a[i]));
        Ok(position)
    }

    /// Every stored value is found again at its own position.
    pub fn is_valid(&self) -> bool {
        self.h.len() == self.a.len()
            && self
                .a
                .iter()
                .enumerate()
                .all(|(i, v)| self.lookup(v) == Some(i))
    }
}

impl<T: core::fmt::Debug, S> core::fmt::Debug for HashArray<T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.a.iter()).finish()
    }
}
