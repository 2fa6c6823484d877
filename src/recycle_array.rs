//! RecycleArray: array slots handed out by position and reused after removal.
//!
//! Removed positions go on a free stack `f`; `insert` pops from it before
//! growing `a`. Positions of live entries never move.

use crate::array::Array;
use crate::error::{ContainerError, Result};

pub struct RecycleArray<T> {
    a: Array<T>,
    f: Array<usize>,
    elem_count: usize,
}

impl<T> RecycleArray<T> {
    pub fn new() -> Self {
        Self {
            a: Array::new(),
            f: Array::new(),
            elem_count: 0,
        }
    }

    /// Drop every entry and release both buffers.
    pub fn reset(&mut self) {
        self.a.reset();
        self.f.reset();
        self.elem_count = 0;
    }

    /// Live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.elem_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elem_count == 0
    }

    /// Positions ever handed out, live or free.
    pub fn slots(&self) -> usize {
        self.a.len()
    }

    pub fn free_slots(&self) -> usize {
        self.f.len()
    }

    /// Store `v`, preferring the most recently freed position.
    pub fn insert(&mut self, v: T) -> usize {
        let position = match self.f.pop() {
            Some(p) => {
                self.a[p] = v;
                p
            }
            None => {
                self.a.push(v);
                self.a.len() - 1
            }
        };
        self.elem_count += 1;
        debug_assert_eq!(self.elem_count + self.f.len(), self.a.len());
        position
    }

    /// Free `position`. The returned value stays readable until the slot is
    /// reused.
    ///
    /// `position` must hold a live entry; see [`try_remove`](Self::try_remove)
    /// for a checked variant.
    pub fn remove(&mut self, position: usize) -> &T {
        debug_assert!(position < self.a.len(), "remove past the end");
        debug_assert!(
            !self.f.iter().any(|&p| p == position),
            "remove of a free slot"
        );
        self.f.push(position);
        self.elem_count -= 1;
        &self.a[position]
    }

    /// Checked remove. O(free slots).
    pub fn try_remove(&mut self, position: usize) -> Result<&T> {
        if position >= self.a.len() {
            return Err(ContainerError::out_of_bounds(position, self.a.len()));
        }
        if self.f.iter().any(|&p| p == position) {
            return Err(ContainerError::AlreadyFree { position });
        }
        Ok(self.remove(position))
    }

    /// Entry at `position`. Freed slots still read back their last value.
    pub fn get(&self, position: usize) -> Option<&T> {
        self.a.get(position)
    }

    pub fn get_mut(&mut self, position: usize) -> Option<&mut T> {
        self.a.get_mut(position)
    }
}

impl<T> Default for RecycleArray<T> {
    fn default() -> Self {
        Self::new()
    }
}
