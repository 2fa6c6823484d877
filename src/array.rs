//! Array: contiguous growable buffer with sort/search, checksum and an
//! embedded binary-heap priority queue.
//!
//! The buffer only grows when a resize needs more room than is allocated,
//! and then geometrically (`ArrayConfig::growth_factor`), so a sequence of
//! single-element pushes is amortized O(1). Shrinking never reallocates;
//! only [`Array::reset`] releases the buffer.
//!
//! One three-way comparator (`FnMut(&T, &T) -> Ordering`) serves
//! [`sort_by`](Array::sort_by), [`uniq_by`](Array::uniq_by),
//! [`bsearch_by`](Array::bsearch_by) and the two pqueue operations.

use crate::checksum::adler32;
use crate::config::ArrayConfig;
use crate::error::{ContainerError, Result};
use core::cmp::Ordering;
use core::ops::{Index, IndexMut};
use log::trace;

pub struct Array<T> {
    buf: Vec<T>,
    config: ArrayConfig,
}

impl<T> Array<T> {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            config: ArrayConfig::default(),
        }
    }

    pub fn with_config(config: ArrayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            buf: Vec::new(),
            config,
        })
    }

    /// Size of one element in bytes.
    #[inline]
    pub fn elem_size(&self) -> usize {
        core::mem::size_of::<T>()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes currently reserved for elements. Never decreases before `reset`.
    #[inline]
    pub fn byte_alloc(&self) -> usize {
        self.buf.capacity().saturating_mul(self.elem_size())
    }

    // Reallocate only when `new_count` elements do not fit.
    fn grow_for(&mut self, new_count: usize) {
        let cap = self.buf.capacity();
        if new_count <= cap {
            return;
        }
        let target = cap
            .saturating_mul(self.config.growth_factor)
            .max(new_count)
            .max(self.config.min_capacity);
        trace!(
            "array grow: {} -> {} elements of {} bytes",
            cap,
            target,
            self.elem_size()
        );
        self.buf.reserve_exact(target - self.buf.len());
    }

    /// Set the element count, filling new positions from `f`.
    pub fn resize_with<F>(&mut self, new_count: usize, f: F)
    where
        F: FnMut() -> T,
    {
        if new_count <= self.buf.len() {
            self.buf.truncate(new_count);
            return;
        }
        self.grow_for(new_count);
        self.buf.resize_with(new_count, f);
    }

    /// Shrink to `new_count` elements; no-op if already shorter.
    pub fn truncate(&mut self, new_count: usize) {
        self.buf.truncate(new_count);
    }

    /// Drop all elements but keep the buffer.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drop all elements and release the buffer.
    pub fn reset(&mut self) {
        self.buf = Vec::new();
    }

    /// Append `v` and return the stored element.
    pub fn push(&mut self, v: T) -> &mut T {
        self.grow_for(self.buf.len() + 1);
        let at = self.buf.len();
        self.buf.push(v);
        &mut self.buf[at]
    }

    /// Remove the last element. `None` on an empty array.
    pub fn pop(&mut self) -> Option<T> {
        self.buf.pop()
    }

    pub fn get(&self, i: usize) -> Option<&T> {
        self.buf.get(i)
    }

    pub fn get_mut(&mut self, i: usize) -> Option<&mut T> {
        self.buf.get_mut(i)
    }

    /// Checked indexing.
    pub fn try_get(&self, i: usize) -> Result<&T> {
        let len = self.buf.len();
        self.buf
            .get(i)
            .ok_or(ContainerError::out_of_bounds(i, len))
    }

    pub fn try_get_mut(&mut self, i: usize) -> Result<&mut T> {
        let len = self.buf.len();
        self.buf
            .get_mut(i)
            .ok_or(ContainerError::out_of_bounds(i, len))
    }

    /// Checked pop.
    pub fn try_pop(&mut self) -> Result<T> {
        self.buf.pop().ok_or(ContainerError::Empty)
    }

    pub fn last(&self) -> Option<&T> {
        self.buf.last()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.buf
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.buf.iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.buf.iter_mut()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.buf
    }

    /// Sort into non-decreasing order under `cmp`.
    pub fn sort_by<F>(&mut self, cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.buf.sort_by(cmp);
    }

    /// Remove adjacent duplicates of an array already sorted by `cmp`.
    pub fn uniq_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.buf.dedup_by(|later, earlier| cmp(earlier, later) == Ordering::Equal);
    }

    /// Binary search for `key` in an array sorted by `cmp`.
    ///
    /// Returns the index of some matching element. The result is unspecified
    /// when the array is not sorted by `cmp`.
    pub fn bsearch_by<F>(&self, key: &T, mut cmp: F) -> Option<usize>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.buf.binary_search_by(|elem| cmp(elem, key)).ok()
    }

    /// Sift the last element up into a heap formed by the elements before it.
    ///
    /// Returns the number of swaps. If every add of a build-up returns zero,
    /// the elements were pushed in sorted order.
    pub fn pqueue_add<F>(&mut self, mut cmp: F) -> usize
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        debug_assert!(!self.buf.is_empty(), "pqueue_add on an empty array");
        let mut swaps = 0;
        let mut child = match self.buf.len() {
            0 => return 0,
            n => n - 1,
        };
        while child > 0 {
            let parent = (child - 1) / 2;
            if cmp(&self.buf[parent], &self.buf[child]) != Ordering::Greater {
                break;
            }
            self.buf.swap(parent, child);
            swaps += 1;
            child = parent;
        }
        swaps
    }

    /// Push `v` and restore the heap; returns the swap count.
    pub fn pqueue_push<F>(&mut self, v: T, cmp: F) -> usize
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.push(v);
        self.pqueue_add(cmp)
    }

    /// Remove the smallest element of a valid heap.
    ///
    /// The last element takes the root's place and sifts down; the returned
    /// count covers only the sift-down swaps.
    pub fn pqueue_pop<F>(&mut self, mut cmp: F) -> Option<(T, usize)>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        if self.buf.is_empty() {
            return None;
        }
        let root = self.buf.swap_remove(0);
        let n = self.buf.len();
        let mut swaps = 0;
        let mut parent = 0;
        loop {
            let left = 2 * parent + 1;
            if left >= n {
                break;
            }
            let right = left + 1;
            let child = if right < n && cmp(&self.buf[right], &self.buf[left]) == Ordering::Less
            {
                right
            } else {
                left
            };
            if cmp(&self.buf[parent], &self.buf[child]) != Ordering::Greater {
                break;
            }
            self.buf.swap(parent, child);
            swaps += 1;
            parent = child;
        }
        Some((root, swaps))
    }

    /// True if every parent compares no greater than its children.
    pub fn is_heap_by<F>(&self, mut cmp: F) -> bool
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        (1..self.buf.len()).all(|i| cmp(&self.buf[(i - 1) / 2], &self.buf[i]) != Ordering::Greater)
    }
}

impl<T: Default> Array<T> {
    /// Set the element count; new positions hold `T::default()`.
    pub fn resize(&mut self, new_count: usize) {
        self.resize_with(new_count, T::default);
    }
}

impl<T: Ord> Array<T> {
    pub fn sort(&mut self) {
        self.sort_by(Ord::cmp);
    }

    pub fn uniq(&mut self) {
        self.uniq_by(Ord::cmp);
    }

    pub fn bsearch(&self, key: &T) -> Option<usize> {
        self.bsearch_by(key, Ord::cmp)
    }
}

impl<T: bytemuck::Pod> Array<T> {
    /// Adler-32 of the raw bytes of elements `[first_elem, len)`.
    ///
    /// `first_elem` may equal `len`, which checksums the empty range.
    pub fn checksum(&self, first_elem: usize) -> u32 {
        assert!(
            first_elem <= self.buf.len(),
            "checksum start {} past length {}",
            first_elem,
            self.buf.len()
        );
        if self.elem_size() == 0 {
            return adler32(&[]);
        }
        adler32(bytemuck::cast_slice(&self.buf[first_elem..]))
    }
}

impl<T> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.buf.iter()).finish()
    }
}

impl<T> From<Vec<T>> for Array<T> {
    fn from(buf: Vec<T>) -> Self {
        Self {
            buf,
            config: ArrayConfig::default(),
        }
    }
}

impl<T> Index<usize> for Array<T> {
    type Output = T;
    #[inline]
    fn index(&self, i: usize) -> &T {
        debug_assert!(i < self.buf.len(), "index {} past length {}", i, self.buf.len());
        &self.buf[i]
    }
}

impl<T> IndexMut<usize> for Array<T> {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut T {
        debug_assert!(i < self.buf.len(), "index {} past length {}", i, self.buf.len());
        &mut self.buf[i]
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.buf.iter()
    }
}
