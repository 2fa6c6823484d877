//! Debug-only reentrancy guard for hash tables.
//!
//! Hash tables call user code (hash and equality strategies, rehash
//! closures) while a slot chain is half walked or half relinked. A strategy
//! that re-enters the same table at that point would see a broken chain.
//! Each table entry point therefore marks the table busy with the name of
//! the running operation, and a nested entry panics naming both. Release
//! builds keep only the borrow; nothing is recorded or checked.

use core::cell::Cell;
use core::marker::PhantomData;

/// Records which operation, if any, is running on one table.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    active: Cell<Option<&'static str>>,
    _nosend: PhantomData<*mut ()>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _nosend: PhantomData,
        }
    }

    /// The operation currently holding the table. Always `None` in release
    /// builds.
    pub fn active(&self) -> Option<&'static str> {
        #[cfg(debug_assertions)]
        {
            self.active.get()
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    }

    pub fn is_entered(&self) -> bool {
        self.active().is_some()
    }

    /// Mark the table busy with `op` until the guard drops.
    ///
    /// # Panics
    /// In debug builds, if another operation already holds the table.
    #[inline]
    pub fn enter(&self, op: &'static str) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        if let Some(running) = self.active.get() {
            panic!("reentrancy detected: {op} on a hash table that is inside {running}");
        }
        self.set(Some(op));
        ReentrancyGuard { table: self }
    }

    #[inline]
    fn set(&self, _op: Option<&'static str>) {
        #[cfg(debug_assertions)]
        self.active.set(_op);
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds a table busy; returned by [`DebugReentrancy::enter`].
pub struct ReentrancyGuard<'a> {
    table: &'a DebugReentrancy,
}

impl ReentrancyGuard<'_> {
    /// Rename the running operation, e.g. an insert that went on to grow.
    pub fn relabel(&self, op: &'static str) {
        self.table.set(Some(op));
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.table.set(None);
    }
}
