//! pool-containers: single-threaded, typed containers built in layers over
//! a growable array and a block pool.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: the classic C container toolkit (growable array, block pool,
//!   pooled linked list, chained hash table, hash-backed array, recycling
//!   array) with element types and ownership expressed in the type system.
//! - Layers:
//!   - Array<T>: Vec-backed buffer with a geometric growth policy, sorting,
//!     dedup, binary search, a binary min-heap and an Adler-32 checksum.
//!   - Mempool<T>: slotmap-backed block pool with LIFO recycling and
//!     generational `Block` keys.
//!   - List<'a, T>: singly linked list whose links live in an owned or a
//!     borrowed pool.
//!   - RawHash / Hash<'a, T, S>: separate chaining over pooled links, slots
//!     kept in an `Array`, hashing and equality supplied by a
//!     `HashStrategy`.
//!   - HashArray<T, S>: `Array` of unique values plus a `RawHash` of their
//!     positions.
//!   - RecycleArray<T>: `Array` plus a free-position stack.
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` through `RefCell` and the reentrancy
//!   marker. No internal locking.
//! - Precondition violations on the plain API are debug assertions plus
//!   the usual slice/slotmap panics; every such operation has a checked
//!   `try_*` twin returning [`ContainerError`].
//! - "Found / not found" and "inserted / duplicate" are ordinary
//!   `Option`/`Result` values, never errors.
//!
//! Allocator sharing
//! - A list or hash either owns its pool or borrows a [`SharedPool`] for
//!   `'a`. The borrow checker keeps the pool alive for every borrower, and
//!   `SharedPool::truncate` needs `&mut`, so it cannot run while any
//!   borrower exists.
//! - Dropping a borrower returns its links to the shared pool. `unlink`
//!   forgets them instead, which is O(1) per chain; the links stay
//!   allocated until the pool itself is truncated or dropped.
//!
//! Reentrancy policy
//! - `RawHash` runs user code (strategy hash/equality, rehash closures)
//!   while a chain is being walked or relinked. A debug-only guard panics
//!   if that code re-enters the same table. Release builds drop the guard.
//! - Removed values are handed back after the table is consistent again,
//!   so their `Drop` may touch the table freely.
//!
//! Hashing
//! - Entries do not cache their hash. A resize asks the caller's rehash
//!   closure for each entry's hash and relinks the existing links; no
//!   entry is moved or reallocated, so handles survive resizes.
//!
//! Notes and non-goals
//! - No iteration-order guarantees for `Hash`.
//! - No thread-safe variants.
//! - No wire or file format.

pub mod array;
pub mod checksum;
pub mod config;
pub mod error;
pub mod hash;
pub mod hash_array;
mod hash_proptest;
pub mod jenkins;
pub mod list;
pub mod mempool;
pub mod recycle_array;
pub mod reentrancy;
pub mod strategy;

// Public surface
pub use array::Array;
pub use config::{ArrayConfig, HashConfig, MempoolConfig};
pub use error::{ContainerError, Result};
pub use hash::{Handle, Hash, HashStats, InsertError, RawHash};
pub use hash_array::{Duplicate, HashArray};
pub use list::{Blocks, Link, List};
pub use mempool::{Allocator, Block, Mempool, MempoolStats, SharedPool};
pub use recycle_array::RecycleArray;
pub use reentrancy::DebugReentrancy;
pub use strategy::{FnHash, HashStrategy, Lookup3, StdHash};
