//! # memdex — in-memory ordered byte-string index
//!
//! memdex is a B+-tree over fixed-size slotted pages, built for workloads
//! that assemble large read-mostly indexes in memory: millions of small
//! binary keys, point lookups, and ordered prefix scans. Values live in a
//! log-structured heap so pages stay dense and allocation stays coarse.
//!
//! ## Quick start
//!
//! ```
//! use memdex::Btree;
//!
//! let mut index = Btree::new();
//! index.put(b"user:7", b"alice");
//! index.put(b"user:9", b"bob");
//!
//! assert_eq!(index.get(b"user:7"), Some(&b"alice"[..]));
//! for (key, value) in index.start(b"user:") {
//!     println!("{:?} -> {:?}", key, value);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Surface traits (Read/Write/Bulk)      │   index
//! ├─────────────────────────────────────────┤
//! │   Btree: descent, split, bulk append,   │   btree::tree
//! │   sibling-chain iterator, audit         │
//! ├───────────────────────┬─────────────────┤
//! │   Page: slotted node  │  ValueStore:    │   btree::page / values
//! │   search/insert/split │  append-only log│
//! ├───────────────────────┴─────────────────┤
//! │   Pager: page arena, ref recycling      │   btree::pager
//! └─────────────────────────────────────────┘
//! ```
//!
//! Two write paths feed the tree. Random [`Btree::put`] splits full pages in
//! half and promotes separators. In-order [`Btree::put_next`] requires
//! strictly increasing keys and appends fresh rightmost leaves instead of
//! splitting, which packs leaves to capacity — build a sorted snapshot with
//! it, then serve reads.
//!
//! ## Sharing and lifetimes
//!
//! The tree is single-writer and has no internal synchronization; wrap it in
//! an external lock for concurrent readers. Slices returned by lookups and
//! scans alias internal storage and are valid until the next mutating call —
//! the borrow checker enforces exactly that rule, so it costs nothing at
//! runtime.
//!
//! ## Non-goals
//!
//! No persistence, no deletes, no value reclamation: replacing or appending
//! to a key orphans the old blob in the heap. These are deliberate
//! trade-offs for fast build and low overhead, not roadmap gaps.

pub mod btree;
pub mod config;
pub mod index;
pub mod keys;
pub mod values;

pub use btree::{Btree, BtreeIter, BtreeStats, Page, PageIter, PageRef, Pager, Slot};
pub use index::{BulkWriteIndex, Index, ReadIndex, WriteIndex};
pub use values::{ValueRef, ValueStore};
