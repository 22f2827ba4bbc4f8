//! # memdex layout constants
//!
//! This module centralizes the constants that define the page and value-heap
//! layouts. Constants that depend on each other are co-located and guarded by
//! compile-time assertions to prevent mismatch bugs.
//!
//! ```text
//! PAGE_SIZE (1024 bytes)
//!       │
//!       └─> SLOT_SIZE (8 bytes: offset u16 + length u16 + ref i32)
//!             The slot directory grows from offset 0; key bytes grow down
//!             from PAGE_SIZE. A page is full when the two regions meet.
//!
//! VALUE_BUF_SIZE (1 MiB)
//!       │
//!       ├─> VALUE_LEN_SIZE (4 bytes, little-endian u32 length prefix)
//!       │
//!       ├─> VALUE_ALIGN (8 bytes; the write cursor is rounded up after
//!       │     every blob so length prefixes stay aligned)
//!       │
//!       └─> MAX_VALUE_SIZE (derived; a blob never spans buffers)
//! ```
//!
//! Page size is a compile-time choice. 1 KiB is tuned for indexes holding
//! millions of small binary keys; raising it to 16 KiB trades tree depth for
//! per-split copy cost.

/// Size of each tree page in bytes. The unit of allocation and of split.
pub const PAGE_SIZE: usize = 1024;

/// Size of one slot directory entry: `{offset: u16, length: u16, ref: i32}`.
pub const SLOT_SIZE: usize = 8;

/// Size of each value-heap buffer in bytes (1 MiB).
pub const VALUE_BUF_SIZE: usize = 1 << 20;

/// Size of the little-endian length prefix in front of every value blob.
pub const VALUE_LEN_SIZE: usize = 4;

/// Alignment of the value-heap write cursor after each blob.
pub const VALUE_ALIGN: usize = 8;

/// Largest single value the heap accepts. A blob never spans buffers, so a
/// value must fit in one buffer together with its length prefix.
pub const MAX_VALUE_SIZE: usize = VALUE_BUF_SIZE - VALUE_LEN_SIZE;

const _: () = assert!(
    PAGE_SIZE % SLOT_SIZE == 0,
    "slot directory must tile the page evenly"
);

const _: () = assert!(
    PAGE_SIZE <= u16::MAX as usize,
    "slot offsets are u16 and must be able to address the whole page"
);

const _: () = assert!(
    VALUE_BUF_SIZE % VALUE_ALIGN == 0,
    "aligned cursors must never step past the buffer end"
);

const _: () = assert!(
    MAX_VALUE_SIZE == VALUE_BUF_SIZE - VALUE_LEN_SIZE,
    "MAX_VALUE_SIZE derivation mismatch"
);
