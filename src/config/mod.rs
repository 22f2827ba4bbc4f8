//! Configuration constants for memdex.
//!
//! All layout-defining constants live in [`constants`]; import them from
//! there rather than redefining locally.

mod constants;

pub use constants::*;
