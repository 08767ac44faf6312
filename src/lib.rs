#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Error type shared by every fallible table operation.
pub mod error;

/// A HashMap implementation over the tombstone hash table.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a standard key-value map interface plus slot-handle access.
pub mod hash_map;

pub mod hash_table;

/// A hash set implementation over the tombstone hash table.
///
/// This module provides a `HashSet` that wraps a set-mode `HashTable` and
/// provides a standard set interface with set algebra.
pub mod hash_set;

pub mod hashing;

pub use error::TryReserveError;
pub use hash_map::HashMap;
pub use hash_map::Sentinel;
pub use hash_set::HashSet;
pub use hash_table::Entry;
pub use hash_table::HashTable;
pub use hash_table::MoveLive;
pub use hash_table::Realloc;
pub use hash_table::Relocate;
pub use hashing::AutoHash;
pub use hashing::HashStrategy;
