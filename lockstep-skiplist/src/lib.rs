//! A concurrent, ordered, in-memory key-value index
//!
//! This crate implements the same `OrderedMap` contract two ways:
//!
//! - [`LockedSkipList`]: a lock-coupling skip list. Readers never lock;
//!   writers take optimistic per-node locks on just the predecessors they
//!   touch, validate their view hasn't changed underneath them, and retry
//!   on contention. Removed nodes are handed to an epoch-based garbage
//!   collector rather than freed immediately, so a reader that is mid-walk
//!   over a node another thread just unlinked never touches freed memory.
//! - [`FatSkipList`]: the same structure behind a single mutex. Simpler,
//!   fully serialized, and used as the oracle the test suite checks
//!   `LockedSkipList` against.
//!
//! Both variants draw node heights from [`LevelGenerator`], and both
//! implement [`OrderedMap`].
//!
//! # Example
//!
//! ```
//! use lockstep_core::SkipListConfig;
//! use lockstep_skiplist::{LockedSkipList, OrderedMap};
//!
//! let index = LockedSkipList::new(SkipListConfig::default());
//! assert!(index.insert(7, "seven"));
//! assert_eq!(index.search(&7), Some("seven"));
//! ```

pub mod fat;
pub mod interface;
pub mod level_generator;
pub mod locked;

pub use fat::FatSkipList;
pub use interface::OrderedMap;
pub use level_generator::LevelGenerator;
pub use locked::LockedSkipList;

pub use lockstep_core::{Error, Result, SkipListConfig};
