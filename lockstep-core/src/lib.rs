//! Core types shared by the lockstep skip list crates
//!
//! This crate contains the configuration and error handling used by both the
//! coarse-locked and the lock-coupled concurrent skip list implementations in
//! `lockstep-skiplist`.
//!
//! # Example
//!
//! ```
//! use lockstep_core::SkipListConfig;
//!
//! let config = SkipListConfig::default();
//! assert_eq!(config.max_level, 16);
//! ```

pub mod config;
pub mod error;

pub use config::SkipListConfig;
pub use error::{Error, Result};
