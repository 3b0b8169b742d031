//! Error types for lockstep skip lists
//!
//! This module defines the error types shared by both skip list variants.

use thiserror::Error;

/// The error type for lockstep skip list operations
#[derive(Error, Debug)]
pub enum Error {
    /// The supplied [`SkipListConfig`](crate::SkipListConfig) was invalid
    #[error("invalid skip list config: {0}")]
    InvalidConfig(String),

    /// Node allocation failed
    ///
    /// Unreachable in practice: this crate treats allocation as infallible,
    /// matching the global allocator's abort-on-OOM behavior. The variant is
    /// kept for forward-compatibility with a fallible-allocation story.
    #[error("node allocation failed")]
    AllocationFailed,
}

/// A specialized Result type for lockstep operations
pub type Result<T> = std::result::Result<T, Error>;
