//! Error types for tagwatch core operations.
//!
//! This module defines the error types used throughout the `tagwatch-core` crate.

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tagwatch core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A storage key could not be decoded.
    #[error("Invalid storage key '{key}': {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// Reason the key is invalid.
        reason: String,
    },

    /// A subscription record is missing a field its provider requires.
    #[error("Invalid subscription '{id}': {reason}")]
    InvalidSubscription {
        /// Subscription identifier.
        id: String,
        /// Reason the subscription is invalid.
        reason: String,
    },
}
