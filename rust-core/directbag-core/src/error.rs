// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every error is fatal to the writer instance that produced it. There is no
// retry and no rollback: a file left behind after a failure may be truncated.

use thiserror::Error;

/// Errors that can occur while writing a bag.
#[derive(Debug, Error)]
pub enum BagError {
    /// The writer could not be constructed: unwritable path, zero chunk
    /// threshold, or otherwise invalid [`crate::BagConfig`].
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A message could not be encoded. Raised when a codec's
    /// `serialize` output disagrees with its `serialized_len`, or when its
    /// connection metadata is malformed.
    #[error("encoding error on topic '{topic}': {reason}")]
    Encoding {
        /// Topic the offending message was written to.
        topic: String,
        /// What went wrong.
        reason: String,
    },

    /// A write or seek on the underlying file failed.
    #[error("bag I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The writer was used after `close()` or after an earlier fatal error.
    #[error("usage error: {0}")]
    Usage(String),

    /// A timestamp cannot be represented as unsigned 32-bit seconds since
    /// the Unix epoch.
    #[error("time out of range: {seconds} s is not representable as a bag timestamp")]
    TimeOutOfRange {
        /// The offending number of seconds since the epoch.
        seconds: i64,
    },
}

impl BagError {
    /// Shorthand for an [`BagError::Encoding`] on `topic`.
    pub fn encoding(topic: &str, reason: impl Into<String>) -> Self {
        Self::Encoding {
            topic: topic.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for bag results.
pub type BagResult<T> = Result<T, BagError>;
