// SPDX-License-Identifier: PMPL-1.0-or-later
//! Writer configuration.
//!
//! Defaults match the standard recorder: 768 KiB chunks, one fsync when the
//! bag is closed.

use serde::{Deserialize, Serialize};

use crate::error::{BagError, BagResult};

/// Default soft chunk size limit in bytes (768 KiB).
pub const DEFAULT_CHUNK_THRESHOLD: u32 = 768 * 1024;

/// Controls when the writer calls `fsync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Sync after every chunk and its index records. Bounds data loss on a
    /// crash to the chunk being filled.
    EveryChunk,
    /// Sync once, after the index section and header patch are written.
    OnClose,
    /// Never sync explicitly; rely on the OS page cache.
    Never,
}

/// Configuration for a [`crate::DirectBag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BagConfig {
    /// Soft upper bound on a chunk's size. Checked before each message is
    /// appended, so a chunk may exceed it by one message.
    pub chunk_threshold_bytes: u32,
    /// fsync policy.
    pub sync_mode: SyncMode,
    /// Caller id recorded for connections whose codec does not supply one.
    pub caller_id: Option<String>,
}

impl BagConfig {
    /// Default configuration with a different chunk threshold.
    pub fn with_chunk_threshold(chunk_threshold_bytes: u32) -> Self {
        Self {
            chunk_threshold_bytes,
            ..Self::default()
        }
    }

    /// Reject configurations the writer cannot honour.
    pub fn validate(&self) -> BagResult<()> {
        if self.chunk_threshold_bytes == 0 {
            return Err(BagError::Configuration(
                "chunk_threshold_bytes must be greater than zero".to_string(),
            ));
        }
        if matches!(&self.caller_id, Some(caller_id) if caller_id.is_empty()) {
            return Err(BagError::Configuration(
                "caller_id must not be empty when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json_str(json: &str) -> BagResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| BagError::Configuration(format!("invalid bag config: {err}")))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            chunk_threshold_bytes: DEFAULT_CHUNK_THRESHOLD,
            sync_mode: SyncMode::OnClose,
            caller_id: None,
        }
    }
}
