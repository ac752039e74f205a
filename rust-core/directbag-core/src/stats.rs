// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Writer statistics
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

use serde::Serialize;

/// Counters accumulated by a [`crate::DirectBag`].
///
/// All counters are monotonically increasing for the lifetime of the writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BagStats {
    /// Messages accepted by `write`.
    pub messages_written: u64,
    /// Distinct topics seen.
    pub connections: u32,
    /// CHUNK records written.
    pub chunks_flushed: u64,
    /// Bytes written to the file, magic line included.
    pub bytes_written: u64,
    /// Data size of the largest chunk written.
    pub largest_chunk_bytes: u64,
}
