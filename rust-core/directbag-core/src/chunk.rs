// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Chunk accumulation
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Messages are framed as MESSAGE_DATA records into an in-memory chunk and
// written to disk as one CHUNK record, followed by one INDEX_DATA record per
// connection present in the chunk. Index offsets are relative to the start
// of the chunk's data block. A `ChunkInfo` per flushed chunk feeds the
// trailing index section written at close.

use std::collections::BTreeMap;
use std::mem;

use crate::error::{BagError, BagResult};
use crate::format::{
    field, field_len, put_field, HeaderFields, OpCode, CHUNK_INFO_ENTRY_SIZE, COMPRESSION_NONE,
    INDEX_ENTRY_SIZE, INDEX_VERSION,
};
use crate::record::framed_len;
use crate::time::Time;

/// Encoded size of a MESSAGE_DATA header (`conn`, `op`, `time`).
pub const MESSAGE_HEADER_LEN: usize =
    field_len(field::CONN, 4) + field_len(field::OP, 1) + field_len(field::TIME, 8);

/// On-disk size of a MESSAGE_DATA record carrying `payload_len` bytes.
pub const fn message_record_len(payload_len: usize) -> usize {
    framed_len(MESSAGE_HEADER_LEN, payload_len)
}

/// Chunk-relative offset for a record of `record_len` bytes appended to a
/// chunk already holding `held` bytes. Chunk offsets are `u32`, so the record
/// must end within 4 GiB.
fn next_offset(topic: &str, held: usize, record_len: usize) -> BagResult<u32> {
    let end = held.checked_add(record_len);
    match (u32::try_from(held), end) {
        (Ok(offset), Some(end)) if end <= u32::MAX as usize => Ok(offset),
        _ => Err(BagError::encoding(
            topic,
            format!("a {record_len} byte record does not fit a chunk already holding {held} bytes"),
        )),
    }
}

/// Locates one message inside its chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub time: Time,
    /// Offset of the MESSAGE_DATA record from the start of the chunk data.
    pub offset: u32,
}

// ---------------------------------------------------------------------------
// ChunkBuffer
// ---------------------------------------------------------------------------

/// The chunk currently being filled.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    bytes: Vec<u8>,
    start_time: Time,
    end_time: Time,
    index: BTreeMap<u32, Vec<IndexEntry>>,
    message_count: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate room for `capacity` bytes of framed messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Frame `payload` as a MESSAGE_DATA record and index it under
    /// `connection_id`. `topic` only names the message in errors.
    pub fn append(
        &mut self,
        topic: &str,
        connection_id: u32,
        time: Time,
        payload: &[u8],
    ) -> BagResult<()> {
        let record_len = message_record_len(payload.len());
        let offset = next_offset(topic, self.bytes.len(), record_len)?;

        if self.message_count == 0 {
            self.start_time = time;
            self.end_time = time;
        } else {
            self.start_time = self.start_time.min(time);
            self.end_time = self.end_time.max(time);
        }

        self.index
            .entry(connection_id)
            .or_default()
            .push(IndexEntry { time, offset });

        self.bytes.reserve(record_len);
        self.bytes
            .extend_from_slice(&(MESSAGE_HEADER_LEN as u32).to_le_bytes());
        put_field(&mut self.bytes, field::CONN, &connection_id.to_le_bytes());
        put_field(&mut self.bytes, field::OP, &[OpCode::MessageData.to_byte()]);
        put_field(&mut self.bytes, field::TIME, &time.to_le_bytes());
        self.bytes
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(payload);

        self.message_count += 1;
        Ok(())
    }

    /// Bytes of framed messages buffered so far.
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// Take the buffered messages as an immutable chunk and reset to empty.
    pub fn finalize(&mut self) -> Chunk {
        let chunk = Chunk {
            bytes: mem::take(&mut self.bytes),
            start_time: self.start_time,
            end_time: self.end_time,
            index: mem::take(&mut self.index),
        };
        self.start_time = Time::MIN;
        self.end_time = Time::MIN;
        self.message_count = 0;
        chunk
    }

    /// Hand a written chunk's allocation back for reuse.
    pub fn recycle(&mut self, chunk: Chunk) {
        if self.bytes.capacity() == 0 {
            let mut bytes = chunk.bytes;
            bytes.clear();
            self.bytes = bytes;
        }
    }
}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A finalized chunk ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Concatenated MESSAGE_DATA records.
    pub bytes: Vec<u8>,
    pub start_time: Time,
    pub end_time: Time,
    /// Per-connection index entries in append order.
    pub index: BTreeMap<u32, Vec<IndexEntry>>,
}

impl Chunk {
    /// Header of the CHUNK record.
    pub fn record_header(&self) -> HeaderFields {
        HeaderFields::new()
            .with_str(field::COMPRESSION, COMPRESSION_NONE)
            .with_op(OpCode::Chunk)
            .with_u32(field::SIZE, self.bytes.len() as u32)
    }

    /// Number of messages per connection.
    pub fn message_counts(&self) -> BTreeMap<u32, u32> {
        self.index
            .iter()
            .map(|(&conn, entries)| (conn, entries.len() as u32))
            .collect()
    }

    pub fn message_count(&self) -> usize {
        self.index.values().map(Vec::len).sum()
    }

    /// INDEX_DATA records (header, data) in connection id order.
    pub fn index_records(&self) -> impl Iterator<Item = (HeaderFields, Vec<u8>)> + '_ {
        self.index.iter().map(|(&conn, entries)| {
            let header = HeaderFields::new()
                .with_u32(field::CONN, conn)
                .with_u32(field::COUNT, entries.len() as u32)
                .with_op(OpCode::IndexData)
                .with_u32(field::VER, INDEX_VERSION);
            let mut data = Vec::with_capacity(entries.len() * INDEX_ENTRY_SIZE);
            for entry in entries {
                data.extend_from_slice(&entry.time.to_le_bytes());
                data.extend_from_slice(&entry.offset.to_le_bytes());
            }
            (header, data)
        })
    }

    /// Summary of this chunk once written at `chunk_pos`.
    pub fn info(&self, chunk_pos: u64) -> ChunkInfo {
        ChunkInfo {
            chunk_pos,
            start_time: self.start_time,
            end_time: self.end_time,
            message_counts: self.message_counts(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkInfo
// ---------------------------------------------------------------------------

/// Trailing-index summary of one flushed chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfo {
    /// File offset of the CHUNK record.
    pub chunk_pos: u64,
    pub start_time: Time,
    pub end_time: Time,
    pub message_counts: BTreeMap<u32, u32>,
}

impl ChunkInfo {
    /// Header of the CHUNK_INFO record.
    pub fn record_header(&self) -> HeaderFields {
        HeaderFields::new()
            .with_u64(field::CHUNK_POS, self.chunk_pos)
            .with_u32(field::COUNT, self.message_counts.len() as u32)
            .with_time(field::END_TIME, self.end_time)
            .with_op(OpCode::ChunkInfo)
            .with_time(field::START_TIME, self.start_time)
            .with_u32(field::VER, INDEX_VERSION)
    }

    /// Data of the CHUNK_INFO record: `(conn, count)` pairs.
    pub fn record_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.message_counts.len() * CHUNK_INFO_ENTRY_SIZE);
        for (conn, count) in &self.message_counts {
            data.extend_from_slice(&conn.to_le_bytes());
            data.extend_from_slice(&count.to_le_bytes());
        }
        data
    }
}
