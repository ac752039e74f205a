// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - On-disk format constants and header field encoding
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A bag is the magic line followed by records. Every record is
//
//   [4 bytes: header_len (u32 LE)]
//   [header_len bytes: header fields]
//   [4 bytes: data_len (u32 LE)]
//   [data_len bytes: data]
//
// and every header field is
//
//   [4 bytes: field_len (u32 LE)]   -- len(name) + 1 + len(value)
//   [name bytes]['='][value bytes]
//
// Integer values are raw little-endian, strings are raw bytes with no
// terminator, and timestamps are `sec: u32` then `nsec: u32`.

use std::io;

use crate::error::BagResult;
use crate::time::Time;

/// The first bytes of every bag file.
pub const MAGIC: &[u8] = b"#ROSBAG V2.0\n";

/// Header length plus data length of the padded BAG_HEADER record.
pub const BAG_HEADER_LENGTH: usize = 4096;

/// Version written into INDEX_DATA and CHUNK_INFO records.
pub const INDEX_VERSION: u32 = 1;

/// Compression tag for uncompressed chunks.
pub const COMPRESSION_NONE: &str = "none";

/// Byte used to pad the BAG_HEADER data block.
pub const HEADER_PAD_BYTE: u8 = b' ';

/// Size of one INDEX_DATA entry: time (8) + offset (4).
pub const INDEX_ENTRY_SIZE: usize = 12;

/// Size of one CHUNK_INFO entry: conn (4) + count (4).
pub const CHUNK_INFO_ENTRY_SIZE: usize = 8;

/// Header field names.
pub mod field {
    pub const OP: &str = "op";
    pub const INDEX_POS: &str = "index_pos";
    pub const CONN_COUNT: &str = "conn_count";
    pub const CHUNK_COUNT: &str = "chunk_count";
    pub const CONN: &str = "conn";
    pub const TOPIC: &str = "topic";
    pub const TIME: &str = "time";
    pub const COMPRESSION: &str = "compression";
    pub const SIZE: &str = "size";
    pub const VER: &str = "ver";
    pub const COUNT: &str = "count";
    pub const CHUNK_POS: &str = "chunk_pos";
    pub const START_TIME: &str = "start_time";
    pub const END_TIME: &str = "end_time";
    pub const TYPE: &str = "type";
    pub const MD5SUM: &str = "md5sum";
    pub const MESSAGE_DEFINITION: &str = "message_definition";
    pub const CALLERID: &str = "callerid";
    pub const LATCHING: &str = "latching";
}

// ---------------------------------------------------------------------------
// OpCode
// ---------------------------------------------------------------------------

/// Record kind, stored in the `op` header field as a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// One serialized message. Only ever present inside a chunk.
    MessageData = 0x02,
    /// The fixed-size file header pointing at the index section.
    BagHeader = 0x03,
    /// Per-connection `(time, offset)` entries for the preceding chunk.
    IndexData = 0x04,
    /// A block of concatenated MESSAGE_DATA records.
    Chunk = 0x05,
    /// Trailing summary of one chunk.
    ChunkInfo = 0x06,
    /// Topic metadata.
    Connection = 0x07,
}

impl OpCode {
    /// Decode a single byte into an `OpCode`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x02 => Some(Self::MessageData),
            0x03 => Some(Self::BagHeader),
            0x04 => Some(Self::IndexData),
            0x05 => Some(Self::Chunk),
            0x06 => Some(Self::ChunkInfo),
            0x07 => Some(Self::Connection),
            _ => None,
        }
    }

    /// Encode this op code as a single byte.
    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

// ---------------------------------------------------------------------------
// Field encoding
// ---------------------------------------------------------------------------

/// Encoded size of one header field, including its length prefix.
pub const fn field_len(name: &str, value_len: usize) -> usize {
    4 + name.len() + 1 + value_len
}

/// Append one encoded header field to `out`.
pub fn put_field(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    let inner = (name.len() + 1 + value.len()) as u32;
    out.extend_from_slice(&inner.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.push(b'=');
    out.extend_from_slice(value);
}

/// An ordered set of `name=value` header fields.
///
/// Fields are encoded in insertion order. Builders in this crate insert them
/// in ascending name order, matching the standard recorder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    fields: Vec<(String, Vec<u8>)>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw field.
    pub fn with(mut self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push((name.to_string(), value.into()));
        self
    }

    /// Append the `op` field.
    pub fn with_op(self, op: OpCode) -> Self {
        self.with(field::OP, vec![op.to_byte()])
    }

    pub fn with_u32(self, name: &str, value: u32) -> Self {
        self.with(name, value.to_le_bytes().to_vec())
    }

    pub fn with_u64(self, name: &str, value: u64) -> Self {
        self.with(name, value.to_le_bytes().to_vec())
    }

    pub fn with_time(self, name: &str, value: Time) -> Self {
        self.with(name, value.to_le_bytes().to_vec())
    }

    pub fn with_str(self, name: &str, value: &str) -> Self {
        self.with(name, value.as_bytes().to_vec())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(name, value)` pairs in encoding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_slice()))
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(name, value)| field_len(name, value.len()))
            .sum()
    }

    /// Append the encoded fields to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.reserve(self.encoded_len());
        for (name, value) in &self.fields {
            put_field(out, name, value);
        }
    }

    /// Encode the fields into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Parse an encoded header block.
    pub fn decode(bytes: &[u8]) -> BagResult<Self> {
        let mut fields = Vec::new();
        let mut offset = 0usize;

        while offset < bytes.len() {
            if offset + 4 > bytes.len() {
                return Err(invalid_data(format!(
                    "truncated field length at offset {offset}"
                )));
            }
            let len = u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]) as usize;
            offset += 4;

            if offset + len > bytes.len() {
                return Err(invalid_data(format!(
                    "field at offset {offset} declares {len} bytes, only {} remain",
                    bytes.len() - offset
                )));
            }
            let body = &bytes[offset..offset + len];
            let separator = body
                .iter()
                .position(|&b| b == b'=')
                .ok_or_else(|| invalid_data(format!("field at offset {offset} has no '='")))?;
            let name = String::from_utf8(body[..separator].to_vec())
                .map_err(|err| invalid_data(format!("field name is not UTF-8: {err}")))?;
            fields.push((name, body[separator + 1..].to_vec()));
            offset += len;
        }

        Ok(Self { fields })
    }

    /// Raw value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .iter()
            .find(|(field_name, _)| field_name == name)
            .map(|(_, value)| value.as_slice())
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        let value = self.get(name)?;
        Some(u32::from_le_bytes(value.try_into().ok()?))
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        let value = self.get(name)?;
        Some(u64::from_le_bytes(value.try_into().ok()?))
    }

    pub fn get_time(&self, name: &str) -> Option<Time> {
        let value = self.get(name)?;
        Some(Time::from_le_bytes(value.try_into().ok()?))
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        std::str::from_utf8(self.get(name)?).ok()
    }

    /// The decoded `op` field, if present and known.
    pub fn op(&self) -> Option<OpCode> {
        match self.get(field::OP)? {
            [byte] => OpCode::from_byte(*byte),
            _ => None,
        }
    }
}

fn invalid_data(message: String) -> crate::error::BagError {
    io::Error::new(io::ErrorKind::InvalidData, message).into()
}
