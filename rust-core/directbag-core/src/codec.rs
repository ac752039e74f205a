// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Message codec contract and ROS1 wire primitives
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Any value written to a bag implements `MessageCodec`: it reports the
// metadata stored in its topic's connection record, predicts its serialized
// length, and serializes itself. Generated-style message structs implement
// `RosMessage` (static metadata + `WireEncode`) and get `MessageCodec` for
// free; `RawMessage` carries bytes serialized elsewhere.
//
// Wire encoding (ROS1 serialization, little-endian throughout):
//   fixed-width numbers   -- raw LE bytes
//   bool                  -- one byte, 0 or 1
//   string, T[]           -- u32 element count, then the elements
//   T[N]                  -- N elements, no prefix
//   time                  -- u32 sec, then u32 nsec

use std::io;

use crate::error::{BagError, BagResult};
use crate::time::Time;

/// Length of an MD5 digest rendered as hex.
pub const MD5_HEX_LEN: usize = 32;

/// Digest accepted by the standard tools as "any schema".
pub const WILDCARD_MD5: &str = "*";

// ---------------------------------------------------------------------------
// MessageCodec
// ---------------------------------------------------------------------------

/// The capability every writable message value provides.
///
/// `serialize` must append exactly `serialized_len()` bytes. The writer
/// checks this on every call and treats a mismatch as a fatal encoding
/// error.
pub trait MessageCodec {
    /// Fully qualified type name, e.g. `sensor_msgs/Image`.
    fn datatype(&self) -> &str;

    /// MD5 of the wire schema, as 32 hex characters.
    fn md5sum(&self) -> &str;

    /// Full schema text, including dependent type definitions.
    fn definition(&self) -> &str;

    /// Publisher name recorded in the connection record.
    fn caller_id(&self) -> Option<&str> {
        None
    }

    /// Whether the publishing connection was latched.
    fn latching(&self) -> bool {
        false
    }

    /// Predicted number of bytes `serialize` will append.
    fn serialized_len(&self) -> usize;

    /// Append the serialized message to `out`.
    fn serialize(&self, out: &mut Vec<u8>);
}

/// A message type whose metadata is known at compile time.
pub trait RosMessage: WireEncode {
    const DATATYPE: &'static str;
    const MD5SUM: &'static str;
    const DEFINITION: &'static str;
}

impl<T: RosMessage> MessageCodec for T {
    fn datatype(&self) -> &str {
        T::DATATYPE
    }

    fn md5sum(&self) -> &str {
        T::MD5SUM
    }

    fn definition(&self) -> &str {
        T::DEFINITION
    }

    fn serialized_len(&self) -> usize {
        self.wire_len()
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        self.encode(out);
    }
}

/// Check that `md5sum` is 32 hex characters or the wildcard.
pub fn is_valid_md5sum(md5sum: &str) -> bool {
    md5sum == WILDCARD_MD5
        || (md5sum.len() == MD5_HEX_LEN && md5sum.bytes().all(|b| b.is_ascii_hexdigit()))
}

// ---------------------------------------------------------------------------
// RawMessage
// ---------------------------------------------------------------------------

/// A pre-serialized payload with explicit connection metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub datatype: String,
    pub md5sum: String,
    pub definition: String,
    pub caller_id: Option<String>,
    pub latching: bool,
    /// Serialized message bytes, written verbatim.
    pub payload: Vec<u8>,
}

impl RawMessage {
    /// Wrap `payload` with the metadata of type `M`.
    pub fn of<M: RosMessage>(payload: Vec<u8>) -> Self {
        Self {
            datatype: M::DATATYPE.to_string(),
            md5sum: M::MD5SUM.to_string(),
            definition: M::DEFINITION.to_string(),
            caller_id: None,
            latching: false,
            payload,
        }
    }
}

impl MessageCodec for RawMessage {
    fn datatype(&self) -> &str {
        &self.datatype
    }

    fn md5sum(&self) -> &str {
        &self.md5sum
    }

    fn definition(&self) -> &str {
        &self.definition
    }

    fn caller_id(&self) -> Option<&str> {
        self.caller_id.as_deref()
    }

    fn latching(&self) -> bool {
        self.latching
    }

    fn serialized_len(&self) -> usize {
        self.payload.len()
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.payload);
    }
}

// ---------------------------------------------------------------------------
// Wire encoding
// ---------------------------------------------------------------------------

/// ROS1 wire encoding for a field type.
pub trait WireEncode {
    /// Number of bytes `encode` appends.
    fn wire_len(&self) -> usize;

    fn encode(&self, out: &mut Vec<u8>);
}

/// ROS1 wire decoding for a field type.
pub trait WireDecode: Sized {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self>;
}

macro_rules! impl_wire_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl WireEncode for $ty {
                fn wire_len(&self) -> usize {
                    std::mem::size_of::<$ty>()
                }

                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }

            impl WireDecode for $ty {
                fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
                    let bytes = reader.take(std::mem::size_of::<$ty>())?;
                    let mut array = [0u8; std::mem::size_of::<$ty>()];
                    array.copy_from_slice(bytes);
                    Ok(<$ty>::from_le_bytes(array))
                }
            }
        )*
    };
}

impl_wire_number!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

impl WireEncode for bool {
    fn wire_len(&self) -> usize {
        1
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

impl WireDecode for bool {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
        Ok(u8::decode(reader)? != 0)
    }
}

impl WireEncode for String {
    fn wire_len(&self) -> usize {
        4 + self.len()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        encode_bytes(self.as_bytes(), out);
    }
}

impl WireDecode for String {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
        let bytes = reader.read_prefixed_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| invalid_data(format!("string field is not UTF-8: {err}")))
    }
}

impl WireEncode for Time {
    fn wire_len(&self) -> usize {
        8
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl WireDecode for Time {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
        let sec = u32::decode(reader)?;
        let nsec = u32::decode(reader)?;
        Ok(Time::new(sec, nsec))
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    fn wire_len(&self) -> usize {
        4 + self.iter().map(WireEncode::wire_len).sum::<usize>()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
        let count = u32::decode(reader)? as usize;
        // Every element takes at least one byte, so a count larger than the
        // remaining input is corrupt.
        if count > reader.remaining() {
            return Err(invalid_data(format!(
                "array declares {count} elements, only {} bytes remain",
                reader.remaining()
            )));
        }
        (0..count).map(|_| T::decode(reader)).collect()
    }
}

impl<T: WireEncode, const N: usize> WireEncode for [T; N] {
    fn wire_len(&self) -> usize {
        self.iter().map(WireEncode::wire_len).sum()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: WireDecode + Copy + Default, const N: usize> WireDecode for [T; N] {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
        let mut array = [T::default(); N];
        for slot in array.iter_mut() {
            *slot = T::decode(reader)?;
        }
        Ok(array)
    }
}

/// Append a `uint8[]` field: u32 length then the bytes.
///
/// Equivalent to encoding a `Vec<u8>` but copies the slice in one call,
/// which matters for image-sized payloads.
pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// Decode a complete message, rejecting trailing bytes.
pub fn decode_message<T: WireDecode>(bytes: &[u8]) -> BagResult<T> {
    let mut reader = WireReader::new(bytes);
    let value = T::decode(&mut reader)?;
    if !reader.is_empty() {
        return Err(invalid_data(format!(
            "{} trailing bytes after message",
            reader.remaining()
        )));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// WireReader
// ---------------------------------------------------------------------------

/// A bounds-checked cursor over serialized message bytes.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume exactly `len` bytes.
    pub fn take(&mut self, len: usize) -> BagResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(invalid_data(format!(
                "need {len} bytes at offset {}, only {} remain",
                self.offset,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    /// Consume a u32 length prefix and that many bytes.
    pub fn read_prefixed_bytes(&mut self) -> BagResult<&'a [u8]> {
        let len = u32::decode(self)? as usize;
        self.take(len)
    }
}

fn invalid_data(message: String) -> BagError {
    io::Error::new(io::ErrorKind::InvalidData, message).into()
}
