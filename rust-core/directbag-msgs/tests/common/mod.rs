// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Independent bag reader for integration tests
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Opens a bag the way the standard reader does: check the magic line, read
// the BAG_HEADER, seek to `index_pos`, read `conn_count` CONNECTION records
// and `chunk_count` CHUNK_INFO records, then for each chunk read the CHUNK
// record and the INDEX_DATA records that follow it. Messages are located
// only through the index, never by scanning, so a wrong offset anywhere in
// the file shows up as a failure here.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use directbag_core::format::{field, HeaderFields, OpCode, MAGIC};
use directbag_core::{decode_message, Time, WireDecode};

/// Install a test log subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---------------------------------------------------------------------------
// Parsed records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub id: u32,
    pub topic: String,
    pub datatype: String,
    pub md5sum: String,
    pub definition: String,
    pub caller_id: Option<String>,
    pub latching: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInfoRecord {
    pub chunk_pos: u64,
    pub start_time: Time,
    pub end_time: Time,
    pub counts: BTreeMap<u32, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BagMessage {
    pub connection_id: u32,
    pub time: Time,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// BagReader
// ---------------------------------------------------------------------------

pub struct BagReader {
    bytes: Vec<u8>,
    pub index_pos: u64,
    pub connections: Vec<ConnectionRecord>,
    pub chunk_infos: Vec<ChunkInfoRecord>,
}

impl BagReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        ensure!(bytes.starts_with(MAGIC), "missing bag magic");

        let (header, data, _) = read_record(&bytes, MAGIC.len())?;
        ensure!(header.op() == Some(OpCode::BagHeader), "first record is not BAG_HEADER");
        ensure!(
            header.encode().len() + data.len() == 4096,
            "BAG_HEADER is not padded to 4096 bytes"
        );
        let index_pos = header.get_u64(field::INDEX_POS).context("index_pos")?;
        let conn_count = header.get_u32(field::CONN_COUNT).context("conn_count")?;
        let chunk_count = header.get_u32(field::CHUNK_COUNT).context("chunk_count")?;
        ensure!(index_pos != 0, "bag was not closed: index_pos is 0");

        let mut offset = index_pos as usize;
        let mut connections = Vec::new();
        for _ in 0..conn_count {
            let (header, data, next) = read_record(&bytes, offset)?;
            connections.push(parse_connection(&header, data)?);
            offset = next;
        }

        let mut chunk_infos = Vec::new();
        for _ in 0..chunk_count {
            let (header, data, next) = read_record(&bytes, offset)?;
            chunk_infos.push(parse_chunk_info(&header, data)?);
            offset = next;
        }
        ensure!(offset == bytes.len(), "{} trailing bytes after index", bytes.len() - offset);

        Ok(Self {
            bytes,
            index_pos,
            connections,
            chunk_infos,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_infos.len()
    }

    pub fn connection(&self, topic: &str) -> Option<&ConnectionRecord> {
        self.connections.iter().find(|c| c.topic == topic)
    }

    /// All messages on `topic`, chunk by chunk in index order.
    pub fn messages(&self, topic: &str) -> Result<Vec<BagMessage>> {
        let Some(connection) = self.connection(topic) else {
            return Ok(Vec::new());
        };
        let mut messages = Vec::new();
        for info in &self.chunk_infos {
            let (chunk, index) = self.read_chunk(info)?;
            let Some(entries) = index.get(&connection.id) else {
                continue;
            };
            for &(time, offset) in entries {
                let (header, data, _) = read_record(chunk, offset as usize)?;
                ensure!(header.op() == Some(OpCode::MessageData), "index points at a non-message");
                ensure!(header.get_u32(field::CONN) == Some(connection.id), "message conn mismatch");
                ensure!(header.get_time(field::TIME) == Some(time), "message time mismatch");
                messages.push(BagMessage {
                    connection_id: connection.id,
                    time,
                    data: data.to_vec(),
                });
            }
        }
        Ok(messages)
    }

    /// Decode every message on `topic` as `T`.
    pub fn decode<T: WireDecode>(&self, topic: &str) -> Result<Vec<T>> {
        self.messages(topic)?
            .iter()
            .map(|message| decode_message::<T>(&message.data).map_err(Into::into))
            .collect()
    }

    /// Number of CONNECTION records anywhere in the file, found by walking
    /// every top-level record.
    pub fn connection_record_count(&self) -> Result<usize> {
        let mut offset = MAGIC.len();
        let mut count = 0;
        while offset < self.bytes.len() {
            let (header, _, next) = read_record(&self.bytes, offset)?;
            if header.op() == Some(OpCode::Connection) {
                count += 1;
            }
            offset = next;
        }
        Ok(count)
    }

    /// Read the CHUNK at `info.chunk_pos` and the INDEX_DATA records after it.
    fn read_chunk(&self, info: &ChunkInfoRecord) -> Result<(&[u8], BTreeMap<u32, Vec<(Time, u32)>>)> {
        let (header, data, mut offset) = read_record(&self.bytes, info.chunk_pos as usize)?;
        ensure!(header.op() == Some(OpCode::Chunk), "chunk_pos does not point at a CHUNK");
        ensure!(header.get_str(field::COMPRESSION) == Some("none"), "unexpected compression");
        ensure!(
            header.get_u32(field::SIZE) == Some(data.len() as u32),
            "chunk size field disagrees with data length"
        );

        let mut index = BTreeMap::new();
        for _ in 0..info.counts.len() {
            let (header, entries, next) = read_record(&self.bytes, offset)?;
            ensure!(header.op() == Some(OpCode::IndexData), "expected INDEX_DATA after chunk");
            ensure!(header.get_u32(field::VER) == Some(1), "unsupported index version");
            let conn = header.get_u32(field::CONN).context("index conn")?;
            let count = header.get_u32(field::COUNT).context("index count")?;
            ensure!(entries.len() == count as usize * 12, "index data length mismatch");
            ensure!(info.counts.get(&conn) == Some(&count), "chunk info count mismatch");

            let parsed = entries
                .chunks_exact(12)
                .map(|entry| {
                    let time = Time::from_le_bytes(entry[..8].try_into().expect("8 bytes"));
                    let offset = u32::from_le_bytes(entry[8..].try_into().expect("4 bytes"));
                    (time, offset)
                })
                .collect::<Vec<_>>();
            for (time, _) in &parsed {
                ensure!(
                    info.start_time <= *time && *time <= info.end_time,
                    "message time outside chunk range"
                );
            }
            index.insert(conn, parsed);
            offset = next;
        }
        Ok((data, index))
    }
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    let slice = bytes
        .get(at..at + 4)
        .with_context(|| format!("truncated length at offset {at}"))?;
    Ok(u32::from_le_bytes(slice.try_into()?))
}

/// Read the record at `offset`, returning its header, data and the offset
/// just past it.
fn read_record(bytes: &[u8], offset: usize) -> Result<(HeaderFields, &[u8], usize)> {
    let header_len = read_u32(bytes, offset)? as usize;
    let header_start = offset + 4;
    let header_bytes = bytes
        .get(header_start..header_start + header_len)
        .with_context(|| format!("truncated header at offset {offset}"))?;
    let header = HeaderFields::decode(header_bytes)?;

    let data_len = read_u32(bytes, header_start + header_len)? as usize;
    let data_start = header_start + header_len + 4;
    let data = bytes
        .get(data_start..data_start + data_len)
        .with_context(|| format!("truncated data at offset {offset}"))?;
    Ok((header, data, data_start + data_len))
}

fn parse_connection(header: &HeaderFields, data: &[u8]) -> Result<ConnectionRecord> {
    if header.op() != Some(OpCode::Connection) {
        bail!("expected CONNECTION record in index section");
    }
    let fields = HeaderFields::decode(data)?;
    let text = |name: &str| -> Result<String> {
        fields
            .get_str(name)
            .map(str::to_string)
            .with_context(|| format!("connection field {name}"))
    };
    let topic = header.get_str(field::TOPIC).context("connection topic")?;
    ensure!(text(field::TOPIC)? == topic, "connection data topic differs from header");

    Ok(ConnectionRecord {
        id: header.get_u32(field::CONN).context("connection id")?,
        topic: topic.to_string(),
        datatype: text(field::TYPE)?,
        md5sum: text(field::MD5SUM)?,
        definition: text(field::MESSAGE_DEFINITION)?,
        caller_id: fields.get_str(field::CALLERID).map(str::to_string),
        latching: fields.get_str(field::LATCHING) == Some("1"),
    })
}

fn parse_chunk_info(header: &HeaderFields, data: &[u8]) -> Result<ChunkInfoRecord> {
    if header.op() != Some(OpCode::ChunkInfo) {
        bail!("expected CHUNK_INFO record in index section");
    }
    ensure!(header.get_u32(field::VER) == Some(1), "unsupported chunk info version");
    let count = header.get_u32(field::COUNT).context("chunk info count")? as usize;
    ensure!(data.len() == count * 8, "chunk info data length mismatch");

    let mut counts = BTreeMap::new();
    for pair in data.chunks_exact(8) {
        let conn = u32::from_le_bytes(pair[..4].try_into()?);
        let messages = u32::from_le_bytes(pair[4..].try_into()?);
        counts.insert(conn, messages);
    }

    Ok(ChunkInfoRecord {
        chunk_pos: header.get_u64(field::CHUNK_POS).context("chunk_pos")?,
        start_time: header.get_time(field::START_TIME).context("start_time")?,
        end_time: header.get_time(field::END_TIME).context("end_time")?,
        counts,
    })
}
