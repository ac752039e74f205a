// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Bag writer
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `DirectBag` owns the file for its whole lifetime. Opening writes the magic
// line and a zeroed, padded BAG_HEADER. Messages are buffered into chunks;
// the only per-message file I/O is the CONNECTION record emitted on first use
// of a topic. Closing flushes the last chunk, writes the trailing index
// section (every CONNECTION record again, then one CHUNK_INFO per chunk) and
// patches the BAG_HEADER in place so it points at that section.
//
// Any error leaves the writer in the `Failed` state; the file on disk may be
// truncated and is never repaired.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunk::{message_record_len, ChunkBuffer, ChunkInfo};
use crate::codec::{MessageCodec, RawMessage};
use crate::config::{BagConfig, SyncMode, DEFAULT_CHUNK_THRESHOLD};
use crate::connection::{Connection, ConnectionTable};
use crate::error::{BagError, BagResult};
use crate::format::{field, HeaderFields, OpCode, BAG_HEADER_LENGTH, MAGIC};
use crate::record::{BagSink, RecordWriter};
use crate::stats::BagStats;
use crate::time::Time;

// ---------------------------------------------------------------------------
// BagState
// ---------------------------------------------------------------------------

/// Lifecycle of a [`DirectBag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BagState {
    /// Accepting writes.
    Open,
    /// Closed successfully; the file is complete.
    Closed,
    /// An earlier call failed with the recorded error.
    Failed(String),
}

// ---------------------------------------------------------------------------
// DirectBag
// ---------------------------------------------------------------------------

/// A single-threaded writer producing one chunked, indexed bag.
///
/// Dropping an open bag closes it; errors during that implicit close are
/// logged and otherwise lost, so call [`DirectBag::close`] when the outcome
/// matters.
pub struct DirectBag<W: BagSink = File> {
    /// `None` once the bag has been closed.
    records: Option<RecordWriter<W>>,

    connections: ConnectionTable,

    /// The chunk being filled.
    chunk: ChunkBuffer,

    /// One entry per flushed chunk, in file order.
    chunk_infos: Vec<ChunkInfo>,

    /// Stream offset of the magic line.
    start_offset: u64,

    /// File offset of the BAG_HEADER record.
    header_offset: u64,

    /// Reused serialization buffer.
    scratch: Vec<u8>,

    stats: BagStats,
    config: BagConfig,
    path: Option<PathBuf>,
    state: BagState,
}

impl DirectBag<File> {
    /// Create (or truncate) a bag at `path` with the default configuration.
    pub fn create(path: impl AsRef<Path>) -> BagResult<Self> {
        Self::create_with_config(path, BagConfig::default())
    }

    /// Create (or truncate) a bag at `path`.
    ///
    /// Fails with [`BagError::Configuration`] if `config` is invalid or the
    /// file cannot be created.
    pub fn create_with_config(path: impl AsRef<Path>, config: BagConfig) -> BagResult<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|err| {
            BagError::Configuration(format!("cannot create bag at {}: {err}", path.display()))
        })?;
        Self::open(file, config, Some(path))
    }
}

impl<W: BagSink> DirectBag<W> {
    /// Write a bag into an arbitrary seekable sink, starting at its current
    /// position.
    pub fn from_writer(sink: W, config: BagConfig) -> BagResult<Self> {
        config.validate()?;
        Self::open(sink, config, None)
    }

    fn open(sink: W, config: BagConfig, path: Option<PathBuf>) -> BagResult<Self> {
        let mut records = RecordWriter::new(sink)?;
        let start_offset = records.write_raw(MAGIC)?;
        let header_offset = records.write_padded_record(&bag_header(0, 0, 0), BAG_HEADER_LENGTH)?;

        info!(
            path = %describe(path.as_deref()),
            chunk_threshold = config.chunk_threshold_bytes,
            sync_mode = ?config.sync_mode,
            "Opened bag"
        );

        let capacity = config.chunk_threshold_bytes.min(DEFAULT_CHUNK_THRESHOLD) as usize;
        let stats = BagStats {
            bytes_written: records.position() - start_offset,
            ..BagStats::default()
        };

        Ok(Self {
            records: Some(records),
            connections: ConnectionTable::new(),
            chunk: ChunkBuffer::with_capacity(capacity),
            chunk_infos: Vec::new(),
            start_offset,
            header_offset,
            scratch: Vec::new(),
            stats,
            config,
            path,
            state: BagState::Open,
        })
    }

    /// Write one message to `topic`.
    ///
    /// The first write to a topic registers its connection and writes the
    /// CONNECTION record immediately. The message itself is buffered in the
    /// current chunk, which is flushed first if the message would push it
    /// past the chunk threshold.
    pub fn write<M: MessageCodec + ?Sized>(
        &mut self,
        topic: &str,
        time: Time,
        message: &M,
    ) -> BagResult<()> {
        self.ensure_open()?;
        let result = self.write_message(topic, time, message);
        self.fail_on_error(result)
    }

    /// Write a pre-serialized message.
    pub fn write_raw(&mut self, topic: &str, time: Time, message: &RawMessage) -> BagResult<()> {
        self.write(topic, time, message)
    }

    /// Write the buffered chunk and its index records now. No-op when no
    /// messages are buffered.
    pub fn flush_chunk(&mut self) -> BagResult<()> {
        self.ensure_open()?;
        let result = self.flush_current_chunk();
        self.fail_on_error(result)
    }

    /// Finish the bag and release the file.
    ///
    /// May succeed at most once; every later call returns
    /// [`BagError::Usage`].
    pub fn close(&mut self) -> BagResult<BagStats> {
        self.ensure_open()?;
        let result = self.finish_records();
        let records = self.fail_on_error(result)?;
        drop(records);
        Ok(self.stats.clone())
    }

    /// Finish the bag and hand back the underlying sink.
    pub fn finish(mut self) -> BagResult<(W, BagStats)> {
        self.ensure_open()?;
        let result = self.finish_records();
        let records = self.fail_on_error(result)?;
        Ok((records.into_inner(), self.stats.clone()))
    }

    /// Registered connections in id order.
    pub fn connections(&self) -> &[Connection] {
        self.connections.as_slice()
    }

    /// Summaries of the chunks flushed so far.
    pub fn chunk_infos(&self) -> &[ChunkInfo] {
        &self.chunk_infos
    }

    /// Offset at which the next record would be written.
    pub fn position(&self) -> u64 {
        match &self.records {
            Some(records) => records.position(),
            None => self.start_offset + self.stats.bytes_written,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == BagState::Open
    }

    pub fn state(&self) -> &BagState {
        &self.state
    }

    pub fn stats(&self) -> &BagStats {
        &self.stats
    }

    pub fn config(&self) -> &BagConfig {
        &self.config
    }

    /// Path of the bag file, if it was created from a path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn ensure_open(&self) -> BagResult<()> {
        match &self.state {
            BagState::Open => Ok(()),
            BagState::Closed => Err(BagError::Usage("bag is already closed".to_string())),
            BagState::Failed(reason) => Err(BagError::Usage(format!(
                "bag is unusable after an earlier error: {reason}"
            ))),
        }
    }

    fn fail_on_error<T>(&mut self, result: BagResult<T>) -> BagResult<T> {
        if let Err(err) = &result {
            warn!(path = %describe(self.path.as_deref()), error = %err, "Bag writer failed");
            self.state = BagState::Failed(err.to_string());
        }
        result
    }

    fn write_message<M: MessageCodec + ?Sized>(
        &mut self,
        topic: &str,
        time: Time,
        message: &M,
    ) -> BagResult<()> {
        let (connection, created) =
            self.connections
                .get_or_create(topic, message, self.config.caller_id.as_deref())?;
        let connection_id = connection.id;
        if created {
            let header = connection.record_header();
            let data = connection.record_data().encode();
            let records = open_records(&mut self.records)?;
            records.write_record(&header, &data)?;
            self.stats.connections += 1;
            self.stats.bytes_written = records.position() - self.start_offset;
        }

        let len = message.serialized_len();
        let framed = message_record_len(len);
        let threshold = self.config.chunk_threshold_bytes as usize;
        if !self.chunk.is_empty() && self.chunk.size_bytes() + framed > threshold {
            self.flush_current_chunk()?;
        }
        if framed > threshold {
            warn!(
                topic,
                bytes = framed,
                threshold,
                "Message is larger than the chunk threshold, writing it as its own chunk"
            );
        }

        self.scratch.clear();
        message.serialize(&mut self.scratch);
        if self.scratch.len() != len {
            return Err(BagError::encoding(
                topic,
                format!(
                    "{} serialized to {} bytes but reported serialized_len {len}",
                    message.datatype(),
                    self.scratch.len()
                ),
            ));
        }

        self.chunk.append(topic, connection_id, time, &self.scratch)?;
        self.stats.messages_written += 1;
        Ok(())
    }

    fn flush_current_chunk(&mut self) -> BagResult<()> {
        if self.chunk.is_empty() {
            return Ok(());
        }

        let records = open_records(&mut self.records)?;
        let chunk = self.chunk.finalize();
        let chunk_pos = records.write_record(&chunk.record_header(), &chunk.bytes)?;
        for (header, data) in chunk.index_records() {
            records.write_record(&header, &data)?;
        }
        if self.config.sync_mode == SyncMode::EveryChunk {
            records.sync()?;
        }

        let info = chunk.info(chunk_pos);
        debug!(
            chunk_pos,
            size = chunk.bytes.len(),
            start_time = %info.start_time,
            end_time = %info.end_time,
            messages = chunk.message_count(),
            "Flushed chunk"
        );

        self.stats.chunks_flushed += 1;
        self.stats.largest_chunk_bytes = self.stats.largest_chunk_bytes.max(chunk.bytes.len() as u64);
        self.stats.bytes_written = records.position() - self.start_offset;
        self.chunk_infos.push(info);
        self.chunk.recycle(chunk);
        Ok(())
    }

    /// Flush, write the index section, patch the header and mark the bag
    /// closed. Returns the record writer so the caller decides whether to
    /// drop the sink or hand it back.
    fn finish_records(&mut self) -> BagResult<RecordWriter<W>> {
        self.flush_current_chunk()?;

        let mut records = self
            .records
            .take()
            .ok_or_else(|| BagError::Usage("bag has no open file".to_string()))?;

        let index_pos = records.position();
        for connection in self.connections.iter() {
            records.write_record(&connection.record_header(), &connection.record_data().encode())?;
        }
        for info in &self.chunk_infos {
            records.write_record(&info.record_header(), &info.record_data())?;
        }

        let conn_count = u32::try_from(self.connections.len())
            .map_err(|_| BagError::Usage("too many connections for one bag".to_string()))?;
        let chunk_count = u32::try_from(self.chunk_infos.len())
            .map_err(|_| BagError::Usage("too many chunks for one bag".to_string()))?;
        records.rewrite_padded_record(
            self.header_offset,
            &bag_header(index_pos, conn_count, chunk_count),
            BAG_HEADER_LENGTH,
        )?;

        match self.config.sync_mode {
            SyncMode::EveryChunk | SyncMode::OnClose => records.sync()?,
            SyncMode::Never => records.flush()?,
        }

        self.stats.bytes_written = records.position() - self.start_offset;
        self.state = BagState::Closed;

        info!(
            path = %describe(self.path.as_deref()),
            index_pos,
            connections = conn_count,
            chunks = chunk_count,
            messages = self.stats.messages_written,
            bytes = self.stats.bytes_written,
            "Closed bag"
        );

        Ok(records)
    }
}

impl<W: BagSink> Drop for DirectBag<W> {
    fn drop(&mut self) {
        if self.state != BagState::Open {
            return;
        }
        warn!(path = %describe(self.path.as_deref()), "Bag dropped while open, closing it");
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to close bag on drop");
        }
    }
}

impl<W: BagSink> std::fmt::Debug for DirectBag<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectBag")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("position", &self.position())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// BAG_HEADER fields. Every value is fixed width, so the encoded size does
/// not depend on the values.
fn bag_header(index_pos: u64, conn_count: u32, chunk_count: u32) -> HeaderFields {
    HeaderFields::new()
        .with_u32(field::CHUNK_COUNT, chunk_count)
        .with_u32(field::CONN_COUNT, conn_count)
        .with_u64(field::INDEX_POS, index_pos)
        .with_op(OpCode::BagHeader)
}

fn open_records<W: BagSink>(records: &mut Option<RecordWriter<W>>) -> BagResult<&mut RecordWriter<W>> {
    records
        .as_mut()
        .ok_or_else(|| BagError::Usage("bag has no open file".to_string()))
}

fn describe(path: Option<&Path>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "<writer>".to_string(),
    }
}
