// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Record framing and positioned file output
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `RecordWriter` is the only component that touches the file. It tracks the
// current write position itself so record offsets are known without asking
// the OS, and it supports rewriting a fixed-size record in place (the
// BAG_HEADER back-patch at close). Nothing is buffered between calls.

use std::fs::File;
use std::io::{self, Cursor, Seek, SeekFrom, Write};

use crate::error::{BagError, BagResult};
use crate::format::{HeaderFields, HEADER_PAD_BYTE};

/// A seekable byte sink a bag can be written to.
pub trait BagSink: Write + Seek {
    /// Push written data to stable storage. No-op for in-memory sinks.
    fn sync_data(&mut self) -> io::Result<()>;
}

impl BagSink for File {
    fn sync_data(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

impl BagSink for Cursor<Vec<u8>> {
    fn sync_data(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Total on-disk size of a record with the given header and data lengths.
pub const fn framed_len(header_len: usize, data_len: usize) -> usize {
    4 + header_len + 4 + data_len
}

/// Append a complete framed record to an in-memory buffer.
pub fn frame_record(out: &mut Vec<u8>, header: &HeaderFields, data: &[u8]) {
    out.reserve(framed_len(header.encoded_len(), data.len()));
    out.extend_from_slice(&(header.encoded_len() as u32).to_le_bytes());
    header.encode_into(out);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

/// Writes framed records at a tracked file position.
#[derive(Debug)]
pub struct RecordWriter<W: BagSink> {
    sink: W,
    position: u64,
}

impl<W: BagSink> RecordWriter<W> {
    /// Wrap `sink`, starting at its current stream position.
    pub fn new(mut sink: W) -> BagResult<Self> {
        let position = sink.stream_position()?;
        Ok(Self { sink, position })
    }

    /// Offset at which the next write lands.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write unframed bytes (the magic line).
    pub fn write_raw(&mut self, bytes: &[u8]) -> BagResult<u64> {
        let offset = self.position;
        self.sink.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(offset)
    }

    /// Write one record and return the offset it starts at.
    pub fn write_record(&mut self, header: &HeaderFields, data: &[u8]) -> BagResult<u64> {
        let data_len = checked_len(data.len(), "record data")?;
        let header_len = checked_len(header.encoded_len(), "record header")?;

        let mut prefix = Vec::with_capacity(8 + header_len as usize);
        prefix.extend_from_slice(&header_len.to_le_bytes());
        header.encode_into(&mut prefix);
        prefix.extend_from_slice(&data_len.to_le_bytes());

        let offset = self.position;
        self.sink.write_all(&prefix)?;
        self.sink.write_all(data)?;
        self.position += (prefix.len() + data.len()) as u64;
        Ok(offset)
    }

    /// Write a record whose header plus data is exactly `total_len` bytes,
    /// padding the data block.
    pub fn write_padded_record(&mut self, header: &HeaderFields, total_len: usize) -> BagResult<u64> {
        let padding = padding_for(header, total_len)?;
        self.write_record(header, &padding)
    }

    /// Rewrite a padded record previously written at `offset`.
    ///
    /// `header` must encode to the same padded size, so no following byte
    /// moves. The write position is restored afterwards.
    pub fn rewrite_padded_record(
        &mut self,
        offset: u64,
        header: &HeaderFields,
        total_len: usize,
    ) -> BagResult<()> {
        let padding = padding_for(header, total_len)?;
        let mut record = Vec::with_capacity(framed_len(header.encoded_len(), padding.len()));
        frame_record(&mut record, header, &padding);

        if offset + record.len() as u64 > self.position {
            return Err(BagError::Usage(format!(
                "cannot rewrite {} bytes at offset {offset}: only {} bytes written",
                record.len(),
                self.position
            )));
        }

        self.sink.seek(SeekFrom::Start(offset))?;
        self.sink.write_all(&record)?;
        self.sink.seek(SeekFrom::Start(self.position))?;
        Ok(())
    }

    /// Flush userspace buffers in the sink.
    pub fn flush(&mut self) -> BagResult<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and push written data to stable storage.
    pub fn sync(&mut self) -> BagResult<()> {
        self.sink.flush()?;
        self.sink.sync_data()?;
        Ok(())
    }

    /// Unwrap the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

fn checked_len(len: usize, what: &str) -> BagResult<u32> {
    u32::try_from(len).map_err(|_| {
        BagError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{what} of {len} bytes exceeds the 4 GiB record limit"),
        ))
    })
}

fn padding_for(header: &HeaderFields, total_len: usize) -> BagResult<Vec<u8>> {
    let header_len = header.encoded_len();
    let pad_len = total_len.checked_sub(header_len).ok_or_else(|| {
        BagError::Usage(format!(
            "header of {header_len} bytes does not fit a {total_len}-byte padded record"
        ))
    })?;
    Ok(vec![HEADER_PAD_BYTE; pad_len])
}
