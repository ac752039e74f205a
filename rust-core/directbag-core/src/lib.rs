// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag core crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Writes timestamped, typed messages straight to a chunked, indexed bag file
// (format version 2.0) without a transport layer or type registry. The output
// is readable by any unmodified reader of the same format version.
//
// # Architecture
//
// A bag is written front to back in a single pass. The only seek is the final
// rewrite of the fixed-size BAG_HEADER once the index section's offset is
// known.
//
// ## File layout
//
// ```text
// #ROSBAG V2.0\n                   -- magic line, 13 bytes
// BAG_HEADER                       -- padded to 4096 bytes, patched at close
// CONNECTION (topic a)             -- written on first use of each topic
// CHUNK                            -- concatenated MESSAGE_DATA records
// INDEX_DATA (one per connection)  -- (time, offset) pairs into that chunk
// CONNECTION (topic b)
// CHUNK
// INDEX_DATA ...
// CONNECTION (all, id order)       -- index section starts here (index_pos)
// CHUNK_INFO (one per chunk)       -- chunk offset, time range, counts
// ```
//
// ## Record format (all integers little-endian)
//
// ```text
// [4 bytes: header_len (u32)]
// [N bytes: header fields]         -- [u32 len][name=value], sorted by name
// [4 bytes: data_len (u32)]
// [M bytes: data]
// ```
//
// ## Usage
//
// ```no_run
// use directbag_core::{BagConfig, DirectBag, RawMessage, SyncMode, Time};
//
// let config = BagConfig { sync_mode: SyncMode::EveryChunk, ..BagConfig::default() };
// let mut bag = DirectBag::create_with_config("/tmp/run.bag", config).unwrap();
//
// let message = RawMessage {
//     datatype: "std_msgs/UInt32".to_string(),
//     md5sum: "304a39449588c7f8ce2df6e8001c5fce".to_string(),
//     definition: "uint32 data\n".to_string(),
//     caller_id: None,
//     latching: false,
//     payload: 7u32.to_le_bytes().to_vec(),
// };
// bag.write("counter", Time::new(1, 0), &message).unwrap();
//
// let stats = bag.close().unwrap();
// println!("{} messages in {} chunks", stats.messages_written, stats.chunks_flushed);
// ```

pub mod chunk;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod format;
pub mod record;
pub mod stats;
pub mod time;
pub mod writer;

// Re-export the primary public API for ergonomic imports.
pub use chunk::{ChunkInfo, IndexEntry};
pub use codec::{
    decode_message, encode_bytes, MessageCodec, RawMessage, RosMessage, WireDecode, WireEncode,
    WireReader,
};
pub use config::{BagConfig, SyncMode, DEFAULT_CHUNK_THRESHOLD};
pub use connection::Connection;
pub use error::{BagError, BagResult};
pub use record::BagSink;
pub use stats::BagStats;
pub use time::Time;
pub use writer::{BagState, DirectBag};
