// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target driving the bag writer with arbitrary write sequences

#![no_main]

use std::io::Cursor;

use directbag_core::format::{field, HeaderFields, OpCode, MAGIC};
use directbag_core::{BagConfig, DirectBag, RawMessage, Time};
use directbag_msgs::Point;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First two bytes pick the chunk threshold; the rest is a stream of
    // (topic, time, length) triples followed by that many payload bytes.
    let threshold = u32::from(u16::from_le_bytes([data[0], data[1]])).max(1);
    let config = BagConfig::with_chunk_threshold(threshold);
    let Ok(mut bag) = DirectBag::from_writer(Cursor::new(Vec::new()), config) else {
        return;
    };

    let mut rest = &data[2..];
    let mut written = 0u64;
    while rest.len() >= 3 {
        let topic = ["a", "b", "c", "d"][usize::from(rest[0] % 4)];
        let time = Time::new(u32::from(rest[1]), 0);
        let len = usize::from(rest[2]).min(rest.len() - 3);
        let message = RawMessage::of::<Point>(rest[3..3 + len].to_vec());
        bag.write(topic, time, &message).unwrap();
        written += 1;
        rest = &rest[3 + len..];
    }

    let (sink, stats) = bag.finish().unwrap();
    assert_eq!(stats.messages_written, written);

    // The patched header must point at the trailing connection records.
    let bytes = sink.into_inner();
    assert!(bytes.starts_with(MAGIC));
    let header_start = MAGIC.len() + 4;
    let header_len = u32::from_le_bytes(bytes[MAGIC.len()..header_start].try_into().unwrap()) as usize;
    let header = HeaderFields::decode(&bytes[header_start..header_start + header_len]).unwrap();
    assert_eq!(header.op(), Some(OpCode::BagHeader));
    let index_pos = header.get_u64(field::INDEX_POS).unwrap() as usize;
    assert!(index_pos <= bytes.len());
    assert_eq!(u64::from(header.get_u32(field::CHUNK_COUNT).unwrap()), stats.chunks_flushed);
});
