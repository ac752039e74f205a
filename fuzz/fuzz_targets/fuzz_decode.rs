// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for header field and message decoding

#![no_main]

use directbag_core::decode_message;
use directbag_core::format::HeaderFields;
use directbag_msgs::{Image, Imu, PointStamped};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed input must produce errors, never panics or huge allocations.
    if let Ok(fields) = HeaderFields::decode(data) {
        assert_eq!(fields.encode(), data);
    }
    let _ = decode_message::<PointStamped>(data);
    let _ = decode_message::<Imu>(data);
    let _ = decode_message::<Image>(data);
});
