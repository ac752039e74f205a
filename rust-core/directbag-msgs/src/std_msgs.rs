// SPDX-License-Identifier: PMPL-1.0-or-later
//! `std_msgs` types.

use directbag_core::{RosMessage, Time};

/// Standard metadata for stamped data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub seq: u32,
    pub stamp: Time,
    pub frame_id: String,
}

impl Header {
    /// A header with the given stamp and frame and a zero sequence number.
    pub fn new(stamp: Time, frame_id: impl Into<String>) -> Self {
        Self {
            seq: 0,
            stamp,
            frame_id: frame_id.into(),
        }
    }
}

wire_struct!(Header { seq, stamp, frame_id });

impl RosMessage for Header {
    const DATATYPE: &'static str = "std_msgs/Header";
    const MD5SUM: &'static str = "2176decaecbce78abc3b96ef049fabed";
    const DEFINITION: &'static str = header_definition!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use directbag_core::{decode_message, MessageCodec, WireEncode};

    #[test]
    fn test_header_wire_layout() {
        let header = Header {
            seq: 7,
            stamp: Time::new(10, 20),
            frame_id: "/map".to_string(),
        };
        let mut out = Vec::new();
        header.serialize(&mut out);
        assert_eq!(out.len(), header.wire_len());
        assert_eq!(out.len(), 4 + 8 + 4 + 4);
        assert_eq!(&out[0..4], &7u32.to_le_bytes());
        assert_eq!(&out[4..8], &10u32.to_le_bytes());
        assert_eq!(&out[8..12], &20u32.to_le_bytes());
        assert_eq!(&out[12..16], &4u32.to_le_bytes());
        assert_eq!(&out[16..], b"/map");

        let decoded: Header = decode_message(&out).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_metadata() {
        let header = Header::new(Time::new(1, 0), "/base_link");
        assert_eq!(header.datatype(), "std_msgs/Header");
        assert_eq!(header.md5sum(), "2176decaecbce78abc3b96ef049fabed");
        assert!(header.definition().contains("string frame_id"));
    }
}
