// SPDX-License-Identifier: PMPL-1.0-or-later
//! `geometry_msgs` types.

use directbag_core::RosMessage;

use crate::std_msgs::Header;

/// A position in free space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

wire_struct!(Point { x, y, z });

impl RosMessage for Point {
    const DATATYPE: &'static str = "geometry_msgs/Point";
    const MD5SUM: &'static str = "4a842b65f413084dc2b10fb484ea7f17";
    const DEFINITION: &'static str = point_definition!();
}

/// A direction in free space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

wire_struct!(Vector3 { x, y, z });

impl RosMessage for Vector3 {
    const DATATYPE: &'static str = "geometry_msgs/Vector3";
    const MD5SUM: &'static str = "4a842b65f413084dc2b10fb484ea7f17";
    const DEFINITION: &'static str = vector3_definition!();
}

/// An orientation as a unit quaternion.
///
/// The default value is all zeros, as a freshly constructed message would
/// be. It is not a valid rotation; use [`Quaternion::IDENTITY`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

wire_struct!(Quaternion { x, y, z, w });

impl RosMessage for Quaternion {
    const DATATYPE: &'static str = "geometry_msgs/Quaternion";
    const MD5SUM: &'static str = "a779879fadf0160734f906b8c19c7004";
    const DEFINITION: &'static str = quaternion_definition!();
}

/// A point with a reference frame and timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointStamped {
    pub header: Header,
    pub point: Point,
}

wire_struct!(PointStamped { header, point });

impl RosMessage for PointStamped {
    const DATATYPE: &'static str = "geometry_msgs/PointStamped";
    const MD5SUM: &'static str = "c63aecb41bfdfd6b7e1fac37c7cbe7bf";
    const DEFINITION: &'static str = concat!(
        "# This represents a Point with reference coordinate frame and timestamp\n\
         Header header\n\
         Point point\n\
         \n",
        msg_separator!(),
        "MSG: std_msgs/Header\n",
        header_definition!(),
        "\n",
        msg_separator!(),
        "MSG: geometry_msgs/Point\n",
        point_definition!(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use directbag_core::{decode_message, MessageCodec, Time, WireEncode};

    #[test]
    fn test_point_is_24_bytes() {
        let point = Point { x: 1.0, y: 2.0, z: 3.0 };
        let mut out = Vec::new();
        point.serialize(&mut out);
        assert_eq!(out.len(), 24);
        assert_eq!(&out[8..16], &2.0f64.to_le_bytes());
        assert_eq!(decode_message::<Point>(&out).unwrap(), point);
    }

    #[test]
    fn test_point_stamped_roundtrip() {
        let message = PointStamped {
            header: Header::new(Time::new(3, 4), "/odom"),
            point: Point { x: -1.5, y: 0.25, z: 9.0 },
        };
        let mut out = Vec::new();
        message.serialize(&mut out);
        assert_eq!(out.len(), message.serialized_len());
        assert_eq!(out.len(), 4 + 8 + 4 + 5 + 24);
        assert_eq!(decode_message::<PointStamped>(&out).unwrap(), message);
    }

    #[test]
    fn test_point_stamped_definition_embeds_dependencies() {
        let definition = PointStamped::DEFINITION;
        assert!(definition.starts_with("# This represents a Point"));
        assert!(definition.contains("\nMSG: std_msgs/Header\n"));
        assert!(definition.contains("\nMSG: geometry_msgs/Point\n"));
        assert_eq!(definition.matches(msg_separator!()).count(), 2);
    }

    #[test]
    fn test_quaternion_identity() {
        let mut out = Vec::new();
        Quaternion::IDENTITY.encode(&mut out);
        assert_eq!(&out[24..], &1.0f64.to_le_bytes());
        assert_eq!(Quaternion::IDENTITY.wire_len(), 32);
    }
}
