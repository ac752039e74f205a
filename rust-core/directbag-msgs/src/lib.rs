// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag message types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain Rust structs for the standard message types most often recorded
// straight to disk, each carrying its type name, schema digest and full
// definition text. Field order in every struct is wire order.
//
// ## Usage
//
// ```no_run
// use directbag_core::{DirectBag, Time};
// use directbag_msgs::geometry_msgs::{Point, PointStamped};
//
// let mut bag = DirectBag::create("/tmp/points.bag").unwrap();
// let mut message = PointStamped::default();
// message.header.frame_id = "/map".to_string();
// message.point = Point { x: 1.0, y: 2.0, z: 3.0 };
// bag.write("point_stamped", Time::now().unwrap(), &message).unwrap();
// bag.close().unwrap();
// ```

/// Implement the wire codec for a struct whose fields are all
/// [`directbag_core::WireEncode`] + [`directbag_core::WireDecode`], in the
/// order listed.
macro_rules! wire_struct {
    ($name:ident { $($field:ident),* $(,)? }) => {
        impl directbag_core::WireEncode for $name {
            fn wire_len(&self) -> usize {
                0 $(+ directbag_core::WireEncode::wire_len(&self.$field))*
            }

            fn encode(&self, out: &mut Vec<u8>) {
                $(directbag_core::WireEncode::encode(&self.$field, out);)*
            }
        }

        impl directbag_core::WireDecode for $name {
            fn decode(
                reader: &mut directbag_core::WireReader<'_>,
            ) -> directbag_core::BagResult<Self> {
                Ok(Self {
                    $($field: directbag_core::WireDecode::decode(reader)?,)*
                })
            }
        }
    };
}

/// Separator between a definition and each dependency it embeds.
macro_rules! msg_separator {
    () => {
        "================================================================================\n"
    };
}

macro_rules! header_definition {
    () => {
        "# Standard metadata for higher-level stamped data types.\n\
         # This is generally used to communicate timestamped data\n\
         # in a particular coordinate frame.\n\
         #\n\
         # sequence ID: consecutively increasing ID\n\
         uint32 seq\n\
         #Two-integer timestamp that is expressed as:\n\
         # * stamp.sec: seconds (stamp_secs) since epoch\n\
         # * stamp.nsec: nanoseconds since stamp_secs\n\
         # time-handling sugar is provided by the client library\n\
         time stamp\n\
         #Frame this data is associated with\n\
         string frame_id\n"
    };
}

macro_rules! point_definition {
    () => {
        "# This contains the position of a point in free space\n\
         float64 x\n\
         float64 y\n\
         float64 z\n"
    };
}

macro_rules! vector3_definition {
    () => {
        "# This represents a vector in free space.\n\
         # It is only meant to represent a direction. Therefore, it does not\n\
         # make sense to apply a translation to it (e.g., when applying a\n\
         # generic rigid transformation to a Vector3, tf2 will only apply the\n\
         # rotation). If you want your data to be translatable too, use the\n\
         # geometry_msgs/Point message instead.\n\
         \n\
         float64 x\n\
         float64 y\n\
         float64 z\n"
    };
}

macro_rules! quaternion_definition {
    () => {
        "# This represents an orientation in free space in quaternion form.\n\
         \n\
         float64 x\n\
         float64 y\n\
         float64 z\n\
         float64 w\n"
    };
}

pub mod geometry_msgs;
pub mod sensor_msgs;
pub mod std_msgs;

pub use geometry_msgs::{Point, PointStamped, Quaternion, Vector3};
pub use sensor_msgs::{Image, Imu};
pub use std_msgs::Header;
