// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - sensor_msgs types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `Image` encodes its pixel buffer with one bulk copy; every other field goes
// through the generic wire codec.

use directbag_core::{
    encode_bytes, BagResult, RosMessage, WireDecode, WireEncode, WireReader,
};

use crate::geometry_msgs::{Quaternion, Vector3};
use crate::std_msgs::Header;

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// An uncompressed image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    pub header: Header,
    /// Number of rows.
    pub height: u32,
    /// Number of columns.
    pub width: u32,
    /// Pixel encoding, e.g. `rgb8` or `mono16`.
    pub encoding: String,
    /// Non-zero when pixel data is big-endian.
    pub is_bigendian: u8,
    /// Row length in bytes.
    pub step: u32,
    /// `step * height` bytes of pixel data.
    pub data: Vec<u8>,
}

impl WireEncode for Image {
    fn wire_len(&self) -> usize {
        self.header.wire_len() + 4 + 4 + self.encoding.wire_len() + 1 + 4 + 4 + self.data.len()
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.reserve(self.wire_len());
        self.header.encode(out);
        self.height.encode(out);
        self.width.encode(out);
        self.encoding.encode(out);
        self.is_bigendian.encode(out);
        self.step.encode(out);
        encode_bytes(&self.data, out);
    }
}

impl WireDecode for Image {
    fn decode(reader: &mut WireReader<'_>) -> BagResult<Self> {
        Ok(Self {
            header: Header::decode(reader)?,
            height: u32::decode(reader)?,
            width: u32::decode(reader)?,
            encoding: String::decode(reader)?,
            is_bigendian: u8::decode(reader)?,
            step: u32::decode(reader)?,
            data: reader.read_prefixed_bytes()?.to_vec(),
        })
    }
}

impl RosMessage for Image {
    const DATATYPE: &'static str = "sensor_msgs/Image";
    const MD5SUM: &'static str = "060021388200f6f0f447d0fcd9c64743";
    const DEFINITION: &'static str = concat!(
        "# This message contains an uncompressed image\n\
         # (0, 0) is at top-left corner of image\n\
         #\n\
         \n\
         Header header        # Header timestamp should be acquisition time of image\n\
         # Header frame_id should be optical frame of camera\n\
         # origin of frame should be optical center of camera\n\
         # +x should point to the right in the image\n\
         # +y should point down in the image\n\
         # +z should point into to plane of the image\n\
         # If the frame_id here and the frame_id of the CameraInfo\n\
         # message associated with the image conflict\n\
         # the behavior is undefined\n\
         \n\
         uint32 height         # image height, that is, number of rows\n\
         uint32 width          # image width, that is, number of columns\n\
         \n\
         # The legal values for encoding are in file src/image_encodings.cpp\n\
         # If you want to standardize a new string format, join\n\
         # ros-users@lists.sourceforge.net and send an email proposing a new encoding.\n\
         \n\
         string encoding       # Encoding of pixels -- channel meaning, ordering, size\n\
         # taken from the list of strings in include/sensor_msgs/image_encodings.h\n\
         \n\
         uint8 is_bigendian    # is this data bigendian?\n\
         uint32 step           # Full row length in bytes\n\
         uint8[] data          # actual matrix data, size is (step * rows)\n\
         \n",
        msg_separator!(),
        "MSG: std_msgs/Header\n",
        header_definition!(),
    );
}

// ---------------------------------------------------------------------------
// Imu
// ---------------------------------------------------------------------------

/// Inertial measurement: orientation, angular velocity and linear
/// acceleration, each with a row-major 3x3 covariance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Imu {
    pub header: Header,
    pub orientation: Quaternion,
    pub orientation_covariance: [f64; 9],
    pub angular_velocity: Vector3,
    pub angular_velocity_covariance: [f64; 9],
    pub linear_acceleration: Vector3,
    pub linear_acceleration_covariance: [f64; 9],
}

wire_struct!(Imu {
    header,
    orientation,
    orientation_covariance,
    angular_velocity,
    angular_velocity_covariance,
    linear_acceleration,
    linear_acceleration_covariance,
});

impl RosMessage for Imu {
    const DATATYPE: &'static str = "sensor_msgs/Imu";
    const MD5SUM: &'static str = "6a62c6daae103f4ff57a132d6f95cec2";
    const DEFINITION: &'static str = concat!(
        "# This is a message to hold data from an IMU (Inertial Measurement Unit)\n\
         #\n\
         # Accelerations should be in m/s^2 (not in g's), and rotational velocity should be in rad/sec\n\
         #\n\
         # If the covariance of the measurement is known, it should be filled in (if all you know is the\n\
         # variance of each measurement, e.g. from the datasheet, just put those along the diagonal)\n\
         # A covariance matrix of all zeros will be interpreted as \"covariance unknown\", and to use the\n\
         # data a covariance will have to be assumed or gotten from some other source\n\
         #\n\
         # If you have no estimate for one of the data elements (e.g. your IMU doesn't produce an orientation\n\
         # estimate), please set element 0 of the associated covariance matrix to -1\n\
         # If you are interpreting this message, please check for a value of -1 in the first element of each\n\
         # covariance matrix, and disregard the associated estimate.\n\
         \n\
         Header header\n\
         \n\
         geometry_msgs/Quaternion orientation\n\
         float64[9] orientation_covariance # Row major about x, y, z axes\n\
         \n\
         geometry_msgs/Vector3 angular_velocity\n\
         float64[9] angular_velocity_covariance # Row major about x, y, z axes\n\
         \n\
         geometry_msgs/Vector3 linear_acceleration\n\
         float64[9] linear_acceleration_covariance # Row major x, y z\n\
         \n",
        msg_separator!(),
        "MSG: std_msgs/Header\n",
        header_definition!(),
        "\n",
        msg_separator!(),
        "MSG: geometry_msgs/Quaternion\n",
        quaternion_definition!(),
        "\n",
        msg_separator!(),
        "MSG: geometry_msgs/Vector3\n",
        vector3_definition!(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use directbag_core::{decode_message, MessageCodec, Time};

    #[test]
    fn test_imu_wire_len() {
        let imu = Imu {
            header: Header::new(Time::new(1, 0), "/imu_frame"),
            ..Imu::default()
        };
        // header 26, quaternion 32, two vectors of 24, three covariance
        // blocks of 72
        assert_eq!(imu.serialized_len(), 26 + 32 + 24 * 2 + 72 * 3);
        assert_eq!(imu.serialized_len(), 322);

        let mut out = Vec::new();
        imu.serialize(&mut out);
        assert_eq!(out.len(), 322);
    }

    #[test]
    fn test_imu_roundtrip() {
        let mut imu = Imu {
            header: Header::new(Time::new(5, 6), "/imu_frame"),
            orientation: Quaternion::IDENTITY,
            ..Imu::default()
        };
        imu.orientation_covariance[0] = -1.0;
        imu.angular_velocity.z = 0.5;
        imu.linear_acceleration_covariance[8] = 0.01;

        let mut out = Vec::new();
        imu.serialize(&mut out);
        assert_eq!(decode_message::<Imu>(&out).unwrap(), imu);
    }

    #[test]
    fn test_image_layout() {
        let image = Image {
            header: Header::new(Time::new(1, 2), "/camera_frame"),
            height: 2,
            width: 3,
            encoding: "mono8".to_string(),
            is_bigendian: 1,
            step: 3,
            data: vec![0x12; 6],
        };
        let mut out = Vec::new();
        image.serialize(&mut out);
        assert_eq!(out.len(), image.serialized_len());

        let data_start = out.len() - 6;
        assert_eq!(&out[data_start - 4..data_start], &6u32.to_le_bytes());
        assert!(out[data_start..].iter().all(|&b| b == 0x12));
        assert_eq!(decode_message::<Image>(&out).unwrap(), image);
    }

    #[test]
    fn test_image_truncated_payload_rejected() {
        let image = Image {
            data: vec![1, 2, 3, 4],
            ..Image::default()
        };
        let mut out = Vec::new();
        image.serialize(&mut out);
        out.pop();
        assert!(decode_message::<Image>(&out).is_err());
    }

    #[test]
    fn test_definitions_name_their_dependencies() {
        assert!(Image::DEFINITION.contains("\nMSG: std_msgs/Header\n"));
        assert!(Imu::DEFINITION.contains("\nMSG: geometry_msgs/Quaternion\n"));
        assert!(Imu::DEFINITION.contains("\nMSG: geometry_msgs/Vector3\n"));
    }
}
