// SPDX-License-Identifier: PMPL-1.0-or-later
//
// DirectBag - Timestamps
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bag timestamps are unsigned 32-bit seconds plus unsigned 32-bit
// nanoseconds since the Unix epoch, stored on disk as two little-endian u32
// values (seconds first).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BagError, BagResult};

/// Nanoseconds in one second.
pub const NSEC_PER_SEC: u32 = 1_000_000_000;

/// A point in time as recorded in a bag.
///
/// Always normalised so that `nsec < 1_000_000_000`. Ordering is
/// chronological because `sec` is compared before `nsec`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Time {
    /// Whole seconds since the Unix epoch.
    pub sec: u32,
    /// Nanoseconds past `sec`.
    pub nsec: u32,
}

impl Time {
    /// The earliest representable time (the epoch).
    pub const MIN: Time = Time { sec: 0, nsec: 0 };

    /// The latest representable time.
    pub const MAX: Time = Time {
        sec: u32::MAX,
        nsec: NSEC_PER_SEC - 1,
    };

    /// Build a time, carrying whole seconds out of `nsec`.
    ///
    /// Saturates at [`Time::MAX`] rather than wrapping.
    pub const fn new(sec: u32, nsec: u32) -> Self {
        let carry = nsec / NSEC_PER_SEC;
        match sec.checked_add(carry) {
            Some(sec) => Self {
                sec,
                nsec: nsec % NSEC_PER_SEC,
            },
            None => Self::MAX,
        }
    }

    /// Convert fractional seconds since the epoch.
    pub fn from_sec(seconds: f64) -> BagResult<Self> {
        if !seconds.is_finite() || seconds < 0.0 || seconds >= (u32::MAX as f64) + 1.0 {
            return Err(BagError::TimeOutOfRange {
                seconds: seconds as i64,
            });
        }
        let whole = seconds.trunc();
        let nsec = ((seconds - whole) * f64::from(NSEC_PER_SEC)).round() as u32;
        Ok(Self::new(whole as u32, nsec))
    }

    /// Convert nanoseconds since the epoch.
    pub fn from_nanos(nanos: u64) -> BagResult<Self> {
        let sec = nanos / u64::from(NSEC_PER_SEC);
        let sec = u32::try_from(sec).map_err(|_| BagError::TimeOutOfRange {
            seconds: i64::try_from(sec).unwrap_or(i64::MAX),
        })?;
        Ok(Self {
            sec,
            nsec: (nanos % u64::from(NSEC_PER_SEC)) as u32,
        })
    }

    /// The current wall-clock time.
    ///
    /// Fails with [`BagError::TimeOutOfRange`] when the system clock is set
    /// before the epoch or past 2106.
    pub fn now() -> BagResult<Self> {
        Self::try_from(Utc::now())
    }

    /// Total nanoseconds since the epoch.
    pub fn as_nanos(self) -> u64 {
        u64::from(self.sec) * u64::from(NSEC_PER_SEC) + u64::from(self.nsec)
    }

    /// Fractional seconds since the epoch.
    pub fn to_sec(self) -> f64 {
        f64::from(self.sec) + f64::from(self.nsec) / f64::from(NSEC_PER_SEC)
    }

    /// The on-disk representation: `sec` then `nsec`, both little-endian.
    pub fn to_le_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.sec.to_le_bytes());
        bytes[4..].copy_from_slice(&self.nsec.to_le_bytes());
        bytes
    }

    /// Inverse of [`Time::to_le_bytes`]. Out-of-range nanoseconds are
    /// carried into seconds.
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        let sec = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let nsec = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self::new(sec, nsec)
    }

    /// Convert to a chrono UTC datetime.
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.sec), self.nsec).unwrap_or_default()
    }
}

impl TryFrom<DateTime<Utc>> for Time {
    type Error = BagError;

    fn try_from(datetime: DateTime<Utc>) -> BagResult<Self> {
        let seconds = datetime.timestamp();
        let sec = u32::try_from(seconds).map_err(|_| BagError::TimeOutOfRange { seconds })?;
        // Leap seconds report nsec >= 1e9; `new` folds them into the next second.
        Ok(Self::new(sec, datetime.timestamp_subsec_nanos()))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}
