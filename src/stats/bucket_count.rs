//! The histogram resolution, always in the range `1..=100`.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Number of histogram buckets. Out of range requests are not an
/// error: anything `<= 0` or `> MAX` silently becomes `MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct BucketCount(u8);

impl BucketCount {
    pub const MAX: u8 = 100;

    pub fn clamped(requested: i64) -> Self {
        if requested <= 0 || requested > i64::from(Self::MAX) {
            Self(Self::MAX)
        } else {
            Self(requested as u8)
        }
    }

    #[inline]
    pub fn get(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for BucketCount {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

impl From<i64> for BucketCount {
    fn from(requested: i64) -> Self {
        Self::clamped(requested)
    }
}

impl From<i32> for BucketCount {
    fn from(requested: i32) -> Self {
        Self::clamped(requested.into())
    }
}

impl From<BucketCount> for i64 {
    fn from(value: BucketCount) -> Self {
        value.0.into()
    }
}

impl Display for BucketCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
