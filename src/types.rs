//! Small value types shared by every stage of resolution.
//!
//! These are plain `Copy` values: a request, a rendition and a delivery URL
//! all talk about the same [`Dimension`] and [`Rotation`] without owning
//! anything.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pixel dimension. A side of `0` means "unknown" or "unbounded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u64,
    pub height: u64,
}

impl Dimension {
    pub const fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Both sides known.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// `width / height`, or `0.0` when either side is unknown.
    pub fn ratio(&self) -> f64 {
        crate::geometry::ratio(self.width, self.height)
    }

    /// Pixel area, used to order candidates from smallest to largest.
    pub fn area(&self) -> u64 {
        self.width.saturating_mul(self.height)
    }

    /// True when both sides are at least as large as `other`'s.
    pub fn covers(&self, other: Dimension) -> bool {
        self.width >= other.width && self.height >= other.height
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Clockwise rotation in 90° steps.
///
/// There is no `Deg0` variant: "no rotation" is `Option::<Rotation>::None`,
/// which is also what every invalid angle maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map an angle in degrees. `0` and anything outside {90, 180, 270} give `None`.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees {
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Quarter turns exchange width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}
