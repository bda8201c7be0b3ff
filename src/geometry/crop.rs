//! Crop rectangles and their string encodings.

use crate::error::ContractError;
use crate::types::Dimension;
use std::fmt;

/// Crop rectangle inside a source image.
///
/// `auto_crop` separates rectangles the engine computed (centered auto-crop,
/// smart-crop regions) from ones a user drew. It takes part in equality:
/// a user crop and an identical auto-crop are different requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CropDimension {
    pub left: u64,
    pub top: u64,
    pub width: u64,
    pub height: u64,
    pub auto_crop: bool,
}

impl CropDimension {
    /// User-specified crop. Width and height must be positive.
    pub fn new(left: u64, top: u64, width: u64, height: u64) -> Result<Self, ContractError> {
        if width == 0 || height == 0 {
            return Err(ContractError::InvalidCrop { width, height });
        }
        Ok(Self {
            left,
            top,
            width,
            height,
            auto_crop: false,
        })
    }

    /// Engine-computed crop. Callers guarantee positive sizes.
    pub(crate) fn auto(left: u64, top: u64, width: u64, height: u64) -> Self {
        Self {
            left,
            top,
            width: width.max(1),
            height: height.max(1),
            auto_crop: true,
        }
    }

    /// Parse the `left,top,right,bottom` form stored alongside content.
    ///
    /// Returns `None` for anything that is not four non-negative integers
    /// describing a non-empty rectangle.
    pub fn parse(crop_string: &str) -> Option<Self> {
        let parts: Vec<u64> = crop_string
            .split(',')
            .map(|p| p.trim().parse::<u64>())
            .collect::<Result<_, _>>()
            .ok()?;
        let [left, top, right, bottom] = parts.as_slice() else {
            return None;
        };
        if right <= left || bottom <= top {
            return None;
        }
        Self::new(*left, *top, right - left, bottom - top).ok()
    }

    /// Saturates at `u64::MAX` for rectangles no image can hold.
    pub fn right(&self) -> u64 {
        self.left.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u64 {
        self.top.saturating_add(self.height)
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }

    pub fn ratio(&self) -> f64 {
        self.dimension().ratio()
    }

    /// The rectangle lies fully inside an image of `bounds`.
    pub fn fits_within(&self, bounds: Dimension) -> bool {
        let inside = |start: u64, size: u64, limit: u64| {
            start.checked_add(size).is_some_and(|end| end <= limit)
        };
        inside(self.left, self.width, bounds.width) && inside(self.top, self.height, bounds.height)
    }

    /// `left,top,right,bottom`
    pub fn crop_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.left,
            self.top,
            self.right(),
            self.bottom()
        )
    }

    /// `left,top,width,height`, the form image servers expect.
    pub fn crop_string_width_height(&self) -> String {
        format!("{},{},{},{}", self.left, self.top, self.width, self.height)
    }

    /// Crop as percentages of `image`: `16.7p,0.0p,66.7p,100.0p`.
    ///
    /// Each value is rounded to one decimal and clamped to `0..=100`.
    pub fn relative_string(&self, image: Dimension) -> String {
        let pct = |value: u64, total: u64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            let p = (value as f64 / total as f64 * 1000.0).round() / 10.0;
            p.clamp(0.0, 100.0)
        };
        format!(
            "{:.1}p,{:.1}p,{:.1}p,{:.1}p",
            pct(self.left, image.width),
            pct(self.top, image.height),
            pct(self.width, image.width),
            pct(self.height, image.height)
        )
    }
}

impl fmt::Display for CropDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[left={},top={},width={},height={}]",
            self.left, self.top, self.width, self.height
        )
    }
}
