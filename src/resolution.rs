use std::fmt;
use std::num::NonZeroU32;

/// Every output size keeps at least this many pixels (about 1920x1920).
pub const MIN_TOTAL_PIXELS: u64 = 3_686_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// 16:9
    Landscape,
    /// 4:3
    Standard,
    /// 9:16
    Portrait,
    /// 3:4
    Tall,
    /// 1:1
    Square,
}

impl Resolution {
    pub const ALL: [Resolution; 5] = [
        Resolution::Landscape,
        Resolution::Standard,
        Resolution::Portrait,
        Resolution::Tall,
        Resolution::Square,
    ];

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Landscape => (2560, 1440),
            Resolution::Standard => (2304, 1728),
            Resolution::Portrait => (1440, 2560),
            Resolution::Tall => (1728, 2304),
            Resolution::Square => (2048, 2048),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Landscape => "2560x1440",
            Resolution::Standard => "2304x1728",
            Resolution::Portrait => "1440x2560",
            Resolution::Tall => "1728x2304",
            Resolution::Square => "2048x2048",
        }
    }

    pub fn total_pixels(self) -> u64 {
        let (w, h) = self.dimensions();
        w as u64 * h as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks the generation size from the source aspect ratio.
///
/// Bands are checked in order: wide landscape, landscape, tall portrait,
/// portrait, then the square fallback. Ratios between 0.8 and 1.2 (inclusive
/// of both ends) land on the square size.
pub fn select_resolution(width: NonZeroU32, height: NonZeroU32) -> Resolution {
    let ratio = width.get() as f64 / height.get() as f64;

    if ratio > 1.5 {
        return Resolution::Landscape;
    }
    if ratio > 1.2 {
        return Resolution::Standard;
    }
    if ratio < 0.6 {
        return Resolution::Portrait;
    }
    if ratio < 0.8 {
        return Resolution::Tall;
    }
    Resolution::Square
}
