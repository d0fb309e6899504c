//! Pixel geometry for crop regions.
//!
//! Crop rectangles are kept in pixels of whichever space produced them
//! (display or intrinsic). The coordinate mapper converts between the two.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width of a freshly created crop region, in display pixels.
pub const DEFAULT_CROP_WIDTH: f64 = 100.0;

/// Smallest crop edge the editor lets a user resize to, in display pixels.
pub const MIN_CROP_EDGE: f64 = 50.0;

/// A pixel size (display frame, intrinsic frame, or raster).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether both dimensions are finite and strictly positive.
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Height divided by width, if the size is usable.
    pub fn inverse_aspect(&self) -> Option<f64> {
        self.is_usable().then(|| self.height / self.width)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = GeometryParseError;

    /// Parse `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| GeometryParseError::Malformed(s.to_string()))?;
        let width: f64 = w
            .trim()
            .parse()
            .map_err(|_| GeometryParseError::Malformed(s.to_string()))?;
        let height: f64 = h
            .trim()
            .parse()
            .map_err(|_| GeometryParseError::Malformed(s.to_string()))?;
        Ok(Size::new(width, height))
    }
}

/// A crop rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Default geometry for a new crop interaction.
    ///
    /// Starts at the top-left corner with a fixed width and the height implied
    /// by `aspect`, respects the editor's minimum edge, and shrinks uniformly
    /// to fit `container` when the container is smaller.
    pub fn default_for(aspect: AspectRatio, container: Size) -> Self {
        let ratio = aspect.ratio();
        let mut width = DEFAULT_CROP_WIDTH;
        let mut height = width / ratio;

        if height < MIN_CROP_EDGE {
            height = MIN_CROP_EDGE;
            width = height * ratio;
        }
        if width < MIN_CROP_EDGE {
            width = MIN_CROP_EDGE;
            height = width / ratio;
        }

        if container.is_usable() && (width > container.width || height > container.height) {
            let fit = (container.width / width).min(container.height / height);
            width *= fit;
            height *= fit;
        }

        Self::new(0.0, 0.0, width, height)
    }

    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Components as `[x, y, width, height]`, the exported coordinate order.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x, self.y, self.width, self.height]
    }

    /// Build from `[x, y, width, height]`.
    pub fn from_array([x, y, width, height]: [f64; 4]) -> Self {
        Self::new(x, y, width, height)
    }

    /// Approximate equality within `eps` on every component.
    pub fn approx_eq(&self, other: &CropRect, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.width - other.width).abs() <= eps
            && (self.height - other.height).abs() <= eps
    }
}

impl fmt::Display for CropRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// A crop aspect ratio expressed as `W:H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Ratios offered by the editor's aspect selector.
    pub const PRESETS: [AspectRatio; 6] = [
        AspectRatio::new(9, 18),
        AspectRatio::new(9, 16),
        AspectRatio::new(4, 3),
        AspectRatio::new(3, 4),
        AspectRatio::new(1, 1),
        AspectRatio::new(4, 5),
    ];

    /// Vertical 9:16, the editor's initial selection.
    pub const VERTICAL: AspectRatio = AspectRatio::new(9, 16);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Height a rectangle of the given width should have at this ratio.
    pub fn height_for_width(&self, width: f64) -> f64 {
        width / self.ratio()
    }

    /// Whether this ratio is one of the editor presets.
    pub fn is_preset(&self) -> bool {
        Self::PRESETS.contains(self)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::VERTICAL
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = GeometryParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| GeometryParseError::Malformed(s.to_string()))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| GeometryParseError::Malformed(s.to_string()))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| GeometryParseError::Malformed(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(GeometryParseError::ZeroComponent(s.to_string()));
        }
        Ok(Self::new(width, height))
    }
}

impl Serialize for AspectRatio {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AspectRatio {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors parsing sizes and aspect ratios from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeometryParseError {
    #[error("malformed geometry: {0:?}")]
    Malformed(String),

    #[error("aspect ratio has a zero component: {0:?}")]
    ZeroComponent(String),
}
