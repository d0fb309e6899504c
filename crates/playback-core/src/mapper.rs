//! Coordinate mapping between display space and intrinsic video space.
//!
//! Keyframes store crops relative to the on-screen video element. The
//! displayed video is assumed to fill its container exactly, with no
//! letterbox bars, so a display rectangle maps to intrinsic pixels by
//! scaling each axis on its own.

use reframe_common::config::{ClampMode, PlaybackDefaults};
use reframe_common::error::{ReframeError, ReframeResult};
use reframe_track_model::geometry::{AspectRatio, CropRect, Size};

/// How a crop that leaves the video is brought back inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClampPolicy {
    /// Shrink each axis against its own bound.
    IndependentAxes,
    /// Shrink the width, then set `height = width * height_per_width`
    /// regardless of the vertical bound.
    DeriveHeight { height_per_width: f64 },
}

impl ClampPolicy {
    /// Build a policy from the configured mode and selected aspect ratio.
    pub fn from_config(mode: ClampMode, aspect: AspectRatio) -> Self {
        match mode {
            ClampMode::IndependentAxes => Self::IndependentAxes,
            ClampMode::DeriveHeight => Self::DeriveHeight {
                height_per_width: aspect.height_for_width(1.0),
            },
        }
    }
}

impl Default for ClampPolicy {
    fn default() -> Self {
        Self::IndependentAxes
    }
}

/// Scale `rect` from display space into intrinsic space.
pub fn to_intrinsic(rect: CropRect, display: Size, intrinsic: Size) -> ReframeResult<CropRect> {
    let (sx, sy) = scale_factors(display, intrinsic)?;
    scale(rect, sx, sy)
}

/// Scale `rect` from intrinsic space back into display space.
pub fn to_display(rect: CropRect, display: Size, intrinsic: Size) -> ReframeResult<CropRect> {
    let (sx, sy) = scale_factors(display, intrinsic)?;
    scale(rect, 1.0 / sx, 1.0 / sy)
}

/// Clamp `rect` into `bounds`, shrinking from the left/top rather than
/// translating. Sizes never go negative; a rectangle entirely outside the
/// bounds collapses to zero size on the offending axis.
pub fn clamp_to_bounds(rect: CropRect, bounds: Size) -> CropRect {
    let (x, width) = clamp_axis(rect.x, rect.width, bounds.width);
    let (y, height) = clamp_axis(rect.y, rect.height, bounds.height);
    CropRect::new(x, y, width, height)
}

/// Clamp `rect` into `bounds` using `policy`.
pub fn clamp_with_policy(rect: CropRect, bounds: Size, policy: ClampPolicy) -> CropRect {
    let clamped = clamp_to_bounds(rect, bounds);
    match policy {
        ClampPolicy::IndependentAxes => clamped,
        ClampPolicy::DeriveHeight { height_per_width } => CropRect {
            height: clamped.width * height_per_width,
            ..clamped
        },
    }
}

fn clamp_axis(mut origin: f64, mut extent: f64, bound: f64) -> (f64, f64) {
    if origin < 0.0 {
        extent += origin;
        origin = 0.0;
    }
    if origin > bound {
        origin = bound;
    }
    if origin + extent > bound {
        extent = bound - origin;
    }
    (origin, extent.max(0.0))
}

fn scale_factors(display: Size, intrinsic: Size) -> ReframeResult<(f64, f64)> {
    if !display.is_usable() {
        return Err(ReframeError::invalid_geometry(format!(
            "display size {display} is not laid out"
        )));
    }
    if !intrinsic.is_usable() {
        return Err(ReframeError::invalid_geometry(format!(
            "intrinsic size {intrinsic} is degenerate"
        )));
    }
    Ok((
        intrinsic.width / display.width,
        intrinsic.height / display.height,
    ))
}

fn scale(rect: CropRect, sx: f64, sy: f64) -> ReframeResult<CropRect> {
    if !rect.is_finite() {
        return Err(ReframeError::invalid_geometry(format!(
            "crop {:?} has non-finite components",
            rect.to_array()
        )));
    }
    let scaled = CropRect::new(rect.x * sx, rect.y * sy, rect.width * sx, rect.height * sy);
    if !scaled.is_finite() {
        return Err(ReframeError::invalid_geometry("scaled crop overflowed"));
    }
    Ok(scaled)
}

/// Maps captured crops onto the decoded video.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoordinateMapper {
    policy: ClampPolicy,
    aspect: AspectRatio,
}

impl CoordinateMapper {
    pub fn new(policy: ClampPolicy) -> Self {
        Self {
            policy,
            aspect: AspectRatio::default(),
        }
    }

    /// Use `aspect` for crops that start without drawn geometry.
    pub fn with_aspect(mut self, aspect: AspectRatio) -> Self {
        self.aspect = aspect;
        self
    }

    /// Build a mapper from the configured clamp mode and aspect ratio.
    pub fn from_config(defaults: &PlaybackDefaults) -> ReframeResult<Self> {
        let aspect: AspectRatio = defaults.aspect_ratio.parse().map_err(|e| {
            ReframeError::config(format!(
                "aspect_ratio {:?}: {e}",
                defaults.aspect_ratio
            ))
        })?;
        if !aspect.is_preset() {
            tracing::warn!(%aspect, "Configured aspect ratio is not one of the editor presets");
        }
        Ok(Self::new(ClampPolicy::from_config(defaults.clamp_mode, aspect)).with_aspect(aspect))
    }

    pub fn policy(&self) -> ClampPolicy {
        self.policy
    }

    pub fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    /// Starting crop for an interaction on `display` at the mapper's aspect.
    pub fn default_crop(&self, display: Size) -> CropRect {
        CropRect::default_for(self.aspect, display)
    }

    /// Validate a captured crop against the display it was drawn on.
    ///
    /// Rejects updates that would later scale into NaN or infinite geometry.
    pub fn validate_capture(&self, rect: CropRect, display: Size) -> ReframeResult<()> {
        if !display.is_usable() {
            return Err(ReframeError::invalid_geometry(format!(
                "display size {display} is not laid out"
            )));
        }
        if !rect.is_finite() {
            return Err(ReframeError::invalid_geometry(format!(
                "crop {:?} has non-finite components",
                rect.to_array()
            )));
        }
        Ok(())
    }

    /// Clamp a display-space crop to the display, then scale it to intrinsic
    /// pixels.
    ///
    /// Clamping happens in display space so that a derived height keeps the
    /// aspect the user selected on screen.
    pub fn map_to_intrinsic(
        &self,
        rect: CropRect,
        display: Size,
        intrinsic: Size,
    ) -> ReframeResult<CropRect> {
        self.validate_capture(rect, display)?;
        let clamped = clamp_with_policy(rect, display, self.policy);
        to_intrinsic(clamped, display, intrinsic)
    }
}
