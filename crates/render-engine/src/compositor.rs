//! Output raster and crop compositing.
//!
//! A crop region of the intrinsic frame is stretched over the whole raster.
//! No letterboxing is applied.

use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use reframe_common::error::{ReframeError, ReframeResult};
use reframe_track_model::geometry::{CropRect, Size};

/// Raster dimensions for a fixed output width and the video's aspect.
pub fn output_size_for(intrinsic: Size, output_width: u32) -> (u32, u32) {
    let width = output_width.max(1);
    let height = intrinsic
        .inverse_aspect()
        .map(|inv| (width as f64 * inv).round().max(1.0) as u32)
        .unwrap_or(width);
    (width, height)
}

/// The pixel buffer playback draws into.
#[derive(Debug, Clone)]
pub struct OutputRaster {
    image: RgbaImage,
}

impl OutputRaster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Logical size, used as the display reference when none is configured.
    pub fn size(&self) -> Size {
        Size::new(self.width() as f64, self.height() as f64)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Recreate the buffer if the declared size changed. Returns whether it did.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if self.image.dimensions() == (width, height) {
            return false;
        }
        tracing::debug!(
            from = ?self.image.dimensions(),
            to = ?(width, height),
            "Recreating output raster"
        );
        self.image = RgbaImage::new(width, height);
        true
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Draw `region` of `frame` over the full raster.
    pub fn draw_region(&mut self, frame: &RgbaImage, region: CropRect) -> ReframeResult<()> {
        let (x, y, width, height) = pixel_bounds(frame, region)?;
        let sub = imageops::crop_imm(frame, x, y, width, height).to_image();
        let scaled = imageops::resize(&sub, self.width(), self.height(), FilterType::Triangle);
        imageops::replace(&mut self.image, &scaled, 0, 0);
        Ok(())
    }

    /// Encode the raster as PNG.
    pub fn encode_png(&self) -> ReframeResult<Vec<u8>> {
        encode_png(&self.image)
    }
}

/// Cut `region` out of `frame` at its native resolution.
pub fn crop_native(frame: &RgbaImage, region: CropRect) -> ReframeResult<RgbaImage> {
    let (x, y, width, height) = pixel_bounds(frame, region)?;
    Ok(imageops::crop_imm(frame, x, y, width, height).to_image())
}

pub fn encode_png(image: &RgbaImage) -> ReframeResult<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Write `image` as a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> ReframeResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, encode_png(image)?)?;
    Ok(())
}

/// Snap a fractional region to whole pixels inside `frame`.
fn pixel_bounds(frame: &RgbaImage, region: CropRect) -> ReframeResult<(u32, u32, u32, u32)> {
    if !region.is_finite() {
        return Err(ReframeError::invalid_geometry("crop region is not finite"));
    }
    let (fw, fh) = (frame.width() as f64, frame.height() as f64);
    let x0 = region.x.floor().clamp(0.0, fw);
    let y0 = region.y.floor().clamp(0.0, fh);
    let x1 = region.right().ceil().clamp(0.0, fw);
    let y1 = region.bottom().ceil().clamp(0.0, fh);

    if x1 <= x0 || y1 <= y0 {
        return Err(ReframeError::invalid_geometry(format!(
            "crop region {:?} covers no pixels of a {}x{} frame",
            region.to_array(),
            frame.width(),
            frame.height()
        )));
    }
    Ok((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}
