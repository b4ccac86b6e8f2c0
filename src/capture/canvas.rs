//! Capture canvas: the pixel buffer behind the screen texture.
//!
//! Holds the raster destination the live document is drawn into, the
//! sampling parameters the rendering collaborator must apply, and the
//! dirty flag that signals texture re-upload.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use image::{imageops, ImageFormat, RgbaImage};

use crate::error::CaptureError;

/// Shared handle to the capture canvas; bound into the screen material's
/// emissive slot and mutated in place by the capture session.
pub type ScreenTexture = Arc<Mutex<CaptureCanvas>>;

/// Texture minification/magnification filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Linear,
    Nearest,
}

/// Texture wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
}

/// Sampling parameters the renderer applies to the screen texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingParams {
    pub generate_mipmaps: bool,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub wrap_s: TextureWrap,
    pub wrap_t: TextureWrap,
}

impl SamplingParams {
    /// Safe settings for non-power-of-two capture dimensions: no mipmaps,
    /// linear filtering, clamp to edge.
    pub fn npot_safe() -> Self {
        Self {
            generate_mipmaps: false,
            min_filter: TextureFilter::Linear,
            mag_filter: TextureFilter::Linear,
            wrap_s: TextureWrap::ClampToEdge,
            wrap_t: TextureWrap::ClampToEdge,
        }
    }
}

/// Pixel destination for document snapshots
#[derive(Debug)]
pub struct CaptureCanvas {
    image: RgbaImage,
    sampling: SamplingParams,
    dirty: bool,
}

impl CaptureCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
            sampling: SamplingParams::npot_safe(),
            dirty: false,
        }
    }

    /// New canvas behind a shared handle
    pub fn shared(width: u32, height: u32) -> ScreenTexture {
        Arc::new(Mutex::new(Self::new(width, height)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn aspect(&self) -> f32 {
        self.image.width() as f32 / self.image.height() as f32
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.image
    }

    /// Resize to match a screen aspect ratio: height fixed at the
    /// reference resolution, width derived and floored at 2. Re-asserts
    /// NPOT-safe sampling and marks the texture dirty. Idempotent for a
    /// given aspect.
    pub fn resize_to_aspect(&mut self, aspect: f32, reference_height: u32) -> (u32, u32) {
        let height = reference_height;
        let width = ((height as f32 * aspect).round() as u32).max(2);

        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
        self.sampling = SamplingParams::npot_safe();
        self.dirty = true;

        (width, height)
    }

    /// Clear the canvas and draw a snapshot scaled to the current canvas
    /// dimensions, then mark the texture dirty.
    pub fn blit(&mut self, snapshot: &RgbaImage) {
        let (width, height) = self.image.dimensions();
        self.image = if snapshot.dimensions() == (width, height) {
            snapshot.clone()
        } else {
            imageops::resize(snapshot, width, height, imageops::FilterType::Triangle)
        };
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the dirty flag; the renderer calls this once per
    /// texture upload.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Encode the current contents as PNG.
    pub fn to_png(&self) -> Result<Vec<u8>, CaptureError> {
        let mut buf = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| CaptureError::Snapshot(e.to_string()))?;
        Ok(buf.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_resize_to_aspect() {
        let mut canvas = CaptureCanvas::new(4, 4);
        let (w, h) = canvas.resize_to_aspect(1.5, 1024);
        assert_eq!((w, h), (1536, 1024));
        assert_eq!(canvas.width(), 1536);
        assert_eq!(canvas.height(), 1024);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut canvas = CaptureCanvas::new(4, 4);
        canvas.resize_to_aspect(1.5, 1024);
        canvas.blit(&RgbaImage::from_pixel(8, 8, Rgba([7, 7, 7, 255])));
        let before = canvas.pixels().clone();

        let (w, h) = canvas.resize_to_aspect(1.5, 1024);
        assert_eq!((w, h), (1536, 1024));
        // Same dimensions, contents untouched, only the dirty flag set
        assert_eq!(canvas.pixels(), &before);
        assert!(canvas.is_dirty());
    }

    #[test]
    fn test_width_floor() {
        let mut canvas = CaptureCanvas::new(4, 4);
        let (w, _) = canvas.resize_to_aspect(0.0001, 1024);
        assert_eq!(w, 2);
    }

    #[test]
    fn test_blit_scales_to_canvas() {
        let mut canvas = CaptureCanvas::new(16, 8);
        let snapshot = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        canvas.blit(&snapshot);
        assert_eq!(canvas.pixels().dimensions(), (16, 8));
        assert_eq!(canvas.pixels().get_pixel(8, 4), &Rgba([255, 0, 0, 255]));
        assert!(canvas.take_dirty());
        assert!(!canvas.is_dirty());
    }

    #[test]
    fn test_png_roundtrip() {
        let mut canvas = CaptureCanvas::new(4, 4);
        canvas.blit(&RgbaImage::from_pixel(4, 4, Rgba([0, 128, 0, 255])));
        let png = canvas.to_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 4));
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([0, 128, 0, 255]));
    }
}
