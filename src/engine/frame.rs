//! Video Frame Management
//!
//! A [`Frame`] is one picture handed over by the transport. The pixel
//! buffer is always 3 bytes per pixel; [`PixelFormat`] says which byte is
//! which. Frames are owned for exactly one pass through the pipeline.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{EmotiveError, Result};

/// Bytes per pixel for every supported format
pub const BYTES_PER_PIXEL: usize = 3;

/// Channel order of a frame's pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Blue, green, red (the transport default)
    #[default]
    Bgr24,
    /// Red, green, blue
    Rgb24,
}

impl PixelFormat {
    /// Reorder an RGB triple into this format's channel order
    #[inline]
    pub fn from_rgb(&self, rgb: [u8; 3]) -> [u8; 3] {
        match self {
            PixelFormat::Rgb24 => rgb,
            PixelFormat::Bgr24 => [rgb[2], rgb[1], rgb[0]],
        }
    }

    /// Reorder a pixel in this format into RGB order
    #[inline]
    pub fn to_rgb(&self, px: [u8; 3]) -> [u8; 3] {
        // The swap is its own inverse
        self.from_rgb(px)
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelFormat::Bgr24 => write!(f, "bgr24"),
            PixelFormat::Rgb24 => write!(f, "rgb24"),
        }
    }
}

/// One video frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Per-stream sequence index, assigned by the transport
    sequence: u64,
    /// Channel order of `pixels`
    format: PixelFormat,
    /// Offset from stream start, when the transport provides one
    captured_at: Option<Duration>,
    /// Pixel data in `format` channel order
    pixels: RgbImage,
}

impl Frame {
    /// Wrap an existing buffer whose bytes are already in `format` order
    pub fn new(sequence: u64, format: PixelFormat, pixels: RgbImage) -> Self {
        Self {
            sequence,
            format,
            captured_at: None,
            pixels,
        }
    }

    /// Build a frame from a raw, tightly packed byte buffer
    ///
    /// # Errors
    /// `InvalidFrame` if either dimension is zero or the buffer length does
    /// not equal `width * height * 3`.
    pub fn from_raw(
        sequence: u64,
        format: PixelFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EmotiveError::InvalidFrame {
                reason: format!("zero-sized frame {}x{}", width, height),
            });
        }
        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(EmotiveError::InvalidFrame {
                reason: format!(
                    "buffer holds {} bytes, {}x{} {} needs {}",
                    data.len(),
                    width,
                    height,
                    format,
                    expected
                ),
            });
        }
        let pixels = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            EmotiveError::InvalidFrame {
                reason: "buffer does not match dimensions".to_string(),
            }
        })?;
        Ok(Self::new(sequence, format, pixels))
    }

    /// Decode an image file into an RGB frame
    ///
    /// # Errors
    /// `FrameDecode` if the file cannot be read or decoded.
    pub fn open(sequence: u64, path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|e| EmotiveError::FrameDecode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(sequence, PixelFormat::Rgb24, img.to_rgb8()))
    }

    /// Create a frame filled with a single RGB color
    pub fn filled(sequence: u64, format: PixelFormat, width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let px = Rgb(format.from_rgb(rgb));
        Self::new(sequence, format, RgbImage::from_pixel(width, height, px))
    }

    /// Attach a capture offset
    pub fn with_captured_at(mut self, offset: Duration) -> Self {
        self.captured_at = Some(offset);
        self
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn captured_at(&self) -> Option<Duration> {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel buffer in this frame's channel order
    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbImage {
        &mut self.pixels
    }

    /// Read a pixel as RGB regardless of the frame's format
    pub fn rgb_at(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.format.to_rgb(self.pixels.get_pixel(x, y).0))
    }

    /// Consume the frame, returning the raw bytes
    pub fn into_raw(self) -> Vec<u8> {
        self.pixels.into_raw()
    }

    /// Copy of the pixels in RGB order
    pub fn to_rgb(&self) -> RgbImage {
        match self.format {
            PixelFormat::Rgb24 => self.pixels.clone(),
            PixelFormat::Bgr24 => {
                let mut out = self.pixels.clone();
                for px in out.pixels_mut() {
                    px.0.swap(0, 2);
                }
                out
            }
        }
    }

    /// RGB copy shrunk to a `size`×`size` square for classifier input
    ///
    /// `None` keeps the native resolution. Frames already at the target
    /// size are only channel-reordered.
    pub fn downsample(&self, size: Option<u32>) -> RgbImage {
        let rgb = self.to_rgb();
        match size {
            Some(s) if s != rgb.width() || s != rgb.height() => {
                imageops::resize(&rgb, s, s, FilterType::Triangle)
            }
            _ => rgb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rejects_short_buffer() {
        let err = Frame::from_raw(1, PixelFormat::Bgr24, 4, 4, vec![0; 10]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FRAME");
    }

    #[test]
    fn test_from_raw_rejects_zero_size() {
        assert!(Frame::from_raw(1, PixelFormat::Rgb24, 0, 4, Vec::new()).is_err());
    }

    #[test]
    fn test_bgr_frame_reads_back_as_rgb() {
        let frame = Frame::filled(7, PixelFormat::Bgr24, 2, 2, [10, 20, 30]);
        assert_eq!(frame.pixels().get_pixel(0, 0).0, [30, 20, 10]);
        assert_eq!(frame.rgb_at(1, 1), Some([10, 20, 30]));
        assert_eq!(frame.rgb_at(2, 0), None);
        assert_eq!(frame.to_rgb().get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_open_missing_file() {
        let err = Frame::open(1, Path::new("/nonexistent/frame.png")).unwrap_err();
        assert_eq!(err.error_code(), "FRAME_DECODE");
    }

    #[test]
    fn test_open_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.png");
        RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])).save(&path).unwrap();

        let frame = Frame::open(9, &path).unwrap();
        assert_eq!(frame.format(), PixelFormat::Rgb24);
        assert_eq!((frame.width(), frame.height()), (4, 3));
        assert_eq!(frame.rgb_at(0, 0), Some([1, 2, 3]));
    }

    #[test]
    fn test_downsample_to_square() {
        let frame = Frame::filled(1, PixelFormat::Bgr24, 640, 480, [200, 100, 50]);
        let small = frame.downsample(Some(224));
        assert_eq!(small.dimensions(), (224, 224));
        assert_eq!(small.get_pixel(100, 100).0, [200, 100, 50]);

        let native = frame.downsample(None);
        assert_eq!(native.dimensions(), (640, 480));
    }
}
