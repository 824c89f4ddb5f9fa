//! Overlay Renderer
//!
//! Burns `Emotion: <label>` and the label's icon onto a frame. The frame is
//! modified in place and handed back; nothing here blocks or allocates per
//! call.

use image::{Rgb, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use super::glyphs::{self, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::icons::{IconSet, DEFAULT_ICON_SIZE};
use crate::engine::{Frame, PixelFormat};
use crate::error::{EmotiveError, Result};
use crate::neural::EmotionLabel;

/// Banner prefix
pub const TEXT_PREFIX: &str = "Emotion: ";

/// Placement and look of the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Top-left corner of the banner
    pub text_origin: (i32, i32),
    /// Screen pixels per glyph pixel
    pub text_scale: u32,
    /// Banner color, RGB
    pub text_color: [u8; 3],
    /// Top-left corner of the icon
    pub icon_origin: (i32, i32),
    /// Icon edge length in pixels
    pub icon_size: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            text_origin: (20, 30),
            text_scale: 3,
            text_color: [0, 255, 0],
            icon_origin: (20, 70),
            icon_size: DEFAULT_ICON_SIZE,
        }
    }
}

impl OverlayStyle {
    pub fn validate(&self) -> Result<()> {
        if self.text_scale == 0 {
            return Err(EmotiveError::config("overlay.text_scale", "must be at least 1"));
        }
        if self.icon_size == 0 {
            return Err(EmotiveError::config("overlay.icon_size", "must be positive"));
        }
        Ok(())
    }
}

/// Paints the current label onto outgoing frames
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayStyle,
    icons: IconSet,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle, icons: IconSet) -> Result<Self> {
        style.validate()?;
        Ok(Self { style, icons })
    }

    /// Text-only renderer with default placement
    pub fn text_only() -> Self {
        let style = OverlayStyle::default();
        let icons = IconSet::empty(style.icon_size);
        Self { style, icons }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    /// Annotate `frame` with `label`
    pub fn render(&self, mut frame: Frame, label: &EmotionLabel) -> Frame {
        let text = TEXT_PREFIX.chars().chain(label.as_str().chars());
        draw_text(
            &mut frame,
            text,
            self.style.text_origin,
            self.style.text_scale,
            self.style.text_color,
        );
        if let Some(icon) = self.icons.get(label) {
            composite_icon(&mut frame, icon, self.style.icon_origin);
        }
        frame
    }
}

/// Draw `text` with the bitmap font, top-left at `origin`
///
/// Drawing stops once the cursor leaves the right edge of the frame.
pub fn draw_text(
    frame: &mut Frame,
    text: impl IntoIterator<Item = char>,
    origin: (i32, i32),
    scale: u32,
    rgb: [u8; 3],
) {
    if scale == 0 {
        return;
    }
    let color = Rgb(frame.format().from_rgb(rgb));
    let width = i64::from(frame.width());
    let height = i64::from(frame.height());
    let step = i64::from(scale);
    let mut cursor = i64::from(origin.0);

    for c in text {
        if cursor >= width {
            break;
        }
        if let Some(glyph) = glyphs::glyph(c) {
            for row in 0..GLYPH_HEIGHT {
                for col in 0..GLYPH_WIDTH {
                    if !glyphs::is_set(glyph, col, row) {
                        continue;
                    }
                    let x = cursor + i64::from(col) * step;
                    let y = i64::from(origin.1) + i64::from(row) * step;
                    // Clip the cell here; Rect overflows near i32::MAX
                    let (x0, y0) = (x.max(0), y.max(0));
                    let (x1, y1) = ((x + step).min(width), (y + step).min(height));
                    if x0 >= x1 || y0 >= y1 {
                        continue;
                    }
                    if let (Ok(left), Ok(top)) = (i32::try_from(x0), i32::try_from(y0)) {
                        draw_filled_rect_mut(
                            frame.pixels_mut(),
                            Rect::at(left, top).of_size((x1 - x0) as u32, (y1 - y0) as u32),
                            color,
                        );
                    }
                }
            }
        }
        cursor += i64::from(GLYPH_ADVANCE) * step;
    }
}

/// Alpha-composite `icon` onto the frame with its top-left at `origin`
///
/// Only the part of the icon that overlaps the frame is touched.
pub fn composite_icon(frame: &mut Frame, icon: &RgbaImage, origin: (i32, i32)) {
    let (ox, oy) = (i64::from(origin.0), i64::from(origin.1));
    let x_start = ox.max(0);
    let y_start = oy.max(0);
    let x_end = (ox + i64::from(icon.width())).min(i64::from(frame.width()));
    let y_end = (oy + i64::from(icon.height())).min(i64::from(frame.height()));
    if x_start >= x_end || y_start >= y_end {
        return;
    }

    let format: PixelFormat = frame.format();
    let pixels = frame.pixels_mut();
    for fy in y_start..y_end {
        for fx in x_start..x_end {
            let src = icon.get_pixel((fx - ox) as u32, (fy - oy) as u32).0;
            let alpha = f32::from(src[3]) / 255.0;
            let fg = format.from_rgb([src[0], src[1], src[2]]);
            let dst = pixels.get_pixel_mut(fx as u32, fy as u32);
            for c in 0..3 {
                dst.0[c] = blend(fg[c], dst.0[c], alpha);
            }
        }
    }
}

/// `alpha * fg + (1 - alpha) * bg`, rounded
#[inline]
pub fn blend(fg: u8, bg: u8, alpha: f32) -> u8 {
    let v = alpha * f32::from(fg) + (1.0 - alpha) * f32::from(bg);
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn renderer_with_icon(origin: (i32, i32), size: u32, rgba: [u8; 4]) -> OverlayRenderer {
        let style = OverlayStyle {
            icon_origin: origin,
            icon_size: size,
            ..OverlayStyle::default()
        };
        let mut icons = IconSet::empty(size);
        icons.insert("happy", RgbaImage::from_pixel(size, size, Rgba(rgba)));
        OverlayRenderer::new(style, icons).unwrap()
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(200, 100, 1.0), 200);
        assert_eq!(blend(200, 100, 0.0), 100);
        assert_eq!(blend(200, 100, 0.5), 150);
    }

    #[test]
    fn test_text_is_green_in_frame_order() {
        let renderer = OverlayRenderer::text_only();
        let frame = Frame::filled(1, PixelFormat::Bgr24, 320, 120, [0, 0, 0]);
        let out = renderer.render(frame, &"happy".into());

        // Top-left pixel of 'E' is set
        assert_eq!(out.rgb_at(20, 30), Some([0, 255, 0]));
        assert_eq!(out.pixels().get_pixel(20, 30).0, [0, 255, 0]);
        // Well outside the banner
        assert_eq!(out.rgb_at(300, 110), Some([0, 0, 0]));
    }

    #[test]
    fn test_icon_overhanging_right_edge_is_clipped() {
        let renderer = renderer_with_icon((90, 0), 32, [255, 0, 0, 255]);
        let frame = Frame::filled(1, PixelFormat::Bgr24, 100, 20, [0, 0, 255]);
        let out = renderer.render(frame, &"happy".into());

        assert_eq!(out.width(), 100);
        assert_eq!(out.rgb_at(89, 10), Some([0, 0, 255]));
        assert_eq!(out.rgb_at(90, 10), Some([255, 0, 0]));
        assert_eq!(out.rgb_at(99, 19), Some([255, 0, 0]));
    }

    #[test]
    fn test_icon_at_negative_origin() {
        let renderer = renderer_with_icon((-8, -8), 16, [0, 0, 255, 255]);
        let frame = Frame::filled(1, PixelFormat::Rgb24, 200, 200, [9, 9, 9]);
        let out = renderer.render(frame, &"happy".into());

        assert_eq!(out.rgb_at(0, 0), Some([0, 0, 255]));
        assert_eq!(out.rgb_at(7, 7), Some([0, 0, 255]));
        assert_eq!(out.rgb_at(8, 8), Some([9, 9, 9]));
    }

    #[test]
    fn test_half_transparent_icon_blends() {
        let renderer = renderer_with_icon((150, 150), 10, [255, 255, 255, 128]);
        let frame = Frame::filled(1, PixelFormat::Bgr24, 200, 200, [0, 0, 0]);
        let out = renderer.render(frame, &"happy".into());
        assert_eq!(out.rgb_at(155, 155), Some([128, 128, 128]));
    }

    #[test]
    fn test_label_without_icon_draws_text_only() {
        let renderer = renderer_with_icon((150, 150), 10, [255, 255, 255, 255]);
        let frame = Frame::filled(1, PixelFormat::Bgr24, 200, 200, [0, 0, 0]);
        let out = renderer.render(frame, &"sad".into());
        assert_eq!(out.rgb_at(155, 155), Some([0, 0, 0]));
    }

    #[test]
    fn test_text_origin_at_extremes_leaves_frame_untouched() {
        for origin in [(20, i32::MAX - 1), (i32::MAX - 1, 20), (i32::MIN, i32::MIN)] {
            let style = OverlayStyle {
                text_origin: origin,
                ..OverlayStyle::default()
            };
            let renderer = OverlayRenderer::new(style, IconSet::empty(64)).unwrap();
            let frame = Frame::filled(1, PixelFormat::Bgr24, 64, 48, [7, 7, 7]);
            let out = renderer.render(frame, &"neutral".into());
            assert!(out.pixels().pixels().all(|p| p.0 == [7, 7, 7]), "{:?}", origin);
        }
    }

    #[test]
    fn test_text_above_top_edge_is_clipped() {
        let mut frame = Frame::filled(1, PixelFormat::Rgb24, 64, 48, [0, 0, 0]);
        draw_text(&mut frame, "E".chars(), (20, -2), 3, [255, 255, 255]);
        // The first glyph row is cut down to a single pixel line
        assert_eq!(frame.rgb_at(20, 0), Some([255, 255, 255]));
        assert_eq!(frame.rgb_at(22, 0), Some([255, 255, 255]));
    }

    #[test]
    fn test_tiny_frame_does_not_panic() {
        let renderer = renderer_with_icon((20, 70), 64, [1, 2, 3, 255]);
        let frame = Frame::filled(1, PixelFormat::Bgr24, 1, 1, [0, 0, 0]);
        let out = renderer.render(frame, &"happy".into());
        assert_eq!(out.rgb_at(0, 0), Some([0, 0, 0]));
    }
}
