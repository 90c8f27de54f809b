//! Overlay text rasterization.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::Rgba;
use montage_common::error::{MontageError, MontageResult};
use rusttype::{point, Font, Scale};

use crate::canvas::Canvas;

/// Fonts probed when no font is configured.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Draws centered single-line text. Without a font every draw is a no-op.
#[derive(Clone, Default)]
pub struct TextRenderer {
    font: Option<Arc<Font<'static>>>,
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl TextRenderer {
    /// Renderer that skips text.
    pub fn disabled() -> Self {
        Self { font: None }
    }

    /// Load a TrueType/OpenType font file.
    pub fn from_file(path: &Path) -> MontageResult<Self> {
        if !path.exists() {
            return Err(MontageError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        let font = Font::try_from_vec(bytes)
            .ok_or_else(|| MontageError::render(format!("Invalid font file: {}", path.display())))?;
        Ok(Self {
            font: Some(Arc::new(font)),
        })
    }

    /// Use `configured` when set, otherwise the first installed fallback.
    pub fn discover(configured: Option<&Path>) -> Self {
        if let Some(path) = configured {
            match Self::from_file(path) {
                Ok(renderer) => return renderer,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Configured font unusable, probing system fonts");
                }
            }
        }

        for candidate in FALLBACK_FONTS.iter().map(PathBuf::from) {
            if let Ok(renderer) = Self::from_file(&candidate) {
                tracing::debug!(font = %candidate.display(), "Loaded overlay font");
                return renderer;
            }
        }

        tracing::warn!("No overlay font found; text overlays will not be drawn");
        Self::disabled()
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Horizontal advance of `text` at `size_px`, or `None` without a font.
    pub fn measure(&self, text: &str, size_px: f32) -> Option<f32> {
        let font = self.font.as_ref()?;
        let scale = Scale::uniform(size_px);
        let width = font
            .layout(text, scale, point(0.0, 0.0))
            .last()
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .unwrap_or(0.0);
        Some(width)
    }

    /// Draw `text` centered horizontally and vertically on `center` (device
    /// pixels). Returns whether anything was drawn.
    pub fn draw_centered(
        &self,
        canvas: &mut Canvas,
        text: &str,
        center: (f64, f64),
        size_px: f32,
        color: Rgba<u8>,
    ) -> bool {
        let Some(font) = self.font.as_ref() else {
            return false;
        };
        if text.is_empty() || size_px <= 0.0 {
            return false;
        }

        let scale = Scale::uniform(size_px);
        let metrics = font.v_metrics(scale);
        let width = self.measure(text, size_px).unwrap_or(0.0);
        let left = center.0 as f32 - width / 2.0;
        let baseline = center.1 as f32 + (metrics.ascent + metrics.descent) / 2.0;

        for glyph in font.layout(text, scale, point(left, baseline)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                canvas.blend_device_pixel(
                    (bb.min.x + gx as i32) as i64,
                    (bb.min.y + gy as i32) as i64,
                    color,
                    coverage as f64,
                );
            });
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_renderer_draws_nothing() {
        let mut canvas = Canvas::new(8, 8);
        let drawn = TextRenderer::disabled().draw_centered(
            &mut canvas,
            "hello",
            (4.0, 4.0),
            12.0,
            Rgba([255, 255, 255, 255]),
        );
        assert!(!drawn);
        assert!(canvas.pixels().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_missing_font_file_is_reported() {
        let err = TextRenderer::from_file(Path::new("/nonexistent/font.ttf")).unwrap_err();
        assert!(matches!(err, MontageError::FileNotFound { .. }));
    }

    #[test]
    fn test_discovered_font_draws_near_center() {
        let renderer = TextRenderer::discover(None);
        if !renderer.has_font() {
            return;
        }
        let mut canvas = Canvas::new(200, 100);
        let white = Rgba([255, 255, 255, 255]);
        assert!(renderer.draw_centered(&mut canvas, "MMMM", (100.0, 50.0), 24.0, white));

        let lit: Vec<(u32, u32)> = canvas
            .pixels()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!lit.is_empty());
        let mean_x = lit.iter().map(|(x, _)| *x as f64).sum::<f64>() / lit.len() as f64;
        let mean_y = lit.iter().map(|(_, y)| *y as f64).sum::<f64>() / lit.len() as f64;
        assert!((mean_x - 100.0).abs() < 10.0);
        assert!((mean_y - 50.0).abs() < 10.0);
    }
}
