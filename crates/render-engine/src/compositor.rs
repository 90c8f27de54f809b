//! Preview compositing.
//!
//! Draws one clip onto the fixed-size canvas: background, the media frame
//! letterboxed and rotated about the canvas center, then the text overlay
//! (never rotated) centered on its percent position.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use kurbo::Rect;
use montage_common::config::PreviewDefaults;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{letterbox, Clip, ClipKind, EditorState, Rotation};

use crate::canvas::{parse_hex_color, Canvas};
use crate::media::{MediaLibrary, MediaSource};
use crate::text::TextRenderer;

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Map clip-local time to a source time.
///
/// Video loops over `[trim_start, media_end)`; images and audio ignore time.
pub fn source_time(clip: &Clip, clip_time_secs: f64) -> f64 {
    if clip.kind != ClipKind::Video {
        return 0.0;
    }
    let t = clip_time_secs.max(0.0);
    let start = clip.trim_start();
    let window = clip.media_duration_secs - start;
    if window <= 0.0 {
        return start;
    }
    start + t % window
}

/// Renders clips onto a canvas of fixed size.
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    width: u32,
    height: u32,
    background: Rgba<u8>,
    text: TextRenderer,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl PreviewRenderer {
    /// Renderer with a black background and no text font.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            background: BLACK,
            text: TextRenderer::disabled(),
        }
    }

    /// Renderer configured from the preview section, discovering a font.
    pub fn from_config(config: &PreviewDefaults) -> Self {
        let background = parse_hex_color(&config.background).unwrap_or_else(|| {
            tracing::warn!(background = %config.background, "Invalid background color, using black");
            BLACK
        });
        Self {
            width: config.width.max(1),
            height: config.height.max(1),
            background,
            text: TextRenderer::discover(config.font_path.as_deref()),
        }
    }

    pub fn with_text_renderer(mut self, text: TextRenderer) -> Self {
        self.text = text;
        self
    }

    /// Same styling at another output size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            ..self.clone()
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn new_canvas(&self) -> Canvas {
        Canvas::new(self.width, self.height)
    }

    /// Render the clip under the playback cursor of `state`.
    ///
    /// An empty timeline or an index past the end leaves a cleared canvas.
    pub fn render_state(
        &self,
        canvas: &mut Canvas,
        state: &EditorState,
        library: &MediaLibrary,
    ) -> MontageResult<()> {
        let index = state.playback.current_clip_index;
        let Some(clip) = state.timeline.get(index) else {
            canvas.clear();
            return Ok(());
        };
        let clip_time = state.playback.current_time_secs - state.timeline.start_of(index);
        let source = library.get(clip.source);
        self.render_clip(canvas, Some(clip), source.as_deref(), clip_time)
    }

    /// Render `clip` at clip-local time `clip_time_secs`.
    pub fn render_clip(
        &self,
        canvas: &mut Canvas,
        clip: Option<&Clip>,
        source: Option<&dyn MediaSource>,
        clip_time_secs: f64,
    ) -> MontageResult<()> {
        canvas.clear();
        let Some(clip) = clip else {
            return Ok(());
        };
        canvas.fill_rect(canvas.bounds(), self.background);

        if clip.kind.is_visual() {
            let source = source
                .ok_or_else(|| MontageError::render(format!("No media loaded for {}", clip.id)))?;
            if let Some(frame) = source.frame_at(source_time(clip, clip_time_secs))? {
                self.draw_frame(canvas, &frame, clip.rotation);
            }
        }

        self.draw_text(canvas, clip);
        Ok(())
    }

    /// Render a clip into a fresh canvas-sized image.
    pub fn snapshot(
        &self,
        clip: &Clip,
        source: Option<&dyn MediaSource>,
        clip_time_secs: f64,
    ) -> MontageResult<Arc<RgbaImage>> {
        let mut canvas = self.new_canvas();
        self.render_clip(&mut canvas, Some(clip), source, clip_time_secs)?;
        Ok(Arc::new(canvas.into_image()))
    }

    /// Draw `frame` letterboxed, rotated about the canvas center.
    pub fn draw_frame(&self, canvas: &mut Canvas, frame: &RgbaImage, rotation: Rotation) {
        let (cw, ch) = (canvas.width() as f64, canvas.height() as f64);
        let (fw, fh) = frame.dimensions();
        let fit = letterbox(fw as f64, fh as f64, cw, ch);

        canvas.save();
        canvas.translate(cw / 2.0, ch / 2.0);
        canvas.rotate(rotation.radians());
        canvas.translate(-cw / 2.0, -ch / 2.0);
        canvas.draw_image(
            frame,
            Rect::new(fit.x, fit.y, fit.x + fit.width, fit.y + fit.height),
        );
        canvas.restore();
    }

    fn draw_text(&self, canvas: &mut Canvas, clip: &Clip) {
        let Some(overlay) = clip.text.as_ref() else {
            return;
        };
        if overlay.content.is_empty() {
            return;
        }
        let color = parse_hex_color(&overlay.color_hex).unwrap_or(WHITE);
        let center = overlay
            .position
            .to_pixels(canvas.width() as f64, canvas.height() as f64);
        self.text
            .draw_centered(canvas, &overlay.content, center, overlay.size_px as f32, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{FrameSequence, StillImage};
    use montage_project_model::{ClipId, PercentPoint, SourceHandle};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn clip(kind: ClipKind, duration: f64) -> Clip {
        Clip::new(ClipId(0), kind, SourceHandle(0), "clip", duration)
    }

    #[test]
    fn test_source_time_wraps_inside_trim_window() {
        let mut video = clip(ClipKind::Video, 10.0);
        assert_eq!(source_time(&video, 3.0), 3.0);
        assert_eq!(source_time(&video, 12.0), 2.0);

        video.set_trim(4.0, 8.0, 0.1);
        assert_eq!(source_time(&video, 0.0), 4.0);
        assert_eq!(source_time(&video, 7.0), 5.0);

        assert_eq!(source_time(&clip(ClipKind::Image, 3.0), 2.0), 0.0);
    }

    #[test]
    fn test_image_is_letterboxed_on_black() {
        let renderer = PreviewRenderer::new(16, 9);
        let still = StillImage::from_image("tall", RgbaImage::from_pixel(9, 16, RED));
        let mut canvas = renderer.new_canvas();
        renderer
            .render_clip(&mut canvas, Some(&clip(ClipKind::Image, 3.0)), Some(&still), 0.0)
            .unwrap();

        let px = canvas.pixels();
        assert_eq!(*px.get_pixel(8, 4), RED);
        assert_eq!(*px.get_pixel(0, 4), BLACK);
        assert_eq!(*px.get_pixel(15, 4), BLACK);
    }

    #[test]
    fn test_rotation_turns_letterbox() {
        let renderer = PreviewRenderer::new(20, 20);
        // Wide strip fills the width and is padded vertically.
        let still = StillImage::from_image("strip", RgbaImage::from_pixel(20, 4, RED));
        let mut rotated = clip(ClipKind::Image, 3.0);
        rotated.rotate();

        let mut canvas = renderer.new_canvas();
        renderer
            .render_clip(&mut canvas, Some(&rotated), Some(&still), 0.0)
            .unwrap();

        let px = canvas.pixels();
        assert_eq!(*px.get_pixel(10, 1), RED);
        assert_eq!(*px.get_pixel(10, 18), RED);
        assert_eq!(*px.get_pixel(1, 10), BLACK);
    }

    #[test]
    fn test_text_stays_upright_on_rotated_clip() {
        let text = TextRenderer::discover(None);
        if !text.has_font() {
            return;
        }
        let renderer = PreviewRenderer::new(200, 100).with_text_renderer(text);
        let still = StillImage::from_image("blue", RgbaImage::from_pixel(200, 100, Rgba([0, 0, 255, 255])));
        let mut rotated = clip(ClipKind::Image, 3.0);
        rotated.rotate();
        rotated.set_text("MMMM", Some("#00ff00"), Some(20));
        assert!(rotated.move_text(PercentPoint::new(50.0, 20.0)));

        let mut canvas = renderer.new_canvas();
        renderer
            .render_clip(&mut canvas, Some(&rotated), Some(&still), 0.0)
            .unwrap();

        let lit: Vec<(u32, u32)> = canvas
            .pixels()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[1] > 100)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert!(!lit.is_empty());
        let mean_x = lit.iter().map(|(x, _)| *x as f64).sum::<f64>() / lit.len() as f64;
        let mean_y = lit.iter().map(|(_, y)| *y as f64).sum::<f64>() / lit.len() as f64;
        // (100, 20) on the canvas; a rotated overlay would sit near (130, 50).
        assert!((mean_x - 100.0).abs() < 10.0, "x {mean_x}");
        assert!((mean_y - 20.0).abs() < 10.0, "y {mean_y}");
    }

    #[test]
    fn test_no_clip_clears_canvas() {
        let renderer = PreviewRenderer::new(4, 4);
        let mut canvas = renderer.new_canvas();
        canvas.fill_rect(canvas.bounds(), RED);
        renderer.render_clip(&mut canvas, None, None, 0.0).unwrap();
        assert!(canvas.pixels().pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_audio_clip_renders_black() {
        let renderer = PreviewRenderer::new(4, 4);
        let mut canvas = renderer.new_canvas();
        renderer
            .render_clip(&mut canvas, Some(&clip(ClipKind::Audio, 5.0)), None, 1.0)
            .unwrap();
        assert!(canvas.pixels().pixels().all(|p| *p == BLACK));
    }

    #[test]
    fn test_missing_media_is_a_render_error() {
        let renderer = PreviewRenderer::new(4, 4);
        let mut canvas = renderer.new_canvas();
        let err = renderer
            .render_clip(&mut canvas, Some(&clip(ClipKind::Video, 2.0)), None, 0.0)
            .unwrap_err();
        assert!(matches!(err, MontageError::Render { .. }));
    }

    #[test]
    fn test_render_state_uses_clip_local_time() {
        let renderer = PreviewRenderer::new(4, 4);
        let library = MediaLibrary::new();
        let still = library.insert(Arc::new(StillImage::from_image(
            "a",
            RgbaImage::from_pixel(4, 4, RED),
        )));
        let frames = (0..4)
            .map(|i| RgbaImage::from_pixel(4, 4, Rgba([0, i * 60, 0, 255])))
            .collect();
        let video = library.insert(Arc::new(FrameSequence::new("b", 1, frames)));

        let mut state = EditorState::new();
        state.timeline.push(ClipKind::Image, still, "a", 3.0);
        state.timeline.push(ClipKind::Video, video, "b", 4.0);
        state.playback.current_clip_index = 1;
        state.playback.current_time_secs = 5.5;

        let mut canvas = renderer.new_canvas();
        renderer.render_state(&mut canvas, &state, &library).unwrap();
        // 2.5 s into the video clip shows its third frame.
        assert_eq!(canvas.pixels().get_pixel(1, 1).0, [0, 120, 0, 255]);

        state.playback.current_clip_index = 2;
        renderer.render_state(&mut canvas, &state, &library).unwrap();
        assert!(canvas.pixels().pixels().all(|p| p.0[3] == 0));
    }
}
