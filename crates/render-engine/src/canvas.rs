//! Software 2D canvas.
//!
//! A small immediate-mode drawing surface over an RGBA buffer with the
//! state model of an HTML canvas context: a current transform and global
//! alpha that can be pushed with [`Canvas::save`] and popped with
//! [`Canvas::restore`]. Transform calls compose in local space, so
//! `translate` then `rotate` rotates about the translated origin.

use image::{Rgba, RgbaImage};
use kurbo::{Affine, Point, Rect, Vec2};

#[derive(Debug, Clone, Copy)]
struct DrawState {
    transform: Affine,
    alpha: f64,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            alpha: 1.0,
        }
    }
}

/// RGBA raster with a transform/alpha state stack.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: RgbaImage,
    state: DrawState,
    stack: Vec<DrawState>,
}

impl Canvas {
    /// Create a fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width.max(1), height.max(1), Rgba([0, 0, 0, 0])),
            state: DrawState::default(),
            stack: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Canvas bounds in device pixels.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    /// Push the current transform and alpha.
    pub fn save(&mut self) {
        self.stack.push(self.state);
    }

    /// Pop the last saved transform and alpha. Unbalanced calls are ignored.
    pub fn restore(&mut self) {
        if let Some(state) = self.stack.pop() {
            self.state = state;
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.state.transform *= Affine::translate(Vec2::new(dx, dy));
    }

    /// Rotate clockwise (y axis points down) by `radians`.
    pub fn rotate(&mut self, radians: f64) {
        self.state.transform *= Affine::rotate(radians);
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform *= Affine::scale_non_uniform(sx, sy);
    }

    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    /// Alpha multiplied into every subsequent draw, clamped to `[0, 1]`.
    pub fn set_global_alpha(&mut self, alpha: f64) {
        self.state.alpha = if alpha.is_finite() {
            alpha.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    pub fn global_alpha(&self) -> f64 {
        self.state.alpha
    }

    /// Reset every pixel to transparent black, ignoring the transform.
    pub fn clear(&mut self) {
        for px in self.pixels.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
    }

    /// Fill `rect` (in user space) with a solid color.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        self.paint(rect, |_| Some(color));
    }

    /// Draw `image` stretched into `dest` (in user space).
    pub fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 || dest.width() <= 0.0 || dest.height() <= 0.0 {
            return;
        }
        let sx = iw as f64 / dest.width();
        let sy = ih as f64 / dest.height();
        self.paint(dest, |local| {
            let u = (((local.x - dest.x0) * sx) as u32).min(iw - 1);
            let v = (((local.y - dest.y0) * sy) as u32).min(ih - 1);
            Some(*image.get_pixel(u, v))
        });
    }

    /// Blend a single device pixel with `coverage` in `[0, 1]`, ignoring the
    /// transform but honoring global alpha.
    pub fn blend_device_pixel(&mut self, x: i64, y: i64, color: Rgba<u8>, coverage: f64) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let alpha = coverage.clamp(0.0, 1.0) * self.state.alpha;
        blend(self.pixels.get_pixel_mut(x as u32, y as u32), color, alpha);
    }

    /// Shade every device pixel whose center maps inside `rect`.
    fn paint(&mut self, rect: Rect, mut shade: impl FnMut(Point) -> Option<Rgba<u8>>) {
        let transform = self.state.transform;
        if transform.determinant().abs() < f64::EPSILON || self.state.alpha <= 0.0 {
            return;
        }
        let inverse = transform.inverse();
        let covered = transform.transform_rect_bbox(rect).intersect(self.bounds());
        if covered.width() <= 0.0 || covered.height() <= 0.0 {
            return;
        }

        let x0 = covered.x0.floor() as u32;
        let y0 = covered.y0.floor() as u32;
        let x1 = (covered.x1.ceil() as u32).min(self.width());
        let y1 = (covered.y1.ceil() as u32).min(self.height());
        let alpha = self.state.alpha;

        for y in y0..y1 {
            for x in x0..x1 {
                let local = inverse * Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if !rect.contains(local) {
                    continue;
                }
                if let Some(color) = shade(local) {
                    blend(self.pixels.get_pixel_mut(x, y), color, alpha);
                }
            }
        }
    }
}

/// Source-over blend of `src` (scaled by `alpha`) onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>, alpha: f64) {
    let sa = (src.0[3] as f64 / 255.0) * alpha;
    if sa <= 0.0 {
        return;
    }
    let da = dst.0[3] as f64 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = src.0[c] as f64 / 255.0;
        let d = dst.0[c] as f64 / 255.0;
        let v = (s * sa + d * da * (1.0 - sa)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    *dst = Rgba(out);
}

/// Parse `#rrggbb` or `#rgb` into an opaque color.
pub fn parse_hex_color(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.trim().strip_prefix('#')?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some(Rgba([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            255,
        ])),
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some(Rgba([expand(0)?, expand(1)?, expand(2)?, 255]))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_fill_rect_respects_translation() {
        let mut canvas = Canvas::new(10, 10);
        canvas.translate(5.0, 0.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 2.0, 2.0), RED);
        assert_eq!(*canvas.pixels().get_pixel(5, 0), RED);
        assert_eq!(canvas.pixels().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_save_restore_round_trips_state() {
        let mut canvas = Canvas::new(4, 4);
        canvas.save();
        canvas.rotate(1.0);
        canvas.set_global_alpha(0.5);
        canvas.restore();
        assert_eq!(canvas.transform(), Affine::IDENTITY);
        assert_eq!(canvas.global_alpha(), 1.0);
        // Extra restore is harmless.
        canvas.restore();
    }

    #[test]
    fn test_half_alpha_blends_over_opaque() {
        let mut canvas = Canvas::new(2, 2);
        canvas.fill_rect(canvas.bounds(), BLUE);
        canvas.set_global_alpha(0.5);
        canvas.fill_rect(canvas.bounds(), RED);
        let px = canvas.pixels().get_pixel(1, 1);
        assert_eq!(px.0, [128, 0, 128, 255]);
    }

    #[test]
    fn test_rotation_about_center_moves_corner() {
        let mut image = RgbaImage::from_pixel(4, 2, BLUE);
        image.put_pixel(0, 0, RED);

        let mut canvas = Canvas::new(4, 4);
        canvas.translate(2.0, 2.0);
        canvas.rotate(std::f64::consts::FRAC_PI_2);
        canvas.translate(-2.0, -2.0);
        canvas.draw_image(&image, Rect::new(0.0, 1.0, 4.0, 3.0));

        // A quarter turn clockwise sends the top-left texel to the top-right.
        assert_eq!(*canvas.pixels().get_pixel(2, 0), RED);
        assert_eq!(*canvas.pixels().get_pixel(1, 3), BLUE);
        assert_eq!(canvas.pixels().get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_draw_image_scales_to_destination() {
        let image = RgbaImage::from_pixel(1, 1, RED);
        let mut canvas = Canvas::new(8, 8);
        canvas.draw_image(&image, Rect::new(2.0, 2.0, 6.0, 6.0));
        assert_eq!(*canvas.pixels().get_pixel(2, 2), RED);
        assert_eq!(*canvas.pixels().get_pixel(5, 5), RED);
        assert_eq!(canvas.pixels().get_pixel(6, 6).0[3], 0);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ff0000"), Some(RED));
        assert_eq!(parse_hex_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }
}
