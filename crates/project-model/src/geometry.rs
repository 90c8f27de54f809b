//! Resolution-independent positions and aspect-fit placement.

use serde::{Deserialize, Serialize};

/// A point expressed in percent of the canvas: `(0, 0)` is top-left,
/// `(100, 100)` bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    pub const CENTER: PercentPoint = PercentPoint { x: 50.0, y: 50.0 };

    /// Create a point, clamping both axes to `[0, 100]`.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: x.clamp(0.0, 100.0),
            y: y.clamp(0.0, 100.0),
        }
    }

    /// Convert a pixel position on a `width`×`height` surface.
    pub fn from_pixels(px: f64, py: f64, width: f64, height: f64) -> Self {
        if width <= 0.0 || height <= 0.0 {
            return Self::CENTER;
        }
        Self::new(px / width * 100.0, py / height * 100.0)
    }

    /// Pixel position on a `width`×`height` surface.
    pub fn to_pixels(&self, width: f64, height: f64) -> (f64, f64) {
        (self.x * width / 100.0, self.y * height / 100.0)
    }

    /// Whether `other` lies within `radius` percent on both axes.
    pub fn is_near(&self, other: &PercentPoint, radius: f64) -> bool {
        (self.x - other.x).abs() < radius && (self.y - other.y).abs() < radius
    }
}

impl Default for PercentPoint {
    fn default() -> Self {
        Self::CENTER
    }
}

/// Axis-aligned placement rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FitRect {
    pub fn full(width: f64, height: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }
}

/// Scale a `src_w`×`src_h` source to fit inside `dst_w`×`dst_h` without
/// overflow, preserving aspect ratio and centering the remainder.
///
/// Wider sources fill the width and are padded top and bottom; taller
/// sources fill the height and are padded left and right. Unknown source
/// dimensions fill the whole target.
pub fn letterbox(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> FitRect {
    if src_w <= 0.0 || src_h <= 0.0 || dst_w <= 0.0 || dst_h <= 0.0 {
        return FitRect::full(dst_w.max(0.0), dst_h.max(0.0));
    }

    let media_ratio = src_w / src_h;
    let canvas_ratio = dst_w / dst_h;

    if media_ratio > canvas_ratio {
        let height = dst_w / media_ratio;
        FitRect {
            x: 0.0,
            y: (dst_h - height) / 2.0,
            width: dst_w,
            height,
        }
    } else {
        let width = dst_h * media_ratio;
        FitRect {
            x: (dst_w - width) / 2.0,
            y: 0.0,
            width,
            height: dst_h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_portrait_is_pillarboxed() {
        let fit = letterbox(1080.0, 1920.0, 1280.0, 720.0);
        assert!((fit.height - 720.0).abs() < 1e-9);
        assert!((fit.width - 405.0).abs() < 1e-9);
        assert!((fit.x - 437.5).abs() < 1e-9);
        assert_eq!(fit.y, 0.0);
    }

    #[test]
    fn test_letterbox_wide_is_padded_vertically() {
        let fit = letterbox(2000.0, 500.0, 1280.0, 720.0);
        assert!((fit.width - 1280.0).abs() < 1e-9);
        assert!((fit.height - 320.0).abs() < 1e-9);
        assert!((fit.y - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_letterbox_same_ratio_fills() {
        let fit = letterbox(1920.0, 1080.0, 1280.0, 720.0);
        assert!((fit.width - 1280.0).abs() < 1e-9);
        assert!((fit.height - 720.0).abs() < 1e-9);
        assert!(fit.x.abs() < 1e-9);
    }

    #[test]
    fn test_letterbox_unknown_source_fills() {
        assert_eq!(letterbox(0.0, 0.0, 1280.0, 720.0), FitRect::full(1280.0, 720.0));
    }

    #[test]
    fn test_percent_point_round_trips_pixels() {
        let p = PercentPoint::from_pixels(640.0, 180.0, 1280.0, 720.0);
        assert_eq!(p, PercentPoint::new(50.0, 25.0));
        assert_eq!(p.to_pixels(1280.0, 720.0), (640.0, 180.0));
        assert!(p.is_near(&PercentPoint::new(53.0, 21.0), 5.0));
        assert!(!p.is_near(&PercentPoint::new(56.0, 25.0), 5.0));
    }
}
