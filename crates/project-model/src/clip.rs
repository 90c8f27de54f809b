//! Clip types: the entries of a timeline and their per-clip edits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::PercentPoint;

/// Identity of a clip within its timeline. Assigned on insertion and never
/// reused, so it stays stable across reorders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(pub u64);

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "clip-{}", self.0)
    }
}

/// Opaque reference to decoded media held by the media library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceHandle(pub u64);

/// What kind of media a clip carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Image,
    Video,
    Audio,
}

impl ClipKind {
    /// Classify media by MIME type. Anything that is not `image/*` or
    /// `audio/*` is treated as video.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Video
        }
    }

    /// Whether the clip produces pictures on the canvas.
    pub fn is_visual(self) -> bool {
        !matches!(self, Self::Audio)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Clockwise rotation in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Rotation = Rotation(0);

    /// Snap an arbitrary angle to the quarter turn at or below it, mod 360.
    pub fn from_degrees(degrees: i32) -> Self {
        let normalized = degrees.rem_euclid(360);
        Self(((normalized / 90) * 90) as u16)
    }

    /// Rotation in degrees: one of 0, 90, 180, 270.
    pub fn degrees(self) -> u16 {
        self.0
    }

    pub fn radians(self) -> f64 {
        f64::from(self.0).to_radians()
    }

    /// Next quarter turn clockwise (270 wraps to 0).
    pub fn rotated_cw(self) -> Self {
        Self((self.0 + 90) % 360)
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.0
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value % 90 == 0 && value < 360 {
            Ok(Self(value))
        } else {
            Err(format!("rotation must be 0, 90, 180 or 270 (got {value})"))
        }
    }
}

/// Minimum gap kept between trim start and end (one slider step).
pub const TRIM_STEP_SECS: f64 = 0.1;

/// Trimmed playback window of a video clip, in source seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    pub start: f64,
    pub end: f64,
}

impl TrimRange {
    /// Build a trim window, coercing an inverted or empty range.
    ///
    /// When `start >= end` the start snaps to `end - step` rather than
    /// being accepted.
    pub fn coerced(start: f64, end: f64, step: f64) -> Self {
        let step = if step > 0.0 { step } else { TRIM_STEP_SECS };
        let end = end.max(step);
        let start = start.max(0.0);
        let start = if start >= end {
            (end - step).max(0.0)
        } else {
            start
        };
        Self { start, end }
    }

    /// Length of the window in seconds.
    pub fn len_secs(&self) -> f64 {
        self.end - self.start
    }
}

/// Text drawn over a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub content: String,
    /// Fill color as `#rrggbb`.
    pub color_hex: String,
    pub size_px: u32,
    /// Center of the text, in percent of canvas size.
    pub position: PercentPoint,
}

impl TextOverlay {
    pub const DEFAULT_COLOR: &'static str = "#ffffff";
    pub const DEFAULT_SIZE_PX: u32 = 24;

    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            color_hex: Self::DEFAULT_COLOR.to_string(),
            size_px: Self::DEFAULT_SIZE_PX,
            position: PercentPoint::CENTER,
        }
    }
}

/// Playback window and gain of an audio clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioRange {
    pub start_time: f64,
    pub end_time: f64,
    /// Linear gain in `[0.0, 1.0]`.
    pub volume: f64,
}

impl AudioRange {
    pub fn full(duration_secs: f64) -> Self {
        Self {
            start_time: 0.0,
            end_time: duration_secs.max(0.0),
            volume: 1.0,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// A single timeline entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub kind: ClipKind,
    pub source: SourceHandle,

    /// Display name, usually the imported file name.
    pub name: String,

    /// Intrinsic media length for video/audio; display time for images.
    pub media_duration_secs: f64,

    #[serde(default)]
    pub rotation: Rotation,

    #[serde(default)]
    pub trim: Option<TrimRange>,

    #[serde(default)]
    pub text: Option<TextOverlay>,

    #[serde(default)]
    pub audio: Option<AudioRange>,
}

impl Clip {
    pub fn new(
        id: ClipId,
        kind: ClipKind,
        source: SourceHandle,
        name: impl Into<String>,
        media_duration_secs: f64,
    ) -> Self {
        let media_duration_secs = if media_duration_secs.is_finite() {
            media_duration_secs.max(0.0)
        } else {
            0.0
        };
        Self {
            id,
            kind,
            source,
            name: name.into(),
            media_duration_secs,
            rotation: Rotation::NONE,
            trim: None,
            text: None,
            audio: (kind == ClipKind::Audio).then(|| AudioRange::full(media_duration_secs)),
        }
    }

    /// How long this clip occupies when played.
    ///
    /// Images and video report their display/intrinsic length; audio clips
    /// report the length of their selected range.
    pub fn duration_secs(&self) -> f64 {
        match (self.kind, &self.audio) {
            (ClipKind::Audio, Some(range)) => range.duration_secs(),
            _ => self.media_duration_secs,
        }
    }

    /// Length this clip contributes to the picture timeline. Audio clips
    /// carry no frames and are stepped over by playback and export.
    pub fn timeline_span_secs(&self) -> f64 {
        if self.kind.is_visual() {
            self.duration_secs()
        } else {
            0.0
        }
    }

    /// Rotate a quarter turn clockwise.
    pub fn rotate(&mut self) -> Rotation {
        self.rotation = self.rotation.rotated_cw();
        self.rotation
    }

    /// Apply a trim window clamped to the media length.
    pub fn set_trim(&mut self, start: f64, end: f64, step: f64) -> TrimRange {
        let end = if self.media_duration_secs > 0.0 {
            end.min(self.media_duration_secs)
        } else {
            end
        };
        let range = TrimRange::coerced(start, end, step);
        self.trim = Some(range);
        range
    }

    /// Trim start, or zero when untrimmed.
    pub fn trim_start(&self) -> f64 {
        self.trim.map(|t| t.start).unwrap_or(0.0)
    }

    /// Set overlay content and styling, keeping any existing position.
    pub fn set_text(&mut self, content: impl Into<String>, color_hex: Option<&str>, size_px: Option<u32>) {
        let overlay = self
            .text
            .get_or_insert_with(|| TextOverlay::new(String::new()));
        overlay.content = content.into();
        if let Some(color) = color_hex {
            overlay.color_hex = color.to_string();
        }
        if let Some(size) = size_px {
            overlay.size_px = size.max(1);
        }
    }

    /// Move the overlay center. No-op without an overlay.
    pub fn move_text(&mut self, position: PercentPoint) -> bool {
        match self.text.as_mut() {
            Some(overlay) => {
                overlay.position = position;
                true
            }
            None => false,
        }
    }

    /// Set the audio start; values at or past the end are pulled back one step.
    pub fn set_audio_start(&mut self, start: f64) -> Option<AudioRange> {
        let range = self.audio.as_mut()?;
        let upper = (range.end_time - TRIM_STEP_SECS).max(0.0);
        range.start_time = start.clamp(0.0, upper);
        Some(*range)
    }

    /// Set the audio end, bounded by the media length and the start.
    pub fn set_audio_end(&mut self, end: f64) -> Option<AudioRange> {
        let media = self.media_duration_secs;
        let range = self.audio.as_mut()?;
        let lower = range.start_time + TRIM_STEP_SECS;
        let upper = if media > 0.0 { media.max(lower) } else { f64::MAX };
        range.end_time = end.clamp(lower, upper);
        Some(*range)
    }

    /// Set the audio gain, clamped to `[0.0, 1.0]`.
    pub fn set_audio_volume(&mut self, volume: f64) -> Option<AudioRange> {
        let range = self.audio.as_mut()?;
        range.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Some(*range)
    }
}
