//! Export settings and transition modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output container/codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// MP4 container with H.264 video.
    #[default]
    Mp4,
    /// WebM container with VP9 video.
    Webm,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "mp4-h264" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            other => Err(format!("Unknown format: {other}. Use: mp4, webm")),
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Output resolution (width x height in pixels).
    pub width: u32,
    pub height: u32,

    /// Capture frame rate.
    pub fps: u32,

    /// Target video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// Output format.
    pub format: ExportFormat,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            video_bitrate_kbps: 8000,
            format: ExportFormat::Mp4,
        }
    }
}

/// Interpolation used when one clip hands over to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Hard cut.
    #[default]
    None,
    /// Cross-dissolve.
    Fade,
    /// Outgoing slides out left while incoming enters from the right.
    Slide,
    /// Outgoing grows about the center while incoming fades in.
    Zoom,
}

impl FromStr for TransitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "fade" => Ok(Self::Fade),
            "slide" => Ok(Self::Slide),
            "zoom" => Ok(Self::Zoom),
            other => Err(format!(
                "Unknown transition: {other}. Use: none, fade, slide, zoom"
            )),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Fade => "fade",
            Self::Slide => "slide",
            Self::Zoom => "zoom",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_defaults() {
        let settings = ExportSettings::default();
        assert_eq!((settings.width, settings.height), (1280, 720));
        assert_eq!(settings.fps, 30);
        assert_eq!(settings.video_bitrate_kbps, 8000);
        assert_eq!(settings.format.extension(), "mp4");
    }

    #[test]
    fn test_transition_parse_round_trip() {
        for kind in [
            TransitionKind::None,
            TransitionKind::Fade,
            TransitionKind::Slide,
            TransitionKind::Zoom,
        ] {
            assert_eq!(kind.to_string().parse::<TransitionKind>(), Ok(kind));
        }
        assert!("wipe".parse::<TransitionKind>().is_err());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("WebM".parse::<ExportFormat>(), Ok(ExportFormat::Webm));
        assert!("gif".parse::<ExportFormat>().is_err());
    }
}
