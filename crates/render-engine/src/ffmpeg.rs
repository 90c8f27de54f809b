//! Helpers around the external `ffmpeg`/`ffprobe` binaries.

use std::path::Path;
use std::process::Command;

use montage_common::error::{MontageError, MontageResult};
use serde::Deserialize;

/// Stream facts reported by `ffprobe`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaProbe {
    /// Video width, when the file has a video stream.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Container duration in seconds (0 when unknown).
    pub duration_secs: f64,
}

impl MediaProbe {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Probe a media file's first video stream and duration.
pub fn probe_media(path: &Path) -> MontageResult<MediaProbe> {
    if !path.exists() {
        return Err(MontageError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height,duration:format=duration",
            "-of",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| MontageError::media(format!("Failed to start ffprobe: {e}")))?;

    if !output.status.success() {
        return Err(MontageError::media(format!(
            "ffprobe failed for {} (status {}): {}",
            path.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    parse_probe_json(&output.stdout)
}

fn parse_probe_json(raw: &[u8]) -> MontageResult<MediaProbe> {
    let parsed: ProbeOutput = serde_json::from_slice(raw)?;
    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));

    let stream_duration = parsed
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
        .fold(0.0f64, f64::max);
    let format_duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref()?.parse::<f64>().ok())
        .unwrap_or(0.0);
    let duration_secs = if format_duration > 0.0 {
        format_duration
    } else {
        stream_duration
    };

    Ok(MediaProbe {
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
        duration_secs: if duration_secs.is_finite() {
            duration_secs
        } else {
            0.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_prefers_format_duration() {
        let raw = br#"{
            "streams": [
                {"codec_type": "audio", "duration": "9.5"},
                {"codec_type": "video", "width": 1920, "height": 1080, "duration": "9.4"}
            ],
            "format": {"duration": "10.0"}
        }"#;
        let probe = parse_probe_json(raw).unwrap();
        assert_eq!(probe.dimensions(), Some((1920, 1080)));
        assert_eq!(probe.duration_secs, 10.0);
    }

    #[test]
    fn test_parse_probe_audio_only() {
        let raw = br#"{"streams": [{"codec_type": "audio", "duration": "3.25"}], "format": {}}"#;
        let probe = parse_probe_json(raw).unwrap();
        assert_eq!(probe.dimensions(), None);
        assert_eq!(probe.duration_secs, 3.25);
    }

    #[test]
    fn test_probe_missing_file() {
        let err = probe_media(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, MontageError::FileNotFound { .. }));
    }
}
