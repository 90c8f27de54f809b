//! Decoded media sources and the library that owns them.
//!
//! Clips reference media through a [`SourceHandle`]; the library resolves
//! handles to shared [`MediaSource`] objects that can produce a frame for
//! any source time.

use std::collections::HashMap;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use image::RgbaImage;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{letterbox, ClipKind, SourceHandle};

use crate::ffmpeg::{self, MediaProbe};

/// Frame rate at which video files are decoded.
pub const DECODE_FPS: u32 = 30;

/// Largest forward jump served by reading ahead instead of reseeking.
const MAX_READ_AHEAD_SECS: f64 = 2.0;

/// A piece of decoded media.
pub trait MediaSource: Send + Sync {
    fn kind(&self) -> ClipKind;

    /// Display name (usually the file name).
    fn name(&self) -> &str;

    /// Pixel size of produced frames, `None` for audio.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Intrinsic duration in seconds; 0 for stills.
    fn duration_secs(&self) -> f64;

    /// Frame to show at source time `secs`, `None` when the source has no
    /// picture.
    fn frame_at(&self, secs: f64) -> MontageResult<Option<Arc<RgbaImage>>>;
}

/// A still image.
#[derive(Debug, Clone)]
pub struct StillImage {
    name: String,
    pixels: Arc<RgbaImage>,
}

impl StillImage {
    pub fn open(path: &Path) -> MontageResult<Self> {
        if !path.exists() {
            return Err(MontageError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let pixels = image::open(path)?.to_rgba8();
        Ok(Self::from_image(file_name(path), pixels))
    }

    pub fn from_image(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            pixels: Arc::new(pixels),
        }
    }
}

impl MediaSource for StillImage {
    fn kind(&self) -> ClipKind {
        ClipKind::Image
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some(self.pixels.dimensions())
    }

    fn duration_secs(&self) -> f64 {
        0.0
    }

    fn frame_at(&self, _secs: f64) -> MontageResult<Option<Arc<RgbaImage>>> {
        Ok(Some(self.pixels.clone()))
    }
}

/// Video held in memory as frames at a fixed rate.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    name: String,
    fps: u32,
    frames: Vec<Arc<RgbaImage>>,
}

impl FrameSequence {
    pub fn new(name: impl Into<String>, fps: u32, frames: Vec<RgbaImage>) -> Self {
        Self {
            name: name.into(),
            fps: fps.max(1),
            frames: frames.into_iter().map(Arc::new).collect(),
        }
    }
}

impl MediaSource for FrameSequence {
    fn kind(&self) -> ClipKind {
        ClipKind::Video
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| f.dimensions())
    }

    fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.fps as f64
    }

    fn frame_at(&self, secs: f64) -> MontageResult<Option<Arc<RgbaImage>>> {
        if self.frames.is_empty() {
            return Ok(None);
        }
        // Nudge so times computed as sums of frame steps land on their frame.
        let index = (secs.max(0.0) * self.fps as f64 + 1e-6).floor() as usize;
        Ok(Some(self.frames[index.min(self.frames.len() - 1)].clone()))
    }
}

/// Audio-only media. Has a duration but never a picture.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    name: String,
    path: PathBuf,
    duration_secs: f64,
}

impl AudioTrack {
    pub fn new(name: impl Into<String>, path: PathBuf, duration_secs: f64) -> Self {
        Self {
            name: name.into(),
            path,
            duration_secs: duration_secs.max(0.0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MediaSource for AudioTrack {
    fn kind(&self) -> ClipKind {
        ClipKind::Audio
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn frame_at(&self, _secs: f64) -> MontageResult<Option<Arc<RgbaImage>>> {
        Ok(None)
    }
}

/// Video file decoded on demand by an `ffmpeg` child process.
///
/// Frames are read sequentially; a backwards seek or a large forward jump
/// restarts the decoder at the requested time.
pub struct FfmpegVideo {
    name: String,
    path: PathBuf,
    width: u32,
    height: u32,
    duration_secs: f64,
    decoder: Mutex<Option<Decoder>>,
}

struct Decoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    /// Source time of the next frame to be read.
    next_secs: f64,
    last: Option<Arc<RgbaImage>>,
    exhausted: bool,
}

impl Drop for Decoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl FfmpegVideo {
    /// Probe `path` and prepare a decoder whose frames fit in `max_size`.
    pub fn open(path: &Path, max_size: (u32, u32)) -> MontageResult<Self> {
        let probe = ffmpeg::probe_media(path)?;
        Self::from_probe(path, &probe, max_size)
    }

    fn from_probe(path: &Path, probe: &MediaProbe, max_size: (u32, u32)) -> MontageResult<Self> {
        let (src_w, src_h) = probe
            .dimensions()
            .ok_or_else(|| MontageError::media(format!("No video stream in {}", path.display())))?;
        let (width, height) = decode_size(src_w, src_h, max_size);
        Ok(Self {
            name: file_name(path),
            path: path.to_path_buf(),
            width,
            height,
            duration_secs: probe.duration_secs,
            decoder: Mutex::new(None),
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    fn spawn_decoder(&self, start_secs: f64) -> MontageResult<Decoder> {
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-ss"])
            .arg(format!("{start_secs:.3}"))
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgba", "-vf"])
            .arg(format!(
                "fps={DECODE_FPS},scale={}:{}",
                self.width, self.height
            ))
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MontageError::media(format!("Failed to start ffmpeg decoder: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MontageError::media("Failed to capture ffmpeg decoder stdout"))?;

        tracing::debug!(path = %self.path.display(), start_secs, "Video decoder started");
        Ok(Decoder {
            child,
            stdout: BufReader::new(stdout),
            next_secs: start_secs,
            last: None,
            exhausted: false,
        })
    }

    fn read_frame(&self, decoder: &mut Decoder) -> MontageResult<bool> {
        let mut buf = vec![0u8; self.frame_len()];
        match decoder.stdout.read_exact(&mut buf) {
            Ok(()) => {
                let frame = RgbaImage::from_raw(self.width, self.height, buf)
                    .ok_or_else(|| MontageError::media("Decoded frame has unexpected size"))?;
                decoder.last = Some(Arc::new(frame));
                decoder.next_secs += 1.0 / DECODE_FPS as f64;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                decoder.exhausted = true;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl MediaSource for FfmpegVideo {
    fn kind(&self) -> ClipKind {
        ClipKind::Video
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    fn frame_at(&self, secs: f64) -> MontageResult<Option<Arc<RgbaImage>>> {
        let secs = secs.max(0.0);
        let mut guard = self
            .decoder
            .lock()
            .map_err(|_| MontageError::media("Video decoder lock poisoned"))?;

        let frame_secs = 1.0 / DECODE_FPS as f64;
        let reusable = guard.as_ref().is_some_and(|d| {
            secs >= d.next_secs - frame_secs && secs - d.next_secs <= MAX_READ_AHEAD_SECS
        });
        if !reusable {
            *guard = Some(self.spawn_decoder(secs)?);
        }

        let decoder = guard
            .as_mut()
            .ok_or_else(|| MontageError::media("Video decoder unavailable"))?;
        while !decoder.exhausted && (decoder.last.is_none() || decoder.next_secs <= secs) {
            if !self.read_frame(decoder)? {
                break;
            }
        }
        Ok(decoder.last.clone())
    }
}

/// Fit `src` inside `max`, keeping aspect ratio and even dimensions.
fn decode_size(src_w: u32, src_h: u32, max: (u32, u32)) -> (u32, u32) {
    if src_w <= max.0 && src_h <= max.1 {
        return (src_w, src_h);
    }
    let fit = letterbox(src_w as f64, src_h as f64, max.0 as f64, max.1 as f64);
    let even = |v: f64| ((v.round() as u32) / 2 * 2).max(2);
    (even(fit.width), even(fit.height))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// MIME type derived from a file extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "tif" | "tiff" => "image/tiff",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/aac",
        "opus" => "audio/opus",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mp4" | "m4v" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// Shared registry of decoded media.
#[derive(Default)]
pub struct MediaLibrary {
    sources: RwLock<HashMap<SourceHandle, Arc<dyn MediaSource>>>,
    next_handle: AtomicU64,
}

impl std::fmt::Debug for MediaLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaLibrary")
            .field("sources", &self.len())
            .finish()
    }
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source and return its handle.
    pub fn insert(&self, source: Arc<dyn MediaSource>) -> SourceHandle {
        let handle = SourceHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.sources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, source);
        handle
    }

    pub fn get(&self, handle: SourceHandle) -> Option<Arc<dyn MediaSource>> {
        self.sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&handle)
            .cloned()
    }

    pub fn remove(&self, handle: SourceHandle) -> Option<Arc<dyn MediaSource>> {
        self.sources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a file, classifying it by MIME type, and register it.
    ///
    /// Video frames are decoded no larger than `max_size`.
    pub fn import_path(
        &self,
        path: &Path,
        max_size: (u32, u32),
    ) -> MontageResult<(SourceHandle, Arc<dyn MediaSource>)> {
        let kind = ClipKind::from_mime(mime_from_path(path));
        let source: Arc<dyn MediaSource> = match kind {
            ClipKind::Image => Arc::new(StillImage::open(path)?),
            ClipKind::Video => Arc::new(FfmpegVideo::open(path, max_size)?),
            ClipKind::Audio => {
                let probe = ffmpeg::probe_media(path)?;
                Arc::new(AudioTrack::new(
                    file_name(path),
                    path.to_path_buf(),
                    probe.duration_secs,
                ))
            }
        };
        tracing::info!(
            path = %path.display(),
            kind = kind.as_str(),
            duration_secs = source.duration_secs(),
            "Media imported"
        );
        let handle = self.insert(source.clone());
        Ok((handle, source))
    }
}
