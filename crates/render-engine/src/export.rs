//! Export pipeline.
//!
//! Walks a snapshot of the timeline in order, renders every frame of every
//! visual clip through the preview compositor at the output frame rate,
//! and streams the frames into a [`FrameSink`]. The default sink pipes raw
//! RGBA into an `ffmpeg` process that writes the final file.

use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use montage_common::clock::FrameClock;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{Clip, ClipKind, ExportFormat, ExportSettings};
use serde::Serialize;

use crate::compositor::{source_time, PreviewRenderer};
use crate::ffmpeg::command_exists;
use crate::media::MediaLibrary;

/// A snapshot of the timeline to export.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Clips in timeline order.
    pub clips: Vec<Clip>,

    /// Output parameters.
    pub settings: ExportSettings,

    /// Output file path.
    pub output_path: PathBuf,
}

/// Progress callback for export rendering.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Export progress report.
#[derive(Debug, Clone)]
pub struct ExportProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Frames rendered so far.
    pub frames_rendered: u64,

    /// Total frames to render.
    pub total_frames: u64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// Current stage.
    pub stage: ExportStage,
}

/// Stages of the export process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Preparing,
    Rendering,
    Encoding,
    Complete,
    Failed,
}

/// The finished output.
#[derive(Debug, Clone, Serialize)]
pub struct ExportArtifact {
    pub path: PathBuf,
    pub frames: u64,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

/// Receives rendered frames in presentation order.
pub trait FrameSink: Send {
    /// Prepare for frames of the given size and rate.
    fn begin(&mut self, width: u32, height: u32, fps: u32) -> MontageResult<()>;

    fn push_frame(&mut self, frame: &RgbaImage) -> MontageResult<()>;

    /// Flush everything and produce the output.
    fn finish(&mut self) -> MontageResult<()>;

    /// Sink name for logs.
    fn name(&self) -> &str;
}

/// Encodes frames with an `ffmpeg` child process.
///
/// Output goes to a temporary file next to the destination that is moved
/// into place only after ffmpeg exits successfully.
pub struct FfmpegEncoder {
    output_path: PathBuf,
    temp_path: PathBuf,
    settings: ExportSettings,
    process: Option<EncoderProcess>,
}

struct EncoderProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_task: Option<std::thread::JoinHandle<String>>,
}

impl FfmpegEncoder {
    pub fn new(output_path: impl Into<PathBuf>, settings: ExportSettings) -> Self {
        let output_path = output_path.into();
        let temp_path = temp_path_for(&output_path, settings.format);
        Self {
            output_path,
            temp_path,
            settings,
            process: None,
        }
    }

    /// Whether `ffmpeg` is installed.
    pub fn is_available() -> bool {
        command_exists("ffmpeg")
    }

    fn args(&self, width: u32, height: u32, fps: u32) -> Vec<String> {
        let mut args: Vec<String> = [
            "-y",
            "-hide_banner",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.extend([
            "-s".to_string(),
            format!("{width}x{height}"),
            "-r".to_string(),
            fps.to_string(),
            "-i".to_string(),
            "-".to_string(),
        ]);
        args.extend(codec_args(&self.settings));
        args.push(self.temp_path.to_string_lossy().into_owned());
        args
    }
}

impl FrameSink for FfmpegEncoder {
    fn begin(&mut self, width: u32, height: u32, fps: u32) -> MontageResult<()> {
        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let args = self.args(width, height, fps);
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MontageError::export(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MontageError::export("Failed to capture ffmpeg stdin"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MontageError::export("Failed to capture ffmpeg stderr"))?;

        // Drain stderr concurrently to avoid ffmpeg blocking on a full stderr pipe.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        tracing::info!(
            pid = child.id(),
            width,
            height,
            fps,
            output = %self.output_path.display(),
            "ffmpeg encoder started"
        );
        self.process = Some(EncoderProcess {
            child,
            stdin: Some(stdin),
            stderr_task: Some(stderr_task),
        });
        Ok(())
    }

    fn push_frame(&mut self, frame: &RgbaImage) -> MontageResult<()> {
        let stdin = self
            .process
            .as_mut()
            .and_then(|p| p.stdin.as_mut())
            .ok_or_else(|| MontageError::export("Encoder not started"))?;
        stdin
            .write_all(frame.as_raw())
            .map_err(|e| MontageError::export(format!("ffmpeg rejected frame data: {e}")))
    }

    fn finish(&mut self) -> MontageResult<()> {
        let mut process = self
            .process
            .take()
            .ok_or_else(|| MontageError::export("Encoder not started"))?;

        // Closing stdin signals end of stream.
        drop(process.stdin.take());
        let status = process
            .child
            .wait()
            .map_err(|e| MontageError::export(format!("Failed to wait on ffmpeg: {e}")))?;
        let stderr_output = process
            .stderr_task
            .take()
            .map(|task| {
                task.join()
                    .unwrap_or_else(|_| "<failed to join stderr reader>".to_string())
            })
            .unwrap_or_default();

        if !status.success() {
            let _ = std::fs::remove_file(&self.temp_path);
            return Err(MontageError::export(format!(
                "ffmpeg export failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        std::fs::rename(&self.temp_path, &self.output_path)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if let Some(mut process) = self.process.take() {
            drop(process.stdin.take());
            let _ = process.child.kill();
            let _ = process.child.wait();
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

fn temp_path_for(output: &Path, format: ExportFormat) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    output.with_file_name(format!(".{stem}.partial.{}", format.extension()))
}

fn codec_args(settings: &ExportSettings) -> Vec<String> {
    let bitrate = format!("{}k", settings.video_bitrate_kbps.max(1));
    let mut args: Vec<String> = match settings.format {
        ExportFormat::Mp4 => vec![
            "-c:v", "libx264", "-preset", "medium", "-pix_fmt", "yuv420p", "-movflags",
            "+faststart",
        ],
        ExportFormat::Webm => vec!["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-deadline", "good"],
    }
    .into_iter()
    .map(String::from)
    .collect();
    args.extend(["-b:v".to_string(), bitrate]);
    args.extend(["-f".to_string(), settings.format.extension().to_string()]);
    args
}

/// Writes every frame as a numbered PNG into a directory.
#[derive(Debug)]
pub struct PngSequenceSink {
    dir: PathBuf,
    written: u64,
}

impl PngSequenceSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: 0,
        }
    }

    pub fn frames_written(&self) -> u64 {
        self.written
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:05}.png"))
    }
}

impl FrameSink for PngSequenceSink {
    fn begin(&mut self, _width: u32, _height: u32, _fps: u32) -> MontageResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        self.written = 0;
        Ok(())
    }

    fn push_frame(&mut self, frame: &RgbaImage) -> MontageResult<()> {
        frame.save(self.frame_path(self.written))?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> MontageResult<()> {
        tracing::info!(dir = %self.dir.display(), frames = self.written, "PNG sequence written");
        Ok(())
    }

    fn name(&self) -> &str {
        "png-sequence"
    }
}

/// Frames a clip contributes to the export: the trim window for trimmed
/// video, otherwise the clip's timeline span.
pub fn export_span_secs(clip: &Clip) -> f64 {
    match (clip.kind, clip.trim) {
        (ClipKind::Video, Some(trim)) => trim.len_secs(),
        _ => clip.timeline_span_secs(),
    }
}

/// Renders jobs one at a time.
#[derive(Debug, Clone)]
pub struct ExportPipeline {
    renderer: PreviewRenderer,
    in_flight: Arc<AtomicBool>,
}

/// Releases the in-flight flag when dropped.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> MontageResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MontageError::ExportInProgress)?;
        Ok(Self(flag.clone()))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ExportPipeline {
    pub fn new(renderer: PreviewRenderer) -> Self {
        Self {
            renderer,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Render `job` into `sink`.
    ///
    /// Fails with [`MontageError::ExportInProgress`] while another export
    /// from this pipeline is running. The in-flight flag is cleared however
    /// the export ends.
    pub async fn export(
        &self,
        job: ExportJob,
        library: Arc<MediaLibrary>,
        sink: Box<dyn FrameSink>,
        progress: Option<ProgressCallback>,
    ) -> MontageResult<ExportArtifact> {
        let guard = InFlightGuard::acquire(&self.in_flight)?;
        tracing::info!(
            output = %job.output_path.display(),
            format = ?job.settings.format,
            clips = job.clips.len(),
            sink = sink.name(),
            "Starting export"
        );

        let renderer = self
            .renderer
            .resized(job.settings.width, job.settings.height);
        let result = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            render_job(&renderer, &job, &library, sink, progress.as_ref())
        })
        .await
        .map_err(|e| MontageError::export(format!("Export task failed: {e}")))?;

        match &result {
            Ok(artifact) => tracing::info!(
                path = %artifact.path.display(),
                frames = artifact.frames,
                duration_secs = artifact.duration_secs,
                "Export finished"
            ),
            Err(e) => tracing::error!(error = %e, "Export failed"),
        }
        result
    }
}

fn render_job(
    renderer: &PreviewRenderer,
    job: &ExportJob,
    library: &MediaLibrary,
    mut sink: Box<dyn FrameSink>,
    progress: Option<&ProgressCallback>,
) -> MontageResult<ExportArtifact> {
    let started = std::time::Instant::now();
    let clock = FrameClock::new(job.settings.fps);
    let plan: Vec<(&Clip, u64)> = job
        .clips
        .iter()
        .filter(|c| c.kind.is_visual())
        .map(|c| (c, clock.frame_count(export_span_secs(c))))
        .filter(|(_, frames)| *frames > 0)
        .collect();
    let total_frames: u64 = plan.iter().map(|(_, f)| f).sum();

    if plan.is_empty() {
        return Err(MontageError::missing_input("Please add media before exporting"));
    }

    let report = |stage: ExportStage, frames_rendered: u64| {
        if let Some(cb) = progress {
            cb(progress_report(
                stage,
                frames_rendered,
                total_frames,
                started.elapsed().as_secs_f64(),
            ));
        }
    };
    report(ExportStage::Preparing, 0);

    let outcome = (|| -> MontageResult<u64> {
        let (width, height) = renderer.size();
        sink.begin(width, height, clock.fps())?;

        let mut canvas = renderer.new_canvas();
        let mut rendered = 0u64;
        for (clip, frames) in &plan {
            let source = library
                .get(clip.source)
                .ok_or_else(|| MontageError::media(format!("No media loaded for {}", clip.id)))?;
            tracing::debug!(clip = %clip.id, name = %clip.name, frames, "Rendering clip");

            for frame in 0..*frames {
                let clip_time = clock.frame_to_secs(frame);
                renderer.render_clip(&mut canvas, Some(clip), Some(source.as_ref()), clip_time)?;
                sink.push_frame(canvas.pixels())?;
                rendered += 1;
                if rendered % clock.fps() as u64 == 0 {
                    report(ExportStage::Rendering, rendered);
                }
            }
        }

        report(ExportStage::Encoding, rendered);
        sink.finish()?;
        Ok(rendered)
    })();

    match outcome {
        Ok(frames) => {
            report(ExportStage::Complete, frames);
            Ok(ExportArtifact {
                path: job.output_path.clone(),
                frames,
                duration_secs: clock.frame_to_secs(frames),
                created_at: Utc::now(),
            })
        }
        Err(e) => {
            report(ExportStage::Failed, 0);
            Err(e)
        }
    }
}

fn progress_report(
    stage: ExportStage,
    frames_rendered: u64,
    total_frames: u64,
    elapsed_secs: f64,
) -> ExportProgress {
    let progress = match stage {
        ExportStage::Complete => 1.0,
        _ if total_frames == 0 => 0.0,
        _ => (frames_rendered as f64 / total_frames as f64).clamp(0.0, 1.0),
    };
    let eta_secs = if progress > 0.0 && stage != ExportStage::Complete {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    ExportProgress {
        progress,
        frames_rendered,
        total_frames,
        eta_secs,
        stage,
    }
}
