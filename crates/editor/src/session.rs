//! An editing session: controller, media, job queue, preview and export
//! wired together.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use montage_common::config::AppConfig;
use montage_common::error::{MontageError, MontageResult};
use montage_processing_core::{Job, ProcessingQueue};
use montage_project_model::{ClipId, ExportSettings};
use montage_render_engine::{
    ExportArtifact, ExportJob, ExportPipeline, FfmpegEncoder, FrameSink, MediaLibrary,
    MediaSource, PreviewRenderer, ProgressCallback,
};
use tokio::sync::Mutex;

use crate::controller::TimelineController;
use crate::playback::{MediaPlayback, PlaybackDriver, SharedController};

/// Owns everything an editor front end talks to.
pub struct EditorSession {
    config: AppConfig,
    controller: SharedController,
    library: Arc<MediaLibrary>,
    queue: ProcessingQueue,
    renderer: PreviewRenderer,
    exporter: ExportPipeline,
}

impl EditorSession {
    /// Build a session from configuration, discovering the overlay font.
    pub fn new(config: AppConfig) -> Self {
        let renderer = PreviewRenderer::from_config(&config.preview);
        Self::with_renderer(config, renderer)
    }

    /// Build a session around an explicit renderer.
    pub fn with_renderer(config: AppConfig, renderer: PreviewRenderer) -> Self {
        let controller = TimelineController::new(&config.editor, renderer.size().0 as f64);
        Self {
            controller: Arc::new(Mutex::new(controller)),
            library: Arc::new(MediaLibrary::new()),
            queue: ProcessingQueue::with_progress(|progress| {
                tracing::info!(progress, "Import progress");
            }),
            exporter: ExportPipeline::new(renderer.clone()),
            renderer,
            config,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn controller(&self) -> SharedController {
        self.controller.clone()
    }

    pub fn library(&self) -> Arc<MediaLibrary> {
        self.library.clone()
    }

    pub fn queue(&self) -> &ProcessingQueue {
        &self.queue
    }

    pub fn renderer(&self) -> &PreviewRenderer {
        &self.renderer
    }

    /// Queue one import job per file. Files are decoded and appended in the
    /// order given; a file that fails to load is logged and skipped.
    pub async fn import_files(&self, paths: &[PathBuf]) -> MontageResult<()> {
        if paths.is_empty() {
            let err = MontageError::missing_input("Please select a file first");
            self.controller.lock().await.report_error(&err);
            return Err(err);
        }

        let (width, height) = self.renderer.size();
        for path in paths {
            let path = path.clone();
            let library = self.library.clone();
            let controller = self.controller.clone();
            let label = path.display().to_string();
            self.queue.enqueue(
                Job::new(1.0, move || async move {
                    import_one(&path, (width, height), library, controller).await
                })
                .with_label(label),
            );
        }
        Ok(())
    }

    /// Wait until queued imports have finished.
    pub async fn wait_for_imports(&self) {
        self.queue.wait_idle().await;
    }

    /// Register an already decoded source and append it as a clip.
    pub async fn add_source(&self, source: Arc<dyn MediaSource>) -> ClipId {
        let kind = source.kind();
        let name = source.name().to_string();
        let duration = source.duration_secs();
        let handle = self.library.insert(source);
        self.controller
            .lock()
            .await
            .import_clip(kind, handle, name, duration)
    }

    /// Composite the clip under the playhead.
    pub async fn render_preview(&self) -> MontageResult<RgbaImage> {
        let state = self.controller.lock().await.snapshot();
        let mut canvas = self.renderer.new_canvas();
        self.renderer
            .render_state(&mut canvas, &state, &self.library)?;
        Ok(canvas.into_image())
    }

    /// Export settings from configuration.
    pub fn export_settings(&self) -> MontageResult<ExportSettings> {
        let export = &self.config.export;
        Ok(ExportSettings {
            width: export.width,
            height: export.height,
            fps: export.fps,
            video_bitrate_kbps: export.video_bitrate_kbps,
            format: export.format.parse().map_err(MontageError::config)?,
        })
    }

    /// Export the current timeline.
    ///
    /// Without an explicit sink, frames are encoded with ffmpeg. Failures
    /// are also queued as an alert on the controller.
    pub async fn export(
        &self,
        output_path: &Path,
        settings: ExportSettings,
        sink: Option<Box<dyn FrameSink>>,
        progress: Option<ProgressCallback>,
    ) -> MontageResult<ExportArtifact> {
        let clips = self.controller.lock().await.timeline().clips().to_vec();
        let sink = match sink {
            Some(sink) => sink,
            None if FfmpegEncoder::is_available() => {
                Box::new(FfmpegEncoder::new(output_path, settings.clone())) as Box<dyn FrameSink>
            }
            None => {
                return Err(MontageError::unsupported(
                    "No supported encoder found (expected ffmpeg in PATH)",
                ))
            }
        };

        let job = ExportJob {
            clips,
            settings,
            output_path: output_path.to_path_buf(),
        };
        let result = self
            .exporter
            .export(job, self.library.clone(), sink, progress)
            .await;
        if let Err(e) = &result {
            self.controller.lock().await.report_error(e);
        }
        result
    }

    pub fn is_exporting(&self) -> bool {
        self.exporter.is_exporting()
    }

    /// Playback driver bound to this session's controller and media.
    pub fn playback<P: MediaPlayback>(&self, media: P) -> PlaybackDriver<P> {
        PlaybackDriver::new(
            self.controller.clone(),
            self.library.clone(),
            self.renderer.clone(),
            media,
        )
        .with_redraw_rate(self.config.preview.redraw_hz)
        .with_transition_duration(Duration::from_millis(
            self.config.editor.transition_duration_ms,
        ))
    }
}

async fn import_one(
    path: &Path,
    max_size: (u32, u32),
    library: Arc<MediaLibrary>,
    controller: SharedController,
) -> MontageResult<()> {
    let owned = path.to_path_buf();
    let lib = library.clone();
    let (handle, source) =
        tokio::task::spawn_blocking(move || lib.import_path(&owned, max_size))
            .await
            .map_err(|e| MontageError::job(format!("Import task failed: {e}")))??;

    controller.lock().await.import_clip(
        source.kind(),
        handle,
        source.name().to_string(),
        source.duration_secs(),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ControllerEffect;
    use image::Rgba;
    use montage_project_model::ClipKind;
    use montage_render_engine::{FrameSequence, PngSequenceSink, StillImage};

    fn session() -> EditorSession {
        EditorSession::with_renderer(AppConfig::default(), PreviewRenderer::new(32, 18))
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("montage-session-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_import_one_image_and_preview_letterboxed() {
        let dir = temp_dir("import");
        let path = dir.join("tall.png");
        RgbaImage::from_pixel(9, 16, Rgba([0, 255, 0, 255]))
            .save(&path)
            .unwrap();

        let session = session();
        session.import_files(&[path]).await.unwrap();
        session.wait_for_imports().await;

        {
            let controller = session.controller();
            let c = controller.lock().await;
            assert_eq!(c.timeline().len(), 1);
            assert_eq!(c.timeline().get(0).unwrap().kind, ClipKind::Image);
            assert_eq!(c.playback().total_duration_secs, 3.0);
        }

        let frame = session.render_preview().await.unwrap();
        assert_eq!(frame.dimensions(), (32, 18));
        assert_eq!(frame.get_pixel(16, 9).0, [0, 255, 0, 255]);
        assert_eq!(frame.get_pixel(1, 9).0, [0, 0, 0, 255]);
        assert_eq!(frame.get_pixel(30, 9).0, [0, 0, 0, 255]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_failed_import_does_not_block_later_files() {
        let dir = temp_dir("partial");
        let good = dir.join("ok.png");
        RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]))
            .save(&good)
            .unwrap();

        let session = session();
        session
            .import_files(&[dir.join("missing.png"), good])
            .await
            .unwrap();
        session.wait_for_imports().await;

        let stats = session.queue().stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(session.controller().lock().await.timeline().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_import_without_files_alerts() {
        let session = session();
        let err = session.import_files(&[]).await.unwrap_err();
        assert!(matches!(err, MontageError::MissingInput { .. }));
        let effects = session.controller().lock().await.take_effects();
        assert!(matches!(effects.as_slice(), [ControllerEffect::Alert(_)]));
    }

    #[tokio::test]
    async fn test_export_preserves_timeline_order() {
        let session = session();
        let red = Rgba([255, 0, 0, 255]);
        let blue = Rgba([0, 0, 255, 255]);
        session
            .add_source(Arc::new(FrameSequence::new(
                "blue.mp4",
                10,
                vec![RgbaImage::from_pixel(32, 18, blue); 5],
            )))
            .await;
        session
            .add_source(Arc::new(StillImage::from_image(
                "red.png",
                RgbaImage::from_pixel(32, 18, red),
            )))
            .await;

        {
            let controller = session.controller();
            let mut c = controller.lock().await;
            c.begin_drag(1).unwrap();
            c.drag_over(0.0);
            c.end_drag();
        }

        let dir = temp_dir("export");
        let settings = ExportSettings {
            width: 32,
            height: 18,
            fps: 10,
            ..ExportSettings::default()
        };
        let artifact = session
            .export(
                &dir,
                settings,
                Some(Box::new(PngSequenceSink::new(&dir))),
                None,
            )
            .await
            .unwrap();

        // 3 s still then 0.5 s video.
        assert_eq!(artifact.frames, 35);
        let first = image::open(dir.join("frame_00000.png")).unwrap().to_rgba8();
        let last = image::open(dir.join("frame_00034.png")).unwrap().to_rgba8();
        assert_eq!(*first.get_pixel(16, 9), red);
        assert_eq!(*last.get_pixel(16, 9), blue);
        assert!(!session.is_exporting());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_export_empty_timeline_alerts() {
        let session = session();
        let dir = temp_dir("empty");
        let err = session
            .export(
                &dir.join("out.mp4"),
                ExportSettings::default(),
                Some(Box::new(PngSequenceSink::new(&dir))),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MontageError::MissingInput { .. }));
        let effects = session.controller().lock().await.take_effects();
        assert_eq!(
            effects,
            vec![ControllerEffect::Alert("Please add media before exporting".to_string())]
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_export_settings_from_config() {
        let mut config = AppConfig::default();
        config.export.format = "webm".to_string();
        let session = EditorSession::with_renderer(config, PreviewRenderer::new(4, 4));
        let settings = session.export_settings().unwrap();
        assert_eq!(settings.format, montage_project_model::ExportFormat::Webm);
        assert_eq!(settings.fps, 30);
    }
}
