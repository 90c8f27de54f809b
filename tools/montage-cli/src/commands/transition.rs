//! Render a transition between two images.

use std::path::PathBuf;
use std::time::Duration;

use montage_common::clock::FrameClock;
use montage_common::config::AppConfig;
use image::RgbaImage;
use montage_project_model::{Clip, ClipId, ClipKind, SourceHandle, TransitionKind};
use montage_render_engine::{
    compose_transition, FrameSink, MediaSource, PngSequenceSink, PreviewRenderer, StillImage,
};

pub fn run(
    config: AppConfig,
    from: PathBuf,
    to: PathBuf,
    kind: String,
    duration_ms: Option<u64>,
    output: PathBuf,
) -> anyhow::Result<()> {
    let kind: TransitionKind = kind.parse().map_err(anyhow::Error::msg)?;
    let duration = Duration::from_millis(
        duration_ms.unwrap_or(config.editor.transition_duration_ms),
    );
    let clock = FrameClock::new(config.export.fps);

    let renderer = PreviewRenderer::from_config(&config.preview);
    let outgoing = still_frame(&renderer, &from)?;
    let incoming = still_frame(&renderer, &to)?;

    // Inclusive of both ends: the first frame is all outgoing, the last all
    // incoming.
    let frames = clock.frame_count(duration.as_secs_f64()).max(1) + 1;
    println!(
        "Rendering {kind} transition: {frames} frames @ {}fps",
        clock.fps()
    );

    let (width, height) = renderer.size();
    let mut sink = PngSequenceSink::new(&output);
    sink.begin(width, height, clock.fps())?;
    let mut canvas = renderer.new_canvas();
    for frame in 0..frames {
        let progress = frame as f64 / (frames - 1) as f64;
        compose_transition(&mut canvas, kind, &outgoing, &incoming, progress);
        sink.push_frame(canvas.pixels())?;
    }
    sink.finish()?;

    println!("Frames written to {}", output.display());
    Ok(())
}

/// Letterboxed canvas-sized frame of an image file.
fn still_frame(renderer: &PreviewRenderer, path: &std::path::Path) -> anyhow::Result<RgbaImage> {
    let source = StillImage::open(path)?;
    let clip = Clip::new(ClipId(0), ClipKind::Image, SourceHandle(0), source.name(), 0.0);
    let frame = renderer.snapshot(&clip, Some(&source as &dyn MediaSource), 0.0)?;
    Ok(frame.as_ref().clone())
}
