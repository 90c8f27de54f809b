//! Render media files to a single video.

use std::path::PathBuf;

use anyhow::Context;
use montage_common::clock::format_timecode;
use montage_common::config::AppConfig;
use montage_editor::EditorSession;
use montage_render_engine::{ExportProgress, FrameSink, PngSequenceSink, ProgressCallback};

use super::load_session;

/// Per-clip edits given on the command line, applied after import.
#[derive(Debug, Default, PartialEq)]
pub struct ClipEdits {
    /// (clip index, quarter turns clockwise)
    pub rotations: Vec<(usize, u32)>,
    /// (clip index, start, end)
    pub trims: Vec<(usize, f64, f64)>,
    /// (clip index, overlay text)
    pub texts: Vec<(usize, String)>,
}

impl ClipEdits {
    pub fn parse(rotate: &[String], trim: &[String], text: &[String]) -> anyhow::Result<Self> {
        let mut edits = Self::default();

        for arg in rotate {
            let (index, degrees) = split_index(arg)?;
            let degrees: u32 = degrees
                .parse()
                .with_context(|| format!("Invalid rotation in '{arg}'"))?;
            if degrees % 90 != 0 {
                anyhow::bail!("Rotation must be a multiple of 90 degrees: '{arg}'");
            }
            edits.rotations.push((index, (degrees / 90) % 4));
        }

        for arg in trim {
            let (index, range) = split_index(arg)?;
            let (start, end) = range
                .split_once(':')
                .with_context(|| format!("Expected INDEX:START:END, got '{arg}'"))?;
            let start: f64 = start
                .parse()
                .with_context(|| format!("Invalid trim start in '{arg}'"))?;
            let end: f64 = end
                .parse()
                .with_context(|| format!("Invalid trim end in '{arg}'"))?;
            edits.trims.push((index, start, end));
        }

        for arg in text {
            let (index, content) = split_index(arg)?;
            edits.texts.push((index, content.to_string()));
        }

        Ok(edits)
    }

    async fn apply(&self, session: &EditorSession) -> anyhow::Result<()> {
        let controller = session.controller();
        let mut c = controller.lock().await;

        for &(index, turns) in &self.rotations {
            c.select(index)
                .with_context(|| format!("No clip at index {index}"))?;
            for _ in 0..turns {
                c.rotate_selected()?;
            }
        }
        for &(index, start, end) in &self.trims {
            c.select(index)
                .with_context(|| format!("No clip at index {index}"))?;
            let range = c.trim_selected(start, end)?;
            println!(
                "  Clip {index}: trimmed to {:.1}s - {:.1}s",
                range.start, range.end
            );
        }
        for (index, content) in &self.texts {
            c.select(*index)
                .with_context(|| format!("No clip at index {index}"))?;
            c.set_text_selected(content, None, None)?;
        }
        c.clear_selection();
        c.take_effects();
        Ok(())
    }
}

fn split_index(arg: &str) -> anyhow::Result<(usize, &str)> {
    let (index, rest) = arg
        .split_once(':')
        .with_context(|| format!("Expected INDEX:VALUE, got '{arg}'"))?;
    let index = index
        .parse()
        .with_context(|| format!("Invalid clip index in '{arg}'"))?;
    Ok((index, rest))
}

/// Output overrides from the command line.
#[derive(Debug, Default)]
pub struct ExportOptions {
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub image_duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub frames_dir: Option<PathBuf>,
}

pub async fn run(
    mut config: AppConfig,
    files: Vec<PathBuf>,
    edits: ClipEdits,
    options: ExportOptions,
) -> anyhow::Result<()> {
    if let Some(secs) = options.image_duration {
        config.editor.image_duration_secs = secs;
    }
    if let Some(format) = options.format {
        config.export.format = format;
    }
    if let Some(width) = options.width {
        config.export.width = width;
    }
    if let Some(height) = options.height {
        config.export.height = height;
    }
    if let Some(fps) = options.fps {
        config.export.fps = fps;
    }

    println!("Importing {} file(s)", files.len());
    let session = load_session(config, &files).await?;
    edits.apply(&session).await?;

    let settings = session.export_settings()?;
    let output_path = options
        .output
        .unwrap_or_else(|| PathBuf::from(&session.config().export.file_name))
        .with_extension(settings.format.extension());

    {
        let controller = session.controller();
        let c = controller.lock().await;
        println!("  Clips: {}", c.timeline().len());
        println!(
            "  Duration: {}",
            format_timecode(c.playback().total_duration_secs)
        );
    }
    println!("  Output: {}", output_path.display());
    println!("  Format: {:?}", settings.format);
    println!(
        "  Resolution: {}x{} @ {}fps",
        settings.width, settings.height, settings.fps
    );

    let sink: Option<Box<dyn FrameSink>> = options
        .frames_dir
        .map(|dir| Box::new(PngSequenceSink::new(dir)) as Box<dyn FrameSink>);

    let progress_cb: ProgressCallback = Box::new(|p: ExportProgress| {
        print!(
            "\r  Progress: {:.1}% ({}/{} frames, ETA: {:.0}s)  ",
            p.progress * 100.0,
            p.frames_rendered,
            p.total_frames,
            p.eta_secs,
        );
    });

    match session
        .export(&output_path, settings, sink, Some(progress_cb))
        .await
    {
        Ok(artifact) => {
            println!(
                "\nExport complete: {} ({} frames, {:.1}s)",
                artifact.path.display(),
                artifact.frames,
                artifact.duration_secs
            );
        }
        Err(e) => {
            println!("\nExport failed: {e}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_clip_edits() {
        let edits = ClipEdits::parse(
            &strings(&["0:270", "2:360"]),
            &strings(&["1:0.5:2.5"]),
            &strings(&["0:Hello: world"]),
        )
        .unwrap();
        assert_eq!(edits.rotations, vec![(0, 3), (2, 0)]);
        assert_eq!(edits.trims, vec![(1, 0.5, 2.5)]);
        assert_eq!(edits.texts, vec![(0, "Hello: world".to_string())]);
    }

    #[test]
    fn test_parse_rejects_bad_specs() {
        assert!(ClipEdits::parse(&strings(&["0:45"]), &[], &[]).is_err());
        assert!(ClipEdits::parse(&strings(&["x:90"]), &[], &[]).is_err());
        assert!(ClipEdits::parse(&[], &strings(&["1:2"]), &[]).is_err());
        assert!(ClipEdits::parse(&[], &[], &strings(&["no-index"])).is_err());
    }
}
