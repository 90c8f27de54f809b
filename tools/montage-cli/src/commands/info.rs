//! Show how media files would be imported.

use std::path::PathBuf;

use montage_common::clock::format_timecode;
use montage_project_model::ClipKind;
use montage_render_engine::ffmpeg::{command_exists, probe_media};
use montage_render_engine::{mime_from_path, MediaSource, StillImage};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct FileInfo {
    path: PathBuf,
    mime: &'static str,
    kind: &'static str,
    width: Option<u32>,
    height: Option<u32>,
    duration_secs: Option<f64>,
    error: Option<String>,
}

pub fn run(files: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let can_probe = command_exists("ffprobe");
    let infos: Vec<FileInfo> = files
        .into_iter()
        .map(|path| describe(path, can_probe))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    for (index, info) in infos.iter().enumerate() {
        println!("[{index}] {}", info.path.display());
        println!("  Type: {} ({})", info.kind, info.mime);
        if let (Some(w), Some(h)) = (info.width, info.height) {
            println!("  Size: {w}x{h}");
        }
        if let Some(secs) = info.duration_secs {
            println!("  Duration: {}", format_timecode(secs));
        }
        if let Some(error) = &info.error {
            println!("  [WARN] {error}");
        }
    }
    if !can_probe {
        println!();
        println!("ffprobe not found; video and audio details are unavailable.");
    }
    Ok(())
}

fn describe(path: PathBuf, can_probe: bool) -> FileInfo {
    let mime = mime_from_path(&path);
    let kind = ClipKind::from_mime(mime);
    let mut info = FileInfo {
        path,
        mime,
        kind: kind.as_str(),
        width: None,
        height: None,
        duration_secs: None,
        error: None,
    };

    match kind {
        ClipKind::Image => match StillImage::open(&info.path) {
            Ok(image) => {
                if let Some((w, h)) = image.dimensions() {
                    info.width = Some(w);
                    info.height = Some(h);
                }
            }
            Err(e) => info.error = Some(e.to_string()),
        },
        ClipKind::Video | ClipKind::Audio if can_probe => match probe_media(&info.path) {
            Ok(probe) => {
                if let Some((w, h)) = probe.dimensions() {
                    info.width = Some(w);
                    info.height = Some(h);
                }
                info.duration_secs = Some(probe.duration_secs);
            }
            Err(e) => info.error = Some(e.to_string()),
        },
        ClipKind::Video | ClipKind::Audio => {}
    }
    info
}
