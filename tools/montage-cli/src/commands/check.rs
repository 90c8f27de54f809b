//! Check external tools and fonts.

use montage_common::config::{config_file_path, AppConfig};
use montage_render_engine::ffmpeg::command_exists;
use montage_render_engine::{FfmpegEncoder, TextRenderer};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Montage System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = FfmpegEncoder::is_available();
    if ffmpeg {
        println!("[OK] ffmpeg: found (video import and export)");
    } else {
        println!("[MISSING] ffmpeg: video import and export are unavailable");
    }

    if command_exists("ffprobe") {
        println!("[OK] ffprobe: found (media durations)");
    } else {
        println!("[MISSING] ffprobe: video and audio files cannot be probed");
    }

    let fonts = TextRenderer::discover(config.preview.font_path.as_deref());
    if fonts.has_font() {
        println!("[OK] Overlay font: available");
    } else {
        println!("[WARN] Overlay font: none found, text overlays will not be drawn");
    }

    println!("[OK] Config: {}", config_file_path().display());
    println!(
        "     Preview {}x{}, export {}x{} @ {}fps ({})",
        config.preview.width,
        config.preview.height,
        config.export.width,
        config.export.height,
        config.export.fps,
        config.export.format
    );

    println!();
    if ffmpeg {
        println!("All required tools are available. Montage is ready.");
    } else {
        println!("Install ffmpeg to import video and export timelines.");
    }

    Ok(())
}
