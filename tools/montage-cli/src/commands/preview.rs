//! Save the preview frame at a timeline position.

use std::path::PathBuf;

use anyhow::Context;
use montage_common::clock::format_timecode;
use montage_common::config::AppConfig;

use super::load_session;

pub async fn run(
    config: AppConfig,
    files: Vec<PathBuf>,
    at: f64,
    output: PathBuf,
) -> anyhow::Result<()> {
    let session = load_session(config, &files).await?;

    {
        let controller = session.controller();
        let mut c = controller.lock().await;
        let total = c.playback().total_duration_secs;
        let fraction = if total > 0.0 { at / total } else { 0.0 };
        match c.seek(fraction) {
            Some(index) => println!(
                "Clip {index} ({}) at {}",
                c.timeline().get(index).map(|clip| clip.name.as_str()).unwrap_or("?"),
                c.time_display()
            ),
            None => println!("No visual clip at {}", format_timecode(at)),
        }
    }

    let frame = session.render_preview().await?;
    frame
        .save(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Preview written: {}", output.display());
    Ok(())
}
