//! CLI subcommand implementations.

pub mod check;
pub mod export;
pub mod info;
pub mod preview;
pub mod transition;

use std::path::PathBuf;

use montage_common::config::AppConfig;
use montage_editor::EditorSession;

/// Build a session and import `files` in order, failing if nothing loads.
pub async fn load_session(config: AppConfig, files: &[PathBuf]) -> anyhow::Result<EditorSession> {
    let session = EditorSession::new(config);
    session.import_files(files).await?;
    session.wait_for_imports().await;

    let stats = session.queue().stats();
    if stats.failed > 0 {
        println!("  Skipped {} file(s) that could not be loaded", stats.failed);
    }

    let clips = session.controller().lock().await.timeline().len();
    if clips == 0 {
        anyhow::bail!("None of the input files could be loaded");
    }
    Ok(session)
}
