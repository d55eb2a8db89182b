//! Raw configuration editing in the user's `$EDITOR`.
//!
//! The draft is written as YAML to a private temp file, the terminal is
//! handed to the editor, and the result is parsed back. A parse error keeps
//! the previous draft; nothing reaches the backend until the user applies.

use crate::app::App;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Editor used when neither `$VISUAL` nor `$EDITOR` is set.
const FALLBACK_EDITOR: &str = "vi";

fn editor_command() -> String {
    std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_EDITOR.to_string())
}

fn draft_path() -> PathBuf {
    std::env::temp_dir().join(format!("feedboard-config-{}.yaml", std::process::id()))
}

fn write_private(path: &Path, contents: &str) -> Result<()> {
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)?;
        file.write_all(contents.as_bytes())?;
    }
    #[cfg(not(unix))]
    std::fs::write(path, contents)?;
    Ok(())
}

/// Run the editor on the current draft. The terminal must already be
/// restored to cooked mode by the caller.
///
/// Returns the status message to show.
pub(super) async fn edit_draft(app: &mut App) -> Result<String> {
    let yaml = app.draft_yaml().context("Failed to render configuration")?;
    let path = draft_path();
    write_private(&path, &yaml).context("Failed to write temp file")?;

    let editor = editor_command();
    // Allow "code --wait" style values.
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(FALLBACK_EDITOR);
    tracing::debug!(editor = %editor, path = %path.display(), "Launching editor");

    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(&path)
        .status()
        .await
        .with_context(|| format!("Failed to launch editor '{}'", editor));

    let edited = tokio::fs::read_to_string(&path).await;
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::debug!(error = %e, "Failed to remove temp file");
    }

    let status = status?;
    if !status.success() {
        return Ok(format!("Editor exited with {}, changes discarded", status));
    }
    let edited = edited.context("Failed to read edited file")?;
    if edited == yaml {
        return Ok("No changes".to_string());
    }

    match app.replace_draft_from_yaml(&edited) {
        Ok(()) => Ok("Draft updated, press w to apply".to_string()),
        Err(e) => {
            tracing::info!(error = %e, "Edited configuration rejected");
            Ok(format!("{} (not saved)", e))
        }
    }
}
