use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::types::PullRequest;

/// Placeholder kept in otherwise empty dump directories.
const PLACEHOLDER_FILE: &str = ".gitkeep";

/// Reads every PR dump in `dir` and concatenates them.
///
/// Files are visited in name order so that records keep a stable discovery
/// order between runs. Subdirectories and the placeholder file are skipped.
/// Any unreadable file or malformed JSON aborts the load.
pub fn load_pull_requests(dir: &Path) -> Result<Vec<PullRequest>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read input directory '{}'", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("Failed to read input directory '{}'", dir.display()))?;
        let file_type = entry
            .file_type()
            .with_context(|| format!("Failed to stat '{}'", entry.path().display()))?;

        if file_type.is_dir() || entry.file_name() == PLACEHOLDER_FILE {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();

    let mut prs = Vec::new();
    for path in files {
        let contents = std::fs::read(&path)
            .with_context(|| format!("Failed to read '{}'", path.display()))?;
        let batch: Vec<PullRequest> = serde_json::from_slice(&contents)
            .with_context(|| format!("Failed to parse pull requests from '{}'", path.display()))?;

        debug!(file = %path.display(), count = batch.len(), "Loaded pull requests");
        prs.extend(batch);
    }

    Ok(prs)
}
