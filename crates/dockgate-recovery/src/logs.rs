//! Stale-log detection for worker diagnosis.
//!
//! Purely informational: staleness never gates or delays the kill decision.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dockgate_common::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A log file that has not been appended to within the staleness threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaleLog {
    pub path: PathBuf,
    pub age_minutes: u64,
    /// Last non-empty line, for human diagnosis.
    pub last_line: Option<String>,
}

/// Report the given logs whose modification time is older than
/// `stale_after_minutes`. Unreadable paths are skipped with a warning.
pub async fn scan_stale_logs(paths: &[PathBuf], stale_after_minutes: u64) -> Vec<StaleLog> {
    let mut stale = Vec::new();
    for path in paths {
        let meta = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping unreadable log {}: {}", path.display(), e);
                continue;
            }
        };
        let modified = match meta.modified() {
            Ok(m) => m,
            Err(e) => {
                warn!("No modification time for {}: {}", path.display(), e);
                continue;
            }
        };
        let age_minutes = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default()
            .as_secs()
            / 60;
        if age_minutes <= stale_after_minutes {
            continue;
        }
        let last_line = tokio::fs::read_to_string(path).await.ok().and_then(|content| {
            content
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(str::to_string)
        });
        stale.push(StaleLog { path: path.clone(), age_minutes, last_line });
    }
    stale.sort_by(|a, b| a.path.cmp(&b.path));
    stale
}

/// Expand a directory into its *.log files (non-recursive).
pub async fn collect_log_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "log") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
