//! Orchestrator for one recovery pass.

use chrono::Utc;
use dockgate_common::{RecoveryConfig, Result};
use tracing::{info, warn};

use crate::kill;
use crate::logs;
use crate::report::RecoveryReport;
use crate::scan::{self, WorkerScanner};

/// Scan, judge, kill, and report. With `dry_run` the kill phase is skipped
/// and the report shows what would have been terminated.
pub async fn run_sweep(config: &RecoveryConfig, dry_run: bool) -> Result<RecoveryReport> {
    let mut scanner = WorkerScanner::new(&config.process_pattern)?;

    let workers = scanner.scan().await;
    let stalled = scan::stalled(&workers, config);
    info!(
        "{} workers match '{}', {} judged stalled",
        workers.len(),
        config.process_pattern,
        stalled.len()
    );

    let outcomes = if dry_run || stalled.is_empty() {
        Vec::new()
    } else {
        let pids: Vec<u32> = stalled.iter().map(|w| w.pid).collect();
        kill::recover_pids(&pids, config).await
    };

    // Informational only; never gates the kill decision above.
    let stale_logs = match &config.log_dir {
        Some(dir) => match logs::collect_log_paths(dir).await {
            Ok(paths) => logs::scan_stale_logs(&paths, config.log_stale_minutes).await,
            Err(e) => {
                warn!("Cannot read log directory {}: {}", dir.display(), e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let all_clear = scanner.scan().await.is_empty();

    Ok(RecoveryReport {
        generated_at: Utc::now(),
        workers,
        stalled,
        outcomes,
        stale_logs,
        hints: Vec::new(),
        all_clear,
    })
}
