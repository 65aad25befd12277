//! Worker process discovery and stall classification.

use dockgate_common::{GateError, RecoveryConfig, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// Snapshot of one worker process, taken by a single scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerProcess {
    pub pid: u32,
    pub name: String,
    pub cmd: String,
    pub cpu_percent: f32,
    pub run_time_secs: u64,
    /// Unix timestamp of process start.
    pub start_time_secs: u64,
}

/// Health of a worker as judged from one snapshot.
///
/// A single zero-CPU reading makes a worker Suspect, not Stalled: transient
/// idle reads must not trigger termination. Stalled additionally requires
/// the runtime to have passed the stall threshold. This one-shot judgement
/// accepts some false positives on legitimately slow startups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Healthy,
    Suspect,
    Stalled,
}

impl WorkerProcess {
    pub fn health(&self, config: &RecoveryConfig) -> HealthState {
        if self.cpu_percent > config.cpu_idle_percent {
            return HealthState::Healthy;
        }
        if self.run_time_secs > config.stall_minutes * 60 {
            HealthState::Stalled
        } else {
            HealthState::Suspect
        }
    }
}

/// Process-table scanner for workers matching a name pattern.
///
/// Each call to [`WorkerScanner::scan`] re-queries the table; nothing is
/// cached between invocations.
pub struct WorkerScanner {
    pattern: Regex,
    system: System,
}

impl WorkerScanner {
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| GateError::Config(format!("invalid process pattern: {}", e)))?;
        Ok(Self { pattern, system: System::new() })
    }

    /// Query the process table once and return matching workers.
    ///
    /// CPU utilisation needs two samples, so the scan refreshes, waits the
    /// minimum sampling interval, and refreshes again before reading.
    pub async fn scan(&mut self) -> Vec<WorkerProcess> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);
        tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        // Our own command line carries the pattern as an argument, so the
        // scanner must never match itself.
        let own_pid = sysinfo::get_current_pid().ok();

        let mut workers = Vec::new();
        for (pid, process) in self.system.processes() {
            if own_pid == Some(*pid) {
                continue;
            }
            let name = process.name().to_string_lossy().to_string();
            let cmd = process
                .cmd()
                .iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ");
            if !self.pattern.is_match(&name) && !self.pattern.is_match(&cmd) {
                continue;
            }
            workers.push(WorkerProcess {
                pid: pid.as_u32(),
                name,
                cmd,
                cpu_percent: process.cpu_usage(),
                run_time_secs: process.run_time(),
                start_time_secs: process.start_time(),
            });
        }
        workers.sort_by_key(|w| w.pid);
        debug!("{} processes match worker pattern", workers.len());
        workers
    }
}

/// Workers whose snapshot says they have ceased useful progress.
pub fn stalled(workers: &[WorkerProcess], config: &RecoveryConfig) -> Vec<WorkerProcess> {
    workers
        .iter()
        .filter(|w| w.health(config) == HealthState::Stalled)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker(cpu_percent: f32, run_time_secs: u64) -> WorkerProcess {
        WorkerProcess {
            pid: 4242,
            name: "haddock3".to_string(),
            cmd: "haddock3 run.toml".to_string(),
            cpu_percent,
            run_time_secs,
            start_time_secs: 0,
        }
    }

    #[test]
    fn test_long_idle_worker_is_stalled() {
        let config = RecoveryConfig::default();
        assert_eq!(worker(0.0, 45 * 60).health(&config), HealthState::Stalled);
    }

    #[test]
    fn test_young_idle_worker_is_only_suspect() {
        let config = RecoveryConfig::default();
        assert_eq!(worker(0.0, 10 * 60).health(&config), HealthState::Suspect);
    }

    #[test]
    fn test_busy_worker_is_healthy_regardless_of_age() {
        let config = RecoveryConfig::default();
        assert_eq!(worker(87.5, 300 * 60).health(&config), HealthState::Healthy);
    }

    #[test]
    fn test_idle_tolerance_band_edge() {
        let config = RecoveryConfig::default();
        // 0.1% is inside the idle band; just above it is healthy.
        assert_eq!(worker(0.1, 45 * 60).health(&config), HealthState::Stalled);
        assert_eq!(worker(0.11, 45 * 60).health(&config), HealthState::Healthy);
    }

    #[test]
    fn test_stalled_filter_keeps_only_stalled() {
        let config = RecoveryConfig::default();
        let workers = vec![worker(0.0, 45 * 60), worker(0.0, 10 * 60), worker(55.0, 90 * 60)];
        let stalled = stalled(&workers, &config);
        assert_eq!(stalled.len(), 1);
        assert_eq!(stalled[0].run_time_secs, 45 * 60);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        assert!(WorkerScanner::new("haddock3(").is_err());
    }

    #[tokio::test]
    async fn test_scan_does_not_match_itself() {
        // The test binary's own cmdline does not contain this marker, but a
        // scanner for it must at minimum come back without errors and
        // without our own pid.
        let own_pid = sysinfo::get_current_pid().unwrap().as_u32();
        let mut scanner = WorkerScanner::new("definitely-no-such-worker-name").unwrap();
        let workers = scanner.scan().await;
        assert!(workers.iter().all(|w| w.pid != own_pid));
    }
}
