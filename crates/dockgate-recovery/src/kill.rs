//! Two-phase termination of stalled workers.
//!
//! TERM first, then a fixed grace period so the worker can flush its own
//! output buffers, then KILL for survivors, then a short verification
//! window. The sweep always completes; a worker that resists both signals
//! is reported, never retried.

use std::time::Duration;

use dockgate_common::RecoveryConfig;
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, Signal, System};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillResult {
    /// Gone before any signal was sent; treated as success.
    AlreadyGone,
    /// Exited within the grace period after TERM.
    Exited,
    /// Needed KILL after the grace period.
    ForceKilled,
    /// Still resident after both signals; reported as an anomaly.
    Survived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KillOutcome {
    pub pid: u32,
    pub result: KillResult,
}

impl KillOutcome {
    pub fn succeeded(&self) -> bool {
        self.result != KillResult::Survived
    }
}

/// Run the two-phase kill for each pid. Phases within one pid are strictly
/// ordered; pids are independent of each other.
pub async fn recover_pids(pids: &[u32], config: &RecoveryConfig) -> Vec<KillOutcome> {
    let mut system = System::new();
    let mut outcomes = Vec::with_capacity(pids.len());
    for &pid in pids {
        let result = kill_one(&mut system, Pid::from_u32(pid), config).await;
        outcomes.push(KillOutcome { pid, result });
    }
    outcomes
}

/// A zombie is dead for recovery purposes; its parent just has not reaped
/// it yet.
fn resident(system: &System, pid: Pid) -> bool {
    system
        .process(pid)
        .is_some_and(|p| p.status() != ProcessStatus::Zombie)
}

async fn kill_one(system: &mut System, pid: Pid, config: &RecoveryConfig) -> KillResult {
    let targets = [pid];
    system.refresh_processes(ProcessesToUpdate::Some(&targets), true);
    if !resident(system, pid) {
        info!("PID {} already exited before recovery", pid);
        return KillResult::AlreadyGone;
    }

    if let Some(process) = system.process(pid) {
        match process.kill_with(Signal::Term) {
            Some(true) => debug!("Sent TERM to PID {}", pid),
            Some(false) => warn!("Could not signal PID {} (insufficient permissions?)", pid),
            None => warn!("TERM unsupported on this platform, escalating directly"),
        }
    }
    tokio::time::sleep(Duration::from_secs(config.grace_seconds)).await;

    system.refresh_processes(ProcessesToUpdate::Some(&targets), true);
    if !resident(system, pid) {
        info!("PID {} exited after TERM", pid);
        return KillResult::Exited;
    }

    if let Some(process) = system.process(pid) {
        warn!("PID {} survived TERM, sending KILL", pid);
        process.kill();
    }
    tokio::time::sleep(Duration::from_secs(config.verify_seconds)).await;

    system.refresh_processes(ProcessesToUpdate::Some(&targets), true);
    if resident(system, pid) {
        error!("PID {} still resident after KILL", pid);
        KillResult::Survived
    } else {
        info!("PID {} force-killed", pid);
        KillResult::ForceKilled
    }
}
