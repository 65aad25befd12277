//! dockgate-recovery - Detects and terminates stalled docking workers.
//!
//! One recovery pass:
//! 1. Scan the process table for workers matching a name pattern
//! 2. Judge each worker from a single CPU/runtime snapshot
//! 3. Two-phase kill (TERM, grace period, KILL) for the stalled ones
//! 4. Report stale worker logs and per-input root-cause categories
//!
//! The pass is one-shot and best-effort by design: it is driven by an
//! external scheduler, never loops internally, and a worker that resists
//! both signals is reported rather than retried.

pub mod kill;
pub mod logs;
pub mod report;
pub mod scan;
pub mod sweep;

pub use report::{DeadlockCategory, RecoveryReport};
pub use scan::{HealthState, WorkerProcess, WorkerScanner};
