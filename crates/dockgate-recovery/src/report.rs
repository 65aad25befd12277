//! Post-mortem categorisation and the aggregate recovery report.

use chrono::{DateTime, Utc};
use dockgate_common::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::kill::KillOutcome;
use crate::logs::StaleLog;
use crate::scan::WorkerProcess;

/// Best-effort root cause for a stalled run, derived from the atom count of
/// the run's input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlockCategory {
    BrokenPreprocessing,
    TruncatedInput,
    OversizedInput,
    ColumnMisalignment,
}

impl DeadlockCategory {
    pub fn code(&self) -> &'static str {
        match self {
            DeadlockCategory::BrokenPreprocessing => "BROKEN_PREPROCESSING",
            DeadlockCategory::TruncatedInput => "TRUNCATED_INPUT",
            DeadlockCategory::OversizedInput => "OVERSIZED_INPUT",
            DeadlockCategory::ColumnMisalignment => "COLUMN_MISALIGNMENT",
        }
    }

    /// Operator-facing remediation hint.
    pub fn recommendation(&self) -> &'static str {
        match self {
            DeadlockCategory::BrokenPreprocessing => {
                "input is a near-empty placeholder; re-run structure preprocessing"
            }
            DeadlockCategory::TruncatedInput => {
                "input is incomplete; re-acquire the full structure before docking"
            }
            DeadlockCategory::OversizedInput => {
                "input exceeds the processing ceiling; extract a domain of interest"
            }
            DeadlockCategory::ColumnMisalignment => {
                "input columns are likely misaligned; normalise the file and re-validate"
            }
        }
    }
}

/// Deterministic mapping from an input file's atom count to the most likely
/// stall cause. A count in the viable range means the engine's parser never
/// started properly, which points at column misalignment.
pub fn categorize(atom_count: usize, config: &ValidationConfig) -> DeadlockCategory {
    if atom_count <= config.placeholder_max_atoms {
        DeadlockCategory::BrokenPreprocessing
    } else if atom_count < config.min_atoms {
        DeadlockCategory::TruncatedInput
    } else if atom_count > config.max_atoms {
        DeadlockCategory::OversizedInput
    } else {
        DeadlockCategory::ColumnMisalignment
    }
}

/// Category hint for one input file, attached to the report when the
/// operator names the inputs of the stalled runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryHint {
    pub input: std::path::PathBuf,
    pub atom_count: usize,
    pub category: DeadlockCategory,
}

/// Aggregate result of one recovery sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub generated_at: DateTime<Utc>,
    /// Every worker matching the pattern at scan time.
    pub workers: Vec<WorkerProcess>,
    /// The subset judged stalled by the one-shot heuristic.
    pub stalled: Vec<WorkerProcess>,
    /// Kill outcome per targeted pid (empty on a dry run).
    pub outcomes: Vec<KillOutcome>,
    pub stale_logs: Vec<StaleLog>,
    /// Root-cause hints; empty when no input files were associated.
    pub hints: Vec<CategoryHint>,
    /// True when no process matched the pattern after the kill phase.
    pub all_clear: bool,
}

impl RecoveryReport {
    /// Pids that resisted both signals.
    pub fn survivors(&self) -> Vec<u32> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.pid)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ValidationConfig {
        ValidationConfig::default()
    }

    #[test]
    fn test_placeholder_count_is_broken_preprocessing() {
        assert_eq!(categorize(5, &cfg()), DeadlockCategory::BrokenPreprocessing);
        assert_eq!(categorize(0, &cfg()), DeadlockCategory::BrokenPreprocessing);
    }

    #[test]
    fn test_undersized_count_is_truncated() {
        assert_eq!(categorize(6, &cfg()), DeadlockCategory::TruncatedInput);
        assert_eq!(categorize(89, &cfg()), DeadlockCategory::TruncatedInput);
    }

    #[test]
    fn test_oversized_count_is_oversized() {
        assert_eq!(categorize(59_094, &cfg()), DeadlockCategory::OversizedInput);
    }

    #[test]
    fn test_viable_count_points_at_columns() {
        assert_eq!(categorize(90, &cfg()), DeadlockCategory::ColumnMisalignment);
        assert_eq!(categorize(2500, &cfg()), DeadlockCategory::ColumnMisalignment);
    }

    #[test]
    fn test_survivors_lists_resistant_pids() {
        use crate::kill::{KillOutcome, KillResult};
        let report = RecoveryReport {
            generated_at: Utc::now(),
            workers: vec![],
            stalled: vec![],
            outcomes: vec![
                KillOutcome { pid: 100, result: KillResult::Exited },
                KillOutcome { pid: 200, result: KillResult::Survived },
            ],
            stale_logs: vec![],
            hints: vec![],
            all_clear: false,
        };
        assert_eq!(report.survivors(), vec![200]);
    }
}
