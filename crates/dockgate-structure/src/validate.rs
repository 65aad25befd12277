//! Structure classification: size, chain and column-alignment gates.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use dockgate_common::{Result, ValidationConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::record::{self, AtomRecord, RecordKind};

/// Classification of one structural file. Computed fresh per input, consumed
/// immediately by the calling workflow to gate job submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Verdict {
    Valid,
    TooSmall { atoms: usize },
    TooLarge { atoms: usize },
    MultiChainUnresolved { chains: Vec<char> },
    MalformedColumns { line_number: usize },
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    /// Stable code string printed by the CLI and logged by callers.
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::Valid => "VALID",
            Verdict::TooSmall { .. } => "TOO_SMALL",
            Verdict::TooLarge { .. } => "TOO_LARGE",
            Verdict::MultiChainUnresolved { .. } => "MULTI_CHAIN_UNRESOLVED",
            Verdict::MalformedColumns { .. } => "MALFORMED_COLUMNS",
        }
    }

    /// Operator-facing detail for the verdict line.
    pub fn detail(&self) -> String {
        match self {
            Verdict::Valid => "structure is docking-ready".to_string(),
            Verdict::TooSmall { atoms } => {
                format!("{} atom records, below the minimum viable count", atoms)
            }
            Verdict::TooLarge { atoms } => {
                format!("{} atom records, above the processing ceiling", atoms)
            }
            Verdict::MultiChainUnresolved { chains } => format!(
                "{} chains present ({}); extract one before docking",
                chains.len(),
                chains.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
            ),
            Verdict::MalformedColumns { line_number } => {
                format!("fixed-width columns misaligned, first at line {}", line_number)
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Count ATOM records in a file.
///
/// An empty or header-only file counts zero; that is a result, not an error.
/// Only an unreadable file is an error.
pub async fn count_atoms(path: &Path) -> Result<usize> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(count_atom_lines(&content))
}

fn count_atom_lines(content: &str) -> usize {
    content.lines().filter(|l| l.starts_with("ATOM")).count()
}

/// Classify a structural file against the configured thresholds.
pub async fn classify(path: &Path, config: &ValidationConfig) -> Result<Verdict> {
    let content = tokio::fs::read_to_string(path).await?;
    let verdict = classify_content(&content, config);
    debug!("{}: {}", path.display(), verdict.code());
    Ok(verdict)
}

/// The classification rule chain over in-memory content, applied in order:
/// size floor, size ceiling, chain cardinality, column alignment.
///
/// Chain identifiers come from the strict fixed-width parse when a line is
/// well-formed and from token splitting when it is not, so a single-chain
/// file with drifted columns reads as MALFORMED_COLUMNS rather than
/// MULTI_CHAIN_UNRESOLVED.
pub fn classify_content(content: &str, config: &ValidationConfig) -> Verdict {
    let atoms = count_atom_lines(content);
    if atoms < config.min_atoms {
        return Verdict::TooSmall { atoms };
    }
    if atoms > config.max_atoms {
        return Verdict::TooLarge { atoms };
    }

    let mut chains = BTreeSet::new();
    let mut first_malformed = None;
    for (idx, line) in content.lines().enumerate() {
        if !record::is_atom_line(line) {
            continue;
        }
        match AtomRecord::parse_strict(line) {
            Some(rec) => {
                if rec.kind == RecordKind::Atom {
                    chains.insert(rec.chain_id);
                }
            }
            None => {
                if first_malformed.is_none() {
                    first_malformed = Some(idx + 1);
                }
                if let Some(rec) = AtomRecord::parse_tokens(line) {
                    if rec.kind == RecordKind::Atom {
                        chains.insert(rec.chain_id);
                    }
                }
            }
        }
    }

    if chains.len() > 1 {
        return Verdict::MultiChainUnresolved { chains: chains.into_iter().collect() };
    }
    if let Some(line_number) = first_malformed {
        return Verdict::MalformedColumns { line_number };
    }
    Verdict::Valid
}
