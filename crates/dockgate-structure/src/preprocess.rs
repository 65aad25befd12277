//! Column normalisation, chain extraction and batch classification.
//!
//! Preprocessing never mutates its input file; rewritten structures go to a
//! separate output path. Column reconstruction from whitespace tokens is a
//! heuristic repair with no guarantee for severely corrupted input, so
//! callers re-run classification on the output and fail loudly if it is
//! still not VALID.

use std::path::{Path, PathBuf};

use dockgate_common::{GateError, Result, ValidationConfig};
use tracing::{debug, info, warn};

use crate::record::{self, AtomRecord};
use crate::validate::{self, Verdict};

/// Rewrite every atom record of `input` into the canonical fixed-width
/// layout, writing the result to `output`. Returns the number of records
/// rewritten.
///
/// TER/END and header lines pass through untouched, and lines beyond repair
/// are carried over as-is so re-validation flags them. Normalising an
/// already-canonical file produces byte-identical output.
pub async fn normalize_columns(input: &Path, output: &Path) -> Result<usize> {
    let content = tokio::fs::read_to_string(input).await?;
    let (text, rewritten) = normalize_content(&content);
    tokio::fs::write(output, text).await?;
    info!(
        "Normalised {} atom records from {} into {}",
        rewritten,
        input.display(),
        output.display()
    );
    Ok(rewritten)
}

/// The normalisation pass over in-memory content.
pub fn normalize_content(content: &str) -> (String, usize) {
    let mut out = String::with_capacity(content.len());
    let mut rewritten = 0;
    for line in content.lines() {
        if record::is_atom_line(line) {
            match AtomRecord::parse_strict(line).or_else(|| AtomRecord::parse_tokens(line)) {
                Some(rec) => {
                    out.push_str(&rec.to_pdb_line());
                    rewritten += 1;
                }
                None => {
                    debug!("Line beyond repair, carried through: {}", line);
                    out.push_str(line);
                }
            }
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }
    (out, rewritten)
}

/// Write the subsequence of atom records on chain `chain_id` to `output`,
/// re-serialised canonically and terminated with END.
///
/// Returns the number of records written, or `ChainNotFound` when no atom
/// record carries that chain.
pub async fn extract_chain(input: &Path, output: &Path, chain_id: char) -> Result<usize> {
    let content = tokio::fs::read_to_string(input).await?;

    let mut lines = Vec::new();
    for line in content.lines() {
        if !record::is_atom_line(line) {
            continue;
        }
        let Some(rec) = AtomRecord::parse_strict(line).or_else(|| AtomRecord::parse_tokens(line))
        else {
            continue;
        };
        if rec.chain_id == chain_id {
            lines.push(rec.to_pdb_line());
        }
    }

    if lines.is_empty() {
        return Err(GateError::ChainNotFound(chain_id));
    }

    let mut text = lines.join("\n");
    text.push_str("\nEND\n");
    tokio::fs::write(output, text).await?;
    info!(
        "Extracted {} chain-{} records from {} into {}",
        lines.len(),
        chain_id,
        input.display(),
        output.display()
    );
    Ok(lines.len())
}

/// Outcome of classifying one file of a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub outcome: Result<Verdict>,
}

/// Classify every file independently. One file's failure never blocks the
/// rest; per-file errors are recorded in the entry and logged.
pub async fn batch_preprocess(files: &[PathBuf], config: &ValidationConfig) -> Vec<BatchEntry> {
    let mut entries = Vec::with_capacity(files.len());
    for path in files {
        let outcome = validate::classify(path, config).await;
        if let Err(e) = &outcome {
            warn!("Skipping {}: {}", path.display(), e);
        }
        entries.push(BatchEntry { path: path.clone(), outcome });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    fn atom_line(serial: u32, chain: char, res_seq: i32) -> String {
        AtomRecord {
            kind: RecordKind::Atom,
            serial,
            name: "CA".to_string(),
            alt_loc: None,
            res_name: "GLY".to_string(),
            chain_id: chain,
            res_seq,
            insertion_code: None,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            occupancy: 1.0,
            temp_factor: 0.0,
            element: "C".to_string(),
            charge: String::new(),
        }
        .to_pdb_line()
    }

    fn multi_chain_structure() -> String {
        let mut s = String::new();
        for (offset, chain) in [(0u32, 'A'), (200, 'B'), (400, 'C')] {
            for i in 0..100u32 {
                s.push_str(&atom_line(offset + i + 1, chain, i as i32 + 1));
                s.push('\n');
            }
        }
        s.push_str("END\n");
        s
    }

    #[tokio::test]
    async fn test_normalize_is_idempotent_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.pdb");
        let once = dir.path().join("once.pdb");
        let twice = dir.path().join("twice.pdb");

        let mut drifted = String::from("REMARK  drifted columns\n");
        for i in 0..95 {
            drifted.push_str(&format!(
                "ATOM {} CA GLY A {} {:.3} {:.3} {:.3} 1.00 0.00 C\n",
                i + 1,
                i + 1,
                1.5 * i as f64,
                2.0,
                3.0
            ));
        }
        tokio::fs::write(&raw, &drifted).await.unwrap();

        normalize_columns(&raw, &once).await.unwrap();
        normalize_columns(&once, &twice).await.unwrap();

        let a = tokio::fs::read(&once).await.unwrap();
        let b = tokio::fs::read(&twice).await.unwrap();
        assert_eq!(a, b);

        // The original input is untouched.
        let untouched = tokio::fs::read_to_string(&raw).await.unwrap();
        assert_eq!(untouched, drifted);
    }

    #[tokio::test]
    async fn test_normalized_drifted_file_revalidates() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.pdb");
        let fixed = dir.path().join("fixed.pdb");

        let mut drifted = String::new();
        for i in 0..100 {
            drifted.push_str(&format!(
                "ATOM {} CA GLY A {} 1.000 2.000 3.000 1.00 0.00 C\n",
                i + 1,
                i + 1
            ));
        }
        tokio::fs::write(&raw, &drifted).await.unwrap();

        let config = ValidationConfig::default();
        assert_eq!(
            validate::classify(&raw, &config).await.unwrap().code(),
            "MALFORMED_COLUMNS"
        );

        normalize_columns(&raw, &fixed).await.unwrap();
        assert!(validate::classify(&fixed, &config).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_extract_chain_resolves_multi_chain() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("complex.pdb");
        let output = dir.path().join("chain_a.pdb");
        tokio::fs::write(&input, multi_chain_structure()).await.unwrap();

        let config = ValidationConfig::default();
        assert_eq!(
            validate::classify(&input, &config).await.unwrap().code(),
            "MULTI_CHAIN_UNRESOLVED"
        );

        let n = extract_chain(&input, &output, 'A').await.unwrap();
        assert_eq!(n, 100);
        assert!(validate::classify(&output, &config).await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn test_extract_missing_chain_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("complex.pdb");
        let output = dir.path().join("chain_z.pdb");
        tokio::fs::write(&input, multi_chain_structure()).await.unwrap();

        let err = extract_chain(&input, &output, 'Z').await.unwrap_err();
        assert!(matches!(err, GateError::ChainNotFound('Z')));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_batch_isolates_per_file_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.pdb");
        let missing = dir.path().join("missing.pdb");
        let small = dir.path().join("small.pdb");

        let mut content = String::new();
        for i in 0..150 {
            content.push_str(&atom_line(i + 1, 'A', i as i32 + 1));
            content.push('\n');
        }
        tokio::fs::write(&good, &content).await.unwrap();
        tokio::fs::write(&small, atom_line(1, 'A', 1) + "\n").await.unwrap();

        let config = ValidationConfig::default();
        let entries =
            batch_preprocess(&[good.clone(), missing.clone(), small.clone()], &config).await;

        assert_eq!(entries.len(), 3);
        assert!(entries[0].outcome.as_ref().unwrap().is_valid());
        assert!(entries[1].outcome.is_err());
        assert_eq!(entries[2].outcome.as_ref().unwrap().code(), "TOO_SMALL");
    }
}
