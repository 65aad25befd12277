//! Configuration loading for dockgate.
//! Reads dockgate.toml from the current directory or path in DOCKGATE_CONFIG env var.
//!
//! Every threshold here is an operational knob derived from observed failure
//! cases, not a structural constant; keep them in config, never inline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// Thresholds for the structure validation gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Minimum viable atom count (inclusive). Below this a structure is
    /// either a broken-preprocessing placeholder or a truncated download.
    #[serde(default = "default_min_atoms")]
    pub min_atoms: usize,

    /// Processing ceiling (inclusive). Above this the docking engine needs a
    /// manually extracted domain instead of the full complex.
    #[serde(default = "default_max_atoms")]
    pub max_atoms: usize,

    /// At or below this count a file counts as a near-empty placeholder
    /// rather than a truncation.
    #[serde(default = "default_placeholder_max")]
    pub placeholder_max_atoms: usize,
}

fn default_min_atoms()       -> usize { 90 }
fn default_max_atoms()       -> usize { 2500 }
fn default_placeholder_max() -> usize { 5 }

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_atoms: default_min_atoms(),
            max_atoms: default_max_atoms(),
            placeholder_max_atoms: default_placeholder_max(),
        }
    }
}

/// Thresholds and knobs for the worker recovery agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Regex matched against process name and command line.
    #[serde(default = "default_pattern")]
    pub process_pattern: String,

    /// A worker running longer than this at ~0% CPU is considered stalled.
    #[serde(default = "default_stall_minutes")]
    pub stall_minutes: u64,

    /// A log file untouched for longer than this is reported stale.
    #[serde(default = "default_log_stale_minutes")]
    pub log_stale_minutes: u64,

    /// CPU utilisation at or below this reads as idle (tolerance band).
    #[serde(default = "default_cpu_idle")]
    pub cpu_idle_percent: f32,

    /// Gap between the graceful TERM and the forceful KILL.
    #[serde(default = "default_grace_seconds")]
    pub grace_seconds: u64,

    /// Window after the kill in which the process must be gone.
    #[serde(default = "default_verify_seconds")]
    pub verify_seconds: u64,

    /// Directory whose *.log files the staleness scan covers by default.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_pattern()           -> String { "haddock3".to_string() }
fn default_stall_minutes()     -> u64 { 30 }
fn default_log_stale_minutes() -> u64 { 60 }
fn default_cpu_idle()          -> f32 { 0.1 }
fn default_grace_seconds()     -> u64 { 5 }
fn default_verify_seconds()    -> u64 { 2 }

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            process_pattern: default_pattern(),
            stall_minutes: default_stall_minutes(),
            log_stale_minutes: default_log_stale_minutes(),
            cpu_idle_percent: default_cpu_idle(),
            grace_seconds: default_grace_seconds(),
            verify_seconds: default_verify_seconds(),
            log_dir: None,
        }
    }
}

impl GateConfig {
    /// Load configuration from dockgate.toml.
    /// Checks DOCKGATE_CONFIG env var first, then the current directory.
    /// A missing file is not an error: the built-in defaults apply.
    pub fn load() -> crate::error::Result<Self> {
        let path = std::env::var("DOCKGATE_CONFIG")
            .unwrap_or_else(|_| "dockgate.toml".to_string());

        if !Path::new(&path).exists() {
            tracing::debug!("No config file at {}, using defaults", path);
            return Ok(Self::default());
        }

        Self::load_from(Path::new(&path))
    }

    /// Load configuration from an explicit path. A missing or malformed file
    /// is an error here: the operator asked for this file specifically.
    pub fn load_from(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GateConfig = toml::from_str(&content)
            .map_err(|e| crate::error::GateError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = GateConfig::default();
        assert_eq!(config.validation.min_atoms, 90);
        assert_eq!(config.validation.max_atoms, 2500);
        assert!(config.validation.placeholder_max_atoms < config.validation.min_atoms);
        assert_eq!(config.recovery.stall_minutes, 30);
        assert_eq!(config.recovery.log_stale_minutes, 60);
        assert!(config.recovery.cpu_idle_percent <= 0.1);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            [validation]
            max_atoms = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.validation.max_atoms, 5000);
        assert_eq!(config.validation.min_atoms, 90);
        assert_eq!(config.recovery.process_pattern, "haddock3");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = GateConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: GateConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.validation.min_atoms, parsed.validation.min_atoms);
        assert_eq!(config.recovery.grace_seconds, parsed.recovery.grace_seconds);
    }

    #[test]
    fn test_load_from_missing_path_is_error() {
        let result = GateConfig::load_from(Path::new("/nonexistent/dockgate.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockgate.toml");
        std::fs::write(&path, "[recovery]\nstall_minutes = 45\n").unwrap();
        let config = GateConfig::load_from(&path).unwrap();
        assert_eq!(config.recovery.stall_minutes, 45);
        assert_eq!(config.validation.min_atoms, 90);
    }
}
