//! dockgate-structure - Validation and preprocessing of PDB inputs.
//!
//! This crate is the pre-flight gate in front of the external docking engine:
//! 1. Counting atom records and classifying files against the size thresholds
//! 2. Detecting multi-chain structures that need explicit extraction
//! 3. Detecting fixed-width column drift the engine cannot parse
//! 4. Rewriting records into the canonical column layout
//!
//! A bad structural file is a normal outcome here, not an exception: badness
//! is returned as a [`validate::Verdict`] and only infrastructure failures
//! (unreadable files) surface as errors.

pub mod preprocess;
pub mod record;
pub mod validate;

pub use record::{AtomRecord, RecordKind};
pub use validate::Verdict;
