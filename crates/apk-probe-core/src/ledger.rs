// crates/apk-probe-core/src/ledger.rs
// ============================================================================
// Module: Result Ledger
// Description: Ordered pass/fail accumulator for one probe run.
// Purpose: Summarize checks, compare against thresholds, and write reports.
// Dependencies: serde, serde_jcs, time
// ============================================================================

//! ## Overview
//! A [`ResultLedger`] holds `(name, passed, message)` entries in recording
//! order. Threshold comparison uses integer arithmetic so a rate exactly at
//! the threshold passes. Reports are written as canonical JSON
//! (`summary.json`) and Markdown (`summary.md`).
//!
//! ## Invariants
//! - Entries are never reordered or removed.
//! - An empty ledger never meets a threshold.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while writing run reports.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem write failed.
    #[error("report write failed: {0}")]
    Io(String),
    /// Summary could not be serialized.
    #[error("report serialization failed: {0}")]
    Serialize(String),
}

// ============================================================================
// SECTION: Ledger
// ============================================================================

/// One recorded check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Check name.
    pub name: String,
    /// Pass/fail marker.
    pub passed: bool,
    /// Human-readable detail.
    pub message: String,
}

/// Ordered pass/fail accumulator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultLedger {
    /// Recorded entries in order.
    entries: Vec<LedgerEntry>,
}

impl ResultLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Records a check outcome.
    pub fn record(&mut self, name: impl Into<String>, passed: bool, message: impl Into<String>) {
        self.entries.push(LedgerEntry {
            name: name.into(),
            passed,
            message: message.into(),
        });
    }

    /// Records a passing check.
    pub fn pass(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.record(name, true, message);
    }

    /// Records a failing check.
    pub fn fail(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.record(name, false, message);
    }

    /// Appends every entry of `other`.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Returns the entries in recording order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of passing entries.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.entries.iter().filter(|entry| entry.passed).count()
    }

    /// Returns the number of failing entries.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    /// Returns true when every entry passed and at least one exists.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.entries.is_empty() && self.failed() == 0
    }

    /// Returns the success rate as a percentage (0 for an empty ledger).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Entry counts stay far below f64 integer precision."
    )]
    pub fn success_rate(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        (self.passed() as f64 / self.total() as f64) * 100.0
    }

    /// Returns true when `passed / total >= threshold / 100`.
    #[must_use]
    pub fn meets(&self, threshold: u8) -> bool {
        let total = self.total();
        if total == 0 {
            return false;
        }
        self.passed().saturating_mul(100) >= usize::from(threshold).saturating_mul(total)
    }

    /// Builds a serializable summary stamped with the current UTC time.
    #[must_use]
    pub fn summary(&self, suite: &str, threshold: u8) -> LedgerSummary {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| OffsetDateTime::UNIX_EPOCH.to_string());
        LedgerSummary {
            suite: suite.to_string(),
            generated_at,
            total: self.total(),
            passed: self.passed(),
            failed: self.failed(),
            success_rate: self.success_rate(),
            threshold,
            met_threshold: self.meets(threshold),
            entries: self.entries.clone(),
        }
    }
}

// ============================================================================
// SECTION: Summary
// ============================================================================

/// Serializable end-of-run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    /// Suite label.
    pub suite: String,
    /// RFC 3339 generation time.
    pub generated_at: String,
    /// Entry count.
    pub total: usize,
    /// Passing entries.
    pub passed: usize,
    /// Failing entries.
    pub failed: usize,
    /// Success rate percentage.
    pub success_rate: f64,
    /// Threshold percentage applied.
    pub threshold: u8,
    /// Whether the threshold was met.
    pub met_threshold: bool,
    /// Entries in recording order.
    pub entries: Vec<LedgerEntry>,
}

impl LedgerSummary {
    /// Serializes the summary as canonical JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialize`] when canonicalization fails.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, ReportError> {
        serde_jcs::to_vec(self).map_err(|err| ReportError::Serialize(err.to_string()))
    }

    /// Renders the summary as Markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# APK Probe Summary\n\n");
        out.push_str("## Status\n\n");
        let _ = writeln!(out, "- Suite: {}", self.suite);
        let _ = writeln!(out, "- Generated: {}", self.generated_at);
        let _ = writeln!(out, "- Passed: {}/{}", self.passed, self.total);
        let _ = writeln!(out, "- Success rate: {:.1}%", self.success_rate);
        let verdict = if self.met_threshold { "met" } else { "not met" };
        let _ = writeln!(out, "- Threshold: {}% ({verdict})", self.threshold);
        out.push_str("\n## Checks\n\n");
        if self.entries.is_empty() {
            out.push_str("- None\n");
        }
        for entry in &self.entries {
            let mark = if entry.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "- [{mark}] {}: {}", entry.name, entry.message);
        }
        out
    }

    /// Writes `summary.json` and `summary.md` under `dir`, creating it.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when the directory or files cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(dir).map_err(|err| ReportError::Io(format!("{}: {err}", dir.display())))?;
        let json_path = dir.join("summary.json");
        let md_path = dir.join("summary.md");
        fs::write(&json_path, self.to_canonical_json()?)
            .map_err(|err| ReportError::Io(format!("{}: {err}", json_path.display())))?;
        fs::write(&md_path, self.to_markdown())
            .map_err(|err| ReportError::Io(format!("{}: {err}", md_path.display())))?;
        Ok(vec![json_path, md_path])
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
