// crates/apk-probe-core/src/validate.rs
// ============================================================================
// Module: Archive Shallow-Validator
// Description: Structural checks on bytes claimed to be a package archive.
// Purpose: Confirm a downloaded artifact is a plausible package.
// Dependencies: zip, serde
// ============================================================================

//! ## Overview
//! [`inspect_archive`] opens the bytes as a ZIP archive in a single pass and
//! records what it finds. Pass/fail is decided by [`ArchiveReport::violations`]
//! using four structural properties: readable archive, manifest entry, a
//! `.dex` payload, and the signing directory matching the expectation.
//! Manifest markers and debug resources are informational only.
//!
//! Security posture: archive bytes are untrusted. Only the manifest entry is
//! decompressed, and at most [`MAX_MANIFEST_BYTES`] of it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::io::Cursor;
use std::io::Read;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use zip::ZipArchive;

use crate::artifact::MANIFEST_ENTRY;
use crate::artifact::SIGNATURE_DIR;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum manifest bytes decompressed for marker scanning.
pub const MAX_MANIFEST_BYTES: u64 = 4 * 1024 * 1024;
/// Suffix identifying executable payload entries.
const PAYLOAD_SUFFIX: &str = ".dex";
/// Compiled resource table entry.
const RESOURCES_ENTRY: &str = "resources.arsc";
/// Network security config resource injected by debug conversion.
const NETWORK_SECURITY_RESOURCE: &str = "res/xml/network_security_config.xml";
/// Debug values resource injected by debug conversion.
const DEBUG_VALUES_RESOURCE: &str = "res/values/apk_debug_values.xml";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised when bytes cannot be inspected as an archive.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Bytes are not a readable ZIP archive.
    #[error("not a valid archive: {0}")]
    NotAnArchive(String),
}

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// Expectation on the signing metadata directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureExpectation {
    /// `META-INF/` must be present.
    Present,
    /// `META-INF/` must be absent.
    Absent,
    /// Either is acceptable.
    #[default]
    Either,
}

impl SignatureExpectation {
    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Either => "either",
        }
    }
}

impl FromStr for SignatureExpectation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "either" => Ok(Self::Either),
            other => Err(format!("unknown signature expectation: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Debug markers found in a text manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManifestMarkers {
    /// `android:debuggable="true"`.
    pub debuggable: bool,
    /// `android:usesCleartextTraffic="true"`.
    pub cleartext_traffic: bool,
    /// `android:networkSecurityConfig` attribute.
    pub network_security_config: bool,
    /// `android:testOnly="true"`.
    pub test_only: bool,
}

/// Structural findings for one archive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveReport {
    /// Number of entries in the central directory.
    pub entry_count: usize,
    /// Manifest entry present.
    pub has_manifest: bool,
    /// At least one `.dex` entry present.
    pub has_payload: bool,
    /// Resource table present.
    pub has_resources: bool,
    /// Any entry under `META-INF/`.
    pub has_signature_dir: bool,
    /// Manifest markers, when the manifest was readable.
    pub markers: Option<ManifestMarkers>,
    /// Network security config resource present.
    pub has_network_security_resource: bool,
    /// Debug values resource present.
    pub has_debug_values_resource: bool,
}

/// Structural property that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Manifest entry missing.
    MissingManifest,
    /// No `.dex` entry.
    MissingPayload,
    /// Signing directory present but expected absent.
    UnexpectedSignatureDir,
    /// Signing directory absent but expected present.
    MissingSignatureDir,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::MissingManifest => "missing AndroidManifest.xml",
            Self::MissingPayload => "missing .dex payload",
            Self::UnexpectedSignatureDir => "unexpected META-INF/ directory",
            Self::MissingSignatureDir => "missing META-INF/ directory",
        };
        f.write_str(text)
    }
}

impl ArchiveReport {
    /// Returns the structural violations under `signature`.
    #[must_use]
    pub fn violations(&self, signature: SignatureExpectation) -> Vec<Violation> {
        let mut violations = Vec::new();
        if !self.has_manifest {
            violations.push(Violation::MissingManifest);
        }
        if !self.has_payload {
            violations.push(Violation::MissingPayload);
        }
        match signature {
            SignatureExpectation::Present if !self.has_signature_dir => {
                violations.push(Violation::MissingSignatureDir);
            }
            SignatureExpectation::Absent if self.has_signature_dir => {
                violations.push(Violation::UnexpectedSignatureDir);
            }
            _ => {}
        }
        violations
    }
}

// ============================================================================
// SECTION: Inspection
// ============================================================================

/// Inspects `bytes` as a package archive.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the bytes are not a readable ZIP archive.
pub fn inspect_archive(bytes: &[u8]) -> Result<ArchiveReport, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|err| ArchiveError::NotAnArchive(err.to_string()))?;
    let mut report = ArchiveReport {
        entry_count: archive.len(),
        ..ArchiveReport::default()
    };
    for name in archive.file_names() {
        report.has_manifest |= name == MANIFEST_ENTRY;
        report.has_payload |= name.ends_with(PAYLOAD_SUFFIX);
        report.has_resources |= name == RESOURCES_ENTRY;
        report.has_signature_dir |= name.starts_with(SIGNATURE_DIR);
        report.has_network_security_resource |= name == NETWORK_SECURITY_RESOURCE;
        report.has_debug_values_resource |= name == DEBUG_VALUES_RESOURCE;
    }
    if report.has_manifest {
        report.markers = read_manifest(&mut archive).map(|text| scan_markers(&text));
    }
    Ok(report)
}

/// Reads the manifest entry with a size cap; unreadable content yields `None`.
fn read_manifest(archive: &mut ZipArchive<Cursor<&[u8]>>) -> Option<String> {
    let entry = archive.by_name(MANIFEST_ENTRY).ok()?;
    let mut buf = Vec::new();
    entry.take(MAX_MANIFEST_BYTES).read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

/// Scans manifest text for debug markers.
fn scan_markers(text: &str) -> ManifestMarkers {
    ManifestMarkers {
        debuggable: text.contains("android:debuggable=\"true\""),
        cleartext_traffic: text.contains("android:usesCleartextTraffic=\"true\""),
        network_security_config: text.contains("android:networkSecurityConfig"),
        test_only: text.contains("android:testOnly=\"true\""),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
