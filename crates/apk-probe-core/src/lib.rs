// crates/apk-probe-core/src/lib.rs
// ============================================================================
// Module: APK Probe Core Library
// Description: Probe harness for the remote APK conversion service.
// Purpose: Submit packages, poll jobs, download and shallow-validate results.
// Dependencies: reqwest, serde, thiserror, tracing, url, zip
// ============================================================================

//! ## Overview
//! APK Probe Core drives the remote conversion service through its HTTP
//! contract and records pass/fail outcomes in a [`ResultLedger`]. The service
//! owns every APK transformation; this crate only builds synthetic inputs,
//! observes job snapshots, and inspects downloaded archives.
//! Invariants:
//! - Execution is single-threaded and blocking; every call has a fixed timeout.
//! - Polling always terminates within a bounded number of attempts.
//! - Response bodies are read with hard size caps and fail closed.
//!
//! Security posture: service responses are untrusted; see [`client`] for the
//! limits applied before any body is decoded.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod artifact;
pub mod client;
pub mod config;
pub mod env_audit;
pub mod job;
pub mod ledger;
pub mod poll;
pub mod suite;
pub mod toolchain;
pub mod validate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use artifact::ArtifactError;
pub use artifact::PackageBuilder;
pub use artifact::Upload;
pub use client::ApiReply;
pub use client::ClientError;
pub use client::ServiceClient;
pub use client::StatusReply;
pub use config::ConfigError;
pub use config::ProbeConfig;
pub use env_audit::EnvAudit;
pub use env_audit::EnvAuditReport;
pub use job::JobResult;
pub use job::JobSnapshot;
pub use job::JobStatus;
pub use ledger::LedgerEntry;
pub use ledger::ReportError;
pub use ledger::ResultLedger;
pub use poll::PollObserver;
pub use poll::PollOutcome;
pub use poll::PollPolicy;
pub use poll::StatusSource;
pub use suite::SuiteEvent;
pub use suite::SuiteObserver;
pub use toolchain::ToolStatus;
pub use validate::ArchiveError;
pub use validate::ArchiveReport;
pub use validate::SignatureExpectation;
