// crates/apk-probe-core/src/job.rs
// ============================================================================
// Module: Job Model
// Description: Observed records returned by the conversion service.
// Purpose: Decode job snapshots, submit receipts, stats, and error bodies.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Wire records of the conversion service. Field names are camelCase on the
//! wire. Decoding is tolerant where the service is loose: unknown job states
//! decode as [`JobStatus::Unknown`] and optional counters may be absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Job Status
// ============================================================================

/// Lifecycle state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted but not yet started.
    Submitted,
    /// Work in progress.
    Processing,
    /// Finished with a result.
    Completed,
    /// Finished with a failure.
    Error,
    /// Any state string this client does not recognize.
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Returns true for states from which no further transition occurs.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Receipt returned by a successful submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAccepted {
    /// Identifier used against the status endpoint.
    pub job_id: String,
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    /// Lifecycle state.
    pub status: JobStatus,
    /// Progress percentage as reported by the service.
    #[serde(default)]
    pub progress: f64,
    /// Free-text label of the step in progress.
    #[serde(default)]
    pub current_step: Option<String>,
    /// Ordered log lines.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Result descriptor once completed.
    #[serde(default)]
    pub result: Option<JobResult>,
    /// Failure description, when the service provides one.
    #[serde(default)]
    pub error: Option<String>,
}

impl JobSnapshot {
    /// Returns up to `count` trailing log lines, oldest first.
    #[must_use]
    pub fn tail_logs(&self, count: usize) -> &[String] {
        let start = self.logs.len().saturating_sub(count);
        &self.logs[start ..]
    }
}

/// Result descriptor of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    /// Output file name usable against the download endpoint.
    pub file_name: String,
    /// Output size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Whether the output was signed.
    #[serde(default)]
    pub signed: bool,
    /// Whether the signature was verified.
    #[serde(default)]
    pub verified: bool,
    /// Whether the output was aligned.
    #[serde(default)]
    pub aligned: bool,
}

/// Error body returned with 4xx/5xx codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message.
    pub error: String,
}

/// Aggregate job counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    /// Total jobs seen.
    #[serde(default)]
    pub total_jobs: Option<u64>,
    /// Completed jobs.
    #[serde(default)]
    pub completed_jobs: Option<u64>,
    /// Failed jobs.
    #[serde(default)]
    pub error_jobs: Option<u64>,
    /// Jobs in progress.
    #[serde(default)]
    pub processing_jobs: Option<u64>,
}

impl ServiceStats {
    /// Returns the counters as labeled display values (`N/A` when absent).
    #[must_use]
    pub fn display_pairs(&self) -> [(&'static str, String); 4] {
        let show = |value: Option<u64>| value.map_or_else(|| "N/A".to_string(), |v| v.to_string());
        [
            ("totalJobs", show(self.total_jobs)),
            ("completedJobs", show(self.completed_jobs)),
            ("errorJobs", show(self.error_jobs)),
            ("processingJobs", show(self.processing_jobs)),
        ]
    }
}

/// Storage backend connectivity result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCheck {
    /// Whether the backend answered.
    pub success: bool,
    /// Optional detail message.
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
