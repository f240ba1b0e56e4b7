// crates/apk-probe-core/src/suite.rs
// ============================================================================
// Module: Scenario Suites
// Description: Contract, pipeline, backend, diagnostic, and audit scenarios.
// Purpose: Run each scenario once, record every check, and stream events.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! Every suite appends to a [`ResultLedger`] and streams [`SuiteEvent`]s to a
//! [`SuiteObserver`]. Nothing inside a suite is fatal: a failing check is
//! recorded and the remaining checks still run. Callers compare the ledger
//! against a threshold to decide the verdict.
//!
//! Check names are stable dotted keys (`contract.invalid_file_type`); ledger
//! messages are English detail for reports.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::time::Duration;

use tracing::info;

use crate::artifact::PackageBuilder;
use crate::artifact::non_package_upload;
use crate::artifact::oversized_upload;
use crate::client::ApiReply;
use crate::client::ClientError;
use crate::client::ServiceClient;
use crate::config::ProbeConfig;
use crate::env_audit::EnvAuditReport;
use crate::job::JobSnapshot;
use crate::job::ServiceStats;
use crate::job::StorageCheck;
use crate::job::SubmitAccepted;
use crate::ledger::LedgerEntry;
use crate::ledger::ResultLedger;
use crate::poll::PollObserver;
use crate::poll::PollOutcome;
use crate::poll::poll_job;
use crate::toolchain::DEFAULT_TOOL_TIMEOUT;
use crate::toolchain::ToolProbe;
use crate::toolchain::ToolReport;
use crate::toolchain::default_probes;
use crate::toolchain::probe_tool;
use crate::validate::ArchiveReport;
use crate::validate::SignatureExpectation;
use crate::validate::inspect_archive;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Job id that the service never issues.
pub const UNKNOWN_JOB_ID: &str = "invalid-job-id";
/// File name that the service never produces.
pub const UNKNOWN_DOWNLOAD: &str = "nonexistent.apk";
/// Sentinel job id used by the storage diagnostics.
pub const DIAGNOSTIC_JOB_ID: &str = "test-firebase-connection";

/// Indicator for a rejected file type.
const INVALID_TYPE_INDICATOR: &str = "Invalid file type";
/// Indicator for a missing file field.
const NO_FILE_INDICATOR: &str = "No APK file provided";
/// Indicator for an unknown job.
const JOB_NOT_FOUND_INDICATOR: &str = "Job not found";
/// Indicator for an unknown download.
const FILE_NOT_FOUND_INDICATOR: &str = "File not found";
/// Indicator for an oversized upload (case-insensitive).
const TOO_LARGE_INDICATOR: &str = "too large";

// ============================================================================
// SECTION: Events
// ============================================================================

/// Scenario group being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Host toolchain probe.
    Toolchain,
    /// Storage backend connectivity.
    Storage,
    /// Aggregate stats.
    Stats,
    /// Negative-path contract checks.
    Contract,
    /// End-to-end conversion.
    Pipeline,
    /// Storage diagnostics.
    Diagnostics,
    /// Environment audit.
    Environment,
}

impl Section {
    /// Returns the stable section key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Toolchain => "toolchain",
            Self::Storage => "storage",
            Self::Stats => "stats",
            Self::Contract => "contract",
            Self::Pipeline => "pipeline",
            Self::Diagnostics => "diagnostics",
            Self::Environment => "environment",
        }
    }
}

/// Structured progress emitted while suites run.
#[derive(Debug)]
pub enum SuiteEvent<'a> {
    /// A scenario group started.
    SectionStarted {
        /// Group being started.
        section: Section,
    },
    /// A check was recorded in the ledger.
    CheckRecorded {
        /// Recorded entry.
        entry: &'a LedgerEntry,
    },
    /// A job was accepted.
    Submitted {
        /// Remote job id.
        job_id: &'a str,
    },
    /// A status snapshot was observed.
    Progress {
        /// Poll attempt (1-based).
        attempt: u32,
        /// Observed snapshot.
        snapshot: &'a JobSnapshot,
    },
    /// A poll attempt failed transiently.
    TransientError {
        /// Poll attempt (1-based).
        attempt: u32,
        /// Failure.
        error: &'a ClientError,
    },
    /// An artifact was downloaded and inspected.
    Downloaded {
        /// Requested file name.
        file_name: &'a str,
        /// Raw reply (headers and bytes).
        reply: &'a ApiReply,
        /// Structural findings.
        report: &'a ArchiveReport,
    },
    /// A host tool was probed.
    ToolProbed {
        /// Probe result.
        report: &'a ToolReport,
    },
    /// Aggregate stats were fetched.
    StatsFetched {
        /// Decoded counters.
        stats: &'a ServiceStats,
    },
    /// A diagnostic call was timed.
    DiagnosticTimed {
        /// Check name.
        name: &'a str,
        /// Elapsed milliseconds.
        elapsed_ms: u64,
    },
    /// The environment audit finished.
    EnvChecked {
        /// Audit report.
        report: &'a EnvAuditReport,
    },
}

/// Receiver of suite events.
pub trait SuiteObserver {
    /// Handles one event.
    fn on_event(&mut self, event: &SuiteEvent<'_>);
}

impl<F> SuiteObserver for F
where
    F: FnMut(&SuiteEvent<'_>),
{
    fn on_event(&mut self, event: &SuiteEvent<'_>) {
        (*self)(event);
    }
}

/// Observer that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl SuiteObserver for SilentObserver {
    fn on_event(&mut self, _event: &SuiteEvent<'_>) {}
}

// ============================================================================
// SECTION: Run Context
// ============================================================================

/// Ledger plus observer for one suite invocation.
struct Run<'a> {
    /// Entries recorded so far.
    ledger: ResultLedger,
    /// Event sink.
    observer: &'a mut dyn SuiteObserver,
}

impl<'a> Run<'a> {
    /// Creates a run and announces `section`.
    fn start(section: Section, observer: &'a mut dyn SuiteObserver) -> Self {
        observer.on_event(&SuiteEvent::SectionStarted {
            section,
        });
        Self {
            ledger: ResultLedger::new(),
            observer,
        }
    }

    /// Emits an event.
    fn emit(&mut self, event: &SuiteEvent<'_>) {
        self.observer.on_event(event);
    }

    /// Records a check and emits it; returns `passed`.
    fn record(&mut self, name: &str, passed: bool, message: impl Into<String>) -> bool {
        self.ledger.record(name, passed, message);
        if let Some(entry) = self.ledger.entries().last() {
            self.observer.on_event(&SuiteEvent::CheckRecorded {
                entry,
            });
        }
        passed
    }

    /// Returns the ledger.
    fn finish(self) -> ResultLedger {
        self.ledger
    }
}

/// Relays polling progress into suite events.
struct PollRelay<'r, 'a> {
    /// Owning run.
    run: &'r mut Run<'a>,
}

impl PollObserver for PollRelay<'_, '_> {
    fn on_snapshot(&mut self, attempt: u32, snapshot: &JobSnapshot) {
        self.run.emit(&SuiteEvent::Progress {
            attempt,
            snapshot,
        });
    }

    fn on_transient_error(&mut self, attempt: u32, error: &ClientError) {
        self.run.emit(&SuiteEvent::TransientError {
            attempt,
            error,
        });
    }
}

// ============================================================================
// SECTION: Contract Checks
// ============================================================================

/// Runs the negative-path contract checks.
pub fn contract_checks(
    client: &ServiceClient,
    config: &ProbeConfig,
    observer: &mut dyn SuiteObserver,
) -> ResultLedger {
    let mut run = Run::start(Section::Contract, observer);

    let (passed, message) =
        expect_error(client.submit(non_package_upload()), 400, INVALID_TYPE_INDICATOR, false);
    run.record("contract.invalid_file_type", passed, message);

    let (passed, message) =
        expect_error(client.submit_without_file(), 400, NO_FILE_INDICATOR, false);
    run.record("contract.missing_file", passed, message);

    let (passed, message) =
        expect_error(client.status(UNKNOWN_JOB_ID), 404, JOB_NOT_FOUND_INDICATOR, false);
    run.record("contract.unknown_job", passed, message);

    let (passed, message) =
        expect_error(client.download(UNKNOWN_DOWNLOAD), 404, FILE_NOT_FOUND_INDICATOR, false);
    run.record("contract.unknown_download", passed, message);

    match oversized_upload(config.limits.max_upload_bytes) {
        Ok(upload) => {
            let (passed, message) =
                expect_error(client.submit(upload), 400, TOO_LARGE_INDICATOR, true);
            run.record("contract.oversized_payload", passed, message);
        }
        Err(err) => {
            run.record("contract.oversized_payload", false, err.to_string());
        }
    }
    run.finish()
}

/// Checks a reply for `status` and an error indicator.
fn expect_error(
    reply: Result<ApiReply, ClientError>,
    status: u16,
    indicator: &str,
    case_insensitive: bool,
) -> (bool, String) {
    let reply = match reply {
        Ok(reply) => reply,
        Err(err) => return (false, err.to_string()),
    };
    let message = reply.error_message().unwrap_or_default();
    let found = if case_insensitive {
        message.to_lowercase().contains(&indicator.to_lowercase())
    } else {
        message.contains(indicator)
    };
    if reply.status == status && found {
        (true, format!("{status} {message}"))
    } else {
        (
            false,
            format!(
                "expected {status} with '{indicator}', got {}: {}",
                reply.status,
                truncate(&reply.error_or_body())
            ),
        )
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Runs the end-to-end pipeline: build, submit, poll, download, validate.
///
/// Steps depend on each other; the first failing step is recorded and the
/// remaining steps are not attempted.
pub fn pipeline(
    client: &ServiceClient,
    config: &ProbeConfig,
    signature: SignatureExpectation,
    observer: &mut dyn SuiteObserver,
) -> ResultLedger {
    let mut run = Run::start(Section::Pipeline, observer);
    pipeline_steps(client, config, signature, &mut run);
    run.finish()
}

/// Pipeline body; stops at the first failed step.
fn pipeline_steps(
    client: &ServiceClient,
    config: &ProbeConfig,
    signature: SignatureExpectation,
    run: &mut Run<'_>,
) {
    let upload = match PackageBuilder::new().build_upload() {
        Ok(upload) => {
            run.record("pipeline.build", true, format!("{} bytes", upload.len()));
            upload
        }
        Err(err) => {
            run.record("pipeline.build", false, err.to_string());
            return;
        }
    };

    let job_id = match client.submit(upload) {
        Ok(reply) if reply.is_ok() => match reply.json::<SubmitAccepted>() {
            Ok(accepted) => accepted.job_id,
            Err(err) => {
                run.record("pipeline.submit", false, err.to_string());
                return;
            }
        },
        Ok(reply) => {
            let message = format!("status {}: {}", reply.status, truncate(&reply.error_or_body()));
            run.record("pipeline.submit", false, message);
            return;
        }
        Err(err) => {
            run.record("pipeline.submit", false, err.to_string());
            return;
        }
    };
    run.emit(&SuiteEvent::Submitted {
        job_id: &job_id,
    });
    run.record("pipeline.submit", true, format!("job {job_id}"));

    let mut relay = PollRelay {
        run: &mut *run,
    };
    let outcome = poll_job(client, &job_id, &config.poll_policy(), &mut relay);
    let file_name = match outcome {
        PollOutcome::Completed {
            snapshot,
            attempts,
        } => match snapshot.result {
            Some(result) => {
                let message = format!(
                    "completed after {attempts} attempts (signed={}, verified={}, aligned={})",
                    result.signed, result.verified, result.aligned
                );
                run.record("pipeline.poll", true, message);
                result.file_name
            }
            None => {
                run.record("pipeline.poll", false, "completed without a result descriptor");
                return;
            }
        },
        other => {
            run.record("pipeline.poll", false, describe_unfinished(&other));
            return;
        }
    };

    let reply = match client.download(&file_name) {
        Ok(reply) if reply.is_ok() => {
            let message = format!(
                "{} bytes ({})",
                reply.body.len(),
                reply.content_type.as_deref().unwrap_or("no content-type")
            );
            run.record("pipeline.download", true, message);
            reply
        }
        Ok(reply) => {
            let message = format!("status {}: {}", reply.status, truncate(&reply.error_or_body()));
            run.record("pipeline.download", false, message);
            return;
        }
        Err(err) => {
            run.record("pipeline.download", false, err.to_string());
            return;
        }
    };

    match inspect_archive(&reply.body) {
        Ok(report) => {
            run.emit(&SuiteEvent::Downloaded {
                file_name: &file_name,
                reply: &reply,
                report: &report,
            });
            let violations = report.violations(signature);
            if violations.is_empty() {
                let message = format!("{} entries, structure valid", report.entry_count);
                run.record("pipeline.validate", true, message);
            } else {
                let detail: Vec<String> = violations.iter().map(ToString::to_string).collect();
                run.record("pipeline.validate", false, detail.join("; "));
            }
        }
        Err(err) => {
            run.record("pipeline.validate", false, err.to_string());
        }
    }
}

/// Describes a non-completed polling outcome.
fn describe_unfinished(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Completed {
            attempts, ..
        } => format!("completed after {attempts} attempts"),
        PollOutcome::Failed {
            error,
            recent_logs,
            ..
        } => {
            let error = error.as_deref().unwrap_or("job failed");
            if recent_logs.is_empty() {
                error.to_string()
            } else {
                format!("{error}; recent logs: {}", recent_logs.join(" | "))
            }
        }
        PollOutcome::Rejected {
            status,
            message,
            ..
        } => format!("status query rejected with {status}: {message}"),
        PollOutcome::TimedOut {
            attempts,
            waited,
            ..
        } => format!("no terminal state after {attempts} attempts ({} ms)", duration_ms(*waited)),
    }
}

/// Polls an existing job, streaming progress events.
pub fn poll_existing(
    client: &ServiceClient,
    config: &ProbeConfig,
    job_id: &str,
    observer: &mut dyn SuiteObserver,
) -> (ResultLedger, PollOutcome) {
    let mut run = Run::start(Section::Pipeline, observer);
    let mut relay = PollRelay {
        run: &mut run,
    };
    let outcome = poll_job(client, job_id, &config.poll_policy(), &mut relay);
    match &outcome {
        PollOutcome::Completed {
            attempts, ..
        } => {
            run.record("poll.job", true, format!("completed after {attempts} attempts"));
        }
        other => {
            run.record("poll.job", false, describe_unfinished(other));
        }
    }
    (run.finish(), outcome)
}

// ============================================================================
// SECTION: Backend Checks
// ============================================================================

/// Checks the storage backend connectivity endpoint.
pub fn storage_check(client: &ServiceClient, observer: &mut dyn SuiteObserver) -> ResultLedger {
    let mut run = Run::start(Section::Storage, observer);
    let (passed, message) = match client.storage_check() {
        Ok(reply) if reply.is_ok() => match reply.json::<StorageCheck>() {
            Ok(check) => {
                let detail = check.message.unwrap_or_default();
                if check.success {
                    (true, format!("connected {detail}").trim_end().to_string())
                } else {
                    (false, format!("backend reported failure {detail}").trim_end().to_string())
                }
            }
            Err(err) => (false, err.to_string()),
        },
        Ok(reply) => (false, format!("status {}: {}", reply.status, truncate(&reply.error_or_body()))),
        Err(err) => (false, err.to_string()),
    };
    run.record("storage.connectivity", passed, message);
    run.finish()
}

/// Checks the aggregate stats endpoint.
pub fn stats_check(client: &ServiceClient, observer: &mut dyn SuiteObserver) -> ResultLedger {
    let mut run = Run::start(Section::Stats, observer);
    match client.stats() {
        Ok(reply) if reply.is_ok() => match reply.json::<serde_json::Value>() {
            Ok(value) if value.is_object() => match serde_json::from_value::<ServiceStats>(value) {
                Ok(stats) => {
                    run.emit(&SuiteEvent::StatsFetched {
                        stats: &stats,
                    });
                    let detail: Vec<String> = stats
                        .display_pairs()
                        .iter()
                        .map(|(label, value)| format!("{label}={value}"))
                        .collect();
                    run.record("stats.fetch", true, detail.join(", "));
                }
                Err(err) => {
                    run.record("stats.fetch", false, err.to_string());
                }
            },
            Ok(_) => {
                run.record("stats.fetch", false, "stats body is not a json object");
            }
            Err(err) => {
                run.record("stats.fetch", false, err.to_string());
            }
        },
        Ok(reply) => {
            let message = format!("status {}: {}", reply.status, truncate(&reply.error_or_body()));
            run.record("stats.fetch", false, message);
        }
        Err(err) => {
            run.record("stats.fetch", false, err.to_string());
        }
    }
    run.finish()
}

/// Probes each tool, emitting events without recording.
fn probe_all(run: &mut Run<'_>, probes: &[ToolProbe], timeout: Duration) -> Vec<ToolReport> {
    probes
        .iter()
        .map(|probe| {
            let report = probe_tool(probe, timeout);
            run.emit(&SuiteEvent::ToolProbed {
                report: &report,
            });
            report
        })
        .collect()
}

/// Probes the host toolchain, recording one entry per tool.
pub fn toolchain_check(
    probes: &[ToolProbe],
    timeout: Duration,
    observer: &mut dyn SuiteObserver,
) -> ResultLedger {
    let mut run = Run::start(Section::Toolchain, observer);
    for report in probe_all(&mut run, probes, timeout) {
        run.record(
            &format!("toolchain.{}", report.name),
            report.status.is_available(),
            report.status.label(),
        );
    }
    run.finish()
}

/// Options for [`backend_run`].
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Probe the host toolchain first.
    pub include_toolchain: bool,
    /// Run the pipeline even when prerequisites failed.
    pub force_pipeline: bool,
    /// Signing directory expectation for the downloaded artifact.
    pub signature: SignatureExpectation,
    /// Toolchain probes to run.
    pub probes: Vec<ToolProbe>,
    /// Per-tool timeout.
    pub tool_timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            include_toolchain: true,
            force_pipeline: false,
            signature: SignatureExpectation::Either,
            probes: default_probes(),
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
        }
    }
}

/// Runs toolchain, storage, stats, contract checks, and the pipeline.
///
/// The overall ledger holds one `contract` entry, passing when the contract
/// group meets the error-handling threshold, and one `pipeline` entry, passing
/// only when every step passed. Per-check detail is still emitted as events.
/// The pipeline is skipped (recorded as a failure) when storage failed or the
/// included toolchain probe failed, unless `force_pipeline` is set.
pub fn backend_run(
    client: &ServiceClient,
    config: &ProbeConfig,
    options: &BackendOptions,
    observer: &mut dyn SuiteObserver,
) -> ResultLedger {
    let mut ledger = ResultLedger::new();

    let toolchain_ok = if options.include_toolchain {
        let mut run = Run::start(Section::Toolchain, observer);
        let reports = probe_all(&mut run, &options.probes, options.tool_timeout);
        let missing: Vec<&str> = reports
            .iter()
            .filter(|report| !report.status.is_available())
            .map(|report| report.name.as_str())
            .collect();
        let ok = if missing.is_empty() {
            run.record("toolchain", true, "all tools available")
        } else {
            run.record("toolchain", false, format!("unavailable: {}", missing.join(", ")))
        };
        ledger.extend(run.finish());
        ok
    } else {
        true
    };

    let storage = storage_check(client, observer);
    let storage_ok = storage.all_passed();
    ledger.extend(storage);
    ledger.extend(stats_check(client, observer));
    let threshold = config.thresholds.error_handling;
    let contract = contract_checks(client, config, observer);
    let contract_ok = contract.meets(threshold);
    let detail = format!("threshold {threshold}%");
    fold_group(&mut ledger, "contract", contract_ok, &contract, &detail, observer);

    if (storage_ok && toolchain_ok) || options.force_pipeline {
        let steps = pipeline(client, config, options.signature, observer);
        let steps_ok = steps.all_passed();
        fold_group(&mut ledger, "pipeline", steps_ok, &steps, "all steps required", observer);
    } else {
        let mut run = Run::start(Section::Pipeline, observer);
        let reason = if storage_ok { "toolchain unavailable" } else { "storage backend unavailable" };
        run.record("pipeline", false, format!("skipped: {reason}"));
        ledger.extend(run.finish());
    }
    info!(
        passed = ledger.passed(),
        total = ledger.total(),
        "backend run finished"
    );
    ledger
}

/// Records `group` as one overall entry named `name` and announces it.
///
/// The message carries the group tally and, on failure, the first failed check.
fn fold_group(
    ledger: &mut ResultLedger,
    name: &str,
    passed: bool,
    group: &ResultLedger,
    rule: &str,
    observer: &mut dyn SuiteObserver,
) {
    let mut message = format!("{}/{} checks passed ({rule})", group.passed(), group.total());
    let first_failure = if passed { None } else { group.entries().iter().find(|entry| !entry.passed) };
    if let Some(first) = first_failure {
        let _ = write!(message, "; first failure {}: {}", first.name, first.message);
    }
    ledger.record(name, passed, message);
    if let Some(entry) = ledger.entries().last() {
        observer.on_event(&SuiteEvent::CheckRecorded {
            entry,
        });
    }
}

// ============================================================================
// SECTION: Diagnostics
// ============================================================================

/// Runs the storage diagnostics against the status and submit endpoints.
pub fn diagnostics(client: &ServiceClient, observer: &mut dyn SuiteObserver) -> ResultLedger {
    let mut run = Run::start(Section::Diagnostics, observer);

    let name = "diagnostics.sentinel_status";
    match client.status(DIAGNOSTIC_JOB_ID) {
        Ok(reply) => {
            let elapsed_ms = reply.elapsed_ms();
            run.emit(&SuiteEvent::DiagnosticTimed {
                name,
                elapsed_ms,
            });
            match reply.status {
                404 => run.record(name, true, format!("404 in {elapsed_ms} ms (backend reachable)")),
                500 => run.record(
                    name,
                    false,
                    format!("backend connection failure: {}", truncate(&reply.error_or_body())),
                ),
                other => run.record(name, false, format!("unexpected status {other}")),
            };
        }
        Err(ClientError::Timeout {
            timeout_ms,
        }) => {
            run.record(name, false, format!("request hung (no reply within {timeout_ms} ms)"));
        }
        Err(err) => {
            run.record(name, false, err.to_string());
        }
    }

    let name = "diagnostics.submit_without_file";
    match client.submit_without_file() {
        Ok(reply) => {
            let elapsed_ms = reply.elapsed_ms();
            run.emit(&SuiteEvent::DiagnosticTimed {
                name,
                elapsed_ms,
            });
            if reply.status == 400 {
                let message = format!("400 in {elapsed_ms} ms: {}", reply.error_or_body());
                run.record(name, true, message);
            } else {
                let message =
                    format!("expected 400, got {}: {}", reply.status, truncate(&reply.error_or_body()));
                run.record(name, false, message);
            }
        }
        Err(ClientError::Timeout {
            timeout_ms,
        }) => {
            run.record(name, false, format!("request hung (no reply within {timeout_ms} ms)"));
        }
        Err(err) => {
            run.record(name, false, err.to_string());
        }
    }
    run.finish()
}

// ============================================================================
// SECTION: Environment Audit
// ============================================================================

/// Records an environment audit report as checks.
pub fn env_audit_check(report: &EnvAuditReport, observer: &mut dyn SuiteObserver) -> ResultLedger {
    let mut run = Run::start(Section::Environment, observer);
    run.emit(&SuiteEvent::EnvChecked {
        report,
    });
    for var in &report.required {
        let message = if var.present { "set" } else { "missing" };
        run.record(&format!("env.{}", var.name), var.present, message);
    }
    let present: Vec<&str> = report
        .credentials
        .iter()
        .filter(|var| var.present)
        .map(|var| var.name.as_str())
        .collect();
    if present.is_empty() {
        run.record("env.credentials", false, "no credential variable set");
    } else {
        run.record("env.credentials", true, format!("set: {}", present.join(", ")));
    }
    run.finish()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maximum characters of a response body echoed into messages.
const MAX_ECHO_CHARS: usize = 200;

/// Truncates text for ledger messages.
fn truncate(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ECHO_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_ECHO_CHARS).collect();
    format!("{head}...")
}

/// Returns whole milliseconds of `duration`.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
