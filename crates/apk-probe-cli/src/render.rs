// crates/apk-probe-cli/src/render.rs
// ============================================================================
// Module: Suite Event Rendering
// Description: Turns suite events and ledgers into CLI output.
// Purpose: Keep stdout limited to the human report or one JSON document.
// Dependencies: apk-probe-core, clap, serde_jcs
// ============================================================================

//! ## Overview
//! [`Renderer`] observes suite events and writes localized progress lines in
//! text mode. In JSON mode events are silent and only the final summary is
//! written, as canonical JSON. Write failures are latched and surfaced once
//! the suite returns, since observers cannot fail mid-run.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use apk_probe_core::SuiteEvent;
use apk_probe_core::SuiteObserver;
use apk_probe_core::ledger::LedgerSummary;
use apk_probe_cli::t;
use clap::ValueEnum;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Log lines shown under each progress update.
const PROGRESS_LOG_TAIL: usize = 3;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Report format selected with `--format`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Localized progress lines and a summary line.
    Text,
    /// One canonical JSON document.
    Json,
}

/// Suite observer writing to `out`.
pub(crate) struct Renderer<W: Write> {
    /// Output sink.
    out: W,
    /// Selected format.
    format: OutputFormat,
    /// First write failure, if any.
    failure: Option<std::io::Error>,
}

impl<W: Write> Renderer<W> {
    /// Creates a renderer.
    pub(crate) const fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            failure: None,
        }
    }

    /// Returns true in text mode.
    pub(crate) const fn is_text(&self) -> bool {
        matches!(self.format, OutputFormat::Text)
    }

    /// Writes one text-mode line.
    pub(crate) fn line(&mut self, message: &str) {
        if self.is_text() {
            self.write_raw(message);
        }
    }

    /// Writes one line regardless of format.
    pub(crate) fn write_raw(&mut self, message: &str) {
        if self.failure.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{message}") {
            self.failure = Some(err);
        }
    }

    /// Writes the end-of-run summary in the selected format.
    pub(crate) fn summary(&mut self, summary: &LedgerSummary) -> Result<(), String> {
        match self.format {
            OutputFormat::Text => {
                let verdict = if summary.met_threshold {
                    t!("summary.verdict.met")
                } else {
                    t!("summary.verdict.missed")
                };
                self.write_raw(&t!(
                    "summary.line",
                    suite = summary.suite,
                    passed = summary.passed,
                    total = summary.total,
                    rate = format!("{:.1}", summary.success_rate),
                    threshold = summary.threshold,
                    verdict = verdict
                ));
            }
            OutputFormat::Json => {
                let bytes = summary
                    .to_canonical_json()
                    .map_err(|err| t!("report.serialize_failed", error = err))?;
                self.write_raw(&String::from_utf8_lossy(&bytes));
            }
        }
        Ok(())
    }

    /// Writes `value` as canonical JSON.
    pub(crate) fn json<T: serde::Serialize>(&mut self, value: &T) -> Result<(), String> {
        let bytes = serde_jcs::to_vec(value).map_err(|err| t!("output.json_failed", error = err))?;
        self.write_raw(&String::from_utf8_lossy(&bytes));
        Ok(())
    }

    /// Consumes the renderer, returning the sink or the first write failure.
    pub(crate) fn finish(self) -> std::io::Result<W> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.out),
        }
    }
}

impl<W: Write> SuiteObserver for Renderer<W> {
    fn on_event(&mut self, event: &SuiteEvent<'_>) {
        if !self.is_text() {
            return;
        }
        match event {
            SuiteEvent::SectionStarted {
                section,
            } => self.line(&t!("section.header", section = section.as_str())),
            SuiteEvent::CheckRecorded {
                entry,
            } => {
                let message = if entry.passed {
                    t!("check.pass", name = entry.name, message = entry.message)
                } else {
                    t!("check.fail", name = entry.name, message = entry.message)
                };
                self.line(&message);
            }
            SuiteEvent::Submitted {
                job_id,
            } => self.line(&t!("job.submitted", job_id = job_id)),
            SuiteEvent::Progress {
                attempt,
                snapshot,
            } => {
                self.line(&t!(
                    "job.progress",
                    attempt = attempt,
                    status = snapshot.status,
                    progress = format!("{:.0}", snapshot.progress),
                    step = snapshot.current_step.as_deref().unwrap_or("")
                ));
                for log in snapshot.tail_logs(PROGRESS_LOG_TAIL) {
                    self.line(&t!("job.log_line", line = log));
                }
            }
            SuiteEvent::TransientError {
                attempt,
                error,
            } => self.line(&t!("job.transient", attempt = attempt, error = error)),
            SuiteEvent::Downloaded {
                file_name,
                reply,
                report,
            } => {
                self.line(&t!(
                    "download.summary",
                    file_name = file_name,
                    bytes = reply.body.len(),
                    elapsed_ms = reply.elapsed_ms()
                ));
                let headers = [
                    ("Content-Type", reply.content_type.clone()),
                    ("Content-Length", reply.content_length.map(|len| len.to_string())),
                    ("Content-Disposition", reply.content_disposition.clone()),
                ];
                for (name, value) in headers {
                    if let Some(value) = value {
                        self.line(&t!("download.header", name = name, value = value));
                    }
                }
                self.line(&t!(
                    "download.archive",
                    entries = report.entry_count,
                    manifest = report.has_manifest,
                    signature = report.has_signature_dir
                ));
                if let Some(markers) = report.markers {
                    self.line(&t!(
                        "download.markers",
                        debuggable = markers.debuggable,
                        cleartext = markers.cleartext_traffic,
                        network = markers.network_security_config,
                        test_only = markers.test_only
                    ));
                }
            }
            SuiteEvent::ToolProbed {
                report,
            } => self.line(&t!("tool.entry", name = report.name, state = report.status.label())),
            SuiteEvent::StatsFetched {
                stats,
            } => {
                for (name, value) in stats.display_pairs() {
                    self.line(&t!("stats.entry", name = name, value = value));
                }
            }
            SuiteEvent::DiagnosticTimed {
                name,
                elapsed_ms,
            } => self.line(&t!("diagnostic.timing", name = name, elapsed_ms = elapsed_ms)),
            SuiteEvent::EnvChecked {
                report,
            } => {
                for var in &report.required {
                    let state = env_state(var.present);
                    let preview = var.preview.as_deref().unwrap_or("");
                    let text = t!("env.required", name = var.name, state = state, preview = preview);
                    self.line(text.trim_end());
                }
                for var in &report.credentials {
                    self.line(&t!("env.credential", name = var.name, state = env_state(var.present)));
                }
            }
        }
    }
}

/// Returns the localized presence label.
fn env_state(present: bool) -> String {
    if present { t!("env.state.set") } else { t!("env.state.missing") }
}
