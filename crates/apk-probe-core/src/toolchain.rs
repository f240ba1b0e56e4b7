// crates/apk-probe-core/src/toolchain.rs
// ============================================================================
// Module: Host Toolchain Probe
// Description: Availability checks for the signing and alignment tools.
// Purpose: Explain pipeline failures caused by a missing local toolchain.
// Dependencies: std::process
// ============================================================================

//! ## Overview
//! Spawns each tool with a harmless argument and classifies the exit. Output
//! is discarded; only availability matters. Each spawn is bounded by a
//! timeout and killed when it expires.
//!
//! ## Invariants
//! - A program that cannot be spawned, or exits with 127, is `Missing`.
//! - Probes never read or write files.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::ErrorKind;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code shells use for "command not found".
const EXIT_NOT_FOUND: i32 = 127;
/// Poll interval while waiting for a probe to exit.
const WAIT_STEP: Duration = Duration::from_millis(20);
/// Default per-tool timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// SECTION: Types
// ============================================================================

/// How a probe exit is judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessRule {
    /// Only exit code 0 counts as available.
    ExitZero,
    /// Any exit other than "not found" counts as available.
    NotMissing,
}

/// One tool to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProbe {
    /// Display name.
    pub name: String,
    /// Program to spawn.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Exit classification rule.
    pub rule: SuccessRule,
}

impl ToolProbe {
    /// Creates a probe.
    #[must_use]
    pub fn new(program: &str, args: &[&str], rule: SuccessRule) -> Self {
        Self {
            name: program.to_string(),
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            rule,
        }
    }
}

/// Availability of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ToolStatus {
    /// Tool ran and satisfied its rule.
    Available,
    /// Tool is not installed.
    Missing,
    /// Tool ran but did not satisfy its rule.
    Failed {
        /// Exit code, absent when killed by a signal.
        code: Option<i32>,
    },
    /// Tool did not exit within the timeout.
    TimedOut,
}

impl ToolStatus {
    /// Returns true for [`ToolStatus::Available`].
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    /// Returns the stable state label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Missing => "missing",
            Self::Failed {
                ..
            } => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Probe result for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolReport {
    /// Display name.
    pub name: String,
    /// Availability.
    pub status: ToolStatus,
}

// ============================================================================
// SECTION: Probing
// ============================================================================

/// Returns the signing and alignment toolchain probes.
#[must_use]
pub fn default_probes() -> Vec<ToolProbe> {
    vec![
        ToolProbe::new("java", &["-version"], SuccessRule::ExitZero),
        ToolProbe::new("keytool", &["-help"], SuccessRule::ExitZero),
        ToolProbe::new("jarsigner", &["-help"], SuccessRule::ExitZero),
        ToolProbe::new("zipalign", &[], SuccessRule::NotMissing),
    ]
}

/// Spawns `probe` and classifies its exit.
#[must_use]
pub fn probe_tool(probe: &ToolProbe, timeout: Duration) -> ToolReport {
    let status = run_probe(probe, timeout);
    debug!(tool = probe.name.as_str(), available = status.is_available(), "tool probed");
    ToolReport {
        name: probe.name.clone(),
        status,
    }
}

/// Runs a probe to completion or timeout.
fn run_probe(probe: &ToolProbe, timeout: Duration) -> ToolStatus {
    let spawned = Command::new(&probe.program)
        .args(&probe.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(err) if err.kind() == ErrorKind::NotFound => return ToolStatus::Missing,
        Err(_) => {
            return ToolStatus::Failed {
                code: None,
            };
        }
    };
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(exit)) => return classify_exit(exit, probe.rule),
            Ok(None) if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                return ToolStatus::TimedOut;
            }
            Ok(None) => thread::sleep(WAIT_STEP),
            Err(_) => {
                let _ = child.kill();
                return ToolStatus::Failed {
                    code: None,
                };
            }
        }
    }
}

/// Classifies a finished probe.
fn classify_exit(exit: ExitStatus, rule: SuccessRule) -> ToolStatus {
    let code = exit.code();
    if code == Some(EXIT_NOT_FOUND) {
        return ToolStatus::Missing;
    }
    match rule {
        SuccessRule::ExitZero if exit.success() => ToolStatus::Available,
        SuccessRule::NotMissing if code.is_some() => ToolStatus::Available,
        SuccessRule::ExitZero | SuccessRule::NotMissing => ToolStatus::Failed {
            code,
        },
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
