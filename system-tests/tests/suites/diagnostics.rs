// system-tests/tests/suites/diagnostics.rs
// ============================================================================
// Module: Diagnostics Tests
// Description: Storage diagnostics and environment audit coverage.
// Purpose: Ensure backend failures and hung calls are distinguished.
// Dependencies: apk-probe-core, helpers
// ============================================================================

//! ## Overview
//! The sentinel status query separates a reachable backend (404), a backend
//! connection failure (500), and a hung call (client timeout). The
//! environment audit never leaks credential values.

use std::error::Error;
use std::time::Duration;

use apk_probe_core::EnvAudit;
use apk_probe_core::ResultLedger;
use apk_probe_core::ServiceClient;
use apk_probe_core::SuiteEvent;
use apk_probe_core::config::EnvAuditConfig;
use apk_probe_core::suite;
use apk_probe_core::suite::SilentObserver;
use helpers::artifacts::TestReporter;
use helpers::harness::ProbeHarness;
use helpers::harness::live_target_configured;
use helpers::stub_service::StubBehavior;

use crate::helpers;

fn message_of<'a>(ledger: &'a ResultLedger, name: &str) -> Result<(bool, &'a str), String> {
    ledger
        .entries()
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| (entry.passed, entry.message.as_str()))
        .ok_or_else(|| format!("{name} not recorded"))
}

#[test]
fn diagnostics_pass_when_backend_reachable() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("diagnostics_pass_when_backend_reachable")?;
    let harness = ProbeHarness::from_env()?;

    let mut timed = Vec::new();
    let mut observer = |event: &SuiteEvent<'_>| {
        if let SuiteEvent::DiagnosticTimed {
            name, ..
        } = event
        {
            timed.push((*name).to_string());
        }
    };
    let ledger = suite::diagnostics(harness.client(), &mut observer);
    let artifacts = reporter.artifacts().write_ledger(&ledger, "diagnostics", 100)?;

    if !ledger.all_passed() || ledger.total() != 2 {
        return Err(format!("diagnostics failed: {:?}", ledger.entries()).into());
    }
    if timed != ["diagnostics.sentinel_status", "diagnostics.submit_without_file"] {
        return Err(format!("timing events missing: {timed:?}").into());
    }

    reporter.finish(
        "pass",
        vec!["sentinel status answers 404 and an empty submit answers 400".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn diagnostics_flag_backend_failure() -> Result<(), Box<dyn Error>> {
    if live_target_configured()? {
        return Ok(());
    }
    let mut reporter = TestReporter::new("diagnostics_flag_backend_failure")?;
    let harness = ProbeHarness::stub(StubBehavior {
        backend_failure: true,
        ..StubBehavior::default()
    })?;

    let ledger = suite::diagnostics(harness.client(), &mut SilentObserver);
    let artifacts = reporter.artifacts().write_ledger(&ledger, "diagnostics", 100)?;

    let (passed, message) = message_of(&ledger, "diagnostics.sentinel_status")?;
    if passed || !message.contains("backend connection failure") {
        return Err(format!("500 not reported as backend failure: {message}").into());
    }
    if !message_of(&ledger, "diagnostics.submit_without_file")?.0 {
        return Err("submit diagnostic should still pass".into());
    }

    reporter.finish(
        "pass",
        vec!["a 500 sentinel reply is reported as a backend connection failure".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn diagnostics_flag_hung_status_call() -> Result<(), Box<dyn Error>> {
    if live_target_configured()? {
        return Ok(());
    }
    let mut reporter = TestReporter::new("diagnostics_flag_hung_status_call")?;
    let harness = ProbeHarness::stub(StubBehavior {
        status_delay: Duration::from_millis(1_500),
        ..StubBehavior::default()
    })?;
    let mut config = harness.config().clone();
    config.timeouts.status_ms = 200;
    let client = ServiceClient::new(&config)?;

    let ledger = suite::diagnostics(&client, &mut SilentObserver);
    let artifacts = reporter.artifacts().write_ledger(&ledger, "diagnostics", 100)?;

    let (passed, message) = message_of(&ledger, "diagnostics.sentinel_status")?;
    if passed || !message.contains("request hung") {
        return Err(format!("timeout not reported as a hang: {message}").into());
    }

    reporter.finish("pass", vec![format!("hung status call: {message}")], artifacts)?;
    drop(reporter);
    Ok(())
}

#[test]
fn env_audit_reports_presence_without_values() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("env_audit_reports_presence_without_values")?;
    let audit = EnvAudit::from_config(&EnvAuditConfig {
        required: vec!["PROBE_PUBLIC_PROJECT".to_string(), "PROBE_PUBLIC_BUCKET".to_string()],
        credentials: vec!["PROBE_SERVICE_KEY".to_string(), "PROBE_SERVICE_TOKEN".to_string()],
    });
    let lookup = |name: &str| match name {
        "PROBE_PUBLIC_PROJECT" => Some("apk-converter-prod".to_string()),
        "PROBE_PUBLIC_BUCKET" => Some("bucket".to_string()),
        "PROBE_SERVICE_TOKEN" => Some("super-secret-token-value".to_string()),
        _ => None,
    };

    let report = audit.run_with(lookup);
    let ledger = suite::env_audit_check(&report, &mut SilentObserver);
    let artifacts = reporter.artifacts().write_ledger(&ledger, "environment", 100)?;

    if !report.passed() || !ledger.all_passed() {
        return Err(format!("audit failed: {:?}", ledger.entries()).into());
    }
    if report.credentials.iter().any(|var| var.preview.is_some()) {
        return Err("credential preview exposed".into());
    }
    let rendered = serde_json::to_string(&report)?;
    if rendered.contains("super-secret") || rendered.contains("apk-converter-prod") {
        return Err(format!("audit leaked a value: {rendered}").into());
    }

    let missing = audit.run_with(|_| None);
    let ledger = suite::env_audit_check(&missing, &mut SilentObserver);
    if ledger.passed() != 0 || missing.missing_required().len() != 2 {
        return Err(format!("empty environment passed: {:?}", ledger.entries()).into());
    }

    reporter.finish(
        "pass",
        vec!["presence is reported and values stay masked".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}
