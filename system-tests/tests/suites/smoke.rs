// system-tests/tests/suites/smoke.rs
// ============================================================================
// Module: Smoke Tests
// Description: Reachability checks and CLI smoke runs against the service.
// Purpose: Fail fast when the target or the CLI cannot complete a basic run.
// Dependencies: apk-probe-core, tempfile, helpers
// ============================================================================

//! ## Overview
//! Confirms the read-only endpoints answer and the `apk-probe` binary can
//! drive diagnostics and a full backend run against the same target.

use std::error::Error;
use std::fs;

use apk_probe_core::suite;
use apk_probe_core::suite::SilentObserver;
use helpers::artifacts::TestReporter;
use helpers::cli::cli_binary;
use helpers::cli::run_cli;
use helpers::harness::ProbeHarness;
use serde_json::Value;
use tempfile::TempDir;

use crate::helpers;

#[test]
fn smoke_stats_and_storage_answer() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("smoke_stats_and_storage_answer")?;
    let harness = ProbeHarness::from_env()?;

    let mut ledger = suite::storage_check(harness.client(), &mut SilentObserver);
    ledger.extend(suite::stats_check(harness.client(), &mut SilentObserver));
    let artifacts = reporter.artifacts().write_ledger(&ledger, "smoke", 100)?;
    if !ledger.all_passed() {
        return Err(format!("smoke checks failed: {:?}", ledger.entries()).into());
    }
    if let Some(stub) = harness.stub_service() {
        let requests = stub.requests();
        if !requests.iter().any(|line| line == "GET /api/test-mongodb") {
            return Err(format!("storage endpoint not called: {requests:?}").into());
        }
    }

    reporter.finish(
        "pass",
        vec!["storage and stats endpoints answer with decodable bodies".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn smoke_cli_diagnose_passes() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("smoke_cli_diagnose_passes")?;
    let harness = ProbeHarness::from_env()?;
    let binary = cli_binary().ok_or("apk-probe binary unavailable")?;

    let output = run_cli(&binary, &["--base-url", harness.base_url(), "diagnose"])?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    reporter.artifacts().write_text("diagnose.stdout.log", &stdout)?;
    if !output.status.success() {
        return Err(format!(
            "diagnose exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }
    if !stdout.contains("[PASS] diagnostics.sentinel_status") {
        return Err(format!("missing sentinel check in output:\n{stdout}").into());
    }

    reporter.finish(
        "pass",
        vec!["diagnose exits 0 when both diagnostic calls answer promptly".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string(), "diagnose.stdout.log".to_string()],
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn smoke_cli_run_writes_report() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("smoke_cli_run_writes_report")?;
    let harness = ProbeHarness::from_env()?;
    let binary = cli_binary().ok_or("apk-probe binary unavailable")?;
    let temp_dir = TempDir::new()?;
    let config = harness.config();
    let config_path = temp_dir.path().join("apk-probe.toml");
    let config_contents = format!(
        "[service]\nbase_url = \"{}\"\n\n[polling]\ninterval_ms = {}\nmax_wait_ms = {}\n\n[limits]\nmax_upload_bytes = {}\n",
        harness.base_url(),
        config.polling.interval_ms,
        config.polling.max_wait_ms,
        config.limits.max_upload_bytes,
    );
    fs::write(&config_path, config_contents)?;
    let report_dir = temp_dir.path().join("report");

    let config_arg = config_path.to_string_lossy().to_string();
    let report_arg = report_dir.to_string_lossy().to_string();
    let output = run_cli(
        &binary,
        &["--config", &config_arg, "run", "--skip-toolchain", "--report-dir", &report_arg],
    )?;
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    reporter.artifacts().write_text("run.stdout.log", &stdout)?;
    if !output.status.success() {
        return Err(format!("run exited with {:?}:\n{stdout}", output.status.code()).into());
    }
    let summary: Value = serde_json::from_slice(&fs::read(report_dir.join("summary.json"))?)?;
    if summary["met_threshold"] != Value::Bool(true) || summary["suite"] != "backend" {
        return Err(format!("unexpected summary: {summary}").into());
    }
    if !report_dir.join("summary.md").exists() {
        return Err("summary.md missing".into());
    }

    reporter.finish(
        "pass",
        vec!["run --report-dir writes a passing backend summary".to_string()],
        vec!["summary.json".to_string(), "summary.md".to_string(), "run.stdout.log".to_string()],
    )?;
    drop(reporter);
    Ok(())
}
