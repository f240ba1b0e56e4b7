// system-tests/tests/suites/pipeline.rs
// ============================================================================
// Module: Pipeline Tests
// Description: End-to-end conversion runs through submit, poll, and download.
// Purpose: Ensure step ordering, failure surfacing, and skip logic hold.
// Dependencies: apk-probe-core, helpers
// ============================================================================

//! ## Overview
//! Drives the conversion pipeline and the backend run against the service.
//! Scripted-failure scenarios only run against the stub.

use std::error::Error;

use apk_probe_core::PollOutcome;
use apk_probe_core::ResultLedger;
use apk_probe_core::SignatureExpectation;
use apk_probe_core::SuiteEvent;
use apk_probe_core::suite;
use apk_probe_core::suite::BackendOptions;
use apk_probe_core::suite::SilentObserver;
use helpers::artifacts::TestReporter;
use helpers::harness::ProbeHarness;
use helpers::harness::live_target_configured;
use helpers::stub_service::StubBehavior;

use crate::helpers;

fn entry_names(ledger: &ResultLedger) -> Vec<&str> {
    ledger.entries().iter().map(|entry| entry.name.as_str()).collect()
}

fn find_entry<'a>(
    ledger: &'a ResultLedger,
    name: &str,
) -> Result<&'a apk_probe_core::LedgerEntry, String> {
    ledger
        .entries()
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| format!("{name} not recorded: {:?}", entry_names(ledger)))
}

#[test]
fn pipeline_completes_and_validates() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("pipeline_completes_and_validates")?;
    let harness = ProbeHarness::from_env()?;

    let mut submitted = None;
    let mut attempts = Vec::new();
    let mut observer = |event: &SuiteEvent<'_>| match event {
        SuiteEvent::Submitted {
            job_id,
        } => submitted = Some((*job_id).to_string()),
        SuiteEvent::Progress {
            attempt, ..
        } => attempts.push(*attempt),
        _ => {}
    };
    let ledger = suite::pipeline(
        harness.client(),
        harness.config(),
        SignatureExpectation::Either,
        &mut observer,
    );
    let artifacts = reporter.artifacts().write_ledger(&ledger, "pipeline", 100)?;

    let expected =
        ["pipeline.build", "pipeline.submit", "pipeline.poll", "pipeline.download", "pipeline.validate"];
    if entry_names(&ledger) != expected || !ledger.all_passed() {
        return Err(format!("pipeline did not pass: {:?}", ledger.entries()).into());
    }
    let job_id = submitted.ok_or("no submitted event")?;
    if attempts.is_empty() || attempts.windows(2).any(|pair| pair[1] != pair[0] + 1) {
        return Err(format!("poll attempts not sequential: {attempts:?}").into());
    }
    if let Some(stub) = harness.stub_service() {
        let requests = stub.requests();
        let status_calls = requests
            .iter()
            .filter(|line| **line == format!("GET /api/status/{job_id}"))
            .count();
        if status_calls != 3 || !requests.iter().any(|line| line.starts_with("GET /api/download/")) {
            return Err(format!("unexpected request sequence: {requests:?}").into());
        }
    }

    reporter.finish(
        "pass",
        vec![format!("job {job_id} completed and validated after {} polls", attempts.len())],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn pipeline_failed_job_surfaces_logs() -> Result<(), Box<dyn Error>> {
    if live_target_configured()? {
        return Ok(());
    }
    let mut reporter = TestReporter::new("pipeline_failed_job_surfaces_logs")?;
    let harness = ProbeHarness::stub(StubBehavior {
        fail_job: true,
        ..StubBehavior::default()
    })?;

    let ledger =
        suite::pipeline(harness.client(), harness.config(), SignatureExpectation::Either, &mut SilentObserver);
    let artifacts = reporter.artifacts().write_ledger(&ledger, "pipeline", 100)?;

    if entry_names(&ledger) != ["pipeline.build", "pipeline.submit", "pipeline.poll"] {
        return Err(format!("steps after a failed poll were attempted: {:?}", ledger.entries()).into());
    }
    let poll = find_entry(&ledger, "pipeline.poll")?;
    if poll.passed
        || !poll.message.contains("Signing failed")
        || !poll.message.contains("jarsigner: keystore not found")
    {
        return Err(format!("failure not surfaced: {}", poll.message).into());
    }

    reporter.finish(
        "pass",
        vec!["service error text and trailing logs reach the ledger".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn pipeline_flags_missing_signature_dir() -> Result<(), Box<dyn Error>> {
    if live_target_configured()? {
        return Ok(());
    }
    let mut reporter = TestReporter::new("pipeline_flags_missing_signature_dir")?;
    let harness = ProbeHarness::stub(StubBehavior {
        signed_output: false,
        ..StubBehavior::default()
    })?;

    let present = suite::pipeline(
        harness.client(),
        harness.config(),
        SignatureExpectation::Present,
        &mut SilentObserver,
    );
    let absent = suite::pipeline(
        harness.client(),
        harness.config(),
        SignatureExpectation::Absent,
        &mut SilentObserver,
    );
    let artifacts = reporter.artifacts().write_ledger(&present, "pipeline", 100)?;

    if find_entry(&present, "pipeline.validate")?.passed {
        return Err("unsigned output passed a present expectation".into());
    }
    if !absent.all_passed() {
        return Err(format!("unsigned output failed an absent expectation: {:?}", absent.entries()).into());
    }

    reporter.finish(
        "pass",
        vec!["signing directory expectation is enforced in both directions".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn pipeline_times_out_on_stuck_job() -> Result<(), Box<dyn Error>> {
    if live_target_configured()? {
        return Ok(());
    }
    let mut reporter = TestReporter::new("pipeline_times_out_on_stuck_job")?;
    let harness = ProbeHarness::stub(StubBehavior {
        polls_until_complete: u32::MAX,
        ..StubBehavior::default()
    })?;
    let mut config = harness.config().clone();
    config.polling.interval_ms = 20;
    config.polling.max_wait_ms = 200;

    let ledger =
        suite::pipeline(harness.client(), &config, SignatureExpectation::Either, &mut SilentObserver);
    let artifacts = reporter.artifacts().write_ledger(&ledger, "pipeline", 100)?;

    let poll = find_entry(&ledger, "pipeline.poll")?;
    if poll.passed || !poll.message.contains("no terminal state") {
        return Err(format!("stuck job not reported as timed out: {}", poll.message).into());
    }

    reporter.finish("pass", vec![format!("poll budget exhausted: {}", poll.message)], artifacts)?;
    drop(reporter);
    Ok(())
}

#[test]
fn poll_existing_rejects_unknown_job() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("poll_existing_rejects_unknown_job")?;
    let harness = ProbeHarness::from_env()?;

    let (ledger, outcome) = suite::poll_existing(
        harness.client(),
        harness.config(),
        "invalid-job-id",
        &mut SilentObserver,
    );
    let artifacts = reporter.artifacts().write_ledger(&ledger, "poll", 100)?;

    match outcome {
        PollOutcome::Rejected {
            status: 404,
            attempts: 1,
            ..
        } => {}
        other => return Err(format!("unexpected outcome: {other:?}").into()),
    }
    if ledger.passed() != 0 || ledger.total() != 1 {
        return Err(format!("unexpected ledger: {:?}", ledger.entries()).into());
    }

    reporter.finish(
        "pass",
        vec!["a 404 status reply ends polling on the first attempt".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn backend_run_meets_overall_threshold() -> Result<(), Box<dyn Error>> {
    let mut reporter = TestReporter::new("backend_run_meets_overall_threshold")?;
    let harness = ProbeHarness::from_env()?;
    let options = BackendOptions {
        include_toolchain: false,
        ..BackendOptions::default()
    };

    let ledger = suite::backend_run(harness.client(), harness.config(), &options, &mut SilentObserver);
    let threshold = harness.config().thresholds.overall;
    let artifacts = reporter.artifacts().write_ledger(&ledger, "backend", threshold)?;

    if !ledger.meets(threshold) {
        return Err(format!("backend run below threshold: {:?}", ledger.entries()).into());
    }
    if entry_names(&ledger).iter().any(|name| name.starts_with("toolchain")) {
        return Err("toolchain recorded although excluded".into());
    }

    reporter.finish(
        "pass",
        vec![format!("{}/{} checks passed", ledger.passed(), ledger.total())],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}

#[test]
fn backend_run_skips_pipeline_without_storage() -> Result<(), Box<dyn Error>> {
    if live_target_configured()? {
        return Ok(());
    }
    let mut reporter = TestReporter::new("backend_run_skips_pipeline_without_storage")?;
    let harness = ProbeHarness::stub(StubBehavior {
        storage_ok: false,
        ..StubBehavior::default()
    })?;
    let skipped_options = BackendOptions {
        include_toolchain: false,
        ..BackendOptions::default()
    };
    let forced_options = BackendOptions {
        force_pipeline: true,
        ..skipped_options.clone()
    };

    let skipped =
        suite::backend_run(harness.client(), harness.config(), &skipped_options, &mut SilentObserver);
    let forced =
        suite::backend_run(harness.client(), harness.config(), &forced_options, &mut SilentObserver);
    let artifacts = reporter.artifacts().write_ledger(&skipped, "backend", 80)?;

    let marker = find_entry(&skipped, "pipeline")?;
    if marker.passed || marker.message != "skipped: storage backend unavailable" {
        return Err(format!("pipeline not skipped: {}", marker.message).into());
    }
    if entry_names(&skipped).contains(&"pipeline.submit") {
        return Err("pipeline steps ran after storage failed".into());
    }
    let forced_pipeline = find_entry(&forced, "pipeline")?;
    if !forced_pipeline.passed {
        return Err(format!("forced pipeline failed: {}", forced_pipeline.message).into());
    }
    if entry_names(&forced).iter().any(|name| name.starts_with("pipeline.")) {
        return Err(format!("pipeline steps leaked into backend ledger: {:?}", entry_names(&forced)).into());
    }

    reporter.finish(
        "pass",
        vec!["storage failure skips the pipeline unless forced".to_string()],
        artifacts,
    )?;
    drop(reporter);
    Ok(())
}
