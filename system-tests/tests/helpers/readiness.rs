// system-tests/tests/helpers/readiness.rs
// ============================================================================
// Module: Readiness Probes
// Description: Waits for a conversion service to answer before suites run.
// Purpose: Avoid racing the stub thread or a cold live deployment.
// Dependencies: apk-probe-core
// ============================================================================

use std::thread;
use std::time::Duration;
use std::time::Instant;

use apk_probe_core::ServiceClient;

/// Delay between readiness attempts.
const READY_INTERVAL: Duration = Duration::from_millis(50);

/// Polls the stats endpoint until it answers with 200 or `timeout` elapses.
pub fn wait_for_service_ready(client: &ServiceClient, timeout: Duration) -> Result<(), String> {
    let deadline = Instant::now() + timeout;
    let mut last_error = String::from("no attempt made");
    loop {
        match client.stats() {
            Ok(reply) if reply.is_ok() => return Ok(()),
            Ok(reply) => last_error = format!("stats answered {}", reply.status),
            Err(err) => last_error = err.to_string(),
        }
        if Instant::now() >= deadline {
            return Err(format!("service not ready after {timeout:?}: {last_error}"));
        }
        thread::sleep(READY_INTERVAL);
    }
}
