// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Probe Harness
// Description: Builds probe configs and clients for the stub or a live target.
// Purpose: Provide deterministic target startup and teardown for tests.
// Dependencies: system-tests, apk-probe-core
// ============================================================================

use std::time::Duration;

use apk_probe_core::ProbeConfig;
use apk_probe_core::ServiceClient;
use system_tests::config::SystemTestConfig;

use super::readiness::wait_for_service_ready;
use super::stub_service::StubBehavior;
use super::stub_service::StubService;
use super::timeouts::resolve_timeout;
use super::timeouts::resolve_timeout_ms;

/// Stub polling interval.
const STUB_POLL_INTERVAL_MS: u64 = 20;

/// Service under test plus a ready client.
pub struct ProbeHarness {
    config: ProbeConfig,
    client: ServiceClient,
    stub: Option<StubService>,
}

impl ProbeHarness {
    /// Starts a stub with `behavior` and builds a client for it.
    pub fn stub(behavior: StubBehavior) -> Result<Self, String> {
        let max_upload = u64::try_from(behavior.max_upload_bytes)
            .map_err(|err| format!("stub upload limit: {err}"))?;
        let stub = StubService::spawn(behavior)?;
        let config = stub_config(stub.base_url(), max_upload)?;
        Self::connect(config, Some(stub))
    }

    /// Targets the live service when configured, otherwise a default stub.
    pub fn from_env() -> Result<Self, String> {
        let env = SystemTestConfig::load()?;
        match env.base_url {
            Some(base_url) => Self::connect(live_config(&base_url)?, None),
            None => Self::stub(StubBehavior::default()),
        }
    }

    fn connect(config: ProbeConfig, stub: Option<StubService>) -> Result<Self, String> {
        let client = ServiceClient::new(&config).map_err(|err| err.to_string())?;
        wait_for_service_ready(&client, resolve_timeout(Duration::from_secs(5)))?;
        Ok(Self {
            config,
            client,
            stub,
        })
    }

    /// Returns the probe configuration in use.
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Returns the service client.
    pub const fn client(&self) -> &ServiceClient {
        &self.client
    }

    /// Returns the stub, when the harness is not targeting a live service.
    pub const fn stub_service(&self) -> Option<&StubService> {
        self.stub.as_ref()
    }

    /// Returns true when targeting a live service.
    pub const fn is_live(&self) -> bool {
        self.stub.is_none()
    }

    /// Returns the base URL of the service under test.
    pub fn base_url(&self) -> &str {
        &self.config.service.base_url
    }
}

/// Returns true when scripted-failure suites must be skipped.
pub fn live_target_configured() -> Result<bool, String> {
    Ok(SystemTestConfig::load()?.is_live())
}

/// Builds a probe config tuned for the stub: fast polling and a small upload cap.
pub fn stub_config(base_url: &str, max_upload_bytes: u64) -> Result<ProbeConfig, String> {
    let mut config = ProbeConfig::default();
    config.set_base_url(base_url);
    config.polling.interval_ms = STUB_POLL_INTERVAL_MS;
    config.polling.max_wait_ms = resolve_timeout_ms(Duration::from_secs(5));
    config.limits.max_upload_bytes = max_upload_bytes;
    config.timeouts.submit_ms = resolve_timeout_ms(Duration::from_secs(5));
    config.timeouts.status_ms = resolve_timeout_ms(Duration::from_secs(2));
    config.timeouts.download_ms = resolve_timeout_ms(Duration::from_secs(5));
    config.timeouts.diagnostic_ms = resolve_timeout_ms(Duration::from_secs(2));
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}

/// Builds a probe config for a live target using default budgets.
fn live_config(base_url: &str) -> Result<ProbeConfig, String> {
    let mut config = ProbeConfig::default();
    config.set_base_url(base_url);
    config.validate().map_err(|err| err.to_string())?;
    Ok(config)
}
