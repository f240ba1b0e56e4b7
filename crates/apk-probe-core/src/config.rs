// crates/apk-probe-core/src/config.rs
// ============================================================================
// Module: Probe Configuration
// Description: Typed configuration for service endpoints, budgets, and limits.
// Purpose: Provide one source of truth for timeouts, thresholds, and caps.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! Configuration is layered: built-in defaults, an optional TOML file, then
//! environment overrides. Files are size-capped and must be UTF-8; unknown
//! keys are rejected. Environment values are read strictly: invalid UTF-8 or
//! empty values fail closed.
//!
//! ## Invariants
//! - A validated config always has an absolute `http`/`https` base URL.
//! - All durations, limits, and the poll interval are strictly positive.
//! - `polling.max_wait_ms >= polling.interval_ms`.
//! - Thresholds are percentages in `0..=100`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::poll::PollPolicy;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a configuration file, in bytes.
pub const MAX_CONFIG_FILE_BYTES: u64 = 1024 * 1024;
/// Default service base URL (local development server).
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";
/// Default API prefix appended to the base URL.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Public backend variables checked by the environment audit.
const DEFAULT_REQUIRED_ENV: &[&str] = &[
    "NEXT_PUBLIC_FIREBASE_API_KEY",
    "NEXT_PUBLIC_FIREBASE_AUTH_DOMAIN",
    "NEXT_PUBLIC_FIREBASE_PROJECT_ID",
    "NEXT_PUBLIC_FIREBASE_STORAGE_BUCKET",
    "NEXT_PUBLIC_FIREBASE_MESSAGING_SENDER_ID",
    "NEXT_PUBLIC_FIREBASE_APP_ID",
];

/// Service credential variables; at least one must be set.
const DEFAULT_CREDENTIAL_ENV: &[&str] =
    &["FIREBASE_SERVICE_ACCOUNT_KEY", "GOOGLE_APPLICATION_CREDENTIALS"];

// ============================================================================
// SECTION: Environment Keys
// ============================================================================

/// Environment keys recognized by the probe configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEnv {
    /// Optional configuration file path.
    ConfigPath,
    /// Service base URL override.
    BaseUrl,
    /// Base URL variable shared with the service deployment (fallback).
    LegacyBaseUrl,
    /// Timeout override in seconds, applied to every call.
    TimeoutSeconds,
    /// Poll interval override in milliseconds.
    PollIntervalMs,
    /// Maximum poll wait override in seconds.
    MaxWaitSeconds,
}

impl ProbeEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigPath => "APK_PROBE_CONFIG",
            Self::BaseUrl => "APK_PROBE_BASE_URL",
            Self::LegacyBaseUrl => "NEXT_PUBLIC_BASE_URL",
            Self::TimeoutSeconds => "APK_PROBE_TIMEOUT_SEC",
            Self::PollIntervalMs => "APK_PROBE_POLL_INTERVAL_MS",
            Self::MaxWaitSeconds => "APK_PROBE_MAX_WAIT_SEC",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config file read failed: {0}")]
    Io(String),
    /// Config file exceeds [`MAX_CONFIG_FILE_BYTES`].
    #[error("config file exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge {
        /// Observed size in bytes.
        actual: u64,
        /// Maximum size in bytes.
        limit: u64,
    },
    /// Config file is not UTF-8.
    #[error("config file must be utf-8")]
    Utf8,
    /// TOML parsing failed.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// Environment override is invalid.
    #[error("environment override invalid: {0}")]
    Env(String),
    /// Semantic validation failed.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Complete probe configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeConfig {
    /// Service location settings.
    pub service: ServiceConfig,
    /// Per-call timeouts.
    pub timeouts: TimeoutConfig,
    /// Job polling budget.
    pub polling: PollingConfig,
    /// Payload and response size limits.
    pub limits: LimitConfig,
    /// Pass thresholds.
    pub thresholds: ThresholdConfig,
    /// Environment audit variable lists.
    pub env_audit: EnvAuditConfig,
}

/// Service location settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Absolute base URL of the service.
    pub base_url: String,
    /// Path prefix for API routes.
    pub api_prefix: String,
    /// User agent for outbound requests.
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            user_agent: format!("apk-probe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ServiceConfig {
    /// Returns the API base URL (`base_url` joined with `api_prefix`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the base URL cannot be parsed.
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| ConfigError::Invalid(format!("service.base_url: {err}")))?;
        let base_path = url.path().trim_end_matches('/').to_string();
        let prefix = self.api_prefix.trim_end_matches('/');
        url.set_path(&format!("{base_path}{prefix}"));
        url.set_query(None);
        url.set_fragment(None);
        Ok(url)
    }
}

/// Per-call timeouts in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Upload (submit) timeout.
    pub submit_ms: u64,
    /// Status query timeout.
    pub status_ms: u64,
    /// Artifact download timeout.
    pub download_ms: u64,
    /// Diagnostic endpoint timeout.
    pub diagnostic_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            submit_ms: 30_000,
            status_ms: 10_000,
            download_ms: 30_000,
            diagnostic_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    /// Returns the submit timeout.
    #[must_use]
    pub const fn submit(&self) -> Duration {
        Duration::from_millis(self.submit_ms)
    }

    /// Returns the status timeout.
    #[must_use]
    pub const fn status(&self) -> Duration {
        Duration::from_millis(self.status_ms)
    }

    /// Returns the download timeout.
    #[must_use]
    pub const fn download(&self) -> Duration {
        Duration::from_millis(self.download_ms)
    }

    /// Returns the diagnostic timeout.
    #[must_use]
    pub const fn diagnostic(&self) -> Duration {
        Duration::from_millis(self.diagnostic_ms)
    }

    /// Sets every timeout to the same value.
    fn set_all(&mut self, millis: u64) {
        self.submit_ms = millis;
        self.status_ms = millis;
        self.download_ms = millis;
        self.diagnostic_ms = millis;
    }
}

/// Job polling budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    /// Delay between status queries, in milliseconds.
    pub interval_ms: u64,
    /// Maximum total wait, in milliseconds.
    pub max_wait_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            max_wait_ms: 300_000,
        }
    }
}

/// Payload and response size limits in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitConfig {
    /// Documented upload ceiling of the service.
    pub max_upload_bytes: u64,
    /// Maximum accepted download size.
    pub max_download_bytes: u64,
    /// Maximum accepted JSON response size.
    pub max_json_bytes: u64,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 100 * 1024 * 1024,
            max_download_bytes: 200 * 1024 * 1024,
            max_json_bytes: 1024 * 1024,
        }
    }
}

/// Pass thresholds as whole percentages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    /// Minimum success rate of the contract check group.
    pub error_handling: u8,
    /// Minimum overall success rate of a backend run.
    pub overall: u8,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            error_handling: 75,
            overall: 80,
        }
    }
}

/// Variables inspected by the environment audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvAuditConfig {
    /// Variables that must all be set.
    pub required: Vec<String>,
    /// Credential variables; at least one must be set.
    pub credentials: Vec<String>,
}

impl Default for EnvAuditConfig {
    fn default() -> Self {
        Self {
            required: DEFAULT_REQUIRED_ENV.iter().map(ToString::to_string).collect(),
            credentials: DEFAULT_CREDENTIAL_ENV.iter().map(ToString::to_string).collect(),
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl ProbeConfig {
    /// Loads configuration from an optional file, then applies environment overrides.
    ///
    /// When `path` is `None`, `APK_PROBE_CONFIG` is consulted; without either,
    /// built-in defaults are used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, an
    /// environment override is invalid, or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = read_env_nonempty(ProbeEnv::ConfigPath.as_str())?.map(PathBuf::from);
        let resolved = path.map(Path::to_path_buf).or(env_path);
        let mut config = match resolved {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env_with(read_env_nonempty)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML file without applying overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, too large, not
    /// UTF-8, or not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = read_config_text(path)?;
        Self::from_toml_str(&text)
    }

    /// Parses configuration from TOML text without applying overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment overrides using the provided lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] when a value cannot be parsed, or the
    /// lookup error unchanged.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ConfigError>,
    {
        let base_url = match lookup(ProbeEnv::BaseUrl.as_str())? {
            Some(value) => Some(value),
            None => lookup(ProbeEnv::LegacyBaseUrl.as_str())?,
        };
        if let Some(base_url) = base_url {
            self.service.base_url = base_url.trim().to_string();
        }
        if let Some(raw) = lookup(ProbeEnv::TimeoutSeconds.as_str())? {
            let secs = parse_positive(ProbeEnv::TimeoutSeconds.as_str(), &raw)?;
            self.timeouts.set_all(secs.saturating_mul(1_000));
        }
        if let Some(raw) = lookup(ProbeEnv::PollIntervalMs.as_str())? {
            self.polling.interval_ms = parse_positive(ProbeEnv::PollIntervalMs.as_str(), &raw)?;
        }
        if let Some(raw) = lookup(ProbeEnv::MaxWaitSeconds.as_str())? {
            let secs = parse_positive(ProbeEnv::MaxWaitSeconds.as_str(), &raw)?;
            self.polling.max_wait_ms = secs.saturating_mul(1_000);
        }
        Ok(())
    }

    /// Replaces the service base URL.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.service.base_url = base_url.into();
    }

    /// Returns the polling policy derived from the polling budget.
    #[must_use]
    pub const fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.polling.interval_ms),
            Duration::from_millis(self.polling.max_wait_ms),
        )
    }

    /// Validates semantic constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.service.base_url)?;
        let prefix = &self.service.api_prefix;
        if !prefix.starts_with('/') || prefix.contains(['?', '#']) {
            return Err(ConfigError::Invalid(
                "service.api_prefix must start with '/' and contain no query or fragment"
                    .to_string(),
            ));
        }
        if self.service.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid("service.user_agent must not be empty".to_string()));
        }
        for (name, value) in [
            ("timeouts.submit_ms", self.timeouts.submit_ms),
            ("timeouts.status_ms", self.timeouts.status_ms),
            ("timeouts.download_ms", self.timeouts.download_ms),
            ("timeouts.diagnostic_ms", self.timeouts.diagnostic_ms),
            ("polling.interval_ms", self.polling.interval_ms),
            ("polling.max_wait_ms", self.polling.max_wait_ms),
            ("limits.max_upload_bytes", self.limits.max_upload_bytes),
            ("limits.max_download_bytes", self.limits.max_download_bytes),
            ("limits.max_json_bytes", self.limits.max_json_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
            }
        }
        if self.polling.max_wait_ms < self.polling.interval_ms {
            return Err(ConfigError::Invalid(
                "polling.max_wait_ms must be >= polling.interval_ms".to_string(),
            ));
        }
        for (name, value) in [
            ("thresholds.error_handling", self.thresholds.error_handling),
            ("thresholds.overall", self.thresholds.overall),
        ] {
            if value > 100 {
                return Err(ConfigError::Invalid(format!("{name} must be <= 100")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates that the base URL is absolute http(s) without credentials.
fn validate_base_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|err| ConfigError::Invalid(format!("service.base_url is not a url: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid("service.base_url must use http or https".to_string()));
    }
    if url.host_str().is_none() {
        return Err(ConfigError::Invalid("service.base_url must include a host".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ConfigError::Invalid(
            "service.base_url must not embed credentials".to_string(),
        ));
    }
    Ok(())
}

/// Reads a config file with size and UTF-8 enforcement.
fn read_config_text(path: &Path) -> Result<String, ConfigError> {
    let file = File::open(path).map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    let mut bytes = Vec::new();
    file.take(MAX_CONFIG_FILE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
    let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
    if actual > MAX_CONFIG_FILE_BYTES {
        return Err(ConfigError::TooLarge {
            actual,
            limit: MAX_CONFIG_FILE_BYTES,
        });
    }
    String::from_utf8(bytes).map_err(|_| ConfigError::Utf8)
}

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when the variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, ConfigError> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| ConfigError::Env(format!("{name} must be valid UTF-8")))
    })
}

/// Reads an environment variable and rejects empty values.
///
/// # Errors
///
/// Returns [`ConfigError::Env`] when the variable is set but empty or whitespace.
pub fn read_env_nonempty(name: &str) -> Result<Option<String>, ConfigError> {
    match read_env_strict(name)? {
        Some(value) if value.trim().is_empty() => {
            Err(ConfigError::Env(format!("{name} must not be empty")))
        }
        Some(value) => Ok(Some(value)),
        None => Ok(None),
    }
}

/// Parses a strictly positive integer override.
fn parse_positive(name: &str, raw: &str) -> Result<u64, ConfigError> {
    let trimmed = raw.trim();
    let value: u64 = trimmed
        .parse()
        .map_err(|_| ConfigError::Env(format!("{name} must be a positive integer")))?;
    if value == 0 {
        return Err(ConfigError::Env(format!("{name} must be greater than zero")));
    }
    Ok(value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
