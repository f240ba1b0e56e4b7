// crates/apk-probe-core/src/client.rs
// ============================================================================
// Module: Service Client
// Description: Blocking HTTP client for the conversion service contract.
// Purpose: Issue submit, status, download, and diagnostic calls with caps.
// Dependencies: reqwest, serde_json, tracing, url
// ============================================================================

//! ## Overview
//! [`ServiceClient`] wraps a blocking `reqwest` client bound to the service
//! API base. Each call carries its own timeout from [`TimeoutConfig`] and
//! returns an [`ApiReply`] holding the status code, elapsed time, selected
//! headers, and raw body bytes. Callers decide what a status code means.
//!
//! Security posture: responses are untrusted. Redirects are never followed,
//! bodies are read with hard size caps (declared `Content-Length` is checked
//! before reading), and path segments are percent-encoded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;
use std::time::Instant;

use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::blocking::multipart::Form;
use reqwest::blocking::multipart::Part;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::redirect::Policy;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::artifact::Upload;
use crate::config::LimitConfig;
use crate::config::ProbeConfig;
use crate::config::TimeoutConfig;
use crate::job::ErrorBody;
use crate::job::JobSnapshot;
use crate::poll::StatusSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Multipart field carrying the package upload.
pub const UPLOAD_FIELD: &str = "apk";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by service calls.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - HTTP status codes are never errors; they are reported in [`ApiReply`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client or endpoint configuration is unusable.
    #[error("client configuration invalid: {0}")]
    Config(String),
    /// Connection or protocol failure.
    #[error("transport failure: {0}")]
    Transport(String),
    /// Request exceeded its timeout.
    #[error("request timed out after {timeout_ms} ms")]
    Timeout {
        /// Timeout applied to the call.
        timeout_ms: u64,
    },
    /// Body did not decode as the expected JSON shape.
    #[error("response json invalid: {0}")]
    Json(String),
    /// Body exceeded the configured cap.
    #[error("response exceeds size limit of {limit} bytes")]
    ResponseTooLarge {
        /// Applied cap in bytes.
        limit: u64,
    },
    /// Body ended before the declared length.
    #[error("response truncated ({actual} of {expected} bytes)")]
    Truncated {
        /// Bytes received.
        actual: u64,
        /// Bytes declared by `Content-Length`.
        expected: u64,
    },
}

// ============================================================================
// SECTION: Replies
// ============================================================================

/// Raw reply of one service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    /// HTTP status code.
    pub status: u16,
    /// Wall time from send to end of body.
    pub elapsed: Duration,
    /// `Content-Type` header, when present and ASCII.
    pub content_type: Option<String>,
    /// Declared `Content-Length`, when present.
    pub content_length: Option<u64>,
    /// `Content-Disposition` header, when present and ASCII.
    pub content_disposition: Option<String>,
    /// Raw body bytes (bounded).
    pub body: Vec<u8>,
}

impl ApiReply {
    /// Returns true for HTTP 200.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Json`] when the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|err| ClientError::Json(err.to_string()))
    }

    /// Returns the `error` field of a JSON error body, when present.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_slice::<ErrorBody>(&self.body).ok().map(|body| body.error)
    }

    /// Returns the body decoded lossily as UTF-8.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns the error message, or the lossy body text when absent.
    #[must_use]
    pub fn error_or_body(&self) -> String {
        self.error_message().unwrap_or_else(|| self.text_lossy())
    }

    /// Returns the elapsed time in whole milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Interpreted reply of a status query.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReply {
    /// HTTP 200 with a decoded job snapshot.
    Snapshot(JobSnapshot),
    /// Any other status code.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Service error message or raw body text.
        message: String,
    },
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking client for the conversion service.
///
/// # Invariants
/// - All URLs are derived from `api_base`; callers never supply raw URLs.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    /// Underlying HTTP client (no redirects).
    client: Client,
    /// Base URL including the API prefix.
    api_base: Url,
    /// Per-call timeouts.
    timeouts: TimeoutConfig,
    /// Body size caps.
    limits: LimitConfig,
}

impl ServiceClient {
    /// Builds a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the base URL is unusable or the
    /// HTTP client cannot be built.
    pub fn new(config: &ProbeConfig) -> Result<Self, ClientError> {
        let api_base =
            config.service.api_base().map_err(|err| ClientError::Config(err.to_string()))?;
        if api_base.cannot_be_a_base() {
            return Err(ClientError::Config("service base url cannot carry paths".to_string()));
        }
        let client = Client::builder()
            .user_agent(config.service.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ClientError::Config(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            api_base,
            timeouts: config.timeouts.clone(),
            limits: config.limits.clone(),
        })
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Submits a package upload as multipart field `apk`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, timeout, or body-limit failures.
    pub fn submit(&self, upload: Upload) -> Result<ApiReply, ClientError> {
        let Upload {
            file_name,
            mime,
            bytes,
        } = upload;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&mime)
            .map_err(|err| ClientError::Config(format!("invalid upload mime: {err}")))?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let url = self.endpoint(&["convert"])?;
        let request = self.client.post(url.clone()).multipart(form);
        self.execute("POST", &url, request, self.timeouts.submit(), self.limits.max_json_bytes)
    }

    /// Submits a multipart form that carries no file field.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, timeout, or body-limit failures.
    pub fn submit_without_file(&self) -> Result<ApiReply, ClientError> {
        let url = self.endpoint(&["convert"])?;
        let request = self.client.post(url.clone()).multipart(Form::new());
        self.execute("POST", &url, request, self.timeouts.diagnostic(), self.limits.max_json_bytes)
    }

    /// Queries job status and returns the raw reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, timeout, or body-limit failures.
    pub fn status(&self, job_id: &str) -> Result<ApiReply, ClientError> {
        let url = self.endpoint(&["status", job_id])?;
        let request = self.client.get(url.clone());
        self.execute("GET", &url, request, self.timeouts.status(), self.limits.max_json_bytes)
    }

    /// Queries job status and interprets the reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport failures or when a 200 body does
    /// not decode as a job snapshot.
    pub fn job_status(&self, job_id: &str) -> Result<StatusReply, ClientError> {
        let reply = self.status(job_id)?;
        if reply.is_ok() {
            return Ok(StatusReply::Snapshot(reply.json()?));
        }
        Ok(StatusReply::Rejected {
            status: reply.status,
            message: reply.error_or_body(),
        })
    }

    /// Downloads a produced artifact by file name.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, timeout, or body-limit failures.
    pub fn download(&self, file_name: &str) -> Result<ApiReply, ClientError> {
        let url = self.endpoint(&["download", file_name])?;
        let request = self.client.get(url.clone());
        self.execute("GET", &url, request, self.timeouts.download(), self.limits.max_download_bytes)
    }

    /// Fetches aggregate job counters.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, timeout, or body-limit failures.
    pub fn stats(&self) -> Result<ApiReply, ClientError> {
        let url = self.endpoint(&["stats"])?;
        let request = self.client.get(url.clone());
        self.execute("GET", &url, request, self.timeouts.diagnostic(), self.limits.max_json_bytes)
    }

    /// Runs the storage backend connectivity check.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] on transport, timeout, or body-limit failures.
    pub fn storage_check(&self) -> Result<ApiReply, ClientError> {
        let url = self.endpoint(&["test-mongodb"])?;
        let request = self.client.get(url.clone());
        self.execute("GET", &url, request, self.timeouts.diagnostic(), self.limits.max_json_bytes)
    }

    /// Builds an endpoint URL by appending percent-encoded segments.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::Config("service base url cannot carry paths".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends a request and reads the bounded reply.
    fn execute(
        &self,
        method: &'static str,
        url: &Url,
        request: RequestBuilder,
        timeout: Duration,
        limit: u64,
    ) -> Result<ApiReply, ClientError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let started = Instant::now();
        let mut response =
            request.timeout(timeout).send().map_err(|err| classify(&err, timeout_ms))?;
        let status = response.status().as_u16();
        let content_type = header_text(response.headers(), &CONTENT_TYPE);
        let content_disposition = header_text(response.headers(), &CONTENT_DISPOSITION);
        let content_length = response.content_length();
        let body = read_response_limited(&mut response, limit, timeout_ms)?;
        let elapsed = started.elapsed();
        debug!(
            method,
            path = url.path(),
            status,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            bytes = body.len(),
            "service call completed"
        );
        Ok(ApiReply {
            status,
            elapsed,
            content_type,
            content_length,
            content_disposition,
            body,
        })
    }
}

impl StatusSource for ServiceClient {
    fn fetch_status(&self, job_id: &str) -> Result<StatusReply, ClientError> {
        self.job_status(job_id)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a reqwest error to a client error.
fn classify(err: &reqwest::Error, timeout_ms: u64) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout {
            timeout_ms,
        }
    } else {
        ClientError::Transport(err.to_string())
    }
}

/// Returns a header value when present and visible ASCII.
fn header_text(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(ToString::to_string)
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    limit: u64,
    timeout_ms: u64,
) -> Result<Vec<u8>, ClientError> {
    let expected_len = response.content_length();
    if let Some(expected) = expected_len
        && expected > limit
    {
        return Err(ClientError::ResponseTooLarge {
            limit,
        });
    }
    let mut buf = Vec::new();
    response.take(limit.saturating_add(1)).read_to_end(&mut buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::TimedOut {
            ClientError::Timeout {
                timeout_ms,
            }
        } else {
            ClientError::Transport(format!("failed to read response: {err}"))
        }
    })?;
    let actual = u64::try_from(buf.len()).unwrap_or(u64::MAX);
    if actual > limit {
        return Err(ClientError::ResponseTooLarge {
            limit,
        });
    }
    if let Some(expected) = expected_len
        && actual < expected
    {
        return Err(ClientError::Truncated {
            actual,
            expected,
        });
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
