// system-tests/tests/helpers/stub_service.rs
// ============================================================================
// Module: Conversion Service Stub
// Description: In-process axum stub of the remote conversion contract.
// Purpose: Run the probe suites hermetically with scripted service behavior.
// Dependencies: axum, tokio, apk-probe-core
// ============================================================================

//! ## Overview
//! Serves `/api/convert`, `/api/status/{id}`, `/api/download/{name}`,
//! `/api/stats`, and `/api/test-mongodb` on a loopback port from a dedicated
//! thread with its own current-thread runtime, so blocking probe clients can
//! call it from plain `#[test]` functions. Behavior is scripted through
//! [`StubBehavior`].

use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use apk_probe_core::PackageBuilder;
use apk_probe_core::artifact::APK_MIME;
use axum::Json;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::State;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Builder;
use tokio::sync::oneshot;
use tokio::time::sleep;

/// Log lines emitted as a job advances, one per poll.
const STEP_LOGS: &[&str] = &[
    "Upload received",
    "Extracting APK",
    "Patching manifest for debugging",
    "Rebuilding APK",
    "Signing APK",
    "Aligning APK",
];

/// Scripted stub behavior.
#[derive(Debug, Clone)]
pub struct StubBehavior {
    /// Status poll on which a job reaches its terminal state.
    pub polls_until_complete: u32,
    /// Finish jobs with `error` instead of `completed`.
    pub fail_job: bool,
    /// Storage connectivity check result.
    pub storage_ok: bool,
    /// Upload ceiling in bytes; larger uploads get 400 "too large".
    pub max_upload_bytes: usize,
    /// Include `META-INF/` in converted output.
    pub signed_output: bool,
    /// Answer unknown status ids with 500 instead of 404.
    pub backend_failure: bool,
    /// Delay applied before answering any status request.
    pub status_delay: Duration,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            polls_until_complete: 3,
            fail_job: false,
            storage_ok: true,
            max_upload_bytes: 64 * 1024,
            signed_output: true,
            backend_failure: false,
            status_delay: Duration::ZERO,
        }
    }
}

/// Per-job bookkeeping.
#[derive(Debug)]
struct JobEntry {
    /// Uploaded file name.
    source_name: String,
    /// Status polls answered so far.
    polls: u32,
    /// Terminal outcome once reached.
    finished: Option<bool>,
}

/// Mutable stub state.
#[derive(Debug, Default)]
struct Jobs {
    /// Counter for issued job ids.
    next_id: u64,
    /// Jobs by id.
    entries: HashMap<String, JobEntry>,
    /// Produced outputs by file name.
    outputs: HashMap<String, Vec<u8>>,
}

/// Shared handler state.
#[derive(Clone)]
struct StubState {
    /// Scripted behavior.
    behavior: Arc<StubBehavior>,
    /// Job table.
    jobs: Arc<Mutex<Jobs>>,
    /// Request log as `METHOD path` lines.
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubState {
    /// Appends a request line to the log.
    fn record(&self, line: String) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(line);
        }
    }
}

/// Handle for the running stub; shuts the server down on drop.
pub struct StubService {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: Option<thread::JoinHandle<()>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubService {
    /// Starts the stub on an ephemeral loopback port.
    pub fn spawn(behavior: StubBehavior) -> Result<Self, String> {
        let listener = StdTcpListener::bind("127.0.0.1:0")
            .map_err(|err| format!("service stub bind failed: {err}"))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| format!("service stub listener nonblocking failed: {err}"))?;
        let addr =
            listener.local_addr().map_err(|err| format!("service stub local addr failed: {err}"))?;
        let body_limit = behavior.max_upload_bytes.saturating_mul(2).saturating_add(64 * 1024);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = StubState {
            behavior: Arc::new(behavior),
            jobs: Arc::new(Mutex::new(Jobs::default())),
            requests: Arc::clone(&requests),
        };
        let app = Router::new()
            .route("/api/convert", post(handle_convert))
            .route("/api/status/{job_id}", get(handle_status))
            .route("/api/download/{file_name}", get(handle_download))
            .route("/api/stats", get(handle_stats))
            .route("/api/test-mongodb", get(handle_storage))
            .layer(DefaultBodyLimit::max(body_limit))
            .with_state(state);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let join = thread::spawn(move || {
            let Ok(runtime) = Builder::new_current_thread().enable_all().build() else {
                return;
            };
            runtime.block_on(async move {
                let Ok(listener) = tokio::net::TcpListener::from_std(listener) else {
                    return;
                };
                let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                });
                let _ = server.await;
            });
        });
        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
            join: Some(join),
            requests,
        })
    }

    /// Returns the service base URL (without the `/api` prefix).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns `METHOD path` lines for every request served so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map_or_else(|_| Vec::new(), |entries| entries.clone())
    }
}

impl Drop for StubService {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// JSON `{"error": message}` reply with `status`.
fn error_reply(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `POST /api/convert`: validates the upload and queues a job.
async fn handle_convert(
    State(state): State<StubState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    state.record("POST /api/convert".to_string());
    let Ok(mut multipart) = multipart else {
        return error_reply(StatusCode::BAD_REQUEST, "No APK file provided");
    };
    let limit = state.behavior.max_upload_bytes;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return error_reply(StatusCode::BAD_REQUEST, "No APK file provided"),
            Err(err) => return multipart_failure(&err, limit),
        };
        if field.name() != Some("apk") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if !file_name.to_ascii_lowercase().ends_with(".apk") {
            return error_reply(
                StatusCode::BAD_REQUEST,
                "Invalid file type. Only APK files are allowed.",
            );
        }
        let size = match field.bytes().await {
            Ok(bytes) => bytes.len(),
            Err(err) => return multipart_failure(&err, limit),
        };
        if size > limit {
            return too_large(limit);
        }
        let Ok(mut jobs) = state.jobs.lock() else {
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "state poisoned");
        };
        jobs.next_id = jobs.next_id.saturating_add(1);
        let job_id = format!("job-{}", jobs.next_id);
        jobs.entries.insert(
            job_id.clone(),
            JobEntry {
                source_name: file_name,
                polls: 0,
                finished: None,
            },
        );
        return Json(json!({ "jobId": job_id })).into_response();
    }
}

/// 400 reply for an upload over `limit` bytes.
fn too_large(limit: usize) -> Response {
    error_reply(
        StatusCode::BAD_REQUEST,
        &format!("File too large. Maximum size is {limit} bytes."),
    )
}

/// Maps a multipart read failure onto the service's 400 replies.
fn multipart_failure(err: &MultipartError, limit: usize) -> Response {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        error_reply(StatusCode::BAD_REQUEST, "No APK file provided")
    }
}

/// `GET /api/status/{job_id}`: advances and reports a job.
async fn handle_status(State(state): State<StubState>, Path(job_id): Path<String>) -> Response {
    state.record(format!("GET /api/status/{job_id}"));
    if !state.behavior.status_delay.is_zero() {
        sleep(state.behavior.status_delay).await;
    }
    let behavior = Arc::clone(&state.behavior);
    let Ok(mut jobs) = state.jobs.lock() else {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "state poisoned");
    };
    let Some(entry) = jobs.entries.get_mut(&job_id) else {
        if behavior.backend_failure {
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Failed to connect to Firebase");
        }
        return error_reply(StatusCode::NOT_FOUND, "Job not found");
    };
    entry.polls = entry.polls.saturating_add(1);
    let polls = entry.polls;
    let shown = usize::try_from(polls).unwrap_or(usize::MAX).min(STEP_LOGS.len());
    let logs: Vec<&str> = STEP_LOGS[.. shown].to_vec();
    if polls < behavior.polls_until_complete {
        let progress = polls.saturating_mul(100) / behavior.polls_until_complete.max(1);
        return Json(json!({
            "status": "processing",
            "progress": progress,
            "currentStep": logs.last().copied().unwrap_or("Queued"),
            "logs": logs,
        }))
        .into_response();
    }
    if behavior.fail_job {
        entry.finished = Some(false);
        let mut logs = STEP_LOGS.to_vec();
        logs.push("jarsigner: keystore not found");
        return Json(json!({
            "status": "error",
            "progress": 80,
            "logs": logs,
            "error": "Signing failed",
        }))
        .into_response();
    }
    entry.finished = Some(true);
    let stem = entry.source_name.trim_end_matches(".apk").to_string();
    let file_name = format!("{stem}-debug-{job_id}.apk");
    let mut builder = PackageBuilder::new();
    if !behavior.signed_output {
        builder = builder.without_signature();
    }
    let Ok(output) = builder.build() else {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "package build failed");
    };
    let size = output.len();
    jobs.outputs.insert(file_name.clone(), output);
    Json(json!({
        "status": "completed",
        "progress": 100,
        "currentStep": "Done",
        "logs": STEP_LOGS,
        "result": {
            "fileName": file_name,
            "size": size,
            "signed": behavior.signed_output,
            "verified": behavior.signed_output,
            "aligned": true,
        },
    }))
    .into_response()
}

/// `GET /api/download/{file_name}`: serves a produced package.
async fn handle_download(State(state): State<StubState>, Path(file_name): Path<String>) -> Response {
    state.record(format!("GET /api/download/{file_name}"));
    let output = state.jobs.lock().ok().and_then(|jobs| jobs.outputs.get(&file_name).cloned());
    let Some(bytes) = output else {
        return error_reply(StatusCode::NOT_FOUND, "File not found");
    };
    let disposition = format!("attachment; filename=\"{file_name}\"");
    ([(header::CONTENT_TYPE, APK_MIME.to_string()), (header::CONTENT_DISPOSITION, disposition)], bytes)
        .into_response()
}

/// `GET /api/stats`: job totals.
async fn handle_stats(State(state): State<StubState>) -> Response {
    state.record("GET /api/stats".to_string());
    let Ok(jobs) = state.jobs.lock() else {
        return error_reply(StatusCode::INTERNAL_SERVER_ERROR, "state poisoned");
    };
    let count = |outcome: Option<bool>| {
        jobs.entries.values().filter(|entry| entry.finished == outcome).count()
    };
    let body: Value = json!({
        "totalJobs": jobs.entries.len(),
        "completedJobs": count(Some(true)),
        "errorJobs": count(Some(false)),
        "processingJobs": count(None),
    });
    Json(body).into_response()
}

/// `GET /api/test-mongodb`: scripted storage connectivity.
async fn handle_storage(State(state): State<StubState>) -> Response {
    state.record("GET /api/test-mongodb".to_string());
    if state.behavior.storage_ok {
        Json(json!({ "success": true, "message": "Storage reachable" })).into_response()
    } else {
        let body = json!({ "success": false, "message": "connection refused" });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
