// crates/apk-probe-core/src/poll.rs
// ============================================================================
// Module: Bounded Polling Probe
// Description: Poll a job's status until a terminal state or a budget expires.
// Purpose: Observe asynchronous remote work without ever blocking unbounded.
// Dependencies: tracing
// ============================================================================

//! ## Overview
//! [`poll_job`] queries a [`StatusSource`] at a fixed interval. Completed and
//! error states end the loop; any other state (including unrecognized ones)
//! sleeps and retries. Transport failures and undecodable bodies are
//! transient: they consume an attempt and the loop continues. Any non-200
//! status ends the loop as a rejection.
//!
//! ## Invariants
//! - At most [`PollPolicy::max_attempts`] status queries are issued.
//! - The loop stops sleeping once elapsed time reaches `max_wait`.
//! - No backoff, no concurrency; the calling thread sleeps between attempts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;
use std::time::Instant;

use tracing::info;
use tracing::warn;

use crate::client::ClientError;
use crate::client::StatusReply;
use crate::job::JobSnapshot;
use crate::job::JobStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of trailing log lines captured when a job fails.
pub const FAILURE_LOG_TAIL: usize = 5;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between queries.
    interval: Duration,
    /// Total wait budget.
    max_wait: Duration,
}

impl PollPolicy {
    /// Creates a policy from an interval and a total wait budget.
    #[must_use]
    pub const fn new(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_wait,
        }
    }

    /// Returns the delay between queries.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the total wait budget.
    #[must_use]
    pub const fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Returns `max(1, ceil(max_wait / interval))`.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        let interval = self.interval.as_nanos();
        if interval == 0 {
            return 1;
        }
        let attempts = self.max_wait.as_nanos().div_ceil(interval);
        u32::try_from(attempts).unwrap_or(u32::MAX).max(1)
    }
}

// ============================================================================
// SECTION: Seams
// ============================================================================

/// Source of job snapshots.
pub trait StatusSource {
    /// Fetches the current status of `job_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the query fails or the body is undecodable;
    /// the poller treats every such error as transient.
    fn fetch_status(&self, job_id: &str) -> Result<StatusReply, ClientError>;
}

/// Observer of polling progress.
pub trait PollObserver {
    /// Called for every decoded snapshot, terminal ones included.
    fn on_snapshot(&mut self, _attempt: u32, _snapshot: &JobSnapshot) {}

    /// Called for every transient failure.
    fn on_transient_error(&mut self, _attempt: u32, _error: &ClientError) {}
}

/// Observer that ignores all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PollObserver for NoopObserver {}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Final outcome of a polling loop.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Job reached `completed`.
    Completed {
        /// Terminal snapshot (carries the result descriptor).
        snapshot: JobSnapshot,
        /// Queries issued.
        attempts: u32,
    },
    /// Job reached `error`.
    Failed {
        /// Service-provided error text, when present.
        error: Option<String>,
        /// Trailing log lines at failure time.
        recent_logs: Vec<String>,
        /// Queries issued.
        attempts: u32,
    },
    /// Status endpoint answered with a non-200 code.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Service error message.
        message: String,
        /// Queries issued.
        attempts: u32,
    },
    /// Budget exhausted without a terminal state.
    TimedOut {
        /// Queries issued.
        attempts: u32,
        /// Wall time spent.
        waited: Duration,
        /// Last decoded snapshot, if any.
        last: Option<JobSnapshot>,
    },
}

impl PollOutcome {
    /// Returns the number of queries issued.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Completed {
                attempts, ..
            }
            | Self::Failed {
                attempts, ..
            }
            | Self::Rejected {
                attempts, ..
            }
            | Self::TimedOut {
                attempts, ..
            } => *attempts,
        }
    }

    /// Returns true when the job completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

// ============================================================================
// SECTION: Polling Loop
// ============================================================================

/// Polls `job_id` until a terminal state, a rejection, or budget exhaustion.
pub fn poll_job<S, O>(
    source: &S,
    job_id: &str,
    policy: &PollPolicy,
    observer: &mut O,
) -> PollOutcome
where
    S: StatusSource + ?Sized,
    O: PollObserver + ?Sized,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;
    let mut last = None;
    for attempt in 1 ..= max_attempts {
        attempts = attempt;
        match source.fetch_status(job_id) {
            Ok(StatusReply::Snapshot(snapshot)) => {
                observer.on_snapshot(attempt, &snapshot);
                match snapshot.status {
                    JobStatus::Completed => {
                        info!(job_id, attempts = attempt, "job completed");
                        return PollOutcome::Completed {
                            snapshot,
                            attempts: attempt,
                        };
                    }
                    JobStatus::Error => {
                        info!(job_id, attempts = attempt, "job failed");
                        return PollOutcome::Failed {
                            recent_logs: snapshot.tail_logs(FAILURE_LOG_TAIL).to_vec(),
                            error: snapshot.error,
                            attempts: attempt,
                        };
                    }
                    JobStatus::Submitted | JobStatus::Processing | JobStatus::Unknown => {
                        last = Some(snapshot);
                    }
                }
            }
            Ok(StatusReply::Rejected {
                status,
                message,
            }) => {
                info!(job_id, status, "status query rejected");
                return PollOutcome::Rejected {
                    status,
                    message,
                    attempts: attempt,
                };
            }
            Err(err) => {
                warn!(job_id, attempt, error = %err, "transient status poll failure");
                observer.on_transient_error(attempt, &err);
            }
        }
        if attempt == max_attempts || started.elapsed() >= policy.max_wait() {
            break;
        }
        thread::sleep(policy.interval());
    }
    let waited = started.elapsed();
    info!(job_id, attempts, "polling budget exhausted");
    PollOutcome::TimedOut {
        attempts,
        waited,
        last,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
