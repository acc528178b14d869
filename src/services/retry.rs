//! Bounded exponential-backoff retry for individual storage calls.
//!
//! A retry is always scoped to a single storage operation, never to the
//! multi-step redemption sequence, so an already-committed step cannot be
//! re-run.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Cap for the exponential backoff.
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return self.initial_backoff.min(self.max_backoff);
        }

        let millis =
            self.initial_backoff.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(millis as u64).min(self.max_backoff)
    }
}

#[derive(Debug)]
pub enum RetryError {
    /// The budget ran out on an error classified as retryable.
    Exhausted { attempts: u32, source: sqlx::Error },
    /// The predicate refused to retry this error.
    Aborted(sqlx::Error),
}

pub async fn retry_with_policy<T, F, Fut, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> std::result::Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = sqlx::Result<T>>,
    P: Fn(&sqlx::Error) -> bool,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt, "storage operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    return Err(RetryError::Aborted(err));
                }

                attempt += 1;
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        attempt,
                        error = %err,
                        "storage operation failed after max attempts"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: err,
                    });
                }

                let backoff = policy.backoff_for_attempt(attempt - 1);
                tracing::warn!(
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "transient storage failure, retrying"
                );
                sleep(backoff).await;
            }
        }
    }
}

/// Likely to succeed on a fresh attempt: pool pressure or connectivity.
pub fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) => true,
        sqlx::Error::Database(db) => db.code().map_or(false, |code| is_transient_code(&code)),
        _ => false,
    }
}

/// SQLSTATE classes naming a transient server condition rather than a
/// malformed query: connection exceptions (08xxx), resource pressure (53xxx),
/// server shutdown (57P03), and conflicts the server reports as rolled back
/// (40001 serialization failure, 40P01 deadlock).
pub fn is_transient_code(code: &str) -> bool {
    code.starts_with("08")
        || code.starts_with("53")
        || code == "57P03"
        || code == "40001"
        || code == "40P01"
}

/// An append may be retried only when the statement is known not to have
/// committed: the connection was never acquired, or the server reported a
/// definite rollback.
pub fn is_append_retry_safe(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => db
            .code()
            .map_or(false, |code| code == "40001" || code == "40P01"),
        _ => false,
    }
}

/// Failures where the commit status cannot be determined from the client
/// side: the statement may or may not have reached the server.
pub fn is_commit_ambiguous(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::WorkerCrashed
    )
}

/// Run a lookup or count under the policy. A spent budget surfaces as
/// `StorageUnavailable`, distinguishable from every business outcome.
pub async fn with_read_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = sqlx::Result<T>>,
{
    match retry_with_policy(policy, operation, is_transient).await {
        Ok(value) => Ok(value),
        Err(RetryError::Exhausted { attempts, source }) => {
            Err(AppError::StorageUnavailable { attempts, source })
        }
        Err(RetryError::Aborted(err)) => Err(AppError::Database(err)),
    }
}

/// Run an append under the stricter predicate. An ambiguous failure surfaces
/// as `AppendStatusUnknown` instead of being silently retried.
pub async fn with_append_retry<T, F, Fut>(policy: &RetryPolicy, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = sqlx::Result<T>>,
{
    match retry_with_policy(policy, operation, is_append_retry_safe).await {
        Ok(value) => Ok(value),
        Err(RetryError::Exhausted { attempts, source }) => {
            Err(AppError::StorageUnavailable { attempts, source })
        }
        Err(RetryError::Aborted(err)) if is_commit_ambiguous(&err) => {
            Err(AppError::AppendStatusUnknown(err.to_string()))
        }
        Err(RetryError::Aborted(err)) => Err(AppError::Database(err)),
    }
}
