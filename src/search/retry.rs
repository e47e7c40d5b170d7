//! Bounded retry for external store calls.
//!
//! Serverless relational backends drop idle connections, so the first
//! attempt after a quiet period often fails with a closed-connection
//! error. Both retrieval paths wrap their calls in this policy; the sqlx
//! pool discards broken connections on return, so a retry acquires a
//! fresh one.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth retrying: the connection died, the pool timed out, the wire
    /// broke. A fresh connection may succeed.
    Transient,
    /// Retrying cannot help: bad SQL, bad schema, bad configuration.
    Permanent,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
        }
    }

    /// Run `op`, retrying transient failures with exponential backoff.
    /// Permanent failures and exhausted attempts re-raise the last error.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    let retryable =
                        attempt < self.max_attempts && classify(&e) == FailureKind::Transient;
                    if !retryable {
                        return Err(e);
                    }
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        call = what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient store failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Classify an error as transient or permanent. Typed sqlx error kinds are
/// checked first; anything else falls through to the message classifier.
pub fn classify(err: &anyhow::Error) -> FailureKind {
    for cause in err.chain() {
        if let Some(sql) = cause.downcast_ref::<sqlx::Error>() {
            return match sql {
                sqlx::Error::Io(_)
                | sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::WorkerCrashed => FailureKind::Transient,
                _ => FailureKind::Permanent,
            };
        }
    }
    if message_looks_transient(&format!("{err:#}")) {
        FailureKind::Transient
    } else {
        FailureKind::Permanent
    }
}

/// The one place allowed to string-match error text, for capabilities that
/// only surface failures as messages.
pub fn message_looks_transient(message: &str) -> bool {
    const TRANSIENT_MARKERS: &[&str] = &[
        "connection closed",
        "connection reset",
        "connection refused",
        "server closed the connection",
        "broken pipe",
        "timed out",
        "timeout",
        "temporarily unavailable",
    ];
    let m = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|p| m.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            max_attempts,
            base_delay_ms: 1,
        })
    }

    #[test]
    fn test_message_classifier() {
        assert!(message_looks_transient("Connection closed by server"));
        assert!(message_looks_transient("pool timed out waiting for a slot"));
        assert!(message_looks_transient("service temporarily unavailable"));
        assert!(!message_looks_transient("syntax error at or near SELECT"));
        assert!(!message_looks_transient("column does not exist"));
    }

    #[test]
    fn test_typed_sqlx_classification() {
        let transient = anyhow::Error::new(sqlx::Error::PoolClosed);
        assert_eq!(classify(&transient), FailureKind::Transient);
        let permanent = anyhow::Error::new(sqlx::Error::RowNotFound);
        assert_eq!(classify(&permanent), FailureKind::Permanent);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = policy(3)
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(anyhow::anyhow!("connection closed unexpectedly"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = policy(3)
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow::anyhow!("syntax error in query")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = policy(2)
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(anyhow::anyhow!("connection reset by peer")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
