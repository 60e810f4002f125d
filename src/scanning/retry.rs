//! Bounded retry with delay

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::config::ScanSettings;
use crate::error::FetchError;

/// Upper bound for a single exponential delay
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    /// Same delay before every retry
    #[default]
    Fixed,
    /// Delay doubles with each retry
    Exponential,
}

/// Errors that know whether another attempt could help
pub trait Retryable: Display {
    fn is_retryable(&self) -> bool;
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            backoff: BackoffKind::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffKind) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn from_settings(settings: &ScanSettings) -> Self {
        Self::new(settings.max_retries, settings.retry_delay).with_backoff(settings.backoff)
    }

    /// Doubling schedule starting at `retry_delay`, without jitter
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.retry_delay,
            initial_interval: self.retry_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: MAX_BACKOFF,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    fn schedule(&self) -> DelaySchedule {
        match self.backoff {
            BackoffKind::Fixed => DelaySchedule::Fixed(self.retry_delay),
            BackoffKind::Exponential => DelaySchedule::Exponential(self.create_backoff()),
        }
    }
}

enum DelaySchedule {
    Fixed(Duration),
    Exponential(ExponentialBackoff),
}

impl DelaySchedule {
    fn next_delay(&mut self) -> Duration {
        match self {
            DelaySchedule::Fixed(delay) => *delay,
            // No elapsed-time limit is set, so the schedule never runs out
            DelaySchedule::Exponential(backoff) => backoff.next_backoff().unwrap_or(MAX_BACKOFF),
        }
    }
}

/// Failure that will not be retried again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalError {
    /// Message of the last underlying error
    pub message: String,
    /// Attempts made, including the first
    pub attempts: u32,
}

/// Definite result of a retried task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    Terminal(TerminalError),
}

impl<T> RetryOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. } => *attempts,
            RetryOutcome::Terminal(terminal) => terminal.attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    pub fn into_result(self) -> Result<T, TerminalError> {
        match self {
            RetryOutcome::Success { value, .. } => Ok(value),
            RetryOutcome::Terminal(terminal) => Err(terminal),
        }
    }
}

/// Run `task` until it succeeds, fails permanently, or the retry budget is spent.
///
/// At most `max_retries + 1` attempts are made. Errors never escape: the
/// caller always gets a success value or a terminal error.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, mut task: F) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let mut retries = 0u32;
    let mut delays = policy.schedule();

    loop {
        let attempts = retries + 1;

        match task().await {
            Ok(value) => return RetryOutcome::Success { value, attempts },
            Err(e) => {
                if !e.is_retryable() {
                    debug!(attempts, error = %e, "Permanent failure, not retrying");
                    return RetryOutcome::Terminal(TerminalError {
                        message: e.to_string(),
                        attempts,
                    });
                }

                if retries >= policy.max_retries {
                    debug!(attempts, error = %e, "Max retry attempts reached");
                    return RetryOutcome::Terminal(TerminalError {
                        message: e.to_string(),
                        attempts,
                    });
                }

                retries += 1;
                let delay = delays.next_delay();
                debug!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after delay"
                );
                sleep(delay).await;
            }
        }
    }
}
