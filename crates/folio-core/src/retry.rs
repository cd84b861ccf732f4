use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Sleep schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `step * attempt` after attempt `attempt` (1-indexed).
    Linear(Duration),
}

impl Backoff {
    /// Delay to sleep after the given failed attempt (1-indexed).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Linear(step) => step.saturating_mul(attempt.max(1)),
        }
    }
}

/// Bounded retry with backoff.
///
/// Every error is retried until `max_attempts` is reached; the last error
/// is returned to the caller, which decides whether it is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    /// 3 attempts, 2 s / 4 s between them.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear(Duration::from_secs(2)),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Retry immediately, without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::Fixed(Duration::ZERO))
    }

    /// Run `op` until it succeeds or attempts are exhausted.
    ///
    /// `op` receives the attempt number (1-indexed). `on_failure` is called
    /// for every failed attempt with whether another attempt follows.
    pub async fn run<T, Op, Fut, OnFail>(&self, mut op: Op, mut on_failure: OnFail) -> Result<T, AppError>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
        OnFail: FnMut(u32, &AppError, bool),
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let will_retry = attempt < attempts;
                    on_failure(attempt, &error, will_retry);
                    if !will_retry {
                        return Err(error);
                    }
                    let delay = self.backoff.delay_after(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Like [`run`](Self::run), but exhaustion yields `T::default()` instead
    /// of an error.
    pub async fn run_or_default<T, Op, Fut, OnFail>(&self, op: Op, on_failure: OnFail) -> T
    where
        T: Default,
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
        OnFail: FnMut(u32, &AppError, bool),
    {
        self.run(op, on_failure).await.unwrap_or_default()
    }
}
