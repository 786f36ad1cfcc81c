use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Returned by [`Retry::run`] when its cancellation token fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

type FailureHook<'a, E> = Box<dyn FnMut(u32, &E) -> Result<(), E> + Send + 'a>;
type ExhaustionHandler<'a, T, E> = Box<dyn FnOnce(u32, E) -> T + Send + 'a>;
type RetryPredicate<'a, E> = Box<dyn Fn(&E) -> bool + Send + Sync + 'a>;

/// Runs a fallible async operation up to `max_attempts` times.
///
/// Between failed attempts the failure hook is called and the executor waits
/// for the configured interval. When the last attempt fails the exhaustion
/// handler, if any, turns the final error into a result; otherwise the error
/// is returned as is.
///
/// ```ignore
/// let report = Retry::attempts(3)
///     .interval(Duration::from_millis(500))
///     .on_attempt_failed(|attempt, err| {
///         tracing::debug!(attempt, error = %err, "attempt failed");
///         Ok(())
///     })
///     .on_exhausted(|_, _| Fallback)
///     .run(|_| fetch())
///     .await?;
/// ```
pub struct Retry<'a, T, E> {
    max_attempts: u32,
    interval: Option<Duration>,
    on_attempt_failed: Option<FailureHook<'a, E>>,
    on_exhausted: Option<ExhaustionHandler<'a, T, E>>,
    retry_if: Option<RetryPredicate<'a, E>>,
    cancel: Option<CancellationToken>,
}

impl<'a, T, E> Retry<'a, T, E> {
    /// Values below 1 are clamped to a single attempt.
    pub fn attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval: None,
            on_attempt_failed: None,
            on_exhausted: None,
            retry_if: None,
            cancel: None,
        }
    }

    /// A zero interval means no wait between attempts.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Called with the attempt number after every failure that will be
    /// retried. An error returned by the hook ends the run with that error.
    pub fn on_attempt_failed<F>(mut self, hook: F) -> Self
    where
        F: FnMut(u32, &E) -> Result<(), E> + Send + 'a,
    {
        self.on_attempt_failed = Some(Box::new(hook));
        self
    }

    /// Produces the final result once no attempts remain. The last error is
    /// handed over and not returned to the caller.
    pub fn on_exhausted<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(u32, E) -> T + Send + 'a,
    {
        self.on_exhausted = Some(Box::new(handler));
        self
    }

    /// Errors for which the predicate returns `false` end the run as if the
    /// attempt had been the last one.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'a,
    {
        self.retry_if = Some(Box::new(predicate));
        self
    }

    /// Aborts the in-flight attempt and skips remaining attempts and delays
    /// once `token` is cancelled. Cancellation bypasses the exhaustion handler.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn run<Op, Fut>(mut self, mut operation: Op) -> Result<T, E>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<Cancelled>,
    {
        let cancel = self.cancel.take();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match &cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(Cancelled.into()),
                    outcome = operation(attempt) => outcome,
                },
                None => operation(attempt).await,
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retryable = self.retry_if.as_ref().is_none_or(|retry| retry(&err));

            if attempt >= self.max_attempts || !retryable {
                return match self.on_exhausted.take() {
                    Some(handler) => Ok(handler(attempt, err)),
                    None => Err(err),
                };
            }

            if let Some(hook) = self.on_attempt_failed.as_mut() {
                hook(attempt, &err)?;
            }

            if let Some(interval) = self.interval {
                match &cancel {
                    Some(token) => tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(Cancelled.into()),
                        _ = tokio::time::sleep(interval) => {}
                    },
                    None => tokio::time::sleep(interval).await,
                }
            }
        }
    }
}
