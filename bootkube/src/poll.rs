//! Bounded-time polling
use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::{sleep_until, Instant};

/// Outcome of one probe invocation
#[derive(Debug)]
pub enum Attempt<T, E> {
    /// The condition holds; stop polling and return the value
    Done(T),
    /// Not done yet; poll again after the interval
    ///
    /// A carried error is remembered and surfaced if the deadline elapses.
    Retry(Option<E>),
    /// Stop immediately and surface the error
    Abort(E),
}

/// Failure of [`poll_until`]
#[derive(Error, Debug)]
pub enum PollError<E: std::error::Error + 'static> {
    /// The deadline elapsed before the probe reported completion
    #[error("timed out waiting for the condition")]
    Timeout {
        /// The last error a probe reported before the deadline, if any
        #[source]
        last: Option<E>,
    },

    /// The probe reported a condition that must not be retried
    #[error(transparent)]
    Aborted(E),
}

impl<E: std::error::Error + 'static> PollError<E> {
    /// Whether this is a deadline expiry
    pub fn is_timeout(&self) -> bool {
        matches!(self, PollError::Timeout { .. })
    }

    /// The underlying probe error: the abort reason, or the last error before the timeout
    pub fn cause(&self) -> Option<&E> {
        match self {
            PollError::Timeout { last } => last.as_ref(),
            PollError::Aborted(err) => Some(err),
        }
    }
}

/// Invoke `probe` every `interval` until it completes, aborts, or `timeout` elapses
///
/// The first invocation happens one `interval` after the call. Probes run strictly one
/// after the other; the interval is slept between the end of one and the start of the next.
/// No attempt is started once the next one would begin past the deadline, but an attempt
/// that is already running is never interrupted, so a slow probe can overrun `timeout`.
pub async fn poll_until<T, E, F, Fut>(interval: Duration, timeout: Duration, mut probe: F) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
    E: std::error::Error + 'static,
{
    let deadline = Instant::now().checked_add(timeout).unwrap_or_else(far_future);
    let mut last = None;
    let mut attempt = 0u32;
    loop {
        let next = Instant::now().checked_add(interval).filter(|next| *next <= deadline);
        let Some(next) = next else {
            sleep_until(deadline).await;
            tracing::debug!(attempts = attempt, "poll deadline elapsed");
            return Err(PollError::Timeout { last });
        };
        sleep_until(next).await;

        attempt += 1;
        match probe().await {
            Attempt::Done(value) => {
                tracing::debug!(attempts = attempt, "poll condition met");
                return Ok(value);
            }
            Attempt::Retry(err) => {
                if err.is_some() {
                    last = err;
                }
            }
            Attempt::Abort(err) => return Err(PollError::Aborted(err)),
        }
    }
}

// Roughly 30 years, for deadlines that do not fit in an `Instant`
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
