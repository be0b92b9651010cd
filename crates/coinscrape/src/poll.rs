//! Poll-until-ready combinator used by the extractor's wait phases.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ScrapeResult;

/// Result of a bounded poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The probe produced a value before the deadline.
    Ready(T),
    /// The deadline passed without the probe producing a value.
    TimedOut { waited: Duration },
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }
}

/// Run `probe` until it yields `Some`, sleeping `interval` between attempts.
///
/// The probe runs once immediately and once more at the deadline, so a
/// zero `timeout` still gets exactly one attempt. `Ok(None)` means "not yet"
/// and keeps polling; `Err` aborts the poll and is returned as-is.
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> ScrapeResult<PollOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ScrapeResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + timeout;

    loop {
        if let Some(value) = probe().await? {
            return Ok(PollOutcome::Ready(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(PollOutcome::TimedOut {
                waited: now.duration_since(start),
            });
        }

        // Never sleep past the deadline; the last probe lands on it.
        let remaining = deadline.saturating_duration_since(now);
        tokio::time::sleep(interval.min(remaining)).await;
    }
}
