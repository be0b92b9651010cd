//! Staleness-aware extraction of a single text value from a rendered page.
//!
//! Price pages usually render a skeleton or a cached number first and inject
//! the live value from client-side script a moment later. Reading the element
//! as soon as it exists would capture that placeholder, so extraction runs in
//! phases:
//!
//! 1. navigate to the page;
//! 2. **presence**: poll until the selector matches;
//! 3. **initial capture**: read the current text;
//! 4. **update**: poll until the text differs from the initial capture
//!    (or, when the initial capture was empty, becomes non-empty);
//! 5. **final read**: the text at the element is the result.
//!
//! If the update phase times out, [`TimeoutPolicy::Lenient`] treats the page
//! as already showing its final value and returns the final read, while
//! [`TimeoutPolicy::Strict`] fails with [`ScrapeError::UpdateTimeout`]. An
//! empty final read is always [`ScrapeError::EmptyValue`].

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{ScrapeError, ScrapeResult};
use crate::poll::{poll_until, PollOutcome};
use crate::renderer::{ElementHandle, RenderSession, Renderer};
use crate::types::RawObservation;

/// Poll interval for the presence phase.
pub const PRESENCE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What to do when the element text never changes during the update phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Return the current text if it is non-empty.
    #[default]
    Lenient,
    /// Fail with `UpdateTimeout`.
    Strict,
}

impl std::fmt::Display for TimeoutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lenient => write!(f, "lenient"),
            Self::Strict => write!(f, "strict"),
        }
    }
}

/// Timeouts and policy for one extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// How long to wait for the selector to match. Also bounds navigation.
    pub presence_timeout: Duration,
    /// How long to wait for the text to change after the initial capture.
    pub update_timeout: Duration,
    /// Poll interval during the update phase.
    pub poll_interval: Duration,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            presence_timeout: Duration::from_secs(10),
            update_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(500),
            timeout_policy: TimeoutPolicy::Lenient,
        }
    }
}

/// Runs the wait protocol against renderer sessions.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Open a fresh session, extract the text at `selector` on `url`, and
    /// close the session.
    ///
    /// The session is closed exactly once on every path. A failure to close
    /// is logged and never replaces the extraction result.
    pub async fn extract(
        &self,
        renderer: &dyn Renderer,
        url: &str,
        selector: &str,
    ) -> ScrapeResult<RawObservation> {
        let mut session = renderer.open().await?;
        let result = self.extract_from(session.as_mut(), url, selector).await;

        if let Err(e) = session.close().await {
            tracing::warn!(url, "Failed to close render session: {e}");
        }

        result
    }

    /// Run the wait protocol on an already-open session. The caller keeps
    /// ownership of the session and must close it.
    pub async fn extract_from(
        &self,
        session: &mut dyn RenderSession,
        url: &str,
        selector: &str,
    ) -> ScrapeResult<RawObservation> {
        let opts = &self.options;
        let start = Instant::now();

        session.navigate(url, opts.presence_timeout).await?;
        let session: &dyn RenderSession = session;

        // Presence phase.
        let element = match poll_until(opts.presence_timeout, PRESENCE_POLL_INTERVAL, || {
            session.find_element(selector)
        })
        .await?
        {
            PollOutcome::Ready(element) => element,
            PollOutcome::TimedOut { waited } => {
                return Err(ScrapeError::SelectorNotFound {
                    selector: selector.to_string(),
                    waited,
                });
            }
        };
        tracing::debug!(selector, elapsed_ms = elapsed_ms(start), "Element present");

        // Initial capture. The element matched a moment ago, so a miss here
        // means the page structure is not what we expect.
        let initial = read_trimmed(session, &element)
            .await?
            .ok_or_else(|| vanished(selector))?;
        tracing::debug!(selector, initial = %initial, "Initial text captured");

        // Update phase. A detached element while polling is "not yet updated".
        let initial_ref = initial.as_str();
        let element_ref = &element;
        let outcome = poll_until(opts.update_timeout, opts.poll_interval, || async move {
            Ok(read_trimmed(session, element_ref)
                .await?
                .filter(|current| text_updated(initial_ref, current))
                .map(|_| ()))
        })
        .await?;

        match outcome {
            PollOutcome::Ready(()) => {
                tracing::debug!(selector, elapsed_ms = elapsed_ms(start), "Element text updated");
            }
            PollOutcome::TimedOut { waited } => match opts.timeout_policy {
                TimeoutPolicy::Strict => {
                    return Err(ScrapeError::UpdateTimeout {
                        selector: selector.to_string(),
                        waited,
                    });
                }
                TimeoutPolicy::Lenient => {
                    tracing::debug!(
                        selector,
                        waited_ms = waited.as_millis() as u64,
                        "Text never changed, treating current value as final"
                    );
                }
            },
        }

        // Final read.
        let text = read_trimmed(session, &element)
            .await?
            .ok_or_else(|| vanished(selector))?;
        if text.is_empty() {
            return Err(ScrapeError::EmptyValue {
                selector: selector.to_string(),
            });
        }

        Ok(RawObservation {
            text,
            observed_at: Utc::now(),
        })
    }
}

/// Whether `current` counts as a fresh value relative to the initial capture.
pub fn text_updated(initial: &str, current: &str) -> bool {
    if initial.is_empty() {
        !current.is_empty()
    } else {
        current != initial
    }
}

async fn read_trimmed(
    session: &dyn RenderSession,
    element: &ElementHandle,
) -> ScrapeResult<Option<String>> {
    Ok(session
        .read_text(element)
        .await?
        .map(|text| text.trim().to_string()))
}

fn vanished(selector: &str) -> ScrapeError {
    ScrapeError::ElementVanished {
        selector: selector.to_string(),
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
