//! Error types for scraping, normalization, and collation.

use std::time::Duration;

/// All errors that can occur while scraping a target or running a collation.
///
/// Every variant except [`ScrapeError::NoDataCollected`] and
/// [`ScrapeError::Config`] is scoped to a single target; the collator catches
/// those and counts them instead of aborting the run.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// Browser launch, navigation, or protocol failure.
    #[error("Render error: {0}")]
    Render(String),

    #[error("Selector not found within {waited:?}: {selector}")]
    SelectorNotFound { selector: String, waited: Duration },

    /// The element matched during the presence phase was gone when read.
    #[error("Element vanished: {selector}")]
    ElementVanished { selector: String },

    /// Strict mode only: the element text never changed.
    #[error("Element text did not update within {waited:?}: {selector}")]
    UpdateTimeout { selector: String, waited: Duration },

    #[error("Element text was empty: {selector}")]
    EmptyValue { selector: String },

    #[error("Cannot parse price from {raw:?}: {reason}")]
    ParseError { raw: String, reason: String },

    /// Every target in the run failed.
    #[error("No data collected: all {attempted} targets failed")]
    NoDataCollected { attempted: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    pub fn render(detail: impl std::fmt::Display) -> Self {
        ScrapeError::Render(detail.to_string())
    }

    /// Whether this error ends the whole run rather than a single target.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            ScrapeError::NoDataCollected { .. }
                | ScrapeError::Config(_)
                | ScrapeError::Io(_)
                | ScrapeError::Json(_)
        )
    }

    /// Short machine-friendly name, used in progress events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::Render(_) => "render_error",
            ScrapeError::SelectorNotFound { .. } => "selector_not_found",
            ScrapeError::ElementVanished { .. } => "element_vanished",
            ScrapeError::UpdateTimeout { .. } => "update_timeout",
            ScrapeError::EmptyValue { .. } => "empty_value",
            ScrapeError::ParseError { .. } => "parse_error",
            ScrapeError::NoDataCollected { .. } => "no_data_collected",
            ScrapeError::Config(_) => "config_error",
            ScrapeError::Io(_) => "io_error",
            ScrapeError::Json(_) => "json_error",
        }
    }
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
