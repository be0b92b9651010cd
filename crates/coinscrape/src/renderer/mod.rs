//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderSession` traits that abstract over
//! the browser engine (Chromium via chromiumoxide when the `chromium`
//! feature is enabled).

#[cfg(feature = "chromium")]
pub mod chromium;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ScrapeResult};

/// Launch options for a rendering session.
///
/// The defaults give a non-interactive, fixed-viewport browser so pages lay
/// out the same way on every machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Extra command-line switches passed to the browser.
    pub extra_args: Vec<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            extra_args: Vec::new(),
        }
    }
}

impl RenderOptions {
    /// Command-line switches for a Chromium-family browser.
    pub fn browser_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(
            [
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-software-rasterizer",
                "--disable-extensions",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(format!(
            "--window-size={},{}",
            self.window_width, self.window_height
        ));
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Handle to an element matched by a selector.
///
/// Handles are re-resolved by selector on every read, so a handle stays
/// usable when the page re-renders the node; a read returns `None` while no
/// node matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub selector: String,
}

impl ElementHandle {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }
}

/// A browser engine that launches one isolated session per scrape.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launch a new session. Each session owns its own browser process.
    async fn open(&self) -> ScrapeResult<Box<dyn RenderSession>>;
}

/// A single browser session (one page) used for one target.
///
/// `Err` from any method is terminal for the target. "Not there yet" is
/// reported as `Ok(None)` so pollers can tell the two apart.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigate to a URL and wait for the initial load.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ScrapeResult<()>;
    /// Look up the first element matching a CSS selector.
    async fn find_element(&self, selector: &str) -> ScrapeResult<Option<ElementHandle>>;
    /// Read the element's rendered text, or `None` if it is detached.
    async fn read_text(&self, element: &ElementHandle) -> ScrapeResult<Option<String>>;
    /// Close the session and release the browser process.
    async fn close(self: Box<Self>) -> ScrapeResult<()>;
}

/// Stand-in renderer for when no browser can be launched.
///
/// Every `open` fails with a render error carrying `reason`, so a collation
/// run reports each target as failed and ends in `NoDataCollected`.
#[derive(Debug, Clone)]
pub struct NoopRenderer {
    reason: String,
}

impl NoopRenderer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for NoopRenderer {
    fn default() -> Self {
        Self::new("Browser not available; build with the `chromium` feature")
    }
}

#[async_trait]
impl Renderer for NoopRenderer {
    async fn open(&self) -> ScrapeResult<Box<dyn RenderSession>> {
        Err(ScrapeError::Render(self.reason.clone()))
    }
}
