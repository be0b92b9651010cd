//! Chromium-based renderer using chromiumoxide.

use super::{ElementHandle, RenderOptions, RenderSession, Renderer};
use crate::error::{ScrapeError, ScrapeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. COINSCRAPE_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("COINSCRAPE_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.coinscrape/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".coinscrape/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".coinscrape/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".coinscrape/chromium/chrome-linux64/chrome"),
                home.join(".coinscrape/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer. Every `open` launches a separate browser process.
pub struct ChromiumRenderer {
    chrome_path: PathBuf,
    options: RenderOptions,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Create a renderer using the first Chromium binary found on this machine.
    pub fn new(options: RenderOptions) -> ScrapeResult<Self> {
        let chrome_path = find_chromium().ok_or_else(|| {
            ScrapeError::render(
                "Chromium not found. Install Chrome or set COINSCRAPE_CHROMIUM_PATH.",
            )
        })?;
        Ok(Self::with_executable(chrome_path, options))
    }

    /// Create a renderer for an explicit browser executable.
    pub fn with_executable(chrome_path: PathBuf, options: RenderOptions) -> Self {
        Self {
            chrome_path,
            options,
            active_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently open.
    pub fn active_sessions(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }

    fn browser_config(&self) -> ScrapeResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .chrome_executable(&self.chrome_path)
            // Let --window-size decide the layout instead of device emulation.
            .viewport(None::<Viewport>);
        if !self.options.headless {
            builder = builder.with_head();
        }
        for arg in self.options.browser_args() {
            builder = builder.arg(arg);
        }
        builder
            .build()
            .map_err(|e| ScrapeError::render(format!("failed to build browser config: {e}")))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open(&self) -> ScrapeResult<Box<dyn RenderSession>> {
        let config = self.browser_config()?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::render(format!("failed to launch Chromium: {e}")))?;

        // Drive the CDP connection until the browser goes away.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                shutdown_browser(browser, handler_task).await;
                return Err(ScrapeError::render(format!("failed to create page: {e}")));
            }
        };

        self.active_count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Launched Chromium session ({} active)",
            self.active_count.load(Ordering::Relaxed)
        );

        Ok(Box::new(ChromiumSession {
            browser,
            page,
            handler_task,
            active_count: Arc::clone(&self.active_count),
        }))
    }
}

/// One Chromium process with a single page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumSession {
    async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> ScrapeResult<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScrapeError::render(format!("JS execution failed: {e}")))?;

        result
            .into_value()
            .map_err(|e| ScrapeError::render(format!("failed to convert JS result: {e:?}")))
    }
}

#[derive(serde::Deserialize)]
struct TextRead {
    present: bool,
    text: String,
}

/// JS expression that evaluates to the first node matching `selector`, or null.
fn query_expr(selector: &str) -> String {
    // JSON string literals are valid JS string literals.
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!("document.querySelector({literal})")
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> ScrapeResult<()> {
        let start = Instant::now();
        let page = &self.page;

        load_within(timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), CdpError>(())
        })
        .await?;

        tracing::debug!(url, load_ms = start.elapsed().as_millis() as u64, "Page loaded");
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> ScrapeResult<Option<ElementHandle>> {
        let script = format!("{} !== null", query_expr(selector));
        let present: bool = self.evaluate(&script).await?;
        Ok(present.then(|| ElementHandle::new(selector)))
    }

    async fn read_text(&self, element: &ElementHandle) -> ScrapeResult<Option<String>> {
        // A bare `null` result carries no value over CDP, so wrap it.
        let script = format!(
            "(() => {{ const el = {}; \
             return {{ present: el !== null, text: el === null ? '' : (el.innerText ?? el.textContent ?? '') }}; }})()",
            query_expr(&element.selector)
        );
        let read: TextRead = self.evaluate(&script).await?;
        Ok(read.present.then_some(read.text))
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let ChromiumSession {
            browser,
            page,
            handler_task,
            ..
        } = *self;
        let _ = page.close().await;
        shutdown_browser(browser, handler_task).await;
        Ok(())
    }
}

/// Run a page load, failing with a render error if it errors or outlasts
/// `timeout`.
async fn load_within<F, E>(timeout: Duration, load: F) -> ScrapeResult<()>
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, load).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ScrapeError::render(format!("navigation failed: {e}"))),
        Err(_) => Err(ScrapeError::render(format!(
            "navigation timed out after {timeout:?}"
        ))),
    }
}

/// Close the browser, wait for the process to exit, and stop the handler task.
async fn shutdown_browser(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        tracing::debug!("Browser close command failed: {e}");
    }
    if let Err(e) = browser.wait().await {
        tracing::warn!("Failed waiting for Chromium to exit: {e}");
    }
    handler_task.abort();
}
