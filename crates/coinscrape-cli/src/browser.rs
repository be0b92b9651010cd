//! Renderer selection for the binary.

use std::sync::Arc;

use coinscrape::renderer::chromium::ChromiumRenderer;
use coinscrape::renderer::NoopRenderer;
use coinscrape::{RenderOptions, Renderer, ScrapeResult};

/// Launch-ready Chromium renderer, or a [`NoopRenderer`] carrying the reason
/// Chromium is unusable. With the fallback every target fails with a render
/// error, which the run reports like any other target failure.
pub fn build_renderer(show_browser: bool) -> Arc<dyn Renderer> {
    renderer_or_noop(ChromiumRenderer::new(RenderOptions {
        headless: !show_browser,
        ..Default::default()
    }))
}

pub fn renderer_or_noop(chromium: ScrapeResult<ChromiumRenderer>) -> Arc<dyn Renderer> {
    match chromium {
        Ok(renderer) => Arc::new(renderer),
        Err(e) => {
            tracing::warn!("No usable browser, every target will fail: {e}");
            Arc::new(NoopRenderer::new(e.to_string()))
        }
    }
}
