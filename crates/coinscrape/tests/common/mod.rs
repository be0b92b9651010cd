//! Scripted in-memory renderer shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coinscrape::renderer::{ElementHandle, RenderSession, Renderer};
use coinscrape::{ScrapeError, ScrapeResult, Target};

/// How a fake page behaves once navigated to.
#[derive(Debug, Clone, Default)]
pub struct PageScript {
    /// Fail navigation with this message.
    pub navigate_error: Option<String>,
    /// Number of lookups that miss before the element appears.
    /// `None` means it never appears.
    pub appears_after: Option<usize>,
    /// Successive `read_text` results. The last entry repeats forever;
    /// `None` entries simulate a detached element.
    pub reads: Vec<Option<String>>,
    /// Fail the read with this index with a render error.
    pub read_error_at: Option<usize>,
}

impl PageScript {
    /// Element present immediately with text that never changes.
    pub fn fixed(text: &str) -> Self {
        Self::sequence(&[Some(text)])
    }

    /// Element present immediately with scripted reads.
    pub fn sequence(reads: &[Option<&str>]) -> Self {
        Self {
            appears_after: Some(0),
            reads: reads.iter().map(|r| r.map(str::to_string)).collect(),
            ..Default::default()
        }
    }

    /// Element present immediately; text flips from `initial` to `live`
    /// on the given read (0 = initial capture).
    pub fn loads_on_read(initial: &str, live: &str, read: usize) -> Self {
        let mut reads: Vec<Option<&str>> = vec![Some(initial); read];
        reads.push(Some(live));
        Self::sequence(&reads)
    }

    /// The selector never matches.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn appearing_after(mut self, lookups: usize) -> Self {
        self.appears_after = Some(lookups);
        self
    }
}

/// Counters shared between the renderer and its sessions.
#[derive(Debug, Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Renderer that serves scripted pages keyed by URL.
pub struct FakeRenderer {
    pages: Arc<HashMap<String, PageScript>>,
    pub counters: Arc<Counters>,
    fail_open: bool,
}

impl FakeRenderer {
    pub fn new(pages: impl IntoIterator<Item = (String, PageScript)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().collect()),
            counters: Arc::new(Counters::default()),
            fail_open: false,
        }
    }

    /// A renderer with a single page at `url`.
    pub fn single(url: &str, script: PageScript) -> Self {
        Self::new([(url.to_string(), script)])
    }

    /// A renderer whose browser never launches.
    pub fn broken() -> Self {
        Self {
            fail_open: true,
            ..Self::new([])
        }
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn open(&self) -> ScrapeResult<Box<dyn RenderSession>> {
        if self.fail_open {
            return Err(ScrapeError::render("failed to launch Chromium"));
        }
        let c = &self.counters;
        c.opens.fetch_add(1, Ordering::SeqCst);
        let active = c.active.fetch_add(1, Ordering::SeqCst) + 1;
        c.max_active.fetch_max(active, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            pages: Arc::clone(&self.pages),
            counters: Arc::clone(&self.counters),
            script: None,
            lookups: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
        }))
    }
}

pub struct FakeSession {
    pages: Arc<HashMap<String, PageScript>>,
    counters: Arc<Counters>,
    script: Option<PageScript>,
    lookups: AtomicUsize,
    reads: AtomicUsize,
}

impl FakeSession {
    fn script(&self) -> ScrapeResult<&PageScript> {
        self.script
            .as_ref()
            .ok_or_else(|| ScrapeError::render("no page loaded"))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> ScrapeResult<()> {
        let script = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScrapeError::render(format!("navigation failed: {url}")))?;
        if let Some(msg) = &script.navigate_error {
            return Err(ScrapeError::render(msg));
        }
        self.script = Some(script);
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> ScrapeResult<Option<ElementHandle>> {
        let script = self.script()?;
        let n = self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(match script.appears_after {
            Some(after) if n >= after => Some(ElementHandle::new(selector)),
            _ => None,
        })
    }

    async fn read_text(&self, _element: &ElementHandle) -> ScrapeResult<Option<String>> {
        let script = self.script()?;
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if script.read_error_at == Some(n) {
            return Err(ScrapeError::render("target crashed"));
        }
        if script.reads.is_empty() {
            return Ok(None);
        }
        let idx = n.min(script.reads.len() - 1);
        Ok(script.reads[idx].clone())
    }

    async fn close(self: Box<Self>) -> ScrapeResult<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub const SELECTOR: &str = "span.price";

pub fn url_for(symbol: &str) -> String {
    format!("https://prices.example.com/{}", symbol.to_lowercase())
}

pub fn target(symbol: &str) -> Target {
    Target::new(symbol, url_for(symbol), SELECTOR)
}
