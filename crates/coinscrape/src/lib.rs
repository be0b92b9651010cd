//! Coinscrape: headless-browser price scraper for client-rendered pages.
//!
//! A collation run walks a list of [`Target`]s. For each one it opens a fresh
//! renderer session, waits for the price element to appear *and* to be
//! populated by the page's own scripts, normalizes the text into a
//! [`PriceRecord`], and closes the session. Failing targets are skipped and
//! counted; the run only fails when nothing was collected.
//!
//! The browser is behind the [`renderer::Renderer`] trait. The default
//! `chromium` feature provides [`renderer::chromium::ChromiumRenderer`].

pub mod collate;
pub mod config;
pub mod error;
pub mod extractor;
pub mod poll;
pub mod progress;
pub mod record;
pub mod renderer;
pub mod types;

pub use collate::Collator;
pub use config::{resolve_targets_path, ScrapeConfig, ScrapeSettings};
pub use error::{ScrapeError, ScrapeResult};
pub use extractor::{ExtractOptions, Extractor, TimeoutPolicy};
pub use record::normalize;
pub use renderer::{RenderOptions, RenderSession, Renderer};
pub use types::*;
