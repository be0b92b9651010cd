//! Target list and timing configuration: loading, validation, resolution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScrapeError, ScrapeResult};
use crate::extractor::{ExtractOptions, TimeoutPolicy};
use crate::types::Target;

/// Environment variable naming a target file.
pub const TARGETS_ENV: &str = "COINSCRAPE_TARGETS";

/// Target file picked up from the working directory when nothing else is set.
pub const LOCAL_TARGETS_FILE: &str = "coinscrape.json";

/// Price element on coinmarketcap.com currency pages.
pub const DEFAULT_SELECTOR: &str = "span.sc-65e7f566-0.WXGwg.base-text";

/// Built-in targets: BTC, ETH, and SOL on coinmarketcap.com.
pub fn default_targets() -> Vec<Target> {
    [
        ("BTC", "bitcoin"),
        ("ETH", "ethereum"),
        ("SOL", "solana"),
    ]
    .iter()
    .map(|(symbol, slug)| {
        Target::new(
            *symbol,
            format!("https://coinmarketcap.com/currencies/{slug}/"),
            DEFAULT_SELECTOR,
        )
    })
    .collect()
}

/// Wait-protocol timings as stored in a target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrapeSettings {
    pub presence_timeout_ms: u64,
    pub update_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub timeout_policy: TimeoutPolicy,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self::from(&ExtractOptions::default())
    }
}

impl From<&ExtractOptions> for ScrapeSettings {
    fn from(opts: &ExtractOptions) -> Self {
        Self {
            presence_timeout_ms: opts.presence_timeout.as_millis() as u64,
            update_timeout_ms: opts.update_timeout.as_millis() as u64,
            poll_interval_ms: opts.poll_interval.as_millis() as u64,
            timeout_policy: opts.timeout_policy,
        }
    }
}

impl ScrapeSettings {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            presence_timeout: Duration::from_millis(self.presence_timeout_ms),
            update_timeout: Duration::from_millis(self.update_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            timeout_policy: self.timeout_policy,
        }
    }
}

/// A full target file: optional settings plus the ordered target list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeConfig {
    #[serde(default)]
    pub settings: ScrapeSettings,
    pub targets: Vec<Target>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            settings: ScrapeSettings::default(),
            targets: default_targets(),
        }
    }
}

impl ScrapeConfig {
    /// Parse and validate a JSON target file.
    pub fn from_json(json: &str) -> ScrapeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a target file.
    pub fn load(path: &Path) -> ScrapeResult<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&data)
    }

    /// Load the file chosen by [`resolve_targets_path`], or the built-in
    /// targets when no file is configured.
    pub fn resolve(explicit: Option<&str>) -> ScrapeResult<Self> {
        match resolve_targets_path(explicit) {
            Some(path) => {
                tracing::debug!("Loading targets from {}", path.display());
                Self::load(&path)
            }
            None => {
                tracing::debug!("No target file configured, using built-in targets");
                Ok(Self::default())
            }
        }
    }

    /// Check that targets are usable before any browser is launched.
    pub fn validate(&self) -> ScrapeResult<()> {
        if self.targets.is_empty() {
            return Err(ScrapeError::Config("no targets configured".into()));
        }
        if self.settings.poll_interval_ms == 0 {
            return Err(ScrapeError::Config("poll_interval_ms must be > 0".into()));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            let symbol = target.asset_symbol.trim();
            if symbol.is_empty() {
                return Err(ScrapeError::Config("target with empty asset_symbol".into()));
            }
            if !seen.insert(symbol) {
                return Err(ScrapeError::Config(format!(
                    "duplicate asset_symbol: {symbol}"
                )));
            }
            if target.element_selector.trim().is_empty() {
                return Err(ScrapeError::Config(format!(
                    "{symbol}: element_selector is empty"
                )));
            }
            let url = url::Url::parse(&target.page_url).map_err(|e| {
                ScrapeError::Config(format!("{symbol}: invalid page_url {:?}: {e}", target.page_url))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ScrapeError::Config(format!(
                    "{symbol}: page_url must be http or https, got {}",
                    url.scheme()
                )));
            }
        }
        Ok(())
    }
}

/// Resolve the target file path.
///
/// Order: explicit path, then `COINSCRAPE_TARGETS`, then `./coinscrape.json`
/// if it exists. `None` means "use the built-in targets".
pub fn resolve_targets_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }

    if let Ok(env_path) = std::env::var(TARGETS_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let local = PathBuf::from(LOCAL_TARGETS_FILE);
    if local.exists() {
        return Some(local);
    }

    None
}
