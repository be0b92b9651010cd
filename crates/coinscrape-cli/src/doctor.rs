//! Environment checks: is there a browser to drive and a usable target file?

use std::fmt;
use std::path::PathBuf;

use coinscrape::config::TARGETS_ENV;
use coinscrape::renderer::chromium::find_chromium;
use coinscrape::{resolve_targets_path, ScrapeConfig};

/// Result of `coinscrape doctor`.
#[derive(Debug)]
pub struct DoctorReport {
    pub chromium: Option<PathBuf>,
    /// `None` when the built-in targets are used.
    pub targets_file: Option<PathBuf>,
    /// Target count, or why the configuration is unusable.
    pub targets: Result<usize, String>,
}

impl DoctorReport {
    pub fn collect(explicit_targets: Option<&str>) -> Self {
        let targets_file = resolve_targets_path(explicit_targets);
        let targets = ScrapeConfig::resolve(explicit_targets)
            .map(|c| c.targets.len())
            .map_err(|e| e.to_string());
        Self {
            chromium: find_chromium(),
            targets_file,
            targets,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.chromium.is_some() && self.targets.is_ok()
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chromium {
            Some(path) => writeln!(f, "[ok]   chromium: {}", path.display())?,
            None => writeln!(
                f,
                "[fail] chromium: not found (install Chrome or set COINSCRAPE_CHROMIUM_PATH)"
            )?,
        }

        let source = match &self.targets_file {
            Some(path) => path.display().to_string(),
            None => format!("built-in (no --targets, {TARGETS_ENV}, or ./coinscrape.json)"),
        };
        match &self.targets {
            Ok(n) => writeln!(f, "[ok]   targets: {n} from {source}"),
            Err(e) => writeln!(f, "[fail] targets: {source}: {e}"),
        }
    }
}
