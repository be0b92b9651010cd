//! JSONL price history, one record per line, with size-based rotation.
//!
//! Rotated files are named `<file>.1`, `<file>.2`, and so on; the oldest is
//! dropped once `MAX_ROTATIONS` is reached.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use coinscrape::{PriceRecord, ResultSet};
use serde::Serialize;

/// Default history size before rotation (10 MB).
pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated history files to keep.
const MAX_ROTATIONS: u32 = 5;

/// One history line.
#[derive(Debug, Serialize)]
struct HistoryLine<'a> {
    run_id: &'a str,
    #[serde(flatten)]
    record: &'a PriceRecord,
}

/// Append-only history writer.
pub struct HistoryWriter {
    file: File,
    path: PathBuf,
    max_size: u64,
    current_size: u64,
}

impl HistoryWriter {
    /// Open or create the history file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = open_append(path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_path_buf(),
            max_size: DEFAULT_MAX_SIZE,
            current_size,
        })
    }

    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append every record of a run. Returns the number of lines written.
    pub fn append_run(&mut self, results: &ResultSet) -> Result<usize> {
        for record in results {
            self.append(&results.run_id, record)?;
        }
        self.file.flush()?;
        Ok(results.len())
    }

    fn append(&mut self, run_id: &str, record: &PriceRecord) -> Result<()> {
        if self.current_size >= self.max_size {
            self.rotate()?;
        }

        let json = serde_json::to_string(&HistoryLine { run_id, record })?;
        writeln!(self.file, "{json}")
            .with_context(|| format!("failed to write history: {}", self.path.display()))?;
        self.current_size += json.len() as u64 + 1;
        Ok(())
    }

    /// Shift `<file>` to `<file>.1`, `.1` to `.2`, and so on.
    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        let oldest = rotation_path(&self.path, MAX_ROTATIONS);
        if oldest.exists() {
            let _ = std::fs::remove_file(&oldest);
        }
        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            if from.exists() {
                let _ = std::fs::rename(&from, rotation_path(&self.path, i + 1));
            }
        }
        std::fs::rename(&self.path, rotation_path(&self.path, 1))
            .with_context(|| format!("failed to rotate history: {}", self.path.display()))?;

        self.file = open_append(&self.path)?;
        self.current_size = 0;
        tracing::debug!("Rotated history file {}", self.path.display());
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open history file: {}", path.display()))
}

fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("history.jsonl")
    );
    base.with_file_name(name)
}
