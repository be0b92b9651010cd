//! Collation driver: scrape every target and merge the successes.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tracing::Instrument;

use crate::error::{ScrapeError, ScrapeResult};
use crate::extractor::Extractor;
use crate::progress::{ProgressEmitter, ProgressEventKind, ProgressSender};
use crate::record::normalize;
use crate::renderer::Renderer;
use crate::types::{CollationSummary, PriceRecord, ResultSet, Target, TargetFailure};

/// Runs the extractor and record builder over a list of targets.
///
/// A failing target is logged, counted, and skipped; it never aborts the
/// batch. The run fails with [`ScrapeError::NoDataCollected`] only when no
/// target produced a record.
pub struct Collator {
    renderer: Arc<dyn Renderer>,
    extractor: Extractor,
    concurrency: usize,
    progress: Option<ProgressSender>,
}

impl Collator {
    /// Create a sequential collator: one session at a time, in target order.
    pub fn new(renderer: Arc<dyn Renderer>, extractor: Extractor) -> Self {
        Self {
            renderer,
            extractor,
            concurrency: 1,
            progress: None,
        }
    }

    /// Publish progress events to `tx` during each run.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Scrape up to `n` targets at once, each with its own session.
    /// Records still come back in target order. Zero is treated as one.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Scrape all targets and return the records that succeeded.
    pub async fn collate(&self, targets: &[Target]) -> ScrapeResult<ResultSet> {
        let emitter = ProgressEmitter::new(self.progress.clone(), uuid::Uuid::new_v4().to_string());
        let start = Instant::now();

        tracing::info!(
            run_id = emitter.run_id(),
            targets = targets.len(),
            concurrency = self.concurrency,
            "Starting collation run"
        );
        emitter.emit(ProgressEventKind::RunStarted {
            targets: targets.len(),
        });

        let emitter_ref = &emitter;
        let outcomes: Vec<(&Target, ScrapeResult<PriceRecord>)> = futures::stream::iter(targets)
            .map(|target| {
                let span = tracing::info_span!("target", symbol = %target.asset_symbol);
                async move { (target, self.run_target(target, emitter_ref).await) }
                    .instrument(span)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut records = Vec::with_capacity(outcomes.len());
        let mut summary = CollationSummary {
            attempted: outcomes.len(),
            ..Default::default()
        };
        for (target, outcome) in outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(e) => summary.failures.push(TargetFailure {
                    asset_symbol: target.asset_symbol.clone(),
                    error: e.to_string(),
                }),
            }
        }
        summary.succeeded = records.len();
        summary.failed = summary.failures.len();

        let elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            run_id = emitter.run_id(),
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms,
            "Collation run finished"
        );
        emitter.emit(ProgressEventKind::RunComplete {
            attempted: summary.attempted,
            succeeded: summary.succeeded,
            failed: summary.failed,
            elapsed_ms,
        });

        if records.is_empty() {
            return Err(ScrapeError::NoDataCollected {
                attempted: summary.attempted,
            });
        }

        Ok(ResultSet {
            run_id: emitter.run_id().to_string(),
            records,
            summary,
        })
    }

    /// Scrape a single target: extract its text and normalize it.
    pub async fn scrape_target(&self, target: &Target) -> ScrapeResult<PriceRecord> {
        let observation = self
            .extractor
            .extract(
                self.renderer.as_ref(),
                &target.page_url,
                &target.element_selector,
            )
            .await?;

        normalize(
            &observation.text,
            observation.observed_at,
            &target.asset_symbol,
            &target.page_url,
        )
    }

    async fn run_target(
        &self,
        target: &Target,
        emitter: &ProgressEmitter,
    ) -> ScrapeResult<PriceRecord> {
        let start = Instant::now();
        emitter.emit(ProgressEventKind::TargetStarted {
            asset_symbol: target.asset_symbol.clone(),
            url: target.page_url.clone(),
        });

        let result = self.scrape_target(target).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(record) => {
                tracing::info!(price = %record.price, elapsed_ms, "Scraped price");
                emitter.emit(ProgressEventKind::TargetSucceeded {
                    asset_symbol: target.asset_symbol.clone(),
                    price: record.price.to_string(),
                    elapsed_ms,
                });
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), elapsed_ms, "Skipping target: {e}");
                emitter.emit(ProgressEventKind::TargetFailed {
                    asset_symbol: target.asset_symbol.clone(),
                    kind: e.kind().to_string(),
                    error: e.to_string(),
                    elapsed_ms,
                });
            }
        }

        result
    }
}
