//! Progress event types and broadcast channel for collation telemetry.
//!
//! The collator emits `ProgressEvent`s while it works through its targets.
//! They flow through a `tokio::sync::broadcast` channel to every subscriber
//! (CLI progress output, history writers, tests). When no subscriber exists,
//! events are silently dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// A progress event emitted during a collation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A run has started.
    RunStarted { targets: usize },
    /// Extraction for one target has started.
    TargetStarted { asset_symbol: String, url: String },
    /// A target produced a record.
    TargetSucceeded {
        asset_symbol: String,
        price: String,
        elapsed_ms: u64,
    },
    /// A target was skipped.
    TargetFailed {
        asset_symbol: String,
        kind: String,
        error: String,
        elapsed_ms: u64,
    },
    /// The run finished (successfully or not).
    RunComplete {
        attempted: usize,
        succeeded: usize,
        failed: usize,
        elapsed_ms: u64,
    },
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// A run emits two events per target plus two bookend events, so 256 covers
/// well over a hundred targets before a slow subscriber starts lagging.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Stamps events with a run id and sequence number before sending them.
///
/// Shared by concurrent target tasks, so the counter is atomic.
#[derive(Debug)]
pub struct ProgressEmitter {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: AtomicU64,
}

impl ProgressEmitter {
    pub fn new(tx: Option<ProgressSender>, run_id: impl Into<String>) -> Self {
        Self {
            tx,
            run_id: run_id.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit an event, ignoring send errors (no receivers listening).
    pub fn emit(&self, event: ProgressEventKind) {
        if let Some(ref sender) = self.tx {
            let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
            let _ = sender.send(ProgressEvent {
                run_id: self.run_id.clone(),
                seq,
                event,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_serialization() {
        let event = ProgressEvent {
            run_id: "run-1".to_string(),
            seq: 1,
            event: ProgressEventKind::TargetFailed {
                asset_symbol: "ETH".to_string(),
                kind: "selector_not_found".to_string(),
                error: "Selector not found".to_string(),
                elapsed_ms: 10_000,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"TargetFailed\""));
        assert!(json.contains("selector_not_found"));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, "run-1");
        assert_eq!(parsed.event, event.event);
    }

    #[test]
    fn test_emitter_sequences_events() {
        let (tx, mut rx) = channel();
        let emitter = ProgressEmitter::new(Some(tx), "run-7");
        emitter.emit(ProgressEventKind::RunStarted { targets: 2 });
        emitter.emit(ProgressEventKind::TargetStarted {
            asset_symbol: "BTC".into(),
            url: "https://example.com".into(),
        });

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));
        assert_eq!(first.run_id, "run-7");
    }

    #[test]
    fn test_channel_no_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        // Should not panic
        ProgressEmitter::new(Some(tx), "run").emit(ProgressEventKind::RunStarted { targets: 0 });
    }

    #[test]
    fn test_emit_none_sender() {
        ProgressEmitter::new(None, "run").emit(ProgressEventKind::RunStarted { targets: 1 });
    }
}
