pub mod discover;
pub mod extract;
pub mod materialize;
pub mod record;

pub use discover::LinkDiscoverer;
pub use extract::StructuredExtractor;
pub use materialize::Materializer;
pub use record::MetricRecorder;

use tracing::warn;

/// One skipped item and the reason it was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct Skip {
    pub id: String,
    pub reason: String,
}

/// Per-run summary of one stage: items that went through, cache hits that
/// were reused as-is, and items skipped with their reasons. Single-item
/// failures land here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct StageReport {
    pub ok: usize,
    pub reused: usize,
    pub skipped: Vec<Skip>,
}

impl StageReport {
    pub fn record_ok(&mut self) {
        self.ok += 1;
    }

    pub fn record_reused(&mut self) {
        self.reused += 1;
    }

    pub fn record_skip(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        let skip = Skip {
            id: id.into(),
            reason: reason.into(),
        };
        warn!("Skipping {}: {}", skip.id, skip.reason);
        self.skipped.push(skip);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ok, {} reused from cache, {} skipped",
            self.ok,
            self.reused,
            self.skipped.len()
        )
    }
}
