use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::clients::MetricSink;
use crate::models::{MetricPoint, PropertyRecord, SchemaCheck};
use crate::pipeline::StageReport;

/// Stage 4: flatten each persisted record into one tagged point and write
/// it to the time-series store. One sink serves the whole batch; a bad
/// file or rejected write skips that record only.
pub struct MetricRecorder<S> {
    sink: S,
}

impl<S: MetricSink> MetricRecorder<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub async fn record(&self, record_files: &[PathBuf]) -> Result<StageReport> {
        let mut report = StageReport::default();
        info!("Recording {} property records", record_files.len());

        for path in record_files {
            let stem = file_stem(path);

            let raw = match std::fs::read_to_string(path) {
                Ok(r) => r,
                Err(e) => {
                    report.record_skip(&stem, format!("unreadable: {e}"));
                    continue;
                }
            };
            let value: serde_json::Value = match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(e) => {
                    report.record_skip(&stem, format!("malformed JSON: {e}"));
                    continue;
                }
            };
            let record = match PropertyRecord::check(value) {
                SchemaCheck::Valid(r) => r,
                SchemaCheck::Violation(reason) => {
                    report.record_skip(&stem, reason);
                    continue;
                }
            };

            let point = MetricPoint::from_record(&record);
            match self.sink.write(&point).await {
                Ok(()) => {
                    debug!("Wrote point for {} ({})", stem, point.neighborhood);
                    report.record_ok();
                }
                Err(e) => report.record_skip(&stem, format!("store write failed: {e}")),
            }
        }

        info!("Recorder finished: {}", report.summary());
        Ok(report)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
