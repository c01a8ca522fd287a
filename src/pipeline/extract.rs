use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::cache::CacheDir;
use crate::clients::PropertyExtractor;
use crate::models::{PropertyRecord, SchemaCheck};
use crate::pipeline::StageReport;

/// Stage 3: run each cached text file through the LLM collaborator and
/// persist the schema-valid records. A record file only appears for a
/// fully valid response; failures of any kind leave nothing behind.
pub struct StructuredExtractor<E> {
    extractor: E,
    cache: CacheDir,
}

impl<E: PropertyExtractor> StructuredExtractor<E> {
    pub fn new(extractor: E, cache: CacheDir) -> Self {
        Self { extractor, cache }
    }

    pub async fn extract(&self, text_files: &[PathBuf]) -> Result<StageReport> {
        let mut report = StageReport::default();
        info!("Extracting {} cached listings", text_files.len());

        for path in text_files {
            let stem = file_stem(path);

            let text = match std::fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    report.record_skip(&stem, format!("unreadable: {e}"));
                    continue;
                }
            };

            let response = match self.extractor.extract(&text).await {
                Ok(v) => v,
                Err(e) => {
                    report.record_skip(&stem, format!("extraction failed: {e}"));
                    continue;
                }
            };

            let record = match PropertyRecord::check(response) {
                SchemaCheck::Valid(r) => r,
                SchemaCheck::Violation(reason) => {
                    report.record_skip(&stem, reason);
                    continue;
                }
            };

            // Serialize fully before touching the file
            let json = match serde_json::to_string_pretty(&record) {
                Ok(j) => j,
                Err(e) => {
                    report.record_skip(&stem, format!("serialization failed: {e}"));
                    continue;
                }
            };
            let out = self.cache.record_path(&stem);
            match std::fs::write(&out, json) {
                Ok(()) => {
                    debug!("Wrote record {}", out.display());
                    report.record_ok();
                }
                Err(e) => report.record_skip(&stem, format!("write failed: {e}")),
            }
        }

        info!("Extractor finished: {}", report.summary());
        Ok(report)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}
