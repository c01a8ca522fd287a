use anyhow::Result;
use tracing::{debug, info};

use crate::cache::{CacheDir, CacheStatus};
use crate::clients::ContentReader;
use crate::pipeline::StageReport;
use crate::throttle::BatchThrottle;

/// Stage 2: turn each listing URL into a cached plain-text file.
///
/// Entries already valid in the cache are reused untouched unless `force`
/// is set; only actual fetches count toward the batch throttle.
pub struct Materializer<C> {
    reader: C,
    cache: CacheDir,
    throttle: BatchThrottle,
    force: bool,
}

impl<C: ContentReader> Materializer<C> {
    pub fn new(reader: C, cache: CacheDir, throttle: BatchThrottle, force: bool) -> Self {
        Self {
            reader,
            cache,
            throttle,
            force,
        }
    }

    pub async fn materialize(&self, urls: &[String]) -> Result<StageReport> {
        let mut report = StageReport::default();

        // Split cache hits from the URLs that actually need the network,
        // so the throttle sees the real fetch count up front.
        let mut to_fetch = Vec::new();
        for url in urls {
            let stem = match CacheDir::stem_for(url) {
                Ok(s) => s,
                Err(e) => {
                    report.record_skip(url, e.to_string());
                    continue;
                }
            };
            let path = self.cache.text_path(&stem);
            if !self.force && CacheDir::status(&path) == CacheStatus::Valid {
                debug!("Reusing cached content for {}", stem);
                report.record_reused();
                continue;
            }
            to_fetch.push((url.clone(), stem));
        }

        let planned = to_fetch.len();
        info!(
            "Materializing {} of {} URLs ({} already cached)",
            planned,
            urls.len(),
            report.reused
        );

        for (fetched, (url, stem)) in to_fetch.into_iter().enumerate() {
            match self.reader.fetch(&url).await {
                Ok(body) if body.trim().is_empty() => {
                    report.record_skip(&url, "reader returned an empty body");
                }
                Ok(body) => {
                    let path = self.cache.text_path(&stem);
                    match std::fs::write(&path, &body) {
                        Ok(()) => {
                            debug!("Saved {} bytes to {}", body.len(), path.display());
                            report.record_ok();
                        }
                        Err(e) => report.record_skip(&url, format!("write failed: {e}")),
                    }
                }
                Err(e) => {
                    report.record_skip(&url, e.to_string());
                }
            }

            if self.throttle.cooldown_due(fetched + 1, planned) {
                self.throttle.pause().await;
            }
        }

        info!("Materializer finished: {}", report.summary());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn temp_cache() -> CacheDir {
        let n = DIR_SEQ.fetch_add(1, Ordering::SeqCst);
        let root = std::env::temp_dir().join(format!(
            "funda-pipeline-mat-{}-{n}",
            std::process::id()
        ));
        CacheDir::new(root).unwrap()
    }

    /// Serves `Listing text for <url>`, failing URLs that contain "bad";
    /// records every URL it is asked for.
    #[derive(Default, Clone)]
    struct FakeReader {
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ContentReader for FakeReader {
        async fn fetch(&self, listing_url: &str) -> Result<String> {
            self.calls.lock().unwrap().push(listing_url.to_string());
            if listing_url.contains("bad") {
                anyhow::bail!("Reader returned status 429 Too Many Requests");
            }
            Ok(format!("Listing text for {listing_url}"))
        }
    }

    fn quick_throttle() -> BatchThrottle {
        BatchThrottle::new(20, Duration::ZERO)
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("https://www.funda.nl/koop/amsterdam/{n}/"))
            .collect()
    }

    #[tokio::test]
    async fn fetches_and_persists_each_url() {
        let cache = temp_cache();
        let materializer = Materializer::new(FakeReader::default(), cache.clone(), quick_throttle(), false);

        let report = materializer.materialize(&urls(&["huis-1", "huis-2"])).await.unwrap();
        assert_eq!(report.ok, 2);
        assert_eq!(report.reused, 0);
        assert!(report.skipped.is_empty());

        let body = std::fs::read_to_string(cache.text_path("huis-1")).unwrap();
        assert!(body.contains("huis-1"));
    }

    #[tokio::test]
    async fn valid_cache_entries_are_reused_byte_for_byte() {
        let cache = temp_cache();
        std::fs::write(cache.text_path("huis-1"), "original bytes").unwrap();

        let reader = FakeReader::default();
        let materializer = Materializer::new(reader.clone(), cache.clone(), quick_throttle(), false);
        let report = materializer.materialize(&urls(&["huis-1"])).await.unwrap();

        assert_eq!(report.reused, 1);
        assert_eq!(report.ok, 0);
        assert!(reader.calls.lock().unwrap().is_empty());
        assert_eq!(
            std::fs::read_to_string(cache.text_path("huis-1")).unwrap(),
            "original bytes"
        );
    }

    #[tokio::test]
    async fn force_refetches_and_overwrites() {
        let cache = temp_cache();
        std::fs::write(cache.text_path("huis-1"), "original bytes").unwrap();

        let materializer = Materializer::new(FakeReader::default(), cache.clone(), quick_throttle(), true);
        let report = materializer.materialize(&urls(&["huis-1"])).await.unwrap();

        assert_eq!(report.ok, 1);
        assert_eq!(report.reused, 0);
        let body = std::fs::read_to_string(cache.text_path("huis-1")).unwrap();
        assert!(body.contains("huis-1"));
    }

    #[tokio::test]
    async fn empty_cache_files_count_as_stale_and_are_refetched() {
        let cache = temp_cache();
        std::fs::write(cache.text_path("huis-1"), "").unwrap();

        let materializer = Materializer::new(FakeReader::default(), cache.clone(), quick_throttle(), false);
        let report = materializer.materialize(&urls(&["huis-1"])).await.unwrap();

        assert_eq!(report.ok, 1);
        assert!(std::fs::metadata(cache.text_path("huis-1")).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn one_failing_url_does_not_abort_the_rest() {
        let cache = temp_cache();
        let materializer = Materializer::new(FakeReader::default(), cache.clone(), quick_throttle(), false);

        let report = materializer
            .materialize(&urls(&["huis-1", "huis-bad", "huis-3"]))
            .await
            .unwrap();

        assert_eq!(report.ok, 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].id.contains("huis-bad"));
        assert!(report.skipped[0].reason.contains("429"));
        // no partial file for the failed URL
        assert!(!cache.text_path("huis-bad").exists());
        assert!(cache.text_path("huis-3").exists());
    }

    #[tokio::test]
    async fn invalid_urls_are_skipped_without_fetching() {
        let cache = temp_cache();
        let reader = FakeReader::default();
        let materializer = Materializer::new(reader.clone(), cache, quick_throttle(), false);

        let report = materializer
            .materialize(&["not a url".to_string()])
            .await
            .unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert!(reader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn forty_five_fresh_urls_cool_down_exactly_twice() {
        let cache = temp_cache();
        let names: Vec<String> = (1..=45).map(|i| format!("huis-{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();

        let materializer = Materializer::new(
            FakeReader::default(),
            cache,
            BatchThrottle::new(20, Duration::from_secs(60)),
            false,
        );

        let started = tokio::time::Instant::now();
        let report = materializer.materialize(&urls(&name_refs)).await.unwrap();

        assert_eq!(report.ok, 45);
        // two cooldowns (after item 20 and 40), none after item 45
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }
}
