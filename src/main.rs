mod cache;
mod clients;
mod models;
mod pipeline;
mod throttle;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::CacheDir;
use clients::{ChromeRenderer, InfluxSink, OpenAiExtractor, ReaderClient};
use clients::{FetchPolicy, StoreConfig};
use pipeline::{LinkDiscoverer, Materializer, MetricRecorder, StructuredExtractor};
use throttle::BatchThrottle;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let city = env_or("FUNDA_CITY", "amsterdam");
    let pages: u32 = env_or("FUNDA_PAGES", "1")
        .parse()
        .context("FUNDA_PAGES must be a number")?;
    let force_refresh = env_or("FUNDA_REFRESH", "0") == "1";
    let cache = CacheDir::new(env_or("FUNDA_CACHE_DIR", "cache"))?;

    info!("🏠 Funda Pipeline — {city}, {pages} page(s)");

    // Stage 1: discover listing URLs
    let wait_secs: u64 = env_or("FUNDA_WAIT_TIMEOUT", "20")
        .parse()
        .context("FUNDA_WAIT_TIMEOUT must be a number of seconds")?;
    let renderer = ChromeRenderer::new()?;
    let discoverer =
        LinkDiscoverer::new(renderer).with_wait_timeout(std::time::Duration::from_secs(wait_secs));
    let urls = discoverer.discover(&city, pages)?;
    std::fs::write(cache.links_path(), urls.join("\n") + "\n")?;
    info!("💾 Saved {} listing URLs to {}", urls.len(), cache.links_path().display());
    // Chrome is not needed past this point
    drop(discoverer);

    // Stage 2: materialize page text
    let reader = ReaderClient::new(env_or("READER_ENDPOINT", "https://r.jina.ai"), FetchPolicy::default())?;
    let materializer = Materializer::new(reader, cache.clone(), BatchThrottle::default(), force_refresh);
    let report = materializer.materialize(&urls).await?;
    info!("📄 Materializer: {}", report.summary());

    // Stage 3: structured extraction
    let mut llm = OpenAiExtractor::new(env_required("OPENAI_API_KEY")?)?
        .with_model(env_or("OPENAI_MODEL", "gpt-4o"));
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        llm = llm.with_base_url(base_url);
    }
    let extractor = StructuredExtractor::new(llm, cache.clone());
    let report = extractor.extract(&cache.text_files()?).await?;
    info!("🧾 Extractor: {}", report.summary());

    // Stage 4: write metric points
    let store = StoreConfig::new(
        env_required("INFLUXDB_URL")?,
        env_required("INFLUXDB_TOKEN")?,
        env_required("INFLUXDB_ORG")?,
        env_required("INFLUXDB_BUCKET")?,
    )?;
    let recorder = MetricRecorder::new(InfluxSink::new(store)?);
    let report = recorder.record(&cache.record_files()?).await?;
    info!("📈 Recorder: {}", report.summary());

    Ok(())
}
