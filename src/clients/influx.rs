use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::models::{MetricPoint, MEASUREMENT};

/// Time-series store collaborator. Writes are synchronous: the call
/// resolves only once the store has acknowledged or rejected the point.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn write(&self, point: &MetricPoint) -> Result<()>;
}

/// Connection parameters for an InfluxDB-v2-style store. All fields are
/// required and validated up front; there are no silent environment
/// fallbacks at write time.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl StoreConfig {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        org: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            org: org.into(),
            bucket: bucket.into(),
        };
        for (name, value) in [
            ("url", &config.url),
            ("token", &config.token),
            ("org", &config.org),
            ("bucket", &config.bucket),
        ] {
            if value.trim().is_empty() {
                anyhow::bail!("Store config field {name} must not be empty");
            }
        }
        Ok(config)
    }
}

/// HTTP client for the InfluxDB v2 write endpoint (line protocol).
pub struct InfluxSink {
    client: Client,
    config: StoreConfig,
}

impl InfluxSink {
    pub fn new(config: StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }
}

/// Line-protocol tag values must escape commas, spaces and equals signs.
fn escape_tag(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
        .replace('=', "\\=")
}

/// Render one point as an InfluxDB line, second-precision timestamp.
pub fn line_protocol(point: &MetricPoint, timestamp_secs: i64) -> String {
    let fields = point
        .fields()
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{MEASUREMENT},neighborhood={} {} {}",
        escape_tag(&point.neighborhood),
        fields,
        timestamp_secs
    )
}

#[async_trait]
impl MetricSink for InfluxSink {
    async fn write(&self, point: &MetricPoint) -> Result<()> {
        let line = line_protocol(point, Utc::now().timestamp());
        debug!("Writing point: {}", line);

        let response = self
            .client
            .post(format!("{}/api/v2/write", self.config.url))
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "s"),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await
            .context("Failed to reach time-series store")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Store write failed with {status}: {body}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point() -> MetricPoint {
        MetricPoint {
            neighborhood: "De Pijp".to_string(),
            living_area: 80.0,
            balcony_area: 6.5,
            external_storage: 0.0,
            volume: 260.0,
            total_rooms: 3.0,
            bedrooms: 2.0,
            bathrooms: 0.0,
            price: 400000.0,
            price_per_sqm: 5000.0,
        }
    }

    #[test]
    fn line_protocol_has_measurement_tag_and_all_nine_fields() {
        let line = line_protocol(&sample_point(), 1700000000);
        assert!(line.starts_with("real_estate,neighborhood=De\\ Pijp "));
        assert!(line.ends_with(" 1700000000"));

        let fields = line.split(' ').nth(2).unwrap();
        assert_eq!(fields.split(',').count(), 9);
        assert!(fields.contains("living_area=80"));
        assert!(fields.contains("balcony_area=6.5"));
        assert!(fields.contains("price=400000"));
        assert!(fields.contains("price_per_sqm=5000"));
    }

    #[test]
    fn tag_escaping_covers_commas_and_equals() {
        assert_eq!(escape_tag("a,b=c d"), "a\\,b\\=c\\ d");
    }

    #[test]
    fn store_config_rejects_blank_fields() {
        assert!(StoreConfig::new("http://localhost:8086", "", "org", "bucket").is_err());
        assert!(StoreConfig::new("", "token", "org", "bucket").is_err());
        let config = StoreConfig::new("http://localhost:8086/", "t", "o", "b").unwrap();
        assert_eq!(config.url, "http://localhost:8086");
    }
}
