use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// State of a cache entry for one listing stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// No file on disk.
    Absent,
    /// File exists and has content.
    Valid,
    /// File exists but is unusable (empty), should be re-fetched.
    Stale,
}

/// On-disk cache shared by all pipeline stages.
///
/// Every stage keys its output by the same stem, derived from the listing
/// URL's final path segment, so `<stem>.txt` (materialized text) and
/// `<stem>.json` (extracted record) of one listing sit next to each other.
#[derive(Debug, Clone)]
pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache directory {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the cache key for a listing URL: its last non-empty path
    /// segment (funda URLs end in a slug like `appartement-koop-...-12345/`).
    pub fn stem_for(listing_url: &str) -> Result<String> {
        let parsed = Url::parse(listing_url)
            .with_context(|| format!("Invalid listing URL: {listing_url}"))?;
        let stem = parsed
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .last()
            .map(str::to_string);
        stem.filter(|s| !s.is_empty())
            .with_context(|| format!("Listing URL has no path segment: {listing_url}"))
    }

    /// Path of the materialized text for a stem (stage 2 output).
    pub fn text_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.txt"))
    }

    /// Path of the structured record for a stem (stage 3 output).
    pub fn record_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.json"))
    }

    /// Path of the persisted listing-URL list (stage 1 output).
    pub fn links_path(&self) -> PathBuf {
        self.root.join("links.txt")
    }

    pub fn status(path: &Path) -> CacheStatus {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => CacheStatus::Valid,
            Ok(_) => CacheStatus::Stale,
            Err(_) => CacheStatus::Absent,
        }
    }

    /// All materialized text files in the cache, sorted by name.
    pub fn text_files(&self) -> Result<Vec<PathBuf>> {
        self.files_with_extension("txt")
    }

    /// All structured record files in the cache, sorted by name.
    pub fn record_files(&self) -> Result<Vec<PathBuf>> {
        self.files_with_extension("json")
    }

    fn files_with_extension(&self, ext: &str) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read cache directory {}", self.root.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ext)
                && path.file_stem().and_then(|s| s.to_str()) != Some("links")
            {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
