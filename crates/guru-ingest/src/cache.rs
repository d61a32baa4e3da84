//! Per-repo disk cache for scraped PR data.
//!
//! Scraping a repository costs hundreds of API calls; re-running the
//! pipeline should not repeat them. Each repo gets one JSON file, and an
//! index file records when it was written so stale entries re-scrape.
//! The ranking core never touches this — caching is purely an ingestion
//! concern.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use guru_core::{GuruError, PullRequestRecord};
use serde::{Deserialize, Serialize};

const INDEX_FILE: &str = "cache_index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    pr_count: usize,
}

/// Disk cache of scraped PRs, one JSON file per repository.
///
/// # Examples
///
/// ```
/// use guru_ingest::cache::PrCache;
///
/// let dir = tempfile::tempdir().unwrap();
/// let cache = PrCache::new(dir.path());
/// assert!(cache.load("facebook/react", 7).unwrap().is_none());
/// ```
pub struct PrCache {
    dir: PathBuf,
}

impl PrCache {
    /// Create a cache rooted at `dir`. The directory is created lazily on
    /// first store.
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// Load cached PRs for `repo` if the entry is younger than
    /// `max_age_days`. Stale or missing entries return `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Io`] or [`GuruError::Serialization`] when an
    /// existing cache file cannot be read.
    pub fn load(
        &self,
        repo: &str,
        max_age_days: u64,
    ) -> Result<Option<Vec<PullRequestRecord>>, GuruError> {
        let index = self.load_index()?;
        let Some(entry) = index.get(repo) else {
            return Ok(None);
        };

        let age = Utc::now() - entry.cached_at;
        if age > Duration::days(max_age_days as i64) {
            return Ok(None);
        }

        let path = self.repo_path(repo);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let records: Vec<PullRequestRecord> = serde_json::from_str(&content)?;
        Ok(Some(records))
    }

    /// Store scraped PRs for `repo` and update the index.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Io`] on write failure.
    pub fn store(&self, repo: &str, records: &[PullRequestRecord]) -> Result<(), GuruError> {
        std::fs::create_dir_all(&self.dir)?;

        let path = self.repo_path(repo);
        let content = serde_json::to_string_pretty(records)?;
        std::fs::write(&path, content)?;

        let mut index = self.load_index()?;
        index.insert(
            repo.to_string(),
            CacheEntry {
                cached_at: Utc::now(),
                pr_count: records.len(),
            },
        );
        let index_content = serde_json::to_string_pretty(&index)?;
        std::fs::write(self.dir.join(INDEX_FILE), index_content)?;

        Ok(())
    }

    /// Repositories currently present in the cache index.
    pub fn cached_repos(&self) -> Result<Vec<String>, GuruError> {
        let index = self.load_index()?;
        let mut repos: Vec<String> = index.into_keys().collect();
        repos.sort();
        Ok(repos)
    }

    fn load_index(&self) -> Result<HashMap<String, CacheEntry>, GuruError> {
        let path = self.dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn repo_path(&self, repo: &str) -> PathBuf {
        self.dir.join(format!("{}.json", repo.replace('/', "_")))
    }
}
