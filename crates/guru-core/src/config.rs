use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GuruError;

/// Top-level configuration loaded from `.guru.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use guru_core::GuruConfig;
///
/// let config = GuruConfig::default();
/// assert_eq!(config.rank.retrieval_limit, 50);
/// assert_eq!(config.github.max_prs_per_repo, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuruConfig {
    /// GitHub PR source settings.
    #[serde(default)]
    pub github: GithubConfig,
    /// Scrape-cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Vector index settings.
    #[serde(default)]
    pub index: IndexConfig,
    /// Expert ranking weights and limits.
    #[serde(default)]
    pub rank: RankConfig,
}

impl GuruConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Io`] if the file cannot be read, or
    /// [`GuruError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guru_core::GuruConfig;
    /// use std::path::Path;
    ///
    /// let config = GuruConfig::from_file(Path::new(".guru.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, GuruError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use guru_core::GuruConfig;
    ///
    /// let toml = r#"
    /// [rank]
    /// top_n = 5
    /// "#;
    /// let config = GuruConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.rank.top_n, 5);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, GuruError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// GitHub PR source configuration.
///
/// # Examples
///
/// ```
/// use guru_core::GithubConfig;
///
/// let config = GithubConfig::default();
/// assert_eq!(config.min_lines_changed, 50);
/// assert!(config.bot_authors.iter().any(|b| b == "dependabot"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token. Falls back to `GITHUB_TOKEN` env var.
    pub token: Option<String>,
    /// API base URL (default: `https://api.github.com`).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Repositories to mine (`owner/repo`).
    #[serde(default)]
    pub target_repos: Vec<String>,
    /// Merged PRs to collect per repository (default: 100).
    #[serde(default = "default_max_prs_per_repo")]
    pub max_prs_per_repo: usize,
    /// Minimum lines changed for a PR to be collected (default: 50).
    #[serde(default = "default_min_lines_changed")]
    pub min_lines_changed: u64,
    /// Ignore PRs older than this many days (default: 730).
    #[serde(default = "default_max_pr_age_days")]
    pub max_pr_age_days: u64,
    /// Author handles treated as bots and skipped.
    #[serde(default = "default_bot_authors")]
    pub bot_authors: Vec<String>,
}

fn default_api_url() -> String {
    "https://api.github.com".into()
}

fn default_max_prs_per_repo() -> usize {
    100
}

fn default_min_lines_changed() -> u64 {
    50
}

fn default_max_pr_age_days() -> u64 {
    730
}

fn default_bot_authors() -> Vec<String> {
    vec![
        "dependabot".into(),
        "dependabot-preview".into(),
        "renovate".into(),
        "renovate-bot".into(),
    ]
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_api_url(),
            target_repos: Vec::new(),
            max_prs_per_repo: default_max_prs_per_repo(),
            min_lines_changed: default_min_lines_changed(),
            max_pr_age_days: default_max_pr_age_days(),
            bot_authors: default_bot_authors(),
        }
    }
}

/// Scrape-cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the per-repo disk cache (default: true).
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache directory (default: `data/cache`).
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    /// Re-scrape entries older than this many days (default: 7).
    #[serde(default = "default_cache_max_age_days")]
    pub max_age_days: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> String {
    "data/cache".into()
}

fn default_cache_max_age_days() -> u64 {
    7
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
            max_age_days: default_cache_max_age_days(),
        }
    }
}

/// Configuration for the embedding provider.
///
/// The provider is any OpenAI-compatible `/embeddings` endpoint; local
/// servers work by pointing `base_url` at them and matching `dimensions`
/// to the model (384/768/1536 are the common sizes).
///
/// # Examples
///
/// ```
/// use guru_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.model, "text-embedding-3-small");
/// assert_eq!(config.dimensions, 1536);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name (default: `"openai"`).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    /// Model name (default: `"text-embedding-3-small"`).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions (default: 1536).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
}

fn default_embedding_provider() -> String {
    "openai".into()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

fn default_embedding_dimensions() -> usize {
    1536
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            base_url: None,
        }
    }
}

/// Vector index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index database path (default: `.guru/index.db`).
    #[serde(default = "default_index_path")]
    pub path: String,
}

fn default_index_path() -> String {
    ".guru/index.db".into()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

/// Ranking weights and limits for the expert aggregator.
///
/// Passed into the aggregator explicitly so scoring is reproducible and
/// testable without environment setup. All constants are documented here
/// and stable run-to-run.
///
/// # Examples
///
/// ```
/// use guru_core::RankConfig;
///
/// let config = RankConfig::default();
/// assert_eq!(config.recency_weight, 0.1);
/// assert_eq!(config.volume_weight, 0.15);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankConfig {
    /// Candidates fetched from the similarity search before aggregation
    /// (default: 50). Independent of `top_n`.
    #[serde(default = "default_retrieval_limit")]
    pub retrieval_limit: usize,
    /// Experts returned to the caller (default: 10).
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Blend factor between best similarity and recency, in `[0, 1]`
    /// (default: 0.1).
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
    /// Fixed weight applied to the volume component (default: 0.15).
    #[serde(default = "default_volume_weight")]
    pub volume_weight: f64,
    /// Exponential recency decay rate per day of PR age (default: 0.001).
    #[serde(default = "default_recency_decay_per_day")]
    pub recency_decay_per_day: f64,
    /// PRs older than this many days score zero recency (default: 730).
    #[serde(default = "default_max_pr_age_days")]
    pub max_pr_age_days: u64,
    /// PR count at which the volume term saturates (default: 10).
    #[serde(default = "default_volume_pr_saturation")]
    pub volume_pr_saturation: usize,
    /// Lines-changed midpoint of the saturating volume curve (default: 2000).
    #[serde(default = "default_volume_lines_midpoint")]
    pub volume_lines_midpoint: u64,
    /// Experts need at least this many relevant PRs... (default: 2)
    #[serde(default = "default_min_expert_prs")]
    pub min_expert_prs: usize,
    /// ...or at least this many total lines changed (default: 500).
    #[serde(default = "default_min_expert_total_lines")]
    pub min_expert_total_lines: u64,
}

fn default_retrieval_limit() -> usize {
    50
}

fn default_top_n() -> usize {
    10
}

fn default_recency_weight() -> f64 {
    0.1
}

fn default_volume_weight() -> f64 {
    0.15
}

fn default_recency_decay_per_day() -> f64 {
    0.001
}

fn default_volume_pr_saturation() -> usize {
    10
}

fn default_volume_lines_midpoint() -> u64 {
    2000
}

fn default_min_expert_prs() -> usize {
    2
}

fn default_min_expert_total_lines() -> u64 {
    500
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            retrieval_limit: default_retrieval_limit(),
            top_n: default_top_n(),
            recency_weight: default_recency_weight(),
            volume_weight: default_volume_weight(),
            recency_decay_per_day: default_recency_decay_per_day(),
            max_pr_age_days: default_max_pr_age_days(),
            volume_pr_saturation: default_volume_pr_saturation(),
            volume_lines_midpoint: default_volume_lines_midpoint(),
            min_expert_prs: default_min_expert_prs(),
            min_expert_total_lines: default_min_expert_total_lines(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = GuruConfig::default();
        assert_eq!(config.github.max_prs_per_repo, 100);
        assert_eq!(config.github.min_lines_changed, 50);
        assert_eq!(config.github.max_pr_age_days, 730);
        assert!(config.github.target_repos.is_empty());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_age_days, 7);
        assert_eq!(config.embedding.provider, "openai");
        assert_eq!(config.embedding.dimensions, 1536);
        assert_eq!(config.index.path, ".guru/index.db");
        assert_eq!(config.rank.retrieval_limit, 50);
        assert_eq!(config.rank.top_n, 10);
        assert_eq!(config.rank.recency_weight, 0.1);
        assert_eq!(config.rank.min_expert_prs, 2);
        assert_eq!(config.rank.min_expert_total_lines, 500);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[rank]
top_n = 3
recency_weight = 0.5
"#;
        let config = GuruConfig::from_toml(toml).unwrap();
        assert_eq!(config.rank.top_n, 3);
        assert_eq!(config.rank.recency_weight, 0.5);
        // Untouched sections keep defaults.
        assert_eq!(config.rank.retrieval_limit, 50);
        assert_eq!(config.embedding.model, "text-embedding-3-small");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[github]
target_repos = ["facebook/react", "vercel/next.js"]
max_prs_per_repo = 50
min_lines_changed = 100

[embedding]
provider = "local"
model = "all-MiniLM-L6-v2"
dimensions = 384
base_url = "http://localhost:8080/v1"

[index]
path = "/tmp/experts.db"

[rank]
volume_weight = 0.2
"#;
        let config = GuruConfig::from_toml(toml).unwrap();
        assert_eq!(config.github.target_repos.len(), 2);
        assert_eq!(config.github.max_prs_per_repo, 50);
        assert_eq!(config.embedding.dimensions, 384);
        assert_eq!(
            config.embedding.base_url.as_deref(),
            Some("http://localhost:8080/v1")
        );
        assert_eq!(config.index.path, "/tmp/experts.db");
        assert_eq!(config.rank.volume_weight, 0.2);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = GuruConfig::from_toml("").unwrap();
        assert_eq!(config.rank.top_n, 10);
        assert_eq!(config.embedding.provider, "openai");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = GuruConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn bot_authors_default_covers_dependency_bots() {
        let config = GithubConfig::default();
        assert!(config.bot_authors.iter().any(|b| b == "renovate"));
        assert!(config.bot_authors.iter().any(|b| b == "dependabot"));
    }
}
