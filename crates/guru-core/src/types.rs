use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized pull request mined from a target repository.
///
/// `tech_keywords` is derived from `files_changed` (see [`crate::keywords`])
/// and recomputed at ingestion time; it is stored alongside the record for
/// filtering but never diverges from the paths it was derived from.
/// `embedding` is `None` until the ingestion pipeline embeds the record —
/// the ranking core only ever sees embedded records via the index.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use guru_core::PullRequestRecord;
///
/// let pr = PullRequestRecord {
///     id: "apollographql/apollo-server#7012".into(),
///     number: 7012,
///     author: "alice".into(),
///     repo: "apollographql/apollo-server".into(),
///     title: "Fix N+1 resolution in batched loaders".into(),
///     description: String::new(),
///     url: "https://github.com/apollographql/apollo-server/pull/7012".into(),
///     files_changed: vec!["src/dataloader/batch.ts".into()],
///     lines_changed: 240,
///     created_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
///     tech_keywords: vec!["batch".into(), "dataloader".into(), "typescript".into()],
///     embedding: None,
/// };
/// assert_eq!(pr.author, "alice");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestRecord {
    /// Stable identifier: `owner/repo#number`.
    pub id: String,
    /// PR number within the repository.
    pub number: u64,
    /// Contributor handle.
    pub author: String,
    /// Owning repository (`owner/repo`).
    pub repo: String,
    /// PR title.
    pub title: String,
    /// PR description body (may be empty).
    #[serde(default)]
    pub description: String,
    /// Web URL of the PR.
    pub url: String,
    /// Changed file paths, in the order the source reported them.
    pub files_changed: Vec<String>,
    /// Total lines added plus deleted.
    pub lines_changed: u64,
    /// When the PR was merged.
    pub created_at: DateTime<Utc>,
    /// Technology tags derived from `files_changed`, sorted.
    #[serde(default)]
    pub tech_keywords: Vec<String>,
    /// Embedding vector, populated during ingestion. Dimensionality is
    /// constant across one index; mixing models is a configuration error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl PullRequestRecord {
    /// Stable identifier for a PR in a repository.
    ///
    /// # Examples
    ///
    /// ```
    /// assert_eq!(guru_core::PullRequestRecord::make_id("facebook/react", 42), "facebook/react#42");
    /// ```
    pub fn make_id(repo: &str, number: u64) -> String {
        format!("{repo}#{number}")
    }

    /// Whether any of this record's tech keywords appears in `filter`.
    pub fn matches_tech(&self, filter: &[String]) -> bool {
        self.tech_keywords.iter().any(|k| filter.contains(k))
    }
}

/// A retrieved PR with its similarity to the query vector.
///
/// Produced per retrieval call and discarded after aggregation.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use guru_core::{PullRequestRecord, ScoredCandidate};
///
/// let candidate = ScoredCandidate {
///     record: PullRequestRecord {
///         id: "o/r#1".into(),
///         number: 1,
///         author: "bob".into(),
///         repo: "o/r".into(),
///         title: "t".into(),
///         description: String::new(),
///         url: "https://github.com/o/r/pull/1".into(),
///         files_changed: vec![],
///         lines_changed: 10,
///         created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
///         tech_keywords: vec![],
///         embedding: None,
///     },
///     similarity: 0.92,
/// };
/// assert!(candidate.similarity > 0.9);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    /// The retrieved record (embedding omitted by the store).
    pub record: PullRequestRecord,
    /// Cosine similarity in `[0, 1]`, higher is closer.
    pub similarity: f64,
}

/// A ranked contributor with the evidence behind the ranking.
///
/// Ephemeral: owned by a single query execution, no cross-query identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpertProfile {
    /// Contributor handle.
    pub author: String,
    /// Profile URL on GitHub.
    pub github_url: String,
    /// Composite rank score. Unbounded positive; only relative order matters.
    pub score: f64,
    /// Best cosine similarity among this author's candidates.
    pub similarity_score: f64,
    /// Decay-weighted recency of the most recent candidate, in `[0, 1]`.
    pub recency_score: f64,
    /// Saturating contribution-volume component, in `[0, 1]`.
    pub volume_score: f64,
    /// The candidate with the highest similarity for this author.
    pub best_pr: ScoredCandidate,
    /// Up to 3 highest-similarity candidates, descending.
    pub top_prs: Vec<ScoredCandidate>,
    /// Union of tech keywords across this author's relevant PRs, sorted.
    pub tech_expertise: Vec<String>,
    /// Number of candidates attributed to this author in the result window.
    pub total_relevant_prs: usize,
    /// Sum of `lines_changed` over those candidates.
    pub total_lines_changed: u64,
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use guru_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report (default).
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
