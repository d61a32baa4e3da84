//! GitHub PR source.
//!
//! Lists recently-updated closed PRs through the GitHub REST API, fetches
//! the changed-file pages per PR, applies the data-quality filters, and
//! produces normalized [`PullRequestRecord`]s with derived technology tags
//! and no embedding (that stage belongs to indexing).

use chrono::{Duration, Utc};
use guru_core::{keywords, GithubConfig, GuruError, PullRequestRecord};
use serde::Deserialize;

use crate::filter::{is_bot_author, is_merge_commit};

const PAGE_SIZE: u8 = 100;
/// Listing pages scanned per repo before giving up on finding enough
/// merged PRs that pass the filters.
const MAX_LIST_PAGES: u32 = 10;
/// File pages fetched per PR (300 files is plenty for tag derivation).
const MAX_FILE_PAGES: u32 = 3;

/// GitHub client for mining pull-request history.
///
/// # Examples
///
/// ```
/// use guru_ingest::github::parse_repo;
///
/// let (owner, name) = parse_repo("facebook/react").unwrap();
/// assert_eq!(owner, "facebook");
/// assert_eq!(name, "react");
/// ```
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: Option<String>,
    api_url: String,
}

#[derive(Deserialize)]
struct PrFile {
    filename: String,
    additions: u64,
    deletions: u64,
}

impl GitHubClient {
    /// Create a client from an explicit token or the `GITHUB_TOKEN`
    /// environment variable. A missing token is allowed — the API then
    /// serves 60 requests/hour instead of 5000.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Source`] if the client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use guru_core::GithubConfig;
    /// use guru_ingest::github::GitHubClient;
    ///
    /// let client = GitHubClient::new(&GithubConfig::default()).unwrap();
    /// ```
    pub fn new(config: &GithubConfig) -> Result<Self, GuruError> {
        let token = config
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok());

        let mut builder = octocrab::Octocrab::builder();
        if let Some(t) = &token {
            builder = builder.personal_token(t.clone());
        }
        let octocrab = builder
            .build()
            .map_err(|e| GuruError::Source(format!("failed to create GitHub client: {e}")))?;

        Ok(Self {
            octocrab,
            http: reqwest::Client::new(),
            token,
            api_url: config.api_url.clone(),
        })
    }

    /// Whether the client is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Mine merged PRs from one repository, newest first.
    ///
    /// Walks the closed-PR listing (most recently updated first) and keeps
    /// merged PRs that pass the filters: human author, non-merge title,
    /// young enough, and at least `min_lines_changed` lines. Stops after
    /// `max_prs_per_repo` records.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Source`] on API errors.
    pub async fn scrape_repo(
        &self,
        repo: &str,
        config: &GithubConfig,
    ) -> Result<Vec<PullRequestRecord>, GuruError> {
        let (owner, name) = parse_repo(repo)?;
        let cutoff = Utc::now() - Duration::days(config.max_pr_age_days as i64);

        let mut records = Vec::new();

        for page in 1..=MAX_LIST_PAGES {
            let listing = self
                .octocrab
                .pulls(owner.as_str(), name.as_str())
                .list()
                .state(octocrab::params::State::Closed)
                .sort(octocrab::params::pulls::Sort::Updated)
                .direction(octocrab::params::Direction::Descending)
                .per_page(PAGE_SIZE)
                .page(page)
                .send()
                .await
                .map_err(|e| GuruError::Source(format!("failed to list PRs for {repo}: {e}")))?;

            if listing.items.is_empty() {
                break;
            }

            for pr in listing.items {
                if records.len() >= config.max_prs_per_repo {
                    return Ok(records);
                }

                let Some(merged_at) = pr.merged_at else {
                    continue;
                };
                if merged_at < cutoff {
                    continue;
                }

                let author = pr.user.as_ref().map(|u| u.login.clone()).unwrap_or_default();
                if is_bot_author(&author, &config.bot_authors) {
                    continue;
                }

                let title = pr.title.clone().unwrap_or_default();
                if title.is_empty() || is_merge_commit(&title) {
                    continue;
                }

                let files = self.fetch_pr_files(&owner, &name, pr.number).await?;
                let lines_changed: u64 = files.iter().map(|f| f.additions + f.deletions).sum();
                if lines_changed < config.min_lines_changed {
                    continue;
                }

                let files_changed: Vec<String> =
                    files.into_iter().map(|f| f.filename).collect();
                let tech_keywords = keywords::extract_from_paths(&files_changed);

                let url = pr
                    .html_url
                    .as_ref()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| {
                        format!("https://github.com/{repo}/pull/{}", pr.number)
                    });

                records.push(PullRequestRecord {
                    id: PullRequestRecord::make_id(repo, pr.number),
                    number: pr.number,
                    author,
                    repo: repo.to_string(),
                    title,
                    description: pr.body.clone().unwrap_or_default(),
                    url,
                    files_changed,
                    lines_changed,
                    created_at: merged_at,
                    tech_keywords,
                    embedding: None,
                });
            }
        }

        Ok(records)
    }

    async fn fetch_pr_files(
        &self,
        owner: &str,
        name: &str,
        number: u64,
    ) -> Result<Vec<PrFile>, GuruError> {
        let mut files = Vec::new();

        for page in 1..=MAX_FILE_PAGES {
            let url = format!(
                "{}/repos/{owner}/{name}/pulls/{number}/files",
                self.api_url
            );

            let mut request = self
                .http
                .get(&url)
                .query(&[("per_page", PAGE_SIZE as u32), ("page", page)])
                .header("Accept", "application/vnd.github.v3+json")
                .header("User-Agent", "guru");
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {token}"));
            }

            let response = request
                .send()
                .await
                .map_err(|e| GuruError::Source(format!("failed to fetch PR files: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GuruError::Source(format!(
                    "GitHub API error {status} fetching files for {owner}/{name}#{number}: {body}"
                )));
            }

            let batch: Vec<PrFile> = response
                .json()
                .await
                .map_err(|e| GuruError::Source(format!("failed to parse file list: {e}")))?;

            let batch_len = batch.len();
            files.extend(batch);
            if batch_len < PAGE_SIZE as usize {
                break;
            }
        }

        Ok(files)
    }
}

/// Parse an `owner/repo` string into its components.
///
/// # Errors
///
/// Returns [`GuruError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use guru_ingest::github::parse_repo;
///
/// let (owner, name) = parse_repo("vercel/next.js").unwrap();
/// assert_eq!(owner, "vercel");
/// assert_eq!(name, "next.js");
/// ```
pub fn parse_repo(repo: &str) -> Result<(String, String), GuruError> {
    let Some((owner, name)) = repo.split_once('/') else {
        return Err(GuruError::Config(format!(
            "invalid repository '{repo}', expected owner/repo"
        )));
    };
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return Err(GuruError::Config(format!(
            "invalid repository '{repo}', expected owner/repo"
        )));
    }
    Ok((owner.to_string(), name.to_string()))
}
