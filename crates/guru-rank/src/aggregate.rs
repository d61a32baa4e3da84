//! Expert aggregation and scoring.
//!
//! Takes the retrieved candidate set, groups it per author, and blends
//! three signals into one rank score:
//!
//! - **similarity** — the author's best cosine match against the query,
//! - **recency** — exponential decay over the age of their most recent
//!   relevant PR (`exp(-decay_per_day * age_days)`, zero past the max age),
//! - **volume** — a saturating curve over PR count and lines changed, so
//!   sustained contribution counts but one enormous PR cannot buy the top
//!   spot on its own.
//!
//! `score = (1 - w) * similarity + w * recency + volume_weight * volume`
//! with `w` the caller-tunable recency weight. All constants live in
//! [`RankConfig`] and are stable run-to-run.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use guru_core::{
    Embedder, ExpertProfile, GuruError, RankConfig, ScoredCandidate, VectorStore,
};

use crate::retrieval;

/// Per-query knobs for [`ExpertFinder::find_experts`].
///
/// # Examples
///
/// ```
/// use guru_rank::QueryOptions;
///
/// let options = QueryOptions {
///     top_n: 5,
///     ..QueryOptions::default()
/// };
/// assert!(options.repo_filter.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Experts to return. Zero is a caller contract violation.
    pub top_n: usize,
    /// Restrict candidates to one repository.
    pub repo_filter: Option<String>,
    /// Restrict candidates to PRs tagged with any of these technologies.
    pub tech_filter: Option<Vec<String>>,
    /// Override the configured recency weight, in `[0, 1]`.
    pub recency_weight: Option<f64>,
    /// Bound on the embedding call. On expiry the query aborts with an
    /// embedding-unavailable error instead of hanging.
    pub timeout: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            repo_filter: None,
            tech_filter: None,
            recency_weight: None,
            timeout: None,
        }
    }
}

/// The expert ranking pipeline: embed, retrieve, aggregate.
///
/// Generic over the two collaborator contracts so any embedding provider
/// and any vector index can sit behind it. Performs no writes: concurrent
/// queries over the same index need no coordination, and each query sees
/// whatever is indexed at the time it runs.
pub struct ExpertFinder<E, S> {
    embedder: E,
    store: S,
    config: RankConfig,
}

impl<E: Embedder, S: VectorStore> ExpertFinder<E, S> {
    /// Create a finder over the given collaborators and ranking config.
    pub fn new(embedder: E, store: S, config: RankConfig) -> Self {
        Self {
            embedder,
            store,
            config,
        }
    }

    /// Access the ranking configuration.
    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    /// Find the experts best matching a natural-language query.
    ///
    /// Runs the sequential pipeline: embed the query, retrieve candidates
    /// (repo pre-filter, tech post-filter), group per author, score, sort,
    /// truncate to `top_n`. An empty candidate set yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`GuruError::InvalidArgument`] for `top_n == 0`, a blank query,
    ///   or a recency weight outside `[0, 1]` — fails fast, nothing is
    ///   called.
    /// - [`GuruError::Embedding`] when the embedding provider fails or the
    ///   timeout expires.
    /// - [`GuruError::Retrieval`] / [`GuruError::DimensionMismatch`] from
    ///   the index, propagated untouched.
    pub async fn find_experts(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<ExpertProfile>, GuruError> {
        if options.top_n == 0 {
            return Err(GuruError::InvalidArgument(
                "top_n must be positive".into(),
            ));
        }
        if query.trim().is_empty() {
            return Err(GuruError::InvalidArgument("query must not be blank".into()));
        }
        let recency_weight = options
            .recency_weight
            .unwrap_or(self.config.recency_weight);
        if !(0.0..=1.0).contains(&recency_weight) {
            return Err(GuruError::InvalidArgument(format!(
                "recency_weight must be in [0, 1], got {recency_weight}"
            )));
        }

        let query_vector = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.embedder.embed(query))
                .await
                .map_err(|_| {
                    GuruError::Embedding(format!(
                        "embedding timed out after {}ms",
                        limit.as_millis()
                    ))
                })??,
            None => self.embedder.embed(query).await?,
        };

        let candidates = retrieval::retrieve(
            &self.store,
            &query_vector,
            self.config.retrieval_limit,
            options.repo_filter.as_deref(),
            options.tech_filter.as_deref(),
        )?;

        Ok(rank_experts(
            candidates,
            recency_weight,
            &self.config,
            Utc::now(),
            options.top_n,
        ))
    }
}

/// Aggregate candidates into a ranked expert list.
///
/// Pure function of its inputs — `now` is passed in so scoring is
/// reproducible under test. Ordering: score descending, ties broken by
/// relevant-PR count descending, then author ascending.
///
/// After scoring, authors must show either `min_expert_prs` relevant PRs
/// or `min_expert_total_lines` total lines to qualify; when nobody
/// qualifies the unfiltered ranking is returned rather than nothing.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use guru_core::RankConfig;
/// use guru_rank::rank_experts;
///
/// let experts = rank_experts(vec![], 0.1, &RankConfig::default(), Utc::now(), 10);
/// assert!(experts.is_empty());
/// ```
pub fn rank_experts(
    candidates: Vec<ScoredCandidate>,
    recency_weight: f64,
    config: &RankConfig,
    now: DateTime<Utc>,
    top_n: usize,
) -> Vec<ExpertProfile> {
    // BTreeMap keeps author iteration deterministic.
    let mut by_author: BTreeMap<String, Vec<ScoredCandidate>> = BTreeMap::new();
    for candidate in candidates {
        if candidate.record.author.is_empty() {
            continue;
        }
        by_author
            .entry(candidate.record.author.clone())
            .or_default()
            .push(candidate);
    }

    let mut experts: Vec<ExpertProfile> = by_author
        .into_iter()
        .map(|(author, prs)| score_author(author, prs, recency_weight, config, now))
        .collect();

    experts.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.total_relevant_prs.cmp(&a.total_relevant_prs))
            .then_with(|| a.author.cmp(&b.author))
    });

    let qualified: Vec<ExpertProfile> = experts
        .iter()
        .filter(|e| {
            e.total_relevant_prs >= config.min_expert_prs
                || e.total_lines_changed >= config.min_expert_total_lines
        })
        .cloned()
        .collect();
    if !qualified.is_empty() {
        experts = qualified;
    }

    experts.truncate(top_n);
    experts
}

fn score_author(
    author: String,
    mut candidates: Vec<ScoredCandidate>,
    recency_weight: f64,
    config: &RankConfig,
    now: DateTime<Utc>,
) -> ExpertProfile {
    // Best-first; equal similarity prefers the more recent PR.
    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.created_at.cmp(&a.record.created_at))
    });

    let best_similarity = candidates[0].similarity;

    let most_recent = candidates
        .iter()
        .map(|c| c.record.created_at)
        .max()
        .unwrap_or(now);
    let recency_score = recency(most_recent, now, config);

    let total_relevant_prs = candidates.len();
    let total_lines_changed: u64 = candidates.iter().map(|c| c.record.lines_changed).sum();
    let volume_score = volume(total_relevant_prs, total_lines_changed, config);

    let score = (1.0 - recency_weight) * best_similarity
        + recency_weight * recency_score
        + config.volume_weight * volume_score;

    let mut tech: Vec<String> = candidates
        .iter()
        .flat_map(|c| c.record.tech_keywords.iter().cloned())
        .collect();
    tech.sort();
    tech.dedup();

    ExpertProfile {
        github_url: format!("https://github.com/{author}"),
        author,
        score,
        similarity_score: best_similarity,
        recency_score,
        volume_score,
        best_pr: candidates[0].clone(),
        top_prs: candidates.iter().take(3).cloned().collect(),
        tech_expertise: tech,
        total_relevant_prs,
        total_lines_changed,
    }
}

/// Exponential decay over the age of the most recent PR, in `[0, 1]`.
fn recency(most_recent: DateTime<Utc>, now: DateTime<Utc>, config: &RankConfig) -> f64 {
    let age_days = (now - most_recent).num_days().max(0) as f64;
    if age_days > config.max_pr_age_days as f64 {
        return 0.0;
    }
    (-config.recency_decay_per_day * age_days).exp().clamp(0.0, 1.0)
}

/// Saturating blend of PR count and lines changed, in `[0, 1]`.
fn volume(prs: usize, lines: u64, config: &RankConfig) -> f64 {
    let pr_term = (prs as f64 / config.volume_pr_saturation as f64).min(1.0);
    let lines_term = lines as f64 / (lines as f64 + config.volume_lines_midpoint as f64);
    0.5 * pr_term + 0.5 * lines_term
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use guru_core::PullRequestRecord;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn candidate(
        author: &str,
        number: u64,
        similarity: f64,
        age_days: i64,
        lines: u64,
    ) -> ScoredCandidate {
        ScoredCandidate {
            record: PullRequestRecord {
                id: format!("o/r#{number}"),
                number,
                author: author.into(),
                repo: "o/r".into(),
                title: format!("PR {number}"),
                description: String::new(),
                url: format!("https://github.com/o/r/pull/{number}"),
                files_changed: vec![format!("src/feature{number}/handler.ts")],
                lines_changed: lines,
                created_at: now() - ChronoDuration::days(age_days),
                tech_keywords: vec![format!("feature{number}"), "handler".into()],
                embedding: None,
            },
            similarity,
        }
    }

    #[test]
    fn empty_candidates_yield_empty_ranking() {
        let experts = rank_experts(vec![], 0.1, &RankConfig::default(), now(), 10);
        assert!(experts.is_empty());
    }

    #[test]
    fn one_profile_per_author() {
        let candidates = vec![
            candidate("alice", 1, 0.9, 10, 100),
            candidate("alice", 2, 0.8, 20, 200),
            candidate("bob", 3, 0.7, 5, 600),
        ];
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 10);

        assert_eq!(experts.len(), 2);
        let authors: Vec<&str> = experts.iter().map(|e| e.author.as_str()).collect();
        assert!(authors.contains(&"alice"));
        assert!(authors.contains(&"bob"));
    }

    #[test]
    fn aggregates_are_summed_per_author() {
        let candidates = vec![
            candidate("alice", 1, 0.9, 10, 100),
            candidate("alice", 2, 0.8, 20, 250),
        ];
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 10);

        let alice = &experts[0];
        assert_eq!(alice.total_relevant_prs, 2);
        assert_eq!(alice.total_lines_changed, 350);
        assert_eq!(alice.github_url, "https://github.com/alice");
    }

    #[test]
    fn best_pr_has_highest_similarity() {
        let candidates = vec![
            candidate("alice", 1, 0.6, 10, 100),
            candidate("alice", 2, 0.95, 40, 100),
            candidate("alice", 3, 0.8, 5, 100),
        ];
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 10);

        let alice = &experts[0];
        assert_eq!(alice.best_pr.record.number, 2);
        assert_eq!(alice.similarity_score, 0.95);
        // top_prs descending by similarity.
        let sims: Vec<f64> = alice.top_prs.iter().map(|c| c.similarity).collect();
        assert_eq!(sims, vec![0.95, 0.8, 0.6]);
    }

    #[test]
    fn top_prs_capped_at_three() {
        let candidates = (1..=5)
            .map(|i| candidate("alice", i, 0.9 - i as f64 * 0.05, 10, 100))
            .collect();
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 10);
        assert_eq!(experts[0].top_prs.len(), 3);
    }

    #[test]
    fn tech_expertise_is_sorted_union() {
        let mut a = candidate("alice", 1, 0.9, 10, 100);
        a.record.tech_keywords = vec!["graphql".into(), "api".into()];
        let mut b = candidate("alice", 2, 0.8, 10, 100);
        b.record.tech_keywords = vec!["api".into(), "dataloader".into()];

        let experts = rank_experts(vec![a, b], 0.1, &RankConfig::default(), now(), 10);
        assert_eq!(
            experts[0].tech_expertise,
            vec!["api", "dataloader", "graphql"]
        );
    }

    #[test]
    fn truncates_to_top_n() {
        let candidates = (0..8)
            .map(|i| candidate(&format!("author{i}"), i as u64, 0.9, 10, 600))
            .collect();
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 3);
        assert_eq!(experts.len(), 3);
    }

    #[test]
    fn ties_break_by_pr_count_then_author_name() {
        let config = RankConfig {
            // Neutralize recency and volume so scores tie exactly.
            recency_decay_per_day: 0.0,
            volume_weight: 0.0,
            ..RankConfig::default()
        };

        // carol has two PRs, both others one; all similarities equal.
        let candidates = vec![
            candidate("dave", 1, 0.9, 10, 600),
            candidate("carol", 2, 0.9, 10, 600),
            candidate("carol", 3, 0.9, 10, 600),
            candidate("bob", 4, 0.9, 10, 600),
        ];
        let experts = rank_experts(candidates, 0.5, &config, now(), 10);

        let authors: Vec<&str> = experts.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(authors, vec!["carol", "bob", "dave"]);
    }

    #[test]
    fn recency_weight_shifts_rank_toward_recent_authors() {
        // Same similarity and volume; only age differs.
        let fresh = candidate("fresh", 1, 0.8, 2, 600);
        let stale = candidate("stale", 2, 0.8, 400, 600);

        let config = RankConfig::default();
        let low = rank_experts(
            vec![fresh.clone(), stale.clone()],
            0.0,
            &config,
            now(),
            10,
        );
        let high = rank_experts(vec![fresh, stale], 1.0, &config, now(), 10);

        // With zero weight the two are tied on score; with full weight the
        // recent author strictly leads.
        let low_gap = low[0].score - low[1].score;
        assert!(low_gap.abs() < 1e-9);
        assert_eq!(high[0].author, "fresh");
        assert!(high[0].score > high[1].score);
    }

    #[test]
    fn volume_saturates_instead_of_dominating() {
        let config = RankConfig::default();
        let modest = volume(2, 400, &config);
        let huge = volume(1, 1_000_000, &config);

        assert!(modest > 0.0 && modest < 1.0);
        // A single million-line PR cannot exceed the volume ceiling.
        assert!(huge <= 1.0);
        // And the curve is monotone in both inputs.
        assert!(volume(5, 400, &config) > modest);
        assert!(volume(2, 4000, &config) > modest);
    }

    #[test]
    fn recency_decays_monotonically_and_clamps() {
        let config = RankConfig::default();
        let fresh = recency(now() - ChronoDuration::days(1), now(), &config);
        let older = recency(now() - ChronoDuration::days(300), now(), &config);
        let ancient = recency(now() - ChronoDuration::days(1000), now(), &config);

        assert!(fresh > older);
        assert!(older > 0.0);
        // Past the max age the score floors at zero.
        assert_eq!(ancient, 0.0);
        // Future-dated PRs clamp to full recency rather than exceeding it.
        let future = recency(now() + ChronoDuration::days(5), now(), &config);
        assert_eq!(future, 1.0);
    }

    #[test]
    fn scenario_alice_vs_bob_flips_with_recency_weight() {
        // alice: two PRs (0.9 best similarity, most recent 10 days, 50
        // lines each); bob: one PR (0.85, 2 days, 500 lines).
        let make = || {
            vec![
                candidate("alice", 1, 0.9, 10, 50),
                candidate("alice", 2, 0.7, 30, 50),
                candidate("bob", 3, 0.85, 2, 500),
            ]
        };
        let config = RankConfig::default();

        let low = rank_experts(make(), 0.1, &config, now(), 10);
        assert_eq!(low[0].author, "alice");
        let alice_low = low.iter().find(|e| e.author == "alice").unwrap().score;
        let bob_low = low.iter().find(|e| e.author == "bob").unwrap().score;
        assert!(alice_low > bob_low);

        let high = rank_experts(make(), 0.9, &config, now(), 10);
        let alice_high = high.iter().find(|e| e.author == "alice").unwrap().score;
        let bob_high = high.iter().find(|e| e.author == "bob").unwrap().score;
        // Heavier recency weighting narrows the gap until bob's fresher
        // work wins outright.
        assert!(bob_high > alice_high);
        assert!(bob_high - alice_high > bob_low - alice_low);
    }

    #[test]
    fn quality_floor_drops_drive_by_contributors() {
        // carol: one 60-line PR — under both thresholds.
        // alice: two PRs — qualifies on count.
        let candidates = vec![
            candidate("alice", 1, 0.7, 10, 100),
            candidate("alice", 2, 0.6, 15, 100),
            candidate("carol", 3, 0.99, 5, 60),
        ];
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 10);

        let authors: Vec<&str> = experts.iter().map(|e| e.author.as_str()).collect();
        assert_eq!(authors, vec!["alice"]);
    }

    #[test]
    fn quality_floor_falls_back_when_nobody_qualifies() {
        let candidates = vec![candidate("carol", 1, 0.9, 5, 60)];
        let experts = rank_experts(candidates, 0.1, &RankConfig::default(), now(), 10);
        // Better one thin answer than none.
        assert_eq!(experts.len(), 1);
        assert_eq!(experts[0].author, "carol");
    }

    #[test]
    fn ranking_is_deterministic() {
        let make = || {
            vec![
                candidate("alice", 1, 0.9, 10, 100),
                candidate("bob", 2, 0.9, 10, 100),
                candidate("carol", 3, 0.85, 3, 700),
            ]
        };
        let config = RankConfig::default();

        let first = rank_experts(make(), 0.3, &config, now(), 10);
        let second = rank_experts(make(), 0.3, &config, now(), 10);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.author, b.author);
            assert_eq!(a.score, b.score);
        }
    }
}
