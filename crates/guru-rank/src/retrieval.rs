//! Candidate retrieval against the vector index.
//!
//! Thin adapter between the aggregator and the [`VectorStore`] contract:
//! pushes the repo filter down to the store, applies the tech filter as a
//! post-filter (tags are derived data the store doesn't index), and pins
//! the ordering contract regardless of the store implementation behind
//! the trait.

use std::cmp::Ordering;

use guru_core::{GuruError, ScoredCandidate, VectorStore};

/// Retrieve scored candidates for a query vector.
///
/// `limit` bounds the underlying similarity search and is independent of
/// how many experts the caller ultimately wants. The tech filter keeps
/// candidates whose derived keywords intersect the filter set; applying
/// it after retrieval means a narrow filter can return fewer than `limit`
/// candidates, which is fine — an empty result is not an error.
///
/// Results are ordered by similarity descending, ties broken by
/// most-recent `created_at`.
///
/// # Errors
///
/// Propagates [`GuruError::DimensionMismatch`] and
/// [`GuruError::Retrieval`] from the store untouched.
pub fn retrieve<S: VectorStore>(
    store: &S,
    query_vector: &[f32],
    limit: usize,
    repo_filter: Option<&str>,
    tech_filter: Option<&[String]>,
) -> Result<Vec<ScoredCandidate>, GuruError> {
    let mut candidates = store.query(query_vector, limit, repo_filter)?;

    if let Some(filter) = tech_filter {
        if !filter.is_empty() {
            candidates.retain(|c| c.record.matches_tech(filter));
        }
    }

    candidates.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.record.created_at.cmp(&a.record.created_at))
    });

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use guru_core::PullRequestRecord;

    /// Store stub returning a fixed candidate list, in insertion order.
    struct FixedStore {
        candidates: Vec<ScoredCandidate>,
    }

    impl VectorStore for FixedStore {
        fn upsert(&self, _records: &[PullRequestRecord]) -> Result<usize, GuruError> {
            Ok(0)
        }

        fn query(
            &self,
            _vector: &[f32],
            limit: usize,
            repo: Option<&str>,
        ) -> Result<Vec<ScoredCandidate>, GuruError> {
            let mut out: Vec<ScoredCandidate> = self
                .candidates
                .iter()
                .filter(|c| repo.map_or(true, |r| c.record.repo == r))
                .cloned()
                .collect();
            out.truncate(limit);
            Ok(out)
        }
    }

    fn candidate(id: &str, similarity: f64, year: i32, tags: &[&str]) -> ScoredCandidate {
        let (repo, number) = id.rsplit_once('#').unwrap();
        ScoredCandidate {
            record: PullRequestRecord {
                id: id.into(),
                number: number.parse().unwrap(),
                author: "alice".into(),
                repo: repo.into(),
                title: "t".into(),
                description: String::new(),
                url: String::new(),
                files_changed: vec![],
                lines_changed: 100,
                created_at: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
                tech_keywords: tags.iter().map(|t| t.to_string()).collect(),
                embedding: None,
            },
            similarity,
        }
    }

    #[test]
    fn orders_by_similarity_then_recency() {
        let store = FixedStore {
            candidates: vec![
                candidate("o/r#1", 0.5, 2024, &[]),
                candidate("o/r#2", 0.9, 2023, &[]),
                candidate("o/r#3", 0.9, 2025, &[]),
            ],
        };

        let results = retrieve(&store, &[1.0], 10, None, None).unwrap();
        let ids: Vec<&str> = results.iter().map(|c| c.record.id.as_str()).collect();
        // Equal similarity: most recent first.
        assert_eq!(ids, vec!["o/r#3", "o/r#2", "o/r#1"]);
    }

    #[test]
    fn tech_filter_keeps_intersecting_candidates() {
        let store = FixedStore {
            candidates: vec![
                candidate("o/r#1", 0.9, 2025, &["graphql", "api"]),
                candidate("o/r#2", 0.8, 2025, &["terraform"]),
            ],
        };

        let filter = vec!["graphql".to_string()];
        let results = retrieve(&store, &[1.0], 10, None, Some(&filter)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.id, "o/r#1");
    }

    #[test]
    fn empty_tech_filter_is_a_no_op() {
        let store = FixedStore {
            candidates: vec![candidate("o/r#1", 0.9, 2025, &["graphql"])],
        };

        let results = retrieve(&store, &[1.0], 10, None, Some(&[])).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn repo_filter_passes_through_to_store() {
        let store = FixedStore {
            candidates: vec![
                candidate("a/x#1", 0.9, 2025, &[]),
                candidate("b/y#2", 0.8, 2025, &[]),
            ],
        };

        let results = retrieve(&store, &[1.0], 10, Some("b/y"), None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.repo, "b/y");
    }

    #[test]
    fn store_errors_propagate() {
        struct FailingStore;
        impl VectorStore for FailingStore {
            fn upsert(&self, _records: &[PullRequestRecord]) -> Result<usize, GuruError> {
                Ok(0)
            }
            fn query(
                &self,
                _vector: &[f32],
                _limit: usize,
                _repo: Option<&str>,
            ) -> Result<Vec<ScoredCandidate>, GuruError> {
                Err(GuruError::Retrieval("index offline".into()))
            }
        }

        let result = retrieve(&FailingStore, &[1.0], 10, None, None);
        assert!(matches!(result, Err(GuruError::Retrieval(_))));
    }
}
