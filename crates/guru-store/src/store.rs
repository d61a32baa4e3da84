//! SQLite storage for embedded pull requests.
//!
//! Records are stored as rows with their embedding as a little-endian f32
//! BLOB. Cosine similarity is computed in Rust at query time; the repo
//! filter is pushed down into SQL. The collection dimensionality is pinned
//! in a metadata table on first write so a model switch surfaces as a
//! configuration error instead of silently corrupting rankings.

use std::cmp::Ordering;
use std::path::Path;

use chrono::{DateTime, Utc};
use guru_core::{GuruError, PullRequestRecord, ScoredCandidate, VectorStore};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// Index statistics.
///
/// # Examples
///
/// ```
/// use guru_store::IndexStats;
///
/// let stats = IndexStats {
///     total_prs: 120,
///     total_authors: 34,
///     total_repos: 3,
///     index_size_bytes: 50000,
/// };
/// assert_eq!(stats.total_authors, 34);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    /// Embedded PRs in the index.
    pub total_prs: usize,
    /// Distinct contributors.
    pub total_authors: usize,
    /// Distinct repositories.
    pub total_repos: usize,
    /// Size of the index database in bytes.
    pub index_size_bytes: u64,
}

/// SQLite-backed vector index over pull requests.
///
/// # Examples
///
/// ```
/// use guru_store::PrIndex;
///
/// let index = PrIndex::in_memory().unwrap();
/// let stats = index.stats().unwrap();
/// assert_eq!(stats.total_prs, 0);
/// ```
pub struct PrIndex {
    conn: Connection,
}

impl PrIndex {
    /// Open or create an index database at the given path.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Retrieval`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use guru_store::PrIndex;
    ///
    /// let index = PrIndex::open(Path::new(".guru/index.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, GuruError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GuruError::Retrieval(format!("failed to create index directory: {e}"))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| GuruError::Retrieval(format!("failed to open index: {e}")))?;

        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    /// Create an in-memory index (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Retrieval`] if schema creation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use guru_store::PrIndex;
    ///
    /// let index = PrIndex::in_memory().unwrap();
    /// ```
    pub fn in_memory() -> Result<Self, GuruError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| GuruError::Retrieval(format!("failed to create in-memory index: {e}")))?;

        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> Result<(), GuruError> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS metadata (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS prs (
                    id TEXT PRIMARY KEY,
                    number INTEGER NOT NULL,
                    repo TEXT NOT NULL,
                    author TEXT NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    url TEXT NOT NULL,
                    files_changed TEXT NOT NULL,
                    lines_changed INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    tech_keywords TEXT NOT NULL,
                    embedding BLOB NOT NULL
                );

                CREATE INDEX IF NOT EXISTS prs_repo ON prs(repo);
                CREATE INDEX IF NOT EXISTS prs_author ON prs(author);
                ",
            )
            .map_err(|e| GuruError::Retrieval(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Pin the embedding dimensionality, or validate against the pinned value.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::DimensionMismatch`] if `dimensions` conflicts
    /// with an existing index.
    pub fn set_dimensions(&self, dimensions: usize) -> Result<(), GuruError> {
        if let Some(stored) = self.get_dimensions()? {
            if stored != dimensions {
                return Err(GuruError::DimensionMismatch {
                    expected: stored,
                    actual: dimensions,
                });
            }
            return Ok(());
        }
        self.set_metadata("embedding_dimensions", &dimensions.to_string())
    }

    /// Get the pinned embedding dimensionality, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Retrieval`] on query failure.
    pub fn get_dimensions(&self) -> Result<Option<usize>, GuruError> {
        match self.get_metadata("embedding_dimensions")? {
            Some(v) => {
                let dims: usize = v.parse().map_err(|_| {
                    GuruError::Retrieval(format!("corrupted dimension metadata in index: '{v}'"))
                })?;
                Ok(Some(dims))
            }
            None => Ok(None),
        }
    }

    fn get_metadata(&self, key: &str) -> Result<Option<String>, GuruError> {
        let result = self.conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(GuruError::Retrieval(format!(
                "failed to get metadata '{key}': {e}"
            ))),
        }
    }

    fn set_metadata(&self, key: &str, value: &str) -> Result<(), GuruError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .map_err(|e| GuruError::Retrieval(format!("failed to set metadata '{key}': {e}")))?;
        Ok(())
    }

    /// Insert or replace embedded records.
    ///
    /// Records without an embedding are skipped — they belong to a scrape
    /// that has not been through the embedding stage yet. The first stored
    /// record pins the collection dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::DimensionMismatch`] if a record's vector does
    /// not match the pinned dimensionality, or [`GuruError::Retrieval`] on
    /// insert failure.
    pub fn upsert(&self, records: &[PullRequestRecord]) -> Result<usize, GuruError> {
        let mut written = 0usize;

        for record in records {
            let Some(embedding) = &record.embedding else {
                continue;
            };

            self.set_dimensions(embedding.len())?;

            let files_json = serde_json::to_string(&record.files_changed)?;
            let keywords_json = serde_json::to_string(&record.tech_keywords)?;

            self.conn
                .execute(
                    "INSERT OR REPLACE INTO prs
                     (id, number, repo, author, title, description, url,
                      files_changed, lines_changed, created_at, tech_keywords, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                    params![
                        record.id,
                        record.number,
                        record.repo,
                        record.author,
                        record.title,
                        record.description,
                        record.url,
                        files_json,
                        record.lines_changed,
                        record.created_at.to_rfc3339(),
                        keywords_json,
                        floats_to_bytes(embedding),
                    ],
                )
                .map_err(|e| GuruError::Retrieval(format!("failed to insert PR: {e}")))?;

            written += 1;
        }

        Ok(written)
    }

    /// Cosine similarity search over the stored embeddings.
    ///
    /// Loads candidate embeddings (restricted to `repo` when given) and
    /// scores them against the query vector in Rust. Returns the top
    /// `limit` results ordered by similarity descending, ties broken by
    /// most-recent `created_at`. Returned records have `embedding: None`.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::DimensionMismatch`] if `vector` does not match
    /// the pinned dimensionality, or [`GuruError::Retrieval`] on query
    /// failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use guru_store::PrIndex;
    ///
    /// let index = PrIndex::in_memory().unwrap();
    /// let results = index.query(&[0.1, 0.2], 5, None).unwrap();
    /// assert!(results.is_empty());
    /// ```
    pub fn query(
        &self,
        vector: &[f32],
        limit: usize,
        repo: Option<&str>,
    ) -> Result<Vec<ScoredCandidate>, GuruError> {
        // An empty index has no pinned dimensionality; nothing can match.
        let Some(dims) = self.get_dimensions()? else {
            return Ok(Vec::new());
        };
        if vector.len() != dims {
            return Err(GuruError::DimensionMismatch {
                expected: dims,
                actual: vector.len(),
            });
        }

        let sql = match repo {
            Some(_) => {
                "SELECT id, number, repo, author, title, description, url,
                        files_changed, lines_changed, created_at, tech_keywords, embedding
                 FROM prs WHERE repo = ?1"
            }
            None => {
                "SELECT id, number, repo, author, title, description, url,
                        files_changed, lines_changed, created_at, tech_keywords, embedding
                 FROM prs"
            }
        };

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| GuruError::Retrieval(format!("failed to prepare query: {e}")))?;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<ScoredCandidate> {
            let files_json: String = row.get(7)?;
            let keywords_json: String = row.get(10)?;
            let created_at: String = row.get(9)?;
            let embedding_bytes: Vec<u8> = row.get(11)?;

            let embedding = bytes_to_floats(&embedding_bytes);
            let similarity = cosine_similarity(vector, &embedding).clamp(0.0, 1.0);

            let record = PullRequestRecord {
                id: row.get(0)?,
                number: row.get(1)?,
                repo: row.get(2)?,
                author: row.get(3)?,
                title: row.get(4)?,
                description: row.get(5)?,
                url: row.get(6)?,
                files_changed: serde_json::from_str(&files_json).unwrap_or_default(),
                lines_changed: row.get(8)?,
                created_at: parse_timestamp(&created_at),
                tech_keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
                embedding: None,
            };

            Ok(ScoredCandidate { record, similarity })
        };

        let rows = match repo {
            Some(r) => stmt.query_map(params![r], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(|e| GuruError::Retrieval(format!("failed to query PRs: {e}")))?;

        let mut hits: Vec<ScoredCandidate> = Vec::new();
        for row in rows {
            let hit = row.map_err(|e| GuruError::Retrieval(format!("failed to read row: {e}")))?;
            hits.push(hit);
        }

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.record.created_at.cmp(&a.record.created_at))
        });
        hits.truncate(limit);

        Ok(hits)
    }

    /// Get index statistics.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Retrieval`] on query failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use guru_store::PrIndex;
    ///
    /// let index = PrIndex::in_memory().unwrap();
    /// let stats = index.stats().unwrap();
    /// assert_eq!(stats.total_repos, 0);
    /// ```
    pub fn stats(&self) -> Result<IndexStats, GuruError> {
        let count = |sql: &str| -> Result<i64, GuruError> {
            self.conn
                .query_row(sql, [], |row| row.get(0))
                .map_err(|e| GuruError::Retrieval(format!("failed to count: {e}")))
        };

        let total_prs = count("SELECT COUNT(*) FROM prs")?;
        let total_authors = count("SELECT COUNT(DISTINCT author) FROM prs")?;
        let total_repos = count("SELECT COUNT(DISTINCT repo) FROM prs")?;

        // For in-memory databases, page_count returns a small number
        let page_count: i64 = self
            .conn
            .query_row("PRAGMA page_count", [], |row| row.get(0))
            .unwrap_or(0);
        let page_size: i64 = self
            .conn
            .query_row("PRAGMA page_size", [], |row| row.get(0))
            .unwrap_or(4096);

        Ok(IndexStats {
            total_prs: total_prs as usize,
            total_authors: total_authors as usize,
            total_repos: total_repos as usize,
            index_size_bytes: (page_count * page_size) as u64,
        })
    }
}

impl VectorStore for PrIndex {
    fn upsert(&self, records: &[PullRequestRecord]) -> Result<usize, GuruError> {
        PrIndex::upsert(self, records)
    }

    fn query(
        &self,
        vector: &[f32],
        limit: usize,
        repo: Option<&str>,
    ) -> Result<Vec<ScoredCandidate>, GuruError> {
        PrIndex::query(self, vector, limit, repo)
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn floats_to_bytes(floats: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(floats.len() * 4);
    for f in floats {
        bytes.extend_from_slice(&f.to_le_bytes());
    }
    bytes
}

fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    let mut floats = Vec::with_capacity(bytes.len() / 4);
    for chunk in bytes.chunks_exact(4) {
        let arr: [u8; 4] = [chunk[0], chunk[1], chunk[2], chunk[3]];
        floats.push(f32::from_le_bytes(arr));
    }
    floats
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for i in 0..a.len() {
        let ai = a[i] as f64;
        let bi = b[i] as f64;
        dot += ai * bi;
        norm_a += ai * ai;
        norm_b += bi * bi;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_pr(id: &str, author: &str, embedding: Vec<f32>) -> PullRequestRecord {
        let (repo, number) = id.rsplit_once('#').unwrap();
        PullRequestRecord {
            id: id.into(),
            number: number.parse().unwrap(),
            author: author.into(),
            repo: repo.into(),
            title: format!("change by {author}"),
            description: String::new(),
            url: format!("https://github.com/{repo}/pull/{number}"),
            files_changed: vec!["src/server/resolver.ts".into()],
            lines_changed: 100,
            created_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            tech_keywords: vec!["resolver".into(), "server".into()],
            embedding: Some(embedding),
        }
    }

    #[test]
    fn create_index_and_upsert() {
        let index = PrIndex::in_memory().unwrap();
        let written = index
            .upsert(&[sample_pr("o/r#1", "alice", vec![0.1, 0.2, 0.3])])
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(index.stats().unwrap().total_prs, 1);
        assert_eq!(index.get_dimensions().unwrap(), Some(3));
    }

    #[test]
    fn upsert_skips_unembedded_records() {
        let index = PrIndex::in_memory().unwrap();
        let mut pr = sample_pr("o/r#1", "alice", vec![]);
        pr.embedding = None;
        let written = index.upsert(&[pr]).unwrap();
        assert_eq!(written, 0);
        assert_eq!(index.stats().unwrap().total_prs, 0);
    }

    #[test]
    fn upsert_replaces_same_id() {
        let index = PrIndex::in_memory().unwrap();
        index
            .upsert(&[sample_pr("o/r#1", "alice", vec![1.0, 0.0])])
            .unwrap();
        index
            .upsert(&[sample_pr("o/r#1", "alice", vec![0.0, 1.0])])
            .unwrap();
        assert_eq!(index.stats().unwrap().total_prs, 1);
    }

    #[test]
    fn mixed_dimensions_rejected() {
        let index = PrIndex::in_memory().unwrap();
        index
            .upsert(&[sample_pr("o/r#1", "alice", vec![1.0, 0.0, 0.0])])
            .unwrap();

        let result = index.upsert(&[sample_pr("o/r#2", "bob", vec![1.0, 0.0])]);
        assert!(matches!(
            result,
            Err(GuruError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn query_dimension_mismatch_is_distinct_error() {
        let index = PrIndex::in_memory().unwrap();
        index
            .upsert(&[sample_pr("o/r#1", "alice", vec![1.0, 0.0, 0.0])])
            .unwrap();

        let result = index.query(&[1.0, 0.0], 5, None);
        assert!(matches!(result, Err(GuruError::DimensionMismatch { .. })));
    }

    #[test]
    fn empty_index_returns_no_candidates() {
        let index = PrIndex::in_memory().unwrap();
        let results = index.query(&[0.5, 0.5], 10, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn query_orders_by_similarity() {
        let index = PrIndex::in_memory().unwrap();
        index
            .upsert(&[
                sample_pr("o/r#1", "alice", vec![1.0, 0.0, 0.0]),
                sample_pr("o/r#2", "bob", vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();

        let results = index.query(&[0.9, 0.1, 0.0], 5, None).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.author, "alice");
        assert!(results[0].similarity > results[1].similarity);
        // Embeddings never leave the store.
        assert!(results[0].record.embedding.is_none());
    }

    #[test]
    fn similarity_ties_break_by_recency() {
        let index = PrIndex::in_memory().unwrap();
        let mut older = sample_pr("o/r#1", "alice", vec![1.0, 0.0]);
        older.created_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut newer = sample_pr("o/r#2", "bob", vec![1.0, 0.0]);
        newer.created_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();

        index.upsert(&[older, newer]).unwrap();

        let results = index.query(&[1.0, 0.0], 5, None).unwrap();
        assert_eq!(results[0].record.author, "bob");
        assert_eq!(results[1].record.author, "alice");
    }

    #[test]
    fn query_limit_bounds_results() {
        let index = PrIndex::in_memory().unwrap();
        let prs: Vec<PullRequestRecord> = (1..=5)
            .map(|i| sample_pr(&format!("o/r#{i}"), "alice", vec![1.0, i as f32 / 10.0]))
            .collect();
        index.upsert(&prs).unwrap();

        let results = index.query(&[1.0, 0.0], 3, None).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn repo_filter_restricts_candidates() {
        let index = PrIndex::in_memory().unwrap();
        index
            .upsert(&[
                sample_pr("facebook/react#1", "alice", vec![1.0, 0.0]),
                sample_pr("vercel/next.js#2", "bob", vec![1.0, 0.0]),
            ])
            .unwrap();

        let results = index.query(&[1.0, 0.0], 5, Some("facebook/react")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.repo, "facebook/react");
    }

    #[test]
    fn stats_count_distinct_authors_and_repos() {
        let index = PrIndex::in_memory().unwrap();
        index
            .upsert(&[
                sample_pr("o/a#1", "alice", vec![1.0]),
                sample_pr("o/a#2", "alice", vec![0.5]),
                sample_pr("o/b#3", "bob", vec![0.2]),
            ])
            .unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.total_prs, 3);
        assert_eq!(stats.total_authors, 2);
        assert_eq!(stats.total_repos, 2);
    }

    #[test]
    fn open_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.db");

        {
            let index = PrIndex::open(&path).unwrap();
            index
                .upsert(&[sample_pr("o/r#1", "alice", vec![1.0, 0.0])])
                .unwrap();
        }

        let reopened = PrIndex::open(&path).unwrap();
        assert_eq!(reopened.stats().unwrap().total_prs, 1);
        assert_eq!(reopened.get_dimensions().unwrap(), Some(2));
    }

    #[test]
    fn timestamps_roundtrip_through_storage() {
        let index = PrIndex::in_memory().unwrap();
        let pr = sample_pr("o/r#1", "alice", vec![1.0]);
        let expected = pr.created_at;
        index.upsert(&[pr]).unwrap();

        let results = index.query(&[1.0], 1, None).unwrap();
        assert_eq!(results[0].record.created_at, expected);
    }

    #[test]
    fn cosine_similarity_correct() {
        // Identical vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        // Orthogonal vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
        // Opposite vectors
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn floats_bytes_roundtrip() {
        let original = vec![1.0f32, -2.5, 0.0, 3.14];
        let bytes = floats_to_bytes(&original);
        let recovered = bytes_to_floats(&bytes);
        assert_eq!(original, recovered);
    }
}
