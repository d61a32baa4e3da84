use std::future::Future;

use crate::error::GuruError;
use crate::types::{PullRequestRecord, ScoredCandidate};

/// Capability contract for embedding providers.
///
/// Maps text to a fixed-length vector. Any provider can be substituted
/// behind this trait without affecting the ranking core; the bundled
/// implementation lives in `guru-embed`. Every call is treated as
/// potentially expensive and potentially failing — the core never assumes
/// a cache sits in front of the provider.
pub trait Embedder {
    /// Embed `text` into a vector of `dimensions()` floats.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::Embedding`] when the provider cannot produce
    /// a vector.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, GuruError>> + Send;

    /// Fixed output dimensionality of this provider (e.g. 384, 768, 1536).
    fn dimensions(&self) -> usize;
}

/// Capability contract for the vector index.
///
/// Two operations: `upsert` (ingestion only) and `query` (read-only
/// similarity search). The bundled SQLite implementation lives in
/// `guru-store`; any nearest-neighbor engine can stand in.
pub trait VectorStore {
    /// Insert or replace embedded records. Records without an embedding
    /// are skipped. The first write pins the collection dimensionality.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::DimensionMismatch`] when a record's vector
    /// does not match the pinned dimensionality, or
    /// [`GuruError::Retrieval`] when the index cannot be written.
    fn upsert(&self, records: &[PullRequestRecord]) -> Result<usize, GuruError>;

    /// Nearest-neighbor search: the `limit` records closest to `vector`
    /// by cosine similarity, descending, ties broken by most-recent
    /// `created_at`. `repo`, when set, restricts candidates to that
    /// repository before similarity ranking. Never mutates the index.
    ///
    /// # Errors
    ///
    /// Returns [`GuruError::DimensionMismatch`] when `vector` does not
    /// match the index dimensionality, or [`GuruError::Retrieval`] when
    /// the index cannot be read.
    fn query(
        &self,
        vector: &[f32],
        limit: usize,
        repo: Option<&str>,
    ) -> Result<Vec<ScoredCandidate>, GuruError>;
}
