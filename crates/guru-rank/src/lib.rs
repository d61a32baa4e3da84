//! Expert ranking and retrieval.
//!
//! The query pipeline: embed a natural-language question, retrieve the
//! nearest PRs from the vector index, aggregate per author into weighted
//! expert scores, and render the ranked result. Collaborators are reached
//! only through the [`Embedder`](guru_core::Embedder) and
//! [`VectorStore`](guru_core::VectorStore) contracts, so providers and
//! indexes swap freely underneath.

mod aggregate;
pub mod report;
pub mod retrieval;

pub use aggregate::{rank_experts, ExpertFinder, QueryOptions};
