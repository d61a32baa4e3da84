//! Embedding generation for PR records and queries.
//!
//! Provides the bundled [`Embedder`](guru_core::Embedder) implementation:
//! an HTTP client for OpenAI-compatible `/embeddings` endpoints, plus the
//! text-preparation helpers that turn a PR into embeddable text.

mod client;
pub mod text;

pub use client::EmbeddingClient;
