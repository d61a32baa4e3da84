//! SQLite-backed vector index for embedded pull requests.
//!
//! The bundled [`VectorStore`](guru_core::VectorStore) implementation:
//! embeddings live as BLOBs next to the PR metadata, cosine similarity is
//! computed in Rust at query time, and the collection dimensionality is
//! pinned so mixing embedding models fails loudly.

mod store;

pub use store::{IndexStats, PrIndex};
