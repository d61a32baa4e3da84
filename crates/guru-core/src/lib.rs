//! Core types, configuration, and error handling for the guru platform.
//!
//! This crate provides the shared foundation used by all other guru crates:
//! - [`GuruError`] — unified error type using `thiserror`
//! - [`GuruConfig`] — configuration loaded from `.guru.toml`
//! - Data model: [`PullRequestRecord`], [`ScoredCandidate`], [`ExpertProfile`]
//! - [`keywords`] — technology tag derivation from file paths
//! - Collaborator contracts: [`Embedder`], [`VectorStore`]

mod config;
mod error;
pub mod keywords;
mod traits;
mod types;

pub use config::{
    CacheConfig, EmbeddingConfig, GithubConfig, GuruConfig, IndexConfig, RankConfig,
};
pub use error::GuruError;
pub use traits::{Embedder, VectorStore};
pub use types::{ExpertProfile, OutputFormat, PullRequestRecord, ScoredCandidate};

/// A convenience `Result` type for guru operations.
pub type Result<T> = std::result::Result<T, GuruError>;
