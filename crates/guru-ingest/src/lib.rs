//! Pull-request mining from GitHub.
//!
//! Produces normalized [`PullRequestRecord`](guru_core::PullRequestRecord)s
//! from target repositories: REST listing + per-PR file pages, bot and
//! merge-commit filtering, age and size thresholds, and a per-repo disk
//! cache so repeated runs don't re-spend API quota.

pub mod cache;
pub mod filter;
pub mod github;
