//! Data-quality filters applied while scraping.
//!
//! Bot PRs and merge commits tell us nothing about human expertise, so
//! they are dropped before a record is ever built.

/// Substrings that mark a handle as automated regardless of the config list.
const BOT_PATTERNS: &[&str] = &["bot", "automated", "dependabot", "renovate"];

/// Whether a username is likely a bot.
///
/// Empty handles are treated as bots — a PR without a usable author cannot
/// contribute to any expert profile.
///
/// # Examples
///
/// ```
/// use guru_ingest::filter::is_bot_author;
///
/// let bots = vec!["dependabot".to_string()];
/// assert!(is_bot_author("dependabot", &bots));
/// assert!(is_bot_author("renovate-bot", &bots));
/// assert!(is_bot_author("", &bots));
/// assert!(!is_bot_author("alice", &bots));
/// ```
pub fn is_bot_author(username: &str, bot_authors: &[String]) -> bool {
    if username.is_empty() {
        return true;
    }

    let lower = username.to_lowercase();
    if bot_authors.iter().any(|b| b.to_lowercase() == lower) {
        return true;
    }

    BOT_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Whether a PR title indicates an automated merge commit.
///
/// # Examples
///
/// ```
/// use guru_ingest::filter::is_merge_commit;
///
/// assert!(is_merge_commit("Merge pull request #42 from fork/main"));
/// assert!(!is_merge_commit("Add merge sort implementation"));
/// ```
pub fn is_merge_commit(title: &str) -> bool {
    let lower = title.to_lowercase();
    [
        "merge pull request",
        "merge branch",
        "merge remote",
        "auto merge",
        "automated merge",
    ]
    .iter()
    .any(|p| lower.contains(p))
}
