//! PR text preparation for embedding.
//!
//! Embeddings work best on concise text: the title carries most of the
//! signal, the description is truncated, and the derived technology tags
//! are appended so the vector picks up stack terms that rarely appear in
//! prose.

use guru_core::PullRequestRecord;

/// Longest description prefix included in the embedding text.
const MAX_DESCRIPTION_CHARS: usize = 500;

/// Collapse whitespace and strip characters that carry no meaning.
///
/// # Examples
///
/// ```
/// use guru_embed::text::clean_text;
///
/// assert_eq!(clean_text("fix\n\n  the   bug"), "fix the bug");
/// assert_eq!(clean_text(""), "");
/// ```
pub fn clean_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | ',' | '!' | '?'))
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a PR into the text that gets embedded.
///
/// Joins the cleaned title, a truncated description, and a
/// `Technologies: ...` line. Returns an empty string when the PR has no
/// usable text (such records are skipped by the ingestion pipeline).
///
/// # Examples
///
/// ```
/// use guru_embed::text::format_pr_text;
///
/// let text = format_pr_text("Fix N+1 queries", "", &["graphql".into(), "dataloader".into()]);
/// assert_eq!(text, "Fix N+1 queries. Technologies: graphql, dataloader");
/// ```
pub fn format_pr_text(title: &str, description: &str, tech_keywords: &[String]) -> String {
    let mut components = Vec::new();

    let title = clean_text(title);
    if !title.is_empty() {
        components.push(title);
    }

    let mut description = clean_text(description);
    if !description.is_empty() {
        if description.chars().count() > MAX_DESCRIPTION_CHARS {
            description = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
            description.push_str("...");
        }
        components.push(description);
    }

    if !tech_keywords.is_empty() {
        components.push(format!("Technologies: {}", tech_keywords.join(", ")));
    }

    components.join(". ")
}

/// Embedding text for a full record.
pub fn record_text(record: &PullRequestRecord) -> String {
    format_pr_text(&record.title, &record.description, &record.tech_keywords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("a  b\t\nc"), "a b c");
    }

    #[test]
    fn clean_text_strips_markup_noise() {
        assert_eq!(clean_text("## Summary *bold*"), "Summary bold");
    }

    #[test]
    fn format_includes_all_components() {
        let text = format_pr_text(
            "Add retry middleware",
            "Wraps fetch with exponential backoff",
            &["middleware".into(), "fetch".into()],
        );
        assert_eq!(
            text,
            "Add retry middleware. Wraps fetch with exponential backoff. Technologies: middleware, fetch"
        );
    }

    #[test]
    fn long_descriptions_are_truncated() {
        let description = "x".repeat(2000);
        let text = format_pr_text("t", &description, &[]);
        assert!(text.chars().count() < 600);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn empty_pr_yields_empty_text() {
        assert_eq!(format_pr_text("", "", &[]), "");
    }

    #[test]
    fn empty_description_is_skipped() {
        let text = format_pr_text("Title only", "", &[]);
        assert_eq!(text, "Title only");
    }
}
