//! Rendering of ranked experts.
//!
//! The formatter is deliberately dumb: it renders the profiles it is
//! given, in the order it is given them, and never re-sorts or re-scores.
//! Determinism here is what makes the pipeline's output diffable.

use guru_core::ExpertProfile;

/// Tech tags shown per expert before the list is elided.
const MAX_TECH_TAGS: usize = 10;

/// Render a ranked expert list as a text report.
///
/// Shows the first `show_top_n` entries in input order; a `show_top_n`
/// larger than the list renders everything without error. An empty list
/// renders a "no experts found" message.
///
/// # Examples
///
/// ```
/// use guru_rank::report::format;
///
/// let report = format(&[], 5);
/// assert!(report.contains("No experts found"));
/// ```
pub fn format(experts: &[ExpertProfile], show_top_n: usize) -> String {
    if experts.is_empty() {
        return "No experts found. Try a broader query, or check that the index has data \
                (run 'guru stats')."
            .to_string();
    }

    let shown = show_top_n.min(experts.len());
    let mut out = Vec::new();

    out.push("=".repeat(80));
    out.push(format!("TOP {shown} EXPERTS"));
    out.push("=".repeat(80));

    for (i, expert) in experts.iter().take(shown).enumerate() {
        out.push(String::new());
        out.push(format!("#{} {}", i + 1, expert.author));
        out.push("-".repeat(80));
        out.push(format!("GitHub: {}", expert.github_url));
        out.push(format!(
            "Score: {:.3} (similarity {:.3} | recency {:.3} | volume {:.3})",
            expert.score, expert.similarity_score, expert.recency_score, expert.volume_score,
        ));
        out.push(format!(
            "Relevant PRs: {} | Lines Changed: {}",
            expert.total_relevant_prs, expert.total_lines_changed,
        ));

        if !expert.tech_expertise.is_empty() {
            let tags: Vec<&str> = expert
                .tech_expertise
                .iter()
                .take(MAX_TECH_TAGS)
                .map(String::as_str)
                .collect();
            out.push(format!("Tech Expertise: {}", tags.join(", ")));
        }

        let best = &expert.best_pr;
        out.push(String::new());
        out.push("  Most Relevant PR:".to_string());
        out.push(format!("  Title: {}", best.record.title));
        out.push(format!("  Repo: {}", best.record.repo));
        out.push(format!("  URL: {}", best.record.url));
        out.push(format!("  Similarity: {:.3}", best.similarity));

        if expert.top_prs.len() > 1 {
            out.push(String::new());
            out.push("  Other Relevant PRs:".to_string());
            for pr in &expert.top_prs[1..] {
                out.push(format!("  - {} ({})", pr.record.title, pr.record.repo));
                out.push(format!("    {}", pr.record.url));
            }
        }
    }

    out.push(String::new());
    out.push("=".repeat(80));
    out.join("\n")
}

/// Render the same report as Markdown.
///
/// Same ordering and truncation rules as [`format`].
pub fn format_markdown(experts: &[ExpertProfile], show_top_n: usize) -> String {
    if experts.is_empty() {
        return "No experts found.\n".to_string();
    }

    let shown = show_top_n.min(experts.len());
    let mut out = Vec::new();

    out.push(format!("# Top {shown} Experts\n"));
    out.push("| Rank | Author | Score | PRs | Lines |".to_string());
    out.push("|------|--------|-------|-----|-------|".to_string());
    for (i, expert) in experts.iter().take(shown).enumerate() {
        out.push(format!(
            "| {} | [{}]({}) | {:.3} | {} | {} |",
            i + 1,
            expert.author,
            expert.github_url,
            expert.score,
            expert.total_relevant_prs,
            expert.total_lines_changed,
        ));
    }

    for (i, expert) in experts.iter().take(shown).enumerate() {
        out.push(String::new());
        out.push(format!("## {}. {}", i + 1, expert.author));
        if !expert.tech_expertise.is_empty() {
            let tags: Vec<String> = expert
                .tech_expertise
                .iter()
                .take(MAX_TECH_TAGS)
                .map(|t| format!("`{t}`"))
                .collect();
            out.push(format!("\nExpertise: {}", tags.join(" ")));
        }
        out.push(String::new());
        for pr in &expert.top_prs {
            out.push(format!(
                "- [{}]({}) — similarity {:.3}, {} lines",
                pr.record.title, pr.record.url, pr.similarity, pr.record.lines_changed,
            ));
        }
    }

    out.push(String::new());
    out.join("\n")
}
