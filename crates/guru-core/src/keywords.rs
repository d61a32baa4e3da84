//! Technology tag derivation from changed file paths.
//!
//! A PR touching `src/api/graphql/resolvers/user.ts` tells us something
//! about what its author knows, even before reading the diff. This module
//! turns file paths into a small set of lower-cased technology tags used
//! for filtering and for the `tech_expertise` summary on ranked experts.

use std::collections::BTreeSet;

/// Path segments that carry no technology signal.
const GENERIC_TERMS: &[&str] = &[
    "app", "asset", "assets", "build", "common", "component", "components", "config", "configs",
    "dist", "helper", "helpers", "index", "init", "interface", "interfaces", "js", "json", "jsx",
    "lib", "libs", "main", "md", "model", "models", "page", "pages", "public", "py", "setup",
    "shared", "spec", "specs", "src", "static", "style", "styles", "test", "tests", "ts", "tsx",
    "type", "types", "util", "utils", "yaml", "yml",
];

/// File extensions mapped to a canonical technology tag.
const EXT_TAGS: &[(&str, &str)] = &[
    ("cpp", "cpp"),
    ("dockerfile", "docker"),
    ("go", "golang"),
    ("gql", "graphql"),
    ("graphql", "graphql"),
    ("java", "java"),
    ("jsx", "react"),
    ("kt", "kotlin"),
    ("php", "php"),
    ("prisma", "prisma"),
    ("proto", "protobuf"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("scala", "scala"),
    ("sql", "sql"),
    ("svelte", "svelte"),
    ("swift", "swift"),
    ("tf", "terraform"),
    ("tsx", "react"),
    ("vue", "vue"),
];

/// Extract technology tags from a single file path.
///
/// The path is split on `/` and `\`, each segment further split on `-`,
/// `_`, and `.`; tokens are lower-cased, stripped of digits, and dropped
/// when shorter than 2 characters or found in the generic-term stoplist.
/// The final segment's extension is mapped through a canonical table
/// (`.tsx`/`.jsx` become `react`, `.rs` becomes `rust`, and so on) and
/// emitted as a tag of its own.
///
/// Pure and deterministic: the same path always yields the same set.
///
/// # Examples
///
/// ```
/// use guru_core::keywords::extract_tech_keywords;
///
/// let tags = extract_tech_keywords("src/api/graphql/resolvers/user.ts");
/// assert!(tags.contains("api"));
/// assert!(tags.contains("graphql"));
/// assert!(tags.contains("resolvers"));
/// assert!(tags.contains("user"));
/// assert!(!tags.contains("src"));
///
/// assert!(extract_tech_keywords("").is_empty());
/// ```
pub fn extract_tech_keywords(path: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    if path.trim().is_empty() {
        return tags;
    }

    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty())
        .collect();

    // Extension of the final segment becomes a technology tag of its own.
    if let Some(last) = segments.last() {
        if let Some((stem, ext)) = last.rsplit_once('.') {
            if !stem.is_empty() && !ext.is_empty() {
                insert_tag(&mut tags, canonical_ext_tag(&ext.to_lowercase()));
            }
        }
    }

    for (i, segment) in segments.iter().enumerate() {
        // Strip the extension from the final segment before tokenizing.
        let stem = if i == segments.len() - 1 {
            match segment.rsplit_once('.') {
                Some((s, _)) if !s.is_empty() => s,
                _ => segment,
            }
        } else {
            segment
        };

        for token in stem.split(['-', '_', '.']) {
            let cleaned: String = token
                .chars()
                .filter(|c| !c.is_ascii_digit())
                .flat_map(|c| c.to_lowercase())
                .collect();
            insert_tag(&mut tags, cleaned);
        }
    }

    tags
}

/// Extract the sorted union of tags across multiple file paths.
///
/// # Examples
///
/// ```
/// use guru_core::keywords::extract_from_paths;
///
/// let tags = extract_from_paths(&[
///     "src/hooks/useQuery.tsx".to_string(),
///     "src/hooks/useMutation.tsx".to_string(),
/// ]);
/// assert!(tags.contains(&"hooks".to_string()));
/// assert!(tags.contains(&"react".to_string()));
/// ```
pub fn extract_from_paths(paths: &[String]) -> Vec<String> {
    let mut all = BTreeSet::new();
    for path in paths {
        all.extend(extract_tech_keywords(path));
    }
    all.into_iter().collect()
}

fn canonical_ext_tag(ext: &str) -> String {
    EXT_TAGS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, tag)| (*tag).to_string())
        .unwrap_or_else(|| ext.to_string())
}

fn insert_tag(tags: &mut BTreeSet<String>, tag: String) {
    if tag.chars().count() >= 2 && !GENERIC_TERMS.contains(&tag.as_str()) {
        tags.insert(tag);
    }
}
