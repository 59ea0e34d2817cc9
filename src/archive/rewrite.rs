// src/archive/rewrite.rs
// =============================================================================
// Final edits to the saved page text.
//
// 1. Every registered reference is replaced with its local path. All the
//    references go into ONE regex alternation (longest first) and the text is
//    rewritten in a single left-to-right pass, so a path that was just written
//    is never matched again and a short reference never eats part of a longer
//    one ("a.png" inside "img/a.png").
// 2. Every srcset attribute is dropped. A srcset list still pointing at remote
//    images would win over the localized src when the page is viewed offline.
// =============================================================================

use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

// Alternations of many long URLs can outgrow the default compiled size limit
const PATTERN_SIZE_LIMIT: usize = 64 * 1024 * 1024;

/// Replaces every literal occurrence of each key with its value.
pub fn rewrite_references(html: &str, replacements: &HashMap<String, String>) -> String {
    let mut references: Vec<&String> = replacements.keys().filter(|r| !r.is_empty()).collect();
    if references.is_empty() {
        return html.to_string();
    }
    references.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = references
        .iter()
        .map(|reference| regex::escape(reference))
        .collect::<Vec<_>>()
        .join("|");

    match RegexBuilder::new(&alternation)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
    {
        Ok(pattern) => pattern
            .replace_all(html, |caps: &regex::Captures| {
                replacements
                    .get(&caps[0])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned(),
        Err(error) => {
            warn!(%error, "reference pattern too large, rewriting one reference at a time");
            references.iter().fold(html.to_string(), |text, reference| {
                text.replace(reference.as_str(), &replacements[reference.as_str()])
            })
        }
    }
}

fn srcset_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\s+srcset\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
            .expect("srcset pattern is valid")
    })
}

/// Drops every `srcset="..."` attribute.
pub fn remove_srcset(html: &str) -> String {
    srcset_pattern().replace_all(html, "").into_owned()
}
