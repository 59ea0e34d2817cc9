// src/css/extract.rs
// =============================================================================
// Finds the references a stylesheet depends on, and rewrites them.
//
// Two kinds of reference live in CSS:
// - plain resources:  background: url("img/bg.png");
// - imports:          @import "reset.css";  /  @import url(reset.css);
//
// One regex covers both. It is an alternation with the @import branch first,
// so at an "@import url(...)" position the import branch wins and the url(...)
// inside is consumed with it. A reference string that shows up both as an
// import and as a plain url() is treated as an import only.
// =============================================================================

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// The references found in one stylesheet, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StylesheetRefs {
    /// url(...) references to images, fonts ...
    pub resources: Vec<String>,
    /// @import targets (other stylesheets)
    pub imports: Vec<String>,
}

/// Which kind of reference a match is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Resource,
    Import,
}

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The pattern is a constant, so failing to compile it is a programmer
    // error and panicking is the right call
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)@import\s+(?:url\(\s*)?(?:"(?P<import_dq>[^"]*)"|'(?P<import_sq>[^']*)'|(?P<import_bare>[^\s"'();]+))|url\(\s*(?:"(?P<url_dq>[^"]*)"|'(?P<url_sq>[^']*)'|(?P<url_bare>[^\s"')]*))\s*\)"#,
        )
        .expect("stylesheet reference pattern is valid")
    })
}

// The reference inside a match, with its kind.
fn reference<'t>(caps: &Captures<'t>) -> Option<(RefKind, regex::Match<'t>)> {
    let import = caps
        .name("import_dq")
        .or_else(|| caps.name("import_sq"))
        .or_else(|| caps.name("import_bare"));
    if let Some(m) = import {
        return Some((RefKind::Import, m));
    }

    caps.name("url_dq")
        .or_else(|| caps.name("url_sq"))
        .or_else(|| caps.name("url_bare"))
        .map(|m| (RefKind::Resource, m))
}

/// Extracts the resource and import references of a stylesheet.
///
/// Empty references are skipped and each list holds every string once.
pub fn scan_stylesheet(css: &str) -> StylesheetRefs {
    let mut refs = StylesheetRefs::default();

    for caps in reference_pattern().captures_iter(css) {
        let Some((kind, m)) = reference(&caps) else {
            continue;
        };
        let value = m.as_str().trim();
        if value.is_empty() {
            continue;
        }

        let list = match kind {
            RefKind::Import => &mut refs.imports,
            RefKind::Resource => &mut refs.resources,
        };
        if !list.iter().any(|known| known == value) {
            list.push(value.to_string());
        }
    }

    // Imports take priority over plain resources
    let imports = &refs.imports;
    refs.resources.retain(|resource| !imports.contains(resource));

    refs
}

/// Rewrites references in place. `replace` gets each reference with its kind
/// and returns the new text, or `None` to leave it as it is.
///
/// Only the reference itself changes; quotes, `url(` and `@import` stay.
pub fn rewrite_stylesheet<F>(css: &str, mut replace: F) -> String
where
    F: FnMut(RefKind, &str) -> Option<String>,
{
    let mut out = String::with_capacity(css.len());
    let mut last = 0;

    for caps in reference_pattern().captures_iter(css) {
        let Some((kind, m)) = reference(&caps) else {
            continue;
        };
        if let Some(replacement) = replace(kind, m.as_str().trim()) {
            out.push_str(&css[last..m.start()]);
            out.push_str(&replacement);
            last = m.end();
        }
    }

    out.push_str(&css[last..]);
    out
}
