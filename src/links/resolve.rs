// src/links/resolve.rs
// =============================================================================
// Turns a reference found in markup into an absolute URL.
//
// This is a pure string function: no I/O, no parsing into URL structs, so it
// can be tested with plain strings. The rules, checked in order:
//
//   "//cdn.com/a.png"  -> scheme of the base + the reference
//   "/img/a.png"       -> origin of the base + the reference
//   "https://x/a.png"  -> unchanged (any reference with a scheme is)
//   "../a.png"         -> one directory up from the base per leading ".."
//   "a.png"            -> directory of the base + the reference
//
// Examples (base = "https://a.com/dir/page.html"):
//   "img.png"     -> "https://a.com/dir/img.png"
//   "../img.png"  -> "https://a.com/img.png"
//   "/img.png"    -> "https://a.com/img.png"
// =============================================================================

use super::entities::decode_entities;

/// Resolves `reference` against `base`, returning an absolute URL.
///
/// The reference is entity-decoded first, and backslashes are treated as
/// path separators.
pub fn resolve(base: &str, reference: &str) -> String {
    let reference = decode_entities(reference.trim()).replace('\\', "/");
    let base = strip_fragment(base.trim());
    let origin = origin(base);

    // 1. Protocol-relative
    if let Some(rest) = reference.strip_prefix("//") {
        let scheme = scheme(base).unwrap_or("http");
        return format!("{scheme}://{rest}");
    }

    // 2. Root-relative
    if reference.starts_with('/') {
        return format!("{origin}{reference}");
    }

    // 3. Already absolute
    if has_scheme(&reference) {
        return reference;
    }

    if reference.is_empty() {
        return base.to_string();
    }
    if reference.starts_with('#') {
        return format!("{base}{reference}");
    }
    if reference.starts_with('?') {
        return format!("{}{reference}", strip_query(base));
    }

    // 4./5. Relative to the base's directory
    let mut directory = directory(base);
    let mut rest = reference.as_str();
    loop {
        if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
        } else if rest == "." {
            rest = "";
        } else if let Some(stripped) = rest.strip_prefix("../") {
            pop_segment(&mut directory, origin.len());
            rest = stripped;
        } else if rest == ".." {
            pop_segment(&mut directory, origin.len());
            rest = "";
        } else {
            break;
        }
    }

    directory.push_str(rest);
    directory
}

/// Whether a resolved URL is something we can fetch (http or https).
pub fn is_fetchable(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// "https://a.com:8080/x/y?q" -> "https://a.com:8080"
///
/// Returns an empty string for a base without a scheme.
pub fn origin(url: &str) -> &str {
    let Some(sep) = url.find("://") else {
        return "";
    };
    let authority_start = sep + 3;
    let authority_end = url[authority_start..]
        .find(['/', '?', '#'])
        .map_or(url.len(), |p| authority_start + p);
    &url[..authority_end]
}

fn scheme(url: &str) -> Option<&str> {
    url.find("://").map(|sep| &url[..sep])
}

// "mailto:x", "data:...", "https://..." all have a scheme; "a.png" and
// "dir/a:b.png" don't.
fn has_scheme(reference: &str) -> bool {
    let Some(colon) = reference.find(':') else {
        return false;
    };
    let candidate = &reference[..colon];
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map_or(url, |(before, _)| before)
}

fn strip_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(before, _)| before)
}

// Directory part of the base, always ending in '/'.
// "https://a.com/dir/page.html?x" -> "https://a.com/dir/"
// "https://a.com"                 -> "https://a.com/"
fn directory(base: &str) -> String {
    let base = strip_query(base);
    let origin_len = origin(base).len();
    let path = &base[origin_len..];

    match path.rfind('/') {
        Some(last) => base[..origin_len + last + 1].to_string(),
        None if origin_len > 0 => format!("{}/", &base[..origin_len]),
        // A base with no scheme and no slash: its directory is "here"
        None => String::new(),
    }
}

// "https://a.com/x/y/" -> "https://a.com/x/". Never climbs above the origin.
fn pop_segment(directory: &mut String, origin_len: usize) {
    if directory.len() <= origin_len + 1 {
        return;
    }
    let trimmed = directory.trim_end_matches('/').len();
    match directory[..trimmed].rfind('/') {
        Some(last) if last + 1 > origin_len => directory.truncate(last + 1),
        _ => {}
    }
}
