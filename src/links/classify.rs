// src/links/classify.rs
// =============================================================================
// Picks the file extension a downloaded resource is saved under.
//
// The response's Content-Type is the main source of truth. Two exceptions:
// - references ending in .png or .svg keep that suffix no matter what the
//   server says (these are often served as application/octet-stream)
// - an unknown MIME type falls back to the reference's own extension, if it
//   looks like one
// =============================================================================

// Suffixes of the reference that beat the content type.
const TRUSTED_SUFFIXES: &[&str] = &[".png", ".svg"];

const MIME_EXTENSIONS: &[(&str, &str)] = &[
    ("text/css", ".css"),
    ("text/javascript", ".js"),
    ("application/javascript", ".js"),
    ("application/x-javascript", ".js"),
    ("application/ecmascript", ".js"),
    ("text/html", ".html"),
    ("application/json", ".json"),
    ("text/plain", ".txt"),
    ("image/png", ".png"),
    ("image/jpeg", ".jpg"),
    ("image/jpg", ".jpg"),
    ("image/pjpeg", ".jpg"),
    ("image/gif", ".gif"),
    ("image/svg+xml", ".svg"),
    ("image/webp", ".webp"),
    ("image/avif", ".avif"),
    ("image/bmp", ".bmp"),
    ("image/x-icon", ".ico"),
    ("image/vnd.microsoft.icon", ".ico"),
    ("font/woff", ".woff"),
    ("application/font-woff", ".woff"),
    ("font/woff2", ".woff2"),
    ("font/ttf", ".ttf"),
    ("application/x-font-ttf", ".ttf"),
    ("font/otf", ".otf"),
    ("application/vnd.ms-fontobject", ".eot"),
];

/// Infers a local file extension (with the leading dot, or empty).
///
/// Example: ("image/jpeg; charset=binary", "photo") -> ".jpg"
pub fn extension_for(content_type: Option<&str>, reference: &str) -> String {
    let path = reference_path(reference).to_ascii_lowercase();

    if let Some(suffix) = TRUSTED_SUFFIXES.iter().find(|s| path.ends_with(*s)) {
        return suffix.to_string();
    }

    if let Some(extension) = content_type.and_then(mime_extension) {
        return extension.to_string();
    }

    reference_extension(&path).unwrap_or_default()
}

/// Maps a content type (parameters allowed) to an extension.
pub fn mime_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    MIME_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == mime)
        .map(|(_, extension)| *extension)
}

// The path part of a reference, without query or fragment.
fn reference_path(reference: &str) -> &str {
    let end = reference.find(['?', '#']).unwrap_or(reference.len());
    &reference[..end]
}

// ".woff" from "fonts/icons.woff", if it is 1-5 ASCII alphanumerics.
fn reference_extension(path: &str) -> Option<String> {
    let file_name = path.rsplit('/').next()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    let valid = (1..=5).contains(&extension.len())
        && extension.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| format!(".{extension}"))
}
