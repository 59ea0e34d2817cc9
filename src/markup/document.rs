// src/markup/document.rs
// =============================================================================
// A fetched HTML page: raw markup, where it came from, and its text encoding.
//
// Scanning never happens on the raw markup directly. Comments are stripped
// first and everything before the first <html> tag (doctype, BOM junk...) is
// cut off, so the element tree is always rooted at <html>.
// =============================================================================

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;
use std::sync::OnceLock;

use super::element::Element;
use super::scanner::{find_ascii_ci, ParseError, Scanner};

#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    markup: String,
    encoding: &'static Encoding,
    // Comment-free markup starting at the root <html> tag
    scannable: String,
}

impl Document {
    /// Builds a document from already-decoded markup.
    pub fn new(
        url: impl Into<String>,
        markup: impl Into<String>,
        encoding: &'static Encoding,
    ) -> Result<Self, ParseError> {
        let markup = markup.into();
        let stripped = strip_comments(&markup);
        let root = find_root(&stripped).ok_or(ParseError::MissingRoot)?;
        let scannable = stripped[root..].to_string();

        Ok(Document {
            url: url.into(),
            markup,
            encoding,
            scannable,
        })
    }

    /// Decodes fetched bytes and builds a document.
    ///
    /// The encoding comes from a byte-order mark, the response's declared
    /// charset, or a `<meta>` charset declaration, in that order. A label
    /// encoding_rs does not know is skipped. UTF-8 is the fallback.
    pub fn from_bytes(
        url: impl Into<String>,
        bytes: &[u8],
        content_type: Option<&str>,
    ) -> Result<Self, ParseError> {
        let lookup = |label: String| Encoding::for_label(label.as_bytes());
        let declared = content_type
            .and_then(charset_param)
            .and_then(lookup)
            .or_else(|| sniff_meta_charset(bytes).and_then(lookup))
            .unwrap_or(UTF_8);

        // decode() honours a BOM over the declared encoding
        let (text, encoding, _had_errors) = declared.decode(bytes);
        Self::new(url, text.into_owned(), encoding)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The markup exactly as fetched (comments included).
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// A fresh lazy walk over every element, rooted at `<html>`.
    pub fn elements(&self) -> Scanner<'_> {
        Scanner::new(&self.scannable)
    }

    /// Elements with the given (lower-case) tag name.
    pub fn elements_by_tag<'d>(
        &'d self,
        tag: &'d str,
    ) -> impl Iterator<Item = Result<Element<'d>, ParseError>> + 'd {
        self.elements_by(move |element| element.tag() == tag)
    }

    /// Elements the predicate accepts. Parse faults are always passed through.
    pub fn elements_by<'d, P>(
        &'d self,
        predicate: P,
    ) -> impl Iterator<Item = Result<Element<'d>, ParseError>> + 'd
    where
        P: Fn(&Element<'d>) -> bool + 'd,
    {
        self.elements().filter(move |item| match item {
            Ok(element) => predicate(element),
            Err(_) => true,
        })
    }

    /// Scans the whole document once, surfacing the first parse fault.
    pub fn validate(&self) -> Result<usize, ParseError> {
        let mut count = 0;
        for element in self.elements() {
            element?;
            count += 1;
        }
        Ok(count)
    }
}

/// Removes every `<!-- ... -->` comment. An unterminated comment swallows the
/// rest of the text.
pub fn strip_comments(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(start) = rest.find("<!--") {
        out.push_str(&rest[..start]);
        match rest[start + 4..].find("-->") {
            Some(end) => rest = &rest[start + 4 + end + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }

    out.push_str(rest);
    out
}

// Offset of the first `<html` tag (not `<htmlfoo`).
fn find_root(markup: &str) -> Option<usize> {
    let bytes = markup.as_bytes();
    let mut from = 0;

    while let Some(pos) = find_ascii_ci(markup, "<html", from) {
        match bytes.get(pos + 5) {
            None => return Some(pos),
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(pos),
            Some(_) => from = pos + 5,
        }
    }

    None
}

/// Extracts the `charset` parameter of a content type.
pub(crate) fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        } else {
            None
        }
    })
}

// Looks for a charset declared by a <meta> tag near the top of the page.
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    static META_CHARSET: OnceLock<Regex> = OnceLock::new();
    // Constant pattern: failing to compile it is a programmer error
    let pattern = META_CHARSET.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_.:\-]+)"#)
            .expect("meta charset pattern is valid")
    });

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]);
    pattern
        .captures(&head)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
