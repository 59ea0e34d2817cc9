// src/markup/element.rs
// =============================================================================
// A single HTML element as produced by the scanner.
//
// An element borrows its text from the document it was scanned from:
// - `outer` is the whole span, from `<tag` to the end of the closing tag
// - `content` is the raw inner text between the tags
//
// Children are NOT stored. `children()` hands out a fresh scanner over the
// inner content, so nested elements are only materialized when asked for.
// =============================================================================

use std::collections::BTreeMap;
use std::fmt;

use super::scanner::Scanner;

/// Attribute map of an element. Keys are lower-cased and unique.
pub type Attributes = BTreeMap<String, String>;

/// Tags that never have content or a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "isindex",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Tags whose body is opaque text and is never scanned for nested tags.
pub const FOREIGN_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// How the scanner treats a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Materialized from the tag alone (`<img>`, `<br>`, `<link>` ...)
    Void,
    /// Body is taken verbatim up to the literal closing tag (`<script>` ...)
    Foreign,
    /// Regular element with nested markup
    Container,
}

impl ElementKind {
    /// Classifies a lower-case tag name.
    pub fn of(tag: &str) -> Self {
        if VOID_ELEMENTS.contains(&tag) {
            ElementKind::Void
        } else if FOREIGN_ELEMENTS.contains(&tag) {
            ElementKind::Foreign
        } else {
            ElementKind::Container
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    tag: String,
    attributes: Attributes,
    kind: ElementKind,
    outer: &'a str,
    content: &'a str,
    // Offset of `content` inside the text the root scanner started from.
    // Only used to report positions from nested scanners.
    content_offset: usize,
}

impl<'a> Element<'a> {
    pub(crate) fn new(
        tag: String,
        attributes: Attributes,
        outer: &'a str,
        content: &'a str,
        content_offset: usize,
    ) -> Self {
        let kind = ElementKind::of(&tag);
        Element {
            tag,
            attributes,
            kind,
            outer,
            content,
            content_offset,
        }
    }

    /// Lower-case tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Looks up an attribute. The name is matched case-insensitively.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Raw inner text (empty for void elements).
    pub fn content(&self) -> &'a str {
        self.content
    }

    /// The element exactly as it appears in the scanned text.
    pub fn outer(&self) -> &'a str {
        self.outer
    }

    /// Lazily scans the element's inner content.
    ///
    /// Foreign elements have no children: their body is opaque.
    pub fn children(&self) -> Scanner<'a> {
        if self.kind == ElementKind::Foreign {
            Scanner::with_offset("", self.content_offset)
        } else {
            Scanner::with_offset(self.content, self.content_offset)
        }
    }

    /// Renders the element back to markup from its tag name, attributes and
    /// raw content. Attributes come out in key order.
    pub fn render(&self) -> String {
        let mut out = format!("<{}", self.tag);
        let mut last_unquoted = false;
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push('=');
            last_unquoted = push_value(&mut out, value);
        }

        if self.kind == ElementKind::Void {
            // A '/' right after an unquoted value would be read back as part of it
            if last_unquoted {
                out.push(' ');
            }
            out.push_str("/>");
            return out;
        }

        out.push('>');
        out.push_str(self.content);
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
        out
    }
}

impl fmt::Display for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// Picks a quote character the value does not contain. A value holding both
// kinds can only have come from an unquoted attribute, so it is written back
// unquoted. Returns true when the value went out unquoted.
fn push_value(out: &mut String, value: &str) -> bool {
    let has_double = value.contains('"');
    let has_single = value.contains('\'');

    if !has_double {
        out.push('"');
        out.push_str(value);
        out.push('"');
        false
    } else if !has_single {
        out.push('\'');
        out.push_str(value);
        out.push('\'');
        false
    } else if value.bytes().all(|b| !b.is_ascii_whitespace() && b != b'>') {
        out.push_str(value);
        true
    } else {
        // Not produced by parse_attributes; escaped so the tag stays well formed
        out.push('"');
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
        false
    }
}

/// Parses the attribute text of a tag (everything after the tag name).
///
/// Quoted values run from the opening quote to the next quote of the same
/// kind, so either `'` or `"` may be used. Unquoted values run to the next
/// whitespace and bare attributes get an empty value. When a key repeats, the
/// first occurrence wins.
pub fn parse_attributes(text: &str) -> Attributes {
    parse_tag_attributes(text).0
}

/// Like [`parse_attributes`], and also tells whether the tag ends in a
/// self-closing `/`. A `/` inside an unquoted value (`href=/`) does not count.
pub(crate) fn parse_tag_attributes(text: &str) -> (Attributes, bool) {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut attributes = Attributes::new();
    let mut self_closing = false;
    let mut i = 0;

    while i < len {
        // Skip separators (whitespace and the '/' of self-closing tags)
        while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            if bytes[i] == b'/' {
                self_closing = true;
            }
            i += 1;
        }
        if i >= len {
            break;
        }
        self_closing = false;

        let key_start = i;
        while i < len
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'/'
        {
            i += 1;
        }
        if i == key_start {
            // A stray '=' with no key in front of it
            i += 1;
            continue;
        }
        let key = text[key_start..i].to_ascii_lowercase();

        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = "";
        if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }

            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                let value_end = bytes[value_start..]
                    .iter()
                    .position(|&b| b == quote)
                    .map_or(len, |p| value_start + p);
                value = &text[value_start..value_end];
                i = value_end + 1;
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = &text[value_start..i];
            }
        }

        attributes.entry(key).or_insert_with(|| value.to_string());
    }

    (attributes, self_closing)
}
