// src/markup/scanner.rs
// =============================================================================
// A lazy, single-pass scanner that turns markup into elements.
//
// How it works:
// 1. A byte cursor walks the text looking for the next '<'
// 2. Void tags (<img>, <link> ...) become elements on the spot
// 3. Foreign tags (<script>, <style> ...) swallow everything up to their
//    literal closing tag and become one element
// 4. Any other opening tag is pushed on a stack of pending opens
// 5. A closing tag pops its open tag and the element spanning both is emitted
//
// Elements come out through the Iterator trait, one per `next()` call, so the
// caller decides how much of the document is actually scanned. A scanner is
// consumed by iterating it: to walk a document again, ask for a new one.
//
// Every delimiter we look for is ASCII, so byte offsets found by searching
// always land on UTF-8 character boundaries and slicing `&str` is safe.
// =============================================================================

use std::collections::VecDeque;
use std::iter::FusedIterator;

use thiserror::Error;

use super::element::{parse_tag_attributes, Attributes, Element, ElementKind};

/// Faults that make a document impossible to scan.
///
/// They are fatal: nothing scanned after the fault can be trusted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The document has no `<html>` tag to root the element tree at.
    #[error("document has no <html> element")]
    MissingRoot,

    /// A closing tag with no matching open tag.
    #[error("unmatched closing tag </{tag}> at offset {offset}")]
    UnmatchedClose { tag: String, offset: usize },

    /// A `<script>`/`<style>`/`<noscript>` whose closing tag never appears.
    #[error("<{tag}> at offset {offset} is never closed")]
    UnterminatedForeign { tag: String, offset: usize },
}

// An opening tag waiting for its closing tag
#[derive(Debug)]
struct OpenTag {
    name: String,
    attributes: Attributes,
    start: usize,
    content_start: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Looking for the next tag
    Scanning,
    /// Input exhausted; implicitly closing whatever is still open
    Draining,
    /// Finished (or failed)
    Done,
}

#[derive(Debug)]
pub struct Scanner<'a> {
    src: &'a str,
    base: usize,
    cursor: usize,
    open: Vec<OpenTag>,
    ready: VecDeque<Element<'a>>,
    state: State,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::with_offset(src, 0)
    }

    /// Scanner over a slice that starts `base` bytes into some larger text.
    /// Offsets in errors are reported relative to that larger text.
    pub(crate) fn with_offset(src: &'a str, base: usize) -> Self {
        Scanner {
            src,
            base,
            cursor: 0,
            open: Vec::new(),
            ready: VecDeque::new(),
            state: State::Scanning,
        }
    }

    // Advances the cursor past the next tag, queueing any finished elements.
    fn step(&mut self) -> Result<(), ParseError> {
        let bytes = self.src.as_bytes();

        let Some(lt) = find_byte(bytes, b'<', self.cursor) else {
            self.cursor = bytes.len();
            self.state = State::Draining;
            return Ok(());
        };

        match bytes.get(lt + 1) {
            Some(b'/') => self.closing_tag(lt),
            Some(b'!') | Some(b'?') => {
                // Doctype, CDATA or processing instruction: skip it whole
                self.cursor = find_byte(bytes, b'>', lt).map_or(bytes.len(), |gt| gt + 1);
                Ok(())
            }
            Some(b) if b.is_ascii_alphabetic() => self.opening_tag(lt),
            _ => {
                // A lone '<' in text
                self.cursor = lt + 1;
                Ok(())
            }
        }
    }

    fn opening_tag(&mut self, lt: usize) -> Result<(), ParseError> {
        let bytes = self.src.as_bytes();
        let name_end = name_end(bytes, lt + 1);
        let name = self.src[lt + 1..name_end].to_ascii_lowercase();

        let Some(gt) = find_tag_end(bytes, name_end) else {
            // Truncated tag at the end of input
            self.cursor = bytes.len();
            self.state = State::Draining;
            return Ok(());
        };

        let header = &self.src[name_end..gt];
        let (attributes, self_closing) = parse_tag_attributes(header);
        let after = gt + 1;

        match ElementKind::of(&name) {
            ElementKind::Void => {
                let element = self.element(name, attributes, lt, after, after, after);
                self.ready.push_back(element);
                self.cursor = after;
            }
            ElementKind::Foreign => {
                let closing = format!("</{name}");
                let Some(close) = find_ascii_ci(self.src, &closing, after) else {
                    return Err(ParseError::UnterminatedForeign {
                        tag: name,
                        offset: self.base + lt,
                    });
                };
                let end = find_byte(bytes, b'>', close).map_or(bytes.len(), |gt| gt + 1);
                let element = self.element(name, attributes, lt, after, close, end);
                self.ready.push_back(element);
                self.cursor = end;
            }
            ElementKind::Container if self_closing => {
                let element = self.element(name, attributes, lt, after, after, after);
                self.ready.push_back(element);
                self.cursor = after;
            }
            ElementKind::Container => {
                self.open.push(OpenTag {
                    name,
                    attributes,
                    start: lt,
                    content_start: after,
                });
                self.cursor = after;
            }
        }

        Ok(())
    }

    fn closing_tag(&mut self, lt: usize) -> Result<(), ParseError> {
        let bytes = self.src.as_bytes();
        let name_end = name_end(bytes, lt + 2);
        if name_end == lt + 2 {
            // "</" followed by something that is not a name
            self.cursor = lt + 2;
            return Ok(());
        }

        let name = self.src[lt + 2..name_end].to_ascii_lowercase();
        let end = find_byte(bytes, b'>', name_end).map_or(bytes.len(), |gt| gt + 1);

        let Some(index) = self.open.iter().rposition(|tag| tag.name == name) else {
            return Err(ParseError::UnmatchedClose {
                tag: name,
                offset: self.base + lt,
            });
        };

        // Anything opened after the matching tag is closed implicitly
        while self.open.len() > index + 1 {
            if let Some(inner) = self.open.pop() {
                let element = self.close(inner, lt, lt);
                self.ready.push_back(element);
            }
        }
        if let Some(tag) = self.open.pop() {
            let element = self.close(tag, lt, end);
            self.ready.push_back(element);
        }

        self.cursor = end;
        Ok(())
    }

    fn close(&self, tag: OpenTag, content_end: usize, end: usize) -> Element<'a> {
        self.element(
            tag.name,
            tag.attributes,
            tag.start,
            tag.content_start,
            content_end,
            end,
        )
    }

    fn element(
        &self,
        name: String,
        attributes: Attributes,
        start: usize,
        content_start: usize,
        content_end: usize,
        end: usize,
    ) -> Element<'a> {
        let src: &'a str = self.src;
        Element::new(
            name,
            attributes,
            &src[start..end],
            &src[content_start..content_end],
            self.base + content_start,
        )
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Element<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(element) = self.ready.pop_front() {
                return Some(Ok(element));
            }

            match self.state {
                State::Done => return None,
                State::Draining => match self.open.pop() {
                    Some(tag) => {
                        let end = self.src.len();
                        let element = self.close(tag, end, end);
                        self.ready.push_back(element);
                    }
                    None => self.state = State::Done,
                },
                State::Scanning => {
                    if let Err(e) = self.step() {
                        self.state = State::Done;
                        self.open.clear();
                        self.ready.clear();
                        return Some(Err(e));
                    }
                }
            }
        }
    }
}

impl FusedIterator for Scanner<'_> {}

fn find_byte(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|p| p + from)
}

// End of a tag name starting at `from`.
fn name_end(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len()
        && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'-' | b'_' | b':'))
    {
        i += 1;
    }
    i
}

// Finds the '>' that ends a tag. A '>' inside a quoted attribute value does
// not count; a quote only opens a value right after an '='.
fn find_tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut after_equals = false;

    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'>' => return Some(i),
                b'=' => after_equals = true,
                b'"' | b'\'' if after_equals => {
                    quote = Some(b);
                    after_equals = false;
                }
                b if b.is_ascii_whitespace() => {}
                _ => after_equals = false,
            },
        }
    }

    None
}

/// Case-insensitive search for an ASCII needle.
pub(crate) fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || from > hay.len() {
        return None;
    }

    hay[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> Vec<Element<'_>> {
        Scanner::new(src)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn tags(src: &str) -> Vec<String> {
        scan(src).iter().map(|e| e.tag().to_string()).collect()
    }

    #[test]
    fn test_void_elements_come_out_immediately() {
        let elements = scan(r#"<div><img src="a.png"><br></div>"#);
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].tag(), "img");
        assert_eq!(elements[0].attr("src"), Some("a.png"));
        assert_eq!(elements[1].tag(), "br");
        assert_eq!(elements[2].tag(), "div");
    }

    #[test]
    fn test_container_spans_open_to_close() {
        let elements = scan("<p class='x'>hello <b>world</b></p>");
        let p = elements.iter().find(|e| e.tag() == "p").unwrap();
        assert_eq!(p.content(), "hello <b>world</b>");
        assert_eq!(p.outer(), "<p class='x'>hello <b>world</b></p>");
        assert_eq!(p.attr("class"), Some("x"));
    }

    #[test]
    fn test_foreign_body_is_not_scanned() {
        let src = r#"<body><script>if (a < b) { document.write("</div>"); }</script></body>"#;
        let elements = scan(src);
        assert_eq!(tags(src), vec!["script", "body"]);
        assert_eq!(
            elements[0].content(),
            r#"if (a < b) { document.write("</div>"); }"#
        );
    }

    #[test]
    fn test_foreign_closing_tag_is_case_insensitive() {
        let elements = scan("<STYLE>a { color: red }</Style>");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tag(), "style");
        assert_eq!(elements[0].content(), "a { color: red }");
    }

    #[test]
    fn test_unmatched_close_is_fatal() {
        let mut scanner = Scanner::new("<div></span>");
        match scanner.next() {
            Some(Err(ParseError::UnmatchedClose { tag, offset })) => {
                assert_eq!(tag, "span");
                assert_eq!(offset, 5);
            }
            other => panic!("expected unmatched close, got {other:?}"),
        }
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_close_on_empty_stack_is_fatal() {
        let result: Result<Vec<_>, _> = Scanner::new("</p>").collect();
        assert!(matches!(result, Err(ParseError::UnmatchedClose { .. })));
    }

    #[test]
    fn test_unterminated_script_is_fatal() {
        let result: Result<Vec<_>, _> = Scanner::new("<script>var a = 1;").collect();
        assert!(matches!(
            result,
            Err(ParseError::UnterminatedForeign { .. })
        ));
    }

    #[test]
    fn test_implicitly_closed_elements() {
        // <li> is never closed; </ul> closes it
        let elements = scan("<ul><li>one<li>two</ul>");
        assert_eq!(tags("<ul><li>one<li>two</ul>"), vec!["li", "li", "ul"]);
        assert_eq!(elements[0].content(), "two");
        assert_eq!(elements[1].content(), "one<li>two");
    }

    #[test]
    fn test_open_tags_are_closed_at_end_of_input() {
        let elements = scan("<html><body><p>text");
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[2].tag(), "html");
    }

    #[test]
    fn test_quoted_gt_does_not_end_tag() {
        let elements = scan(r#"<img alt="a > b" src="x.png">"#);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attr("src"), Some("x.png"));
    }

    #[test]
    fn test_declarations_and_stray_lt_are_skipped() {
        assert_eq!(tags("<!DOCTYPE html><p>1 < 2</p>"), vec!["p"]);
    }

    #[test]
    fn test_self_closing_container() {
        assert_eq!(tags("<div/><span></span>"), vec!["div", "span"]);
        assert_eq!(tags("<div class=x /><span></span>"), vec!["div", "span"]);
    }

    #[test]
    fn test_unquoted_value_ending_in_slash() {
        let elements = scan("<a href=/>x</a>");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].tag(), "a");
        assert_eq!(elements[0].attr("href"), Some("/"));
        assert_eq!(elements[0].content(), "x");

        let elements = scan("<img src=a/b/>");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].attr("src"), Some("a/b/"));
    }

    #[test]
    fn test_children_are_scanned_lazily() {
        let elements = scan("<div><p><img src='a'></p><img src='b'></div>");
        let div = elements.last().unwrap();
        let children: Vec<_> = div.children().map(|e| e.unwrap().tag().to_string()).collect();
        assert_eq!(children, vec!["img", "p", "img"]);
    }

    #[test]
    fn test_render_round_trip() {
        let sources = [
            r#"<img src="a.png" alt='say "hi"'>"#,
            r#"<a HREF='/x' data-id="7">link <b>bold</b></a>"#,
            r#"<script src="app.js" async></script>"#,
            r#"<img alt=it's"x" src=a.png>"#,
            r#"<img alt=a.png title=it's"x">"#,
        ];

        for src in sources {
            let original = scan(src).pop().unwrap();
            let rendered = original.render();
            let reparsed = scan(&rendered).pop().unwrap();
            assert_eq!(reparsed.tag(), original.tag());
            assert_eq!(reparsed.attributes(), original.attributes());
        }
    }

    #[test]
    fn test_find_ascii_ci() {
        assert_eq!(find_ascii_ci("abc</SCRIPT>", "</script", 0), Some(3));
        assert_eq!(find_ascii_ci("abc", "</script", 0), None);
    }
}
