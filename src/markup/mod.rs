// src/markup/mod.rs
// =============================================================================
// The element model and the scanner that produces it.
//
// Submodules:
// - element: Element, its attributes, and rendering back to markup
// - scanner: the lazy tag-stack state machine
// - document: a fetched page (comment stripping, <html> root, encoding)
//
// There is no DOM here. Elements are views into the document text and are
// produced one at a time, on demand.
// =============================================================================

mod document;
mod element;
mod scanner;

pub use document::{strip_comments, Document};
pub use element::{
    parse_attributes, Attributes, Element, ElementKind, FOREIGN_ELEMENTS, VOID_ELEMENTS,
};
pub use scanner::{ParseError, Scanner};

pub(crate) use document::charset_param;
