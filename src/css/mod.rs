// src/css/mod.rs
// =============================================================================
// Stylesheet reference extraction.
//
// This module only looks at CSS text. Fetching the references it finds, and
// walking into imported stylesheets, happens in archive::stylesheet, which
// owns the download session.
// =============================================================================

mod extract;

pub use extract::{rewrite_stylesheet, scan_stylesheet, RefKind, StylesheetRefs};
