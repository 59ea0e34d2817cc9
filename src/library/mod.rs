// src/library/mod.rs
// =============================================================================
// Reading archives back: the saved pages under a destination folder.
// =============================================================================

mod saved_page;

pub use saved_page::{list_saved_pages, LibraryError, SavedPage, UNTITLED};
