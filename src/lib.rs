// src/lib.rs
// =============================================================================
// page_archiver: save a webpage and everything it depends on into a folder
// that opens offline.
//
// Modules, leaf to root:
// - markup: element model and the lazy scanner
// - links: URL resolution, entity decoding, file extension inference
// - css: references inside stylesheets
// - archive: the download session and the orchestrator running it
// - library: reading saved archives back
//
// Typical use:
//
//     let archiver = Archiver::new(ArchiveConfig::default())?;
//     let request = ArchiveRequest::new("https://example.com/", "/tmp/saved");
//     let report = archiver.archive(&request, &NoopObserver).await?;
// =============================================================================

pub mod archive;
pub mod config;
pub mod css;
pub mod error;
pub mod library;
pub mod links;
pub mod markup;

pub use archive::{
    ArchiveObserver, ArchiveReport, ArchiveRequest, ArchiveTarget, Archiver, Category, Fetch,
    FetchError, Fetched, HttpFetcher, NoopObserver, ResourceRecord,
};
pub use config::ArchiveConfig;
pub use error::ArchiveError;
pub use library::{list_saved_pages, LibraryError, SavedPage};
pub use markup::{Document, Element, ParseError};
