// src/archive/mod.rs
// =============================================================================
// Downloading a page and everything it needs into a local folder.
//
// Submodules:
// - fetch: the `Fetch` seam and its reqwest implementation
// - session: per-run state (dedup registry, counters, failures)
// - layout: folder naming and the on-disk shape of an archive
// - stylesheet: the recursive walk through a stylesheet and its imports
// - rewrite: pointing the saved page at the local copies
// - orchestrator: the phases of a run, start to finish
// - lifecycle: the "started" / "finished" signals
// =============================================================================

mod fetch;
mod layout;
mod lifecycle;
mod orchestrator;
mod rewrite;
mod session;
mod stylesheet;

pub use fetch::{Fetch, FetchError, Fetched, HttpFetcher};
pub use layout::{
    choose_output_dir, sanitize_name, CSS_DIR, CSS_RESOURCES_DIR, FAVICON_FILE, IMAGES_DIR,
    INDEX_FILE, JS_DIR,
};
pub use lifecycle::{ArchiveObserver, ArchiveTarget, NoopObserver};
pub use orchestrator::{ArchiveReport, ArchiveRequest, Archiver};
pub use rewrite::{remove_srcset, rewrite_references};
pub use session::{Category, DownloadSession, FailedResource, ResourceRecord};

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why is a run sequential?
//    - Each resource is fetched, written and registered before the next one
//      starts, so the session needs no locks and counters never race
//    - The whole run is still async: the shell can keep working while it
//      waits (see main.rs, which spawns the run on its own task)
//
// 2. Why does stylesheet.rs return a BoxFuture?
//    - An async fn that awaits itself would have an infinitely sized future
//    - Boxing the recursive call gives the future a fixed size
// -----------------------------------------------------------------------------
