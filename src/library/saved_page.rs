// src/library/saved_page.rs
// =============================================================================
// One archive folder on disk, as the shell shows it in its library:
// a title, the page to open, and the icon (when one was saved).
// =============================================================================

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

use crate::archive::{FAVICON_FILE, INDEX_FILE};
use crate::links::decode_entities;

/// Title shown for pages without a usable `<title>`.
pub const UNTITLED: &str = "Untitled";

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("no index.html in {path}")]
    MissingIndex { path: PathBuf },

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedPage {
    pub title: String,
    pub html_path: PathBuf,
    pub icon_path: Option<PathBuf>,
}

impl SavedPage {
    /// Reads the archive folder `dir`.
    pub fn open(dir: &Path) -> Result<Self, LibraryError> {
        if !dir.is_dir() {
            return Err(LibraryError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }

        let html_path = dir.join(INDEX_FILE);
        if !html_path.is_file() {
            return Err(LibraryError::MissingIndex {
                path: dir.to_path_buf(),
            });
        }

        let bytes = fs::read(&html_path).map_err(|source| LibraryError::Io {
            path: html_path.clone(),
            source,
        })?;
        let title = page_title(&String::from_utf8_lossy(&bytes));

        let icon_path = Some(dir.join(FAVICON_FILE)).filter(|path| path.is_file());

        Ok(SavedPage {
            title,
            html_path,
            icon_path,
        })
    }
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<title(?:\s[^>]*)?>([^<]*)</title\s*>").expect("title pattern is valid")
    })
}

// Text of the first <title>, or UNTITLED
fn page_title(html: &str) -> String {
    let title = title_pattern()
        .captures(html)
        .map(|caps| decode_entities(caps[1].trim()))
        .unwrap_or_default();

    if title.trim().is_empty() {
        UNTITLED.to_string()
    } else {
        title.trim().to_string()
    }
}

/// Every archive folder directly under `root`, sorted by folder name.
///
/// Sub-folders without an index.html are not archives and are left out;
/// entries that can't be read are skipped with a warning.
pub fn list_saved_pages(root: &Path) -> Result<Vec<SavedPage>, LibraryError> {
    let entries = fs::read_dir(root).map_err(|source| LibraryError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        match entry {
            Ok(entry) if entry.path().is_dir() => dirs.push(entry.path()),
            Ok(_) => {}
            Err(error) => warn!(root = %root.display(), %error, "skipping unreadable entry"),
        }
    }
    dirs.sort();

    let mut pages = Vec::new();
    for dir in dirs {
        match SavedPage::open(&dir) {
            Ok(page) => pages.push(page),
            Err(LibraryError::MissingIndex { .. }) => {}
            Err(error) => warn!(dir = %dir.display(), %error, "skipping saved page"),
        }
    }
    Ok(pages)
}
