// src/archive/layout.rs
// =============================================================================
// The on-disk shape of an archive:
//
//   <name>[<n>]/
//     index.html
//     favicon.ico
//     images/<id><ext>
//     js/<id><ext>
//     css/<id>.css
//     css_resources/<id><ext>
//
// The folder is created (with all its sub-folders) before anything is
// fetched, so a bad destination fails the run before any network traffic.
// =============================================================================

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ArchiveError;

pub const INDEX_FILE: &str = "index.html";
pub const FAVICON_FILE: &str = "favicon.ico";
pub const IMAGES_DIR: &str = "images";
pub const JS_DIR: &str = "js";
pub const CSS_DIR: &str = "css";
pub const CSS_RESOURCES_DIR: &str = "css_resources";

const SUB_DIRS: [&str; 4] = [CSS_DIR, JS_DIR, IMAGES_DIR, CSS_RESOURCES_DIR];

/// Makes a display name safe to use as a folder name.
///
/// Path separators, control characters and characters Windows rejects become
/// '_'; surrounding spaces and dots are trimmed. Falls back to `fallback` when
/// nothing usable is left.
pub fn sanitize_name(name: &str, fallback: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Picks a folder under `root` for `name` that doesn't exist yet.
///
/// `name` itself if it's free; otherwise `name` followed by the next number
/// after the highest one already used by a sibling ("Site", "Site1", "Site2").
pub fn choose_output_dir(root: &Path, name: &str) -> io::Result<PathBuf> {
    let candidate = root.join(name);
    if !candidate.exists() {
        return Ok(candidate);
    }

    let mut highest = 0u32;
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(suffix) = file_name.strip_prefix(name) else {
            continue;
        };
        if let Ok(n) = suffix.parse::<u32>() {
            highest = highest.max(n);
        }
    }

    let mut next = highest.saturating_add(1);
    loop {
        let candidate = root.join(format!("{name}{next}"));
        if !candidate.exists() {
            return Ok(candidate);
        }
        next = next.saturating_add(1);
    }
}

/// Checks the destination and creates the archive folder tree.
pub fn prepare_output_dir(root: &Path, name: &str) -> Result<PathBuf, ArchiveError> {
    if !root.is_dir() {
        return Err(ArchiveError::DestinationMissing {
            path: root.to_path_buf(),
        });
    }

    let output_dir =
        choose_output_dir(root, name).map_err(|e| ArchiveError::filesystem(root, e))?;
    create_tree(&output_dir, &SUB_DIRS)?;
    Ok(output_dir)
}

// Creates `output_dir` and its sub-folders. On failure nothing is left behind.
fn create_tree(output_dir: &Path, sub_dirs: &[&str]) -> Result<(), ArchiveError> {
    fs::create_dir(output_dir).map_err(|e| ArchiveError::filesystem(output_dir, e))?;

    for dir in sub_dirs {
        let path = output_dir.join(dir);
        if let Err(e) = fs::create_dir(&path) {
            if let Err(cleanup) = fs::remove_dir_all(output_dir) {
                warn!(
                    output_dir = %output_dir.display(),
                    error = %cleanup,
                    "could not remove partial archive folder"
                );
            }
            return Err(ArchiveError::filesystem(&path, e));
        }
    }

    Ok(())
}

/// Writes a file given by its '/'-separated path relative to the archive root.
pub fn write_file(root: &Path, relative: &str, bytes: &[u8]) -> Result<PathBuf, ArchiveError> {
    let path = relative
        .split('/')
        .fold(root.to_path_buf(), |path, part| path.join(part));
    fs::write(&path, bytes).map_err(|e| ArchiveError::filesystem(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Rust: A/B Testing?", "x"), "Rust_ A_B Testing_");
        assert_eq!(sanitize_name("  ..hidden.. ", "x"), "hidden");
        assert_eq!(sanitize_name(" / ", "fallback"), "_");
        assert_eq!(sanitize_name("   ", "fallback"), "fallback");
    }

    #[test]
    fn test_free_name_is_used_as_is() {
        let root = TempDir::new().unwrap();
        let dir = choose_output_dir(root.path(), "Site").unwrap();
        assert_eq!(dir, root.path().join("Site"));
    }

    #[test]
    fn test_taken_name_gets_next_free_suffix() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("Site")).unwrap();
        assert_eq!(
            choose_output_dir(root.path(), "Site").unwrap(),
            root.path().join("Site1")
        );

        fs::create_dir(root.path().join("Site4")).unwrap();
        fs::create_dir(root.path().join("Site Other")).unwrap();
        assert_eq!(
            choose_output_dir(root.path(), "Site").unwrap(),
            root.path().join("Site5")
        );
    }

    #[test]
    fn test_prepare_creates_tree() {
        let root = TempDir::new().unwrap();
        let dir = prepare_output_dir(root.path(), "Page").unwrap();
        for sub in SUB_DIRS {
            assert!(dir.join(sub).is_dir());
        }
    }

    #[test]
    fn test_failed_sub_folder_removes_output_dir() {
        let root = TempDir::new().unwrap();
        let output_dir = root.path().join("Page");

        // The second sub-folder has no parent, so creating it fails
        let result = create_tree(&output_dir, &[CSS_DIR, "missing/parent"]);

        assert!(matches!(result, Err(ArchiveError::Filesystem { .. })));
        assert!(!output_dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_rejects_missing_root() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope");
        assert!(matches!(
            prepare_output_dir(&missing, "Page"),
            Err(ArchiveError::DestinationMissing { .. })
        ));
    }

    #[test]
    fn test_write_file_nested() {
        let root = TempDir::new().unwrap();
        let dir = prepare_output_dir(root.path(), "Page").unwrap();
        let path = write_file(&dir, "images/0.png", b"png").unwrap();
        assert_eq!(path, dir.join("images").join("0.png"));
        assert_eq!(fs::read(path).unwrap(), b"png");
    }
}
