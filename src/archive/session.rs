// src/archive/session.rs
// =============================================================================
// The state of ONE archive run.
//
// A session holds:
// - the dedup registry: absolute URL -> where we saved it
// - one counter per resource category, used to name files (images/0.png,
//   images/1.jpg ...)
// - the recovered failures, for the final report
//
// A fresh session is created for every run and dropped at the end of it, so
// two runs never see each other's registry or counters. Everything here is
// plain owned data with no locking: a run is a single sequential worker.
// =============================================================================

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::layout;

/// What kind of resource a file is. Decides its folder and its counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Favicon,
    Image,
    Stylesheet,
    StylesheetResource,
    Script,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Favicon,
        Category::Image,
        Category::Stylesheet,
        Category::StylesheetResource,
        Category::Script,
    ];

    /// Folder (relative to the archive root) that files of this category go in.
    /// The favicon lives at the root under a fixed name.
    pub fn directory(self) -> Option<&'static str> {
        match self {
            Category::Favicon => None,
            Category::Image => Some(layout::IMAGES_DIR),
            Category::Stylesheet => Some(layout::CSS_DIR),
            Category::StylesheetResource => Some(layout::CSS_RESOURCES_DIR),
            Category::Script => Some(layout::JS_DIR),
        }
    }
}

/// One downloaded and saved resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRecord {
    /// The reference as first written where it was found (maybe relative)
    pub reference: String,
    /// The absolute URL it was fetched from
    pub url: String,
    /// Saved location, relative to the archive root ("images/0.png")
    pub path: String,
    pub category: Category,
    /// Sequence number within the category
    pub id: u32,
    /// Every spelling of this resource found in the page's HTML. These are the
    /// strings rewritten to `path` in the saved page.
    pub document_references: Vec<String>,
}

impl ResourceRecord {
    /// How a stylesheet saved in `css/` refers to this file.
    pub fn href_from_stylesheet(&self) -> String {
        match self.category {
            Category::Stylesheet => self
                .path
                .strip_prefix(&format!("{}/", layout::CSS_DIR))
                .unwrap_or(self.path.as_str())
                .to_string(),
            _ => format!("../{}", self.path),
        }
    }
}

/// A resource that could not be fetched; its reference stays remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedResource {
    pub url: String,
    pub category: Category,
    pub reason: String,
}

#[derive(Debug)]
pub struct DownloadSession {
    base_url: String,
    root: PathBuf,
    registry: HashMap<String, ResourceRecord>,
    // Registry keys in registration order, for a stable report
    order: Vec<String>,
    counters: HashMap<Category, u32>,
    // Stylesheets currently being walked (to cut @import cycles)
    in_progress: HashSet<String>,
    failures: Vec<FailedResource>,
    html: String,
}

impl DownloadSession {
    pub fn new(base_url: impl Into<String>, root: impl Into<PathBuf>, html: impl Into<String>) -> Self {
        DownloadSession {
            base_url: base_url.into(),
            root: root.into(),
            registry: HashMap::new(),
            order: Vec::new(),
            counters: HashMap::new(),
            in_progress: HashSet::new(),
            failures: Vec::new(),
            html: html.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Archive root folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The working copy of the page HTML.
    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn set_html(&mut self, html: String) {
        self.html = html;
    }

    pub fn record(&self, url: &str) -> Option<&ResourceRecord> {
        self.registry.get(url)
    }

    // Records in the order they were registered
    fn records(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.order.iter().filter_map(|url| self.registry.get(url))
    }

    /// Whether fetching `url` already failed in this session.
    pub fn has_failed(&self, url: &str) -> bool {
        self.failures.iter().any(|failure| failure.url == url)
    }

    /// The id the next registration in `category` will get.
    pub fn next_id(&self, category: Category) -> u32 {
        self.counters.get(&category).copied().unwrap_or(0)
    }

    /// Where the next file of `category` goes, relative to the archive root.
    pub fn next_path(&self, category: Category, extension: &str) -> String {
        let file_name = format!("{}{}", self.next_id(category), extension);
        match category.directory() {
            Some(dir) => format!("{dir}/{file_name}"),
            None => file_name,
        }
    }

    /// Registers a saved resource and advances its category's counter.
    ///
    /// Registering a URL twice is a no-op returning the first record: the
    /// counter only moves for new URLs.
    pub fn register(
        &mut self,
        reference: impl Into<String>,
        url: impl Into<String>,
        path: impl Into<String>,
        category: Category,
    ) -> &ResourceRecord {
        let url = url.into();
        if !self.registry.contains_key(&url) {
            let counter = self.counters.entry(category).or_insert(0);
            let id = *counter;
            *counter += 1;

            let record = ResourceRecord {
                reference: reference.into(),
                url: url.clone(),
                path: path.into(),
                category,
                id,
                document_references: Vec::new(),
            };
            self.order.push(url.clone());
            self.registry.insert(url.clone(), record);
        }

        &self.registry[&url]
    }

    /// Notes that `reference` in the page HTML points at the resource
    /// registered for `url`.
    pub fn add_document_reference(&mut self, url: &str, reference: &str) {
        if reference.is_empty() {
            return;
        }
        if let Some(record) = self.registry.get_mut(url) {
            if !record.document_references.iter().any(|r| r == reference) {
                record.document_references.push(reference.to_string());
            }
        }
    }

    pub fn record_failure(&mut self, url: impl Into<String>, category: Category, reason: impl Into<String>) {
        self.failures.push(FailedResource {
            url: url.into(),
            category,
            reason: reason.into(),
        });
    }

    /// Marks a stylesheet as being walked. Returns false if it already was.
    pub fn begin(&mut self, url: &str) -> bool {
        self.in_progress.insert(url.to_string())
    }

    pub fn finish(&mut self, url: &str) {
        self.in_progress.remove(url);
    }

    pub fn is_in_progress(&self, url: &str) -> bool {
        self.in_progress.contains(url)
    }

    /// Reference -> local path pairs to apply to the page HTML.
    pub fn document_replacements(&self) -> HashMap<String, String> {
        self.records()
            .flat_map(|record| {
                record
                    .document_references
                    .iter()
                    .map(move |reference| (reference.clone(), record.path.clone()))
            })
            .collect()
    }

    /// Consumes the session, keeping what the report needs.
    pub fn into_parts(self) -> (Vec<ResourceRecord>, Vec<FailedResource>) {
        let DownloadSession {
            mut registry,
            order,
            failures,
            ..
        } = self;
        let records = order
            .iter()
            .filter_map(|url| registry.remove(url))
            .collect();
        (records, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DownloadSession {
        DownloadSession::new("https://a.com/", "/tmp/archive", "<html></html>")
    }

    #[test]
    fn test_counters_are_per_category() {
        let mut s = session();
        assert_eq!(s.next_path(Category::Image, ".png"), "images/0.png");
        s.register("a.png", "https://a.com/a.png", "images/0.png", Category::Image);
        s.register("b.js", "https://a.com/b.js", "js/0.js", Category::Script);

        assert_eq!(s.next_id(Category::Image), 1);
        assert_eq!(s.next_id(Category::Script), 1);
        assert_eq!(s.next_id(Category::Stylesheet), 0);
        assert_eq!(s.next_path(Category::StylesheetResource, ""), "css_resources/0");
        assert_eq!(s.next_path(Category::Favicon, ".ico"), "0.ico");
    }

    #[test]
    fn test_duplicate_registration_keeps_first_record() {
        let mut s = session();
        s.register("a.png", "https://a.com/a.png", "images/0.png", Category::Image);
        let again = s.register("./a.png", "https://a.com/a.png", "images/1.png", Category::Image);
        assert_eq!(again.path, "images/0.png");
        assert_eq!(s.next_id(Category::Image), 1);
        assert_eq!(s.records().count(), 1);
    }

    #[test]
    fn test_document_references_feed_replacements() {
        let mut s = session();
        s.register("a.png", "https://a.com/a.png", "images/0.png", Category::Image);
        s.add_document_reference("https://a.com/a.png", "a.png");
        s.add_document_reference("https://a.com/a.png", "/a.png");
        s.add_document_reference("https://a.com/a.png", "a.png");
        s.register("x.png", "https://a.com/css/x.png", "css_resources/0.png", Category::StylesheetResource);

        let replacements = s.document_replacements();
        assert_eq!(replacements.len(), 2);
        assert_eq!(replacements["/a.png"], "images/0.png");
        assert!(!replacements.contains_key("x.png"));
    }

    #[test]
    fn test_href_from_stylesheet() {
        let mut s = session();
        let css = s
            .register("b.css", "https://a.com/b.css", "css/3.css", Category::Stylesheet)
            .href_from_stylesheet();
        assert_eq!(css, "3.css");
        let image = s
            .register("a.png", "https://a.com/a.png", "images/0.png", Category::Image)
            .href_from_stylesheet();
        assert_eq!(image, "../images/0.png");
    }

    #[test]
    fn test_in_progress_tracking() {
        let mut s = session();
        assert!(s.begin("https://a.com/a.css"));
        assert!(!s.begin("https://a.com/a.css"));
        assert!(s.is_in_progress("https://a.com/a.css"));
        s.finish("https://a.com/a.css");
        assert!(!s.is_in_progress("https://a.com/a.css"));
    }

    #[test]
    fn test_into_parts_keeps_order() {
        let mut s = session();
        s.register("b", "https://a.com/b", "images/0", Category::Image);
        s.register("a", "https://a.com/a", "images/1", Category::Image);
        s.record_failure("https://a.com/c", Category::Image, "HTTP 404");
        let (records, failures) = s.into_parts();
        assert_eq!(records[0].reference, "b");
        assert_eq!(records[1].reference, "a");
        assert_eq!(failures.len(), 1);
    }
}
