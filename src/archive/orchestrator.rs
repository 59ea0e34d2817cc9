// src/archive/orchestrator.rs
// =============================================================================
// Runs one archive from start to finish.
//
// Order of work:
// 1. Validate the page URL, create the output folder (no network yet)
// 2. Signal "started"
// 3. Fetch and parse the page. A page that doesn't parse stops everything.
// 4. Download phases, strictly one after another:
//      favicon -> images -> stylesheets (and what they reference) -> scripts
// 5. Rewrite references in the page to the local copies, drop srcset
// 6. Save index.html, signal "finished"
//
// Resources are fetched one at a time and every one of them goes through the
// session: a URL that's already saved is never fetched again, and a URL that
// failed is not retried. A failed resource only means its reference stays
// remote; the archive still completes.
// =============================================================================

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::fetch::{Fetch, HttpFetcher};
use super::layout::{self, prepare_output_dir, sanitize_name, write_file};
use super::lifecycle::{ArchiveObserver, ArchiveTarget};
use super::rewrite::{remove_srcset, rewrite_references};
use super::session::{Category, DownloadSession, FailedResource, ResourceRecord};
use super::stylesheet::import_stylesheet;
use crate::config::ArchiveConfig;
use crate::css::scan_stylesheet;
use crate::error::ArchiveError;
use crate::links::{extension_for, is_fetchable, origin, resolve};
use crate::markup::{Document, Element, ParseError};

/// What to archive and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRequest {
    /// Absolute http(s) URL of the page
    pub url: String,
    /// Existing folder the archive folder is created in
    pub destination: PathBuf,
    /// Display name used as the archive folder name
    pub name: Option<String>,
}

impl ArchiveRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        ArchiveRequest {
            url: url.into(),
            destination: destination.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Outcome of a run that saved its page.
///
/// A report with failures is still a successful archive: the failed
/// resources simply point at their remote URLs.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub url: String,
    pub output_dir: PathBuf,
    pub index_path: PathBuf,
    /// Every saved resource, in the order it was saved
    pub resources: Vec<ResourceRecord>,
    /// Every resource that could not be fetched
    pub failures: Vec<FailedResource>,
}

impl ArchiveReport {
    /// True when every discovered resource was localized.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn count(&self, category: Category) -> usize {
        self.resources
            .iter()
            .filter(|record| record.category == category)
            .count()
    }

    pub fn resource(&self, url: &str) -> Option<&ResourceRecord> {
        self.resources.iter().find(|record| record.url == url)
    }
}

/// Archives pages. Holds the fetcher and settings; every call to `archive`
/// gets its own session, so one `Archiver` can be reused for many pages.
#[derive(Debug)]
pub struct Archiver<F = HttpFetcher> {
    fetcher: F,
    config: ArchiveConfig,
}

impl Archiver<HttpFetcher> {
    /// An archiver talking HTTP with a client built from `config`.
    pub fn new(config: ArchiveConfig) -> Result<Self, reqwest::Error> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Archiver { fetcher, config })
    }
}

impl<F: Fetch> Archiver<F> {
    pub fn with_fetcher(fetcher: F, config: ArchiveConfig) -> Self {
        Archiver { fetcher, config }
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Archives one page.
    ///
    /// Returns `Err` only for fatal faults (bad URL, bad destination, page
    /// unreachable or malformed, filesystem errors). If the output folder was
    /// already created when a fault happens, it is removed again.
    #[instrument(skip_all, fields(url = %request.url))]
    pub async fn archive(
        &self,
        request: &ArchiveRequest,
        observer: &dyn ArchiveObserver,
    ) -> Result<ArchiveReport, ArchiveError> {
        let url = page_url(&request.url)?;
        let name = sanitize_name(
            request.name.as_deref().unwrap_or(&self.config.default_name),
            &self.config.default_name,
        );
        let output_dir = prepare_output_dir(&request.destination, &name)?;
        info!(output_dir = %output_dir.display(), "archive started");

        observer.started(&ArchiveTarget {
            url: url.clone(),
            output_dir: output_dir.clone(),
        });

        match self.run(&url, &output_dir).await {
            Ok(report) => {
                info!(
                    resources = report.resources.len(),
                    failures = report.failures.len(),
                    "archive saved"
                );
                observer.finished(&report);
                Ok(report)
            }
            Err(error) => {
                if let Err(cleanup) = fs::remove_dir_all(&output_dir) {
                    warn!(
                        output_dir = %output_dir.display(),
                        error = %cleanup,
                        "could not remove incomplete archive"
                    );
                }
                Err(error)
            }
        }
    }

    async fn run(&self, url: &str, output_dir: &Path) -> Result<ArchiveReport, ArchiveError> {
        let fetcher: &dyn Fetch = &self.fetcher;

        let page = fetcher
            .fetch(url)
            .await
            .map_err(|source| ArchiveError::PageFetch {
                url: url.to_string(),
                source,
            })?;
        let document = Document::from_bytes(url, &page.bytes, page.content_type.as_deref())?;
        let elements = document.validate()?;
        debug!(elements, encoding = document.encoding().name(), "page parsed");

        let mut session = DownloadSession::new(url, output_dir, document.markup());

        if self.config.fetch_favicon {
            save_favicon(fetcher, &mut session, &document).await?;
        }
        save_images(fetcher, &mut session, &document).await?;
        save_stylesheets(fetcher, &mut session, &document).await?;
        save_scripts(fetcher, &mut session, &document).await?;

        let html = rewrite_references(session.html(), &session.document_replacements());
        session.set_html(remove_srcset(&html));

        let (bytes, _, _) = document.encoding().encode(session.html());
        let index_path = write_file(output_dir, layout::INDEX_FILE, &bytes)?;

        let (resources, failures) = session.into_parts();
        Ok(ArchiveReport {
            url: url.to_string(),
            output_dir: output_dir.to_path_buf(),
            index_path,
            resources,
            failures,
        })
    }
}

// The page URL must be absolute http(s). Returned in normalized form.
fn page_url(raw: &str) -> Result<String, ArchiveError> {
    let invalid = |reason: String| ArchiveError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed.to_string()),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

/// Downloads `url` into the archive unless the session already has it.
///
/// Returns the record of the saved file, or `None` when the fetch failed.
/// A failure is logged and recorded; it never registers anything or moves
/// a counter.
pub(crate) async fn download_resource(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    reference: &str,
    url: &str,
    category: Category,
) -> Result<Option<ResourceRecord>, ArchiveError> {
    if let Some(record) = session.record(url) {
        debug!(url, path = %record.path, "already saved");
        return Ok(Some(record.clone()));
    }
    if session.has_failed(url) {
        return Ok(None);
    }

    let fetched = match fetcher.fetch(url).await {
        Ok(fetched) => fetched,
        Err(error) => {
            warn!(url, reason = %error, "resource not saved");
            session.record_failure(url, category, error.to_string());
            return Ok(None);
        }
    };

    let path = match category {
        Category::Favicon => layout::FAVICON_FILE.to_string(),
        _ => {
            let extension = extension_for(fetched.content_type.as_deref(), reference);
            session.next_path(category, &extension)
        }
    };
    write_file(session.root(), &path, &fetched.bytes)?;

    let record = session.register(reference, url, path, category).clone();
    debug!(url, path = %record.path, "saved");
    Ok(Some(record))
}

// A reference found in the page: resolve, download once, and remember the
// page's spelling so the final rewrite localizes it.
async fn localize(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    reference: &str,
    category: Category,
) -> Result<(), ArchiveError> {
    let url = resolve(session.base_url(), reference);
    if !is_fetchable(&url) {
        debug!(reference, "not an http(s) reference, left as is");
        return Ok(());
    }

    if download_resource(fetcher, session, reference, &url, category)
        .await?
        .is_some()
    {
        session.add_document_reference(&url, reference);
    }
    Ok(())
}

// Same as `localize`, for a stylesheet referenced by the page.
async fn localize_stylesheet(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    reference: &str,
) -> Result<(), ArchiveError> {
    let url = resolve(session.base_url(), reference);
    if !is_fetchable(&url) {
        return Ok(());
    }

    if import_stylesheet(fetcher, session, reference, &url)
        .await?
        .is_some()
    {
        session.add_document_reference(&url, reference);
    }
    Ok(())
}

async fn save_favicon(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    document: &Document,
) -> Result<(), ArchiveError> {
    let declared = attribute_values(document, "href", |e| is_link_with_rel(e, "icon"))?
        .into_iter()
        .next();

    match declared {
        Some(reference) => localize(fetcher, session, &reference, Category::Favicon).await,
        None => {
            let url = format!("{}/favicon.ico", origin(session.base_url()));
            download_resource(fetcher, session, "/favicon.ico", &url, Category::Favicon).await?;
            Ok(())
        }
    }
}

async fn save_images(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    document: &Document,
) -> Result<(), ArchiveError> {
    let sources = attribute_values(document, "src", |e| e.tag() == "img")?;
    info!(count = sources.len(), "images");

    for reference in &sources {
        localize(fetcher, session, reference, Category::Image).await?;
    }
    Ok(())
}

async fn save_stylesheets(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    document: &Document,
) -> Result<(), ArchiveError> {
    let links = attribute_values(document, "href", |e| is_link_with_rel(e, "stylesheet"))?;
    let mut inline = Vec::new();
    for element in document.elements_by_tag("style") {
        inline.push(element?.content().to_string());
    }
    info!(linked = links.len(), inline = inline.len(), "stylesheets");

    for reference in &links {
        localize_stylesheet(fetcher, session, reference).await?;
    }

    // References in <style> bodies are relative to the page and get
    // rewritten in the page itself
    for css in &inline {
        let refs = scan_stylesheet(css);
        for reference in &refs.resources {
            localize(fetcher, session, reference, Category::StylesheetResource).await?;
        }
        for reference in &refs.imports {
            localize_stylesheet(fetcher, session, reference).await?;
        }
    }
    Ok(())
}

async fn save_scripts(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    document: &Document,
) -> Result<(), ArchiveError> {
    let sources = attribute_values(document, "src", |e| e.tag() == "script")?;
    info!(count = sources.len(), "scripts");

    for reference in &sources {
        localize(fetcher, session, reference, Category::Script).await?;
    }
    Ok(())
}

// Non-blank values of `attribute` on the elements `predicate` accepts, in
// document order.
fn attribute_values<P>(
    document: &Document,
    attribute: &str,
    predicate: P,
) -> Result<Vec<String>, ParseError>
where
    P: Fn(&Element<'_>) -> bool,
{
    let mut values = Vec::new();
    for element in document.elements() {
        let element = element?;
        if !predicate(&element) {
            continue;
        }
        if let Some(value) = element.attr(attribute) {
            if !value.trim().is_empty() {
                values.push(value.to_string());
            }
        }
    }
    Ok(values)
}

// <link rel="..."> whose space-separated rel list holds `token`
fn is_link_with_rel(element: &Element<'_>, token: &str) -> bool {
    element.tag() == "link"
        && element.attr("rel").is_some_and(|rel| {
            rel.split_ascii_whitespace()
                .any(|t| t.eq_ignore_ascii_case(token))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{FetchError, Fetched, NoopObserver};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // An in-memory web: known URLs answer, anything else is a 404
    #[derive(Default)]
    struct FakeWeb {
        pages: HashMap<String, Fetched>,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl FakeWeb {
        fn serve(mut self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
            self.pages.insert(
                url.to_string(),
                Fetched {
                    bytes: body.into(),
                    content_type: Some(content_type.to_string()),
                },
            );
            self
        }

        fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Fetch for FakeWeb {
        async fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
            *self.hits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    const PAGE: &str = "https://site.test/";

    fn no_favicon() -> ArchiveConfig {
        ArchiveConfig {
            fetch_favicon: false,
            ..ArchiveConfig::default()
        }
    }

    async fn archive(
        web: FakeWeb,
        config: ArchiveConfig,
    ) -> (Archiver<FakeWeb>, TempDir, Result<ArchiveReport, ArchiveError>) {
        let dest = TempDir::new().unwrap();
        let archiver = Archiver::with_fetcher(web, config);
        let request = ArchiveRequest::new(PAGE, dest.path()).with_name("Site");
        let result = archiver.archive(&request, &NoopObserver).await;
        (archiver, dest, result)
    }

    fn read_index(report: &ArchiveReport) -> String {
        fs::read_to_string(&report.index_path).unwrap()
    }

    #[tokio::test]
    async fn test_same_image_twice_is_fetched_once() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><body><img src="a.png"><img src="/a.png"><img src="a.png"></body></html>"#,
            )
            .serve("https://site.test/a.png", "image/png", "png");

        let (archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();

        assert_eq!(archiver.fetcher().hits("https://site.test/a.png"), 1);
        assert_eq!(report.count(Category::Image), 1);
        assert!(report.is_complete());

        let index = read_index(&report);
        assert_eq!(index.matches(r#"src="images/0.png""#).count(), 3);
        assert_eq!(
            fs::read_dir(report.output_dir.join("images")).unwrap().count(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_image_stays_remote_and_keeps_counter() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><body><img src="missing.png"><img src="ok.png"><img src="missing.png"></body></html>"#,
            )
            .serve("https://site.test/ok.png", "image/png", "png");

        let (archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category, Category::Image);
        assert_eq!(archiver.fetcher().hits("https://site.test/missing.png"), 1);
        assert_eq!(report.resource("https://site.test/ok.png").unwrap().path, "images/0.png");

        let index = read_index(&report);
        assert!(index.contains(r#"<img src="missing.png">"#));
        assert!(index.contains(r#"<img src="images/0.png">"#));
    }

    #[tokio::test]
    async fn test_import_chain_shares_image() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><head><link rel="stylesheet" href="css/main.css"></head><body><img src="img/shared.png"></body></html>"#,
            )
            .serve(
                "https://site.test/css/main.css",
                "text/css",
                r#"@import url("parts/extra.css"); body { background: url(../img/bg.png); }"#,
            )
            .serve(
                "https://site.test/css/parts/extra.css",
                "text/css",
                ".x { background: url('../../img/shared.png'); }",
            )
            .serve("https://site.test/img/shared.png", "image/png", "shared")
            .serve("https://site.test/img/bg.png", "image/png", "bg");

        let (archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();
        assert!(report.is_complete());
        assert_eq!(archiver.fetcher().hits("https://site.test/img/shared.png"), 1);

        // The import is saved (and numbered) before the stylesheet importing it
        let extra = report.resource("https://site.test/css/parts/extra.css").unwrap();
        let main = report.resource("https://site.test/css/main.css").unwrap();
        assert_eq!(extra.path, "css/0.css");
        assert_eq!(main.path, "css/1.css");

        let main_css = fs::read_to_string(report.output_dir.join("css/1.css")).unwrap();
        assert_eq!(
            main_css,
            r#"@import url("0.css"); body { background: url(../css_resources/0.png); }"#
        );
        let extra_css = fs::read_to_string(report.output_dir.join("css/0.css")).unwrap();
        assert_eq!(extra_css, ".x { background: url('../images/0.png'); }");

        let index = read_index(&report);
        assert!(index.contains(r#"href="css/1.css""#));
        assert!(index.contains(r#"src="images/0.png""#));
    }

    #[tokio::test]
    async fn test_import_cycle_is_cut() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><head><link rel="stylesheet" href="a.css"></head></html>"#,
            )
            .serve("https://site.test/a.css", "text/css", r#"@import "b.css";"#)
            .serve("https://site.test/b.css", "text/css", r#"@import "a.css";"#);

        let (archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();

        assert_eq!(archiver.fetcher().hits("https://site.test/a.css"), 1);
        assert_eq!(archiver.fetcher().hits("https://site.test/b.css"), 1);
        let b = fs::read_to_string(report.output_dir.join("css/0.css")).unwrap();
        assert_eq!(b, r#"@import "a.css";"#);
        let a = fs::read_to_string(report.output_dir.join("css/1.css")).unwrap();
        assert_eq!(a, r#"@import "0.css";"#);
    }

    #[tokio::test]
    async fn test_inline_style_references_are_rewritten_in_page() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><head><style>body { background: url("bg.gif"); }</style></head></html>"#,
            )
            .serve("https://site.test/bg.gif", "image/gif", "gif");

        let (_archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();
        let index = read_index(&report);
        assert!(index.contains(r#"url("css_resources/0.gif")"#));
    }

    #[tokio::test]
    async fn test_scripts_and_srcset() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><body><img src="a.png" srcset="a@2x.png 2x"><script src="app.js"></script></body></html>"#,
            )
            .serve("https://site.test/a.png", "image/png", "png")
            .serve("https://site.test/app.js", "application/javascript", "run()");

        let (archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();
        let index = read_index(&report);

        assert!(!index.contains("srcset"));
        assert!(index.contains(r#"<script src="js/0.js"></script>"#));
        assert_eq!(archiver.fetcher().hits("https://site.test/a@2x.png"), 0);
    }

    #[tokio::test]
    async fn test_declared_favicon_is_localized() {
        let web = FakeWeb::default()
            .serve(
                PAGE,
                "text/html",
                r#"<html><head><link rel="shortcut icon" href="static/icon.png"></head></html>"#,
            )
            .serve("https://site.test/static/icon.png", "image/png", "icon");

        let (archiver, _dest, result) = archive(web, ArchiveConfig::default()).await;
        let report = result.unwrap();

        assert_eq!(archiver.fetcher().hits("https://site.test/favicon.ico"), 0);
        assert!(report.output_dir.join("favicon.ico").is_file());
        assert!(read_index(&report).contains(r#"href="favicon.ico""#));
    }

    #[tokio::test]
    async fn test_missing_default_favicon_is_recovered() {
        let web = FakeWeb::default().serve(PAGE, "text/html", "<html></html>");

        let (archiver, _dest, result) = archive(web, ArchiveConfig::default()).await;
        let report = result.unwrap();

        assert_eq!(archiver.fetcher().hits("https://site.test/favicon.ico"), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].category, Category::Favicon);
        assert!(report.index_path.is_file());
    }

    #[tokio::test]
    async fn test_parse_fault_is_fatal_and_cleans_up() {
        let web = FakeWeb::default().serve(
            PAGE,
            "text/html",
            "<html><body></div><img src=\"a.png\"></body></html>",
        );

        let (archiver, dest, result) = archive(web, no_favicon()).await;
        assert!(matches!(
            result,
            Err(ArchiveError::Parse(ParseError::UnmatchedClose { .. }))
        ));
        assert_eq!(archiver.fetcher().hits("https://site.test/a.png"), 0);
        assert!(!dest.path().join("Site").exists());
    }

    #[tokio::test]
    async fn test_unreachable_page_is_fatal() {
        let (_archiver, dest, result) = archive(FakeWeb::default(), no_favicon()).await;
        assert!(matches!(result, Err(ArchiveError::PageFetch { .. })));
        assert!(!dest.path().join("Site").exists());
    }

    #[tokio::test]
    async fn test_invalid_url_touches_nothing() {
        let dest = TempDir::new().unwrap();
        let archiver = Archiver::with_fetcher(FakeWeb::default(), no_favicon());

        for url in ["not a url", "ftp://site.test/"] {
            let request = ArchiveRequest::new(url, dest.path());
            let result = archiver.archive(&request, &NoopObserver).await;
            assert!(matches!(result, Err(ArchiveError::InvalidUrl { .. })));
        }
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_page_is_saved_in_its_own_encoding() {
        let web = FakeWeb::default().serve(
            PAGE,
            "text/html; charset=windows-1252",
            b"<html><body>caf\xe9</body></html>".to_vec(),
        );

        let (_archiver, _dest, result) = archive(web, no_favicon()).await;
        let report = result.unwrap();
        assert_eq!(
            fs::read(&report.index_path).unwrap(),
            b"<html><body>caf\xe9</body></html>"
        );
    }

    #[tokio::test]
    async fn test_lifecycle_signals() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<String>>);

        impl ArchiveObserver for Recorder {
            fn started(&self, target: &ArchiveTarget) {
                self.0.lock().unwrap().push(format!("started {}", target.url));
            }
            fn finished(&self, report: &ArchiveReport) {
                self.0.lock().unwrap().push(format!("finished {}", report.url));
            }
        }

        let dest = TempDir::new().unwrap();
        let web = FakeWeb::default().serve(PAGE, "text/html", "<html></html>");
        let archiver = Archiver::with_fetcher(web, no_favicon());
        let recorder = Recorder::default();

        archiver
            .archive(&ArchiveRequest::new(PAGE, dest.path()), &recorder)
            .await
            .unwrap();
        archiver
            .archive(&ArchiveRequest::new("https://gone.test/", dest.path()), &recorder)
            .await
            .unwrap_err();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                "started https://site.test/".to_string(),
                "finished https://site.test/".to_string(),
                "started https://gone.test/".to_string(),
            ]
        );
    }
}
