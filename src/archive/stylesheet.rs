// src/archive/stylesheet.rs
// =============================================================================
// Saving one stylesheet together with everything it pulls in.
//
// For a stylesheet fetched from URL U:
// - every url(...) resource is resolved against U, fetched once per session
//   and saved under css_resources/
// - every @import is resolved against U, fetched, and walked the same way
//   (recursively), then saved under css/
// - the stylesheet text is rewritten to point at the local copies (paths
//   relative to css/) and saved as css/<id>.css
//
// The walk is recursive through @import, so it returns a boxed future: an
// `async fn` cannot call itself directly.
//
// Cycles (a.css imports b.css imports a.css) are cut with the session's
// in-progress set: an import of a stylesheet that is still being walked is
// left pointing at its remote URL.
// =============================================================================

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::fetch::Fetch;
use super::layout::write_file;
use super::orchestrator::download_resource;
use super::session::{Category, DownloadSession, ResourceRecord};
use crate::css::{rewrite_stylesheet, scan_stylesheet};
use crate::error::ArchiveError;
use crate::links::{is_fetchable, resolve};

/// Walks and saves the stylesheet `css`, fetched from `url`.
///
/// `reference` is how the stylesheet was referred to where it was found.
/// Returns the registered record of the saved file.
pub(crate) fn save_stylesheet<'a>(
    fetcher: &'a dyn Fetch,
    session: &'a mut DownloadSession,
    reference: String,
    url: String,
    css: String,
) -> BoxFuture<'a, Result<ResourceRecord, ArchiveError>> {
    async move {
        session.begin(&url);
        let result = walk(fetcher, session, &reference, &url, &css).await;
        session.finish(&url);
        result
    }
    .boxed()
}

async fn walk(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    reference: &str,
    url: &str,
    css: &str,
) -> Result<ResourceRecord, ArchiveError> {
    let refs = scan_stylesheet(css);
    debug!(
        url,
        resources = refs.resources.len(),
        imports = refs.imports.len(),
        "walking stylesheet"
    );

    // reference as written in this stylesheet -> its local href from css/
    let mut local: HashMap<String, String> = HashMap::new();

    for resource in &refs.resources {
        let absolute = resolve(url, resource);
        if !is_fetchable(&absolute) {
            continue;
        }
        let record = download_resource(
            fetcher,
            session,
            resource,
            &absolute,
            Category::StylesheetResource,
        )
        .await?;
        if let Some(record) = record {
            local.insert(resource.clone(), record.href_from_stylesheet());
        }
    }

    for import in &refs.imports {
        let absolute = resolve(url, import);
        if !is_fetchable(&absolute) {
            continue;
        }
        if let Some(record) = import_stylesheet(fetcher, session, import, &absolute).await? {
            local.insert(import.clone(), record.href_from_stylesheet());
        }
    }

    let rewritten = rewrite_stylesheet(css, |_, found| local.get(found).cloned());

    let path = session.next_path(Category::Stylesheet, ".css");
    write_file(session.root(), &path, rewritten.as_bytes())?;
    let record = session
        .register(reference, url, path, Category::Stylesheet)
        .clone();
    debug!(url, path = %record.path, "saved stylesheet");
    Ok(record)
}

/// Fetches and saves the stylesheet at `url` unless the session already has
/// it. Returns `None` when it can't be saved (fetch failed, or it is part of
/// an import cycle) and the reference should stay remote.
pub(crate) async fn import_stylesheet(
    fetcher: &dyn Fetch,
    session: &mut DownloadSession,
    reference: &str,
    url: &str,
) -> Result<Option<ResourceRecord>, ArchiveError> {
    if let Some(record) = session.record(url) {
        return Ok(Some(record.clone()));
    }
    if session.is_in_progress(url) {
        debug!(url, "import cycle, leaving reference remote");
        return Ok(None);
    }
    if session.has_failed(url) {
        return Ok(None);
    }

    let css = match fetcher.fetch(url).await {
        Ok(fetched) => fetched.text(),
        Err(error) => {
            warn!(url, reason = %error, "stylesheet not saved");
            session.record_failure(url, Category::Stylesheet, error.to_string());
            return Ok(None);
        }
    };

    let record = save_stylesheet(
        fetcher,
        session,
        reference.to_string(),
        url.to_string(),
        css,
    )
    .await?;
    Ok(Some(record))
}
