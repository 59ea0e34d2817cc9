// src/archive/lifecycle.rs
// =============================================================================
// The two lifecycle signals of an archive run: "started" and "finished".
//
// Both are plain method calls made on the task running the archive, in this
// order:
//   started   after the output folder exists, before the first request
//   finished  after index.html is written
// A run that ends in a fatal fault never signals `finished`; the caller gets
// the error from `Archiver::archive` instead.
// =============================================================================

use serde::Serialize;
use std::path::PathBuf;

use super::orchestrator::ArchiveReport;

/// What a run that just started is working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveTarget {
    pub url: String,
    pub output_dir: PathBuf,
}

pub trait ArchiveObserver: Send + Sync {
    fn started(&self, _target: &ArchiveTarget) {}

    fn finished(&self, _report: &ArchiveReport) {}
}

/// Ignores both signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ArchiveObserver for NoopObserver {}
