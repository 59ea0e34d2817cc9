// src/main.rs
// =============================================================================
// Entry point of the page-archiver binary.
//
// The binary plays the part of the browser shell: it supplies a URL, a
// destination and a display name, runs ONE archive on a background task, and
// reports the two lifecycle signals as they arrive.
//
// Exit codes:
//   0 = page saved, every resource localized
//   1 = page saved, some resources left pointing at the web
//   2 = nothing saved (bad input, page unreachable or malformed ...)
// =============================================================================

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use page_archiver::{
    list_saved_pages, ArchiveConfig, ArchiveObserver, ArchiveReport, ArchiveRequest,
    ArchiveTarget, Archiver, Category, SavedPage,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// RUST_LOG wins; otherwise the flags pick the level
fn init_logging(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("page_archiver={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Save {
            url,
            dest,
            name,
            json,
            no_favicon,
            timeout,
        } => {
            let config = ArchiveConfig {
                timeout_secs: timeout,
                fetch_favicon: !no_favicon,
                ..ArchiveConfig::default()
            };
            let mut request = ArchiveRequest::new(url, dest);
            request.name = name;
            handle_save(request, config, json).await
        }
        Commands::Library { dir, json } => handle_library(&dir, json),
    }
}

// Prints the lifecycle signals (to stderr, so --json output stays clean)
struct ConsoleObserver;

impl ArchiveObserver for ConsoleObserver {
    fn started(&self, target: &ArchiveTarget) {
        eprintln!("📥 Archiving {}", target.url);
        eprintln!("📁 Into {}", target.output_dir.display());
    }

    fn finished(&self, report: &ArchiveReport) {
        eprintln!("✅ Saved {}", report.index_path.display());
    }
}

async fn handle_save(request: ArchiveRequest, config: ArchiveConfig, json: bool) -> Result<i32> {
    let archiver = Arc::new(Archiver::new(config).context("could not build HTTP client")?);

    // The archive runs on its own task; this one only waits for the outcome
    let task = {
        let archiver = Arc::clone(&archiver);
        tokio::spawn(async move { archiver.archive(&request, &ConsoleObserver).await })
    };

    let report = task.await.context("archive task panicked")??;

    print_report(&report, json)?;

    if report.is_complete() {
        Ok(0)
    } else {
        Ok(1)
    }
}

fn print_report(report: &ArchiveReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{:<22} {:>6}", "CATEGORY", "SAVED");
    println!("{}", "=".repeat(29));
    for category in Category::ALL {
        println!("{:<22} {:>6}", category_label(category), report.count(category));
    }
    println!();

    if !report.failures.is_empty() {
        println!("⚠️  Left pointing at the web:");
        for failure in &report.failures {
            println!("   {:<60} {}", truncate(&failure.url, 57), failure.reason);
        }
        println!();
    }

    println!("📊 Summary:");
    println!("   ✅ Saved: {}", report.resources.len());
    println!("   ❌ Failed: {}", report.failures.len());
    println!("   📄 Page: {}", report.index_path.display());
    Ok(())
}

fn handle_library(dir: &Path, json: bool) -> Result<i32> {
    let pages = list_saved_pages(dir)
        .with_context(|| format!("could not list saved pages in {}", dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
    } else {
        print_library(&pages);
    }
    Ok(0)
}

fn print_library(pages: &[SavedPage]) {
    if pages.is_empty() {
        println!("No saved pages");
        return;
    }

    println!("{:<40} {:<5} {}", "TITLE", "ICON", "PAGE");
    println!("{}", "=".repeat(90));
    for page in pages {
        let icon = if page.icon_path.is_some() { "yes" } else { "-" };
        println!(
            "{:<40} {:<5} {}",
            truncate(&page.title, 37),
            icon,
            page.html_path.display()
        );
    }
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::Favicon => "🔖 favicon",
        Category::Image => "🖼️  images",
        Category::Stylesheet => "🎨 stylesheets",
        Category::StylesheetResource => "🧩 stylesheet files",
        Category::Script => "📜 scripts",
    }
}

// Shortens long text for table cells, on a char boundary
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}
