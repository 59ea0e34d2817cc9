// src/cli.rs
// =============================================================================
// The command-line surface of the archiver binary, defined with clap's
// derive API.
//
//   page-archiver save <URL> [--dest DIR] [--name NAME] [--json]
//                            [--no-favicon] [--timeout SECS]
//   page-archiver library [DIR] [--json]
// =============================================================================

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "page-archiver",
    version,
    about = "Save a webpage and everything it needs into a folder that opens offline",
    long_about = "page-archiver downloads a page together with its images, stylesheets \
                  (and what they import), scripts and favicon, rewrites the page to use \
                  the local copies, and saves it all as <name>/index.html."
)]
pub struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Archive one page
    ///
    /// Example: page-archiver save https://example.com --dest ~/Saved --name Example
    Save {
        /// Absolute http(s) URL of the page
        url: String,

        /// Existing folder to create the archive in
        #[arg(long, default_value = ".")]
        dest: PathBuf,

        /// Archive folder name (a number is appended if it's taken)
        #[arg(long)]
        name: Option<String>,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Don't download the site icon
        #[arg(long)]
        no_favicon: bool,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },

    /// List the archives saved in a folder
    ///
    /// Example: page-archiver library ~/Saved
    Library {
        /// Folder holding archives
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Print the list as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
