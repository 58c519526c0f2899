//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quire content toolkit CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Config file name (default: quire.toml)
    #[arg(short = 'C', long, default_value = "quire.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Which documents to load besides published ones
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Include documents marked as draft
    #[arg(short = 'D', long)]
    pub drafts: bool,

    /// Include documents dated in the future
    #[arg(short = 'F', long)]
    pub future: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Init a template site
    Init {
        /// the name(path) of site directory, related to `root`
        name: Option<PathBuf>,
    },

    /// Validate front-matter, shortcodes and references of every document
    Check {
        #[command(flatten)]
        filter: FilterArgs,

        /// Exit with failure on warnings too
        #[arg(long)]
        deny_warnings: bool,

        /// Re-check on every change
        #[arg(short, long)]
        watch: bool,
    },

    /// List posts, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Only posts with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Only posts in this category
        #[arg(long)]
        category: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show tag and category counts
    Taxonomy {
        #[command(flatten)]
        filter: FilterArgs,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a document body with its shortcodes expanded
    Render {
        /// Document path, relative to the project root or the content directory
        file: PathBuf,
    },

    /// Write a JSON index of all documents
    Index {
        #[command(flatten)]
        filter: FilterArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Commands::Init { .. })
    }
}
