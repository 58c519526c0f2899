//! Quire - a content toolkit for Markdown blogs.

mod check;
mod cli;
mod config;
mod content;
mod index;
mod init;
mod list;
mod render;
mod shortcode;
mod taxonomy;
mod utils;
mod watch;

use anyhow::{Result, bail};
use check::check_once;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use content::ParseCache;
use index::write_index;
use init::new_site;
use list::{list_posts, list_taxonomies};
use render::render_file;
use std::{path::Path, process};
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let ok = match &cli.command {
        Commands::Init { name } => new_site(&config, name.is_some()).map(|_| true)?,
        Commands::Check { watch, .. } => {
            let cache = ParseCache::new();
            let report = check_once(&config, &cache)?;
            let failed = report.failed(config.check.deny_warnings);
            if *watch {
                eprintln!();
                watch_for_changes_blocking(config, &cache, || load_config(&cli))?;
            }
            !failed
        }
        Commands::List {
            tag,
            category,
            json,
            ..
        } => list_posts(&config, tag.as_deref(), category.as_deref(), *json).map(|_| true)?,
        Commands::Taxonomy { json, .. } => list_taxonomies(&config, *json).map(|_| true)?,
        Commands::Render { file } => render_file(&config, file)?,
        Commands::Index { output, .. } => write_index(&config, output.as_deref()).map(|_| true)?,
    };

    if !ok {
        process::exit(1);
    }
    Ok(())
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = if config_path.exists() {
        SiteConfig::from_path(&config_path)?
    } else {
        SiteConfig::default()
    };
    config.update_with_cli(cli);

    if cli.is_init() && config.config_path.exists() {
        bail!("Config file already exists. Remove it manually or init in a different path.");
    }
    config.validate(cli)?;

    Ok(config)
}
