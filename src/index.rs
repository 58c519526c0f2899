//! `index` command: a JSON description of the whole site.
//!
//! ```json
//! {
//!   "site": { "title": "...", "url": "...", "author": "...", "language": "..." },
//!   "documents": [ { "path": "posts/a.md", "route": "/posts/a/", "kind": "post", ... } ],
//!   "taxonomies": { "tags": [...], "categories": [...] }
//! }
//! ```
//!
//! Documents appear in listing order. Bodies are not included.

use crate::{
    config::SiteConfig,
    content::{self, Document},
    log,
    taxonomy::Taxonomies,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::{fs, path::Path};

#[derive(Serialize)]
struct SiteInfo<'a> {
    title: &'a str,
    url: Option<&'a str>,
    author: &'a str,
    language: &'a str,
}

#[derive(Serialize)]
struct Index<'a> {
    site: SiteInfo<'a>,
    documents: &'a [Document],
    taxonomies: &'a Taxonomies,
}

/// Write the index to `output`, or to stdout when `None`.
pub fn write_index(config: &SiteConfig, output: Option<&Path>) -> Result<()> {
    let loaded = content::load(config, None)?;
    for failure in &loaded.failures {
        log!("warn"; "skipped {failure}");
    }

    let json = render_index(config, &loaded.site)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log!(
                "index";
                "{} documents written to {}",
                loaded.site.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn render_index(config: &SiteConfig, site: &content::Site) -> Result<String> {
    let taxonomies = Taxonomies::build(site, &config.content.slug);
    let base = &config.base;
    let index = Index {
        site: SiteInfo {
            title: &base.title,
            url: base.url.as_deref(),
            author: &base.author,
            language: &base.language,
        },
        documents: site.documents(),
        taxonomies: &taxonomies,
    };
    serde_json::to_string_pretty(&index).context("Failed to serialize index")
}
