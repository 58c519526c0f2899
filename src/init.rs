//! Site initialization module.
//!
//! Creates a new site skeleton with default configuration and two sample
//! documents that pass `quire check`.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Default site directory structure, relative to the root
const SITE_DIRS: &[&str] = &["content/posts", "layouts/shortcodes", "static"];

/// CV page showing the built-in `cv-entry` and `details` shortcodes
const ABOUT_PAGE: &str = r#"---
title: About
weight: 1
---

Hi, I write about programming here.

## Experience

{{< cv-entry "Software Engineer" "ACME Corp" "2021 - now" "Remote" >}}
Backend services and developer tooling.
{{< /cv-entry >}}

{{< details summary="Education" >}}
{{< cv-entry "BSc Computer Science" "Some University" "2017 - 2021" />}}
{{< /details >}}
"#;

/// Sample post linking back to the about page
const FIRST_POST: &str = r#"---
title: Hello, world
date: {{DATE}}
tags: [meta]
categories: [blog]
---

First post. More about me on the [about page]({{< relref "about.md" >}}).
"#;

/// Create a new site at the configured root.
///
/// Without a name the root is the current directory, which must be empty.
pub fn new_site(config: &SiteConfig, has_name: bool) -> Result<()> {
    let root = config.get_root();

    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `quire init <SITE_NAME>` to create in a subdirectory."
        );
    }

    init_site_structure(root)?;
    init_default_config(&config.config_path)?;
    init_sample_content(root)?;

    log!("init"; "created new site at {}", root.display());
    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write default configuration file
fn init_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Create site directory structure
fn init_site_structure(root: &Path) -> Result<()> {
    for dir in SITE_DIRS {
        let path = root.join(dir);
        if path.exists() {
            bail!(
                "Path `{}` already exists. Try `quire init <SITE_NAME>` instead.",
                path.display()
            );
        }
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    Ok(())
}

fn init_sample_content(root: &Path) -> Result<()> {
    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let files = [
        ("content/about.md", ABOUT_PAGE.to_owned()),
        ("content/posts/hello-world.md", FIRST_POST.replace("{{DATE}}", &today)),
    ];

    for (name, content) in files {
        let path = root.join(name);
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
