//! Site validation.
//!
//! # Checks
//!
//! | Check                                     | Severity |
//! |-------------------------------------------|----------|
//! | Front-matter syntax and required fields   | error    |
//! | Shortcode syntax, unknown names, params   | error    |
//! | `ref` / `relref` targets                  | error    |
//! | Image paths (`figure src`, `![](..)`)     | error    |
//! | Duplicate routes, alias collisions        | error    |
//! | Shortcode template compile errors         | error    |
//! | Shortcode rendering to blank text         | warning  |
//! | Post without tags (`require_tags`)        | warning  |
//!
//! Images resolve against the document's own directory (page bundles) and
//! the static directory. Remote URLs and `data:` URIs are not checked.

use crate::{
    config::SiteConfig,
    content::{self, Document, Loaded, ParseCache},
    log,
    shortcode::{self, RenderContext, parser::Params, registry::Registry},
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::LazyLock,
};

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One finding, attached to a file and optionally a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Path relative to the content directory, or to the project root for
    /// files outside it.
    pub path: String,
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(path: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<String>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(path, line, message)
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}: {}", self.path, self.message),
            None => write!(f, "{}: {}", self.path, self.message),
        }
    }
}

/// Outcome of a check run.
#[derive(Debug, Default)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
    /// Documents that were checked.
    pub documents: usize,
}

impl Report {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Whether the run should exit non-zero.
    pub fn failed(&self, deny_warnings: bool) -> bool {
        self.errors() > 0 || (deny_warnings && self.warnings() > 0)
    }

    /// Log every diagnostic followed by a summary line.
    pub fn print(&self) {
        for diagnostic in &self.diagnostics {
            let module = match diagnostic.severity {
                Severity::Error => "error",
                Severity::Warning => "warn",
            };
            log!(module; "{diagnostic}");
        }
        log!(
            "check";
            "{} documents, {} errors, {} warnings",
            self.documents,
            self.errors(),
            self.warnings()
        );
    }
}

// ============================================================================
// Entry Point
// ============================================================================

/// Load the site, validate it and log the report.
pub fn check_once(config: &SiteConfig, cache: &ParseCache) -> Result<Report> {
    let loaded = content::load(config, Some(cache))?;
    let (registry, mut diagnostics) = load_registry(config)?;
    log!("check"; "shortcodes: {}", registry.names().join(", "));

    let mut report = check_site(config, &loaded, &registry);
    diagnostics.append(&mut report.diagnostics);
    report.diagnostics = diagnostics;

    if loaded.drafts + loaded.future > 0 {
        log!(
            "check";
            "skipped {} drafts and {} future documents",
            loaded.drafts,
            loaded.future
        );
    }
    report.print();
    Ok(report)
}

// ============================================================================
// Registry
// ============================================================================

/// Built-ins, then the shortcode directory, then inline `[shortcodes]`
/// entries; later sources override earlier ones. Templates that fail to
/// compile are reported instead of registered.
pub fn load_registry(config: &SiteConfig) -> Result<(Registry, Vec<Diagnostic>)> {
    let mut registry = Registry::with_builtins().context("Built-in shortcodes failed to compile")?;
    let root = config.get_root();
    let mut diagnostics = Vec::new();

    for (path, err) in registry.load_dir(&config.content.shortcodes)? {
        diagnostics.push(Diagnostic::error(display_path(&path, root), Some(err.line), err.to_string()));
    }

    let config_name = display_path(&config.config_path, root);
    for (name, source) in &config.shortcodes {
        if let Err(err) = registry.register_template(name, source) {
            diagnostics.push(Diagnostic::error(
                config_name.clone(),
                None,
                format!("[shortcodes.{name}] line {}: {err}", err.line),
            ));
        }
    }

    Ok((registry, diagnostics))
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

// ============================================================================
// Checks
// ============================================================================

/// Validate everything the loader produced.
pub fn check_site(config: &SiteConfig, loaded: &Loaded, registry: &Registry) -> Report {
    let mut diagnostics: Vec<Diagnostic> = loaded
        .failures
        .iter()
        .map(|f| Diagnostic::error(f.relative.clone(), f.line, f.message.clone()))
        .collect();

    let per_document: Vec<Vec<Diagnostic>> = loaded
        .site
        .documents()
        .par_iter()
        .map(|doc| check_document(config, loaded, registry, doc))
        .collect();
    diagnostics.extend(per_document.into_iter().flatten());
    diagnostics.extend(check_routes(loaded.site.documents()));

    diagnostics.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.line.cmp(&b.line)));

    Report {
        diagnostics,
        documents: loaded.site.len(),
    }
}

fn check_document(
    config: &SiteConfig,
    loaded: &Loaded,
    registry: &Registry,
    doc: &Document,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let path = doc.relative.as_str();

    let ctx = RenderContext {
        page: Path::new(path),
        base_url: config.base_url(),
        links: &loaded.site,
    };
    let expansion = shortcode::expand(&doc.body, doc.body_line, registry, &ctx);

    for err in &expansion.errors {
        out.push(Diagnostic::error(path, Some(err.line()), err.to_string()));
    }
    for (name, line) in &expansion.empty {
        out.push(Diagnostic::warning(
            path,
            Some(*line),
            format!("shortcode `{name}` rendered an empty fragment"),
        ));
    }

    let figures = expansion
        .calls
        .iter()
        .filter(|c| c.name == "figure")
        .filter_map(|c| figure_src(&c.params).map(|src| (src, c.line)));
    for (src, line) in figures.chain(markdown_images(&doc.body, doc.body_line)) {
        if !image_exists(src, doc.dir(), config) {
            out.push(Diagnostic::error(
                path,
                Some(line),
                format!("image `{src}` not found"),
            ));
        }
    }

    if config.check.require_tags && doc.as_post().is_some_and(|p| p.tags.is_empty()) {
        out.push(Diagnostic::warning(path, Some(1), "post has no tags"));
    }

    out
}

/// `src=` on a named call, the first argument on a positional one.
fn figure_src(params: &Params) -> Option<&str> {
    params.named("src").or_else(|| params.at(0))
}

/// `(target, line)` of every Markdown image outside fenced code blocks.
///
/// Destinations may be bare (`![a](img.png "title")`) or wrapped in angle
/// brackets, which allows spaces (`![a](<my photo.png>)`).
fn markdown_images(body: &str, first_line: usize) -> Vec<(&str, usize)> {
    static RE_IMAGE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"!\[[^\]]*\]\(\s*(?:<([^<>\n]*)>|([^\s<)]+))"#).unwrap());

    let mut images = Vec::new();
    let mut fence: Option<&str> = None;

    for (i, line) in body.lines().enumerate() {
        let trimmed = line.trim_start();
        match fence {
            Some(marker) if trimmed.starts_with(marker) => fence = None,
            Some(_) => {}
            None if trimmed.starts_with("```") => fence = Some("```"),
            None if trimmed.starts_with("~~~") => fence = Some("~~~"),
            None => images.extend(
                RE_IMAGE
                    .captures_iter(line)
                    .filter_map(|c| c.get(1).or_else(|| c.get(2)))
                    .map(|m| (m.as_str(), first_line + i)),
            ),
        }
    }

    images
}

fn is_remote(target: &str) -> bool {
    let lower = target.to_ascii_lowercase();
    ["http://", "https://", "//", "data:", "mailto:"]
        .iter()
        .any(|p| lower.starts_with(p))
}

/// Whether an image reference resolves to a file on disk.
fn image_exists(target: &str, doc_dir: &Path, config: &SiteConfig) -> bool {
    if is_remote(target) {
        return true;
    }
    let target = target.split(['?', '#']).next().unwrap_or_default();
    if target.is_empty() {
        return false;
    }
    // `my%20photo.png` names `my photo.png` on disk.
    let decoded = urlencoding::decode(target);
    let target = decoded.as_deref().unwrap_or(target);

    let candidates: Vec<PathBuf> = match target.strip_prefix('/') {
        Some(absolute) => vec![
            config.content.static_dir.join(absolute),
            config.content.dir.join(absolute),
        ],
        None => vec![doc_dir.join(target), config.content.static_dir.join(target)],
    };
    candidates.iter().any(|p| p.is_file())
}

/// Duplicate routes, and aliases that shadow a route or another alias.
fn check_routes(documents: &[Document]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut routes: FxHashMap<&str, &str> = FxHashMap::default();

    for doc in documents {
        if let Some(first) = routes.insert(&doc.route, &doc.relative) {
            out.push(Diagnostic::error(
                doc.relative.as_str(),
                None,
                format!("route `{}` is also produced by `{first}`", doc.route),
            ));
            routes.insert(&doc.route, first);
        }
    }

    let mut aliases: FxHashMap<String, &str> = FxHashMap::default();
    for doc in documents {
        for alias in doc.aliases() {
            let alias = normalize_alias(alias);
            if let Some(owner) = routes.get(alias.as_str()) {
                out.push(Diagnostic::error(
                    doc.relative.as_str(),
                    Some(1),
                    format!("alias `{alias}` collides with the route of `{owner}`"),
                ));
            } else if let Some(owner) = aliases.get(&alias) {
                if *owner != doc.relative {
                    out.push(Diagnostic::error(
                        doc.relative.as_str(),
                        Some(1),
                        format!("alias `{alias}` is also declared by `{owner}`"),
                    ));
                }
            } else {
                aliases.insert(alias, &doc.relative);
            }
        }
    }

    out
}

/// `cv`, `/cv` and `/cv/` are the same alias.
fn normalize_alias(alias: &str) -> String {
    let trimmed = alias.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_owned();
    }
    let has_extension = trimmed
        .rsplit('/')
        .next()
        .is_some_and(|last| last.contains('.'));
    if has_extension {
        format!("/{trimmed}")
    } else {
        format!("/{trimmed}/")
    }
}
