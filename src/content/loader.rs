//! Content directory loading.
//!
//! ```text
//! collect_files()          walkdir, sorted, hidden and temp files skipped
//!       │
//!       ▼
//! parse_file() ×N          rayon, blake3-keyed cache lookup
//!       │
//!       ├── Err ──► failures (one per file, never aborts the run)
//!       ▼
//! draft / future filter
//!       │
//!       ▼
//! Site::new()              posts by date, pages by weight
//! ```

use super::{
    cache::ParseCache,
    document::{Document, DocumentError, Layout},
    site::Site,
};
use crate::{
    config::SiteConfig,
    utils::{category::is_temp_file, date::ContentDate},
};
use anyhow::{Context, Result};
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// Outcome of parsing one file.
pub type Parsed = Result<Document, LoadError>;

/// A file that could not be turned into a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// Path relative to the content directory.
    pub relative: String,
    pub line: Option<usize>,
    pub message: String,
}

impl LoadError {
    fn new(relative: &Path, message: impl fmt::Display) -> Self {
        Self {
            relative: relative.to_string_lossy().replace('\\', "/"),
            line: None,
            message: message.to_string(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}: {}", self.relative, self.message),
            None => write!(f, "{}: {}", self.relative, self.message),
        }
    }
}

/// Everything the loader found.
#[derive(Debug)]
pub struct Loaded {
    pub site: Site,
    pub failures: Vec<LoadError>,
    /// Documents left out because they are drafts.
    pub drafts: usize,
    /// Documents left out because they are dated in the future.
    pub future: usize,
}

/// Load every document under `[content].dir`.
///
/// Only walking the directory can fail; per-file problems end up in
/// [`Loaded::failures`].
pub fn load(config: &SiteConfig, cache: Option<&ParseCache>) -> Result<Loaded> {
    let content = &config.content;
    let files = collect_files(&content.dir, &content.extensions)?;
    let layout = Layout {
        post_sections: &content.post_sections,
        slug: &content.slug,
    };

    let results: Vec<Parsed> = files
        .par_iter()
        .map(|path| parse_file(path, &content.dir, layout, cache))
        .collect();

    if let Some(cache) = cache {
        let seen: FxHashSet<&Path> = files.iter().map(PathBuf::as_path).collect();
        cache.retain(|path| seen.contains(path));
    }

    let now = ContentDate::now();
    let mut loaded = Loaded {
        site: Site::default(),
        failures: Vec::new(),
        drafts: 0,
        future: 0,
    };
    let mut documents = Vec::with_capacity(results.len());

    for parsed in results {
        match parsed {
            Ok(doc) if doc.draft() && !content.include_drafts => loaded.drafts += 1,
            Ok(doc)
                if !content.include_future && doc.date().is_some_and(|d| d.is_after(&now)) =>
            {
                loaded.future += 1
            }
            Ok(doc) => documents.push(doc),
            Err(err) => loaded.failures.push(err),
        }
    }

    loaded.site = Site::new(documents);
    Ok(loaded)
}

/// Document files under `dir`, sorted by path.
pub fn collect_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || is_temp_file(path) {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)));
        if matches {
            files.push(path.to_path_buf());
        }
    }

    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|s| s.starts_with('.'))
}

/// Read and parse one file, consulting the cache first.
pub fn parse_file(
    path: &Path,
    content_dir: &Path,
    layout: Layout<'_>,
    cache: Option<&ParseCache>,
) -> Parsed {
    let relative = path.strip_prefix(content_dir).unwrap_or(path);

    let bytes = fs::read(path).map_err(|err| LoadError::new(relative, err))?;
    let hash = blake3::hash(&bytes);
    if let Some(hit) = cache.and_then(|c| c.get(path, &hash)) {
        return hit;
    }

    let parsed = match String::from_utf8(bytes) {
        Ok(source) => Document::parse(path.to_path_buf(), relative, &source, layout)
            .map_err(|err| document_error(relative, err)),
        Err(_) => Err(LoadError::new(relative, "file is not valid UTF-8")),
    };

    if let Some(cache) = cache {
        cache.insert(path.to_path_buf(), hash, parsed.clone());
    }
    parsed
}

fn document_error(relative: &Path, err: DocumentError) -> LoadError {
    let mut load = LoadError::new(relative, &err);
    // Metadata problems sit in the block that starts the file.
    if matches!(err, DocumentError::FrontMatter(_) | DocumentError::MissingField { .. }) {
        load.line = Some(1);
    }
    load
}
