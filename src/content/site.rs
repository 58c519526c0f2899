//! The loaded document set.

use super::document::{Document, Kind};
use crate::shortcode::LinkResolver;
use rustc_hash::FxHashMap;
use std::{cmp::Ordering, path::Path};

/// All documents of one run, posts first.
#[derive(Debug, Default)]
pub struct Site {
    documents: Vec<Document>,
    posts: usize,
    /// Content-relative path to index in `documents`.
    by_path: FxHashMap<String, usize>,
}

impl Site {
    /// Sort documents into listing order and index them.
    ///
    /// Posts: newest first, ties by title. Pages: by weight (unweighted last),
    /// then title.
    pub fn new(mut documents: Vec<Document>) -> Self {
        documents.sort_by(|a, b| match (a.kind(), b.kind()) {
            (Kind::Post, Kind::Page) => Ordering::Less,
            (Kind::Page, Kind::Post) => Ordering::Greater,
            (Kind::Post, Kind::Post) => b
                .date()
                .cmp(&a.date())
                .then_with(|| a.title().cmp(b.title())),
            (Kind::Page, Kind::Page) => compare_weight(a.weight(), b.weight())
                .then_with(|| a.title().cmp(b.title())),
        });

        let posts = documents.iter().take_while(|d| d.kind() == Kind::Post).count();
        let by_path = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.relative.clone(), i))
            .collect();

        Self {
            documents,
            posts,
            by_path,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn posts(&self) -> &[Document] {
        &self.documents[..self.posts]
    }

    pub fn pages(&self) -> &[Document] {
        &self.documents[self.posts..]
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Document at a content-relative path (exact, with extension).
    pub fn get(&self, relative: &str) -> Option<&Document> {
        self.by_path.get(relative).map(|&i| &self.documents[i])
    }

    /// Document whose source is `path` (absolute).
    pub fn get_by_source(&self, path: &Path) -> Option<&Document> {
        self.documents.iter().find(|d| d.path == path)
    }

    /// Find the document a reference points at.
    ///
    /// `target` is content-relative unless it starts with `./` or `../`, in
    /// which case it is relative to `from`'s directory. The extension is
    /// optional, and a directory resolves to its `index` or `_index` file.
    pub fn lookup(&self, target: &str, from: &Path) -> Option<&Document> {
        let target = target.trim();
        let joined = if target.starts_with("./") || target.starts_with("../") {
            let base = from
                .parent()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            format!("{base}/{target}")
        } else {
            target.to_owned()
        };
        let normalized = normalize(&joined)?;

        if let Some(doc) = self.get(&normalized) {
            return Some(doc);
        }

        let prefix = if normalized.is_empty() {
            String::new()
        } else {
            format!("{normalized}/")
        };
        [
            format!("{normalized}."),
            format!("{prefix}index."),
            format!("{prefix}_index."),
        ]
        .iter()
        .find_map(|stem| self.find_with_any_extension(stem))
    }

    fn find_with_any_extension(&self, stem: &str) -> Option<&Document> {
        self.by_path
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(stem)
                    .is_some_and(|ext| !ext.is_empty() && !ext.contains(['/', '.']))
            })
            .map(|(_, &i)| i)
            .min()
            .map(|i| &self.documents[i])
    }
}

impl LinkResolver for Site {
    fn resolve(&self, target: &str, from: &Path) -> Option<String> {
        self.lookup(target, from).map(|doc| doc.route.clone())
    }
}

fn compare_weight(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Collapse `.` and `..` segments. `None` when `..` climbs out of the root.
fn normalize(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}
