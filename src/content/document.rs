//! Posts, pages and their routes.
//!
//! A source file becomes a [`Document`]: decoded front-matter checked against
//! the required fields of its kind, the body, and the URL route it occupies.
//!
//! # Routes
//!
//! | Source (content-relative) | Kind | Route                 |
//! |---------------------------|------|-----------------------|
//! | `posts/Hello World.md`    | Post | `/posts/hello-world/` |
//! | `posts/trip/index.md`     | Post | `/posts/trip/`        |
//! | `posts/_index.md`         | Page | `/posts/`             |
//! | `about.md`                | Page | `/about/`             |
//! | `_index.md`               | Page | `/`                   |
//!
//! A front-matter `slug` replaces the last segment, except for section
//! indexes (`_index.md`), which always take their directory's route.

use super::frontmatter::{self, FrontMatter, FrontMatterError};
use crate::{
    config::SlugMode,
    utils::{date::ContentDate, slug::slugify_with},
};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),

    #[error("{kind} is missing required field `{field}`")]
    MissingField { kind: Kind, field: &'static str },

    #[error("path `{0}` is not valid UTF-8")]
    NonUtf8Path(PathBuf),
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Post,
    Page,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Post => "post",
            Self::Page => "page",
        })
    }
}

/// A dated entry under one of the post sections.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub title: String,
    pub date: ContentDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmod: Option<ContentDate>,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub aliases: Vec<String>,
    pub draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

/// A standalone document such as the About/CV page or a section index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<ContentDate>,
    pub aliases: Vec<String>,
    pub draft: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Meta {
    Post(Post),
    Page(Page),
}

/// A loaded source file. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// Absolute source path.
    #[serde(skip)]
    pub path: PathBuf,
    /// Path relative to the content directory, `/`-separated.
    #[serde(rename = "path")]
    pub relative: String,
    pub route: String,
    #[serde(flatten)]
    pub meta: Meta,
    #[serde(skip)]
    pub body: String,
    /// 1-based line of the first body byte in the source file.
    #[serde(skip)]
    pub body_line: usize,
}

/// Classification and routing inputs taken from `[content]`.
#[derive(Debug, Clone, Copy)]
pub struct Layout<'a> {
    pub post_sections: &'a [String],
    pub slug: &'a SlugMode,
}

// ============================================================================
// Construction
// ============================================================================

impl Document {
    /// Build a document from its source text.
    ///
    /// `path` is the absolute location, `relative` the same file relative to
    /// the content directory.
    pub fn parse(
        path: PathBuf,
        relative: &Path,
        source: &str,
        layout: Layout<'_>,
    ) -> Result<Self, DocumentError> {
        let relative = relative_str(relative)?;
        let (front, body, body_line) = frontmatter::parse(source)?;
        Self::from_parts(path, relative, front, body.to_owned(), body_line, layout)
    }

    pub(crate) fn from_parts(
        path: PathBuf,
        relative: String,
        front: FrontMatter,
        body: String,
        body_line: usize,
        layout: Layout<'_>,
    ) -> Result<Self, DocumentError> {
        let kind = classify(&relative, layout.post_sections);
        let route = route_for(&relative, front.slug.as_deref(), layout.slug);
        let meta = match kind {
            Kind::Post => Meta::Post(into_post(front)?),
            Kind::Page => Meta::Page(into_page(front)?),
        };

        Ok(Self {
            path,
            relative,
            route,
            meta,
            body,
            body_line,
        })
    }
}

fn into_post(front: FrontMatter) -> Result<Post, DocumentError> {
    let missing = |field| DocumentError::MissingField {
        kind: Kind::Post,
        field,
    };
    Ok(Post {
        title: non_blank(front.title).ok_or_else(|| missing("title"))?,
        date: front.date.ok_or_else(|| missing("date"))?,
        lastmod: front.lastmod,
        tags: front.tags,
        categories: front.categories,
        aliases: front.aliases,
        draft: front.draft,
        description: front.description,
        weight: front.weight,
        extra: front.extra,
    })
}

fn into_page(front: FrontMatter) -> Result<Page, DocumentError> {
    Ok(Page {
        title: non_blank(front.title).ok_or(DocumentError::MissingField {
            kind: Kind::Page,
            field: "title",
        })?,
        description: front.description,
        date: front.date,
        aliases: front.aliases,
        draft: front.draft,
        weight: front.weight,
        extra: front.extra,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn relative_str(relative: &Path) -> Result<String, DocumentError> {
    let parts: Option<Vec<&str>> = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .map(|c| c.as_os_str().to_str())
        .collect();
    parts
        .map(|parts| parts.join("/"))
        .ok_or_else(|| DocumentError::NonUtf8Path(relative.to_path_buf()))
}

// ============================================================================
// Accessors
// ============================================================================

impl Document {
    pub fn kind(&self) -> Kind {
        match self.meta {
            Meta::Post(_) => Kind::Post,
            Meta::Page(_) => Kind::Page,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match &self.meta {
            Meta::Post(post) => Some(post),
            Meta::Page(_) => None,
        }
    }

    pub fn title(&self) -> &str {
        match &self.meta {
            Meta::Post(post) => &post.title,
            Meta::Page(page) => &page.title,
        }
    }

    pub fn date(&self) -> Option<&ContentDate> {
        match &self.meta {
            Meta::Post(post) => Some(&post.date),
            Meta::Page(page) => page.date.as_ref(),
        }
    }

    pub fn draft(&self) -> bool {
        match &self.meta {
            Meta::Post(post) => post.draft,
            Meta::Page(page) => page.draft,
        }
    }

    pub fn weight(&self) -> Option<i64> {
        match &self.meta {
            Meta::Post(post) => post.weight,
            Meta::Page(page) => page.weight,
        }
    }

    pub fn aliases(&self) -> &[String] {
        match &self.meta {
            Meta::Post(post) => &post.aliases,
            Meta::Page(page) => &page.aliases,
        }
    }

    /// Directory holding the source file; page bundles keep their images here.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

// ============================================================================
// Classification and routes
// ============================================================================

fn stem_of(relative: &str) -> (&str, &str) {
    let (dir, file) = relative.rsplit_once('/').unwrap_or(("", relative));
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    (dir, stem)
}

/// Post when the first directory is a post section, unless the file is a
/// section index.
fn classify(relative: &str, post_sections: &[String]) -> Kind {
    let (dir, stem) = stem_of(relative);
    if stem == "_index" || dir.is_empty() {
        return Kind::Page;
    }
    let section = dir.split('/').next().unwrap_or_default();
    if post_sections.iter().any(|s| s == section) {
        Kind::Post
    } else {
        Kind::Page
    }
}

/// Route of a content-relative path, always starting and ending with `/`.
pub fn route_for(relative: &str, slug: Option<&str>, mode: &SlugMode) -> String {
    let (dir, stem) = stem_of(relative);
    let mut segments: Vec<String> = dir
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| slugify_with(s, mode))
        .collect();

    let slug = slug.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty());
    match stem {
        "_index" => {}
        "index" => {
            if let (Some(slug), Some(last)) = (slug, segments.last_mut()) {
                *last = slugify_with(slug, mode);
            }
        }
        _ => segments.push(slugify_with(slug.unwrap_or(stem), mode)),
    }

    segments.retain(|s| !s.is_empty());
    if segments.is_empty() {
        "/".to_owned()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections() -> Vec<String> {
        vec!["posts".to_owned()]
    }

    fn load(relative: &str, source: &str) -> Result<Document, DocumentError> {
        let sections = sections();
        let layout = Layout {
            post_sections: &sections,
            slug: &SlugMode::On,
        };
        Document::parse(
            Path::new("/site/content").join(relative),
            Path::new(relative),
            source,
            layout,
        )
    }

    #[test]
    fn test_post() {
        let doc = load(
            "posts/currying.md",
            "---\ntitle: Currying\ndate: 2021-03-04\ntags: [fp, java]\n---\nBody\n",
        )
        .unwrap();

        assert_eq!(doc.kind(), Kind::Post);
        assert_eq!(doc.route, "/posts/currying/");
        assert_eq!(doc.title(), "Currying");
        assert_eq!(doc.body, "Body\n");
        assert_eq!(doc.body_line, 6);
        let post = doc.as_post().unwrap();
        assert_eq!(post.tags, vec!["fp", "java"]);
        assert_eq!(post.date, ContentDate::from_ymd(2021, 3, 4).unwrap());
    }

    #[test]
    fn test_post_requires_date() {
        let err = load("posts/x.md", "---\ntitle: X\n---\n").unwrap_err();
        assert!(matches!(
            err,
            DocumentError::MissingField {
                kind: Kind::Post,
                field: "date"
            }
        ));
    }

    #[test]
    fn test_requires_title() {
        let err = load("about.md", "+++\ntitle = \"  \"\n+++\n").unwrap_err();
        assert_eq!(err.to_string(), "page is missing required field `title`");
    }

    #[test]
    fn test_page_without_date() {
        let doc = load(
            "about.md",
            "---\ntitle: About\ndescription: CV\naliases: /cv/\n---\n",
        )
        .unwrap();
        assert_eq!(doc.kind(), Kind::Page);
        assert_eq!(doc.route, "/about/");
        assert_eq!(doc.date(), None);
        assert_eq!(doc.aliases(), ["/cv/"]);
    }

    #[test]
    fn test_section_index_is_page() {
        let doc = load("posts/_index.md", "---\ntitle: Posts\n---\n").unwrap();
        assert_eq!(doc.kind(), Kind::Page);
        assert_eq!(doc.route, "/posts/");
    }

    #[test]
    fn test_front_matter_error_propagates() {
        let err = load("about.md", "no front matter").unwrap_err();
        assert!(matches!(
            err,
            DocumentError::FrontMatter(FrontMatterError::Missing)
        ));
    }

    #[test]
    fn test_routes() {
        let on = SlugMode::On;
        assert_eq!(route_for("posts/Hello World.md", None, &on), "/posts/hello-world/");
        assert_eq!(route_for("posts/trip/index.md", None, &on), "/posts/trip/");
        assert_eq!(route_for("posts/trip/index.md", Some("japan"), &on), "/posts/japan/");
        assert_eq!(route_for("posts/a.md", Some("/custom/"), &on), "/posts/custom/");
        assert_eq!(route_for("posts/_index.md", Some("ignored"), &on), "/posts/");
        assert_eq!(route_for("_index.md", None, &on), "/");
        assert_eq!(route_for("index.md", None, &on), "/");
        assert_eq!(route_for("Über.md", None, &SlugMode::Safe), "/über/");
    }

    #[test]
    fn test_classify() {
        let sections = sections();
        assert_eq!(classify("posts/a.md", &sections), Kind::Post);
        assert_eq!(classify("posts/2021/a.md", &sections), Kind::Post);
        assert_eq!(classify("posts/_index.md", &sections), Kind::Page);
        assert_eq!(classify("notes/a.md", &sections), Kind::Page);
        assert_eq!(classify("posts.md", &sections), Kind::Page);
    }

    #[test]
    fn test_serialize() {
        let doc = load(
            "posts/a.md",
            "---\ntitle: A\ndate: 2021-01-02\nseries: fp\n---\n",
        )
        .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["kind"], "post");
        assert_eq!(json["path"], "posts/a.md");
        assert_eq!(json["route"], "/posts/a/");
        assert_eq!(json["extra"]["series"], "fp");
        assert!(json.get("body").is_none());
    }
}
