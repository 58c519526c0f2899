//! `[content]` and `[check]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// URL slug generation mode for routes and taxonomy terms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlugMode {
    /// Transliterate to ASCII and lowercase (e.g., "Über" → "uber").
    On,
    /// Strip URL-unsafe characters, keep non-ASCII letters.
    #[default]
    Safe,
    /// Use the text as written.
    No,
}

/// `[content]` section in quire.toml - where documents live and how they are
/// classified.
///
/// # Example
/// ```toml
/// [content]
/// dir = "content"
/// static = "static"
/// shortcodes = "layouts/shortcodes"
/// post_sections = ["posts", "notes"]
/// include_drafts = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::content::root")]
    #[educe(Default = defaults::content::root())]
    pub root: Option<PathBuf>,

    /// Content source directory.
    #[serde(default = "defaults::content::dir")]
    #[educe(Default = defaults::content::dir())]
    pub dir: PathBuf,

    /// Static files directory, used to resolve image references.
    #[serde(rename = "static", default = "defaults::content::static_dir")]
    #[educe(Default = defaults::content::static_dir())]
    pub static_dir: PathBuf,

    /// Directory holding user shortcode templates.
    #[serde(default = "defaults::content::shortcodes")]
    #[educe(Default = defaults::content::shortcodes())]
    pub shortcodes: PathBuf,

    /// File extensions treated as documents.
    #[serde(default = "defaults::content::extensions")]
    #[educe(Default = defaults::content::extensions())]
    pub extensions: Vec<String>,

    /// Top-level sections whose documents are posts. Everything else is a page.
    #[serde(default = "defaults::content::post_sections")]
    #[educe(Default = defaults::content::post_sections())]
    pub post_sections: Vec<String>,

    /// Include documents marked `draft: true`.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub include_drafts: bool,

    /// Include documents dated in the future.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub include_future: bool,

    /// Slug mode for routes and taxonomy terms.
    #[serde(default = "defaults::content::slug")]
    #[educe(Default = defaults::content::slug())]
    pub slug: SlugMode,
}

/// `[check]` section in quire.toml - validation strictness.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Warn about posts without any tag.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub require_tags: bool,

    /// Treat warnings as errors for the exit status.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub deny_warnings: bool,
}
