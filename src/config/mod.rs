//! Site configuration management for `quire.toml`.
//!
//! # Sections
//!
//! | Section        | Purpose                                          |
//! |----------------|--------------------------------------------------|
//! | `[base]`       | Site metadata (title, author, url)               |
//! | `[content]`    | Content/static/shortcode paths, classification   |
//! | `[check]`      | Validation strictness                            |
//! | `[shortcodes]` | Inline shortcode templates                       |
//! | `[extra]`      | User-defined custom fields                       |
//!
//! # Example
//!
//! ```toml
//! [base]
//! title = "My Blog"
//! url = "https://example.com"
//!
//! [content]
//! dir = "content"
//! post_sections = ["posts"]
//!
//! [shortcodes]
//! youtube = '<iframe src="https://www.youtube.com/embed/{{ .Get 0 }}"></iframe>'
//! ```

mod base;
mod content;
pub mod defaults;
mod error;

pub use content::SlugMode;

use base::BaseConfig;
use content::{CheckConfig, ContentConfig};
use error::ConfigError;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing quire.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Basic site information
    #[serde(default)]
    pub base: BaseConfig,

    /// Content tree settings
    #[serde(default)]
    pub content: ContentConfig,

    /// Validation settings
    #[serde(default)]
    pub check: CheckConfig,

    /// Inline shortcode templates, name → template source
    #[serde(default)]
    pub shortcodes: BTreeMap<String, String>,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.content.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.content.root = Some(path.to_path_buf())
    }

    /// Base URL without a trailing slash, empty when unset.
    pub fn base_url(&self) -> &str {
        self.base.url.as_deref().unwrap_or_default().trim_end_matches('/')
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let base = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        let root = match &cli.command {
            Commands::Init { name: Some(name) } => base.join(name),
            _ => base,
        };

        self.update_path_with_root(&root, cli);

        match &cli.command {
            Commands::Check {
                filter,
                deny_warnings,
                ..
            } => {
                self.apply_filter(filter.drafts, filter.future);
                self.check.deny_warnings |= *deny_warnings;
            }
            Commands::List { filter, .. }
            | Commands::Taxonomy { filter, .. }
            | Commands::Index { filter, .. } => self.apply_filter(filter.drafts, filter.future),
            // A document must be loadable to be rendered, whatever its state.
            Commands::Render { .. } => self.apply_filter(true, true),
            Commands::Init { .. } => {}
        }
    }

    fn apply_filter(&mut self, drafts: bool, future: bool) {
        self.content.include_drafts |= drafts;
        self.content.include_future |= future;
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, cli: &Cli) {
        if let Some(content) = &cli.content {
            self.content.dir = content.clone();
        }

        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.content.dir = Self::normalize_path(&root.join(Self::expand(&self.content.dir)));
        self.content.static_dir =
            Self::normalize_path(&root.join(Self::expand(&self.content.static_dir)));
        self.content.shortcodes =
            Self::normalize_path(&root.join(Self::expand(&self.content.shortcodes)));
    }

    /// Tilde expansion for user-supplied paths.
    fn expand(path: &Path) -> PathBuf {
        match path.to_str() {
            Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
            None => path.to_path_buf(),
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self, cli: &Cli) -> Result<()> {
        if cli.is_init() {
            return Ok(());
        }

        if !self.config_path.exists() {
            bail!(ConfigError::NotFound(self.config_path.clone()));
        }

        if let Some(base_url) = &self.base.url
            && !base_url.starts_with("http")
        {
            bail!(ConfigError::field(
                "base.url",
                "must start with http:// or https://"
            ));
        }

        if self.content.extensions.is_empty() {
            bail!(ConfigError::field(
                "content.extensions",
                "must have at least one element"
            ));
        }

        if !self.content.dir.is_dir() {
            bail!(ConfigError::field(
                "content.dir",
                format!("`{}` is not a directory", self.content.dir.display())
            ));
        }

        Ok(())
    }
}
