//! File category classification for watch mode.
//!
//! | Category    | On change                          | Example Files                  |
//! |-------------|------------------------------------|--------------------------------|
//! | Content     | Re-check (changed files re-parsed) | `content/posts/*.md`           |
//! | Shortcodes  | Re-check with reloaded templates   | `layouts/shortcodes/*.html`    |
//! | Static      | Re-check image references          | `static/img/*`                 |
//! | Config      | Reload config, full re-check       | `quire.toml`                   |
//! | Unknown     | Ignored                            | Files outside watched dirs     |

use crate::config::SiteConfig;
use std::{
    env,
    path::{Path, PathBuf},
};

/// Category of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Content,
    Shortcodes,
    Static,
    /// Site configuration (quire.toml); invalidates every cached parse
    Config,
    /// File outside watched directories
    Unknown,
}

impl FileCategory {
    pub const WATCHED: &[Self] = &[Self::Content, Self::Shortcodes, Self::Static, Self::Config];

    /// Watched location of this category, if any.
    pub fn path(self, config: &SiteConfig) -> Option<&Path> {
        match self {
            Self::Content => Some(config.content.dir.as_path()),
            Self::Shortcodes => Some(config.content.shortcodes.as_path()),
            Self::Static => Some(config.content.static_dir.as_path()),
            Self::Config => Some(config.config_path.as_path()),
            Self::Unknown => None,
        }
    }

    /// Returns true if this category represents a directory (vs a single file)
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::Content | Self::Shortcodes | Self::Static)
    }
}

/// Categorize a file path to determine how a change is handled.
///
/// The shortcode directory is tested before the content directory so a
/// template directory nested inside content still counts as templates.
pub fn categorize_path(path: &Path, config: &SiteConfig) -> FileCategory {
    let path = normalize_path(path);

    if path == config.config_path {
        FileCategory::Config
    } else if path.starts_with(&config.content.shortcodes) {
        FileCategory::Shortcodes
    } else if path.starts_with(&config.content.dir) {
        FileCategory::Content
    } else if path.starts_with(&config.content.static_dir) {
        FileCategory::Static
    } else {
        FileCategory::Unknown
    }
}

/// Check if path is a temp/backup file (editor artifacts).
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Config paths are already canonicalized, so incoming watcher paths must be
/// canonicalized as well before comparison.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}
