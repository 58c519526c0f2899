//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#false() -> bool {
    false
}

// ============================================================================
// [base] Section Defaults
// ============================================================================

pub mod base {
    pub fn url() -> Option<String> {
        None
    }

    pub fn author() -> String {
        "<YOUR_NAME>".into()
    }

    pub fn language() -> String {
        "en-US".into()
    }
}

// ============================================================================
// [content] Section Defaults
// ============================================================================

pub mod content {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn dir() -> PathBuf {
        "content".into()
    }

    pub fn static_dir() -> PathBuf {
        "static".into()
    }

    pub fn shortcodes() -> PathBuf {
        "layouts/shortcodes".into()
    }

    pub fn extensions() -> Vec<String> {
        vec!["md".into(), "markdown".into()]
    }

    pub fn post_sections() -> Vec<String> {
        vec!["posts".into()]
    }

    pub fn slug() -> super::super::SlugMode {
        super::super::SlugMode::On
    }
}
