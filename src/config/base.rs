//! `[base]` section configuration.
//!
//! Site-wide metadata. Only `url` influences tool output (the `ref`
//! shortcode builds absolute links from it).

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};

/// `[base]` section in quire.toml - basic site metadata.
///
/// # Example
/// ```toml
/// [base]
/// title = "Lambdas All The Way Down"
/// author = "Alice"
/// url = "https://blog.example.com"
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BaseConfig {
    /// Site title.
    #[serde(default)]
    pub title: String,

    /// Default author for documents that do not name one.
    #[serde(default = "defaults::base::author")]
    #[educe(Default = defaults::base::author())]
    pub author: String,

    /// Site description.
    #[serde(default)]
    pub description: String,

    /// Base URL used by `ref` to build absolute links.
    #[serde(default = "defaults::base::url")]
    #[educe(Default = defaults::base::url())]
    pub url: Option<String>,

    /// BCP 47 language code.
    #[serde(default = "defaults::base::language")]
    #[educe(Default = defaults::base::language())]
    pub language: String,
}

#[cfg(test)]
mod tests {
    use super::super::SiteConfig;

    #[test]
    fn test_base_config_full() {
        let config = r#"
            [base]
            title = "Lambdas"
            description = "Essays on functional programming"
            author = "Alice"
            url = "https://blog.example.com"
            language = "de-DE"
        "#;
        let config: SiteConfig = toml::from_str(config).unwrap();

        assert_eq!(config.base.title, "Lambdas");
        assert_eq!(config.base.author, "Alice");
        assert_eq!(config.base.url.as_deref(), Some("https://blog.example.com"));
        assert_eq!(config.base.language, "de-DE");
    }

    #[test]
    fn test_base_config_defaults() {
        let config: SiteConfig = toml::from_str("[base]\ntitle = \"T\"").unwrap();

        assert_eq!(config.base.author, "<YOUR_NAME>");
        assert_eq!(config.base.language, "en-US");
        assert_eq!(config.base.url, None);
        assert_eq!(config.base.description, "");
    }

    #[test]
    fn test_unknown_field_rejection_in_base() {
        let config = "[base]\ntitle = \"T\"\ntheme = \"ananke\"";
        assert!(toml::from_str::<SiteConfig>(config).is_err());
    }
}
