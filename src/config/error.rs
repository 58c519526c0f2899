//! Errors raised while loading and validating `quire.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no quire.toml at `{0}`")]
    NotFound(PathBuf),

    #[error("cannot read `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("quire.toml is not valid TOML")]
    Toml(#[from] toml::de::Error),

    /// A field that parsed but holds an unusable value. `field` is the dotted
    /// key as written in the file, e.g. `base.url`.
    #[error("[{field}] {reason}")]
    Field { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Field {
            field,
            reason: reason.into(),
        }
    }
}
