//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading `stitch.toml` or checking the resolved layout.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid config file")]
    Toml(#[from] toml::de::Error),

    #[error("invalid site layout: {0}")]
    Validation(String),
}
