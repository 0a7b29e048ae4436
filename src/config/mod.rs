//! Site configuration management for `stitch.toml`.
//!
//! The config file is optional; every field has a default and CLI flags
//! override the file.
//!
//! # Sections
//!
//! | Section     | Purpose                                          |
//! |-------------|--------------------------------------------------|
//! | `[build]`   | Site root, output, templates, page/data naming   |
//! | `[build.feed]` | Article feed written alongside the pages      |
//! | `[watch]`   | Watch loop settings                              |
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "www"
//! templates = ".templates"
//!
//! [watch]
//! poll_interval_ms = 100
//! ```

mod build;
pub mod defaults;
mod error;
mod feed;
mod watch;

pub use build::BuildConfig;
pub use feed::FeedConfig;
pub use watch::WatchConfig;

use error::ConfigError;

use crate::cli::Cli;
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

/// Root configuration structure representing stitch.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading, may not exist)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load `stitch.toml` (or the `--config` name) from the site root if it
    /// exists, then apply CLI overrides and normalize all paths.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.build.root
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.templates, cli.templates.as_ref());

        // `--root` names the site root directly; the `root` key in the file
        // is relative to the directory holding the file.
        let base = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        let root = match &cli.root {
            Some(_) => base.clone(),
            None => base.join(&self.build.root),
        };

        self.config_path = normalize_path(&base.join(&cli.config));
        self.update_path_with_root(&root);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve build paths against the root and make them absolute
    fn update_path_with_root(&mut self, root: &Path) {
        let root = normalize_path(root);
        self.build.output = normalize_path(&root.join(&self.build.output));
        self.build.templates = normalize_path(&root.join(&self.build.templates));
        self.build.root = root;
    }

    /// Validate configuration after paths are resolved
    pub fn validate(&self) -> Result<()> {
        let build = &self.build;

        if !build.root.is_dir() {
            bail!(ConfigError::Validation(format!(
                "site root `{}` is not a directory",
                build.root.display()
            )));
        }

        if build.page_extension.is_empty() || build.page_extension.starts_with('.') {
            bail!(ConfigError::Validation(
                "[build.page_extension] must be a non-empty extension without a leading dot".into()
            ));
        }

        if build.data_suffix.is_empty() {
            bail!(ConfigError::Validation(
                "[build.data_suffix] must not be empty".into()
            ));
        }

        // A sidecar named like a page would be rendered as one
        if build
            .data_suffix
            .ends_with(&format!(".{}", build.page_extension))
        {
            bail!(ConfigError::Validation(
                "[build.data_suffix] must not end with the page extension".into()
            ));
        }

        // Only the site root is watched
        let inside_root = build
            .templates
            .strip_prefix(&build.root)
            .is_ok_and(|rel| !rel.components().any(|c| c == Component::ParentDir));
        if !inside_root {
            bail!(ConfigError::Validation(format!(
                "[build.templates] `{}` must be inside the site root",
                build.templates.display()
            )));
        }

        if build.feed.enable && build.feed.domain.trim().is_empty() {
            bail!(ConfigError::Validation(
                "[build.feed.domain] is required when the feed is enabled".into()
            ));
        }

        if build.output == build.root {
            bail!(ConfigError::Validation(
                "[build.output] must differ from the site root".into()
            ));
        }

        if self.watch.poll_interval_ms == 0 {
            bail!(ConfigError::Validation(
                "[watch.poll_interval_ms] must be greater than zero".into()
            ));
        }

        Ok(())
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists.
///
/// Paths coming from the file watcher go through this too, so keys in the
/// dependency graph compare equal regardless of how a path was spelled.
pub fn normalize_path(path: &Path) -> PathBuf {
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
