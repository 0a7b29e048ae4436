//! `[build]` section configuration.
//!
//! Where pages, fragments, sidecar data and rendered output live.

use super::{FeedConfig, defaults};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `[build]` section in stitch.toml.
///
/// # Example
/// ```toml
/// [build]
/// root = "."                 # Site root, pages live anywhere below it
/// output = "public"          # Rendered pages mirror the root layout here
/// templates = ".templates"   # Fragments, never rendered on their own
/// page_extension = "html"
/// data_suffix = "_meta.json" # index.html reads index_meta.json
///
/// [build.feed]
/// enable = false
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Site root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: PathBuf,

    /// Output root directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Template fragment directory.
    #[serde(default = "defaults::build::templates")]
    #[educe(Default = defaults::build::templates())]
    pub templates: PathBuf,

    /// Extension (without dot) marking a file as a renderable page.
    #[serde(default = "defaults::build::page_extension")]
    #[educe(Default = defaults::build::page_extension())]
    pub page_extension: String,

    /// Suffix replacing the page extension to locate its sidecar data file.
    #[serde(default = "defaults::build::data_suffix")]
    #[educe(Default = defaults::build::data_suffix())]
    pub data_suffix: String,

    /// Article feed settings.
    #[serde(default)]
    pub feed: FeedConfig,
}

impl BuildConfig {
    /// Layout rooted at `root` with default relative directories joined onto it.
    ///
    /// Paths are used as given; callers pass absolute roots.
    pub fn for_root(root: &Path) -> Self {
        let defaults = Self::default();
        Self {
            root: root.to_path_buf(),
            output: root.join(&defaults.output),
            templates: root.join(&defaults.templates),
            ..defaults
        }
    }

    /// Whether the output root lives inside the site root.
    pub fn output_inside_root(&self) -> bool {
        self.output.starts_with(&self.root)
    }
}
