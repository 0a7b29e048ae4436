//! `[build.feed]` section configuration.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build.feed]` section in stitch.toml - rss feed of articles.
///
/// # Example
/// ```toml
/// [build.feed]
/// enable = true
/// domain = "example.com"
/// title = "Notes"
/// articles = ["posts/first.html", "posts/second.html"]
/// ```
///
/// Each article's item body comes from the fragment
/// `<templates>/<content_dir>/<article file name>/content.html`, rendered
/// with the article's sidecar data. Title and `updated` date are read from
/// the sidecar.
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Write the feed on every build.
    #[serde(default)]
    pub enable: bool,

    /// Feed file path, relative to the output root.
    #[serde(default = "defaults::feed::path")]
    #[educe(Default = defaults::feed::path())]
    pub path: PathBuf,

    /// Site domain without scheme, e.g. `example.com`.
    #[serde(default)]
    pub domain: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub subtitle: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub email: String,

    /// Article pages, relative to the site root, in feed order.
    #[serde(default)]
    pub articles: Vec<PathBuf>,

    /// Directory under the template root holding per-article content fragments.
    #[serde(default = "defaults::feed::content_dir")]
    #[educe(Default = defaults::feed::content_dir())]
    pub content_dir: String,
}

impl FeedConfig {
    /// `https://<domain>`, without a trailing slash.
    pub fn site_url(&self) -> String {
        format!("https://{}", self.domain.trim_end_matches('/'))
    }

    /// Absolute link to a page given its `/`-separated path under the root.
    pub fn page_url(&self, rel: &str) -> String {
        format!("{}/{}", self.site_url(), rel.trim_start_matches('/'))
    }

    /// Template name of the content fragment for an article file name.
    pub fn content_template(&self, article_name: &str) -> String {
        format!(
            "{}/{article_name}/content.html",
            self.content_dir.trim_end_matches('/')
        )
    }
}
