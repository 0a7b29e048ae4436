//! rss feed generation for articles.
//!
//! Every article listed in `[build.feed]` becomes one item. The item body is
//! rendered through [`Compiler::compile`] from a throwaway page that only
//! includes the article's content fragment, with the article's sidecar
//! copied next to it as data. Title and `updated` come from the sidecar.

use crate::{
    build::rel_path,
    compiler::{Compiler, parse_data},
    config::FeedConfig,
    log,
};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use rss::{ChannelBuilder, GuidBuilder, ItemBuilder, validation::Validate};
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

// ============================================================================
// Public API
// ============================================================================

/// Write the feed if enabled. Returns the written path.
pub fn build_feed(compiler: &mut Compiler) -> Result<Option<PathBuf>> {
    let feed = compiler.config().feed.clone();
    if !feed.enable {
        return Ok(None);
    }

    let scratch = TempDir::new().context("Failed to create scratch directory for feed")?;
    let root = compiler.config().root.clone();

    let mut items = Vec::with_capacity(feed.articles.len());
    for article in &feed.articles {
        let page = root.join(article);
        let entry = FeedEntry::load(compiler, &feed, &page, scratch.path())
            .with_context(|| format!("feed entry {}", rel_path(&page, &root)))?;
        items.push(entry.into_item());
    }

    let path = compiler.config().output.join(&feed.path);
    write_channel(&feed, items, &path)?;
    log!("feed"; "{}", feed.path.display());
    Ok(Some(path))
}

/// Whether a change to `path` can alter the feed: an article, an article's
/// sidecar, or anything under the template root.
pub fn is_feed_source(compiler: &Compiler, path: &Path) -> bool {
    let config = compiler.config();
    if !config.feed.enable {
        return false;
    }
    compiler.is_fragment(path)
        || config.feed.articles.iter().any(|article| {
            let page = config.root.join(article);
            path == page || path == compiler.data_path(&page)
        })
}

// ============================================================================
// Entries
// ============================================================================

/// One article, rendered and ready to become an rss item.
#[derive(Debug)]
struct FeedEntry {
    title: String,
    link: String,
    updated: Option<String>,
    content: String,
}

impl FeedEntry {
    fn load(compiler: &mut Compiler, feed: &FeedConfig, page: &Path, scratch: &Path) -> Result<Self> {
        let data_path = compiler.data_path(page);
        let raw = fs::read_to_string(&data_path)
            .with_context(|| format!("Failed to read {}", data_path.display()))?;
        let data = parse_data(&data_path, &raw)?;

        let file_name = page
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("article `{}` has no file name", page.display()))?;
        let content = render_content(compiler, &feed.content_template(&file_name), &raw, scratch)?;

        let root = &compiler.config().root;
        let title = string_field(&data, "title").unwrap_or_else(|| {
            page.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Ok(Self {
            title,
            link: feed.page_url(&rel_path(page, root).replace('\\', "/")),
            updated: string_field(&data, "updated"),
            content,
        })
    }

    fn into_item(self) -> rss::Item {
        let pub_date = self.updated.as_deref().and_then(to_rfc2822);
        ItemBuilder::default()
            .title(self.title)
            .link(Some(self.link.clone()))
            .guid(GuidBuilder::default().permalink(true).value(self.link).build())
            .pub_date(pub_date)
            .content(self.content)
            .build()
    }
}

/// Compile a page that includes `template` against `raw_data`.
///
/// The page lives in `scratch` and is dropped from the dependency graph
/// afterwards; the fragments it pulled in keep their own edges.
fn render_content(
    compiler: &mut Compiler,
    template: &str,
    raw_data: &str,
    scratch: &Path,
) -> Result<String> {
    let page = scratch.join(format!("entry.{}", compiler.config().page_extension));
    fs::write(&page, format!("{{% include \"{template}\" %}}"))
        .with_context(|| format!("Failed to write {}", page.display()))?;
    let data_path = compiler.data_path(&page);
    fs::write(&data_path, raw_data)
        .with_context(|| format!("Failed to write {}", data_path.display()))?;

    let compiled = compiler.compile(&page);
    compiler.forget(&page);

    String::from_utf8(compiled?).context("feed entry is not valid utf-8")
}

fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates.
fn to_rfc2822(date: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(date)
        .map(|dt| dt.to_rfc2822())
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc().to_rfc2822())
        })
}

// ============================================================================
// Channel
// ============================================================================

fn write_channel(feed: &FeedConfig, items: Vec<rss::Item>, path: &Path) -> Result<()> {
    let mut channel = ChannelBuilder::default()
        .title(&feed.title)
        .link(feed.site_url())
        .description(&feed.subtitle)
        .generator("stitch".to_string())
        .last_build_date(Utc::now().to_rfc2822())
        .items(items)
        .build();
    if !feed.email.is_empty() {
        channel.set_managing_editor(format!("{} ({})", feed.email, feed.author));
    }

    channel
        .validate()
        .map_err(|e| anyhow!("rss validation failed: {e}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, channel.to_string())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuildConfig;

    struct Blog {
        _dir: TempDir,
        root: PathBuf,
        compiler: Compiler,
    }

    impl Blog {
        fn new(articles: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().canonicalize().unwrap();
            let mut config = BuildConfig::for_root(&root);
            config.feed.enable = true;
            config.feed.domain = "example.com".into();
            config.feed.title = "Notes".into();
            config.feed.articles = articles.iter().map(PathBuf::from).collect();
            Self {
                _dir: dir,
                root,
                compiler: Compiler::new(config),
            }
        }

        fn write(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_to_rfc2822() {
        let date = to_rfc2822("2024-01-02T03:04:05Z").unwrap();
        assert!(date.starts_with("Tue,"));
        assert!(date.contains("Jan 2024 03:04:05"));
        assert!(to_rfc2822("2024-01-02").unwrap().contains("Jan 2024 00:00:00"));
        assert_eq!(to_rfc2822("last tuesday"), None);
    }

    #[test]
    fn test_entry_renders_content_fragment_with_sidecar() {
        let mut blog = Blog::new(&["posts/hello.html"]);
        blog.write("posts/hello.html", "<article>{{ title }}</article>");
        blog.write(
            "posts/hello_meta.json",
            r#"{"title": "Hello", "updated": "2024-01-02T03:04:05Z"}"#,
        );
        blog.write(".templates/.data/hello.html/content.html", "<p>{{ title }}</p>");

        let feed = blog.compiler.config().feed.clone();
        let scratch = TempDir::new().unwrap();
        let page = blog.root.join("posts/hello.html");
        let entry = FeedEntry::load(&mut blog.compiler, &feed, &page, scratch.path()).unwrap();

        assert_eq!(entry.title, "Hello");
        assert_eq!(entry.link, "https://example.com/posts/hello.html");
        assert_eq!(entry.content, "<p>Hello</p>");

        let item = entry.into_item();
        assert_eq!(item.title(), Some("Hello"));
        assert_eq!(item.content(), Some("<p>Hello</p>"));
        assert!(item.pub_date().unwrap().contains("Jan 2024"));
    }

    #[test]
    fn test_entry_title_falls_back_to_file_stem() {
        let mut blog = Blog::new(&["first.html"]);
        blog.write("first_meta.json", "{}");
        blog.write(".templates/.data/first.html/content.html", "body");

        let feed = blog.compiler.config().feed.clone();
        let scratch = TempDir::new().unwrap();
        let page = blog.root.join("first.html");
        let entry = FeedEntry::load(&mut blog.compiler, &feed, &page, scratch.path()).unwrap();
        assert_eq!(entry.title, "first");
        assert_eq!(entry.updated, None);
    }

    #[test]
    fn test_build_feed_writes_channel() {
        let mut blog = Blog::new(&["a.html", "b.html"]);
        for name in ["a", "b"] {
            blog.write(&format!("{name}.html"), name);
            blog.write(&format!("{name}_meta.json"), &format!(r#"{{"title": "{name}"}}"#));
            blog.write(&format!(".templates/.data/{name}.html/content.html"), name);
        }

        let path = build_feed(&mut blog.compiler).unwrap().unwrap();
        assert_eq!(path, blog.root.join("public/feed.xml"));

        let channel = rss::Channel::read_from(&fs::read(&path).unwrap()[..]).unwrap();
        assert_eq!(channel.title(), "Notes");
        assert_eq!(channel.link(), "https://example.com");
        let links: Vec<_> = channel.items().iter().filter_map(|i| i.link()).collect();
        assert_eq!(
            links,
            vec!["https://example.com/a.html", "https://example.com/b.html"]
        );
    }

    #[test]
    fn test_build_feed_leaves_no_scratch_edges() {
        let mut blog = Blog::new(&["a.html"]);
        blog.write("a.html", "a");
        blog.write("a_meta.json", "{}");
        let content = blog.write(".templates/.data/a.html/content.html", "a");

        build_feed(&mut blog.compiler).unwrap();
        assert!(blog.compiler.graph().dependents(&content).is_empty());
    }

    #[test]
    fn test_build_feed_disabled() {
        let mut blog = Blog::new(&[]);
        let mut config = blog.compiler.config().clone();
        config.feed.enable = false;
        blog.compiler = Compiler::new(config);
        assert_eq!(build_feed(&mut blog.compiler).unwrap(), None);
    }

    #[test]
    fn test_build_feed_missing_sidecar_fails() {
        let mut blog = Blog::new(&["a.html"]);
        blog.write("a.html", "a");
        blog.write(".templates/.data/a.html/content.html", "a");
        let err = build_feed(&mut blog.compiler).unwrap_err();
        assert!(format!("{err:#}").contains("a_meta.json"));
    }

    #[test]
    fn test_is_feed_source() {
        let blog = Blog::new(&["posts/a.html"]);
        let c = &blog.compiler;
        assert!(is_feed_source(c, &blog.root.join("posts/a.html")));
        assert!(is_feed_source(c, &blog.root.join("posts/a_meta.json")));
        assert!(is_feed_source(c, &blog.root.join(".templates/.data/a.html/content.html")));
        assert!(!is_feed_source(c, &blog.root.join("posts/b.html")));
    }
}
