//! Full site build.
//!
//! Walks the site root, compiles every page and mirrors it into the output
//! root. The template root and the output root are pruned from the walk.
//!
//! ```text
//! site/                         public/
//! ├── .templates/  (skipped)    ├── index.html
//! ├── index.html      ───────►  └── blog/
//! ├── index_meta.json               └── post.html
//! └── blog/post.html  ───────►
//! ```
//!
//! The first failing page aborts the build. When `[build.feed]` is enabled
//! the feed is written after the pages.

use crate::{compiler::Compiler, feed::build_feed, log};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Build every page under the site root. Returns the written output paths.
///
/// As a side effect the compiler's dependency graph covers every page.
pub fn build_site(compiler: &mut Compiler) -> Result<Vec<PathBuf>> {
    let pages = collect_pages(compiler)?;
    let root = compiler.config().root.clone();

    let mut written = Vec::with_capacity(pages.len());
    for page in &pages {
        log!("page"; "{}", rel_path(page, &root));
        let output = compiler
            .compile_and_write(page)
            .with_context(|| format!("Failed to build {}", page.display()))?;
        written.push(output);
    }
    build_feed(compiler)?;

    if written.is_empty() {
        log!("warn"; "no pages found under {}", root.display());
    } else {
        log!("build"; "done, {} pages", written.len());
    }

    Ok(written)
}

/// Every compilable page under the site root, in directory-walk order.
pub fn collect_pages(compiler: &Compiler) -> Result<Vec<PathBuf>> {
    let root = &compiler.config().root;
    let mut pages = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir()
                && (compiler.is_fragment(e.path()) || compiler.is_output(e.path())))
        });

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if compiler.is_compilable_page(entry.path(), entry.file_type().is_dir()) {
            pages.push(entry.into_path());
        }
    }

    Ok(pages)
}

/// `/site/blog/post.html` → `blog/post.html`
pub fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
