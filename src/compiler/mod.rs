//! Page compilation and dependency tracking.
//!
//! - **scan**: Find the fragments a page references, transitively
//! - **deps**: Reverse dependency graph consulted by watch mode
//! - **page**: Render a page against its fragments and sidecar data
//!
//! # Compile Flow
//!
//! ```text
//! Scanner::scan(page) ──► DependencyGraph::replace ──► Tera set ──► render
//!        │                        ▲                                 ▲
//!        ▼                        │                                 │
//!   TemplateScan           sidecar recorded ──── load_data ─────────┘
//! ```
//!
//! The [`Compiler`] owns the graph; every compile refreshes the edges of
//! the page and of each fragment it scanned.

pub mod deps;
mod error;
mod page;
pub mod scan;

use crate::config::BuildConfig;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub use error::CompileError;
pub use page::parse_data;

use deps::DependencyGraph;
use scan::TemplateScan;

/// Compiles pages of one site and remembers what each page depends on.
#[derive(Debug)]
pub struct Compiler {
    config: BuildConfig,
    graph: DependencyGraph,
}

impl Compiler {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            graph: DependencyGraph::new(),
        }
    }

    pub const fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Whether `path` is a page the build renders on its own.
    ///
    /// True for non-directory files with the page extension that sit under
    /// the site root but not under the template root (fragments) or the
    /// output root (rendered pages).
    pub fn is_compilable_page(&self, path: &Path, is_dir: bool) -> bool {
        !is_dir
            && path
                .extension()
                .is_some_and(|ext| ext == self.config.page_extension.as_str())
            && path.starts_with(&self.config.root)
            && !self.is_fragment(path)
            && !self.is_output(path)
    }

    /// Whether `path` lies under the template root.
    pub fn is_fragment(&self, path: &Path) -> bool {
        path.starts_with(&self.config.templates)
    }

    /// Whether `path` lies under the output root.
    pub fn is_output(&self, path: &Path) -> bool {
        path.starts_with(&self.config.output)
    }

    /// `<output>/<page relative to root>`, or `None` for pages outside the root.
    pub fn output_path(&self, page: &Path) -> Option<PathBuf> {
        page.strip_prefix(&self.config.root)
            .ok()
            .map(|rel| self.config.output.join(rel))
    }

    /// Sidecar data path: the page's extension replaced by the data suffix.
    ///
    /// `about/index.html` → `about/index_meta.json`
    pub fn data_path(&self, page: &Path) -> PathBuf {
        let mut name = page.file_stem().unwrap_or_default().to_os_string();
        name.push(&self.config.data_suffix);
        page.with_file_name(name)
    }

    /// Compile `page` and write it to its mirrored output path.
    ///
    /// Output is only touched after a successful compile, so a failing page
    /// keeps its previous rendering. Returns the written path.
    pub fn compile_and_write(&mut self, page: &Path) -> Result<PathBuf, CompileError> {
        let output = self.output_path(page).ok_or_else(|| {
            CompileError::Write(
                page.to_path_buf(),
                io::Error::new(io::ErrorKind::InvalidInput, "page is outside the site root"),
            )
        })?;

        let bytes = self.compile(page)?;
        write_output(&output, &bytes)?;
        Ok(output)
    }
}

/// Write `bytes` to `path`, creating missing parent directories.
fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CompileError> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    };
    write().map_err(|err| CompileError::Write(path.to_path_buf(), err))
}
