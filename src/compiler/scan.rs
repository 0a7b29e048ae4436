//! Template reference scanning.
//!
//! Finds the fragments a page pulls in through `{% include "..." %}`,
//! `{% extends "..." %}` and `{% import "..." as ... %}`, following each
//! fragment's own references until the whole set is known.
//!
//! ```text
//! index.html ──include──► layout.html ──include──► head.html
//!      │                                              ▲
//!      └──────────include──► nav.html ──include───────┘
//!
//! fragments (first-discovery order): layout.html, head.html, nav.html
//! ```

use super::CompileError;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::LazyLock,
};

/// Matches a statement that loads another named template. The name sits in
/// group 1, 2 or 3 depending on its quotes; group 4 holds the rest of the
/// statement (`ignore missing`, `as macros`).
static RE_TEMPLATE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{%-?\s*(?:include|extends|import)\s+(?:"([^"]+)"|'([^']+)'|`([^`]+)`)([^%]*?)-?%\}"#,
    )
    .unwrap()
});

static RE_IGNORE_MISSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bignore\s+missing\b").unwrap());

/// One template named by a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRef<'a> {
    pub name: &'a str,
    /// `{% include "x" ignore missing %}`: an absent fragment renders nothing.
    pub optional: bool,
}

/// A fragment under the template root, read once per scan.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Name used in directives: path relative to the template root, `/`-separated.
    pub name: String,
    pub path: PathBuf,
    pub source: String,
    /// Fragments this one references directly, deduplicated. Includes
    /// optional fragments that don't exist yet.
    pub references: Vec<PathBuf>,
}

/// Result of scanning a page.
#[derive(Debug, Clone)]
pub struct TemplateScan {
    pub source: String,
    /// Fragments referenced directly by the page.
    pub references: Vec<PathBuf>,
    /// Every fragment reachable from the page, deduplicated, in first-discovery order.
    pub fragments: Vec<Fragment>,
    /// Optional fragments that were referenced but absent on disk.
    pub missing: Vec<PathBuf>,
}

impl TemplateScan {
    /// Every path the page depends on through its templates: the fragments
    /// that were read and the optional ones that may appear later.
    pub fn fragment_paths(&self) -> impl Iterator<Item = &Path> {
        self.fragments
            .iter()
            .map(|f| f.path.as_path())
            .chain(self.missing.iter().map(PathBuf::as_path))
    }
}

/// Templates referenced by `source`, deduplicated by name, in order of
/// appearance. A name is optional only if every directive naming it is.
pub fn template_refs(source: &str) -> Vec<TemplateRef<'_>> {
    let mut refs: Vec<TemplateRef<'_>> = Vec::new();
    for caps in RE_TEMPLATE_REF.captures_iter(source) {
        let name = (1..=3)
            .find_map(|i| caps.get(i))
            .map_or("", |m| m.as_str())
            .trim();
        if name.is_empty() {
            continue;
        }
        let optional = caps
            .get(4)
            .is_some_and(|rest| RE_IGNORE_MISSING.is_match(rest.as_str()));

        match refs.iter_mut().find(|r| r.name == name) {
            Some(existing) => existing.optional &= optional,
            None => refs.push(TemplateRef { name, optional }),
        }
    }
    refs
}

/// Scans pages against one template root.
pub struct Scanner<'a> {
    templates: &'a Path,
}

/// Mutable state threaded through one recursive scan.
#[derive(Default)]
struct ScanState {
    fragments: Vec<Fragment>,
    /// Path -> index into `fragments`.
    discovered: FxHashMap<PathBuf, usize>,
    /// Fragments whose references are still being resolved, outermost first.
    resolving: Vec<PathBuf>,
    missing: Vec<PathBuf>,
}

impl<'a> Scanner<'a> {
    pub const fn new(templates: &'a Path) -> Self {
        Self { templates }
    }

    /// Read `page` and collect its transitive fragment set.
    ///
    /// Any read failure aborts the scan, except a missing fragment that every
    /// directive marks `ignore missing`. No partial result is returned.
    pub fn scan(&self, page: &Path) -> Result<TemplateScan, CompileError> {
        let source = read_source(page)?;
        let mut state = ScanState::default();
        let references = self.resolve_references(&source, &mut state)?;

        Ok(TemplateScan {
            source,
            references,
            fragments: state.fragments,
            missing: state.missing,
        })
    }

    /// Resolve every name referenced by `source`, visiting new fragments.
    fn resolve_references(
        &self,
        source: &str,
        state: &mut ScanState,
    ) -> Result<Vec<PathBuf>, CompileError> {
        let mut references = Vec::new();
        for TemplateRef { name, optional } in template_refs(source) {
            let path = self.templates.join(name);
            self.visit(name, &path, optional, state)?;
            references.push(path);
        }
        Ok(references)
    }

    fn visit(
        &self,
        name: &str,
        path: &Path,
        optional: bool,
        state: &mut ScanState,
    ) -> Result<(), CompileError> {
        if let Some(pos) = state.resolving.iter().position(|p| p == path) {
            let mut chain = state.resolving[pos..].to_vec();
            chain.push(path.to_path_buf());
            return Err(CompileError::Cycle(chain));
        }
        if state.discovered.contains_key(path) {
            return Ok(());
        }

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) if optional && err.kind() == io::ErrorKind::NotFound => {
                if !state.missing.iter().any(|p| p == path) {
                    state.missing.push(path.to_path_buf());
                }
                return Ok(());
            }
            Err(err) => return Err(CompileError::Read(path.to_path_buf(), err)),
        };

        let index = state.fragments.len();
        state.discovered.insert(path.to_path_buf(), index);
        state.fragments.push(Fragment {
            name: name.replace('\\', "/"),
            path: path.to_path_buf(),
            source: String::new(),
            references: Vec::new(),
        });

        state.resolving.push(path.to_path_buf());
        let references = self.resolve_references(&source, state)?;
        state.resolving.pop();

        let fragment = &mut state.fragments[index];
        fragment.source = source;
        fragment.references = references;
        Ok(())
    }
}

fn read_source(path: &Path) -> Result<String, CompileError> {
    fs::read_to_string(path).map_err(|err| CompileError::Read(path.to_path_buf(), err))
}
