//! Dependency graph for incremental rebuilds.
//!
//! Paths are interned into an arena and addressed by [`NodeId`]; edges are
//! kept in both directions so a source's previous dependencies can be
//! retracted when it is compiled again.
//!
//! ```text
//!   dependencies (forward)            dependents (reverse)
//!   index.html ─► layout.html         head.html ─► layout.html, index.html
//!   index.html ─► head.html           layout.html ─► index.html
//!   layout.html ─► head.html
//! ```
//!
//! A change to `head.html` walks the reverse edges and reaches
//! `layout.html` and `index.html`, each exactly once.

use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

/// Index of an interned path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    paths: Vec<PathBuf>,
    ids: FxHashMap<PathBuf, NodeId>,
    /// dependency -> things that use it
    dependents: Vec<FxHashSet<NodeId>>,
    /// dependent -> things it uses
    dependencies: Vec<FxHashSet<NodeId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, path: &Path) -> NodeId {
        if let Some(&id) = self.ids.get(path) {
            return id;
        }
        let id = NodeId(self.paths.len());
        self.paths.push(path.to_path_buf());
        self.ids.insert(path.to_path_buf(), id);
        self.dependents.push(FxHashSet::default());
        self.dependencies.push(FxHashSet::default());
        id
    }

    pub fn id(&self, path: &Path) -> Option<NodeId> {
        self.ids.get(path).copied()
    }

    pub fn path(&self, id: NodeId) -> &Path {
        &self.paths[id.index()]
    }

    /// Record `dependent` as using each of `dependencies`.
    ///
    /// Existing edges are left alone, so recording a pair twice is a no-op.
    pub fn record<I, P>(&mut self, dependent: &Path, dependencies: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let from = self.intern(dependent);
        for dep in dependencies {
            let to = self.intern(dep.as_ref());
            if to == from {
                continue;
            }
            self.dependents[to.index()].insert(from);
            self.dependencies[from.index()].insert(to);
        }
    }

    /// Replace everything `dependent` uses with `dependencies`.
    ///
    /// Edges from a previous compile that are not in the new set are removed.
    pub fn replace<I, P>(&mut self, dependent: &Path, dependencies: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let from = self.intern(dependent);
        for old in std::mem::take(&mut self.dependencies[from.index()]) {
            self.dependents[old.index()].remove(&from);
        }
        self.record(dependent, dependencies);
    }

    /// Direct dependents of `path`, in no particular order.
    pub fn dependents(&self, path: &Path) -> Vec<&Path> {
        self.id(path)
            .map(|id| {
                self.dependents[id.index()]
                    .iter()
                    .map(|&d| self.path(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct dependencies of `path`, in no particular order.
    #[cfg(test)]
    pub fn dependencies(&self, path: &Path) -> Vec<&Path> {
        self.id(path)
            .map(|id| {
                self.dependencies[id.index()]
                    .iter()
                    .map(|&d| self.path(d))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every path affected by a change to `changed`: all transitive
    /// dependents, each once, followed by `changed` itself.
    ///
    /// Order among dependents is unspecified. Cycles terminate.
    pub fn affected(&self, changed: &Path) -> Vec<PathBuf> {
        let mut order = Vec::new();

        if let Some(start) = self.id(changed) {
            let mut visited = FxHashSet::default();
            visited.insert(start);
            let mut stack: Vec<NodeId> = self.dependents[start.index()].iter().copied().collect();

            while let Some(id) = stack.pop() {
                if !visited.insert(id) {
                    continue;
                }
                order.push(self.path(id).to_path_buf());
                stack.extend(
                    self.dependents[id.index()]
                        .iter()
                        .filter(|d| !visited.contains(*d)),
                );
            }
        }

        order.push(changed.to_path_buf());
        order
    }

    /// Invoke `visit` for every path affected by `changed` (see [`Self::affected`]).
    pub fn walk(&self, changed: &Path, mut visit: impl FnMut(&Path)) {
        for path in self.affected(changed) {
            visit(&path);
        }
    }

    /// Number of interned paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }
}
