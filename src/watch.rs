//! File system watcher for incremental rebuilds.
//!
//! Builds the site once, then reacts to change events under the site root
//! by recompiling only the pages affected by the changed files.
//!
//! # Lifecycle
//!
//! ```text
//! Initializing ──► Building ──► Watching ──► Stopped
//!                  (full build)   │   ▲       (shutdown token or
//!                                 ▼   │        closed event channel)
//!                         Debouncer (quiet window)
//!                                 │
//!                                 ▼
//!                  DependencyGraph::walk(changed) per path
//!                                 │
//!                   pages only ──►└──► compile_and_write() once each
//! ```
//!
//! Rebuilds run one at a time on the watch thread. Errors inside the loop
//! are logged and the loop keeps going; a broken page keeps its previous
//! output until it compiles again.

use crate::{
    build::{build_site, rel_path},
    compiler::Compiler,
    config::{SiteConfig, WatchConfig, normalize_path},
    feed::{build_feed, is_feed_source},
    log,
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, RecvTimeoutError},
    },
    time::{Duration, Instant},
};

// =============================================================================
// Shutdown Token
// =============================================================================

/// Cancellation signal shared between the Ctrl+C handler and the watch loop.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Debounce State
// =============================================================================

/// Collects paths from a burst of events until the burst goes quiet.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    fn new(window: Duration) -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
            window,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty() && self.last_event.is_some_and(|t| t.elapsed() >= self.window)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    /// Wait no longer than the quiet window while paths are pending.
    fn timeout(&self, poll: Duration) -> Duration {
        if self.pending.is_empty() {
            poll
        } else {
            self.window.min(poll)
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Initializing,
    Building,
    Watching,
    Stopped,
}

/// Owns the compiler (and with it the dependency graph) for the lifetime
/// of a watch session.
pub struct WatchController {
    compiler: Compiler,
    poll_interval: Duration,
    debouncer: Debouncer,
    state: WatchState,
}

impl WatchController {
    pub fn new(compiler: Compiler, config: &WatchConfig) -> Self {
        Self {
            compiler,
            poll_interval: config.poll_interval(),
            debouncer: Debouncer::new(config.debounce()),
            state: WatchState::Initializing,
        }
    }

    #[cfg(test)]
    pub const fn state(&self) -> WatchState {
        self.state
    }

    /// Full build that seeds the dependency graph. Any failure is fatal here.
    pub fn initial_build(&mut self) -> Result<Vec<PathBuf>> {
        self.state = WatchState::Building;
        let written = build_site(&mut self.compiler)?;
        log!("watch"; "tracking {} files", self.compiler.graph().len());
        Ok(written)
    }

    /// Rebuild every page affected by any of `changed`, each page once.
    /// Returns the outputs written.
    ///
    /// Fragments reached by the walk only lead to further dependents; they
    /// have no output of their own. Failing pages are logged and skipped.
    pub fn handle_changes(&mut self, changed: &[PathBuf]) -> Vec<PathBuf> {
        let root = self.compiler.config().root.clone();
        let mut pages = Vec::new();
        let mut seen = FxHashSet::default();
        let mut triggers = Vec::new();
        let mut feed_dirty = false;

        for path in changed {
            let path = normalize_path(path);
            if is_temp_file(&path) || self.compiler.is_output(&path) {
                continue;
            }
            feed_dirty |= is_feed_source(&self.compiler, &path);

            let before = pages.len();
            let compiler = &self.compiler;
            compiler.graph().walk(&path, |p| {
                if compiler.is_compilable_page(p, p.is_dir())
                    && p.exists()
                    && seen.insert(p.to_path_buf())
                {
                    pages.push(p.to_path_buf());
                }
            });
            if pages.len() > before {
                triggers.push(path);
            }
        }

        let mut written = Vec::with_capacity(pages.len());
        if !pages.is_empty() {
            let names: Vec<_> = triggers.iter().map(|p| rel_path(p, &root)).collect();
            match (triggers.as_slice(), pages.as_slice()) {
                ([trigger], [only]) if trigger == only => {
                    log!("watch"; "{} changed", names.join(", "));
                }
                _ => log!("watch"; "{} changed, rebuilding {} pages", names.join(", "), pages.len()),
            }
        }

        for page in &pages {
            match self.compiler.compile_and_write(page) {
                Ok(output) => {
                    log!("page"; "{}", rel_path(page, &root));
                    written.push(output);
                }
                Err(err) => {
                    let err = anyhow::Error::new(err);
                    log!("error"; "{}: {err:#}", rel_path(page, &root));
                }
            }
        }

        if feed_dirty && let Err(err) = build_feed(&mut self.compiler) {
            log!("error"; "feed: {err:#}");
        }
        written
    }

    /// Rebuild whatever the debouncer has collected so far.
    fn flush(&mut self) {
        let paths = self.debouncer.take();
        if !paths.is_empty() {
            self.handle_changes(&paths);
        }
    }

    /// Drain events until the shutdown token fires or the channel closes.
    ///
    /// Runs the initial build first if it hasn't happened yet.
    pub fn run(&mut self, rx: &Receiver<notify::Result<Event>>, shutdown: &Shutdown) -> Result<()> {
        if self.state == WatchState::Initializing {
            self.initial_build()?;
        }
        self.state = WatchState::Watching;

        loop {
            if shutdown.is_triggered() {
                break;
            }
            match rx.recv_timeout(self.debouncer.timeout(self.poll_interval)) {
                Ok(Ok(event)) if is_relevant(&event) => self.debouncer.add(event),
                Ok(Err(e)) => log!("error"; "watch: {e}"),
                Err(RecvTimeoutError::Disconnected) => {
                    self.flush();
                    break;
                }
                // irrelevant events, timeouts
                _ => {}
            }
            if self.debouncer.ready() {
                self.flush();
            }
        }

        self.state = WatchState::Stopped;
        Ok(())
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Build the site, then watch its root and rebuild affected pages until
/// `shutdown` fires.
pub fn watch_site(config: &SiteConfig, shutdown: Shutdown) -> Result<()> {
    let root = config.get_root();
    let mut controller = WatchController::new(Compiler::new(config.build.clone()), &config.watch);
    controller.initial_build()?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;
    log!("watch"; "watching {}", root.display());
    if config.build.output_inside_root() {
        log!("watch"; "ignoring output under {}", config.build.output.display());
    }

    controller.run(&rx, &shutdown)?;

    watcher
        .unwatch(root)
        .with_context(|| format!("Failed to unwatch {}", root.display()))?;
    log!("watch"; "stopped");
    Ok(())
}
