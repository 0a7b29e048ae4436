//! Compilation error types.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Everything that can abort compiling a single page.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Page, fragment or sidecar could not be read.
    #[error("failed to read `{}`", .0.display())]
    Read(PathBuf, #[source] io::Error),

    /// Rendered output could not be written.
    #[error("failed to write `{}`", .0.display())]
    Write(PathBuf, #[source] io::Error),

    /// Fragments include each other. The chain starts and ends with the
    /// same fragment.
    #[error("template include cycle: {}", format_chain(.0))]
    Cycle(Vec<PathBuf>),

    /// Page or fragment markup failed to parse.
    #[error("template syntax error while compiling `{}`", .0.display())]
    Template(PathBuf, #[source] tera::Error),

    /// Sidecar file is not a JSON object.
    #[error("malformed data file `{}`", .0.display())]
    Data(PathBuf, #[source] serde_json::Error),

    /// Execution failed, e.g. an undefined variable.
    #[error("failed to render `{}`", .0.display())]
    Render(PathBuf, #[source] tera::Error),
}

fn format_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
