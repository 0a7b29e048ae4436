//! Stitch - a static site builder for Tera-templated pages.

mod build;
mod cli;
mod compiler;
mod config;
mod feed;
mod logger;
mod watch;

use anyhow::{Context, Result};
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use compiler::Compiler;
use config::SiteConfig;
use watch::{Shutdown, watch_site};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SiteConfig::load(&cli)?;
    if config.config_path.is_file() {
        log!("config"; "loaded {}", config.config_path.display());
    }

    match cli.command {
        Commands::Build => build_site(&mut Compiler::new(config.build.clone())).map(|_| ()),
        Commands::Watch => {
            let shutdown = Shutdown::new();
            let signal = shutdown.clone();
            ctrlc::set_handler(move || {
                log!("watch"; "shutting down...");
                signal.trigger();
            })
            .context("Failed to set Ctrl+C handler")?;

            watch_site(&config, shutdown)
        }
    }
}
