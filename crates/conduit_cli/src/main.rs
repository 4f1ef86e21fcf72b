//! CLI entry point for conduit.

mod cli;
mod commands;
mod output;

use std::path::Path;

use clap::Parser;
use conduit_observability::ObservabilityConfig;

use crate::cli::Cli;

/// Load env files without overriding variables already set.
/// Order: 1) `.env` in the nearest ancestor  2) `.conduit/env` in the nearest ancestor  3) `~/.conduit/env`
fn load_env_files() {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = find_upwards(&cwd, Path::new(".env")) {
            let _ = dotenvy::from_path(&path);
        }
        if let Some(path) = find_upwards(&cwd, &Path::new(".conduit").join("env")) {
            let _ = dotenvy::from_path(&path);
        }
    }
    if let Some(home) = dirs::home_dir() {
        let global = home.join(".conduit").join("env");
        if global.exists() {
            let _ = dotenvy::from_path(&global);
        }
    }
}

fn find_upwards(start: &Path, relative: &Path) -> Option<std::path::PathBuf> {
    start
        .ancestors()
        .take(32)
        .map(|dir| dir.join(relative))
        .find(|candidate| candidate.exists())
}

fn init_logging(verbose: bool) {
    let mut config = ObservabilityConfig::from_env()
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_console(verbose);
    if !verbose && config.log_level.is_none() {
        config = config.with_log_level("warn");
    }
    if let Err(e) = conduit_observability::init(config) {
        output::warning(&format!("logging disabled: {e}"));
    }
}

#[tokio::main]
async fn main() {
    load_env_files();
    let cli = Cli::parse();
    output::init(cli.output);
    init_logging(cli.verbose);

    let result = commands::handle(cli).await;
    conduit_observability::shutdown();

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}
