//! Command dispatch and shared setup.

pub mod conversations;
pub mod providers;
pub mod run;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use conduit_core::SqliteStore;
use conduit_llms::ProviderTable;

use crate::cli::{Cli, Command};

pub async fn handle(cli: Cli) -> Result<()> {
    let table = provider_table(cli.providers.as_deref())?;
    match cli.command {
        Command::Providers { action } => providers::handle(action, table).await,
        Command::Conversations { action } => conversations::handle(action).await,
        Command::Run {
            prompt,
            provider,
            model,
            conversation,
            workdir,
            max_iterations,
            token_threshold,
            max_tokens,
        } => {
            let args = run::RunArgs {
                prompt,
                provider,
                model,
                conversation,
                workdir,
                max_iterations,
                token_threshold,
                max_tokens,
            };
            run::handle(args, table).await
        }
    }
}

/// Built-in profiles, with `extra` merged over them when given.
fn provider_table(extra: Option<&Path>) -> Result<ProviderTable> {
    let table = ProviderTable::builtin().context("built-in provider table")?;
    match extra {
        Some(path) => {
            let extra = ProviderTable::load(path)
                .with_context(|| format!("loading providers from {}", path.display()))?;
            Ok(table.merge(extra)?)
        }
        None => Ok(table),
    }
}

fn workspace_root(workdir: Option<PathBuf>) -> Result<PathBuf> {
    match workdir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("current directory"),
    }
}

fn open_store(root: &Path) -> Result<SqliteStore> {
    SqliteStore::open(root).with_context(|| format!("opening conversation log under {}", root.display()))
}
