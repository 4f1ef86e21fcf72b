//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Run tool-calling conversations against any configured model provider
#[derive(Parser)]
#[command(name = "conduit", about, version, propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log to stderr (RUST_LOG still controls the filter)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: text (human-readable) or json (machine-readable)
    #[arg(short, long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Extra provider profiles (TOML), merged over the built-in table
    #[arg(long, global = true, env = "CONDUIT_PROVIDERS")]
    pub providers: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output for humans
    #[default]
    Text,
    /// Structured JSON for scripts
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect and test provider profiles
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },
    /// Inspect stored conversations
    Conversations {
        #[command(subcommand)]
        action: ConversationsAction,
    },
    /// Send one prompt and run the conversation until the model answers
    Run {
        /// Prompt to append as the next user message
        prompt: String,
        /// Provider profile id (default: CONDUIT_PROVIDER or deepseek)
        #[arg(long, env = "CONDUIT_PROVIDER")]
        provider: Option<String>,
        /// Model override for the profile's default
        #[arg(long)]
        model: Option<String>,
        /// Continue this stored conversation instead of starting a new one
        #[arg(short, long)]
        conversation: Option<String>,
        /// Workspace root holding the conversation DB (default: current directory)
        #[arg(long)]
        workdir: Option<PathBuf>,
        /// Maximum tool rounds before the run is stopped
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Estimated token count that triggers compression
        #[arg(long)]
        token_threshold: Option<u64>,
        /// Maximum tokens for each model reply
        #[arg(long)]
        max_tokens: Option<u32>,
    },
}

#[derive(Subcommand)]
pub enum ProvidersAction {
    /// List every profile in the table
    List,
    /// Show one profile: endpoint, metadata fields, prices
    Info {
        /// Provider ID
        provider: String,
    },
    /// Send a one-line prompt and report latency and cost
    Test {
        /// Provider ID
        provider: String,
        /// Model override
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConversationsAction {
    /// List stored conversations, most recent first
    List {
        /// Workspace root (default: current directory)
        #[arg(long)]
        workdir: Option<PathBuf>,
    },
    /// Print the messages of one conversation
    Show {
        /// Conversation ID
        id: String,
        /// Workspace root (default: current directory)
        #[arg(long)]
        workdir: Option<PathBuf>,
    },
}
