use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod clean;
mod cli;
mod config;
mod llm;
mod pipeline;
mod stats;
mod util;

#[derive(Parser)]
#[command(name = "kbsmith", version)]
#[command(about = "Knowledge-base utilities: clean documents, generate and test a Scrypto blueprint, refresh README stats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a blueprint with the model, run its tests, retry once on failure
    Generate {
        /// Prompt to send to the LLM
        #[arg(short = 'p', long)]
        prompt: Option<String>,

        /// Path to config file (defaults to ./kbsmith.toml or ~/.config/kbsmith/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Override LLM model (e.g., "gpt-4o-mini")
        #[arg(long)]
        model: Option<String>,

        /// Override LLM provider (openai, openai-compatible, anthropic)
        #[arg(long)]
        provider: Option<String>,

        /// Package directory to generate into
        #[arg(long)]
        workspace: Option<PathBuf>,

        /// Verification command, e.g. --verify cargo --verify test
        #[arg(long = "verify", num_args = 1)]
        verify: Option<Vec<String>>,

        /// Skip the model and test the built-in blueprint
        #[arg(long, conflicts_with = "dry_run")]
        offline: bool,

        /// Use mock LLM client for testing
        #[arg(long)]
        dry_run: bool,
    },

    /// Strip markup from raw documents into cleaned text
    Clean {
        #[arg(long)]
        config: Option<String>,

        /// Source directory (default: kb/raw)
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Destination directory (default: kb/clean)
        #[arg(short = 'o', long)]
        out: Option<PathBuf>,
    },

    /// Rewrite the README "Data Foundation" statistics section
    Stats {
        #[arg(long)]
        config: Option<String>,

        /// README to update (default: README.md)
        #[arg(long)]
        readme: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            prompt,
            config,
            model,
            provider,
            workspace,
            verify,
            offline,
            dry_run,
        } => {
            cli::generate::run(
                prompt, config, model, provider, workspace, verify, offline, dry_run,
            )
            .await
        }
        Commands::Clean { config, raw, out } => {
            cli::clean::run(config, raw, out)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stats { config, readme } => {
            cli::stats::run(config, readme)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
