// src/main.rs
mod cli;
mod client;
mod commands;
mod config;
mod error;
mod git;
mod prompts;
mod providers;
mod types;
mod workflow;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::*;
use config::{AiSettings, Config};

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let loaded = Config::load();
    init_logging(
        loaded
            .as_ref()
            .map(|c| c.global.log_level.as_str())
            .unwrap_or("warn"),
    );
    let config = loaded?;

    let resolve = || {
        AiSettings::resolve(
            &config.ai,
            cli.provider.as_ref(),
            cli.model.as_ref(),
            cli.timeout,
        )
    };

    match &cli.command {
        Commands::Init { issue, title, branch_type, commit_type, ref_branch } => cmd_init(
            &config,
            issue,
            title,
            branch_type,
            commit_type.as_deref(),
            ref_branch.as_deref(),
        )?,
        Commands::Use { work } => cmd_use(work)?,
        Commands::Pause { main_branch, force } => cmd_pause(&config, main_branch.as_deref(), *force)?,
        Commands::End { work, force } => cmd_end(&config, work.as_deref(), *force)?,
        Commands::List => cmd_list()?,
        Commands::Status => cmd_status()?,
        Commands::Commit { message, all, no_push, force } => {
            cmd_commit(&config, message, *all, *no_push, *force)?
        }
        Commands::AiCommit { all, no_push, force, no_verify } => {
            let settings = resolve()?;
            cmd_ai_commit(&config, &settings, *all, *no_push, *force, *no_verify).await?
        }
        Commands::Config => cmd_config(&config, resolve())?,
        Commands::Open => cmd_open()?,
    }

    Ok(())
}
