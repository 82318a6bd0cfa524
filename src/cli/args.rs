use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::Config;

use super::{chat, models};

/// Entry point for the `docchat` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "docchat",
    about = "Chat with an ingested document from the terminal",
    version,
    long_about = None
)]
pub struct Cli {
    /// Optional subcommand (defaults to `chat`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interactive chat against an ingested document.
    Chat(ChatArgs),

    /// List the supported models and their token budgets.
    Models,
}

#[derive(Debug, Default, Args)]
pub struct ChatArgs {
    /// Document to ingest before the first message.
    #[arg(short = 'd', long = "document")]
    pub document: Option<PathBuf>,

    /// Override the configured model for this session.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Override the configured sampling temperature (0.0..=1.0).
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Override the configured reasoning effort (e.g. low, medium, high).
    #[arg(long)]
    pub reasoning_effort: Option<String>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Some(Command::Models) => {
                models::list();
                Ok(())
            }
            Some(Command::Chat(args)) => {
                let config = Config::load()?;
                chat::run(args, &config).await
            }
            None => {
                let config = Config::load()?;
                chat::run(ChatArgs::default(), &config).await
            }
        }
    }
}
