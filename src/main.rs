//! # Daily Digest CLI (`digest`)
//!
//! Lists, shows, and deletes daily reports, and serves the JSON API.
//!
//! ## Usage
//!
//! ```bash
//! digest --config ./config/digest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `digest sources` | Show where each channel's reports are read from |
//! | `digest list <channel>` | List a channel's reports, newest first |
//! | `digest show <id>` | Print one report with its full content |
//! | `digest delete <file-name>` | Delete a report from storage, index, and disk |
//! | `digest slug encode <file-name>` | Print the identifier of a file name |
//! | `digest slug decode <id>` | Print the file name of an identifier |
//! | `digest serve` | Start the HTTP API |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use daily_digest::config;
use daily_digest::resolver::ReportResolver;
use daily_digest::{commands, server, sources};
use daily_digest_core::Channel;
use tracing_subscriber::EnvFilter;

/// Daily Digest: report listing, lookup, and index maintenance.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/digest.example.toml` for a full example. A missing
/// file falls back to defaults plus environment variables.
#[derive(Parser)]
#[command(name = "digest", version, about = "Daily report listing, lookup, and index maintenance")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/digest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show each channel's report source (remote index or local directories).
    Sources,

    /// List a channel's reports, newest first.
    List {
        /// Channel key: `ai`, `crypto`, or `finance`.
        channel: Channel,

        /// Print summaries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print one report with its full content.
    Show {
        /// Report identifier (as printed by `list`).
        id: String,

        /// Channel to search first.
        #[arg(long)]
        channel: Option<Channel>,
    },

    /// Delete a report from object storage, the channel index, and local
    /// report directories.
    Delete {
        /// Report file name, e.g. `2024-05-02 - AI 日报.md`.
        file_name: String,

        /// Channel the report belongs to. Inferred from the file name when
        /// omitted.
        #[arg(long)]
        channel: Option<Channel>,
    },

    /// Convert between file names and identifiers.
    Slug {
        #[command(subcommand)]
        action: SlugAction,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum SlugAction {
    /// File name to identifier.
    Encode { file_name: String },
    /// Identifier to file name.
    Decode { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Slug { action } = &cli.command {
        match action {
            SlugAction::Encode { file_name } => commands::run_slug_encode(file_name),
            SlugAction::Decode { id } => commands::run_slug_decode(id)?,
        }
        return Ok(());
    }

    let cfg = Arc::new(config::load_with_env(&cli.config)?);

    match cli.command {
        Commands::Sources => {
            let resolver = ReportResolver::from_config(cfg)?;
            sources::list_sources(&resolver)?;
        }
        Commands::List { channel, json } => {
            let resolver = ReportResolver::from_config(cfg)?;
            commands::run_list(&resolver, channel, json).await?;
        }
        Commands::Show { id, channel } => {
            let resolver = ReportResolver::from_config(cfg)?;
            commands::run_show(&resolver, &id, channel).await?;
        }
        Commands::Delete { file_name, channel } => {
            commands::run_delete(cfg, &file_name, channel).await?;
        }
        Commands::Serve => {
            server::run_server(cfg).await?;
        }
        Commands::Slug { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
