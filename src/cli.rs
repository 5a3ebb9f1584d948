//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Top-level CLI parser for `docsync`.
#[derive(Debug, Parser)]
#[command(name = "docsync", version, about = "Keep documentation in sync with code changes")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a pull-request event and publish documentation updates.
    Sync {
        /// Path to the JSON event payload.
        #[arg(long)]
        event: PathBuf,
        /// Path to the configuration file.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Generate initial documentation for a repository.
    Bootstrap {
        /// Repository owner.
        #[arg(long)]
        owner: String,
        /// Repository name.
        #[arg(long)]
        repo: String,
        /// Branch to read source files from.
        #[arg(long, default_value = "main")]
        branch: String,
        /// Path to the configuration file.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}
