//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for phishsim using clap's derive macros.

use clap::{Parser, Subcommand};

/// Phishsim - phishing awareness simulation platform
#[derive(Parser)]
#[command(name = "phishsim")]
#[command(version)]
#[command(about = "Phishing awareness simulation platform", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: ./config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve,

    /// Create an administrator account
    ///
    /// If neither --password nor --stdin is given, prompts interactively.
    CreateAdmin {
        /// Login name
        username: String,

        /// Contact email
        email: String,

        /// Password (not recommended, visible in shell history)
        #[arg(long, conflicts_with = "stdin")]
        password: Option<String>,

        /// Read password from stdin (for scripting)
        #[arg(long)]
        stdin: bool,
    },

    /// Delete events and completed campaigns older than the retention window
    Purge {
        /// Override campaign.retention_days for this run
        #[arg(long)]
        days: Option<u64>,
    },

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output file path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
