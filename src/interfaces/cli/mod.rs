//! CLI interface module
//!
//! This module provides command-line interface functionality for phishsim.

pub mod commands;

use crate::cli::Commands;
use crate::config::get_config;
use crate::storage::StorageFactory;
use commands::{config_generate, run_create_admin, run_purge};
use std::fmt;

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<crate::errors::PhishsimError> for CliError {
    fn from(err: crate::errors::PhishsimError) -> Self {
        match err {
            crate::errors::PhishsimError::Validation(msg)
            | crate::errors::PhishsimError::Conflict(msg) => CliError::CommandError(msg),
            other => CliError::StorageError(other.to_string()),
        }
    }
}

/// Run a CLI command from clap-parsed input
///
/// `Serve` is dispatched by `main` and never reaches here.
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    // Generate doesn't need DB connection
    if let Commands::GenerateConfig { output_path, force } = cmd {
        return config_generate(output_path, force).await;
    }

    crate::runtime::lifetime::startup::install_crypto_provider()
        .map_err(|e| CliError::CommandError(e.to_string()))?;
    let storage = StorageFactory::create()
        .await
        .map_err(|e| CliError::StorageError(e.to_string()))?;

    match cmd {
        Commands::CreateAdmin {
            username,
            email,
            password,
            stdin,
        } => run_create_admin(storage, username, email, password, stdin).await,

        Commands::Purge { days } => {
            let days = days.unwrap_or(get_config().campaign.retention_days);
            run_purge(storage, days).await
        }

        Commands::Serve | Commands::GenerateConfig { .. } => Err(CliError::CommandError(
            "Command is not handled by the CLI dispatcher".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PhishsimError;

    #[test]
    fn test_validation_errors_map_to_command_errors() {
        let err: CliError = PhishsimError::validation("Username taken").into();
        assert!(matches!(err, CliError::CommandError(ref m) if m == "Username taken"));

        let err: CliError = PhishsimError::DatabaseOperation("locked".into()).into();
        assert!(matches!(err, CliError::StorageError(_)));
        assert!(err.format_simple().starts_with("Storage error:"));
    }
}
