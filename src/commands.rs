//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands. Running the
//! binary without a subcommand starts the HTTP service.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use markdown_stylist::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! match cli.command.unwrap_or(Commands::Serve) {
//!     Commands::Serve => { /* start the server */ }
//!     _ => {}
//! }
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ConfigOverrides;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Auto)]
pub struct Cli {
    /// Path to a YAML config file. Defaults to `config.yaml` in the config directory.
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// The subcommand to run; `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Start the HTTP service.
    #[clap(name = "serve", alias = "s")]
    Serve,

    /// Write a default config file and a sample style guide.
    ///
    /// Existing files are left untouched.
    Init,

    /// Lint a markdown file and print the report as JSON.
    ///
    /// Exits with a non-zero status when issues are found.
    #[clap(name = "validate", alias = "v")]
    Validate {
        /// The markdown file to check.
        path: PathBuf,
    },

    /// Send a tiny prompt to verify the API key, base URL and model.
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["stylist"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_validate_takes_a_path() {
        let cli = Cli::try_parse_from(["stylist", "validate", "README.md"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Validate {
                path: PathBuf::from("README.md")
            })
        );
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::try_parse_from([
            "stylist",
            "serve",
            "--port",
            "8081",
            "--model",
            "gpt-4o-mini",
            "--config",
            "custom.yaml",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Serve));
        assert_eq!(cli.overrides.port, Some(8081));
        assert_eq!(cli.overrides.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
    }
}
