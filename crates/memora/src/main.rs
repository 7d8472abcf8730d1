// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memora - memory-augmented retrieval backend.
//!
//! This binary carries the maintenance commands; transports embed the
//! library crates directly.

mod doctor;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use memora_config::MemoraConfig;
use memora_core::MemoraError;

/// Memora - memory-augmented retrieval backend.
#[derive(Parser, Debug)]
#[command(name = "memora", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the standard configuration locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the effective configuration as TOML.
    Config,
    /// Check the configuration and the store, and report what it holds.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => memora_config::load_and_validate_path(path),
        None => memora_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            memora_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    match cli.command {
        Some(Commands::Config) => match render_config(&config) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("memora: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::Doctor { plain }) => match doctor::run_doctor(&config, plain).await {
            Ok(0) => {}
            Ok(_) => std::process::exit(1),
            Err(e) => {
                eprintln!("memora: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("memora: use --help for available commands");
        }
    }
}

/// Serializes the effective configuration back to TOML.
fn render_config(config: &MemoraConfig) -> Result<String, MemoraError> {
    toml::to_string_pretty(config).map_err(|e| MemoraError::Config(e.to_string()))
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("memora={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn doctor_accepts_plain_and_global_config() {
        let cli = Cli::try_parse_from(["memora", "doctor", "--plain", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Some(Commands::Doctor { plain: true })));
    }

    #[test]
    fn rendered_config_loads_back_unchanged() {
        let config = memora_config::load_config_from_str(
            "[retrieval]\nk = 9\n\n[llm]\ndefault_provider = \"anthropic\"\n",
        )
        .unwrap();
        let rendered = render_config(&config).unwrap();
        assert!(rendered.contains("[embedding]"));
        let reloaded = memora_config::load_config_from_str(&rendered).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.retrieval.k, 9);
    }
}
