// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sauda - a bilingual negotiation mediator for commodity trades.
//!
//! This is the binary entry point for the Sauda service.

mod serve;

use clap::{Parser, Subcommand};

/// Sauda - a bilingual negotiation mediator for commodity trades.
#[derive(Parser, Debug)]
#[command(name = "sauda", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Sauda mediation service.
    Serve,
    /// Inspect and validate configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML.
    Show,
    /// Check configuration files and exit.
    Validate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match sauda_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            sauda_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => match toml::to_string_pretty(&config) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => {
                    eprintln!("error: cannot render configuration: {e}");
                    std::process::exit(1);
                }
            },
            ConfigCommands::Validate => {
                println!("configuration OK (service.name={})", config.service.name);
            }
        },
        None => {
            println!("sauda: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Commands, ConfigCommands};

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config = sauda_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.service.name, "sauda");
    }

    #[test]
    fn cli_parses_serve() {
        let cli = Cli::parse_from(["sauda", "serve"]);
        assert!(matches!(cli.command, Some(Commands::Serve)));
    }

    #[test]
    fn cli_parses_config_subcommands() {
        let cli = Cli::parse_from(["sauda", "config", "validate"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Validate
            })
        ));

        let cli = Cli::parse_from(["sauda", "config", "show"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Show
            })
        ));
    }

    #[test]
    fn cli_defaults_to_no_command() {
        let cli = Cli::parse_from(["sauda"]);
        assert!(cli.command.is_none());
    }
}
