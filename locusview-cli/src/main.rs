use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use anyhow::Result;

mod config;
mod commands;
mod error;
mod script;

use config::Config;
use error::print_error_and_exit;

#[derive(Parser)]
#[command(name = "locusview")]
#[command(about = "LocusView - viewport coordination for genome annotation viewers")]
#[command(version)]
#[command(long_about = "
LocusView keeps zoom, scroll position, marks and history of several genome
views consistent, including views locked together and views whose feature
data arrives from background loaders.

Examples:
  locusview replay --script session.toml
  locusview replay --script session.toml --json --policy queue
  locusview config --example --output locusview.toml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a session script against a fresh coordinator
    Replay {
        /// Session script (TOML)
        #[arg(short, long, required = true)]
        script: PathBuf,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,

        /// What to do with new data that arrives while a draw is pending
        #[arg(long)]
        policy: Option<PolicyArg>,
    },

    /// Show the active configuration or generate an example one
    Config {
        /// Print the built-in defaults instead of the loaded configuration
        #[arg(long)]
        example: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PolicyArg {
    Reject,
    Queue,
}

fn setup_logging(verbose: u8, quiet: bool, configured: &str) -> Result<()> {
    if quiet {
        std::env::set_var("RUST_LOG", "error");
    } else {
        let level = match verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        };
        std::env::set_var("RUST_LOG", level);
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration decides the default log level, so it is read first
    let config = Config::load(cli.config.as_deref())?;

    setup_logging(cli.verbose, cli.quiet, &config.general.log_level)?;

    match cli.command {
        Commands::Replay { script, json, policy } => {
            if let Err(err) = commands::replay::execute(&config, script, json, policy) {
                print_error_and_exit(&err);
            }
        }

        Commands::Config { example, output } => {
            commands::config::execute(&config, example, output)?;
        }
    }

    Ok(())
}
