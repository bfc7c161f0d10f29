//! Bookwindow CLI - Command-line interface
//!
//! Plans window layouts for chapter manifests and simulates reading through
//! them with the five-window preload buffer.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use bookwindow::logging::init_logging;
use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::plan::PlanArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "bookwindow")]
#[command(version, about = "Windowed pagination planner and buffer simulator", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/bookwindow/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show how a document splits into windows
    Plan(PlanArgs),

    /// Page through a document and trace the buffer
    Simulate(SimulateArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // Config commands must work even when the file is broken
    if let Commands::Config { command } = cli.command {
        return commands::config::run(command, config_path);
    }

    let mut logging = commands::common::load_config(config_path)?.logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    let _logging_guard = init_logging(&logging)?;

    match cli.command {
        Commands::Plan(args) => commands::plan::run(args, config_path),
        Commands::Simulate(args) => commands::simulate::run(args, config_path),
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::parse_from([
            "bookwindow",
            "plan",
            "--manifest",
            "book.json",
            "--chapters-per-window",
            "3",
            "--include-non-linear",
        ]);
        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.manifest, PathBuf::from("book.json"));
                assert_eq!(args.chapters_per_window, Some(3));
                assert!(args.include_non_linear);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_simulate_defaults() {
        let cli = Cli::parse_from(["bookwindow", "simulate", "--manifest", "book.json"]);
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.start_chapter, 0);
                assert_eq!(args.pages_per_window, 10);
                assert_eq!(args.assembly_delay_ms, 0);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_with_global_flag() {
        let cli = Cli::parse_from(["bookwindow", "config", "show", "--config", "/tmp/x.ini"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.ini")));
        assert!(matches!(
            cli.command,
            Commands::Config {
                command: ConfigCommands::Show
            }
        ));
    }
}
