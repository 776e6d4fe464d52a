//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Manufacturing test fixture sequencer
#[derive(Parser, Debug)]
#[command(name = "fixture-runner")]
#[command(author = "hephaex@gmail.com")]
#[command(version = "0.1.0")]
#[command(about = "Run fixture test sequences and report every unit")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Test units on a fixture
    Run(RunArgs),

    /// List available fixtures
    List(ListArgs),

    /// Manage undelivered submissions
    Outbox(OutboxArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Fixture to run (see `list`)
    pub fixture: String,

    /// Number of units (default from config)
    #[arg(short = 'n', long)]
    pub units: Option<usize>,

    /// Abort policy override (run-all, abort)
    #[arg(long)]
    pub policy: Option<String>,

    /// Re-runs for a failed unit
    #[arg(long)]
    pub retries: Option<u32>,

    /// Seed for simulation and serial numbers
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write submissions to this directory instead of sending them
    #[arg(long)]
    pub offline: Option<String>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long, default_value = "table")]
    pub format: String,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show steps and sub-unit sources
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for outbox command
#[derive(Parser, Debug)]
pub struct OutboxArgs {
    #[command(subcommand)]
    pub action: OutboxAction,
}

#[derive(Subcommand, Debug)]
pub enum OutboxAction {
    /// List stored submissions
    List,

    /// Re-send stored submissions, deleting the delivered ones
    Flush,

    /// Export stored submissions (format from extension: .csv, .json)
    Export {
        /// Output file
        path: String,
    },
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Write an example configuration file
    Init {
        /// Output file
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show environment variables
    Env,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["fixture-runner", "list", "--detailed"]);
        match args.command {
            Command::List(list_args) => {
                assert!(list_args.detailed);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_run_args() {
        let args = Args::parse_from([
            "fixture-runner",
            "--verbose",
            "run",
            "pcba-rf-motherboard",
            "-n",
            "10",
            "--policy",
            "abort",
            "--retries",
            "2",
            "--seed",
            "7",
            "--offline",
            "/tmp/reports",
            "-f",
            "csv",
        ]);
        assert!(args.verbose);
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.fixture, "pcba-rf-motherboard");
                assert_eq!(run.units, Some(10));
                assert_eq!(run.policy.as_deref(), Some("abort"));
                assert_eq!(run.retries, Some(2));
                assert_eq!(run.seed, Some(7));
                assert_eq!(run.offline.as_deref(), Some("/tmp/reports"));
                assert_eq!(run.format, "csv");
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_outbox_export() {
        let args = Args::parse_from([
            "fixture-runner",
            "--config",
            "station.yaml",
            "outbox",
            "export",
            "runs.csv",
        ]);
        assert_eq!(args.config.as_deref(), Some("station.yaml"));
        match args.command {
            Command::Outbox(OutboxArgs {
                action: OutboxAction::Export { path },
            }) => assert_eq!(path, "runs.csv"),
            _ => panic!("Expected Outbox Export command"),
        }
    }

    #[test]
    fn test_config_init() {
        let args = Args::parse_from(["fixture-runner", "config", "init", "fixture-runner.yaml"]);
        match args.command {
            Command::Config(ConfigArgs {
                action: ConfigAction::Init { path, force },
            }) => {
                assert_eq!(path, "fixture-runner.yaml");
                assert!(!force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
