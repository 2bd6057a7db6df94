//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Conduit - run staged message pipelines from a script file
#[derive(Parser, Debug)]
#[command(
    name = "conduit",
    author,
    version,
    about = "Concurrent stage pipeline runner",
    long_about = "Runs a chain of processing stages connected by bounded queues.\n\n\
                  Reads messages from a source, passes them through the configured \n\
                  stages (optionally parallel or debounced), and writes them to a sink."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CONDUIT_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "CONDUIT_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the script
    Run(RunArgs),

    /// Validate a script file without running it
    Validate(ValidateArgs),

    /// Display script information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to script file (TOML or JSON)
    #[arg(short, long, default_value = "script.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Override the pipe capacity from the script
    #[arg(long, env = "CONDUIT_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,

    /// Override the run timeout in seconds (0 = no timeout)
    #[arg(long, env = "CONDUIT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CONDUIT_METRICS_PORT")]
    pub metrics_port: u16,

    /// Validate the script and exit without running it
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to script file to validate
    #[arg(short, long, default_value = "script.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to script file
    #[arg(short, long, default_value = "script.toml", env = "CONDUIT_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "conduit",
            "-v",
            "run",
            "--config",
            "job.toml",
            "--buffer-size",
            "8",
            "--timeout",
            "30",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.config, PathBuf::from("job.toml"));
        assert_eq!(args.buffer_size, Some(8));
        assert_eq!(args.timeout, Some(30));
        assert!(args.dry_run);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["conduit", "-q", "-v", "validate"]);
        assert!(result.is_err());
    }
}
