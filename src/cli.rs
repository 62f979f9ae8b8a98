//! CLI argument parsing for tracepoint

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for event traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "tracepoint")]
#[command(version)]
#[command(about = "Normalize runtime trace hooks into classified, context-aware events", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON-lines capture of raw hook events
    Replay {
        /// Capture file, one raw event per line
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        options: TraceArgs,
    },
    /// Trace the built-in demo program
    Demo {
        #[command(flatten)]
        options: TraceArgs,
    },
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct TraceArgs {
    /// Filter events to report (e.g., -e trace=call,line or -e trace=before)
    #[arg(short = 'e', long = "expr", value_name = "EXPR")]
    pub filter: Option<String>,

    /// Only report events whose method name matches REGEX
    #[arg(long = "method", value_name = "REGEX")]
    pub method: Option<String>,

    /// Show statistics summary (event and method counts) instead of individual events
    #[arg(short = 'c', long = "summary")]
    pub statistics: bool,

    /// Collect line coverage
    #[arg(long = "coverage")]
    pub coverage: bool,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Tracer configuration file (TOML)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Command {
    pub fn options(&self) -> &TraceArgs {
        match self {
            Command::Replay { options, .. } | Command::Demo { options } => options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_replay() {
        let cli = Cli::parse_from(["tracepoint", "replay", "capture.jsonl"]);
        match cli.command {
            Command::Replay { file, options } => {
                assert_eq!(file, PathBuf::from("capture.jsonl"));
                assert!(options.filter.is_none());
                assert_eq!(options.format, OutputFormat::Text);
            }
            Command::Demo { .. } => panic!("expected replay"),
        }
    }

    #[test]
    fn test_cli_replay_requires_file() {
        assert!(Cli::try_parse_from(["tracepoint", "replay"]).is_err());
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["tracepoint"]).is_err());
    }

    #[test]
    fn test_cli_filter_flag() {
        let cli = Cli::parse_from(["tracepoint", "demo", "-e", "trace=before"]);
        assert_eq!(cli.command.options().filter.as_deref(), Some("trace=before"));
    }

    #[test]
    fn test_cli_summary_flags() {
        let cli = Cli::parse_from(["tracepoint", "demo", "-c"]);
        assert!(cli.command.options().statistics);
        let cli = Cli::parse_from(["tracepoint", "demo", "--summary"]);
        assert!(cli.command.options().statistics);
    }

    #[test]
    fn test_cli_format_values() {
        let cli = Cli::parse_from(["tracepoint", "demo", "--format", "json"]);
        assert_eq!(cli.command.options().format, OutputFormat::Json);
        let cli = Cli::parse_from(["tracepoint", "demo", "--format", "csv"]);
        assert_eq!(cli.command.options().format, OutputFormat::Csv);
        assert!(Cli::try_parse_from(["tracepoint", "demo", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_cli_debug_is_global() {
        let cli = Cli::parse_from(["tracepoint", "demo", "--debug"]);
        assert!(cli.debug);
        let cli = Cli::parse_from(["tracepoint", "--debug", "demo"]);
        assert!(cli.debug);
        let cli = Cli::parse_from(["tracepoint", "demo"]);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_coverage_config_method() {
        let cli = Cli::parse_from([
            "tracepoint",
            "replay",
            "c.jsonl",
            "--coverage",
            "--config",
            "tp.toml",
            "--method",
            "^gre",
        ]);
        let options = cli.command.options();
        assert!(options.coverage);
        assert_eq!(options.config, Some(PathBuf::from("tp.toml")));
        assert_eq!(options.method.as_deref(), Some("^gre"));
    }
}
