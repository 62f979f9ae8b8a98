use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use tracepoint::cli::{Cli, Command, TraceArgs};
use tracepoint::filter::EventFilter;
use tracepoint::session::{self, SessionOptions, Workload};
use tracepoint::{replay, TracerConfig};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Build session options from command-line arguments
fn session_options(args: &TraceArgs) -> Result<SessionOptions> {
    let mut filter = match &args.filter {
        Some(expr) => EventFilter::from_expr(expr)?,
        None => EventFilter::all(),
    };
    if let Some(pattern) = &args.method {
        filter = filter.with_method_pattern(pattern)?;
    }

    let config = match &args.config {
        Some(path) => TracerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => TracerConfig::default(),
    };

    Ok(SessionOptions {
        filter,
        format: args.format,
        statistics: args.statistics,
        coverage: args.coverage,
        config,
    })
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let options = session_options(args.command.options())?;
    let workload = match &args.command {
        Command::Replay { file, .. } => Workload::Replay(
            replay::load(file)
                .with_context(|| format!("failed to read capture {}", file.display()))?,
        ),
        Command::Demo { .. } => Workload::Demo,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    session::run(&workload, &options, &mut out)?;
    out.flush()?;

    Ok(())
}
