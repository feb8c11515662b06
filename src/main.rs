//! fedi-lookup binary entry point

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fedi_lookup::{AppConfig, Resolver};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Resolve a Fediverse handle, post URL or server domain
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// `@user@domain`, an object URL or a bare domain. Read from stdin
    /// when omitted.
    input: Option<String>,

    /// Extra configuration file layered over `config/`
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging (stderr)
/// 3. Read input
/// 4. Resolve and print to stdout
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;
    init_tracing(&config);

    let input = match cli.input {
        Some(input) => input,
        None => prompt()?,
    };
    let input = input.trim();
    if input.is_empty() {
        eprintln!("No input provided");
        return Ok(());
    }

    let resolver = Resolver::new(config)?;
    match resolver.resolve_and_render(input).await {
        Ok(output) => {
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Resolution failed");
            eprintln!("Error resolving {}: {}", input, e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("fedi_lookup={}", config.logging.level).into());

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(io::stderr))
            .init();
    }
}

fn prompt() -> anyhow::Result<String> {
    eprint!("Enter a Fediverse handle, URL or domain: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line)
}
