mod cli;
mod config;
mod model;
mod sinks;
mod sources;

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use sinks::ical::ICalSink;
use sinks::IssueSink;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays a clean calendar stream
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::WARN.to_string()))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;
    let sources = sources::create_sources(&config, &cli.sources)?;
    if sources.is_empty() {
        bail!(
            "No sources configured. Add [[redmine]] or [github] to {}",
            config::default_config_path().display()
        );
    }

    let issues = sources::collect_issues(&sources)
        .await
        .context("Failed to fetch issues")?;
    let document = ICalSink.generate(&issues);

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &document)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(issues = issues.len(), path = %path.display(), "calendar written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&document)
                .and_then(|()| stdout.flush())
                .context("Failed to write calendar to stdout")?;
        }
    }

    Ok(())
}
