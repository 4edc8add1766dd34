use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Collect open issues from Redmine and GitHub and export them as iCalendar
/// to-dos.
#[derive(Debug, Parser)]
#[command(name = "issuemapper", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/issuemapper/config.toml)
    #[arg(short, long, env = "ISSUEMAPPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only query these backends; all configured ones by default
    #[arg(short, long = "source", value_enum)]
    pub sources: Vec<SourceKind>,

    /// Write the calendar to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Redmine,
    Github,
}
