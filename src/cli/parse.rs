//! CLI parse: clap types for Scribe. No behavior; definitions only.

use crate::types::ContentKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Scribe CLI - unattended content generation with a provider cascade
#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Generate content through a provider cascade with an idempotent ledger")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Run the cascade without publishing or persisting ledger entries
    #[arg(long)]
    pub dry_run: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate, publish and record content for every topic in a file
    Run {
        /// Topics file: one topic per line, '#' starts a comment
        #[arg(long)]
        topics: PathBuf,
        /// Content kind (seo, blog, podcast, social)
        #[arg(long)]
        kind: ContentKind,
        /// Locale applied to every topic
        #[arg(long)]
        locale: Option<String>,
        /// Assign per-kind sequence numbers (always on for podcast)
        #[arg(long)]
        sequenced: bool,
        /// Output directory for published artifacts (defaults to run.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Override run.max_items_per_run
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate one artifact and print it, without publishing or recording
    Generate {
        #[arg(long)]
        kind: ContentKind,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Report whether a topic has already been recorded
    Check {
        #[arg(long)]
        kind: ContentKind,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        locale: Option<String>,
    },
    /// Show ledger statistics and configured providers
    Status {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
