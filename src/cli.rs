//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::ReportFormat;
use crate::models::Language;
use clap::Parser;
use std::path::PathBuf;

/// releasegate - boss/worker LLM review panel for release decisions
///
/// Several specialist reviewers evaluate the target application in
/// parallel on a local Ollama server; a boss reviewer integrates their
/// findings into a Go/No-Go release decision.
///
/// Examples:
///   releasegate
///   releasegate --url https://shop.example --description "Stripe checkout"
///   releasegate --language ja --format markdown --output review.md
///   releasegate --check-connection
///   releasegate --show-structure
///   releasegate --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// URL of the application to evaluate
    ///
    /// Overrides [target].url from the config file.
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Source code repository URL of the application
    #[arg(short, long, value_name = "URL")]
    pub source: Option<String>,

    /// Free-text description of the application
    #[arg(short, long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Output file path for the report
    ///
    /// Defaults to boss_worker_report_YYYYMMDD_HHMMSS.{json,md} in the
    /// configured output directory.
    #[arg(short, long, value_name = "FILE", conflicts_with = "no_save")]
    pub output: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<ReportFormat>,

    /// Do not write a report file
    #[arg(long)]
    pub no_save: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .releasegate.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ollama API endpoint URL
    #[arg(long, value_name = "URL", env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum tokens each model may generate per response
    #[arg(long, value_name = "COUNT")]
    pub max_tokens: Option<u32>,

    /// Prompt language (en, ja)
    #[arg(long, value_name = "LANG")]
    pub language: Option<Language>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Check the Ollama connection, list installed models and exit
    #[arg(long)]
    pub check_connection: bool,

    /// Print the effective configuration and roster, then exit
    #[arg(long)]
    pub show_config: bool,

    /// Print the panel structure and processing flow, then exit
    #[arg(long)]
    pub show_structure: bool,

    /// Generate a default .releasegate.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Exit with code 2 when the final decision is No-Go
    ///
    /// Useful for CI pipelines.
    #[arg(long)]
    pub fail_on_no_go: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !is_http_url(url) {
                return Err("Target URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref source) = self.source {
            if !is_http_url(source) {
                return Err("Source URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref ollama_url) = self.ollama_url {
            if !is_http_url(ollama_url) {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be at least 1".to_string());
        }

        let modes = [self.check_connection, self.show_config, self.show_structure];
        if modes.iter().filter(|&&set| set).count() > 1 {
            return Err(
                "Use only one of --check-connection, --show-config and --show-structure"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
