//! Command-line argument parsing for PolicyLens
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PolicyLens - coverage decisions from retrieved policy clauses
#[derive(Parser, Debug)]
#[command(name = "policylens")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Answer insurance coverage questions from your policy documents", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.policylens/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors and the final result only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Rebuild the corpus from a documents directory
    Ingest {
        /// Directory of policy documents (overrides ingestion.docs_dir)
        #[arg(long)]
        docs: Option<PathBuf>,
    },

    /// Decide coverage for a natural-language query
    Query {
        /// Query text, e.g. "46-year-old male, knee surgery in Pune, 3-month-old insurance policy"
        #[arg(value_name = "QUERY")]
        text: String,

        /// Also ask the free-text answerer
        #[arg(long)]
        answer: bool,

        /// Print the decision, parsed query and evidence as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show corpus size
    Stats,

    /// Display effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default log level for this verbosity
    pub fn log_level(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should show retrieved chunks
    pub fn show_evidence(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["policylens", "-q", "stats"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["policylens", "stats"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["policylens", "-v", "stats"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["policylens", "-vv", "stats"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["policylens", "stats", "-v", "--config", "/tmp/p.toml"]);
        assert_eq!(args.verbosity(), Verbosity::Verbose);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/p.toml")));
    }

    #[test]
    fn test_query_subcommand() {
        let args = parse(&["policylens", "query", "knee surgery in Pune", "--json"]);
        assert_eq!(
            args.command,
            Commands::Query {
                text: "knee surgery in Pune".to_string(),
                answer: false,
                json: true,
            }
        );
    }

    #[test]
    fn test_ingest_docs_override() {
        let args = parse(&["policylens", "ingest", "--docs", "policies"]);
        assert_eq!(
            args.command,
            Commands::Ingest {
                docs: Some(PathBuf::from("policies"))
            }
        );
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Args::try_parse_from(["policylens"]).is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(Verbosity::Quiet.log_level(), "error");
        assert_eq!(Verbosity::Normal.log_level(), "info");
        assert_eq!(Verbosity::Verbose.log_level(), "debug");
        assert_eq!(Verbosity::VeryVerbose.log_level(), "trace");
    }

    #[test]
    fn test_progress_visibility() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert!(!Verbosity::Normal.show_evidence());
        assert!(Verbosity::Verbose.show_evidence());
    }
}
