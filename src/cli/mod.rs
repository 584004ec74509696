//! CLI module for Mosaic
//!
//! Provides command-line interface parsing for the `mosaic` binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Mosaic - supervisor/worker research orchestration
///
/// Plans a report as sections, researches every section in parallel against
/// the configured tool servers and assembles the result.
#[derive(Parser, Debug)]
#[command(
    name = "mosaic",
    version,
    about = "Mosaic - multi-agent research reports from enterprise sources",
    long_about = "Plans a report as named sections, researches every section in parallel\n\
                  with a tool-calling agent, then writes the introduction and conclusion.\n\n\
                  Tools are discovered from the MCP servers listed in the configuration file.",
    after_help = "EXAMPLES:\n    \
                  mosaic run \"Summarize VIT-60872\"          # Print the final report\n    \
                  mosaic run \"What changed for MTV2005?\" -s # Show agent steps as they happen\n    \
                  mosaic run \"CL 27235273\" --json           # Print the whole outcome as JSON\n    \
                  mosaic tools                              # List discovered tools"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "mosaic.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Research a query and print the report
    Run {
        /// The research question
        query: String,

        /// Print one line per agent decision while the run progresses
        #[arg(short, long)]
        stream: bool,

        /// Print the full outcome as JSON instead of the report text
        #[arg(long)]
        json: bool,
    },

    /// Connect to the configured tool servers and list their tools
    Tools,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_parses_flags() {
        let cli = Cli::try_parse_from(["mosaic", "run", "Summarize VIT-60872", "--stream"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("mosaic.toml"));
        match cli.command {
            Commands::Run { query, stream, json } => {
                assert_eq!(query, "Summarize VIT-60872");
                assert!(stream);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mosaic", "tools", "--config", "other.toml", "--no-color", "-v"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Tools));
    }

    #[test]
    fn test_run_requires_query() {
        assert!(Cli::try_parse_from(["mosaic", "run"]).is_err());
    }
}
