//! Command-line argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Search for and download e-books from IRC
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, default_value = "false")]
    pub debug: bool,

    /// Log as JSON lines
    #[arg(long, default_value = "false")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the channel and print matching files
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Download a file given its listing line
    Download {
        /// The listing line, e.g. "!Bot Author - Title.epub ::INFO:: 1MB"
        line: String,

        /// Directory to save into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Serve the configured listing and library
    Serve,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_joins_terms() {
        let args = Args::parse_from(["kindling", "--debug", "search", "dune", "messiah"]);
        assert!(args.debug);
        match args.command {
            Command::Search { query } => assert_eq!(query.join(" "), "dune messiah"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_download_defaults_to_current_dir() {
        let args = Args::parse_from(["kindling", "download", "!BotA Book.epub"]);
        match args.command {
            Command::Download { line, output } => {
                assert_eq!(line, "!BotA Book.epub");
                assert_eq!(output, PathBuf::from("."));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
