//! Scholar CLI - Command-line interface for semantic retrieval over study documents.
//!
//! # Usage
//!
//! ```bash
//! # Index new and changed files in the data directory
//! scholar init
//!
//! # Search the index
//! scholar search "how do mitochondria make ATP"
//! scholar search "mitosis phases" -n 5 --json
//!
//! # Save a note and index it
//! scholar note --title "Exam tips" --id note-1 --content "Review the Krebs cycle"
//!
//! # Record a conversation turn (indexed on the next init)
//! scholar log --user "What is ATP?" --assistant "Energy currency" --model llama3
//!
//! # Run without model files
//! scholar --hashing-embedder init
//! ```

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scholar_core::config::DEFAULT_SEARCH_K;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scholar semantic retrieval CLI.
///
/// Indexes PDFs, text, Markdown and DOCX files in a data directory together
/// with a conversation log, and retrieves the passages closest to a query.
#[derive(Parser)]
#[command(name = "scholar", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Data directory (default: platform standard location)
    #[arg(long, env = "SCHOLAR_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Directory holding model.safetensors, config.json and tokenizer.json
    #[arg(long, env = "SCHOLAR_MODEL_DIR", global = true)]
    model_dir: Option<PathBuf>,

    /// Use the model-free hashing embedder instead of MiniLM
    #[arg(long, global = true)]
    hashing_embedder: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load the index and index new or changed files
    Init {
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the index
    Search {
        /// Search query
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'n', long, default_value_t = DEFAULT_SEARCH_K)]
        limit: usize,

        /// Output results as JSON
        #[arg(long)]
        json: bool,

        /// Output the grounding block passed to a language model
        #[arg(long, conflicts_with = "json")]
        context: bool,
    },
    /// Save a note into the data directory and index it
    Note {
        #[arg(long)]
        title: String,

        /// Identifier recorded in logs
        #[arg(long)]
        id: String,

        /// Note text
        #[arg(long, required_unless_present = "file", conflicts_with = "file")]
        content: Option<String>,

        /// Read the note text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Append a conversation turn to the tracked log
    Log {
        #[arg(long)]
        user: String,

        #[arg(long)]
        assistant: String,

        /// Model that produced the answer
        #[arg(long)]
        model: String,
    },
    /// Show index contents
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let default_level = if cli.verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = config::Settings::resolve(cli.data_dir, cli.model_dir, cli.hashing_embedder)?;

    let output = match &cli.command {
        Command::Init { json } => commands::init(&settings, *json).await?,
        Command::Search {
            query,
            limit,
            json,
            context,
        } => commands::search(&settings, query, *limit, *json, *context).await?,
        Command::Note {
            title,
            id,
            content,
            file,
        } => {
            commands::note(&settings, title, id, content.as_deref(), file.as_deref()).await?
        }
        Command::Log {
            user,
            assistant,
            model,
        } => commands::log(&settings, user, assistant, model).await?,
        Command::Status { json } => commands::status(&settings, *json).await?,
    };

    println!("{}", output);
    Ok(())
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
    fn test_search_defaults() {
        let cli = Cli::try_parse_from(["scholar", "search", "mitosis"]).unwrap();
        match cli.command {
            Command::Search {
                limit, json, context, ..
            } => {
                assert_eq!(limit, DEFAULT_SEARCH_K);
                assert!(!json);
                assert!(!context);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_note_requires_content_or_file() {
        assert!(Cli::try_parse_from(["scholar", "note", "--title", "t", "--id", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "scholar", "note", "--title", "t", "--id", "1", "--content", "c", "--file", "f"
        ])
        .is_err());
        assert!(
            Cli::try_parse_from(["scholar", "note", "--title", "t", "--id", "1", "--file", "f"])
                .is_ok()
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["scholar", "status", "--hashing-embedder", "--data-dir", "/tmp/x"])
                .unwrap();
        assert!(cli.hashing_embedder);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
    }
}
