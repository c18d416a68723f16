//! # ragline CLI
//!
//! Commands for uploading a text file into the hosted vector index and
//! asking questions against it, one-shot or as an interactive session.
//!
//! ## Usage
//!
//! ```bash
//! ragline --config ./config/ragline.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ragline upload <file>` | Chunk, embed, and upsert a text file |
//! | `ragline ask "<question>"` | Answer one question against the index |
//! | `ragline chat [--file <file>]` | Interactive Q&A session |
//!
//! API keys are read from `OPENAI_API_KEY` and `PINECONE_API_KEY`; a missing
//! key fails before any network call. The config file is optional — absent
//! files fall back to the built-in defaults.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ragline::{answer, config, ingest, repl};

/// ragline — line-grained retrieval-augmented Q&A over a hosted vector index.
#[derive(Parser)]
#[command(
    name = "ragline",
    about = "Line-grained retrieval-augmented Q&A over a hosted vector index",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file = defaults.
    #[arg(long, global = true, default_value = "./config/ragline.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a UTF-8 text file: one vector per non-blank line.
    ///
    /// Creates the index (cosine metric, embedding dimensionality) when it
    /// does not exist yet, waiting — bounded — for it to become ready.
    Upload {
        /// Path to the text file to ingest.
        file: PathBuf,

        /// Target index name (default from config: "my-chatbot-data").
        #[arg(long)]
        index: Option<String>,
    },

    /// Ask a single question and print the generated answer.
    ///
    /// Runs with a fresh session, so context is reconstructed from the
    /// metadata stored in the index.
    Ask {
        /// The question to answer.
        question: String,

        /// Index name to query (default from config).
        #[arg(long)]
        index: Option<String>,

        /// Number of nearest chunks to retrieve (default from config: 3).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Start an interactive chat session.
    ///
    /// With `--file`, the file is uploaded first and its raw text is cached
    /// for the session, so retrieved chunks are recovered exactly.
    Chat {
        /// Optional text file to upload before the first question.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Index name (default from config).
        #[arg(long)]
        index: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Upload { file, index } => {
            ingest::run_upload(&cfg, &file, index).await?;
        }
        Commands::Ask {
            question,
            index,
            top_k,
        } => {
            answer::run_ask(&cfg, &question, index, top_k).await?;
        }
        Commands::Chat { file, index } => {
            repl::run_chat(&cfg, index, file.as_deref()).await?;
        }
    }

    Ok(())
}
