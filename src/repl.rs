//! Interactive chat loop.
//!
//! One session per invocation: an optional upfront file upload (cached in
//! the session for exact context recovery), then a read-answer loop. Both
//! the user's question and the assistant's reply — apology fallback
//! included — are appended to the session history every turn.

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::answer::answer_question;
use crate::chunk::split_lines;
use crate::completion::OpenAiCompleter;
use crate::config::Config;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::index::{PineconeIndex, VectorIndex};
use crate::ingest::ingest_file;
use crate::models::UploadOutcome;
use crate::session::SessionState;

pub async fn run_chat(
    config: &Config,
    index_name: Option<String>,
    file: Option<&Path>,
) -> Result<()> {
    let index_name = index_name.unwrap_or_else(|| config.pinecone.index.clone());

    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let index = PineconeIndex::new(&config.pinecone)?;
    let completer = OpenAiCompleter::new(&config.openai)?;
    let mut session = SessionState::new();
    let mut source_file: Option<String> = None;

    if let Some(path) = file {
        let raw_text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload.txt")
            .to_string();

        ingest_session_file(
            &embedder,
            &index,
            &mut session,
            config.ingest.batch_size,
            &index_name,
            &raw_text,
            &name,
        )
        .await;

        source_file = Some(name);
    }

    println!("Ask a question (empty line or 'exit' to quit).");

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let question = match lines.next() {
            Some(line) => line?,
            None => break,
        };
        let question = question.trim();
        if question.is_empty() || question == "exit" || question == "quit" {
            break;
        }

        session.push_user(question);

        match answer_question(
            &embedder,
            &index,
            &completer,
            &session,
            &index_name,
            question,
            config.retrieval.top_k,
            source_file.as_deref(),
        )
        .await
        {
            Ok(answer) => {
                println!("{}", answer.text);
                session.push_assistant(&answer.text);
            }
            Err(e) => {
                eprintln!("Error: could not answer: {}", e);
            }
        }
    }

    println!("Session ended after {} turns.", session.history().len());
    Ok(())
}

/// Upload a file at session start.
///
/// The raw text is cached in the session before any gateway call, and an
/// ingest failure is an advisory, not a session abort — questions still run
/// with cached-line context (or the index's prior contents).
async fn ingest_session_file(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    session: &mut SessionState,
    batch_size: usize,
    index_name: &str,
    raw_text: &str,
    name: &str,
) {
    session.cache_text(name, raw_text);

    let chunk_count = split_lines(name, raw_text).len();
    match ingest_file(embedder, index, batch_size, index_name, raw_text, name).await {
        Ok(UploadOutcome::Uploaded { upserted }) => {
            println!(
                "Uploaded {} — {} of {} chunks indexed into '{}'.",
                name, upserted, chunk_count, index_name
            );
        }
        Ok(UploadOutcome::NoChunks) => {
            println!("{} has no usable text — nothing was indexed.", name);
        }
        Err(e) => {
            eprintln!(
                "Warning: upload of {} failed, continuing with cached text only: {}",
                name, e
            );
        }
    }
}
