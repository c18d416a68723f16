//! Answer pipeline orchestration.
//!
//! Linear flow per question: embed the question, query the index for the
//! nearest chunks, reconstruct their original text, and hand context +
//! question to the completion gateway. Every degradation short of a failed
//! question embedding is non-fatal: a failed query means empty context, a
//! failed completion means the fixed apology.

use anyhow::Result;

use crate::completion::{Completer, OpenAiCompleter, APOLOGY, SYSTEM_PROMPT};
use crate::config::Config;
use crate::embedding::{embed_one, Embedder, OpenAiEmbedder};
use crate::index::{PineconeIndex, VectorIndex};
use crate::models::{Answer, ContextOrigin, ContextPiece, QueryMatch};
use crate::session::SessionState;

/// Answer one question against the named index.
///
/// `source_file` names the upload whose cached text (if present in the
/// session) is preferred for context reconstruction. Question-embedding
/// failure propagates — the completion gateway is never consulted without
/// a question vector.
pub async fn answer_question(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    completer: &dyn Completer,
    session: &SessionState,
    index_name: &str,
    question: &str,
    top_k: usize,
    source_file: Option<&str>,
) -> Result<Answer> {
    let question_vector = embed_one(embedder, question).await?;

    let matches = match index.query(index_name, &question_vector, top_k).await {
        Ok(matches) => matches,
        Err(e) => {
            eprintln!("Warning: index query failed, answering without context: {}", e);
            Vec::new()
        }
    };

    let pieces = reconstruct_context(&matches, session, source_file);
    let context = pieces
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    if context.is_empty() {
        eprintln!("Warning: no relevant context found — answering from general knowledge");
    }

    let user_message = format!("Context: {}\n\nQuestion: {}", context, question);

    match completer.complete(SYSTEM_PROMPT, &user_message).await {
        Ok(text) => Ok(Answer {
            text,
            context,
            pieces,
            degraded: false,
        }),
        Err(e) => {
            eprintln!("Warning: completion failed: {}", e);
            Ok(Answer {
                text: APOLOGY.to_string(),
                context,
                pieces,
                degraded: true,
            })
        }
    }
}

/// Rebuild chunk text for each match, in match order, tagging each piece
/// with where its text came from.
///
/// Precedence per match:
/// 1. the session's cached text for `source_file`, when the match's `line`
///    is a valid index into its unfiltered line split — exact recovery;
/// 2. the `text` field stored in the record metadata;
/// 3. a placeholder derived from the record id (`-` → space). Degraded;
///    only reachable for records whose metadata omits `text`.
pub fn reconstruct_context(
    matches: &[QueryMatch],
    session: &SessionState,
    source_file: Option<&str>,
) -> Vec<ContextPiece> {
    matches
        .iter()
        .map(|m| {
            if let (Some(file), Some(meta)) = (source_file, m.metadata.as_ref()) {
                if let Some(line) = meta
                    .line
                    .and_then(|line_index| session.cached_line(file, line_index))
                {
                    return ContextPiece {
                        text: line.to_string(),
                        origin: ContextOrigin::CachedLine,
                    };
                }
            }

            if let Some(text) = m.metadata.as_ref().and_then(|meta| meta.text.clone()) {
                return ContextPiece {
                    text,
                    origin: ContextOrigin::MetadataText,
                };
            }

            ContextPiece {
                text: m.id.replace('-', " "),
                origin: ContextOrigin::IdPlaceholder,
            }
        })
        .collect()
}

/// CLI entry point: one-shot question with a fresh (cache-less) session.
pub async fn run_ask(
    config: &Config,
    question: &str,
    index_name: Option<String>,
    top_k: Option<usize>,
) -> Result<()> {
    let index_name = index_name.unwrap_or_else(|| config.pinecone.index.clone());
    let top_k = top_k.unwrap_or(config.retrieval.top_k);

    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let index = PineconeIndex::new(&config.pinecone)?;
    let completer = OpenAiCompleter::new(&config.openai)?;
    let session = SessionState::new();

    let answer = answer_question(
        &embedder, &index, &completer, &session, &index_name, question, top_k, None,
    )
    .await?;

    println!("{}", answer.text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            if self.fail {
                anyhow::bail!("simulated embedding failure");
            }
            Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
        }

        fn dims(&self) -> usize {
            2
        }
    }

    struct StubIndex {
        matches: Vec<QueryMatch>,
        fail: bool,
    }

    #[async_trait]
    impl VectorIndex for StubIndex {
        async fn ensure_ready(&self, _name: &str, _dims: usize) -> Result<()> {
            Ok(())
        }

        async fn upsert(
            &self,
            _name: &str,
            _records: &[crate::models::VectorRecord],
        ) -> Result<usize> {
            Ok(0)
        }

        async fn query(
            &self,
            _name: &str,
            _vector: &[f32],
            _top_k: usize,
        ) -> Result<Vec<QueryMatch>> {
            if self.fail {
                anyhow::bail!("simulated query failure");
            }
            Ok(self.matches.clone())
        }
    }

    struct StubCompleter {
        fail: bool,
        invoked: AtomicBool,
    }

    impl StubCompleter {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                invoked: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Completer for StubCompleter {
        async fn complete(&self, _system: &str, user: &str) -> Result<String> {
            self.invoked.store(true, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("simulated completion failure");
            }
            Ok(format!("answered: {}", user.len()))
        }
    }

    fn match_with(id: &str, line: usize, text: Option<&str>) -> QueryMatch {
        QueryMatch {
            id: id.to_string(),
            score: 0.9,
            metadata: Some(RecordMetadata {
                source: "notes.txt".to_string(),
                line: Some(line),
                text: text.map(|t| t.to_string()),
            }),
        }
    }

    #[test]
    fn test_cached_line_wins_over_metadata_text() {
        let mut session = SessionState::new();
        session.cache_text("notes.txt", "apple\n\nbanana");

        let matches = vec![match_with("doc-1-0", 2, Some("stale metadata copy"))];
        let pieces = reconstruct_context(&matches, &session, Some("notes.txt"));

        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].text, "banana");
        assert_eq!(pieces[0].origin, ContextOrigin::CachedLine);
    }

    #[test]
    fn test_round_trip_recovers_exact_line() {
        let raw = "first line\n\n  indented line  ";
        let mut session = SessionState::new();
        session.cache_text("notes.txt", raw);

        let matches = vec![match_with("doc-1-1", 2, None)];
        let pieces = reconstruct_context(&matches, &session, Some("notes.txt"));
        assert_eq!(pieces[0].text, "  indented line  ");
        assert_eq!(pieces[0].origin, ContextOrigin::CachedLine);
    }

    #[test]
    fn test_missing_cache_falls_back_to_metadata() {
        let session = SessionState::new();
        let matches = vec![match_with("doc-1-0", 0, Some("from metadata"))];

        let pieces = reconstruct_context(&matches, &session, Some("notes.txt"));
        assert_eq!(pieces[0].text, "from metadata");
        assert_eq!(pieces[0].origin, ContextOrigin::MetadataText);
    }

    #[test]
    fn test_out_of_range_line_falls_back_to_metadata() {
        let mut session = SessionState::new();
        session.cache_text("notes.txt", "only line");

        let matches = vec![match_with("doc-1-0", 99, Some("from metadata"))];
        let pieces = reconstruct_context(&matches, &session, Some("notes.txt"));
        assert_eq!(pieces[0].origin, ContextOrigin::MetadataText);
    }

    #[test]
    fn test_missing_line_field_falls_back_to_metadata() {
        let mut session = SessionState::new();
        session.cache_text("notes.txt", "apple");

        let matches = vec![QueryMatch {
            id: "doc-1-0".to_string(),
            score: 0.5,
            metadata: Some(RecordMetadata {
                source: "notes.txt".to_string(),
                line: None,
                text: Some("from metadata".to_string()),
            }),
        }];
        let pieces = reconstruct_context(&matches, &session, Some("notes.txt"));
        assert_eq!(pieces[0].origin, ContextOrigin::MetadataText);
        assert_eq!(pieces[0].text, "from metadata");
    }

    #[test]
    fn test_placeholder_when_metadata_has_no_text() {
        let session = SessionState::new();
        let matches = vec![match_with("doc-1700000000000-4", 0, None)];

        let pieces = reconstruct_context(&matches, &session, None);
        assert_eq!(pieces[0].text, "doc 1700000000000 4");
        assert_eq!(pieces[0].origin, ContextOrigin::IdPlaceholder);
    }

    #[test]
    fn test_pieces_follow_match_order() {
        let session = SessionState::new();
        let matches = vec![
            match_with("doc-1-0", 0, Some("second-best")),
            match_with("doc-1-1", 1, Some("best")),
        ];
        let pieces = reconstruct_context(&matches, &session, None);
        assert_eq!(pieces[0].text, "second-best");
        assert_eq!(pieces[1].text, "best");
    }

    #[tokio::test]
    async fn test_zero_matches_still_invokes_completer() {
        let embedder = StubEmbedder { fail: false };
        let index = StubIndex {
            matches: vec![],
            fail: false,
        };
        let completer = StubCompleter::new(false);
        let session = SessionState::new();

        let answer = answer_question(
            &embedder, &index, &completer, &session, "idx", "what?", 3, None,
        )
        .await
        .unwrap();

        assert!(completer.invoked.load(Ordering::SeqCst));
        assert_eq!(answer.context, "");
        assert!(!answer.text.is_empty());
        assert!(!answer.degraded);
    }

    #[tokio::test]
    async fn test_query_failure_degrades_to_empty_context() {
        let embedder = StubEmbedder { fail: false };
        let index = StubIndex {
            matches: vec![],
            fail: true,
        };
        let completer = StubCompleter::new(false);
        let session = SessionState::new();

        let answer = answer_question(
            &embedder, &index, &completer, &session, "idx", "what?", 3, None,
        )
        .await
        .unwrap();

        assert!(answer.pieces.is_empty());
        assert!(completer.invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_completion_failure_returns_apology() {
        let embedder = StubEmbedder { fail: false };
        let index = StubIndex {
            matches: vec![match_with("doc-1-0", 0, Some("apple"))],
            fail: false,
        };
        let completer = StubCompleter::new(true);
        let session = SessionState::new();

        let answer = answer_question(
            &embedder, &index, &completer, &session, "idx", "what?", 3, None,
        )
        .await
        .unwrap();

        assert_eq!(answer.text, APOLOGY);
        assert!(answer.degraded);
        assert_eq!(answer.context, "apple");
    }

    #[tokio::test]
    async fn test_embedding_failure_skips_completion() {
        let embedder = StubEmbedder { fail: true };
        let index = StubIndex {
            matches: vec![],
            fail: false,
        };
        let completer = StubCompleter::new(false);
        let session = SessionState::new();

        let result = answer_question(
            &embedder, &index, &completer, &session, "idx", "what?", 3, None,
        )
        .await;

        assert!(result.is_err());
        assert!(!completer.invoked.load(Ordering::SeqCst));
    }
}
