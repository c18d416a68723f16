//! Core data models used throughout ragline.
//!
//! These types represent the chunks, vector records, and query results that
//! flow through the ingestion and answer pipelines, plus the session-scoped
//! chat types.

use serde::{Deserialize, Deserializer, Serialize};

/// One non-blank line of uploaded text — the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source_file: String,
    /// Position in the *original, unfiltered* line sequence of the file.
    /// Blank lines consume an index but never become a chunk, so cached-line
    /// reconstruction can index straight into the raw text's line split.
    pub line_index: usize,
}

/// Metadata stored alongside each vector in the index.
///
/// `text` carries the chunk verbatim so answers can be reconstructed even
/// when the uploading session (and its text cache) is gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
    /// Line index in the source file. Always written by this crate's
    /// ingestion; optional on read because records written by other
    /// producers may omit it. The index hands numeric metadata back as a
    /// JSON float, so deserialization accepts either number form.
    #[serde(
        default,
        deserialize_with = "line_from_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn line_from_number<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.max(0.0) as usize))
}

/// The persisted representation of a [`Chunk`] in the external index.
///
/// `id` must be unique within the index — collisions silently overwrite.
/// Ids are built from the upload timestamp plus the chunk ordinal.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

/// One nearest-neighbor result. Ephemeral — produced per query, never stored.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    /// Cosine similarity; higher is closer.
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<RecordMetadata>,
}

/// Where the reconstructed text of a context piece came from.
///
/// The precedence is cache → metadata → placeholder; the tag keeps the
/// degraded branches observable instead of vanishing into a joined string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOrigin {
    /// Exact line recovered from the session's text cache.
    CachedLine,
    /// The `text` field stored in the record's metadata.
    MetadataText,
    /// Human-unreadable fallback derived from the record id. Only reachable
    /// for records whose metadata omits `text`.
    IdPlaceholder,
}

/// A single reconstructed chunk of context, tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPiece {
    pub text: String,
    pub origin: ContextOrigin,
}

/// The answer pipeline's result: generated text plus the context actually
/// used, kept inspectable for callers and tests.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Reconstructed chunk texts joined by newlines, in match order.
    pub context: String,
    pub pieces: Vec<ContextPiece>,
    /// True when the completion call failed and `text` is the fixed apology.
    pub degraded: bool,
}

/// Outcome of an ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { upserted: usize },
    /// The file had no non-blank lines (or every embedding failed) — nothing
    /// reached the index. Distinct from a hard failure.
    NoChunks,
}

/// Speaker role for a chat history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the session's append-only chat history.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}
