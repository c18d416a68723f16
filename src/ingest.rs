//! Ingestion pipeline orchestration.
//!
//! Coordinates the upload flow: line chunking → index provisioning →
//! batch embedding → one batch upsert. Embedding failures are non-fatal:
//! a failed batch is retried chunk by chunk, and a chunk that still fails
//! is skipped without blocking the rest.

use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::chunk::split_lines;
use crate::config::Config;
use crate::embedding::{Embedder, OpenAiEmbedder};
use crate::index::{PineconeIndex, VectorIndex};
use crate::models::{Chunk, RecordMetadata, UploadOutcome, VectorRecord};

/// Ingest one uploaded file into the named index.
///
/// Record ids are `doc-{upload_millis}-{ordinal}` where the ordinal is the
/// chunk's position in the filtered sequence — unique per upload; identical
/// ids across uploads silently overwrite in the index, which is the intended
/// re-upload behavior.
///
/// The text cache is the caller's concern; this pipeline only talks to the
/// gateways.
pub async fn ingest_file(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    batch_size: usize,
    index_name: &str,
    raw_text: &str,
    source_file: &str,
) -> Result<UploadOutcome> {
    let chunks = split_lines(source_file, raw_text);
    if chunks.is_empty() {
        return Ok(UploadOutcome::NoChunks);
    }

    index.ensure_ready(index_name, embedder.dims()).await?;

    let upload_millis = Utc::now().timestamp_millis();
    let embedded = embed_chunks(embedder, &chunks, batch_size).await;

    let records: Vec<VectorRecord> = embedded
        .into_iter()
        .map(|(ordinal, chunk, values)| VectorRecord {
            id: format!("doc-{}-{}", upload_millis, ordinal),
            values,
            metadata: RecordMetadata {
                source: chunk.source_file.clone(),
                line: Some(chunk.line_index),
                text: Some(chunk.text.clone()),
            },
        })
        .collect();

    if records.is_empty() {
        return Ok(UploadOutcome::NoChunks);
    }

    let upserted = index.upsert(index_name, &records).await?;
    Ok(UploadOutcome::Uploaded { upserted })
}

/// Embed chunks in batches. A failed batch falls back to per-chunk calls so
/// one poisoned input cannot sink its whole batch; chunks that still fail
/// are skipped with a warning.
///
/// Each surviving chunk keeps its ordinal in the filtered chunk sequence,
/// so record ids stay stable even when earlier chunks are skipped.
async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: &[Chunk],
    batch_size: usize,
) -> Vec<(usize, Chunk, Vec<f32>)> {
    let indexed: Vec<(usize, &Chunk)> = chunks.iter().enumerate().collect();
    let mut survived = Vec::with_capacity(chunks.len());

    for batch in indexed.chunks(batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(|(_, c)| c.text.clone()).collect();

        match embedder.embed_batch(&texts).await {
            Ok(vectors) => {
                for ((ordinal, chunk), vector) in batch.iter().zip(vectors) {
                    survived.push((*ordinal, (*chunk).clone(), vector));
                }
            }
            Err(batch_err) => {
                eprintln!("Warning: embedding batch failed, retrying per chunk: {}", batch_err);
                for (ordinal, chunk) in batch {
                    match embedder.embed_batch(&[chunk.text.clone()]).await {
                        Ok(mut vectors) if !vectors.is_empty() => {
                            survived.push((*ordinal, (*chunk).clone(), vectors.remove(0)));
                        }
                        Ok(_) => {
                            eprintln!(
                                "Warning: empty embedding for line {} — skipped",
                                chunk.line_index
                            );
                        }
                        Err(e) => {
                            eprintln!(
                                "Warning: embedding failed for line {} — skipped: {}",
                                chunk.line_index, e
                            );
                        }
                    }
                }
            }
        }
    }

    survived
}

/// CLI entry point: read a file and ingest it, printing a summary.
pub async fn run_upload(config: &Config, path: &Path, index_name: Option<String>) -> Result<()> {
    let raw_text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    let source_file = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.txt")
        .to_string();
    let index_name = index_name.unwrap_or_else(|| config.pinecone.index.clone());

    let embedder = OpenAiEmbedder::new(&config.openai)?;
    let index = PineconeIndex::new(&config.pinecone)?;

    let chunk_count = split_lines(&source_file, &raw_text).len();
    let outcome = ingest_file(
        &embedder,
        &index,
        config.ingest.batch_size,
        &index_name,
        &raw_text,
        &source_file,
    )
    .await?;

    println!("upload {}", source_file);
    println!("  index: {}", index_name);
    println!("  chunks found: {}", chunk_count);
    match outcome {
        UploadOutcome::Uploaded { upserted } => {
            if upserted < chunk_count {
                println!("  skipped: {}", chunk_count - upserted);
            }
            println!("  vectors upserted: {}", upserted);
            println!("ok");
        }
        UploadOutcome::NoChunks => {
            println!("  nothing to upload — file has no usable text");
        }
    }

    Ok(())
}
