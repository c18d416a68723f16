//! Line-granular chunker.
//!
//! Splits uploaded text on newlines into [`Chunk`]s, one per non-blank line.
//! Whitespace-only lines are dropped. `line_index` is the position in the
//! *original* line sequence, so a chunk's line number always indexes back
//! into the unfiltered split of the raw text — exact cached-line recovery
//! depends on this.

use crate::models::Chunk;

/// Split raw file text into line chunks.
///
/// Blank and whitespace-only lines never produce a chunk but still consume
/// a line index. Chunk text is the trimmed line.
pub fn split_lines(source_file: &str, raw_text: &str) -> Vec<Chunk> {
    raw_text
        .split('\n')
        .enumerate()
        .filter_map(|(line_index, line)| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(Chunk {
                text: trimmed.to_string(),
                source_file: source_file.to_string(),
                line_index,
            })
        })
        .collect()
}
