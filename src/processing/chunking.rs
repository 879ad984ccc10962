//! Word-count chunking for summarization requests.
//!
//! Text is split on whitespace and regrouped into chunks of at most `words_per_chunk` words,
//! joined by single spaces. Chunk order follows word order, which is what keeps concatenated
//! summaries in source order.

use super::types::ChunkingError;

/// Collapse every run of whitespace into a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split `text` into ordered chunks of up to `words_per_chunk` words.
///
/// Returns an empty vector when the text contains no words. Every chunk but the last holds
/// exactly `words_per_chunk` words.
pub fn chunk_words(text: &str, words_per_chunk: usize) -> Result<Vec<String>, ChunkingError> {
    if words_per_chunk == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    Ok(words
        .chunks(words_per_chunk)
        .map(|chunk| chunk.join(" "))
        .collect())
}
