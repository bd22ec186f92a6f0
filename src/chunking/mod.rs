#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for splitting source text into chunks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Approximate character overlap between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Split text into an ordered sequence of overlapping chunks.
///
/// Every character of the input appears in at least one chunk. Chunks are at
/// most `chunk_size` characters long, and consecutive chunks overlap by
/// approximately `overlap` characters. The split prefers whitespace break
/// points in the back half of each window so words are not cut mid-token
/// when a natural boundary is available. Deterministic for identical input
/// and parameters; empty input produces an empty sequence.
#[inline]
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let total = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let window_end = (start + chunk_size).min(total);
        let mut cut = window_end;

        if window_end < total {
            // Break after the last whitespace in the back half of the window,
            // falling back to a hard cut when the window has none.
            let search_from = start + chunk_size / 2;
            if let Some(ws) = (search_from..window_end)
                .rev()
                .find(|&i| chars[i].1.is_whitespace())
            {
                cut = ws + 1;
            }
        }

        let byte_start = chars[start].0;
        let byte_end = if cut == total {
            text.len()
        } else {
            chars[cut].0
        };
        chunks.push(text[byte_start..byte_end].to_string());

        if cut == total {
            break;
        }

        // Step back for overlap, always advancing at least one character.
        start = cut.saturating_sub(overlap).max(start + 1);
    }

    debug!(
        "Split {} characters into {} chunks (size {}, overlap {})",
        total,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

/// Split using the sizes carried by a [`ChunkingConfig`].
#[inline]
pub fn split_with_config(text: &str, config: &ChunkingConfig) -> Vec<String> {
    split_text(text, config.chunk_size, config.chunk_overlap)
}
