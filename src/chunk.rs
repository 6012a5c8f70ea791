//! Fixed-window character chunker.
//!
//! Text is cut into windows of at most `size` characters. Each window starts
//! `size - overlap` characters after the previous one, so neighbouring chunks
//! share exactly `overlap` characters. Counting is by Unicode scalar value,
//! never by byte, so multi-byte text is never split inside a character.

use crate::error::ChunkError;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Validated `(size, overlap)` pair. `overlap < size` is what guarantees the
/// scan always makes progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    size: usize,
    overlap: usize,
}

impl ChunkParams {
    pub fn new(size: usize, overlap: usize) -> Result<Self, ChunkError> {
        if size == 0 {
            return Err(ChunkError::ZeroSize);
        }
        if overlap >= size {
            return Err(ChunkError::OverlapTooLarge { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.size - self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split `text` into overlapping windows, left to right.
pub fn chunk(text: &str, max_size: usize, overlap: usize) -> Result<Vec<String>, ChunkError> {
    let params = ChunkParams::new(max_size, overlap)?;
    Ok(chunk_with(text, &params))
}

pub fn chunk_with(text: &str, params: &ChunkParams) -> Vec<String> {
    // Byte offset of every char, plus the end of the string, so windows can be
    // sliced by char position.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_len {
        let end = (start + params.size).min(char_len);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == char_len {
            break;
        }
        start += params.stride();
    }

    tracing::debug!(
        chars = char_len,
        chunks = chunks.len(),
        size = params.size,
        overlap = params.overlap,
        "chunked text"
    );
    chunks
}
