//! Error taxonomy.
//!
//! Configuration problems are fatal at startup. Everything else is recovered
//! at the call site: parse failures become a message next to the upload, and
//! generation/retrieval failures become an [`ActionError`] whose `Display` is
//! shown to the user verbatim.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a number, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("invalid chunking parameters: {0}")]
    Chunking(#[from] ChunkError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge { size: usize, overlap: usize },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("could not read {media_type} file: {reason}")]
    Unreadable { media_type: String, reason: String },

    #[error("no text could be extracted from the file")]
    Empty,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to reach the generation API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("generation API returned no text")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("corpus error: {0}")]
    Corpus(String),

    #[error("ingestion stopped after {stored} of {total} chunks: {reason}")]
    PartialIngest {
        stored: usize,
        total: usize,
        reason: String,
    },

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Failure of a user action. The message is what the user sees.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Error generating continuation: {0}")]
    Continue(String),

    #[error("Error generating rewrite: {0}")]
    Rewrite(String),

    #[error("Error enhancing text: {0}")]
    Enhance(String),

    #[error("Error generating suggestions: {0}")]
    Suggest(String),

    #[error("Error generating improvements: {0}")]
    Improve(String),

    #[error("Error answering question: {0}")]
    Ask(String),

    #[error("Error generating continuation: could not find a numbered suggestion in the response")]
    UnparseableSuggestions,

    #[error("Write some text before asking for {0}.")]
    EmptyDraft(&'static str),

    #[error("Please enter some text first.")]
    EmptyInput,
}

impl ActionError {
    /// True when the external service failed, as opposed to bad input.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, Self::EmptyDraft(_) | Self::EmptyInput)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to parse the uploaded file: {0}")]
    Parse(#[from] ParseError),

    #[error("Failed to index the document: {0}")]
    Retrieval(#[from] RetrievalError),
}
