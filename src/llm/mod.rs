pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub use client::{LlmClient, LlmResponse};

/// Token counts reported by the provider. Zero when the response carried no
/// usage block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Prompt in, text out. The seam that session handlers and the answer chain
/// depend on, so tests can swap in a stub.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, GenerationError>;

    fn model(&self) -> &str;
}
