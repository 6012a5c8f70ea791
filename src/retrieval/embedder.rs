use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::EmbeddingProvider;
use crate::error::RetrievalError;

/// Local sentence embedder. Embedding is CPU-bound, so the async provider
/// impl runs it on the blocking pool.
#[derive(Clone)]
pub struct Embedder {
    model: Arc<TextEmbedding>,
    dimension: usize,
}

impl Embedder {
    pub fn new(model_name: &str) -> Result<Self, RetrievalError> {
        let model_type = match model_name {
            "sentence-transformers/all-MiniLM-L6-v2" | "all-MiniLM-L6-v2" => {
                EmbeddingModel::AllMiniLML6V2
            }
            "BAAI/bge-small-en-v1.5" | "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "mixedbread-ai/mxbai-embed-large-v1" => EmbeddingModel::MxbaiEmbedLargeV1,
            "nomic-ai/nomic-embed-text-v1.5" => EmbeddingModel::NomicEmbedTextV15,
            _ => {
                return Err(RetrievalError::Embedding(format!(
                    "unsupported embedding model: {model_name}"
                )))
            }
        };

        let model =
            TextEmbedding::try_new(InitOptions::new(model_type).with_show_download_progress(true))
                .map_err(|e| RetrievalError::Embedding(format!("failed to load model: {e}")))?;

        // The collection is created with this size, so probe it once up front.
        let probe = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;
        let dimension = probe.first().map(Vec::len).unwrap_or_default();

        tracing::info!(model = model_name, dimension, "embedding model ready");
        Ok(Self {
            model: Arc::new(model),
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RetrievalError> {
        self.model
            .embed(texts, None)
            .map_err(|e| RetrievalError::Embedding(e.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for Embedder {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let embedder = self.clone();
        tokio::task::spawn_blocking(move || embedder.embed(texts))
            .await
            .map_err(|e| RetrievalError::Embedding(format!("embedding task failed: {e}")))?
    }
}
