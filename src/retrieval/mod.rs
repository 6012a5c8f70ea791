pub mod embedder;
pub mod qdrant;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::RetrievalError;
use crate::llm::{Generator, Usage};
use crate::prompt::build_answer_prompt;

pub use embedder::Embedder;
pub use qdrant::{Passage, QdrantStore};

/// Chunks are embedded and upserted this many at a time. A failing batch
/// stops ingestion; earlier batches stay in the corpus.
const INGEST_BATCH: usize = 32;

#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<Passage>,
    #[serde(skip)]
    pub usage: Usage,
}

/// The shared document corpus.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Stores `chunks` under the `source` label and returns how many were stored.
    async fn ingest(&self, source: &str, chunks: &[String]) -> Result<usize, RetrievalError>;

    async fn answer(&self, query: &str) -> Result<Answer, RetrievalError>;
}

/// Turns text into vectors, one per input, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, RetrievalError>;
}

/// Vector storage with similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Stores `texts` with their vectors; `first_index` is the chunk index of
    /// `texts[0]` within the source document.
    async fn upsert(
        &self,
        source: &str,
        first_index: usize,
        texts: &[String],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), RetrievalError>;

    async fn search(&self, query_vector: Vec<f32>, top_k: u64) -> Result<Vec<Passage>, RetrievalError>;
}

/// Embeds, stores, and answers by stuffing the top passages into a single
/// generation prompt.
pub struct CorpusRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    top_k: u64,
}

impl CorpusRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        top_k: u64,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            top_k,
        }
    }
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn ingest(&self, source: &str, chunks: &[String]) -> Result<usize, RetrievalError> {
        let total = chunks.len();
        let mut stored = 0;

        for batch in chunks.chunks(INGEST_BATCH) {
            let result = async {
                let vectors = self.embedder.embed_batch(batch.to_vec()).await?;
                self.store.upsert(source, stored, batch, vectors).await
            }
            .await;

            if let Err(e) = result {
                tracing::warn!(source, stored, total, error = %e, "ingestion stopped");
                return Err(RetrievalError::PartialIngest {
                    stored,
                    total,
                    reason: e.to_string(),
                });
            }
            stored += batch.len();
        }

        tracing::info!(source, chunks = stored, "ingested document");
        Ok(stored)
    }

    async fn answer(&self, query: &str) -> Result<Answer, RetrievalError> {
        let query_vector = self
            .embedder
            .embed_batch(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("no vector for query".into()))?;

        let sources = self.store.search(query_vector, self.top_k).await?;
        tracing::debug!(passages = sources.len(), "retrieved passages");

        let passages: Vec<String> = sources.iter().map(|p| p.text.clone()).collect();
        let response = self
            .generator
            .generate(&build_answer_prompt(query, &passages))
            .await?;

        Ok(Answer {
            usage: response.usage(),
            text: response.text,
            sources,
        })
    }
}
