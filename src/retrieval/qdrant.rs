use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    VectorParamsBuilder,
};
use async_trait::async_trait;
use qdrant_client::{Payload, Qdrant};
use serde::Serialize;

use super::VectorStore;
use crate::error::RetrievalError;

/// A stored chunk returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    pub chunk_index: i64,
    pub score: f32,
}

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
}

fn corpus_err(context: &str) -> impl Fn(qdrant_client::QdrantError) -> RetrievalError + '_ {
    move |e| RetrievalError::Corpus(format!("{context}: {e}"))
}

impl QdrantStore {
    /// Connects and creates the collection if it does not exist yet. An
    /// existing collection is reused as-is.
    pub async fn open(
        url: &str,
        api_key: Option<&str>,
        collection: &str,
        dimension: usize,
    ) -> Result<Self, RetrievalError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key.to_string());
        }
        let client = builder.build().map_err(corpus_err("failed to connect to Qdrant"))?;

        let exists = client
            .collection_exists(collection)
            .await
            .map_err(corpus_err("collection lookup failed"))?;
        if !exists {
            client
                .create_collection(
                    CreateCollectionBuilder::new(collection)
                        .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
                )
                .await
                .map_err(corpus_err("failed to create collection"))?;
            tracing::info!(collection, dimension, "created collection");
        }

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(
        &self,
        source: &str,
        first_index: usize,
        texts: &[String],
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), RetrievalError> {
        let ingested_at = chrono::Utc::now().to_rfc3339();
        let points: Vec<PointStruct> = texts
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(offset, (text, vector))| {
                let mut payload = Payload::new();
                payload.insert("text", text.clone());
                payload.insert("source", source.to_string());
                payload.insert("chunk_index", (first_index + offset) as i64);
                payload.insert("ingested_at", ingested_at.clone());
                PointStruct::new(uuid::Uuid::new_v4().to_string(), vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(corpus_err("upsert failed"))?;
        Ok(())
    }

    async fn search(&self, query_vector: Vec<f32>, top_k: u64) -> Result<Vec<Passage>, RetrievalError> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector, top_k).with_payload(true),
            )
            .await
            .map_err(corpus_err("search failed"))?;

        let passages = results
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let text = payload
                    .get("text")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let source = payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let chunk_index = payload
                    .get("chunk_index")
                    .and_then(|v| v.as_integer())
                    .unwrap_or_default();

                Passage {
                    text,
                    source,
                    chunk_index,
                    score: point.score,
                }
            })
            .collect();

        Ok(passages)
    }
}
