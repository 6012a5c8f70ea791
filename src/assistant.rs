//! The assistant façade shared by the CLI and the HTTP server.
//!
//! Owns the generation client, the corpus and the action log, and runs every
//! session action through the same timing/logging wrapper.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::chunk::{chunk_with, ChunkParams};
use crate::config::Config;
use crate::document::parse_upload;
use crate::error::{ActionError, GenerationError, IngestError};
use crate::instrumentation::{ActionLogger, ActionRecord};
use crate::llm::{Generator, LlmClient, LlmResponse, Usage};
use crate::prompt::ImprovementFocus;
use crate::retrieval::{Answer, CorpusRetriever, Embedder, QdrantStore, Retriever};
use crate::session::{self, ChatSession, DraftSession, Improvement, Suggestions};

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub characters: usize,
    pub chunks: usize,
}

impl IngestReport {
    pub fn message(&self) -> String {
        format!("Document processed and indexed with {} chunks.", self.chunks)
    }
}

pub struct Assistant {
    generator: Arc<dyn Generator>,
    retriever: Arc<dyn Retriever>,
    chunking: ChunkParams,
    max_upload_bytes: usize,
    logger: Option<ActionLogger>,
}

impl Assistant {
    /// Connects every external collaborator. Called once at startup; the
    /// corpus handle it opens is shared by all sessions.
    pub async fn new(config: &Config) -> Result<Self> {
        let generator: Arc<dyn Generator> = Arc::new(LlmClient::new(
            &config.llm_api_key,
            &config.llm_base_url,
            &config.generation_model,
        ));

        let embedding_model = config.embedding_model.clone();
        let embedder = tokio::task::spawn_blocking(move || Embedder::new(&embedding_model)).await??;
        let store = QdrantStore::open(
            &config.qdrant_url,
            config.qdrant_api_key.as_deref(),
            &config.qdrant_collection,
            embedder.dimension(),
        )
        .await?;
        let retriever = Arc::new(CorpusRetriever::new(
            Arc::new(embedder),
            Arc::new(store),
            Arc::clone(&generator),
            config.top_k,
        ));

        tracing::info!(
            model = %config.generation_model,
            collection = %config.qdrant_collection,
            "assistant ready"
        );

        Ok(Self::with_clients(generator, retriever, config.chunking, config.max_upload_bytes)
            .with_logger(ActionLogger::new(&config.log_dir)?))
    }

    pub fn with_clients(
        generator: Arc<dyn Generator>,
        retriever: Arc<dyn Retriever>,
        chunking: ChunkParams,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            generator,
            retriever,
            chunking,
            max_upload_bytes,
            logger: None,
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn with_logger(mut self, logger: ActionLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub async fn ingest_upload(
        &self,
        source: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<IngestReport, IngestError> {
        let document = parse_upload(bytes, content_type, self.max_upload_bytes).map_err(|e| {
            tracing::warn!(source, content_type, error = %e, "upload rejected");
            e
        })?;

        let chunks = chunk_with(&document.text, &self.chunking);
        let stored = self.retriever.ingest(source, &chunks).await?;

        Ok(IngestReport {
            source: source.to_string(),
            characters: document.text.chars().count(),
            chunks: stored,
        })
    }

    pub async fn ask(&self, chat: &mut ChatSession, query: &str) -> Result<Answer, ActionError> {
        let started = Instant::now();
        let result = chat.ask(query, self.retriever.as_ref()).await;
        let (output, usage) = result
            .as_ref()
            .map(|a| (a.text.len(), a.usage))
            .unwrap_or_default();
        self.record("ask", query.len(), output, usage, started, result.as_ref().err());
        result
    }

    pub async fn suggest(&self, draft: &DraftSession) -> Result<Suggestions, ActionError> {
        let started = Instant::now();
        let generator = Metered::new(self.generator.as_ref());
        let result = draft.suggest(&generator).await;
        let output = result.as_ref().map(|s| s.raw.len()).unwrap_or_default();
        self.record(
            "suggest",
            draft.text().len(),
            output,
            generator.usage(),
            started,
            result.as_ref().err(),
        );
        result
    }

    pub async fn continue_draft(&self, draft: &mut DraftSession) -> Result<String, ActionError> {
        let started = Instant::now();
        let generator = Metered::new(self.generator.as_ref());
        let input = draft.text().len();
        let result = draft.continue_draft(&generator).await.map(str::to_string);
        let output = result.as_ref().map(String::len).unwrap_or_default();
        self.record("continue", input, output, generator.usage(), started, result.as_ref().err());
        result
    }

    pub async fn rewrite(&self, draft: &mut DraftSession) -> Result<String, ActionError> {
        let started = Instant::now();
        let generator = Metered::new(self.generator.as_ref());
        let input = draft.text().len();
        let result = draft.rewrite(&generator).await.map(str::to_string);
        let output = result.as_ref().map(String::len).unwrap_or_default();
        self.record("rewrite", input, output, generator.usage(), started, result.as_ref().err());
        result
    }

    pub async fn enhance(&self, draft: &mut DraftSession) -> Result<String, ActionError> {
        let started = Instant::now();
        let generator = Metered::new(self.generator.as_ref());
        let input = draft.text().len();
        let result = draft.enhance(&generator).await.map(str::to_string);
        let output = result.as_ref().map(String::len).unwrap_or_default();
        self.record("enhance", input, output, generator.usage(), started, result.as_ref().err());
        result
    }

    pub async fn improve(
        &self,
        text: &str,
        focus: ImprovementFocus,
    ) -> Result<Improvement, ActionError> {
        let started = Instant::now();
        let generator = Metered::new(self.generator.as_ref());
        let result = session::improve(text, focus, &generator).await;
        let output = result.as_ref().map(|i| i.analysis.len()).unwrap_or_default();
        self.record("improve", text.len(), output, generator.usage(), started, result.as_ref().err());
        result
    }

    fn record(
        &self,
        action: &str,
        input_chars: usize,
        output_chars: usize,
        usage: Usage,
        started: Instant,
        error: Option<&ActionError>,
    ) {
        let latency_ms = started.elapsed().as_millis() as u64;
        match error {
            None => tracing::info!(
                action,
                latency_ms,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "action completed"
            ),
            Some(e) => tracing::warn!(action, latency_ms, error = %e, "action failed"),
        }

        let Some(logger) = &self.logger else {
            return;
        };
        let mut record = ActionRecord::new(action, self.generator.model(), input_chars);
        record.output_chars = output_chars;
        record.input_tokens = usage.input_tokens;
        record.output_tokens = usage.output_tokens;
        record.latency_ms = latency_ms;
        record.success = error.is_none();
        record.error = error.map(ToString::to_string);
        tracing::debug!("{}", record.summary());
        if let Err(e) = logger.write(&record) {
            tracing::warn!(error = %e, "failed to write action log");
        }
    }
}

/// Sums the token usage of every generation call made through it.
struct Metered<'a> {
    inner: &'a dyn Generator,
    input_tokens: AtomicU32,
    output_tokens: AtomicU32,
}

impl<'a> Metered<'a> {
    fn new(inner: &'a dyn Generator) -> Self {
        Self {
            inner,
            input_tokens: AtomicU32::new(0),
            output_tokens: AtomicU32::new(0),
        }
    }

    fn usage(&self) -> Usage {
        Usage {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl<'a> Generator for Metered<'a> {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse, GenerationError> {
        let response = self.inner.generate(prompt).await?;
        self.input_tokens.fetch_add(response.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(response.output_tokens, Ordering::Relaxed);
        Ok(response)
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalError;
    use crate::retrieval::Passage;

    struct CountingGenerator;

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<LlmResponse, GenerationError> {
            Ok(LlmResponse {
                text: "1. and then it rained.".into(),
                input_tokens: 120,
                output_tokens: 9,
            })
        }

        fn model(&self) -> &str {
            "counting"
        }
    }

    struct FixedRetriever;

    #[async_trait]
    impl Retriever for FixedRetriever {
        async fn ingest(&self, _source: &str, chunks: &[String]) -> Result<usize, RetrievalError> {
            Ok(chunks.len())
        }

        async fn answer(&self, _query: &str) -> Result<Answer, RetrievalError> {
            Ok(Answer {
                text: "Tides.".into(),
                sources: Vec::<Passage>::new(),
                usage: Usage {
                    input_tokens: 300,
                    output_tokens: 2,
                },
            })
        }
    }

    fn read_records(dir: &std::path::Path) -> Vec<ActionRecord> {
        std::fs::read_to_string(dir.join("actions.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_action_log_records_token_usage() {
        let dir = tempfile::tempdir().unwrap();
        let assistant = Assistant::with_clients(
            Arc::new(CountingGenerator),
            Arc::new(FixedRetriever),
            ChunkParams::default(),
            1024,
        )
        .with_logger(ActionLogger::new(dir.path().to_str().unwrap()).unwrap());

        let mut draft = DraftSession::default();
        draft.set_text("It was cloudy");
        assistant.continue_draft(&mut draft).await.unwrap();
        assistant
            .ask(&mut ChatSession::default(), "What is it about?")
            .await
            .unwrap();
        let err = assistant.rewrite(&mut DraftSession::default()).await;
        assert!(err.is_err());

        let records = read_records(dir.path());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].action, "continue");
        assert_eq!((records[0].input_tokens, records[0].output_tokens), (120, 9));
        assert_eq!(records[0].model, "counting");
        assert_eq!(records[1].action, "ask");
        assert_eq!((records[1].input_tokens, records[1].output_tokens), (300, 2));
        assert!(!records[2].success);
        assert_eq!((records[2].input_tokens, records[2].output_tokens), (0, 0));
    }
}
