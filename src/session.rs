//! Per-session state and the action handlers that drive it.
//!
//! Each panel owns its own state: the document chat keeps a conversation
//! history, the drafting panel keeps the draft and its selected options, and
//! the improvement panel keeps nothing. Handlers only touch state after the
//! external call has succeeded, so a failed action leaves everything as it
//! was and hands back an [`ActionError`] for display.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ActionError;
use crate::llm::Generator;
use crate::prompt::{
    build_continuation_prompt, build_enhance_prompt, build_improvement_prompt,
    build_rewrite_prompt, clamp_count, ContinuationStyle, ImprovementFocus, DEFAULT_SUGGESTIONS,
};
use crate::retrieval::{Answer, Retriever};
use crate::suggestions::{first_item_line, parse_numbered_list, Suggestion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<Turn>,
}

impl ChatSession {
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Asks the corpus. On success the question and answer are appended as a
    /// pair; on failure the history is untouched.
    pub async fn ask(
        &mut self,
        query: &str,
        retriever: &dyn Retriever,
    ) -> Result<Answer, ActionError> {
        if query.trim().is_empty() {
            return Err(ActionError::EmptyInput);
        }

        let answer = retriever
            .answer(query)
            .await
            .map_err(|e| ActionError::Ask(e.to_string()))?;

        self.history.push(Turn {
            speaker: Speaker::User,
            message: query.to_string(),
        });
        self.history.push(Turn {
            speaker: Speaker::Assistant,
            message: answer.text.clone(),
        });
        Ok(answer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftPhase {
    Idle,
    Drafting,
}

/// Generated suggestions. `items` is empty when the response was not a
/// numbered list; `raw` is always kept for display.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestions {
    pub raw: String,
    pub items: Vec<Suggestion>,
}

#[derive(Debug, Clone)]
pub struct DraftSession {
    text: String,
    style: ContinuationStyle,
    count: usize,
}

impl Default for DraftSession {
    fn default() -> Self {
        Self {
            text: String::new(),
            style: ContinuationStyle::General,
            count: DEFAULT_SUGGESTIONS,
        }
    }
}

impl DraftSession {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> ContinuationStyle {
        self.style
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn phase(&self) -> DraftPhase {
        if self.text.trim().is_empty() {
            DraftPhase::Idle
        } else {
            DraftPhase::Drafting
        }
    }

    /// User edits replace the draft wholesale.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_style(&mut self, style: ContinuationStyle) {
        self.style = style;
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = clamp_count(count);
    }

    fn require_draft(&self, action: &'static str) -> Result<(), ActionError> {
        match self.phase() {
            DraftPhase::Idle => Err(ActionError::EmptyDraft(action)),
            DraftPhase::Drafting => Ok(()),
        }
    }

    pub async fn suggest(&self, generator: &dyn Generator) -> Result<Suggestions, ActionError> {
        self.require_draft("suggestions")?;
        let prompt = build_continuation_prompt(&self.text, self.style, self.count);
        let raw = generator
            .generate(&prompt)
            .await
            .map_err(|e| ActionError::Suggest(e.to_string()))?
            .text;
        let items = parse_numbered_list(&raw).unwrap_or_default();
        Ok(Suggestions { raw, items })
    }

    /// Requests a single continuation and appends it after one space. Only
    /// the first line of the first numbered item is used.
    pub async fn continue_draft(&mut self, generator: &dyn Generator) -> Result<&str, ActionError> {
        self.require_draft("a continuation")?;
        let prompt = build_continuation_prompt(&self.text, self.style, 1);
        let response = generator
            .generate(&prompt)
            .await
            .map_err(|e| ActionError::Continue(e.to_string()))?
            .text;

        let first = first_item_line(&response).ok_or(ActionError::UnparseableSuggestions)?;

        self.text.push(' ');
        self.text.push_str(&first);
        Ok(&self.text)
    }

    pub async fn rewrite(&mut self, generator: &dyn Generator) -> Result<&str, ActionError> {
        self.require_draft("a rewrite")?;
        let prompt = build_rewrite_prompt(&self.text, self.style);
        self.text = generator
            .generate(&prompt)
            .await
            .map_err(|e| ActionError::Rewrite(e.to_string()))?
            .text;
        Ok(&self.text)
    }

    pub async fn enhance(&mut self, generator: &dyn Generator) -> Result<&str, ActionError> {
        self.require_draft("an enhancement")?;
        let prompt = build_enhance_prompt(&self.text);
        self.text = generator
            .generate(&prompt)
            .await
            .map_err(|e| ActionError::Enhance(e.to_string()))?
            .text;
        Ok(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextStats {
    pub words: usize,
    pub characters: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            words: text.split_whitespace().count(),
            characters: text.chars().count(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Improvement {
    pub analysis: String,
    pub focus: ImprovementFocus,
    pub stats: TextStats,
}

/// Stateless improvement analysis.
pub async fn improve(
    text: &str,
    focus: ImprovementFocus,
    generator: &dyn Generator,
) -> Result<Improvement, ActionError> {
    if text.trim().is_empty() {
        return Err(ActionError::EmptyInput);
    }
    let analysis = generator
        .generate(&build_improvement_prompt(text, focus))
        .await
        .map_err(|e| ActionError::Improve(e.to_string()))?
        .text;
    Ok(Improvement {
        analysis,
        focus,
        stats: TextStats::of(text),
    })
}

/// One browser session: an independent chat panel and drafting panel.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub chat: ChatSession,
    pub draft: DraftSession,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            chat: ChatSession::default(),
            draft: DraftSession::default(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, RetrievalError};
    use crate::llm::{LlmResponse, Usage};
    use crate::retrieval::Passage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a fixed response and records every prompt it receives.
    struct ScriptedGenerator {
        response: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn ok(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                response: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<LlmResponse, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let text = self.response.clone().map_err(GenerationError::Other)?;
            Ok(LlmResponse {
                text,
                input_tokens: 0,
                output_tokens: 0,
            })
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    struct StubRetriever {
        fail: bool,
    }

    #[async_trait]
    impl Retriever for StubRetriever {
        async fn ingest(&self, _source: &str, chunks: &[String]) -> Result<usize, RetrievalError> {
            Ok(chunks.len())
        }

        async fn answer(&self, query: &str) -> Result<Answer, RetrievalError> {
            if self.fail {
                return Err(RetrievalError::Corpus("connection refused".into()));
            }
            Ok(Answer {
                text: format!("answer to {query}"),
                sources: vec![Passage {
                    text: "passage".into(),
                    source: "notes.txt".into(),
                    chunk_index: 0,
                    score: 0.9,
                }],
                usage: Usage::default(),
            })
        }
    }

    fn drafting(text: &str) -> DraftSession {
        let mut draft = DraftSession::default();
        draft.set_text(text);
        draft
    }

    #[tokio::test]
    async fn test_continue_appends_first_item() {
        let generator = ScriptedGenerator::ok("1. the sky cleared.\n2. ignored");
        let mut draft = drafting("After the storm,");
        let text = draft.continue_draft(&generator).await.unwrap();
        assert_eq!(text, "After the storm, the sky cleared.");
        assert!(generator.last_prompt().contains("1. [Suggestion 1]"));
        assert!(!generator.last_prompt().contains("2. [Suggestion 2]"));
    }

    #[tokio::test]
    async fn test_continue_ignores_model_commentary() {
        let generator = ScriptedGenerator::ok(
            "1. the sky cleared.\nThis continuation keeps a calm, reflective tone.",
        );
        let mut draft = drafting("After the storm,");
        let text = draft.continue_draft(&generator).await.unwrap();
        assert_eq!(text, "After the storm, the sky cleared.");
    }

    #[tokio::test]
    async fn test_continue_rejects_unnumbered_output() {
        let generator = ScriptedGenerator::ok("the sky cleared.");
        let mut draft = drafting("After the storm,");
        let err = draft.continue_draft(&generator).await.unwrap_err();
        assert!(matches!(err, ActionError::UnparseableSuggestions));
        assert_eq!(draft.text(), "After the storm,");
    }

    #[tokio::test]
    async fn test_failures_leave_draft_unchanged() {
        let generator = ScriptedGenerator::failing("API Error");
        let mut draft = drafting("Original draft.");

        let err = draft.continue_draft(&generator).await.unwrap_err();
        assert!(err.to_string().starts_with("Error generating continuation"));
        assert!(err.to_string().contains("API Error"));

        let err = draft.rewrite(&generator).await.unwrap_err();
        assert!(err.to_string().starts_with("Error generating rewrite"));

        let err = draft.enhance(&generator).await.unwrap_err();
        assert!(err.to_string().starts_with("Error enhancing"));

        let err = draft.suggest(&generator).await.unwrap_err();
        assert!(err.to_string().starts_with("Error generating suggestions"));

        assert_eq!(draft.text(), "Original draft.");
    }

    #[tokio::test]
    async fn test_rewrite_and_enhance_replace_draft() {
        let mut draft = drafting("hey whats up");
        draft.set_style(ContinuationStyle::Formal);

        let generator = ScriptedGenerator::ok("Good afternoon.");
        assert_eq!(draft.rewrite(&generator).await.unwrap(), "Good afternoon.");
        assert!(generator.last_prompt().contains("in a formal style"));

        let generator = ScriptedGenerator::ok("A most gracious good afternoon.");
        assert_eq!(
            draft.enhance(&generator).await.unwrap(),
            "A most gracious good afternoon."
        );
        assert!(generator.last_prompt().ends_with(": Good afternoon."));
    }

    #[tokio::test]
    async fn test_idle_draft_refuses_actions() {
        let generator = ScriptedGenerator::ok("1. never used");
        let mut draft = drafting("   ");
        assert_eq!(draft.phase(), DraftPhase::Idle);
        let err = draft.continue_draft(&generator).await.unwrap_err();
        assert!(!err.is_upstream());
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_suggest_uses_selected_count() {
        let generator = ScriptedGenerator::ok("1. a\n2. b");
        let mut draft = drafting("Start");
        draft.set_count(2);
        let suggestions = draft.suggest(&generator).await.unwrap();
        assert_eq!(suggestions.items.len(), 2);
        assert!(generator.last_prompt().contains("suggest 2 different ways"));
    }

    #[tokio::test]
    async fn test_suggest_keeps_raw_when_unparseable() {
        let generator = ScriptedGenerator::ok("no list here");
        let suggestions = drafting("Start").suggest(&generator).await.unwrap();
        assert!(suggestions.items.is_empty());
        assert_eq!(suggestions.raw, "no list here");
    }

    #[tokio::test]
    async fn test_ask_appends_pair() {
        let mut chat = ChatSession::default();
        let answer = chat
            .ask("What is it about?", &StubRetriever { fail: false })
            .await
            .unwrap();
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(
            chat.history(),
            &[
                Turn {
                    speaker: Speaker::User,
                    message: "What is it about?".into()
                },
                Turn {
                    speaker: Speaker::Assistant,
                    message: "answer to What is it about?".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_ask_failure_keeps_history() {
        let mut chat = ChatSession::default();
        chat.ask("first", &StubRetriever { fail: false }).await.unwrap();
        let err = chat
            .ask("second", &StubRetriever { fail: true })
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error answering question"));
        assert_eq!(chat.history().len(), 2);
    }

    #[tokio::test]
    async fn test_ask_keeps_query_as_typed() {
        let mut chat = ChatSession::default();
        chat.ask("  Who wrote it?\n", &StubRetriever { fail: false })
            .await
            .unwrap();
        assert_eq!(chat.history()[0].message, "  Who wrote it?\n");

        let err = chat.ask(" \t", &StubRetriever { fail: false }).await.unwrap_err();
        assert!(matches!(err, ActionError::EmptyInput));
        assert_eq!(chat.history().len(), 2);
    }

    #[tokio::test]
    async fn test_improve_reports_stats() {
        let generator = ScriptedGenerator::ok("1. Use fewer commas");
        let result = improve("Hello  wide\nworld", ImprovementFocus::Grammar, &generator)
            .await
            .unwrap();
        assert_eq!(result.stats, TextStats { words: 3, characters: 17 });
        assert!(generator.last_prompt().contains("Focus on grammar"));

        let failing = ScriptedGenerator::failing("quota exceeded");
        let err = improve("Hello", ImprovementFocus::General, &failing)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error generating improvements"));
    }

    #[test]
    fn test_stats_count_chars_not_bytes() {
        assert_eq!(TextStats::of("naïve café"), TextStats { words: 2, characters: 10 });
        assert_eq!(TextStats::of(""), TextStats { words: 0, characters: 0 });
    }
}
