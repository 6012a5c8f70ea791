//! Instruction templates sent to the generation API.
//!
//! The option tables are closed enums. Any name that is not recognised maps to
//! the `General` variant rather than failing, so a stale client value never
//! blocks an action.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const MIN_SUGGESTIONS: usize = 1;
pub const MAX_SUGGESTIONS: usize = 5;
pub const DEFAULT_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ContinuationStyle {
    #[default]
    General,
    Formal,
    Creative,
    Technical,
    Casual,
}

impl ContinuationStyle {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Formal,
        Self::Creative,
        Self::Technical,
        Self::Casual,
    ];

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "formal" => Self::Formal,
            "creative" => Self::Creative,
            "technical" => Self::Technical,
            "casual" => Self::Casual,
            _ => Self::General,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Formal => "formal",
            Self::Creative => "creative",
            Self::Technical => "technical",
            Self::Casual => "casual",
        }
    }

    pub fn clause(&self) -> &'static str {
        match self {
            Self::General => "Continue the text naturally and engagingly",
            Self::Formal => "Continue in a professional, formal tone",
            Self::Creative => "Continue with creative and imaginative language",
            Self::Technical => "Continue with technical, precise language",
            Self::Casual => "Continue in a friendly, conversational tone",
        }
    }
}

impl From<String> for ContinuationStyle {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for ContinuationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ImprovementFocus {
    #[default]
    General,
    Grammar,
    Style,
    Vocabulary,
    Structure,
}

impl ImprovementFocus {
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Grammar,
        Self::Style,
        Self::Vocabulary,
        Self::Structure,
    ];

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "grammar" => Self::Grammar,
            "style" => Self::Style,
            "vocabulary" => Self::Vocabulary,
            "structure" => Self::Structure,
            _ => Self::General,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Grammar => "grammar",
            Self::Style => "style",
            Self::Vocabulary => "vocabulary",
            Self::Structure => "structure",
        }
    }

    pub fn clause(&self) -> &'static str {
        match self {
            Self::General => {
                "Provide general writing improvements for clarity, flow, and engagement"
            }
            Self::Grammar => "Focus on grammar, punctuation, and sentence structure improvements",
            Self::Style => "Suggest style improvements for better tone and voice",
            Self::Vocabulary => "Suggest vocabulary enhancements and word choice improvements",
            Self::Structure => "Provide structural improvements for better organization and flow",
        }
    }
}

impl From<String> for ImprovementFocus {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl fmt::Display for ImprovementFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clamp a requested suggestion count into `1..=5`.
pub fn clamp_count(count: usize) -> usize {
    count.clamp(MIN_SUGGESTIONS, MAX_SUGGESTIONS)
}

pub fn build_continuation_prompt(
    current_text: &str,
    style: ContinuationStyle,
    count: usize,
) -> String {
    let count = clamp_count(count);
    let format_lines = (1..=count)
        .map(|n| format!("{n}. [Suggestion {n}]"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on the following text, suggest {count} different ways to continue the next phrase or sentence.\n\
         Current text: \"{current_text}\"\n\
         \n\
         Style: {clause}\n\
         \n\
         Provide exactly {count} different suggestions, each as a complete phrase or sentence that naturally continues from the current text.\n\
         Format your response as a numbered list with exactly {count} item(s) and nothing else:\n\
         {format_lines}\n\
         \n\
         Make sure each suggestion is contextually appropriate and flows naturally from the given text.",
        clause = style.clause(),
    )
}

pub fn build_improvement_prompt(text: &str, focus: ImprovementFocus) -> String {
    format!(
        "Analyze the following text and provide {clause}.\n\
         \n\
         Text: \"{text}\"\n\
         \n\
         Provide specific, actionable suggestions for improvement. Include:\n\
         1. Specific changes or alternatives\n\
         2. Explanation of why the suggestion improves the text\n\
         3. Overall assessment of the writing quality\n\
         \n\
         Format your response clearly with numbered suggestions.",
        clause = focus.clause(),
    )
}

pub fn build_rewrite_prompt(text: &str, style: ContinuationStyle) -> String {
    format!("Rewrite the following text in a {style} style while maintaining the same meaning: {text}")
}

pub fn build_enhance_prompt(text: &str) -> String {
    format!("Enhance the following text to make it more engaging and polished: {text}")
}

/// Single-prompt ("stuff") answer over retrieved passages.
pub fn build_answer_prompt(question: &str, passages: &[String]) -> String {
    let context = passages.join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
         \n\
         {context}\n\
         \n\
         Question: {question}\n\
         Helpful Answer:"
    )
}
