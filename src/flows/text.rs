//! Text flows: title, summary, tags, grammar, completion and
//! translation.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Flow;
use crate::error::{MemoWeaveError, Result};

/// Longest title a flow will hand back.
pub const MAX_GENERATED_TITLE: usize = 60;
const MAX_GENERATED_TAGS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct TextInput {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageInput {
    pub text: String,
    /// Target language, e.g. "English" or "Brazilian Portuguese".
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TitleOutput {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryOutput {
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TagsOutput {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TextOutput {
    pub text: String,
}

fn require_text(field: &'static str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(MemoWeaveError::invalid(field, "(empty)"));
    }
    Ok(())
}

// ========== title ==========

pub struct TitleFlow;

#[async_trait]
impl Flow for TitleFlow {
    type Input = TextInput;
    type Output = TitleOutput;

    fn name(&self) -> &'static str {
        "title"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("content", &input.text)
    }

    fn system(&self) -> String {
        "You suggest titles for notes. Reply with a single short title, \
         at most a few words, no quotes and no trailing punctuation."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Suggest a title for this note:\n\n{}", input.text)
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        let title: String = output.title.trim().chars().take(MAX_GENERATED_TITLE).collect();
        if title.is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(TitleOutput { title })
    }
}

// ========== summarize ==========

pub struct SummarizeFlow;

#[async_trait]
impl Flow for SummarizeFlow {
    type Input = TextInput;
    type Output = SummaryOutput;

    fn name(&self) -> &'static str {
        "summarize"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("content", &input.text)
    }

    fn system(&self) -> String {
        "You summarize notes in one to three plain sentences, keeping \
         concrete facts and dropping filler."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Summarize this note:\n\n{}", input.text)
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        let summary = output.summary.trim().to_string();
        if summary.is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(SummaryOutput { summary })
    }
}

// ========== tags ==========

pub struct TagsFlow;

#[async_trait]
impl Flow for TagsFlow {
    type Input = TextInput;
    type Output = TagsOutput;

    fn name(&self) -> &'static str {
        "tags"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("content", &input.text)
    }

    fn system(&self) -> String {
        "You label notes with one to five short lowercase tags. Prefer \
         single words; reuse obvious topical tags like work, home, idea."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Suggest tags for this note:\n\n{}", input.text)
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        let mut seen = std::collections::HashSet::new();
        let tags: Vec<String> = output
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
            .take(MAX_GENERATED_TAGS)
            .collect();
        if tags.is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(TagsOutput { tags })
    }
}

// ========== grammar ==========

pub struct GrammarFlow;

#[async_trait]
impl Flow for GrammarFlow {
    type Input = LanguageInput;
    type Output = TextOutput;

    fn name(&self) -> &'static str {
        "grammar"
    }

    /// Blank input corrects to blank output without a backend call.
    fn short_circuit(&self, input: &Self::Input) -> Option<Self::Output> {
        input.text.trim().is_empty().then(|| TextOutput {
            text: String::new(),
        })
    }

    fn system(&self) -> String {
        "You fix spelling and grammar without changing meaning, tone or \
         formatting. Keep the text's language unless asked otherwise."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!(
            "Correct the grammar of the following {} text:\n\n{}",
            input.language, input.text
        )
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        Ok(TextOutput {
            text: output.text.trim().to_string(),
        })
    }
}

// ========== complete ==========

pub struct CompleteFlow;

#[async_trait]
impl Flow for CompleteFlow {
    type Input = TextInput;
    type Output = TextOutput;

    fn name(&self) -> &'static str {
        "complete"
    }

    /// Nothing to continue from.
    fn short_circuit(&self, input: &Self::Input) -> Option<Self::Output> {
        input.text.trim().is_empty().then(|| TextOutput {
            text: String::new(),
        })
    }

    fn system(&self) -> String {
        "You continue a partially written note. Reply with only the \
         continuation, one or two sentences, matching the writer's tone."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Continue this text:\n\n{}", input.text)
    }
}

// ========== translate ==========

pub struct TranslateFlow;

#[async_trait]
impl Flow for TranslateFlow {
    type Input = LanguageInput;
    type Output = TextOutput;

    fn name(&self) -> &'static str {
        "translate"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("text", &input.text)?;
        require_text("language", &input.language)
    }

    fn system(&self) -> String {
        "You translate text faithfully, preserving formatting, lists and \
         emphasis."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Translate into {}:\n\n{}", input.language, input.text)
    }
}
