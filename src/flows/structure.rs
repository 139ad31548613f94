//! Structured flows: checklist extraction, smart paste, template
//! generation and whole-note drafting.

use async_trait::async_trait;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::text::TextInput;
use super::Flow;
use crate::error::{MemoWeaveError, Result};
use crate::note::{ChecklistItem, Note};
use crate::views::NoteTemplate;

const MAX_EXTRACTED_ITEMS: usize = 50;

/// A model-produced note, not yet stored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NoteDraft {
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
    /// "YYYY-MM-DD" when the model proposes a deadline.
    #[serde(default)]
    pub due_date: Option<String>,
}

impl NoteDraft {
    /// Convert into an unsaved note. An unparseable due date is
    /// dropped rather than failing the whole draft.
    pub fn into_note(self) -> Note {
        let mut note = Note::new(self.title);
        note.content = self.content;
        note.tags = self.tags;
        note.checklist = self.checklist.into_iter().map(ChecklistItem::new).collect();
        note.due_date = self
            .due_date
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok());
        note
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChecklistOutput {
    pub items: Vec<String>,
}

/// Template as the model emits it; `into_template` yields the view
/// type used everywhere else.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedTemplate {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
}

impl GeneratedTemplate {
    pub fn into_template(self) -> NoteTemplate {
        NoteTemplate {
            name: self.name,
            title: self.title,
            content: self.content,
            tags: self.tags,
            color: self.color,
            checklist: self.checklist,
        }
    }
}

fn require_text(field: &'static str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(MemoWeaveError::invalid(field, "(empty)"));
    }
    Ok(())
}

// ========== checklist ==========

pub struct ChecklistFlow;

#[async_trait]
impl Flow for ChecklistFlow {
    type Input = TextInput;
    type Output = ChecklistOutput;

    fn name(&self) -> &'static str {
        "checklist"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("text", &input.text)
    }

    fn system(&self) -> String {
        "You extract actionable checklist items from free text. Each item \
         is one short imperative phrase. Skip anything that is not a task."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Extract checklist items from:\n\n{}", input.text)
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        let items: Vec<String> = output
            .items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .take(MAX_EXTRACTED_ITEMS)
            .collect();
        if items.is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(ChecklistOutput { items })
    }
}

// ========== smart-paste ==========

pub struct SmartPasteFlow;

#[async_trait]
impl Flow for SmartPasteFlow {
    type Input = TextInput;
    type Output = NoteDraft;

    fn name(&self) -> &'static str {
        "smart-paste"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("clipboard", &input.text)
    }

    fn system(&self) -> String {
        "You turn pasted text into a tidy note: a short title, cleaned-up \
         content in Markdown, a few lowercase tags, and checklist items \
         when the text contains tasks."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Structure this pasted text as a note:\n\n{}", input.text)
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        if output.title.trim().is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(output)
    }
}

// ========== template ==========

pub struct TemplateFlow;

#[async_trait]
impl Flow for TemplateFlow {
    type Input = TextInput;
    type Output = GeneratedTemplate;

    fn name(&self) -> &'static str {
        "template"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("description", &input.text)
    }

    fn system(&self) -> String {
        "You design reusable note templates. The title and content may use \
         {{date}} and {{time}} placeholders. Keep the content to Markdown \
         section headers the user fills in later."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        format!("Create a note template for: {}", input.text)
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        let name = slugify(&output.name);
        if name.is_empty() || output.title.trim().is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(GeneratedTemplate { name, ..output })
    }
}

/// Template names follow pref-key rules: lowercase, digits, hyphens.
fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        } else if (c == ' ' || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

// ========== note ==========

pub struct NoteFromPromptFlow;

#[async_trait]
impl Flow for NoteFromPromptFlow {
    type Input = TextInput;
    type Output = NoteDraft;

    fn name(&self) -> &'static str {
        "note"
    }

    fn validate(&self, input: &Self::Input) -> Result<()> {
        require_text("prompt", &input.text)
    }

    fn system(&self) -> String {
        "You write complete notes from a short request: a title, useful \
         Markdown content, lowercase tags, checklist items when tasks are \
         implied, and a YYYY-MM-DD due date only when the request names \
         a deadline."
            .to_string()
    }

    fn prompt(&self, input: &Self::Input) -> String {
        input.text.clone()
    }

    fn finish(&self, output: Self::Output) -> Result<Self::Output> {
        if output.title.trim().is_empty() {
            return Err(MemoWeaveError::FlowOutputRejected { flow: self.name() });
        }
        Ok(output)
    }
}
