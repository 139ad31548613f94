//! Note templates: a built-in catalog plus `{{date}}` / `{{time}}`
//! substitution when a template becomes a note.

use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::note::{ChecklistItem, Note};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteTemplate {
    pub name: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub checklist: Vec<String>,
}

impl NoteTemplate {
    /// Materialize an unsaved note, filling `{{date}}` and `{{time}}`
    /// with the current local clock.
    pub fn instantiate(&self) -> Note {
        let now = Local::now();
        self.instantiate_at(now.date_naive(), now.time())
    }

    pub fn instantiate_at(&self, date: NaiveDate, time: NaiveTime) -> Note {
        let fill = |text: &str| {
            text.replace("{{date}}", &date.format("%Y-%m-%d").to_string())
                .replace("{{time}}", &time.format("%H:%M").to_string())
        };

        let mut note = Note::new(fill(&self.title));
        note.content = fill(&self.content);
        note.tags = self.tags.clone();
        if let Some(color) = &self.color {
            note.color = color.clone();
        }
        note.checklist = self
            .checklist
            .iter()
            .map(|item| ChecklistItem::new(fill(item)))
            .collect();
        note
    }
}

/// The stock catalog; custom templates live in prefs and are merged in
/// by the caller.
pub fn builtin_templates() -> Vec<NoteTemplate> {
    vec![
        NoteTemplate {
            name: "meeting".to_string(),
            title: "Meeting {{date}}".to_string(),
            content: "## Attendees\n\n## Agenda\n\n## Decisions\n\n## Action items\n".to_string(),
            tags: vec!["meeting".to_string()],
            color: Some("blue".to_string()),
            checklist: vec!["Send out minutes".to_string()],
        },
        NoteTemplate {
            name: "daily".to_string(),
            title: "Daily {{date}}".to_string(),
            content: "## Yesterday\n\n## Today\n\n## Blockers\n".to_string(),
            tags: vec!["daily".to_string()],
            color: Some("yellow".to_string()),
            checklist: Vec::new(),
        },
        NoteTemplate {
            name: "retro".to_string(),
            title: "Retro {{date}}".to_string(),
            content: "## Went well\n\n## Could improve\n\n## Actions\n".to_string(),
            tags: vec!["retro".to_string()],
            color: Some("green".to_string()),
            checklist: Vec::new(),
        },
        NoteTemplate {
            name: "reading".to_string(),
            title: "Reading notes".to_string(),
            content: "**Source:**\n\n## Key points\n\n## Quotes\n\n## Follow-ups\n".to_string(),
            tags: vec!["reading".to_string()],
            color: Some("purple".to_string()),
            checklist: Vec::new(),
        },
    ]
}

/// Look up a template by name, case-insensitive.
pub fn find_template<'a>(templates: &'a [NoteTemplate], name: &str) -> Option<&'a NoteTemplate> {
    templates
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
}
