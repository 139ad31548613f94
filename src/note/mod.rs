// src/note/mod.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of revisions kept per note, newest first.
pub const HISTORY_LIMIT: usize = 20;

/// Color assigned to new notes unless the caller picks one.
pub const DEFAULT_COLOR: &str = "yellow";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoteStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl NoteStatus {
    /// Canonical column order on the board.
    pub const ALL: [NoteStatus; 3] = [NoteStatus::Todo, NoteStatus::InProgress, NoteStatus::Done];
}

impl std::fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoteStatus::Todo => write!(f, "todo"),
            NoteStatus::InProgress => write!(f, "in_progress"),
            NoteStatus::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for NoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "todo" => Ok(NoteStatus::Todo),
            "in_progress" | "inprogress" => Ok(NoteStatus::InProgress),
            "done" => Ok(NoteStatus::Done),
            _ => Err(format!("Invalid note status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotePriority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl NotePriority {
    /// Canonical rank order for priority-grouped views.
    pub const ALL: [NotePriority; 4] = [
        NotePriority::None,
        NotePriority::Low,
        NotePriority::Medium,
        NotePriority::High,
    ];
}

impl std::fmt::Display for NotePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotePriority::None => write!(f, "none"),
            NotePriority::Low => write!(f, "low"),
            NotePriority::Medium => write!(f, "medium"),
            NotePriority::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for NotePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(NotePriority::None),
            "low" => Ok(NotePriority::Low),
            "medium" => Ok(NotePriority::Medium),
            "high" => Ok(NotePriority::High),
            _ => Err(format!("Invalid note priority: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

impl ChecklistItem {
    pub fn new(text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            completed: false,
        }
    }
}

/// A saved title/content pair from before an edit, newest first in `Note::history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRevision {
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub color: String,
    pub image: Option<String>,
    pub audio: Option<String>,
    pub tags: Vec<String>,
    pub status: NoteStatus,
    pub priority: NotePriority,
    pub order: i64,
    pub due_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub pinned: bool,
    pub archived: bool,
    pub trashed: bool,
    pub draft: bool,
    pub show_on_board: bool,
    pub checklist: Vec<ChecklistItem>,
    pub plan_id: Option<Uuid>,
    pub plan_goal: Option<String>,
    pub history: Vec<NoteRevision>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            content: String::new(),
            color: DEFAULT_COLOR.to_string(),
            image: None,
            audio: None,
            tags: Vec::new(),
            status: NoteStatus::default(),
            priority: NotePriority::default(),
            order: 0,
            due_date: None,
            start_time: None,
            end_time: None,
            pinned: false,
            archived: false,
            trashed: false,
            draft: false,
            show_on_board: true,
            checklist: Vec::new(),
            plan_id: None,
            plan_goal: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// First tag in the ordered list, if any.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(|t| t.as_str())
    }

    /// Whether the note participates in board projections.
    pub fn board_eligible(&self) -> bool {
        self.show_on_board && !self.archived && !self.trashed
    }

    /// True when the checklist is non-empty and every item is completed.
    pub fn checklist_complete(&self) -> bool {
        !self.checklist.is_empty() && self.checklist.iter().all(|item| item.completed)
    }

    /// (completed, total) across the checklist.
    pub fn checklist_progress(&self) -> (usize, usize) {
        let done = self.checklist.iter().filter(|item| item.completed).count();
        (done, self.checklist.len())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && self.status != NoteStatus::Done,
            None => false,
        }
    }

    /// Prepend a revision and drop anything past the history cap.
    pub fn record_revision(&mut self, revision: NoteRevision) {
        self.history.insert(0, revision);
        self.history.truncate(HISTORY_LIMIT);
    }
}
