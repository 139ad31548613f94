//! Search module for filter parsing and structured note queries.

use chrono::NaiveDate;

use crate::note::{Note, NotePriority, NoteStatus};

/// Parsed note filter from a query string.
///
/// Filters can be specified in the query string using prefixes:
/// - `status:todo` - Filter by status
/// - `priority:high` - Filter by priority
/// - `tag:garden` - Filter by tag (can specify multiple)
/// - `color:yellow` - Filter by color
/// - `is:pinned` / `is:draft` / `is:archived` / `is:trashed` / `is:overdue`
/// - `due:>2025-01-01` - Due after date
/// - `due:<2025-12-31` - Due before date
#[derive(Debug, Default, Clone)]
pub struct NoteQuery {
    pub status: Option<NoteStatus>,
    pub priority: Option<NotePriority>,
    /// Tag filters (note must carry all specified tags)
    pub tags: Vec<String>,
    pub color: Option<String>,
    pub pinned: Option<bool>,
    pub draft: Option<bool>,
    pub archived: Option<bool>,
    pub trashed: Option<bool>,
    pub overdue: Option<bool>,
    /// Due after this date (exclusive)
    pub due_after: Option<NaiveDate>,
    /// Due before this date (exclusive)
    pub due_before: Option<NaiveDate>,
}

impl NoteQuery {
    /// Create an empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the query has any constraints.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.tags.is_empty()
            && self.color.is_none()
            && self.pinned.is_none()
            && self.draft.is_none()
            && self.archived.is_none()
            && self.trashed.is_none()
            && self.overdue.is_none()
            && self.due_after.is_none()
            && self.due_before.is_none()
    }

    /// Check a note against every constraint.
    pub fn matches(&self, note: &Note, today: NaiveDate) -> bool {
        if let Some(status) = self.status {
            if note.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if note.priority != priority {
                return false;
            }
        }
        for tag in &self.tags {
            if !note.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                return false;
            }
        }
        if let Some(ref color) = self.color {
            if !note.color.eq_ignore_ascii_case(color) {
                return false;
            }
        }
        if let Some(pinned) = self.pinned {
            if note.pinned != pinned {
                return false;
            }
        }
        if let Some(draft) = self.draft {
            if note.draft != draft {
                return false;
            }
        }
        if let Some(archived) = self.archived {
            if note.archived != archived {
                return false;
            }
        }
        if let Some(trashed) = self.trashed {
            if note.trashed != trashed {
                return false;
            }
        }
        if let Some(overdue) = self.overdue {
            if note.is_overdue(today) != overdue {
                return false;
            }
        }
        if let Some(after) = self.due_after {
            match note.due_date {
                Some(due) if due > after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.due_before {
            match note.due_date {
                Some(due) if due < before => {}
                _ => return false,
            }
        }
        true
    }
}

/// Parse a raw query string into (remaining query text, filters).
///
/// # Examples
///
/// ```ignore
/// let (text, query) = parse_query("status:todo tag:garden seedlings");
/// assert_eq!(text, "seedlings");
/// assert_eq!(query.status, Some(NoteStatus::Todo));
/// ```
pub fn parse_query(raw: &str) -> (String, NoteQuery) {
    let mut query = NoteQuery::default();
    let mut remaining = Vec::new();

    for token in raw.split_whitespace() {
        if let Some(value) = token.strip_prefix("status:") {
            query.status = value.parse().ok();
        } else if let Some(value) = token.strip_prefix("priority:") {
            query.priority = value.parse().ok();
        } else if let Some(value) = token.strip_prefix("tag:") {
            query.tags.push(value.to_string());
        } else if let Some(value) = token.strip_prefix("color:") {
            query.color = Some(value.to_string());
        } else if let Some(value) = token.strip_prefix("is:") {
            match value {
                "pinned" => query.pinned = Some(true),
                "draft" => query.draft = Some(true),
                "archived" => query.archived = Some(true),
                "trashed" => query.trashed = Some(true),
                "overdue" => query.overdue = Some(true),
                _ => remaining.push(token),
            }
        } else if let Some(value) = token.strip_prefix("due:>") {
            query.due_after = parse_date(value);
        } else if let Some(value) = token.strip_prefix("due:<") {
            query.due_before = parse_date(value);
        } else {
            remaining.push(token);
        }
    }

    (remaining.join(" "), query)
}

/// Case-insensitive free-text match over title, content and tags.
pub fn text_matches(note: &Note, needle: &str) -> bool {
    if needle.trim().is_empty() {
        return true;
    }
    let needle = needle.to_lowercase();
    note.title.to_lowercase().contains(&needle)
        || note.content.to_lowercase().contains(&needle)
        || note.tags.iter().any(|t| t.to_lowercase().contains(&needle))
}

/// Parse a date string in ISO 8601 date format (YYYY-MM-DD).
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
