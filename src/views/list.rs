use chrono::NaiveDate;

use crate::note::Note;
use crate::search;

/// Which slice of the collection the list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListScope {
    /// Not archived and not trashed.
    #[default]
    Active,
    Archived,
    Trash,
}

impl std::str::FromStr for ListScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ListScope::Active),
            "archived" => Ok(ListScope::Archived),
            "trash" | "trashed" => Ok(ListScope::Trash),
            _ => Err(format!("Invalid list scope: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListSort {
    /// Most recently updated first (the live-query ordering).
    #[default]
    Updated,
    Created,
    Title,
    Priority,
    Due,
}

impl std::str::FromStr for ListSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "updated" => Ok(ListSort::Updated),
            "created" => Ok(ListSort::Created),
            "title" => Ok(ListSort::Title),
            "priority" => Ok(ListSort::Priority),
            "due" => Ok(ListSort::Due),
            _ => Err(format!("Invalid list sort: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub scope: ListScope,
    pub sort: ListSort,
    /// Free text and `key:value` filters, parsed by the search module.
    pub query: Option<String>,
}

/// Project the flat, filterable note list.
///
/// Active scope floats pinned notes to the top; within a pin band the
/// selected sort applies.
pub fn project_list(notes: &[Note], options: &ListOptions, today: NaiveDate) -> Vec<Note> {
    let (text, query) = match options.query.as_deref() {
        Some(raw) => search::parse_query(raw),
        None => (String::new(), search::NoteQuery::new()),
    };

    let mut selected: Vec<Note> = notes
        .iter()
        .filter(|n| match options.scope {
            ListScope::Active => !n.archived && !n.trashed,
            ListScope::Archived => n.archived && !n.trashed,
            ListScope::Trash => n.trashed,
        })
        .filter(|n| query.matches(n, today))
        .filter(|n| search::text_matches(n, &text))
        .cloned()
        .collect();

    selected.sort_by(|a, b| {
        if options.scope == ListScope::Active {
            // Pinned band first.
            let pin = b.pinned.cmp(&a.pinned);
            if pin != std::cmp::Ordering::Equal {
                return pin;
            }
        }
        match options.sort {
            ListSort::Updated => b.updated_at.cmp(&a.updated_at),
            ListSort::Created => b.created_at.cmp(&a.created_at),
            ListSort::Title => a
                .title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| b.updated_at.cmp(&a.updated_at)),
            ListSort::Priority => b
                .priority
                .cmp(&a.priority)
                .then_with(|| b.updated_at.cmp(&a.updated_at)),
            ListSort::Due => match (a.due_date, b.due_date) {
                (Some(da), Some(db)) => da.cmp(&db).then_with(|| b.updated_at.cmp(&a.updated_at)),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => b.updated_at.cmp(&a.updated_at),
            },
        }
    });

    selected
}
