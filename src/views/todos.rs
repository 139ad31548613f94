//! Cross-note checklist projection and the toggle that drives the
//! "checklist finished" automation.

use serde::Serialize;
use uuid::Uuid;

use crate::error::{MemoWeaveError, Result};
use crate::note::{ChecklistItem, Note, NoteStatus};
use crate::notify::{Notice, Notifier};
use crate::storage::{NoteStore, NoteUpdate};

/// One checklist item with enough context to render it on its own.
#[derive(Debug, Clone, Serialize)]
pub struct TodoEntry {
    pub note_id: Uuid,
    pub note_title: String,
    pub item: ChecklistItem,
}

/// Flatten checklists of active notes, preserving note order and
/// per-note item order.
pub fn project_todos(notes: &[Note]) -> Vec<TodoEntry> {
    notes
        .iter()
        .filter(|n| !n.archived && !n.trashed)
        .flat_map(|n| {
            n.checklist.iter().map(|item| TodoEntry {
                note_id: n.id,
                note_title: n.title.clone(),
                item: item.clone(),
            })
        })
        .collect()
}

/// Flip one checklist item and persist the note. Completing the last
/// open item also marks the note Done and raises a single notice;
/// unchecking never reverts status.
pub fn toggle_item(
    store: &NoteStore,
    notifier: &dyn Notifier,
    note_id: &Uuid,
    item_id: &Uuid,
) -> Result<Note> {
    let note = store
        .get_note(note_id)?
        .ok_or_else(|| MemoWeaveError::NoteNotFound(note_id.to_string()))?;

    let mut checklist = note.checklist.clone();
    let item = checklist
        .iter_mut()
        .find(|item| item.id == *item_id)
        .ok_or_else(|| MemoWeaveError::NoteNotFound(item_id.to_string()))?;
    item.completed = !item.completed;

    let all_complete = !checklist.is_empty() && checklist.iter().all(|i| i.completed);
    let finishes_note = all_complete && note.status != NoteStatus::Done;

    let update = NoteUpdate {
        checklist: Some(checklist),
        status: finishes_note.then_some(NoteStatus::Done),
        ..Default::default()
    };
    store.update_note(note_id, update)?;

    if finishes_note {
        notifier.notify(Notice::ChecklistCompleted {
            title: note.title.clone(),
        });
    }

    store
        .get_note(note_id)?
        .ok_or_else(|| MemoWeaveError::NoteNotFound(note_id.to_string()))
}
