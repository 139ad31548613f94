//! Editing session: a draft with undo/redo history, crash-safe draft
//! persistence through prefs, and save-to-store with revision capture.

mod history;

pub use history::{HistoryBuffer, DEBOUNCE_WINDOW, HISTORY_CAP};

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoWeaveError, Result};
use crate::note::{ChecklistItem, Note, NoteRevision, DEFAULT_COLOR};
use crate::prefs::PrefsStore;
use crate::storage::{NoteStore, NoteUpdate};

const DRAFT_KEY: &str = "editor-draft";

/// The editable slice of a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftState {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub color: String,
    pub checklist: Vec<ChecklistItem>,
}

impl Default for DraftState {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            tags: Vec::new(),
            color: DEFAULT_COLOR.to_string(),
            checklist: Vec::new(),
        }
    }
}

impl DraftState {
    fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            tags: note.tags.clone(),
            color: note.color.clone(),
            checklist: note.checklist.clone(),
        }
    }
}

/// What `persist_draft` writes under the `editor-draft` key.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedDraft {
    note_id: Option<Uuid>,
    draft: DraftState,
}

pub struct EditorSession {
    /// `None` until the draft is saved as a new note.
    note_id: Option<Uuid>,
    draft: DraftState,
    history: HistoryBuffer<DraftState>,
}

impl EditorSession {
    pub fn new() -> Self {
        let draft = DraftState::default();
        Self {
            note_id: None,
            draft: draft.clone(),
            history: HistoryBuffer::new(draft),
        }
    }

    pub fn open(note: &Note) -> Self {
        let draft = DraftState::from_note(note);
        Self {
            note_id: Some(note.id),
            draft: draft.clone(),
            history: HistoryBuffer::new(draft),
        }
    }

    pub fn note_id(&self) -> Option<Uuid> {
        self.note_id
    }

    pub fn draft(&self) -> &DraftState {
        &self.draft
    }

    pub fn set_title(&mut self, title: impl Into<String>, at: Instant) {
        self.draft.title = title.into();
        self.commit(at);
    }

    pub fn set_content(&mut self, content: impl Into<String>, at: Instant) {
        self.draft.content = content.into();
        self.commit(at);
    }

    pub fn set_tags(&mut self, tags: Vec<String>, at: Instant) {
        self.draft.tags = tags;
        self.commit(at);
    }

    pub fn set_color(&mut self, color: impl Into<String>, at: Instant) {
        self.draft.color = color.into();
        self.commit(at);
    }

    pub fn set_checklist(&mut self, checklist: Vec<ChecklistItem>, at: Instant) {
        self.draft.checklist = checklist;
        self.commit(at);
    }

    fn commit(&mut self, at: Instant) {
        self.history.record(self.draft.clone(), at);
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.draft = state;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.draft = state;
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ========== Draft persistence ==========

    pub fn persist_draft(&self, prefs: &PrefsStore) -> Result<()> {
        prefs.set(
            DRAFT_KEY,
            &PersistedDraft {
                note_id: self.note_id,
                draft: self.draft.clone(),
            },
        )
    }

    /// Restore a persisted draft, if any. History restarts at the
    /// restored state.
    pub fn load_draft(prefs: &PrefsStore) -> Result<Option<Self>> {
        let Some(persisted) = prefs.get::<PersistedDraft>(DRAFT_KEY)? else {
            return Ok(None);
        };
        Ok(Some(Self {
            note_id: persisted.note_id,
            draft: persisted.draft.clone(),
            history: HistoryBuffer::new(persisted.draft),
        }))
    }

    pub fn clear_draft(prefs: &PrefsStore) -> Result<bool> {
        prefs.remove(DRAFT_KEY)
    }

    // ========== Save ==========

    /// Create or update the note behind this session. Updates that
    /// change title or content push the previous pair onto the note's
    /// revision history.
    pub fn save(&mut self, store: &NoteStore) -> Result<Note> {
        match self.note_id {
            None => {
                let mut note = Note::new(self.draft.title.clone());
                note.content = self.draft.content.clone();
                note.tags = self.draft.tags.clone();
                note.color = self.draft.color.clone();
                note.checklist = self.draft.checklist.clone();
                note.order = store.next_order()?;
                store.add_note(&note)?;
                self.note_id = Some(note.id);
                Ok(note)
            }
            Some(id) => {
                let previous = store
                    .get_note(&id)?
                    .ok_or_else(|| MemoWeaveError::NoteNotFound(id.to_string()))?;

                let text_changed = previous.title != self.draft.title
                    || previous.content != self.draft.content;
                let history = text_changed.then(|| {
                    let mut note = previous.clone();
                    note.record_revision(NoteRevision {
                        title: previous.title.clone(),
                        content: previous.content.clone(),
                        updated_at: previous.updated_at,
                    });
                    note.history
                });

                let update = NoteUpdate {
                    title: Some(self.draft.title.clone()),
                    content: Some(self.draft.content.clone()),
                    tags: Some(self.draft.tags.clone()),
                    color: Some(self.draft.color.clone()),
                    checklist: Some(self.draft.checklist.clone()),
                    history,
                    ..Default::default()
                };
                store.update_note(&id, update)?;
                store
                    .get_note(&id)?
                    .ok_or_else(|| MemoWeaveError::NoteNotFound(id.to_string()))
            }
        }
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_undo_redo_restores_draft() {
        let base = Instant::now();
        let mut session = EditorSession::new();
        session.set_title("First", at(base, 1000));
        session.set_title("Second", at(base, 2000));

        assert!(session.undo());
        assert_eq!(session.draft().title, "First");
        assert!(session.redo());
        assert_eq!(session.draft().title, "Second");
        assert!(!session.redo());
    }

    #[test]
    fn test_burst_typing_undoes_in_one_step() {
        let base = Instant::now();
        let mut session = EditorSession::new();
        session.set_content("h", at(base, 1000));
        session.set_content("he", at(base, 1100));
        session.set_content("hey", at(base, 1200));

        assert!(session.undo());
        assert_eq!(session.draft().content, "");
    }

    #[test]
    fn test_draft_roundtrip_through_prefs() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();

        let base = Instant::now();
        let mut session = EditorSession::new();
        session.set_title("Unsaved", at(base, 1000));
        session.set_tags(vec!["draft".to_string()], at(base, 2000));
        session.persist_draft(&prefs).unwrap();

        let restored = EditorSession::load_draft(&prefs).unwrap().unwrap();
        assert_eq!(restored.draft().title, "Unsaved");
        assert_eq!(restored.draft().tags, vec!["draft"]);
        assert!(restored.note_id().is_none());

        assert!(EditorSession::clear_draft(&prefs).unwrap());
        assert!(EditorSession::load_draft(&prefs).unwrap().is_none());
    }

    #[test]
    fn test_save_creates_then_updates() {
        let dir = TempDir::new().unwrap();
        let store = NoteStore::init(dir.path()).unwrap();

        let base = Instant::now();
        let mut session = EditorSession::new();
        session.set_title("Shopping", at(base, 1000));
        let created = session.save(&store).unwrap();
        assert_eq!(session.note_id(), Some(created.id));
        assert!(created.history.is_empty());

        session.set_content("milk and eggs", at(base, 5000));
        let updated = session.save(&store).unwrap();
        assert_eq!(updated.content, "milk and eggs");
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].title, "Shopping");
        assert_eq!(updated.history[0].content, "");
    }

    #[test]
    fn test_save_without_text_change_records_no_revision() {
        let dir = TempDir::new().unwrap();
        let store = NoteStore::init(dir.path()).unwrap();

        let base = Instant::now();
        let mut session = EditorSession::new();
        session.set_title("Stable", at(base, 1000));
        session.save(&store).unwrap();

        session.set_color("blue", at(base, 5000));
        let updated = session.save(&store).unwrap();
        assert_eq!(updated.color, "blue");
        assert!(updated.history.is_empty());
    }

    #[test]
    fn test_open_existing_note_seeds_draft() {
        let mut note = Note::new("Existing".to_string());
        note.tags = vec!["work".to_string()];
        let session = EditorSession::open(&note);
        assert_eq!(session.draft().title, "Existing");
        assert_eq!(session.draft().tags, vec!["work"]);
        assert_eq!(session.note_id(), Some(note.id));
    }
}
