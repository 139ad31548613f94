use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use loro::{LoroDoc, LoroMap, LoroValue, ValueOrContainer};
use tokio::sync::broadcast;

use crate::cache::SqliteCache;
use crate::error::{MemoWeaveError, Result};
use crate::note::{ChecklistItem, Note, NoteRevision, DEFAULT_COLOR};

pub const MEMOWEAVE_DIR: &str = ".memoweave";
const NOTES_DB: &str = "notes.db";

/// Field limits checked before any write reaches the document.
pub mod limits {
    pub const MAX_TITLE_LENGTH: usize = 500;
    pub const MAX_CONTENT_SIZE: usize = 102_400;
    pub const MAX_TAGS_COUNT: usize = 50;
    pub const MAX_TAG_LENGTH: usize = 100;
    pub const MAX_CHECKLIST_ITEMS: usize = 200;
    pub const MAX_BATCH_SIZE: usize = 500;
}

/// Update payload for a note
///
/// Plain `Option` fields are set-if-present. Nullable fields use
/// `Option<Option<T>>`: `Some(None)` to clear, `Some(Some(v))` to set.
/// `tags`, `checklist` and `history` replace the stored list wholesale,
/// preserving caller order.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub image: Option<Option<String>>,
    pub audio: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<crate::note::NoteStatus>,
    pub priority: Option<crate::note::NotePriority>,
    pub order: Option<i64>,
    pub due_date: Option<Option<chrono::NaiveDate>>,
    pub start_time: Option<Option<chrono::NaiveTime>>,
    pub end_time: Option<Option<chrono::NaiveTime>>,
    pub pinned: Option<bool>,
    pub archived: Option<bool>,
    pub trashed: Option<bool>,
    pub draft: Option<bool>,
    pub show_on_board: Option<bool>,
    pub checklist: Option<Vec<ChecklistItem>>,
    pub plan_id: Option<Option<uuid::Uuid>>,
    pub plan_goal: Option<Option<String>>,
    pub history: Option<Vec<NoteRevision>>,
}

/// One operation inside a write batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    Put(Note),
    Update { id: uuid::Uuid, update: NoteUpdate },
    Delete { id: uuid::Uuid },
}

/// An all-or-nothing group of writes. Every op is validated against the
/// current state (and the batch's own earlier ops) before anything is
/// applied, so a rejected batch leaves the store untouched.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    pub ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, note: Note) -> &mut Self {
        self.ops.push(BatchOp::Put(note));
        self
    }

    pub fn update(&mut self, id: uuid::Uuid, update: NoteUpdate) -> &mut Self {
        self.ops.push(BatchOp::Update { id, update });
        self
    }

    pub fn delete(&mut self, id: uuid::Uuid) -> &mut Self {
        self.ops.push(BatchOp::Delete { id });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Published to subscribers after every persisted change: the full note
/// collection, newest-updated first.
#[derive(Debug, Clone)]
pub struct StoreEvent {
    pub notes: Vec<Note>,
}

/// Walk up from the current directory to the nearest workspace root,
/// stopping at a `.memoweave/` or `.git` boundary.
pub fn find_workspace_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(MEMOWEAVE_DIR).exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

pub struct NoteStore {
    doc: LoroDoc,
    path: PathBuf,
    events: broadcast::Sender<StoreEvent>,
}

impl NoteStore {
    /// Initialize a new memoweave workspace
    pub fn init(root: &Path) -> Result<Self> {
        let data_dir = root.join(MEMOWEAVE_DIR);

        if data_dir.exists() {
            return Err(MemoWeaveError::AlreadyInitialized);
        }

        fs::create_dir_all(&data_dir)?;

        let doc = LoroDoc::new();
        let path = data_dir.join(NOTES_DB);
        let (events, _) = broadcast::channel(64);

        let store = Self { doc, path, events };
        store.save()?;

        Ok(store)
    }

    /// Open an existing memoweave workspace
    pub fn open(root: &Path) -> Result<Self> {
        let data_dir = root.join(MEMOWEAVE_DIR);
        let path = data_dir.join(NOTES_DB);

        if !path.exists() {
            return Err(MemoWeaveError::NotInitialized);
        }

        let bytes = fs::read(&path)?;
        let doc = LoroDoc::new();
        doc.import(&bytes)?;
        let (events, _) = broadcast::channel(64);

        Ok(Self { doc, path, events })
    }

    /// Persist the document and publish a snapshot to subscribers.
    pub fn save(&self) -> Result<()> {
        let bytes = self.doc.export(loro::ExportMode::Snapshot)?;
        fs::write(&self.path, bytes)?;
        self.publish();
        Ok(())
    }

    /// Get the workspace data directory path
    pub fn data_dir(&self) -> &Path {
        self.path.parent().unwrap()
    }

    /// Subscribe to the live note collection. Each `save` delivers one
    /// event with the full updated-descending snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self) {
        if self.events.receiver_count() == 0 {
            return;
        }
        if let Ok(notes) = self.list_notes() {
            let _ = self.events.send(StoreEvent { notes });
        }
    }

    /// Get a version hash for the current document state
    /// This is used for cache invalidation
    pub fn version_hash(&self) -> String {
        let vv = self.doc.oplog_vv();
        format!("{:?}", vv)
    }

    /// Sync the cache with the current store state
    pub fn sync_cache(&self, cache: &SqliteCache) -> Result<bool> {
        let notes = self.list_notes()?;
        let version = self.version_hash();

        cache.sync_from_store(&notes, &version)
    }

    /// Next free manual-position value (appends after every existing note).
    pub fn next_order(&self) -> Result<i64> {
        let notes = self.list_notes()?;
        Ok(notes.iter().map(|n| n.order).max().map_or(0, |m| m + 1))
    }

    // ========== CRUD ==========

    /// Add a note to the store
    pub fn add_note(&self, note: &Note) -> Result<()> {
        validate_note(note)?;
        let notes_map = self.doc.get_map("notes");
        let id_str = note.id.to_string();

        if notes_map.get(&id_str).is_some() {
            return Err(MemoWeaveError::Storage(format!(
                "note {} already exists",
                id_str
            )));
        }

        self.write_note(note)?;
        self.doc.commit();
        Ok(())
    }

    /// Get a note by UUID
    pub fn get_note(&self, id: &uuid::Uuid) -> Result<Option<Note>> {
        let notes_map = self.doc.get_map("notes");
        let id_str = id.to_string();

        let json = notes_map.get_deep_value();
        if let LoroValue::Map(map) = json {
            if let Some(LoroValue::Map(note_map)) = map.get(&id_str) {
                return Ok(parse_note_from_map(note_map));
            }
        }
        Ok(None)
    }

    /// List all notes, most recently updated first.
    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let notes_map = self.doc.get_map("notes");
        let mut notes = Vec::new();

        let json = notes_map.get_deep_value();
        if let LoroValue::Map(map) = json {
            for (_, note_value) in map.iter() {
                if let LoroValue::Map(note_map) = note_value {
                    if let Some(note) = parse_note_from_map(note_map) {
                        notes.push(note);
                    }
                }
            }
        }

        notes.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(notes)
    }

    /// Update an existing note
    pub fn update_note(&self, id: &uuid::Uuid, updates: NoteUpdate) -> Result<()> {
        validate_update(&updates)?;
        self.apply_update(id, updates)?;
        self.doc.commit();
        Ok(())
    }

    /// Delete a note by UUID
    pub fn remove_note(&self, id: &uuid::Uuid) -> Result<()> {
        self.remove_entry(id)?;
        self.doc.commit();
        Ok(())
    }

    /// Resolve a full UUID or unambiguous id prefix to a note.
    pub fn resolve_note(&self, needle: &str) -> Result<Note> {
        if let Ok(id) = needle.parse::<uuid::Uuid>() {
            return self
                .get_note(&id)?
                .ok_or_else(|| MemoWeaveError::NoteNotFound(needle.to_string()));
        }

        let needle_lower = needle.to_lowercase();
        let matches: Vec<Note> = self
            .list_notes()?
            .into_iter()
            .filter(|n| n.id.to_string().starts_with(&needle_lower))
            .collect();

        match matches.len() {
            0 => Err(MemoWeaveError::NoteNotFound(needle.to_string())),
            1 => Ok(matches.into_iter().next().unwrap()),
            n => Err(MemoWeaveError::AmbiguousId(needle.to_string(), n)),
        }
    }

    // ========== Batched writes ==========

    /// Apply a batch atomically: validate every op first, then apply them
    /// all, then commit and persist once. Subscribers see one event.
    pub fn apply_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.ops.len() > limits::MAX_BATCH_SIZE {
            return Err(MemoWeaveError::invalid(
                "batch",
                format!("{} ops (limit {})", batch.ops.len(), limits::MAX_BATCH_SIZE),
            ));
        }

        // Validation pass against current ids plus the batch's own effects.
        let mut ids: HashSet<uuid::Uuid> =
            self.list_notes()?.iter().map(|n| n.id).collect();

        for (index, op) in batch.ops.iter().enumerate() {
            let rejected = |reason: String| MemoWeaveError::BatchRejected { index, reason };
            match op {
                BatchOp::Put(note) => {
                    validate_note(note).map_err(|e| rejected(e.to_string()))?;
                    if !ids.insert(note.id) {
                        return Err(rejected(format!("note {} already exists", note.id)));
                    }
                }
                BatchOp::Update { id, update } => {
                    validate_update(update).map_err(|e| rejected(e.to_string()))?;
                    if !ids.contains(id) {
                        return Err(rejected(format!("note {} not found", id)));
                    }
                }
                BatchOp::Delete { id } => {
                    if !ids.remove(id) {
                        return Err(rejected(format!("note {} not found", id)));
                    }
                }
            }
        }

        // Apply pass. Every op was validated, so errors here are storage
        // faults, not user input.
        for op in batch.ops {
            match op {
                BatchOp::Put(note) => self.write_note(&note)?,
                BatchOp::Update { id, update } => self.apply_update(&id, update)?,
                BatchOp::Delete { id } => self.remove_entry(&id)?,
            }
        }

        self.doc.commit();
        self.save()?;
        Ok(())
    }

    // ========== Uncommitted write helpers ==========

    fn write_note(&self, note: &Note) -> Result<()> {
        let notes_map = self.doc.get_map("notes");
        let id_str = note.id.to_string();

        let note_map = notes_map.get_or_create_container(&id_str, LoroMap::new())?;

        note_map.insert("id", id_str.clone())?;
        note_map.insert("title", note.title.clone())?;
        note_map.insert("content", note.content.clone())?;
        note_map.insert("color", note.color.clone())?;
        note_map.insert("status", note.status.to_string())?;
        note_map.insert("priority", note.priority.to_string())?;
        note_map.insert("order", note.order)?;
        note_map.insert("pinned", note.pinned)?;
        note_map.insert("archived", note.archived)?;
        note_map.insert("trashed", note.trashed)?;
        note_map.insert("draft", note.draft)?;
        note_map.insert("show_on_board", note.show_on_board)?;
        note_map.insert("created_at", note.created_at.to_rfc3339())?;
        note_map.insert("updated_at", note.updated_at.to_rfc3339())?;

        if let Some(ref image) = note.image {
            note_map.insert("image", image.clone())?;
        }

        if let Some(ref audio) = note.audio {
            note_map.insert("audio", audio.clone())?;
        }

        if let Some(ref due_date) = note.due_date {
            note_map.insert("due_date", due_date.to_string())?;
        }

        if let Some(ref start_time) = note.start_time {
            note_map.insert("start_time", start_time.format("%H:%M").to_string())?;
        }

        if let Some(ref end_time) = note.end_time {
            note_map.insert("end_time", end_time.format("%H:%M").to_string())?;
        }

        if let Some(ref plan_id) = note.plan_id {
            note_map.insert("plan_id", plan_id.to_string())?;
        }

        if let Some(ref plan_goal) = note.plan_goal {
            note_map.insert("plan_goal", plan_goal.clone())?;
        }

        // Tags keep caller order; the first entry is the primary tag.
        let tags_list = note_map.get_or_create_container("tags", loro::LoroList::new())?;
        while tags_list.len() > 0 {
            tags_list.delete(0, 1)?;
        }
        for tag in &note.tags {
            tags_list.push(tag.clone())?;
        }

        let checklist_list =
            note_map.get_or_create_container("checklist", loro::LoroList::new())?;
        while checklist_list.len() > 0 {
            checklist_list.delete(0, 1)?;
        }
        for item in &note.checklist {
            checklist_list.push(serde_json::to_string(item)?)?;
        }

        let history_list = note_map.get_or_create_container("history", loro::LoroList::new())?;
        while history_list.len() > 0 {
            history_list.delete(0, 1)?;
        }
        for revision in &note.history {
            history_list.push(serde_json::to_string(revision)?)?;
        }

        Ok(())
    }

    fn apply_update(&self, id: &uuid::Uuid, updates: NoteUpdate) -> Result<()> {
        let notes_map = self.doc.get_map("notes");
        let id_str = id.to_string();

        let note_map = match notes_map.get(&id_str) {
            Some(ValueOrContainer::Container(loro::Container::Map(map))) => map,
            _ => return Err(MemoWeaveError::NoteNotFound(id_str)),
        };

        // Every applied update bumps the modification time.
        let now = chrono::Utc::now();
        note_map.insert("updated_at", now.to_rfc3339())?;

        if let Some(title) = updates.title {
            note_map.insert("title", title)?;
        }

        if let Some(content) = updates.content {
            note_map.insert("content", content)?;
        }

        if let Some(color) = updates.color {
            note_map.insert("color", color)?;
        }

        if let Some(status) = updates.status {
            note_map.insert("status", status.to_string())?;
        }

        if let Some(priority) = updates.priority {
            note_map.insert("priority", priority.to_string())?;
        }

        if let Some(order) = updates.order {
            note_map.insert("order", order)?;
        }

        if let Some(image_opt) = updates.image {
            match image_opt {
                Some(image) => note_map.insert("image", image)?,
                None => note_map.delete("image")?,
            };
        }

        if let Some(audio_opt) = updates.audio {
            match audio_opt {
                Some(audio) => note_map.insert("audio", audio)?,
                None => note_map.delete("audio")?,
            };
        }

        if let Some(due_date_opt) = updates.due_date {
            match due_date_opt {
                Some(date) => note_map.insert("due_date", date.to_string())?,
                None => note_map.delete("due_date")?,
            };
        }

        if let Some(start_opt) = updates.start_time {
            match start_opt {
                Some(time) => note_map.insert("start_time", time.format("%H:%M").to_string())?,
                None => note_map.delete("start_time")?,
            };
        }

        if let Some(end_opt) = updates.end_time {
            match end_opt {
                Some(time) => note_map.insert("end_time", time.format("%H:%M").to_string())?,
                None => note_map.delete("end_time")?,
            };
        }

        if let Some(plan_id_opt) = updates.plan_id {
            match plan_id_opt {
                Some(plan_id) => note_map.insert("plan_id", plan_id.to_string())?,
                None => note_map.delete("plan_id")?,
            };
        }

        if let Some(plan_goal_opt) = updates.plan_goal {
            match plan_goal_opt {
                Some(goal) => note_map.insert("plan_goal", goal)?,
                None => note_map.delete("plan_goal")?,
            };
        }

        if let Some(pinned) = updates.pinned {
            note_map.insert("pinned", pinned)?;
        }

        if let Some(archived) = updates.archived {
            note_map.insert("archived", archived)?;
        }

        if let Some(trashed) = updates.trashed {
            note_map.insert("trashed", trashed)?;
        }

        if let Some(draft) = updates.draft {
            note_map.insert("draft", draft)?;
        }

        if let Some(show_on_board) = updates.show_on_board {
            note_map.insert("show_on_board", show_on_board)?;
        }

        // List fields replace wholesale: clear then repopulate.
        if let Some(tags) = updates.tags {
            let tags_list = note_map.get_or_create_container("tags", loro::LoroList::new())?;
            while tags_list.len() > 0 {
                tags_list.delete(0, 1)?;
            }
            for tag in tags {
                tags_list.push(tag)?;
            }
        }

        if let Some(checklist) = updates.checklist {
            let checklist_list =
                note_map.get_or_create_container("checklist", loro::LoroList::new())?;
            while checklist_list.len() > 0 {
                checklist_list.delete(0, 1)?;
            }
            for item in checklist {
                checklist_list.push(serde_json::to_string(&item)?)?;
            }
        }

        if let Some(history) = updates.history {
            let history_list =
                note_map.get_or_create_container("history", loro::LoroList::new())?;
            while history_list.len() > 0 {
                history_list.delete(0, 1)?;
            }
            for revision in history {
                history_list.push(serde_json::to_string(&revision)?)?;
            }
        }

        Ok(())
    }

    fn remove_entry(&self, id: &uuid::Uuid) -> Result<()> {
        let notes_map = self.doc.get_map("notes");
        let id_str = id.to_string();

        if notes_map.get(&id_str).is_none() {
            return Err(MemoWeaveError::NoteNotFound(id_str));
        }

        notes_map.delete(&id_str)?;
        Ok(())
    }
}

// ========== Validation ==========

fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() || tag.chars().count() > limits::MAX_TAG_LENGTH {
        return Err(MemoWeaveError::invalid("tag", tag));
    }
    Ok(())
}

fn validate_note(note: &Note) -> Result<()> {
    if note.title.chars().count() > limits::MAX_TITLE_LENGTH {
        return Err(MemoWeaveError::invalid(
            "title",
            format!("{} chars (limit {})", note.title.chars().count(), limits::MAX_TITLE_LENGTH),
        ));
    }
    if note.content.len() > limits::MAX_CONTENT_SIZE {
        return Err(MemoWeaveError::invalid(
            "content",
            format!("{} bytes (limit {})", note.content.len(), limits::MAX_CONTENT_SIZE),
        ));
    }
    if note.tags.len() > limits::MAX_TAGS_COUNT {
        return Err(MemoWeaveError::invalid(
            "tags",
            format!("{} tags (limit {})", note.tags.len(), limits::MAX_TAGS_COUNT),
        ));
    }
    for tag in &note.tags {
        validate_tag(tag)?;
    }
    if note.checklist.len() > limits::MAX_CHECKLIST_ITEMS {
        return Err(MemoWeaveError::invalid(
            "checklist",
            format!(
                "{} items (limit {})",
                note.checklist.len(),
                limits::MAX_CHECKLIST_ITEMS
            ),
        ));
    }
    Ok(())
}

fn validate_update(updates: &NoteUpdate) -> Result<()> {
    if let Some(ref title) = updates.title {
        if title.chars().count() > limits::MAX_TITLE_LENGTH {
            return Err(MemoWeaveError::invalid(
                "title",
                format!("{} chars (limit {})", title.chars().count(), limits::MAX_TITLE_LENGTH),
            ));
        }
    }
    if let Some(ref content) = updates.content {
        if content.len() > limits::MAX_CONTENT_SIZE {
            return Err(MemoWeaveError::invalid(
                "content",
                format!("{} bytes (limit {})", content.len(), limits::MAX_CONTENT_SIZE),
            ));
        }
    }
    if let Some(ref tags) = updates.tags {
        if tags.len() > limits::MAX_TAGS_COUNT {
            return Err(MemoWeaveError::invalid(
                "tags",
                format!("{} tags (limit {})", tags.len(), limits::MAX_TAGS_COUNT),
            ));
        }
        for tag in tags {
            validate_tag(tag)?;
        }
    }
    if let Some(ref checklist) = updates.checklist {
        if checklist.len() > limits::MAX_CHECKLIST_ITEMS {
            return Err(MemoWeaveError::invalid(
                "checklist",
                format!(
                    "{} items (limit {})",
                    checklist.len(),
                    limits::MAX_CHECKLIST_ITEMS
                ),
            ));
        }
    }
    Ok(())
}

// ========== Parsing ==========

fn parse_note_from_map(map: &loro::LoroMapValue) -> Option<Note> {
    let id = match map.get("id")? {
        LoroValue::String(s) => s.parse().ok()?,
        _ => return None,
    };

    let title = match map.get("title")? {
        LoroValue::String(s) => s.to_string(),
        _ => return None,
    };

    let created_at = match map.get("created_at")? {
        LoroValue::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()?
            .with_timezone(&chrono::Utc),
        _ => return None,
    };

    let updated_at = match map.get("updated_at")? {
        LoroValue::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()?
            .with_timezone(&chrono::Utc),
        _ => return None,
    };

    let content = map
        .get("content")
        .and_then(|v| match v {
            LoroValue::String(s) => Some(s.to_string()),
            _ => None,
        })
        .unwrap_or_default();

    let color = map
        .get("color")
        .and_then(|v| match v {
            LoroValue::String(s) => Some(s.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_COLOR.to_string());

    let image = map.get("image").and_then(|v| match v {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    });

    let audio = map.get("audio").and_then(|v| match v {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    });

    let status = map
        .get("status")
        .and_then(|v| match v {
            LoroValue::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or_default();

    let priority = map
        .get("priority")
        .and_then(|v| match v {
            LoroValue::String(s) => s.parse().ok(),
            _ => None,
        })
        .unwrap_or_default();

    let order = map
        .get("order")
        .and_then(|v| match v {
            LoroValue::I64(n) => Some(*n),
            _ => None,
        })
        .unwrap_or(0);

    let due_date = map.get("due_date").and_then(|v| match v {
        LoroValue::String(s) => s.parse().ok(),
        _ => None,
    });

    let start_time = map.get("start_time").and_then(|v| match v {
        LoroValue::String(s) => chrono::NaiveTime::parse_from_str(s, "%H:%M").ok(),
        _ => None,
    });

    let end_time = map.get("end_time").and_then(|v| match v {
        LoroValue::String(s) => chrono::NaiveTime::parse_from_str(s, "%H:%M").ok(),
        _ => None,
    });

    let pinned = parse_bool(map, "pinned").unwrap_or(false);
    let archived = parse_bool(map, "archived").unwrap_or(false);
    let trashed = parse_bool(map, "trashed").unwrap_or(false);
    let draft = parse_bool(map, "draft").unwrap_or(false);
    let show_on_board = parse_bool(map, "show_on_board").unwrap_or(true);

    let plan_id = map.get("plan_id").and_then(|v| match v {
        LoroValue::String(s) => s.parse().ok(),
        _ => None,
    });

    let plan_goal = map.get("plan_goal").and_then(|v| match v {
        LoroValue::String(s) => Some(s.to_string()),
        _ => None,
    });

    let tags = map
        .get("tags")
        .and_then(|v| match v {
            LoroValue::List(list) => Some(
                list.iter()
                    .filter_map(|item| match item {
                        LoroValue::String(s) => Some(s.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default();

    let checklist = map
        .get("checklist")
        .and_then(|v| match v {
            LoroValue::List(list) => Some(
                list.iter()
                    .filter_map(|item| match item {
                        LoroValue::String(s) => serde_json::from_str::<ChecklistItem>(s).ok(),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default();

    let history = map
        .get("history")
        .and_then(|v| match v {
            LoroValue::List(list) => Some(
                list.iter()
                    .filter_map(|item| match item {
                        LoroValue::String(s) => serde_json::from_str::<NoteRevision>(s).ok(),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        })
        .unwrap_or_default();

    Some(Note {
        id,
        title,
        content,
        color,
        image,
        audio,
        tags,
        status,
        priority,
        order,
        due_date,
        start_time,
        end_time,
        pinned,
        archived,
        trashed,
        draft,
        show_on_board,
        checklist,
        plan_id,
        plan_goal,
        history,
        created_at,
        updated_at,
    })
}

fn parse_bool(map: &loro::LoroMapValue, key: &str) -> Option<bool> {
    match map.get(key)? {
        LoroValue::Bool(b) => Some(*b),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::{NotePriority, NoteStatus};
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_data_directory() {
        let tmp = TempDir::new().unwrap();
        let _store = NoteStore::init(tmp.path()).unwrap();

        assert!(tmp.path().join(".memoweave").exists());
        assert!(tmp.path().join(".memoweave/notes.db").exists());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let tmp = TempDir::new().unwrap();
        NoteStore::init(tmp.path()).unwrap();

        let result = NoteStore::init(tmp.path());
        assert!(matches!(result, Err(MemoWeaveError::AlreadyInitialized)));
    }

    #[test]
    fn test_open_fails_if_not_initialized() {
        let tmp = TempDir::new().unwrap();

        let result = NoteStore::open(tmp.path());
        assert!(matches!(result, Err(MemoWeaveError::NotInitialized)));
    }

    #[test]
    fn test_add_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let mut note = Note::new("Trip packing".to_string());
        note.tags = vec!["travel".to_string(), "summer".to_string()];
        note.priority = NotePriority::High;
        note.due_date = chrono::NaiveDate::from_ymd_opt(2025, 7, 1);
        note.start_time = chrono::NaiveTime::from_hms_opt(9, 30, 0);
        note.checklist.push(ChecklistItem::new("Passport".to_string()));

        store.add_note(&note).unwrap();
        store.save().unwrap();

        // Reopen and verify
        let store2 = NoteStore::open(tmp.path()).unwrap();
        let notes = store2.list_notes().unwrap();

        assert_eq!(notes.len(), 1);
        let loaded = &notes[0];
        assert_eq!(loaded.title, "Trip packing");
        assert_eq!(loaded.tags, vec!["travel", "summer"]);
        assert_eq!(loaded.priority, NotePriority::High);
        assert_eq!(loaded.due_date, chrono::NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(
            loaded.start_time,
            chrono::NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(loaded.checklist.len(), 1);
        assert_eq!(loaded.checklist[0].text, "Passport");
        assert!(loaded.show_on_board);
    }

    #[test]
    fn test_list_orders_by_updated_descending() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let first = Note::new("First".to_string());
        let second = Note::new("Second".to_string());
        store.add_note(&first).unwrap();
        store.add_note(&second).unwrap();

        // Touching the older note moves it to the front.
        store
            .update_note(
                &first.id,
                NoteUpdate {
                    content: Some("updated".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let notes = store.list_notes().unwrap();
        assert_eq!(notes[0].title, "First");
        assert_eq!(notes[1].title, "Second");
        assert!(notes[0].updated_at >= notes[1].updated_at);
    }

    #[test]
    fn test_update_clears_nullable_fields() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let mut note = Note::new("Dated".to_string());
        note.due_date = chrono::NaiveDate::from_ymd_opt(2025, 3, 3);
        note.image = Some("data:image/png;base64,AAAA".to_string());
        store.add_note(&note).unwrap();

        store
            .update_note(
                &note.id,
                NoteUpdate {
                    due_date: Some(None),
                    image: Some(None),
                    ..Default::default()
                },
            )
            .unwrap();

        let loaded = store.get_note(&note.id).unwrap().unwrap();
        assert_eq!(loaded.due_date, None);
        assert_eq!(loaded.image, None);
    }

    #[test]
    fn test_update_replaces_tags_in_order() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let mut note = Note::new("Tagged".to_string());
        note.tags = vec!["old".to_string(), "kept".to_string()];
        store.add_note(&note).unwrap();

        store
            .update_note(
                &note.id,
                NoteUpdate {
                    tags: Some(vec!["new".to_string(), "kept".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();

        let loaded = store.get_note(&note.id).unwrap().unwrap();
        assert_eq!(loaded.tags, vec!["new", "kept"]);
        assert_eq!(loaded.primary_tag(), Some("new"));
    }

    #[test]
    fn test_update_missing_note_fails() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let result = store.update_note(&uuid::Uuid::new_v4(), NoteUpdate::default());
        assert!(matches!(result, Err(MemoWeaveError::NoteNotFound(_))));
    }

    #[test]
    fn test_batch_applies_all_ops() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let keep = Note::new("Keep".to_string());
        let drop = Note::new("Drop".to_string());
        store.add_note(&keep).unwrap();
        store.add_note(&drop).unwrap();

        let mut batch = WriteBatch::new();
        batch.put(Note::new("Added".to_string()));
        batch.update(
            keep.id,
            NoteUpdate {
                status: Some(NoteStatus::Done),
                ..Default::default()
            },
        );
        batch.delete(drop.id);

        store.apply_batch(batch).unwrap();

        let notes = store.list_notes().unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().any(|n| n.title == "Added"));
        let kept = store.get_note(&keep.id).unwrap().unwrap();
        assert_eq!(kept.status, NoteStatus::Done);
        assert!(store.get_note(&drop.id).unwrap().is_none());
    }

    #[test]
    fn test_rejected_batch_leaves_store_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let existing = Note::new("Existing".to_string());
        store.add_note(&existing).unwrap();

        // Second op targets an unknown note, so the first must not apply.
        let mut batch = WriteBatch::new();
        batch.update(
            existing.id,
            NoteUpdate {
                archived: Some(true),
                ..Default::default()
            },
        );
        batch.update(
            uuid::Uuid::new_v4(),
            NoteUpdate {
                archived: Some(true),
                ..Default::default()
            },
        );

        let result = store.apply_batch(batch);
        assert!(matches!(
            result,
            Err(MemoWeaveError::BatchRejected { index: 1, .. })
        ));

        let loaded = store.get_note(&existing.id).unwrap().unwrap();
        assert!(!loaded.archived);
    }

    #[test]
    fn test_batch_sees_its_own_puts_and_deletes() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let gone = Note::new("Gone".to_string());
        store.add_note(&gone).unwrap();

        let added = Note::new("Added".to_string());
        let added_id = added.id;

        let mut batch = WriteBatch::new();
        batch.delete(gone.id);
        batch.put(added);
        batch.update(
            added_id,
            NoteUpdate {
                pinned: Some(true),
                ..Default::default()
            },
        );

        store.apply_batch(batch).unwrap();

        let loaded = store.get_note(&added_id).unwrap().unwrap();
        assert!(loaded.pinned);

        // Updating a note deleted earlier in the same batch is rejected.
        let mut bad = WriteBatch::new();
        bad.delete(added_id);
        bad.update(
            added_id,
            NoteUpdate {
                pinned: Some(false),
                ..Default::default()
            },
        );
        let result = store.apply_batch(bad);
        assert!(matches!(
            result,
            Err(MemoWeaveError::BatchRejected { index: 1, .. })
        ));
    }

    #[test]
    fn test_subscribe_receives_snapshot_per_save() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();
        let mut rx = store.subscribe();

        let note = Note::new("Live".to_string());
        store.add_note(&note).unwrap();
        store.save().unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.notes.len(), 1);
        assert_eq!(event.notes[0].title, "Live");

        // A batch produces exactly one event.
        let mut batch = WriteBatch::new();
        batch.put(Note::new("A".to_string()));
        batch.put(Note::new("B".to_string()));
        store.apply_batch(batch).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.notes.len(), 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resolve_note_by_prefix() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let note = Note::new("Findable".to_string());
        store.add_note(&note).unwrap();

        let prefix = &note.id.to_string()[..8];
        let found = store.resolve_note(prefix).unwrap();
        assert_eq!(found.id, note.id);

        let missing = store.resolve_note("ffffffff");
        assert!(matches!(missing, Err(MemoWeaveError::NoteNotFound(_))));
    }

    #[test]
    fn test_next_order_appends() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();
        assert_eq!(store.next_order().unwrap(), 0);

        let mut note = Note::new("Ordered".to_string());
        note.order = 4;
        store.add_note(&note).unwrap();
        assert_eq!(store.next_order().unwrap(), 5);
    }

    #[test]
    fn test_validation_rejects_oversized_title() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let note = Note::new("x".repeat(limits::MAX_TITLE_LENGTH + 1));
        let result = store.add_note(&note);
        assert!(matches!(
            result,
            Err(MemoWeaveError::InvalidField { field: "title", .. })
        ));
    }

    #[test]
    fn test_history_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = NoteStore::init(tmp.path()).unwrap();

        let mut note = Note::new("Versioned".to_string());
        note.record_revision(NoteRevision {
            title: "Old title".to_string(),
            content: "Old content".to_string(),
            updated_at: chrono::Utc::now(),
        });
        store.add_note(&note).unwrap();
        store.save().unwrap();

        let store2 = NoteStore::open(tmp.path()).unwrap();
        let loaded = store2.get_note(&note.id).unwrap().unwrap();
        assert_eq!(loaded.history.len(), 1);
        assert_eq!(loaded.history[0].title, "Old title");
    }
}
