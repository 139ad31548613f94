//! Kanban board projection and drag-and-drop session.
//!
//! The board partitions every eligible note into exactly one container:
//! (group key, status). Groups come from the grouping mode; statuses are
//! the three note statuses. Groups with no notes in any status are
//! omitted; a kept group always renders all three containers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MemoWeaveError, Result};
use crate::note::{Note, NotePriority, NoteStatus};
use crate::search::text_matches;
use crate::storage::{NoteUpdate, WriteBatch};

/// Group key used in `GroupBy::None` mode.
pub const UNGROUPED_KEY: &str = "all";

/// Group key for notes without tags in `GroupBy::Tag` mode.
pub const UNTAGGED_KEY: &str = "untagged";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    None,
    Tag,
    Priority,
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupBy::None => write!(f, "none"),
            GroupBy::Tag => write!(f, "tag"),
            GroupBy::Priority => write!(f, "priority"),
        }
    }
}

impl std::str::FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(GroupBy::None),
            "tag" => Ok(GroupBy::Tag),
            "priority" => Ok(GroupBy::Priority),
            _ => Err(format!("Invalid grouping mode: {}", s)),
        }
    }
}

/// One container: the notes of a single group in a single status,
/// ordered by their manual position.
#[derive(Debug, Clone, Serialize)]
pub struct BoardColumn {
    pub group: String,
    pub status: NoteStatus,
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Board {
    pub group_by: GroupBy,
    pub columns: Vec<BoardColumn>,
}

impl Board {
    /// Distinct group keys in render order.
    pub fn groups(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        for column in &self.columns {
            if keys.last() != Some(&column.group.as_str()) {
                keys.push(column.group.as_str());
            }
        }
        keys
    }

    pub fn column(&self, group: &str, status: NoteStatus) -> Option<&BoardColumn> {
        self.columns
            .iter()
            .find(|c| c.group == group && c.status == status)
    }

    /// Locate a note as (column index, position within column).
    pub fn find_note(&self, id: &Uuid) -> Option<(usize, usize)> {
        for (ci, column) in self.columns.iter().enumerate() {
            if let Some(ni) = column.notes.iter().position(|n| n.id == *id) {
                return Some((ci, ni));
            }
        }
        None
    }

    pub fn note_count(&self) -> usize {
        self.columns.iter().map(|c| c.notes.len()).sum()
    }
}

/// The key a note falls under for a grouping mode.
fn group_key(note: &Note, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::None => UNGROUPED_KEY.to_string(),
        GroupBy::Tag => note
            .primary_tag()
            .map(|t| t.to_string())
            .unwrap_or_else(|| UNTAGGED_KEY.to_string()),
        GroupBy::Priority => note.priority.to_string(),
    }
}

/// Build the board projection from a note snapshot.
///
/// Eligibility: on-board, not archived, not trashed, and matching the
/// optional free-text search.
pub fn build_board(notes: &[Note], group_by: GroupBy, search: Option<&str>) -> Board {
    let eligible: Vec<&Note> = notes
        .iter()
        .filter(|n| n.board_eligible())
        .filter(|n| search.map_or(true, |q| text_matches(n, q)))
        .collect();

    // Keys present among eligible notes, in render order. Empty groups
    // fall out here: a key only exists because some note produced it.
    let present: HashSet<String> = eligible.iter().map(|n| group_key(n, group_by)).collect();
    let keys: Vec<String> = match group_by {
        GroupBy::None => {
            if eligible.is_empty() {
                Vec::new()
            } else {
                vec![UNGROUPED_KEY.to_string()]
            }
        }
        GroupBy::Priority => NotePriority::ALL
            .iter()
            .map(|p| p.to_string())
            .filter(|k| present.contains(k))
            .collect(),
        GroupBy::Tag => {
            let mut tags: Vec<String> = present
                .iter()
                .filter(|k| k.as_str() != UNTAGGED_KEY)
                .cloned()
                .collect();
            tags.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()));
            if present.contains(UNTAGGED_KEY) {
                tags.push(UNTAGGED_KEY.to_string());
            }
            tags
        }
    };

    let mut columns = Vec::new();
    for key in &keys {
        for status in NoteStatus::ALL {
            let mut column_notes: Vec<Note> = eligible
                .iter()
                .filter(|n| n.status == status && group_key(n, group_by) == *key)
                .map(|n| (*n).clone())
                .collect();
            column_notes.sort_by(|a, b| {
                a.order
                    .cmp(&b.order)
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            });
            columns.push(BoardColumn {
                group: key.clone(),
                status,
                notes: column_notes,
            });
        }
    }

    Board { group_by, columns }
}

/// Where a dragged note was released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Dropped over a container: the note appends to its end.
    Column { group: String, status: NoteStatus },
    /// Dropped over another note: the dragged note takes its index.
    Note(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging(Uuid),
}

/// Build the reconciliation batch for a (possibly mutated) board.
///
/// For every container, every note at index `i` gets `order = i` and the
/// container's status. In priority mode a note whose priority differs
/// from its group key is updated; in tag mode its primary tag is moved:
/// the old primary is removed, the new key prepended (unless untagged),
/// and duplicates dropped keeping the first occurrence.
pub fn reconcile(board: &Board) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for column in &board.columns {
        for (i, note) in column.notes.iter().enumerate() {
            let mut update = NoteUpdate {
                order: Some(i as i64),
                status: Some(column.status),
                ..Default::default()
            };
            match board.group_by {
                GroupBy::None => {}
                GroupBy::Priority => {
                    if let Ok(priority) = column.group.parse::<NotePriority>() {
                        if note.priority != priority {
                            update.priority = Some(priority);
                        }
                    }
                }
                GroupBy::Tag => {
                    let old_primary = note.primary_tag().unwrap_or(UNTAGGED_KEY);
                    if old_primary != column.group {
                        update.tags = Some(retag(&note.tags, old_primary, &column.group));
                    }
                }
            }
            batch.update(note.id, update);
        }
    }
    batch
}

fn retag(tags: &[String], old_primary: &str, new_key: &str) -> Vec<String> {
    let mut next: Vec<String> = tags
        .iter()
        .filter(|t| t.as_str() != old_primary)
        .cloned()
        .collect();
    if new_key != UNTAGGED_KEY {
        next.insert(0, new_key.to_string());
    }
    let mut seen = HashSet::new();
    next.retain(|t| seen.insert(t.clone()));
    next
}

/// Stateful board session: holds the latest snapshot, the derived board,
/// and the drag state machine.
///
/// While a drag is in flight (and until the subsequent persistence call
/// settles), incoming snapshots are stashed instead of applied, so the
/// optimistic layout is never clobbered mid-gesture. The latest stashed
/// snapshot wins on resume.
pub struct BoardSession {
    group_by: GroupBy,
    search: Option<String>,
    notes: Vec<Note>,
    board: Board,
    drag: DragState,
    suspended: bool,
    pending: Option<Vec<Note>>,
}

impl BoardSession {
    pub fn new(group_by: GroupBy, notes: Vec<Note>) -> Self {
        let board = build_board(&notes, group_by, None);
        Self {
            group_by,
            search: None,
            notes,
            board,
            drag: DragState::Idle,
            suspended: false,
            pending: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging(_))
    }

    pub fn set_group_by(&mut self, group_by: GroupBy) {
        self.group_by = group_by;
        self.rebuild();
    }

    pub fn set_search(&mut self, search: Option<String>) {
        self.search = search;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.board = build_board(&self.notes, self.group_by, self.search.as_deref());
    }

    /// Feed a fresh store snapshot. Applied immediately unless a drag or
    /// an unsettled drop is in flight.
    pub fn on_snapshot(&mut self, notes: Vec<Note>) {
        if self.suspended {
            self.pending = Some(notes);
        } else {
            self.notes = notes;
            self.rebuild();
        }
    }

    /// Begin dragging a note. Snapshot application is suspended until the
    /// drop's persistence settles (or the drop is cancelled).
    pub fn drag_start(&mut self, note_id: Uuid) -> Result<()> {
        if self.is_dragging() {
            return Err(MemoWeaveError::InvalidOperation(
                "a drag is already in progress".to_string(),
            ));
        }
        if self.board.find_note(&note_id).is_none() {
            return Err(MemoWeaveError::NoteNotFound(note_id.to_string()));
        }
        self.drag = DragState::Dragging(note_id);
        self.suspended = true;
        Ok(())
    }

    /// Finish a drag.
    ///
    /// `None` means the drop was cancelled: nothing mutates, snapshots
    /// resume immediately. A target splices the note into place, rebuilds
    /// the render state from the mutated containers, and returns the
    /// reconciliation batch; call [`BoardSession::settle`] once that batch
    /// has been persisted (successfully or not).
    pub fn drag_end(&mut self, target: Option<DropTarget>) -> Result<Option<WriteBatch>> {
        let note_id = match self.drag {
            DragState::Dragging(id) => id,
            DragState::Idle => {
                return Err(MemoWeaveError::InvalidOperation(
                    "no drag in progress".to_string(),
                ))
            }
        };
        self.drag = DragState::Idle;

        let Some(target) = target else {
            self.resume();
            return Ok(None);
        };

        let (from_col, from_idx) = self
            .board
            .find_note(&note_id)
            .ok_or_else(|| MemoWeaveError::NoteNotFound(note_id.to_string()))?;

        // Resolve the destination column before touching anything, so a
        // bad target leaves the board unchanged.
        let to_col = match &target {
            DropTarget::Column { group, status } => self
                .board
                .columns
                .iter()
                .position(|c| c.group == *group && c.status == *status)
                .ok_or_else(|| {
                    MemoWeaveError::InvalidOperation(format!(
                        "no container {}/{} on the board",
                        group, status
                    ))
                })?,
            DropTarget::Note(target_id) => {
                if *target_id == note_id {
                    from_col
                } else {
                    self.board
                        .find_note(target_id)
                        .ok_or_else(|| MemoWeaveError::NoteNotFound(target_id.to_string()))?
                        .0
                }
            }
        };

        // Splice out, then insert: over a container appends, over a note
        // takes that note's post-removal index, pushing it down.
        let note = self.board.columns[from_col].notes.remove(from_idx);
        let insert_at = match &target {
            DropTarget::Column { .. } => self.board.columns[to_col].notes.len(),
            DropTarget::Note(target_id) => {
                if *target_id == note_id {
                    from_idx.min(self.board.columns[to_col].notes.len())
                } else {
                    self.board.columns[to_col]
                        .notes
                        .iter()
                        .position(|n| n.id == *target_id)
                        .unwrap_or(self.board.columns[to_col].notes.len())
                }
            }
        };
        self.board.columns[to_col].notes.insert(insert_at, note);

        // Recompute the grouped render state from the mutated containers.
        self.prune_empty_groups();

        let batch = reconcile(&self.board);
        Ok(Some(batch))
    }

    /// Call after the drop's persistence attempt settles, success or
    /// failure. There is no rollback on failure: the store remains the
    /// source of truth and the stashed snapshot (if any) rebuilds the
    /// board either way.
    pub fn settle(&mut self) {
        self.resume();
    }

    fn resume(&mut self) {
        self.suspended = false;
        if let Some(notes) = self.pending.take() {
            self.notes = notes;
            self.rebuild();
        }
    }

    /// Drop groups whose three containers all emptied out.
    fn prune_empty_groups(&mut self) {
        let mut empty: HashSet<String> = self.board.groups().iter().map(|g| g.to_string()).collect();
        for column in &self.board.columns {
            if !column.notes.is_empty() {
                empty.remove(&column.group);
            }
        }
        if !empty.is_empty() {
            self.board.columns.retain(|c| !empty.contains(&c.group));
        }
    }
}
