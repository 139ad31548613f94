//! Plan projection: notes that share a `plan_id`, grouped with
//! completion counts, plus batch builders for whole-plan actions.

use serde::Serialize;
use uuid::Uuid;

use crate::note::{Note, NoteStatus};
use crate::storage::{NoteUpdate, WriteBatch};

#[derive(Debug, Clone, Serialize)]
pub struct PlanGroup {
    pub id: Uuid,
    pub goal: Option<String>,
    /// Members sorted by board order.
    pub notes: Vec<Note>,
    pub done: usize,
    pub total: usize,
}

impl PlanGroup {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

/// Group notes by plan, skipping trashed members. Groups are ordered by
/// most recently touched plan first.
pub fn group_plans(notes: &[Note]) -> Vec<PlanGroup> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut members: std::collections::HashMap<Uuid, Vec<Note>> =
        std::collections::HashMap::new();

    for note in notes {
        if note.trashed {
            continue;
        }
        let Some(plan_id) = note.plan_id else {
            continue;
        };
        if !members.contains_key(&plan_id) {
            order.push(plan_id);
        }
        members.entry(plan_id).or_default().push(note.clone());
    }

    let mut groups: Vec<PlanGroup> = order
        .into_iter()
        .map(|id| {
            let mut notes = members.remove(&id).unwrap_or_default();
            notes.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
            let goal = notes.iter().find_map(|n| n.plan_goal.clone());
            let done = notes
                .iter()
                .filter(|n| n.status == NoteStatus::Done)
                .count();
            let total = notes.len();
            PlanGroup {
                id,
                goal,
                notes,
                done,
                total,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        let a_touched = a.notes.iter().map(|n| n.updated_at).max();
        let b_touched = b.notes.iter().map(|n| n.updated_at).max();
        b_touched.cmp(&a_touched)
    });
    groups
}

/// One atomic batch archiving every member (and dropping pins).
pub fn archive_plan(group: &PlanGroup) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for note in &group.notes {
        let update = NoteUpdate {
            archived: Some(true),
            pinned: Some(false),
            ..Default::default()
        };
        batch.update(note.id, update);
    }
    batch
}

/// One atomic batch deleting every member.
pub fn delete_plan(group: &PlanGroup) -> WriteBatch {
    let mut batch = WriteBatch::new();
    for note in &group.notes {
        batch.delete(note.id);
    }
    batch
}
