//! Lightweight gamification: persisted usage counters and threshold
//! achievements, stored as a prefs blob.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notify::{Notice, Notifier};
use crate::prefs::PrefsStore;

const PREFS_KEY: &str = "gamification";

/// Countable actions the rest of the app reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamifyEvent {
    NoteCreated,
    ChecklistCompleted,
    PlanCreated,
    FlowRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    NotesCreated,
    ChecklistsCompleted,
    PlansCreated,
    FlowsRun,
}

#[derive(Debug, Clone)]
pub struct Achievement {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    counter: Counter,
    threshold: u64,
}

/// Persisted state under the `gamification` prefs key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GamifyState {
    #[serde(default)]
    pub notes_created: u64,
    #[serde(default)]
    pub checklists_completed: u64,
    #[serde(default)]
    pub plans_created: u64,
    #[serde(default)]
    pub flows_run: u64,
    /// Ids of achievements already unlocked.
    #[serde(default)]
    pub unlocked: Vec<String>,
}

impl GamifyState {
    fn counter(&self, counter: Counter) -> u64 {
        match counter {
            Counter::NotesCreated => self.notes_created,
            Counter::ChecklistsCompleted => self.checklists_completed,
            Counter::PlansCreated => self.plans_created,
            Counter::FlowsRun => self.flows_run,
        }
    }

    fn bump(&mut self, event: GamifyEvent) {
        match event {
            GamifyEvent::NoteCreated => self.notes_created += 1,
            GamifyEvent::ChecklistCompleted => self.checklists_completed += 1,
            GamifyEvent::PlanCreated => self.plans_created += 1,
            GamifyEvent::FlowRun => self.flows_run += 1,
        }
    }
}

pub fn achievement_catalog() -> Vec<Achievement> {
    vec![
        Achievement {
            id: "first-note",
            name: "First Note",
            description: "Create your first note",
            counter: Counter::NotesCreated,
            threshold: 1,
        },
        Achievement {
            id: "note-collector",
            name: "Note Collector",
            description: "Create 10 notes",
            counter: Counter::NotesCreated,
            threshold: 10,
        },
        Achievement {
            id: "archivist",
            name: "Archivist",
            description: "Create 50 notes",
            counter: Counter::NotesCreated,
            threshold: 50,
        },
        Achievement {
            id: "list-closer",
            name: "List Closer",
            description: "Complete 5 checklists",
            counter: Counter::ChecklistsCompleted,
            threshold: 5,
        },
        Achievement {
            id: "first-plan",
            name: "Planner",
            description: "Generate your first plan",
            counter: Counter::PlansCreated,
            threshold: 1,
        },
        Achievement {
            id: "assistant-regular",
            name: "Assistant Regular",
            description: "Run 10 AI flows",
            counter: Counter::FlowsRun,
            threshold: 10,
        },
    ]
}

/// Bump the counter for `event` and persist. Achievements whose
/// threshold is newly crossed are unlocked once, each raising a
/// notice.
pub fn record(
    prefs: &PrefsStore,
    notifier: &dyn Notifier,
    event: GamifyEvent,
) -> Result<Vec<Achievement>> {
    let mut state: GamifyState = prefs.get(PREFS_KEY)?.unwrap_or_default();
    state.bump(event);

    let mut newly_unlocked = Vec::new();
    for achievement in achievement_catalog() {
        if state.counter(achievement.counter) < achievement.threshold {
            continue;
        }
        if state.unlocked.iter().any(|id| id == achievement.id) {
            continue;
        }
        state.unlocked.push(achievement.id.to_string());
        notifier.notify(Notice::AchievementUnlocked {
            name: achievement.name.to_string(),
        });
        newly_unlocked.push(achievement);
    }

    prefs.set(PREFS_KEY, &state)?;
    Ok(newly_unlocked)
}

/// Current counters and unlocks, for `stats` output.
pub fn load_state(prefs: &PrefsStore) -> Result<GamifyState> {
    Ok(prefs.get(PREFS_KEY)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use tempfile::TempDir;

    #[test]
    fn test_first_note_unlocks_once() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();
        let notifier = MemoryNotifier::new();

        let unlocked = record(&prefs, &notifier, GamifyEvent::NoteCreated).unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "first-note");
        assert_eq!(notifier.len(), 1);

        // Second note crosses no new threshold.
        let unlocked = record(&prefs, &notifier, GamifyEvent::NoteCreated).unwrap();
        assert!(unlocked.is_empty());
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn test_counters_persist_across_opens() {
        let dir = TempDir::new().unwrap();
        {
            let prefs = PrefsStore::open(dir.path()).unwrap();
            let notifier = MemoryNotifier::new();
            for _ in 0..3 {
                record(&prefs, &notifier, GamifyEvent::FlowRun).unwrap();
            }
        }
        let prefs = PrefsStore::open(dir.path()).unwrap();
        let state = load_state(&prefs).unwrap();
        assert_eq!(state.flows_run, 3);
    }

    #[test]
    fn test_threshold_unlock_at_exact_count() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();
        let notifier = MemoryNotifier::new();

        for _ in 0..4 {
            let unlocked = record(&prefs, &notifier, GamifyEvent::ChecklistCompleted).unwrap();
            assert!(unlocked.is_empty());
        }
        let unlocked = record(&prefs, &notifier, GamifyEvent::ChecklistCompleted).unwrap();
        assert_eq!(unlocked.len(), 1);
        assert_eq!(unlocked[0].id, "list-closer");
    }

    #[test]
    fn test_unlock_notice_carries_name() {
        let dir = TempDir::new().unwrap();
        let prefs = PrefsStore::open(dir.path()).unwrap();
        let notifier = MemoryNotifier::new();

        record(&prefs, &notifier, GamifyEvent::PlanCreated).unwrap();
        let notices = notifier.drain();
        assert!(matches!(
            &notices[0],
            Notice::AchievementUnlocked { name } if name == "Planner"
        ));
    }
}
