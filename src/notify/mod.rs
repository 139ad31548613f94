//! User-facing notices for MemoWeave.
//!
//! This module provides notice generation and formatting for events the
//! user should see: persistence failures, checklist auto-completion,
//! plan lifecycle changes and achievement unlocks.

use std::sync::Mutex;

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Every item on a note's checklist is now complete; the note moved to done.
    ChecklistCompleted { title: String },
    /// A persisted write batch was rejected or failed.
    BatchFailed { context: String, message: String },
    /// An AI flow failed after exhausting retries.
    FlowFailed { flow: String, message: String },
    /// A plan and all of its notes were archived.
    PlanArchived { goal: String, count: usize },
    /// A gamification achievement was unlocked.
    AchievementUnlocked { name: String },
    /// A note was moved to the trash.
    NoteTrashed { title: String },
}

/// Format a notice for display.
pub fn format_notice(notice: &Notice) -> String {
    match notice {
        Notice::ChecklistCompleted { title } => {
            format!("All checklist items done - '{}' marked as done", title)
        }
        Notice::BatchFailed { context, message } => {
            format!("Could not save {}: {}", context, message)
        }
        Notice::FlowFailed { flow, message } => {
            format!("AI {} failed: {}", flow, message)
        }
        Notice::PlanArchived { goal, count } => {
            format!("Archived plan '{}' ({} notes)", goal, count)
        }
        Notice::AchievementUnlocked { name } => {
            format!("Achievement unlocked: {}", name)
        }
        Notice::NoteTrashed { title } => {
            format!("Moved '{}' to trash", title)
        }
    }
}

/// Sink for notices. Implementations decide where they surface.
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// Collects notices in memory so callers can drain and render them.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every notice collected so far, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        let mut guard = self.notices.lock().unwrap();
        std::mem::take(&mut *guard)
    }

    pub fn len(&self) -> usize {
        self.notices.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_checklist_completed() {
        let notice = Notice::ChecklistCompleted {
            title: "Trip packing".to_string(),
        };
        let msg = format_notice(&notice);
        assert!(msg.contains("Trip packing"));
        assert!(msg.contains("done"));
    }

    #[test]
    fn test_format_batch_failed() {
        let notice = Notice::BatchFailed {
            context: "board move".to_string(),
            message: "note missing".to_string(),
        };
        let msg = format_notice(&notice);
        assert!(msg.contains("board move"));
        assert!(msg.contains("note missing"));
    }

    #[test]
    fn test_memory_notifier_collects_in_order() {
        let notifier = MemoryNotifier::new();
        assert!(notifier.is_empty());

        notifier.notify(Notice::AchievementUnlocked {
            name: "First Note".to_string(),
        });
        notifier.notify(Notice::PlanArchived {
            goal: "Learn to paint".to_string(),
            count: 4,
        });

        assert_eq!(notifier.len(), 2);
        let drained = notifier.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], Notice::AchievementUnlocked { .. }));
        assert!(matches!(drained[1], Notice::PlanArchived { .. }));
        assert!(notifier.is_empty());
    }
}
