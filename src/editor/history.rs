//! Bounded undo/redo stack with a debounce window that folds rapid
//! edits into one entry.

use std::time::{Duration, Instant};

pub const HISTORY_CAP: usize = 100;
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(750);

#[derive(Debug)]
pub struct HistoryBuffer<T: Clone> {
    entries: Vec<T>,
    /// Index of the entry currently live in the editor.
    cursor: usize,
    cap: usize,
    window: Duration,
    last_commit: Option<Instant>,
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn new(initial: T) -> Self {
        Self::with_limits(initial, HISTORY_CAP, DEBOUNCE_WINDOW)
    }

    pub fn with_limits(initial: T, cap: usize, window: Duration) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            cap: cap.max(1),
            window,
            last_commit: None,
        }
    }

    /// Record a new state. Within the debounce window the newest entry
    /// is overwritten instead of growing the stack; otherwise the redo
    /// tail is dropped and the state appended, evicting the oldest
    /// entry past the cap.
    pub fn record(&mut self, state: T, at: Instant) {
        let at_tip = self.cursor + 1 == self.entries.len();
        let in_window = self
            .last_commit
            .is_some_and(|last| at.duration_since(last) < self.window);

        if at_tip && in_window {
            self.entries[self.cursor] = state;
        } else {
            self.entries.truncate(self.cursor + 1);
            self.entries.push(state);
            if self.entries.len() > self.cap {
                self.entries.remove(0);
            }
            self.cursor = self.entries.len() - 1;
        }
        self.last_commit = Some(at);
    }

    /// Step back, returning the restored state. Undo closes the
    /// debounce window so the next edit starts a fresh entry.
    pub fn undo(&mut self) -> Option<T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.last_commit = None;
        Some(self.entries[self.cursor].clone())
    }

    pub fn redo(&mut self) -> Option<T> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.last_commit = None;
        Some(self.entries[self.cursor].clone())
    }

    pub fn current(&self) -> &T {
        &self.entries[self.cursor]
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_record_undo_redo() {
        let base = Instant::now();
        let mut history = HistoryBuffer::new("a".to_string());
        history.record("b".to_string(), at(base, 1000));
        history.record("c".to_string(), at(base, 2000));

        assert_eq!(history.undo().as_deref(), Some("b"));
        assert_eq!(history.undo().as_deref(), Some("a"));
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo().as_deref(), Some("b"));
        assert_eq!(history.redo().as_deref(), Some("c"));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_rapid_edits_collapse() {
        let base = Instant::now();
        let mut history = HistoryBuffer::new("".to_string());
        history.record("h".to_string(), at(base, 1000));
        history.record("he".to_string(), at(base, 1200));
        history.record("hel".to_string(), at(base, 1400));

        // One burst, one entry.
        assert_eq!(history.len(), 2);
        assert_eq!(history.undo().as_deref(), Some(""));
    }

    #[test]
    fn test_pause_starts_new_entry() {
        let base = Instant::now();
        let mut history = HistoryBuffer::new("".to_string());
        history.record("h".to_string(), at(base, 1000));
        history.record("hello".to_string(), at(base, 1200));
        history.record("hello world".to_string(), at(base, 2500));

        assert_eq!(history.len(), 3);
        assert_eq!(history.undo().as_deref(), Some("hello"));
    }

    #[test]
    fn test_new_edit_truncates_redo_tail() {
        let base = Instant::now();
        let mut history = HistoryBuffer::new("a".to_string());
        history.record("b".to_string(), at(base, 1000));
        history.record("c".to_string(), at(base, 2000));
        history.undo();
        history.record("d".to_string(), at(base, 3000));

        assert!(!history.can_redo());
        assert_eq!(history.undo().as_deref(), Some("b"));
        assert_eq!(history.redo().as_deref(), Some("d"));
    }

    #[test]
    fn test_edit_after_undo_is_not_collapsed() {
        let base = Instant::now();
        let mut history = HistoryBuffer::new("a".to_string());
        history.record("b".to_string(), at(base, 1000));
        history.undo();
        // Within 750ms of the last record, but undo reset the window.
        history.record("c".to_string(), at(base, 1100));

        assert_eq!(history.current(), "c");
        assert_eq!(history.undo().as_deref(), Some("a"));
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let base = Instant::now();
        let mut history = HistoryBuffer::with_limits(0, 3, Duration::from_millis(750));
        for i in 1..=5 {
            history.record(i, at(base, i as u64 * 1000));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.undo(), Some(4));
        assert_eq!(history.undo(), Some(3));
        assert_eq!(history.undo(), None);
    }
}
