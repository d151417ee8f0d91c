//! Linear undo/redo history with time-window coalescing.
//!
//! Each entry is a full `(text, caret)` snapshot. Pushing while the pointer
//! is not at the tail discards the redo branch. A push arriving within the
//! coalescing window of the previous one (and not marked immediate)
//! overwrites the top entry instead of growing the stack, so a burst of
//! keystrokes undoes as a single step.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub caret: usize,
}

impl Snapshot {
    pub fn new(text: impl Into<String>, caret: usize) -> Self {
        Self {
            text: text.into(),
            caret,
        }
    }
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Snapshot>,
    pointer: usize,
    window: Duration,
    last_push: Option<Instant>,
}

impl History {
    /// Start a history whose first entry is `initial`.
    pub fn new(initial: Snapshot, window: Duration) -> Self {
        Self {
            entries: vec![initial],
            pointer: 0,
            window,
            last_push: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the current snapshot.
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn current(&self) -> &Snapshot {
        &self.entries[self.pointer]
    }

    pub fn can_undo(&self) -> bool {
        self.pointer > 0
    }

    pub fn can_redo(&self) -> bool {
        self.pointer + 1 < self.entries.len()
    }

    /// Record a snapshot taken at `now`.
    pub fn push(&mut self, snapshot: Snapshot, now: Instant, immediate: bool) {
        let at_tail = self.pointer + 1 == self.entries.len();
        let within_window = self
            .last_push
            .is_some_and(|last| now.saturating_duration_since(last) < self.window);

        if at_tail && within_window && !immediate && self.pointer > 0 {
            self.entries[self.pointer] = snapshot;
        } else {
            self.entries.truncate(self.pointer + 1);
            self.entries.push(snapshot);
            self.pointer = self.entries.len() - 1;
        }
        self.last_push = Some(now);
    }

    /// Step back. `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.pointer -= 1;
        self.last_push = None;
        Some(&self.entries[self.pointer])
    }

    /// Step forward. `None` at the newest entry.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.pointer += 1;
        self.last_push = None;
        Some(&self.entries[self.pointer])
    }

    /// Forget everything and restart from `initial`.
    pub fn reset(&mut self, initial: Snapshot) {
        self.entries = vec![initial];
        self.pointer = 0;
        self.last_push = None;
    }
}
