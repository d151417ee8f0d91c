//! Editor session management.
//!
//! The `EditorSession` struct combines the text buffer, the pending field
//! queue of the active snippet and the undo history into one unit that
//! tracks state across key events.

use std::time::{Duration, Instant};

use crate::buffer::TextBuffer;
use crate::commands::{Edit, FieldUpdate};
use crate::context::EditorContext;
use crate::fields::{FieldJump, FieldRange, FieldTracker};
use crate::history::{History, Snapshot};

/// Buffer, fields and history of one document.
#[derive(Debug, Clone)]
pub struct EditorSession {
    buffer: TextBuffer,
    fields: FieldTracker,
    history: History,
}

impl EditorSession {
    /// Start a session on `text` with the caret at the end.
    pub fn new(text: impl Into<String>, history_window: Duration) -> Self {
        let buffer = TextBuffer::with_text(text);
        let history = History::new(Snapshot::new(buffer.text(), buffer.caret()), history_window);
        Self {
            buffer,
            fields: FieldTracker::new(),
            history,
        }
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn fields(&self) -> &FieldTracker {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldTracker {
        &mut self.fields
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// A snippet is active while fields remain queued.
    pub fn is_snippet_active(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Apply an edit: fields first, then history, then the buffer.
    pub fn apply(&mut self, edit: &Edit, now: Instant) {
        match &edit.field_update {
            FieldUpdate::Shift { from, diff } => self.fields.shift(*diff, *from),
            FieldUpdate::Clear => self.fields.clear(),
            FieldUpdate::Replace(queue) => self.fields.replace(queue.iter().copied()),
        }
        self.history
            .push(Snapshot::new(edit.text.as_str(), edit.selection.end), now, edit.immediate);
        self.buffer.replace(edit.text.as_str(), edit.selection);
    }

    /// Ask the field queue for the next stop from the selection start.
    pub fn advance_field(&mut self, tabular: &[String]) -> FieldJump {
        let from = self.buffer.selection().start;
        self.fields.advance(self.buffer.text(), from, tabular)
    }

    /// Put a history snapshot back into the buffer. The active snippet is dropped.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.fields.clear();
        self.buffer.replace(snapshot.text.as_str(), FieldRange::caret(snapshot.caret));
    }

    /// Replace the document and forget fields and history.
    pub fn load_text(&mut self, text: impl Into<String>) {
        self.buffer = TextBuffer::with_text(text);
        self.fields.clear();
        self.history
            .reset(Snapshot::new(self.buffer.text(), self.buffer.caret()));
    }

    /// Copy the session state the platform displays into `context`.
    pub fn sync_to_context(&self, context: &mut EditorContext) {
        context.pending_fields = self.fields.len();
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new("", Duration::from_millis(1000))
    }
}
