//! Editor context for platform communication.
//!
//! The `EditorContext` struct is a plain data container. After calling
//! `process_key()` the platform reads these fields to mirror the engine's
//! state into its own text widget (caret placement, status line).

use crate::fields::FieldRange;

/// What the platform should refresh after a key event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorContext {
    /// Selection to apply to the widget once its text has been updated.
    pub pending_selection: Option<FieldRange>,

    /// Whether the text changed during the last key event.
    pub text_changed: bool,

    /// Index of the rule that fired during the last key event.
    pub fired_rule: Option<usize>,

    /// Number of fields still queued in the active snippet.
    pub pending_fields: usize,

    /// Short human readable note about the last event (e.g. "undo").
    pub status_text: String,
}

impl EditorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset per-event state. The pending selection survives until the
    /// platform consumes it.
    pub fn clear(&mut self) {
        self.text_changed = false;
        self.fired_rule = None;
        self.status_text.clear();
    }

    /// Take the pending selection, leaving `None`.
    pub fn take_pending_selection(&mut self) -> Option<FieldRange> {
        self.pending_selection.take()
    }

    pub fn has_pending_selection(&self) -> bool {
        self.pending_selection.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_keeps_pending_selection() {
        let mut ctx = EditorContext::new();
        ctx.pending_selection = Some(FieldRange::caret(3));
        ctx.text_changed = true;
        ctx.status_text.push_str("undo");
        ctx.clear();
        assert!(!ctx.text_changed);
        assert!(ctx.status_text.is_empty());
        assert_eq!(ctx.take_pending_selection(), Some(FieldRange::caret(3)));
        assert!(!ctx.has_pending_selection());
    }
}
