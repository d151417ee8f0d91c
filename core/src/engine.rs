//! Snippet engine with session management and key event processing.
//!
//! The `SnippetEngine` owns the rule table, keymap and configuration plus
//! the editing session (buffer, fields, history). `process_key()` resolves
//! a key event into an edit, runs trigger matching where typing allows it,
//! and funnels every mutation through [`SnippetEngine::apply_edit`] so the
//! field queue, history and buffer always change in the same order.

use std::collections::HashMap;
use std::time::Instant;

use crate::commands::{self, pairs, Edit, LineDirection, PairSet};
use crate::context::EditorContext;
use crate::fields::{FieldJump, FieldRange};
use crate::keymap::{EditorAction, Key, KeyEvent, Keymap};
use crate::matcher::TriggerMatcher;
use crate::rule::Rule;
use crate::scan;
use crate::session::EditorSession;
use crate::source::{self, RuleSourceError};
use crate::template;
use crate::Config;

/// Result of processing a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// Key was handled by the engine
    Handled,
    /// Key was not handled (pass through to the platform)
    NotHandled,
}

impl From<bool> for KeyResult {
    fn from(handled: bool) -> Self {
        if handled {
            KeyResult::Handled
        } else {
            KeyResult::NotHandled
        }
    }
}

/// Snippet engine with session management.
pub struct SnippetEngine {
    config: Config,
    /// Set by `config_mut`; derived state is rebuilt before the next event.
    config_dirty: bool,
    rules: Vec<Rule>,
    keymap: Keymap,
    pairs: PairSet,
    matcher: TriggerMatcher,
    session: EditorSession,
    context: EditorContext,
}

impl SnippetEngine {
    /// Create an engine over an empty document.
    pub fn new(config: Config, rules: Vec<Rule>, keymap: Keymap) -> Self {
        let pairs = PairSet::from_config(&config.auto_pairs);
        let matcher = TriggerMatcher::new(config.pattern_cache_size);
        let session = EditorSession::new("", config.history_window());
        Self {
            config,
            config_dirty: false,
            rules,
            keymap,
            pairs,
            matcher,
            session,
            context: EditorContext::new(),
        }
    }

    /// Get a reference to the context for reading engine state.
    pub fn context(&self) -> &EditorContext {
        &self.context
    }

    /// Get a mutable reference to the context.
    pub fn context_mut(&mut self) -> &mut EditorContext {
        &mut self.context
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn text(&self) -> &str {
        self.session.buffer().text()
    }

    pub fn selection(&self) -> FieldRange {
        self.session.buffer().selection()
    }

    pub fn caret(&self) -> usize {
        self.session.buffer().caret()
    }

    pub fn is_snippet_active(&self) -> bool {
        self.session.is_snippet_active()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn matcher(&self) -> &TriggerMatcher {
        &self.matcher
    }

    /// Mutable access to the configuration. Changes take effect on the next
    /// event.
    pub fn config_mut(&mut self) -> &mut Config {
        self.config_dirty = true;
        &mut self.config
    }

    fn refresh_config(&mut self) {
        if !self.config_dirty {
            return;
        }
        self.pairs = PairSet::from_config(&self.config.auto_pairs);
        self.matcher = TriggerMatcher::new(self.config.pattern_cache_size);
        self.session.history_mut().set_window(self.config.history_window());
        self.config_dirty = false;
    }

    /// Replace the rule table.
    pub fn replace_rules(&mut self, rules: Vec<Rule>) {
        tracing::debug!(count = rules.len(), "rules replaced");
        self.rules = rules;
        self.matcher.clear_cache();
    }

    /// Parse `source` and, only if it is valid, replace the rule table.
    /// Returns the number of rules loaded.
    pub fn reload_rules_from_source(
        &mut self,
        source: &str,
        variables: &HashMap<String, String>,
    ) -> Result<usize, RuleSourceError> {
        let rules = source::parse_rules(source, variables)?;
        let count = rules.len();
        self.replace_rules(rules);
        Ok(count)
    }

    pub fn replace_keymap(&mut self, keymap: Keymap) {
        self.keymap = keymap;
    }

    /// Replace the document. Fields and history start over.
    pub fn load_text(&mut self, text: impl Into<String>) {
        self.session.load_text(text);
        self.context.pending_selection = Some(self.session.buffer().selection());
        self.session.sync_to_context(&mut self.context);
    }

    /// Move the selection without touching text, fields or history.
    pub fn set_selection(&mut self, start: usize, end: usize) {
        self.session.buffer_mut().set_selection(start, end);
        self.context.pending_selection = Some(self.session.buffer().selection());
    }

    /// Process a key event at the current time.
    pub fn process_key(&mut self, event: KeyEvent) -> KeyResult {
        self.process_key_at(event, Instant::now())
    }

    /// Process a key event as if it happened at `now`.
    pub fn process_key_at(&mut self, event: KeyEvent, now: Instant) -> KeyResult {
        self.refresh_config();
        self.context.clear();

        let result = match self.keymap.lookup(&event) {
            Some(action) => self.run_action(action, now),
            None => self.handle_key(event, now),
        };

        self.session.sync_to_context(&mut self.context);
        result
    }

    /// Run a bound editor action.
    pub fn run_action(&mut self, action: EditorAction, now: Instant) -> KeyResult {
        tracing::debug!(%action, "editor action");
        match action {
            EditorAction::Undo => self.undo().into(),
            EditorAction::Redo => self.redo().into(),
            EditorAction::NextTabstop => self.next_field(now),
            EditorAction::Indent => {
                let buffer = self.session.buffer();
                let in_tabular = self.in_tabular(buffer.selection().start);
                let edit = commands::indent_newline(buffer, in_tabular, &self.config.row_terminator);
                self.apply_edit(edit, now);
                KeyResult::Handled
            }
            EditorAction::SmartFraction => {
                let edit = commands::smart_fraction(self.session.buffer(), &self.config.fraction_template);
                self.apply_optional(edit, now)
            }
            EditorAction::DeleteWord => {
                let edit = commands::delete_word(self.session.buffer());
                self.apply_optional(edit, now)
            }
            EditorAction::DeleteLine => {
                let edit = commands::delete_line(self.session.buffer());
                self.apply_optional(edit, now)
            }
            EditorAction::MoveLineUp => {
                let edit = commands::move_lines(self.session.buffer(), LineDirection::Up);
                self.apply_optional(edit, now)
            }
            EditorAction::MoveLineDown => {
                let edit = commands::move_lines(self.session.buffer(), LineDirection::Down);
                self.apply_optional(edit, now)
            }
        }
    }

    fn handle_key(&mut self, event: KeyEvent, now: Instant) -> KeyResult {
        if let Some(c) = event.typed_char() {
            return self.type_char(c, now);
        }
        if event.modifiers.is_command() {
            return KeyResult::NotHandled;
        }
        match event.key {
            Key::Escape => self.cancel_snippet().into(),
            Key::Backspace => self.backspace(now),
            Key::Delete => self.delete_forward(now),
            Key::Enter => self.type_char('\n', now),
            Key::Left => {
                let moved = self.session.buffer_mut().move_left();
                self.context.pending_selection = Some(self.selection());
                moved.into()
            }
            Key::Right => {
                let moved = self.session.buffer_mut().move_right();
                self.context.pending_selection = Some(self.selection());
                moved.into()
            }
            Key::Home | Key::End => {
                let (start, end) = scan::line_bounds(self.text(), self.caret());
                let target = if event.key == Key::Home { start } else { end };
                self.set_selection(target, target);
                KeyResult::Handled
            }
            Key::Tab | Key::Up | Key::Down | Key::Char(_) => KeyResult::NotHandled,
        }
    }

    /// Typing path for a printable character.
    fn type_char(&mut self, c: char, now: Instant) -> KeyResult {
        let buffer = self.session.buffer();

        if let Some(caret) = pairs::overtype(buffer, &self.pairs, c) {
            self.set_selection(caret, caret);
            return KeyResult::Handled;
        }

        let typed = c.to_string();
        if self.pairs.closer_for(c).is_some() {
            if !buffer.has_selection() {
                let raw = Edit::replace_selection(buffer, &typed, false);
                if self.fire_auto(&raw, now) {
                    return KeyResult::Handled;
                }
            }
            if let Some(edit) = pairs::insert_pair(self.session.buffer(), &self.pairs, c) {
                self.apply_edit(edit, now);
                return KeyResult::Handled;
            }
        }

        let buffer = self.session.buffer();
        if buffer.has_selection() {
            let sel = buffer.selection();
            let in_math = self.config.force_math || scan::is_inside_math(buffer.text(), sel.start);
            if let Some(index) = self.matcher.find_visual(&self.rules, c, in_math) {
                let expansion = template::compile(&self.rules[index].template, &[], buffer.selected_text());
                let edit = Edit::expand(buffer.text(), sel, &expansion);
                tracing::debug!(rule = index, "surround rule fired");
                self.apply_edit(edit, now);
                self.context.fired_rule = Some(index);
                return KeyResult::Handled;
            }
        }

        let edit = Edit::replace_selection(self.session.buffer(), &typed, false);
        self.commit_typing(edit, now);
        KeyResult::Handled
    }

    /// Apply the expansion of an auto rule that fires on `raw`, if any.
    fn fire_auto(&mut self, raw: &Edit, now: Instant) -> bool {
        let found = self.matcher.find(
            &raw.text,
            raw.selection.end,
            &self.rules,
            self.config.force_math,
            true,
        );
        match found {
            Some(m) => {
                let index = m.rule_index;
                self.apply_edit(m.into(), now);
                self.context.fired_rule = Some(index);
                true
            }
            None => false,
        }
    }

    /// Commit a typing edit, letting auto rules rewrite it when the text grew.
    fn commit_typing(&mut self, edit: Edit, now: Instant) {
        if edit.text.len() > self.session.buffer().len() && self.fire_auto(&edit, now) {
            return;
        }
        self.apply_edit(edit, now);
    }

    /// Raw platform input: the widget already holds `new_text` with the
    /// caret at `caret`. Takes the same path as typing.
    pub fn handle_input(&mut self, new_text: &str, caret: usize) -> KeyResult {
        self.handle_input_at(new_text, caret, Instant::now())
    }

    pub fn handle_input_at(&mut self, new_text: &str, caret: usize, now: Instant) -> KeyResult {
        self.refresh_config();
        self.context.clear();
        let old_len = self.session.buffer().len();
        if new_text == self.text() {
            return KeyResult::NotHandled;
        }
        let caret = crate::buffer::clamp_to_boundary(new_text, caret);
        let diff = new_text.len() as isize - old_len as isize;
        let from = if diff > 0 {
            caret.saturating_sub(diff as usize)
        } else {
            caret
        };
        let edit = Edit {
            text: new_text.to_string(),
            selection: FieldRange::caret(caret),
            field_update: commands::FieldUpdate::Shift { from, diff },
            immediate: false,
        };
        self.commit_typing(edit, now);
        self.session.sync_to_context(&mut self.context);
        KeyResult::Handled
    }

    fn backspace(&mut self, now: Instant) -> KeyResult {
        let buffer = self.session.buffer();
        if let Some(edit) = pairs::delete_pair(buffer, &self.pairs) {
            self.apply_edit(edit, now);
            return KeyResult::Handled;
        }
        let sel = buffer.selection();
        let range = if buffer.has_selection() {
            sel
        } else if sel.start > 0 {
            FieldRange::new(crate::buffer::prev_boundary(buffer.text(), sel.start), sel.start)
        } else {
            return KeyResult::NotHandled;
        };
        let edit = Edit::splice(buffer.text(), range, "", false);
        self.apply_edit(edit, now);
        KeyResult::Handled
    }

    fn delete_forward(&mut self, now: Instant) -> KeyResult {
        let buffer = self.session.buffer();
        let sel = buffer.selection();
        let range = if buffer.has_selection() {
            sel
        } else if sel.end < buffer.len() {
            FieldRange::new(sel.end, crate::buffer::next_boundary(buffer.text(), sel.end))
        } else {
            return KeyResult::NotHandled;
        };
        let edit = Edit::splice(buffer.text(), range, "", false);
        self.apply_edit(edit, now);
        KeyResult::Handled
    }

    fn in_tabular(&self, pos: usize) -> bool {
        scan::enclosing_environment(self.text(), pos, &self.config.tabular_environments).is_some()
    }

    /// The next-field command. First applicable wins: field jump, manual
    /// expansion, column separator, stepping over a closing delimiter,
    /// indentation.
    pub fn next_field(&mut self, now: Instant) -> KeyResult {
        match self.session.advance_field(&self.config.tabular_environments) {
            FieldJump::Select(range) => {
                tracing::debug!(start = range.start, end = range.end, "jump to field");
                self.set_selection(range.start, range.end);
                return KeyResult::Handled;
            }
            FieldJump::ColumnSeparator | FieldJump::Exhausted => {}
        }

        if self.expand_at_caret(now) {
            return KeyResult::Handled;
        }

        let buffer = self.session.buffer();
        let start = buffer.selection().start;
        if self.in_tabular(start) {
            let edit = Edit::replace_selection(buffer, &self.config.column_separator, true);
            self.apply_edit(edit, now);
            return KeyResult::Handled;
        }

        if !buffer.has_selection() {
            if let Some(next) = buffer.char_after().filter(|c| self.config.is_closing_delimiter(*c)) {
                let caret = buffer.caret() + next.len_utf8();
                self.set_selection(caret, caret);
                return KeyResult::Handled;
            }
        }

        let edit = Edit::replace_selection(self.session.buffer(), &self.config.indent, true);
        self.apply_edit(edit, now);
        KeyResult::Handled
    }

    fn expand_at_caret(&mut self, now: Instant) -> bool {
        let buffer = self.session.buffer();
        if buffer.has_selection() {
            return false;
        }
        let found = self.matcher.find(
            buffer.text(),
            buffer.caret(),
            &self.rules,
            self.config.force_math,
            false,
        );
        match found {
            Some(m) => {
                let index = m.rule_index;
                self.apply_edit(m.into(), now);
                self.context.fired_rule = Some(index);
                true
            }
            None => false,
        }
    }

    /// Explicit expand command: fire any eligible rule (auto or not) at the caret.
    pub fn expand(&mut self) -> bool {
        self.refresh_config();
        let fired = self.expand_at_caret(Instant::now());
        self.session.sync_to_context(&mut self.context);
        fired
    }

    /// Undo one step. Returns false at the oldest entry.
    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.session.history_mut().undo().cloned() else {
            return false;
        };
        self.session.restore(&snapshot);
        self.context.pending_selection = Some(self.selection());
        self.context.text_changed = true;
        self.context.status_text = "undo".to_string();
        true
    }

    /// Redo one step. Returns false at the newest entry.
    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.session.history_mut().redo().cloned() else {
            return false;
        };
        self.session.restore(&snapshot);
        self.context.pending_selection = Some(self.selection());
        self.context.text_changed = true;
        self.context.status_text = "redo".to_string();
        true
    }

    /// Drop the active snippet. Returns whether one was active.
    pub fn cancel_snippet(&mut self) -> bool {
        let active = self.session.is_snippet_active();
        self.session.fields_mut().clear();
        active
    }

    /// Apply an edit: fields, history, buffer, then the pending selection.
    pub fn apply_edit(&mut self, edit: Edit, now: Instant) {
        self.session.apply(&edit, now);
        self.context.pending_selection = Some(self.session.buffer().selection());
        self.context.text_changed = true;
    }

    fn apply_optional(&mut self, edit: Option<Edit>, now: Instant) -> KeyResult {
        match edit {
            Some(edit) => {
                self.apply_edit(edit, now);
                KeyResult::Handled
            }
            None => KeyResult::NotHandled,
        }
    }
}
