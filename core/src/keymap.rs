//! Key events, normalized key combinations and the action keymap.
//!
//! A combination is written as modifiers in the fixed order
//! `Ctrl+Alt+Shift+Meta` followed by the key name, e.g. `Ctrl+Shift+Z` or
//! `Alt+ArrowUp`. Printable keys keep their case; the space bar is `Space`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("invalid key combination {combo:?}: {reason}")]
    InvalidCombo { combo: String, reason: String },
    #[error("unknown editor action {0:?}")]
    UnknownAction(String),
    #[error("keybinding JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Modifier state of a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Ctrl, Alt or Meta held (Shift alone still types characters).
    pub fn is_command(&self) -> bool {
        self.ctrl || self.alt || self.meta
    }
}

/// Keys the editor distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Tab,
    Enter,
    Backspace,
    Delete,
    Escape,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

impl Key {
    /// Name used in key combinations.
    pub fn name(&self) -> String {
        match self {
            Key::Char(' ') => "Space".to_string(),
            Key::Char(c) => c.to_string(),
            Key::Tab => "Tab".to_string(),
            Key::Enter => "Enter".to_string(),
            Key::Backspace => "Backspace".to_string(),
            Key::Delete => "Delete".to_string(),
            Key::Escape => "Escape".to_string(),
            Key::Left => "ArrowLeft".to_string(),
            Key::Right => "ArrowRight".to_string(),
            Key::Up => "ArrowUp".to_string(),
            Key::Down => "ArrowDown".to_string(),
            Key::Home => "Home".to_string(),
            Key::End => "End".to_string(),
        }
    }

    fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(Key::Char(c));
        }
        let key = match name.to_ascii_lowercase().as_str() {
            "space" | "spacebar" => Key::Char(' '),
            "tab" => Key::Tab,
            "enter" | "return" => Key::Enter,
            "backspace" => Key::Backspace,
            "delete" | "del" => Key::Delete,
            "escape" | "esc" => Key::Escape,
            "arrowleft" | "left" => Key::Left,
            "arrowright" | "right" => Key::Right,
            "arrowup" | "up" => Key::Up,
            "arrowdown" | "down" => Key::Down,
            "home" => Key::Home,
            "end" => Key::End,
            "plus" => Key::Char('+'),
            _ => return None,
        };
        Some(key)
    }
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Unmodified key.
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// Typed character. Uppercase letters carry Shift.
    pub fn char(c: char) -> Self {
        let modifiers = Modifiers {
            shift: c.is_uppercase(),
            ..Modifiers::NONE
        };
        Self::new(Key::Char(c), modifiers)
    }

    pub fn ctrl(mut self) -> Self {
        self.modifiers.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.modifiers.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.modifiers.shift = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.modifiers.meta = true;
        self
    }

    /// The character this event types, if it is a plain (non-command) char.
    pub fn typed_char(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !self.modifiers.is_command() => Some(c),
            _ => None,
        }
    }
}

/// Normalized key combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    modifiers: Modifiers,
    key: Key,
}

impl KeyCombo {
    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            modifiers: event.modifiers,
            key: event.key,
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.modifiers;
        for (held, name) in [(m.ctrl, "Ctrl"), (m.alt, "Alt"), (m.shift, "Shift"), (m.meta, "Meta")] {
            if held {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key.name())
    }
}

impl FromStr for KeyCombo {
    type Err = KeymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| KeymapError::InvalidCombo {
            combo: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim();
        // a trailing "++" means the key itself is '+'
        let (mods, key) = if let Some(prefix) = trimmed.strip_suffix("++") {
            (prefix, "+")
        } else if trimmed == "+" {
            ("", "+")
        } else {
            match trimmed.rsplit_once('+') {
                Some((mods, key)) => (mods, key),
                None => ("", trimmed),
            }
        };

        let mut modifiers = Modifiers::NONE;
        for part in mods.split('+').filter(|p| !p.is_empty()) {
            match part.trim().to_ascii_lowercase().as_str() {
                "ctrl" | "control" => modifiers.ctrl = true,
                "alt" | "option" | "opt" => modifiers.alt = true,
                "shift" => modifiers.shift = true,
                "meta" | "cmd" | "command" | "super" | "win" => modifiers.meta = true,
                _ => return Err(invalid(&format!("unknown modifier {part:?}"))),
            }
        }
        let key_name = key.trim();
        if key_name.is_empty() {
            return Err(invalid("missing key"));
        }
        let key = Key::from_name(key_name).ok_or_else(|| invalid("unknown key name"))?;
        Ok(Self { modifiers, key })
    }
}

/// Editor commands a key combination can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditorAction {
    Undo,
    Redo,
    DeleteWord,
    DeleteLine,
    MoveLineUp,
    MoveLineDown,
    SmartFraction,
    Indent,
    NextTabstop,
}

impl EditorAction {
    pub const ALL: [EditorAction; 9] = [
        EditorAction::Undo,
        EditorAction::Redo,
        EditorAction::DeleteWord,
        EditorAction::DeleteLine,
        EditorAction::MoveLineUp,
        EditorAction::MoveLineDown,
        EditorAction::SmartFraction,
        EditorAction::Indent,
        EditorAction::NextTabstop,
    ];

    /// Human readable label ("Move Line Up").
    pub fn label(&self) -> &'static str {
        match self {
            EditorAction::Undo => "Undo",
            EditorAction::Redo => "Redo",
            EditorAction::DeleteWord => "Delete Word",
            EditorAction::DeleteLine => "Delete Line",
            EditorAction::MoveLineUp => "Move Line Up",
            EditorAction::MoveLineDown => "Move Line Down",
            EditorAction::SmartFraction => "Smart Fraction",
            EditorAction::Indent => "Indent",
            EditorAction::NextTabstop => "Next Tabstop",
        }
    }

    /// Persisted name ("MOVE_LINE_UP").
    pub fn name(&self) -> &'static str {
        match self {
            EditorAction::Undo => "UNDO",
            EditorAction::Redo => "REDO",
            EditorAction::DeleteWord => "DELETE_WORD",
            EditorAction::DeleteLine => "DELETE_LINE",
            EditorAction::MoveLineUp => "MOVE_LINE_UP",
            EditorAction::MoveLineDown => "MOVE_LINE_DOWN",
            EditorAction::SmartFraction => "SMART_FRACTION",
            EditorAction::Indent => "INDENT",
            EditorAction::NextTabstop => "NEXT_TABSTOP",
        }
    }
}

/// Accepts the persisted name in any case, with `-` or spaces for `_`.
impl FromStr for EditorAction {
    type Err = KeymapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();
        EditorAction::ALL
            .into_iter()
            .find(|action| action.name() == wanted)
            .ok_or_else(|| KeymapError::UnknownAction(s.to_string()))
    }
}

impl fmt::Display for EditorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Persisted form of one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub keys: String,
    pub action: EditorAction,
}

/// Ordered set of combination → action bindings, one per combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    bindings: Vec<(KeyCombo, EditorAction)>,
}

impl Default for Keymap {
    fn default() -> Self {
        let defaults = [
            ("Alt+/", EditorAction::SmartFraction),
            ("Alt+ArrowUp", EditorAction::MoveLineUp),
            ("Alt+ArrowDown", EditorAction::MoveLineDown),
            ("Ctrl+z", EditorAction::Undo),
            ("Ctrl+Shift+Z", EditorAction::Redo),
            ("Ctrl+Backspace", EditorAction::DeleteWord),
            ("Alt+Backspace", EditorAction::DeleteWord),
            ("Ctrl+Shift+K", EditorAction::DeleteLine),
            ("Tab", EditorAction::NextTabstop),
            ("Enter", EditorAction::Indent),
        ];
        let mut keymap = Keymap::empty();
        for (keys, action) in defaults {
            if let Ok(combo) = keys.parse() {
                keymap.insert(combo, action);
            }
        }
        keymap
    }
}

impl Keymap {
    /// A keymap with no bindings.
    pub fn empty() -> Self {
        Self { bindings: Vec::new() }
    }

    fn insert(&mut self, combo: KeyCombo, action: EditorAction) {
        match self.bindings.iter_mut().find(|(c, _)| *c == combo) {
            Some(slot) => slot.1 = action,
            None => self.bindings.push((combo, action)),
        }
    }

    /// Bind `keys` to `action`, replacing any previous binding of the same combination.
    pub fn bind(&mut self, keys: &str, action: EditorAction) -> Result<(), KeymapError> {
        let combo: KeyCombo = keys.parse()?;
        self.insert(combo, action);
        Ok(())
    }

    /// Remove the binding for `keys`. Returns the action it had.
    pub fn unbind(&mut self, keys: &str) -> Result<Option<EditorAction>, KeymapError> {
        let combo: KeyCombo = keys.parse()?;
        let pos = self.bindings.iter().position(|(c, _)| *c == combo);
        Ok(pos.map(|i| self.bindings.remove(i).1))
    }

    /// Action bound to the event's combination.
    pub fn lookup(&self, event: &KeyEvent) -> Option<EditorAction> {
        let combo = KeyCombo::from_event(event);
        self.bindings
            .iter()
            .find(|(c, _)| *c == combo)
            .map(|(_, action)| *action)
    }

    /// Bindings in persisted form, normalized.
    pub fn bindings(&self) -> Vec<KeyBinding> {
        self.bindings
            .iter()
            .map(|(combo, action)| KeyBinding {
                keys: combo.to_string(),
                action: *action,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn to_json(&self) -> Result<String, KeymapError> {
        Ok(serde_json::to_string_pretty(&self.bindings())?)
    }

    /// Parse a persisted keymap. Later duplicates replace earlier ones.
    pub fn from_json(json: &str) -> Result<Self, KeymapError> {
        let bindings: Vec<KeyBinding> = serde_json::from_str(json)?;
        let mut keymap = Keymap::empty();
        for binding in bindings {
            keymap.bind(&binding.keys, binding.action)?;
        }
        Ok(keymap)
    }
}
