//! Line-oriented key scripts for the interactive front end.
//!
//! Every character of a line is one key press. A backslash introduces an
//! editing key:
//!
//! | escape | key                   |
//! |--------|-----------------------|
//! | `\t`   | Tab                   |
//! | `\n`   | Enter                 |
//! | `\b`   | Backspace             |
//! | `\d`   | Delete                |
//! | `\u`   | Ctrl+z (undo)         |
//! | `\r`   | Ctrl+Shift+Z (redo)   |
//! | `\e`   | Escape                |
//! | `\<`   | ArrowLeft             |
//! | `\>`   | ArrowRight            |
//! | `\\`   | a literal backslash   |
//!
//! Any other backslash is typed as-is, so `\frac` reaches the editor
//! unchanged. Commands whose name starts with an escape letter
//! (`\theta`) need the doubled form `\\theta`.

use texflow_core::{FieldRange, Key, KeyEvent};

pub fn key_events(line: &str) -> Vec<KeyEvent> {
    let mut events = Vec::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            events.push(KeyEvent::char(ch));
            continue;
        }
        let event = match chars.peek() {
            Some('t') => KeyEvent::plain(Key::Tab),
            Some('n') => KeyEvent::plain(Key::Enter),
            Some('b') => KeyEvent::plain(Key::Backspace),
            Some('d') => KeyEvent::plain(Key::Delete),
            Some('u') => KeyEvent::char('z').ctrl(),
            Some('r') => KeyEvent::char('Z').ctrl().shift(),
            Some('e') => KeyEvent::plain(Key::Escape),
            Some('<') => KeyEvent::plain(Key::Left),
            Some('>') => KeyEvent::plain(Key::Right),
            Some('\\') => KeyEvent::char('\\'),
            _ => {
                events.push(KeyEvent::char('\\'));
                continue;
            }
        };
        chars.next();
        events.push(event);
    }
    events
}

/// Show the caret as `|` and a selection as `[...]`.
pub fn annotate(text: &str, selection: FieldRange) -> String {
    let (start, end) = (selection.start.min(text.len()), selection.end.min(text.len()));
    if start == end {
        format!("{}|{}", &text[..start], &text[start..])
    } else {
        format!("{}[{}]{}", &text[..start], &text[start..end], &text[end..])
    }
}
