//! Line handling for the interactive front end.
//!
//! A line starting with `:` is a command; anything else is a key script
//! (see [`crate::script`]). Commands that change rules, keybindings or
//! settings apply to the running engine and, when a store is open, are
//! written to the profile so the next session starts from them.

use std::collections::HashMap;
use std::path::Path;

use texflow_core::render::render_or_fallback;
use texflow_core::{
    parse_rules, EditorAction, KeyValueStore, Keymap, KeymapError, Rendering, RuleSourceError, SnippetEngine,
};
use thiserror::Error;

use crate::preview::SourceRenderer;
use crate::profile::{Profile, ProfileError};
use crate::rules::DEFAULT_RULES_SOURCE;
use crate::script::{annotate, key_events};

pub const HELP: &str = "Commands: :clear, :rules, :save-rules <file>, :reset-rules, :keys, \
:bind <keys> <action>, :unbind <keys>, :reset-keys, :math on|off, :save-config, :help, :quit";

const NOT_SAVED: &str = "(not saved: no store open)";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command :{0} (try :help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error(transparent)]
    Rules(#[from] RuleSourceError),
    #[error(transparent)]
    Keymap(#[from] KeymapError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Result of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Lines to print.
    Reply(Vec<String>),
    Quit,
}

pub struct Repl<S> {
    engine: SnippetEngine,
    profile: Option<Profile<S>>,
    variables: HashMap<String, String>,
    preview: bool,
}

impl<S: KeyValueStore> Repl<S> {
    /// `variables` are used for rule documents when no profile is open.
    pub fn new(engine: SnippetEngine, profile: Option<Profile<S>>, variables: HashMap<String, String>) -> Self {
        Self {
            engine,
            profile,
            variables,
            preview: false,
        }
    }

    /// Also print a preview of the buffer after every typed line.
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }

    pub fn engine(&self) -> &SnippetEngine {
        &self.engine
    }

    pub fn profile(&self) -> Option<&Profile<S>> {
        self.profile.as_ref()
    }

    pub fn handle_line(&mut self, line: &str) -> Outcome {
        let Some(command) = line.trim().strip_prefix(':') else {
            return Outcome::Reply(self.type_keys(line));
        };
        let mut words = command.split_whitespace();
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        if matches!(name, "quit" | "q") {
            return Outcome::Quit;
        }
        match self.run(name, &args) {
            Ok(lines) => Outcome::Reply(lines),
            Err(err) => {
                tracing::debug!(command = name, %err, "command failed");
                Outcome::Reply(vec![format!("error: {err}")])
            }
        }
    }

    fn run(&mut self, name: &str, args: &[&str]) -> Result<Vec<String>, CommandError> {
        let reply = match (name, args) {
            ("help", _) => HELP.to_string(),
            ("clear", _) => {
                self.engine.load_text("");
                "|".to_string()
            }
            ("rules", _) => {
                let custom = match &self.profile {
                    Some(profile) => profile.has_custom_rules()?,
                    None => false,
                };
                let origin = if custom { "saved" } else { "loaded" };
                format!("{} rules ({origin})", self.engine.rules().len())
            }
            ("save-rules", [file]) => self.save_rules(Path::new(file))?,
            ("save-rules", _) => return Err(CommandError::Usage(":save-rules <file>")),
            ("reset-rules", _) => {
                if let Some(profile) = &self.profile {
                    profile.reset_rules()?;
                }
                let rules = parse_rules(DEFAULT_RULES_SOURCE, &self.variables)?;
                let count = rules.len();
                self.engine.replace_rules(rules);
                self.persisted(format!("built-in rules restored ({count})"))
            }
            ("keys", _) => {
                let lines = self
                    .engine
                    .keymap()
                    .bindings()
                    .into_iter()
                    .map(|b| format!("{:<16} {}", b.keys, b.action.name()))
                    .collect();
                return Ok(lines);
            }
            ("bind", [keys, action @ ..]) if !action.is_empty() => {
                let action: EditorAction = action.join(" ").parse()?;
                let mut keymap = self.engine.keymap().clone();
                keymap.bind(keys, action)?;
                self.store_keymap(keymap)?;
                self.persisted(format!("{keys} -> {}", action.name()))
            }
            ("bind", _) => return Err(CommandError::Usage(":bind <keys> <action>")),
            ("unbind", [keys]) => {
                let mut keymap = self.engine.keymap().clone();
                match keymap.unbind(keys)? {
                    Some(action) => {
                        self.store_keymap(keymap)?;
                        self.persisted(format!("{keys} no longer runs {}", action.name()))
                    }
                    None => format!("{keys} is not bound"),
                }
            }
            ("unbind", _) => return Err(CommandError::Usage(":unbind <keys>")),
            ("reset-keys", _) => {
                if let Some(profile) = &self.profile {
                    profile.reset_keymap()?;
                }
                self.engine.replace_keymap(Keymap::default());
                self.persisted("default keybindings restored".to_string())
            }
            ("math", [state]) => {
                let enabled = match *state {
                    "on" => true,
                    "off" => false,
                    _ => return Err(CommandError::Usage(":math on|off")),
                };
                self.engine.config_mut().set_force_math(enabled);
                format!("math everywhere: {state} (:save-config to keep)")
            }
            ("math", _) => return Err(CommandError::Usage(":math on|off")),
            ("save-config", _) => match &self.profile {
                Some(profile) => {
                    profile.save_config(self.engine.config())?;
                    "config saved".to_string()
                }
                None => NOT_SAVED.to_string(),
            },
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(vec![reply])
    }

    fn save_rules(&mut self, path: &Path) -> Result<String, CommandError> {
        let source = std::fs::read_to_string(path).map_err(|source| CommandError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let rules = match &self.profile {
            Some(profile) => {
                profile.save_rules_source(&source)?;
                profile.load_rules()?
            }
            None => parse_rules(&source, &self.variables)?,
        };
        let count = rules.len();
        self.engine.replace_rules(rules);
        Ok(self.persisted(format!("{count} rules loaded from {}", path.display())))
    }

    fn store_keymap(&mut self, keymap: Keymap) -> Result<(), CommandError> {
        if let Some(profile) = &self.profile {
            profile.save_keymap(&keymap)?;
        }
        self.engine.replace_keymap(keymap);
        Ok(())
    }

    fn persisted(&self, message: String) -> String {
        if self.profile.is_some() {
            message
        } else {
            format!("{message} {NOT_SAVED}")
        }
    }

    fn type_keys(&mut self, line: &str) -> Vec<String> {
        for event in key_events(line) {
            self.engine.process_key(event);
        }
        let mut lines = vec![annotate(self.engine.text(), self.engine.selection())];
        let status = &self.engine.context().status_text;
        if !status.is_empty() {
            lines.push(format!("({status})"));
        }
        if self.engine.is_snippet_active() {
            lines.push(format!("fields pending: {}", self.engine.context().pending_fields));
        }
        if self.preview {
            match render_or_fallback(&SourceRenderer, self.engine.text(), true) {
                Rendering::Rendered(out) => lines.push(format!("preview: {out}")),
                Rendering::Fallback { message, .. } => lines.push(format!("preview unavailable: {message}")),
            }
        }
        lines
    }
}
