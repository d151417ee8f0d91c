//! texflow-core
//!
//! Language-agnostic snippet expansion engine: trigger matching, template
//! compilation, tab-stop fields, undo history and the keystroke
//! coordinator that ties them together. The LaTeX rule table and the
//! command-line front end live in the `texflow` crate.
//!
//! Public API:
//! - `SnippetEngine` - Keystroke coordinator (`process_key`)
//! - `Rule` - Trigger + template + options
//! - `TriggerMatcher` - Finds the rule that fires at the caret
//! - `Expansion` / `compile` - Template compiler
//! - `FieldTracker` - Pending tab-stop queue
//! - `History` - Undo/redo with coalescing
//! - `Keymap` - Key combination → editor action
//! - `KeyValueStore` - Persistence of rules, keybindings and config
//! - `Config` - Engine settings
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod buffer;
pub use buffer::TextBuffer;

pub mod fields;
pub use fields::{FieldJump, FieldRange, FieldTracker};

pub mod scan;
pub use scan::is_inside_math;

pub mod expr;
pub use expr::{CaptureFn, ExprError};

pub mod rule;
pub use rule::{Pattern, Rule, RuleOptions, Template, Trigger};

pub mod template;
pub use template::{compile, Expansion};

pub mod matcher;
pub use matcher::{Match, TriggerMatcher};

pub mod history;
pub use history::{History, Snapshot};

pub mod keymap;
pub use keymap::{EditorAction, Key, KeyBinding, KeyCombo, KeyEvent, Keymap, KeymapError, Modifiers};

pub mod commands;
pub use commands::{Edit, FieldUpdate};

pub mod context;
pub use context::EditorContext;

pub mod session;
pub use session::EditorSession;

pub mod source;
pub use source::{parse_rules, serialize_rules, RuleSourceError};

pub mod store;
pub use store::{KeyValueStore, MemoryStore, RedbStore, StoreError};

pub mod render;
pub use render::{Renderer, Rendering, RenderError};

pub mod engine;
pub use engine::{KeyResult, SnippetEngine};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Engine configuration.
///
/// Every field has a default, so a TOML file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Pushes closer together than this coalesce into one undo step.
    pub history_window_ms: u64,

    /// Inserted by the next-field key when nothing else applies.
    pub indent: String,

    /// Treat the whole document as math (math-only rules always eligible).
    pub force_math: bool,

    /// Two-character opener/closer strings, e.g. "()".
    pub auto_pairs: Vec<String>,

    /// Characters the next-field key steps over.
    pub closing_delimiters: String,

    /// Environments whose cells are separated by `column_separator`.
    pub tabular_environments: Vec<String>,
    pub column_separator: String,
    /// Appended before the newline when Enter splits a row.
    pub row_terminator: String,

    /// Template for the smart fraction command; `${VISUAL}` is the numerator.
    pub fraction_template: String,

    /// Capacity of the compiled pattern cache.
    pub pattern_cache_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_window_ms: 1000,
            indent: "  ".to_string(),
            force_math: false,
            auto_pairs: ["()", "{}", "[]", "\"\"", "''", "$$"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            closing_delimiters: "}])$>\"'".to_string(),
            tabular_environments: [
                "pmatrix", "bmatrix", "Bmatrix", "vmatrix", "Vmatrix", "matrix", "cases", "align",
                "align*", "array", "gather", "gather*", "split",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            column_separator: " & ".to_string(),
            row_terminator: " \\\\".to_string(),
            fraction_template: "\\frac{${VISUAL}}{$1}$0".to_string(),
            pattern_cache_size: 256,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to TOML string.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn history_window(&self) -> Duration {
        Duration::from_millis(self.history_window_ms)
    }

    pub fn set_history_window_ms(&mut self, ms: u64) {
        self.history_window_ms = ms;
    }

    pub fn set_force_math(&mut self, enabled: bool) {
        self.force_math = enabled;
    }

    pub fn set_indent(&mut self, indent: &str) {
        self.indent = indent.to_string();
    }

    /// Whether `env` is configured as a tabular environment.
    pub fn is_tabular(&self, env: &str) -> bool {
        self.tabular_environments.iter().any(|e| e == env)
    }

    /// Add a tabular environment (no-op if present).
    pub fn add_tabular_environment(&mut self, env: &str) {
        if !self.is_tabular(env) {
            self.tabular_environments.push(env.to_string());
        }
    }

    pub fn remove_tabular_environment(&mut self, env: &str) -> bool {
        let before = self.tabular_environments.len();
        self.tabular_environments.retain(|e| e != env);
        before != self.tabular_environments.len()
    }

    pub fn is_closing_delimiter(&self, ch: char) -> bool {
        self.closing_delimiters.contains(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg = Config::from_toml_str("force_math = true\nindent = \"\\t\"\n").unwrap();
        assert!(cfg.force_math);
        assert_eq!(cfg.indent, "\t");
        assert_eq!(cfg.history_window_ms, 1000);
        assert_eq!(cfg.column_separator, " & ");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut cfg = Config::default();
        cfg.set_history_window_ms(250);
        cfg.add_tabular_environment("tabular");
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), cfg);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("texflow.toml");
        let mut cfg = Config::default();
        cfg.set_force_math(true);
        cfg.save_toml(&path).unwrap();
        assert_eq!(Config::load_toml(&path).unwrap(), cfg);
        assert!(matches!(
            Config::load_toml(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_tabular_environment_setters() {
        let mut cfg = Config::default();
        assert!(cfg.is_tabular("pmatrix"));
        assert!(cfg.remove_tabular_environment("pmatrix"));
        assert!(!cfg.remove_tabular_environment("pmatrix"));
        cfg.add_tabular_environment("pmatrix");
        cfg.add_tabular_environment("pmatrix");
        assert_eq!(cfg.tabular_environments.iter().filter(|e| *e == "pmatrix").count(), 1);
        assert!(cfg.is_closing_delimiter('$'));
    }
}
