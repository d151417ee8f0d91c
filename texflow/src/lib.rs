//! texflow crate root
//!
//! LaTeX flavour of the `texflow-core` snippet engine: the built-in rule
//! table and its `${GREEK}` / `${SYMBOL}` variables, a layered config,
//! profile persistence and the pieces the interactive binary is built from.
//!
//! Public API exported here:
//! - `TexflowConfig` from `config`
//! - `default_rules`, `DEFAULT_RULES_SOURCE`, `DEFAULT_VARIABLES` from `rules`
//! - `Profile` from `profile`
//! - `Repl` from `repl`
//! - `SourceRenderer` from `preview`

pub mod config;
pub mod preview;
pub mod profile;
pub mod repl;
pub mod rules;
pub mod script;

// Re-export the engine types callers need alongside the LaTeX pieces.
pub use texflow_core::{
    Config, EditorAction, FieldRange, Key, KeyEvent, KeyResult, Keymap, KeyValueStore, MemoryStore,
    RedbStore, Rule, SnippetEngine,
};

pub use config::TexflowConfig;
pub use preview::SourceRenderer;
pub use profile::{Profile, ProfileError};
pub use repl::{Outcome, Repl};
pub use rules::{default_rules, default_variables, parse_with_defaults, DEFAULT_RULES_SOURCE, DEFAULT_VARIABLES};

/// Engine with the built-in rules and default keybindings.
pub fn latex_engine(config: Config) -> SnippetEngine {
    SnippetEngine::new(config, default_rules(), Keymap::default())
}
