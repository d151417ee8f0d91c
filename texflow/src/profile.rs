//! User profile persisted through a `KeyValueStore`.
//!
//! A profile is the user's rule document, keybindings and engine config.
//! Absent keys fall back to the built-in defaults; present but malformed
//! values are reported and never replaced silently.

use std::collections::HashMap;

use texflow_core::store::{CONFIG_KEY, KEYBINDINGS_KEY, MACROS_SOURCE_KEY};
use texflow_core::{parse_rules, Config, KeyValueStore, Keymap, KeymapError, Rule, RuleSourceError, StoreError};
use thiserror::Error;

use crate::rules::DEFAULT_RULES_SOURCE;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored rules: {0}")]
    Rules(#[from] RuleSourceError),
    #[error("stored keybindings: {0}")]
    Keymap(#[from] KeymapError),
    #[error("stored config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("cannot serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

pub struct Profile<S> {
    store: S,
    variables: HashMap<String, String>,
}

impl<S: KeyValueStore> Profile<S> {
    /// `variables` are in scope for every rule document loaded or saved.
    pub fn new(store: S, variables: HashMap<String, String>) -> Self {
        Self { store, variables }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The stored rule document, or the built-in one.
    pub fn rules_source(&self) -> Result<String, ProfileError> {
        Ok(self
            .store
            .get(MACROS_SOURCE_KEY)?
            .unwrap_or_else(|| DEFAULT_RULES_SOURCE.to_string()))
    }

    pub fn has_custom_rules(&self) -> Result<bool, ProfileError> {
        Ok(self.store.get(MACROS_SOURCE_KEY)?.is_some())
    }

    pub fn load_rules(&self) -> Result<Vec<Rule>, ProfileError> {
        let source = self.rules_source()?;
        Ok(parse_rules(&source, &self.variables)?)
    }

    /// Validate and store a rule document. Nothing is written when it fails
    /// to parse. Returns the number of rules.
    pub fn save_rules_source(&self, source: &str) -> Result<usize, ProfileError> {
        let rules = parse_rules(source, &self.variables)?;
        self.store.set(MACROS_SOURCE_KEY, source)?;
        tracing::debug!(count = rules.len(), "saved rule source");
        Ok(rules.len())
    }

    /// Forget the stored rules so the built-in table applies again.
    pub fn reset_rules(&self) -> Result<bool, ProfileError> {
        Ok(self.store.remove(MACROS_SOURCE_KEY)?)
    }

    pub fn load_keymap(&self) -> Result<Keymap, ProfileError> {
        match self.store.get(KEYBINDINGS_KEY)? {
            Some(json) => Ok(Keymap::from_json(&json)?),
            None => Ok(Keymap::default()),
        }
    }

    pub fn save_keymap(&self, keymap: &Keymap) -> Result<(), ProfileError> {
        self.store.set(KEYBINDINGS_KEY, &keymap.to_json()?)?;
        Ok(())
    }

    pub fn reset_keymap(&self) -> Result<bool, ProfileError> {
        Ok(self.store.remove(KEYBINDINGS_KEY)?)
    }

    /// Stored engine config, or `fallback` when none was saved.
    pub fn load_config(&self, fallback: Config) -> Result<Config, ProfileError> {
        match self.store.get(CONFIG_KEY)? {
            Some(text) => Ok(Config::from_toml_str(&text)?),
            None => Ok(fallback),
        }
    }

    pub fn save_config(&self, config: &Config) -> Result<(), ProfileError> {
        self.store.set(CONFIG_KEY, &config.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_variables;
    use texflow_core::{EditorAction, MemoryStore};

    fn profile() -> Profile<MemoryStore> {
        Profile::new(MemoryStore::new(), default_variables())
    }

    #[test]
    fn test_empty_store_uses_defaults() {
        let p = profile();
        assert!(!p.has_custom_rules().unwrap());
        assert_eq!(p.load_rules().unwrap().len(), crate::rules::default_rules().len());
        assert_eq!(p.load_keymap().unwrap(), Keymap::default());
        assert_eq!(p.load_config(Config::default()).unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_rules_are_not_stored() {
        let p = profile();
        let err = p.save_rules_source("[[rule]]\ntrigger = 'a'\n").unwrap_err();
        assert!(matches!(err, ProfileError::Rules(RuleSourceError::Shape { index: 1, .. })));
        assert!(!p.has_custom_rules().unwrap());

        assert_eq!(
            p.save_rules_source("[[rule]]\ntrigger = 'a'\nreplacement = 'b'\n").unwrap(),
            1
        );
        assert_eq!(p.load_rules().unwrap().len(), 1);
        assert!(p.reset_rules().unwrap());
        assert!(!p.has_custom_rules().unwrap());
    }

    #[test]
    fn test_malformed_keybindings_are_reported() {
        let p = profile();
        p.store().set(KEYBINDINGS_KEY, "not json").unwrap();
        assert!(matches!(p.load_keymap(), Err(ProfileError::Keymap(_))));

        let mut keymap = Keymap::empty();
        keymap.bind("Ctrl+Space", EditorAction::NextTabstop).unwrap();
        p.save_keymap(&keymap).unwrap();
        assert_eq!(p.load_keymap().unwrap(), keymap);
        assert!(p.reset_keymap().unwrap());
        assert_eq!(p.load_keymap().unwrap(), Keymap::default());
    }
}
