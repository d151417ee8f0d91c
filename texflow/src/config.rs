/// LaTeX front-end configuration that extends the engine `Config` from core.
///
/// This configuration includes:
/// - All engine options from `texflow_core::Config` (flattened via serde)
/// - Where to read the rule document and the persistent store from
/// - Extra `${NAME}` variables for rule documents
///
/// # Example
///
/// ```rust
/// use texflow::TexflowConfig;
///
/// let config = TexflowConfig::default();
/// let base_config = config.into_base();
/// // Use base_config with SnippetEngine::new()
/// ```
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use texflow_core::ConfigError;

use crate::rules::DEFAULT_VARIABLES;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TexflowConfig {
    /// Engine configuration (history window, pairs, tabular environments, ...)
    #[serde(flatten)]
    pub base: texflow_core::Config,

    /// Rule document replacing the built-in table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,

    /// redb file holding rules, keybindings and config between sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Extra snippet variables; override the built-in GREEK / SYMBOL tables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
}

impl TexflowConfig {
    /// Convert into the base config for use with `SnippetEngine::new()`
    pub fn into_base(self) -> texflow_core::Config {
        self.base
    }

    pub fn base(&self) -> &texflow_core::Config {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut texflow_core::Config {
        &mut self.base
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Built-in variables with the configured ones layered on top.
    pub fn snippet_variables(&self) -> HashMap<String, String> {
        let mut vars = DEFAULT_VARIABLES.clone();
        vars.extend(self.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}
