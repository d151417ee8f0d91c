//! Built-in LaTeX rule table.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use texflow_core::{parse_rules, Rule, RuleSourceError};

/// The default rule document shipped with the crate.
pub const DEFAULT_RULES_SOURCE: &str = include_str!("default_rules.toml");

pub const GREEK: &str = "alpha|beta|gamma|Gamma|delta|Delta|epsilon|varepsilon|zeta|eta|theta|Theta|vartheta|iota|kappa|lambda|Lambda|mu|nu|xi|Xi|pi|Pi|rho|varrho|sigma|Sigma|tau|upsilon|Upsilon|phi|Phi|varphi|chi|psi|Psi|omega|Omega";

pub const SYMBOL: &str = "infty|nabla|partial|dots|cdot|times|leftrightarrow|mapsto|setminus|mid|cap|cup|land|lor|subseteq|subset|implies|impliedby|iff|exists|forall|equiv|cong|simeq|approx|sim|propto|le|ge";

pub const MORE_SYMBOLS: &str = "int|sum|prod|lim";

/// Variables available to every rule document as `${NAME}`.
pub static DEFAULT_VARIABLES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [("GREEK", GREEK), ("SYMBOL", SYMBOL), ("MORE_SYMBOLS", MORE_SYMBOLS)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
});

pub fn default_variables() -> HashMap<String, String> {
    DEFAULT_VARIABLES.clone()
}

/// Parse a user rule document with the built-in variables in scope.
pub fn parse_with_defaults(source: &str) -> Result<Vec<Rule>, RuleSourceError> {
    parse_rules(source, &DEFAULT_VARIABLES)
}

/// The built-in rules. A broken table is logged and yields no rules.
pub fn default_rules() -> Vec<Rule> {
    match parse_with_defaults(DEFAULT_RULES_SOURCE) {
        Ok(rules) => rules,
        Err(err) => {
            tracing::warn!(%err, "default rule table failed to parse");
            Vec::new()
        }
    }
}
