//! Cascaded configuration lookup.
//!
//! Every module is configured through three layers of key/value pairs:
//! the module's own entry, the project-wide `global` mapping and the
//! user's `_base.yaml`. Lookups probe the layers in that order and the
//! first layer *containing* the key wins, even when the stored value is
//! falsy (empty string, `0`, null) - later layers are not consulted.

use anyhow::{bail, Result};
use serde_yaml::{Mapping, Value};

/// Read-only, three-layer view of one module's configuration.
///
/// A fresh instance is created per module per run; there is no mutation
/// API.
#[derive(Debug, Clone)]
pub struct CascadedConfig {
    module: Mapping,
    global: Mapping,
    base: Mapping,
}

impl CascadedConfig {
    /// Create a cascade from the module entry, the project `global`
    /// mapping and the base config mapping.
    pub fn new(module: Mapping, global: Mapping, base: Mapping) -> Self {
        CascadedConfig {
            module,
            global,
            base,
        }
    }

    /// Look up `key`, probing module, then global, then base.
    pub fn get(&self, key: &str) -> Option<&Value> {
        [&self.module, &self.global, &self.base]
            .into_iter()
            .find_map(|layer| layer.get(key))
    }

    /// Like [`get`](Self::get), but only accepts scalar values.
    ///
    /// Strings are returned as-is, numbers and booleans render to their
    /// string form, and an explicit null reads as the empty string (so a
    /// bare `build:` key disables the phase like `build: ""` does).
    /// Sequences and mappings are an error: callers use this where a
    /// string is structurally required, e.g. the module name.
    pub fn flat_get(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => match flat_value(value) {
                Some(s) => Ok(Some(s)),
                None => bail!(
                    "config key `{}` must be a scalar, found a {}",
                    key,
                    value_kind(value)
                ),
            },
        }
    }
}

/// Render a scalar YAML value to a string; `None` for containers.
pub(crate) fn flat_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
