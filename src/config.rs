//! Configuration for decoration behaviour.
//!
//! Settings come from a [`ConfigSource`]: the process environment, an
//! in-memory map, or (with the `config` feature) a JSON document. Keys are
//! lowercase; the environment source maps `after_order` to
//! `DECORATIONS_AFTER_ORDER`.
//!
//! | key           | values                          | default  |
//! |---------------|---------------------------------|----------|
//! | `disabled`    | `1/true/yes/on`, `0/false/no/off` | `false`  |
//! | `after_order` | `unwind`, `declared`            | `unwind` |
//! | `strict`      | boolean                         | `false`  |

use std::collections::HashMap;
use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::chain::AfterOrder;
use crate::error::{DecorationError, DecorationResult};

/// Prefix used by [`DecorationsConfig::from_env`].
pub const ENV_PREFIX: &str = "DECORATIONS";

/// A source of raw configuration values.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Raw value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;

    /// All keys this source knows about.
    fn keys(&self) -> Vec<String>;
}

/// Reads `PREFIX_KEY` environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentConfigSource {
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn env_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(self.env_key(key)).ok()
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// In-memory source, handy for tests and embedded defaults.
///
/// ```rust
/// use decorations::{AfterOrder, DecorationsConfig, MapConfigSource};
///
/// let source = MapConfigSource::new()
///     .with("after_order", "declared")
///     .with("strict", "yes");
/// let config = DecorationsConfig::from_source(&source).unwrap();
///
/// assert_eq!(config.after_order, AfterOrder::Declared);
/// assert!(config.strict);
/// assert!(!config.disabled);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    values: HashMap<String, String>,
}

impl MapConfigSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into().to_lowercase(), value.into());
        self
    }
}

impl ConfigSource for MapConfigSource {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(&key.to_lowercase()).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

/// Decoration settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct DecorationsConfig {
    /// Start with the process-wide switch off
    pub disabled: bool,
    /// Placement of hook-style after hooks
    pub after_order: AfterOrder,
    /// Reject hook-style decorators that register no hooks
    pub strict: bool,
}

impl DecorationsConfig {
    /// Reads `DECORATIONS_*` environment variables.
    pub fn from_env() -> DecorationResult<Self> {
        Self::from_source(&EnvironmentConfigSource::with_prefix(ENV_PREFIX))
    }

    /// Reads settings from `source`; missing keys keep their defaults.
    pub fn from_source(source: &dyn ConfigSource) -> DecorationResult<Self> {
        let mut config = Self::default();
        if let Some(value) = source.get("disabled") {
            config.disabled = parse_bool("disabled", &value)?;
        }
        if let Some(value) = source.get("after_order") {
            config.after_order = value.parse()?;
        }
        if let Some(value) = source.get("strict") {
            config.strict = parse_bool("strict", &value)?;
        }
        tracing::debug!(
            target: "decorations",
            disabled = config.disabled,
            after_order = %config.after_order,
            strict = config.strict,
            "loaded decoration config"
        );
        Ok(config)
    }

    /// Parses a JSON document such as `{"after_order": "declared"}`.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DecorationResult<Self> {
        serde_json::from_str(json).map_err(|err| DecorationError::Config {
            key: "json".to_string(),
            value: err.to_string(),
        })
    }

    /// Applies the process-wide part of this config (the disable switch).
    pub fn apply(&self) {
        crate::switch::set_disabled(self.disabled);
    }
}

fn parse_bool(key: &str, value: &str) -> DecorationResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(DecorationError::Config {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
