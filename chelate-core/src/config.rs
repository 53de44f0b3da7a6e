use serde::Deserialize;

use crate::error::ConfigError;

/// What to do with a value that cannot be serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnserializablePolicy {
    /// Log a warning, record a diagnostic and emit `null`.
    #[default]
    Null,
    /// Abort the call with [`Error::Unserializable`](crate::Error::Unserializable).
    Error,
}

/// Serializer settings.
///
/// ```toml
/// on_unserializable = "error"
/// max_depth = 512
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerializerConfig {
    pub on_unserializable: UnserializablePolicy,
    /// Maximum object nesting depth. `None` means unbounded.
    pub max_depth: Option<usize>,
}

impl SerializerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Shorthand for a config that fails on unserializable values.
    pub fn strict() -> Self {
        SerializerConfig {
            on_unserializable: UnserializablePolicy::Error,
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fail_soft() {
        let config = SerializerConfig::default();
        assert_eq!(config.on_unserializable, UnserializablePolicy::Null);
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn parse_toml() {
        let config = SerializerConfig::from_toml("on_unserializable = \"error\"\nmax_depth = 8\n").unwrap();
        assert_eq!(config, SerializerConfig::strict().with_max_depth(8));
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(SerializerConfig::from_toml("").unwrap(), SerializerConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SerializerConfig::from_toml("strictness = 1").is_err());
    }
}
