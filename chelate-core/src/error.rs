use std::fmt;

use crate::registry::RegistryError;

/// A value that was neither primitive, a registered type, a plain record
/// nor a native sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Location in the graph, e.g. `$.owner.callbacks[2]`.
    pub path: String,
    /// What was found there.
    pub description: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} is not a serializable object and will not be recorded",
            self.description, self.path
        )
    }
}

/// Error type for serialization.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("type registry failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Unserializable(Diagnostic),
    #[error("nesting deeper than {limit} at {path}")]
    DepthLimit { limit: usize, path: String },
}

/// Error type for loading a [`SerializerConfig`](crate::SerializerConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
