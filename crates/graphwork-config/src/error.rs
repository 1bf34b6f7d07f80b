//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Missing or empty required field.
    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Client secret not found through any resolution method.
    #[error("client secret not found for [{section}]. Set {env_var} or client_secret in the config file")]
    SecretNotFound { section: String, env_var: String },

    /// A field is present but unusable.
    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn missing(field: &str, context: &str) -> Self {
        ConfigError::MissingField {
            field: field.to_string(),
            context: context.to_string(),
        }
    }
}
