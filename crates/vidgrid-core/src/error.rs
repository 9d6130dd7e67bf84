use thiserror::Error;

/// Configuration contract violations. These are the only errors rejected
/// synchronously by the engine; everything per-item is contained.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("environment variable {var} has an unusable value {value:?}")]
    Env { var: &'static str, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
