//! Error types for configuration access.

use thiserror::Error;

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced to callers of the configuration API.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No converter could turn the value of a key into the requested type.
    #[error(
        "cannot convert value `{value}` of key `{key}` to `{target}`; supported formats: [{}]",
        supported_formats.join(", ")
    )]
    Conversion {
        /// Key whose value was converted.
        key: String,
        /// Raw value after filtering.
        value: String,
        /// Requested target type.
        target: String,
        /// Every format announced by the converters that were tried.
        supported_formats: Vec<String>,
    },

    /// Several implementations share the highest priority for a singleton lookup.
    #[error("ambiguous `{capability}` services at priority {priority}: {}", candidates.join(", "))]
    AmbiguousService {
        /// Requested capability type.
        capability: String,
        /// Priority shared by the candidates.
        priority: i32,
        /// Names of the tied implementations.
        candidates: Vec<String>,
    },

    /// A filter rejected its input.
    #[error("filter `{filter}` failed for key `{key}`: {reason}")]
    Filter {
        /// Name of the filter.
        filter: String,
        /// Key being filtered.
        key: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The configuration is wired inconsistently.
    #[error("illegal configuration: {reason}")]
    IllegalConfiguration {
        /// Human-readable reason.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an [`IllegalConfiguration`](Self::IllegalConfiguration) error.
    #[must_use]
    pub fn illegal(reason: impl Into<String>) -> Self {
        Self::IllegalConfiguration {
            reason: reason.into(),
        }
    }

    /// Creates a [`Filter`](Self::Filter) error.
    #[must_use]
    pub fn filter(filter: impl Into<String>, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Filter {
            filter: filter.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_message_lists_formats() {
        let err = ConfigError::Conversion {
            key: "flag".into(),
            value: "maybe".into(),
            target: "bool".into(),
            supported_formats: vec!["yes (bool)".into(), "no (bool)".into()],
        };
        assert_eq!(
            err.to_string(),
            "cannot convert value `maybe` of key `flag` to `bool`; supported formats: [yes (bool), no (bool)]"
        );
    }
}
