//! Structured logging bootstrap.
//!
//! [`init_logging`] installs a `tracing-subscriber` formatter with an
//! `EnvFilter`. The settings come from a [`LoggingConfig`], which can itself be
//! read from a [`Configuration`](strata_core::Configuration).

#![warn(missing_docs, clippy::pedantic)]

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use strata_core::{ConfigResult, Configuration};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Key holding the default filter directive.
pub const LEVEL_KEY: &str = "strata.log.level";
/// Key controlling whether event targets are printed.
pub const TARGET_KEY: &str = "strata.log.target";
/// Key controlling ANSI colouring.
pub const ANSI_KEY: &str = "strata.log.ansi";

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    level: String,
    target: bool,
    ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            target: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Reads the settings from `config`, keeping defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Conversion`](strata_core::ConfigError::Conversion)
    /// when a present boolean key cannot be converted.
    pub fn from_configuration(config: &Configuration) -> ConfigResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            level: config.get_or_default(LEVEL_KEY, &defaults.level),
            target: config.get_as_or_default(TARGET_KEY, defaults.target)?,
            ansi: config.get_as_or_default(ANSI_KEY, defaults.ansi)?,
        })
    }

    /// Sets the default filter directive, e.g. `debug` or `strata_core=trace`.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Sets whether event targets are printed.
    #[must_use]
    pub fn with_target(mut self, target: bool) -> Self {
        self.target = target;
        self
    }

    /// Sets whether output is coloured.
    #[must_use]
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    /// Returns the default filter directive.
    #[must_use]
    pub fn level(&self) -> &str {
        &self.level
    }

    /// Whether event targets are printed.
    #[must_use]
    pub fn target(&self) -> bool {
        self.target
    }

    /// Whether output is coloured.
    #[must_use]
    pub fn ansi(&self) -> bool {
        self.ansi
    }

    /// Builds the filter: `RUST_LOG` when set, the configured level otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured level is not a valid directive.
    pub fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).with_context(|| format!("invalid log level `{}`", self.level))
    }
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
///
/// Returns an error when the level directive is invalid or a global subscriber
/// is already installed. Neither case panics.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = config.env_filter()?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.target)
        .with_ansi(config.ansi)
        .try_init()
        .map_err(|err| anyhow!("a global tracing subscriber is already installed: {err}"))?;
    debug!(level = %config.level, "logging initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use strata_core::ConfigurationContext;
    use strata_primitives::MapPropertySource;

    fn configuration(entries: &[(&str, &str)]) -> Configuration {
        ConfigurationContext::builder()
            .with_source(MapPropertySource::new("test", entries.iter().copied()))
            .build()
            .into()
    }

    #[test]
    fn reads_settings_from_configuration() {
        let config = configuration(&[(LEVEL_KEY, "debug"), (TARGET_KEY, "yes"), (ANSI_KEY, "false")]);
        let logging = LoggingConfig::from_configuration(&config).unwrap();
        assert_eq!(
            logging,
            LoggingConfig::default()
                .with_level("debug")
                .with_target(true)
                .with_ansi(false)
        );
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let logging = LoggingConfig::from_configuration(&configuration(&[])).unwrap();
        assert_eq!(logging, LoggingConfig::default());
    }

    #[test]
    fn invalid_boolean_is_reported() {
        let config = configuration(&[(ANSI_KEY, "sometimes")]);
        assert!(LoggingConfig::from_configuration(&config).is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let logging: LoggingConfig = serde_json::from_str(r#"{"level":"warn"}"#).unwrap();
        assert_eq!(logging.level(), "warn");
        assert!(logging.ansi());
        assert!(!logging.target());
    }

    #[test]
    fn second_init_reports_instead_of_panicking() {
        let config = LoggingConfig::default().with_ansi(false);
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
