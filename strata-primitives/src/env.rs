//! Property source over process environment variables.

use std::collections::HashMap;
use std::ffi::OsString;

use crate::{PropertySource, PropertyValue, Result};

/// Snapshot of the process environment taken at construction time.
#[derive(Debug, Clone)]
pub struct EnvironmentPropertySource {
    name: String,
    ordinal: i32,
    properties: HashMap<String, String>,
}

impl EnvironmentPropertySource {
    /// Ordinal of the environment source unless overridden.
    pub const DEFAULT_ORDINAL: i32 = 300;

    /// Name reported for provenance.
    pub const NAME: &'static str = "environment-properties";

    /// Captures the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    #[must_use]
    pub fn new() -> Self {
        Self::from_os_vars(std::env::vars_os())
    }

    /// Builds the source from platform strings, skipping pairs that are not
    /// valid UTF-8.
    #[must_use]
    pub fn from_os_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        Self::from_vars(
            vars.into_iter()
                .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?))),
        )
    }

    /// Builds the source from explicit variables.
    #[must_use]
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: Self::NAME.to_owned(),
            ordinal: Self::DEFAULT_ORDINAL,
            properties: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Keeps only variables starting with `prefix` and strips it from their names.
    #[must_use]
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.properties = self
            .properties
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| (rest.to_owned(), value))
            })
            .collect();
        self
    }

    /// Overrides the ordinal.
    #[must_use]
    pub fn with_ordinal(mut self, ordinal: i32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

impl Default for EnvironmentPropertySource {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertySource for EnvironmentPropertySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordinal(&self) -> i32 {
        self.ordinal
    }

    fn get(&self, key: &str) -> Result<Option<PropertyValue>> {
        Ok(self
            .properties
            .get(key)
            .map(|value| PropertyValue::new(key, value.as_str(), self.name.as_str())))
    }

    fn properties(&self) -> Result<HashMap<String, String>> {
        Ok(self.properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_stripped() {
        let source = EnvironmentPropertySource::from_vars([
            ("APP_port", "8080"),
            ("APP_", "empty"),
            ("HOME", "/root"),
        ])
        .with_prefix("APP_");

        let props = source.properties().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("port").map(String::as_str), Some("8080"));
    }

    #[test]
    fn default_ordinal_outranks_defaults() {
        let source = EnvironmentPropertySource::from_vars([("a", "1")]);
        assert_eq!(source.ordinal(), 300);
        assert_eq!(source.get("a").unwrap().unwrap().source(), EnvironmentPropertySource::NAME);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let source = EnvironmentPropertySource::from_os_vars([
            (OsString::from("GOOD"), OsString::from("1")),
            (OsString::from("BAD_VALUE"), OsString::from_vec(vec![0x66, 0xff, 0x6f])),
            (OsString::from_vec(vec![0x42, 0xff]), OsString::from("2")),
        ]);

        let props = source.properties().unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("GOOD").map(String::as_str), Some("1"));
        assert!(source.get("BAD_VALUE").unwrap().is_none());
    }

    #[test]
    fn process_environment_is_captured() {
        let source = EnvironmentPropertySource::new();
        assert_eq!(source.name(), EnvironmentPropertySource::NAME);
        assert!(source.properties().is_ok());
    }
}
