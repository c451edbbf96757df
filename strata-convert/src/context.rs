//! Per-call conversion metadata.

use crate::TypeKey;

/// Metadata for a single conversion attempt.
///
/// Built fresh for every typed lookup. Converters record the input formats they
/// understand so that a failed conversion can tell the caller what would have
/// worked.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    key: String,
    target: TypeKey,
    property_sources: Vec<String>,
    supported_formats: Vec<String>,
}

impl ConversionContext {
    /// Creates a context for converting the value of `key` into `target`.
    #[must_use]
    pub fn new(key: impl Into<String>, target: TypeKey) -> Self {
        Self {
            key: key.into(),
            target,
            property_sources: Vec::new(),
            supported_formats: Vec::new(),
        }
    }

    /// Records the names of the property sources, highest precedence first.
    #[must_use]
    pub fn with_property_sources<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property_sources = names.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the key being converted.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the requested target type.
    #[must_use]
    pub const fn target(&self) -> TypeKey {
        self.target
    }

    /// Returns the property source names, highest precedence first.
    #[must_use]
    pub fn property_sources(&self) -> &[String] {
        &self.property_sources
    }

    /// Returns every format recorded so far, each tagged with its converter.
    #[must_use]
    pub fn supported_formats(&self) -> &[String] {
        &self.supported_formats
    }

    /// Records formats understood by `converter`. Duplicates are ignored.
    pub fn add_supported_formats<I, S>(&mut self, converter: &str, formats: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for format in formats {
            let entry = format!("{} ({converter})", format.as_ref());
            if !self.supported_formats.contains(&entry) {
                self.supported_formats.push(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_are_tagged_and_deduplicated() {
        let mut ctx = ConversionContext::new("a", TypeKey::of::<bool>())
            .with_property_sources(["env", "defaults"]);
        ctx.add_supported_formats("bool", ["yes", "no"]);
        ctx.add_supported_formats("bool", ["yes"]);

        assert_eq!(ctx.supported_formats(), ["yes (bool)", "no (bool)"]);
        assert_eq!(ctx.property_sources(), ["env", "defaults"]);
        assert_eq!(ctx.key(), "a");
    }
}
