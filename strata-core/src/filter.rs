//! Filters applied to resolved values.

use std::collections::BTreeSet;

use strata_primitives::PropertyValue;

use crate::ConfigResult;

/// Describes the lookup a filter runs in.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    key: &'a str,
    single_lookup: bool,
}

impl<'a> FilterContext<'a> {
    /// Context for a single-key lookup.
    #[must_use]
    pub const fn single(key: &'a str) -> Self {
        Self {
            key,
            single_lookup: true,
        }
    }

    /// Context for one entry of a bulk [`properties`](crate::Configuration::properties) call.
    #[must_use]
    pub const fn bulk(key: &'a str) -> Self {
        Self {
            key,
            single_lookup: false,
        }
    }

    /// Returns the key being filtered.
    #[must_use]
    pub const fn key(&self) -> &'a str {
        self.key
    }

    /// Whether the filter runs for a single-key lookup.
    #[must_use]
    pub const fn is_single_lookup(&self) -> bool {
        self.single_lookup
    }
}

/// Transforms or vetoes resolved values.
///
/// Filters run in registration order. `Ok(None)` vetoes the value; an error is
/// logged and the value passes through unchanged.
pub trait PropertyFilter: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Filters a single value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Filter`](crate::ConfigError::Filter) when the
    /// filter cannot process the value.
    fn filter(&self, value: &PropertyValue, ctx: &FilterContext<'_>) -> ConfigResult<Option<PropertyValue>>;
}

/// Replaces the values of sensitive keys with a fixed mask.
///
/// A key is sensitive when it contains one of the configured fragments,
/// ignoring case.
#[derive(Debug, Clone)]
pub struct MaskingFilter {
    fragments: BTreeSet<String>,
    mask: String,
}

impl MaskingFilter {
    /// Mask applied unless another is configured.
    pub const DEFAULT_MASK: &'static str = "*****";

    /// Creates a filter masking keys that contain any of `fragments`.
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(|f| f.as_ref().trim().to_ascii_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
            mask: Self::DEFAULT_MASK.to_owned(),
        }
    }

    /// Replaces the mask.
    #[must_use]
    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }

    /// Whether `key` is masked by this filter.
    #[must_use]
    pub fn is_sensitive(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        self.fragments.iter().any(|fragment| key.contains(fragment.as_str()))
    }
}

impl Default for MaskingFilter {
    fn default() -> Self {
        Self::new(["password", "secret"])
    }
}

impl PropertyFilter for MaskingFilter {
    fn name(&self) -> &str {
        "masking"
    }

    fn filter(&self, value: &PropertyValue, ctx: &FilterContext<'_>) -> ConfigResult<Option<PropertyValue>> {
        if self.is_sensitive(ctx.key()) {
            Ok(Some(value.with_value(self.mask.as_str())))
        } else {
            Ok(Some(value.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_sensitive_keys_only() {
        let filter = MaskingFilter::default().with_mask("<hidden>");
        let secret = PropertyValue::new("db.Password", "hunter2", "env");
        let masked = filter
            .filter(&secret, &FilterContext::single(secret.key()))
            .unwrap()
            .unwrap();
        assert_eq!(masked.value(), "<hidden>");
        assert_eq!(masked.source(), "env");

        let plain = PropertyValue::new("db.url", "jdbc://", "env");
        let kept = filter
            .filter(&plain, &FilterContext::bulk(plain.key()))
            .unwrap()
            .unwrap();
        assert_eq!(kept, plain);
    }

    #[test]
    fn blank_fragments_are_ignored() {
        let filter = MaskingFilter::new(["", "  "]);
        assert!(!filter.is_sensitive("anything"));
    }
}
