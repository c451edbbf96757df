//! Converters for primitive types, shipped as the `strata.builtin` plugin.

use std::path::PathBuf;

use tracing::trace;

use crate::{ConversionContext, ConvertResult, Converter, ConverterRegistry};

const BOOL_FORMATS: [&str; 8] = [
    "yes (ignore case)",
    "y (ignore case)",
    "true (ignore case)",
    "t (ignore case)",
    "no (ignore case)",
    "n (ignore case)",
    "false (ignore case)",
    "f (ignore case)",
];

const INTEGER_FORMATS: [&str; 6] = [
    "<decimal>",
    "0x<hex>",
    "0X<hex>",
    "#<hex>",
    "0<octal>",
    "MIN_VALUE / MAX_VALUE (ignore case)",
];

const FLOAT_FORMATS: [&str; 5] = [
    "<decimal or scientific>",
    "NaN (ignore case)",
    "POSITIVE_INFINITY / NEGATIVE_INFINITY (ignore case)",
    "MIN_VALUE / MAX_VALUE (ignore case)",
    "MIN_POSITIVE (ignore case)",
];

macro_rules! register_integer {
    ($registry:expr, $($ty:ty),+) => {
        $(
            $registry.register_fn::<$ty, _>(
                stringify!($ty),
                |raw: &str, ctx: &mut ConversionContext| -> ConvertResult<Option<$ty>> {
                    ctx.add_supported_formats(stringify!($ty), INTEGER_FORMATS);
                    let trimmed = raw.trim();
                    if trimmed.eq_ignore_ascii_case("min_value") {
                        return Ok(Some(<$ty>::MIN));
                    }
                    if trimmed.eq_ignore_ascii_case("max_value") {
                        return Ok(Some(<$ty>::MAX));
                    }
                    let (sign, digits, radix) = split_radix(trimmed);
                    if digits.is_empty() || digits.starts_with(['+', '-']) {
                        return Ok(None);
                    }
                    Ok(<$ty>::from_str_radix(&format!("{sign}{digits}"), radix).ok())
                },
            );
        )+
    };
}

macro_rules! register_float {
    ($registry:expr, $($ty:ident),+) => {
        $(
            $registry.register_fn::<$ty, _>(
                stringify!($ty),
                |raw: &str, ctx: &mut ConversionContext| -> ConvertResult<Option<$ty>> {
                    ctx.add_supported_formats(stringify!($ty), FLOAT_FORMATS);
                    let trimmed = raw.trim();
                    let special = match trimmed.to_ascii_lowercase().as_str() {
                        "nan" => Some($ty::NAN),
                        "positive_infinity" => Some($ty::INFINITY),
                        "negative_infinity" => Some($ty::NEG_INFINITY),
                        "min_value" => Some($ty::MIN),
                        "max_value" => Some($ty::MAX),
                        "min_positive" => Some($ty::MIN_POSITIVE),
                        _ => None,
                    };
                    Ok(special.or_else(|| trimmed.parse::<$ty>().ok()))
                },
            );
        )+
    };
}

/// Registers converters for `bool`, all integer and float primitives, `char`
/// and [`PathBuf`].
pub fn register_builtin_converters(registry: &ConverterRegistry) {
    registry.register_fn("bool", convert_bool);

    register_integer!(registry, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
    register_float!(registry, f32, f64);

    registry.register_fn("char", convert_char);
    registry.register_fn("path", |raw, ctx| {
        ctx.add_supported_formats("path", ["<any non-empty path>"]);
        let trimmed = raw.trim();
        Ok((!trimmed.is_empty()).then(|| PathBuf::from(trimmed)))
    });
}

#[allow(clippy::unnecessary_wraps)]
fn convert_bool(raw: &str, ctx: &mut ConversionContext) -> ConvertResult<Option<bool>> {
    ctx.add_supported_formats("bool", BOOL_FORMATS);
    let value = match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "t" => Some(true),
        "no" | "n" | "false" | "f" => Some(false),
        _ => {
            trace!(value = raw, "unknown boolean value");
            None
        }
    };
    Ok(value)
}

#[allow(clippy::unnecessary_wraps)]
fn convert_char(raw: &str, ctx: &mut ConversionContext) -> ConvertResult<Option<char>> {
    ctx.add_supported_formats("char", ["<single character>", "'<single character>'"]);
    let single = |s: &str| {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    };
    if let Some(c) = single(raw) {
        return Ok(Some(c));
    }
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(trimmed);
    Ok(single(unquoted))
}

/// Splits an integer literal into sign, digits and radix.
fn split_radix(raw: &str) -> (&'static str, &str, u32) {
    let (sign, rest) = match raw.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", raw.strip_prefix('+').unwrap_or(raw)),
    };
    if let Some(hex) = rest
        .strip_prefix("0x")
        .or_else(|| rest.strip_prefix("0X"))
        .or_else(|| rest.strip_prefix('#'))
    {
        (sign, hex, 16)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (sign, &rest[1..], 8)
    } else {
        (sign, rest, 10)
    }
}


/// Maps a fixed table of names to values, ignoring case and surrounding whitespace.
///
/// ```
/// use strata_convert::{ConversionContext, Converter, EnumConverter, TypeKey};
///
/// #[derive(Clone, Debug, PartialEq)]
/// enum Mode {
///     Fast,
///     Safe,
/// }
///
/// let converter = EnumConverter::new([("FAST", Mode::Fast), ("SAFE", Mode::Safe)]);
/// let mut ctx = ConversionContext::new("mode", TypeKey::of::<Mode>());
/// assert_eq!(converter.convert(" safe ", &mut ctx).unwrap(), Some(Mode::Safe));
/// assert_eq!(converter.convert("slow", &mut ctx).unwrap(), None);
/// ```
#[derive(Debug, Clone)]
pub struct EnumConverter<T> {
    variants: Vec<(&'static str, T)>,
}

impl<T> EnumConverter<T> {
    /// Creates a converter from `(name, value)` pairs.
    #[must_use]
    pub fn new<I>(variants: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, T)>,
    {
        Self {
            variants: variants.into_iter().collect(),
        }
    }
}

impl<T> Converter<T> for EnumConverter<T>
where
    T: Clone + Send + Sync,
{
    fn convert(&self, value: &str, ctx: &mut ConversionContext) -> ConvertResult<Option<T>> {
        let target = ctx.target().short_name();
        ctx.add_supported_formats(target, self.variants.iter().map(|(name, _)| *name));
        let trimmed = value.trim();
        Ok(self
            .variants
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(trimmed))
            .map(|(_, variant)| variant.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeKey;

    fn convert<T: 'static>(registry: &ConverterRegistry, raw: &str) -> Option<T> {
        let mut ctx = ConversionContext::new("test", TypeKey::of::<T>());
        registry
            .converters::<T>()
            .iter()
            .find_map(|handle| handle.convert(raw, &mut ctx).ok().flatten())
    }

    fn registry() -> ConverterRegistry {
        let registry = ConverterRegistry::new();
        register_builtin_converters(&registry);
        registry
    }

    #[test]
    fn booleans_accept_documented_spellings() {
        let registry = registry();
        for raw in ["yes", "Y", " TRUE ", "t"] {
            assert_eq!(convert::<bool>(&registry, raw), Some(true), "{raw}");
        }
        for raw in ["no", "N", "False", " f"] {
            assert_eq!(convert::<bool>(&registry, raw), Some(false), "{raw}");
        }
        assert_eq!(convert::<bool>(&registry, "maybe"), None);
    }

    #[test]
    fn integers_accept_hex_octal_and_bounds() {
        let registry = registry();
        assert_eq!(convert::<i32>(&registry, " 101 "), Some(101));
        assert_eq!(convert::<i32>(&registry, "0x2F"), Some(47));
        assert_eq!(convert::<i32>(&registry, "0X3F"), Some(63));
        assert_eq!(convert::<i32>(&registry, "#ff"), Some(255));
        assert_eq!(convert::<i32>(&registry, "-0x10"), Some(-16));
        assert_eq!(convert::<i32>(&registry, "010"), Some(8));
        assert_eq!(convert::<i64>(&registry, "max_value"), Some(i64::MAX));
        assert_eq!(convert::<u8>(&registry, "MIN_VALUE"), Some(0));
        assert_eq!(convert::<u8>(&registry, "256"), None);
        assert_eq!(convert::<u8>(&registry, "-1"), None);
        assert_eq!(convert::<i32>(&registry, "--1"), None);
        assert_eq!(convert::<i32>(&registry, "0"), Some(0));
    }

    #[test]
    fn floats_accept_named_constants() {
        let registry = registry();
        assert_eq!(convert::<f64>(&registry, "1.5e3"), Some(1500.0));
        assert!(convert::<f64>(&registry, "nan").is_some_and(f64::is_nan));
        assert_eq!(convert::<f32>(&registry, "POSITIVE_INFINITY"), Some(f32::INFINITY));
        assert_eq!(convert::<f64>(&registry, "MIN_POSITIVE"), Some(f64::MIN_POSITIVE));
        assert_eq!(convert::<f64>(&registry, "one"), None);
    }

    #[test]
    fn chars_accept_plain_and_quoted() {
        let registry = registry();
        assert_eq!(convert::<char>(&registry, " "), Some(' '));
        assert_eq!(convert::<char>(&registry, "'x'"), Some('x'));
        assert_eq!(convert::<char>(&registry, " y "), Some('y'));
        assert_eq!(convert::<char>(&registry, "xy"), None);
    }

    #[test]
    fn paths_reject_blank_input() {
        let registry = registry();
        assert_eq!(convert::<PathBuf>(&registry, "/etc/app"), Some(PathBuf::from("/etc/app")));
        assert_eq!(convert::<PathBuf>(&registry, "  "), None);
    }

    #[test]
    fn failed_conversion_records_formats() {
        let registry = registry();
        let mut ctx = ConversionContext::new("flag", TypeKey::of::<bool>());
        for handle in registry.converters::<bool>() {
            assert!(handle.convert("maybe", &mut ctx).unwrap().is_none());
        }
        assert_eq!(ctx.supported_formats().len(), BOOL_FORMATS.len());
        assert!(ctx.supported_formats()[0].ends_with("(bool)"));
    }
}
