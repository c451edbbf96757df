use std::sync::Arc;

use strata::config::{Configuration, ConfigurationContext};
use strata::convert::{
    ConversionContext, ConvertResult, ConverterOrigin, ConverterPlugin, ConverterRegistry,
    TypeDescriptor, TypeKey, factory_method,
};
use strata::primitives::{MapPropertySource, SharedSource};

#[derive(Debug, PartialEq)]
struct C(String);

#[derive(Debug, PartialEq)]
struct B(C);

#[derive(Debug, PartialEq)]
struct A(B);

trait Readable: Send {
    fn read(&self) -> &str;
}

trait Runnable: Send {
    fn run(&self) -> String;
}

trait AutoCloseable: Send {
    fn close(&self) -> &str;
}

impl Readable for C {
    fn read(&self) -> &str {
        &self.0
    }
}

impl Runnable for C {
    fn run(&self) -> String {
        format!("ran {}", self.0)
    }
}

impl AutoCloseable for C {
    fn close(&self) -> &str {
        &self.0
    }
}

fn convert_c(raw: &str, _ctx: &mut ConversionContext) -> ConvertResult<Option<C>> {
    Ok(Some(C(raw.to_owned())))
}

fn register_hierarchy(registry: &ConverterRegistry) {
    registry.declare_type(
        TypeDescriptor::<C>::new()
            .superclass(B)
            .interface(|c: C| Box::new(c) as Box<dyn Readable>)
            .interface(|c: C| Box::new(c) as Box<dyn Runnable>)
            .interface(|c: C| Box::new(c) as Box<dyn AutoCloseable>),
    );
    registry.declare_type(TypeDescriptor::<B>::new().superclass(A));
    registry.register_fn::<C, _>("c", convert_c);
}

strata::convert::inventory::submit! {
    ConverterPlugin::new("tests.hierarchy", register_hierarchy)
}

fn convert<T: 'static>(registry: &ConverterRegistry, raw: &str) -> Vec<T> {
    registry
        .converters::<T>()
        .iter()
        .filter_map(|handle| {
            let mut ctx = ConversionContext::new("key", TypeKey::of::<T>());
            handle.convert(raw, &mut ctx).ok().flatten()
        })
        .collect()
}

#[test]
fn subtype_converter_serves_every_supertype() {
    let registry = ConverterRegistry::with_discovered();

    let direct = convert::<C>(&registry, "input");
    assert_eq!(direct, vec![C("input".into())]);

    let b = convert::<B>(&registry, "input");
    assert_eq!(b, vec![B(C("input".into()))]);

    let a = convert::<A>(&registry, "input");
    assert_eq!(a, vec![A(B(C("input".into())))]);

    let readable = convert::<Box<dyn Readable>>(&registry, "input");
    assert_eq!(readable.len(), 1);
    assert_eq!(readable[0].read(), "input");

    let runnable = convert::<Box<dyn Runnable>>(&registry, "input");
    assert_eq!(runnable.len(), 1);
    assert_eq!(runnable[0].run(), "ran input");

    let closeable = convert::<Box<dyn AutoCloseable>>(&registry, "input");
    assert_eq!(closeable.len(), 1);
    assert_eq!(closeable[0].close(), "input");
}

#[test]
fn derived_converters_report_their_origin() {
    let registry = ConverterRegistry::with_discovered();
    let origins: Vec<_> = registry
        .converters::<A>()
        .iter()
        .map(|handle| handle.origin())
        .collect();
    assert_eq!(origins.len(), 1);
    assert_ne!(origins[0], ConverterOrigin::Direct);
}

#[test]
fn discovery_is_applied_once_per_registry() {
    let registry = ConverterRegistry::new();
    assert!(registry.converters::<B>().is_empty());
    assert!(!registry.is_target_type_supported(TypeKey::of::<B>()));

    assert!(registry.add_discovered_converters() > 0);
    assert_eq!(registry.converters::<B>().len(), 1);

    assert_eq!(registry.add_discovered_converters(), 0);
    assert_eq!(registry.converters::<B>().len(), 1);
}

#[derive(Debug, PartialEq)]
struct MyType(String);

impl MyType {
    fn of(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            return Err("empty".into());
        }
        Ok(Self(raw.to_owned()))
    }
}

factory_method!(MyType, Of, MyType::of);

fn configuration(entries: &[(&str, &str)]) -> Configuration {
    let source: SharedSource = Arc::new(MapPropertySource::new("test", entries.iter().copied()));
    ConfigurationContext::builder()
        .with_shared_source(source)
        .build()
        .into()
}

#[test]
fn factory_method_converts_without_registration() {
    let config = configuration(&[("my", "hello")]);
    assert_eq!(
        config.get_as::<MyType>("my").unwrap(),
        Some(MyType("hello".into()))
    );
    assert_eq!(config.get_as::<MyType>("missing").unwrap(), None);
}

#[test]
fn factory_method_failure_is_a_conversion_error() {
    let config = configuration(&[("my", "")]);
    let err = config.get_as::<MyType>("my").unwrap_err();
    assert!(err.to_string().contains("of(String)"), "{err}");
}

#[test]
fn booleans_accept_every_documented_spelling() {
    let config = configuration(&[
        ("yes", "YES"),
        ("y", "y"),
        ("true", "True"),
        ("t", "T"),
        ("no", "no"),
        ("n", "N"),
        ("false", "FALSE"),
        ("f", "f"),
        ("padded", "  yes  "),
        ("garbage", "maybe"),
    ]);

    for key in ["yes", "y", "true", "t", "padded"] {
        assert_eq!(config.get_as::<bool>(key).unwrap(), Some(true), "{key}");
    }
    for key in ["no", "n", "false", "f"] {
        assert_eq!(config.get_as::<bool>(key).unwrap(), Some(false), "{key}");
    }
    assert!(config.get_as::<bool>("garbage").is_err());
    assert_eq!(config.get_as::<bool>("unknown").unwrap(), None);
}
