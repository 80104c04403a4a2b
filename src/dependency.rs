//! Dependency descriptors.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::provider::{Object, Provider};

/// Describes one input of a service, decorator or parameter.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::Dependency;
///
/// let deps = vec![
///     Dependency::value(8080u16),
///     Dependency::service("db"),
///     Dependency::param("dsn"),
///     Dependency::tag("handler"),
///     Dependency::provider(|| String::from("computed")),
///     Dependency::Container,
///     Dependency::Context,
/// ];
/// assert_eq!(deps[1].kind(), "service");
/// ```
#[derive(Clone)]
pub enum Dependency {
    /// A literal value
    Value(Object),
    /// Another service, by id
    Service(String),
    /// A parameter, by id
    Param(String),
    /// Every service carrying the tag, highest priority first
    Tag(String),
    /// Invoked with no arguments on every resolution
    Provider(Provider),
    /// The owning container
    Container,
    /// The context associated with the current resolution
    Context,
}

impl Dependency {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Dependency::Value(Arc::new(value))
    }

    /// Uses an already shared object as a literal.
    pub fn object(object: Object) -> Self {
        Dependency::Value(object)
    }

    pub fn service(id: impl Into<String>) -> Self {
        Dependency::Service(id.into())
    }

    pub fn param(id: impl Into<String>) -> Self {
        Dependency::Param(id.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Dependency::Tag(tag.into())
    }

    pub fn provider<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Dependency::Provider(Provider::from_fn(f))
    }

    pub fn fallible_provider<T, E, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        Dependency::Provider(Provider::fallible(move |_: &crate::provider::Args| f()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Dependency::Value(_) => "value",
            Dependency::Service(_) => "service",
            Dependency::Param(_) => "param",
            Dependency::Tag(_) => "tag",
            Dependency::Provider(_) => "provider",
            Dependency::Container => "container",
            Dependency::Context => "context",
        }
    }

    /// Parameters may only be values, providers or other parameters.
    pub(crate) fn is_valid_param(&self) -> bool {
        matches!(
            self,
            Dependency::Value(_) | Dependency::Provider(_) | Dependency::Param(_)
        )
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Value(_) => f.write_str("Value(..)"),
            Dependency::Service(id) => write!(f, "Service({:?})", id),
            Dependency::Param(id) => write!(f, "Param({:?})", id),
            Dependency::Tag(tag) => write!(f, "Tag({:?})", tag),
            Dependency::Provider(_) => f.write_str("Provider(..)"),
            Dependency::Container => f.write_str("Container"),
            Dependency::Context => f.write_str("Context"),
        }
    }
}

/// Panics unless `dep` may back a parameter.
pub(crate) fn assert_valid_param(id: &str, dep: &Dependency) {
    if !dep.is_valid_param() {
        panic!(
            "param {:?}: dependency of kind {} is not allowed, expected value, provider or param",
            id,
            dep.kind()
        );
    }
}
