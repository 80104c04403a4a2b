//! Decorators applied to tagged services.
//!
//! A decorator is registered for a tag and runs, in registration order,
//! on every service carrying that tag once the service is otherwise fully
//! built. It receives a [`DecoratorPayload`] first and its own resolved
//! dependencies second, and returns the value that replaces the service.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::provider::{into_instance, Args, Instance};
use crate::{DiError, DiResult};

/// What a decorator receives about the service it decorates.
pub struct DecoratorPayload {
    /// The tag the decorator was registered for
    pub tag: String,
    /// Id of the service being decorated
    pub service_id: String,
    /// The service as built so far
    pub service: Instance,
}

impl DecoratorPayload {
    /// Takes the service out of the payload as `T`.
    pub fn take<T: Any>(self) -> DiResult<T> {
        self.service
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
    }
}

impl fmt::Debug for DecoratorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorPayload")
            .field("tag", &self.tag)
            .field("service_id", &self.service_id)
            .finish()
    }
}

type DecoratorFn = dyn Fn(DecoratorPayload, &Args) -> DiResult<Instance> + Send + Sync;

/// Function transforming a freshly built tagged service.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Args, Decorator, Service, ServiceCollection};
///
/// #[derive(Clone)]
/// struct Greeting(String);
///
/// let mut services = ServiceCollection::new();
/// services.add_service("hello", Service::with_value(Greeting("hello".into())).set_tag("loud", 0));
/// services.add_decorator(
///     "loud",
///     Decorator::map(|g: Greeting, _: &Args| Greeting(g.0.to_uppercase())),
///     vec![],
/// );
/// let container = services.build();
///
/// assert_eq!(container.get_as::<Greeting>("hello").unwrap().0, "HELLO");
/// ```
#[derive(Clone)]
pub struct Decorator {
    call: Arc<DecoratorFn>,
}

impl Decorator {
    /// Wraps a function of the payload and the decorator's dependencies.
    pub fn new<U, E, F>(f: F) -> Self
    where
        U: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(DecoratorPayload, &Args) -> Result<U, E> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(move |payload: DecoratorPayload, args: &Args| {
                f(payload, args)
                    .map(into_instance)
                    .map_err(|e| DiError::from_boxed(e.into()))
            }),
        }
    }

    /// Wraps an infallible transformation of the service value.
    pub fn map<T, U, F>(f: F) -> Self
    where
        T: Any,
        U: Any + Send + Sync,
        F: Fn(T, &Args) -> U + Send + Sync + 'static,
    {
        Self::new(move |payload: DecoratorPayload, args: &Args| {
            payload.take::<T>().map(|service| f(service, args))
        })
    }

    pub(crate) fn call(&self, payload: DecoratorPayload, args: &Args) -> DiResult<Instance> {
        (self.call)(payload, args)
    }
}

impl fmt::Debug for Decorator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Decorator")
    }
}

/// A decorator registered on a container.
#[derive(Clone, Debug)]
pub(crate) struct DecoratorEntry {
    pub(crate) tag: String,
    pub(crate) decorator: Decorator,
    pub(crate) deps: Vec<crate::Dependency>,
}
