//! Service collection module for dependency injection.
//!
//! A [`ServiceCollection`] gathers service recipes, parameters, decorators
//! and observers, then freezes them into a [`Container`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ParamSource;
use crate::container::{Container, State};
use crate::decoration::{Decorator, DecoratorEntry};
use crate::dependency::{assert_valid_param, Dependency};
use crate::descriptors::Service;
use crate::observer::{DiObserver, Observers};

/// Registration-time builder for a [`Container`].
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Args, Dependency, Provider, Service, ServiceCollection};
///
/// struct Mailer {
///     host: String,
///     retries: u32,
/// }
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_param("smtp_host", Dependency::value(String::from("mail.local")))
///     .add_service(
///         "mailer",
///         Service::with_constructor(
///             Provider::new(|args: &Args| Mailer {
///                 host: args.value::<String>(0).unwrap(),
///                 retries: 0,
///             }),
///             vec![Dependency::param("smtp_host")],
///         )
///         .set_field("retries", Dependency::value(3u32), |m: &mut Mailer, n: std::sync::Arc<u32>| m.retries = *n),
///     );
///
/// let container = services.build();
/// let mailer = container.get_as::<Mailer>("mailer").unwrap();
/// assert_eq!(mailer.host, "mail.local");
/// assert_eq!(mailer.retries, 3);
/// ```
#[derive(Default)]
pub struct ServiceCollection {
    services: HashMap<String, Service>,
    params: HashMap<String, Dependency>,
    decorators: Vec<DecoratorEntry>,
    observers: Observers,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Services -----

    /// Registers a service recipe, replacing any earlier one with the same id.
    pub fn add_service(&mut self, id: impl Into<String>, service: Service) -> &mut Self {
        self.services.insert(id.into(), service);
        self
    }

    pub fn has_service(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    // ----- Parameters -----

    /// Registers a parameter.
    ///
    /// # Panics
    ///
    /// Panics unless `dep` is a value, a provider or another parameter.
    pub fn add_param(&mut self, id: impl Into<String>, dep: Dependency) -> &mut Self {
        let id = id.into();
        assert_valid_param(&id, &dep);
        self.params.insert(id, dep);
        self
    }

    /// Registers every key of `source` as a value parameter.
    pub fn add_params_from(&mut self, source: &dyn ParamSource) -> &mut Self {
        for key in source.keys() {
            if let Some(value) = source.get(&key) {
                self.params.insert(key, Dependency::object(value.into_object()));
            }
        }
        self
    }

    pub fn has_param(&self, id: &str) -> bool {
        self.params.contains_key(id)
    }

    // ----- Decorators -----

    /// Registers a decorator for every service carrying `tag`.
    ///
    /// Decorators run in registration order.
    pub fn add_decorator(&mut self, tag: impl Into<String>, decorator: Decorator, deps: Vec<Dependency>) -> &mut Self {
        self.decorators.push(DecoratorEntry {
            tag: tag.into(),
            decorator,
            deps,
        });
        self
    }

    // ----- Diagnostics -----

    /// Adds an observer notified of every build and parameter resolution.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Freezes the registrations into a container.
    pub fn build(self) -> Container {
        tracing::debug!(
            services = self.services.len(),
            params = self.params.len(),
            decorators = self.decorators.len(),
            "building container"
        );
        Container::from_state(State::new(self.services, self.params, self.decorators, self.observers))
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.services.keys().collect();
        ids.sort();
        f.debug_struct("ServiceCollection")
            .field("services", &ids)
            .field("params", &self.params.len())
            .field("decorators", &self.decorators.len())
            .finish()
    }
}
