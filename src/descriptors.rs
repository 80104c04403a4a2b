//! Service descriptors: the recipes the container builds services from.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::dependency::Dependency;
use crate::error::BoxError;
use crate::provider::{into_instance, Args, FromObject, Instance, Object, Provider};
use crate::scope::Scope;
use crate::{DiError, DiResult};

type BaseFn = dyn Fn() -> Instance + Send + Sync;
type FieldFn = dyn Fn(&mut Instance, &Object) -> DiResult<()> + Send + Sync;
type SetterFn = dyn Fn(&mut Instance, &Args) -> DiResult<()> + Send + Sync;
type WitherFn = dyn Fn(Instance, &Args) -> DiResult<Instance> + Send + Sync;

/// How a call on the service is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Mutates the service in place; failures are accumulated
    Setter,
    /// Returns the new service; the first failure stops the build
    Wither,
}

#[derive(Clone)]
pub(crate) struct Field {
    pub(crate) name: String,
    pub(crate) dep: Dependency,
    pub(crate) assign: Arc<FieldFn>,
}

#[derive(Clone)]
pub(crate) enum Invoker {
    Setter(Arc<SetterFn>),
    Wither(Arc<WitherFn>),
}

#[derive(Clone)]
pub(crate) struct Call {
    pub(crate) method: String,
    pub(crate) deps: Vec<Dependency>,
    pub(crate) invoker: Invoker,
}

impl Call {
    pub(crate) fn kind(&self) -> CallKind {
        match self.invoker {
            Invoker::Setter(_) => CallKind::Setter,
            Invoker::Wither(_) => CallKind::Wither,
        }
    }
}

/// Recipe for building a service.
///
/// A service starts either from a constructor ([`Provider`] plus its
/// dependencies) or from a static value that is cloned for every build.
/// The constructor wins when both are set; with neither the build starts
/// from `()`. Fields are then assigned, calls applied and decorators run,
/// in that order.
///
/// Field setters, setters and withers are typed closures. They receive the
/// service being built downcast to the type they declare, and fail with a
/// type mismatch when an earlier step produced something else.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Args, DiError, Dependency, Provider, Service, ServiceCollection};
/// use std::sync::Arc;
///
/// #[derive(Clone, Default)]
/// struct Person {
///     name: String,
///     age: u8,
/// }
///
/// let person = Service::with_constructor(Provider::new(|_: &Args| Person::default()), vec![])
///     .set_field("name", Dependency::value(String::from("Johnny")), |p: &mut Person, name: Arc<String>| {
///         p.name = (*name).clone();
///     })
///     .append_call("set_age", vec![Dependency::value(42u8)], |p: &mut Person, args: &Args| -> Result<(), DiError> {
///         p.age = args.value::<u8>(0)?;
///         Ok(())
///     })
///     .set_tag("person", 0)
///     .shared();
///
/// let mut services = ServiceCollection::new();
/// services.add_service("johnny", person);
/// let container = services.build();
///
/// let johnny = container.get_as::<Person>("johnny").unwrap();
/// assert_eq!(johnny.name, "Johnny");
/// assert_eq!(johnny.age, 42);
/// ```
#[derive(Clone, Default)]
pub struct Service {
    base: Option<Arc<BaseFn>>,
    constructor: Option<(Provider, Vec<Dependency>)>,
    fields: Vec<Field>,
    calls: Vec<Call>,
    tags: BTreeMap<String, i32>,
    scope: Scope,
}

impl Service {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service built from clones of `value`.
    pub fn with_value<T: Any + Send + Sync + Clone>(value: T) -> Self {
        Self::new().set_value(value)
    }

    /// Creates a service built by `constructor` from the resolved `deps`.
    pub fn with_constructor(constructor: Provider, deps: Vec<Dependency>) -> Self {
        Self::new().set_constructor(constructor, deps)
    }

    pub fn set_value<T: Any + Send + Sync + Clone>(mut self, value: T) -> Self {
        self.base = Some(Arc::new(move || into_instance(value.clone())));
        self
    }

    pub fn set_constructor(mut self, constructor: Provider, deps: Vec<Dependency>) -> Self {
        self.constructor = Some((constructor, deps));
        self
    }

    /// Assigns the resolved `dep` to a field of the service.
    ///
    /// Setting the same field name again replaces the earlier entry in
    /// place, so the field keeps its original position.
    pub fn set_field<T, V, F>(mut self, name: impl Into<String>, dep: Dependency, assign: F) -> Self
    where
        T: Any,
        V: FromObject,
        F: Fn(&mut T, V) + Send + Sync + 'static,
    {
        let name = name.into();
        let assign: Arc<FieldFn> = Arc::new(move |instance: &mut Instance, object: &Object| {
            let value = V::from_object(object)?;
            let target = instance
                .downcast_mut::<T>()
                .ok_or(DiError::TypeMismatch(type_name::<T>()))?;
            assign(target, value);
            Ok(())
        });
        let field = Field {
            name: name.clone(),
            dep,
            assign,
        };
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    /// Appends a call that mutates the service in place.
    pub fn append_call<T, E, F>(mut self, method: impl Into<String>, deps: Vec<Dependency>, call: F) -> Self
    where
        T: Any,
        E: Into<BoxError>,
        F: Fn(&mut T, &Args) -> Result<(), E> + Send + Sync + 'static,
    {
        let invoke: Arc<SetterFn> = Arc::new(move |instance: &mut Instance, args: &Args| {
            let target = instance
                .downcast_mut::<T>()
                .ok_or(DiError::TypeMismatch(type_name::<T>()))?;
            call(target, args).map_err(|e| DiError::from_boxed(e.into()))
        });
        self.calls.push(Call {
            method: method.into(),
            deps,
            invoker: Invoker::Setter(invoke),
        });
        self
    }

    /// Appends a call whose return value replaces the service.
    pub fn append_wither<T, U, E, F>(mut self, method: impl Into<String>, deps: Vec<Dependency>, wither: F) -> Self
    where
        T: Any,
        U: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(T, &Args) -> Result<U, E> + Send + Sync + 'static,
    {
        let invoke: Arc<WitherFn> = Arc::new(move |instance: Instance, args: &Args| {
            let receiver = instance
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(type_name::<T>()))?;
            wither(*receiver, args)
                .map(into_instance)
                .map_err(|e| DiError::from_boxed(e.into()))
        });
        self.calls.push(Call {
            method: method.into(),
            deps,
            invoker: Invoker::Wither(invoke),
        });
        self
    }

    /// Tags the service. Higher priorities come first in tag resolution.
    pub fn set_tag(mut self, tag: impl Into<String>, priority: i32) -> Self {
        self.tags.insert(tag.into(), priority);
        self
    }

    pub fn set_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn shared(self) -> Self {
        self.set_scope(Scope::Shared)
    }

    pub fn contextual(self) -> Self {
        self.set_scope(Scope::Contextual)
    }

    pub fn non_shared(self) -> Self {
        self.set_scope(Scope::NonShared)
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn tags(&self) -> &BTreeMap<String, i32> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Field names in assignment order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Method names and kinds in call order.
    pub fn call_names(&self) -> Vec<(&str, CallKind)> {
        self.calls.iter().map(|c| (c.method.as_str(), c.kind())).collect()
    }

    pub(crate) fn constructor(&self) -> Option<&(Provider, Vec<Dependency>)> {
        self.constructor.as_ref()
    }

    pub(crate) fn base_instance(&self) -> Instance {
        match &self.base {
            Some(base) => base(),
            None => Box::new(()),
        }
    }

    pub(crate) fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub(crate) fn calls(&self) -> &[Call] {
        &self.calls
    }

    /// Every dependency of the recipe, in build order.
    pub(crate) fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.constructor
            .iter()
            .flat_map(|(_, deps)| deps.iter())
            .chain(self.fields.iter().map(|f| &f.dep))
            .chain(self.calls.iter().flat_map(|c| c.deps.iter()))
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("has_value", &self.base.is_some())
            .field("has_constructor", &self.constructor.is_some())
            .field("fields", &self.field_names())
            .field("calls", &self.call_names())
            .field("tags", &self.tags)
            .field("scope", &self.scope)
            .finish()
    }
}
