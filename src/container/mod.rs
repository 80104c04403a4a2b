//! The container: registered recipes, caches and the public resolution API.
//!
//! All reads take the global state lock in shared (recursive) mode, so
//! providers may call back into the container while it is building.
//! Overrides, decorator registration and hot-swaps take it exclusively
//! and invalidate the warmed-up graph, which the next read rebuilds.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::config::ParamSource;
use crate::context::{Context, ContextKey};
use crate::decoration::{Decorator, DecoratorEntry};
use crate::dependency::{assert_valid_param, Dependency};
use crate::descriptors::Service;
use crate::internal::{GroupContext, SafeMap};
use crate::observer::{DiObserver, Observers};
use crate::provider::{FromObject, Object};
use crate::{DiError, DiResult};

mod hot_swap;
mod params;
mod resolver;
mod warmup;

pub use hot_swap::HotSwap;
pub(crate) use resolver::{Bag, Resolution};
pub(crate) use warmup::Warm;

pub(crate) fn service_prefix(id: &str) -> String {
    format!("Container.get({:?}): ", id)
}

pub(crate) fn param_prefix(id: &str) -> String {
    format!("getParam({:?}): ", id)
}

pub(crate) fn tag_prefix(tag: &str) -> String {
    format!("Container.getTaggedBy({:?}): ", tag)
}

/// Registered recipes plus everything derived from them.
pub(crate) struct State {
    pub(crate) services: HashMap<String, Service>,
    pub(crate) params: HashMap<String, Dependency>,
    pub(crate) decorators: Vec<DecoratorEntry>,
    pub(crate) observers: Observers,
    service_locks: HashMap<String, Arc<Mutex<()>>>,
    param_locks: HashMap<String, Arc<Mutex<()>>>,
    warm: OnceCell<Warm>,
}

impl State {
    pub(crate) fn new(
        services: HashMap<String, Service>,
        params: HashMap<String, Dependency>,
        decorators: Vec<DecoratorEntry>,
        observers: Observers,
    ) -> Self {
        let mut state = Self {
            services: HashMap::new(),
            params: HashMap::new(),
            decorators,
            observers,
            service_locks: HashMap::new(),
            param_locks: HashMap::new(),
            warm: OnceCell::new(),
        };
        for (id, service) in services {
            state.set_service(&id, service);
        }
        for (id, dep) in params {
            state.set_param(&id, dep);
        }
        state
    }

    /// The warmed-up graph, built on first use after an invalidation.
    pub(crate) fn warm(&self) -> &Warm {
        self.warm.get_or_init(|| Warm::build(self))
    }

    pub(crate) fn invalidate(&mut self) {
        self.warm = OnceCell::new();
    }

    pub(crate) fn service_lock(&self, id: &str) -> Option<Arc<Mutex<()>>> {
        self.service_locks.get(id).cloned()
    }

    pub(crate) fn param_lock(&self, id: &str) -> Option<Arc<Mutex<()>>> {
        self.param_locks.get(id).cloned()
    }

    pub(crate) fn set_service(&mut self, id: &str, service: Service) {
        if service.scope().is_cached() {
            self.service_locks.entry(id.to_string()).or_default();
        } else {
            self.service_locks.remove(id);
        }
        self.services.insert(id.to_string(), service);
        self.invalidate();
    }

    pub(crate) fn set_param(&mut self, id: &str, dep: Dependency) {
        assert_valid_param(id, &dep);
        self.param_locks.entry(id.to_string()).or_default();
        self.params.insert(id.to_string(), dep);
        self.invalidate();
    }

    pub(crate) fn add_decorator(&mut self, entry: DecoratorEntry) {
        self.decorators.push(entry);
        self.invalidate();
    }
}

pub(crate) struct ContainerInner {
    pub(crate) state: RwLock<State>,
    pub(crate) shared: SafeMap,
    pub(crate) params_cache: SafeMap,
    /// Held by hot-swaps and while attaching contexts
    pub(crate) context_locker: Mutex<()>,
    pub(crate) group: Arc<GroupContext>,
    pub(crate) key: ContextKey,
}

/// Runtime dependency injection container.
///
/// `Container` is a cheap handle; clones share the same registrations and
/// caches. Build one from a [`ServiceCollection`](crate::ServiceCollection).
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Args, Dependency, Provider, Service, ServiceCollection};
/// use std::sync::Arc;
///
/// struct Db {
///     dsn: String,
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_param("dsn", Dependency::value(String::from("postgres://localhost")));
/// services.add_service(
///     "db",
///     Service::with_constructor(
///         Provider::new(|args: &Args| Db { dsn: args.value::<String>(0).unwrap() }),
///         vec![Dependency::param("dsn")],
///     ),
/// );
/// let container = services.build();
///
/// let db = container.get_as::<Db>("db").unwrap();
/// assert_eq!(db.dsn, "postgres://localhost");
/// assert!(Arc::ptr_eq(&db, &container.get_as::<Db>("db").unwrap()));
///
/// let err = container.get("missing").unwrap_err();
/// assert_eq!(err.to_string(), "Container.get(\"missing\"): service does not exist");
/// ```
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::from_state(State::new(HashMap::new(), HashMap::new(), Vec::new(), Observers::new()))
    }

    pub(crate) fn from_state(state: State) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                state: RwLock::new(state),
                shared: SafeMap::new(),
                params_cache: SafeMap::new(),
                context_locker: Mutex::new(()),
                group: Arc::new(GroupContext::new()),
                key: ContextKey::unique(),
            }),
        }
    }

    /// Runs `f` against a consistent view of the container.
    pub(crate) fn with_resolution<R>(&self, bag: &Bag, f: impl FnOnce(&Resolution<'_>) -> R) -> R {
        let state = self.inner.state.read_recursive();
        let resolution = Resolution {
            container: self,
            state: &state,
            warm: state.warm(),
            bag,
        };
        f(&resolution)
    }

    // ----- Resolution -----

    /// Resolves a service in a fresh bag.
    ///
    /// Contextual services (and default services elevated to contextual)
    /// get one instance for the duration of this call.
    pub fn get(&self, id: &str) -> DiResult<Object> {
        let bag = Bag::detached();
        self.with_resolution(&bag, |r| r.get(id))
            .map_err(|e| e.prefix(service_prefix(id)))
    }

    /// Resolves a service and downcasts it.
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> DiResult<Arc<T>> {
        let object = self.get(id)?;
        Arc::<T>::from_object(&object).map_err(|e| e.prefix(service_prefix(id)))
    }

    /// Resolves a service in the bag attached to `ctx`.
    ///
    /// Fails when `ctx` was not derived from
    /// [`context_with_container`](crate::context_with_container) for this
    /// container, or when it has been cancelled.
    pub fn get_in_context(&self, ctx: &Context, id: &str) -> DiResult<Object> {
        self.context_bag(ctx)
            .and_then(|bag| self.with_resolution(&bag, |r| r.get(id)))
            .map_err(|e| e.prefix(service_prefix(id)))
    }

    pub fn get_in_context_as<T: Any + Send + Sync>(&self, ctx: &Context, id: &str) -> DiResult<Arc<T>> {
        let object = self.get_in_context(ctx, id)?;
        Arc::<T>::from_object(&object).map_err(|e| e.prefix(service_prefix(id)))
    }

    /// Resolves every service carrying `tag`, highest priority first and
    /// by id among equal priorities, in one fresh bag.
    pub fn get_tagged_by(&self, tag: &str) -> DiResult<Vec<Object>> {
        let bag = Bag::detached();
        self.with_resolution(&bag, |r| r.get_tagged_by(tag))
            .map_err(|e| e.prefix(tag_prefix(tag)))
    }

    pub fn get_tagged_by_as<T: Any + Send + Sync>(&self, tag: &str) -> DiResult<Vec<Arc<T>>> {
        self.get_tagged_by(tag)?
            .iter()
            .map(|object| Arc::<T>::from_object(object).map_err(|e| e.prefix(tag_prefix(tag))))
            .collect()
    }

    pub fn get_tagged_by_in_context(&self, ctx: &Context, tag: &str) -> DiResult<Vec<Object>> {
        self.context_bag(ctx)
            .and_then(|bag| self.with_resolution(&bag, |r| r.get_tagged_by(tag)))
            .map_err(|e| e.prefix(tag_prefix(tag)))
    }

    pub fn get_param(&self, id: &str) -> DiResult<Object> {
        let bag = Bag::detached();
        self.with_resolution(&bag, |r| r.get_param(id))
            .map_err(|e| e.prefix(param_prefix(id)))
    }

    pub fn get_param_as<T: Any + Send + Sync>(&self, id: &str) -> DiResult<Arc<T>> {
        let object = self.get_param(id)?;
        Arc::<T>::from_object(&object).map_err(|e| e.prefix(param_prefix(id)))
    }

    // ----- Introspection -----

    pub fn is_tagged_by(&self, id: &str, tag: &str) -> bool {
        let state = self.inner.state.read_recursive();
        state.services.get(id).map_or(false, |s| s.has_tag(tag))
    }

    pub fn has_service(&self, id: &str) -> bool {
        self.inner.state.read_recursive().services.contains_key(id)
    }

    pub fn has_param(&self, id: &str) -> bool {
        self.inner.state.read_recursive().params.contains_key(id)
    }

    /// Reports every dependency cycle, one per line.
    ///
    /// Lines are ordered by node sequence and stay the same between calls
    /// on an unchanged container.
    pub fn circular_deps(&self) -> DiResult<()> {
        let state = self.inner.state.read_recursive();
        let errors = state
            .warm()
            .cycles()
            .iter()
            .cloned()
            .map(DiError::Circular)
            .collect();
        match DiError::group(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ----- Reconfiguration -----

    /// Replaces the recipe of a service and evicts its shared instance.
    pub fn override_service(&self, id: impl Into<String>, service: Service) {
        let id = id.into();
        let mut state = self.inner.state.write();
        state.set_service(&id, service);
        self.inner.shared.delete(&id);
        tracing::trace!(service = %id, "service overridden");
    }

    /// Replaces a parameter.
    ///
    /// # Panics
    ///
    /// Panics unless `dep` is a value, a provider or another parameter.
    pub fn override_param(&self, id: impl Into<String>, dep: Dependency) {
        let id = id.into();
        assert_valid_param(&id, &dep);
        let mut state = self.inner.state.write();
        state.set_param(&id, dep);
        self.inner.params_cache.clear();
        tracing::trace!(param = %id, "param overridden");
    }

    /// Registers a decorator for every service carrying `tag`.
    pub fn add_decorator(&self, tag: impl Into<String>, decorator: Decorator, deps: Vec<Dependency>) {
        let tag = tag.into();
        let mut state = self.inner.state.write();
        let index = state.decorators.len();
        state.add_decorator(DecoratorEntry {
            tag: tag.clone(),
            decorator,
            deps,
        });
        tracing::trace!(tag = %tag, index, "decorator added");
    }

    pub fn add_observer(&self, observer: Arc<dyn DiObserver>) {
        self.inner.state.write().observers.add(observer);
    }

    /// Registers every key of `source` as a value parameter.
    ///
    /// Returns the number of parameters loaded.
    pub fn load_params(&self, source: &dyn ParamSource) -> usize {
        let values: Vec<(String, Object)> = source
            .keys()
            .into_iter()
            .filter_map(|key| source.get(&key).map(|value| (key, value.into_object())))
            .collect();
        let mut state = self.inner.state.write();
        for (key, value) in &values {
            state.set_param(key, Dependency::object(value.clone()));
        }
        self.inner.params_cache.clear();
        tracing::debug!(count = values.len(), "params loaded");
        values.len()
    }

    // ----- Contexts -----

    /// Attaches a fresh contextual bag to a context derived from `parent`.
    ///
    /// The returned context counts as in flight for [`hot_swap`](Self::hot_swap)
    /// until `parent` (or one of its ancestors) is cancelled.
    ///
    /// # Panics
    ///
    /// Panics if `parent` can never be cancelled, since hot-swaps would
    /// wait for it forever.
    pub fn attach(&self, parent: &Context) -> Context {
        if !parent.can_be_done() {
            panic!("context_with_container: parent context can never be done, derive it with Context::with_cancel");
        }
        let _registration = self.inner.context_locker.lock();
        let bag: Arc<dyn Any + Send + Sync> = Arc::new(SafeMap::new());
        let ctx = Context::with_value(parent, self.inner.key, bag);
        self.inner.group.add();
        let group = self.inner.group.clone();
        ctx.on_done(move |_| group.done());
        ctx
    }

    /// Number of attached contexts that are still running.
    pub fn active_contexts(&self) -> usize {
        self.inner.group.len()
    }

    pub(crate) fn context_bag(&self, ctx: &Context) -> DiResult<Bag> {
        if let Some(cause) = ctx.cause() {
            return Err(DiError::ContextDone(cause));
        }
        let cache = ctx
            .value(self.inner.key)
            .and_then(|value| value.downcast::<SafeMap>().ok())
            .ok_or(DiError::ContextNotAttached)?;
        Ok(Bag::new(cache, ctx.clone()))
    }
}

/// Attaches a fresh contextual bag of `container` to a context derived
/// from `parent`. See [`Container::attach`].
pub fn context_with_container(parent: &Context, container: &Container) -> Context {
    container.attach(parent)
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read_recursive();
        f.debug_struct("Container")
            .field("services", &state.services.len())
            .field("params", &state.params.len())
            .field("decorators", &state.decorators.len())
            .field("shared_cache", &self.inner.shared.len())
            .field("active_contexts", &self.inner.group.len())
            .finish()
    }
}
