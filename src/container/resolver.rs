//! The build pipeline: scope dispatch, caching, fields, calls, decorators.

use std::sync::Arc;
use std::time::Instant;

use super::{param_prefix, service_prefix, tag_prefix, Container, State, Warm};
use crate::context::Context;
use crate::decoration::DecoratorPayload;
use crate::dependency::Dependency;
use crate::descriptors::{Invoker, Service};
use crate::internal::SafeMap;
use crate::provider::{into_object, Args, Instance, Object};
use crate::{DiError, DiResult, Key, Scope};

/// Cache for contextual services plus the context it lives in.
pub(crate) struct Bag {
    pub(crate) cache: Arc<SafeMap>,
    pub(crate) ctx: Context,
}

impl Bag {
    pub(crate) fn new(cache: Arc<SafeMap>, ctx: Context) -> Self {
        Self { cache, ctx }
    }

    /// A bag scoped to a single call, under the background context.
    pub(crate) fn detached() -> Self {
        Self::new(Arc::new(SafeMap::new()), Context::background())
    }
}

/// One resolution pass over a consistent container state.
pub(crate) struct Resolution<'a> {
    pub(crate) container: &'a Container,
    pub(crate) state: &'a State,
    pub(crate) warm: &'a Warm,
    pub(crate) bag: &'a Bag,
}

impl Resolution<'_> {
    pub(crate) fn get(&self, id: &str) -> DiResult<Object> {
        if let Some(err) = self.warm.service_cycles(id) {
            return Err(err);
        }
        let service = self.state.services.get(id).ok_or(DiError::ServiceNotFound)?;

        match self.warm.resolve_scope(id) {
            Scope::NonShared => self.build_observed(id, service).map(into_object),
            Scope::Contextual => {
                if let Some(cause) = self.bag.ctx.cause() {
                    return Err(DiError::ContextDone(cause));
                }
                self.cached(id, service, &self.bag.cache)
            }
            Scope::Shared | Scope::Default => self.cached(id, service, &self.container.inner.shared),
        }
    }

    pub(crate) fn get_tagged_by(&self, tag: &str) -> DiResult<Vec<Object>> {
        self.warm
            .tagged(tag)
            .iter()
            .map(|id| self.get(id).map_err(|e| e.prefix(service_prefix(id))))
            .collect()
    }

    /// Builds under the per-service lock, storing the result on success.
    fn cached(&self, id: &str, service: &Service, cache: &SafeMap) -> DiResult<Object> {
        let lock = self.state.service_lock(id);
        let _guard = lock.as_ref().map(|l| l.lock());

        if let Some(object) = cache.get(id) {
            return Ok(object);
        }
        let object = into_object(self.build_observed(id, service)?);
        cache.set(id, object.clone());
        Ok(object)
    }

    fn build_observed(&self, id: &str, service: &Service) -> DiResult<Instance> {
        let result = self.observed(Key::service(id), || self.build(id, service));
        if let Err(err) = &result {
            tracing::debug!(service = id, error = %err, "service build failed");
        }
        result
    }

    /// Runs `f`, reporting it to the registered observers.
    pub(crate) fn observed<T>(&self, key: Key, f: impl FnOnce() -> DiResult<T>) -> DiResult<T> {
        let observers = &self.state.observers;
        if !observers.has_observers() {
            return f();
        }
        observers.resolving(&key);
        let started = Instant::now();
        let result = f();
        match &result {
            Ok(_) => observers.resolved(&key, started.elapsed()),
            Err(err) => observers.failed(&key, err),
        }
        result
    }

    fn build(&self, id: &str, service: &Service) -> DiResult<Instance> {
        let mut instance = match service.constructor() {
            Some((constructor, deps)) => {
                let args = self.resolve_deps(deps).map_err(|e| e.prefix("constructor args: "))?;
                constructor.call(&args).map_err(|e| e.prefix("constructor: "))?
            }
            None => service.base_instance(),
        };

        let mut errors = Vec::new();
        for field in service.fields() {
            if field.name == "_" {
                errors.push(DiError::msg("blank field name is not allowed").prefix("set field \"_\": "));
                continue;
            }
            let value = match self.resolve_dep(&field.dep) {
                Ok(value) => value,
                Err(err) => {
                    errors.push(err.prefix(format!("field value {:?}: ", field.name)));
                    continue;
                }
            };
            if let Err(err) = (field.assign)(&mut instance, &value) {
                errors.push(err.prefix(format!("set field {:?}: ", field.name)));
            }
        }
        if let Some(err) = DiError::group(errors) {
            return Err(err);
        }

        let mut errors = Vec::new();
        for call in service.calls() {
            let args = match self.resolve_deps(&call.deps) {
                Ok(args) => args,
                Err(err) => {
                    errors.push(err.prefix(format!("resolve args {:?}: ", call.method)));
                    if matches!(call.invoker, Invoker::Wither(_)) {
                        return Err(DiError::Group(errors));
                    }
                    continue;
                }
            };
            match &call.invoker {
                Invoker::Setter(setter) => {
                    if let Err(err) = setter(&mut instance, &args) {
                        errors.push(err.prefix(format!("call {:?}: ", call.method)));
                    }
                }
                Invoker::Wither(wither) => match wither(instance, &args) {
                    Ok(next) => instance = next,
                    Err(err) => {
                        errors.push(err.prefix(format!("wither {:?}: ", call.method)));
                        return Err(DiError::Group(errors));
                    }
                },
            }
        }
        if let Some(err) = DiError::group(errors) {
            return Err(err);
        }

        self.decorate(id, service, instance)
    }

    fn decorate(&self, id: &str, service: &Service, mut instance: Instance) -> DiResult<Instance> {
        for (index, entry) in self.state.decorators.iter().enumerate() {
            if !service.has_tag(&entry.tag) {
                continue;
            }
            let args = self
                .resolve_deps(&entry.deps)
                .map_err(|e| e.prefix(format!("resolve decorator args #{}: ", index)))?;
            let payload = DecoratorPayload {
                tag: entry.tag.clone(),
                service_id: id.to_string(),
                service: instance,
            };
            instance = entry
                .decorator
                .call(payload, &args)
                .map_err(|e| e.prefix(format!("decorator #{}: ", index)))?;
        }
        Ok(instance)
    }

    /// Resolves every dependency, reporting all failures at once.
    fn resolve_deps(&self, deps: &[Dependency]) -> DiResult<Args> {
        let mut values = Vec::with_capacity(deps.len());
        let mut errors = Vec::new();
        for (index, dep) in deps.iter().enumerate() {
            match self.resolve_dep(dep) {
                Ok(value) => values.push(value),
                Err(err) => errors.push(err.prefix(format!("arg #{}: ", index))),
            }
        }
        match DiError::group(errors) {
            Some(err) => Err(err),
            None => Ok(Args::new(values)),
        }
    }

    pub(crate) fn resolve_dep(&self, dep: &Dependency) -> DiResult<Object> {
        match dep {
            Dependency::Value(value) => Ok(value.clone()),
            Dependency::Service(id) => self.get(id).map_err(|e| e.prefix(service_prefix(id))),
            Dependency::Param(id) => self.get_param(id).map_err(|e| e.prefix(param_prefix(id))),
            Dependency::Tag(tag) => self
                .get_tagged_by(tag)
                .map(|list| Arc::new(list) as Object)
                .map_err(|e| e.prefix(tag_prefix(tag))),
            Dependency::Provider(provider) => provider.call(&Args::empty()).map(into_object),
            Dependency::Container => Ok(Arc::new(self.container.clone())),
            Dependency::Context => Ok(Arc::new(self.bag.ctx.clone())),
        }
    }
}
