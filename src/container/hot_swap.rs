//! Atomic reconfiguration.
//!
//! A hot-swap waits until every context attached through
//! [`context_with_container`](crate::context_with_container) has been
//! cancelled, blocks new attachments, then applies all changes under the
//! write lock. A context therefore observes either the old or the new
//! configuration, never a mix.

use super::{Container, ContainerInner, State};
use crate::dependency::Dependency;
use crate::descriptors::Service;
use crate::DiResult;

/// Mutable view of the container during [`Container::hot_swap`].
pub struct HotSwap<'a> {
    state: &'a mut State,
    inner: &'a ContainerInner,
}

impl HotSwap<'_> {
    /// Replaces a service recipe and evicts its shared instance.
    pub fn override_service(&mut self, id: impl Into<String>, service: Service) {
        let id = id.into();
        self.state.set_service(&id, service);
        self.inner.shared.delete(&id);
    }

    /// Replaces a parameter and flushes the parameter cache.
    ///
    /// # Panics
    ///
    /// Panics unless `dep` is a value, a provider or another parameter.
    pub fn override_param(&mut self, id: impl Into<String>, dep: Dependency) {
        self.state.set_param(&id.into(), dep);
        self.inner.params_cache.clear();
    }

    /// Evicts shared instances so they are rebuilt on next access.
    pub fn invalidate_services_cache<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for id in ids {
            self.inner.shared.delete(id.as_ref());
        }
    }

    pub fn invalidate_all_services_cache(&mut self) {
        self.inner.shared.clear();
    }
}

impl Container {
    /// Applies `f` once no attached context is in flight.
    ///
    /// Blocks until all contexts attached to this container are cancelled.
    /// Changes made by `f` are kept even when it returns an error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_container::{Dependency, ServiceCollection};
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_param("region", Dependency::value(String::from("eu")));
    /// let container = services.build();
    ///
    /// container
    ///     .hot_swap(|swap| {
    ///         swap.override_param("region", Dependency::value(String::from("us")));
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// assert_eq!(container.get_param_as::<String>("region").unwrap().as_str(), "us");
    /// ```
    pub fn hot_swap<F>(&self, f: F) -> DiResult<()>
    where
        F: FnOnce(&mut HotSwap<'_>) -> DiResult<()>,
    {
        let _registration = self.inner.context_locker.lock();
        tracing::debug!(contexts = self.inner.group.len(), "hot swap: draining contexts");
        self.inner.group.wait();

        let mut state = self.inner.state.write();
        let result = f(&mut HotSwap {
            state: &mut *state,
            inner: &self.inner,
        });
        state.invalidate();
        state.warm();

        match &result {
            Ok(()) => tracing::debug!("hot swap applied"),
            Err(err) => tracing::warn!(error = %err, "hot swap callback failed"),
        }
        result
    }
}
