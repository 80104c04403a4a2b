//! Parameter resolution.

use super::Resolution;
use crate::provider::Object;
use crate::{DiError, DiResult, Key};

impl Resolution<'_> {
    /// Resolves a parameter, caching the value container-wide.
    pub(crate) fn get_param(&self, id: &str) -> DiResult<Object> {
        let dep = self.state.params.get(id).ok_or(DiError::ParamNotFound)?;

        let lock = self.state.param_lock(id);
        let _guard = lock.as_ref().map(|l| l.lock());

        let cache = &self.container.inner.params_cache;
        if let Some(value) = cache.get(id) {
            return Ok(value);
        }
        if let Some(err) = self.warm.param_cycles(id) {
            return Err(err);
        }

        let value = self.observed(Key::param(id), || self.resolve_dep(dep))?;
        cache.set(id, value.clone());
        Ok(value)
    }
}
