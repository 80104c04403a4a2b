//! Service scope definitions.

use std::fmt;
use std::str::FromStr;

use crate::DiError;

/// Service scopes controlling instance caching behavior
///
/// - **Shared**: one instance per container, kept in the shared cache
/// - **Contextual**: one instance per bag (a top-level `get` or an attached
///   context), shared by every co-dependent resolution in that bag
/// - **NonShared**: a fresh instance for every resolution
/// - **Default**: contextual if any transitive dependency is a contextual
///   service, shared otherwise
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Dependency, Scope, Service, ServiceCollection};
/// use std::sync::Arc;
///
/// #[derive(Clone)]
/// struct Tx;
/// #[derive(Clone)]
/// struct Repo {
///     tx: Option<Arc<Tx>>,
/// }
///
/// let mut services = ServiceCollection::new();
/// services.add_service("tx", Service::with_value(Tx).set_scope(Scope::Contextual));
/// services.add_service(
///     "repo",
///     Service::with_value(Repo { tx: None })
///         .set_field("tx", Dependency::service("tx"), |r: &mut Repo, tx: Arc<Tx>| r.tx = Some(tx)),
/// );
/// let container = services.build();
///
/// // "repo" depends on a contextual service, so every top-level get builds a new one
/// let a = container.get("repo").unwrap();
/// let b = container.get("repo").unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Elevated to contextual or shared from the dependency graph
    #[default]
    Default,
    /// Single instance per container, cached until invalidated
    Shared,
    /// Single instance per bag
    Contextual,
    /// New instance per resolution, never cached
    NonShared,
}

impl Scope {
    /// Returns true if instances of this scope are cached somewhere.
    pub fn is_cached(self) -> bool {
        !matches!(self, Scope::NonShared)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::Default => "default",
            Scope::Shared => "shared",
            Scope::Contextual => "contextual",
            Scope::NonShared => "non_shared",
        };
        f.write_str(name)
    }
}

impl FromStr for Scope {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(Scope::Default),
            "shared" => Ok(Scope::Shared),
            "contextual" => Ok(Scope::Contextual),
            "non_shared" | "non-shared" => Ok(Scope::NonShared),
            other => Err(DiError::msg(format!("invalid scope {:?}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for scope in [Scope::Default, Scope::Shared, Scope::Contextual, Scope::NonShared] {
            assert_eq!(scope.to_string().parse::<Scope>().unwrap(), scope);
        }
        assert_eq!("".parse::<Scope>().unwrap(), Scope::Default);
    }

    #[test]
    fn test_invalid_scope() {
        let err = "forever".parse::<Scope>().unwrap_err();
        assert_eq!(err.to_string(), "invalid scope \"forever\"");
    }
}
