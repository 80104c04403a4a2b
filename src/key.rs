//! Node identifiers for the dependency graph.

use std::fmt;

/// Identifies a node of the dependency graph.
///
/// Keys order by kind first (services, params, tags, decorated-by-tag
/// nodes, decorators) and then by resource, which is the order used for
/// every sorted output of the container. `Display` renders the pretty form
/// used in error messages and cycle reports.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::Key;
///
/// assert_eq!(Key::service("db").to_string(), "@db");
/// assert_eq!(Key::param("dsn").to_string(), "%dsn%");
/// assert_eq!(Key::tag("handler").to_string(), "!tagged handler");
/// assert_eq!(Key::decorated_by_tag("handler").to_string(), "decorate(!tagged handler)");
/// assert_eq!(Key::decorator(3).to_string(), "decorator(#3)");
/// assert!(Key::service("z") < Key::param("a"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// A registered service
    Service(String),
    /// A registered parameter
    Param(String),
    /// Every service carrying the tag
    Tag(String),
    /// The decoration step of services carrying the tag
    DecoratedByTag(String),
    /// A decorator, by registration index
    Decorator(usize),
}

impl Key {
    pub fn service(id: impl Into<String>) -> Self {
        Key::Service(id.into())
    }

    pub fn param(id: impl Into<String>) -> Self {
        Key::Param(id.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Key::Tag(tag.into())
    }

    pub fn decorated_by_tag(tag: impl Into<String>) -> Self {
        Key::DecoratedByTag(tag.into())
    }

    pub fn decorator(index: usize) -> Self {
        Key::Decorator(index)
    }

    /// Short name of the node kind, used by graph exports.
    pub fn kind(&self) -> &'static str {
        match self {
            Key::Service(_) => "service",
            Key::Param(_) => "param",
            Key::Tag(_) => "tag",
            Key::DecoratedByTag(_) => "decorated_by_tag",
            Key::Decorator(_) => "decorator",
        }
    }

    /// Returns the service id if this is a service node.
    pub fn as_service(&self) -> Option<&str> {
        match self {
            Key::Service(id) => Some(id),
            _ => None,
        }
    }

}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Service(id) => write!(f, "@{}", id),
            Key::Param(id) => write!(f, "%{}%", id),
            Key::Tag(tag) => write!(f, "!tagged {}", tag),
            Key::DecoratedByTag(tag) => write!(f, "decorate(!tagged {})", tag),
            Key::Decorator(index) => write!(f, "decorator(#{})", index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_ordering() {
        let mut keys = vec![
            Key::decorator(0),
            Key::decorated_by_tag("a"),
            Key::tag("a"),
            Key::param("a"),
            Key::service("b"),
            Key::service("a"),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                Key::service("a"),
                Key::service("b"),
                Key::param("a"),
                Key::tag("a"),
                Key::decorated_by_tag("a"),
                Key::decorator(0),
            ]
        );
    }

    #[test]
    fn test_decorators_order_numerically() {
        assert!(Key::decorator(2) < Key::decorator(10));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Key::service("x").as_service(), Some("x"));
        assert_eq!(Key::param("x").as_service(), None);
        assert_eq!(Key::tag("t").kind(), "tag");
    }
}
