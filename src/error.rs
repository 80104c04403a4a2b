//! Error types for the dependency injection container.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::Key;

/// Boxed error accepted from user supplied providers, setters and decorators.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Dependency injection errors
///
/// Errors produced while resolving a service carry the path that led to
/// them as a chain of prefixes (`Container.get("svc"): arg #0: ...`), and a
/// build that fails in several places returns all of them as a group.
/// `Display` renders one line per underlying failure with every prefix
/// applied.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::DiError;
///
/// let err = DiError::group(vec![
///     DiError::ServiceNotFound.prefix("arg #0: "),
///     DiError::msg("boom").prefix("arg #1: "),
/// ])
/// .unwrap()
/// .prefix("constructor args: ");
///
/// assert_eq!(
///     err.to_string(),
///     "constructor args: arg #0: service does not exist\nconstructor args: arg #1: boom"
/// );
/// assert_eq!(err.collection().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// Service id is not registered
    ServiceNotFound,
    /// Parameter id is not registered
    ParamNotFound,
    /// Dependency cycle, rendered as the closed node path
    Circular(Vec<Key>),
    /// The context carrying the bag has been cancelled
    ContextDone(String),
    /// The context carries no bag for this container
    ContextNotAttached,
    /// A resolved value did not have the expected type
    TypeMismatch(&'static str),
    /// Error returned by user code
    Custom(Arc<dyn StdError + Send + Sync>),
    /// Plain error message
    Message(String),
    /// Error annotated with the step that produced it
    Prefixed {
        prefix: String,
        source: Box<DiError>,
    },
    /// Several independent errors
    Group(Vec<DiError>),
}

impl DiError {
    /// Creates a plain message error.
    pub fn msg(message: impl Into<String>) -> Self {
        DiError::Message(message.into())
    }

    /// Wraps an arbitrary error.
    pub fn custom<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::from_boxed(Box::new(err))
    }

    /// Converts a boxed error, unwrapping it when it already is a `DiError`
    /// so its prefixes and grouping survive.
    pub fn from_boxed(err: BoxError) -> Self {
        match err.downcast::<DiError>() {
            Ok(di) => *di,
            Err(other) => DiError::Custom(Arc::from(other)),
        }
    }

    /// Annotates the error with a prefix.
    ///
    /// Prefixes stack: the outermost call is rendered first.
    pub fn prefix(self, prefix: impl Into<String>) -> Self {
        DiError::Prefixed {
            prefix: prefix.into(),
            source: Box::new(self),
        }
    }

    /// Groups errors, returning `None` when there is nothing to report.
    pub fn group(errors: Vec<DiError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(DiError::Group(errors))
        }
    }

    /// Returns every underlying failure, flattened.
    ///
    /// Groups are expanded recursively. Each leaf is returned with the
    /// concatenation of the prefixes found on the way down.
    pub fn collection(&self) -> Vec<DiError> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    /// Returns true if any underlying failure is a dependency cycle.
    pub fn is_circular(&self) -> bool {
        self.collection().iter().any(|e| matches!(e.leaf(), DiError::Circular(_)))
    }

    /// Returns true if any underlying failure is a cancelled context.
    pub fn is_context_done(&self) -> bool {
        self.collection()
            .iter()
            .any(|e| matches!(e.leaf(), DiError::ContextDone(_)))
    }

    /// Strips prefixes from a flattened error.
    pub fn leaf(&self) -> &DiError {
        match self {
            DiError::Prefixed { source, .. } => source.leaf(),
            other => other,
        }
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<DiError>) {
        match self {
            DiError::Group(errors) => {
                for err in errors {
                    err.flatten_into(prefix, out);
                }
            }
            DiError::Prefixed { prefix: own, source } => {
                source.flatten_into(&format!("{}{}", prefix, own), out);
            }
            leaf if prefix.is_empty() => out.push(leaf.clone()),
            leaf => out.push(leaf.clone().prefix(prefix)),
        }
    }

    fn fmt_leaf(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::ServiceNotFound => write!(f, "service does not exist"),
            DiError::ParamNotFound => write!(f, "param does not exist"),
            DiError::Circular(path) => {
                let names: Vec<String> = path.iter().map(|k| k.to_string()).collect();
                write!(f, "{}", names.join(" -> "))
            }
            DiError::ContextDone(cause) => write!(f, "ctx.Done() closed: {}", cause),
            DiError::ContextNotAttached => write!(f, "context is not attached to the container"),
            DiError::TypeMismatch(name) => write!(f, "type mismatch: expected {}", name),
            DiError::Custom(err) => write!(f, "{}", err),
            DiError::Message(msg) => write!(f, "{}", msg),
            DiError::Prefixed { prefix, source } => {
                write!(f, "{}", prefix)?;
                source.fmt_leaf(f)
            }
            DiError::Group(_) => Ok(()),
        }
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::Group(_) | DiError::Prefixed { .. } => {
                for (i, err) in self.collection().iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    err.fmt_leaf(f)?;
                }
                Ok(())
            }
            leaf => leaf.fmt_leaf(f),
        }
    }
}

impl StdError for DiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DiError::Custom(err) => Some(err.as_ref()),
            DiError::Prefixed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
