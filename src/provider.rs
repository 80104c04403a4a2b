//! Provider protocol and argument conversion.
//!
//! Built values travel through the container type-erased. A [`Provider`]
//! wraps a typed closure so the resolver can invoke it with resolved
//! arguments, and [`Args`] hands those arguments back to user code with
//! a checked downcast.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::error::BoxError;
use crate::{DiError, DiResult};

/// A built, shareable value.
pub type Object = Arc<dyn Any + Send + Sync>;

/// A value still under construction.
///
/// Fields, setters, withers and decorators operate on the instance before
/// it is frozen into an [`Object`].
pub type Instance = Box<dyn Any + Send + Sync>;

/// Boxes a value as an instance without double-wrapping instances.
pub fn into_instance<T: Any + Send + Sync>(value: T) -> Instance {
    let boxed: Instance = Box::new(value);
    match boxed.downcast::<Instance>() {
        Ok(inner) => *inner,
        Err(boxed) => boxed,
    }
}

/// Freezes an instance, unwrapping objects that were returned as values.
pub fn into_object(instance: Instance) -> Object {
    match instance.downcast::<Object>() {
        Ok(object) => *object,
        Err(instance) => Arc::from(instance),
    }
}

/// Typed extraction from a resolved value.
pub trait FromObject: Sized {
    fn from_object(object: &Object) -> DiResult<Self>;
}

impl<T: Any + Send + Sync> FromObject for Arc<T> {
    fn from_object(object: &Object) -> DiResult<Self> {
        object
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(type_name::<T>()))
    }
}

/// Tag dependencies resolve to a list of objects.
impl<T: Any + Send + Sync> FromObject for Vec<Arc<T>> {
    fn from_object(object: &Object) -> DiResult<Self> {
        let list = object
            .downcast_ref::<Vec<Object>>()
            .ok_or(DiError::TypeMismatch(type_name::<Vec<Object>>()))?;
        list.iter().map(Arc::<T>::from_object).collect()
    }
}

/// Resolved arguments handed to providers, setters, withers and decorators.
#[derive(Clone, Default)]
pub struct Args {
    values: Vec<Object>,
}

impl Args {
    pub fn new(values: Vec<Object>) -> Self {
        Self { values }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the raw argument at `index`.
    pub fn object(&self, index: usize) -> DiResult<Object> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| DiError::msg(format!("missing argument #{}", index)))
    }

    /// Returns the argument at `index` converted to `V`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_container::Args;
    /// use std::sync::Arc;
    ///
    /// let args = Args::new(vec![Arc::new(42u32), Arc::new("x".to_string())]);
    /// assert_eq!(*args.get::<Arc<u32>>(0).unwrap(), 42);
    /// assert!(args.get::<Arc<u32>>(1).is_err());
    /// assert!(args.get::<Arc<u32>>(2).is_err());
    /// ```
    pub fn get<V: FromObject>(&self, index: usize) -> DiResult<V> {
        V::from_object(&self.object(index)?).map_err(|e| e.prefix(format!("arg #{}: ", index)))
    }

    /// Returns a clone of the argument at `index`.
    pub fn value<T: Any + Send + Sync + Clone>(&self, index: usize) -> DiResult<T> {
        self.get::<Arc<T>>(index).map(|v| (*v).clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.values.iter()
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args").field("len", &self.values.len()).finish()
    }
}

type ProviderFn = dyn Fn(&Args) -> DiResult<Instance> + Send + Sync;

/// An invocable producing a value, optionally failing.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::{Args, Provider};
///
/// let double = Provider::new(|args: &Args| args.value::<i64>(0).unwrap() * 2);
/// let out = double.call(&Args::new(vec![std::sync::Arc::new(21i64)])).unwrap();
/// assert_eq!(*out.downcast::<i64>().unwrap(), 42);
///
/// let failing = Provider::fallible(|_: &Args| Err::<i64, _>("no connection"));
/// assert_eq!(failing.call(&Args::empty()).unwrap_err().to_string(), "no connection");
/// ```
#[derive(Clone)]
pub struct Provider {
    call: Arc<ProviderFn>,
}

impl Provider {
    /// Wraps an infallible function of the resolved arguments.
    pub fn new<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args) -> T + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(move |args: &Args| Ok(into_instance(f(args)))),
        }
    }

    /// Wraps a function returning a value or an error.
    pub fn fallible<T, E, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        E: Into<BoxError>,
        F: Fn(&Args) -> Result<T, E> + Send + Sync + 'static,
    {
        Self {
            call: Arc::new(move |args: &Args| {
                f(args)
                    .map(into_instance)
                    .map_err(|e| DiError::from_boxed(e.into()))
            }),
        }
    }

    /// Wraps a function that takes no arguments.
    pub fn from_fn<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(move |_: &Args| f())
    }

    pub fn call(&self, args: &Args) -> DiResult<Instance> {
        (self.call)(args)
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Provider")
    }
}
