//! Cancellable, value-carrying contexts.
//!
//! A [`Context`] marks one unit of work, typically a request. Containers
//! attach a contextual bag to it with
//! [`context_with_container`](crate::context_with_container); resolutions
//! through [`Container::get_in_context`](crate::Container::get_in_context)
//! share that bag until the context is cancelled.
//!
//! Cancellation flows from parents to children. A cancelled context keeps
//! its cause, which resolutions report as `ctx.Done() closed: <cause>`.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Cause recorded by [`CancelHandle::cancel`].
pub const CANCELED: &str = "context canceled";

type DoneCallback = Box<dyn FnOnce(&str) + Send>;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Opaque key under which a container stores its bag in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ContextKey(u64);

impl ContextKey {
    pub(crate) fn unique() -> Self {
        ContextKey(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Default)]
struct CancelState {
    cause: Option<String>,
    next_id: u64,
    callbacks: Vec<(u64, DoneCallback)>,
}

struct ContextInner {
    parent: Option<Context>,
    cancel: Option<Mutex<CancelState>>,
    /// Registration of this context in its nearest cancellable ancestor
    parent_registration: Mutex<Option<u64>>,
    value: Option<(ContextKey, Arc<dyn Any + Send + Sync>)>,
}

/// A unit of work that can be cancelled and carry values.
///
/// # Examples
///
/// ```rust
/// use ferrous_container::Context;
///
/// let root = Context::background();
/// let (request, cancel) = Context::with_cancel(&root);
/// let (step, _) = Context::with_cancel(&request);
///
/// assert!(!step.is_done());
/// cancel.cancel();
/// assert!(step.is_done());
/// assert_eq!(step.cause().as_deref(), Some("context canceled"));
/// ```
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// The root context. It is never cancelled.
    pub fn background() -> Self {
        Self::from_inner(ContextInner {
            parent: None,
            cancel: None,
            parent_registration: Mutex::new(None),
            value: None,
        })
    }

    /// Derives a context that is cancelled by the returned handle or when
    /// any ancestor is cancelled.
    pub fn with_cancel(parent: &Context) -> (Context, CancelHandle) {
        let ctx = Self::from_inner(ContextInner {
            parent: Some(parent.clone()),
            cancel: Some(Mutex::new(CancelState::default())),
            parent_registration: Mutex::new(None),
            value: None,
        });

        let child = ctx.clone();
        let registration = parent.on_done(move |cause| child.cancel_with(cause));
        if let Some(id) = registration {
            *ctx.inner.parent_registration.lock() = Some(id);
        }

        let handle = CancelHandle { ctx: ctx.clone() };
        (ctx, handle)
    }

    pub(crate) fn with_value(parent: &Context, key: ContextKey, value: Arc<dyn Any + Send + Sync>) -> Self {
        Self::from_inner(ContextInner {
            parent: Some(parent.clone()),
            cancel: None,
            parent_registration: Mutex::new(None),
            value: Some((key, value)),
        })
    }

    fn from_inner(inner: ContextInner) -> Self {
        Self { inner: Arc::new(inner) }
    }

    /// Returns true once this context or an ancestor has been cancelled.
    pub fn is_done(&self) -> bool {
        self.cause().is_some()
    }

    /// The cancellation cause, if cancelled.
    pub fn cause(&self) -> Option<String> {
        match self.nearest_cancellable() {
            Some(ctx) => ctx.inner.cancel.as_ref().and_then(|state| state.lock().cause.clone()),
            None => None,
        }
    }

    /// Returns false for contexts that can never be cancelled.
    pub fn can_be_done(&self) -> bool {
        self.nearest_cancellable().is_some()
    }

    pub(crate) fn value(&self, key: ContextKey) -> Option<Arc<dyn Any + Send + Sync>> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if let Some((k, value)) = &ctx.inner.value {
                if *k == key {
                    return Some(value.clone());
                }
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    /// Runs `f` with the cause once the context is cancelled.
    ///
    /// Runs immediately when already cancelled. Returns a registration id
    /// when the callback was queued, `None` when it ran or never will.
    pub(crate) fn on_done<F>(&self, f: F) -> Option<u64>
    where
        F: FnOnce(&str) + Send + 'static,
    {
        let ctx = self.nearest_cancellable()?;
        let state = ctx.inner.cancel.as_ref()?;
        let mut guard = state.lock();
        if let Some(cause) = guard.cause.clone() {
            drop(guard);
            f(&cause);
            return None;
        }
        guard.next_id += 1;
        let id = guard.next_id;
        guard.callbacks.push((id, Box::new(f)));
        Some(id)
    }

    fn remove_on_done(&self, id: u64) {
        let Some(ctx) = self.nearest_cancellable() else { return };
        if let Some(state) = &ctx.inner.cancel {
            state.lock().callbacks.retain(|(cb, _)| *cb != id);
        }
    }

    fn nearest_cancellable(&self) -> Option<&Context> {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.inner.cancel.is_some() {
                return Some(ctx);
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    fn cancel_with(&self, cause: &str) {
        let Some(state) = &self.inner.cancel else { return };
        let callbacks = {
            let mut guard = state.lock();
            if guard.cause.is_some() {
                return;
            }
            guard.cause = Some(cause.to_string());
            std::mem::take(&mut guard.callbacks)
        };

        if let Some(id) = self.inner.parent_registration.lock().take() {
            if let Some(parent) = &self.inner.parent {
                parent.remove_on_done(id);
            }
        }

        for (_, callback) in callbacks {
            callback(cause);
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancellable", &self.inner.cancel.is_some())
            .field("done", &self.is_done())
            .finish()
    }
}

/// Cancels the context it was created with.
///
/// Dropping the handle does not cancel the context.
#[derive(Clone)]
pub struct CancelHandle {
    ctx: Context,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.ctx.cancel_with(CANCELED);
    }

    pub fn cancel_with_cause(&self, cause: impl Into<String>) {
        self.ctx.cancel_with(&cause.into());
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").field("ctx", &self.ctx).finish()
    }
}
