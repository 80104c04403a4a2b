//! # ferrous-container
//!
//! Runtime dependency injection container with string-identified services,
//! parameters, tags and decorators.
//!
//! ## Features
//!
//! - **Four scopes**: shared, contextual (one instance per request
//!   context), non-shared, and a default that becomes contextual when any
//!   transitive dependency is contextual
//! - **Recipes, not types**: services are built from a constructor or a
//!   value, then fields, setters, withers and tag decorators
//! - **Cycle diagnostics**: every cycle across services, params, tags and
//!   decorators is reported in a stable order
//! - **Aggregated errors**: independent failures are all reported, each
//!   with the path that produced it
//! - **Atomic hot-swap**: reconfigure once in-flight contexts have drained
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_container::{Args, Dependency, Provider, Service, ServiceCollection};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_param("db_url", Dependency::value(String::from("postgres://localhost")))
//!     .add_service(
//!         "db",
//!         Service::with_constructor(
//!             Provider::new(|args: &Args| Database { url: args.value::<String>(0).unwrap() }),
//!             vec![Dependency::param("db_url")],
//!         ),
//!     )
//!     .add_service(
//!         "users",
//!         Service::with_constructor(
//!             Provider::fallible(|args: &Args| args.get::<Arc<Database>>(0).map(|db| UserService { db })),
//!             vec![Dependency::service("db")],
//!         ),
//!     );
//!
//! let container = services.build();
//! let users = container.get_as::<UserService>("users").unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Contextual Services
//!
//! ```rust
//! use ferrous_container::{context_with_container, Context, Service, ServiceCollection};
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//!
//! let next = Arc::new(AtomicU32::new(0));
//! let counter = next.clone();
//! let mut services = ServiceCollection::new();
//! services.add_service(
//!     "request_id",
//!     Service::with_constructor(
//!         ferrous_container::Provider::from_fn(move || counter.fetch_add(1, Ordering::SeqCst)),
//!         vec![],
//!     )
//!     .contextual(),
//! );
//! let container = services.build();
//!
//! let (request, done) = Context::with_cancel(&Context::background());
//! let ctx = context_with_container(&request, &container);
//! let a = container.get_in_context_as::<u32>(&ctx, "request_id").unwrap();
//! let b = container.get_in_context_as::<u32>(&ctx, "request_id").unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! done.cancel();
//! let err = container.get_in_context(&ctx, "request_id").unwrap_err();
//! assert!(err.is_context_done());
//! ```

pub mod collection;
pub mod config;
pub mod container;
pub mod context;
pub mod decoration;
pub mod dependency;
pub mod descriptors;
pub mod error;
pub mod graph_export;
pub mod key;
pub mod observer;
pub mod provider;
pub mod scope;

// Internal modules
mod internal;

pub use collection::ServiceCollection;
pub use config::{ConfigValue, EnvironmentParamSource, MapParamSource, ParamSource};
pub use container::{context_with_container, Container, HotSwap};
pub use context::{CancelHandle, Context, CANCELED};
pub use decoration::{Decorator, DecoratorPayload};
pub use dependency::Dependency;
pub use descriptors::{CallKind, Service};
pub use error::{BoxError, DiError, DiResult};
pub use graph_export::{GraphEdge, GraphExport, GraphNode};
pub use key::Key;
pub use observer::{DiObserver, LoggingObserver, MetricsObserver};
pub use provider::{into_instance, into_object, Args, FromObject, Instance, Object, Provider};
pub use scope::Scope;
