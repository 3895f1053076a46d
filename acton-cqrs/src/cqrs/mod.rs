//! Command/query dispatch
//!
//! This module provides the CQRS half of the crate: marker traits for
//! commands and queries, async handler traits, a startup-time registry that
//! enforces one handler per request type, and the typed [`Dispatcher`] that
//! endpoints capture.
//!
//! # Example
//!
//! ```rust
//! use acton_cqrs::cqrs::{handler_fn, HandlerRegistry, Query, Request};
//! use acton_cqrs::validation::RuleSet;
//! use tokio_util::sync::CancellationToken;
//!
//! struct GetProductName {
//!     id: u64,
//! }
//!
//! impl Request for GetProductName {
//!     const NAME: &'static str = "GetProductName";
//!     type Result = String;
//! }
//!
//! impl Query for GetProductName {}
//!
//! # tokio_test_block_on(async {
//! let registry = HandlerRegistry::new();
//! registry
//!     .register_query::<GetProductName, _>(handler_fn(|q: GetProductName, _| async move {
//!         Ok(format!("product-{}", q.id))
//!     }))
//!     .unwrap();
//! registry
//!     .register_validator(RuleSet::new().range("id", |q: &GetProductName| q.id, 1, u64::MAX))
//!     .unwrap();
//!
//! let dispatcher = registry.dispatcher::<GetProductName>().unwrap();
//! let name = dispatcher
//!     .dispatch(GetProductName { id: 7 }, &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(name, "product-7");
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```

mod dispatcher;
mod handler;
mod registry;
mod request;

pub use dispatcher::{DispatchError, Dispatcher};
pub(crate) use dispatcher::guard_panics;
pub use handler::{handler_fn, CommandHandler, FnHandler, QueryHandler};
pub use registry::{HandlerRegistry, RequestKind};
pub use request::{Command, Query, Request};
