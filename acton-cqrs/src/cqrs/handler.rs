//! Handler traits for commands and queries

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::request::{Command, Query, Request};
use crate::failure::Failure;

/// Handles one command type
///
/// Handlers that perform I/O should watch `cancel` at their await points.
#[async_trait]
pub trait CommandHandler<C>: Send + Sync + 'static
where
    C: Command,
{
    /// Execute the command
    async fn handle(&self, command: C, cancel: CancellationToken) -> Result<C::Result, Failure>;
}

/// Handles one query type
#[async_trait]
pub trait QueryHandler<Q>: Send + Sync + 'static
where
    Q: Query,
{
    /// Answer the query
    async fn handle(&self, query: Q, cancel: CancellationToken) -> Result<Q::Result, Failure>;
}

/// Adapter turning an async closure into a handler
///
/// ```rust
/// use acton_cqrs::cqrs::{handler_fn, HandlerRegistry, Query, Request};
///
/// struct Ping;
///
/// impl Request for Ping {
///     const NAME: &'static str = "Ping";
///     type Result = &'static str;
/// }
///
/// impl Query for Ping {}
///
/// let registry = HandlerRegistry::new();
/// registry
///     .register_query::<Ping, _>(handler_fn(|_: Ping, _| async { Ok("pong") }))
///     .unwrap();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<F>(F);

/// Wrap an async closure `Fn(R, CancellationToken) -> Future<Output =
/// Result<R::Result, Failure>>` as a command or query handler
pub fn handler_fn<R, F, Fut>(f: F) -> FnHandler<F>
where
    R: Request,
    F: Fn(R, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R::Result, Failure>> + Send + 'static,
{
    FnHandler(f)
}

impl<F> FnHandler<F> {
    fn call<R, Fut>(&self, request: R, cancel: CancellationToken) -> Fut
    where
        R: Request,
        F: Fn(R, CancellationToken) -> Fut,
        Fut: Future<Output = Result<R::Result, Failure>>,
    {
        (self.0)(request, cancel)
    }
}

#[async_trait]
impl<C, F, Fut> CommandHandler<C> for FnHandler<F>
where
    C: Command,
    F: Fn(C, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<C::Result, Failure>> + Send + 'static,
{
    async fn handle(&self, command: C, cancel: CancellationToken) -> Result<C::Result, Failure> {
        self.call(command, cancel).await
    }
}

#[async_trait]
impl<Q, F, Fut> QueryHandler<Q> for FnHandler<F>
where
    Q: Query,
    F: Fn(Q, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Q::Result, Failure>> + Send + 'static,
{
    async fn handle(&self, query: Q, cancel: CancellationToken) -> Result<Q::Result, Failure> {
        self.call(query, cancel).await
    }
}
