//! HTTP endpoints bound to commands and queries
//!
//! Every bound endpoint runs the same pipeline per request:
//!
//! 1. the router extracts the parameters (`Json<T>`, `Path<T>`, any extractor)
//! 2. a [`Projection`](crate::projection::Projection) turns them into the
//!    command or query
//! 3. the rule set registered for that type validates it
//! 4. its one handler runs
//! 5. the result is projected into a success shape, or the failure is
//!    classified into a problem response
//!
//! Endpoints are built by [`EndpointBinder`] at startup and mounted with
//! [`RouterExt::map_endpoint`]. They can also be driven without HTTP through
//! [`Endpoint::invoke`], which is what most tests do.
//!
//! Cancellation is not a failure: when the request's token fires, `invoke`
//! returns [`Cancelled`] and the router writes no problem response.

mod binder;
mod cancellation;
mod metadata;

use std::fmt;
use std::sync::Arc;

use axum::{
    extract::FromRequest,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::problem::ProblemResponse;

pub use binder::{CommandEndpoint, CommandWithResultEndpoint, EndpointBinder, QueryEndpoint};
pub use cancellation::RequestCancellation;
pub use metadata::{humanize, EndpointMetadata};

/// Outcome of a request that was not cancelled
pub type Reply<T> = Result<T, ProblemResponse>;

/// The request's cancellation signal fired before a reply was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request cancelled")]
pub struct Cancelled;

/// Status used when a cancelled request still needs a response value
///
/// Nothing is written to a client that has gone away; this only shows up
/// when an upstream token cancels a request whose connection is still open.
const CLIENT_CLOSED_REQUEST: u16 = 499;

type InvokeFn<P, T> = Arc<dyn Fn(P, CancellationToken) -> BoxFuture<'static, Result<Reply<T>, Cancelled>> + Send + Sync>;

/// A bound endpoint taking parameters `P` and succeeding with `T`
///
/// Cheap to clone; every clone shares the same dispatcher.
pub struct Endpoint<P, T> {
    metadata: Arc<EndpointMetadata>,
    run: InvokeFn<P, T>,
}

impl<P, T> Clone for Endpoint<P, T> {
    fn clone(&self) -> Self {
        Self {
            metadata: self.metadata.clone(),
            run: self.run.clone(),
        }
    }
}

impl<P, T> fmt::Debug for Endpoint<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

impl<P, T> Endpoint<P, T>
where
    P: Send + 'static,
    T: Send + 'static,
{
    pub(crate) fn new<F>(metadata: EndpointMetadata, run: F) -> Self
    where
        F: Fn(P, CancellationToken) -> BoxFuture<'static, Result<Reply<T>, Cancelled>> + Send + Sync + 'static,
    {
        Self {
            metadata: Arc::new(metadata),
            run: Arc::new(run),
        }
    }

    /// Name, route and possible statuses
    pub fn metadata(&self) -> &EndpointMetadata {
        &self.metadata
    }

    /// Run the pipeline for already-extracted parameters
    pub async fn invoke(&self, params: P, cancel: CancellationToken) -> Result<Reply<T>, Cancelled> {
        (self.run)(params, cancel).await
    }
}

impl<P, T> Endpoint<P, T>
where
    P: Send + 'static,
    T: IntoResponse + Send + 'static,
{
    /// The axum method router for this endpoint
    ///
    /// `P` must be an extractor for state `S`. Dropping the request future,
    /// as hyper does when the client disconnects, cancels the request's
    /// token so handlers watching it can stop early.
    pub fn method_router<S, M>(&self) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
        P: FromRequest<S, M>,
        M: Send + 'static,
    {
        let endpoint = self.clone();
        let handler = move |cancellation: RequestCancellation, params: P| async move {
            let token = cancellation.into_token();
            let guard = token.clone().drop_guard();
            let outcome = endpoint.invoke(params, token).await;
            guard.disarm();
            into_response(outcome)
        };

        if *self.metadata.method() == Method::GET {
            get(handler)
        } else {
            post(handler)
        }
    }
}

fn into_response<T: IntoResponse>(outcome: Result<Reply<T>, Cancelled>) -> Response {
    match outcome {
        Ok(Ok(success)) => success.into_response(),
        Ok(Err(problem)) => problem.into_response(),
        Err(Cancelled) => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
            .unwrap_or(StatusCode::SERVICE_UNAVAILABLE)
            .into_response(),
    }
}

/// Anything that can be mounted on a router at its own pattern
pub trait IntoRoute<S, M> {
    /// Route pattern
    fn pattern(&self) -> &str;

    /// Method router serving the pattern
    fn method_router(&self) -> MethodRouter<S>;
}

impl<P, T, S, M> IntoRoute<S, M> for Endpoint<P, T>
where
    P: FromRequest<S, M> + Send + 'static,
    T: IntoResponse + Send + 'static,
    S: Clone + Send + Sync + 'static,
    M: Send + 'static,
{
    fn pattern(&self) -> &str {
        self.metadata.pattern()
    }

    fn method_router(&self) -> MethodRouter<S> {
        Endpoint::method_router::<S, M>(self)
    }
}

/// Mount bound endpoints on an axum [`Router`]
pub trait RouterExt<S> {
    /// Mount `endpoint` at its pattern
    ///
    /// A command and a query may share a pattern; their method routers are
    /// merged.
    fn map_endpoint<E, M>(self, endpoint: &E) -> Self
    where
        E: IntoRoute<S, M>;
}

impl<S> RouterExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn map_endpoint<E, M>(self, endpoint: &E) -> Self
    where
        E: IntoRoute<S, M>,
    {
        self.route(endpoint.pattern(), endpoint.method_router())
    }
}
