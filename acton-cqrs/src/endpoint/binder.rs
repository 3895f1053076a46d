//! Binding routes to typed dispatch

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::metadata::EndpointMetadata;
use super::{Cancelled, Endpoint, Reply};
use crate::config::Config;
use crate::cqrs::{guard_panics, Command, DispatchError, Dispatcher, HandlerRegistry, Query, Request};
use crate::error::{Error, Result};
use crate::failure::Failure;
use crate::problem::classify;
use crate::projection::Projection;
use crate::responses::{
    accepted_location, created_location, Accepted, CommandResponse, Created, NoContent, ResourceId,
    Success, SuccessStatus,
};

/// Endpoint for a command without a result: 204 on success
pub type CommandEndpoint<P> = Endpoint<P, NoContent>;

/// Endpoint for a command with a result: 200, 201 or 202 on success
pub type CommandWithResultEndpoint<P, T> = Endpoint<P, CommandResponse<T>>;

/// Endpoint for a query: 200 on success
pub type QueryEndpoint<P, T> = Endpoint<P, Success<T>>;

/// Turns route patterns and projections into endpoints
///
/// Binding resolves the handler and rule set for the command or query once
/// and fails when anything about the wiring is wrong: a missing handler, a
/// success status other than 200/201/202, a malformed pattern or a
/// structural projection whose shapes do not line up.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use acton_cqrs::prelude::*;
///
/// struct ArchiveOrder {
///     id: u64,
/// }
///
/// impl Request for ArchiveOrder {
///     const NAME: &'static str = "ArchiveOrder";
///     type Result = ();
/// }
///
/// impl Command for ArchiveOrder {}
///
/// let registry = Arc::new(HandlerRegistry::new());
/// registry
///     .register_command::<ArchiveOrder, _>(handler_fn(|_: ArchiveOrder, _| async { Ok(()) }))
///     .unwrap();
///
/// let binder = EndpointBinder::new(registry);
/// let endpoint = binder
///     .bind_command(
///         "/orders/{id}/archive",
///         Projection::with(|Path(id): Path<u64>| ArchiveOrder { id }),
///     )
///     .unwrap();
///
/// let app: Router = Router::new().map_endpoint(&endpoint);
/// assert_eq!(endpoint.metadata().display_name(), "Archive order");
/// ```
#[derive(Clone)]
pub struct EndpointBinder {
    registry: Arc<HandlerRegistry>,
    public_base_url: Arc<str>,
}

impl std::fmt::Debug for EndpointBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointBinder")
            .field("registered", &self.registry.registered())
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl EndpointBinder {
    /// Create a binder with relative `Location` headers
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self {
            registry,
            public_base_url: Arc::from(""),
        }
    }

    /// Create a binder using `endpoints.public_base_url` from configuration
    pub fn from_config(registry: Arc<HandlerRegistry>, config: &Config) -> Self {
        match config.endpoints.public_base_url.as_deref() {
            Some(base) => Self::new(registry).with_public_base_url(base),
            None => Self::new(registry),
        }
    }

    /// Prefix `Location` headers with `base`, e.g. `https://api.example.com`
    #[must_use]
    pub fn with_public_base_url(mut self, base: impl AsRef<str>) -> Self {
        self.public_base_url = Arc::from(base.as_ref().trim_end_matches('/'));
        self
    }

    /// The registry endpoints are resolved against
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Bind a command that produces no result
    ///
    /// Mounted as `POST`; responds 204 with an empty body.
    pub fn bind_command<P, C>(&self, pattern: &str, to_command: Projection<P, C>) -> Result<CommandEndpoint<P>>
    where
        P: Send + 'static,
        C: Command<Result = ()>,
    {
        let dispatcher = self.prepare(pattern, &to_command)?;
        let metadata = EndpointMetadata::new(C::NAME, Method::POST, pattern, StatusCode::NO_CONTENT);
        log_bound(&metadata);

        Ok(Endpoint::new(metadata, move |params: P, cancel: CancellationToken| {
            let to_command = to_command.clone();
            let dispatcher = dispatcher.clone();
            let run: BoxFuture<'static, std::result::Result<Reply<NoContent>, Cancelled>> = Box::pin(async move {
                let outcome = project_and_dispatch(params, &to_command, &dispatcher, &cancel).await;
                settle(C::NAME, outcome, |()| Ok(NoContent))
            });
            run
        }))
    }

    /// Bind a command that produces a result
    ///
    /// Mounted as `POST`. `success` selects the shape for every invocation:
    ///
    /// - 200: result in the body
    /// - 201: result in the body, `Location` = `<base><pattern>/<id>`
    /// - 202: result in the body, `Location` = `<base><pattern>`
    ///
    /// Any other status is rejected here.
    pub fn bind_command_with_result<P, T, C>(
        &self,
        pattern: &str,
        success: StatusCode,
        to_command: Projection<P, C>,
        to_response: Projection<C::Result, T>,
    ) -> Result<CommandWithResultEndpoint<P, T>>
    where
        P: Send + 'static,
        T: Serialize + Send + 'static,
        C: Command,
        C::Result: ResourceId,
    {
        let success = SuccessStatus::try_from(success)?;
        to_response.verify()?;
        let dispatcher = self.prepare(pattern, &to_command)?;
        let metadata = EndpointMetadata::new(C::NAME, Method::POST, pattern, success.status_code());
        log_bound(&metadata);

        let base = self.public_base_url.clone();
        let pattern: Arc<str> = Arc::from(pattern);

        Ok(Endpoint::new(metadata, move |params: P, cancel: CancellationToken| {
            let to_command = to_command.clone();
            let to_response = to_response.clone();
            let dispatcher = dispatcher.clone();
            let base = base.clone();
            let pattern = pattern.clone();
            let run: BoxFuture<'static, std::result::Result<Reply<CommandResponse<T>>, Cancelled>> =
                Box::pin(async move {
                    let outcome = project_and_dispatch(params, &to_command, &dispatcher, &cancel).await;
                    settle(C::NAME, outcome, |result| {
                        let id = result.resource_id();
                        let body = to_response.apply(result)?;
                        Ok(match success {
                            SuccessStatus::Ok => CommandResponse::Ok(Success::new(body)),
                            SuccessStatus::Created => CommandResponse::Created(Created::new(
                                body,
                                created_location(&base, &pattern, id.as_deref()),
                            )),
                            SuccessStatus::Accepted => CommandResponse::Accepted(Accepted::new(
                                body,
                                accepted_location(&base, &pattern),
                            )),
                        })
                    })
                });
            run
        }))
    }

    /// Bind a query
    ///
    /// Mounted as `GET`; responds 200 with the projected result.
    pub fn bind_query<P, T, Q>(
        &self,
        pattern: &str,
        to_query: Projection<P, Q>,
        to_response: Projection<Q::Result, T>,
    ) -> Result<QueryEndpoint<P, T>>
    where
        P: Send + 'static,
        T: Serialize + Send + 'static,
        Q: Query,
    {
        to_response.verify()?;
        let dispatcher = self.prepare(pattern, &to_query)?;
        let metadata = EndpointMetadata::new(Q::NAME, Method::GET, pattern, StatusCode::OK);
        log_bound(&metadata);

        Ok(Endpoint::new(metadata, move |params: P, cancel: CancellationToken| {
            let to_query = to_query.clone();
            let to_response = to_response.clone();
            let dispatcher = dispatcher.clone();
            let run: BoxFuture<'static, std::result::Result<Reply<Success<T>>, Cancelled>> = Box::pin(async move {
                let outcome = project_and_dispatch(params, &to_query, &dispatcher, &cancel).await;
                settle(Q::NAME, outcome, |result| Ok(Success::new(to_response.apply(result)?)))
            });
            run
        }))
    }

    fn prepare<P, R>(&self, pattern: &str, to_request: &Projection<P, R>) -> Result<Dispatcher<R>>
    where
        P: 'static,
        R: Request,
    {
        validate_pattern(pattern)?;
        to_request.verify()?;
        self.registry.dispatcher::<R>()
    }
}

fn validate_pattern(pattern: &str) -> Result<()> {
    let reason = if pattern.is_empty() {
        "pattern is empty"
    } else if !pattern.starts_with('/') {
        "pattern must start with '/'"
    } else if pattern.chars().any(char::is_whitespace) {
        "pattern must not contain whitespace"
    } else if pattern.matches('{').count() != pattern.matches('}').count() {
        "unbalanced braces"
    } else {
        return Ok(());
    };

    Err(Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    })
}

fn log_bound(metadata: &EndpointMetadata) {
    tracing::info!(
        endpoint = metadata.name(),
        method = %metadata.method(),
        pattern = metadata.pattern(),
        success = metadata.success_status().as_u16(),
        "Endpoint bound"
    );
}

async fn project_and_dispatch<P, R>(
    params: P,
    to_request: &Projection<P, R>,
    dispatcher: &Dispatcher<R>,
    cancel: &CancellationToken,
) -> std::result::Result<R::Result, DispatchError>
where
    P: 'static,
    R: Request,
{
    let request = guard_panics("request projection", R::NAME, || to_request.apply(params))?;
    dispatcher.dispatch(request, cancel).await
}

/// Turn a dispatch outcome into a reply, classifying failures
///
/// A panic while building the success shape is classified like any other
/// internal failure.
fn settle<R, T, F>(
    name: &'static str,
    outcome: std::result::Result<R, DispatchError>,
    on_success: F,
) -> std::result::Result<Reply<T>, Cancelled>
where
    F: FnOnce(R) -> std::result::Result<T, Failure>,
{
    let failure = match outcome {
        Ok(result) => match guard_panics("response projection", name, || on_success(result)) {
            Ok(reply) => return Ok(Ok(reply)),
            Err(failure) => failure,
        },
        Err(DispatchError::Cancelled) => {
            tracing::debug!(request = name, "Request cancelled; no response written");
            return Err(Cancelled);
        }
        Err(DispatchError::Failed(failure)) => failure,
    };

    log_failure(name, &failure);
    Ok(Err(classify(&failure)))
}

fn log_failure(name: &'static str, failure: &Failure) {
    match failure {
        Failure::Validation(validation) => {
            tracing::debug!(request = name, errors = validation.error_count(), "Request rejected by validation");
        }
        Failure::Internal(cause) => {
            tracing::error!(request = name, error = %format!("{cause:#}"), "Request failed with internal error");
        }
        other => {
            tracing::warn!(request = name, kind = %other.kind(), error = %other, "Request failed");
        }
    }
}
