//! # acton-cqrs
//!
//! Typed binding of axum routes to command and query handlers.
//!
//! An endpoint is declared once at startup with a route pattern, a
//! projection from request parameters to a command or query, and (for
//! results) a projection to the response body. Every request then runs the
//! same pipeline: validate, dispatch to the one registered handler, and
//! either map the result to a success shape or classify the failure into an
//! `application/problem+json` response.
//!
//! ## Features
//!
//! - **One handler per type**: duplicate handlers or validators fail at startup
//! - **Declarative validation**: per-type rule sets, every violated field reported
//! - **Fixed success shapes**: 204 for commands, 200/201/202 chosen at bind time, 200 for queries
//! - **Problem responses**: 400/401/404/409/500 with a stable JSON shape; internal causes stay in the logs
//! - **Cancellation**: a client disconnect reaches the handler's token and never becomes a failure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use acton_cqrs::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct RenameProductRequest {
//!     name: String,
//! }
//!
//! struct RenameProduct {
//!     id: Uuid,
//!     name: String,
//! }
//!
//! impl Request for RenameProduct {
//!     const NAME: &'static str = "RenameProduct";
//!     type Result = ();
//! }
//!
//! impl Command for RenameProduct {}
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let registry = Arc::new(HandlerRegistry::new());
//!     registry.register_command::<RenameProduct, _>(handler_fn(|_: RenameProduct, _| async {
//!         Ok(())
//!     }))?;
//!     registry.register_validator(RuleSet::new().not_empty("name", |c: &RenameProduct| &c.name))?;
//!
//!     let binder = EndpointBinder::from_config(registry, &config);
//!     let rename = binder.bind_command(
//!         "/products/{id}/rename",
//!         Projection::with(|(Path(id), Json(body)): (Path<Uuid>, Json<RenameProductRequest>)| {
//!             RenameProduct { id, name: body.name }
//!         }),
//!     )?;
//!
//!     let app: Router = Router::new().map_endpoint(&rename);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cqrs;
pub mod endpoint;
pub mod error;
pub mod failure;
pub mod observability;
pub mod problem;
pub mod projection;
pub mod responses;
pub mod validation;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, EndpointsConfig, ServiceConfig};
    pub use crate::cqrs::{
        handler_fn, Command, CommandHandler, DispatchError, Dispatcher, HandlerRegistry, Query,
        QueryHandler, Request, RequestKind,
    };
    pub use crate::endpoint::{
        Cancelled, CommandEndpoint, CommandWithResultEndpoint, Endpoint, EndpointBinder,
        EndpointMetadata, QueryEndpoint, Reply, RequestCancellation, RouterExt,
    };
    pub use crate::error::{Error, Result};
    pub use crate::failure::{Failure, FailureKind, ValidationFailure};
    pub use crate::observability::init_tracing;
    pub use crate::problem::{classify, ProblemResponse};
    pub use crate::projection::Projection;
    pub use crate::responses::{
        Accepted, CommandResponse, Created, NoContent, ResourceId, Success, SuccessStatus,
    };
    pub use crate::validation::RuleSet;

    pub use axum::{
        extract::{Json, Path},
        http::StatusCode,
        Extension, Router,
    };

    pub use serde::{Deserialize, Serialize};

    // Re-export tracing macros
    pub use tracing::{debug, error, info, warn};

    // Re-export async-trait for handler implementations
    pub use async_trait::async_trait;

    pub use anyhow::{self, Context as AnyhowContext};
    pub use tokio_util::sync::CancellationToken;
    pub use uuid::Uuid;
}
