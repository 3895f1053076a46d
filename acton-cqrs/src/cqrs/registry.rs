//! Startup-time registry of handlers and validators
//!
//! The registry maps each concrete command or query type to exactly one
//! handler and at most one rule set. Registering a second handler or rule
//! set for the same type fails immediately, so ambiguous wiring stops the
//! process at startup instead of surfacing per request.
//!
//! Endpoints never hold the registry. At bind time they resolve a typed
//! [`Dispatcher`] for their request type and capture it.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::dispatcher::Dispatcher;
use super::handler::{CommandHandler, QueryHandler};
use super::request::{Command, Query, Request};
use crate::error::{Error, Result};
use crate::failure::Failure;
use crate::validation::RuleSet;

pub(crate) type HandlerFuture<R> = BoxFuture<'static, std::result::Result<<R as Request>::Result, Failure>>;

/// Type-erased handler for one request type
pub(crate) type HandlerFn<R> = Arc<dyn Fn(R, CancellationToken) -> HandlerFuture<R> + Send + Sync>;

type AnyEntry = Arc<dyn Any + Send + Sync>;

/// Whether a registered request is a command or a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Mutates state
    Command,
    /// Reads state
    Query,
}

struct Registered {
    name: &'static str,
    kind: RequestKind,
    entry: AnyEntry,
}

/// Handler and validator registry
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: DashMap<TypeId, Registered>,
    validators: DashMap<TypeId, AnyEntry>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handler for command `C`
    pub fn register_command<C, H>(&self, handler: H) -> Result<()>
    where
        C: Command,
        H: CommandHandler<C>,
    {
        let handler = Arc::new(handler);
        let f: HandlerFn<C> = Arc::new(move |command, cancel| {
            let handler = handler.clone();
            Box::pin(async move { CommandHandler::handle(&*handler, command, cancel).await })
        });

        self.insert_handler::<C>(RequestKind::Command, f)
    }

    /// Register the handler for query `Q`
    pub fn register_query<Q, H>(&self, handler: H) -> Result<()>
    where
        Q: Query,
        H: QueryHandler<Q>,
    {
        let handler = Arc::new(handler);
        let f: HandlerFn<Q> = Arc::new(move |query, cancel| {
            let handler = handler.clone();
            Box::pin(async move { QueryHandler::handle(&*handler, query, cancel).await })
        });

        self.insert_handler::<Q>(RequestKind::Query, f)
    }

    /// Register the rule set for request `R`
    ///
    /// Request types without a rule set are accepted as-is.
    pub fn register_validator<R>(&self, rules: RuleSet<R>) -> Result<()>
    where
        R: Request,
    {
        match self.validators.entry(TypeId::of::<R>()) {
            Entry::Occupied(_) => Err(Error::DuplicateValidator { request: R::NAME }),
            Entry::Vacant(slot) => {
                tracing::debug!(request = R::NAME, rules = rules.len(), "Validator registered");
                slot.insert(Arc::new(rules));
                Ok(())
            }
        }
    }

    /// Resolve the typed dispatcher for request `R`
    ///
    /// Fails when no handler is registered for `R`.
    pub fn dispatcher<R>(&self) -> Result<Dispatcher<R>>
    where
        R: Request,
    {
        let handler = self
            .handlers
            .get(&TypeId::of::<R>())
            .and_then(|registered| registered.entry.clone().downcast::<HandlerFn<R>>().ok())
            .ok_or(Error::MissingHandler { request: R::NAME })?;

        let rules = self
            .validators
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.clone().downcast::<RuleSet<R>>().ok())
            .unwrap_or_else(|| Arc::new(RuleSet::new()));

        Ok(Dispatcher::new((*handler).clone(), rules))
    }

    /// True when a handler is registered for `R`
    pub fn contains<R>(&self) -> bool
    where
        R: Request,
    {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Names and kinds of every registered handler, sorted by name
    pub fn registered(&self) -> Vec<(&'static str, RequestKind)> {
        let mut entries: Vec<_> = self
            .handlers
            .iter()
            .map(|e| (e.value().name, e.value().kind))
            .collect();
        entries.sort_unstable_by_key(|(name, _)| *name);
        entries
    }

    fn insert_handler<R>(&self, kind: RequestKind, f: HandlerFn<R>) -> Result<()>
    where
        R: Request,
    {
        match self.handlers.entry(TypeId::of::<R>()) {
            Entry::Occupied(_) => Err(Error::DuplicateHandler { request: R::NAME }),
            Entry::Vacant(slot) => {
                tracing::debug!(request = R::NAME, kind = ?kind, "Handler registered");
                slot.insert(Registered {
                    name: R::NAME,
                    kind,
                    entry: Arc::new(f),
                });
                Ok(())
            }
        }
    }
}
