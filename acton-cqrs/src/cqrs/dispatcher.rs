//! Typed dispatch: validate, then hand off to the one registered handler
//!
//! A [`Dispatcher`] is resolved once per endpoint at bind time and shared by
//! every request that endpoint serves. Dispatch is a single attempt: no
//! retries, no fallbacks. Cancellation is reported as
//! [`DispatchError::Cancelled`], never folded into a [`Failure`].

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::registry::HandlerFn;
use super::request::Request;
use crate::failure::Failure;
use crate::validation::RuleSet;

/// Why a dispatch did not produce a result
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Validation or handling failed
    #[error(transparent)]
    Failed(#[from] Failure),

    /// The request's cancellation signal fired first
    #[error("request cancelled")]
    Cancelled,
}

/// Validate-then-handle capability for one request type
pub struct Dispatcher<R: Request> {
    handler: HandlerFn<R>,
    rules: Arc<RuleSet<R>>,
}

impl<R: Request> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl<R: Request> fmt::Debug for Dispatcher<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("request", &R::NAME)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl<R: Request> Dispatcher<R> {
    pub(crate) fn new(handler: HandlerFn<R>, rules: Arc<RuleSet<R>>) -> Self {
        Self { handler, rules }
    }

    /// Rules applied before the handler runs
    pub fn rules(&self) -> &RuleSet<R> {
        &self.rules
    }

    /// Validate `request` and run its handler
    ///
    /// The handler never sees a value that failed validation. A panic in a
    /// rule or in the handler is coerced to [`Failure::Internal`].
    pub async fn dispatch(
        &self,
        request: R,
        cancel: &CancellationToken,
    ) -> Result<R::Result, DispatchError> {
        let span = tracing::debug_span!("dispatch", request = R::NAME);

        async move {
            if cancel.is_cancelled() {
                tracing::debug!("Cancelled before dispatch");
                return Err(DispatchError::Cancelled);
            }

            let request = guard_panics("validation", R::NAME, || {
                self.rules.validate(request).map_err(|failure| {
                    tracing::debug!(%failure, "Validation rejected request");
                    Failure::Validation(failure)
                })
            })?;

            let handling =
                AssertUnwindSafe(async { (self.handler)(request, cancel.clone()).await }).catch_unwind();

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!("Cancelled during dispatch");
                    Err(DispatchError::Cancelled)
                }

                outcome = handling => match outcome {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(failure)) => Err(failure.into()),
                    Err(panic) => Err(Failure::internal(anyhow::anyhow!(
                        "handler for {} panicked: {}",
                        R::NAME,
                        panic_message(panic.as_ref())
                    ))
                    .into()),
                },
            }
        }
        .instrument(span)
        .await
    }
}

/// Run a synchronous pipeline stage, turning a panic into [`Failure::Internal`]
pub(crate) fn guard_panics<T>(
    stage: &'static str,
    request: &'static str,
    run: impl FnOnce() -> Result<T, Failure>,
) -> Result<T, Failure> {
    std::panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|panic| {
        Err(Failure::internal(anyhow::anyhow!(
            "{stage} of {request} panicked: {}",
            panic_message(panic.as_ref())
        )))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cqrs::{handler_fn, Command, HandlerRegistry};
    use crate::failure::FailureKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct Reserve {
        sku: String,
        quantity: u32,
    }

    impl Request for Reserve {
        const NAME: &'static str = "Reserve";
        type Result = u32;
    }

    impl Command for Reserve {}

    fn registry_with<F, Fut>(handler: F) -> HandlerRegistry
    where
        F: Fn(Reserve, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<u32, Failure>> + Send + 'static,
    {
        let registry = HandlerRegistry::new();
        registry
            .register_command::<Reserve, _>(handler_fn(handler))
            .unwrap();
        registry
            .register_validator(
                RuleSet::new()
                    .not_empty("sku", |r: &Reserve| &r.sku)
                    .range("quantity", |r: &Reserve| r.quantity, 1, 100),
            )
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let registry = registry_with(move |r: Reserve, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { Ok(r.quantity) }
        });

        let err = registry
            .dispatcher::<Reserve>()
            .unwrap()
            .dispatch(
                Reserve {
                    sku: String::new(),
                    quantity: 0,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            DispatchError::Failed(Failure::Validation(failure)) => {
                assert_eq!(failure.errors().len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_domain_failure_propagates_unchanged() {
        let registry = registry_with(|r: Reserve, _| async move {
            Err(Failure::not_found("Sku", r.sku))
        });

        let err = registry
            .dispatcher::<Reserve>()
            .unwrap()
            .dispatch(
                Reserve {
                    sku: "kb-01".into(),
                    quantity: 1,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Failed(Failure::NotFound { ref id, .. }) if id == "kb-01"
        ));
    }

    #[tokio::test]
    async fn test_panic_is_coerced_to_internal() {
        let registry = registry_with(|_: Reserve, _| async move {
            if true {
                panic!("inventory table missing");
            }
            Ok(0)
        });

        let err = registry
            .dispatcher::<Reserve>()
            .unwrap()
            .dispatch(
                Reserve {
                    sku: "kb-01".into(),
                    quantity: 1,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            DispatchError::Failed(failure) => {
                assert_eq!(failure.kind(), FailureKind::Internal);
                assert!(failure.to_string().contains("inventory table missing"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_panic_before_first_poll_is_coerced_to_internal() {
        let registry = registry_with(|r: Reserve, _| {
            assert!(r.sku != "kb-01", "sku lookup table missing");
            async move { Ok(r.quantity) }
        });

        let err = registry
            .dispatcher::<Reserve>()
            .unwrap()
            .dispatch(
                Reserve {
                    sku: "kb-01".into(),
                    quantity: 1,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Failed(ref failure) if failure.kind() == FailureKind::Internal
        ));
    }

    #[tokio::test]
    async fn test_panicking_rule_is_coerced_to_internal() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let registry = HandlerRegistry::new();
        registry
            .register_command::<Reserve, _>(handler_fn(move |r: Reserve, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                async move { Ok(r.quantity) }
            }))
            .unwrap();
        registry
            .register_validator(RuleSet::new().rule(
                "sku",
                |r: &Reserve| r.sku.parse::<u32>().expect("numeric sku") > 0,
                "sku must be positive",
            ))
            .unwrap();

        let err = registry
            .dispatcher::<Reserve>()
            .unwrap()
            .dispatch(
                Reserve {
                    sku: "kb-01".into(),
                    quantity: 1,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            DispatchError::Failed(failure) => {
                assert_eq!(failure.kind(), FailureKind::Internal);
                assert!(failure.to_string().contains("validation of Reserve panicked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_from_failure() {
        let registry = registry_with(|_: Reserve, cancel: CancellationToken| async move {
            // Stand-in for an I/O wait that never completes on its own
            cancel.cancelled().await;
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        });
        let dispatcher = registry.dispatcher::<Reserve>().unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = dispatcher
            .dispatch(
                Reserve {
                    sku: "kb-01".into(),
                    quantity: 1,
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let registry = registry_with(move |r: Reserve, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            async move { Ok(r.quantity) }
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = registry
            .dispatcher::<Reserve>()
            .unwrap()
            .dispatch(
                Reserve {
                    sku: "kb-01".into(),
                    quantity: 1,
                },
                &cancel,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
