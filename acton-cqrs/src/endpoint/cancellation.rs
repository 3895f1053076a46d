//! Per-request cancellation signal

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio_util::sync::CancellationToken;

/// Extractor yielding the request's cancellation token
///
/// When an upstream layer placed a [`CancellationToken`] in the request
/// extensions (for example `axum::Extension(shutdown_token)`), the request
/// gets a child of it, so cancelling the parent cancels every in-flight
/// request. Otherwise a fresh token is created.
///
/// Bound endpoints cancel this token when the request future is dropped,
/// which is how a client disconnect reaches the handler.
#[derive(Debug, Clone, Default)]
pub struct RequestCancellation(CancellationToken);

impl RequestCancellation {
    /// The token handed to the dispatcher
    pub fn token(&self) -> &CancellationToken {
        &self.0
    }

    /// Consume into the token
    pub fn into_token(self) -> CancellationToken {
        self.0
    }
}

impl<S> FromRequestParts<S> for RequestCancellation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .extensions
            .get::<CancellationToken>()
            .map(CancellationToken::child_token)
            .unwrap_or_else(CancellationToken::new);

        Ok(Self(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_fresh_token_without_upstream() {
        let (mut parts, ()) = Request::new(()).into_parts();
        let cancellation = RequestCancellation::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(!cancellation.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_child_of_upstream_token() {
        let upstream = CancellationToken::new();
        let mut request = Request::new(());
        request.extensions_mut().insert(upstream.clone());
        let (mut parts, ()) = request.into_parts();

        let cancellation = RequestCancellation::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        upstream.cancel();
        assert!(cancellation.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelling_request_leaves_upstream_alone() {
        let upstream = CancellationToken::new();
        let mut request = Request::new(());
        request.extensions_mut().insert(upstream.clone());
        let (mut parts, ()) = request.into_parts();

        let cancellation = RequestCancellation::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        cancellation.token().cancel();
        assert!(!upstream.is_cancelled());
    }
}
