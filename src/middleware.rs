//! A `reqwest` middleware that sends every request through a [`Turnstile`].

use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result as MiddlewareResult};
use std::sync::Arc;

use crate::turnstile::Turnstile;

/// Paces outgoing requests with a shared [`Turnstile`].
///
/// Each request passes the turnstile before it is sent, so it is subject to
/// the turnstile's rate and to any hard block. Clones share the same
/// turnstile, and the turnstile stays reachable for starting, blocking and
/// observation through [`turnstile`](Self::turnstile).
///
/// # Example
///
/// ```rust,no_run
/// use reqwest_middleware::ClientBuilder;
/// use turnstile_gate::{Turnstile, TurnstileMiddleware};
///
/// # async fn example() {
/// let turnstile = Turnstile::builder().rate("50/s".parse().unwrap()).build();
/// turnstile.start().unwrap();
/// let middleware = TurnstileMiddleware::new(turnstile);
///
/// let client = ClientBuilder::new(reqwest::Client::new())
///     .with(middleware.clone())
///     .build();
///
/// client.get("https://api.example.com/items").send().await.unwrap();
/// let observed = middleware.turnstile().observer().adaptive_rate().unwrap();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TurnstileMiddleware {
    turnstile: Arc<Turnstile>,
}

impl TurnstileMiddleware {
    #[must_use]
    pub fn new(turnstile: Turnstile) -> Self {
        Self::shared(Arc::new(turnstile))
    }

    /// Wrap a turnstile that other callers also pass through.
    #[must_use]
    pub fn shared(turnstile: Arc<Turnstile>) -> Self {
        Self { turnstile }
    }

    pub fn turnstile(&self) -> &Arc<Turnstile> {
        &self.turnstile
    }
}

#[async_trait]
impl Middleware for TurnstileMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> MiddlewareResult<Response> {
        let _event = self.turnstile.pass().await;

        #[cfg(feature = "tracing")]
        tracing::trace!(event = _event, url = %req.url(), "request admitted");

        next.run(req, extensions).await
    }
}
