//! Middleware layer.
//!
//! Middleware wraps a route's handler and is the right place for
//! cross-cutting concerns: tracing, authentication-header inspection,
//! request validation. Each middleware receives the request and a [`Next`]
//! continuation and either calls [`Next::run`] to continue the chain or
//! returns its own reply to short-circuit it.
//!
//! Middlewares run in registration order: for `[auth, audit]` the order is
//! `auth`, `audit`, handler. If `auth` never calls `next.run()`, neither
//! `audit` nor the handler runs.
//!
//! ```rust
//! use sprig::middleware;
//! use sprig::{IntoReply, Status};
//!
//! let auth = middleware::from_fn(|req, next| {
//!     match req.server("HTTP_AUTHORIZATION") {
//!         Some(_) => next.run(),
//!         None => Ok(Status::Unauthorized.into_reply()),
//!     }
//! });
//! ```

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::error::Error;
use crate::reply::Reply;
use crate::request::Request;

/// The rest of the chain.
///
/// Consumed by [`run`](Next::run): a continuation can be invoked at most once.
pub struct Next<'a> {
    inner: Box<dyn FnOnce() -> Result<Reply, Error> + 'a>,
}

impl<'a> Next<'a> {
    pub(crate) fn new(f: impl FnOnce() -> Result<Reply, Error> + 'a) -> Self {
        Self { inner: Box::new(f) }
    }

    /// Runs the remaining middleware and the handler.
    pub fn run(self) -> Result<Reply, Error> {
        (self.inner)()
    }
}

/// A request interceptor.
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: &Request, next: Next<'_>) -> Result<Reply, Error>;
}

/// A shared, type-erased middleware. One instance can sit on many routes.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Adapts a closure into a [`Middleware`].
pub fn from_fn<F>(f: F) -> BoxedMiddleware
where
    F: Fn(&Request, Next<'_>) -> Result<Reply, Error> + Send + Sync + 'static,
{
    Arc::new(FromFn(f))
}

struct FromFn<F>(F);

impl<F> Middleware for FromFn<F>
where
    F: Fn(&Request, Next<'_>) -> Result<Reply, Error> + Send + Sync + 'static,
{
    fn handle(&self, req: &Request, next: Next<'_>) -> Result<Reply, Error> {
        (self.0)(req, next)
    }
}

/// Logs one line per request with method, path, outcome and latency.
pub fn trace() -> BoxedMiddleware {
    from_fn(|req, next| {
        let start = Instant::now();
        let result = next.run();
        info!(
            method = %req.method(),
            path = req.path(),
            ok = result.is_ok(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "request",
        );
        result
    })
}

/// Composes `middlewares` around `terminal`, right to left, so the first
/// registered middleware is the outermost.
pub(crate) fn chain<'a>(
    middlewares: &'a [BoxedMiddleware],
    req: &'a Request,
    terminal: Next<'a>,
) -> Next<'a> {
    middlewares.iter().rev().fold(terminal, |next, mw| {
        Next::new(move || mw.handle(req, next))
    })
}
