//! Route handlers.
//!
//! A route points at one of two things:
//!
//! - an [`Action`]: a controller name plus an action name, resolved at
//!   dispatch time through the [`Controllers`](crate::Controllers) registry;
//! - a closure, wrapped with [`func`].
//!
//! ```text
//! |req, app| { … }                                  ← user writes this
//!        ↓ func(…)
//! Arc::new(FnHandler(closure))                      ← heap-allocated wrapper
//!        ↓  stored as Handler::Closure(BoxedHandler)
//! handler.call(&req, &app)  at dispatch time        ← one vtable dispatch
//!        ↓
//! closure(&req, &app).map(IntoReply::into_reply)
//! ```

use std::fmt;
use std::sync::Arc;

use crate::app::App;
use crate::error::Error;
use crate::reply::{IntoReply, Reply};
use crate::request::Request;

/// Internal dispatch interface for closure handlers.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// public [`Handler`] enum.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: &Request, app: &App) -> Result<Reply, Error>;
}

/// A type-erased closure handler, shared by every request that reaches it.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// What a route invokes.
#[derive(Clone)]
pub enum Handler {
    Action(Action),
    Closure(BoxedHandler),
}

impl Handler {
    pub(crate) fn invoke(&self, req: &Request, app: &App) -> Result<Reply, Error> {
        match self {
            Self::Action(action) => app.controllers().invoke(action, req, app),
            Self::Closure(handler) => handler.call(req, app),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => fmt::Debug::fmt(action, f),
            Self::Closure(_) => f.write_str("Closure"),
        }
    }
}

/// A named controller action, e.g. `Action::new("UserController", "get")`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Action {
    controller: String,
    action: String,
}

impl Action {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self { controller: controller.into(), action: action.into() }
    }

    pub fn controller(&self) -> &str { &self.controller }
    pub fn action(&self) -> &str { &self.action }
}

impl From<Action> for Handler {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

/// `("UserController", "get")` is shorthand for `Action::new("UserController", "get")`.
impl From<(&str, &str)> for Handler {
    fn from((controller, action): (&str, &str)) -> Self {
        Self::Action(Action::new(controller, action))
    }
}

/// Wraps a closure as a route handler.
///
/// The closure receives the request (path parameters via
/// [`Request::param`]) and the application, through which it reaches the
/// container and the views.
///
/// ```rust
/// use sprig::{Router, func};
///
/// let router = Router::new().get("/user/{id}", func(|req, _app| {
///     Ok(format!("user {}", req.param("id").unwrap_or_default()))
/// }));
/// ```
pub fn func<F, R>(f: F) -> Handler
where
    F: Fn(&Request, &App) -> Result<R, Error> + Send + Sync + 'static,
    R: IntoReply,
{
    Handler::Closure(Arc::new(FnHandler(f)))
}

/// Newtype wrapper that holds a concrete closure `F` and implements
/// [`ErasedHandler`], bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, R> ErasedHandler for FnHandler<F>
where
    F: Fn(&Request, &App) -> Result<R, Error>,
    R: IntoReply,
{
    fn call(&self, req: &Request, app: &App) -> Result<Reply, Error> {
        (self.0)(req, app).map(IntoReply::into_reply)
    }
}
