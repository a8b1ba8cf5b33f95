//! Ordered route table.
//!
//! Routes are tried in registration order and the first whose pattern
//! matches the path and whose method matches the request wins. There is no
//! specificity ranking: register `/user/me` before `/user/{id}` if both
//! should work. Build the table once at startup and hand it to
//! [`App::new`](crate::App::new).

use std::fmt;

use tracing::debug;

use crate::error::{Error, ErrorKind};
use crate::handler::Handler;
use crate::method::Method;
use crate::middleware::BoxedMiddleware;
use crate::pattern::{Params, Pattern};

/// A compiled route: method, pattern, handler and its middleware.
pub struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
    middlewares: Vec<BoxedMiddleware>,
}

impl Route {
    pub fn method(&self) -> Method { self.method }
    pub fn pattern(&self) -> &Pattern { &self.pattern }
    pub fn handler(&self) -> &Handler { &self.handler }

    /// Middleware in registration order; the first entry runs first.
    pub fn middlewares(&self) -> &[BoxedMiddleware] { &self.middlewares }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("template", &self.pattern.template())
            .field("handler", &self.handler)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// The application router.
///
/// Each registration call returns `self` so registrations chain naturally:
///
/// ```rust
/// # use sprig::{Router, func, middleware};
/// let router = Router::new()
///     .get("/", ("HomeController", "index"))
///     .group("/api/v1", |api| api
///         .get("/user/get/{userId}", ("UserController", "get"))
///         .get("/user/getlist", ("UserController", "getlist")))
///     .route(sprig::Method::Post, "/audit", func(|_, _| Ok(())), [middleware::trace()]);
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    prefix: String,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles the current group prefix plus `template` and appends the route.
    pub fn add_route(
        &mut self,
        template: &str,
        method: Method,
        handler: impl Into<Handler>,
        middlewares: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<(), Error> {
        let full = format!("{}{template}", self.prefix);
        let pattern = Pattern::compile(&full)?;
        debug!(%method, template = %full, "route registered");
        self.routes.push(Route {
            method,
            pattern,
            handler: handler.into(),
            middlewares: middlewares.into_iter().collect(),
        });
        Ok(())
    }

    /// Registers a handler with middleware. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if `template` does not compile; a broken route table is a
    /// startup bug.
    pub fn route(
        mut self,
        method: Method,
        template: &str,
        handler: impl Into<Handler>,
        middlewares: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Self {
        self.add_route(template, method, handler, middlewares)
            .unwrap_or_else(|e| panic!("invalid route `{template}`: {e}"));
        self
    }

    /// Registers a handler without middleware. Returns `self` for chaining.
    pub fn on(self, method: Method, template: &str, handler: impl Into<Handler>) -> Self {
        self.route(method, template, handler, [])
    }

    pub fn get(self, template: &str, handler: impl Into<Handler>) -> Self {
        self.on(Method::Get, template, handler)
    }

    pub fn post(self, template: &str, handler: impl Into<Handler>) -> Self {
        self.on(Method::Post, template, handler)
    }

    pub fn put(self, template: &str, handler: impl Into<Handler>) -> Self {
        self.on(Method::Put, template, handler)
    }

    pub fn delete(self, template: &str, handler: impl Into<Handler>) -> Self {
        self.on(Method::Delete, template, handler)
    }

    /// Registers everything `f` adds under `prefix`, on top of the current
    /// prefix. The previous prefix is restored afterwards, so sibling
    /// groups never see each other's prefixes.
    pub fn group(mut self, prefix: &str, f: impl FnOnce(Router) -> Router) -> Self {
        let previous = self.prefix.clone();
        self.prefix.push_str(prefix);
        let mut router = f(self);
        router.prefix = previous;
        router
    }

    /// All routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route matching both `path` and `method`.
    ///
    /// When some route matches the path but none the method, the failure is
    /// `MethodMismatch` naming the first path match's method.
    pub(crate) fn find(&self, method: Method, path: &str) -> Result<(&Route, Params), Error> {
        let mut expected = None;
        for route in &self.routes {
            let Some(params) = route.pattern.captures(path) else { continue };
            if route.method == method {
                return Ok((route, params));
            }
            expected.get_or_insert(route.method);
        }

        let kind = match expected {
            Some(expected) => ErrorKind::MethodMismatch { expected, actual: method },
            None => ErrorKind::RouteNotFound,
        };
        Err(Error::new(kind))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.routes).finish()
    }
}
