//! Application context, dispatcher and error boundary.
//!
//! An [`App`] owns everything a request can reach: the route table, the
//! container, the views and the controller registry. Build it once at
//! startup; [`App::dispatch`] only needs `&self`, so one `App` serves every
//! request for the life of the process.
//!
//! One dispatch is synchronous and single-pass:
//!
//! ```text
//! Request ─► Router::find ─► middleware chain ─► handler ─► resolve ─► Response
//!                 │                  │               │          │
//!                 └──────────────────┴───── Error ───┴──────────┘
//!                                             │
//!                                   error boundary ─► error Response
//! ```

use std::any::Any;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::container::Container;
use crate::controller::Controllers;
use crate::error::Error;
use crate::middleware::{self, Next};
use crate::reply::resolve;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::view::{View, Views};

/// How the error boundary renders failures.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ErrorFormat {
    /// `{"data": null, "message": …, "error_line": …, "code": …}`
    #[default]
    Json,
    /// The `_errors/<code>.html` page from the app's [`Views`].
    Html,
}

/// The application.
pub struct App {
    router: Router,
    container: Container,
    views: Views,
    controllers: Controllers,
    error_format: ErrorFormat,
}

impl App {
    /// An application over `router`, with an empty container, no
    /// controllers, views under `./views` and JSON error responses.
    pub fn new(router: Router) -> Self {
        Self {
            router,
            container: Container::new(),
            views: Views::new("views"),
            controllers: Controllers::new(),
            error_format: ErrorFormat::default(),
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    pub fn with_views(mut self, views: Views) -> Self {
        self.views = views;
        self
    }

    pub fn with_controllers(mut self, controllers: Controllers) -> Self {
        self.controllers = controllers;
        self
    }

    pub fn with_error_format(mut self, format: ErrorFormat) -> Self {
        self.error_format = format;
        self
    }

    pub fn router(&self) -> &Router { &self.router }
    pub fn container(&self) -> &Container { &self.container }
    pub fn views(&self) -> &Views { &self.views }
    pub fn controllers(&self) -> &Controllers { &self.controllers }

    /// Shorthand for `app.views().view(path, data)`.
    pub fn view(&self, path: &str, data: Value) -> View {
        self.views.view(path, data)
    }

    /// Routes `req` and runs its handler, without the error boundary.
    pub fn try_dispatch(&self, mut req: Request) -> Result<Response, Error> {
        let (route, params) = self.router.find(req.method(), req.path())?;
        debug!(
            method = %req.method(),
            path = req.path(),
            route = route.pattern().template(),
            "route matched",
        );
        req.set_params(params);

        let terminal = Next::new(|| route.handler().invoke(&req, self));
        let reply = middleware::chain(route.middlewares(), &req, terminal).run()?;
        resolve(reply, req.take_output())
    }

    /// Dispatches `req` and always produces a response.
    ///
    /// Any failure, including a panic in a handler or middleware, is logged
    /// and replaced by a single error response. Incidental output from the
    /// failed dispatch is discarded.
    pub fn dispatch(&self, req: Request) -> Response {
        let method = req.method();
        let path = req.path().to_owned();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.try_dispatch(req)))
            .unwrap_or_else(|payload| Err(Error::handler(panic_message(&*payload))));

        match outcome {
            Ok(response) => response,
            Err(err) => {
                error!(%method, path = %path, code = err.code(), "dispatch failed: {err}");
                self.error_response(&err)
            }
        }
    }

    /// Dispatches `req` and writes the response to `out`.
    pub fn dispatch_to<W: Write>(&self, req: Request, out: &mut W) -> io::Result<()> {
        self.dispatch(req).write_to(out)
    }

    fn error_response(&self, err: &Error) -> Response {
        let code = err.code();
        if self.error_format == ErrorFormat::Html {
            match self.views.errors(code, err).render() {
                Ok(page) => {
                    return Response::builder()
                        .code(code)
                        .header("x-content-type-options", "nosniff")
                        .header("x-frame-options", "DENY")
                        .html(page);
                }
                Err(e) => warn!("error page failed to render, falling back to JSON: {e}"),
            }
        }
        Response::builder().code(code).json(err.payload().to_json())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("container", &self.container)
            .field("views", &self.views)
            .field("controllers", &self.controllers)
            .field("error_format", &self.error_format)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
