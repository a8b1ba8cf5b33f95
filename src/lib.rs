//! # sprig
//!
//! A minimal request-routing and dependency-injection micro-framework.
//! One request in, one response out.
//!
//! ## The contract
//!
//! sprig does not own a socket. Something else, a CGI host, a test, or a
//! server you already run, hands it a [`Request`] and writes the
//! [`Response`] it gets back. What is left for sprig:
//!
//! - Ordered routing: `{name}` segments, prefix groups, first match wins
//! - Middleware: forward-ordered, each able to short-circuit
//! - A container for lazily built dependencies
//! - Reply resolution: JSON envelopes, HTML views, plain text
//! - One error boundary that turns every failure into one structured response
//!
//! ## Quick start
//!
//! ```rust
//! use serde_json::json;
//! use sprig::{App, JsonResponse, Method, Request, Router, Status, func};
//!
//! let router = Router::new()
//!     .get("/", func(|_req, _app| Ok("home")))
//!     .group("/api/v1", |api| api
//!         .get("/user/get/{userId}", func(|req, _app| {
//!             let id = req.param("userId").unwrap_or_default();
//!             Ok(JsonResponse::new(json!({"id": id}), "Success", Status::Ok))
//!         })));
//!
//! let app = App::new(router);
//!
//! let res = app.dispatch(Request::builder(Method::Get, "/api/v1/user/get/7").build());
//! assert_eq!(res.status_code(), 200);
//!
//! let res = app.dispatch(Request::builder(Method::Get, "/missing").build());
//! assert_eq!(res.status_code(), 404);
//! ```

mod app;
mod container;
mod controller;
mod env;
mod error;
mod handler;
mod method;
mod pattern;
mod reply;
mod request;
mod response;
mod router;
mod security;
mod status;
mod view;

pub mod middleware;

pub use app::{App, ErrorFormat};
pub use container::Container;
pub use controller::{Controller, Controllers, Registration};
pub use env::Env;
pub use error::{Error, ErrorKind, ErrorPayload};
pub use handler::{Action, Handler, func};
pub use method::Method;
pub use pattern::{Params, Pattern};
pub use reply::{IntoReply, Reply};
pub use request::{Input, Request, RequestBuilder, UploadedFile};
pub use response::{ContentType, JsonResponse, Response, ResponseBuilder};
pub use router::{Route, Router};
pub use security::{clean_html, csrf_token};
pub use status::Status;
pub use view::{View, Views};
