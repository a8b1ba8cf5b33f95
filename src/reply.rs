//! Handler return values and how they become a [`Response`].
//!
//! A handler returns anything that implements [`IntoReply`]. The resolver
//! then applies the first matching rule:
//!
//! | Reply | Written as |
//! |---|---|
//! | [`Response`] | as-is |
//! | [`JsonResponse`] | pretty JSON envelope, status taken from the envelope |
//! | [`View`] | rendered HTML plus `nosniff` / `DENY` security headers |
//! | scalar (string, number, bool) | incidental output followed by the value (`Display`, so `true`/`false`), plain text |
//! | nothing | incidental output alone, plain text |
//! | any other JSON value | pretty JSON |
//!
//! Incidental output (see [`Request::print`](crate::Request::print)) only
//! reaches the client through the two plain-text rules. Everywhere else it
//! is logged at `debug` and dropped.

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::response::{JsonResponse, Response};
use crate::status::Status;
use crate::view::View;

/// What a handler produced.
#[derive(Debug)]
pub enum Reply {
    Response(Response),
    Json(JsonResponse),
    View(View),
    Scalar(String),
    Value(Value),
    Empty,
}

/// Conversion into a [`Reply`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply { self }
}

impl IntoReply for Response {
    fn into_reply(self) -> Reply { Reply::Response(self) }
}

/// Return a [`Status`] directly from a handler: `return Ok(Status::NoContent)`
impl IntoReply for Status {
    fn into_reply(self) -> Reply { Reply::Response(Response::status(self)) }
}

impl IntoReply for JsonResponse {
    fn into_reply(self) -> Reply { Reply::Json(self) }
}

impl IntoReply for View {
    fn into_reply(self) -> Reply { Reply::View(self) }
}

impl IntoReply for Value {
    fn into_reply(self) -> Reply { Reply::Value(self) }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply { Reply::Empty }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply { Reply::Scalar(self) }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply { Reply::Scalar(self.to_owned()) }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        self.map_or(Reply::Empty, IntoReply::into_reply)
    }
}

macro_rules! scalar_replies {
    ($($ty:ty),*) => {
        $(impl IntoReply for $ty {
            fn into_reply(self) -> Reply { Reply::Scalar(self.to_string()) }
        })*
    };
}

scalar_replies!(bool, char, i32, i64, u16, u32, u64, usize, f32, f64);

/// Turns a handler's reply and its incidental output into the response to write.
pub(crate) fn resolve(reply: Reply, buffered: String) -> Result<Response, Error> {
    let reply = match reply {
        Reply::Value(Value::Null) => Reply::Empty,
        Reply::Value(Value::String(s)) => Reply::Scalar(s),
        Reply::Value(v @ (Value::Bool(_) | Value::Number(_))) => Reply::Scalar(v.to_string()),
        other => other,
    };

    let response = match reply {
        Reply::Response(response) => {
            discard(&buffered);
            response
        }
        Reply::Json(envelope) => {
            discard(&buffered);
            Response::builder()
                .code(envelope.status())
                .json(serde_json::to_vec_pretty(&envelope)?)
        }
        Reply::View(view) => {
            discard(&buffered);
            Response::builder()
                .header("x-content-type-options", "nosniff")
                .header("x-frame-options", "DENY")
                .html(view.render()?)
        }
        Reply::Scalar(value) => Response::text(buffered + &value),
        Reply::Empty => Response::text(buffered),
        Reply::Value(value) => {
            discard(&buffered);
            Response::json(serde_json::to_vec_pretty(&value)?)
        }
    };
    Ok(response)
}

fn discard(buffered: &str) {
    if !buffered.is_empty() {
        debug!(output = buffered, "dropping incidental output");
    }
}
