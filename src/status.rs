//! HTTP status codes as a typed enum.
//!
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, [`JsonResponse::new`](crate::JsonResponse::new),
//! or as a bare handler return value.
//!
//! ```rust
//! use sprig::{JsonResponse, Response, Status};
//! use serde_json::json;
//!
//! // status-only, no body
//! Response::status(Status::NoContent);
//!
//! // the structured JSON envelope carries its own status
//! JsonResponse::new(json!({"id": 42}), "Created", Status::Created);
//! ```

/// The status codes an application built on sprig is expected to emit.
#[allow(clippy::enum_variant_names)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Status {
    // ── 1xx Informational ─────────────────────────────────────────────────────
    Continue,                      // 100
    SwitchingProtocols,            // 101

    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                            // 200
    Created,                       // 201
    Accepted,                      // 202
    NoContent,                     // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,              // 301
    Found,                         // 302
    NotModified,                   // 304

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,                    // 400
    Unauthorized,                  // 401
    Forbidden,                     // 403
    NotFound,                      // 404
    MethodNotAllowed,              // 405
    UnprocessableEntity,           // 422

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,           // 500
    NotImplemented,                // 501
    BadGateway,                    // 502
    ServiceUnavailable,            // 503
}

impl Status {
    pub fn as_u16(self) -> u16 {
        self.into()
    }
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Continue            => 100,
            Status::SwitchingProtocols  => 101,
            Status::Ok                  => 200,
            Status::Created             => 201,
            Status::Accepted            => 202,
            Status::NoContent           => 204,
            Status::MovedPermanently    => 301,
            Status::Found               => 302,
            Status::NotModified         => 304,
            Status::BadRequest          => 400,
            Status::Unauthorized        => 401,
            Status::Forbidden           => 403,
            Status::NotFound            => 404,
            Status::MethodNotAllowed    => 405,
            Status::UnprocessableEntity => 422,
            Status::InternalServerError => 500,
            Status::NotImplemented      => 501,
            Status::BadGateway          => 502,
            Status::ServiceUnavailable  => 503,
        }
    }
}

/// Canonical reason phrase for a numeric code, empty when unknown.
pub(crate) fn reason(code: u16) -> &'static str {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}
