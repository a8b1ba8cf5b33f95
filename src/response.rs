//! Outgoing response type, its builder, and the structured JSON envelope.
//!
//! Handlers rarely build a [`Response`] by hand: they return a
//! [`Reply`](crate::Reply) and the resolver picks the representation. Build
//! one directly when you need full control over status and headers.

use std::io::{self, Write};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::Error;
use crate::status::{self, Status};

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    Csv,          // text/csv
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing response.
///
/// ```rust
/// use sprig::{ContentType, Response, Status};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(Status::NoContent);
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/users/42")
///     .bytes(ContentType::Xml, b"<ok/>".to_vec());
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    pub(crate) body: Vec<u8>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: u16,
}

impl Response {
    /// `200 OK` — `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::bytes_raw(ContentType::Json, body)
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::bytes_raw(ContentType::Text, body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self { body: Vec::new(), headers: Vec::new(), status: code.into() }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: Status::Ok.into() }
    }

    fn bytes_raw(content_type: ContentType, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.as_str().to_owned())],
            status: Status::Ok.into(),
        }
    }

    pub fn status_code(&self) -> u16 { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Writes the response in CGI form: a `Status` line, the headers, a blank
    /// line, then the body.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "Status: {} {}\r\n", self.status, status::reason(self.status))?;
        write!(writer, "content-length: {}\r\n", self.body.len())?;
        for (name, value) in &self.headers {
            write!(writer, "{name}: {value}\r\n")?;
        }
        writer.write_all(b"\r\n")?;
        writer.write_all(&self.body)?;
        writer.flush()
    }

    /// Converts into an [`http::Response`] for hosting inside another server.
    ///
    /// Headers that are not valid HTTP header names or values are dropped.
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut res = http::Response::new(Bytes::from(self.body));
        *res.status_mut() = http::StatusCode::from_u16(self.status)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

        for (name, value) in self.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
                (Ok(name), Ok(value)) => {
                    res.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid header"),
            }
        }
        res
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `Status::Ok` (200).
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.into();
        self
    }

    /// Sets a raw numeric status, for codes [`Status`] does not name.
    pub fn code(mut self, code: u16) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish(ContentType::Json, body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, body.into().into_bytes())
    }

    /// Terminate with an HTML body (`text/html; charset=utf-8`).
    pub fn html(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Html, body.into().into_bytes())
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: Vec<u8>) -> Response {
        self.finish(content_type, body)
    }

    /// Terminate with no body (e.g. `Status::NoContent`, `Status::MovedPermanently`).
    pub fn no_body(self) -> Response {
        Response { body: Vec::new(), headers: self.headers, status: self.status }
    }

    fn finish(self, content_type: ContentType, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.as_str().to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status }
    }
}

// ── JsonResponse ──────────────────────────────────────────────────────────────

/// The structured success envelope: `{"data": …, "message": …, "status": …}`.
///
/// The HTTP status of the written response is taken from the envelope.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JsonResponse {
    data: Value,
    message: String,
    status: u16,
}

impl JsonResponse {
    pub fn new(data: Value, message: impl Into<String>, status: Status) -> Self {
        Self { data, message: message.into(), status: status.into() }
    }

    /// Like [`new`](Self::new), serializing `data` first.
    pub fn from_serialize<T: Serialize>(
        data: &T,
        message: impl Into<String>,
        status: Status,
    ) -> Result<Self, Error> {
        Ok(Self::new(serde_json::to_value(data)?, message, status))
    }

    pub fn data(&self) -> &Value { &self.data }
    pub fn message(&self) -> &str { &self.message }
    pub fn status(&self) -> u16 { self.status }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cgi_output_format() {
        let res = Response::builder()
            .status(Status::NotFound)
            .header("x-trace", "abc")
            .text("gone");

        let mut out = Vec::new();
        res.write_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Status: 404 Not Found\r\n\
             content-length: 4\r\n\
             content-type: text/plain; charset=utf-8\r\n\
             x-trace: abc\r\n\
             \r\n\
             gone",
        );
    }

    #[test]
    fn converts_to_http() {
        let res = Response::builder()
            .status(Status::Created)
            .header("location", "/users/1")
            .header("bad header", "x")
            .json(b"{}".to_vec())
            .into_http();

        assert_eq!(res.status(), http::StatusCode::CREATED);
        assert_eq!(res.headers()["location"], "/users/1");
        assert_eq!(res.headers()["content-type"], "application/json");
        assert_eq!(res.headers().len(), 2);
        assert_eq!(res.body().as_ref(), b"{}");
    }

    #[test]
    fn envelope_serializes_in_field_order() {
        let env = JsonResponse::new(serde_json::json!([1, 2]), "Success", Status::Ok);
        assert_eq!(
            serde_json::to_string(&env).unwrap(),
            r#"{"data":[1,2],"message":"Success","status":200}"#,
        );
    }
}
