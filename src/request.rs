//! Incoming request context and the builders that produce it.
//!
//! A [`Request`] is created fresh for every dispatch. Handlers only read it;
//! the dispatcher sets the matched route's [`Params`] once before the
//! middleware chain runs. Incidental output written with [`Request::print`]
//! is kept apart from the handler's return value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::{self, Write as _};
use std::io::{self, Read};

use bytes::Bytes;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::Error;
use crate::method::Method;
use crate::pattern::Params;
use crate::view::escape_html;

/// An incoming request.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: HashMap<String, String>,
    pub(crate) form: HashMap<String, String>,
    pub(crate) files: Vec<UploadedFile>,
    pub(crate) json: Value,
    pub(crate) server: HashMap<String, String>,
    pub(crate) params: Params,
    output: RefCell<String>,
}

/// The request inputs, as named by [`Request::data`] and [`Request::has_data`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Input {
    Query,
    Form,
    Files,
    Json,
    Server,
}

/// A file part of a `multipart/form-data` body.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadedFile {
    field: String,
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// The form field the file was sent under.
    pub fn field(&self) -> &str { &self.field }

    /// The client-supplied file name. Not sanitized.
    pub fn file_name(&self) -> &str { &self.file_name }
    pub fn content_type(&self) -> Option<&str> { self.content_type.as_deref() }
    pub fn data(&self) -> &Bytes { &self.data }
    pub fn size(&self) -> usize { self.data.len() }
}

impl Request {
    /// Starts building a request for `method` on `path`.
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.into(),
            query: HashMap::new(),
            form: HashMap::new(),
            files: Vec::new(),
            json: Value::Null,
            server: HashMap::new(),
        }
    }

    /// Builds a request from CGI-style variables and the raw request body.
    ///
    /// The dispatched URI is the `route` query parameter, `/` when absent.
    /// `application/x-www-form-urlencoded` bodies fill [`form`](Self::form),
    /// `multipart/form-data` bodies fill the form and [`files`](Self::files),
    /// `application/json` bodies fill [`json`](Self::json). Every variable is
    /// kept as a server variable.
    pub fn from_cgi<I, K, V>(vars: I, body: &[u8]) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let server: HashMap<String, String> = vars.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let method = match server.get("REQUEST_METHOD") {
            Some(m) => m.parse::<Method>()?,
            None => Method::Get,
        };

        let query: HashMap<String, String> = server.get("QUERY_STRING")
            .map(|qs| decode_pairs(qs.as_bytes()))
            .unwrap_or_default();

        let path = query.get("route")
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .unwrap_or("/")
            .to_owned();

        let content_type = server.get("CONTENT_TYPE").map(String::as_str).unwrap_or("");
        let mut builder = Self::builder(method, path);

        if content_type.starts_with("application/x-www-form-urlencoded") {
            builder.form = decode_pairs(body);
        } else if content_type.starts_with("multipart/form-data") {
            let (form, files) = read_multipart(content_type, body)?;
            builder.form = form;
            builder.files = files;
        } else if content_type.starts_with("application/json") && !body.is_empty() {
            builder.json = serde_json::from_slice(body).unwrap_or_else(|e| {
                debug!("ignoring malformed JSON body: {e}");
                Value::Null
            });
        }

        builder.query = query;
        builder.server = server;
        Ok(builder.build())
    }

    /// Builds a request from the process environment and standard input,
    /// the way a CGI program receives it.
    pub fn from_env() -> Result<Self, Error> {
        let vars: Vec<(String, String)> = std::env::vars().collect();
        let length = vars.iter()
            .find(|(k, _)| k == "CONTENT_LENGTH")
            .and_then(|(_, v)| v.trim().parse::<u64>().ok())
            .unwrap_or(0);

        let mut body = Vec::new();
        if length > 0 {
            io::stdin().lock().take(length).read_to_end(&mut body)?;
        }
        Self::from_cgi(vars, &body)
    }

    pub fn method(&self) -> Method { self.method }

    /// The URI being dispatched.
    pub fn path(&self) -> &str { &self.path }
    pub fn json(&self) -> &Value { &self.json }
    pub fn params(&self) -> &Params { &self.params }

    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn form(&self, key: &str) -> Option<&str> {
        self.form.get(key).map(String::as_str)
    }

    pub fn server(&self, key: &str) -> Option<&str> {
        self.server.get(key).map(String::as_str)
    }

    pub fn query_map(&self) -> &HashMap<String, String> { &self.query }
    pub fn form_map(&self) -> &HashMap<String, String> { &self.form }
    pub fn server_map(&self) -> &HashMap<String, String> { &self.server }
    pub fn files(&self) -> &[UploadedFile] { &self.files }

    /// The first file uploaded under form field `field`.
    pub fn file(&self, field: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|f| f.field == field)
    }

    /// One input as JSON: an object of strings for the query, the form and
    /// the server variables, the body for [`Input::Json`], and file metadata
    /// (`field`, `file_name`, `content_type`, `size`) for [`Input::Files`].
    pub fn data(&self, input: Input) -> Value {
        let strings = |map: &HashMap<String, String>| {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect::<Map<_, _>>())
        };
        match input {
            Input::Query => strings(&self.query),
            Input::Form => strings(&self.form),
            Input::Server => strings(&self.server),
            Input::Json => self.json.clone(),
            Input::Files => self.files.iter()
                .map(|f| json!({
                    "field": f.field,
                    "file_name": f.file_name,
                    "content_type": f.content_type,
                    "size": f.size(),
                }))
                .collect(),
        }
    }

    /// Whether `input` carries anything.
    pub fn has_data(&self, input: Input) -> bool {
        match input {
            Input::Query => !self.query.is_empty(),
            Input::Form => !self.form.is_empty(),
            Input::Server => !self.server.is_empty(),
            Input::Files => !self.files.is_empty(),
            Input::Json => match &self.json {
                Value::Null => false,
                Value::Object(fields) => !fields.is_empty(),
                Value::Array(items) => !items.is_empty(),
                _ => true,
            },
        }
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Writes incidental output. Only plain-text replies include it; see
    /// [`Reply`](crate::Reply).
    pub fn print(&self, text: impl fmt::Display) {
        // Writing into a String cannot fail.
        let _ = write!(self.output.borrow_mut(), "{text}");
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    pub(crate) fn take_output(&self) -> String {
        self.output.take()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Fluent builder for [`Request`].
///
/// String input from the query, the form and the JSON body is sanitized on
/// [`build`](Self::build): trimmed, with HTML special characters escaped.
pub struct RequestBuilder {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    files: Vec<UploadedFile>,
    json: Value,
    server: HashMap<String, String>,
}

impl RequestBuilder {
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }

    pub fn file(mut self, file: UploadedFile) -> Self {
        self.files.push(file);
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = body;
        self
    }

    pub fn server(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.server.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            query: sanitize_map(self.query),
            form: sanitize_map(self.form),
            files: self.files,
            json: sanitize_value(self.json),
            server: self.server,
            params: Params::default(),
            output: RefCell::new(String::new()),
        }
    }
}

fn decode_pairs(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}

/// Splits a multipart body into its text fields and its file parts.
fn read_multipart(
    content_type: &str,
    body: &[u8],
) -> Result<(HashMap<String, String>, Vec<UploadedFile>), Error> {
    let boundary = multer::parse_boundary(content_type)?;
    let chunk = Bytes::copy_from_slice(body);
    let mut multipart = multer::Multipart::new(
        futures::stream::iter([Ok::<_, Infallible>(chunk)]),
        boundary,
    );

    futures::executor::block_on(async move {
        let mut form = HashMap::new();
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let content_type = field.content_type().map(|m| m.to_string());
                    let data = field.bytes().await?;
                    files.push(UploadedFile { field: name, file_name, content_type, data });
                }
                None => {
                    form.insert(name, field.text().await?);
                }
            }
        }
        Ok::<_, Error>((form, files))
    })
}

fn sanitize(s: &str) -> String {
    escape_html(s.trim())
}

fn sanitize_map(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter().map(|(k, v)| (k, sanitize(&v))).collect()
}

fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(fields) => Value::Object(
            fields.into_iter().map(|(k, v)| (k, sanitize_value(v))).collect(),
        ),
        other => other,
    }
}
