//! HTML view rendering.
//!
//! Templates are plain files under a root directory. `{{ key }}` is replaced
//! with the HTML-escaped value of `key` in the view's data; dotted keys
//! (`{{ user.name }}`) reach into nested objects. Unknown keys render empty.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Value, json};

use crate::error::{Error, ErrorKind};
use crate::status;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").unwrap_or_else(|e| panic!("template tag regex: {e}"))
});

const ERRORS_DIR: &str = "_errors";

const GENERIC_ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{{ code }} - {{ reason }}</title>
</head>
<body>
    <h1>{{ code }}</h1>
    <p>{{ message }}</p>
    <p><a href="/">Back to Home</a></p>
</body>
</html>
"#;

/// Locates templates under a root directory.
#[derive(Clone, Debug)]
pub struct Views {
    root: PathBuf,
}

impl Views {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A view of the template at `path`, relative to the root.
    pub fn view(&self, path: &str, data: Value) -> View {
        View {
            source: Source::Files { candidates: vec![self.root.join(path)], fallback: None },
            data,
        }
    }

    /// The error page for `code`: `_errors/<code>.html`, else
    /// `_errors/500.html`, else a built-in generic page.
    pub fn errors(&self, code: u16, error: &Error) -> View {
        let dir = self.root.join(ERRORS_DIR);
        View {
            source: Source::Files {
                candidates: vec![dir.join(format!("{code}.html")), dir.join("500.html")],
                fallback: Some(GENERIC_ERROR_PAGE),
            },
            data: json!({
                "code": code,
                "reason": status::reason(code),
                "message": error.to_string(),
                "error_line": error.line(),
            }),
        }
    }
}

/// A template plus the data it is rendered with.
#[derive(Clone, Debug)]
pub struct View {
    source: Source,
    data: Value,
}

#[derive(Clone, Debug)]
enum Source {
    Inline(String),
    Files { candidates: Vec<PathBuf>, fallback: Option<&'static str> },
}

impl View {
    /// A view over an in-memory template.
    pub fn inline(template: impl Into<String>, data: Value) -> Self {
        Self { source: Source::Inline(template.into()), data }
    }

    pub fn data(&self) -> &Value { &self.data }

    pub fn render(&self) -> Result<String, Error> {
        let template = match &self.source {
            Source::Inline(t) => t.clone(),
            Source::Files { candidates, fallback } => load(candidates, *fallback)?,
        };
        Ok(substitute(&template, &self.data))
    }
}

fn load(candidates: &[PathBuf], fallback: Option<&'static str>) -> Result<String, Error> {
    let mut last = None;
    for path in candidates {
        match fs::read_to_string(path) {
            Ok(s) => return Ok(s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => last = Some((path, e)),
            Err(source) => return Err(Error::new(ErrorKind::View { path: path.clone(), source })),
        }
    }

    match (fallback, last) {
        (Some(page), _) => Ok(page.to_owned()),
        (None, Some((path, source))) => Err(Error::new(ErrorKind::View { path: path.clone(), source })),
        (None, None) => Err(Error::new(ErrorKind::View {
            path: PathBuf::new(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })),
    }
}

fn substitute(template: &str, data: &Value) -> String {
    TAG.replace_all(template, |caps: &Captures| {
        let pointer = format!("/{}", caps[1].replace('.', "/"));
        match data.pointer(&pointer) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => escape_html(s),
            Some(other) => escape_html(&other.to_string()),
        }
    })
    .into_owned()
}

/// Escapes the five HTML special characters.
pub(crate) fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&'  => out.push_str("&amp;"),
            '<'  => out.push_str("&lt;"),
            '>'  => out.push_str("&gt;"),
            '"'  => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c    => out.push(c),
        }
    }
    out
}
