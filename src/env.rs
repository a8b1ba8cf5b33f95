//! `.env` configuration files.
//!
//! One `KEY=VALUE` per line. Keys and values are trimmed, the value is
//! everything after the first `=`. Blank lines, `#` comments and lines
//! without `=` are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::Error;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Env {
    vars: BTreeMap<String, String>,
}

impl Env {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&content))
    }

    pub fn parse(content: &str) -> Self {
        let mut vars = BTreeMap::new();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    vars.insert(key.trim().to_owned(), value.trim().to_owned());
                }
                None => warn!(line = n + 1, "skipping malformed .env line"),
            }
        }
        Self { vars }
    }

    pub fn all(&self) -> &BTreeMap<String, String> { &self.vars }

    pub fn key(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Exports every variable into the process environment.
    ///
    /// # Safety
    ///
    /// Same contract as [`std::env::set_var`]: no other thread may read or
    /// write the environment while this runs. Call it first thing in `main`.
    pub unsafe fn apply(&self) {
        for (k, v) in &self.vars {
            // SAFETY: upheld by the caller.
            unsafe { std::env::set_var(k, v) };
        }
    }
}
