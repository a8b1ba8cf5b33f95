//! Route pattern compilation.
//!
//! A template such as `/api/v1/user/get/{userId}` is compiled into an
//! anchored regular expression where every `{name}` placeholder becomes a
//! capture of one or more non-`/` characters. Literal segments are copied
//! verbatim: route tables are written by the application, not by clients.
//! A literal segment may use regex syntax, but only non-capturing groups
//! (`(?:v1|v2)`), so every capture stays paired with a placeholder.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, ErrorKind};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(\w+)\}").unwrap_or_else(|e| panic!("placeholder regex: {e}"))
});

/// A compiled route template.
#[derive(Clone, Debug)]
pub struct Pattern {
    template: String,
    regex: Regex,
    param_names: Vec<String>,
}

impl Pattern {
    /// Compiles `template` into an anchored matcher and its ordered parameter names.
    pub fn compile(template: &str) -> Result<Self, Error> {
        let mut param_names = Vec::new();
        let body = PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
            param_names.push(caps[1].to_owned());
            "([^/]+)"
        });

        let invalid = |reason: String| {
            Error::new(ErrorKind::InvalidPattern { template: template.to_owned(), reason })
        };

        let regex = Regex::new(&format!("^{body}$")).map_err(|e| invalid(e.to_string()))?;

        // Group 0 is the whole match.
        let groups = regex.captures_len() - 1;
        if groups != param_names.len() {
            return Err(invalid(format!(
                "{groups} capture groups for {} placeholders",
                param_names.len(),
            )));
        }

        Ok(Self { template: template.to_owned(), regex, param_names })
    }

    pub fn template(&self) -> &str { &self.template }
    pub fn param_names(&self) -> &[String] { &self.param_names }

    /// Matches the whole of `path`, returning the captured parameters in
    /// declaration order.
    pub fn captures(&self, path: &str) -> Option<Params> {
        let caps = self.regex.captures(path)?;
        let pairs = self.param_names.iter()
            .zip(caps.iter().skip(1))
            .map(|(name, value)| {
                (name.clone(), value.map(|m| m.as_str().to_owned()).unwrap_or_default())
            })
            .collect();
        Some(Params(pairs))
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

/// Path parameters captured from a matched route, in declaration order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Captured values only, positionally aligned with the placeholders.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
