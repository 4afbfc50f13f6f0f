//! Query strings in the server's bracket convention: nested maps become
//! `parent[child]=value`, with the brackets percent-encoded.

use crate::models::PreferenceValue;

const BRACKET_OPEN: &str = "%5B";
const BRACKET_CLOSE: &str = "%5D";

pub struct QueryBuilder {
    path: String,
    params: Vec<(String, PreferenceValue)>,
}

impl QueryBuilder {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter. Repeating a key emits it repeatedly, which is how
    /// several `location` values are sent.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<PreferenceValue>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, PreferenceValue)>,
        K: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(key, value)| (key.into(), value)));
        self
    }

    pub fn build(&self) -> String {
        let pairs = flatten(&self.params);
        if pairs.is_empty() {
            return self.path.clone();
        }
        let query = pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Walks the parameter tree into `(key, raw value)` pairs. Keys already carry
/// their encoded bracket prefix; values are left unencoded.
pub fn flatten<'a, I>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = &'a (String, PreferenceValue)>,
{
    let mut pairs = Vec::new();
    for (key, value) in params {
        walk(&mut pairs, None, key, value);
    }
    pairs
}

fn walk(pairs: &mut Vec<(String, String)>, parent: Option<&str>, key: &str, value: &PreferenceValue) {
    let key = if key == "the_type" { "type" } else { key };
    let name = match parent {
        Some(parent) => format!("{parent}{BRACKET_OPEN}{key}{BRACKET_CLOSE}"),
        None => key.to_string(),
    };
    match value {
        PreferenceValue::Nested(children) => {
            for (child_key, child) in children {
                walk(pairs, Some(key), child_key, child);
            }
        }
        scalar => {
            if let Some(raw) = scalar.scalar() {
                pairs.push((name, raw));
            }
        }
    }
}
