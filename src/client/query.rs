//! Canonical query-string encoding.
//!
//! The server recomputes the request signature over the query string it
//! receives, so the encoding has to match its `querystring` encoder byte for
//! byte:
//!
//! - keys are emitted in sorted order
//! - `A-Z a-z 0-9 - _ . ! ~ * ' ( )` are left as-is, everything else is
//!   percent-encoded as UTF-8 with upper-case hex (space becomes `%20`)
//! - arrays become repeated keys, empty arrays are skipped
//! - `null` and nested containers encode as an empty value
//!
//! ```text
//! {b: "x y", a: [1, 2], c: null}  =>  a=1&a=2&b=x%20y&c=
//! ```

use std::collections::btree_map;
use std::collections::BTreeMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Characters that are percent-encoded in keys and values.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Query parameters for a request.
///
/// Keys are kept sorted, so two `Params` built from the same pairs in a
/// different order encode identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a parameter, returning the previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    /// Encode the parameters as a canonical query string (without `?`).
    pub fn encode(&self) -> String {
        let mut fields: Vec<String> = Vec::with_capacity(self.0.len());

        for (key, value) in &self.0 {
            let key = escape(key);
            match value {
                Value::Array(items) => {
                    for item in items {
                        fields.push(format!("{}={}", key, escape(&stringify_scalar(item))));
                    }
                }
                other => fields.push(format!("{}={}", key, escape(&stringify_scalar(other)))),
            }
        }

        fields.join("&")
    }

    /// Rebuild parameters from decoded query pairs.
    ///
    /// Repeated keys collapse into an array in the order they appear, which
    /// re-encodes to the same canonical string.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in pairs {
            grouped.entry(key.into()).or_default().push(value.into());
        }

        let map = grouped
            .into_iter()
            .map(|(key, mut values)| {
                let value = if values.len() == 1 {
                    Value::String(values.remove(0))
                } else {
                    Value::Array(values.into_iter().map(Value::String).collect())
                };
                (key, value)
            })
            .collect();

        Params(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V> Extend<(K, V)> for Params
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn escape(input: &str) -> String {
    utf8_percent_encode(input, QUERY_ESCAPE).to_string()
}

/// Render a scalar the way the server's encoder does; containers and null
/// render as the empty string.
fn stringify_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => stringify_number(n),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn stringify_number(n: &Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        // Whole floats print without a fractional part (1.0 => "1")
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
