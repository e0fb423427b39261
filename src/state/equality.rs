//! Change detection policies for the two-way binding.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// How a binding decides whether an incoming value differs from the one it
/// already holds.
#[derive(Clone, Default)]
pub enum Equality {
    /// Deep structural comparison of the JSON values.
    #[default]
    Structural,

    /// Compare digests of a loose string rendering of each value.
    ///
    /// Known false negatives: strings render without quotes, so `"1"` and `1`
    /// compare equal, and object key order is ignored. An update between two
    /// such values is dropped.
    ContentHash,

    /// Caller-supplied predicate.
    Custom(Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>),
}

impl Equality {
    /// Build a policy from a predicate.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Equality::Custom(Arc::new(f))
    }

    /// Whether `a` and `b` count as the same value. `None` is the absent slice.
    pub fn same(&self, a: Option<&Value>, b: Option<&Value>) -> bool {
        match self {
            Equality::Structural => a == b,
            Equality::ContentHash => ContentHash::of(a) == ContentHash::of(b),
            Equality::Custom(f) => match (a, b) {
                (Some(a), Some(b)) => f(a, b),
                (None, None) => true,
                _ => false,
            },
        }
    }
}

impl fmt::Debug for Equality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Equality::Structural => write!(f, "Structural"),
            Equality::ContentHash => write!(f, "ContentHash"),
            Equality::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// SHA-256 of a value's loose string rendering.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Hash a possibly absent value.
    pub fn of(value: Option<&Value>) -> Self {
        let mut rendered = String::new();
        match value {
            Some(value) => render(value, &mut rendered),
            None => rendered.push_str("undefined"),
        }
        let mut hasher = Sha256::new();
        hasher.update(rendered.as_bytes());
        ContentHash(hasher.finalize().into())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Strings unquoted, arrays comma-joined, object keys sorted.
fn render(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(item, out);
            }
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(key);
                out.push(':');
                render(&map[key], out);
            }
            out.push('}');
        }
    }
}
