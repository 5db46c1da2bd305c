//! Cache keys for locator calls.
//!
//! A key is the value's type tag followed by its length-prefixed string form.
//! Objects additionally append every own entry as a length-prefixed key part
//! and a length-prefixed value part, one level deep. The length prefix
//! (`<chars>:<text>`) keeps part boundaries unambiguous.

use serde::{Deserialize, Serialize};

use crate::value::{ParamKey, Value};

/// Whether calling with no argument and calling with `Undefined` share a
/// cache entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CacheKeyMode {
    /// No argument, `Undefined`, and `Undefined`-valued entries are all
    /// treated as absent.
    #[default]
    UndefinedIsAbsent,
    /// Absence and `Undefined` produce different keys.
    Distinct,
}

/// Key used for a call without an argument in [`CacheKeyMode::Distinct`].
///
/// Every other key starts with a type tag, so the empty string cannot collide.
pub const NO_ARGUMENT_KEY: &str = "";

/// Append `<chars>:<text>`.
fn push_prefixed(out: &mut String, text: &str) {
    out.push_str(&text.chars().count().to_string());
    out.push(':');
    out.push_str(text);
}

fn primitive_key(value: &Value) -> String {
    let mut out = String::from(value.type_name());
    match value {
        Value::Symbol(symbol) => push_prefixed(&mut out, &format!("{}#{}", symbol, symbol.id())),
        other => push_prefixed(&mut out, &other.to_string()),
    }
    out
}

fn param_key_form(key: &ParamKey) -> String {
    match key {
        ParamKey::Name(name) => primitive_key(&Value::String(name.clone())),
        ParamKey::Symbol(symbol) => primitive_key(&Value::Symbol(symbol.clone())),
    }
}

/// Compute the cache key of a call argument.
pub fn cache_key(arg: Option<&Value>, mode: CacheKeyMode) -> String {
    let value = match (arg, mode) {
        (None, CacheKeyMode::Distinct) => return NO_ARGUMENT_KEY.to_string(),
        (None, CacheKeyMode::UndefinedIsAbsent) => &Value::Undefined,
        (Some(value), _) => value,
    };

    let mut key = primitive_key(value);
    if let Value::Object(params) = value {
        for (k, v) in params.iter() {
            if mode == CacheKeyMode::UndefinedIsAbsent && v.is_undefined() {
                continue;
            }
            push_prefixed(&mut key, &param_key_form(k));
            push_prefixed(&mut key, &primitive_key(v));
        }
    }
    key
}
