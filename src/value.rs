//! Parameter values passed when calling a locator node.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// An opaque, identity-compared key.
///
/// Two symbols with the same description are still distinct; clones share
/// identity.
#[derive(Clone, Debug)]
pub struct Symbol {
    id: u64,
    description: Arc<str>,
}

impl Symbol {
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Process-unique identity.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// Key of a [`Parameters`] entry.
///
/// Only named keys turn into attributes; symbol keys take part in cache keys
/// but are never rendered.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    Name(String),
    Symbol(Symbol),
}

impl ParamKey {
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Symbol(_) => None,
        }
    }
}

impl From<&str> for ParamKey {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for ParamKey {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<Symbol> for ParamKey {
    fn from(value: Symbol) -> Self {
        Self::Symbol(value)
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => symbol.fmt(f),
        }
    }
}

/// A value a locator can be called with.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(Symbol),
    Object(Parameters),
}

impl Value {
    /// Type tag used by cache keys.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn as_parameters(&self) -> Option<&Parameters> {
        match self {
            Self::Object(params) => Some(params),
            _ => None,
        }
    }
}

/// Shortest round-trip digits, laid out the way JavaScript prints numbers:
/// plain decimals for exponents in `-7..21`, `d.ddde±x` otherwise.
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let sci = format!("{:e}", n.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = digits.len() as i32;
    // Position of the decimal point relative to the first digit.
    let point = exp.parse::<i32>().unwrap_or(0) + 1;

    let body = if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat(-point as usize))
    } else {
        let (lead, rest) = digits.split_at(1);
        let frac = if rest.is_empty() {
            String::new()
        } else {
            format!(".{rest}")
        };
        let sign = if point > 0 { '+' } else { '-' };
        format!("{lead}{frac}e{sign}{}", (point - 1).abs())
    };
    if n < 0.0 { format!("-{body}") } else { body }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::Symbol(symbol) => symbol.fmt(f),
            Self::Object(_) => f.write_str("[object Object]"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

number_from!(i32, i64, u32, u64, usize, f32);

impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Self::Symbol(value)
    }
}

impl From<Parameters> for Value {
    fn from(value: Parameters) -> Self {
        Self::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}

/// Insertion-ordered parameter bag.
///
/// Inserting an existing key replaces its value in place. Named keys
/// enumerate before symbol keys.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(ParamKey, Value)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Returns the previous value if the key was present.
    pub fn insert(&mut self, key: impl Into<ParamKey>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_name() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Own entries in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &Value)> {
        let named = self
            .entries
            .iter()
            .filter(|(k, _)| matches!(k, ParamKey::Name(_)));
        let symbols = self
            .entries
            .iter()
            .filter(|(k, _)| matches!(k, ParamKey::Symbol(_)));
        named.chain(symbols).map(|(k, v)| (k, v))
    }

    /// Named entries whose value is not `Undefined`.
    pub fn defined(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().filter_map(|(k, v)| match k {
            ParamKey::Name(name) if !v.is_undefined() => Some((name.as_str(), v)),
            _ => None,
        })
    }
}

impl<K: Into<ParamKey>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<K: Into<ParamKey>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Parameters {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_without_trailing_fraction() {
        assert_eq!(Value::from(1).to_string(), "1");
        assert_eq!(Value::from(1.5).to_string(), "1.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Number(f64::NEG_INFINITY).to_string(), "-Infinity");
    }

    #[test]
    fn numbers_switch_to_exponents_like_javascript() {
        assert_eq!(Value::from(100).to_string(), "100");
        assert_eq!(Value::from(123.456).to_string(), "123.456");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(0.000001).to_string(), "0.000001");
        assert_eq!(Value::from(1e-7).to_string(), "1e-7");
        assert_eq!(Value::from(-1.5e-10).to_string(), "-1.5e-10");
        assert_eq!(Value::from(1e20).to_string(), "100000000000000000000");
        assert_eq!(Value::from(1e21).to_string(), "1e+21");
        assert_eq!(Value::from(2.5e25).to_string(), "2.5e+25");
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new("a");
        let b = Symbol::new("a");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.to_string(), "Symbol(a)");
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params = Parameters::from([("a", 1), ("b", 2)]);
        assert_eq!(params.insert("a", 3), Some(Value::from(3)));
        let keys: Vec<String> = params.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(params.get("a"), Some(&Value::from(3)));
    }

    #[test]
    fn symbol_keys_enumerate_last_and_are_not_defined() {
        let sym = Symbol::new("hidden");
        let params = Parameters::new()
            .with(sym.clone(), "x")
            .with("shown", "y")
            .with("gone", Value::Undefined);

        let order: Vec<String> = params.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(order, ["shown", "gone", "Symbol(hidden)"]);

        let defined: Vec<&str> = params.defined().map(|(k, _)| k).collect();
        assert_eq!(defined, ["shown"]);
    }

    #[test]
    fn option_maps_none_to_undefined() {
        assert_eq!(Value::from(None::<&str>), Value::Undefined);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
        assert_eq!(Value::Null.type_name(), "object");
    }
}
