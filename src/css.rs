//! CSS attribute-selector compilation.
//!
//! Grammar produced per attribute:
//!
//! ```text
//! [name="value"]    exact
//! [name^="value"]   starts with
//! [name*="value"]   contains
//! [name$="value"]   ends with
//! [name]            present
//! ```

use std::fmt;

use serde::ser::{Serialize, Serializer};

use crate::attributes::Attributes;

/// Marker turning an attribute value into a partial match.
pub const WILDCARD: char = '*';

fn push_fragment(out: &mut String, name: &str, op: &str, value: &str) {
    out.push('[');
    out.push_str(name);
    out.push_str(op);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push_str("\"]");
}

/// Compile one attribute into its concatenated selector fragments.
///
/// Runs of consecutive wildcards count as a single split point.
pub fn compile_attribute(name: &str, value: &str, wildcards: bool) -> String {
    let mut out = String::new();
    if !wildcards || !value.contains(WILDCARD) {
        push_fragment(&mut out, name, "=", value);
        return out;
    }

    let parts: Vec<&str> = value.split(WILDCARD).filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        out.push('[');
        out.push_str(name);
        out.push(']');
        return out;
    }

    let anchored_start = !value.starts_with(WILDCARD);
    let anchored_end = !value.ends_with(WILDCARD);
    let last = parts.len() - 1;
    for (i, part) in parts.iter().enumerate() {
        let op = if i == 0 && anchored_start {
            "^="
        } else if i == last && anchored_end {
            "$="
        } else {
            "*="
        };
        push_fragment(&mut out, name, op, part);
    }
    out
}

/// Compile every attribute of `attrs`, in order.
pub fn compile_attributes(attrs: &Attributes, wildcards: bool) -> String {
    attrs
        .iter()
        .map(|(name, value)| compile_attribute(name, value, wildcards))
        .collect()
}

/// A compiled CSS selector and the fragments it was built from.
///
/// Only the engine constructs selectors; combinators rely on the fragment
/// list to re-flatten unions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    css: String,
    fragments: Vec<String>,
}

impl Selector {
    pub(crate) fn single(css: String) -> Self {
        Self {
            fragments: vec![css.clone()],
            css,
        }
    }

    pub(crate) fn from_parts(css: String, fragments: Vec<String>) -> Self {
        debug_assert!(!fragments.is_empty());
        Self { css, fragments }
    }

    pub(crate) fn empty() -> Self {
        Self {
            css: String::new(),
            fragments: Vec::new(),
        }
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.css.is_empty()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css)
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.css)
    }
}
