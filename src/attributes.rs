//! Flat attribute maps produced for a locator call.

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Parameters;

/// Ordered attribute name → value mapping.
///
/// The id attribute always comes first, followed by parameter attributes in
/// parameter order. Displays as the id value alone.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    /// Build the attributes of `id` called with `params`.
    ///
    /// `Undefined` parameters and symbol keys are skipped.
    pub fn build(
        id_attribute: &str,
        id: &str,
        parameter_prefix: &str,
        params: Option<&Parameters>,
    ) -> Self {
        let mut entries = vec![(id_attribute.to_string(), id.to_string())];
        if let Some(params) = params {
            for (name, value) in params.defined() {
                let attr = format!("{}{}", parameter_prefix, name);
                let value = value.to_string();
                // A later write to the same attribute wins, keeping its slot.
                match entries.iter_mut().find(|(n, _)| *n == attr) {
                    Some(slot) => slot.1 = value,
                    None => entries.push((attr, value)),
                }
            }
        }
        Self { entries }
    }

    pub(crate) fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The id attribute's value, `None` for the production placeholder.
    pub fn id(&self) -> Option<&str> {
        self.entries.first().map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id().unwrap_or_default())
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
