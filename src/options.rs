//! Global options supplied at activation or root creation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::attributes::Attributes;
use crate::cache_key::CacheKeyMode;
use crate::error::LocatorError;

/// Derives an arbitrary handle from a node's attributes.
///
/// Results are cached per node and cache key like attributes are; read them
/// back with [`Locator::handle`](crate::Locator::handle).
pub type HandleFactory = Arc<dyn Fn(&Attributes) -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// Configuration shared by every node of a tree.
///
/// Deserializes from the camelCase option names, accepting either spelling of
/// each option:
///
/// ```text
/// idAttribute      | pathAttribute
/// childSeparator   | pathSeparator
/// parameterPrefix  | parameterAttributePrefix
/// disableWildcards | supportWildcardsInCssSelectors (inverted)
/// isProduction, cacheKeyMode
/// ```
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawOptions")]
pub struct GlobalOptions {
    /// Attribute carrying the node's full path.
    pub id_attribute: String,
    /// Joins parent and child names.
    pub child_separator: String,
    /// Prefix of parameter-derived attribute names.
    pub parameter_prefix: String,
    /// Compile `*` in values to partial CSS matches.
    pub wildcards: bool,
    /// Replace trees with the production sentinel.
    pub is_production: bool,
    pub cache_key_mode: CacheKeyMode,
    pub handle_factory: Option<HandleFactory>,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            id_attribute: "data-testid".to_string(),
            child_separator: "-".to_string(),
            parameter_prefix: "data-test-".to_string(),
            wildcards: true,
            is_production: cfg!(feature = "production"),
            cache_key_mode: CacheKeyMode::default(),
            handle_factory: None,
        }
    }
}

impl GlobalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_attribute(mut self, name: impl Into<String>) -> Self {
        self.id_attribute = name.into();
        self
    }

    pub fn with_child_separator(mut self, separator: impl Into<String>) -> Self {
        self.child_separator = separator.into();
        self
    }

    pub fn with_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parameter_prefix = prefix.into();
        self
    }

    pub fn with_wildcards(mut self, enabled: bool) -> Self {
        self.wildcards = enabled;
        self
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.is_production = production;
        self
    }

    pub fn with_cache_key_mode(mut self, mode: CacheKeyMode) -> Self {
        self.cache_key_mode = mode;
        self
    }

    /// Install a handle factory, see [`HandleFactory`].
    pub fn with_handle_factory<T, F>(mut self, factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Attributes) -> T + Send + Sync + 'static,
    {
        self.handle_factory = Some(Arc::new(move |attrs: &Attributes| {
            Arc::new(factory(attrs)) as Arc<dyn Any + Send + Sync>
        }));
        self
    }

    /// The `production` feature overrides whatever was configured.
    pub fn production_active(&self) -> bool {
        self.is_production || cfg!(feature = "production")
    }

    pub fn validate(&self) -> Result<(), LocatorError> {
        if self.id_attribute.is_empty() {
            return Err(LocatorError::InvalidOptions(
                "id attribute must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for GlobalOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalOptions")
            .field("id_attribute", &self.id_attribute)
            .field("child_separator", &self.child_separator)
            .field("parameter_prefix", &self.parameter_prefix)
            .field("wildcards", &self.wildcards)
            .field("is_production", &self.is_production)
            .field("cache_key_mode", &self.cache_key_mode)
            .field("handle_factory", &self.handle_factory.is_some())
            .finish()
    }
}

/// Raw deserialized form, before alias resolution and validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawOptions {
    #[serde(alias = "pathAttribute")]
    id_attribute: Option<String>,
    #[serde(alias = "pathSeparator")]
    child_separator: Option<String>,
    #[serde(alias = "parameterAttributePrefix")]
    parameter_prefix: Option<String>,
    disable_wildcards: Option<bool>,
    support_wildcards_in_css_selectors: Option<bool>,
    is_production: Option<bool>,
    cache_key_mode: Option<CacheKeyMode>,
}

impl TryFrom<RawOptions> for GlobalOptions {
    type Error = LocatorError;

    fn try_from(raw: RawOptions) -> Result<Self, Self::Error> {
        let defaults = GlobalOptions::default();

        let wildcards = match (raw.disable_wildcards, raw.support_wildcards_in_css_selectors) {
            (Some(disable), Some(support)) if disable == support => {
                return Err(LocatorError::InvalidOptions(format!(
                    "disableWildcards = {} contradicts supportWildcardsInCssSelectors = {}",
                    disable, support
                )));
            }
            (Some(disable), _) => !disable,
            (None, Some(support)) => support,
            (None, None) => defaults.wildcards,
        };

        let options = Self {
            id_attribute: raw.id_attribute.unwrap_or(defaults.id_attribute),
            child_separator: raw.child_separator.unwrap_or(defaults.child_separator),
            parameter_prefix: raw.parameter_prefix.unwrap_or(defaults.parameter_prefix),
            wildcards,
            is_production: raw.is_production.unwrap_or(defaults.is_production),
            cache_key_mode: raw.cache_key_mode.unwrap_or(defaults.cache_key_mode),
            handle_factory: None,
        };
        options.validate()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = GlobalOptions::default();
        assert_eq!(opts.id_attribute, "data-testid");
        assert_eq!(opts.child_separator, "-");
        assert_eq!(opts.parameter_prefix, "data-test-");
        assert!(opts.wildcards);
        assert_eq!(opts.cache_key_mode, CacheKeyMode::UndefinedIsAbsent);
    }

    #[test]
    fn deserializes_primary_names() {
        let opts: GlobalOptions = serde_json::from_str(
            r#"{"idAttribute":"data-qa","childSeparator":".","parameterPrefix":"data-qa-","disableWildcards":true}"#,
        )
        .unwrap();
        assert_eq!(opts.id_attribute, "data-qa");
        assert_eq!(opts.child_separator, ".");
        assert_eq!(opts.parameter_prefix, "data-qa-");
        assert!(!opts.wildcards);
    }

    #[test]
    fn deserializes_alternate_names() {
        let opts: GlobalOptions = serde_json::from_str(
            r#"{"pathAttribute":"data-path","pathSeparator":"/","parameterAttributePrefix":"data-p-","supportWildcardsInCssSelectors":false,"cacheKeyMode":"distinct"}"#,
        )
        .unwrap();
        assert_eq!(opts.id_attribute, "data-path");
        assert_eq!(opts.child_separator, "/");
        assert_eq!(opts.parameter_prefix, "data-p-");
        assert!(!opts.wildcards);
        assert_eq!(opts.cache_key_mode, CacheKeyMode::Distinct);
    }

    #[test]
    fn rejects_contradicting_wildcard_flags() {
        let err = serde_json::from_str::<GlobalOptions>(
            r#"{"disableWildcards":true,"supportWildcardsInCssSelectors":true}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("contradicts"));
    }

    #[test]
    fn rejects_empty_id_attribute() {
        assert!(serde_json::from_str::<GlobalOptions>(r#"{"idAttribute":""}"#).is_err());
        assert!(GlobalOptions::new().with_id_attribute("").validate().is_err());
    }

    #[test]
    fn handle_factory_is_type_erased() {
        let opts = GlobalOptions::new().with_handle_factory(|attrs| attrs.len());
        let attrs = Attributes::build("id", "x", "p-", None);
        let handle = (opts.handle_factory.as_ref().unwrap())(&attrs);
        assert_eq!(handle.downcast_ref::<usize>(), Some(&1));
    }
}
