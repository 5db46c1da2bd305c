//! Error types for locator trees.

use thiserror::Error;

/// Every failure the engine can surface.
///
/// All variants are synchronous configuration or usage mistakes; none of them
/// is retryable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocatorError {
    /// The same locator id was registered twice, either directly or through a
    /// declared child whose joined path collides with another id.
    #[error("duplicate locator id '{id}': every locator id may be registered only once")]
    DuplicateLocator { id: String },

    /// Locator ids and child names must be non-empty.
    #[error("invalid locator id '{0}': ids and child names must be non-empty")]
    InvalidLocatorId(String),

    /// A node was called before the registry was activated.
    #[error("locator '{id}' was called before activation; set the global options first")]
    PrematureCall { id: String },

    /// `activate` was called a second time.
    #[error("locator registry is already activated")]
    AlreadyActivated,

    /// A properties bag carried no locator marker.
    #[error("properties carry no locator")]
    MissingLocator,

    /// An attempt to reshape a node from the outside.
    #[error("cannot {action} property '{property}' of locator '{path}': locator trees are immutable")]
    Immutable {
        path: String,
        property: String,
        action: &'static str,
    },

    /// A selector combinator was called without selectors.
    #[error("{combinator} requires at least one selector")]
    EmptyArgumentList { combinator: &'static str },

    /// Global options failed validation.
    #[error("invalid locator options: {0}")]
    InvalidOptions(String),
}

impl LocatorError {
    /// The locator id the error is about, if any.
    pub fn locator_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateLocator { id } | Self::PrematureCall { id } => Some(id),
            Self::Immutable { path, .. } => Some(path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_id() {
        let dup = LocatorError::DuplicateLocator { id: "root-foo".into() };
        assert!(dup.to_string().contains("root-foo"));
        assert!(dup.to_string().contains("duplicate"));

        let early = LocatorError::PrematureCall { id: "root".into() };
        assert!(early.to_string().contains("'root'"));
        assert!(early.to_string().contains("before activation"));
        assert_eq!(early.locator_id(), Some("root"));
    }

    #[test]
    fn immutable_message_mentions_action() {
        let err = LocatorError::Immutable {
            path: "app-header".into(),
            property: "logo".into(),
            action: "delete",
        };
        assert_eq!(
            err.to_string(),
            "cannot delete property 'logo' of locator 'app-header': locator trees are immutable"
        );
        assert_eq!(LocatorError::MissingLocator.locator_id(), None);
    }
}
