//! Properties bags that carry a locator alongside component properties.

use crate::error::LocatorError;
use crate::node::Locator;

/// Component properties `P` plus an optional locator marker.
///
/// ```ignore
/// let props = WithLocator::new(ButtonProps { label: "Save" }).with_locator(root.child("save"));
/// let (locator, props) = props.take_locator()?;
/// ```
#[derive(Clone, Debug)]
pub struct WithLocator<P> {
    locator: Option<Locator>,
    props: P,
}

impl<P> WithLocator<P> {
    pub fn new(props: P) -> Self {
        Self {
            locator: None,
            props,
        }
    }

    pub fn with_locator(mut self, locator: Locator) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    pub fn props(&self) -> &P {
        &self.props
    }

    /// Strip the marker, returning it with the remaining properties.
    ///
    /// Production builds always succeed with the sentinel.
    pub fn take_locator(self) -> Result<(Locator, P), LocatorError> {
        if cfg!(feature = "production") {
            return Ok((Locator::production(), self.props));
        }
        match self.locator {
            Some(locator) => Ok((locator, self.props)),
            None => Err(LocatorError::MissingLocator),
        }
    }

    /// Drop the marker, if any.
    pub fn into_props(self) -> P {
        self.props
    }
}

impl<P> From<P> for WithLocator<P> {
    fn from(props: P) -> Self {
        Self::new(props)
    }
}
