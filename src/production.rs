//! The absorbing stand-in used for every tree in production mode.

use std::sync::{Arc, LazyLock};

use crate::attributes::Attributes;
use crate::css::Selector;

/// Process-wide sentinel behind [`Locator::production`](crate::Locator::production).
///
/// Calls return the same empty attributes and selector, child access returns
/// the sentinel again, and string conversion yields `""`. Nothing on it can
/// fail.
#[derive(Debug)]
pub struct ProductionSentinel {
    attributes: Arc<Attributes>,
    selector: Arc<Selector>,
}

static SENTINEL: LazyLock<ProductionSentinel> = LazyLock::new(|| ProductionSentinel {
    attributes: Arc::new(Attributes::empty()),
    selector: Arc::new(Selector::empty()),
});

impl ProductionSentinel {
    pub fn get() -> &'static ProductionSentinel {
        &SENTINEL
    }

    pub fn attributes(&self) -> Arc<Attributes> {
        Arc::clone(&self.attributes)
    }

    pub fn selector(&self) -> Arc<Selector> {
        Arc::clone(&self.selector)
    }

    /// Whether `selector` is the sentinel's own empty selector.
    pub fn owns_selector(&self, selector: &Arc<Selector>) -> bool {
        Arc::ptr_eq(&self.selector, selector)
    }
}
