//! Locator registry: global uniqueness and one-time activation.
//!
//! Trees are declared (usually through the `locators!` macro) long before the
//! application knows its id attribute, separator, or parameter prefix. The
//! registry therefore runs in two phases:
//!
//! ```text
//! register(id, DEFINITIONS)   Unregistered → Registered
//!                              Registered   → Duplicate   (same path again)
//! activate(options)           Registered   → Activated
//!                              joined ids collide → Duplicate, activation fails
//!                              any node called earlier → activation fails
//! ```
//!
//! Registration after activation validates the joined id immediately.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::LocatorError;
use crate::node::{Locator, ROOT_ALIAS, TreeContext};
use crate::options::GlobalOptions;

/// Declared child of a locator (used for registration from the macro).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocatorDef {
    pub name: &'static str,
    pub children: &'static [LocatorDef],
}

impl LocatorDef {
    pub const fn new(name: &'static str, children: &'static [LocatorDef]) -> Self {
        Self { name, children }
    }

    pub const fn leaf(name: &'static str) -> Self {
        Self::new(name, &[])
    }

    /// Number of nodes declared under (and including) this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(LocatorDef::count).sum::<usize>()
    }
}

/// Lifecycle of one registered locator id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatorState {
    Registered,
    Activated,
    Duplicate,
}

/// One registered node and the child names declared for it.
#[derive(Clone, Debug)]
pub struct RegistryEntry {
    pub locator: Locator,
    pub declared: Vec<&'static str>,
    pub state: LocatorState,
}

#[derive(Default)]
struct RegistryState {
    entries: Vec<RegistryEntry>,
    by_segments: HashMap<Vec<String>, usize>,
    /// Populated at activation, once ids can be joined.
    by_id: HashMap<String, usize>,
    first_duplicate: Option<Vec<String>>,
    activated: bool,
}

/// Registry of locator trees sharing one set of global options.
///
/// Construct one per application root and pass it by reference to whatever
/// declares trees. Independent registries never interact.
pub struct LocatorRegistry {
    production: bool,
    context: Arc<TreeContext>,
    state: Mutex<RegistryState>,
}

impl Default for LocatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LocatorRegistry {
    /// A registry awaiting activation.
    ///
    /// With the `production` feature this is [`LocatorRegistry::production`].
    pub fn new() -> Self {
        Self::with_production(cfg!(feature = "production"))
    }

    /// A registry that hands out the production sentinel and never fails.
    pub fn production() -> Self {
        Self::with_production(true)
    }

    fn with_production(production: bool) -> Self {
        Self {
            production,
            context: TreeContext::pending(),
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Register root `id` and, recursively, every declared child.
    ///
    /// Before activation a repeated path is only recorded; activation then
    /// fails naming it. After activation the duplicate is returned directly.
    pub fn register(
        &self,
        id: &str,
        declared: &'static [LocatorDef],
    ) -> Result<Locator, LocatorError> {
        if self.production || self.context.is_production() {
            return Ok(Locator::production());
        }
        if id.is_empty() {
            return Err(LocatorError::InvalidLocatorId(id.to_string()));
        }

        let mut state = self.state.lock();
        self.preflight(&state, vec![id.to_string()], declared, &mut HashSet::new())?;
        let root = match state.by_segments.get(&vec![id.to_string()]) {
            Some(&idx) => state.entries[idx].locator.clone(),
            None => Locator::registered(id, Arc::clone(&self.context)),
        };
        debug!(locator = id, declared = declared.len(), "registering locator tree");
        self.insert(&mut state, root.clone(), declared)?;
        Ok(root)
    }

    /// Check a whole declared subtree before anything is committed, so a
    /// failed registration leaves the registry untouched.
    ///
    /// Empty names are always rejected. After activation every joined id must
    /// also be new, both to the registry and within the subtree itself.
    fn preflight(
        &self,
        state: &RegistryState,
        segments: Vec<String>,
        declared: &'static [LocatorDef],
        seen: &mut HashSet<String>,
    ) -> Result<(), LocatorError> {
        if state.activated {
            let id = self.display_id(&segments);
            if state.by_segments.contains_key(&segments)
                || state.by_id.contains_key(&id)
                || !seen.insert(id.clone())
            {
                error!(locator = %id, "late registration collides with a registered locator");
                return Err(LocatorError::DuplicateLocator { id });
            }
        }

        for def in declared {
            if def.name.is_empty() {
                return Err(LocatorError::InvalidLocatorId(format!(
                    "{}{}",
                    self.display_id(&segments),
                    self.separator()
                )));
            }
            if def.name == ROOT_ALIAS {
                continue;
            }
            let mut child = segments.clone();
            child.push(def.name.to_string());
            self.preflight(state, child, def.children, seen)?;
        }
        Ok(())
    }

    fn insert(
        &self,
        state: &mut RegistryState,
        locator: Locator,
        declared: &'static [LocatorDef],
    ) -> Result<(), LocatorError> {
        let segments = locator.segments().to_vec();
        let names: Vec<&'static str> = declared
            .iter()
            .map(|def| def.name)
            .filter(|name| *name != ROOT_ALIAS)
            .collect();

        if let Some(&idx) = state.by_segments.get(&segments) {
            let id = self.display_id(&segments);
            error!(locator = %id, "duplicate locator registration");
            if state.activated {
                return Err(LocatorError::DuplicateLocator { id });
            }
            state.entries[idx].state = LocatorState::Duplicate;
            state.first_duplicate.get_or_insert(segments);
        } else {
            let idx = state.entries.len();
            let mut entry = RegistryEntry {
                locator: locator.clone(),
                declared: names,
                state: LocatorState::Registered,
            };
            if state.activated {
                let id = self.display_id(&segments);
                if state.by_id.contains_key(&id) {
                    error!(locator = %id, "locator id collides with an activated locator");
                    return Err(LocatorError::DuplicateLocator { id });
                }
                entry.state = LocatorState::Activated;
                state.by_id.insert(id, idx);
            }
            state.entries.push(entry);
            state.by_segments.insert(segments, idx);
        }

        for def in declared {
            if def.name.is_empty() {
                return Err(LocatorError::InvalidLocatorId(format!(
                    "{}{}",
                    self.display_id(locator.segments()),
                    self.separator()
                )));
            }
            if def.name == ROOT_ALIAS {
                warn!(locator = %self.display_id(locator.segments()), "declared child '{}' aliases its parent", ROOT_ALIAS);
                continue;
            }
            self.insert(state, locator.child(def.name), def.children)?;
        }
        Ok(())
    }

    /// Supply the global options; every registered node starts producing
    /// output.
    ///
    /// # Errors
    ///
    /// - [`LocatorError::DuplicateLocator`] if a path was registered twice or
    ///   two paths join to the same id
    /// - [`LocatorError::PrematureCall`] if any node was called before now
    /// - [`LocatorError::AlreadyActivated`] on a second activation
    pub fn activate(&self, options: GlobalOptions) -> Result<(), LocatorError> {
        let mut state = self.state.lock();
        if state.activated {
            return Err(LocatorError::AlreadyActivated);
        }

        if self.production || options.production_active() {
            self.context.enter_production();
            state.activated = true;
            info!("locator registry activated in production mode");
            return Ok(());
        }
        options.validate()?;

        let sep = options.child_separator.as_str();
        if let Some(segments) = &state.first_duplicate {
            return Err(LocatorError::DuplicateLocator {
                id: segments.join(sep),
            });
        }

        let mut by_id: HashMap<String, usize> = HashMap::new();
        for idx in 0..state.entries.len() {
            let id = state.entries[idx].locator.segments().join(sep);
            if let Some(&existing) = by_id.get(&id) {
                state.entries[existing].state = LocatorState::Duplicate;
                state.entries[idx].state = LocatorState::Duplicate;
                error!(locator = %id, "two locator paths join to the same id");
                return Err(LocatorError::DuplicateLocator { id });
            }
            by_id.insert(id, idx);
        }

        if let Some(segments) = self.context.premature() {
            return Err(LocatorError::PrematureCall {
                id: segments.join(sep),
            });
        }

        let nodes = state.entries.len();
        let separator = options.child_separator.clone();
        let id_attribute = options.id_attribute.clone();
        if !self.context.activate(options) {
            return Err(LocatorError::AlreadyActivated);
        }
        for entry in &mut state.entries {
            entry.state = LocatorState::Activated;
        }
        state.by_id = by_id;
        state.activated = true;
        info!(nodes, separator = %separator, id_attribute = %id_attribute, "locator registry activated");
        Ok(())
    }

    pub fn is_activated(&self) -> bool {
        self.state.lock().activated
    }

    pub fn is_production(&self) -> bool {
        self.production || self.context.is_production()
    }

    /// Registered node with the full id `id` (after activation).
    pub fn get(&self, id: &str) -> Option<Locator> {
        let state = self.state.lock();
        state.by_id.get(id).map(|&i| state.entries[i].locator.clone())
    }

    /// State of the node at `segments` (root id first).
    pub fn state_of(&self, segments: &[&str]) -> Option<LocatorState> {
        let key: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        let state = self.state.lock();
        state.by_segments.get(&key).map(|&i| state.entries[i].state)
    }

    /// Total number of registered nodes.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Snapshot of all entries in registration order.
    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.state.lock().entries.clone()
    }

    fn separator(&self) -> &str {
        self.context
            .options()
            .map_or(".", |opts| opts.child_separator.as_str())
    }

    /// Joined id when options are known, dot-joined segments otherwise.
    fn display_id(&self, segments: &[String]) -> String {
        segments.join(self.separator())
    }
}

// =============================================================================
// Tests
// =============================================================================
