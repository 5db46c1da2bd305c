//! # Hierarchical Test Locators (locator-tree)
//!
//! Lazily materialized trees of test locators. Every node turns into a DOM
//! attribute map (`data-testid="app-header-nav"` plus prefixed parameters) or
//! an equivalent CSS attribute selector, and production builds swap the whole
//! tree for a single absorbing sentinel.
//!
//! ## Design
//!
//! ```text
//! locators!  ──►  LocatorRegistry::register  ──►  activate(GlobalOptions)
//!                        │                               │
//!                        ▼                               ▼
//!                  Locator tree  ── child("x") ──►  attributes / selector
//!                                                       │
//!                                                 per-key Arc caches
//! ```
//!
//! Ids are joined only once options are known, so trees can be declared in
//! any order relative to configuration. Outputs are cached per call
//! argument: the same argument always yields the same `Arc`.
//!
//! ## Example
//!
//! ```ignore
//! use locator_tree::{GlobalOptions, LocatorRegistry, Parameters, locators};
//!
//! locators! {
//!     pub mod App {
//!         header { logo; nav; }
//!         footer;
//!     }
//! }
//!
//! let registry = LocatorRegistry::new();
//! let app = App::register(&registry)?;
//! registry.activate(GlobalOptions::default())?;
//!
//! let nav = App::header::nav::locator(&app);
//! assert_eq!(nav.id(), Some("App-header-nav"));
//! let sel = nav.selector_with(Parameters::from([("tab", "home*")]));
//! // [data-testid="App-header-nav"][data-test-tab^="home"]
//! ```

pub mod attributes;
pub mod cache_key;
pub mod combinators;
pub mod css;
pub mod error;
pub mod node;
pub mod options;
pub mod production;
pub mod props;
pub mod registry;
pub mod value;

pub use attributes::Attributes;
pub use cache_key::{CacheKeyMode, NO_ARGUMENT_KEY, cache_key};
pub use combinators::{find_any_of_selectors, find_chain_of_selectors};
pub use css::{Selector, WILDCARD, compile_attribute, compile_attributes};
pub use error::LocatorError;
pub use locator_tree_macro::locators;
pub use node::{Locator, ROOT_ALIAS};
pub use options::{GlobalOptions, HandleFactory};
pub use production::ProductionSentinel;
pub use props::WithLocator;
pub use registry::{LocatorDef, LocatorRegistry, LocatorState, RegistryEntry};
pub use value::{ParamKey, Parameters, Symbol, Value};
