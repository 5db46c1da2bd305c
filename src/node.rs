//! Locator nodes and the lazily materialized tree.
//!
//! A [`Locator`] is a cheap handle to either a live node or the production
//! sentinel. Live nodes own their children and per-call-key caches; children
//! hold a weak back-reference to their parent for ancestry walks.
//!
//! ```ignore
//! let root = Locator::root("app", GlobalOptions::default())?;
//! let row = root.child("table").child("row");
//! let attrs = row.attributes_with(Parameters::from([("index", 3)]));
//! // {"data-testid": "app-table-row", "data-test-index": "3"}
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use serde::ser::{Serialize, Serializer};
use tracing::{debug, trace, warn};

use crate::attributes::Attributes;
use crate::cache_key::cache_key;
use crate::css::{Selector, compile_attributes};
use crate::error::LocatorError;
use crate::options::GlobalOptions;
use crate::production::ProductionSentinel;
use crate::value::Value;

/// Child name that designates the node itself rather than a new child.
pub const ROOT_ALIAS: &str = "root";

// =============================================================================
// Shared tree context
// =============================================================================

/// State shared by every node of one tree (or one registry).
pub(crate) struct TreeContext {
    options: OnceLock<GlobalOptions>,
    production: AtomicBool,
    /// Segments of the first node called before activation.
    premature: Mutex<Option<Vec<String>>>,
}

impl TreeContext {
    pub(crate) fn pending() -> Arc<Self> {
        Arc::new(Self {
            options: OnceLock::new(),
            production: AtomicBool::new(false),
            premature: Mutex::new(None),
        })
    }

    fn active(options: GlobalOptions) -> Arc<Self> {
        let ctx = Self::pending();
        // Fresh cell, cannot already be set.
        let _ = ctx.options.set(options);
        ctx
    }

    pub(crate) fn options(&self) -> Option<&GlobalOptions> {
        self.options.get()
    }

    /// Returns `false` if options were already set.
    pub(crate) fn activate(&self, options: GlobalOptions) -> bool {
        self.options.set(options).is_ok()
    }

    pub(crate) fn enter_production(&self) {
        self.production.store(true, Ordering::Release);
    }

    pub(crate) fn is_production(&self) -> bool {
        self.production.load(Ordering::Acquire)
    }

    pub(crate) fn premature(&self) -> Option<Vec<String>> {
        self.premature.lock().clone()
    }

    fn record_premature(&self, segments: &[String]) {
        let mut first = self.premature.lock();
        if first.is_none() {
            warn!(locator = %segments.join("."), "locator called before activation");
            *first = Some(segments.to_vec());
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// Look up `key`, building and storing the value on a miss.
///
/// `build` runs unlocked and may call back into the same node. When two
/// builds race, the first stored value is kept and returned to both.
fn cached<T: ?Sized>(
    cache: &Mutex<HashMap<String, Arc<T>>>,
    key: &str,
    build: impl FnOnce() -> Arc<T>,
) -> Arc<T> {
    if let Some(hit) = cache.lock().get(key) {
        return Arc::clone(hit);
    }
    let value = build();
    Arc::clone(cache.lock().entry(key.to_string()).or_insert(value))
}

pub(crate) struct LocatorNode {
    /// Root id followed by every child name down to this node.
    segments: Vec<String>,
    parent: Option<Weak<LocatorNode>>,
    context: Arc<TreeContext>,
    id: OnceLock<String>,
    children: Mutex<HashMap<String, Arc<LocatorNode>>>,
    attributes: Mutex<HashMap<String, Arc<Attributes>>>,
    selectors: Mutex<HashMap<String, Arc<Selector>>>,
    handles: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl LocatorNode {
    fn new(
        segments: Vec<String>,
        parent: Option<Weak<LocatorNode>>,
        context: Arc<TreeContext>,
    ) -> Arc<Self> {
        Arc::new(Self {
            segments,
            parent,
            context,
            id: OnceLock::new(),
            children: Mutex::new(HashMap::new()),
            attributes: Mutex::new(HashMap::new()),
            selectors: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Full id; `None` until the tree's options are known.
    fn id(&self) -> Option<&str> {
        let opts = self.context.options()?;
        Some(
            self.id
                .get_or_init(|| self.segments.join(&opts.child_separator))
                .as_str(),
        )
    }

    /// Id if known, dot-joined segments otherwise.
    fn label(&self) -> String {
        self.id()
            .map(str::to_string)
            .unwrap_or_else(|| self.segments.join("."))
    }

    fn child(self: &Arc<Self>, name: &str) -> Arc<Self> {
        if name.is_empty() || name == ROOT_ALIAS {
            return Arc::clone(self);
        }
        let mut children = self.children.lock();
        if let Some(existing) = children.get(name) {
            return Arc::clone(existing);
        }
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        debug!(parent = %self.label(), child = name, "materializing locator child");
        let node = Self::new(segments, Some(Arc::downgrade(self)), Arc::clone(&self.context));
        children.insert(name.to_string(), Arc::clone(&node));
        node
    }

    /// Options, id, and cache key for a call; `None` before activation.
    fn prepare(&self, arg: Option<&Value>) -> Option<(&GlobalOptions, &str, String)> {
        let Some(opts) = self.context.options() else {
            self.context.record_premature(&self.segments);
            return None;
        };
        let id = self.id()?;
        Some((opts, id, cache_key(arg, opts.cache_key_mode)))
    }

    fn attributes_for(
        &self,
        opts: &GlobalOptions,
        id: &str,
        key: &str,
        arg: Option<&Value>,
    ) -> Arc<Attributes> {
        cached(&self.attributes, key, || {
            trace!(locator = id, key, "attribute cache miss");
            Arc::new(Attributes::build(
                &opts.id_attribute,
                id,
                &opts.parameter_prefix,
                arg.and_then(Value::as_parameters),
            ))
        })
    }

    fn attributes(&self, arg: Option<&Value>) -> Option<Arc<Attributes>> {
        let (opts, id, key) = self.prepare(arg)?;
        Some(self.attributes_for(opts, id, &key, arg))
    }

    fn selector(&self, arg: Option<&Value>) -> Option<Arc<Selector>> {
        let (opts, id, key) = self.prepare(arg)?;
        let attrs = self.attributes_for(opts, id, &key, arg);
        Some(cached(&self.selectors, &key, || {
            trace!(locator = id, key = %key, "selector cache miss");
            Arc::new(Selector::single(compile_attributes(&attrs, opts.wildcards)))
        }))
    }

    fn handle(&self, arg: Option<&Value>) -> Option<Arc<dyn Any + Send + Sync>> {
        let (opts, id, key) = self.prepare(arg)?;
        let factory = opts.handle_factory.as_ref()?;
        let attrs = self.attributes_for(opts, id, &key, arg);
        Some(cached(&self.handles, &key, || factory(&*attrs)))
    }
}

// =============================================================================
// Public handle
// =============================================================================

#[derive(Clone)]
enum Inner {
    Live(Arc<LocatorNode>),
    Production(&'static ProductionSentinel),
}

/// Handle to one path of a locator tree.
///
/// Clones share the underlying node. In production mode every handle is the
/// same absorbing sentinel, so calling code needs no branching.
#[derive(Clone)]
pub struct Locator {
    inner: Inner,
}

impl Locator {
    /// A standalone, already-active tree rooted at `id`.
    ///
    /// Standalone trees take no part in registry uniqueness checks, but the
    /// id and options are validated as at activation.
    ///
    /// # Errors
    ///
    /// - [`LocatorError::InvalidLocatorId`] if `id` is empty
    /// - [`LocatorError::InvalidOptions`] if `options` fail validation
    pub fn root(id: impl Into<String>, options: GlobalOptions) -> Result<Self, LocatorError> {
        if options.production_active() {
            return Ok(Self::production());
        }
        let id = id.into();
        if id.is_empty() {
            return Err(LocatorError::InvalidLocatorId(id));
        }
        options.validate()?;
        let ctx = TreeContext::active(options);
        Ok(Self::live(LocatorNode::new(vec![id], None, ctx)))
    }

    /// The process-wide production sentinel.
    pub fn production() -> Self {
        Self {
            inner: Inner::Production(ProductionSentinel::get()),
        }
    }

    pub(crate) fn registered(id: &str, context: Arc<TreeContext>) -> Self {
        Self::live(LocatorNode::new(vec![id.to_string()], None, context))
    }

    fn live(node: Arc<LocatorNode>) -> Self {
        Self {
            inner: Inner::Live(node),
        }
    }

    /// Live node, unless the tree was switched to production at activation.
    fn node(&self) -> Option<&Arc<LocatorNode>> {
        match &self.inner {
            Inner::Live(node) if !node.context.is_production() => Some(node),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        self.node().is_none()
    }

    /// Child `name`, created on first access and cached afterwards.
    ///
    /// [`ROOT_ALIAS`] and the empty name return this node itself.
    pub fn child(&self, name: &str) -> Locator {
        match self.node() {
            Some(node) => Self::live(node.child(name)),
            None => Self::production(),
        }
    }

    /// Follow `path` one child at a time.
    pub fn descend(&self, path: &[&str]) -> Locator {
        path.iter().fold(self.clone(), |loc, name| loc.child(name))
    }

    pub fn parent(&self) -> Option<Locator> {
        let parent = self.node()?.parent.as_ref()?.upgrade()?;
        Some(Self::live(parent))
    }

    /// Root id followed by child names; empty for the sentinel.
    pub fn segments(&self) -> &[String] {
        match self.node() {
            Some(node) => &node.segments,
            None => &[],
        }
    }

    /// Full separator-joined id.
    ///
    /// `None` before activation, `Some("")` for the sentinel.
    pub fn id(&self) -> Option<&str> {
        match self.node() {
            Some(node) => node.id(),
            None => Some(""),
        }
    }

    /// Attributes for a call without an argument.
    ///
    /// `None` before activation: the call is remembered and reported when the
    /// registry activates.
    pub fn attributes(&self) -> Option<Arc<Attributes>> {
        self.call_attributes(None)
    }

    pub fn attributes_with(&self, arg: impl Into<Value>) -> Option<Arc<Attributes>> {
        self.call_attributes(Some(&arg.into()))
    }

    /// Attributes for `arg`; equal cache keys yield the same `Arc`.
    pub fn call_attributes(&self, arg: Option<&Value>) -> Option<Arc<Attributes>> {
        match self.node() {
            Some(node) => node.attributes(arg),
            None => Some(ProductionSentinel::get().attributes()),
        }
    }

    pub fn selector(&self) -> Option<Arc<Selector>> {
        self.call_selector(None)
    }

    pub fn selector_with(&self, arg: impl Into<Value>) -> Option<Arc<Selector>> {
        self.call_selector(Some(&arg.into()))
    }

    pub fn call_selector(&self, arg: Option<&Value>) -> Option<Arc<Selector>> {
        match self.node() {
            Some(node) => node.selector(arg),
            None => Some(ProductionSentinel::get().selector()),
        }
    }

    /// Value built by the configured [`HandleFactory`](crate::HandleFactory).
    ///
    /// `None` without a factory, before activation, in production, or when
    /// the factory produces another type than `T`.
    pub fn handle<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.call_handle(None)
    }

    pub fn handle_with<T: Any + Send + Sync>(&self, arg: impl Into<Value>) -> Option<Arc<T>> {
        self.call_handle(Some(&arg.into()))
    }

    pub fn call_handle<T: Any + Send + Sync>(&self, arg: Option<&Value>) -> Option<Arc<T>> {
        self.node()?.handle(arg)?.downcast::<T>().ok()
    }

    /// Trees are computed, never assigned: always fails on live nodes.
    pub fn define_child(&self, name: &str, _child: &Locator) -> Result<(), LocatorError> {
        self.refuse(name, "define")
    }

    /// Always fails on live nodes.
    pub fn remove_child(&self, name: &str) -> Result<(), LocatorError> {
        self.refuse(name, "delete")
    }

    fn refuse(&self, name: &str, action: &'static str) -> Result<(), LocatorError> {
        match self.node() {
            Some(node) => Err(LocatorError::Immutable {
                path: node.label(),
                property: name.to_string(),
                action,
            }),
            None => Ok(()),
        }
    }

    /// Same node (or both the sentinel).
    pub fn ptr_eq(a: &Locator, b: &Locator) -> bool {
        match (&a.inner, &b.inner) {
            (Inner::Live(x), Inner::Live(y)) => Arc::ptr_eq(x, y),
            (Inner::Production(_), Inner::Production(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id().unwrap_or_default())
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Some(node) => f.debug_tuple("Locator").field(&node.label()).finish(),
            None => f.write_str("Locator(production)"),
        }
    }
}

impl Serialize for Locator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_key::CacheKeyMode;
    use crate::value::Parameters;

    fn options() -> GlobalOptions {
        GlobalOptions::default()
            .with_id_attribute("data-testid")
            .with_child_separator("-")
            .with_parameter_prefix("data-test-")
            .with_production(false)
    }

    #[test]
    fn children_are_cached() {
        let root = Locator::root("root", options()).unwrap();
        let a = root.child("foo");
        let b = root.child("foo");
        assert!(Locator::ptr_eq(&a, &b));
        assert!(!Locator::ptr_eq(&a, &root.child("bar")));
    }

    #[test]
    fn root_alias_reuses_parent() {
        let root = Locator::root("root", options()).unwrap();
        let foo = root.child("foo");
        assert!(Locator::ptr_eq(&foo.child(ROOT_ALIAS), &foo));
        assert_eq!(foo.child(ROOT_ALIAS).id(), Some("root-foo"));
        assert!(Locator::ptr_eq(&foo.child(""), &foo));
        assert_eq!(foo.descend(&["", "bar", ""]).id(), Some("root-foo-bar"));
    }

    #[test]
    fn ids_join_with_separator() {
        let root = Locator::root("app", options().with_child_separator(".")).unwrap();
        let leaf = root.descend(&["header", "nav", "home"]);
        assert_eq!(leaf.id(), Some("app.header.nav.home"));
        assert_eq!(leaf.segments(), ["app", "header", "nav", "home"]);
        assert_eq!(leaf.to_string(), "app.header.nav.home");
    }

    #[test]
    fn parent_walks_up() {
        let root = Locator::root("app", options()).unwrap();
        let nav = root.descend(&["header", "nav"]);
        let header = nav.parent().unwrap();
        assert!(Locator::ptr_eq(&header, &root.child("header")));
        assert!(Locator::ptr_eq(&header.parent().unwrap(), &root));
        assert!(root.parent().is_none());
    }

    #[test]
    fn attributes_are_reference_stable_per_key() {
        let root = Locator::root("root", options()).unwrap();
        let foo = root.child("foo");
        let a = foo.attributes_with(Parameters::from([("bar", "baz")])).unwrap();
        let b = foo.attributes_with(Parameters::from([("bar", "baz")])).unwrap();
        let c = foo.attributes_with(Parameters::from([("bar", "qux")])).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(a.get("data-test-bar"), Some("baz"));
    }

    #[test]
    fn no_argument_and_undefined_follow_cache_mode() {
        let loose = Locator::root("r", options()).unwrap();
        assert!(Arc::ptr_eq(
            &loose.attributes().unwrap(),
            &loose.attributes_with(Value::Undefined).unwrap()
        ));

        let strict = Locator::root("r", options().with_cache_key_mode(CacheKeyMode::Distinct)).unwrap();
        let none = strict.attributes().unwrap();
        let undefined = strict.attributes_with(Value::Undefined).unwrap();
        assert!(!Arc::ptr_eq(&none, &undefined));
        assert_eq!(*none, *undefined);
    }

    #[test]
    fn selector_compiles_wildcards() {
        let root = Locator::root("root", options()).unwrap();
        let sel = root
            .child("foo")
            .selector_with(Parameters::from([("bar", "baz*qux")]))
            .unwrap();
        assert_eq!(
            sel.css(),
            r#"[data-testid="root-foo"][data-test-bar^="baz"][data-test-bar$="qux"]"#
        );
        assert_eq!(sel.fragments().len(), 1);

        let again = root
            .child("foo")
            .selector_with(Parameters::from([("bar", "baz*qux")]))
            .unwrap();
        assert!(Arc::ptr_eq(&sel, &again));
    }

    #[test]
    fn attributes_keep_wildcards_literally() {
        let root = Locator::root("root", options()).unwrap();
        let attrs = root
            .child("foo")
            .attributes_with(Parameters::from([("bar", "baz*qux")]))
            .unwrap();
        assert_eq!(attrs.get("data-test-bar"), Some("baz*qux"));
    }

    #[test]
    fn handles_are_cached_and_typed() {
        #[derive(Debug, PartialEq)]
        struct TestId(String);

        let opts = options().with_handle_factory(|attrs| TestId(attrs.to_string()));
        let root = Locator::root("app", opts).unwrap();
        let h1 = root.child("save").handle::<TestId>().unwrap();
        let h2 = root.child("save").handle::<TestId>().unwrap();
        assert_eq!(*h1, TestId("app-save".into()));
        assert!(Arc::ptr_eq(&h1, &h2));
        assert!(root.child("save").handle::<String>().is_none());
    }

    #[test]
    fn handle_factory_may_reenter_its_node() {
        let node: Arc<OnceLock<Locator>> = Arc::new(OnceLock::new());
        let nested = Arc::new(AtomicBool::new(false));
        let opts = options().with_handle_factory({
            let node = Arc::clone(&node);
            let nested = Arc::clone(&nested);
            move |attrs: &Attributes| {
                if !nested.swap(true, Ordering::SeqCst) {
                    let inner = node.get().and_then(|n| n.handle::<String>());
                    assert_eq!(inner.as_deref().map(String::as_str), Some("app-save"));
                }
                attrs.to_string()
            }
        });
        let root = Locator::root("app", opts).unwrap();
        let save = root.child("save");
        node.set(save.clone()).unwrap();

        let outer = save.handle::<String>().unwrap();
        assert_eq!(outer.as_str(), "app-save");
        assert!(nested.load(Ordering::SeqCst));
        assert!(Arc::ptr_eq(&outer, &save.handle::<String>().unwrap()));
    }

    #[test]
    fn handle_without_factory_is_none() {
        let root = Locator::root("app", options()).unwrap();
        assert!(root.handle::<String>().is_none());
    }

    #[test]
    fn live_nodes_refuse_mutation() {
        let root = Locator::root("app", options()).unwrap();
        let other = root.child("x");
        let err = root.define_child("x", &other).unwrap_err();
        assert!(matches!(err, LocatorError::Immutable { action: "define", .. }));
        assert!(root.remove_child("x").is_err());
        assert!(Locator::ptr_eq(&root.child("x"), &other));
    }

    #[test]
    fn production_root_is_sentinel() {
        let root = Locator::root("app", options().with_production(true)).unwrap();
        assert!(root.is_production());
        let deep = root.child("a").child("b").descend(&["c", "d"]);
        assert!(Locator::ptr_eq(&deep, &Locator::production()));
        assert!(deep.attributes().unwrap().is_empty());
        assert_eq!(deep.selector().unwrap().css(), "");
        assert_eq!(deep.to_string(), "");
        assert_eq!(deep.id(), Some(""));
        assert!(deep.define_child("x", &root).is_ok());
        assert!(deep.remove_child("x").is_ok());
        assert!(deep.parent().is_none());
        assert!(deep.segments().is_empty());
    }

    #[test]
    fn standalone_root_validates_id_and_options() {
        let err = Locator::root("app", options().with_id_attribute("")).unwrap_err();
        assert!(matches!(err, LocatorError::InvalidOptions(_)));

        let err = Locator::root("", options()).unwrap_err();
        assert_eq!(err, LocatorError::InvalidLocatorId(String::new()));

        // Production never validates.
        assert!(
            Locator::root("", options().with_id_attribute("").with_production(true))
                .unwrap()
                .is_production()
        );
    }

    #[test]
    fn locator_serializes_as_id() {
        let root = Locator::root("app", options()).unwrap();
        let json = serde_json::to_string(&root.child("menu")).unwrap();
        assert_eq!(json, r#""app-menu""#);
        assert_eq!(
            serde_json::to_string(&Locator::production()).unwrap(),
            r#""""#
        );
    }
}
