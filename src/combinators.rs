//! Union and descendant-chain combinations of compiled selectors.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;

use crate::css::Selector;
use crate::error::LocatorError;
use crate::production::ProductionSentinel;

#[derive(Default)]
struct Memo {
    unions: HashMap<String, Arc<Selector>>,
    chains: HashMap<String, Arc<Selector>>,
}

static MEMO: LazyLock<Mutex<Memo>> = LazyLock::new(|| Mutex::new(Memo::default()));

/// Punctuation and symbols in root-locale collation order.
const PUNCTUATION: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

/// Primary weight: whitespace, then punctuation, then digits, then letters
/// compared without case.
fn primary(c: char) -> (u8, u32) {
    if c.is_whitespace() {
        (0, c as u32)
    } else if let Some(rank) = PUNCTUATION.find(c) {
        (1, rank as u32)
    } else if c.is_ascii_digit() {
        (2, c as u32)
    } else {
        (3, c.to_lowercase().next().unwrap_or(c) as u32)
    }
}

/// Locale-style ordering, lowercase before uppercase on ties.
fn collate(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(primary)
        .cmp(b.chars().map(primary))
        .then_with(|| b.cmp(a))
}

/// Shared prologue: empty check, single input, production absorption.
fn trivial(
    selectors: &[Arc<Selector>],
    combinator: &'static str,
) -> Result<Option<Arc<Selector>>, LocatorError> {
    let Some((first, rest)) = selectors.split_first() else {
        return Err(LocatorError::EmptyArgumentList { combinator });
    };
    if rest.is_empty() {
        return Ok(Some(Arc::clone(first)));
    }
    let sentinel = ProductionSentinel::get();
    Ok(selectors
        .iter()
        .find(|s| sentinel.owns_selector(s))
        .map(Arc::clone))
}

/// Match an element matching any of `selectors`, as `:is(f1, f2, …)`.
///
/// Fragments of every input are merged, deduplicated, and sorted, so unions
/// of unions stay flat. When the merged set equals an input's own fragments
/// that input is returned unchanged.
pub fn find_any_of_selectors(selectors: &[Arc<Selector>]) -> Result<Arc<Selector>, LocatorError> {
    if let Some(done) = trivial(selectors, "find_any_of_selectors")? {
        return Ok(done);
    }

    let mut fragments: Vec<String> = selectors
        .iter()
        .flat_map(|s| s.fragments().iter().cloned())
        .collect();
    fragments.sort_by(|a, b| collate(a, b));
    fragments.dedup();

    if let Some(same) = selectors.iter().find(|s| s.fragments() == fragments.as_slice()) {
        return Ok(Arc::clone(same));
    }

    let css = format!(":is({})", fragments.join(", "));
    let mut memo = MEMO.lock();
    let union = memo
        .unions
        .entry(css.clone())
        .or_insert_with(|| Arc::new(Selector::from_parts(css, fragments)));
    Ok(Arc::clone(union))
}

/// Match a descendant chain, left to right: `a b c`.
///
/// Inputs contribute their compiled CSS as-is; nested chains are not
/// flattened.
pub fn find_chain_of_selectors(
    selectors: &[Arc<Selector>],
) -> Result<Arc<Selector>, LocatorError> {
    if let Some(done) = trivial(selectors, "find_chain_of_selectors")? {
        return Ok(done);
    }

    let css = selectors
        .iter()
        .map(|s| s.css())
        .collect::<Vec<_>>()
        .join(" ");
    let mut memo = MEMO.lock();
    let chain = memo
        .chains
        .entry(css.clone())
        .or_insert_with(|| Arc::new(Selector::single(css)));
    Ok(Arc::clone(chain))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(css: &str) -> Arc<Selector> {
        Arc::new(Selector::single(css.to_string()))
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            find_any_of_selectors(&[]),
            Err(LocatorError::EmptyArgumentList { combinator: "find_any_of_selectors" })
        ));
        assert!(matches!(
            find_chain_of_selectors(&[]),
            Err(LocatorError::EmptyArgumentList { combinator: "find_chain_of_selectors" })
        ));
    }

    #[test]
    fn single_input_is_returned_unchanged() {
        let x = sel(r#"[a="1"]"#);
        assert!(Arc::ptr_eq(&find_any_of_selectors(&[x.clone()]).unwrap(), &x));
        assert!(Arc::ptr_eq(&find_chain_of_selectors(&[x.clone()]).unwrap(), &x));
    }

    #[test]
    fn union_is_idempotent() {
        let x = sel(r#"[a="1"]"#);
        let any = find_any_of_selectors(&[x.clone(), x.clone()]).unwrap();
        assert!(Arc::ptr_eq(&any, &x));
    }

    #[test]
    fn union_sorts_and_dedupes() {
        let b = sel(r#"[t="b"]"#);
        let a = sel(r#"[t="a"]"#);
        let any = find_any_of_selectors(&[b.clone(), a.clone(), b]).unwrap();
        assert_eq!(any.css(), r#":is([t="a"], [t="b"])"#);
        assert_eq!(any.fragments().len(), 2);
    }

    #[test]
    fn union_of_union_is_flat() {
        let a = sel(r#"[t="a"]"#);
        let b = sel(r#"[t="b"]"#);
        let c = sel(r#"[t="c"]"#);
        let ab = find_any_of_selectors(&[a.clone(), b.clone()]).unwrap();
        let abc = find_any_of_selectors(&[c.clone(), ab.clone()]).unwrap();
        assert_eq!(abc.css(), r#":is([t="a"], [t="b"], [t="c"])"#);
        assert!(!abc.css().contains(":is(:is"));

        // Re-adding a member returns the existing union.
        let again = find_any_of_selectors(&[ab.clone(), a]).unwrap();
        assert!(Arc::ptr_eq(&again, &ab));
    }

    #[test]
    fn unions_are_memoized() {
        let a = sel(r#"[m="a"]"#);
        let b = sel(r#"[m="b"]"#);
        let first = find_any_of_selectors(&[a.clone(), b.clone()]).unwrap();
        let second = find_any_of_selectors(&[b, a]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn chain_joins_compiled_css_in_order() {
        let a = sel(r#"[t="a"]"#);
        let b = sel(r#"[t="b"]"#);
        let c = sel(r#"[t="c"]"#);
        let ab = find_chain_of_selectors(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(ab.css(), r#"[t="a"] [t="b"]"#);

        let nested = find_chain_of_selectors(&[ab, c.clone()]).unwrap();
        assert_eq!(nested.css(), r#"[t="a"] [t="b"] [t="c"]"#);

        let union = find_any_of_selectors(&[a, b]).unwrap();
        let mixed = find_chain_of_selectors(&[union, c]).unwrap();
        assert_eq!(mixed.css(), r#":is([t="a"], [t="b"]) [t="c"]"#);
    }

    #[test]
    fn chains_can_join_unions() {
        let a = sel(r#"[u="a"]"#);
        let chain = find_chain_of_selectors(&[a.clone(), a.clone()]).unwrap();
        let any = find_any_of_selectors(&[chain, a]).unwrap();
        assert_eq!(any.css(), r#":is([u="a"], [u="a"] [u="a"])"#);
    }

    #[test]
    fn production_selector_absorbs() {
        let empty = ProductionSentinel::get().selector();
        let a = sel(r#"[p="a"]"#);
        let any = find_any_of_selectors(&[a.clone(), empty.clone()]).unwrap();
        let chain = find_chain_of_selectors(&[empty.clone(), a]).unwrap();
        assert!(Arc::ptr_eq(&any, &empty));
        assert!(Arc::ptr_eq(&chain, &empty));
    }

    #[test]
    fn collation_is_case_insensitive_lowercase_first() {
        assert_eq!(collate("b", "A"), Ordering::Greater);
        assert_eq!(collate("a", "A"), Ordering::Less);
        assert_eq!(collate("abc", "abc"), Ordering::Equal);
    }

    #[test]
    fn punctuation_sorts_before_alphanumerics() {
        assert_eq!(collate("a_b", "a-b"), Ordering::Less);
        assert_eq!(collate("a-b", "a1"), Ordering::Less);
        assert_eq!(collate("a9", "aa"), Ordering::Less);
        assert_eq!(collate("a b", "a_b"), Ordering::Less);

        let dash = sel(r#"[k="a-b"]"#);
        let underscore = sel(r#"[k="a_b"]"#);
        let any = find_any_of_selectors(&[dash, underscore]).unwrap();
        assert_eq!(any.css(), r#":is([k="a_b"], [k="a-b"])"#);
    }
}
