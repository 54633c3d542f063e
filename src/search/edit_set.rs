//! Generic keyed diff between two collections.
//!
//! Translates "old matched lines" vs "new matched lines" into the minimal
//! set of add/update/remove deltas for an open result stream, but carries
//! no search-specific knowledge itself.

use std::collections::HashMap;
use std::hash::Hash;

/// One diff operation relating a "before" item and/or an "after" item
/// sharing the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation<B, A> {
    /// Key only present in "after".
    Insert(A),
    /// Key present on both sides; the item may still have changed.
    Keep(B, A),
    /// Key only present in "before".
    Delete(B),
}

/// Diff `before` against `after`, keyed through the two extraction
/// functions into a common key space.
///
/// Produces exactly one operation per distinct key across the union of
/// both key sets, in no guaranteed order. Duplicate keys within one side
/// resolve to the last-seen item.
pub fn calculate<K, B, A>(
    before: impl IntoIterator<Item = B>,
    after: impl IntoIterator<Item = A>,
    before_key: impl Fn(&B) -> K,
    after_key: impl Fn(&A) -> K,
) -> Vec<EditOperation<B, A>>
where
    K: Eq + Hash,
{
    let mut paired: HashMap<K, (Option<B>, Option<A>)> = HashMap::new();

    for item in before {
        let key = before_key(&item);
        paired.entry(key).or_insert((None, None)).0 = Some(item);
    }
    for item in after {
        let key = after_key(&item);
        paired.entry(key).or_insert((None, None)).1 = Some(item);
    }

    paired
        .into_values()
        .filter_map(|pair| match pair {
            (None, Some(new)) => Some(EditOperation::Insert(new)),
            (Some(old), Some(new)) => Some(EditOperation::Keep(old, new)),
            (Some(old), None) => Some(EditOperation::Delete(old)),
            (None, None) => None,
        })
        .collect()
}
