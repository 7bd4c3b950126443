//! Maps with a grouping concept such that mutations are rolled back at the end of each group.
//!
//! A [GroupingMap] behaves like a hash map with two extra operations:
//! [begin_group](GroupingMap::begin_group) and [end_group](GroupingMap::end_group).
//! Local mutations made while a group is open are undone when the group ends.
//! Global mutations are never undone.
//!
//! ```
//! # use folio_stdext::collections::groupingmap::GroupingMap;
//! # use folio_stdext::collections::groupingmap::Scope;
//! let mut registers = GroupingMap::default();
//! registers.insert("count0", 1, Scope::Local);
//! registers.begin_group();
//! registers.insert("count0", 2, Scope::Local);
//! registers.insert("count0", 3, Scope::Local);
//! assert_eq!(registers.get(&"count0"), Some(&3));
//! assert_eq!(registers.end_group(), Ok(()));
//! assert_eq!(registers.get(&"count0"), Some(&1));
//! ```
//!
//! A global insert purges every pending restore for its key, so no enclosing group
//! resurrects an older value when it ends:
//!
//! ```
//! # use folio_stdext::collections::groupingmap::GroupingMap;
//! # use folio_stdext::collections::groupingmap::Scope;
//! let mut registers = GroupingMap::default();
//! registers.insert("count0", 1, Scope::Local);
//! registers.begin_group();
//! registers.insert("count0", 2, Scope::Local);
//! registers.begin_group();
//! registers.insert("count0", 3, Scope::Global);
//! assert_eq!(registers.end_group(), Ok(()));
//! assert_eq!(registers.end_group(), Ok(()));
//! assert_eq!(registers.get(&"count0"), Some(&3));
//! ```
//!
//! ## Running time
//!
//! Each group holds a save list: a map from key to the action needed to restore the
//! key when the group ends.
//! Only the first local write to a key in a group records an action.
//! Ending a group replays its save list, so the cost of `end_group` is bounded by the
//! number of distinct keys written in the group.
//! A global insert walks every open group, which is linear in the nesting depth.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// Scope of an insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scope {
    /// Rolled back at the end of the current group.
    Local,
    /// Survives the end of every open group.
    Global,
}

#[derive(Debug, PartialEq, Eq)]
enum EndOfGroupAction<V> {
    Revert(V),
    Delete,
}

/// Error returned if there is no group to end when [GroupingMap::end_group] is invoked.
#[derive(Debug, PartialEq, Eq)]
pub struct NoGroupToEndError;

/// A hash map with group semantics.
///
/// See the module docs for more information.
#[derive(Debug)]
pub struct GroupingMap<K, V> {
    values: HashMap<K, V>,
    // The outermost (global) level has no save list as nothing is ever restored there.
    groups: Vec<HashMap<K, EndOfGroupAction<V>>>,
}

impl<K, V> Default for GroupingMap<K, V> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            groups: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> GroupingMap<K, V> {
    /// Inserts the key, value pair in the provided scope.
    ///
    /// Returns true if the key already had a value.
    pub fn insert(&mut self, key: K, mut val: V, scope: Scope) -> bool {
        let group = match scope {
            Scope::Local => self.groups.last_mut(),
            Scope::Global => {
                for group in &mut self.groups {
                    group.remove(&key);
                }
                None
            }
        };
        match (self.values.get_mut(&key), group) {
            (None, None) => {
                self.values.insert(key, val);
                false
            }
            (None, Some(group)) => {
                if let Entry::Vacant(vacant) = group.entry(key.clone()) {
                    vacant.insert(EndOfGroupAction::Delete);
                }
                self.values.insert(key, val);
                false
            }
            (Some(current), None) => {
                *current = val;
                true
            }
            (Some(current), Some(group)) => {
                std::mem::swap(&mut val, current);
                // Only the value from before the group's first write is kept.
                if let Entry::Vacant(vacant) = group.entry(key) {
                    vacant.insert(EndOfGroupAction::Revert(val));
                }
                true
            }
        }
    }

    /// Retrieves the currently visible value at the provided key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Returns whether a value is currently visible at the provided key.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Begins a new group.
    pub fn begin_group(&mut self) {
        // An empty hash map does not allocate, so opening a group with no writes is cheap.
        self.groups.push(HashMap::new());
    }

    /// Attempts to end the current group. Returns an error if there is no group to end.
    pub fn end_group(&mut self) -> Result<(), NoGroupToEndError> {
        let group = self.groups.pop().ok_or(NoGroupToEndError)?;
        for (key, action) in group {
            match action {
                EndOfGroupAction::Delete => {
                    self.values.remove(&key);
                }
                EndOfGroupAction::Revert(old_val) => {
                    self.values.insert(key, old_val);
                }
            }
        }
        Ok(())
    }

    /// Number of groups currently open.
    #[inline]
    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Number of restore actions pending in the innermost group.
    pub fn pending_restores(&self) -> usize {
        self.groups.last().map(HashMap::len).unwrap_or(0)
    }

    /// Iterate over all currently visible (key, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.values.iter()
    }

    /// Returns the number of visible elements.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the map has no visible elements.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> FromIterator<(K, V)> for GroupingMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        GroupingMap {
            values: iter.into_iter().collect(),
            groups: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_after_nested_insert() {
        let mut map = GroupingMap::default();
        map.begin_group();
        map.insert(3, 5, Scope::Local);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.get(&3), None);
        map.insert(3, 4, Scope::Local);
        assert_eq!(map.get(&3), Some(&4));
    }

    #[test]
    fn insert_global_after_no_insert() {
        let mut map = GroupingMap::default();
        map.begin_group();
        map.insert(3, 5, Scope::Global);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.get(&3), Some(&5));
    }

    #[test]
    fn end_group_without_group() {
        let mut map = GroupingMap::<usize, usize>::default();
        assert_eq!(map.end_group(), Err(NoGroupToEndError));
    }

    #[test]
    fn only_first_write_in_group_is_saved() {
        let mut map = GroupingMap::default();
        map.insert(1, 10, Scope::Local);
        map.begin_group();
        map.insert(1, 20, Scope::Local);
        map.insert(1, 30, Scope::Local);
        assert_eq!(map.pending_restores(), 1);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.get(&1), Some(&10));
    }

    #[test]
    fn global_purges_saves_in_all_groups() {
        let mut map = GroupingMap::default();
        map.insert(1, 10, Scope::Local);
        map.begin_group();
        map.insert(1, 20, Scope::Local);
        map.begin_group();
        map.insert(1, 30, Scope::Local);
        map.insert(1, 40, Scope::Global);
        assert_eq!(map.pending_restores(), 0);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.get(&1), Some(&40));
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.get(&1), Some(&40));
    }

    #[test]
    fn local_after_global_is_restored_to_global_value() {
        let mut map = GroupingMap::default();
        map.begin_group();
        map.insert(1, 10, Scope::Global);
        map.insert(1, 20, Scope::Local);
        assert_eq!(map.end_group(), Ok(()));
        assert_eq!(map.get(&1), Some(&10));
    }

    macro_rules! nesting_tests {
        ( $( ($name: ident, $depth: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                let mut map = GroupingMap::default();
                map.insert("x", 0, Scope::Local);
                for i in 1..=$depth {
                    map.begin_group();
                    map.insert("x", i, Scope::Local);
                }
                for i in (0..$depth).rev() {
                    assert_eq!(map.end_group(), Ok(()));
                    assert_eq!(map.get(&"x"), Some(&i));
                }
                assert_eq!(map.depth(), 0);
            }
            )+
        };
    }

    nesting_tests!(
        (nesting_depth_1, 1),
        (nesting_depth_2, 2),
        (nesting_depth_7, 7),
        (nesting_depth_50, 50),
    );

    #[cfg(feature = "serde")]
    #[test]
    fn scope_serde() {
        assert_eq!(serde_json::to_string(&Scope::Global).unwrap(), r#""Global""#);
        let scope: Scope = serde_json::from_str(r#""Local""#).unwrap();
        assert_eq!(scope, Scope::Local);
        assert!(serde_json::from_str::<Scope>(r#""Temporary""#).is_err());
    }
}
