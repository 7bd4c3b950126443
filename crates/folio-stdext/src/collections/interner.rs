//! String interning
//!
//! Control sequence names are compared and hashed constantly while a document runs,
//! so they are interned: each distinct name is stored once and represented by a small
//! integer key.
//!
//! ```
//! # use folio_stdext::collections::interner::Interner;
//! let mut interner: Interner = Default::default();
//! let par_1 = interner.get_or_intern("par");
//! let relax = interner.get_or_intern("relax");
//! let par_2 = interner.get_or_intern("par");
//! assert_eq!(par_1, par_2);
//! assert_ne!(par_1, relax);
//!
//! assert_eq!(interner.resolve(par_1), Some("par"));
//! assert_eq!(interner.get("relax"), Some(relax));
//! assert_eq!(interner.get("undefined"), None);
//! ```
//!
//! Interned strings are never deallocated.

use std::collections::HashMap;
use std::num;
use std::rc::Rc;

/// Types implementing this trait can be used as keys in the [Interner].
pub trait Key: Copy {
    /// Create a key from an index. The first string interned gets index 0.
    ///
    /// Returns `None` if the index cannot be represented.
    fn try_from_index(index: usize) -> Option<Self>;

    /// Convert the key back to its index.
    fn into_index(self) -> usize;
}

impl Key for num::NonZeroU32 {
    fn try_from_index(index: usize) -> Option<Self> {
        let index: u32 = index.try_into().ok()?;
        num::NonZeroU32::new(index.checked_add(1)?)
    }

    fn into_index(self) -> usize {
        self.get() as usize - 1
    }
}

/// String interner.
///
/// See the module documentation.
#[derive(Debug)]
pub struct Interner<K = num::NonZeroU32> {
    strings: Vec<Rc<str>>,
    keys: HashMap<Rc<str>, K>,
}

impl<K> Default for Interner<K> {
    fn default() -> Self {
        Self {
            strings: Vec::new(),
            keys: HashMap::new(),
        }
    }
}

impl<K: Key> Interner<K> {
    /// Intern the provided string and return its key.
    ///
    /// # Panics
    ///
    /// Panics if the key space is exhausted.
    /// With the default key this happens after 2^32-1 distinct strings.
    pub fn get_or_intern(&mut self, s: &str) -> K {
        if let Some(key) = self.keys.get(s) {
            return *key;
        }
        let key = K::try_from_index(self.strings.len())
            .expect("the interner key space is large enough for any document");
        let s: Rc<str> = s.into();
        self.strings.push(s.clone());
        self.keys.insert(s, key);
        key
    }

    /// Get the key for the provided string if it has been already been interned.
    pub fn get(&self, s: &str) -> Option<K> {
        self.keys.get(s).copied()
    }

    /// Return the interned string corresponding to the provided key.
    pub fn resolve(&self, key: K) -> Option<&str> {
        self.strings.get(key.into_index()).map(AsRef::as_ref)
    }

    /// Iterate over all interned strings in the order they were interned.
    pub fn iter(&self) -> impl Iterator<Item = (K, &str)> {
        self.strings.iter().enumerate().filter_map(|(i, s)| {
            K::try_from_index(i).map(|k| (k, s.as_ref()))
        })
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns whether no strings have been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
