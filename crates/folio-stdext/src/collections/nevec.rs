//! A vector that is never empty.
//!
//! The engine uses this for stacks whose bottom element must always exist,
//! like the mode stack, whose bottom is the outer vertical list of the document.
//!
//! ```
//! # use folio_stdext::collections::nevec::NeVec;
//! let mut stack = NeVec::new("outer");
//! stack.push("inner");
//! assert_eq!(stack.last(), &"inner");
//! assert_eq!(stack.pop(), Some("inner"));
//! assert_eq!(stack.pop(), None);
//! assert_eq!(stack.last(), &"outer");
//! ```

/// A non-empty vector.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeVec<T> {
    first: T,
    rest: Vec<T>,
}

impl<T> NeVec<T> {
    /// Creates a vector with a single element.
    pub fn new(first: T) -> NeVec<T> {
        NeVec {
            first,
            rest: Vec::new(),
        }
    }

    /// Appends an element.
    pub fn push(&mut self, elem: T) {
        self.rest.push(elem)
    }

    /// Removes the last element, unless it is the only one.
    pub fn pop(&mut self) -> Option<T> {
        self.rest.pop()
    }

    pub fn first(&self) -> &T {
        &self.first
    }

    pub fn first_mut(&mut self) -> &mut T {
        &mut self.first
    }

    pub fn last(&self) -> &T {
        self.rest.last().unwrap_or(&self.first)
    }

    pub fn last_mut(&mut self) -> &mut T {
        self.rest.last_mut().unwrap_or(&mut self.first)
    }

    /// Returns the element below the last one, if there is one.
    pub fn penultimate_mut(&mut self) -> Option<&mut T> {
        match self.rest.len() {
            0 => None,
            1 => Some(&mut self.first),
            n => self.rest.get_mut(n - 2),
        }
    }

    pub fn len(&self) -> usize {
        self.rest.len() + 1
    }

    /// Always false; present so the type reads like other collections.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        match index {
            0 => Some(&self.first),
            _ => self.rest.get(index - 1),
        }
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penultimate() {
        let mut v = NeVec::new(1);
        assert_eq!(v.penultimate_mut(), None);
        v.push(2);
        assert_eq!(v.penultimate_mut(), Some(&mut 1));
        v.push(3);
        assert_eq!(v.penultimate_mut(), Some(&mut 2));
    }

    #[test]
    fn iter_and_get() {
        let mut v = NeVec::new('a');
        v.push('b');
        v.push('c');
        let all: String = v.iter().collect();
        assert_eq!(all, "abc");
        let reversed: String = v.iter().rev().collect();
        assert_eq!(reversed, "cba");
        assert_eq!(v.get(2), Some(&'c'));
        assert_eq!(v.get(3), None);
        assert_eq!(v.len(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_keeps_the_first_element_separate() {
        let mut v = NeVec::new(1);
        v.push(2);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"first":1,"rest":[2]}"#);
        let back: NeVec<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
        assert!(serde_json::from_str::<NeVec<i32>>(r#"{"rest":[2]}"#).is_err());
    }

    #[test]
    fn first_cannot_be_popped() {
        let mut v = NeVec::new(5);
        *v.last_mut() += 1;
        assert_eq!(v.pop(), None);
        assert_eq!(v.first(), &6);
    }
}
