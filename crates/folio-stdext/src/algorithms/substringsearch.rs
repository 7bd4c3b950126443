//! Knuth–Morris–Pratt substring search
//!
//! Delimited macro arguments end at the first occurrence of a delimiter sequence,
//! and the tokens of the argument arrive one at a time from a live stream.
//! The KMP algorithm suits this exactly: a [Matcher] is built once per delimiter,
//! and a fresh [Search] consumes elements as they are produced,
//! reporting a match in amortized constant time per element.
//!
//! ```
//! # use folio_stdext::algorithms::substringsearch::Matcher;
//! let matcher = Matcher::new(vec!['a', 'b', 'a']).unwrap();
//! let mut search = matcher.start();
//! assert_eq![search.next(&'x'), false];
//! assert_eq![search.next(&'a'), false];
//! assert_eq![search.next(&'b'), false];
//! assert_eq![search.next(&'a'), true];
//! assert_eq![search.next(&'b'), false];
//! assert_eq![search.next(&'a'), true];
//! ```

/// Data structure used to match a specific non-empty substring in many strings.
#[derive(Debug, Clone)]
pub struct Matcher<T: PartialEq> {
    substring: Vec<T>,
    // prefix[i] is the length of the longest proper prefix of substring[..=i]
    // that is also a suffix of it.
    prefix: Vec<usize>,
}

impl<T: PartialEq> Matcher<T> {
    /// Create a new matcher for the provided substring.
    ///
    /// Returns `None` if the substring is empty.
    pub fn new(substring: Vec<T>) -> Option<Matcher<T>> {
        if substring.is_empty() {
            return None;
        }
        let mut prefix = Vec::with_capacity(substring.len());
        prefix.push(0);
        let mut k = 0;
        for i in 1..substring.len() {
            while k > 0 && substring[k] != substring[i] {
                k = prefix[k - 1];
            }
            if substring[k] == substring[i] {
                k += 1;
            }
            prefix.push(k);
        }
        Some(Matcher { substring, prefix })
    }

    /// Start a new search.
    pub fn start(&self) -> Search<'_, T> {
        Search {
            matcher: self,
            matched: 0,
        }
    }

    /// The substring this matcher searches for.
    pub fn substring(&self) -> &[T] {
        &self.substring
    }
}

impl<T: PartialEq> PartialEq for Matcher<T> {
    fn eq(&self, other: &Self) -> bool {
        self.substring == other.substring
    }
}

/// An in-progress search for a substring within a specific string.
pub struct Search<'a, T: PartialEq> {
    matcher: &'a Matcher<T>,
    matched: usize,
}

impl<'a, T: PartialEq> Search<'a, T> {
    /// Provide the next element of the string.
    ///
    /// Returns true if the most recent elements are exactly the substring.
    pub fn next(&mut self, elem: &T) -> bool {
        let substring = &self.matcher.substring;
        while self.matched > 0 && &substring[self.matched] != elem {
            self.matched = self.matcher.prefix[self.matched - 1];
        }
        if &substring[self.matched] == elem {
            self.matched += 1;
        }
        if self.matched == substring.len() {
            self.matched = self.matcher.prefix[self.matched - 1];
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn match_positions(substring: &str, string: &str) -> Vec<usize> {
        let matcher = Matcher::new(substring.chars().collect()).unwrap();
        let mut search = matcher.start();
        string
            .chars()
            .enumerate()
            .filter_map(|(i, c)| if search.next(&c) { Some(i) } else { None })
            .collect()
    }

    macro_rules! kmp_tests {
        ( $( ($name: ident, $substring: expr, $string: expr, $want: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                assert_eq!(match_positions($substring, $string), $want);
            }
            )+
        };
    }

    kmp_tests!(
        (single_element, "a", "banana", vec![1, 3, 5]),
        (overlapping, "ana", "banana", vec![3, 5]),
        (no_match, "xyz", "banana", Vec::<usize>::new()),
        (whole_string, "banana", "banana", vec![5]),
        (repeated_prefix, "aab", "aaab", vec![3]),
        (longer_than_string, "bananas", "banana", Vec::<usize>::new()),
    );

    #[test]
    fn empty_substring() {
        assert!(Matcher::<char>::new(vec![]).is_none());
    }
}
