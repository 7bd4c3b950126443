//! Spell checking using Levenshtein distance
//!
//! When a document uses an undefined control sequence, the error message suggests
//! defined names that are close to the misspelled one.
//! Closeness is [Levenshtein distance](https://en.wikipedia.org/wiki/Levenshtein_distance):
//! the minimal number of single character insertions, deletions and substitutions
//! turning one word into the other.
//!
//! ```
//! # use folio_stdext::algorithms::spellcheck::find_close_words;
//! let dictionary = ["hbox", "vbox", "hskip", "relax"];
//! let close = find_close_words(dictionary.iter().copied(), "hbx", 2);
//! assert_eq!(close[0].word, "hbox");
//! assert_eq!(close[0].distance, 1);
//! ```
//!
//! ## Implementation notes
//!
//! The distance is computed with the classic dynamic program.
//! Row `i` of the table holds the distances between `a[..i]` and every prefix of `b`,
//! and only depends on row `i-1`, so two rows of length `b.len()+1` are enough.

/// A dictionary word and its distance to the searched word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseWord {
    pub word: String,
    pub distance: usize,
}

/// Find the words in the dictionary within `max_distance` of the search word.
///
/// The result is ordered by distance, closest first.
/// Words at the same distance are ordered alphabetically so the output is deterministic.
pub fn find_close_words<'a, I: IntoIterator<Item = &'a str>>(
    dictionary: I,
    word: &str,
    max_distance: usize,
) -> Vec<CloseWord> {
    let mut close: Vec<CloseWord> = dictionary
        .into_iter()
        .filter_map(|candidate| {
            let distance = levenshtein_distance(word, candidate);
            if distance <= max_distance {
                Some(CloseWord {
                    word: candidate.to_string(),
                    distance,
                })
            } else {
                None
            }
        })
        .collect();
    close.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.word.cmp(&b.word)));
    close
}

/// Levenshtein distance between two strings, measured in chars.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, a_i) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_j) in b.iter().enumerate() {
            let modify = previous[j] + usize::from(a_i != *b_j);
            let subtract = previous[j + 1] + 1;
            let add = current[j] + 1;
            current[j + 1] = modify.min(subtract).min(add);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! distance_tests {
        ( $( ($name: ident, $a: expr, $b: expr, $want: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                assert_eq!(levenshtein_distance($a, $b), $want);
                assert_eq!(levenshtein_distance($b, $a), $want);
            }
            )+
        };
    }

    distance_tests!(
        (both_empty, "", "", 0),
        (one_empty, "", "abc", 3),
        (identical, "relax", "relax", 0),
        (substitution, "hbox", "vbox", 1),
        (insertion, "hbx", "hbox", 1),
        (kitten_sitting, "kitten", "sitting", 3),
    );

    #[test]
    fn results_are_sorted() {
        let dictionary = ["vbox", "hbox", "box", "relax"];
        let close = find_close_words(dictionary.iter().copied(), "hbox", 1);
        let words: Vec<&str> = close.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(words, vec!["hbox", "box", "vbox"]);
    }
}
