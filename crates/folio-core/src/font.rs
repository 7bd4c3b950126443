//! The font-metric interface.
//!
//! The engine never reads font files itself.
//! Everything it needs to know about a font comes through [FontMetrics]:
//! the dimensions of each character, and the kern and ligature programs
//! consulted when a finished horizontal list is post-processed.

use std::collections::HashMap;

use crate::{Glue, Scaled};

/// Identifier of a loaded font.
///
/// The id is an index into whatever registry the embedding application keeps.
/// [FontId::NULL] is the font in effect before any font is selected.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontId(pub u32);

impl FontId {
    pub const NULL: FontId = FontId(0);
}

/// Result of a ligature lookup for a pair of characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ligature {
    /// Character that replaces the pair.
    pub char: char,
    /// If false, only the left character is replaced,
    /// and the right character remains to be combined with the ligature.
    pub consume_both: bool,
}

/// Metrics of a font, as needed by the engine.
pub trait FontMetrics {
    fn width_of(&self, font: FontId, c: char) -> Scaled;

    fn height_of(&self, font: FontId, c: char) -> Scaled;

    fn depth_of(&self, font: FontId, c: char) -> Scaled;

    /// Kern to insert between two adjacent characters, if any.
    fn kern_between(&self, font: FontId, left: char, right: char) -> Option<Scaled>;

    /// Ligature formed by two adjacent characters, if any.
    fn ligature_for(&self, font: FontId, left: char, right: char) -> Option<Ligature>;

    /// Glue inserted for a space character.
    ///
    /// The default is the width of a space, stretching by a half and shrinking by a third.
    fn interword_glue(&self, font: FontId) -> Glue {
        let width = self.width_of(font, ' ');
        Glue::new(width, width / 2, width / 3)
    }
}

/// Dimensions of one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharMetrics {
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
}

/// A table-driven [FontMetrics] implementation.
///
/// Every character has the default metrics unless overridden,
/// and the same tables serve every font.
/// This is enough to run documents deterministically without font files.
#[derive(Debug, Clone)]
pub struct FixedMetrics {
    default: CharMetrics,
    chars: HashMap<char, CharMetrics>,
    kerns: HashMap<(char, char), Scaled>,
    ligatures: HashMap<(char, char), Ligature>,
    interword: Option<Glue>,
}

impl Default for FixedMetrics {
    /// Every character is 5pt wide and 7pt high,
    /// and spaces are 3.33pt plus 1.67pt minus 1.11pt.
    fn default() -> Self {
        FixedMetrics::new(CharMetrics {
            width: Scaled::ONE * 5,
            height: Scaled::ONE * 7,
            depth: Scaled::ZERO,
        })
        .with_interword_glue(Glue::new(
            Scaled(218235),
            Scaled(109445),
            Scaled(72745),
        ))
    }
}

impl FixedMetrics {
    pub fn new(default: CharMetrics) -> FixedMetrics {
        FixedMetrics {
            default,
            chars: Default::default(),
            kerns: Default::default(),
            ligatures: Default::default(),
            interword: None,
        }
    }

    pub fn with_char(mut self, c: char, metrics: CharMetrics) -> Self {
        self.chars.insert(c, metrics);
        self
    }

    pub fn with_kern(mut self, left: char, right: char, kern: Scaled) -> Self {
        self.kerns.insert((left, right), kern);
        self
    }

    pub fn with_ligature(mut self, left: char, right: char, ligature: Ligature) -> Self {
        self.ligatures.insert((left, right), ligature);
        self
    }

    pub fn with_interword_glue(mut self, glue: Glue) -> Self {
        self.interword = Some(glue);
        self
    }

    fn get(&self, c: char) -> &CharMetrics {
        self.chars.get(&c).unwrap_or(&self.default)
    }
}

impl FontMetrics for FixedMetrics {
    fn width_of(&self, _: FontId, c: char) -> Scaled {
        self.get(c).width
    }

    fn height_of(&self, _: FontId, c: char) -> Scaled {
        self.get(c).height
    }

    fn depth_of(&self, _: FontId, c: char) -> Scaled {
        self.get(c).depth
    }

    fn kern_between(&self, _: FontId, left: char, right: char) -> Option<Scaled> {
        self.kerns.get(&(left, right)).copied()
    }

    fn ligature_for(&self, _: FontId, left: char, right: char) -> Option<Ligature> {
        self.ligatures.get(&(left, right)).copied()
    }

    fn interword_glue(&self, font: FontId) -> Glue {
        match self.interword {
            Some(glue) => glue,
            None => {
                let width = self.width_of(font, ' ');
                Glue::new(width, width / 2, width / 3)
            }
        }
    }
}
