//! Category codes.

use std::fmt;

/// The category of a character, which decides how the lexer treats it.
///
/// Categories are looked up in the state store each time a character is scanned,
///     so changing a category only affects characters not yet read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CatCode {
    /// Starts a control sequence name, like `\`.
    ///
    /// Never seen outside the lexer.
    Escape = 0,
    /// Opens a group, like `{`.
    BeginGroup = 1,
    /// Closes a group, like `}`.
    EndGroup = 2,
    MathShift = 3,
    /// Separates cells of an alignment, like `&`.
    AlignmentTab = 4,
    /// Ends a line of input.
    /// The rest of the line after this character is dropped.
    ///
    /// Never seen outside the lexer.
    EndOfLine = 5,
    /// Marks a macro parameter, like `#`.
    Parameter = 6,
    Superscript = 7,
    Subscript = 8,
    /// Dropped by the lexer.
    Ignored = 9,
    Space = 10,
    /// Characters that make up control words.
    Letter = 11,
    #[default]
    Other = 12,
    /// A single character that behaves like a control sequence, like `~`.
    Active = 13,
    /// Starts a comment running to the end of the line, like `%`.
    ///
    /// Never seen outside the lexer.
    Comment = 14,
    /// Makes the lexer report an error, like ASCII delete.
    ///
    /// Never seen outside the lexer.
    Invalid = 15,
}

use CatCode::*;

impl CatCode {
    /// All categories, ordered by their numeric value.
    pub const ALL: [CatCode; 16] = [
        Escape,
        BeginGroup,
        EndGroup,
        MathShift,
        AlignmentTab,
        EndOfLine,
        Parameter,
        Superscript,
        Subscript,
        Ignored,
        Space,
        Letter,
        Other,
        Active,
        Comment,
        Invalid,
    ];

    /// The category a character has before anything changes it.
    ///
    /// These are the plain format's assignments for ASCII characters.
    /// Every other character is [Other].
    pub fn initial(c: char) -> CatCode {
        match c {
            '\\' => Escape,
            '{' => BeginGroup,
            '}' => EndGroup,
            '$' => MathShift,
            '&' => AlignmentTab,
            '\r' => EndOfLine,
            '#' => Parameter,
            '^' => Superscript,
            '_' => Subscript,
            '\u{0}' => Ignored,
            ' ' | '\t' => Space,
            'a'..='z' | 'A'..='Z' => Letter,
            '~' => Active,
            '%' => Comment,
            '\u{7F}' => Invalid,
            _ => Other,
        }
    }
}

impl TryFrom<u8> for CatCode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        CatCode::ALL.get(value as usize).copied().ok_or(())
    }
}

impl fmt::Display for CatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_round_trip() {
        for cat_code in CatCode::ALL {
            assert_eq!(CatCode::try_from(cat_code as u8), Ok(cat_code));
        }
        assert_eq!(CatCode::try_from(16), Err(()));
    }

    #[test]
    fn initial_values() {
        assert_eq!(CatCode::initial('\\'), Escape);
        assert_eq!(CatCode::initial('q'), Letter);
        assert_eq!(CatCode::initial('1'), Other);
        assert_eq!(CatCode::initial('é'), Other);
        assert_eq!(CatCode::initial('\r'), EndOfLine);
    }
}
