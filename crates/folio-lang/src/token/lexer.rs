//! The lexer, which turns source text into tokens.
//!
//! Lexing is "just in time": a token is only produced when it is requested.
//! Category codes can change while the input is being read, so the category
//!     of each character is looked up at the moment the character is scanned.
//! Consider, with the usual categories,
//! ```tex
//! \catcode`\A=10 AB
//! ```
//! Read as a batch this would give a control sequence and the letters `A` and `B`.
//! Read just in time, `A` is a space by the time it is scanned and is skipped,
//!     so only `B` follows the assignment.
//!
//! Input is read line by line.
//! Trailing spaces of each line are removed and the end-of-line character is appended.
//! The lexer has three states, which decide what spaces and line ends produce:
//!
//! | state | space | end of line |
//! | -- | -- | -- |
//! | new line | nothing | a `\par` token |
//! | mid line | one space token, then skip blanks | a space token |
//! | skip blanks | nothing | nothing |
//!
//! Every line starts in the new line state.
//! A control word or a control space moves to the skip blanks state;
//!     any other token moves to the mid line state.

use crate::error;
use crate::token::trace::{SourceId, SourceLocation};
use crate::token::{CatCode, CsName, CsNameInterner, Token, Value};

/// The state the lexer reads from while scanning.
pub trait Config {
    /// Current category of the character.
    fn cat_code(&self, c: char) -> CatCode;

    /// Character appended to each line, or [None] if nothing is appended.
    fn end_line_char(&self) -> Option<char>;
}

impl Config for std::collections::HashMap<char, CatCode> {
    fn cat_code(&self, c: char) -> CatCode {
        self.get(&c).copied().unwrap_or_else(|| CatCode::initial(c))
    }

    fn end_line_char(&self) -> Option<char> {
        Some('\r')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
enum State {
    NewLine,
    MidLine,
    SkipBlanks,
}

/// Lexer errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    InvalidCharacter(char, SourceLocation),
    UnterminatedControlSequence(SourceLocation),
}

impl Error {
    /// Converts the error into the error type propagated by the VM.
    pub fn into_error(self) -> Box<error::Error> {
        match self {
            Error::InvalidCharacter(char, location) => {
                InvalidCharacterError { char, location }.into()
            }
            Error::UnterminatedControlSequence(location) => {
                UnterminatedControlSequenceError { location }.into()
            }
        }
    }
}

/// Error returned when a character of category 15 is read.
#[derive(Debug)]
pub struct InvalidCharacterError {
    pub char: char,
    pub location: SourceLocation,
}

impl error::TexError for InvalidCharacterError {
    fn kind(&self) -> error::Kind {
        error::Kind::Token(Token::new_other(self.char, self.location))
    }

    fn title(&self) -> String {
        format!("invalid character {:?}", self.char)
    }

    fn notes(&self) -> Vec<String> {
        vec![format!(
            "characters with category code {} cannot appear in the input",
            CatCode::Invalid
        )]
    }
}

/// Error returned when input ends right after an escape character.
#[derive(Debug)]
pub struct UnterminatedControlSequenceError {
    pub location: SourceLocation,
}

impl error::TexError for UnterminatedControlSequenceError {
    fn kind(&self) -> error::Kind {
        error::Kind::EndOfInput
    }

    fn location(&self) -> Option<SourceLocation> {
        Some(self.location)
    }

    fn title(&self) -> String {
        "input ended while scanning the name of a control sequence".into()
    }
}

/// The lexer for one source.
pub struct Lexer {
    source: SourceId,
    content: String,
    // Byte offset of the first line not yet loaded.
    next_line_start: usize,
    line_number: u32,
    line: Vec<char>,
    pos: usize,
    state: State,
    // Control sequence names are read into a shared buffer to avoid allocating for each one.
    buffer: String,
}

impl Lexer {
    pub fn new(source: SourceId, content: String) -> Lexer {
        Lexer {
            source,
            content,
            next_line_start: 0,
            line_number: 0,
            line: Vec::new(),
            pos: 0,
            state: State::NewLine,
            buffer: String::new(),
        }
    }

    /// Stops reading this source; the rest of it is skipped.
    pub fn end(&mut self) {
        self.next_line_start = self.content.len() + 1;
        self.line.clear();
        self.pos = 0;
    }

    /// Returns the next token, or [None] when the source is exhausted.
    pub fn next<C: Config>(
        &mut self,
        config: &C,
        interner: &mut CsNameInterner,
    ) -> Result<Option<Token>, Error> {
        loop {
            let Some(&c) = self.line.get(self.pos) else {
                if !self.load_line(config) {
                    return Ok(None);
                }
                continue;
            };
            let location = self.location();
            let cat_code = config.cat_code(c);
            if cat_code == CatCode::Superscript && self.apply_caret_notation(c) {
                continue;
            }
            self.pos += 1;
            let value = match cat_code {
                CatCode::Escape => {
                    let name = self.read_control_sequence(location, config, interner)?;
                    return Ok(Some(Token::new_control_sequence(name, location)));
                }
                CatCode::EndOfLine => {
                    self.pos = self.line.len();
                    match self.state {
                        State::NewLine => {
                            let par = interner.get_or_intern("par");
                            return Ok(Some(Token::new_control_sequence(par, location)));
                        }
                        State::MidLine => Value::Space(' '),
                        State::SkipBlanks => continue,
                    }
                }
                CatCode::Space => match self.state {
                    State::MidLine => {
                        self.state = State::SkipBlanks;
                        return Ok(Some(Token::new_space(' ', location)));
                    }
                    State::NewLine | State::SkipBlanks => continue,
                },
                CatCode::Comment => {
                    self.pos = self.line.len();
                    continue;
                }
                CatCode::Ignored => continue,
                CatCode::Invalid => return Err(Error::InvalidCharacter(c, location)),
                other => match Value::new(c, other) {
                    Some(value) => value,
                    None => continue,
                },
            };
            self.state = State::MidLine;
            return Ok(Some(Token::new_from_value(value, location)));
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            source: self.source,
            line: self.line_number,
            column: self.pos as u32,
        }
    }

    fn load_line<C: Config>(&mut self, config: &C) -> bool {
        if self.next_line_start > self.content.len() {
            return false;
        }
        let rest = &self.content[self.next_line_start..];
        let raw = match rest.find('\n') {
            None => {
                // A final line with no newline is only a line if it has content.
                if rest.is_empty() {
                    self.next_line_start = self.content.len() + 1;
                    return false;
                }
                self.next_line_start = self.content.len() + 1;
                rest
            }
            Some(i) => {
                self.next_line_start += i + 1;
                &rest[..i]
            }
        };
        let trimmed = raw.trim_end_matches('\r').trim_end_matches(' ');
        self.line.clear();
        self.line.extend(trimmed.chars());
        if let Some(c) = config.end_line_char() {
            self.line.push(c);
        }
        self.pos = 0;
        self.line_number += 1;
        self.state = State::NewLine;
        true
    }

    /// Decodes `^^` notation at the current position, if present.
    ///
    /// The decoded character replaces the notation in the line buffer, so
    ///     it is scanned again with its own category.
    fn apply_caret_notation(&mut self, caret: char) -> bool {
        if self.line.get(self.pos + 1) != Some(&caret) {
            return false;
        }
        let Some(&c) = self.line.get(self.pos + 2) else {
            return false;
        };
        let is_hex = |c: char| c.is_ascii_digit() || ('a'..='f').contains(&c);
        if let Some(&d) = self.line.get(self.pos + 3) {
            if is_hex(c) && is_hex(d) {
                let value = c.to_digit(16).unwrap_or(0) * 16 + d.to_digit(16).unwrap_or(0);
                if let Some(decoded) = char::from_u32(value) {
                    self.line.splice(self.pos..self.pos + 4, [decoded]);
                    return true;
                }
            }
        }
        if !c.is_ascii() {
            return false;
        }
        let u = c as u32;
        let decoded = if u < 0x40 { u + 0x40 } else { u - 0x40 };
        match char::from_u32(decoded) {
            None => false,
            Some(decoded) => {
                self.line.splice(self.pos..self.pos + 3, [decoded]);
                true
            }
        }
    }

    fn read_control_sequence<C: Config>(
        &mut self,
        location: SourceLocation,
        config: &C,
        interner: &mut CsNameInterner,
    ) -> Result<CsName, Error> {
        self.buffer.clear();
        let first = loop {
            let Some(&c) = self.line.get(self.pos) else {
                // An escape at the end of a line that is not the last one gives the empty name.
                if self.next_line_start < self.content.len() {
                    return Ok(interner.get_or_intern(""));
                }
                return Err(Error::UnterminatedControlSequence(location));
            };
            let cat_code = config.cat_code(c);
            if cat_code == CatCode::Superscript && self.apply_caret_notation(c) {
                continue;
            }
            self.pos += 1;
            break (c, cat_code);
        };
        self.buffer.push(first.0);
        match first.1 {
            CatCode::Letter => {
                while let Some(&c) = self.line.get(self.pos) {
                    match config.cat_code(c) {
                        CatCode::Letter => {
                            self.buffer.push(c);
                            self.pos += 1;
                        }
                        CatCode::Superscript if self.apply_caret_notation(c) => {}
                        _ => break,
                    }
                }
                self.state = State::SkipBlanks;
            }
            CatCode::Space => self.state = State::SkipBlanks,
            _ => self.state = State::MidLine,
        }
        Ok(interner.get_or_intern(&self.buffer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::CatCode::*;
    use std::collections::HashMap;

    enum TokenValue {
        Character(char, CatCode),
        ControlSequence(&'static str),
    }
    use TokenValue::Character;
    use TokenValue::ControlSequence;

    impl TokenValue {
        fn convert(self, interner: &mut CsNameInterner) -> Value {
            match self {
                ControlSequence(name) => Token::new_control_sequence(
                    interner.get_or_intern(name),
                    SourceLocation::UNKNOWN,
                )
                .value(),
                Character(c, cat_code) => Value::new(c, cat_code).unwrap(),
            }
        }
    }

    fn test_config() -> HashMap<char, CatCode> {
        let mut map = HashMap::new();
        map.insert('X', EndOfLine);
        map.insert('Y', Space);
        map.insert('Z', Ignored);
        map
    }

    fn lex_all(input: &str, config: &HashMap<char, CatCode>) -> (Vec<Value>, CsNameInterner) {
        let mut lexer = Lexer::new(SourceId(0), input.into());
        let mut interner: CsNameInterner = Default::default();
        let mut actual = Vec::new();
        while let Some(t) = lexer.next(config, &mut interner).unwrap() {
            actual.push(t.value());
        }
        (actual, interner)
    }

    fn lexer_test(input: &str, expected_tokens: Vec<TokenValue>) {
        let (actual, mut interner) = lex_all(input, &test_config());
        let expected: Vec<Value> = expected_tokens
            .into_iter()
            .map(|t| t.convert(&mut interner))
            .collect();
        assert_eq!(expected, actual);
    }

    macro_rules! lexer_tests {
        ($( ( $name: ident, $input: expr, $ ( $expected_token : expr, ) * ), )+) => {
            $(
            #[test]
            fn $name() {
                let input = $input;
                let expected_tokens = vec!( $( $expected_token ),* );
                lexer_test(&input, expected_tokens);
            }
            )+
        };
    }

    lexer_tests![
        (
            control_word_then_group,
            r"\a{b}",
            ControlSequence("a"),
            Character('{', BeginGroup),
            Character('b', Letter),
            Character('}', EndGroup),
            Character(' ', Space),
        ),
        (
            control_word_skips_space,
            r"\a b",
            ControlSequence("a"),
            Character('b', Letter),
            Character(' ', Space),
        ),
        (
            control_word_skips_many_spaces,
            "\\a  b",
            ControlSequence("a"),
            Character('b', Letter),
            Character(' ', Space),
        ),
        (
            control_word_at_end_of_line,
            "\\a\n b",
            ControlSequence("a"),
            Character('b', Letter),
            Character(' ', Space),
        ),
        (multi_letter_control_word, "\\ABC", ControlSequence("ABC"),),
        (
            control_symbol_does_not_skip_space,
            "\\{ {",
            ControlSequence("{"),
            Character(' ', Space),
            Character('{', BeginGroup),
            Character(' ', Space),
        ),
        (
            control_space_skips_space,
            "\\  a",
            ControlSequence(" "),
            Character('a', Letter),
            Character(' ', Space),
        ),
        (
            control_word_ends_at_non_letter,
            "\\A1",
            ControlSequence("A"),
            Character('1', Other),
            Character(' ', Space),
        ),
        (
            comment_drops_rest_of_line,
            "A%a comment here\nC",
            Character('A', Letter),
            Character('C', Letter),
            Character(' ', Space),
        ),
        (
            consecutive_comments,
            "A%a comment here\n%A second comment\nC",
            Character('A', Letter),
            Character('C', Letter),
            Character(' ', Space),
        ),
        (
            comment_at_end_of_input,
            "A%a comment here",
            Character('A', Letter),
        ),
        (
            leading_spaces_are_skipped,
            "A%\n   B",
            Character('A', Letter),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            comment_then_blank_line_gives_par,
            "A%\n\n B",
            Character('A', Letter),
            ControlSequence("par"),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            double_space_creates_one_space,
            "A  B",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            single_newline_creates_one_space,
            "A\nB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            trailing_spaces_are_stripped,
            "A   \nB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            blank_line_creates_par,
            "A\n\nB",
            Character('A', Letter),
            Character(' ', Space),
            ControlSequence("par"),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            whitespace_only_line_creates_par,
            "A\n  \nB",
            Character('A', Letter),
            Character(' ', Space),
            ControlSequence("par"),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            two_blank_lines_create_two_pars,
            "A\n\n\nB",
            Character('A', Letter),
            Character(' ', Space),
            ControlSequence("par"),
            ControlSequence("par"),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            non_standard_space_character,
            "AYB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            non_standard_end_of_line_character_drops_rest_of_line,
            "AXB\nC",
            Character('A', Letter),
            Character(' ', Space),
            Character('C', Letter),
            Character(' ', Space),
        ),
        (
            ignored_character_does_not_change_state,
            "Z",
            ControlSequence("par"),
        ),
        (
            tab_is_a_space,
            "A\tB",
            Character('A', Letter),
            Character(' ', Space),
            Character('B', Letter),
            Character(' ', Space),
        ),
        (
            active_character,
            "~a",
            Character('~', Active),
            Character('a', Letter),
            Character(' ', Space),
        ),
        (
            caret_notation_single_character,
            "^^k",
            Character('+', Other),
            Character(' ', Space),
        ),
        (
            caret_notation_single_character_reverse,
            "^^+",
            Character('k', Letter),
            Character(' ', Space),
        ),
        (
            caret_notation_hex,
            "^^41b",
            Character('A', Letter),
            Character('b', Letter),
            Character(' ', Space),
        ),
        (
            caret_notation_uppercase_is_not_hex,
            "^^4F",
            Character('t', Letter),
            Character('F', Letter),
            Character(' ', Space),
        ),
        (
            caret_notation_decoded_character_is_recategorized,
            "a^^5cfoo b",
            Character('a', Letter),
            ControlSequence("foo"),
            Character('b', Letter),
            Character(' ', Space),
        ),
        (
            caret_notation_in_control_word,
            "\\a^^62c",
            ControlSequence("abc"),
        ),
        (
            caret_notation_starts_control_word,
            "\\^^-a",
            ControlSequence("ma"),
        ),
        (
            caret_notation_control_symbol,
            "\\^^ma",
            ControlSequence("-"),
            Character('a', Letter),
            Character(' ', Space),
        ),
        (
            lone_caret,
            "\\^a",
            ControlSequence("^"),
            Character('a', Letter),
            Character(' ', Space),
        ),
        (
            caret_then_letter,
            "\\a^a",
            ControlSequence("a"),
            Character('^', Superscript),
            Character('a', Letter),
            Character(' ', Space),
        ),
    ];

    struct NoEndLine;

    impl Config for NoEndLine {
        fn cat_code(&self, c: char) -> CatCode {
            CatCode::initial(c)
        }
        fn end_line_char(&self) -> Option<char> {
            None
        }
    }

    #[test]
    fn end_line_char_can_be_disabled() {
        let mut lexer = Lexer::new(SourceId(0), "a\nb\n\nc".into());
        let mut interner: CsNameInterner = Default::default();
        let mut actual = Vec::new();
        while let Some(t) = lexer.next(&NoEndLine, &mut interner).unwrap() {
            actual.push(t.char());
        }
        assert_eq!(actual, vec![Some('a'), Some('b'), Some('c')]);
    }

    #[test]
    fn invalid_character() {
        let mut lexer = Lexer::new(SourceId(0), "a\u{7F}".into());
        let mut interner: CsNameInterner = Default::default();
        let config = test_config();
        assert!(lexer.next(&config, &mut interner).unwrap().is_some());
        let err = lexer.next(&config, &mut interner).unwrap_err();
        assert!(matches!(err, Error::InvalidCharacter('\u{7F}', _)));
    }

    #[test]
    fn unterminated_control_sequence() {
        let mut lexer = Lexer::new(SourceId(0), "ab\\".into());
        let mut interner: CsNameInterner = Default::default();
        lexer.next(&NoEndLine, &mut interner).unwrap();
        lexer.next(&NoEndLine, &mut interner).unwrap();
        let err = lexer.next(&NoEndLine, &mut interner).unwrap_err();
        assert!(matches!(err, Error::UnterminatedControlSequence(_)));
    }

    #[test]
    fn escape_at_end_of_middle_line() {
        let mut lexer = Lexer::new(SourceId(0), "a\\\n  b\n".into());
        let mut interner: CsNameInterner = Default::default();
        let mut actual = Vec::new();
        while let Some(t) = lexer.next(&NoEndLine, &mut interner).unwrap() {
            actual.push(t.value());
        }
        let empty = interner.get_or_intern("");
        assert_eq!(
            actual,
            vec![
                Value::Letter('a'),
                Value::CommandRef(crate::token::CommandRef::ControlSequence(empty)),
                Value::Letter('b'),
            ]
        );
    }

    #[test]
    fn locations() {
        let mut lexer = Lexer::new(SourceId(7), "ab\n  \\cd".into());
        let mut interner: CsNameInterner = Default::default();
        let config = test_config();
        let mut locations = Vec::new();
        while let Some(t) = lexer.next(&config, &mut interner).unwrap() {
            let loc = t.location();
            locations.push((loc.source.0, loc.line, loc.column));
        }
        assert_eq!(locations, vec![(7, 1, 0), (7, 1, 1), (7, 1, 2), (7, 2, 2)]);
    }

    #[test]
    fn same_catcode_history_gives_same_tokens() {
        let input = "\\x a{b}~c%d\n\ne^^41  f";
        let mut config = test_config();
        config.insert('e', Active);
        let first = lex_all(input, &config).0;
        let second = lex_all(input, &config).0;
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn catcode_changes_apply_to_characters_not_yet_read() {
        let mut lexer = Lexer::new(SourceId(0), "AB".into());
        let mut interner: CsNameInterner = Default::default();
        let mut config = test_config();
        let first = lexer.next(&config, &mut interner).unwrap().unwrap();
        assert_eq!(first.value(), Value::Letter('A'));
        config.insert('B', Other);
        let second = lexer.next(&config, &mut interner).unwrap().unwrap();
        assert_eq!(second.value(), Value::Other('B'));
    }
}
