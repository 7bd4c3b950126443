//! Tokens and category codes.

mod catcode;
pub mod lexer;
pub mod trace;
pub use catcode::CatCode;

use folio_stdext::collections::interner;
use std::num;
use trace::SourceLocation;

/// Interned name of a control sequence.
///
/// The representation is opaque; resolve it to a string with a [CsNameInterner].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CsName(num::NonZeroU32);

/// String interner for control sequence names.
pub type CsNameInterner = interner::Interner<CsName>;

impl interner::Key for CsName {
    fn try_from_index(index: usize) -> Option<Self> {
        <num::NonZeroU32 as interner::Key>::try_from_index(index).map(CsName)
    }

    fn into_index(self) -> usize {
        interner::Key::into_index(self.0)
    }
}

/// The value of a token.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    BeginGroup(char),
    EndGroup(char),
    MathShift(char),
    AlignmentTab(char),
    Parameter(char),
    Superscript(char),
    Subscript(char),
    Space(char),
    Letter(char),
    Other(char),
    CommandRef(CommandRef),
}

/// The value of a token that references a command.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommandRef {
    ControlSequence(CsName),
    ActiveCharacter(char),
}

impl CommandRef {
    /// Renders the reference as it would be written in source, e.g. `\par`.
    pub fn to_string(&self, cs_name_interner: &CsNameInterner) -> String {
        match self {
            CommandRef::ControlSequence(cs_name) => {
                format!("\\{}", cs_name_interner.resolve(*cs_name).unwrap_or("?"))
            }
            CommandRef::ActiveCharacter(c) => format!("{c}"),
        }
    }
}

impl Value {
    /// Builds the value of a character token.
    ///
    /// Returns [None] for categories that never leave the lexer.
    pub fn new(c: char, cat_code: CatCode) -> Option<Value> {
        Some(match cat_code {
            CatCode::BeginGroup => Value::BeginGroup(c),
            CatCode::EndGroup => Value::EndGroup(c),
            CatCode::MathShift => Value::MathShift(c),
            CatCode::AlignmentTab => Value::AlignmentTab(c),
            CatCode::Parameter => Value::Parameter(c),
            CatCode::Superscript => Value::Superscript(c),
            CatCode::Subscript => Value::Subscript(c),
            CatCode::Space => Value::Space(c),
            CatCode::Letter => Value::Letter(c),
            CatCode::Other => Value::Other(c),
            CatCode::Active => Value::CommandRef(CommandRef::ActiveCharacter(c)),
            CatCode::Escape
            | CatCode::EndOfLine
            | CatCode::Ignored
            | CatCode::Comment
            | CatCode::Invalid => return None,
        })
    }
}

/// A token: a value together with where it was scanned.
///
/// Equality ignores the location.
#[derive(Debug, Eq, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    value: Value,
    location: SourceLocation,
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state)
    }
}

macro_rules! token_constructor {
    ($name: ident, $value: expr) => {
        pub fn $name(c: char, location: SourceLocation) -> Token {
            Token {
                value: $value(c),
                location,
            }
        }
    };
}

impl Token {
    token_constructor!(new_begin_group, Value::BeginGroup);
    token_constructor!(new_end_group, Value::EndGroup);
    token_constructor!(new_math_shift, Value::MathShift);
    token_constructor!(new_alignment_tab, Value::AlignmentTab);
    token_constructor!(new_parameter, Value::Parameter);
    token_constructor!(new_superscript, Value::Superscript);
    token_constructor!(new_subscript, Value::Subscript);
    token_constructor!(new_space, Value::Space);
    token_constructor!(new_letter, Value::Letter);
    token_constructor!(new_other, Value::Other);

    pub fn new_active_character(c: char, location: SourceLocation) -> Token {
        Token {
            value: Value::CommandRef(CommandRef::ActiveCharacter(c)),
            location,
        }
    }

    pub fn new_control_sequence(name: CsName, location: SourceLocation) -> Token {
        Token {
            value: Value::CommandRef(CommandRef::ControlSequence(name)),
            location,
        }
    }

    pub fn new_from_value(value: Value, location: SourceLocation) -> Token {
        Token { value, location }
    }

    #[inline]
    pub fn value(&self) -> Value {
        self.value
    }

    #[inline]
    pub fn location(&self) -> SourceLocation {
        self.location
    }

    /// Returns the character of a character token or active character.
    pub fn char(&self) -> Option<char> {
        match self.value {
            Value::BeginGroup(c)
            | Value::EndGroup(c)
            | Value::MathShift(c)
            | Value::AlignmentTab(c)
            | Value::Parameter(c)
            | Value::Superscript(c)
            | Value::Subscript(c)
            | Value::Space(c)
            | Value::Letter(c)
            | Value::Other(c)
            | Value::CommandRef(CommandRef::ActiveCharacter(c)) => Some(c),
            Value::CommandRef(CommandRef::ControlSequence(_)) => None,
        }
    }

    pub fn cat_code(&self) -> Option<CatCode> {
        match self.value {
            Value::BeginGroup(_) => Some(CatCode::BeginGroup),
            Value::EndGroup(_) => Some(CatCode::EndGroup),
            Value::MathShift(_) => Some(CatCode::MathShift),
            Value::AlignmentTab(_) => Some(CatCode::AlignmentTab),
            Value::Parameter(_) => Some(CatCode::Parameter),
            Value::Superscript(_) => Some(CatCode::Superscript),
            Value::Subscript(_) => Some(CatCode::Subscript),
            Value::Space(_) => Some(CatCode::Space),
            Value::Letter(_) => Some(CatCode::Letter),
            Value::Other(_) => Some(CatCode::Other),
            Value::CommandRef(CommandRef::ActiveCharacter(_)) => Some(CatCode::Active),
            Value::CommandRef(CommandRef::ControlSequence(_)) => None,
        }
    }

    /// Returns the command reference of a control sequence or active character.
    pub fn command_ref(&self) -> Option<CommandRef> {
        match self.value {
            Value::CommandRef(command_ref) => Some(command_ref),
            _ => None,
        }
    }
}

/// Writes tokens the way they would be printed by `\message` or `\the`.
///
/// A control word is followed by a space, unless it is the last token.
pub fn write_tokens<'a, I: IntoIterator<Item = &'a Token>>(
    tokens: I,
    interner: &CsNameInterner,
) -> String {
    write_token_values(tokens.into_iter().map(Token::value), interner)
}

/// Like [write_tokens] but takes token values.
pub fn write_token_values<I: IntoIterator<Item = Value>>(
    values: I,
    interner: &CsNameInterner,
) -> String {
    let mut s = String::new();
    let mut pending_space = false;
    for value in values {
        if pending_space {
            s.push(' ');
            pending_space = false;
        }
        match value {
            Value::CommandRef(CommandRef::ControlSequence(name)) => {
                let name = interner.resolve(name).unwrap_or("?");
                s.push('\\');
                s.push_str(name);
                let is_word = name
                    .chars()
                    .next()
                    .map(|c| c.is_alphabetic())
                    .unwrap_or(false);
                pending_space = is_word;
            }
            Value::BeginGroup(c)
            | Value::EndGroup(c)
            | Value::MathShift(c)
            | Value::AlignmentTab(c)
            | Value::Parameter(c)
            | Value::Superscript(c)
            | Value::Subscript(c)
            | Value::Space(c)
            | Value::Letter(c)
            | Value::Other(c)
            | Value::CommandRef(CommandRef::ActiveCharacter(c)) => s.push(c),
        }
    }
    s
}
