//! Parsing elements of the grammar from token streams.
//!
//! The central type is the [Parsable] trait, implemented by Rust types that
//!     correspond to elements of the grammar: numbers, dimensions, glue, keywords
//!     and so on.
//! Tuples of parsable types are parsable, so `<integer><relation><integer>` can be
//!     read in one call as `(i32, Ordering, i32)`.
//!
//! Parsing reads from the expanded stream, so macros inside numbers and
//!     dimensions are expanded.
//! A parse error leaves the offending token in the input.

#[macro_use]
mod helpers;

mod dimen;
mod glue;
mod keyword;
mod number;
mod relation;
#[cfg(test)]
pub(crate) mod testing;
mod variable;

pub use keyword::parse_keyword;
pub use keyword::OptionalBy;
pub use keyword::To;
pub use number::Uint;
pub use relation::Ordering;
pub use variable::OptionalEquals;
pub use variable::OptionalEqualsUnexpanded;

use crate::error;
use crate::prelude as fl;
use crate::token;
use crate::traits::*;
use crate::vm;

/// Implementations of this trait are elements of the grammar that can be parsed from a stream of tokens.
pub trait Parsable<S: FolioState>: Sized {
    /// Parses a value from an input stream.
    ///
    /// This method just delegates to [Parsable::parse_impl].
    #[inline]
    fn parse<I>(input: &mut I) -> fl::Result<Self>
    where
        I: AsMut<vm::ExpandedStream<S>>,
    {
        Parsable::parse_impl(input.as_mut())
    }

    /// Parses a value from the [vm::ExpandedStream].
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self>;
}

/// Error returned when the input does not contain the expected grammar element.
#[derive(Debug)]
pub struct Error {
    pub expected: String,
    pub got: Option<token::Token>,
    pub got_override: String,
    pub guidance: String,
}

impl error::TexError for Error {
    fn kind(&self) -> error::Kind {
        match self.got {
            None => error::Kind::EndOfInput,
            Some(token) => error::Kind::Token(token),
        }
    }

    fn title(&self) -> String {
        let got = if self.got_override.is_empty() {
            match self.got {
                None => "the input ended".to_string(),
                Some(token) => match token.value() {
                    token::Value::Letter(c) => format!["found the letter {c}"],
                    token::Value::Other(c) => format!["found a non-letter character {c}"],
                    _ => match (token.char(), token.cat_code()) {
                        (Some(c), Some(code)) => {
                            format!["found a token with value {c} and category code {code}"]
                        }
                        _ => "found a control sequence".to_string(),
                    },
                },
            }
        } else {
            self.got_override.clone()
        };
        format!["expected {}, instead {}", self.expected, got]
    }

    fn notes(&self) -> Vec<String> {
        if self.guidance.is_empty() {
            vec![]
        } else {
            vec![self.guidance.clone()]
        }
    }
}

impl Error {
    pub fn new<T: Into<String>, R: Into<String>>(
        expected: T,
        got: Option<token::Token>,
        guidance: R,
    ) -> Self {
        Error {
            expected: expected.into(),
            got,
            got_override: "".into(),
            guidance: guidance.into(),
        }
    }

    pub fn with_got_override<T: Into<String>>(mut self, got_override: T) -> Self {
        self.got_override = got_override.into();
        self
    }
}

macro_rules! generate_tuple_impls {
    ( $first: ident ) => {};
    ( $first: ident, $( $name: ident ),+ ) => {
        generate_tuple_impls![ $( $name ),+];

        impl<S: FolioState, $first : Parsable<S>, $( $name : Parsable<S> ),+> Parsable<S> for ($first, $( $name ),+) {
            fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
                Ok(($first::parse(input)?, $( $name::parse(input)? ),+))
            }
        }
    };
}

generate_tuple_impls![T1, T2, T3, T4, T5];

impl<S: FolioState> Parsable<S> for token::CommandRef {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        skip_spaces(input.unexpanded())?;
        get_required_element![
            input.unexpanded(),
            "a control sequence or active character",
            "a command must be a control sequence or an active character",
            token::Value::CommandRef(command_ref) => command_ref,
        ]
    }
}

/// Consumes space tokens until a non-space token or the end of input.
pub fn skip_spaces<T: TokenStream>(stream: &mut T) -> fl::Result<()> {
    while let Some(token) = stream.next()? {
        if !matches!(token.value(), token::Value::Space(_)) {
            stream.back(token);
            break;
        }
    }
    Ok(())
}

/// Consumes one space token, if the next token is a space.
pub fn skip_optional_space<T: TokenStream>(stream: &mut T) -> fl::Result<()> {
    get_optional_element![
        stream,
        token::Value::Space(_) => (),
    ];
    Ok(())
}

/// Parses balanced tokens from the stream.
///
/// The opening brace must already have been consumed.
/// The closing brace is consumed but not returned.
/// Returns false if the input ended before the tokens were balanced.
pub fn parse_balanced_tokens<T: TokenStream>(
    stream: &mut T,
    result: &mut Vec<token::Token>,
) -> fl::Result<bool> {
    let mut scope_depth = 0_usize;
    while let Some(token) = stream.next()? {
        match token.value() {
            token::Value::BeginGroup(_) => {
                scope_depth += 1;
            }
            token::Value::EndGroup(_) => {
                if scope_depth == 0 {
                    return Ok(true);
                }
                scope_depth -= 1;
            }
            _ => (),
        }
        result.push(token);
    }
    Ok(false)
}

/// Parses a braced group of tokens, like the argument of `\message`.
///
/// Leading spaces are skipped.
/// The braces themselves are not returned.
pub fn parse_braced_tokens<T: TokenStream>(
    stream: &mut T,
    doing: &'static str,
) -> fl::Result<Vec<token::Token>> {
    skip_spaces(stream)?;
    get_required_element![
        stream,
        "a begin group character",
        format!["{doing} requires a list of tokens in braces"],
        token::Value::BeginGroup(_) => (),
    ]?;
    let mut result = Vec::new();
    if !parse_balanced_tokens(stream, &mut result)? {
        return Err(error::EofError::new(doing).into());
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VM;
    use std::collections::HashMap;

    #[test]
    fn braced_tokens() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("", "  {a{b}c}d");
        let input = vm::ExecutionInput::new(&mut vm);
        let tokens = parse_braced_tokens(input.unexpanded(), "testing").unwrap();
        let s = token::write_tokens(&tokens, input.vm().cs_name_interner());
        assert_eq!(s, "a{b}c");
        let next = input.unexpanded().next().unwrap().unwrap();
        assert_eq!(next.value(), token::Value::Letter('d'));
    }

    #[test]
    fn braced_tokens_unbalanced() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("", "{a{b}c");
        let input = vm::ExecutionInput::new(&mut vm);
        let err = parse_braced_tokens(input.unexpanded(), "testing").unwrap_err();
        assert_eq!(err.kind(), error::Kind::EndOfInput);
    }

    #[test]
    fn braced_tokens_missing_brace() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("", "a");
        let input = vm::ExecutionInput::new(&mut vm);
        assert!(parse_braced_tokens(input.unexpanded(), "testing").is_err());
        let next = input.unexpanded().next().unwrap().unwrap();
        assert_eq!(next.value(), token::Value::Letter('a'));
    }
}
