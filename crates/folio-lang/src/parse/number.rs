//! Number parsing.
//!
//! A number may be octal, decimal, hexadecimal, cast from a character token, or read
//!     from an internal variable like `\count 5` or `\tolerance`.
//! Internal dimensions and glue are coerced to integers by taking their width in
//!     scaled points.

use crate::command;
use crate::error;
use crate::parse;
use crate::prelude as fl;
use crate::store::StoreValue;
use crate::token;
use crate::token::Value;
use crate::traits::*;
use crate::vm;
use folio_core::{Glue, Scaled};

impl<S: FolioState> Parsable<S> for i32 {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        let (_, i, _) = parse_integer(input)?;
        Ok(i)
    }
}

/// An integer in the range `[0, N)`.
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub struct Uint<const N: usize>(pub usize);

impl<S: FolioState, const N: usize> Parsable<S> for Uint<N> {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        let (first_token, i, _) = parse_integer(input)?;
        if i < 0 || i as usize >= N {
            Err(OutOfBoundsError::<N> {
                first_token,
                got: i,
            }
            .into())
        } else {
            Ok(Uint(i as usize))
        }
    }
}

#[derive(Debug)]
struct OutOfBoundsError<const N: usize> {
    first_token: token::Token,
    got: i32,
}

impl<const N: usize> error::TexError for OutOfBoundsError<N> {
    fn kind(&self) -> error::Kind {
        error::Kind::Token(self.first_token)
    }

    fn title(&self) -> String {
        format!(
            "expected an integer in the range [0, {}), got {}",
            N, self.got
        )
    }
}

impl<S: FolioState> Parsable<S> for char {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        let (first_token, i, _) = parse_integer(input)?;
        match u32::try_from(i).ok().and_then(char::from_u32) {
            Some(c) => Ok(c),
            None => Err(parse::Error::new(
                "a character code",
                Some(first_token),
                "a character code is an integer that is a valid Unicode scalar value",
            )
            .with_got_override(format!["got the integer {i}"])
            .into()),
        }
    }
}

impl<S: FolioState> Parsable<S> for token::CatCode {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        let (first_token, i, _) = parse_integer(input)?;
        if let Ok(val_u8) = u8::try_from(i) {
            if let Ok(cat_code) = token::CatCode::try_from(val_u8) {
                return Ok(cat_code);
            }
        }
        Err(parse::Error::new(
            "a category code number (an integer in the range [0, 15])",
            Some(first_token),
            "",
        )
        .with_got_override(format!["got the integer {i}"])
        .into())
    }
}

const GUIDANCE_BEGINNING: &str =
    "a number begins with zero or more minus signs followed by one of the following:
- A decimal digit (0-9), which begins a decimal number.
- The character ', which indicates the beginning of an octal number
- The character \", which indicates the beginning of a hexadecimal number
- The character `, followed by a character token. The character is converted into its number.
- A command that references a variable, like \\count 1 or \\tolerance.
";

/// Parses an integer.
///
/// Returns the first token of the number (after the signs), the value and, for
///     integer constants, the radix the constant was written in.
pub(crate) fn parse_integer<S: FolioState>(
    stream: &mut vm::ExpandedStream<S>,
) -> fl::Result<(token::Token, i32, Option<u32>)> {
    parse_integer_impl(stream, true)
}

/// Like [parse_integer], optionally leaving the space after an integer constant.
pub(crate) fn parse_integer_impl<S: FolioState>(
    stream: &mut vm::ExpandedStream<S>,
    skip_optional_space: bool,
) -> fl::Result<(token::Token, i32, Option<u32>)> {
    let negative = parse_optional_signs(stream)?;
    let first_token = stream.next_or_err(NumberEndOfInputError {})?;
    let (result, radix) = match first_token.value() {
        Value::Other(c @ '0'..='9') => (
            parse_constant::<S, 10>(stream, c as i32 - '0' as i32)?,
            Some(10),
        ),
        Value::Other('\'') => (parse_constant::<S, 8>(stream, 0)?, Some(8)),
        Value::Other('"') => (parse_constant::<S, 16>(stream, 0)?, Some(16)),
        Value::Other('`') => (parse_character(stream)?, None),
        Value::CommandRef(command_ref) => {
            let i = match parse_internal_number(stream, first_token, command_ref)? {
                InternalNumber::Integer(i) => i,
                InternalNumber::Dimen(d) => d.0,
                InternalNumber::Glue(g) => g.width.0,
            };
            (i, None)
        }
        _ => {
            stream.back(first_token);
            return Err(parse::Error::new(
                "the beginning of a number",
                Some(first_token),
                GUIDANCE_BEGINNING,
            )
            .into());
        }
    };
    if skip_optional_space && radix.is_some() {
        parse::skip_optional_space(stream)?;
    }
    // i32::MIN is the only value that cannot be negated; it wraps to itself.
    let result = if negative {
        result.wrapping_neg()
    } else {
        result
    };
    Ok((first_token, result, radix))
}

#[derive(Debug)]
struct NumberEndOfInputError;

impl error::EndOfInputError for NumberEndOfInputError {
    fn doing(&self) -> String {
        "parsing a number".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![GUIDANCE_BEGINNING.into()]
    }
}

/// Parses optional signs and spaces.
///
/// Returns true if the combination of the signs is negative.
pub(crate) fn parse_optional_signs<S: FolioState>(
    stream: &mut vm::ExpandedStream<S>,
) -> fl::Result<bool> {
    let mut negative = false;
    while let Some(sign) = get_optional_element![
        stream,
        Value::Other('+') => false,
        Value::Other('-') => true,
        Value::Space(_) => false,
    ] {
        negative ^= sign;
    }
    Ok(negative)
}

/// The value of an internal variable read in a numeric context.
pub(crate) enum InternalNumber {
    Integer(i32),
    Dimen(Scaled),
    Glue(Glue),
}

/// Reads the value of the variable referenced by a command.
///
/// It is an error for the command to be anything other than a variable.
pub(crate) fn parse_internal_number<S: FolioState>(
    stream: &mut vm::ExpandedStream<S>,
    first_token: token::Token,
    command_ref: token::CommandRef,
) -> fl::Result<InternalNumber> {
    let cmd = stream.commands_map().get_command(&command_ref);
    let variable = match cmd {
        Some(command::Command::Variable(variable)) => *variable,
        _ => {
            let got = match cmd {
                None => "found an undefined control sequence".to_string(),
                Some(cmd) => format!["found a control sequence referencing {cmd}"],
            };
            stream.back(first_token);
            return Err(parse::Error::new(
                "the beginning of a number",
                Some(first_token),
                GUIDANCE_BEGINNING,
            )
            .with_got_override(got)
            .into());
        }
    };
    Ok(match variable.value(first_token, stream)? {
        StoreValue::Dimen(d) => InternalNumber::Dimen(d),
        StoreValue::Glue(g) => InternalNumber::Glue(g),
        value @ (StoreValue::Int(_) | StoreValue::CatCode(_) | StoreValue::Font(_)) => {
            InternalNumber::Integer(value.as_int())
        }
    })
}

fn parse_character<S: FolioState>(input: &mut vm::ExpandedStream<S>) -> fl::Result<i32> {
    let token = input.unexpanded().next_or_err(CharacterError {})?;
    let c = match token.value() {
        Value::CommandRef(token::CommandRef::ControlSequence(cs_name)) => {
            let name = input.vm().cs_name_interner().resolve(cs_name).unwrap_or("");
            let mut iter = name.chars();
            match (iter.next(), iter.next()) {
                (Some(c), None) => c,
                _ => {
                    return Err(parse::Error::new(
                        "a character",
                        Some(token),
                        r"a character is a character token or single-character control sequence like \a",
                    )
                    .into());
                }
            }
        }
        _ => match token.char() {
            Some(c) => c,
            None => '\0',
        },
    };
    Ok(c as i32)
}

#[derive(Debug)]
struct CharacterError;

impl error::EndOfInputError for CharacterError {
    fn doing(&self) -> String {
        "parsing a character".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![r"a character is a character token or single-character control sequence like \a".into()]
    }
}

fn parse_constant<S: FolioState, const RADIX: i32>(
    stream: &mut vm::ExpandedStream<S>,
    mut result: i32,
) -> fl::Result<i32> {
    let mut started = RADIX == 10;
    let mut too_big: Option<parse::Error> = None;
    while let Some(next) = stream.next()? {
        let lsd_or = match next.value() {
            Value::Other(c) => {
                let d = (c as u32).wrapping_sub('0' as u32);
                if d < 10 && d < (RADIX as u32) {
                    Some(d as i32)
                } else if RADIX == 16 {
                    let d = (c as u32).wrapping_sub('A' as u32);
                    if d < 6 {
                        Some(d as i32 + 10)
                    } else {
                        None
                    }
                } else {
                    None
                }
            }
            Value::Letter(c) => {
                let d = (c as u32).wrapping_sub('A' as u32);
                if RADIX == 16 && d < 6 {
                    Some(d as i32 + 10)
                } else {
                    None
                }
            }
            _ => None,
        };
        let Some(lsd) = lsd_or else {
            stream.back(next);
            break;
        };
        started = true;
        if too_big.is_some() {
            continue;
        }
        result = match add_lsd::<RADIX>(result, lsd) {
            Some(n) => n,
            None => {
                too_big = Some(add_lsd_error::<RADIX>(next, result, lsd));
                i32::MAX
            }
        }
    }
    if let Some(err) = too_big {
        return Err(err.into());
    }
    if !started {
        let (expected, guidance) = match RADIX {
            8 => (
                "an octal digit",
                "an octal digit is a token with value 0-7 and category other",
            ),
            _ => (
                "a hexadecimal digit",
                "a hexadecimal digit is either:\n- A character token with value 0-9 and category other, or\n- A character token with value A-F and category letter or other",
            ),
        };
        let got = stream.peek()?;
        return Err(parse::Error::new(expected, got, guidance).into());
    }
    Ok(result)
}

fn add_lsd<const RADIX: i32>(n: i32, lsd: i32) -> Option<i32> {
    n.checked_mul(RADIX)?.checked_add(lsd)
}

fn add_lsd_error<const RADIX: i32>(token: token::Token, n: i32, lsd: i32) -> parse::Error {
    let (got, range) = match RADIX {
        8 => (
            format!["got '{n:o}{lsd:o}"],
            format!["-'{:o}, '{:o}", i32::MAX, i32::MAX],
        ),
        16 => (
            format!["got \"{n:X}{lsd:X}"],
            format!["-\"{:X}, \"{:X}", i32::MAX, i32::MAX],
        ),
        _ => (
            format!["got {n}{lsd}"],
            format!["{}, {}", -i32::MAX, i32::MAX],
        ),
    };
    parse::Error::new(format!["a number in the range [{range}]"], Some(token), "")
        .with_got_override(got)
}
