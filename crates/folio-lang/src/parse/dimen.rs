//! Dimension parsing.
//!
//! A dimension is an optionally signed number followed by a unit: a keyword like
//!     `pt` or `cm`, or an internal dimension like `\hsize`, in which case the
//!     number multiplies it.
//! Decimal constants may have a fractional part introduced by `.` or `,`.
//! An internal dimension or glue on its own is also a dimension.

use super::keyword::parse_keyword;
use super::number::{self, InternalNumber};
use crate::command;
use crate::error;
use crate::parse;
use crate::prelude as fl;
use crate::token::Value;
use crate::traits::*;
use crate::vm;
use folio_core::{GlueOrder, Scaled, ScaledUnit};

impl<S: FolioState> Parsable<S> for Scaled {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        let negative = number::parse_optional_signs(input)?;
        let (s, _) = parse_dimen_after_signs(input, negative, false)?;
        Ok(s)
    }
}

/// Parses the rest of a dimension once its signs have been read.
///
/// If `infinite` is true, the units `fil`, `fill` and `filll` are accepted and the
///     returned order says which was found.
pub(crate) fn parse_dimen_after_signs<S: FolioState>(
    input: &mut vm::ExpandedStream<S>,
    negative: bool,
    infinite: bool,
) -> fl::Result<(Scaled, GlueOrder)> {
    let first_token = input.next_or_err(DimenEndOfInputError {})?;
    let (integer_part, has_fractional_part) = match first_token.value() {
        Value::CommandRef(command_ref) => {
            match number::parse_internal_number(input, first_token, command_ref)? {
                InternalNumber::Integer(i) => (i, false),
                InternalNumber::Dimen(d) => return Ok((apply_sign(d, negative), GlueOrder::Normal)),
                InternalNumber::Glue(g) => {
                    return Ok((apply_sign(g.width, negative), GlueOrder::Normal))
                }
            }
        }
        Value::Other(',' | '.') => (0, true),
        _ => {
            input.back(first_token);
            let (_, i, radix) = number::parse_integer_impl(input, false)?;
            // A fractional part follows only a decimal constant.
            let has_fractional_part = match radix {
                None => false,
                Some(radix) => match input.next()? {
                    None => false,
                    Some(next) => match next.value() {
                        Value::Other(',' | '.') if radix == 10 => true,
                        Value::Space(_) => false,
                        _ => {
                            input.back(next);
                            false
                        }
                    },
                },
            };
            (i, has_fractional_part)
        }
    };
    let fractional_part = if has_fractional_part {
        scan_decimal_fraction(input)?
    } else {
        Scaled::ZERO
    };
    // Only an internal integer can be negative here; its fractional part is zero.
    let (negative, integer_part) = if integer_part < 0 {
        (!negative, integer_part.wrapping_neg())
    } else {
        (negative, integer_part)
    };
    let overflow = || -> Box<error::Error> {
        parse::Error::new(
            "a dimension in the range (-16384pt, 16384pt)",
            Some(first_token),
            "",
        )
        .with_got_override("found a dimension that is too large")
        .into()
    };
    if infinite {
        if let Some(order) = scan_fil_units(input)? {
            let Ok(integer_part) = Scaled::from_integer(integer_part) else {
                return Err(overflow());
            };
            parse::skip_optional_space(input)?;
            return Ok((apply_sign(integer_part + fractional_part, negative), order));
        }
    }
    if let Some(unit) = scan_internal_unit(input)? {
        let Ok((adjusted_fractional_part, _)) = unit.xn_over_d(fractional_part.0, 1 << 16) else {
            return Err(overflow());
        };
        let Ok(s) = unit.nx_plus_y(integer_part, adjusted_fractional_part) else {
            return Err(overflow());
        };
        return Ok((apply_sign(s, negative), GlueOrder::Normal));
    }
    // Magnification is not supported, so `true` has no effect.
    parse_keyword(input, "true")?;
    let unit = <ScaledUnit as Parsable<S>>::parse(input)?;
    parse::skip_optional_space(input)?;
    let s = match unit {
        // For sp units, the fractional part is silently dropped.
        ScaledUnit::ScaledPoint => {
            if integer_part > Scaled::MAX_DIMEN.0 {
                return Err(overflow());
            }
            Scaled(integer_part)
        }
        _ => match Scaled::from_parts(integer_part, fractional_part, unit) {
            Ok(s) if s <= Scaled::MAX_DIMEN => s,
            _ => return Err(overflow()),
        },
    };
    Ok((apply_sign(s, negative), GlueOrder::Normal))
}

fn apply_sign(s: Scaled, negative: bool) -> Scaled {
    if negative {
        -s
    } else {
        s
    }
}

/// Scans `fil`, `fill` or `filll`.
fn scan_fil_units<S: FolioState>(
    input: &mut vm::ExpandedStream<S>,
) -> fl::Result<Option<GlueOrder>> {
    if !parse_keyword(input, "fil")? {
        return Ok(None);
    }
    let mut order = GlueOrder::Fil;
    while parse_keyword(input, "l")? {
        order = match order {
            GlueOrder::Fil => GlueOrder::Fill,
            GlueOrder::Fill | GlueOrder::Filll => GlueOrder::Filll,
            GlueOrder::Normal => GlueOrder::Fil,
        };
    }
    Ok(Some(order))
}

/// Scans an internal variable used as a unit, as in `2\hsize`.
///
/// An internal integer used this way counts as that many scaled points.
fn scan_internal_unit<S: FolioState>(input: &mut vm::ExpandedStream<S>) -> fl::Result<Option<Scaled>> {
    parse::skip_spaces(input)?;
    let Some(next) = input.next()? else {
        return Ok(None);
    };
    let command_ref = match next.value() {
        Value::CommandRef(command_ref)
            if matches!(
                input.commands_map().get_command(&command_ref),
                Some(command::Command::Variable(_))
            ) =>
        {
            command_ref
        }
        _ => {
            input.back(next);
            return Ok(None);
        }
    };
    Ok(Some(
        match number::parse_internal_number(input, next, command_ref)? {
            InternalNumber::Integer(i) => Scaled(i),
            InternalNumber::Dimen(d) => d,
            InternalNumber::Glue(g) => g.width,
        },
    ))
}

impl<S: FolioState> Parsable<S> for ScaledUnit {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        for unit in ScaledUnit::ALL {
            if parse_keyword(input, unit.abbreviation())? {
                return Ok(unit);
            }
        }
        let got = input.peek()?;
        Err(parse::Error::new(
            "a unit of measure",
            got,
            "the units are pt, pc, in, bp, cm, mm, dd, cc and sp",
        )
        .into())
    }
}

fn scan_decimal_fraction<S: FolioState>(input: &mut vm::ExpandedStream<S>) -> fl::Result<Scaled> {
    // Digits past the 17th cannot change the result, so they are read and dropped.
    let mut digits = [0_u8; 17];
    let mut i = 0_usize;
    while let Some(token) = input.next()? {
        let d: u8 = match token.value() {
            Value::Other(c @ '0'..='9') => c as u8 - b'0',
            Value::Space(_) => {
                break;
            }
            _ => {
                input.back(token);
                break;
            }
        };
        if let Some(digit) = digits.get_mut(i) {
            *digit = d;
            i += 1;
        }
    }
    Ok(Scaled::from_decimal_fraction(&digits[0..i]))
}

#[derive(Debug)]
struct DimenEndOfInputError;

impl error::EndOfInputError for DimenEndOfInputError {
    fn doing(&self) -> String {
        "parsing a dimension".into()
    }
}
