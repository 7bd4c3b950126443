//! Operations on variables (advance, multiply, divide)

use crate::prefix;
use folio_core::{Glue, Scaled};
use folio_lang::parse::OptionalBy;
use folio_lang::prelude as fl;
use folio_lang::store::{StoreValue, ValueType};
use folio_lang::traits::*;
use folio_lang::*;
use folio_stdext::collections::groupingmap::Scope;

/// Get the `\advance` command.
pub fn get_advance<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    get_command::<S, AdvanceOp>()
}

/// Get the `\multiply` command.
pub fn get_multiply<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    get_command::<S, MultiplyOp>()
}

/// Get the `\divide` command.
pub fn get_divide<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    get_command::<S, DivideOp>()
}

fn get_command<S: HasComponent<prefix::Component>, O: Op>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(math_primitive_fn::<S, O>)
        .with_tag(prefix::assignment_tag())
        .with_doc(O::DOC)
}

trait Number: Sized + Copy + std::fmt::Display {
    fn parse<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<Self>;
    fn checked_add(lhs: Self, rhs: Self) -> Option<Self>;
    fn checked_mul(lhs: Self, rhs: i32) -> Option<Self>;
    fn checked_div(lhs: Self, rhs: i32) -> Option<Self>;
}

impl Number for i32 {
    fn parse<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<Self> {
        <i32 as Parsable<S>>::parse(input)
    }
    fn checked_add(lhs: Self, rhs: Self) -> Option<Self> {
        lhs.checked_add(rhs)
    }
    fn checked_mul(lhs: Self, rhs: i32) -> Option<Self> {
        lhs.checked_mul(rhs)
    }
    fn checked_div(lhs: Self, rhs: i32) -> Option<Self> {
        lhs.checked_div(rhs)
    }
}

impl Number for Scaled {
    fn parse<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<Self> {
        <Scaled as Parsable<S>>::parse(input)
    }
    fn checked_add(lhs: Self, rhs: Self) -> Option<Self> {
        lhs.0.checked_add(rhs.0).map(Scaled)
    }
    fn checked_mul(lhs: Self, rhs: i32) -> Option<Self> {
        lhs.0.checked_mul(rhs).map(Scaled)
    }
    fn checked_div(lhs: Self, rhs: i32) -> Option<Self> {
        lhs.0.checked_div(rhs).map(Scaled)
    }
}

impl Number for Glue {
    fn parse<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<Self> {
        <Glue as Parsable<S>>::parse(input)
    }
    fn checked_add(lhs: Self, rhs: Self) -> Option<Self> {
        lhs.width.0.checked_add(rhs.width.0)?;
        Some(lhs + rhs)
    }
    fn checked_mul(lhs: Self, rhs: i32) -> Option<Self> {
        lhs.checked_mul(rhs)
    }
    fn checked_div(lhs: Self, rhs: i32) -> Option<Self> {
        lhs.checked_div(rhs)
    }
}

trait Op {
    const DOC: &'static str;
    // Whether the right hand side has the type of the variable, rather than being an integer.
    const RHS_SAME: bool;
    type Error: error::TexError;
    fn apply<N: Number>(lhs: N, rhs_i: i32, rhs_n: Option<N>) -> Result<N, Self::Error>;

    fn apply_to_value<S: FolioState, N: Number>(
        lhs: N,
        input: &mut vm::ExecutionInput<S>,
    ) -> fl::Result<N> {
        let (rhs_i, rhs_n) = if Self::RHS_SAME {
            (0_i32, Some(N::parse(input)?))
        } else {
            (<i32 as Parsable<S>>::parse(input)?, None)
        };
        Ok(Self::apply(lhs, rhs_i, rhs_n)?)
    }
}

struct AdvanceOp;

impl Op for AdvanceOp {
    const DOC: &'static str = "Add a quantity to a variable";
    const RHS_SAME: bool = true;
    type Error = OverflowError;
    fn apply<N: Number>(lhs: N, _: i32, rhs_n: Option<N>) -> Result<N, Self::Error> {
        let Some(rhs_n) = rhs_n else {
            return Ok(lhs);
        };
        N::checked_add(lhs, rhs_n).ok_or_else(|| OverflowError {
            op_name: "addition",
            lhs: format!["{lhs}"],
            rhs: format!["{rhs_n}"],
        })
    }
}

struct MultiplyOp;

impl Op for MultiplyOp {
    const DOC: &'static str = "Multiply a variable by an integer";
    const RHS_SAME: bool = false;
    type Error = OverflowError;
    fn apply<N: Number>(lhs: N, rhs_i: i32, _: Option<N>) -> Result<N, Self::Error> {
        N::checked_mul(lhs, rhs_i).ok_or_else(|| OverflowError {
            op_name: "multiplication",
            lhs: format!["{lhs}"],
            rhs: format!["{rhs_i}"],
        })
    }
}

struct DivideOp;

impl Op for DivideOp {
    const DOC: &'static str = "Divide a variable by an integer";
    const RHS_SAME: bool = false;
    type Error = DivisionByZeroError;
    fn apply<N: Number>(lhs: N, rhs_i: i32, _: Option<N>) -> Result<N, Self::Error> {
        if rhs_i == 0 {
            return Err(DivisionByZeroError {
                numerator: format!["{lhs}"],
            });
        }
        // Only i32::MIN / -1 overflows; the value is then left unchanged.
        Ok(N::checked_div(lhs, rhs_i).unwrap_or(lhs))
    }
}

#[derive(Debug)]
struct OverflowError {
    op_name: &'static str,
    lhs: String,
    rhs: String,
}

impl error::TexError for OverflowError {
    fn kind(&self) -> error::Kind {
        error::Kind::FailedPrecondition
    }

    fn title(&self) -> String {
        format!["arithmetic overflow in {}", self.op_name]
    }

    fn notes(&self) -> Vec<String> {
        vec![
            format!["left hand side evaluated to {}", self.lhs],
            format!["right hand side evaluated to {}", self.rhs],
            "the variable keeps its value".into(),
        ]
    }
}

#[derive(Debug)]
struct DivisionByZeroError {
    numerator: String,
}

impl error::TexError for DivisionByZeroError {
    fn kind(&self) -> error::Kind {
        error::Kind::FailedPrecondition
    }

    fn title(&self) -> String {
        "division by zero".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![format!["numerator evaluated to {}", self.numerator]]
    }
}

fn math_primitive_fn<S: HasComponent<prefix::Component>, O: Op>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let scope = prefix::scope(input.state_mut());
    let token = input.next_or_err(ArithmeticVariableEndOfInput {})?;
    let variable = match token.value() {
        token::Value::CommandRef(command_ref) => {
            match input.commands_map().get_command(&command_ref) {
                Some(command::Command::Variable(variable)) => *variable,
                None => {
                    return Err(parse::Error::new("a variable", Some(token), "")
                        .with_got_override("found an undefined control sequence")
                        .into())
                }
                Some(cmd) => {
                    return Err(parse::Error::new("a variable", Some(token), "")
                        .with_got_override(format!["found a control sequence referencing {cmd}"])
                        .into())
                }
            }
        }
        _ => {
            return Err(parse::Error::new("a variable", Some(token), "")
                .with_got_override("found a character token")
                .into())
        }
    };
    if !matches!(
        variable.value_type(),
        ValueType::Int | ValueType::Dimen | ValueType::Glue
    ) {
        return Err(parse::Error::new("an arithmetic variable", Some(token), "")
            .with_got_override("found a variable that is not an integer, dimension or glue")
            .into());
    }
    let location = variable.resolve(token, input.as_mut())?;
    OptionalBy::parse(input)?;
    let current = input.store().read(location);
    let value = match current {
        StoreValue::Int(n) => StoreValue::Int(O::apply_to_value(n, input)?),
        StoreValue::Dimen(d) => StoreValue::Dimen(O::apply_to_value(d, input)?),
        StoreValue::Glue(g) => StoreValue::Glue(O::apply_to_value(g, input)?),
        StoreValue::CatCode(_) | StoreValue::Font(_) => return Ok(()),
    };
    assign(input, location, value, scope);
    Ok(())
}

fn assign<S: FolioState>(
    input: &mut vm::ExecutionInput<S>,
    location: store::Location,
    value: StoreValue,
    scope: Scope,
) {
    log::trace!("arithmetic result {value:?} at {location:?}");
    input.store_mut().assign(location, value, scope);
}

#[derive(Debug)]
struct ArithmeticVariableEndOfInput;

impl error::EndOfInputError for ArithmeticVariableEndOfInput {
    fn doing(&self) -> String {
        "parsing an arithmetic variable".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers;
    use crate::the;
    use crate::testutil::*;
    use std::collections::HashMap;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        let mut m = HashMap::from([
            ("advance", get_advance()),
            ("catcode", registers::get_catcode()),
            ("count", registers::get_count()),
            ("countdef", registers::get_countdef()),
            ("dimen", registers::get_dimen()),
            ("divide", get_divide()),
            ("global", crate::prefix::get_global()),
            ("multiply", get_multiply()),
            ("skip", registers::get_skip()),
            ("the", the::get_the()),
            ("assertGlobalIsFalse", crate::prefix::get_assert_global_is_false()),
        ]);
        m.extend(registers::parameters());
        m
    }

    folio_testing::test_suite![
        expansion_equality_tests(
            (advance_base_case, r"\count 1 1 \advance\count 1 4 \the\count 1", "5"),
            (
                advance_by,
                r"\count 1 1 \advance\count 1 by 4 \the\count 1",
                "5"
            ),
            (
                advance_negative,
                r"\count 1 10 \advance\count 1 by -4 \the\count 1",
                "6"
            ),
            (
                advance_by_variable,
                r"\count 1 10 \count 2 3 \advance\count 1 by \count 2 \the\count 1",
                "13"
            ),
            (
                advance_local,
                r"\count 1 1 {\advance\count 1 4}\the\count 1",
                "1"
            ),
            (
                advance_global,
                r"\count 1 1 {\global\advance\count 1 4}\the\count 1",
                "5"
            ),
            (
                advance_takes_global,
                r"\global\advance\count 1 4 \assertGlobalIsFalse",
                ""
            ),
            (
                advance_countdef,
                r"\countdef\A 5 \A=2 \advance\A by 3 \the\count 5",
                "5"
            ),
            (
                advance_parameter,
                r"\tolerance=100 \advance\tolerance by 50 \the\tolerance",
                "150"
            ),
            (
                advance_dimen,
                r"\dimen 1=1pt \advance\dimen 1 by 2pt \the\dimen 1",
                r"\dimen 2=3pt \the\dimen 2"
            ),
            (
                advance_skip,
                r"\skip 1=1pt plus 1fil \advance\skip 1 by 2pt plus 1fil \the\skip 1",
                r"\skip 2=3pt plus 2fil \the\skip 2"
            ),
            (
                multiply_base_case,
                r"\count 1 5 \multiply\count 1 4 \the\count 1",
                "20"
            ),
            (
                multiply_by,
                r"\count 1 5 \multiply\count 1 by 4 \the\count 1",
                "20"
            ),
            (
                multiply_dimen,
                r"\dimen 1=1.5pt \multiply\dimen 1 by 2 \the\dimen 1",
                r"\dimen 2=3pt \the\dimen 2"
            ),
            (
                multiply_skip,
                r"\skip 1=1pt plus 2pt \multiply\skip 1 by 3 \the\skip 1",
                r"\skip 2=3pt plus 6pt \the\skip 2"
            ),
            (
                divide_base_case,
                r"\count 1 9 \divide\count 1 4 \the\count 1",
                "2"
            ),
            (
                divide_negative,
                r"\count 1 -9 \divide\count 1 by 4 \the\count 1",
                "-2"
            ),
            (
                divide_dimen,
                r"\dimen 1=3pt \divide\dimen 1 by 2 \the\dimen 1",
                r"\dimen 2=1.5pt \the\dimen 2"
            ),
        ),
        recoverable_failure_tests(
            (
                advance_overflow,
                r"\count 1 2147483647 \advance\count 1 by 1 \the\count 1",
                "2147483647"
            ),
            (
                multiply_overflow,
                r"\count 1 2147483647 \multiply\count 1 by 2 \the\count 1",
                "2147483647"
            ),
            (
                divide_by_zero,
                r"\count 1 9 \divide\count 1 by 0 \the\count 1",
                "9"
            ),
        ),
        failure_tests(
            (advance_missing_variable, r"\advance 1 by 2"),
            (advance_undefined, r"\advance\undefined by 2"),
            (advance_catcode, r"\advance\catcode 1 by 2"),
            (advance_not_a_variable, r"\advance\the by 2"),
            (advance_end_of_input, r"\advance"),
        ),
    ];
}
