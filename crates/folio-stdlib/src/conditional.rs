//! Conditional primitives (if, else, or, fi)
//!
//! A conditional that evaluates to true pushes a branch onto the component's stack and
//!     expands to nothing; the tokens of the true branch are then read as usual.
//! A conditional that evaluates to false skips tokens, unexpanded, up to the matching
//!     `\else` or `\fi`.
//! Nested conditionals inside skipped text are recognized by the tag shared by every
//!     `\if` command, so `\iffalse \ifnum 1=1 \else \fi \fi` skips everything.
//!
//! When `\else` or `\or` is expanded, the branch that was running has finished and
//!     the rest of the conditional is skipped up to `\fi`.

use folio_core::Scaled;
use folio_lang::parse;
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::*;

pub const ELSE_DOC: &str = "Start the else branch of a conditional or switch statement";
pub const FI_DOC: &str = "End a conditional or switch statement";
pub const IFCASE_DOC: &str = "Begin a switch statement";
pub const IFDIM_DOC: &str = "Compare two dimensions";
pub const IFFALSE_DOC: &str = "Evaluate the false branch";
pub const IFNUM_DOC: &str = "Compare two integers";
pub const IFODD_DOC: &str = "Check if an integer is odd";
pub const IFTRUE_DOC: &str = "Evaluate the true branch";
pub const IFX_DOC: &str = "Check if two tokens have the same meaning";
pub const OR_DOC: &str = "Begin the next branch of a switch statement";

/// Component for the conditional primitives.
#[derive(Default)]
pub struct Component {
    // Conditionals currently being expanded, innermost last.
    branches: Vec<Branch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BranchKind {
    // The true branch of an if conditional.
    True,
    // The false branch of an if conditional, or the default branch of a switch statement.
    Else,
    // A regular case branch of a switch statement.
    Switch,
}

#[derive(Debug)]
struct Branch {
    token: token::Token,
    kind: BranchKind,
}

fn branches<S: HasComponent<Component>>(input: &mut vm::ExpansionInput<S>) -> &mut Vec<Branch> {
    &mut input.state_mut().component_mut().branches
}

static IF_TAG: command::StaticTag = command::StaticTag::new();
static ELSE_TAG: command::StaticTag = command::StaticTag::new();
static OR_TAG: command::StaticTag = command::StaticTag::new();
static FI_TAG: command::StaticTag = command::StaticTag::new();

/// Where skipping stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Else,
    Or,
    Fi,
}

/// Skips unexpanded tokens up to a `\fi` at depth zero, or one of the given stops.
///
/// Returns [None] if the input ends first.
fn skip_to<S: HasComponent<Component>>(
    input: &mut vm::ExpansionInput<S>,
    stops: &[Stop],
) -> fl::Result<Option<Stop>> {
    let mut depth = 0_usize;
    while let Some(token) = input.unexpanded().next()? {
        let Some(tag) = token
            .command_ref()
            .and_then(|command_ref| input.commands_map().get_tag(&command_ref))
        else {
            continue;
        };
        if tag == IF_TAG.get() {
            depth += 1;
        } else if tag == FI_TAG.get() {
            if depth == 0 {
                return Ok(Some(Stop::Fi));
            }
            depth -= 1;
        } else if depth == 0 {
            if tag == ELSE_TAG.get() && stops.contains(&Stop::Else) {
                return Ok(Some(Stop::Else));
            }
            if tag == OR_TAG.get() && stops.contains(&Stop::Or) {
                return Ok(Some(Stop::Or));
            }
        }
    }
    Ok(None)
}

fn end_of_input_error(token: token::Token, skipping: &str) -> Box<error::Error> {
    error::SimpleTokenError::new(
        token,
        format!["unexpected end of input while skipping {skipping}"],
    )
    .with_note(r"each conditional must be terminated by a \fi command")
    .into()
}

fn true_case<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    branches(input).push(Branch {
        token,
        kind: BranchKind::True,
    });
    Ok(())
}

fn false_case<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    match skip_to(input, &[Stop::Else])? {
        Some(Stop::Else) => {
            branches(input).push(Branch {
                token,
                kind: BranchKind::Else,
            });
            Ok(())
        }
        Some(_) => Ok(()),
        None => Err(end_of_input_error(
            token,
            "the true branch of a conditional that evaluated to false",
        )),
    }
}

macro_rules! create_if_primitive {
    ($if_fn: ident, $if_primitive_fn: ident, $get_if: ident, $docs: expr) => {
        fn $if_primitive_fn<S: HasComponent<Component>>(
            token: token::Token,
            input: &mut vm::ExpansionInput<S>,
        ) -> fl::Result<()> {
            if $if_fn(input)? {
                true_case(token, input)
            } else {
                false_case(token, input)
            }
        }

        pub fn $get_if<S: HasComponent<Component>>() -> command::BuiltIn<S> {
            command::BuiltIn::new_expansion($if_primitive_fn)
                .with_tag(IF_TAG.get())
                .with_doc($docs)
        }
    };
}

fn if_true<S: FolioState>(_: &mut vm::ExpansionInput<S>) -> fl::Result<bool> {
    Ok(true)
}

fn if_false<S: FolioState>(_: &mut vm::ExpansionInput<S>) -> fl::Result<bool> {
    Ok(false)
}

fn if_num<S: FolioState>(input: &mut vm::ExpansionInput<S>) -> fl::Result<bool> {
    let (a, ordering, b) = <(i32, parse::Ordering, i32)>::parse(input)?;
    Ok(a.cmp(&b) == ordering.0)
}

fn if_dim<S: FolioState>(input: &mut vm::ExpansionInput<S>) -> fl::Result<bool> {
    let (a, ordering, b) = <(Scaled, parse::Ordering, Scaled)>::parse(input)?;
    Ok(a.cmp(&b) == ordering.0)
}

fn if_odd<S: FolioState>(input: &mut vm::ExpansionInput<S>) -> fl::Result<bool> {
    let n = i32::parse(input)?;
    Ok(n % 2 != 0)
}

/// Two tokens have the same meaning if they are the same character, or are bound to
///     the same command, or are both undefined.
/// A control sequence `\let` to a character has the meaning of that character.
fn if_x<S: FolioState>(input: &mut vm::ExpansionInput<S>) -> fl::Result<bool> {
    let a = input
        .unexpanded()
        .next_or_err(r"reading the first token of an \ifx comparison")?;
    let b = input
        .unexpanded()
        .next_or_err(r"reading the second token of an \ifx comparison")?;
    let commands_map = input.commands_map();
    let meaning = |token: token::Token| match token.value() {
        token::Value::CommandRef(command_ref) => match commands_map.get_command(&command_ref) {
            Some(command::Command::CharacterTokenAlias(value)) => Meaning::Character(*value),
            Some(command) => Meaning::Command(command),
            None => Meaning::Undefined,
        },
        value => Meaning::Character(value),
    };
    Ok(match (meaning(a), meaning(b)) {
        (Meaning::Character(u), Meaning::Character(v)) => u == v,
        (Meaning::Command(c), Meaning::Command(d)) => c.same_meaning(d),
        (Meaning::Undefined, Meaning::Undefined) => true,
        _ => false,
    })
}

enum Meaning<'a, S> {
    Character(token::Value),
    Command(&'a command::Command<S>),
    Undefined,
}

create_if_primitive![if_true, if_true_primitive_fn, get_iftrue, IFTRUE_DOC];
create_if_primitive![if_false, if_false_primitive_fn, get_iffalse, IFFALSE_DOC];
create_if_primitive![if_num, if_num_primitive_fn, get_ifnum, IFNUM_DOC];
create_if_primitive![if_dim, if_dim_primitive_fn, get_ifdim, IFDIM_DOC];
create_if_primitive![if_odd, if_odd_primitive_fn, get_ifodd, IFODD_DOC];
create_if_primitive![if_x, if_x_primitive_fn, get_ifx, IFX_DOC];

fn if_case_primitive_fn<S: HasComponent<Component>>(
    ifcase_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    let mut cases_to_skip = i32::parse(input)?;
    log::trace!("\\ifcase selected case {cases_to_skip}");
    while cases_to_skip > 0 {
        match skip_to(input, &[Stop::Or, Stop::Else])? {
            Some(Stop::Or) => cases_to_skip -= 1,
            Some(Stop::Else) => {
                branches(input).push(Branch {
                    token: ifcase_token,
                    kind: BranchKind::Else,
                });
                return Ok(());
            }
            Some(Stop::Fi) => return Ok(()),
            None => {
                return Err(end_of_input_error(
                    ifcase_token,
                    r"the cases of an \ifcase command",
                ))
            }
        }
    }
    branches(input).push(Branch {
        token: ifcase_token,
        kind: BranchKind::Switch,
    });
    Ok(())
}

/// Get the `\ifcase` primitive.
pub fn get_ifcase<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(if_case_primitive_fn)
        .with_tag(IF_TAG.get())
        .with_doc(IFCASE_DOC)
}

fn or_primitive_fn<S: HasComponent<Component>>(
    or_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    let branch = branches(input).pop();
    match branch {
        Some(Branch {
            kind: BranchKind::Switch,
            token,
        }) => match skip_to(input, &[])? {
            Some(_) => Ok(()),
            None => Err(end_of_input_error(
                token,
                r"the remaining cases of an \ifcase command",
            )),
        },
        branch => {
            restore(input, branch);
            Err(error::SimpleTokenError::new(or_token, r"unexpected \or command")
                .with_note(r"an \or command may only appear in the cases of an \ifcase command")
                .into())
        }
    }
}

/// Get the `\or` primitive.
pub fn get_or<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(or_primitive_fn)
        .with_tag(OR_TAG.get())
        .with_doc(OR_DOC)
}

fn else_primitive_fn<S: HasComponent<Component>>(
    else_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    let branch = branches(input).pop();
    match branch {
        Some(Branch {
            kind: BranchKind::True | BranchKind::Switch,
            token,
        }) => match skip_to(input, &[])? {
            Some(_) => Ok(()),
            None => Err(end_of_input_error(token, r"the else branch of a conditional")),
        },
        branch => {
            restore(input, branch);
            Err(error::SimpleTokenError::new(else_token, r"unexpected \else command")
                .with_note(r"an \else command must follow a true branch of a conditional, or the cases of an \ifcase")
                .into())
        }
    }
}

/// Get the `\else` primitive.
pub fn get_else<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(else_primitive_fn)
        .with_tag(ELSE_TAG.get())
        .with_doc(ELSE_DOC)
}

fn fi_primitive_fn<S: HasComponent<Component>>(
    fi_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    match branches(input).pop() {
        Some(branch) => {
            log::trace!("closed a {:?} branch", branch.kind);
            Ok(())
        }
        None => Err(error::SimpleTokenError::new(fi_token, r"unexpected \fi command")
            .with_note(r"there is no conditional for this \fi command to end")
            .into()),
    }
}

/// Get the `\fi` primitive.
pub fn get_fi<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(fi_primitive_fn)
        .with_tag(FI_TAG.get())
        .with_doc(FI_DOC)
}

// A misplaced \else or \or leaves the enclosing conditional open, so a later \fi still closes it.
fn restore<S: HasComponent<Component>>(input: &mut vm::ExpansionInput<S>, branch: Option<Branch>) {
    if let Some(branch) = branch {
        branches(input).push(branch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias;
    use crate::def;
    use crate::registers;
    use crate::testutil::*;
    use std::collections::HashMap;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("count", registers::get_count()),
            ("def", def::get_def()),
            ("else", get_else()),
            ("fi", get_fi()),
            ("ifcase", get_ifcase()),
            ("ifdim", get_ifdim()),
            ("iffalse", get_iffalse()),
            ("ifnum", get_ifnum()),
            ("ifodd", get_ifodd()),
            ("iftrue", get_iftrue()),
            ("ifx", get_ifx()),
            ("let", alias::get_let()),
            ("or", get_or()),
        ])
    }

    folio_testing::test_suite![
        expansion_equality_tests(
            (iftrue_base_case, r"\iftrue a\else b\fi c", r"ac"),
            (iftrue_no_else, r"\iftrue a\fi c", r"ac"),
            (iffalse_base_case, r"\iffalse a\else b\fi c", r"bc"),
            (iffalse_no_else, r"\iffalse a\fi c", r"c"),
            (
                iftrue_skip_nested_ifs,
                r"\iftrue a\else b\iftrue \else c\fi d\fi e",
                r"ae"
            ),
            (
                iffalse_skip_nested_ifs,
                r"\iffalse \iftrue a\else b\fi c\else d\fi e",
                r"de"
            ),
            (
                iftrue_with_nested_false,
                r"\iftrue\iffalse a\else b\fi\else c\fi",
                r"b"
            ),
            (ifnum_less_than_true, r"\ifnum 4<5a\else b\fi c", r"ac"),
            (ifnum_less_than_false, r"\ifnum 5<4a\else b\fi c", r"bc"),
            (ifnum_equal_true, r"\ifnum 4=4a\else b\fi c", r"ac"),
            (ifnum_equal_false, r"\ifnum 5=4a\else b\fi c", r"bc"),
            (ifnum_greater_than_true, r"\ifnum 5>4a\else b\fi c", r"ac"),
            (ifnum_greater_than_false, r"\ifnum 4>5a\else b\fi c", r"bc"),
            (
                ifnum_register,
                r"\count 1=5 \ifnum\count 1>4 y\else n\fi",
                r"y"
            ),
            (ifdim_true, r"\ifdim 1pt<2pt a\else b\fi", r"a"),
            (ifdim_units, r"\ifdim 1in>72pt a\else b\fi", r"a"),
            (ifdim_false, r"\ifdim 2pt=1pt a\else b\fi", r"b"),
            (ifodd_odd, r"\ifodd 3a\else b\fi c", r"ac"),
            (ifodd_even, r"\ifodd 4a\else b\fi c", r"bc"),
            (ifodd_negative, r"\ifodd -3a\else b\fi c", r"ac"),
            (ifx_same_character, r"\ifx aay\else n\fi", r"y"),
            (ifx_different_character, r"\ifx ab y\else n\fi", r"n"),
            (
                ifx_same_macros,
                r"\def\A{x}\def\B{x}\ifx\A\B y\else n\fi",
                r"y"
            ),
            (
                ifx_different_macros,
                r"\def\A{x}\def\B{z}\ifx\A\B y\else n\fi",
                r"n"
            ),
            (ifx_undefined, r"\ifx\C\D y\else n\fi", r"y"),
            (ifx_alias_of_character, r"\let\C=a\ifx\C ay\else n\fi", r"y"),
            (ifx_alias_of_primitive, r"\let\D=\def\ifx\D\def y\else n\fi", r"y"),
            (
                ifx_primitive_and_macro,
                r"\def\A{x}\ifx\A\def y\else n\fi",
                r"n"
            ),
            (ifcase_zero, r"\ifcase 0 a\or b\or c\else d\fi e", r"ae"),
            (ifcase_two, r"\ifcase 2 a\or b\or c\or d\else e\fi f", r"cf"),
            (ifcase_else, r"\ifcase 5 a\or b\else z\fi f", r"zf"),
            (ifcase_no_match, r"\ifcase 5 a\or b\fi x", r"x"),
            (
                ifcase_skip_nested,
                r"\ifcase 1 \iftrue a\or b\fi\or c\fi",
                r"c"
            ),
            (
                ifcase_nested_in_case,
                r"\ifcase 1 a\or\ifcase 0 b\or c\fi\or d\fi",
                r"b"
            ),
        ),
        failure_tests(
            (else_not_expected, r"a\else"),
            (fi_not_expected, r"a\fi"),
            (or_not_expected, r"a\or"),
            (else_after_else, r"\iffalse a\else b\else c\fi"),
            (or_after_iftrue, r"\iftrue a\or b\fi"),
            (iffalse_end_of_input, r"\iffalse a"),
            (iftrue_else_end_of_input, r"\iftrue a\else b"),
            (ifcase_end_of_input, r"\ifcase 3 a\or b"),
            (ifx_end_of_input, r"\ifx a"),
            (ifnum_missing_relation, r"\ifnum 1 x 2 a\fi"),
        ),
    ];
}
