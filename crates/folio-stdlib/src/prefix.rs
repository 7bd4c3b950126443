//! The `\global`, `\long` and `\outer` prefix commands
//!
//! `\long` and `\outer` restrict how a macro may be used in TeX.
//! Folio accepts them before a macro definition and otherwise ignores them.
//!
//! # Developer notes
//!
//! `\global` changes, at run time, the behavior of whatever assignment comes next:
//!     a variable assignment, a macro definition, `\let`, `\advance`, `\font` and so on.
//!
//! This is implemented with a component holding a `global` flag.
//! `\global` sets the flag after checking that the next command can be prefixed.
//! Commands that can be prefixed read the flag using [Component::take_global],
//!     which returns the flag and resets it to false.
//! Variable assignments run by the VM read it through the
//!     [variable_assignment_scope_hook], which the state wires up in its
//!     `FolioState` implementation.
//!
//! For this to work *every* code path of a prefixable command must call
//!     [take_global](Component::take_global), even if it ignores the result.
//! Otherwise the flag leaks into the next assignment.
//! `\gdef` always defines globally but still takes the flag, for example.
//! Prefixable execution commands carry the [assignment_tag], or the [def_tag] for
//!     macro definitions, which is how `\global` recognizes them.

use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::*;
use folio_stdext::collections::groupingmap::Scope;

pub const GLOBAL_DOC: &str = "Make the next assignment global";
pub const LONG_DOC: &str = "Accepted before a macro definition; has no effect";
pub const OUTER_DOC: &str = "Accepted before a macro definition; has no effect";

/// Component for the prefix commands.
#[derive(Default)]
pub struct Component {
    global: bool,
}

impl Component {
    /// Get the value of the global flag and reset the flag to false.
    ///
    /// See the module documentation for correct usage of this method.
    #[inline]
    pub fn take_global(&mut self) -> bool {
        std::mem::take(&mut self.global)
    }
}

/// Takes the global flag and returns the scope of the assignment it prefixes.
#[inline]
pub fn scope<S: HasComponent<Component>>(state: &mut S) -> Scope {
    if state.component_mut().take_global() {
        Scope::Global
    } else {
        Scope::Local
    }
}

/// Scope hook for variable assignments, for use in a state's `FolioState` implementation.
#[inline]
pub fn variable_assignment_scope_hook<S: HasComponent<Component>>(state: &mut S) -> Scope {
    scope(state)
}

static ASSIGNMENT_TAG: command::StaticTag = command::StaticTag::new();
static DEF_TAG: command::StaticTag = command::StaticTag::new();
static PREFIX_TAG: command::StaticTag = command::StaticTag::new();

/// Tag of execution commands, other than macro definitions, that `\global` may prefix.
pub fn assignment_tag() -> command::Tag {
    ASSIGNMENT_TAG.get()
}

/// Tag of the macro definition commands (`\def` and friends).
pub fn def_tag() -> command::Tag {
    DEF_TAG.get()
}

fn prefix_tag() -> command::Tag {
    PREFIX_TAG.get()
}

/// Get the `\global` command.
pub fn get_global<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(global_primitive_fn)
        .with_tag(prefix_tag())
        .with_doc(GLOBAL_DOC)
}

/// Get the `\long` command.
pub fn get_long<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(long_primitive_fn)
        .with_tag(prefix_tag())
        .with_doc(LONG_DOC)
}

/// Get the `\outer` command.
pub fn get_outer<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(long_primitive_fn)
        .with_tag(prefix_tag())
        .with_doc(OUTER_DOC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Global,
    Long,
}

fn global_primitive_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    check_prefixable(token, Kind::Global, input)?;
    input.state_mut().component_mut().global = true;
    Ok(())
}

fn long_primitive_fn<S: HasComponent<Component>>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    check_prefixable(token, Kind::Long, input)
}

/// Checks that the next command can be prefixed, leaving it in the input.
fn check_prefixable<S: HasComponent<Component>>(
    prefix_token: token::Token,
    kind: Kind,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let Some(next) = input.peek()? else {
        input.state_mut().component_mut().take_global();
        return Err(error::SimpleTokenError::new(
            prefix_token,
            "unexpected end of input after a prefix command",
        )
        .with_note("a prefix must be followed by an assignment or a macro definition")
        .into());
    };
    let command = next
        .command_ref()
        .and_then(|command_ref| input.commands_map().get_command(&command_ref));
    let allowed = match (kind, command) {
        (_, Some(command::Command::Execution(_, Some(tag))))
            if *tag == def_tag() || *tag == prefix_tag() =>
        {
            true
        }
        (Kind::Global, Some(command::Command::Execution(_, Some(tag)))) => *tag == assignment_tag(),
        (Kind::Global, Some(command::Command::Variable(_)))
        | (Kind::Global, Some(command::Command::Font(_))) => true,
        _ => false,
    };
    if allowed {
        return Ok(());
    }
    input.state_mut().component_mut().take_global();
    let title = format![
        "the command {} cannot be prefixed by {}",
        input.vm().token_to_string(next),
        input.vm().token_to_string(prefix_token)
    ];
    let note = match kind {
        Kind::Global => r"\global may only prefix assignments like \def, \let, \advance or \count 1=2",
        Kind::Long => r"\long and \outer may only prefix macro definitions",
    };
    Err(error::SimpleTokenError::new(next, title)
        .with_note(note)
        .into())
}

/// Get the `\assertGlobalIsFalse` command, used in unit tests.
///
/// The command fails if the global flag is set, which is the case when a command
///     preceded by `\global` forgot to take the flag.
#[cfg(test)]
pub fn get_assert_global_is_false<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    fn noop<S: HasComponent<Component>>(
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> fl::Result<()> {
        if input.state().component().global {
            Err(error::SimpleTokenError::new(token, "the global flag was not taken").into())
        } else {
            Ok(())
        }
    }
    command::BuiltIn::new_execution(noop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::registers;
    use crate::testutil::*;
    use std::collections::HashMap;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("def", def::get_def()),
            ("global", get_global()),
            ("long", get_long()),
            ("outer", get_outer()),
            ("count", registers::get_count()),
            ("the", crate::the::get_the()),
            ("assertGlobalIsFalse", get_assert_global_is_false()),
        ])
    }

    folio_testing::test_suite![
        expansion_equality_tests(
            (
                global_variable,
                r"\count 1=1{\global\count 1=2}\the\count 1",
                "2"
            ),
            (
                local_variable,
                r"\count 1=1{\count 1=2}\the\count 1",
                "1"
            ),
            (
                global_is_taken_by_variable,
                r"{\global\count 1=2 \count 2=3}\the\count 2",
                "0"
            ),
            (
                global_global,
                r"{\global\global\def\A{a}}\A",
                "a"
            ),
            (long_def, r"\long\def\A{a}\A", "a"),
            (outer_long_def, r"\outer\long\def\A{a}\A", "a"),
            (
                long_global_def,
                r"{\long\global\def\A{a}}\A",
                "a"
            ),
            (
                global_def_takes_flag,
                r"\global\def\A{a}\assertGlobalIsFalse\A",
                "a"
            ),
        ),
        failure_tests(
            (global_before_character, r"\global a"),
            (global_at_end_of_input, r"\global"),
            (long_before_variable, r"\long\count 1=2"),
            (global_before_the, r"\global\the\count 1"),
        ),
    ];
}
