//! `\let` aliasing command, and `\relax`

use crate::prefix;
use folio_lang::parse::OptionalEqualsUnexpanded;
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::*;

pub const LET_DOC: &str = "Assign a command or character to a control sequence";
pub const RELAX_DOC: &str = "Do nothing";

/// Get the `\let` command.
pub fn get_let<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(let_primitive_fn)
        .with_tag(prefix::assignment_tag())
        .with_doc(LET_DOC)
}

fn let_primitive_fn<S: HasComponent<prefix::Component>>(
    let_token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let scope = prefix::scope(input.state_mut());
    let alias = token::CommandRef::parse(input)?;
    OptionalEqualsUnexpanded::parse(input)?;
    parse::skip_optional_space(input.unexpanded())?;
    let token = input
        .unexpanded()
        .next_or_err(r"reading the right hand side of a \let assignment")?;
    match token.value() {
        token::Value::CommandRef(command_ref) => {
            match input
                .commands_map_mut()
                .alias_control_sequence(alias, &command_ref, scope)
            {
                Ok(()) => Ok(()),
                Err(_) => Err(vm::undefined_command_error(token, input.vm()).into()),
            }
        }
        _ => {
            log::trace!(
                "{} aliases a character token",
                input.vm().token_to_string(let_token)
            );
            input.commands_map_mut().alias_token(alias, token, scope);
            Ok(())
        }
    }
}

/// Get the `\relax` command.
pub fn get_relax<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(relax_primitive_fn).with_doc(RELAX_DOC)
}

fn relax_primitive_fn<S: FolioState>(
    _: token::Token,
    _: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::testutil::*;
    use std::collections::HashMap;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("def", def::get_def()),
            ("global", prefix::get_global()),
            ("let", get_let()),
            ("relax", get_relax()),
            ("assertGlobalIsFalse", prefix::get_assert_global_is_false()),
        ])
    }

    folio_testing::test_suite![
        expansion_equality_tests(
            (let_for_macro, r"\def\A{abc}\let\B\A\B", "abc"),
            (let_for_macro_equals, r"\def\A{abc}\let\B=\A\B", "abc"),
            (let_for_macro_equals_space, r"\def\A{abc}\let\B= \A\B", "abc"),
            (local, r"\def\A{a}\def\B{b}\let\C=\A{\let\C=\B \C}\C", "ba"),
            (
                global,
                r"\def\A{a}\def\B{b}\let\C=\A{\global\let\C=\B \C}\C",
                "bb"
            ),
            (
                let_takes_global,
                r"\def\A{a}\global\let\B=\A\assertGlobalIsFalse\B",
                "a"
            ),
            (let_keeps_old_meaning, r"\def\A{a}\let\B\A\def\A{b}\B\A", "ab"),
            (let_character, r"\let\A=x\A\A", "xx"),
            (let_primitive, r"\let\define=\def\define\A{y}\A", "y"),
            (relax, r"a\relax b", "ab"),
        ),
        failure_tests(
            (let_unknown_cs_name, r"\let \B=\A"),
            (let_end_of_input, r"\let \B="),
        ),
    ];
}
