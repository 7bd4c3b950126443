//! `\message` and `\errmessage`

use folio_lang::diagnostics::{Diagnostic, Severity};
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::*;

pub const ERRMESSAGE_DOC: &str = "Report an error with the given text";
pub const MESSAGE_DOC: &str = "Report the given text to the user";

/// Get the `\message` command.
pub fn get_message<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(message_primitive_fn).with_doc(MESSAGE_DOC)
}

fn message_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let text = read_text(input, r"reading the text of a \message")?;
    let trace = input.trace(token);
    input.report(Diagnostic::new(Severity::Info, text).with_trace(trace));
    Ok(())
}

/// Get the `\errmessage` command.
pub fn get_errmessage<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(errmessage_primitive_fn).with_doc(ERRMESSAGE_DOC)
}

fn errmessage_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let text = read_text(input, r"reading the text of an \errmessage")?;
    Err(error::SimpleTokenError::new(token, text).into())
}

/// Reads a braced token list with full expansion and writes it as a string.
fn read_text<S: FolioState>(
    input: &mut vm::ExecutionInput<S>,
    doing: &'static str,
) -> fl::Result<String> {
    let tokens = parse::parse_braced_tokens(input.expanded(), doing)?;
    Ok(token::write_tokens(&tokens, input.vm().cs_name_interner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def;
    use crate::testutil::*;
    use folio_testing::{typeset, TestOption};
    use std::collections::HashMap;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::from([
            ("def", def::get_def()),
            ("errmessage", get_errmessage()),
            ("message", get_message()),
        ])
    }

    fn diagnostics(input: &str) -> Vec<(Severity, String)> {
        typeset::<State>(input, &[TestOption::BuiltInCommands(built_in_commands)])
            .unwrap()
            .diagnostics
            .into_iter()
            .map(|d| (d.severity, d.message))
            .collect()
    }

    #[test]
    fn message() {
        assert_eq!(
            diagnostics(r"\message{Hello, World}"),
            vec![(Severity::Info, "Hello, World".to_string())]
        );
    }

    #[test]
    fn message_expands_macros() {
        assert_eq!(
            diagnostics(r"\def\A{World}\message{Hello, \A}"),
            vec![(Severity::Info, "Hello, World".to_string())]
        );
    }

    #[test]
    fn message_has_trace() {
        let output = typeset::<State>(
            r"\message{x}",
            &[TestOption::BuiltInCommands(built_in_commands)],
        )
        .unwrap();
        assert!(output.diagnostics[0].trace.is_some());
    }

    #[test]
    fn errmessage() {
        assert_eq!(
            diagnostics(r"\errmessage{Something went wrong}\message{after}"),
            vec![
                (Severity::Error, "Something went wrong".to_string()),
                (Severity::Info, "after".to_string()),
            ]
        );
    }

    folio_testing::test_suite![
        recoverable_failure_tests((errmessage_recovers, r"\errmessage{oops}a", "a"),),
        failure_tests(
            (message_without_braces, r"\message x"),
            (message_end_of_input, r"\message{abc"),
            (errmessage_without_recovery, r"\errmessage{oops}"),
        ),
    ];
}
