//! The `\the` primitive

use folio_lang::prelude as fl;
use folio_lang::store::StoreValue;
use folio_lang::traits::*;
use folio_lang::*;

pub const THE_DOC: &str = "Output the value of a variable";

/// Get the `\the` command.
pub fn get_the<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(the_primitive_fn).with_doc(THE_DOC)
}

fn the_primitive_fn<S: FolioState>(
    the_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    let token = input.next_or_err(r"reading the argument of \the")?;
    let variable = match token.value() {
        token::Value::CommandRef(command_ref) => match input.commands_map().get_command(&command_ref) {
            Some(command::Command::Variable(variable)) => Some(*variable),
            _ => None,
        },
        _ => None,
    };
    let Some(variable) = variable else {
        return Err(error::SimpleTokenError::new(
            token,
            r"the argument of \the must be a variable",
        )
        .with_note(r"for example \the\count 1, \the\hsize or \the\catcode`\a")
        .into());
    };
    let value = variable.value(token, input.expanded())?;
    input.push_string_tokens(the_token, &format_value(value));
    Ok(())
}

/// Prints a value the way `\the` does.
fn format_value(value: StoreValue) -> String {
    match value {
        StoreValue::Int(i) => i.to_string(),
        StoreValue::Dimen(d) => d.to_string(),
        StoreValue::Glue(g) => g.to_string(),
        StoreValue::CatCode(_) | StoreValue::Font(_) => value.as_int().to_string(),
    }
}
