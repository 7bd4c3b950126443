//! Primitives for creating user-defined macros (`\def` and friends).

use crate::prefix;
use folio_lang::prelude as fl;
use folio_lang::texmacro::{Macro, Parameter, Replacement};
use folio_lang::token::{CommandRef, Token, Value};
use folio_lang::traits::*;
use folio_lang::*;
use folio_stdext::algorithms::substringsearch::Matcher;
use folio_stdext::collections::groupingmap::Scope;

pub const DEF_DOC: &str = "Define a custom macro";
pub const GDEF_DOC: &str = "Define a custom macro globally";
pub const EDEF_DOC: &str = "Define a custom macro, expanding the replacement text first";
pub const XDEF_DOC: &str = "Define a custom macro globally, expanding the replacement text first";

/// Get the `\def` command.
pub fn get_def<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(def_primitive_fn)
        .with_tag(prefix::def_tag())
        .with_doc(DEF_DOC)
}

/// Get the `\gdef` command.
pub fn get_gdef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(gdef_primitive_fn)
        .with_tag(prefix::def_tag())
        .with_doc(GDEF_DOC)
}

/// Get the `\edef` command.
pub fn get_edef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(edef_primitive_fn)
        .with_tag(prefix::def_tag())
        .with_doc(EDEF_DOC)
}

/// Get the `\xdef` command.
pub fn get_xdef<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(xdef_primitive_fn)
        .with_tag(prefix::def_tag())
        .with_doc(XDEF_DOC)
}

fn def_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    parse_and_set_macro(def_token, input, false, false)
}

fn gdef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    parse_and_set_macro(def_token, input, true, false)
}

fn edef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    parse_and_set_macro(def_token, input, false, true)
}

fn xdef_primitive_fn<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    parse_and_set_macro(def_token, input, true, true)
}

fn parse_and_set_macro<S: HasComponent<prefix::Component>>(
    def_token: Token,
    input: &mut vm::ExecutionInput<S>,
    set_globally_override: bool,
    expand_replacement: bool,
) -> fl::Result<()> {
    let mut scope = prefix::scope(input.state_mut());
    if set_globally_override {
        scope = Scope::Global;
    }
    let name = CommandRef::parse(input)?;
    let (prefix, raw_parameters, brace_rule) = parse_prefix_and_parameters(input.unexpanded())?;
    let parameters: Vec<Parameter> = raw_parameters
        .into_iter()
        .map(|delimiter| match Matcher::new(delimiter) {
            None => Parameter::Undelimited,
            Some(matcher) => Parameter::Delimited(matcher),
        })
        .collect();
    let mut replacement = if expand_replacement {
        parse_replacement_text(input.expanded(), parameters.len())?
    } else {
        parse_replacement_text(input.unexpanded(), parameters.len())?
    };
    // The `{` of a `#{` rule that ends the prefix is consumed when the prefix is matched,
    // so it is put back through the replacement.
    if let BraceRule::AfterPrefix(brace) = brace_rule {
        push_token(&mut replacement, brace);
    }
    log::debug!(
        "defining {} with {} parameter(s)",
        name.to_string(input.vm().cs_name_interner()),
        parameters.len()
    );
    let policy = input.store().config().redefinition_policy;
    input
        .commands_map_mut()
        .insert_macro(name, Macro::new(prefix, parameters, replacement), scope, policy)
        .map_err(|err| {
            error::SimpleTokenError::new(def_token, err.to_string())
                .with_note(format!(
                    "the redefinition policy of this run is {:?}",
                    policy
                ))
                .into()
        })
}

/// Whether the parameter text ended with the special `#{` rule, and where.
enum BraceRule {
    None,
    AfterPrefix(Token),
    AfterParameter,
}

fn char_to_parameter_index(c: char) -> Option<usize> {
    match c {
        '1'..='9' => Some(c as usize - '1' as usize),
        _ => None,
    }
}

const PARAMETER_NOTE: &str =
    "a parameter token must be followed by a single digit number, another parameter token, or a begin group token {";

/// Parses the prefix and the parameters.
///
/// Each parameter is returned as its delimiter, which is empty for undelimited parameters.
fn parse_prefix_and_parameters<T: TokenStream>(
    input: &mut T,
) -> fl::Result<(Vec<Token>, Vec<Vec<Value>>, BraceRule)> {
    let mut prefix = Vec::new();
    let mut parameters: Vec<Vec<Value>> = Vec::new();

    loop {
        let token = input.next_or_err(ParameterTextEndOfInputError)?;
        match token.value() {
            Value::BeginGroup(_) => {
                return Ok((prefix, parameters, BraceRule::None));
            }
            Value::EndGroup(_) => {
                return Err(error::SimpleTokenError::new(
                    token,
                    "unexpected end group token while parsing the parameter text of a macro",
                )
                .with_note("the parameter text of a macro ends at the first begin group token {")
                .into());
            }
            Value::Parameter(_) => {
                let parameter_token = input.next_or_err(ParameterEndOfInputError)?;
                match parameter_token.value() {
                    Value::BeginGroup(_) => {
                        // The #{ rule: the brace both ends the parameter text and
                        // delimits the last parameter.
                        let rule = match parameters.last_mut() {
                            None => {
                                prefix.push(parameter_token);
                                BraceRule::AfterPrefix(parameter_token)
                            }
                            Some(delimiter) => {
                                delimiter.push(parameter_token.value());
                                BraceRule::AfterParameter
                            }
                        };
                        return Ok((prefix, parameters, rule));
                    }
                    Value::CommandRef(..) => {
                        return Err(error::SimpleTokenError::new(
                            parameter_token,
                            "unexpected control sequence after a parameter token",
                        )
                        .with_note(PARAMETER_NOTE)
                        .into());
                    }
                    _ => {
                        let index = parameter_token.char().and_then(char_to_parameter_index);
                        match index {
                            None => {
                                return Err(error::SimpleTokenError::new(
                                    parameter_token,
                                    "unexpected character after a parameter token",
                                )
                                .with_note(PARAMETER_NOTE)
                                .into());
                            }
                            Some(index) if index != parameters.len() => {
                                return Err(error::SimpleTokenError::new(
                                    parameter_token,
                                    format!["unexpected parameter number {}", index + 1],
                                )
                                .with_note(format![
                                    "this macro has {} parameter(s) so far, so parameter number #{} was expected",
                                    parameters.len(),
                                    parameters.len() + 1
                                ])
                                .into());
                            }
                            Some(_) => parameters.push(Vec::new()),
                        }
                    }
                }
            }
            _ => match parameters.last_mut() {
                None => prefix.push(token),
                Some(delimiter) => delimiter.push(token.value()),
            },
        }
    }
}

#[derive(Debug)]
struct ParameterTextEndOfInputError;

impl error::EndOfInputError for ParameterTextEndOfInputError {
    fn doing(&self) -> String {
        "reading the parameter text of a macro".into()
    }

    fn notes(&self) -> Vec<String> {
        vec!["the parameter text of a macro must end with a begin group token {".into()]
    }
}

#[derive(Debug)]
struct ParameterEndOfInputError;

impl error::EndOfInputError for ParameterEndOfInputError {
    fn doing(&self) -> String {
        "reading the token after a parameter token".into()
    }

    fn notes(&self) -> Vec<String> {
        vec![PARAMETER_NOTE.into()]
    }
}

#[derive(Debug)]
struct ReplacementEndOfInputError;

impl error::EndOfInputError for ReplacementEndOfInputError {
    fn doing(&self) -> String {
        "reading the replacement text of a macro".into()
    }

    fn notes(&self) -> Vec<String> {
        vec!["the replacement text of a macro ends at the matching end group token }".into()]
    }
}

fn push_token(result: &mut Vec<Replacement>, token: Token) {
    match result.last_mut() {
        Some(Replacement::Tokens(tokens)) => tokens.push(token),
        _ => result.push(Replacement::Tokens(vec![token])),
    }
}

/// Parses the replacement text, up to and including the closing brace.
///
/// `#n` becomes a parameter and `##` becomes a single parameter token.
fn parse_replacement_text<T: TokenStream>(
    input: &mut T,
    num_parameters: usize,
) -> fl::Result<Vec<Replacement>> {
    let mut result = vec![];
    let mut scope_depth = 0_usize;

    loop {
        let token = input.next_or_err(ReplacementEndOfInputError)?;
        match token.value() {
            Value::BeginGroup(_) => {
                scope_depth += 1;
            }
            Value::EndGroup(_) => {
                if scope_depth == 0 {
                    return Ok(result);
                }
                scope_depth -= 1;
            }
            Value::Parameter(_) => {
                let parameter_token = input.next_or_err(ParameterEndOfInputError)?;
                if let Value::Parameter(_) = parameter_token.value() {
                    push_token(&mut result, parameter_token);
                    continue;
                }
                let index = match parameter_token.value() {
                    Value::CommandRef(..) => None,
                    _ => parameter_token.char().and_then(char_to_parameter_index),
                };
                match index {
                    Some(index) if index < num_parameters => {
                        result.push(Replacement::Parameter(index));
                        continue;
                    }
                    _ => {
                        let expected = match num_parameters {
                            0 => "no parameter token because this macro has 0 parameters".to_string(),
                            1 => "the number 1 because this macro has only 1 parameter".to_string(),
                            n => format![
                                "a number between 1 and {n} inclusive because this macro has {n} parameters"
                            ],
                        };
                        return Err(error::SimpleTokenError::new(
                            parameter_token,
                            "unexpected token while reading a parameter number",
                        )
                        .with_note(format!["expected {expected}"])
                        .into());
                    }
                }
            }
            _ => {}
        }
        push_token(&mut result, token);
    }
}
