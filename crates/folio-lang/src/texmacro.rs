//! User defined macros.
//!
//! A macro has a prefix, a list of parameters and a replacement text.
//! Calling a macro matches the prefix against the input, reads one argument per
//!     parameter, substitutes the arguments into the replacement text and pushes
//!     the result onto the front of the input.
//! The result is not expanded here: the expanded stream keeps reading, and expands
//!     whatever the replacement produced on the next iteration of its loop.

use crate::error;
use crate::prelude as fl;
use crate::token;
use crate::token::Token;
use crate::token::Value;
use crate::traits::*;
use crate::vm;
use folio_stdext::algorithms::substringsearch::Matcher;
use folio_stdext::color::Colorize;

/// A user defined macro.
#[derive(Debug, Clone, PartialEq)]
pub struct Macro {
    prefix: Vec<Token>,
    parameters: Vec<Parameter>,
    replacements: Vec<Replacement>,
}

/// A token list or parameter in a replacement text.
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    /// A list of tokens, in the order they are read.
    Tokens(Vec<Token>),

    /// A parameter, numbered from 0.
    ///
    /// The index must be less than the number of parameters of the macro.
    Parameter(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// A parameter like `#1` in `\def\a#1{}`: one token or one braced group.
    Undelimited,
    /// A parameter like `#1` in `\def\a#1.{}`: everything up to the delimiter.
    Delimited(Matcher<Value>),
}

impl Macro {
    /// Create a new macro.
    pub fn new(
        prefix: Vec<Token>,
        parameters: Vec<Parameter>,
        replacements: Vec<Replacement>,
    ) -> Macro {
        Macro {
            prefix,
            parameters,
            replacements,
        }
    }

    pub fn prefix(&self) -> &[Token] {
        &self.prefix
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn replacements(&self) -> &[Replacement] {
        &self.replacements
    }

    /// Expands the macro, reading its arguments from the input.
    pub fn call<S: FolioState>(
        &self,
        token: Token,
        input: &mut vm::ExpansionInput<S>,
    ) -> fl::Result<()> {
        match_prefix(token, &self.prefix, input.unexpanded())?;
        let mut argument_indices: Vec<(usize, usize)> = Vec::with_capacity(self.parameters.len());
        let mut argument_tokens = input.checkout_token_buffer();
        for (i, parameter) in self.parameters.iter().enumerate() {
            let start = argument_tokens.len();
            let result = parameter.parse_argument(token, input, i, &mut argument_tokens);
            if let Err(err) = result {
                input.return_token_buffer(argument_tokens);
                return Err(err);
            }
            let end = argument_tokens.len();
            argument_indices.push(match result {
                Ok(true) => (start + 1, end - 1),
                _ => (start, end),
            });
        }
        let arguments: Vec<&[Token]> = argument_indices
            .iter()
            .map(|(i, j)| &argument_tokens[*i..*j])
            .collect();
        log::trace!(
            "expanding {} with {} arguments",
            input.vm().token_to_string(token),
            arguments.len()
        );
        Macro::perform_replacement(&self.replacements, &arguments, input.expansions_mut());
        input.return_token_buffer(argument_tokens);
        Ok(())
    }

    /// Pushes the replacement text onto an expansion stack, whose top is its last element.
    fn perform_replacement(
        replacements: &[Replacement],
        arguments: &[&[Token]],
        result: &mut Vec<Token>,
    ) {
        let output_size: usize = replacements
            .iter()
            .map(|replacement| match replacement {
                Replacement::Tokens(tokens) => tokens.len(),
                Replacement::Parameter(i) => arguments.get(*i).map_or(0, |a| a.len()),
            })
            .sum();
        result.reserve(output_size);
        for replacement in replacements.iter().rev() {
            match replacement {
                Replacement::Tokens(tokens) => {
                    result.extend(tokens.iter().rev().copied());
                }
                Replacement::Parameter(i) => {
                    if let Some(argument) = arguments.get(*i) {
                        result.extend(argument.iter().rev().copied());
                    }
                }
            }
        }
    }

    /// Human readable description of the macro, as printed by `folio doc`.
    pub fn doc(&self, interner: &token::CsNameInterner) -> String {
        let mut d = String::default();
        d.push_str("User defined macro\n\n");
        d.push_str(&format![
            "Parameters definition\n{}",
            pretty_print_prefix_and_parameters(&self.prefix, &self.parameters, interner),
        ]);
        d.push_str(&format![
            "\n\nReplacement definition: `{}`\n",
            pretty_print_replacement_text(&self.replacements, interner),
        ]);
        d
    }
}

impl Parameter {
    /// Reads one argument onto the end of `result`.
    ///
    /// Returns true if the argument has outer braces that should be removed.
    fn parse_argument<S: FolioState>(
        &self,
        macro_token: Token,
        input: &mut vm::ExpansionInput<S>,
        index: usize,
        result: &mut Vec<Token>,
    ) -> fl::Result<bool> {
        match self {
            Parameter::Undelimited => {
                parse_undelimited_argument(macro_token, input.unexpanded(), index + 1, result)
            }
            Parameter::Delimited(matcher) => {
                parse_delimited_argument(macro_token, input.unexpanded(), matcher, index + 1, result)
            }
        }
    }
}

fn parse_delimited_argument<S: FolioState>(
    macro_token: Token,
    stream: &mut vm::UnexpandedStream<S>,
    matcher_factory: &Matcher<Value>,
    param_num: usize,
    result: &mut Vec<Token>,
) -> fl::Result<bool> {
    let mut matcher = matcher_factory.start();
    let mut scope_depth = 0_usize;
    // A delimiter ending in `{`, as in `\def\a#1#{}`, is matched at depth 1.
    let closing_scope_depth = match matcher_factory.substring().last() {
        Some(Value::BeginGroup(_)) => 1,
        _ => 0,
    };
    let start = result.len();
    loop {
        let token = match stream.next()? {
            None => {
                return Err(RunawayArgumentError {
                    macro_token,
                    param_num,
                    par_token: None,
                }
                .into())
            }
            Some(token) => token,
        };
        if stream.vm().is_par(token) {
            return Err(RunawayArgumentError {
                macro_token,
                param_num,
                par_token: Some(token),
            }
            .into());
        }
        match token.value() {
            Value::BeginGroup(_) => scope_depth += 1,
            Value::EndGroup(_) => scope_depth = scope_depth.saturating_sub(1),
            _ => (),
        };
        let matches_delimiter = matcher.next(&token.value());
        result.push(token);
        if scope_depth == closing_scope_depth && matches_delimiter {
            let brace = result.pop();
            for _ in 1..matcher_factory.substring().len() {
                result.pop();
            }
            // The `{` of a `#{` delimiter stays in the input.
            if let (1, Some(brace)) = (closing_scope_depth, brace) {
                stream.back(brace);
            }
            return Ok(is_single_group(&result[start..]));
        }
    }
}

fn parse_undelimited_argument<S: FolioState>(
    macro_token: Token,
    stream: &mut vm::UnexpandedStream<S>,
    param_num: usize,
    result: &mut Vec<Token>,
) -> fl::Result<bool> {
    let runaway = |par_token| RunawayArgumentError {
        macro_token,
        param_num,
        par_token,
    };
    let first = loop {
        match stream.next()? {
            None => return Err(runaway(None).into()),
            Some(token) => match token.value() {
                Value::Space(_) => continue,
                _ => break token,
            },
        }
    };
    if stream.vm().is_par(first) {
        return Err(runaway(Some(first)).into());
    }
    result.push(first);
    if !matches!(first.value(), Value::BeginGroup(_)) {
        return Ok(false);
    }
    let mut scope_depth = 1_usize;
    while scope_depth > 0 {
        let token = match stream.next()? {
            None => return Err(runaway(None).into()),
            Some(token) => token,
        };
        if stream.vm().is_par(token) {
            return Err(runaway(Some(token)).into());
        }
        match token.value() {
            Value::BeginGroup(_) => scope_depth += 1,
            Value::EndGroup(_) => scope_depth -= 1,
            _ => (),
        }
        result.push(token);
    }
    Ok(true)
}

/// Whether the list is exactly one braced group, like `{a{b}c}` but not `{a}{b}`.
fn is_single_group(list: &[Token]) -> bool {
    if list.len() < 2 || !matches!(list[0].value(), Value::BeginGroup(_)) {
        return false;
    }
    let mut depth = 0_usize;
    for (i, token) in list.iter().enumerate() {
        match token.value() {
            Value::BeginGroup(_) => depth += 1,
            Value::EndGroup(_) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i == list.len() - 1;
                }
            }
            _ => (),
        }
    }
    false
}

/// Removes the prefix of a macro from the front of the stream.
fn match_prefix<S: FolioState>(
    macro_token: Token,
    prefix: &[Token],
    stream: &mut vm::UnexpandedStream<S>,
) -> fl::Result<()> {
    for prefix_token in prefix.iter() {
        let stream_token = stream.next_or_err(PrefixEndOfInputError)?;
        if stream_token.value() != prefix_token.value() {
            return Err(UseDoesNotMatchDefinitionError {
                macro_name: stream.vm().token_to_string(macro_token),
                token: stream_token,
                expected: stream.vm().token_to_string(*prefix_token),
            }
            .into());
        }
    }
    Ok(())
}

/// Error returned when an argument does not end before a paragraph break or the end of input.
#[derive(Debug)]
pub struct RunawayArgumentError {
    pub macro_token: Token,
    pub param_num: usize,
    /// The `\par` token that ended the argument, if any.
    pub par_token: Option<Token>,
}

impl error::TexError for RunawayArgumentError {
    fn kind(&self) -> error::Kind {
        match self.par_token {
            None => error::Kind::EndOfInput,
            Some(token) => error::Kind::Token(token),
        }
    }

    fn title(&self) -> String {
        match self.par_token {
            None => "runaway argument: input ended while reading a macro argument".into(),
            Some(_) => "runaway argument: paragraph ended while reading a macro argument".into(),
        }
    }

    fn notes(&self) -> Vec<String> {
        vec![format!(
            "this is argument number {} of the macro",
            self.param_num
        )]
    }

    fn location(&self) -> Option<token::trace::SourceLocation> {
        match self.par_token {
            Some(token) => Some(token.location()),
            None => Some(self.macro_token.location()),
        }
    }
}

/// Error returned when the input does not match the prefix of a macro.
#[derive(Debug)]
pub struct UseDoesNotMatchDefinitionError {
    pub macro_name: String,
    pub token: Token,
    pub expected: String,
}

impl error::TexError for UseDoesNotMatchDefinitionError {
    fn kind(&self) -> error::Kind {
        error::Kind::Token(self.token)
    }

    fn title(&self) -> String {
        format!("use of {} does not match its definition", self.macro_name)
    }

    fn notes(&self) -> Vec<String> {
        vec![format!("expected `{}` here", self.expected)]
    }
}

#[derive(Debug)]
struct PrefixEndOfInputError;

impl error::EndOfInputError for PrefixEndOfInputError {
    fn doing(&self) -> String {
        "matching the prefix of a user-defined macro".into()
    }
}

fn colored_parameter_number(n: usize) -> String {
    let s = format!("#{n}");
    match n {
        1 => s.as_str().bright_yellow().bold().to_string(),
        _ => s.as_str().bright_blue().bold().to_string(),
    }
}

fn pretty_print_prefix_and_parameters(
    prefix: &[Token],
    parameters: &[Parameter],
    interner: &token::CsNameInterner,
) -> String {
    let mut d = String::default();
    if prefix.is_empty() {
        d.push_str(" . No prefix\n");
    } else {
        d.push_str(&format![
            " . Prefix: `{}`\n",
            token::write_tokens(prefix, interner)
        ]);
    }
    d.push_str(&format![" . Parameters ({}):", parameters.len()]);
    for (i, parameter) in parameters.iter().enumerate() {
        match parameter {
            Parameter::Undelimited => {
                d.push_str(&format![
                    "\n    {}: undelimited",
                    colored_parameter_number(i + 1),
                ]);
            }
            Parameter::Delimited(matcher) => {
                d.push_str(&format![
                    "\n    {}: delimited by `{}`",
                    colored_parameter_number(i + 1),
                    token::write_token_values(matcher.substring().iter().copied(), interner)
                ]);
            }
        }
    }
    d
}

fn pretty_print_replacement_text(
    replacements: &[Replacement],
    interner: &token::CsNameInterner,
) -> String {
    let mut b = String::default();
    for replacement in replacements.iter() {
        match replacement {
            Replacement::Parameter(i) => {
                b.push_str(colored_parameter_number(*i + 1).as_str());
            }
            Replacement::Tokens(tokens) => {
                b.push_str(&token::write_tokens(tokens, interner));
            }
        }
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::trace::SourceLocation;

    fn letter(c: char) -> Token {
        Token::new_letter(c, SourceLocation::UNKNOWN)
    }

    fn begin() -> Token {
        Token::new_begin_group('{', SourceLocation::UNKNOWN)
    }

    fn end() -> Token {
        Token::new_end_group('}', SourceLocation::UNKNOWN)
    }

    #[test]
    fn single_group() {
        assert!(is_single_group(&[begin(), letter('a'), end()]));
        assert!(is_single_group(&[begin(), begin(), end(), end()]));
        assert!(!is_single_group(&[begin(), letter('a'), end(), begin(), end()]));
        assert!(!is_single_group(&[letter('a')]));
        assert!(!is_single_group(&[begin(), letter('a')]));
    }

    #[test]
    fn replacement_is_pushed_in_reverse() {
        let replacements = vec![
            Replacement::Parameter(0),
            Replacement::Tokens(vec![letter('x'), letter('y')]),
            Replacement::Parameter(0),
        ];
        let argument = [letter('a'), letter('b')];
        let mut result = vec![];
        Macro::perform_replacement(&replacements, &[&argument], &mut result);
        let read_order: String = result.iter().rev().filter_map(Token::char).collect();
        assert_eq!(read_order, "abxyab");
    }
}
