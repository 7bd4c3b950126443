use crate::prelude as fl;
use crate::token;
use crate::traits::*;
use crate::vm;

/// Tries to read a keyword, like `pt` or `plus`, from the stream.
///
/// Leading spaces are skipped.
/// Letters match case-insensitively; character tokens of any category other than
///     a control sequence or active character are accepted.
/// If the keyword does not match, every token read after the spaces is put back
///     and false is returned.
///
/// The keyword must be ASCII lowercase.
pub fn parse_keyword<T: TokenStream>(stream: &mut T, keyword: &str) -> fl::Result<bool> {
    super::skip_spaces(stream)?;
    let mut matched: Vec<token::Token> = Vec::with_capacity(keyword.len());
    for want in keyword.chars() {
        let token = match stream.next()? {
            None => {
                put_back(stream, matched);
                return Ok(false);
            }
            Some(token) => token,
        };
        let is_match = token.command_ref().is_none()
            && token.char().map(|c| c.to_ascii_lowercase()) == Some(want);
        if !is_match {
            stream.back(token);
            put_back(stream, matched);
            return Ok(false);
        }
        matched.push(token);
    }
    Ok(true)
}

fn put_back<T: TokenStream>(stream: &mut T, matched: Vec<token::Token>) {
    for token in matched.into_iter().rev() {
        stream.back(token);
    }
}

/// When parsed, this type consumes an optional `by` keyword from the input stream.
pub struct OptionalBy;

impl<S: FolioState> Parsable<S> for OptionalBy {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        parse_keyword(input, "by")?;
        Ok(OptionalBy {})
    }
}

/// When parsed, this type consumes a required `to` keyword from the input stream.
pub struct To;

impl<S: FolioState> Parsable<S> for To {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        if parse_keyword(input, "to")? {
            return Ok(To {});
        }
        let got = input.peek()?;
        Err(super::Error::new(
            "the `to` keyword",
            got,
            "the `to` keyword consists of a t or T letter token, then a o or O letter token",
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VM;
    use std::collections::HashMap;

    fn run(source: &str, keyword: &str) -> (bool, String) {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("", source);
        let input = vm::ExecutionInput::new(&mut vm);
        let found = parse_keyword(input, keyword).unwrap();
        let mut rest = vec![];
        while let Some(token) = input.unexpanded().next().unwrap() {
            rest.push(token);
        }
        (found, token::write_tokens(&rest, input.vm().cs_name_interner()))
    }

    macro_rules! keyword_tests {
        ($( ($name: ident, $source: expr, $keyword: expr, $found: expr, $rest: expr), )+) => {
            $(
            #[test]
            fn $name() {
                let (found, rest) = run($source, $keyword);
                assert_eq!(found, $found);
                assert_eq!(rest, $rest);
            }
            )+
        };
    }

    #[test]
    fn leading_spaces_are_skipped() {
        let mut vm = VM::<()>::new(HashMap::new());
        vm.push_source("", "1   plus2 1 minus");
        let input = vm::ExecutionInput::new(&mut vm);
        input.unexpanded().next().unwrap();
        assert!(parse_keyword(input, "plus").unwrap());
        input.unexpanded().next().unwrap();
        assert!(!parse_keyword(input, "plus").unwrap());
        input.unexpanded().next().unwrap();
        assert!(parse_keyword(input, "minus").unwrap());
    }

    keyword_tests![
        (exact, "pt", "pt", true, " "),
        (upper_case, "PT", "pt", true, " "),
        (mixed_case, "pT", "pt", true, " "),
        (partial_match, "plux", "plus", false, "plux "),
        (no_match, "xyz", "pt", false, "xyz "),
        (cut_short, "p", "pt", false, "p "),
        (control_sequence, r"p\t", "pt", false, r"p\t"),
    ];
}
