use crate::prelude as fl;
use crate::token;
use crate::traits::*;
use crate::vm;

/// When parsed, this type consumes optional spaces and then an optional equals sign.
pub struct OptionalEquals;

impl<S: FolioState> Parsable<S> for OptionalEquals {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        parse_optional_equals(input)?;
        Ok(OptionalEquals {})
    }
}

/// Like [OptionalEquals], but without expanding the input.
///
/// `\let` reads its equals sign this way.
pub struct OptionalEqualsUnexpanded;

impl<S: FolioState> Parsable<S> for OptionalEqualsUnexpanded {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        parse_optional_equals(input.unexpanded())?;
        Ok(OptionalEqualsUnexpanded {})
    }
}

fn parse_optional_equals<T: TokenStream>(input: &mut T) -> fl::Result<()> {
    super::skip_spaces(input)?;
    get_optional_element![
        input,
        token::Value::Other('=') => (),
    ];
    Ok(())
}
