//! Parsing of relations (<, = and >)
//!
//! A relation is a character token with category code other and value <, = or >.

use crate::prelude as fl;
use crate::token;
use crate::traits::*;
use crate::vm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ordering(pub std::cmp::Ordering);

impl<S: FolioState> Parsable<S> for Ordering {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        super::skip_spaces(input)?;
        get_required_element![
            input,
            "a relation",
            format!["a relation is a token with category code {} and one of the following values: <, =, >", token::CatCode::Other],
            token::Value::Other('<') => Ordering(std::cmp::Ordering::Less),
            token::Value::Other('=') => Ordering(std::cmp::Ordering::Equal),
            token::Value::Other('>') => Ordering(std::cmp::Ordering::Greater),
        ]
    }
}
