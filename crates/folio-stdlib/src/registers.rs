//! Registers, named parameters and category codes
//!
//! `\count`, `\dimen` and `\skip` address 256 registers each; `\countdef` and friends
//!     bind a control sequence to a single register.
//! Every integer, dimension and glue parameter of the store, like `\tolerance` or
//!     `\baselineskip`, is available as a variable named after the parameter.

use crate::prefix;
use folio_lang::parse::{OptionalEquals, Uint};
use folio_lang::prelude as fl;
use folio_lang::store::{DimenParam, GlueParam, IntParam, Location};
use folio_lang::traits::*;
use folio_lang::variable::{Array, Variable};
use folio_lang::*;

pub const CATCODE_DOC: &str = "Get or set the category code of a character";
pub const COUNT_DOC: &str = "Get or set an integer register";
pub const COUNTDEF_DOC: &str = "Bind an integer register to a control sequence";
pub const DIMEN_DOC: &str = "Get or set a dimension register";
pub const DIMENDEF_DOC: &str = "Bind a dimension register to a control sequence";
pub const SKIP_DOC: &str = "Get or set a glue register";
pub const SKIPDEF_DOC: &str = "Bind a glue register to a control sequence";

const INT_PARAM_DOC: &str = "Integer parameter";
const DIMEN_PARAM_DOC: &str = "Dimension parameter";
const GLUE_PARAM_DOC: &str = "Glue parameter";

/// Get the `\count` command.
pub fn get_count<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(Variable::Indexed(Array::Count)).with_doc(COUNT_DOC)
}

/// Get the `\dimen` command.
pub fn get_dimen<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(Variable::Indexed(Array::Dimen)).with_doc(DIMEN_DOC)
}

/// Get the `\skip` command.
pub fn get_skip<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(Variable::Indexed(Array::Skip)).with_doc(SKIP_DOC)
}

/// Get the `\catcode` command.
pub fn get_catcode<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_variable(Variable::Indexed(Array::CatCode)).with_doc(CATCODE_DOC)
}

/// Returns a variable for every named parameter in the store, keyed by the parameter's name.
///
/// This includes `\endlinechar`, which the lexer consults at the end of every line.
pub fn parameters<S: FolioState>() -> Vec<(&'static str, command::BuiltIn<S>)> {
    let ints = IntParam::ALL
        .iter()
        .map(|p| (p.name(), Location::Int(*p), INT_PARAM_DOC));
    let dimens = DimenParam::ALL
        .iter()
        .map(|p| (p.name(), Location::DimenParam(*p), DIMEN_PARAM_DOC));
    let glues = GlueParam::ALL
        .iter()
        .map(|p| (p.name(), Location::GlueParam(*p), GLUE_PARAM_DOC));
    ints.chain(dimens)
        .chain(glues)
        .map(|(name, location, doc)| {
            (
                name,
                command::BuiltIn::new_variable(Variable::Fixed(location)).with_doc(doc),
            )
        })
        .collect()
}

macro_rules! create_register_def {
    ($primitive_fn: ident, $get: ident, $location: ident, $doc: expr) => {
        fn $primitive_fn<S: HasComponent<prefix::Component>>(
            token: token::Token,
            input: &mut vm::ExecutionInput<S>,
        ) -> fl::Result<()> {
            let scope = prefix::scope(input.state_mut());
            let (target, _, Uint(index)) =
                <(token::CommandRef, OptionalEquals, Uint<256>)>::parse(input)?;
            log::trace!(
                "{} binds register {index}",
                input.vm().token_to_string(token)
            );
            let variable = Variable::Fixed(Location::$location(index as u8));
            input
                .commands_map_mut()
                .insert(target, command::Command::Variable(variable), scope);
            Ok(())
        }

        pub fn $get<S: HasComponent<prefix::Component>>() -> command::BuiltIn<S> {
            command::BuiltIn::new_execution($primitive_fn)
                .with_tag(prefix::assignment_tag())
                .with_doc($doc)
        }
    };
}

create_register_def![countdef_primitive_fn, get_countdef, Count, COUNTDEF_DOC];
create_register_def![dimendef_primitive_fn, get_dimendef, Dimen, DIMENDEF_DOC];
create_register_def![skipdef_primitive_fn, get_skipdef, Skip, SKIPDEF_DOC];
