//! `\begingroup` and `\endgroup`

use folio_lang::prelude as fl;
use folio_lang::store::GroupKind;
use folio_lang::traits::*;
use folio_lang::*;

pub const BEGINGROUP_DOC: &str = "Begin a group that must be ended by \\endgroup";
pub const ENDGROUP_DOC: &str = "End a group begun by \\begingroup";

/// Get the `\begingroup` command.
pub fn get_begingroup<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(begingroup_primitive_fn).with_doc(BEGINGROUP_DOC)
}

fn begingroup_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.begin_group(GroupKind::SemiSimple);
    Ok(())
}

/// Get the `\endgroup` command.
pub fn get_endgroup<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(endgroup_primitive_fn).with_doc(ENDGROUP_DOC)
}

fn endgroup_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.end_semi_simple_group(token)
}
