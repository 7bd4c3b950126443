//! Primitives that build typeset material
//!
//! These append nodes to the list being built: glue, kerns, penalties, rules, boxes,
//!     discretionaries and whatsits.
//! Horizontal material in vertical mode starts a paragraph and vertical material in
//!     horizontal mode ends one; the VM's list-building methods take care of this.

use folio_boxes::node::{self, Horizontal, Vertical};
use folio_boxes::pack::PackTarget;
use folio_core::{Glue, GlueOrder, Scaled};
use folio_lang::parse;
use folio_lang::prelude as fl;
use folio_lang::store::GroupKind;
use folio_lang::traits::*;
use folio_lang::*;

pub const CR_DOC: &str = "End the current row of an alignment";
pub const DISCRETIONARY_DOC: &str = "Add a discretionary break: \\discretionary{pre-break}{post-break}{no-break}";
pub const DISCRETIONARY_HYPHEN_DOC: &str = "Add a discretionary hyphen";
pub const EJECT_DOC: &str = "End the paragraph and force a page break";
pub const HALIGN_DOC: &str = "Begin an alignment of rows whose cells are separated by &";
pub const HBOX_DOC: &str = "Build a box from a horizontal list: \\hbox [to <dimen>|spread <dimen>]{...}";
pub const HFIL_DOC: &str = "Add horizontal glue that stretches infinitely";
pub const HFILL_DOC: &str = "Add horizontal glue that stretches more infinitely than \\hfil";
pub const HRULE_DOC: &str = "Add a horizontal rule to the vertical list";
pub const HSKIP_DOC: &str = "Add horizontal glue";
pub const INDENT_DOC: &str = "Start a paragraph, or add an indentation box to the current one";
pub const KERN_DOC: &str = "Add a kern to the current list";
pub const NOINDENT_DOC: &str = "Start a paragraph without indentation";
pub const PAR_DOC: &str = "End the current paragraph";
pub const PENALTY_DOC: &str = "Add a penalty to the current list";
pub const SPECIAL_DOC: &str = "Add a whatsit holding text for the backend";
pub const VBOX_DOC: &str = "Build a box from a vertical list: \\vbox [to <dimen>|spread <dimen>]{...}";
pub const VFIL_DOC: &str = "Add vertical glue that stretches infinitely";
pub const VFILL_DOC: &str = "Add vertical glue that stretches more infinitely than \\vfil";
pub const VRULE_DOC: &str = "Add a vertical rule to the horizontal list";
pub const VSKIP_DOC: &str = "Add vertical glue";

/// Default thickness of rules, 0.4pt.
pub const DEFAULT_RULE_THICKNESS: Scaled = Scaled(26214);

/// Get the `\par` command.
pub fn get_par<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(par_primitive_fn).with_doc(PAR_DOC)
}

fn par_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.end_paragraph()
}

/// Get the `\indent` command.
pub fn get_indent<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(indent_primitive_fn).with_doc(INDENT_DOC)
}

fn indent_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.begin_paragraph(true);
    Ok(())
}

/// Get the `\noindent` command.
pub fn get_noindent<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(noindent_primitive_fn).with_doc(NOINDENT_DOC)
}

fn noindent_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.begin_paragraph(false);
    Ok(())
}

macro_rules! create_glue_primitive {
    ($primitive_fn: ident, $get: ident, $glue_fn: expr, $append: ident, $doc: expr) => {
        fn $primitive_fn<S: FolioState>(
            token: token::Token,
            input: &mut vm::ExecutionInput<S>,
        ) -> fl::Result<()> {
            let glue: Glue = $glue_fn(input)?;
            $append(token, input, node::Glue::new(glue))
        }

        pub fn $get<S: FolioState>() -> command::BuiltIn<S> {
            command::BuiltIn::new_execution($primitive_fn).with_doc($doc)
        }
    };
}

fn parse_glue<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<Glue> {
    Glue::parse(input)
}

fn fil<S: FolioState>(_: &mut vm::ExecutionInput<S>) -> fl::Result<Glue> {
    Ok(Glue::infinite_stretch(GlueOrder::Fil))
}

fn fill<S: FolioState>(_: &mut vm::ExecutionInput<S>) -> fl::Result<Glue> {
    Ok(Glue::infinite_stretch(GlueOrder::Fill))
}

fn append_hglue<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
    glue: node::Glue,
) -> fl::Result<()> {
    input.append_horizontal(Horizontal::Glue(glue));
    Ok(())
}

fn append_vglue<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
    glue: node::Glue,
) -> fl::Result<()> {
    input.append_vertical(token, Vertical::Glue(glue))
}

create_glue_primitive![hskip_primitive_fn, get_hskip, parse_glue, append_hglue, HSKIP_DOC];
create_glue_primitive![hfil_primitive_fn, get_hfil, fil, append_hglue, HFIL_DOC];
create_glue_primitive![hfill_primitive_fn, get_hfill, fill, append_hglue, HFILL_DOC];
create_glue_primitive![vskip_primitive_fn, get_vskip, parse_glue, append_vglue, VSKIP_DOC];
create_glue_primitive![vfil_primitive_fn, get_vfil, fil, append_vglue, VFIL_DOC];
create_glue_primitive![vfill_primitive_fn, get_vfill, fill, append_vglue, VFILL_DOC];

/// Get the `\kern` command.
pub fn get_kern<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(kern_primitive_fn).with_doc(KERN_DOC)
}

fn kern_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let kern = node::Kern {
        kind: node::KernKind::Explicit,
        width: Scaled::parse(input)?,
    };
    if input.modes().current().is_horizontal() {
        input.append_horizontal(Horizontal::Kern(kern));
        Ok(())
    } else {
        input.append_vertical(token, Vertical::Kern(kern))
    }
}

/// Get the `\penalty` command.
pub fn get_penalty<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(penalty_primitive_fn).with_doc(PENALTY_DOC)
}

fn penalty_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let penalty = node::Penalty::new(i32::parse(input)?);
    if input.modes().current().is_horizontal() {
        input.append_horizontal(Horizontal::Penalty(penalty));
        Ok(())
    } else {
        input.append_vertical(token, Vertical::Penalty(penalty))
    }
}

/// Get the `\eject` command.
pub fn get_eject<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(eject_primitive_fn).with_doc(EJECT_DOC)
}

fn eject_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.append_vertical(
        token,
        Vertical::Penalty(node::Penalty::new(node::Penalty::EJECT)),
    )
}

/// Reads an optional `to <dimen>` or `spread <dimen>` box specification.
fn parse_pack_target<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<PackTarget> {
    Ok(if parse::parse_keyword(input, "to")? {
        PackTarget::Exactly(Scaled::parse(input)?)
    } else if parse::parse_keyword(input, "spread")? {
        PackTarget::Additional(Scaled::parse(input)?)
    } else {
        PackTarget::Natural
    })
}

/// Reads the `{` that begins the braced material of a command.
fn parse_begin_group<S: FolioState>(
    input: &mut vm::ExecutionInput<S>,
    doing: &'static str,
) -> fl::Result<()> {
    parse::skip_spaces(input)?;
    let token = input.next_or_err(doing)?;
    match token.value() {
        token::Value::BeginGroup(_) => Ok(()),
        _ => Err(parse::Error::new(
            "a begin group character",
            Some(token),
            format!["{doing} requires material in braces"],
        )
        .into()),
    }
}

macro_rules! create_box_primitive {
    ($primitive_fn: ident, $get: ident, $kind: ident, $doing: expr, $doc: expr) => {
        fn $primitive_fn<S: FolioState>(
            _: token::Token,
            input: &mut vm::ExecutionInput<S>,
        ) -> fl::Result<()> {
            let target = parse_pack_target(input)?;
            parse_begin_group(input, $doing)?;
            input.begin_box(GroupKind::$kind(target));
            Ok(())
        }

        pub fn $get<S: FolioState>() -> command::BuiltIn<S> {
            command::BuiltIn::new_execution($primitive_fn).with_doc($doc)
        }
    };
}

create_box_primitive![hbox_primitive_fn, get_hbox, HBox, r"reading an \hbox", HBOX_DOC];
create_box_primitive![vbox_primitive_fn, get_vbox, VBox, r"reading a \vbox", VBOX_DOC];

/// Reads the `width`, `height` and `depth` keywords of a rule, in any order.
///
/// A keyword may be given more than once; the last value wins.
fn parse_rule_spec<S: FolioState>(
    input: &mut vm::ExecutionInput<S>,
    mut rule: node::Rule,
) -> fl::Result<node::Rule> {
    loop {
        if parse::parse_keyword(input, "width")? {
            rule.width = Some(Scaled::parse(input)?);
        } else if parse::parse_keyword(input, "height")? {
            rule.height = Some(Scaled::parse(input)?);
        } else if parse::parse_keyword(input, "depth")? {
            rule.depth = Some(Scaled::parse(input)?);
        } else {
            return Ok(rule);
        }
    }
}

/// Get the `\hrule` command.
pub fn get_hrule<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(hrule_primitive_fn).with_doc(HRULE_DOC)
}

fn hrule_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let rule = parse_rule_spec(
        input,
        node::Rule {
            width: None,
            height: Some(DEFAULT_RULE_THICKNESS),
            depth: Some(Scaled::ZERO),
        },
    )?;
    input.append_vertical(token, Vertical::Rule(rule))
}

/// Get the `\vrule` command.
pub fn get_vrule<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(vrule_primitive_fn).with_doc(VRULE_DOC)
}

fn vrule_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let rule = parse_rule_spec(
        input,
        node::Rule {
            width: Some(DEFAULT_RULE_THICKNESS),
            height: None,
            depth: None,
        },
    )?;
    input.append_horizontal(Horizontal::Rule(rule));
    Ok(())
}

/// Get the `\discretionary` command.
pub fn get_discretionary<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(discretionary_primitive_fn).with_doc(DISCRETIONARY_DOC)
}

fn discretionary_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    parse_begin_group(input, r"reading the lists of a \discretionary")?;
    input.ensure_horizontal();
    input.begin_box(GroupKind::Discretionary(0));
    Ok(())
}

/// Get the `\-` command.
pub fn get_discretionary_hyphen<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(discretionary_hyphen_primitive_fn)
        .with_doc(DISCRETIONARY_HYPHEN_DOC)
}

fn discretionary_hyphen_primitive_fn<S: FolioState>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let font = input.store().current_font();
    let fonts = input.fonts();
    let hyphen = node::Char {
        char: '-',
        font,
        width: fonts.width_of(font, '-'),
        height: fonts.height_of(font, '-'),
        depth: fonts.depth_of(font, '-'),
    };
    input.append_horizontal(Horizontal::Discretionary(node::Discretionary {
        pre_break: vec![Horizontal::Char(hyphen)],
        post_break: vec![],
        no_break: vec![],
    }));
    Ok(())
}

/// Get the `\special` command.
pub fn get_special<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(special_primitive_fn).with_doc(SPECIAL_DOC)
}

fn special_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let tokens = parse::parse_braced_tokens(input.expanded(), r"reading the text of a \special")?;
    let text = token::write_tokens(&tokens, input.vm().cs_name_interner());
    log::debug!("\\special{{{text}}}");
    let whatsit = node::Whatsit::new("special", text);
    if input.modes().current().is_horizontal() {
        input.append_horizontal(Horizontal::Whatsit(whatsit));
        Ok(())
    } else {
        input.append_vertical(token, Vertical::Whatsit(whatsit))
    }
}

/// Get the `\halign` command.
pub fn get_halign<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(halign_primitive_fn).with_doc(HALIGN_DOC)
}

fn halign_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    parse_begin_group(input, r"reading an \halign")?;
    input.begin_alignment(token)
}

/// Get the `\cr` command.
pub fn get_cr<S: FolioState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(cr_primitive_fn).with_doc(CR_DOC)
}

fn cr_primitive_fn<S: FolioState>(
    token: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    input.finish_alignment_row(token)
}
