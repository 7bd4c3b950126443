//! # The Folio standard library
//!
//! This crate contains the primitives of the Folio engine: definitions, registers,
//!     conditionals, arithmetic, grouping, fonts, messages and the commands that build
//!     typeset material.
//!
//! [StdState] is a state type compatible with every primitive here, and
//!     [StdState::all_initial_built_ins] returns all of them keyed by name.

extern crate folio_lang;
extern crate folio_stdext;

use std::collections::HashMap;

use folio_lang::command;
use folio_lang::config::EngineConfig;
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::vm;
use folio_lang::vm::implement_has_component;
use folio_stdext::collections::groupingmap::Scope;

pub mod alias;
pub mod conditional;
pub mod def;
pub mod font;
pub mod group;
pub mod material;
pub mod math;
pub mod message;
pub mod prefix;
pub mod registers;
pub mod the;

#[cfg(test)]
mod testutil;

/// A state struct that is compatible with every primitive in the Folio standard library.
#[derive(Default)]
pub struct StdState {
    pub conditional: conditional::Component,
    pub font: font::Component,
    pub prefix: prefix::Component,
}

impl FolioState for StdState {
    #[inline]
    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        prefix::variable_assignment_scope_hook(state)
    }
}

impl StdState {
    pub fn all_initial_built_ins() -> HashMap<&'static str, command::BuiltIn<StdState>> {
        let mut m = HashMap::from([
            ("-", material::get_discretionary_hyphen()),
            //
            ("advance", math::get_advance()),
            //
            ("begingroup", group::get_begingroup()),
            //
            ("catcode", registers::get_catcode()),
            ("count", registers::get_count()),
            ("countdef", registers::get_countdef()),
            ("cr", material::get_cr()),
            //
            ("def", def::get_def()),
            ("dimen", registers::get_dimen()),
            ("dimendef", registers::get_dimendef()),
            ("discretionary", material::get_discretionary()),
            ("divide", math::get_divide()),
            //
            ("edef", def::get_edef()),
            ("eject", material::get_eject()),
            ("else", conditional::get_else()),
            ("endgroup", group::get_endgroup()),
            ("errmessage", message::get_errmessage()),
            //
            ("fi", conditional::get_fi()),
            ("font", font::get_font()),
            ("fontname", font::get_fontname()),
            //
            ("gdef", def::get_gdef()),
            ("global", prefix::get_global()),
            //
            ("halign", material::get_halign()),
            ("hbox", material::get_hbox()),
            ("hfil", material::get_hfil()),
            ("hfill", material::get_hfill()),
            ("hrule", material::get_hrule()),
            ("hskip", material::get_hskip()),
            //
            ("ifcase", conditional::get_ifcase()),
            ("ifdim", conditional::get_ifdim()),
            ("iffalse", conditional::get_iffalse()),
            ("ifnum", conditional::get_ifnum()),
            ("ifodd", conditional::get_ifodd()),
            ("iftrue", conditional::get_iftrue()),
            ("ifx", conditional::get_ifx()),
            ("indent", material::get_indent()),
            //
            ("kern", material::get_kern()),
            //
            ("let", alias::get_let()),
            ("long", prefix::get_long()),
            //
            ("message", message::get_message()),
            ("multiply", math::get_multiply()),
            //
            ("noindent", material::get_noindent()),
            ("nullfont", font::get_nullfont()),
            //
            ("or", conditional::get_or()),
            ("outer", prefix::get_outer()),
            //
            ("par", material::get_par()),
            ("penalty", material::get_penalty()),
            //
            ("relax", alias::get_relax()),
            //
            ("skip", registers::get_skip()),
            ("skipdef", registers::get_skipdef()),
            ("special", material::get_special()),
            //
            ("the", the::get_the()),
            //
            ("vbox", material::get_vbox()),
            ("vfil", material::get_vfil()),
            ("vfill", material::get_vfill()),
            ("vrule", material::get_vrule()),
            ("vskip", material::get_vskip()),
            //
            ("xdef", def::get_xdef()),
        ]);
        m.extend(registers::parameters());
        m
    }

    /// Returns the documentation of the primitive with the given name, if there is one.
    pub fn doc(name: &str) -> Option<&'static str> {
        Self::all_initial_built_ins()
            .get(name)
            .and_then(command::BuiltIn::doc)
    }
}

implement_has_component![
    StdState,
    (conditional::Component, conditional),
    (font::Component, font),
    (prefix::Component, prefix),
];

/// Creates a VM with every primitive of the standard library.
pub fn new_vm(config: EngineConfig) -> vm::VM<StdState> {
    vm::VM::new_with_config(StdState::all_initial_built_ins(), config)
}

/// Typesets a document with the standard library.
///
/// Pages go to the VM's backend and diagnostics to its diagnostics sink.
pub fn run(vm: &mut vm::VM<StdState>, origin: &str, source: &str) -> fl::Result<()> {
    vm.push_source(origin, source);
    vm.run::<vm::DefaultHandlers>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_boxes::backend::Collect;
    use folio_boxes::node::Vertical;
    use folio_lang::diagnostics;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_primitive_is_documented() {
        for (name, built_in) in StdState::all_initial_built_ins() {
            assert!(built_in.doc().is_some(), "{name} has no documentation");
        }
    }

    #[test]
    fn doc_lookup() {
        assert_eq!(StdState::doc("par"), Some(material::PAR_DOC));
        assert_eq!(StdState::doc("notAPrimitive"), None);
    }

    #[test]
    fn parameters_are_included() {
        let m = StdState::all_initial_built_ins();
        assert!(m.contains_key("hsize"));
        assert!(m.contains_key("tolerance"));
        assert!(m.contains_key("endlinechar"));
    }

    #[test]
    fn typeset_document() {
        let pages = Rc::new(RefCell::new(Collect::default()));
        let mut vm = new_vm(Default::default());
        vm.set_backend(pages.clone());
        let reported = diagnostics::Collect::default();
        vm.set_diagnostics(reported.clone());
        run(
            &mut vm,
            "doc.tex",
            r"
            \def\greet#1{Hello, #1.}
            \count 1=2
            \ifnum\count 1>1 \greet{World}\else Goodbye\fi
            \par
            \hbox to 100pt{\hfil centered\hfil}
            \message{done}
            ",
        )
        .unwrap();
        let pages = &pages.borrow().pages;
        assert_eq!(pages.len(), 1);
        let boxes = pages[0]
            .list
            .iter()
            .filter(|node| matches!(node, Vertical::HList(_)))
            .count();
        assert_eq!(boxes, 2);
        let messages: Vec<String> = reported.take().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["done".to_string()]);
    }

    fn run_recursive(source: &str) -> (Vec<diagnostics::Diagnostic>, Vec<char>) {
        let pages = Rc::new(RefCell::new(Collect::default()));
        let mut vm = new_vm(Default::default());
        vm.set_backend(pages.clone());
        let reported = diagnostics::Collect::default();
        vm.set_diagnostics(reported.clone());
        run(&mut vm, "recursive.tex", source).unwrap();
        let mut chars = vec![];
        for page in &pages.borrow().pages {
            for node in &page.list {
                if let Vertical::HList(line) = node {
                    for node in &line.list {
                        if let folio_boxes::node::Horizontal::Char(c) = node {
                            chars.push(c.char);
                        }
                    }
                }
            }
        }
        (reported.take(), chars)
    }

    #[test]
    fn nested_expansion_in_ifnum_is_capped() {
        let (reported, chars) = run_recursive(r"\def\a{\ifnum\a}\a x");
        assert_eq!(reported.len(), 1);
        assert!(reported[0].message.contains("nested expansions"));
        assert_eq!(chars, vec!['x']);
    }

    #[test]
    fn nested_expansion_in_the_is_capped() {
        let (reported, chars) = run_recursive(r"\def\a{\the\a}\a x");
        assert_eq!(reported.len(), 1);
        assert!(reported[0].message.contains("nested expansions"));
        assert_eq!(chars, vec!['x']);
    }

    #[test]
    fn nesting_counter_is_restored_after_errors() {
        let (reported, chars) = run_recursive(r"\def\a{\ifnum\a}\a \a \ifnum 1<2 y\fi");
        assert_eq!(reported.len(), 2);
        assert_eq!(chars, vec!['y']);
    }
}
