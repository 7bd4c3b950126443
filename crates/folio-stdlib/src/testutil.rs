//! State used by the unit tests of this crate

use crate::conditional;
use crate::font;
use crate::prefix;
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::vm::implement_has_component;
use folio_lang::*;
use folio_stdext::collections::groupingmap::Scope;
use folio_testing::TestingComponent;

#[derive(Default)]
pub struct State {
    conditional: conditional::Component,
    font: font::Component,
    prefix: prefix::Component,
    testing: TestingComponent,
}

impl FolioState for State {
    fn recoverable_error_hook(
        vm: &vm::VM<Self>,
        recoverable_error: Box<error::Error>,
    ) -> fl::Result<()> {
        TestingComponent::recoverable_error_hook(vm, recoverable_error)
    }

    fn variable_assignment_scope_hook(state: &mut Self) -> Scope {
        prefix::variable_assignment_scope_hook(state)
    }
}

implement_has_component![
    State,
    (conditional::Component, conditional),
    (font::Component, font),
    (prefix::Component, prefix),
    (TestingComponent, testing),
];
