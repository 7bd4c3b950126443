use crate::token;
use crate::traits::*;
use crate::vm;
use std::collections::HashMap;
use std::fmt::Debug;

pub fn run_parse_success_test<S: FolioState + Default, T: Parsable<S> + Debug + PartialEq>(
    source: &str,
    want: T,
) {
    let mut vm = vm::VM::<S>::new(HashMap::new());
    vm.push_source("", source);
    let input = vm::ExecutionInput::new(&mut vm);
    let got = T::parse(input).unwrap();
    assert_eq!(got, want);
}

pub fn run_parse_failure_test<S: FolioState + Default, T: Parsable<S> + Debug>(
    source: &str,
    setup: fn(&mut vm::VM<S>),
) {
    let mut vm = vm::VM::<S>::new(HashMap::new());
    setup(&mut vm);
    vm.push_source("", source);
    let input = vm::ExecutionInput::new(&mut vm);
    let result = T::parse(input);
    if let Ok(value) = result {
        panic![
            "Successfully parsed a value '{value:?}' of type '{}' from invalid input '{source}'",
            std::any::type_name::<T>()
        ];
    }
}

/// Parses a value and returns what is left of the input, as it would be printed.
pub fn run_parse_consumption_test<S: FolioState + Default, T: Parsable<S>>(source: &str) -> String {
    let mut vm = vm::VM::<S>::new(HashMap::new());
    vm.push_source("", source);
    let input = vm::ExecutionInput::new(&mut vm);
    if let Err(err) = T::parse(input) {
        panic!["failed to parse '{source}': {err}"];
    }
    let mut rest = vec![];
    while let Some(token) = input.unexpanded().next().unwrap() {
        rest.push(token);
    }
    token::write_tokens(&rest, input.vm().cs_name_interner())
}

pub fn no_setup<S>(_: &mut vm::VM<S>) {}

macro_rules! parse_success_tests {
    ($( ($name: ident, $input: expr, $expected: expr $(,)? ) ),+ $(,)? ) => {
        $(
        #[test]
        fn $name() {
            let source = $input;
            let want = $expected;
            run_parse_success_test::<(), _>(&source, want);
        }
        )+
    };
}

pub(crate) use parse_success_tests;

macro_rules! parse_failure_tests {
    ( $parsable_type: ty, $( ($name: ident, $input: expr), )+) => {
        parse_failure_tests![$parsable_type, no_setup, $( ($name, $input), )+];
    };
    ( $parsable_type: ty, $setup: expr, $( ($name: ident, $input: expr), )+) => {
        $(
        #[test]
        fn $name() {
            let input = $input;
            run_parse_failure_test::<(), $parsable_type>(&input, $setup);
        }
        )+
    };
}

pub(crate) use parse_failure_tests;

macro_rules! parse_consumption_tests {
    ( $parsable_type: ty, $( ($name: ident, $input: expr, $rest: expr), )+) => {
        $(
        #[test]
        fn $name() {
            let rest = run_parse_consumption_test::<(), $parsable_type>($input);
            assert_eq!(rest, $rest);
        }
        )+
    };
}

pub(crate) use parse_consumption_tests;
