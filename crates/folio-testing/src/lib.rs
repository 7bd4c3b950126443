/*!
Folio unit testing library

This is a crate for writing unit tests for primitives written against `folio-lang`.
It is used throughout the Folio standard library,
    so the unit tests there are good examples of what this crate can do.

## Basic setup

Each unit test built with this library works with a specific VM state type,
    provided by the unit test writer.
In addition to implementing the [`FolioState`] trait, this state must:

1. Include the [`TestingComponent`] type as a component.
    I.e., the state must implement the [`HasComponent<TestingComponent>`](folio_lang::traits::HasComponent) trait.

1. Configure the `recoverable_error_hook` method on the [`FolioState`]
    trait to invoke [`TestingComponent::recoverable_error_hook`].

1. Implement [`Default`].

If the primitives under test need nothing else from the state,
    the [`State`] type defined in this library can simply be used.

## Test types

### Expansion equality tests

Run using [`run_expansion_equality_test`].

These tests verify that two snippets produce the same characters.
For example, an expansion equality test can verify that
```tex
\def\HelloWorld{Hola Mundo}\HelloWorld - \HelloWorld
```
and
```tex
Hola Mundo - Hola Mundo
```
produce the same output.
In these tests the characters that reach the main loop are recorded instead of typeset,
    which makes it possible to compare the results of macro expansion directly.

The tests do _not_ verify that the state of the two VMs is the same.

### Failure tests

Run using [`run_failure_test`].

These tests verify that a snippet fails to run.

### Typesetting

The [`typeset`] function runs a snippet with characters typeset as usual and returns
    the pages shipped to the backend together with the diagnostics reported on the way.
It is used to test primitives that build boxes, glue and the like.

## The test suite macro

The preferred way to write a suite of unit tests is the [`test_suite`] macro.
See the macro's documentation for instructions on using it.
*/

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use folio_boxes::backend;
use folio_boxes::node::VList;
use folio_lang::diagnostics;
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::vm::implement_has_component;
use folio_lang::vm::VM;
use folio_lang::*;

/// Component that every unit testing state needs to have.
#[derive(Default)]
pub struct TestingComponent {
    allow_undefined_command: bool,
    recover_from_errors: bool,
    num_recovered_errors: RefCell<usize>,
    tokens: Vec<token::Token>,
}

impl TestingComponent {
    fn take_tokens(&mut self) -> Vec<token::Token> {
        std::mem::take(&mut self.tokens)
    }

    /// Recoverable error hook for the testing component.
    ///
    /// States used in unit testing must be configured to use this hook.
    pub fn recoverable_error_hook<S: HasComponent<Self>>(
        vm: &VM<S>,
        recoverable_error: Box<error::Error>,
    ) -> fl::Result<()> {
        let component = vm.state.component();
        if component.recover_from_errors {
            *component.num_recovered_errors.borrow_mut() += 1;
            Ok(())
        } else {
            Err(recoverable_error)
        }
    }
}

/// Simple state type for simple unit tests.
///
/// If the primitives under test don't need custom components,
///     it is easier to use this type than to define a custom one.
#[derive(Default)]
pub struct State {
    testing: TestingComponent,
}

impl FolioState for State {
    fn recoverable_error_hook(vm: &VM<Self>, recoverable_error: Box<error::Error>) -> fl::Result<()> {
        TestingComponent::recoverable_error_hook(vm, recoverable_error)
    }
}

implement_has_component![State, (TestingComponent, testing),];

/// Option passed to a test runner.
pub enum TestOption<'a, S> {
    /// The built-in commands are the result of invoking the provided static function.
    ///
    /// Overrides previous `BuiltInCommands` or `BuiltInCommandsDyn` options.
    BuiltInCommands(fn() -> HashMap<&'static str, command::BuiltIn<S>>),

    /// The built-in commands are the result of invoking the provided closure.
    ///
    /// Overrides previous `BuiltInCommands` or `BuiltInCommandsDyn` options.
    BuiltInCommandsDyn(Box<dyn Fn() -> HashMap<&'static str, command::BuiltIn<S>> + 'a>),

    /// The provided static function is invoked after the VM is created and before execution starts.
    ///
    /// Overrides previous `CustomVMInitialization` or `CustomVMInitializationDyn` options.
    CustomVMInitialization(fn(&mut VM<S>)),

    /// The provided closure is invoked after the VM is created and before execution starts.
    ///
    /// Overrides previous `CustomVMInitialization` or `CustomVMInitializationDyn` options.
    #[allow(clippy::type_complexity)]
    CustomVMInitializationDyn(Box<dyn Fn(&mut VM<S>) + 'a>),

    /// Whether undefined commands raise an error.
    ///
    /// Overrides previous `AllowUndefinedCommands` options.
    AllowUndefinedCommands(bool),

    /// Whether to recover from errors.
    ///
    /// Overrides previous `RecoverFromErrors` options.
    RecoverFromErrors(bool),
}

/// Run an expansion equality test.
///
/// The test passes if the two provided input strings produce the same tokens.
pub fn run_expansion_equality_test<S>(
    lhs: &str,
    rhs: &str,
    expect_recoverable_errors: bool,
    options: &[TestOption<S>],
) where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm_1 = initialize_vm(&options);
    let (output_1, num_recovered_errors) = execute_source_code(&mut vm_1, lhs, &options)
        .map_err(|err| {
            println!("{err}");
            err
        })
        .unwrap();

    let mut vm_2 = initialize_vm(&options);
    let (output_2, _) = execute_source_code(&mut vm_2, rhs, &options)
        .map_err(|err| {
            println!("{err}");
            err
        })
        .unwrap();
    compare_output(output_1, &vm_1, output_2, &vm_2);

    match (expect_recoverable_errors, num_recovered_errors) {
        (true, 0) => {
            panic!("expected recoverable errors but didn't have any");
        }
        (true, _) | (false, 0) => (),
        (false, i) => {
            panic!("did not expect recoverable errors but had {i} recoverable errors");
        }
    }
}

fn compare_output<S>(
    mut output_1: Vec<token::Token>,
    vm_1: &VM<S>,
    mut output_2: Vec<token::Token>,
    vm_2: &VM<S>,
) {
    let trim_space = |v: &mut Vec<token::Token>| {
        if let Some(last) = v.last() {
            if last.cat_code() == Some(token::CatCode::Space) {
                v.pop();
            }
        }
    };
    trim_space(&mut output_1);
    trim_space(&mut output_2);

    use token::CommandRef::ControlSequence;
    use token::Value::CommandRef;
    let equal = output_1.len() == output_2.len()
        && output_1
            .iter()
            .zip(output_2.iter())
            .all(|(token_1, token_2)| match (token_1.value(), token_2.value()) {
                (CommandRef(ControlSequence(cs_name_1)), CommandRef(ControlSequence(cs_name_2))) => {
                    vm_1.cs_name_interner().resolve(cs_name_1)
                        == vm_2.cs_name_interner().resolve(cs_name_2)
                }
                _ => token_1 == token_2,
            });

    if !equal {
        println!("Expansion output is different:");
        println!("------[lhs]------");
        println!("'{}'", token::write_tokens(&output_1, vm_1.cs_name_interner()));
        println!("------[rhs]------");
        println!("'{}'", token::write_tokens(&output_2, vm_2.cs_name_interner()));
        println!("-----------------");
        panic!("Expansion test failed");
    }
}

/// Run a failure test.
///
/// The test passes if execution of the provided input fails.
pub fn run_failure_test<S>(input: &str, options: &[TestOption<S>])
where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);

    let mut vm = initialize_vm(&options);
    let result = execute_source_code(&mut vm, input, &options);
    match result {
        Ok((output, _)) => {
            println!("Expansion succeeded:");
            println!("{}", token::write_tokens(&output, vm.cs_name_interner()));
            panic!("Expansion failure test did not pass: expansion successful");
        }
        Err(err) => println!("{err}"),
    }
}

/// Output of [typeset].
pub struct Typeset {
    /// Pages shipped to the backend, in order.
    pub pages: Vec<VList>,
    /// Every diagnostic reported during the run, errors and warnings included.
    pub diagnostics: Vec<diagnostics::Diagnostic>,
}

/// Runs the input with characters typeset as usual.
///
/// Recoverable errors are reported to the returned diagnostics and do not stop the run.
pub fn typeset<S>(input: &str, options: &[TestOption<S>]) -> fl::Result<Typeset>
where
    S: Default + HasComponent<TestingComponent>,
{
    let options = ResolvedOptions::new(options);
    let mut vm = initialize_vm(&options);
    vm.state.component_mut().recover_from_errors = true;
    let pages: Rc<RefCell<backend::Collect>> = Default::default();
    let collected = diagnostics::Collect::default();
    vm.set_backend(pages.clone());
    vm.set_diagnostics(collected.clone());
    vm.push_source("testing.tex", input);
    vm.run::<vm::DefaultHandlers>()?;
    let pages = std::mem::take(&mut pages.borrow_mut().pages);
    Ok(Typeset {
        pages,
        diagnostics: collected.take(),
    })
}

struct ResolvedOptions<'a, S> {
    built_in_commands: &'a dyn Fn() -> HashMap<&'static str, command::BuiltIn<S>>,
    custom_vm_initialization: &'a dyn Fn(&mut VM<S>),
    allow_undefined_commands: bool,
    recover_from_errors: bool,
}

impl<'a, S> ResolvedOptions<'a, S> {
    pub fn new(options: &'a [TestOption<S>]) -> Self {
        let mut resolved = Self {
            built_in_commands: &HashMap::new,
            custom_vm_initialization: &|_| {},
            allow_undefined_commands: false,
            recover_from_errors: false,
        };
        for option in options {
            match option {
                TestOption::BuiltInCommands(f) => resolved.built_in_commands = f,
                TestOption::BuiltInCommandsDyn(f) => resolved.built_in_commands = f,
                TestOption::CustomVMInitialization(f) => resolved.custom_vm_initialization = f,
                TestOption::CustomVMInitializationDyn(f) => resolved.custom_vm_initialization = f,
                TestOption::AllowUndefinedCommands(b) => resolved.allow_undefined_commands = *b,
                TestOption::RecoverFromErrors(b) => resolved.recover_from_errors = *b,
            }
        }
        resolved
    }
}

fn initialize_vm<S: Default>(options: &ResolvedOptions<S>) -> Box<VM<S>> {
    let mut vm = Box::new(VM::<S>::new((options.built_in_commands)()));
    vm.set_diagnostics(diagnostics::Log);
    (options.custom_vm_initialization)(&mut vm);
    vm
}

/// Execute source code in a VM with the provided options.
fn execute_source_code<S>(
    vm: &mut VM<S>,
    source: &str,
    options: &ResolvedOptions<S>,
) -> fl::Result<(Vec<token::Token>, usize)>
where
    S: Default + HasComponent<TestingComponent>,
{
    vm.push_source("testing.tex", source);
    {
        let component = vm.state.component_mut();
        component.allow_undefined_command = options.allow_undefined_commands;
        component.recover_from_errors = options.recover_from_errors;
        *component.num_recovered_errors.borrow_mut() = 0;
    }
    vm.run::<Handlers>()?;
    let component = vm.state.component_mut();
    let tokens = component.take_tokens();
    let num_recovered_errors = *component.num_recovered_errors.borrow();
    Ok((tokens, num_recovered_errors))
}

struct Handlers;

impl<S: HasComponent<TestingComponent>> vm::Handlers<S> for Handlers {
    fn character_handler(token: token::Token, input: &mut vm::ExecutionInput<S>) -> fl::Result<()> {
        input.state_mut().component_mut().tokens.push(token);
        Ok(())
    }

    fn undefined_command_handler(
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> fl::Result<()> {
        if input.state().component().allow_undefined_command {
            input.state_mut().component_mut().tokens.push(token);
            Ok(())
        } else {
            Err(vm::undefined_command_error(token, input.vm()).into())
        }
    }

    fn unexpanded_expansion_command(
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
    ) -> fl::Result<()> {
        input.state_mut().component_mut().tokens.push(token);
        Ok(())
    }
}

/// Macro to generate a suite of unit tests
///
/// The general use of this macro looks like this:
/// ```
/// # use folio_testing::*;
/// # use std::collections::HashMap;
/// # fn built_in_commands() -> HashMap<&'static str, folio_lang::command::BuiltIn<State>> {
/// #     HashMap::new()
/// # }
/// test_suite![
///     state(State),
///     options(TestOption::BuiltInCommands(built_in_commands)),
///     expansion_equality_tests(
///         (case_1, "lhs_1", "lhs_1"),
///         (case_2, "lhs_2", "lhs_2"),
///     ),
///     failure_tests(
///         (case_3, r"\undefined"),
///     ),
/// ];
/// ```
///
/// The arguments to the macro are:
///
/// - `state(State)`: the Rust type to use as the VM state in the tests.
///     This can be omitted, in which case it defaults to the type name `State` in the current scope.
///
/// - `options(option_1, option_2, ..., option_n)`: options to pass to the test runner,
///     values of type [TestOption].
///     If omitted, defaults to `options(TestOption::BuiltInCommands(built_in_commands))`,
///     where `built_in_commands` is a static function in the current scope that returns
///     the built-in primitives to initialize the VM with.
///
/// - `expansion_equality_tests(cases...)`: a list of expansion equality test cases.
///     Each case is of the form (case name, left hand side, right hand side)
///     and is fed into the [run_expansion_equality_test] test runner.
///
/// - `failure_tests(cases...)`: a list of failure test cases.
///     Each case is of the form (case name, input)
///     and is fed into the [run_failure_test] test runner.
///
/// - `recoverable_failure_tests(cases...)`: cases of the form (case name, input, output).
///     Each case generates two tests: with error recovery enabled the input must produce the
///     output and at least one recoverable error; with error recovery disabled the input must fail.
///
/// Only one `state()` argument may be provided, and if provided it must be in the first position.
/// Only one `options()` argument may be provided, and if provided it must be in the first position
///     or after the `state()` argument.
/// Zero or more of the other arguments may be provided, and in any order.
#[macro_export]
macro_rules! test_suite {
    ( state($state: ty), options $options: tt, expansion_equality_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let lhs = $lhs;
                let rhs = $rhs;
                let options = vec! $options;
                folio_testing::run_expansion_equality_test::<$state>(&lhs, &rhs, false, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, expansion_equality_tests $test_body: tt $(,)? ) => (
        compile_error!("Invalid test cases for expansion_equality_tests: must be a list of tuples (name, lhs, rhs)");
    );
    ( state($state: ty), options $options: tt, failure_tests ( $( ($name: ident, $input: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            #[test]
            fn $name() {
                let input = $input;
                let options = vec! $options;
                folio_testing::run_failure_test::<$state>(&input, &options);
            }
        )*
    );
    ( state($state: ty), options $options: tt, recoverable_failure_tests ( $( ($name: ident, $lhs: expr, $rhs: expr $(,)? ) ),* $(,)? ) $(,)? ) => (
        $(
            mod $name {
                use super::*;
                #[test]
                fn error_recovery_enabled() {
                    let lhs = $lhs;
                    let rhs = $rhs;
                    let mut options = vec! $options;
                    options.push(folio_testing::TestOption::RecoverFromErrors(true));
                    folio_testing::run_expansion_equality_test::<$state>(&lhs, &rhs, true, &options);
                }
                #[test]
                fn error_recovery_disabled() {
                    let input = $lhs;
                    let mut options = vec! $options;
                    options.push(folio_testing::TestOption::RecoverFromErrors(false));
                    folio_testing::run_failure_test::<$state>(&input, &options);
                }
            }
        )*
    );
    ( state($state: ty), options $options: tt, $test_kind: ident $test_cases: tt $(,)? ) => (
        compile_error!("Invalid keyword: test_suite! only accepts the following keywords: `state`, `options`, `expansion_equality_tests`, `failure_tests`, `recoverable_failure_tests`");
    );
    ( state($state: ty), options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        $(
            folio_testing::test_suite![state($state), options $options, $test_kind $test_cases,];
        )+
    );
    ( options $options: tt, $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        folio_testing::test_suite![state(State), options $options, $( $test_kind $test_cases, )+ ];
    );
    ( $( $test_kind: ident $test_cases: tt ),+ $(,)? ) => (
        folio_testing::test_suite![options (folio_testing::TestOption::BuiltInCommands(built_in_commands)), $( $test_kind $test_cases, )+ ];
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built_in_commands() -> HashMap<&'static str, command::BuiltIn<State>> {
        HashMap::new()
    }

    #[test]
    fn characters_are_recorded() {
        run_expansion_equality_test::<State>(
            "a b",
            "a b",
            false,
            &[TestOption::BuiltInCommands(built_in_commands)],
        );
    }

    #[test]
    #[should_panic(expected = "Expansion test failed")]
    fn different_output_fails() {
        run_expansion_equality_test::<State>(
            "a",
            "b",
            false,
            &[TestOption::BuiltInCommands(built_in_commands)],
        );
    }

    #[test]
    fn undefined_command_fails() {
        run_failure_test::<State>(r"\undefined", &[]);
    }

    #[test]
    fn allowed_undefined_command_is_recorded() {
        run_expansion_equality_test::<State>(
            r"\undefined",
            r"\undefined",
            false,
            &[TestOption::AllowUndefinedCommands(true)],
        );
    }

    #[test]
    fn typeset_ships_pages() {
        let output = typeset::<State>("Hello", &[]).unwrap();
        assert_eq!(output.pages.len(), 1);
        assert!(output.diagnostics.is_empty());
    }
}
