//! The Folio virtual machine (VM).
//!
//! This module contains the definition of the runtime VM,
//!     the input streams that wrap the VM,
//!     the mode stack of lists being built,
//!     and the main loop that runs a document.

use crate::command;
use crate::command::BuiltIn;
use crate::command::Command;
use crate::config::EngineConfig;
use crate::diagnostics;
use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::error;
use crate::prelude as fl;
use crate::store::{GroupKind, Location, Store, StoreValue};
use crate::token;
use crate::token::lexer;
use crate::token::trace;
use crate::token::CsNameInterner;
use crate::token::Token;
use crate::token::Value;
use folio_boxes::backend::Backend;
use folio_boxes::pagebuilder::{PageBuilder, PageParams};
use folio_core::{FixedMetrics, FontMetrics};
use folio_stdext::collections::groupingmap;
use std::collections::HashMap;

mod mode;
mod streams;
pub use mode::*;
pub use streams::*;

/// Implementations of this trait determine how the VM handles tokens that are not
///     execution commands.
///
/// The main loop of the VM reads the next expanded token and performs
///     some action based on the token.
/// Many cases are handled by the VM itself:
///
/// | token type | example | action |
/// | -- | -- | -- |
/// | execution command | `\def` | run the command |
/// | variable command | `\count` | assign a value to the corresponding variable |
/// | font command | `\tenrm` after `\font\tenrm=cmr10` | select the font |
/// | token alias | `\a` after `\let\a=a` | act as the aliased character |
/// | begin group character | `{` | begin a group
/// | end group character | `}` | end the current group, finishing any box it belongs to
/// | alignment tab | `&` inside `\halign` | finish the current cell
///
/// The remaining cases are handled by the handlers:
///
/// | token type | example | handler | default |
/// | --- | --- | --- | --- |
/// | character token | `b` | [character_handler](Handlers::character_handler) | typeset the character
/// | undefined command | `\b` where `\b` was never defined | [undefined_command_handler](Handlers::undefined_command_handler) | return an undefined control sequence error
/// | unexpanded expansion command | `\the` in `\noexpand\the` | [unexpanded_expansion_command](Handlers::unexpanded_expansion_command) | do nothing
///
/// Each of the handlers has the same function signature as an execution command.
pub trait Handlers<S: FolioState> {
    /// Handler to invoke for character tokens.
    ///
    /// This is not invoked for begin group and end group tokens,
    ///     or for alignment tabs inside an alignment.
    fn character_handler(token: Token, input: &mut ExecutionInput<S>) -> fl::Result<()> {
        input.typeset_character(token);
        Ok(())
    }

    /// Handler to invoke for a control sequence or active character for which no command is defined.
    fn undefined_command_handler(token: Token, input: &mut ExecutionInput<S>) -> fl::Result<()> {
        Err(undefined_command_error(token, input.vm()).into())
    }

    /// Handler to invoke for expansion commands that were not expanded.
    fn unexpanded_expansion_command(token: Token, input: &mut ExecutionInput<S>) -> fl::Result<()> {
        _ = (token, input);
        Ok(())
    }
}

/// Handlers that typeset characters and reject undefined commands.
pub struct DefaultHandlers;

impl<S: FolioState> Handlers<S> for DefaultHandlers {}

/// Builds the error for a control sequence or active character with no meaning.
///
/// The error suggests defined names that are spelled similarly.
pub fn undefined_command_error<S>(token: Token, vm: &VM<S>) -> error::UndefinedCommandError {
    let interner = vm.cs_name_interner();
    let dictionary: Vec<&str> = vm
        .commands_map
        .control_sequences()
        .filter_map(|name| interner.resolve(name))
        .collect();
    error::UndefinedCommandError::new(token, vm.token_to_string(token), dictionary)
}

/// The Folio virtual machine.
pub struct VM<S> {
    /// The custom state.
    pub state: S,

    /// The commands map.
    pub commands_map: command::Map<S>,

    /// The grouped state store: registers, parameters, category codes and the current font.
    pub store: Store,

    /// Font metrics used to build character nodes.
    ///
    /// Defaults to [FixedMetrics].
    pub fonts: Box<dyn FontMetrics>,

    /// Receiver of finished pages.
    ///
    /// Defaults to an in-memory [Collect](folio_boxes::backend::Collect) backend.
    pub backend: Box<dyn Backend>,

    /// Receiver of errors, warnings and messages.
    ///
    /// Defaults to [diagnostics::Stderr].
    pub diagnostics: Box<dyn Diagnostics>,

    /// The lists being built.
    pub modes: ModeStack,

    pub page_builder: PageBuilder,

    /// Number of recoverable errors reported so far.
    num_errors: usize,

    internal: Internal,
}

/// Implementations of this trait may be used as the state in a Folio VM.
///
/// The trait has no required methods, so it can be implemented trivially:
/// ```
/// # use folio_lang::traits::FolioState;
/// struct SomeNewType;
///
/// impl FolioState for SomeNewType {}
/// ```
///
/// Methods of the trait are invoked at certain points when the VM is running,
///     and in general offer a way of customizing the behavior of the VM.
pub trait FolioState: Sized {
    /// Hook that is invoked after a recoverable error has been reported.
    ///
    /// Returning an error stops the run with that error.
    /// The default implementation continues.
    fn recoverable_error_hook(vm: &VM<Self>, recoverable_error: Box<error::Error>) -> fl::Result<()> {
        _ = (vm, recoverable_error);
        Ok(())
    }

    /// Hook that determines the scope of a variable assignment.
    ///
    /// This hook is designed to support the `\global` prefix.
    fn variable_assignment_scope_hook(state: &mut Self) -> groupingmap::Scope {
        _ = state;
        groupingmap::Scope::Local
    }
}

impl FolioState for () {}

impl<S: Default> VM<S> {
    /// Creates a new VM with the default configuration.
    pub fn new(initial_built_ins: HashMap<&str, BuiltIn<S>>) -> VM<S> {
        VM::new_with_config(initial_built_ins, Default::default())
    }

    /// Creates a new VM.
    pub fn new_with_config(initial_built_ins: HashMap<&str, BuiltIn<S>>, config: EngineConfig) -> VM<S> {
        let mut internal = Internal::default();
        let initial_built_ins = initial_built_ins
            .into_iter()
            .map(|(key, value)| (internal.cs_name_interner.get_or_intern(key), value))
            .collect();
        let par_name = internal.cs_name_interner.get_or_intern("par");
        internal.par_name = Some(par_name);
        let store = Store::new(config);
        let page_builder = PageBuilder::new(page_params(&store));
        VM {
            state: Default::default(),
            commands_map: command::Map::new(initial_built_ins),
            store,
            fonts: Box::<FixedMetrics>::default(),
            backend: Box::<folio_boxes::backend::Collect>::default(),
            diagnostics: Box::new(diagnostics::Stderr),
            modes: ModeStack::new(),
            page_builder,
            num_errors: 0,
            internal,
        }
    }
}

impl<S> VM<S> {
    pub fn set_fonts<F: FontMetrics + 'static>(&mut self, fonts: F) {
        self.fonts = Box::new(fonts);
    }

    pub fn set_backend<B: Backend + 'static>(&mut self, backend: B) {
        self.backend = Box::new(backend);
    }

    pub fn set_diagnostics<D: Diagnostics + 'static>(&mut self, diagnostics: D) {
        self.diagnostics = Box::new(diagnostics);
    }

    /// Adds new source code to the VM.
    ///
    /// Sources form a stack: the pushed source is read to its end before the rest of
    ///     the current source.
    pub fn push_source<O: Into<String>, C: Into<String>>(&mut self, origin: O, content: C) {
        self.internal.push_source(origin.into(), content.into())
    }

    /// Clears all source code from the VM.
    pub fn clear_sources(&mut self) {
        self.internal.clear_sources()
    }

    /// Returns a reference to the control sequence name string interner.
    ///
    /// This interner can be used to resolve [CsName](token::CsName) types into regular strings.
    #[inline]
    pub fn cs_name_interner(&self) -> &CsNameInterner {
        &self.internal.cs_name_interner
    }

    /// Whether the token is the control sequence `\par`.
    ///
    /// Macro arguments may not contain this token.
    #[inline]
    pub fn is_par(&self, token: Token) -> bool {
        match (token.value(), self.internal.par_name) {
            (Value::CommandRef(token::CommandRef::ControlSequence(name)), Some(par)) => name == par,
            _ => false,
        }
    }

    /// Renders a single token as it would be written in source.
    pub fn token_to_string(&self, token: Token) -> String {
        token::write_tokens(&[token], self.cs_name_interner())
    }

    /// Number of recoverable errors reported so far.
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    pub fn trace(&self, location: trace::SourceLocation) -> Option<trace::SourceCodeTrace> {
        self.internal.tracer.trace(location)
    }

    /// Returns a trace pointing at the end of the source currently being read.
    pub fn trace_end_of_input(&self) -> Option<trace::SourceCodeTrace> {
        self.internal
            .tracer
            .trace_end(self.internal.current_source.id)
    }

    /// Builds the diagnostic that reports an error to the user.
    pub fn error_diagnostic(&self, err: &error::Error) -> Diagnostic {
        let trace = match err.location() {
            Some(location) => self.trace(location),
            None => match err.kind() {
                error::Kind::EndOfInput => self.trace_end_of_input(),
                error::Kind::Token(_) | error::Kind::FailedPrecondition => None,
            },
        };
        let mut diagnostic = Diagnostic::new(Severity::Error, err.title()).with_trace(trace);
        diagnostic.annotation = Some(err.source_annotation());
        for note in err.notes() {
            diagnostic = diagnostic.with_note(note);
        }
        diagnostic
    }

    fn begin_group(&mut self, kind: GroupKind) {
        self.store.enter_group(kind);
        self.commands_map.begin_group();
    }

    /// Leaves the innermost group of the store and the commands map together.
    fn leave_group(&mut self, token: Token) -> fl::Result<GroupKind> {
        let kind = self
            .store
            .leave_group()
            .map_err(|_| UnbalancedGroupError::Extra { token })?;
        self.commands_map
            .end_group()
            .map_err(|_| UnbalancedGroupError::Extra { token })?;
        Ok(kind)
    }
}

impl<S: FolioState> VM<S> {
    /// Runs the VM to the end of its input.
    ///
    /// It is assumed that the VM has been preloaded with source code using the
    ///     [VM::push_source] method.
    ///
    /// Recoverable errors are reported to the diagnostics sink and the VM continues
    ///     with the next token.
    /// The run fails if the number of errors exceeds the configured limit,
    ///     or if groups are still open when the input ends.
    /// At the end of the input the open paragraph is ended, the remaining material is
    ///     shipped as the last page and the backend is finished.
    pub fn run<H: Handlers<S>>(&mut self) -> fl::Result<()> {
        loop {
            match self.run_step::<H>() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => self.handle_error(err)?,
            }
        }
        self.finish()
    }

    /// Reads and executes one token; returns false at the end of input.
    fn run_step<H: Handlers<S>>(&mut self) -> fl::Result<bool> {
        let input = ExecutionInput::new(self);
        let token = match input.next()? {
            None => return Ok(false),
            Some(token) => token,
        };
        match token.value() {
            Value::CommandRef(command_ref) => match input.commands_map().get_command(&command_ref) {
                Some(Command::Execution(cmd, _)) => {
                    let cmd = *cmd;
                    cmd(token, input)?;
                }
                Some(Command::Variable(variable)) => {
                    let variable = *variable;
                    let scope = S::variable_assignment_scope_hook(input.state_mut());
                    variable.assign(token, input, scope)?;
                }
                Some(Command::Font(font)) => {
                    let font = *font;
                    let scope = S::variable_assignment_scope_hook(input.state_mut());
                    input
                        .store_mut()
                        .assign(Location::CurrentFont, StoreValue::Font(font), scope);
                }
                Some(Command::CharacterTokenAlias(value)) => {
                    let token = Token::new_from_value(*value, token.location());
                    self.dispatch_character::<H>(token)?;
                }
                Some(Command::Expansion(_, _)) | Some(Command::Macro(_)) => {
                    H::unexpanded_expansion_command(token, input)?
                }
                None => H::undefined_command_handler(token, input)?,
            },
            _ => self.dispatch_character::<H>(token)?,
        };
        Ok(true)
    }

    fn dispatch_character<H: Handlers<S>>(&mut self, token: Token) -> fl::Result<()> {
        match token.value() {
            Value::BeginGroup(_) => {
                self.begin_group(GroupKind::Simple);
                Ok(())
            }
            Value::EndGroup(_) => self.end_group(token),
            Value::AlignmentTab(_) if self.store.current_group() == Some(GroupKind::AlignCell) => {
                self.finish_alignment_cell(token)
            }
            _ => H::character_handler(token, ExecutionInput::new(self)),
        }
    }

    /// Reports a recoverable error, or returns the error if the run must stop.
    fn handle_error(&mut self, err: Box<error::Error>) -> fl::Result<()> {
        if err.is_fatal() {
            return Err(err);
        }
        let diagnostic = self.error_diagnostic(&err);
        log::debug!("recoverable error: {}", err.title());
        self.diagnostics.report(diagnostic);
        self.num_errors += 1;
        S::recoverable_error_hook(self, err)?;
        let limit = self.store.config().error_limit;
        if self.num_errors > limit {
            return Err(error::Error::fatal(TooManyErrorsError { limit }));
        }
        Ok(())
    }

    fn finish(&mut self) -> fl::Result<()> {
        let open = self.store.depth();
        if open > 0 {
            return Err(error::Error::fatal(UnbalancedGroupError::OpenAtEnd {
                count: open,
            }));
        }
        self.end_paragraph()?;
        self.finish_pages()
    }

    /// Ends the innermost group, which must have been opened by `\begingroup`.
    fn end_semi_simple_group(&mut self, token: Token) -> fl::Result<()> {
        match self.store.current_group() {
            None => Err(UnbalancedGroupError::Extra { token }.into()),
            Some(GroupKind::SemiSimple) => self.leave_group(token).map(|_| ()),
            Some(open) => Err(UnbalancedGroupError::Mismatched { token, open }.into()),
        }
    }

    /// Ends the innermost group at a `}` token, finishing the box it belongs to.
    fn end_group(&mut self, token: Token) -> fl::Result<()> {
        match self.store.current_group() {
            None => Err(UnbalancedGroupError::Extra { token }.into()),
            Some(GroupKind::SemiSimple) => Err(UnbalancedGroupError::Mismatched {
                token,
                open: GroupKind::SemiSimple,
            }
            .into()),
            Some(GroupKind::AlignCell) | Some(GroupKind::Align) => self.finish_alignment(token),
            Some(kind) => {
                if let GroupKind::VBox(_) = kind {
                    // A paragraph inside the box is broken with the box's parameters.
                    self.end_paragraph()?;
                }
                let kind = self.leave_group(token)?;
                self.package_group(token, kind)
            }
        }
    }
}

/// Page parameters taken from the current values in the store.
fn page_params(store: &Store) -> PageParams {
    use crate::store::{DimenParam, GlueParam};
    PageParams {
        goals: folio_boxes::pagebuilder::PageGoals::uniform(store.dimen_param(DimenParam::VSize)),
        max_depth: store.dimen_param(DimenParam::MaxDepth),
        top_skip: store.glue_param(GlueParam::TopSkip),
    }
}

/// Error returned when groups do not nest properly.
#[derive(Debug)]
pub enum UnbalancedGroupError {
    /// A group was ended but there is no group to end.
    Extra { token: Token },
    /// A group was ended by the wrong kind of token, like `}` closing `\begingroup`.
    Mismatched { token: Token, open: GroupKind },
    /// The input ended with groups still open.
    OpenAtEnd { count: usize },
}

impl error::TexError for UnbalancedGroupError {
    fn kind(&self) -> error::Kind {
        match self {
            UnbalancedGroupError::Extra { token } | UnbalancedGroupError::Mismatched { token, .. } => {
                error::Kind::Token(*token)
            }
            UnbalancedGroupError::OpenAtEnd { .. } => error::Kind::EndOfInput,
        }
    }

    fn title(&self) -> String {
        match self {
            UnbalancedGroupError::Extra { token } => match token.value() {
                Value::EndGroup(c) => format!("extra `{c}`: there is no group to end"),
                _ => "there is no group to end".into(),
            },
            UnbalancedGroupError::Mismatched { open, .. } => {
                format!("this token cannot end the current group, which is {}", describe_group(*open))
            }
            UnbalancedGroupError::OpenAtEnd { count: 1 } => {
                "input ended while 1 group was still open".into()
            }
            UnbalancedGroupError::OpenAtEnd { count } => {
                format!("input ended while {count} groups were still open")
            }
        }
    }

    fn notes(&self) -> Vec<String> {
        match self {
            UnbalancedGroupError::Mismatched {
                open: GroupKind::SemiSimple,
                ..
            } => vec![r"a group started with \begingroup must be ended with \endgroup".into()],
            UnbalancedGroupError::Mismatched { .. } => {
                vec![r"\endgroup can only end a group started with \begingroup".into()]
            }
            UnbalancedGroupError::Extra { .. } | UnbalancedGroupError::OpenAtEnd { .. } => vec![],
        }
    }
}

fn describe_group(kind: GroupKind) -> &'static str {
    match kind {
        GroupKind::Simple => "a simple group",
        GroupKind::SemiSimple => r"a \begingroup group",
        GroupKind::HBox(_) => r"an \hbox",
        GroupKind::VBox(_) => r"a \vbox",
        GroupKind::Discretionary(_) => r"a \discretionary",
        GroupKind::Align | GroupKind::AlignCell => r"an \halign",
    }
}

/// Error returned when the number of recoverable errors exceeds the configured limit.
#[derive(Debug)]
pub struct TooManyErrorsError {
    pub limit: usize,
}

impl error::TexError for TooManyErrorsError {
    fn kind(&self) -> error::Kind {
        error::Kind::FailedPrecondition
    }

    fn title(&self) -> String {
        format!("too many errors (the limit is {})", self.limit)
    }

    fn notes(&self) -> Vec<String> {
        vec!["the limit can be raised with the error_limit configuration field".into()]
    }
}

/// Error returned when the backend fails to receive a page.
#[derive(Debug)]
pub struct BackendFailedError {
    pub message: String,
}

impl error::TexError for BackendFailedError {
    fn kind(&self) -> error::Kind {
        error::Kind::FailedPrecondition
    }

    fn title(&self) -> String {
        format!("the backend failed: {}", self.message)
    }
}

/// Parts of the VM that are private.
#[derive(Default)]
struct Internal {
    // The sources form a stack. The top element is stored directly on the VM.
    current_source: Source,
    sources: Vec<Source>,

    cs_name_interner: CsNameInterner,

    tracer: trace::Tracer,

    token_buffers: std::collections::BinaryHeap<TokenBuffer>,

    par_name: Option<token::CsName>,

    // Number of expansions currently running on the call stack.
    expansion_nesting: usize,
}

impl Internal {
    fn push_source(&mut self, origin: String, content: String) {
        let id = self.tracer.register(origin, content.as_str());
        let old_source = std::mem::replace(&mut self.current_source, Source::new(id, content));
        // The empty source a new VM starts with is not kept.
        if old_source.id != trace::SourceLocation::UNKNOWN.source
            || !old_source.expansions.is_empty()
        {
            self.sources.push(old_source);
        }
    }

    fn clear_sources(&mut self) {
        self.current_source = Default::default();
        self.sources.clear();
    }

    #[inline]
    fn push_expansion(&mut self, expansion: &[Token]) {
        self.current_source
            .expansions
            .extend(expansion.iter().rev());
    }

    #[inline]
    fn expansions(&self) -> &Vec<Token> {
        &self.current_source.expansions
    }

    #[inline]
    fn expansions_mut(&mut self) -> &mut Vec<Token> {
        &mut self.current_source.expansions
    }

    fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.token_buffers.pop().unwrap_or_default().0
    }

    fn return_token_buffer(&mut self, mut token_buffer: Vec<Token>) {
        token_buffer.clear();
        self.token_buffers.push(TokenBuffer(token_buffer))
    }

    /// Replaces the exhausted current source with the one below it.
    ///
    /// The last source is never popped, so end of input errors can point at its end.
    fn pop_source(&mut self) -> bool {
        match self.sources.pop() {
            None => false,
            Some(source) => {
                self.current_source = source;
                true
            }
        }
    }
}

struct Source {
    id: trace::SourceId,
    expansions: Vec<Token>,
    root: lexer::Lexer,
}

impl Source {
    fn new(id: trace::SourceId, content: String) -> Source {
        Source {
            id,
            expansions: Vec::with_capacity(32),
            root: lexer::Lexer::new(id, content),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::new(trace::SourceLocation::UNKNOWN.source, String::new())
    }
}

#[derive(Default)]
struct TokenBuffer(Vec<Token>);

impl PartialEq for TokenBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.0.capacity() == other.0.capacity()
    }
}

impl Eq for TokenBuffer {}

impl PartialOrd for TokenBuffer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TokenBuffer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.capacity().cmp(&other.0.capacity())
    }
}

/// Helper trait for implementing the component pattern.
///
/// Some primitives need state of their own: `\font` keeps a registry of loaded fonts,
///     `\global` remembers that the next assignment is global.
/// In the component pattern this state is isolated in a _component_, a concrete Rust type
///     defined in the same module as the primitives that use it and private to that module.
/// The primitives are generic over any VM state that contains the component,
///     which they express with a `HasComponent` bound.
///
/// A concrete engine then composes many such primitives by including all of their
///     components in its state type, without the components knowing about each other.
///
/// The easiest way to include a component is to make it a direct field of the state;
///     the [implement_has_component] macro then implements the trait.
pub trait HasComponent<C>: FolioState {
    /// Return an immutable reference to the component.
    fn component(&self) -> &C;

    /// Return a mutable reference to the component.
    fn component_mut(&mut self) -> &mut C;
}

/// This macro is for implementing the [HasComponent] trait in the special (but common)
///     case when the state is a struct and the component is a direct field of the struct.
///
/// ## Examples
///
/// ```
/// # mod mylibrary1{
/// #   pub struct Component;
/// # }
/// # mod mylibrary2{
/// #   pub struct Component;
/// # }
/// # use folio_lang::vm::implement_has_component;
/// # use folio_lang::traits::*;
/// #
/// struct MyState {
///     component_1: mylibrary1::Component,
///     component_2: mylibrary2::Component,
/// }
///
/// impl FolioState for MyState {}
///
/// implement_has_component![
///     MyState,
///     (mylibrary1::Component, component_1),
///     (mylibrary2::Component, component_2),
/// ];
/// ```
#[macro_export]
macro_rules! implement_has_component {
    ( $type: path, $component: path, $field: ident ) => {
        implement_has_component![$type, ($component, $field),];
    };
    ( $type: path, $(($component: path, $field: ident),)+) => {
        $(
            impl ::folio_lang::vm::HasComponent<$component> for $type {
                #[inline]
                fn component(&self) -> &$component {
                    &self.$field
                }
                #[inline]
                fn component_mut(&mut self) -> &mut $component {
                    &mut self.$field
                }
            }
        )*
    };
}

pub use implement_has_component;
