use super::FolioState;
use crate::command;
use crate::diagnostics::Diagnostic;
use crate::error;
use crate::prelude as fl;
use crate::store::{GroupKind, Store};
use crate::token::trace;
use crate::token::Token;
use crate::vm;
use folio_core::FontMetrics;

/// A stream of tokens generated on demand.
///
/// This trait describes a general stream of tokens where the front of the stream may
///     be retrieved using [TokenStream::next] or peeked at using [TokenStream::peek].
/// In practice every stream in Folio is an [ExecutionInput], an [ExpansionInput],
///     an [ExpandedStream] or an [UnexpandedStream].
/// This trait exists to allow a generic function to accept any of these types.
///
/// Streams are lazy because the tokenization rules can change while reading.
/// With the usual categories,
/// ```tex
/// \catcode`\@=11 \do@
/// ```
/// is the assignment followed by the control sequence `do@`, not the control
///     sequence `do` followed by the character `@`:
///     the `@` is only scanned after the assignment has run.
pub trait TokenStream {
    /// The type of the custom state in the VM.
    type S;

    /// Gets the next token in the stream.
    ///
    /// As with iterators, a result of `Ok(None)` indicates that the stream is exhausted.
    fn next(&mut self) -> fl::Result<Option<Token>>;

    /// Peeks at the next token in the stream without removing it.
    ///
    /// Peeking an expanded stream may expand macros at the front of the input;
    ///     the expansion is not undone.
    fn peek(&mut self) -> fl::Result<Option<Token>> {
        let token = self.next()?;
        if let Some(token) = token {
            self.back(token);
        }
        Ok(token)
    }

    /// Consumes the next token in the stream without returning it.
    fn consume(&mut self) -> fl::Result<()> {
        self.next().map(|_| ())
    }

    /// Puts a token back at the front of the stream.
    ///
    /// The token is read again, unchanged, by the next call to [TokenStream::next].
    fn back(&mut self, token: Token);

    /// Gets the next token, or returns an end of input error if there is none.
    fn next_or_err<E: error::EndOfInputError>(&mut self, err: E) -> fl::Result<Token> {
        match self.next()? {
            None => Err(error::EofError::new(err).into()),
            Some(token) => Ok(token),
        }
    }

    /// Returns a reference to the VM.
    fn vm(&self) -> &vm::VM<Self::S>;

    /// Returns a reference to the commands map.
    #[inline]
    fn commands_map(&self) -> &command::Map<Self::S> {
        &self.vm().commands_map
    }

    /// Returns a reference to the custom state.
    #[inline]
    fn state(&self) -> &Self::S {
        &self.vm().state
    }

    /// Returns a reference to the state store.
    #[inline]
    fn store(&self) -> &Store {
        &self.vm().store
    }

    fn trace(&self, token: Token) -> Option<trace::SourceCodeTrace> {
        self.vm().trace(token.location())
    }
}

/// A [TokenStream] that performs expansion.
///
/// The unexpanded tokens are retrieved from the unexpanded stream returned by the
///     [unexpanded](ExpandedStream::unexpanded) method.
#[repr(transparent)]
pub struct ExpandedStream<S>(UnexpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpandedStream<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        self
    }
}

impl<S> ExpandedStream<S> {
    /// Creates a mutable reference to this type from the [VM](vm::VM) type.
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExpandedStream<S> {
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExpandedStream<S>) }
    }

    /// Returns the underlying unexpanded stream.
    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0
    }

    /// Returns a vector that can be used as a token buffer, potentially without allocating memory.
    ///
    /// When finished with the buffer, return it using [return_token_buffer](ExpandedStream::return_token_buffer).
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0 .0.internal.checkout_token_buffer()
    }

    /// Returns a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0 .0.internal.return_token_buffer(token_buffer)
    }

    /// Returns a mutable reference to the expanded tokens stack for the current input source.
    ///
    /// The tokens are a stack, so the next token is the last token in the vector.
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0 .0.internal.expansions_mut()
    }
}

impl<S: FolioState> ExpandedStream<S> {
    /// Expands the next token in the input, if it is expandable.
    ///
    /// Only one expansion is performed.
    /// If the result of the expansion starts with an expandable token, that token is not expanded.
    /// Returns false if the next token was not expandable.
    pub fn expand_once(&mut self) -> fl::Result<bool> {
        stream::expand_once(&mut self.0 .0)
    }
}

impl<S: FolioState> TokenStream for ExpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> fl::Result<Option<Token>> {
        stream::next_expanded(&mut self.0 .0)
    }

    #[inline]
    fn back(&mut self, token: Token) {
        self.0 .0.internal.expansions_mut().push(token);
    }

    #[inline]
    fn vm(&self) -> &vm::VM<S> {
        &self.0 .0
    }
}

/// Stream that returns input tokens without performing expansion.
///
/// The unexpanded stream is used when reading tokens without performing expansion;
///     e.g., when reading the replacement text of a macro defined using `\def`.
#[repr(transparent)]
pub struct UnexpandedStream<S>(vm::VM<S>);

impl<S: FolioState> TokenStream for UnexpandedStream<S> {
    type S = S;

    #[inline]
    fn next(&mut self) -> fl::Result<Option<Token>> {
        stream::next_unexpanded(&mut self.0)
    }

    #[inline]
    fn back(&mut self, token: Token) {
        self.0.internal.expansions_mut().push(token);
    }

    #[inline]
    fn vm(&self) -> &vm::VM<S> {
        &self.0
    }
}

/// Input type for expansion primitives.
///
/// This type provides:
///
/// - Access to the input stream, with or without expansion.
///     Its implementation of [TokenStream] returns expanded tokens;
///     to read the input without expansion use the [unexpanded](ExpansionInput::unexpanded) method.
///
/// - Read only access to the VM, except for the custom state.
///     Expansion primitives keep their own bookkeeping there;
///     the conditional stack of `\if...\fi` is one example.
///
/// - The ability to push tokens or source code to the front of the input.
///
/// It is also the type the parsing code converts other inputs to, because it has only
///     read access to the VM and casting to it does not escalate privileges.
#[repr(transparent)]
pub struct ExpansionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExpansionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: FolioState> TokenStream for ExpansionInput<S> {
    type S = S;

    fn next(&mut self) -> fl::Result<Option<Token>> {
        self.0.next()
    }

    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    fn vm(&self) -> &vm::VM<Self::S> {
        self.0.vm()
    }
}

impl<S> ExpansionInput<S> {
    /// Creates a mutable reference to this type from the [VM](vm::VM) type.
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExpansionInput<S> {
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExpansionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    /// Returns a mutable reference to the custom state.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.0 .0 .0.state
    }

    /// Pushes tokens to the front of the input stream.
    ///
    /// The first token in the slice will be the next token read.
    #[inline]
    pub fn push_expansion(&mut self, expansion: &[Token]) {
        self.0 .0 .0.internal.push_expansion(expansion)
    }

    /// Returns a reference to the expanded tokens stack for the current input source.
    ///
    /// The tokens are a stack, so the next token is the last token in the vector.
    #[inline]
    pub fn expansions(&self) -> &Vec<Token> {
        self.0 .0 .0.internal.expansions()
    }

    /// Returns a mutable reference to the expanded tokens stack for the current input source.
    ///
    /// Pushing to this stack directly avoids the allocation of [ExpansionInput::push_expansion].
    #[inline]
    pub fn expansions_mut(&mut self) -> &mut Vec<Token> {
        self.0 .0 .0.internal.expansions_mut()
    }

    /// Returns a vector that can be used as a token buffer, potentially without allocating memory.
    ///
    /// The returned vector is empty, but generally has capacity left from previous uses.
    /// Macro calls can be nested, so each call checks out its own buffer instead of
    ///     sharing one; when finished, return it using
    ///     [return_token_buffer](ExpansionInput::return_token_buffer).
    pub fn checkout_token_buffer(&mut self) -> Vec<Token> {
        self.0 .0 .0.internal.checkout_token_buffer()
    }

    /// Returns a token buffer, allowing it to be reused.
    pub fn return_token_buffer(&mut self, token_buffer: Vec<Token>) {
        self.0 .0 .0.internal.return_token_buffer(token_buffer)
    }
}

impl<S: FolioState> ExpansionInput<S> {
    /// Pushes source code to the front of the input stream.
    ///
    /// The new source is read to its end before the rest of the current source.
    pub fn push_source<O: Into<String>, C: Into<String>>(&mut self, origin: O, content: C) {
        self.0 .0 .0.push_source(origin, content)
    }

    /// Pushes the characters of a string to the front of the input, as `\the` does.
    ///
    /// Spaces become space tokens and every other character becomes an other token.
    pub fn push_string_tokens(&mut self, token: Token, s: &str) {
        let location = token.location();
        let expansions = self.expansions_mut();
        for c in s.chars().rev() {
            expansions.push(match c {
                ' ' => Token::new_space(' ', location),
                _ => Token::new_other(c, location),
            });
        }
    }
}

/// Input type for execution primitives.
///
/// This type provides:
///
/// - Access to the input stream, with or without expansion.
///     Its implementation of [TokenStream] returns expanded tokens.
///
/// - Mutable access to the state, the store, the commands map and the list being built.
#[repr(transparent)]
pub struct ExecutionInput<S>(ExpandedStream<S>);

impl<S> std::convert::AsMut<ExpandedStream<S>> for ExecutionInput<S> {
    fn as_mut(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }
}

impl<S: FolioState> TokenStream for ExecutionInput<S> {
    type S = S;

    fn next(&mut self) -> fl::Result<Option<Token>> {
        self.0.next()
    }

    fn back(&mut self, token: Token) {
        self.0.back(token)
    }

    fn vm(&self) -> &vm::VM<Self::S> {
        self.0.vm()
    }
}

impl<S> ExecutionInput<S> {
    /// Creates a mutable reference to this type from the [VM](vm::VM) type.
    #[inline]
    pub fn new(vm: &mut vm::VM<S>) -> &mut ExecutionInput<S> {
        unsafe { &mut *(vm as *mut vm::VM<S> as *mut ExecutionInput<S>) }
    }

    #[inline]
    pub fn unexpanded(&mut self) -> &mut UnexpandedStream<S> {
        &mut self.0 .0
    }

    #[inline]
    pub fn expanded(&mut self) -> &mut ExpandedStream<S> {
        &mut self.0
    }

    #[inline]
    fn vm_mut(&mut self) -> &mut vm::VM<S> {
        &mut self.0 .0 .0
    }

    #[inline]
    pub fn commands_map_mut(&mut self) -> &mut command::Map<S> {
        &mut self.vm_mut().commands_map
    }

    /// Returns a mutable reference to the state.
    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.vm_mut().state
    }

    /// Returns a mutable reference to the state store.
    #[inline]
    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.vm_mut().store
    }

    /// Returns the control sequence name interner, for primitives that create new names.
    #[inline]
    pub fn cs_name_interner_mut(&mut self) -> &mut crate::token::CsNameInterner {
        &mut self.vm_mut().internal.cs_name_interner
    }

    #[inline]
    pub fn fonts(&self) -> &dyn FontMetrics {
        self.0 .0 .0.fonts.as_ref()
    }

    /// Returns the list-building modes.
    #[inline]
    pub fn modes(&self) -> &vm::ModeStack {
        &self.0 .0 .0.modes
    }

    #[inline]
    pub fn modes_mut(&mut self) -> &mut vm::ModeStack {
        &mut self.vm_mut().modes
    }

    /// Sends a diagnostic to the VM's diagnostics sink.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.vm_mut().diagnostics.report(diagnostic)
    }

    /// Pushes a token to the front of the input stream.
    #[inline]
    pub fn push_token(&mut self, token: Token) {
        self.vm_mut().internal.expansions_mut().push(token);
    }

    /// Stops reading the current source; the rest of it is skipped.
    pub fn end_current_source(&mut self) {
        self.vm_mut().internal.current_source.root.end()
    }
}

impl<S: FolioState> ExecutionInput<S> {
    /// Begins a group of the given kind.
    pub fn begin_group(&mut self, kind: GroupKind) {
        self.vm_mut().begin_group(kind)
    }

    /// Ends a group opened by `\begingroup`.
    ///
    /// It is an error if the innermost group is of any other kind.
    pub fn end_semi_simple_group(&mut self, token: Token) -> fl::Result<()> {
        self.vm_mut().end_semi_simple_group(token)
    }

    /// Begins a group whose contents are built in a new list, as in `\hbox{`.
    ///
    /// The begin group token must already have been consumed.
    pub fn begin_box(&mut self, kind: GroupKind) {
        self.vm_mut().begin_box(kind)
    }

    /// Starts a paragraph if the VM is in vertical mode.
    pub fn ensure_horizontal(&mut self) {
        self.vm_mut().ensure_horizontal()
    }

    /// Starts a paragraph, with or without an indentation box.
    ///
    /// In horizontal mode `\indent` adds the indentation box to the current list instead.
    pub fn begin_paragraph(&mut self, indent: bool) {
        self.vm_mut().begin_paragraph(indent)
    }

    /// Ends the current paragraph, if there is one, and runs the page builder.
    pub fn end_paragraph(&mut self) -> fl::Result<()> {
        self.vm_mut().end_paragraph()
    }

    /// Typesets a character token in the current font.
    ///
    /// Space tokens become interword glue, and are ignored in vertical mode.
    /// Any other character starts a paragraph if the VM is in vertical mode.
    pub fn typeset_character(&mut self, token: Token) {
        match token.value() {
            crate::token::Value::Space(_) => self.vm_mut().add_space(),
            _ => {
                if let Some(c) = token.char() {
                    self.vm_mut().add_character(c)
                }
            }
        }
    }

    /// Adds a node to the current horizontal list, starting a paragraph if needed.
    pub fn append_horizontal(&mut self, node: folio_boxes::node::Horizontal) {
        self.vm_mut().append_horizontal(node)
    }

    /// Adds a node to the current vertical list, ending the paragraph if needed.
    ///
    /// Returns an error if the current list is a restricted horizontal list, like the
    ///     contents of an `\hbox`, which cannot hold vertical material.
    pub fn append_vertical(&mut self, token: Token, node: folio_boxes::node::Vertical) -> fl::Result<()> {
        self.vm_mut().append_vertical(token, node)
    }

    /// Starts an alignment in the enclosing vertical list.
    ///
    /// The begin group token must already have been consumed.
    pub fn begin_alignment(&mut self, token: Token) -> fl::Result<()> {
        self.vm_mut().begin_alignment(token)
    }

    /// Finishes the current row of the innermost alignment, as `\cr` does.
    pub fn finish_alignment_row(&mut self, token: Token) -> fl::Result<()> {
        self.vm_mut().finish_alignment_row(token)
    }
}

mod stream {
    use super::*;
    use crate::command::Command;
    use crate::token::Value;

    #[inline]
    pub fn next_unexpanded<S: FolioState>(vm: &mut vm::VM<S>) -> fl::Result<Option<Token>> {
        loop {
            if let Some(token) = vm.internal.current_source.expansions.pop() {
                return Ok(Some(token));
            }
            let internal = &mut vm.internal;
            match internal
                .current_source
                .root
                .next(&vm.store, &mut internal.cs_name_interner)
            {
                Ok(Some(token)) => return Ok(Some(token)),
                Ok(None) => {}
                Err(err) => return Err(err.into_error()),
            }
            if !vm.internal.pop_source() {
                return Ok(None);
            }
        }
    }

    /// Returns the next unexpandable token, expanding macros and expansion primitives.
    ///
    /// Expansion is a loop: the result of one expansion is pushed back onto the input
    ///     and read again on the next iteration.
    /// The number of expansions in a single call is capped by the engine configuration.
    pub fn next_expanded<S: FolioState>(vm: &mut vm::VM<S>) -> fl::Result<Option<Token>> {
        let limit = vm.store.config().max_expansion_depth;
        let mut steps = 0_usize;
        loop {
            let Some(token) = next_unexpanded(vm)? else {
                return Ok(None);
            };
            let Value::CommandRef(command_ref) = token.value() else {
                return Ok(Some(token));
            };
            let expandable = matches!(
                vm.commands_map.get_command(&command_ref),
                Some(Command::Expansion(..)) | Some(Command::Macro(..))
            );
            if !expandable {
                return Ok(Some(token));
            }
            steps += 1;
            if steps > limit {
                vm.internal.expansions_mut().clear();
                return Err(ExpansionLimitExceededError {
                    token,
                    limit,
                    nested: false,
                }
                .into());
            }
            expand(vm, token, command_ref)?;
        }
    }

    pub fn expand_once<S: FolioState>(vm: &mut vm::VM<S>) -> fl::Result<bool> {
        let Some(token) = next_unexpanded(vm)? else {
            return Ok(false);
        };
        let command_ref = match token.value() {
            Value::CommandRef(command_ref) => command_ref,
            _ => {
                vm.internal.expansions_mut().push(token);
                return Ok(false);
            }
        };
        if expand(vm, token, command_ref)? {
            Ok(true)
        } else {
            vm.internal.expansions_mut().push(token);
            Ok(false)
        }
    }

    /// Expands the token; returns false if it is not expandable.
    ///
    /// Primitives like `\ifnum` read expanded input while they are being expanded,
    ///     so expansions can nest.
    /// The nesting depth is capped by the engine configuration.
    #[inline]
    fn expand<S: FolioState>(
        vm: &mut vm::VM<S>,
        token: Token,
        command_ref: crate::token::CommandRef,
    ) -> fl::Result<bool> {
        let expandable = matches!(
            vm.commands_map.get_command(&command_ref),
            Some(Command::Expansion(..)) | Some(Command::Macro(..))
        );
        if !expandable {
            return Ok(false);
        }
        let limit = vm.store.config().max_expansion_nesting;
        if vm.internal.expansion_nesting >= limit {
            vm.internal.expansions_mut().clear();
            return Err(ExpansionLimitExceededError {
                token,
                limit,
                nested: true,
            }
            .into());
        }
        vm.internal.expansion_nesting += 1;
        let result = match vm.commands_map.get_command(&command_ref) {
            Some(Command::Expansion(command, _)) => {
                let command = *command;
                command(token, ExpansionInput::new(vm))
            }
            Some(Command::Macro(command)) => {
                let command = command.clone();
                command.call(token, ExpansionInput::new(vm))
            }
            _ => Ok(()),
        };
        vm.internal.expansion_nesting -= 1;
        result.map(|()| true)
    }
}

/// Error returned when producing a single token takes too many expansions,
///     or when expansions nest too deeply.
///
/// This usually means a macro expands to itself, as in `\def\a{\a}\a`
///     or `\def\a{\ifnum\a}\a`.
#[derive(Debug)]
pub struct ExpansionLimitExceededError {
    pub token: Token,
    pub limit: usize,
    pub nested: bool,
}

impl error::TexError for ExpansionLimitExceededError {
    fn kind(&self) -> error::Kind {
        error::Kind::Token(self.token)
    }

    fn title(&self) -> String {
        if self.nested {
            format!("expansion limit of {} nested expansions exceeded", self.limit)
        } else {
            format!("expansion limit of {} steps exceeded", self.limit)
        }
    }

    fn notes(&self) -> Vec<String> {
        vec![
            "a macro or primitive probably expands to itself".into(),
            "the pending expansions of the current input were discarded".into(),
        ]
    }
}
