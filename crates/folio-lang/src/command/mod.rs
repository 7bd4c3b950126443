//! Commands
//!
//! Commands come in two flavors.
//! An *expansion* command reads tokens from the input and pushes tokens back;
//!     it never changes the state.
//! Macros, `\the` and conditionals are expansion commands.
//! An *execution* command changes the state or the list being built.
//! `\def`, `\hbox` and `\par` are execution commands.
//!
//! |                                            | Expansion | Execution
//! |--------------------------------------------|-----------|-----------
//! | Can read tokens from the input stream?     | Yes       | Yes
//! | Can add tokens to the input stream?        | Yes       | Rarely
//! | Can change the state or the current list?  | No        | Yes
//! | Is evaluated while only expanding, as in `\edef`? | Yes | No
//!
//! Besides these, a control sequence can name a variable (like `\count 5` or
//!     `\tolerance`), alias a character (`\let\a=b`) or select a font.

use crate::prelude as fl;
use crate::texmacro;
use crate::token;
use crate::variable;
use crate::vm;
use folio_core::FontId;
use std::num;
use std::rc;
use std::sync::atomic;

mod map;

pub use map::Map;
pub use map::RedefinitionError;
pub use map::RedefinitionPolicy;

/// The Rust type of expansion primitive functions.
pub type ExpansionFn<S> =
    fn(token: token::Token, input: &mut vm::ExpansionInput<S>) -> fl::Result<()>;

/// The Rust type of execution primitive functions.
pub type ExecutionFn<S> =
    fn(token: token::Token, input: &mut vm::ExecutionInput<S>) -> fl::Result<()>;

/// The meaning of a control sequence or active character.
pub enum Command<S> {
    /// An expansion primitive implemented in Rust.
    ///
    /// Examples: `\the`, `\ifnum`.
    Expansion(ExpansionFn<S>, Option<Tag>),

    /// A user defined macro.
    Macro(rc::Rc<texmacro::Macro>),

    /// A non-expansion primitive that operates on the state.
    ///
    /// Examples: `\def`, `\par`.
    Execution(ExecutionFn<S>, Option<Tag>),

    /// A reference to a location in the store, like a parameter or register.
    ///
    /// Examples: `\count`, `\tolerance`.
    Variable(variable::Variable),

    /// An alias of a character token, created by `\let\cmd=<character>`.
    ///
    /// When typesetting it behaves like the character.
    CharacterTokenAlias(token::Value),

    /// Selects a font, created by `\font`.
    Font(FontId),
}

impl<S> std::fmt::Display for Command<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Expansion(_, _) => write![f, "an expansion command"],
            Command::Macro(_) => write![f, "a user-defined macro"],
            Command::Execution(_, _) => write![f, "an execution command"],
            Command::Variable(_) => write![f, "a variable command"],
            Command::CharacterTokenAlias(_) => write![f, "a character token alias"],
            Command::Font(_) => write![f, "a font command"],
        }
    }
}

impl<S> Command<S> {
    /// Gets the tag associated to this command, or [None] if the command has no tag.
    pub fn tag(&self) -> Option<Tag> {
        match self {
            Command::Expansion(_, tag) => *tag,
            Command::Execution(_, tag) => *tag,
            Command::Macro(_)
            | Command::Variable(_)
            | Command::CharacterTokenAlias(_)
            | Command::Font(_) => None,
        }
    }

    /// Whether this is the same primitive as another command.
    ///
    /// Used by `\ifx`: two primitives are equal if their functions are equal,
    ///     two macros are equal if their definitions are equal.
    pub fn same_meaning(&self, other: &Command<S>) -> bool {
        match (self, other) {
            (Command::Expansion(a, s), Command::Expansion(b, t)) => {
                *a as usize == *b as usize && s == t
            }
            (Command::Execution(a, s), Command::Execution(b, t)) => {
                *a as usize == *b as usize && s == t
            }
            (Command::Macro(a), Command::Macro(b)) => rc::Rc::ptr_eq(a, b) || a == b,
            (Command::Variable(a), Command::Variable(b)) => a == b,
            (Command::CharacterTokenAlias(a), Command::CharacterTokenAlias(b)) => a == b,
            (Command::Font(a), Command::Font(b)) => a == b,
            _ => false,
        }
    }
}

/// A built-in command, provided when the VM is created.
///
/// This is a [Command] plus an optional documentation string, printed by `folio doc`.
pub struct BuiltIn<S> {
    cmd: Command<S>,
    doc: Option<&'static str>,
}

impl<S> BuiltIn<S> {
    /// Create a new expansion built-in command.
    pub fn new_expansion(t: ExpansionFn<S>) -> BuiltIn<S> {
        t.into()
    }

    /// Create a new execution built-in command.
    pub fn new_execution(t: ExecutionFn<S>) -> BuiltIn<S> {
        t.into()
    }

    /// Create a new variable built-in command.
    pub fn new_variable(v: variable::Variable) -> BuiltIn<S> {
        Command::Variable(v).into()
    }

    /// Set the tag for this built-in command.
    ///
    /// Only primitives carry tags; for other commands this does nothing.
    pub fn with_tag(mut self, tag: Tag) -> BuiltIn<S> {
        match &mut self.cmd {
            Command::Expansion(_, t) => *t = Some(tag),
            Command::Execution(_, t) => *t = Some(tag),
            Command::Macro(_)
            | Command::Variable(_)
            | Command::CharacterTokenAlias(_)
            | Command::Font(_) => {}
        }
        self
    }

    /// Set the doc for this built-in command.
    pub fn with_doc(mut self, doc: &'static str) -> BuiltIn<S> {
        self.doc = Some(doc);
        self
    }

    pub fn cmd(&self) -> &Command<S> {
        &self.cmd
    }

    pub fn doc(&self) -> Option<&'static str> {
        self.doc
    }
}

// We implement Clone manually as the derived implementation requires S to be Clone.
impl<S> Clone for Command<S> {
    fn clone(&self) -> Self {
        match self {
            Command::Expansion(e, t) => Command::Expansion::<S>(*e, *t),
            Command::Macro(m) => Command::Macro(m.clone()),
            Command::Execution(e, t) => Command::Execution(*e, *t),
            Command::Variable(v) => Command::Variable(*v),
            Command::CharacterTokenAlias(tv) => Command::CharacterTokenAlias(*tv),
            Command::Font(font) => Command::Font(*font),
        }
    }
}

impl<S> Clone for BuiltIn<S> {
    fn clone(&self) -> Self {
        Self {
            cmd: self.cmd.clone(),
            doc: self.doc,
        }
    }
}

impl<S> From<ExpansionFn<S>> for BuiltIn<S> {
    fn from(cmd: ExpansionFn<S>) -> Self {
        Command::Expansion(cmd, None).into()
    }
}

impl<S> From<ExecutionFn<S>> for BuiltIn<S> {
    fn from(cmd: ExecutionFn<S>) -> Self {
        Command::Execution(cmd, None).into()
    }
}

impl<S> From<variable::Variable> for BuiltIn<S> {
    fn from(v: variable::Variable) -> Self {
        Command::Variable(v).into()
    }
}

impl<S> From<Command<S>> for BuiltIn<S> {
    fn from(cmd: Command<S>) -> Self {
        BuiltIn { cmd, doc: None }
    }
}

/// A tag is a piece of metadata optionally attached to a primitive.
///
/// Tags let one command recognize another while scanning the input.
/// When a conditional is false, `\if...` skips tokens until it finds `\else` or `\fi`;
///     it recognizes them by comparing the tags of the commands it reads with the
///     tags of `\else` and `\fi`.
/// This works even if the user has renamed those commands with `\let`.
///
/// The same tag can be attached to several commands,
///     but each command has at most one tag.
/// `Option<Tag>` takes 4 bytes.
#[derive(PartialEq, Eq, Clone, Copy, Debug, PartialOrd, Ord, Hash)]
pub struct Tag(num::NonZeroU32);

static NEXT_TAG_VALUE: atomic::AtomicU32 = atomic::AtomicU32::new(1);

impl Tag {
    /// Creates a new unique tag.
    ///
    /// ```
    /// # use folio_lang::command::Tag;
    /// let tag_1 = Tag::new();
    /// let tag_2 = Tag::new();
    /// assert_ne!(tag_1, tag_2);
    /// ```
    #[allow(clippy::new_without_default)]
    pub fn new() -> Tag {
        let n = NEXT_TAG_VALUE.fetch_add(1, atomic::Ordering::Relaxed);
        Tag(num::NonZeroU32::new(n).unwrap_or(num::NonZeroU32::MIN))
    }
}

/// A static tag enables creating a tag in a static variable.
///
/// ```
/// # use folio_lang::command::StaticTag;
/// static TAG: StaticTag = StaticTag::new();
///
/// assert_eq!(TAG.get(), TAG.get());
/// ```
pub struct StaticTag(std::sync::OnceLock<Tag>);

impl Default for StaticTag {
    fn default() -> Self {
        StaticTag::new()
    }
}

impl StaticTag {
    pub const fn new() -> StaticTag {
        StaticTag(std::sync::OnceLock::new())
    }

    /// Get the [Tag], creating it on the first call.
    pub fn get(&self) -> Tag {
        *self.0.get_or_init(Tag::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_size() {
        assert_eq!(std::mem::size_of::<Command<()>>(), 16);
    }

    static STATIC_TAG_1: StaticTag = StaticTag::new();
    static STATIC_TAG_2: StaticTag = StaticTag::new();

    #[test]
    fn tag() {
        let tag_1_val_1 = STATIC_TAG_1.get();
        let tag_2_val_1 = STATIC_TAG_2.get();
        let other_tag = Tag::new();
        let tag_1_val_2 = STATIC_TAG_1.get();
        let tag_2_val_2 = STATIC_TAG_2.get();

        assert_eq!(tag_1_val_1, tag_1_val_2);
        assert_eq!(tag_2_val_1, tag_2_val_2);
        assert_ne!(tag_1_val_1, tag_2_val_2);
        assert_ne!(tag_1_val_1, other_tag);
    }

    #[test]
    fn tag_size() {
        assert_eq!(std::mem::size_of::<Option<Tag>>(), 4);
    }

    fn noop(_: token::Token, _: &mut vm::ExecutionInput<()>) -> fl::Result<()> {
        Ok(())
    }

    fn other_noop(token: token::Token, _: &mut vm::ExecutionInput<()>) -> fl::Result<()> {
        Err(crate::error::SimpleTokenError::new(token, "other").into())
    }

    #[test]
    fn same_meaning() {
        let a: Command<()> = Command::Execution(noop, None);
        let b: Command<()> = Command::Execution(other_noop, None);
        assert!(a.same_meaning(&a.clone()));
        assert!(!a.same_meaning(&b));
        let c: Command<()> = Command::Font(FontId(1));
        assert!(!a.same_meaning(&c));
    }
}
