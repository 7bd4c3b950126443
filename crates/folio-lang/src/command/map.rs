//! Map from control sequence names and active characters to commands.
use super::*;
use std::collections::HashMap;
use std::fmt;
use token::CommandRef;
use folio_stdext::collections::groupingmap;
use folio_stdext::collections::groupingmap::GroupingMap;

/// What a macro definition may overwrite.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RedefinitionPolicy {
    /// Any command may be redefined.
    #[default]
    Allow,
    /// Built-in primitives may not be overwritten by a macro; other commands may.
    ForbidPrimitive,
    /// Nothing that is already defined may be overwritten by a macro.
    Forbid,
}

/// Error returned when a definition is refused by the [RedefinitionPolicy].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedefinitionError {
    Primitive,
    AlreadyDefined,
}

impl fmt::Display for RedefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedefinitionError::Primitive => write!(f, "cannot redefine a built-in primitive"),
            RedefinitionError::AlreadyDefined => {
                write!(f, "cannot redefine a command that is already defined")
            }
        }
    }
}

impl std::error::Error for RedefinitionError {}

/// Error returned when `\let` aliases a command that does not exist.
#[derive(Debug)]
pub struct InvalidAlias;

impl fmt::Display for InvalidAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid alias: the control sequence to alias is undefined"
        )
    }
}

impl std::error::Error for InvalidAlias {}

/// The command map.
///
/// Definitions obey grouping exactly like the values in the store:
///     a local definition disappears when the group it was made in ends.
pub struct Map<S> {
    commands: GroupingMap<CommandRef, Command<S>>,
    built_in_commands: HashMap<token::CsName, BuiltIn<S>>,
}

impl<S> Map<S> {
    pub(crate) fn new(built_in_commands: HashMap<token::CsName, BuiltIn<S>>) -> Map<S> {
        Self {
            commands: built_in_commands
                .iter()
                .map(|(k, v)| (CommandRef::ControlSequence(*k), v.cmd.clone()))
                .collect(),
            built_in_commands,
        }
    }

    #[inline]
    pub fn get_command(&self, command_ref: &CommandRef) -> Option<&Command<S>> {
        self.commands.get(command_ref)
    }

    pub fn get_tag(&self, command_ref: &CommandRef) -> Option<Tag> {
        self.commands.get(command_ref).and_then(Command::tag)
    }

    pub fn built_in_commands(&self) -> &HashMap<token::CsName, BuiltIn<S>> {
        &self.built_in_commands
    }

    /// Whether the command currently bound to the name is the built-in primitive of that name.
    pub fn is_built_in(&self, command_ref: &CommandRef) -> bool {
        let (CommandRef::ControlSequence(cs_name), Some(command)) =
            (command_ref, self.get_command(command_ref))
        else {
            return false;
        };
        match self.built_in_commands.get(cs_name) {
            None => false,
            Some(built_in) => built_in.cmd.same_meaning(command),
        }
    }

    /// Defines a macro, subject to a redefinition policy.
    pub fn insert_macro(
        &mut self,
        name: CommandRef,
        texmacro: texmacro::Macro,
        scope: groupingmap::Scope,
        policy: RedefinitionPolicy,
    ) -> Result<(), RedefinitionError> {
        match policy {
            RedefinitionPolicy::Allow => {}
            RedefinitionPolicy::ForbidPrimitive => {
                if self.is_built_in(&name) {
                    return Err(RedefinitionError::Primitive);
                }
            }
            RedefinitionPolicy::Forbid => {
                if self.commands.contains_key(&name) {
                    return Err(RedefinitionError::AlreadyDefined);
                }
            }
        }
        self.insert(name, Command::Macro(rc::Rc::new(texmacro)), scope);
        Ok(())
    }

    /// Gives `alias` the current meaning of `command`, as `\let\alias=\command` does.
    pub fn alias_control_sequence(
        &mut self,
        alias: CommandRef,
        command: &CommandRef,
        scope: groupingmap::Scope,
    ) -> Result<(), InvalidAlias> {
        let command = match self.get_command(command) {
            None => return Err(InvalidAlias),
            Some(t) => t.clone(),
        };
        self.insert(alias, command, scope);
        Ok(())
    }

    pub fn alias_token(&mut self, alias: CommandRef, token: token::Token, scope: groupingmap::Scope) {
        self.insert(alias, Command::CharacterTokenAlias(token.value()), scope);
    }

    pub fn insert(&mut self, command_ref: CommandRef, command: Command<S>, scope: groupingmap::Scope) {
        self.commands.insert(command_ref, command, scope);
    }

    /// Names of every control sequence that currently has a meaning.
    pub fn control_sequences(&self) -> impl Iterator<Item = token::CsName> + '_ {
        self.commands.iter().filter_map(|(k, _)| match k {
            CommandRef::ControlSequence(cs_name) => Some(*cs_name),
            CommandRef::ActiveCharacter(_) => None,
        })
    }

    pub(crate) fn begin_group(&mut self) {
        self.commands.begin_group();
    }

    pub(crate) fn end_group(&mut self) -> Result<(), groupingmap::NoGroupToEndError> {
        self.commands.end_group()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
