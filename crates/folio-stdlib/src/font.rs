//! Font registry and the `\font`, `\nullfont` and `\fontname` primitives
//!
//! The engine never reads font files.
//! `\font\cs=name` registers `name` and binds `\cs` to its [FontId];
//!     executing `\cs` makes it the current font.
//! The metrics of every registered font come from the VM's font-metric collaborator.

use crate::prefix;
use folio_core::FontId;
use folio_lang::parse::OptionalEquals;
use folio_lang::prelude as fl;
use folio_lang::traits::*;
use folio_lang::*;
use std::collections::HashMap;

pub const FONT_DOC: &str = "Register a font and bind it to a control sequence: \\font\\cs=name";
pub const FONTNAME_DOC: &str = "Output the name of a font";
pub const NULLFONT_DOC: &str = "Select the font in effect before any font is selected";

const NULL_FONT_NAME: &str = "nullfont";

/// Component needed to use the `\font` command.
pub struct Component {
    names: Vec<String>,
    ids: HashMap<String, FontId>,
}

impl Default for Component {
    fn default() -> Self {
        Component {
            names: vec![NULL_FONT_NAME.to_string()],
            ids: Default::default(),
        }
    }
}

impl Component {
    /// Returns the name a font was registered under.
    pub fn name(&self, font: FontId) -> Option<&str> {
        self.names.get(font.0 as usize).map(String::as_str)
    }

    /// Returns the id of the font with the given name, registering it if needed.
    ///
    /// Registering the same name twice returns the same id.
    pub fn register(&mut self, name: &str) -> FontId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = FontId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }
}

/// Get the `\nullfont` command.
pub fn get_nullfont<S>() -> command::BuiltIn<S> {
    command::BuiltIn::from(command::Command::Font(FontId::NULL)).with_doc(NULLFONT_DOC)
}

/// Get the `\font` command.
pub fn get_font<S: HasComponent<Component> + HasComponent<prefix::Component>>(
) -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(font_primitive_fn)
        .with_tag(prefix::assignment_tag())
        .with_doc(FONT_DOC)
}

fn font_primitive_fn<S: HasComponent<Component> + HasComponent<prefix::Component>>(
    _: token::Token,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<()> {
    let scope = prefix::scope(input.state_mut());
    let (target, _) = <(token::CommandRef, OptionalEquals)>::parse(input)?;
    let name = parse_font_name(input)?;
    let component: &mut Component = input.state_mut().component_mut();
    let id = component.register(&name);
    log::debug!("font {name} registered as {id:?}");
    input
        .commands_map_mut()
        .insert(target, command::Command::Font(id), scope);
    Ok(())
}

/// Reads a font name: a run of letter and other characters ended by a space or
///     any other token.
///
/// The terminating space is consumed.
fn parse_font_name<S: FolioState>(input: &mut vm::ExecutionInput<S>) -> fl::Result<String> {
    folio_lang::parse::skip_spaces(input)?;
    let mut name = String::new();
    while let Some(token) = input.next()? {
        match token.value() {
            token::Value::Letter(c) | token::Value::Other(c) => name.push(c),
            token::Value::Space(_) => break,
            _ => {
                input.back(token);
                break;
            }
        }
    }
    if name.is_empty() {
        let token = input.peek()?;
        return Err(parse::Error::new(
            "a font name",
            token,
            r"\font must be followed by a control sequence and the name of the font, like \font\rm=cmr10",
        )
        .into());
    }
    Ok(name)
}

/// Get the `\fontname` command.
pub fn get_fontname<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(fontname_primitive_fn).with_doc(FONTNAME_DOC)
}

fn fontname_primitive_fn<S: HasComponent<Component>>(
    fontname_token: token::Token,
    input: &mut vm::ExpansionInput<S>,
) -> fl::Result<()> {
    let token = input.next_or_err(r"reading the argument of \fontname")?;
    let font = match token.value() {
        token::Value::CommandRef(command_ref) => match input.commands_map().get_command(&command_ref) {
            Some(command::Command::Font(font)) => Some(*font),
            _ => None,
        },
        _ => None,
    };
    let Some(font) = font else {
        return Err(error::SimpleTokenError::new(
            token,
            r"the argument of \fontname must be a font command",
        )
        .into());
    };
    let component: &Component = input.state().component();
    let name = component.name(font).unwrap_or(NULL_FONT_NAME).to_string();
    input.push_string_tokens(fontname_token, &name);
    Ok(())
}
