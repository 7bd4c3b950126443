//! Error handling
//!
//! Every error in source code is a concrete type implementing [TexError].
//! Errors travel through the VM as `Box<Error>`, which adds two things to the
//!     concrete error: the source location it should be reported at, and
//!     whether it is fatal.
//!
//! Non-fatal errors are reported through the VM's diagnostics and the VM continues
//!     with the next token.
//! Fatal errors end the run.

use crate::token;
use crate::token::trace::SourceLocation;
use folio_stdext::algorithms::spellcheck;
use folio_stdext::color::Colorize;

/// The type of an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    /// An error at a particular token.
    ///
    /// For example, a command expects a number but the next token is a letter.
    Token(token::Token),
    /// The input ended early.
    ///
    /// For example, a command expects a number but there is no more input.
    EndOfInput,
    /// Some condition outside the token stream does not hold.
    ///
    /// For example, the error limit was exceeded.
    FailedPrecondition,
}

/// Implementations of this trait describe an error in source code.
pub trait TexError: std::fmt::Debug + 'static {
    fn kind(&self) -> Kind;

    fn title(&self) -> String;

    fn notes(&self) -> Vec<String> {
        vec![]
    }

    /// Where the error is reported.
    ///
    /// The default is the location of the token, for token errors.
    fn location(&self) -> Option<SourceLocation> {
        match self.kind() {
            Kind::Token(token) => Some(token.location()),
            Kind::EndOfInput | Kind::FailedPrecondition => None,
        }
    }

    /// Short text shown under the offending source.
    fn source_annotation(&self) -> String {
        match self.kind() {
            Kind::Token(t) => match (t.char(), t.cat_code()) {
                (Some(c), Some(code)) => {
                    format!["character token with value {c:?} and category code {code}"]
                }
                _ => "control sequence".to_string(),
            },
            Kind::EndOfInput => "input ended here".into(),
            Kind::FailedPrecondition => "error occurred while running this command".into(),
        }
    }
}

/// An error on its way through the VM.
#[derive(Debug)]
pub struct Error {
    error: Box<dyn TexError>,
    location: Option<SourceLocation>,
    fatal: bool,
}

impl<T: TexError> From<T> for Box<Error> {
    fn from(error: T) -> Self {
        let location = error.location();
        Box::new(Error {
            error: Box::new(error),
            location,
            fatal: false,
        })
    }
}

impl Error {
    /// Wraps an error that ends the run.
    pub fn fatal<T: TexError>(error: T) -> Box<Error> {
        let mut err: Box<Error> = error.into();
        err.fatal = true;
        err
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn kind(&self) -> Kind {
        self.error.kind()
    }

    pub fn title(&self) -> String {
        self.error.title()
    }

    pub fn notes(&self) -> Vec<String> {
        self.error.notes()
    }

    pub fn source_annotation(&self) -> String {
        self.error.source_annotation()
    }

    pub fn location(&self) -> Option<SourceLocation> {
        self.location
    }

    /// Sets the location if the error does not already have one.
    pub fn locate_if_missing(&mut self, location: Option<SourceLocation>) {
        if self.location.is_none() {
            self.location = location;
        }
    }

    /// The concrete error.
    pub fn inner(&self) -> &dyn TexError {
        self.error.as_ref()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())?;
        for note in self.notes() {
            write!(f, "\n  = note: {note}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Implementations of this trait describe an error in which the input ended prematurely.
pub trait EndOfInputError: std::fmt::Debug + 'static {
    /// What was being done when input ended, e.g. "reading the argument of a macro".
    fn doing(&self) -> String;

    fn notes(&self) -> Vec<String> {
        vec![]
    }
}

#[derive(Debug)]
pub(crate) struct EofError {
    doing: String,
    notes: Vec<String>,
}

impl EofError {
    pub(crate) fn new<E: EndOfInputError>(err: E) -> Self {
        Self {
            doing: err.doing(),
            notes: err.notes(),
        }
    }
}

impl TexError for EofError {
    fn kind(&self) -> Kind {
        Kind::EndOfInput
    }

    fn title(&self) -> String {
        format!("unexpected end of input while {}", self.doing)
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

impl EndOfInputError for &'static str {
    fn doing(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug)]
pub struct SimpleTokenError {
    pub token: token::Token,
    pub title: String,
    pub notes: Vec<String>,
}

impl SimpleTokenError {
    /// Create a new simple token error.
    pub fn new<T: AsRef<str>>(token: token::Token, title: T) -> SimpleTokenError {
        SimpleTokenError {
            token,
            title: title.as_ref().into(),
            notes: vec![],
        }
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl TexError for SimpleTokenError {
    fn kind(&self) -> Kind {
        Kind::Token(self.token)
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.notes.clone()
    }
}

#[derive(Debug)]
pub struct SimpleFailedPreconditionError {
    pub title: String,
    pub text_notes: Vec<String>,
}

impl SimpleFailedPreconditionError {
    /// Create a new simple failed precondition error.
    pub fn new<T: AsRef<str>>(title: T) -> Self {
        Self {
            title: title.as_ref().into(),
            text_notes: vec![],
        }
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Self {
        self.text_notes.push(note.into());
        self
    }
}

impl TexError for SimpleFailedPreconditionError {
    fn kind(&self) -> Kind {
        Kind::FailedPrecondition
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn notes(&self) -> Vec<String> {
        self.text_notes.clone()
    }
}

/// Error returned when a control sequence or active character has no meaning.
#[derive(Debug)]
pub struct UndefinedCommandError {
    /// The token that referred to an undefined command.
    pub token: token::Token,
    /// The name as written, e.g. `\hbx`.
    pub name: String,
    /// Defined names spelled similarly, closest first.
    pub close_names: Vec<spellcheck::CloseWord>,
}

impl UndefinedCommandError {
    /// Create a new undefined command error.
    ///
    /// The dictionary is the set of names currently defined, without backslashes.
    pub fn new<'a, I: IntoIterator<Item = &'a str>>(
        token: token::Token,
        name: String,
        dictionary: I,
    ) -> UndefinedCommandError {
        let bare = name.trim_start_matches('\\');
        let max_distance = std::cmp::max(1, bare.chars().count() / 3);
        let close_names = spellcheck::find_close_words(dictionary, bare, max_distance);
        UndefinedCommandError {
            token,
            name,
            close_names,
        }
    }
}

impl TexError for UndefinedCommandError {
    fn kind(&self) -> Kind {
        Kind::Token(self.token)
    }

    fn title(&self) -> String {
        format!("undefined control sequence {}", self.name)
    }

    fn notes(&self) -> Vec<String> {
        let mut notes = Vec::new();
        if let Some(close_name) = self.close_names.first() {
            let suggestion = format!("\\{}", close_name.word);
            notes.push(format!["did you mean {}?", suggestion.as_str().bold()]);
        }
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    #[test]
    fn location_comes_from_token() {
        let location = SourceLocation {
            source: token::trace::SourceId(1),
            line: 3,
            column: 4,
        };
        let err: Box<Error> = SimpleTokenError::new(Token::new_letter('a', location), "bad").into();
        assert_eq!(err.location(), Some(location));
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "bad");
    }

    #[test]
    fn fatal_errors() {
        let err = Error::fatal(SimpleFailedPreconditionError::new("stop").with_note("because"));
        assert!(err.is_fatal());
        assert_eq!(err.location(), None);
        assert_eq!(err.to_string(), "stop\n  = note: because");
    }

    #[test]
    fn undefined_command_suggestion() {
        let token = Token::new_letter('a', SourceLocation::UNKNOWN);
        let err = UndefinedCommandError::new(
            token,
            r"\hbx".to_string(),
            ["hbox", "vbox", "par", "def"],
        );
        assert_eq!(err.close_names.first().map(|w| w.word.as_str()), Some("hbox"));
        assert_eq!(err.notes().len(), 1);
        let err = UndefinedCommandError::new(token, r"\zzzzzz".to_string(), ["hbox"]);
        assert!(err.notes().is_empty());
    }
}
