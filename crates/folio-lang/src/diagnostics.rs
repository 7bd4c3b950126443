//! Reporting errors, warnings and messages to the user.
//!
//! The VM never prints anything itself.
//! Recoverable errors, badly set boxes and the output of `\message` are all
//!     turned into a [Diagnostic] and handed to the [Diagnostics] sink of the VM.

use crate::token::trace::SourceCodeTrace;
use folio_stdext::color::Colorize;
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A single report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub notes: Vec<String>,
    /// The source the report points at, if any.
    pub trace: Option<SourceCodeTrace>,
    /// Text shown under the pointed-at source.
    pub annotation: Option<String>,
}

impl Diagnostic {
    pub fn new<T: Into<String>>(severity: Severity, message: T) -> Diagnostic {
        Diagnostic {
            severity,
            message: message.into(),
            notes: vec![],
            trace: None,
            annotation: None,
        }
    }

    pub fn with_trace(mut self, trace: Option<SourceCodeTrace>) -> Diagnostic {
        self.trace = trace;
        self
    }

    pub fn with_note<T: Into<String>>(mut self, note: T) -> Diagnostic {
        self.notes.push(note.into());
        self
    }

    /// Renders the diagnostic for a terminal, in the style of compiler errors.
    pub fn render(&self) -> String {
        let label = match self.severity {
            Severity::Info => self.severity.label().bright_blue(),
            Severity::Warning => self.severity.label().bright_yellow(),
            Severity::Error => self.severity.label().bright_red(),
        };
        let mut s = String::new();
        _ = write!(s, "{}: {}", label.bold(), self.message.as_str().bold());
        if let Some(trace) = &self.trace {
            let margin = " ".repeat(trace.line_number.to_string().len());
            _ = write!(
                s,
                "\n{margin}{} {}:{}:{}",
                "-->".bright_cyan(),
                trace.origin,
                trace.line_number,
                trace.column + 1
            );
            _ = write!(s, "\n{margin} {}", "|".bright_cyan());
            _ = write!(
                s,
                "\n{} {} {}",
                trace.line_number.to_string().as_str().bright_cyan(),
                "|".bright_cyan(),
                trace.line_content
            );
            let pointer = format!("^ {}", self.annotation.as_deref().unwrap_or_default());
            _ = write!(
                s,
                "\n{margin} {} {}{}",
                "|".bright_cyan(),
                " ".repeat(trace.column),
                pointer.trim_end().bright_red()
            );
        }
        for note in &self.notes {
            _ = write!(s, "\n  {} {note}", "= note:".dimmed());
        }
        s
    }
}

/// A sink for diagnostics.
pub trait Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Writes diagnostics to standard error, colored when the `color` feature is on.
#[derive(Debug, Default)]
pub struct Stderr;

impl Diagnostics for Stderr {
    fn report(&mut self, diagnostic: Diagnostic) {
        eprintln!("{}\n", diagnostic.render());
    }
}

/// Keeps diagnostics in memory.
///
/// Clones share the same storage, so a clone can be given to the VM and
///     the original inspected afterwards.
#[derive(Debug, Default, Clone)]
pub struct Collect(Rc<RefCell<Vec<Diagnostic>>>);

impl Collect {
    /// Removes and returns every diagnostic reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

impl Diagnostics for Collect {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.0.borrow_mut().push(diagnostic)
    }
}

/// Forwards diagnostics to the `log` facade at the matching level.
#[derive(Debug, Default)]
pub struct Log;

impl Diagnostics for Log {
    fn report(&mut self, diagnostic: Diagnostic) {
        let location = match &diagnostic.trace {
            None => String::new(),
            Some(trace) => format!(
                " ({}:{}:{})",
                trace.origin,
                trace.line_number,
                trace.column + 1
            ),
        };
        match diagnostic.severity {
            Severity::Info => log::info!("{}{location}", diagnostic.message),
            Severity::Warning => log::warn!("{}{location}", diagnostic.message),
            Severity::Error => log::error!("{}{location}", diagnostic.message),
        }
    }
}
