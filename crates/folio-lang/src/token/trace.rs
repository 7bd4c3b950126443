//! Tracing tokens back to the source they were scanned from.
//!
//! Each token carries a small [SourceLocation]: the source it came from and
//!     the line and column it started at.
//! The source text itself is kept once, in the [Tracer].
//! When an error or warning needs to show the offending line, the tracer turns
//!     the location into a [SourceCodeTrace] containing the line's content.

use std::fmt;

/// Identifier of a source registered with a [Tracer].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceId(pub u32);

/// Where a token was scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceLocation {
    pub source: SourceId,
    /// Line number, starting at 1.
    pub line: u32,
    /// Column in chars, starting at 0.
    pub column: u32,
}

impl SourceLocation {
    /// Location of tokens that were not scanned from any source,
    ///     for example tokens created by a primitive.
    pub const UNKNOWN: SourceLocation = SourceLocation {
        source: SourceId(u32::MAX),
        line: 0,
        column: 0,
    };
}

/// A traced location, ready to be shown to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceCodeTrace {
    /// Name of the source, usually a file name.
    pub origin: String,
    pub line_content: String,
    pub line_number: usize,
    pub column: usize,
}

impl fmt::Display for SourceCodeTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let margin = " ".repeat(self.line_number.to_string().len());
        writeln!(
            f,
            "{margin}--> {}:{}:{}",
            self.origin,
            self.line_number,
            self.column + 1
        )?;
        writeln!(f, "{margin} |")?;
        writeln!(f, "{} | {}", self.line_number, self.line_content)?;
        write!(f, "{margin} | {}^", " ".repeat(self.column))
    }
}

struct Source {
    origin: String,
    content: String,
}

/// Registry of every source the VM has read.
#[derive(Default)]
pub struct Tracer {
    sources: Vec<Source>,
}

impl Tracer {
    /// Registers a source and returns the identifier its tokens should carry.
    pub fn register<O: Into<String>, C: Into<String>>(&mut self, origin: O, content: C) -> SourceId {
        let id = SourceId(self.sources.len() as u32);
        self.sources.push(Source {
            origin: origin.into(),
            content: content.into(),
        });
        id
    }

    /// Name of a registered source.
    pub fn origin(&self, source: SourceId) -> Option<&str> {
        self.sources
            .get(source.0 as usize)
            .map(|source| source.origin.as_str())
    }

    /// Returns a trace for the location, or [None] if the location is not from a registered source.
    pub fn trace(&self, location: SourceLocation) -> Option<SourceCodeTrace> {
        let source = self.sources.get(location.source.0 as usize)?;
        let line_index = (location.line as usize).checked_sub(1)?;
        let line_content = source
            .content
            .split('\n')
            .nth(line_index)
            .unwrap_or_default()
            .trim_end_matches('\r');
        Some(SourceCodeTrace {
            origin: source.origin.clone(),
            line_content: line_content.to_string(),
            line_number: location.line as usize,
            column: location.column as usize,
        })
    }

    /// Returns a trace pointing just after the last non-blank character of a source.
    ///
    /// This is where errors about input ending too early are shown.
    pub fn trace_end(&self, source: SourceId) -> Option<SourceCodeTrace> {
        let registered = self.sources.get(source.0 as usize)?;
        let (line_index, line) = registered
            .content
            .split('\n')
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .last()
            .unwrap_or((0, ""));
        let line = line.trim_end();
        Some(SourceCodeTrace {
            origin: registered.origin.clone(),
            line_content: line.to_string(),
            line_number: line_index + 1,
            column: line.chars().count(),
        })
    }
}
