//! Folio prelude.

/// Result type returned by commands and most of the VM.
pub type Result<T> = std::result::Result<T, Box<crate::error::Error>>;
