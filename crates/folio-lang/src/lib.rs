//! # Folio: the macro language interpreter.
//!
//! This crate turns source text into typeset material.
//! It contains the lexer, macros and their expansion, the grouped state store,
//!     the command map and the virtual machine (VM) that drives all of them.
//! Concrete primitives like `\def` or `\hbox` live in the `folio-stdlib` crate;
//!     this crate provides the machinery those primitives are written against.

extern crate folio_stdext;

pub mod command;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod parse;
pub mod prelude;
pub mod store;
pub mod texmacro;
pub mod token;
pub mod variable;
pub mod vm;

/// Module that re-exports all of the crate's traits.
///
/// This is useful for getting all of the traits in scope in a Rust module:
/// ```
/// use folio_lang::traits::*;
/// ```
pub mod traits {
    pub use super::diagnostics::Diagnostics;
    pub use super::parse::Parsable;
    pub use super::vm::FolioState;
    pub use super::vm::HasComponent;
    pub use super::vm::TokenStream;
}
