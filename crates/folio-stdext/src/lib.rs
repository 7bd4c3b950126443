//! Generic data structures and algorithms used across the Folio crates.
//!
//! Nothing in this crate knows about typesetting.
//! The modules here are the building blocks that the engine crates compose:
//! the grouping map behind the state store,
//! the interner behind control sequence names,
//! and the substring matcher behind delimited macro arguments.

pub mod algorithms;
pub mod collections;
pub mod color;
