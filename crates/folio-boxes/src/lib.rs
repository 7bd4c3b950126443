//! # Folio boxes
//!
//! The typesetting half of the Folio engine.
//! This crate knows nothing about tokens or macros:
//! it receives lists of nodes and turns them into lines and pages.
//!
//! - [node] is the node model: characters, boxes, glue, kerns, penalties,
//!   discretionaries and opaque whatsits.
//! - [pack] sets the glue of a list to a target size.
//! - [ligkern] applies a font's ligature and kern programs to a horizontal list.
//! - [linebreak] is the total-fit paragraph breaker.
//! - [pagebuilder] cuts a stream of vertical material into pages.
//! - [backend] is the interface pages are handed to.

pub mod backend;
pub mod display;
pub mod ligkern;
pub mod linebreak;
pub mod node;
pub mod pack;
pub mod pagebuilder;
