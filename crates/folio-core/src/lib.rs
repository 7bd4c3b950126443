//! Core types and abstractions used in Folio.
//!
//! This crate holds the numeric types shared by every layer of the engine,
//! and the font-metric interface the engine consults when building character nodes.

mod font;
mod glue;
mod scaled;

pub use font::{CharMetrics, FixedMetrics, FontId, FontMetrics, Ligature};
pub use glue::{Glue, GlueOrder};
pub use scaled::{badness, OverflowError, Scaled, ScaledUnit, INF_BAD};
