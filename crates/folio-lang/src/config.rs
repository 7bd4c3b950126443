//! Engine configuration.
//!
//! [EngineConfig] holds the limits of the VM and the initial values of every
//!     named parameter.
//! The state store reads a parameter from here until it is first assigned.

use crate::command::RedefinitionPolicy;
use folio_boxes::linebreak::FitnessThresholds;
use folio_core::{Glue, GlueOrder, Scaled};

/// Configuration of a VM.
///
/// The defaults are close to the values of the plain format.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Number of recoverable errors after which the run stops.
    pub error_limit: usize,
    /// Maximum number of expansions performed to produce one unexpandable token.
    pub max_expansion_depth: usize,
    /// Maximum number of expansions running inside one another,
    ///     as when `\ifnum` expands a macro while reading its number.
    pub max_expansion_nesting: usize,
    pub redefinition_policy: RedefinitionPolicy,

    pub hsize: Scaled,
    pub vsize: Scaled,
    pub parindent: Scaled,
    pub maxdepth: Scaled,
    pub lineskiplimit: Scaled,
    pub hfuzz: Scaled,
    pub vfuzz: Scaled,

    pub baselineskip: Glue,
    pub lineskip: Glue,
    pub parskip: Glue,
    pub topskip: Glue,
    pub leftskip: Glue,
    pub rightskip: Glue,
    pub parfillskip: Glue,

    pub tolerance: i32,
    pub pretolerance: i32,
    pub line_penalty: i32,
    pub adj_demerits: i32,
    pub double_hyphen_demerits: i32,
    pub final_hyphen_demerits: i32,
    pub hyphen_penalty: i32,
    pub ex_hyphen_penalty: i32,
    pub club_penalty: i32,
    pub widow_penalty: i32,
    pub interline_penalty: i32,
    pub hbadness: i32,
    pub vbadness: i32,
    pub fitness: FitnessThresholds,
    /// Initial `\endlinechar`; a value outside 0-255 appends nothing.
    pub end_line_char: i32,
}

fn pt(n: i32) -> Scaled {
    Scaled::ONE * n
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            error_limit: 100,
            max_expansion_depth: 10000,
            max_expansion_nesting: 128,
            redefinition_policy: RedefinitionPolicy::Allow,

            hsize: pt(468),
            vsize: pt(643),
            parindent: pt(20),
            maxdepth: pt(4),
            lineskiplimit: Scaled::ZERO,
            hfuzz: Scaled(6554),
            vfuzz: Scaled(6554),

            baselineskip: Glue::fixed(pt(12)),
            lineskip: Glue::fixed(pt(1)),
            parskip: Glue::new(Scaled::ZERO, pt(1), Scaled::ZERO),
            topskip: Glue::fixed(pt(10)),
            leftskip: Glue::default(),
            rightskip: Glue::default(),
            parfillskip: Glue::infinite_stretch(GlueOrder::Fil),

            tolerance: 200,
            pretolerance: 100,
            line_penalty: 10,
            adj_demerits: 10000,
            double_hyphen_demerits: 10000,
            final_hyphen_demerits: 5000,
            hyphen_penalty: 50,
            ex_hyphen_penalty: 50,
            club_penalty: 150,
            widow_penalty: 150,
            interline_penalty: 0,
            hbadness: 1000,
            vbadness: 1000,
            fitness: FitnessThresholds::default(),
            end_line_char: '\r' as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_line_breaker_defaults() {
        let config = EngineConfig::default();
        let params = folio_boxes::linebreak::LineBreakParams::default();
        assert_eq!(config.tolerance, params.tolerance);
        assert_eq!(config.pretolerance, params.pretolerance);
        assert_eq!(config.line_penalty, params.line_penalty);
        assert_eq!(config.adj_demerits, params.adj_demerits);
        assert_eq!(config.fitness, params.fitness);
        assert_eq!(config.parfillskip, params.par_fill_skip);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"error_limit": 3, "tolerance": 1000}"#).unwrap();
        assert_eq!(config.error_limit, 3);
        assert_eq!(config.tolerance, 1000);
        assert_eq!(config.hsize, EngineConfig::default().hsize);
    }
}
