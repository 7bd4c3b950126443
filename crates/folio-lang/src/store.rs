//! The grouped state store.
//!
//! Every piece of interpreter state that obeys grouping lives here: category codes,
//!     registers, named parameters and the current font.
//! Each is addressed by a [Location].
//! Values are kept in a [GroupingMap], so a local assignment is undone when the
//!     group it was made in ends, and a global assignment survives every open group.
//!
//! A location that was never assigned reads its initial value.
//! For named parameters this comes from the [EngineConfig];
//!     for category codes from [CatCode::initial];
//!     registers start at zero.

use crate::config::EngineConfig;
use crate::token::lexer;
use crate::token::CatCode;
use folio_boxes::pack::PackTarget;
use folio_core::{FontId, Glue, Scaled};
use folio_stdext::collections::groupingmap::{GroupingMap, NoGroupToEndError, Scope};

macro_rules! parameters {
    ( $(#[$meta: meta])* $type: ident, $( ($variant: ident, $name: expr), )+ ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub enum $type {
            $( $variant, )+
        }

        impl $type {
            pub const ALL: &'static [$type] = &[ $( $type::$variant, )+ ];

            /// Name of the control sequence for the parameter, without the backslash.
            pub fn name(self) -> &'static str {
                match self {
                    $( $type::$variant => $name, )+
                }
            }
        }
    };
}

parameters!(
    /// Integer parameters.
    IntParam,
    (Tolerance, "tolerance"),
    (Pretolerance, "pretolerance"),
    (LinePenalty, "linepenalty"),
    (AdjDemerits, "adjdemerits"),
    (DoubleHyphenDemerits, "doublehyphendemerits"),
    (FinalHyphenDemerits, "finalhyphendemerits"),
    (HyphenPenalty, "hyphenpenalty"),
    (ExHyphenPenalty, "exhyphenpenalty"),
    (ClubPenalty, "clubpenalty"),
    (WidowPenalty, "widowpenalty"),
    (InterlinePenalty, "interlinepenalty"),
    (HBadness, "hbadness"),
    (VBadness, "vbadness"),
    (EndLineChar, "endlinechar"),
    (VeryLooseFitness, "veryloosefitness"),
    (LooseFitness, "loosefitness"),
    (TightFitness, "tightfitness"),
);

parameters!(
    /// Dimension parameters.
    DimenParam,
    (HSize, "hsize"),
    (VSize, "vsize"),
    (ParIndent, "parindent"),
    (MaxDepth, "maxdepth"),
    (LineSkipLimit, "lineskiplimit"),
    (HFuzz, "hfuzz"),
    (VFuzz, "vfuzz"),
);

parameters!(
    /// Glue parameters.
    GlueParam,
    (BaselineSkip, "baselineskip"),
    (LineSkip, "lineskip"),
    (ParSkip, "parskip"),
    (TopSkip, "topskip"),
    (LeftSkip, "leftskip"),
    (RightSkip, "rightskip"),
    (ParFillSkip, "parfillskip"),
);

impl IntParam {
    fn initial(self, config: &EngineConfig) -> i32 {
        match self {
            IntParam::Tolerance => config.tolerance,
            IntParam::Pretolerance => config.pretolerance,
            IntParam::LinePenalty => config.line_penalty,
            IntParam::AdjDemerits => config.adj_demerits,
            IntParam::DoubleHyphenDemerits => config.double_hyphen_demerits,
            IntParam::FinalHyphenDemerits => config.final_hyphen_demerits,
            IntParam::HyphenPenalty => config.hyphen_penalty,
            IntParam::ExHyphenPenalty => config.ex_hyphen_penalty,
            IntParam::ClubPenalty => config.club_penalty,
            IntParam::WidowPenalty => config.widow_penalty,
            IntParam::InterlinePenalty => config.interline_penalty,
            IntParam::HBadness => config.hbadness,
            IntParam::VBadness => config.vbadness,
            IntParam::EndLineChar => config.end_line_char,
            IntParam::VeryLooseFitness => config.fitness.very_loose,
            IntParam::LooseFitness => config.fitness.loose,
            IntParam::TightFitness => config.fitness.tight,
        }
    }
}

impl DimenParam {
    fn initial(self, config: &EngineConfig) -> Scaled {
        match self {
            DimenParam::HSize => config.hsize,
            DimenParam::VSize => config.vsize,
            DimenParam::ParIndent => config.parindent,
            DimenParam::MaxDepth => config.maxdepth,
            DimenParam::LineSkipLimit => config.lineskiplimit,
            DimenParam::HFuzz => config.hfuzz,
            DimenParam::VFuzz => config.vfuzz,
        }
    }
}

impl GlueParam {
    fn initial(self, config: &EngineConfig) -> Glue {
        match self {
            GlueParam::BaselineSkip => config.baselineskip,
            GlueParam::LineSkip => config.lineskip,
            GlueParam::ParSkip => config.parskip,
            GlueParam::TopSkip => config.topskip,
            GlueParam::LeftSkip => config.leftskip,
            GlueParam::RightSkip => config.rightskip,
            GlueParam::ParFillSkip => config.parfillskip,
        }
    }
}

/// Address of a value in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Location {
    CatCode(char),
    /// Integer register, `\count`.
    Count(u8),
    /// Dimension register, `\dimen`.
    Dimen(u8),
    /// Glue register, `\skip`.
    Skip(u8),
    Int(IntParam),
    DimenParam(DimenParam),
    GlueParam(GlueParam),
    CurrentFont,
}

/// The kind of value a location holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Dimen,
    Glue,
    CatCode,
    Font,
}

impl Location {
    pub fn value_type(&self) -> ValueType {
        match self {
            Location::Count(_) | Location::Int(_) => ValueType::Int,
            Location::Dimen(_) | Location::DimenParam(_) => ValueType::Dimen,
            Location::Skip(_) | Location::GlueParam(_) => ValueType::Glue,
            Location::CatCode(_) => ValueType::CatCode,
            Location::CurrentFont => ValueType::Font,
        }
    }
}

/// A value in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StoreValue {
    Int(i32),
    Dimen(Scaled),
    Glue(Glue),
    CatCode(CatCode),
    Font(FontId),
}

impl StoreValue {
    /// The value as an integer, coercing dimensions and glue the usual way.
    pub fn as_int(&self) -> i32 {
        match self {
            StoreValue::Int(i) => *i,
            StoreValue::Dimen(d) => d.0,
            StoreValue::Glue(g) => g.width.0,
            StoreValue::CatCode(c) => *c as i32,
            StoreValue::Font(f) => f.0 as i32,
        }
    }

    /// The value as a dimension; glue loses its stretch and shrink.
    pub fn as_dimen(&self) -> Scaled {
        match self {
            StoreValue::Dimen(d) => *d,
            StoreValue::Glue(g) => g.width,
            StoreValue::Int(_) | StoreValue::CatCode(_) | StoreValue::Font(_) => {
                Scaled(self.as_int())
            }
        }
    }

    pub fn as_glue(&self) -> Glue {
        match self {
            StoreValue::Glue(g) => *g,
            _ => Glue::fixed(self.as_dimen()),
        }
    }
}

/// The kind of a group, which decides how it may be closed and what happens when it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Braces: `{...}`.
    Simple,
    /// `\begingroup ... \endgroup`.
    SemiSimple,
    /// The braces of `\hbox{...}`.
    HBox(PackTarget),
    /// The braces of `\vbox{...}`.
    VBox(PackTarget),
    /// One of the three braced lists of `\discretionary`, numbered from 0.
    Discretionary(u8),
    /// The braces of `\halign{...}`.
    Align,
    /// A single cell of an alignment.
    AlignCell,
}

/// The grouped state store.
pub struct Store {
    values: GroupingMap<Location, StoreValue>,
    groups: Vec<GroupKind>,
    config: EngineConfig,
}

impl Store {
    pub fn new(config: EngineConfig) -> Store {
        Store {
            values: Default::default(),
            groups: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reads a location, falling back to its initial value.
    pub fn read(&self, location: Location) -> StoreValue {
        if let Some(value) = self.values.get(&location) {
            return *value;
        }
        match location {
            Location::CatCode(c) => StoreValue::CatCode(CatCode::initial(c)),
            Location::Count(_) => StoreValue::Int(0),
            Location::Dimen(_) => StoreValue::Dimen(Scaled::ZERO),
            Location::Skip(_) => StoreValue::Glue(Glue::default()),
            Location::Int(p) => StoreValue::Int(p.initial(&self.config)),
            Location::DimenParam(p) => StoreValue::Dimen(p.initial(&self.config)),
            Location::GlueParam(p) => StoreValue::Glue(p.initial(&self.config)),
            Location::CurrentFont => StoreValue::Font(FontId::NULL),
        }
    }

    /// Assigns a value.
    ///
    /// A local assignment is undone when the innermost open group ends.
    /// A global assignment is never undone.
    pub fn assign(&mut self, location: Location, value: StoreValue, scope: Scope) {
        self.values.insert(location, value, scope);
    }

    pub fn int(&self, location: Location) -> i32 {
        self.read(location).as_int()
    }

    pub fn dimen(&self, location: Location) -> Scaled {
        self.read(location).as_dimen()
    }

    pub fn glue(&self, location: Location) -> Glue {
        self.read(location).as_glue()
    }

    #[inline]
    pub fn int_param(&self, param: IntParam) -> i32 {
        self.int(Location::Int(param))
    }

    #[inline]
    pub fn dimen_param(&self, param: DimenParam) -> Scaled {
        self.dimen(Location::DimenParam(param))
    }

    #[inline]
    pub fn glue_param(&self, param: GlueParam) -> Glue {
        self.glue(Location::GlueParam(param))
    }

    pub fn cat_code(&self, c: char) -> CatCode {
        match self.read(Location::CatCode(c)) {
            StoreValue::CatCode(cat_code) => cat_code,
            _ => CatCode::initial(c),
        }
    }

    pub fn current_font(&self) -> FontId {
        match self.read(Location::CurrentFont) {
            StoreValue::Font(font) => font,
            _ => FontId::NULL,
        }
    }

    pub fn enter_group(&mut self, kind: GroupKind) {
        self.values.begin_group();
        self.groups.push(kind);
    }

    /// Ends the innermost group, undoing its local assignments, and returns its kind.
    pub fn leave_group(&mut self) -> Result<GroupKind, NoGroupToEndError> {
        let kind = self.groups.pop().ok_or(NoGroupToEndError)?;
        self.values.end_group()?;
        Ok(kind)
    }

    pub fn current_group(&self) -> Option<GroupKind> {
        self.groups.last().copied()
    }

    /// Number of open groups.
    pub fn depth(&self) -> usize {
        self.groups.len()
    }
}

impl lexer::Config for Store {
    #[inline]
    fn cat_code(&self, c: char) -> CatCode {
        Store::cat_code(self, c)
    }

    fn end_line_char(&self) -> Option<char> {
        let n = self.int_param(IntParam::EndLineChar);
        if (0..=255).contains(&n) {
            char::from_u32(n as u32)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::lexer::Config;

    fn store() -> Store {
        Store::new(Default::default())
    }

    #[test]
    fn initial_values() {
        let store = store();
        assert_eq!(store.int(Location::Count(7)), 0);
        assert_eq!(store.int_param(IntParam::Tolerance), 200);
        assert_eq!(store.dimen_param(DimenParam::ParIndent), Scaled::ONE * 20);
        assert_eq!(store.cat_code('%'), CatCode::Comment);
        assert_eq!(store.current_font(), FontId::NULL);
        assert_eq!(store.end_line_char(), Some('\r'));
    }

    #[test]
    fn local_assignment_is_restored() {
        let mut store = store();
        store.assign(Location::Count(1), StoreValue::Int(5), Scope::Local);
        store.enter_group(GroupKind::Simple);
        store.assign(Location::Count(1), StoreValue::Int(6), Scope::Local);
        store.assign(Location::Count(1), StoreValue::Int(7), Scope::Local);
        assert_eq!(store.int(Location::Count(1)), 7);
        assert_eq!(store.leave_group(), Ok(GroupKind::Simple));
        assert_eq!(store.int(Location::Count(1)), 5);
    }

    #[test]
    fn nested_restores_at_every_depth() {
        let mut store = store();
        let loc = Location::Dimen(3);
        for depth in 0..5 {
            store.assign(loc, StoreValue::Dimen(Scaled(depth)), Scope::Local);
            store.enter_group(GroupKind::SemiSimple);
        }
        store.assign(loc, StoreValue::Dimen(Scaled(100)), Scope::Local);
        for depth in (0..5).rev() {
            store.leave_group().unwrap();
            assert_eq!(store.dimen(loc), Scaled(depth));
        }
    }

    #[test]
    fn never_assigned_location_reverts_to_initial() {
        let mut store = store();
        store.enter_group(GroupKind::Simple);
        store.assign(
            Location::Int(IntParam::Tolerance),
            StoreValue::Int(9999),
            Scope::Local,
        );
        store.leave_group().unwrap();
        assert_eq!(store.int_param(IntParam::Tolerance), 200);
    }

    #[test]
    fn global_assignment_survives() {
        let mut store = store();
        store.enter_group(GroupKind::Simple);
        store.enter_group(GroupKind::HBox(PackTarget::Natural));
        store.assign(Location::Count(0), StoreValue::Int(1), Scope::Local);
        store.assign(Location::Count(0), StoreValue::Int(2), Scope::Global);
        store.leave_group().unwrap();
        store.leave_group().unwrap();
        assert_eq!(store.int(Location::Count(0)), 2);
    }

    #[test]
    fn leave_group_without_group() {
        let mut store = store();
        assert_eq!(store.leave_group(), Err(NoGroupToEndError));
        assert_eq!(store.depth(), 0);
    }

    #[test]
    fn catcode_assignment_is_grouped() {
        let mut store = store();
        store.enter_group(GroupKind::Simple);
        store.assign(
            Location::CatCode('@'),
            StoreValue::CatCode(CatCode::Letter),
            Scope::Local,
        );
        assert_eq!(store.cat_code('@'), CatCode::Letter);
        store.leave_group().unwrap();
        assert_eq!(store.cat_code('@'), CatCode::Other);
    }

    #[test]
    fn end_line_char_out_of_range() {
        let mut store = store();
        store.assign(
            Location::Int(IntParam::EndLineChar),
            StoreValue::Int(-1),
            Scope::Local,
        );
        assert_eq!(store.end_line_char(), None);
    }

    #[test]
    fn coercions() {
        let glue = Glue::new(Scaled::ONE * 3, Scaled::ONE, Scaled::ZERO);
        assert_eq!(StoreValue::Glue(glue).as_dimen(), Scaled::ONE * 3);
        assert_eq!(StoreValue::Dimen(Scaled(5)).as_int(), 5);
        assert_eq!(
            StoreValue::Dimen(Scaled::ONE).as_glue(),
            Glue::fixed(Scaled::ONE)
        );
    }
}
