//! Data structures for boxes and their friends.
//!
//! A node list is a `Vec` of nodes.
//! Nodes are moved between lists and never shared:
//! a box exclusively owns the list inside it.
//! Horizontal and vertical lists have different node types, [Horizontal] and [Vertical],
//! because some nodes (characters, discretionaries) only make sense in one direction.
use std::any::Any;
use std::rc::Rc;

use folio_core::FontId;
use folio_core::GlueOrder;
use folio_core::Scaled;

/// Horizontal node.
#[derive(Debug, Clone, PartialEq)]
pub enum Horizontal {
    Char(Char),
    Ligature(Ligature),
    HList(HList),
    VList(VList),
    Rule(Rule),
    Glue(Glue),
    Kern(Kern),
    Penalty(Penalty),
    Discretionary(Discretionary),
    Whatsit(Whatsit),
}

/// Vertical node.
#[derive(Debug, Clone, PartialEq)]
pub enum Vertical {
    HList(HList),
    VList(VList),
    Rule(Rule),
    Glue(Glue),
    Kern(Kern),
    Penalty(Penalty),
    Whatsit(Whatsit),
}

/// A character in a specific font.
///
/// The dimensions are copied from the font metrics when the node is built,
/// so packaging and breaking never need to consult the font again.
#[derive(Debug, Clone, PartialEq)]
pub struct Char {
    pub char: char,
    pub font: FontId,
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
}

/// A ligature: one glyph standing for several characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Ligature {
    pub char: char,
    pub font: FontId,
    /// The characters that were replaced by the ligature.
    pub original: Vec<char>,
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
}

/// A box made from a horizontal list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HList {
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
    /// How much this box should be lowered (if it appears in a horizontal list),
    /// or how much it should be moved to the right (if it appears in a vertical list).
    pub shift_amount: Scaled,
    pub list: Vec<Horizontal>,
    pub glue_ratio: GlueRatio,
    pub glue_sign: GlueSign,
    pub glue_order: GlueOrder,
}

/// A box made from a vertical list.
///
/// The same as [HList], except the list inside holds [Vertical] nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VList {
    pub width: Scaled,
    pub height: Scaled,
    pub depth: Scaled,
    pub shift_amount: Scaled,
    pub list: Vec<Vertical>,
    pub glue_ratio: GlueRatio,
    pub glue_sign: GlueSign,
    pub glue_order: GlueOrder,
}

/// Ratio by which glue in a box stretches or shrinks.
///
/// This is the one floating point number in the node model.
/// Breaking decisions never depend on it: it only says how to render a box whose
/// size is already fixed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlueRatio(pub f32);

/// Whether the glue in a box is stretching, shrinking, or at its natural size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlueSign {
    Stretching,
    Shrinking,
    #[default]
    Normal,
}

/// A solid black rectangle.
///
/// A dimension that is `None` is running: it extends to the boundary of the
/// innermost enclosing box.
/// The width is never running in a horizontal list;
/// the height and depth are never running in a vertical list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rule {
    pub width: Option<Scaled>,
    pub height: Option<Scaled>,
    pub depth: Option<Scaled>,
}

/// A piece of glue.
#[derive(Debug, Clone, PartialEq)]
pub struct Glue {
    pub kind: GlueKind,
    pub value: folio_core::Glue,
}

impl Glue {
    pub fn new(value: folio_core::Glue) -> Glue {
        Glue {
            kind: GlueKind::Normal,
            value,
        }
    }

    /// Glue coming from a named parameter like `\baselineskip`.
    pub fn param(name: &'static str, value: folio_core::Glue) -> Glue {
        Glue {
            kind: GlueKind::Param(name),
            value,
        }
    }
}

/// Where a glue node came from.
///
/// Only used when displaying lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlueKind {
    Normal,
    Param(&'static str),
}

/// A kern: fixed space that is never a breakpoint unless followed by glue.
#[derive(Debug, Clone, PartialEq)]
pub struct Kern {
    pub kind: KernKind,
    pub width: Scaled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernKind {
    /// Inserted from font information.
    Normal,
    /// Inserted by a `\kern` command.
    Explicit,
    /// Positions an accent over a character.
    AccentKern,
}

/// A penalty: the cost of breaking at this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Penalty {
    pub value: i32,
}

impl Penalty {
    /// A penalty this large or larger forbids a break.
    pub const INFINITE: i32 = 10000;

    /// A penalty this small or smaller forces a break.
    pub const EJECT: i32 = -10000;

    /// Creates a penalty, clamping the value to `[EJECT, INFINITE]`.
    pub fn new(value: i32) -> Penalty {
        Penalty {
            value: value.clamp(Penalty::EJECT, Penalty::INFINITE),
        }
    }
}

/// A discretionary break.
///
/// If the line is broken here, the pre-break material ends the line and the
/// post-break material begins the next one.
/// Otherwise the no-break material is typeset in place.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Discretionary {
    pub pre_break: Vec<Horizontal>,
    pub post_break: Vec<Horizontal>,
    pub no_break: Vec<Horizontal>,
}

/// An opaque node for the backend.
///
/// Layout never looks inside a whatsit: it has no size and is never a breakpoint.
/// The label is only used when displaying lists.
#[derive(Clone)]
pub struct Whatsit {
    pub label: String,
    pub payload: Rc<dyn Any>,
}

impl Whatsit {
    pub fn new<T: Any>(label: &str, payload: T) -> Whatsit {
        Whatsit {
            label: label.to_string(),
            payload: Rc::new(payload),
        }
    }

    /// Returns the payload if it has type `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl std::fmt::Debug for Whatsit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Whatsit")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Whatsit {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && Rc::ptr_eq(&self.payload, &other.payload)
    }
}

impl Horizontal {
    /// Whether a glue node that comes right after this node is a legal breakpoint.
    pub fn precedes_break(&self) -> bool {
        use Horizontal::*;
        matches!(
            self,
            Char(_) | Ligature(_) | HList(_) | VList(_) | Rule(_) | Discretionary(_) | Whatsit(_)
        )
    }

    /// Whether this node survives at the start of a line after a break.
    ///
    /// Glue, penalties and explicit kerns following a break are discarded.
    pub fn is_discardable(&self) -> bool {
        use Horizontal::*;
        match self {
            Glue(_) | Penalty(_) => true,
            Kern(kern) => kern.kind == KernKind::Explicit,
            _ => false,
        }
    }

    /// Natural width of the node.
    ///
    /// A discretionary counts as its no-break material.
    pub fn width(&self) -> Scaled {
        use Horizontal::*;
        match self {
            Char(c) => c.width,
            Ligature(l) => l.width,
            HList(b) => b.width,
            VList(b) => b.width,
            Rule(r) => r.width.unwrap_or_default(),
            Glue(g) => g.value.width,
            Kern(k) => k.width,
            Discretionary(d) => d.no_break.iter().map(Horizontal::width).sum(),
            Penalty(_) | Whatsit(_) => Scaled::ZERO,
        }
    }
}

impl Vertical {
    /// Whether a glue node that comes right after this node is a legal breakpoint.
    pub fn precedes_break(&self) -> bool {
        use Vertical::*;
        matches!(self, HList(_) | VList(_) | Rule(_) | Whatsit(_))
    }

    /// Height and depth of a box or rule, if the node is one.
    pub fn box_dimensions(&self) -> Option<(Scaled, Scaled)> {
        match self {
            Vertical::HList(b) => Some((b.height, b.depth)),
            Vertical::VList(b) => Some((b.height, b.depth)),
            Vertical::Rule(r) => Some((
                r.height.unwrap_or_default(),
                r.depth.unwrap_or_default(),
            )),
            _ => None,
        }
    }
}

impl From<HList> for Horizontal {
    fn from(value: HList) -> Self {
        Horizontal::HList(value)
    }
}

impl From<VList> for Horizontal {
    fn from(value: VList) -> Self {
        Horizontal::VList(value)
    }
}

impl From<HList> for Vertical {
    fn from(value: HList) -> Self {
        Vertical::HList(value)
    }
}

impl From<VList> for Vertical {
    fn from(value: VList) -> Self {
        Vertical::VList(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_is_clamped() {
        assert_eq!(Penalty::new(20000).value, Penalty::INFINITE);
        assert_eq!(Penalty::new(-20000).value, Penalty::EJECT);
        assert_eq!(Penalty::new(50).value, 50);
    }

    #[test]
    fn discretionary_width_is_no_break_width() {
        let c = |w: i32| {
            Horizontal::Char(Char {
                char: 'x',
                font: FontId::NULL,
                width: Scaled::ONE * w,
                height: Scaled::ZERO,
                depth: Scaled::ZERO,
            })
        };
        let disc = Horizontal::Discretionary(Discretionary {
            pre_break: vec![c(1)],
            post_break: vec![c(2)],
            no_break: vec![c(3), c(4)],
        });
        assert_eq!(disc.width(), Scaled::ONE * 7);
    }

    #[test]
    fn whatsit_payload() {
        let whatsit = Whatsit::new("special", "color red".to_string());
        assert_eq!(
            whatsit.payload::<String>().map(String::as_str),
            Some("color red")
        );
        assert_eq!(whatsit.payload::<i32>(), None);
        assert_eq!(whatsit.clone(), whatsit);
    }

    #[test]
    fn explicit_kerns_are_discardable() {
        let explicit = Horizontal::Kern(Kern {
            kind: KernKind::Explicit,
            width: Scaled::ONE,
        });
        let font = Horizontal::Kern(Kern {
            kind: KernKind::Normal,
            width: Scaled::ONE,
        });
        assert!(explicit.is_discardable());
        assert!(!font.is_discardable());
    }
}
