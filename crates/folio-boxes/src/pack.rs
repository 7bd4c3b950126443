//! Packaging: building boxes from lists and setting their glue.
//!
//! Packaging measures a list, decides how much the glue inside must stretch or shrink
//! to reach the target size, and records the result in the box.
//! It also reports boxes that came out badly: underfull, loose, tight or overfull.

use folio_core::{badness, GlueOrder, Scaled, INF_BAD};

use crate::node::{GlueRatio, GlueSign, HList, Horizontal, VList, Vertical};

/// Target size of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackTarget {
    /// The natural size of the list.
    #[default]
    Natural,
    /// Exactly this size, as in `\hbox to 10pt`.
    Exactly(Scaled),
    /// The natural size plus this amount, as in `\hbox spread 10pt`.
    Additional(Scaled),
}

impl PackTarget {
    fn resolve(self, natural: Scaled) -> Scaled {
        match self {
            PackTarget::Natural => natural,
            PackTarget::Exactly(size) => size,
            PackTarget::Additional(extra) => natural + extra,
        }
    }
}

/// Thresholds controlling which boxes are reported.
///
/// These play the role of `\hbadness` and `\hfuzz` (or `\vbadness` and `\vfuzz`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackLimits {
    /// Boxes with badness above this are reported as underfull, loose or tight.
    pub badness: i32,
    /// Boxes overfull by more than this are reported.
    pub fuzz: Scaled,
}

impl Default for PackLimits {
    fn default() -> Self {
        PackLimits {
            badness: 1000,
            fuzz: Scaled(6554),
        }
    }
}

impl PackLimits {
    /// Limits under which nothing is ever reported.
    pub const SILENT: PackLimits = PackLimits {
        badness: INF_BAD,
        fuzz: Scaled::MAX_DIMEN,
    };
}

/// A packaged box, together with how well it fit.
#[derive(Debug, Clone, PartialEq)]
pub struct Packed<T> {
    pub node: T,
    /// Badness of the glue setting.
    ///
    /// An overfull box has badness [OVERFULL_BADNESS].
    pub badness: i32,
    pub warning: Option<BoxWarning>,
}

/// Badness assigned to a box whose glue cannot shrink enough.
pub const OVERFULL_BADNESS: i32 = 1_000_000;

/// Something wrong with a packaged box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxWarning {
    pub vertical: bool,
    pub problem: BoxProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxProblem {
    Underfull { badness: i32 },
    Loose { badness: i32 },
    Tight { badness: i32 },
    Overfull { excess: Scaled },
}

impl std::fmt::Display for BoxWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = if self.vertical { "\\vbox" } else { "\\hbox" };
        match self.problem {
            BoxProblem::Underfull { badness } => write!(f, "Underfull {b} (badness {badness})"),
            BoxProblem::Loose { badness } => write!(f, "Loose {b} (badness {badness})"),
            BoxProblem::Tight { badness } => write!(f, "Tight {b} (badness {badness})"),
            BoxProblem::Overfull { excess } => {
                let dir = if self.vertical { "high" } else { "wide" };
                write!(f, "Overfull {b} ({excess} too {dir})")
            }
        }
    }
}

/// Totals of stretch or shrink, one per order of infinity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderTotals(pub [Scaled; 4]);

impl OrderTotals {
    pub fn add(&mut self, amount: Scaled, order: GlueOrder) {
        self.0[order.index()] += amount;
    }

    /// The highest order with a non-zero total.
    pub fn highest_order(&self) -> GlueOrder {
        for order in GlueOrder::ALL.into_iter().rev() {
            if self.0[order.index()] != Scaled::ZERO {
                return order;
            }
        }
        GlueOrder::Normal
    }

    pub fn get(&self, order: GlueOrder) -> Scaled {
        self.0[order.index()]
    }
}

impl std::ops::Add for OrderTotals {
    type Output = OrderTotals;
    fn add(self, rhs: OrderTotals) -> OrderTotals {
        let mut out = self;
        for i in 0..4 {
            out.0[i] += rhs.0[i];
        }
        out
    }
}

impl std::ops::Sub for OrderTotals {
    type Output = OrderTotals;
    fn sub(self, rhs: OrderTotals) -> OrderTotals {
        let mut out = self;
        for i in 0..4 {
            out.0[i] -= rhs.0[i];
        }
        out
    }
}

/// Measurement of a list prior to packaging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Width for horizontal lists, height for vertical lists.
    pub size: Scaled,
    /// Height for horizontal lists, width for vertical lists.
    pub cross: Scaled,
    pub depth: Scaled,
    pub stretch: OrderTotals,
    pub shrink: OrderTotals,
}

fn max_with(current: &mut Scaled, candidate: Scaled) {
    if candidate > *current {
        *current = candidate;
    }
}

/// Measures a horizontal list.
pub fn measure_hlist(list: &[Horizontal]) -> Measurement {
    let mut m: Measurement = Default::default();
    for node in list {
        measure_horizontal_node(node, &mut m);
    }
    m
}

fn measure_horizontal_node(node: &Horizontal, m: &mut Measurement) {
    match node {
        Horizontal::Char(c) => {
            m.size += c.width;
            max_with(&mut m.cross, c.height);
            max_with(&mut m.depth, c.depth);
        }
        Horizontal::Ligature(l) => {
            m.size += l.width;
            max_with(&mut m.cross, l.height);
            max_with(&mut m.depth, l.depth);
        }
        Horizontal::HList(HList {
            width,
            height,
            depth,
            shift_amount,
            ..
        })
        | Horizontal::VList(VList {
            width,
            height,
            depth,
            shift_amount,
            ..
        }) => {
            m.size += *width;
            max_with(&mut m.cross, *height - *shift_amount);
            max_with(&mut m.depth, *depth + *shift_amount);
        }
        Horizontal::Rule(rule) => {
            m.size += rule.width.unwrap_or_default();
            // Running dimensions take the size of the box, so they do not contribute.
            if let Some(height) = rule.height {
                max_with(&mut m.cross, height);
            }
            if let Some(depth) = rule.depth {
                max_with(&mut m.depth, depth);
            }
        }
        Horizontal::Glue(glue) => {
            m.size += glue.value.width;
            m.stretch.add(glue.value.stretch, glue.value.stretch_order);
            m.shrink.add(glue.value.shrink, glue.value.shrink_order);
        }
        Horizontal::Kern(kern) => {
            m.size += kern.width;
        }
        Horizontal::Discretionary(disc) => {
            for node in &disc.no_break {
                measure_horizontal_node(node, m);
            }
        }
        Horizontal::Penalty(_) | Horizontal::Whatsit(_) => {}
    }
}

/// Measures a vertical list.
///
/// The returned size is the height of the list not including the depth of the last box.
pub fn measure_vlist(list: &[Vertical]) -> Measurement {
    let mut m: Measurement = Default::default();
    let mut d = Scaled::ZERO;
    for node in list {
        match node {
            Vertical::HList(HList {
                width,
                height,
                depth,
                shift_amount,
                ..
            })
            | Vertical::VList(VList {
                width,
                height,
                depth,
                shift_amount,
                ..
            }) => {
                m.size += d + *height;
                d = *depth;
                max_with(&mut m.cross, *width + *shift_amount);
            }
            Vertical::Rule(rule) => {
                m.size += d + rule.height.unwrap_or_default();
                d = rule.depth.unwrap_or_default();
                if let Some(width) = rule.width {
                    max_with(&mut m.cross, width);
                }
            }
            Vertical::Glue(glue) => {
                m.size += d + glue.value.width;
                d = Scaled::ZERO;
                m.stretch.add(glue.value.stretch, glue.value.stretch_order);
                m.shrink.add(glue.value.shrink, glue.value.shrink_order);
            }
            Vertical::Kern(kern) => {
                m.size += d + kern.width;
                d = Scaled::ZERO;
            }
            Vertical::Penalty(_) | Vertical::Whatsit(_) => {}
        }
    }
    m.depth = d;
    m
}

/// Result of setting glue.
#[derive(Debug, Clone, Copy, PartialEq)]
struct GlueSet {
    ratio: GlueRatio,
    sign: GlueSign,
    order: GlueOrder,
    badness: i32,
    problem: Option<BoxProblem>,
}

/// Determines the glue setting needed to change a list's size by `x`.
fn set_glue(x: Scaled, m: &Measurement, non_empty: bool, limits: &PackLimits) -> GlueSet {
    let mut set = GlueSet {
        ratio: GlueRatio(0.0),
        sign: GlueSign::Normal,
        order: GlueOrder::Normal,
        badness: 0,
        problem: None,
    };
    if x == Scaled::ZERO {
        return set;
    }
    if x > Scaled::ZERO {
        let order = m.stretch.highest_order();
        let total = m.stretch.get(order);
        set.order = order;
        if total != Scaled::ZERO {
            set.sign = GlueSign::Stretching;
            set.ratio = GlueRatio(x.0 as f32 / total.0 as f32);
        }
        if order == GlueOrder::Normal && non_empty {
            set.badness = badness(x, total);
            if set.badness > limits.badness {
                set.problem = Some(if set.badness > 100 {
                    BoxProblem::Underfull {
                        badness: set.badness,
                    }
                } else {
                    BoxProblem::Loose {
                        badness: set.badness,
                    }
                });
            }
        }
        return set;
    }
    let shortfall = -x;
    let order = m.shrink.highest_order();
    let total = m.shrink.get(order);
    set.order = order;
    if total != Scaled::ZERO {
        set.sign = GlueSign::Shrinking;
        set.ratio = GlueRatio(shortfall.0 as f32 / total.0 as f32);
    }
    if order == GlueOrder::Normal && non_empty {
        if total < shortfall {
            // Glue never shrinks below its natural width minus its shrink.
            set.badness = OVERFULL_BADNESS;
            set.ratio = GlueRatio(1.0);
            let excess = shortfall - total;
            if excess > limits.fuzz || limits.badness < 100 {
                set.problem = Some(BoxProblem::Overfull { excess });
            }
        } else {
            set.badness = badness(shortfall, total);
            if set.badness > limits.badness {
                set.problem = Some(BoxProblem::Tight {
                    badness: set.badness,
                });
            }
        }
    }
    set
}

/// Packages a horizontal list into a box.
pub fn hpack(list: Vec<Horizontal>, target: PackTarget, limits: &PackLimits) -> Packed<HList> {
    let m = measure_hlist(&list);
    let width = target.resolve(m.size);
    let set = set_glue(width - m.size, &m, !list.is_empty(), limits);
    let warning = set.problem.map(|problem| BoxWarning {
        vertical: false,
        problem,
    });
    if let Some(warning) = &warning {
        log::debug!("{warning}");
    }
    Packed {
        node: HList {
            width,
            height: m.cross,
            depth: m.depth,
            shift_amount: Scaled::ZERO,
            list,
            glue_ratio: set.ratio,
            glue_sign: set.sign,
            glue_order: set.order,
        },
        badness: set.badness,
        warning,
    }
}

/// Packages a vertical list into a box.
///
/// If the depth of the last box exceeds `max_depth`, the excess moves into the height.
pub fn vpack(
    list: Vec<Vertical>,
    target: PackTarget,
    max_depth: Scaled,
    limits: &PackLimits,
) -> Packed<VList> {
    let mut m = measure_vlist(&list);
    if m.depth > max_depth {
        m.size += m.depth - max_depth;
        m.depth = max_depth;
    }
    let height = target.resolve(m.size);
    let set = set_glue(height - m.size, &m, !list.is_empty(), limits);
    let warning = set.problem.map(|problem| BoxWarning {
        vertical: true,
        problem,
    });
    if let Some(warning) = &warning {
        log::debug!("{warning}");
    }
    Packed {
        node: VList {
            width: m.cross,
            height,
            depth: m.depth,
            shift_amount: Scaled::ZERO,
            list,
            glue_ratio: set.ratio,
            glue_sign: set.sign,
            glue_order: set.order,
        },
        badness: set.badness,
        warning,
    }
}
