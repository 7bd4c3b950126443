use crate::Scaled;

/// Glue: a natural width plus the ability to stretch and shrink.
///
/// Stretch and shrink each carry an order of infinity.
/// Most glue values in a document are copies of a few parameters,
/// and the struct is small enough that passing it by value is cheaper than sharing it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Glue {
    pub width: Scaled,
    pub stretch: Scaled,
    pub stretch_order: GlueOrder,
    pub shrink: Scaled,
    pub shrink_order: GlueOrder,
}

impl Glue {
    /// Glue with a fixed width and no stretch or shrink.
    pub fn fixed(width: Scaled) -> Glue {
        Glue {
            width,
            ..Default::default()
        }
    }

    /// Glue with finite stretch and shrink.
    pub fn new(width: Scaled, stretch: Scaled, shrink: Scaled) -> Glue {
        Glue {
            width,
            stretch,
            shrink,
            ..Default::default()
        }
    }

    /// Zero-width glue that stretches with the given order, like `\hfil` or `\vfill`.
    pub fn infinite_stretch(order: GlueOrder) -> Glue {
        Glue {
            stretch: Scaled::ONE,
            stretch_order: order,
            ..Default::default()
        }
    }

    /// Returns a copy whose shrink is finite.
    ///
    /// Infinite shrink inside a paragraph would let any amount of material fit on one line.
    pub fn with_finite_shrink(self) -> Glue {
        Glue {
            shrink_order: GlueOrder::Normal,
            ..self
        }
    }

    pub fn has_infinite_shrink(&self) -> bool {
        self.shrink_order != GlueOrder::Normal && self.shrink != Scaled::ZERO
    }

    /// Multiplies every component, leaving the orders unchanged.
    pub fn checked_mul(self, n: i32) -> Option<Glue> {
        let mul = |s: Scaled| s.nx_plus_y(n, Scaled::ZERO).ok();
        Some(Glue {
            width: mul(self.width)?,
            stretch: mul(self.stretch)?,
            shrink: mul(self.shrink)?,
            ..self
        })
    }

    /// Divides every component, leaving the orders unchanged.
    pub fn checked_div(self, n: i32) -> Option<Glue> {
        if n == 0 {
            return None;
        }
        Some(Glue {
            width: self.width / n,
            stretch: self.stretch / n,
            shrink: self.shrink / n,
            ..self
        })
    }
}

impl std::ops::Add<Glue> for Glue {
    type Output = Glue;

    /// Adds two glues.
    ///
    /// Stretch components of different orders do not mix: the higher order wins
    /// and the lower order component is dropped.
    /// Shrink is treated the same way.
    fn add(self, rhs: Glue) -> Glue {
        let (stretch, stretch_order) = add_component(
            (self.stretch, self.stretch_order),
            (rhs.stretch, rhs.stretch_order),
        );
        let (shrink, shrink_order) = add_component(
            (self.shrink, self.shrink_order),
            (rhs.shrink, rhs.shrink_order),
        );
        Glue {
            width: self.width + rhs.width,
            stretch,
            stretch_order,
            shrink,
            shrink_order,
        }
    }
}

fn add_component(a: (Scaled, GlueOrder), b: (Scaled, GlueOrder)) -> (Scaled, GlueOrder) {
    let (a, b) = if a.1 >= b.1 { (a, b) } else { (b, a) };
    if a.1 == b.1 {
        let sum = a.0 + b.0;
        if sum == Scaled::ZERO {
            (sum, GlueOrder::Normal)
        } else {
            (sum, a.1)
        }
    } else if a.0 == Scaled::ZERO {
        b
    } else {
        a
    }
}

impl std::fmt::Display for Glue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.width)?;
        if self.stretch != Scaled::ZERO {
            write!(f, " plus ")?;
            write_component(f, self.stretch, self.stretch_order)?;
        }
        if self.shrink != Scaled::ZERO {
            write!(f, " minus ")?;
            write_component(f, self.shrink, self.shrink_order)?;
        }
        Ok(())
    }
}

fn write_component(
    f: &mut std::fmt::Formatter<'_>,
    value: Scaled,
    order: GlueOrder,
) -> std::fmt::Result {
    match order {
        GlueOrder::Normal => write!(f, "{value}"),
        _ => {
            let s = format!("{value}");
            write!(f, "{}{}", s.trim_end_matches("pt"), order.keyword())
        }
    }
}

/// Order of infinity of a glue stretch or shrink.
///
/// If a list contains glue of some order (say [GlueOrder::Fil]),
/// only glue of that order is stretched or shrunk when the list is set
/// and glue of lower orders keeps its natural width.
/// Centering material between two `\hfil` glues relies on this.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlueOrder {
    #[default]
    Normal,
    Fil,
    Fill,
    Filll,
}

impl GlueOrder {
    /// All orders from finite to most infinite.
    pub const ALL: [GlueOrder; 4] = [
        GlueOrder::Normal,
        GlueOrder::Fil,
        GlueOrder::Fill,
        GlueOrder::Filll,
    ];

    /// Parses an infinite glue order from a keyword.
    pub fn parse(s: &str) -> Option<Self> {
        use GlueOrder::*;
        Some(match s {
            "fil" => Fil,
            "fill" => Fill,
            "filll" => Filll,
            _ => return None,
        })
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            GlueOrder::Normal => "pt",
            GlueOrder::Fil => "fil",
            GlueOrder::Fill => "fill",
            GlueOrder::Filll => "filll",
        }
    }

    /// Index of the order, from 0 for finite to 3 for `filll`.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_sizes() {
        assert_eq!(16, std::mem::size_of::<Glue>());
    }

    #[test]
    fn display() {
        let glue = Glue {
            width: Scaled::ONE * 3,
            stretch: Scaled::ONE,
            stretch_order: GlueOrder::Fil,
            shrink: Scaled::ONE / 2,
            shrink_order: GlueOrder::Normal,
        };
        assert_eq!(format!("{glue}"), "3.0pt plus 1.0fil minus 0.5pt");
    }

    #[test]
    fn add_higher_order_wins() {
        let a = Glue::new(Scaled::ONE, Scaled::ONE, Scaled::ZERO);
        let b = Glue::infinite_stretch(GlueOrder::Fill);
        let sum = a + b;
        assert_eq!(sum.width, Scaled::ONE);
        assert_eq!(sum.stretch, Scaled::ONE);
        assert_eq!(sum.stretch_order, GlueOrder::Fill);
    }

    #[test]
    fn add_same_order() {
        let a = Glue::new(Scaled::ONE, Scaled::ONE, Scaled::ONE);
        let sum = a + a;
        assert_eq!(sum, Glue::new(Scaled::ONE * 2, Scaled::ONE * 2, Scaled::ONE * 2));
    }

    #[test]
    fn finite_shrink() {
        let glue = Glue {
            shrink: Scaled::ONE,
            shrink_order: GlueOrder::Fil,
            ..Default::default()
        };
        assert!(glue.has_infinite_shrink());
        assert!(!glue.with_finite_shrink().has_infinite_shrink());
    }
}
