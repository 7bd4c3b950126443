//! Text rendering of boxes.
//!
//! Boxes are printed one node per line, with nesting shown by leading dots:
//!
//! ```text
//! \vbox(100.0pt+2.0pt)x300.0pt
//! .\glue(\topskip) 3.0pt
//! .\hbox(7.0pt+0.0pt)x300.0pt, glue set 0.5
//! ..\font0 H
//! ```

use std::fmt::{self, Write};

use folio_core::GlueOrder;

use crate::node::{GlueKind, GlueSign, HList, Horizontal, KernKind, Rule, VList, Vertical};

impl fmt::Display for HList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        show_hlist(f, self, 0)
    }
}

impl fmt::Display for VList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        show_vlist(f, self, 0)
    }
}

fn indent(f: &mut dyn Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_char('.')?;
    }
    Ok(())
}

fn show_glue_set(
    f: &mut dyn Write,
    sign: GlueSign,
    ratio: f32,
    order: GlueOrder,
) -> fmt::Result {
    if sign == GlueSign::Normal || ratio == 0.0 {
        return Ok(());
    }
    write!(f, ", glue set ")?;
    if sign == GlueSign::Shrinking {
        write!(f, "- ")?;
    }
    write!(f, "{}", (ratio * 100000.0).round() / 100000.0)?;
    if order != GlueOrder::Normal {
        write!(f, "{}", order.keyword())?;
    }
    Ok(())
}

fn show_hlist(f: &mut dyn Write, b: &HList, depth: usize) -> fmt::Result {
    write!(f, "\\hbox({}+{})x{}", b.height, b.depth, b.width)?;
    show_glue_set(f, b.glue_sign, b.glue_ratio.0, b.glue_order)?;
    if b.shift_amount != folio_core::Scaled::ZERO {
        write!(f, ", shifted {}", b.shift_amount)?;
    }
    for node in &b.list {
        writeln!(f)?;
        indent(f, depth + 1)?;
        show_horizontal(f, node, depth + 1)?;
    }
    Ok(())
}

fn show_vlist(f: &mut dyn Write, b: &VList, depth: usize) -> fmt::Result {
    write!(f, "\\vbox({}+{})x{}", b.height, b.depth, b.width)?;
    show_glue_set(f, b.glue_sign, b.glue_ratio.0, b.glue_order)?;
    if b.shift_amount != folio_core::Scaled::ZERO {
        write!(f, ", shifted {}", b.shift_amount)?;
    }
    for node in &b.list {
        writeln!(f)?;
        indent(f, depth + 1)?;
        show_vertical(f, node, depth + 1)?;
    }
    Ok(())
}

fn show_rule(f: &mut dyn Write, rule: &Rule) -> fmt::Result {
    let dim = |d: Option<folio_core::Scaled>| match d {
        None => "*".to_string(),
        Some(d) => d.to_string(),
    };
    write!(
        f,
        "\\rule({}+{})x{}",
        dim(rule.height),
        dim(rule.depth),
        dim(rule.width)
    )
}

fn show_glue(f: &mut dyn Write, glue: &crate::node::Glue) -> fmt::Result {
    match glue.kind {
        GlueKind::Normal => write!(f, "\\glue {}", glue.value),
        GlueKind::Param(name) => write!(f, "\\glue(\\{name}) {}", glue.value),
    }
}

fn show_list(f: &mut dyn Write, list: &[Horizontal], depth: usize, marker: char) -> fmt::Result {
    for node in list {
        writeln!(f)?;
        indent(f, depth)?;
        f.write_char(marker)?;
        show_horizontal(f, node, depth + 1)?;
    }
    Ok(())
}

fn show_horizontal(f: &mut dyn Write, node: &Horizontal, depth: usize) -> fmt::Result {
    match node {
        Horizontal::Char(c) => write!(f, "\\font{} {}", c.font.0, c.char),
        Horizontal::Ligature(l) => {
            let original: String = l.original.iter().collect();
            write!(f, "\\font{} {} (ligature {original})", l.font.0, l.char)
        }
        Horizontal::HList(b) => show_hlist(f, b, depth),
        Horizontal::VList(b) => show_vlist(f, b, depth),
        Horizontal::Rule(r) => show_rule(f, r),
        Horizontal::Glue(g) => show_glue(f, g),
        Horizontal::Kern(k) => match k.kind {
            KernKind::Normal => write!(f, "\\kern{}", k.width),
            KernKind::Explicit => write!(f, "\\kern {}", k.width),
            KernKind::AccentKern => write!(f, "\\kern {} (for accent)", k.width),
        },
        Horizontal::Penalty(p) => write!(f, "\\penalty {}", p.value),
        Horizontal::Discretionary(d) => {
            write!(f, "\\discretionary")?;
            show_list(f, &d.pre_break, depth, '.')?;
            show_list(f, &d.post_break, depth, '|')?;
            if !d.no_break.is_empty() {
                show_list(f, &d.no_break, depth, '=')?;
            }
            Ok(())
        }
        Horizontal::Whatsit(w) => write!(f, "\\whatsit {}", w.label),
    }
}

fn show_vertical(f: &mut dyn Write, node: &Vertical, depth: usize) -> fmt::Result {
    match node {
        Vertical::HList(b) => show_hlist(f, b, depth),
        Vertical::VList(b) => show_vlist(f, b, depth),
        Vertical::Rule(r) => show_rule(f, r),
        Vertical::Glue(g) => show_glue(f, g),
        Vertical::Kern(k) => write!(f, "\\kern {}", k.width),
        Vertical::Penalty(p) => write!(f, "\\penalty {}", p.value),
        Vertical::Whatsit(w) => write!(f, "\\whatsit {}", w.label),
    }
}
