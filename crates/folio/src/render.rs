//! Backends that print finished pages, as text or as JSON.

use folio_boxes::backend::{Backend, BackendError};
use folio_boxes::node::{
    Discretionary, GlueKind, GlueSign, HList, Horizontal, KernKind, Rule, VList, Vertical,
};
use folio_core::{Glue, GlueOrder, Scaled};
use serde_json::{json, Value};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// One node per line, with nesting shown by leading dots
    Text,
    /// A JSON array with one object per page; distances are in scaled points
    Json,
}

/// Prints each page as text when it is received.
pub struct TextBackend<W> {
    out: W,
}

impl<W: Write> TextBackend<W> {
    pub fn new(out: W) -> Self {
        TextBackend { out }
    }
}

impl<W: Write> Backend for TextBackend<W> {
    fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError> {
        log::info!("shipping page {page_number}");
        writeln!(self.out, "% page {page_number}")?;
        writeln!(self.out, "{page}")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        self.out.flush()?;
        Ok(())
    }
}

/// Collects pages as JSON and prints them as one array when the document is finished.
pub struct JsonBackend<W> {
    out: W,
    pages: Vec<Value>,
}

impl<W: Write> JsonBackend<W> {
    pub fn new(out: W) -> Self {
        JsonBackend { out, pages: vec![] }
    }
}

impl<W: Write> Backend for JsonBackend<W> {
    fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError> {
        log::info!("shipping page {page_number}");
        self.pages.push(json!({
            "page": page_number,
            "box": vlist(&page),
        }));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        let pages = std::mem::take(&mut self.pages);
        serde_json::to_writer_pretty(&mut self.out, &Value::Array(pages))?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Returns a backend for the given format that writes to `out`.
pub fn new_backend<W: Write + 'static>(format: Format, out: W) -> Box<dyn Backend> {
    match format {
        Format::Text => Box::new(TextBackend::new(out)),
        Format::Json => Box::new(JsonBackend::new(out)),
    }
}

fn order(order: GlueOrder) -> &'static str {
    match order {
        GlueOrder::Normal => "normal",
        GlueOrder::Fil => "fil",
        GlueOrder::Fill => "fill",
        GlueOrder::Filll => "filll",
    }
}

fn glue_set(sign: GlueSign, ratio: f32, glue_order: GlueOrder) -> Value {
    match sign {
        GlueSign::Normal => Value::Null,
        GlueSign::Stretching | GlueSign::Shrinking => json!({
            "sign": if sign == GlueSign::Stretching { "stretching" } else { "shrinking" },
            "ratio": ratio,
            "order": order(glue_order),
        }),
    }
}

fn hlist(b: &HList) -> Value {
    json!({
        "type": "hbox",
        "width": b.width.0,
        "height": b.height.0,
        "depth": b.depth.0,
        "shift": b.shift_amount.0,
        "glue_set": glue_set(b.glue_sign, b.glue_ratio.0, b.glue_order),
        "list": horizontal_list(&b.list),
    })
}

fn vlist(b: &VList) -> Value {
    json!({
        "type": "vbox",
        "width": b.width.0,
        "height": b.height.0,
        "depth": b.depth.0,
        "shift": b.shift_amount.0,
        "glue_set": glue_set(b.glue_sign, b.glue_ratio.0, b.glue_order),
        "list": b.list.iter().map(vertical).collect::<Vec<_>>(),
    })
}

fn rule(r: &Rule) -> Value {
    let dimen = |d: Option<Scaled>| d.map(|d| d.0);
    json!({
        "type": "rule",
        "width": dimen(r.width),
        "height": dimen(r.height),
        "depth": dimen(r.depth),
    })
}

fn glue(kind: GlueKind, g: &Glue) -> Value {
    json!({
        "type": "glue",
        "param": match kind {
            GlueKind::Normal => None,
            GlueKind::Param(name) => Some(name),
        },
        "width": g.width.0,
        "stretch": g.stretch.0,
        "stretch_order": order(g.stretch_order),
        "shrink": g.shrink.0,
        "shrink_order": order(g.shrink_order),
    })
}

fn kern(kind: KernKind, width: Scaled) -> Value {
    json!({
        "type": "kern",
        "kind": match kind {
            KernKind::Normal => "font",
            KernKind::Explicit => "explicit",
            KernKind::AccentKern => "accent",
        },
        "width": width.0,
    })
}

fn whatsit(w: &folio_boxes::node::Whatsit) -> Value {
    json!({
        "type": "whatsit",
        "label": w.label,
        "text": w.payload::<String>(),
    })
}

fn discretionary(d: &Discretionary) -> Value {
    json!({
        "type": "discretionary",
        "pre_break": horizontal_list(&d.pre_break),
        "post_break": horizontal_list(&d.post_break),
        "no_break": horizontal_list(&d.no_break),
    })
}

fn horizontal_list(list: &[Horizontal]) -> Vec<Value> {
    list.iter().map(horizontal).collect()
}

fn horizontal(node: &Horizontal) -> Value {
    match node {
        Horizontal::Char(c) => json!({
            "type": "char",
            "char": c.char.to_string(),
            "font": c.font.0,
            "width": c.width.0,
            "height": c.height.0,
            "depth": c.depth.0,
        }),
        Horizontal::Ligature(l) => json!({
            "type": "ligature",
            "char": l.char.to_string(),
            "original": l.original.iter().collect::<String>(),
            "font": l.font.0,
            "width": l.width.0,
            "height": l.height.0,
            "depth": l.depth.0,
        }),
        Horizontal::HList(b) => hlist(b),
        Horizontal::VList(b) => vlist(b),
        Horizontal::Rule(r) => rule(r),
        Horizontal::Glue(g) => glue(g.kind, &g.value),
        Horizontal::Kern(k) => kern(k.kind, k.width),
        Horizontal::Penalty(p) => json!({"type": "penalty", "value": p.value}),
        Horizontal::Discretionary(d) => discretionary(d),
        Horizontal::Whatsit(w) => whatsit(w),
    }
}

fn vertical(node: &Vertical) -> Value {
    match node {
        Vertical::HList(b) => hlist(b),
        Vertical::VList(b) => vlist(b),
        Vertical::Rule(r) => rule(r),
        Vertical::Glue(g) => glue(g.kind, &g.value),
        Vertical::Kern(k) => kern(k.kind, k.width),
        Vertical::Penalty(p) => json!({"type": "penalty", "value": p.value}),
        Vertical::Whatsit(w) => whatsit(w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_boxes::node;
    use folio_core::FontId;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A writer whose output can be read after it has been moved into a backend.
    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    fn page() -> VList {
        let line = HList {
            width: Scaled::ONE * 10,
            list: vec![
                Horizontal::Char(node::Char {
                    char: 'a',
                    font: FontId(1),
                    width: Scaled::ONE * 5,
                    height: Scaled::ONE * 7,
                    depth: Scaled::ZERO,
                }),
                Horizontal::Kern(node::Kern {
                    kind: KernKind::Explicit,
                    width: Scaled::ONE * 5,
                }),
            ],
            ..Default::default()
        };
        VList {
            list: vec![
                Vertical::Glue(node::Glue::param("topskip", Glue::fixed(Scaled::ONE * 3))),
                Vertical::HList(line),
                Vertical::Whatsit(node::Whatsit::new("special", "color red".to_string())),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn json_pages() {
        let out = Shared::default();
        let mut backend = JsonBackend::new(out.clone());
        backend.receive(1, page()).unwrap();
        backend.receive(2, VList::default()).unwrap();
        backend.finish().unwrap();
        let value: Value = serde_json::from_str(&out.contents()).unwrap();
        let pages = value.as_array().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1]["page"], 2);
        let list = &pages[0]["box"]["list"];
        assert_eq!(list[0]["param"], "topskip");
        assert_eq!(list[0]["width"], 3 * 65536);
        assert_eq!(list[1]["list"][0]["char"], "a");
        assert_eq!(list[1]["list"][1]["kind"], "explicit");
        assert_eq!(list[2]["text"], "color red");
    }

    #[test]
    fn json_running_rule() {
        let value = rule(&Rule {
            width: None,
            height: Some(Scaled::ONE),
            depth: Some(Scaled::ZERO),
        });
        assert_eq!(value["width"], Value::Null);
        assert_eq!(value["height"], 65536);
    }

    #[test]
    fn text_pages() {
        let out = Shared::default();
        let mut backend = TextBackend::new(out.clone());
        backend.receive(1, page()).unwrap();
        backend.finish().unwrap();
        let contents = out.contents();
        assert!(contents.starts_with("% page 1\n\\vbox"));
        assert!(contents.contains(".\\glue(\\topskip) 3.0pt"));
    }
}
