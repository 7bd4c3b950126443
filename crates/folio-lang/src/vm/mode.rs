//! List building.
//!
//! The VM builds material in a stack of modes.
//! The outermost mode is the page's vertical list; paragraphs, boxes,
//!     discretionaries and alignments each push a new mode for their contents.
//! When a mode ends, its list is broken into lines or packaged into a box and
//!     appended to the list of the enclosing mode.

use super::{page_params, BackendFailedError, ExecutionInput, FolioState, TokenStream, VM};
use crate::diagnostics::{Diagnostic, Severity};
use crate::error;
use crate::prelude as fl;
use crate::store::{DimenParam, GlueParam, GroupKind, IntParam};
use crate::token::{Token, Value};
use folio_boxes::ligkern;
use folio_boxes::linebreak::{self, FitnessThresholds, LineBreakParams, LineWidths};
use folio_boxes::node::{self, Discretionary, HList, Horizontal, Penalty, Vertical};
use folio_boxes::pack::{self, PackLimits, PackTarget};
use folio_core::Scaled;
use folio_stdext::collections::nevec::NeVec;

/// A list-building mode.
#[derive(Debug)]
pub enum Mode {
    /// Vertical mode: the page (outermost) or the contents of a `\vbox`.
    Vertical {
        list: Vec<Vertical>,
        /// Depth of the last box in the list, or [None] if interline glue should be
        ///     suppressed before the next box.
        prev_depth: Option<Scaled>,
        internal: bool,
    },
    /// Horizontal mode: a paragraph, or the contents of an `\hbox` if restricted.
    Horizontal {
        list: Vec<Horizontal>,
        restricted: bool,
    },
    /// The rows of an `\halign`.
    Alignment {
        rows: Vec<Vec<HList>>,
        /// Cells of the row being built.
        row: Vec<HList>,
    },
}

impl Mode {
    fn outer_vertical() -> Mode {
        Mode::Vertical {
            list: vec![],
            prev_depth: None,
            internal: false,
        }
    }

    pub fn is_vertical(&self) -> bool {
        matches!(self, Mode::Vertical { .. })
    }

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Mode::Horizontal { .. })
    }
}

/// The stack of modes.
///
/// The stack is never empty: its bottom is the outer vertical mode.
#[derive(Debug)]
pub struct ModeStack {
    modes: NeVec<Mode>,
    // Finished lists of the \discretionary commands being read, innermost last.
    discretionary_parts: Vec<Vec<Horizontal>>,
}

impl Default for ModeStack {
    fn default() -> Self {
        ModeStack::new()
    }
}

impl ModeStack {
    pub fn new() -> ModeStack {
        ModeStack {
            modes: NeVec::new(Mode::outer_vertical()),
            discretionary_parts: vec![],
        }
    }

    pub fn current(&self) -> &Mode {
        self.modes.last()
    }

    pub fn current_mut(&mut self) -> &mut Mode {
        self.modes.last_mut()
    }

    pub fn push(&mut self, mode: Mode) {
        self.modes.push(mode)
    }

    /// Pops the current mode; the outer vertical mode is never popped.
    pub fn pop(&mut self) -> Option<Mode> {
        self.modes.pop()
    }

    /// Number of modes, including the outer vertical mode.
    pub fn depth(&self) -> usize {
        self.modes.len()
    }

    pub fn is_outer_vertical(&self) -> bool {
        self.modes.len() == 1
    }

    /// The outermost vertical list: material not yet moved to the page builder.
    pub fn outer_list(&self) -> &[Vertical] {
        match self.modes.first() {
            Mode::Vertical { list, .. } => list,
            Mode::Horizontal { .. } | Mode::Alignment { .. } => &[],
        }
    }
}

impl<S: FolioState> VM<S> {
    /// Starts a paragraph.
    ///
    /// In vertical mode this appends `\parskip` glue and pushes horizontal mode.
    /// In horizontal mode only the indentation box is added.
    pub(crate) fn begin_paragraph(&mut self, indent: bool) {
        if self.modes.current().is_vertical() {
            let parskip = self.store.glue_param(GlueParam::ParSkip);
            if let Mode::Vertical { list, .. } = self.modes.current_mut() {
                list.push(Vertical::Glue(node::Glue::param(
                    GlueParam::ParSkip.name(),
                    parskip,
                )));
            }
            self.modes.push(Mode::Horizontal {
                list: vec![],
                restricted: false,
            });
        }
        if indent {
            let width = self.store.dimen_param(DimenParam::ParIndent);
            self.push_horizontal(Horizontal::HList(HList {
                width,
                ..Default::default()
            }));
        }
    }

    pub(crate) fn ensure_horizontal(&mut self) {
        if !self.modes.current().is_horizontal() {
            self.begin_paragraph(true);
        }
    }

    /// Appends a character in the current font, starting a paragraph if needed.
    pub(crate) fn add_character(&mut self, c: char) {
        let font = self.store.current_font();
        let node = node::Char {
            char: c,
            font,
            width: self.fonts.width_of(font, c),
            height: self.fonts.height_of(font, c),
            depth: self.fonts.depth_of(font, c),
        };
        self.append_horizontal(Horizontal::Char(node));
    }

    /// Appends interword glue; spaces are ignored outside of horizontal mode.
    pub(crate) fn add_space(&mut self) {
        if self.modes.current().is_horizontal() {
            let glue = self.fonts.interword_glue(self.store.current_font());
            self.push_horizontal(Horizontal::Glue(node::Glue::new(glue)));
        }
    }

    pub(crate) fn append_horizontal(&mut self, node: Horizontal) {
        self.ensure_horizontal();
        self.push_horizontal(node);
    }

    fn push_horizontal(&mut self, node: Horizontal) {
        if let Mode::Horizontal { list, .. } = self.modes.current_mut() {
            list.push(node);
        }
    }

    pub(crate) fn append_vertical(&mut self, token: Token, node: Vertical) -> fl::Result<()> {
        match self.modes.current() {
            Mode::Horizontal {
                restricted: false, ..
            } => self.end_paragraph()?,
            Mode::Horizontal {
                restricted: true, ..
            }
            | Mode::Alignment { .. } => {
                return Err(error::SimpleTokenError::new(
                    token,
                    "vertical material cannot appear in a horizontal box",
                )
                .with_note(r"use \vbox to put vertical material inside a horizontal list")
                .into());
            }
            Mode::Vertical { .. } => {}
        }
        let is_penalty = matches!(node, Vertical::Penalty(_));
        match node {
            Vertical::HList(_) | Vertical::VList(_) => self.append_box_vertical(node),
            Vertical::Rule(_) => {
                if let Mode::Vertical {
                    list, prev_depth, ..
                } = self.modes.current_mut()
                {
                    list.push(node);
                    *prev_depth = None;
                }
            }
            _ => {
                if let Mode::Vertical { list, .. } = self.modes.current_mut() {
                    list.push(node);
                }
            }
        }
        if is_penalty {
            self.build_page()?;
        }
        Ok(())
    }

    /// Appends a box to the current vertical list, preceded by interline glue.
    ///
    /// The glue makes the distance between baselines `\baselineskip`, unless that
    ///     would leave less than `\lineskiplimit` between the boxes, in which case
    ///     `\lineskip` is used.
    fn append_box_vertical(&mut self, node: Vertical) {
        let Some((height, depth)) = node.box_dimensions() else {
            return;
        };
        let baselineskip = self.store.glue_param(GlueParam::BaselineSkip);
        let lineskip = self.store.glue_param(GlueParam::LineSkip);
        let lineskiplimit = self.store.dimen_param(DimenParam::LineSkipLimit);
        if let Mode::Vertical {
            list, prev_depth, ..
        } = self.modes.current_mut()
        {
            if let Some(prev_depth) = *prev_depth {
                let distance = baselineskip.width - prev_depth - height;
                let glue = if distance < lineskiplimit {
                    node::Glue::param(GlueParam::LineSkip.name(), lineskip)
                } else {
                    node::Glue::param(
                        GlueParam::BaselineSkip.name(),
                        folio_core::Glue {
                            width: distance,
                            ..baselineskip
                        },
                    )
                };
                list.push(Vertical::Glue(glue));
            }
            list.push(node);
            *prev_depth = Some(depth);
        }
    }

    /// Ends the current paragraph, if there is one, and runs the page builder.
    pub(crate) fn end_paragraph(&mut self) -> fl::Result<()> {
        if !matches!(
            self.modes.current(),
            Mode::Horizontal {
                restricted: false,
                ..
            }
        ) {
            return self.build_page();
        }
        let Some(Mode::Horizontal { list, .. }) = self.modes.pop() else {
            return Ok(());
        };
        let list = ligkern::apply_ligatures_and_kerns(list, self.fonts.as_ref());
        let widths = LineWidths::uniform(self.store.dimen_param(DimenParam::HSize));
        let paragraph = linebreak::break_paragraph(list, &widths, &self.line_break_params());
        log::debug!(
            "broke paragraph into {} line(s) with {} demerits",
            paragraph.lines.len(),
            paragraph.demerits
        );
        for warning in &paragraph.warnings {
            self.diagnostics
                .report(Diagnostic::new(Severity::Warning, warning.to_string()));
        }
        let num_lines = paragraph.lines.len();
        for (i, line) in paragraph.lines.into_iter().enumerate() {
            self.append_box_vertical(Vertical::HList(line.hlist));
            let line_number = i + 1;
            if line_number < num_lines {
                let penalty = interline_penalty(&self.store, line_number, num_lines);
                if penalty != 0 {
                    if let Mode::Vertical { list, .. } = self.modes.current_mut() {
                        list.push(Vertical::Penalty(Penalty::new(penalty)));
                    }
                }
            }
        }
        self.build_page()
    }

    fn line_break_params(&self) -> LineBreakParams {
        let store = &self.store;
        LineBreakParams {
            pretolerance: store.int_param(IntParam::Pretolerance),
            tolerance: store.int_param(IntParam::Tolerance),
            line_penalty: store.int_param(IntParam::LinePenalty),
            adj_demerits: store.int_param(IntParam::AdjDemerits),
            double_hyphen_demerits: store.int_param(IntParam::DoubleHyphenDemerits),
            final_hyphen_demerits: store.int_param(IntParam::FinalHyphenDemerits),
            hyphen_penalty: store.int_param(IntParam::HyphenPenalty),
            ex_hyphen_penalty: store.int_param(IntParam::ExHyphenPenalty),
            fitness: FitnessThresholds {
                very_loose: store.int_param(IntParam::VeryLooseFitness),
                loose: store.int_param(IntParam::LooseFitness),
                tight: store.int_param(IntParam::TightFitness),
            },
            left_skip: store.glue_param(GlueParam::LeftSkip),
            right_skip: store.glue_param(GlueParam::RightSkip),
            par_fill_skip: store.glue_param(GlueParam::ParFillSkip),
            limits: self.hlimits(),
        }
    }

    fn hlimits(&self) -> PackLimits {
        PackLimits {
            badness: self.store.int_param(IntParam::HBadness),
            fuzz: self.store.dimen_param(DimenParam::HFuzz),
        }
    }

    fn vlimits(&self) -> PackLimits {
        PackLimits {
            badness: self.store.int_param(IntParam::VBadness),
            fuzz: self.store.dimen_param(DimenParam::VFuzz),
        }
    }

    /// Moves the outer vertical list to the page builder, which ships any finished pages.
    ///
    /// Does nothing unless the VM is in outer vertical mode.
    pub(crate) fn build_page(&mut self) -> fl::Result<()> {
        if !self.modes.is_outer_vertical() {
            return Ok(());
        }
        if let Mode::Vertical { list, .. } = self.modes.current_mut() {
            for node in list.drain(..) {
                self.page_builder.contribute(node);
            }
        }
        self.page_builder.set_params(page_params(&self.store));
        self.page_builder
            .build(self.backend.as_mut())
            .map_err(backend_failed)
    }

    /// Ships the remaining material as the last page and finishes the backend.
    pub(crate) fn finish_pages(&mut self) -> fl::Result<()> {
        self.build_page()?;
        self.page_builder
            .finish(self.backend.as_mut())
            .map_err(backend_failed)?;
        log::debug!("shipped {} page(s)", self.page_builder.pages_shipped());
        self.backend.finish().map_err(backend_failed)
    }

    /// Begins a group whose contents are built in a new list.
    pub(crate) fn begin_box(&mut self, kind: GroupKind) {
        self.begin_group(kind);
        match kind {
            GroupKind::HBox(_) | GroupKind::Discretionary(_) | GroupKind::AlignCell => {
                self.modes.push(Mode::Horizontal {
                    list: vec![],
                    restricted: true,
                })
            }
            GroupKind::VBox(_) => self.modes.push(Mode::Vertical {
                list: vec![],
                prev_depth: None,
                internal: true,
            }),
            GroupKind::Simple | GroupKind::SemiSimple | GroupKind::Align => {}
        }
    }

    /// Finishes the list of a group that has just ended.
    pub(crate) fn package_group(&mut self, token: Token, kind: GroupKind) -> fl::Result<()> {
        match kind {
            GroupKind::Simple | GroupKind::SemiSimple | GroupKind::Align | GroupKind::AlignCell => {
                Ok(())
            }
            GroupKind::HBox(target) => {
                let list = self.pop_horizontal_list();
                let list = ligkern::apply_ligatures_and_kerns(list, self.fonts.as_ref());
                let packed = pack::hpack(list, target, &self.hlimits());
                self.report_box_warning(token, packed.warning);
                self.append_box(packed.node.into())
            }
            GroupKind::VBox(target) => {
                let list = match self.modes.pop() {
                    Some(Mode::Vertical { list, .. }) => list,
                    _ => vec![],
                };
                let packed = pack::vpack(list, target, Scaled::MAX_DIMEN, &self.vlimits());
                self.report_box_warning(token, packed.warning);
                self.append_box(packed.node.into())
            }
            GroupKind::Discretionary(part) => {
                let list = self.pop_horizontal_list();
                self.modes.discretionary_parts.push(list);
                if part < 2 {
                    return self.begin_discretionary_part(part + 1);
                }
                let parts = self.modes.discretionary_parts.len();
                let mut lists = self.modes.discretionary_parts.split_off(parts.saturating_sub(3));
                let no_break = lists.pop().unwrap_or_default();
                let post_break = lists.pop().unwrap_or_default();
                let pre_break = lists.pop().unwrap_or_default();
                self.append_horizontal(Horizontal::Discretionary(Discretionary {
                    pre_break,
                    post_break,
                    no_break,
                }));
                Ok(())
            }
        }
    }

    /// Reads the `{` that starts the next list of a `\discretionary`.
    fn begin_discretionary_part(&mut self, part: u8) -> fl::Result<()> {
        let input = ExecutionInput::new(self);
        let token = loop {
            let token = input.next_or_err(r"reading the lists of a \discretionary")?;
            if !matches!(token.value(), Value::Space(_)) {
                break token;
            }
        };
        if !matches!(token.value(), Value::BeginGroup(_)) {
            // The lists read so far are dropped along with this one.
            let parts = self.modes.discretionary_parts.len();
            self.modes
                .discretionary_parts
                .truncate(parts.saturating_sub(part as usize));
            return Err(error::SimpleTokenError::new(
                token,
                r"expected `{` to begin the next list of a \discretionary",
            )
            .with_note(r"a \discretionary takes three braced lists: pre-break, post-break and no-break")
            .into());
        }
        self.begin_box(GroupKind::Discretionary(part));
        Ok(())
    }

    fn pop_horizontal_list(&mut self) -> Vec<Horizontal> {
        match self.modes.pop() {
            Some(Mode::Horizontal { list, .. }) => list,
            _ => vec![],
        }
    }

    fn report_box_warning(&mut self, token: Token, warning: Option<pack::BoxWarning>) {
        if let Some(warning) = warning {
            let diagnostic = Diagnostic::new(Severity::Warning, warning.to_string())
                .with_trace(self.trace(token.location()));
            self.diagnostics.report(diagnostic);
        }
    }

    /// Appends a finished box to the list of the current mode.
    fn append_box(&mut self, node: Vertical) -> fl::Result<()> {
        match (self.modes.current_mut(), node) {
            (Mode::Horizontal { list, .. }, Vertical::HList(b)) => list.push(Horizontal::HList(b)),
            (Mode::Horizontal { list, .. }, Vertical::VList(b)) => list.push(Horizontal::VList(b)),
            (Mode::Vertical { .. }, node) => {
                self.append_box_vertical(node);
                return self.build_page();
            }
            (_, node) => {
                // Between the cells of an alignment.
                log::debug!("dropping {node:?} appended outside of any cell");
            }
        }
        Ok(())
    }

    /// Starts an alignment in the enclosing vertical list.
    pub(crate) fn begin_alignment(&mut self, token: Token) -> fl::Result<()> {
        match self.modes.current() {
            Mode::Horizontal {
                restricted: false, ..
            } => self.end_paragraph()?,
            Mode::Horizontal {
                restricted: true, ..
            }
            | Mode::Alignment { .. } => {
                return Err(error::SimpleTokenError::new(
                    token,
                    r"\halign is only allowed in vertical mode",
                )
                .into());
            }
            Mode::Vertical { .. } => {}
        }
        self.begin_group(GroupKind::Align);
        self.modes.push(Mode::Alignment {
            rows: vec![],
            row: vec![],
        });
        self.begin_box(GroupKind::AlignCell);
        Ok(())
    }

    /// Packs the current cell into the current row, as `&` does.
    pub(crate) fn finish_alignment_cell(&mut self, token: Token) -> fl::Result<()> {
        self.close_cell(token)?;
        self.begin_box(GroupKind::AlignCell);
        Ok(())
    }

    /// Finishes the current row, as `\cr` does.
    pub(crate) fn finish_alignment_row(&mut self, token: Token) -> fl::Result<()> {
        if self.store.current_group() != Some(GroupKind::AlignCell) {
            return Err(error::SimpleTokenError::new(token, r"misplaced \cr")
                .with_note(r"\cr can only end a row of an \halign")
                .into());
        }
        self.close_cell(token)?;
        if let Mode::Alignment { rows, row } = self.modes.current_mut() {
            rows.push(std::mem::take(row));
        }
        self.begin_box(GroupKind::AlignCell);
        Ok(())
    }

    fn close_cell(&mut self, token: Token) -> fl::Result<()> {
        self.leave_group(token)?;
        let mut list = self.pop_horizontal_list();
        trim_glue(&mut list);
        let cell = pack::hpack(list, PackTarget::Natural, &PackLimits::SILENT).node;
        if let Mode::Alignment { row, .. } = self.modes.current_mut() {
            row.push(cell);
        }
        Ok(())
    }

    /// Ends the alignment at its closing `}`.
    ///
    /// Every cell is set to the width of the widest cell in its column, and the
    ///     rows are appended to the enclosing vertical list.
    pub(crate) fn finish_alignment(&mut self, token: Token) -> fl::Result<()> {
        if self.store.current_group() == Some(GroupKind::AlignCell) {
            self.leave_group(token)?;
            let mut list = self.pop_horizontal_list();
            trim_glue(&mut list);
            if let Mode::Alignment { rows, row } = self.modes.current_mut() {
                // A row without a final \cr still counts.
                if !list.is_empty() || !row.is_empty() {
                    row.push(pack::hpack(list, PackTarget::Natural, &PackLimits::SILENT).node);
                    rows.push(std::mem::take(row));
                }
            }
        }
        self.leave_group(token)?;
        let rows = match self.modes.pop() {
            Some(Mode::Alignment { rows, .. }) => rows,
            _ => vec![],
        };
        let num_columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![Scaled::ZERO; num_columns];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = std::cmp::max(*width, cell.width);
            }
        }
        log::debug!("alignment with {} row(s) and column widths {widths:?}", rows.len());
        for row in rows {
            let mut cells: Vec<Horizontal> = Vec::with_capacity(num_columns);
            let mut row = row.into_iter();
            for width in &widths {
                let list = row.next().map(|cell| cell.list).unwrap_or_default();
                let cell = pack::hpack(list, PackTarget::Exactly(*width), &PackLimits::SILENT).node;
                cells.push(Horizontal::HList(cell));
            }
            let packed = pack::hpack(cells, PackTarget::Natural, &PackLimits::SILENT);
            self.append_box_vertical(Vertical::HList(packed.node));
        }
        self.build_page()
    }
}

/// The penalty placed after the given line of a paragraph, counting from 1.
fn interline_penalty(store: &crate::store::Store, line_number: usize, num_lines: usize) -> i32 {
    let mut penalty = store.int_param(IntParam::InterlinePenalty);
    if line_number == 1 {
        penalty += store.int_param(IntParam::ClubPenalty);
    }
    if line_number + 1 == num_lines {
        penalty += store.int_param(IntParam::WidowPenalty);
    }
    penalty
}

fn trim_glue(list: &mut Vec<Horizontal>) {
    while matches!(list.last(), Some(Horizontal::Glue(_))) {
        list.pop();
    }
    let leading = list
        .iter()
        .take_while(|node| matches!(node, Horizontal::Glue(_)))
        .count();
    list.drain(..leading);
}

fn backend_failed(err: folio_boxes::backend::BackendError) -> Box<error::Error> {
    error::Error::fatal(BackendFailedError {
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::BuiltIn;
    use crate::diagnostics::Collect;
    use crate::store::{Location, StoreValue};
    use crate::token::trace::SourceLocation;
    use crate::vm::DefaultHandlers;
    use folio_stdext::collections::groupingmap::Scope;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    fn cr(token: Token, input: &mut ExecutionInput<()>) -> fl::Result<()> {
        input.finish_alignment_row(token)
    }

    fn new_vm(source: &str) -> VM<()> {
        let mut vm = VM::<()>::new(HashMap::from([("cr", BuiltIn::new_execution(cr))]));
        vm.set_diagnostics(Collect::default());
        vm.store
            .assign(Location::Int(IntParam::EndLineChar), StoreValue::Int(-1), Scope::Global);
        vm.push_source("test.tex", source);
        vm
    }

    fn run_steps(vm: &mut VM<()>) -> fl::Result<()> {
        while vm.run_step::<DefaultHandlers>()? {}
        Ok(())
    }

    fn pt(n: i32) -> Scaled {
        Scaled::ONE * n
    }

    fn boxes(list: &[Vertical]) -> Vec<&HList> {
        list.iter()
            .filter_map(|node| match node {
                Vertical::HList(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    fn shipped(vm: &mut VM<()>, source: &str) -> Vec<node::VList> {
        let pages: Rc<RefCell<folio_boxes::backend::Collect>> = Default::default();
        vm.set_backend(pages.clone());
        vm.push_source("test.tex", source);
        vm.run::<DefaultHandlers>().unwrap();
        let pages = pages.borrow();
        pages.pages.clone()
    }

    #[test]
    fn character_starts_indented_paragraph() {
        let mut vm = new_vm("a");
        run_steps(&mut vm).unwrap();
        match vm.modes.current() {
            Mode::Horizontal { list, restricted } => {
                assert!(!restricted);
                assert_eq!(list.len(), 2);
                assert!(matches!(&list[0], Horizontal::HList(b) if b.width == pt(20)));
                assert!(matches!(&list[1], Horizontal::Char(c) if c.char == 'a' && c.width == pt(5)));
            }
            other => panic!("unexpected mode {other:?}"),
        }
        assert!(matches!(vm.modes.outer_list(), [Vertical::Glue(_)]));
    }

    #[test]
    fn spaces_ignored_in_vertical_mode() {
        let mut vm = new_vm("");
        ExecutionInput::new(&mut vm).push_token(Token::new_space(' ', SourceLocation::UNKNOWN));
        run_steps(&mut vm).unwrap();
        assert!(vm.modes.is_outer_vertical());
        assert!(vm.modes.outer_list().is_empty());
    }

    #[test]
    fn paragraph_lines_fill_hsize() {
        let mut vm = new_vm("");
        vm.store
            .assign(Location::DimenParam(DimenParam::HSize), StoreValue::Dimen(pt(30)), Scope::Global);
        vm.store
            .assign(Location::Int(IntParam::Tolerance), StoreValue::Int(10000), Scope::Global);
        let pages = shipped(&mut vm, "aa aa aa aa aa aa");
        assert_eq!(pages.len(), 1);
        let lines = boxes(&pages[0].list);
        assert!(lines.len() > 1);
        for line in lines {
            assert_eq!(line.width, pt(30));
        }
    }

    #[test]
    fn two_paragraphs() {
        let mut vm = new_vm("");
        vm.store
            .assign(Location::Int(IntParam::EndLineChar), StoreValue::Int(13), Scope::Global);
        let pages = shipped(&mut vm, "a\n\nb");
        assert_eq!(pages.len(), 1);
        assert_eq!(boxes(&pages[0].list).len(), 2);
    }

    #[test]
    fn interline_glue() {
        let mut vm = new_vm("");
        let line = |height, depth| {
            Vertical::HList(HList {
                height,
                depth,
                ..Default::default()
            })
        };
        vm.append_box_vertical(line(pt(7), pt(2)));
        vm.append_box_vertical(line(pt(7), pt(2)));
        vm.append_box_vertical(line(pt(11), pt(0)));
        let list = vm.modes.outer_list();
        assert_eq!(list.len(), 5);
        match &list[1] {
            Vertical::Glue(g) => {
                assert_eq!(g.kind, node::GlueKind::Param("baselineskip"));
                assert_eq!(g.value.width, pt(3));
            }
            other => panic!("unexpected node {other:?}"),
        }
        match &list[3] {
            Vertical::Glue(g) => {
                assert_eq!(g.kind, node::GlueKind::Param("lineskip"));
                assert_eq!(g.value.width, pt(1));
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn rule_suppresses_interline_glue() {
        let mut vm = new_vm("");
        let token = Token::new_other('x', SourceLocation::UNKNOWN);
        vm.append_box_vertical(Vertical::HList(Default::default()));
        vm.append_vertical(token, Vertical::Rule(Default::default())).unwrap();
        vm.append_box_vertical(Vertical::HList(Default::default()));
        assert_eq!(vm.modes.outer_list().len(), 3);
    }

    #[test]
    fn interline_penalties() {
        let vm = new_vm("");
        assert_eq!(interline_penalty(&vm.store, 1, 2), 300);
        assert_eq!(interline_penalty(&vm.store, 1, 3), 150);
        assert_eq!(interline_penalty(&vm.store, 2, 3), 150);
        assert_eq!(interline_penalty(&vm.store, 2, 4), 0);
    }

    #[test]
    fn hbox_in_vertical_mode() {
        let mut vm = new_vm("");
        ExecutionInput::new(&mut vm).begin_box(GroupKind::HBox(PackTarget::Natural));
        let pages = shipped(&mut vm, "ab}");
        let lines = boxes(&pages[0].list);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].width, pt(10));
        assert_eq!(lines[0].list.len(), 2);
    }

    #[test]
    fn hbox_to_width_reports_underfull() {
        let diagnostics = Collect::default();
        let mut vm = new_vm("ab}");
        vm.set_diagnostics(diagnostics.clone());
        vm.begin_box(GroupKind::HBox(PackTarget::Exactly(pt(100))));
        run_steps(&mut vm).unwrap();
        let reported = diagnostics.take();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].severity, Severity::Warning);
        assert!(reported[0].message.starts_with("Underfull \\hbox"));
        assert_eq!(reported[0].trace.as_ref().map(|t| t.column), Some(2));
    }

    #[test]
    fn vertical_material_in_hbox() {
        let mut vm = new_vm("");
        vm.begin_box(GroupKind::HBox(PackTarget::Natural));
        let token = Token::new_other('x', SourceLocation::UNKNOWN);
        assert!(vm
            .append_vertical(token, Vertical::Penalty(Penalty::new(0)))
            .is_err());
    }

    #[test]
    fn vbox_ends_inner_paragraph() {
        let mut vm = new_vm("");
        vm.begin_box(GroupKind::VBox(PackTarget::Natural));
        let pages = shipped(&mut vm, "ab}");
        let vlist = pages[0]
            .list
            .iter()
            .find_map(|node| match node {
                Vertical::VList(b) => Some(b),
                _ => None,
            })
            .expect("a vbox");
        assert_eq!(boxes(&vlist.list).len(), 1);
        assert_eq!(vlist.width, pt(468));
    }

    #[test]
    fn discretionary() {
        let mut vm = new_vm("a}{b} {c}");
        vm.begin_paragraph(false);
        vm.begin_box(GroupKind::Discretionary(0));
        run_steps(&mut vm).unwrap();
        let Mode::Horizontal { list, .. } = vm.modes.current() else {
            panic!("not in horizontal mode");
        };
        let chars = |list: &[Horizontal]| -> String {
            list.iter()
                .filter_map(|node| match node {
                    Horizontal::Char(c) => Some(c.char),
                    _ => None,
                })
                .collect()
        };
        match list.as_slice() {
            [Horizontal::Discretionary(d)] => {
                assert_eq!(chars(&d.pre_break), "a");
                assert_eq!(chars(&d.post_break), "b");
                assert_eq!(chars(&d.no_break), "c");
            }
            other => panic!("unexpected list {other:?}"),
        }
        assert!(vm.modes.discretionary_parts.is_empty());
    }

    #[test]
    fn discretionary_missing_brace() {
        let mut vm = new_vm("a}b");
        vm.begin_paragraph(false);
        vm.begin_box(GroupKind::Discretionary(0));
        let err = run_steps(&mut vm).unwrap_err();
        assert!(err.title().contains("expected `{`"));
        assert!(vm.modes.discretionary_parts.is_empty());
    }

    #[test]
    fn alignment_columns() {
        let mut vm = new_vm("");
        let token = Token::new_begin_group('{', SourceLocation::UNKNOWN);
        vm.begin_alignment(token).unwrap();
        let pages = shipped(&mut vm, r"a&bbb\cr cc&d\cr}");
        assert!(vm.modes.is_outer_vertical());
        assert_eq!(vm.store.depth(), 0);
        let rows = boxes(&pages[0].list);
        assert_eq!(rows.len(), 2);
        for row in rows {
            assert_eq!(row.width, pt(25));
            assert_eq!(row.list.len(), 2);
        }
    }

    #[test]
    fn alignment_without_final_cr() {
        let mut vm = new_vm("");
        let token = Token::new_begin_group('{', SourceLocation::UNKNOWN);
        vm.begin_alignment(token).unwrap();
        let pages = shipped(&mut vm, r"a&b\cr c}");
        let rows = boxes(&pages[0].list);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].list.len(), 2);
    }

    #[test]
    fn misplaced_cr() {
        let mut vm = new_vm(r"\cr");
        let err = run_steps(&mut vm).unwrap_err();
        assert_eq!(err.title(), r"misplaced \cr");
    }
}
