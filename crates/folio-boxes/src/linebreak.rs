//! The total-fit line breaker.
//!
//! Given the horizontal list of a paragraph, the breaker chooses the set of breakpoints
//! that minimizes the sum of demerits over all lines, then cuts the list at those
//! breakpoints and packages each line to its target width.
//!
//! The search is a dynamic program over breakpoints.
//! Each *active* node is a feasible break that may still end a future line;
//! each *passive* node is a break that has been recorded and may be part of the final answer.
//! Actives are grouped by line class: lines whose width is the same no matter their number
//! are interchangeable, so only the best break per fitness class needs to be kept for them.
//!
//! All arithmetic that influences the choice of breaks is integer arithmetic,
//! so the same input always produces the same lines.

use folio_core::{badness, Glue, GlueOrder, Scaled, INF_BAD};

use crate::node::{self, Horizontal, Penalty};
use crate::pack::{self, BoxWarning, OrderTotals, PackLimits, PackTarget};

/// Demerits of an impossible break.
const AWFUL_BAD: i64 = 0o7777777777;

/// How a line's glue is set, in four classes.
///
/// Adjacent lines whose classes differ by more than one are visually incompatible
/// and incur [LineBreakParams::adj_demerits].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Fitness {
    VeryLoose = 0,
    Loose = 1,
    Decent = 2,
    Tight = 3,
}

impl Fitness {
    const ALL: [Fitness; 4] = [
        Fitness::VeryLoose,
        Fitness::Loose,
        Fitness::Decent,
        Fitness::Tight,
    ];
}

/// Badness thresholds separating the fitness classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitnessThresholds {
    /// A stretched line with badness above this is very loose.
    pub very_loose: i32,
    /// A stretched line with badness above this is loose.
    pub loose: i32,
    /// A shrunk line with badness above this is tight.
    pub tight: i32,
}

impl Default for FitnessThresholds {
    fn default() -> Self {
        FitnessThresholds {
            very_loose: 99,
            loose: 12,
            tight: 12,
        }
    }
}

/// Parameters of the line breaker.
///
/// The defaults are the values plain TeX uses.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LineBreakParams {
    /// Badness tolerance of the first pass. A negative value skips the first pass.
    pub pretolerance: i32,
    /// Badness tolerance of the second and final pass.
    pub tolerance: i32,
    pub line_penalty: i32,
    pub adj_demerits: i32,
    pub double_hyphen_demerits: i32,
    pub final_hyphen_demerits: i32,
    /// Penalty for breaking at a discretionary with a non-empty pre-break list.
    pub hyphen_penalty: i32,
    /// Penalty for breaking at a discretionary with an empty pre-break list.
    pub ex_hyphen_penalty: i32,
    pub fitness: FitnessThresholds,
    pub left_skip: Glue,
    pub right_skip: Glue,
    pub par_fill_skip: Glue,
    /// Which finished lines are reported as badly set.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub limits: PackLimits,
}

impl Default for LineBreakParams {
    fn default() -> Self {
        LineBreakParams {
            pretolerance: 100,
            tolerance: 200,
            line_penalty: 10,
            adj_demerits: 10000,
            double_hyphen_demerits: 10000,
            final_hyphen_demerits: 5000,
            hyphen_penalty: 50,
            ex_hyphen_penalty: 50,
            fitness: Default::default(),
            left_skip: Glue::default(),
            right_skip: Glue::default(),
            par_fill_skip: Glue::infinite_stretch(GlueOrder::Fil),
            limits: Default::default(),
        }
    }
}

/// Indentation and width of each line of a paragraph.
///
/// The last entry applies to every line after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineWidths {
    shape: Vec<(Scaled, Scaled)>,
}

impl LineWidths {
    /// Every line has the same width and no indentation.
    pub fn uniform(width: Scaled) -> LineWidths {
        LineWidths {
            shape: vec![(Scaled::ZERO, width)],
        }
    }

    /// Lines with the given `(indent, width)` pairs, the last pair repeating.
    ///
    /// An empty shape is the same as a uniform width of zero.
    pub fn new(shape: Vec<(Scaled, Scaled)>) -> LineWidths {
        if shape.is_empty() {
            return LineWidths::uniform(Scaled::ZERO);
        }
        LineWidths { shape }
    }

    /// Indentation and width of the given line, counting from 1.
    pub fn get(&self, line: usize) -> (Scaled, Scaled) {
        let i = line.clamp(1, self.shape.len()) - 1;
        self.shape[i]
    }

    /// Line class of the line following line `l`.
    ///
    /// Lines after the last special line all have the same width and share a class.
    fn class(&self, l: usize) -> usize {
        let easy_line = self.shape.len() - 1;
        if l > easy_line {
            usize::MAX
        } else {
            l
        }
    }
}

/// A broken paragraph.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub lines: Vec<Line>,
    /// Total demerits of the chosen breaks.
    pub demerits: i64,
    /// Lines that came out underfull, loose, tight or overfull.
    pub warnings: Vec<LineWarning>,
}

/// One line of a broken paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// The line, packaged to its target width and shifted by its indentation.
    pub hlist: node::HList,
    pub badness: i32,
    pub fitness: Fitness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineWarning {
    /// Line number, counting from 1.
    pub line: usize,
    pub warning: BoxWarning,
}

impl std::fmt::Display for LineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} in paragraph at line {}", self.warning, self.line)
    }
}

/// Width, stretch and shrink of a stretch of material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    width: Scaled,
    stretch: OrderTotals,
    shrink: Scaled,
}

impl Totals {
    fn of(list: &[Horizontal]) -> Totals {
        let m = pack::measure_hlist(list);
        Totals {
            width: m.size,
            stretch: m.stretch,
            // Shrink is finite everywhere in a prepared paragraph.
            shrink: m.shrink.get(GlueOrder::Normal),
        }
    }
}

impl std::ops::Add for Totals {
    type Output = Totals;
    fn add(self, rhs: Totals) -> Totals {
        Totals {
            width: self.width + rhs.width,
            stretch: self.stretch + rhs.stretch,
            shrink: self.shrink + rhs.shrink,
        }
    }
}

impl std::ops::Sub for Totals {
    type Output = Totals;
    fn sub(self, rhs: Totals) -> Totals {
        Totals {
            width: self.width - rhs.width,
            stretch: self.stretch - rhs.stretch,
            shrink: self.shrink - rhs.shrink,
        }
    }
}

/// A legal breakpoint in the paragraph.
#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    position: usize,
    penalty: i32,
    hyphenated: bool,
    /// Pre-break material of a discretionary.
    pre: Totals,
}

#[derive(Debug, Clone)]
struct Active {
    /// Number of lines ended so far, i.e. the line number of the break.
    line_number: usize,
    fitness: Fitness,
    hyphenated: bool,
    total_demerits: i64,
    passive: Option<usize>,
    /// Index where the next line's material starts.
    start: usize,
    /// Post-break material of a discretionary, which starts the next line.
    post: Totals,
}

#[derive(Debug, Clone, Copy)]
struct Passive {
    position: usize,
    prev: Option<usize>,
    line_number: usize,
    fitness: Fitness,
    badness: i32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    demerits: i64,
    prev: Option<usize>,
    line_number: usize,
    badness: i32,
}

struct Context<'a> {
    list: &'a [Horizontal],
    totals: Vec<Totals>,
    breakpoints: Vec<Breakpoint>,
    background: Totals,
    widths: &'a LineWidths,
    params: &'a LineBreakParams,
}

/// Breaks a paragraph into lines.
///
/// The list is the contents of the paragraph as built in horizontal mode,
/// after ligatures and kerns have been applied.
/// An empty list produces no lines.
pub fn break_paragraph(
    list: Vec<Horizontal>,
    widths: &LineWidths,
    params: &LineBreakParams,
) -> Paragraph {
    let Some(list) = prepare(list, params) else {
        return Default::default();
    };
    let (breaks, demerits) = {
        let ctx = Context::new(&list, widths, params);
        ctx.find_breaks()
    };
    let mut paragraph = build_lines(list, &breaks, widths, params);
    paragraph.demerits = demerits;
    paragraph
}

/// Readies the list for breaking.
///
/// A trailing glue is removed, infinite shrink is made finite,
/// and the paragraph is finished with an infinite penalty, the `\parfillskip` glue
/// and a forced break.
fn prepare(mut list: Vec<Horizontal>, params: &LineBreakParams) -> Option<Vec<Horizontal>> {
    if let Some(Horizontal::Glue(_)) = list.last() {
        list.pop();
    }
    if list.is_empty() {
        return None;
    }
    let mut reported = false;
    for node in list.iter_mut() {
        if let Horizontal::Glue(glue) = node {
            if glue.value.has_infinite_shrink() {
                if !reported {
                    log::warn!("infinite glue shrinkage found in a paragraph; it will be made finite");
                    reported = true;
                }
                glue.value = glue.value.with_finite_shrink();
            }
        }
    }
    list.push(Horizontal::Penalty(Penalty::new(Penalty::INFINITE)));
    list.push(Horizontal::Glue(node::Glue::param(
        "parfillskip",
        params.par_fill_skip,
    )));
    list.push(Horizontal::Penalty(Penalty::new(Penalty::EJECT)));
    Some(list)
}

impl<'a> Context<'a> {
    fn new(
        list: &'a [Horizontal],
        widths: &'a LineWidths,
        params: &'a LineBreakParams,
    ) -> Context<'a> {
        let mut totals = Vec::with_capacity(list.len() + 1);
        let mut running = Totals::default();
        totals.push(running);
        for node in list {
            running = running + Totals::of(std::slice::from_ref(node));
            totals.push(running);
        }
        let mut left_skip = params.left_skip;
        let mut right_skip = params.right_skip;
        if left_skip.has_infinite_shrink() || right_skip.has_infinite_shrink() {
            log::warn!("infinite shrinkage in \\leftskip or \\rightskip; it will be made finite");
            left_skip = left_skip.with_finite_shrink();
            right_skip = right_skip.with_finite_shrink();
        }
        let background = Totals::of(&[
            Horizontal::Glue(node::Glue::new(left_skip)),
            Horizontal::Glue(node::Glue::new(right_skip)),
        ]);
        let last = list.len() - 1;
        let mut breakpoints = vec![];
        for (position, node) in list.iter().enumerate() {
            let breakpoint = |penalty: i32, hyphenated: bool, pre: Totals| Breakpoint {
                position,
                penalty,
                hyphenated,
                pre,
            };
            match node {
                Horizontal::Glue(_) => {
                    if position > 0 && list[position - 1].precedes_break() {
                        breakpoints.push(breakpoint(0, false, Totals::default()));
                    }
                }
                Horizontal::Kern(_) => {
                    if let Some(Horizontal::Glue(_)) = list.get(position + 1) {
                        breakpoints.push(breakpoint(0, false, Totals::default()));
                    }
                }
                Horizontal::Penalty(penalty) => {
                    if penalty.value < Penalty::INFINITE {
                        // The final forced break counts as hyphenated so that a
                        // hyphen on the second-to-last line is penalized.
                        breakpoints.push(breakpoint(
                            penalty.value,
                            position == last,
                            Totals::default(),
                        ));
                    }
                }
                Horizontal::Discretionary(disc) => {
                    let penalty = if disc.pre_break.is_empty() {
                        params.ex_hyphen_penalty
                    } else {
                        params.hyphen_penalty
                    };
                    breakpoints.push(breakpoint(penalty, true, Totals::of(&disc.pre_break)));
                }
                _ => {}
            }
        }
        Context {
            list,
            totals,
            breakpoints,
            background,
            widths,
            params,
        }
    }

    /// Index where the line after a break at `position` starts.
    ///
    /// Discardable material after the break is skipped, stopping before the final break.
    fn start_after(&self, position: usize) -> usize {
        if let Horizontal::Discretionary(_) = self.list[position] {
            return position + 1;
        }
        let last = self.list.len() - 1;
        let mut j = position + 1;
        while j < last && self.list[j].is_discardable() {
            j += 1;
        }
        j.min(last)
    }

    fn post_of(&self, position: usize) -> Totals {
        match &self.list[position] {
            Horizontal::Discretionary(disc) => Totals::of(&disc.post_break),
            _ => Totals::default(),
        }
    }

    /// Badness and fitness class of a line with the given natural totals.
    fn classify(&self, line_width: Scaled, natural: &Totals) -> (i32, Fitness) {
        let thresholds = &self.params.fitness;
        let shortfall = line_width - natural.width;
        if shortfall > Scaled::ZERO {
            let infinite = natural.stretch.highest_order() != GlueOrder::Normal;
            if infinite {
                return (0, Fitness::Decent);
            }
            let b = badness(shortfall, natural.stretch.get(GlueOrder::Normal));
            let fitness = if b > thresholds.loose {
                if b > thresholds.very_loose {
                    Fitness::VeryLoose
                } else {
                    Fitness::Loose
                }
            } else {
                Fitness::Decent
            };
            (b, fitness)
        } else {
            let excess = -shortfall;
            if excess > natural.shrink {
                return (INF_BAD + 1, Fitness::Tight);
            }
            let b = badness(excess, natural.shrink);
            let fitness = if b > thresholds.tight {
                Fitness::Tight
            } else {
                Fitness::Decent
            };
            (b, fitness)
        }
    }

    fn demerits(&self, b: i32, breakpoint: &Breakpoint, active: &Active, fitness: Fitness) -> i64 {
        let params = self.params;
        let mut d = params.line_penalty as i64 + b as i64;
        d = if d.abs() >= 10000 { 100_000_000 } else { d * d };
        let pi = breakpoint.penalty as i64;
        if pi > 0 {
            d += pi * pi;
        } else if pi > Penalty::EJECT as i64 {
            d -= pi * pi;
        }
        if breakpoint.hyphenated && active.hyphenated {
            let is_final = breakpoint.position == self.list.len() - 1;
            d += if is_final {
                params.final_hyphen_demerits as i64
            } else {
                params.double_hyphen_demerits as i64
            };
        }
        if (fitness as i32 - active.fitness as i32).abs() > 1 {
            d += params.adj_demerits as i64;
        }
        d
    }

    /// Runs the first pass if enabled, then the final pass if needed.
    fn find_breaks(&self) -> (Vec<Passive>, i64) {
        if self.params.pretolerance >= 0 {
            if let Some(result) = self.run_pass(self.params.pretolerance, false) {
                return result;
            }
            log::debug!("first line breaking pass failed; retrying with \\tolerance");
        }
        match self.run_pass(self.params.tolerance, true) {
            Some(result) => result,
            None => {
                // The final pass always records a break, so this is unreachable in practice.
                log::error!("no feasible line breaks; setting the paragraph as one line");
                let last = self.list.len() - 1;
                (
                    vec![Passive {
                        position: last,
                        prev: None,
                        line_number: 1,
                        fitness: Fitness::Decent,
                        badness: INF_BAD,
                    }],
                    AWFUL_BAD,
                )
            }
        }
    }

    /// Runs one pass of the algorithm.
    ///
    /// Returns the chosen breaks in paragraph order and their total demerits,
    /// or `None` if no set of breaks has every line within the threshold.
    fn run_pass(&self, threshold: i32, final_pass: bool) -> Option<(Vec<Passive>, i64)> {
        let mut passives: Vec<Passive> = vec![];
        let mut actives = vec![Active {
            line_number: 0,
            fitness: Fitness::Decent,
            hyphenated: false,
            total_demerits: 0,
            passive: None,
            start: 0,
            post: Totals::default(),
        }];
        for breakpoint in &self.breakpoints {
            let n = actives.len();
            let mut next_actives: Vec<Active> = Vec::with_capacity(n + 4);
            let mut i = 0;
            while i < n {
                let class = self.widths.class(actives[i].line_number);
                let mut best: [Option<Candidate>; 4] = [None; 4];
                let mut minimum = AWFUL_BAD;
                while i < n && self.widths.class(actives[i].line_number) == class {
                    let active = &actives[i];
                    let is_last = i + 1 == n;
                    i += 1;
                    if active.start > breakpoint.position {
                        next_actives.push(active.clone());
                        continue;
                    }
                    let natural = self.totals[breakpoint.position] - self.totals[active.start]
                        + active.post
                        + breakpoint.pre
                        + self.background;
                    let (_, line_width) = self.widths.get(active.line_number + 1);
                    let (b, fitness) = self.classify(line_width, &natural);
                    let mut artificial = false;
                    let stays_active;
                    if b > INF_BAD || breakpoint.penalty <= Penalty::EJECT {
                        if final_pass
                            && minimum == AWFUL_BAD
                            && is_last
                            && next_actives.is_empty()
                        {
                            artificial = true;
                        } else if b > threshold {
                            continue;
                        }
                        stays_active = false;
                    } else {
                        if b > threshold {
                            next_actives.push(active.clone());
                            continue;
                        }
                        stays_active = true;
                    }
                    let line_demerits = if artificial {
                        0
                    } else {
                        self.demerits(b, breakpoint, active, fitness)
                    };
                    let demerits = line_demerits + active.total_demerits;
                    let slot = &mut best[fitness as usize];
                    if slot.map_or(true, |c| demerits < c.demerits) {
                        *slot = Some(Candidate {
                            demerits,
                            prev: active.passive,
                            line_number: active.line_number,
                            badness: b,
                        });
                    }
                    minimum = minimum.min(demerits);
                    if stays_active {
                        next_actives.push(active.clone());
                    }
                }
                if minimum == AWFUL_BAD {
                    continue;
                }
                let bound = minimum + (self.params.adj_demerits as i64).abs();
                for fitness in Fitness::ALL {
                    let Some(candidate) = best[fitness as usize] else {
                        continue;
                    };
                    if candidate.demerits > bound {
                        continue;
                    }
                    passives.push(Passive {
                        position: breakpoint.position,
                        prev: candidate.prev,
                        line_number: candidate.line_number + 1,
                        fitness,
                        badness: candidate.badness,
                    });
                    next_actives.push(Active {
                        line_number: candidate.line_number + 1,
                        fitness,
                        hyphenated: breakpoint.hyphenated,
                        total_demerits: candidate.demerits,
                        passive: Some(passives.len() - 1),
                        start: self.start_after(breakpoint.position),
                        post: self.post_of(breakpoint.position),
                    });
                }
            }
            // Keep line classes contiguous and, within a class, the leftmost breaks first,
            // so the strict comparison above leaves ties to the leftmost predecessor.
            next_actives.sort_by_key(|active| {
                (
                    self.widths.class(active.line_number),
                    active.passive.map(|p| passives[p].position),
                )
            });
            actives = next_actives;
            if actives.is_empty() {
                return None;
            }
        }
        // Every active left has been created at the final forced break.
        let mut best: Option<&Active> = None;
        for active in &actives {
            if best.map_or(true, |b| active.total_demerits < b.total_demerits) {
                best = Some(active);
            }
        }
        let best = best?;
        let mut chain = vec![];
        let mut next = best.passive;
        while let Some(i) = next {
            chain.push(passives[i]);
            next = passives[i].prev;
        }
        chain.reverse();
        Some((chain, best.total_demerits))
    }
}

/// Cuts the list at the chosen breaks and packages each line.
fn build_lines(
    list: Vec<Horizontal>,
    breaks: &[Passive],
    widths: &LineWidths,
    params: &LineBreakParams,
) -> Paragraph {
    let last = list.len() - 1;
    let starts: Vec<usize> = breaks
        .iter()
        .map(|brk| {
            if let Horizontal::Discretionary(_) = list[brk.position] {
                return brk.position + 1;
            }
            let mut j = brk.position + 1;
            while j < last && list[j].is_discardable() {
                j += 1;
            }
            j.min(last)
        })
        .collect();
    let mut slots: Vec<Option<Horizontal>> = list.into_iter().map(Some).collect();
    let mut paragraph = Paragraph::default();
    let mut start = 0;
    let mut carried: Vec<Horizontal> = vec![];
    for (brk, next_start) in breaks.iter().zip(starts) {
        let mut line: Vec<Horizontal> = vec![];
        if params.left_skip != Glue::default() {
            line.push(Horizontal::Glue(node::Glue::param(
                "leftskip",
                params.left_skip,
            )));
        }
        line.append(&mut carried);
        line.extend(
            slots[start.min(brk.position)..brk.position]
                .iter_mut()
                .filter_map(Option::take),
        );
        if let Some(Horizontal::Discretionary(disc)) = slots[brk.position].take() {
            line.extend(disc.pre_break);
            carried = disc.post_break;
        }
        line.push(Horizontal::Glue(node::Glue::param(
            "rightskip",
            params.right_skip,
        )));
        start = next_start;
        let (indent, width) = widths.get(brk.line_number);
        let packed = pack::hpack(line, PackTarget::Exactly(width), &params.limits);
        let mut hlist = packed.node;
        hlist.shift_amount = indent;
        if let Some(warning) = packed.warning {
            paragraph.warnings.push(LineWarning {
                line: brk.line_number,
                warning,
            });
        }
        paragraph.lines.push(Line {
            hlist,
            badness: brk.badness,
            fitness: brk.fitness,
        });
    }
    paragraph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Char, Discretionary};
    use crate::pack::BoxProblem;
    use folio_core::FontId;

    fn pt(n: i32) -> Scaled {
        Scaled::ONE * n
    }

    fn c(char: char) -> Horizontal {
        Horizontal::Char(Char {
            char,
            font: FontId::NULL,
            width: pt(5),
            height: pt(7),
            depth: Scaled::ZERO,
        })
    }

    fn space() -> Horizontal {
        Horizontal::Glue(node::Glue::new(Glue::new(
            Scaled(218235),
            Scaled(109445),
            Scaled(72745),
        )))
    }

    /// Builds a list from words separated by single spaces.
    fn words(s: &str) -> Vec<Horizontal> {
        let mut list = vec![];
        for (i, word) in s.split(' ').enumerate() {
            if i > 0 {
                list.push(space());
            }
            list.extend(word.chars().map(c));
        }
        list
    }

    fn text_of(line: &Line) -> String {
        line.hlist
            .list
            .iter()
            .filter_map(|node| match node {
                Horizontal::Char(c) => Some(c.char.to_string()),
                Horizontal::Glue(g) if g.kind == node::GlueKind::Normal => Some(" ".to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn empty_paragraph() {
        let paragraph = break_paragraph(vec![], &LineWidths::uniform(pt(100)), &Default::default());
        assert!(paragraph.lines.is_empty());
        let paragraph = break_paragraph(
            vec![space()],
            &LineWidths::uniform(pt(100)),
            &Default::default(),
        );
        assert!(paragraph.lines.is_empty());
    }

    #[test]
    fn exact_fit_is_one_line() {
        let paragraph = break_paragraph(
            words("abcd"),
            &LineWidths::uniform(pt(20)),
            &Default::default(),
        );
        assert_eq!(paragraph.lines.len(), 1);
        assert_eq!(paragraph.lines[0].badness, 0);
        assert_eq!(paragraph.lines[0].fitness, Fitness::Decent);
        assert_eq!(paragraph.lines[0].hlist.width, pt(20));
        assert_eq!(paragraph.demerits, 100);
        assert!(paragraph.warnings.is_empty());
    }

    #[test]
    fn exact_fit_with_interword_glue() {
        let mut list = words("ab cd");
        list.push(Horizontal::Penalty(Penalty::new(Penalty::EJECT)));
        list.extend(words("ef"));
        let width = pt(20) + Scaled(218235);
        let paragraph = break_paragraph(list, &LineWidths::uniform(width), &Default::default());
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["ab cd", "ef"]);
        let first = &paragraph.lines[0];
        assert_eq!(first.badness, 0);
        assert_eq!(first.fitness, Fitness::Decent);
        assert_eq!(first.hlist.width, width);
        assert_eq!(first.hlist.glue_sign, node::GlueSign::Normal);
        assert_eq!(paragraph.demerits, 100 + 100);
        assert!(paragraph.warnings.is_empty());
    }

    fn very_loose_then_decent(adj_demerits: i32) -> Paragraph {
        let mut list = words("a b");
        list.push(Horizontal::Penalty(Penalty::new(Penalty::EJECT)));
        list.extend(words("c"));
        let params = LineBreakParams {
            pretolerance: -1,
            tolerance: 1000,
            adj_demerits,
            ..Default::default()
        };
        // The first line stretches by twice its stretchability: badness 800.
        let width = pt(10) + Scaled(218235 + 2 * 109445);
        break_paragraph(list, &LineWidths::uniform(width), &params)
    }

    #[test]
    fn adj_demerits_for_fitness_jump() {
        let paragraph = very_loose_then_decent(10000);
        assert_eq!(paragraph.lines[0].badness, 800);
        assert_eq!(paragraph.lines[0].fitness, Fitness::VeryLoose);
        assert_eq!(paragraph.lines[1].fitness, Fitness::Decent);
        // Both lines are two classes away from their predecessor.
        assert_eq!(paragraph.demerits, 810 * 810 + 10000 + 100 + 10000);

        let paragraph = very_loose_then_decent(0);
        assert_eq!(paragraph.demerits, 810 * 810 + 100);
    }

    fn two_hyphenated_breaks(double_hyphen_demerits: i32) -> Paragraph {
        let hyphen = || {
            Horizontal::Discretionary(Discretionary {
                pre_break: vec![c('-')],
                post_break: vec![],
                no_break: vec![],
            })
        };
        let mut list = words("aaaa");
        list.push(hyphen());
        list.extend(words("bbbb"));
        list.push(hyphen());
        list.extend(words("cccc"));
        let params = LineBreakParams {
            double_hyphen_demerits,
            ..Default::default()
        };
        break_paragraph(list, &LineWidths::uniform(pt(25)), &params)
    }

    #[test]
    fn double_hyphen_demerits() {
        let paragraph = two_hyphenated_breaks(10000);
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["aaaa-", "bbbb-", "cccc"]);
        // 10^2 + 50^2, then 10^2 + 50^2 + 10000, then 10^2 + 5000.
        assert_eq!(paragraph.demerits, 2600 + 12600 + 5100);

        let paragraph = two_hyphenated_breaks(0);
        assert_eq!(paragraph.demerits, 2600 + 2600 + 5100);
    }

    #[test]
    fn ties_go_to_the_leftmost_predecessor() {
        // Breaking at the glue or at the kern gives lines of equal badness.
        let zero_glue = || Horizontal::Glue(node::Glue::new(Glue::default()));
        let list = vec![
            c('a'),
            zero_glue(),
            Horizontal::Kern(node::Kern {
                kind: node::KernKind::Explicit,
                width: Scaled::ZERO,
            }),
            zero_glue(),
            c('b'),
        ];
        let params = LineBreakParams {
            right_skip: Glue {
                stretch: pt(10),
                ..Default::default()
            },
            ..Default::default()
        };
        let paragraph = break_paragraph(list, &LineWidths::uniform(pt(8)), &params);
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["a", "b"]);
        assert_eq!(paragraph.lines[0].hlist.list.len(), 2);
        assert_eq!(paragraph.lines[0].badness, 3);
        assert_eq!(paragraph.demerits, 13 * 13 + 100);
    }

    #[test]
    fn two_words_per_line() {
        let paragraph = break_paragraph(
            words("aaa bbb ccc ddd"),
            &LineWidths::uniform(pt(34)),
            &Default::default(),
        );
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["aaa bbb", "ccc ddd"]);
        assert_eq!(paragraph.lines[0].fitness, Fitness::Decent);
        assert!(paragraph.warnings.is_empty());
    }

    #[test]
    fn forced_break() {
        let mut list = words("aa");
        list.push(Horizontal::Penalty(Penalty::new(Penalty::EJECT)));
        list.extend(words("bb"));
        let paragraph = break_paragraph(list, &LineWidths::uniform(pt(100)), &Default::default());
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["aa", "bb"]);
    }

    #[test]
    fn overlong_word_is_overfull() {
        let paragraph = break_paragraph(
            words("abcd"),
            &LineWidths::uniform(pt(10)),
            &Default::default(),
        );
        assert_eq!(paragraph.lines.len(), 1);
        assert_eq!(paragraph.lines[0].badness, INF_BAD + 1);
        assert_eq!(
            paragraph.warnings,
            vec![LineWarning {
                line: 1,
                warning: BoxWarning {
                    vertical: false,
                    problem: BoxProblem::Overfull { excess: pt(10) },
                },
            }]
        );
    }

    #[test]
    fn discretionary_break() {
        let mut list = words("aaaa");
        list.push(Horizontal::Discretionary(Discretionary {
            pre_break: vec![c('-')],
            post_break: vec![],
            no_break: vec![],
        }));
        list.extend(words("bbbb"));
        let paragraph = break_paragraph(list, &LineWidths::uniform(pt(25)), &Default::default());
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["aaaa-", "bbbb"]);
        // 10^2 + 50^2 for the first line, 10^2 + 5000 for the last.
        assert_eq!(paragraph.demerits, 100 + 2500 + 100 + 5000);
    }

    #[test]
    fn line_shape() {
        let widths = LineWidths::new(vec![(pt(5), pt(15)), (Scaled::ZERO, pt(34))]);
        let paragraph = break_paragraph(
            words("aaa bbb ccc"),
            &widths,
            &Default::default(),
        );
        let lines: Vec<String> = paragraph.lines.iter().map(text_of).collect();
        assert_eq!(lines, vec!["aaa", "bbb ccc"]);
        assert_eq!(paragraph.lines[0].hlist.shift_amount, pt(5));
        assert_eq!(paragraph.lines[0].hlist.width, pt(15));
        assert_eq!(paragraph.lines[1].hlist.width, pt(34));
    }

    #[test]
    fn line_widths_repeat_last_entry() {
        let widths = LineWidths::new(vec![(pt(1), pt(2)), (pt(3), pt(4))]);
        assert_eq!(widths.get(1), (pt(1), pt(2)));
        assert_eq!(widths.get(2), (pt(3), pt(4)));
        assert_eq!(widths.get(20), (pt(3), pt(4)));
    }

    #[test]
    fn ragged_right() {
        let params = LineBreakParams {
            right_skip: Glue {
                stretch: pt(1),
                stretch_order: GlueOrder::Fil,
                ..Default::default()
            },
            ..Default::default()
        };
        let paragraph = break_paragraph(
            words("aaa bbb ccc ddd"),
            &LineWidths::uniform(pt(40)),
            &params,
        );
        for line in &paragraph.lines {
            assert_eq!(line.badness, 0);
        }
        assert_eq!(paragraph.lines.len(), 2);
    }

    #[test]
    fn deterministic() {
        let run = || {
            break_paragraph(
                words("a bb ccc dddd eeeee ffffff g hh iii jjjj kkkkk"),
                &LineWidths::uniform(pt(60)),
                &Default::default(),
            )
        };
        assert_eq!(run(), run());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn params_from_partial_json() {
        let params: LineBreakParams = serde_json::from_str(
            r#"{"tolerance": 1000, "fitness": {"very_loose": 50, "loose": 10, "tight": 10}}"#,
        )
        .unwrap();
        assert_eq!(params.tolerance, 1000);
        assert_eq!(
            params.fitness,
            FitnessThresholds {
                very_loose: 50,
                loose: 10,
                tight: 10,
            }
        );
        assert_eq!(params.pretolerance, LineBreakParams::default().pretolerance);
        assert_eq!(params.par_fill_skip, LineBreakParams::default().par_fill_skip);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn fitness_thresholds_need_every_field() {
        assert!(serde_json::from_str::<FitnessThresholds>(r#"{"loose": 10}"#).is_err());
    }

    #[test]
    fn infinite_shrink_is_made_finite() {
        let mut list = words("aaa");
        list.push(Horizontal::Glue(node::Glue::new(Glue {
            shrink: pt(100),
            shrink_order: GlueOrder::Fil,
            ..Default::default()
        })));
        list.extend(words("bbb"));
        let paragraph = break_paragraph(list, &LineWidths::uniform(pt(100)), &Default::default());
        assert_eq!(paragraph.lines.len(), 1);
        let has_infinite_shrink = paragraph.lines[0].hlist.list.iter().any(|node| match node {
            Horizontal::Glue(glue) => glue.value.has_infinite_shrink(),
            _ => false,
        });
        assert!(!has_infinite_shrink);
    }
}
