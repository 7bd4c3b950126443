//! The page builder.
//!
//! Vertical material is contributed to the builder as it is produced.
//! The builder moves it onto the current page one node at a time, keeping track of the
//! best place seen so far to end the page.
//! When the page is certainly full (a break would be infinitely bad) or a break is forced,
//! the page is cut at the best place, packaged and shipped to the backend.
//! Whatever followed the best break goes back to the contributions and starts the next page.

use std::collections::VecDeque;

use folio_core::{badness, Glue, GlueOrder, Scaled, INF_BAD};

use crate::backend::{Backend, BackendError};
use crate::node::{self, Penalty, Vertical};
use crate::pack::{self, OrderTotals, PackLimits, PackTarget};

/// Cost of a page that is infinitely bad.
pub const AWFUL_BAD: i32 = 0o7777777777;

/// Cost of a page whose badness is [INF_BAD] but which is not overfull.
pub const DEPLORABLE: i32 = 100000;

/// Goal height of each page.
///
/// The last entry applies to every page after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageGoals(Vec<Scaled>);

impl PageGoals {
    pub fn uniform(height: Scaled) -> PageGoals {
        PageGoals(vec![height])
    }

    /// Goals for the first pages, the last repeating.
    ///
    /// No goals is the same as a uniform goal of zero.
    pub fn new(goals: Vec<Scaled>) -> PageGoals {
        if goals.is_empty() {
            return PageGoals::uniform(Scaled::ZERO);
        }
        PageGoals(goals)
    }

    /// Goal of the given page, counting from 1.
    pub fn get(&self, page_number: usize) -> Scaled {
        let i = page_number.clamp(1, self.0.len()) - 1;
        self.0[i]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageParams {
    pub goals: PageGoals,
    /// Maximum depth of the last box on a page.
    pub max_depth: Scaled,
    /// Glue above the first box of each page; its width is the distance
    /// from the top of the page to the first baseline.
    pub top_skip: Glue,
}

impl Default for PageParams {
    fn default() -> Self {
        PageParams {
            goals: PageGoals::uniform(Scaled::ONE * 643),
            max_depth: Scaled::ONE * 4,
            top_skip: Glue::fixed(Scaled::ONE * 10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageContents {
    /// Nothing but discardable material or whatsits has been seen.
    Empty,
    /// At least one box or rule is on the page.
    BoxThere,
}

/// Running measurements of the current page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PageTotals {
    goal: Scaled,
    height: Scaled,
    depth: Scaled,
    stretch: OrderTotals,
    shrink: Scaled,
}

impl PageTotals {
    /// Badness of breaking the page with the current totals.
    fn badness(&self) -> i32 {
        if self.height < self.goal {
            let order = self.stretch.highest_order();
            if order != GlueOrder::Normal {
                0
            } else {
                badness(self.goal - self.height, self.stretch.get(GlueOrder::Normal))
            }
        } else if self.height - self.goal > self.shrink {
            AWFUL_BAD
        } else {
            badness(self.height - self.goal, self.shrink)
        }
    }
}

pub struct PageBuilder {
    params: PageParams,
    contributions: VecDeque<Vertical>,
    page: Vec<Vertical>,
    contents: PageContents,
    totals: PageTotals,
    best_break: usize,
    best_size: Scaled,
    least_cost: i32,
    insert_penalties: i32,
    page_number: usize,
}

impl PageBuilder {
    pub fn new(params: PageParams) -> PageBuilder {
        PageBuilder {
            params,
            contributions: Default::default(),
            page: vec![],
            contents: PageContents::Empty,
            totals: Default::default(),
            best_break: 0,
            best_size: Scaled::ZERO,
            least_cost: AWFUL_BAD,
            insert_penalties: 0,
            page_number: 1,
        }
    }

    pub fn params(&self) -> &PageParams {
        &self.params
    }

    /// Changes the parameters; the change takes effect when the next page starts.
    pub fn set_params(&mut self, params: PageParams) {
        self.params = params;
    }

    /// Number of pages shipped so far.
    pub fn pages_shipped(&self) -> usize {
        self.page_number - 1
    }

    /// Adds material to the end of the contributions.
    pub fn contribute(&mut self, node: Vertical) {
        self.contributions.push_back(node);
    }

    /// Moves contributed material onto the page, shipping every page that is completed.
    pub fn build(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        while let Some(node) = self.contributions.pop_front() {
            if self.contents == PageContents::Empty {
                self.move_to_empty_page(node, &*backend);
                continue;
            }
            // A kern is only a breakpoint if glue follows, which is not known yet.
            if let Vertical::Kern(_) = node {
                if self.contributions.is_empty() {
                    self.contributions.push_front(node);
                    break;
                }
            }
            if let Some(pi) = self.break_penalty(&node) {
                if pi < Penalty::INFINITE && self.update_best_break(pi) {
                    self.contributions.push_front(node);
                    self.fire_up(backend)?;
                    continue;
                }
            }
            self.add_to_page(with_finite_shrink(node));
        }
        Ok(())
    }

    /// Forces out all remaining material.
    ///
    /// A page that would contain no boxes or rules is never shipped.
    pub fn finish(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        self.build(backend)?;
        while self.contents != PageContents::Empty {
            self.contribute(Vertical::Glue(node::Glue::new(Glue::infinite_stretch(
                GlueOrder::Fill,
            ))));
            self.contribute(Vertical::Penalty(Penalty::new(Penalty::EJECT)));
            self.build(backend)?;
        }
        if !self.page.is_empty() {
            log::debug!(
                "dropping {} whatsit(s) at the end of the document with no page to hold them",
                self.page.len()
            );
            self.page.clear();
        }
        Ok(())
    }

    /// Handles a node when the page has no boxes yet.
    fn move_to_empty_page(&mut self, node: Vertical, backend: &dyn Backend) {
        match node {
            Vertical::HList(_) | Vertical::VList(_) | Vertical::Rule(_) => {
                let (height, _) = node.box_dimensions().unwrap_or_default();
                self.freeze_page_specs(backend);
                self.contents = PageContents::BoxThere;
                let top_skip = self.params.top_skip;
                let width = if top_skip.width > height {
                    top_skip.width - height
                } else {
                    Scaled::ZERO
                };
                self.contributions.push_front(node);
                self.contributions
                    .push_front(Vertical::Glue(node::Glue::param(
                        "topskip",
                        Glue { width, ..top_skip },
                    )));
            }
            Vertical::Whatsit(_) => self.page.push(node),
            Vertical::Glue(_) | Vertical::Kern(_) | Vertical::Penalty(_) => {}
        }
    }

    fn freeze_page_specs(&mut self, backend: &dyn Backend) {
        self.totals = PageTotals {
            goal: self.params.goals.get(self.page_number),
            ..Default::default()
        };
        self.least_cost = AWFUL_BAD;
        self.insert_penalties = backend.insertion_penalty(self.page_number);
        log::debug!(
            "page {}: goal height={}, max depth={}",
            self.page_number,
            self.totals.goal,
            self.params.max_depth
        );
    }

    /// The penalty of breaking at the node, if the node is a legal breakpoint.
    fn break_penalty(&self, node: &Vertical) -> Option<i32> {
        match node {
            Vertical::Glue(_) => match self.page.last() {
                Some(prev) if prev.precedes_break() => Some(0),
                _ => None,
            },
            Vertical::Kern(_) => match self.contributions.front() {
                Some(Vertical::Glue(_)) => Some(0),
                _ => None,
            },
            Vertical::Penalty(penalty) => Some(penalty.value),
            _ => None,
        }
    }

    /// Records the breakpoint if it is the best so far.
    ///
    /// Returns true if the page should be fired.
    fn update_best_break(&mut self, pi: i32) -> bool {
        let b = self.totals.badness();
        let mut c = if b < AWFUL_BAD {
            if pi <= Penalty::EJECT {
                pi
            } else if b < INF_BAD {
                b.saturating_add(pi).saturating_add(self.insert_penalties)
            } else {
                DEPLORABLE
            }
        } else {
            b
        };
        if self.insert_penalties >= 10000 {
            c = AWFUL_BAD;
        }
        log::debug!(
            "page {} t={} g={} b={} p={} c={}{}",
            self.page_number,
            self.totals.height,
            self.totals.goal,
            b,
            pi,
            c,
            if c <= self.least_cost { "#" } else { "" }
        );
        // Ties go to the later break, to fill the page as much as possible.
        if c <= self.least_cost {
            self.best_break = self.page.len();
            self.best_size = self.totals.goal;
            self.least_cost = c;
        }
        c == AWFUL_BAD || pi <= Penalty::EJECT
    }

    fn add_to_page(&mut self, node: Vertical) {
        let totals = &mut self.totals;
        match &node {
            Vertical::HList(_) | Vertical::VList(_) | Vertical::Rule(_) => {
                let (height, depth) = node.box_dimensions().unwrap_or_default();
                totals.height += totals.depth + height;
                totals.depth = depth;
            }
            Vertical::Glue(glue) => {
                totals.stretch.add(glue.value.stretch, glue.value.stretch_order);
                totals.shrink += glue.value.shrink;
                totals.height += totals.depth + glue.value.width;
                totals.depth = Scaled::ZERO;
            }
            Vertical::Kern(kern) => {
                totals.height += totals.depth + kern.width;
                totals.depth = Scaled::ZERO;
            }
            Vertical::Penalty(_) | Vertical::Whatsit(_) => {}
        }
        let max_depth = self.params.max_depth;
        if totals.depth > max_depth {
            totals.height += totals.depth - max_depth;
            totals.depth = max_depth;
        }
        self.page.push(node);
    }

    /// Cuts the page at the best break and ships it.
    fn fire_up(&mut self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        // The break penalty must not fire again when the material is re-contributed.
        let break_node = if self.best_break == self.page.len() {
            self.contributions.front_mut()
        } else {
            self.page.get_mut(self.best_break)
        };
        if let Some(Vertical::Penalty(penalty)) = break_node {
            penalty.value = Penalty::INFINITE;
        }
        let mut page = std::mem::take(&mut self.page);
        let rest = page.split_off(self.best_break);
        for node in rest.into_iter().rev() {
            self.contributions.push_front(node);
        }
        let packed = pack::vpack(
            page,
            PackTarget::Exactly(self.best_size),
            self.params.max_depth,
            &PackLimits::SILENT,
        );
        let page_number = self.page_number;
        log::info!(
            "shipping page {page_number} (height {}, cost {})",
            packed.node.height,
            self.least_cost
        );
        self.start_new_page();
        self.page_number += 1;
        backend.receive(page_number, packed.node)
    }

    fn start_new_page(&mut self) {
        self.contents = PageContents::Empty;
        self.page.clear();
        self.totals = Default::default();
        self.best_break = 0;
        self.least_cost = AWFUL_BAD;
    }
}

/// Makes infinite shrink finite; such glue has no place on a page.
fn with_finite_shrink(node: Vertical) -> Vertical {
    match node {
        Vertical::Glue(mut glue) if glue.value.has_infinite_shrink() => {
            log::warn!("infinite glue shrinkage found on the current page; it will be made finite");
            glue.value = glue.value.with_finite_shrink();
            Vertical::Glue(glue)
        }
        other => other,
    }
}

impl Extend<Vertical> for PageBuilder {
    fn extend<T: IntoIterator<Item = Vertical>>(&mut self, iter: T) {
        self.contributions.extend(iter);
    }
}

impl std::fmt::Debug for PageBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuilder")
            .field("page_number", &self.page_number)
            .field("contributions", &self.contributions.len())
            .field("page", &self.page.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Collect;
    use crate::node::{HList, VList};

    fn boxes(page: &VList) -> impl Iterator<Item = &Vertical> {
        page.list
            .iter()
            .filter(|node| matches!(node, Vertical::HList(_) | Vertical::VList(_)))
    }

    fn pt(n: i32) -> Scaled {
        Scaled::ONE * n
    }

    fn line(height: i32) -> Vertical {
        Vertical::HList(HList {
            width: pt(100),
            height: pt(height),
            depth: pt(2),
            ..Default::default()
        })
    }

    fn skip(width: i32, stretch: i32) -> Vertical {
        Vertical::Glue(node::Glue::new(Glue::new(pt(width), pt(stretch), Scaled::ZERO)))
    }

    fn builder(goal: i32) -> PageBuilder {
        PageBuilder::new(PageParams {
            goals: PageGoals::uniform(pt(goal)),
            max_depth: pt(4),
            top_skip: Glue::fixed(pt(10)),
        })
    }

    fn run(builder: &mut PageBuilder, list: Vec<Vertical>) -> Collect {
        let mut backend = Collect::default();
        builder.extend(list);
        builder.build(&mut backend).unwrap();
        builder.finish(&mut backend).unwrap();
        backend
    }

    #[test]
    fn short_list_is_one_page() {
        let mut b = builder(100);
        let backend = run(&mut b, vec![line(8), skip(2, 1), line(8), skip(2, 1), line(8)]);
        assert_eq!(backend.pages.len(), 1);
        let page = &backend.pages[0];
        assert_eq!(page.height, pt(100));
        assert_eq!(boxes(page).count(), 3);
    }

    #[test]
    fn empty_input_has_no_pages() {
        let mut b = builder(100);
        let backend = run(&mut b, vec![skip(10, 0), Vertical::Penalty(Penalty::new(-10000))]);
        assert!(backend.pages.is_empty());
    }

    #[test]
    fn topskip_glue() {
        let mut b = builder(100);
        let backend = run(&mut b, vec![line(7)]);
        let page = &backend.pages[0];
        match &page.list[0] {
            Vertical::Glue(glue) => {
                assert_eq!(glue.kind, node::GlueKind::Param("topskip"));
                assert_eq!(glue.value.width, pt(3));
            }
            other => panic!("expected topskip glue, got {other:?}"),
        }
    }

    #[test]
    fn forced_break() {
        let mut b = builder(100);
        let backend = run(
            &mut b,
            vec![
                line(8),
                Vertical::Penalty(Penalty::new(Penalty::EJECT)),
                line(8),
            ],
        );
        assert_eq!(backend.pages.len(), 2);
        assert_eq!(boxes(&backend.pages[0]).count(), 1);
        assert_eq!(boxes(&backend.pages[1]).count(), 1);
    }

    #[test]
    fn long_list_is_split() {
        let mut b = builder(100);
        let mut list = vec![];
        for _ in 0..20 {
            list.push(line(10));
            list.push(skip(2, 1));
        }
        let backend = run(&mut b, list);
        assert!(backend.pages.len() > 1);
        let total: usize = backend.pages.iter().map(|p| boxes(p).count()).sum();
        assert_eq!(total, 20);
        for page in &backend.pages {
            assert_eq!(page.height, pt(100));
        }
        assert_eq!(b.pages_shipped(), backend.pages.len());
    }

    #[test]
    fn oversized_box_still_ships() {
        let mut b = builder(100);
        let backend = run(&mut b, vec![line(200), skip(2, 0), line(10)]);
        assert_eq!(backend.pages.len(), 2);
    }

    #[test]
    fn page_goals_vary() {
        let mut b = PageBuilder::new(PageParams {
            goals: PageGoals::new(vec![pt(50), pt(100)]),
            ..Default::default()
        });
        let backend = run(
            &mut b,
            vec![
                line(8),
                Vertical::Penalty(Penalty::new(Penalty::EJECT)),
                line(8),
                Vertical::Penalty(Penalty::new(Penalty::EJECT)),
                line(8),
            ],
        );
        let heights: Vec<Scaled> = backend.pages.iter().map(|p| p.height).collect();
        assert_eq!(heights, vec![pt(50), pt(100), pt(100)]);
    }

    struct Penalizing(Collect);

    impl Backend for Penalizing {
        fn receive(&mut self, page_number: usize, page: VList) -> Result<(), BackendError> {
            self.0.receive(page_number, page)
        }

        fn insertion_penalty(&self, _: usize) -> i32 {
            10000
        }
    }

    #[test]
    fn infinite_insertion_penalty_breaks_at_first_opportunity() {
        let mut b = builder(100);
        let mut backend = Penalizing(Collect::default());
        b.extend(vec![line(8), skip(2, 1), line(8), skip(2, 1), line(8)]);
        b.finish(&mut backend).unwrap();
        assert_eq!(backend.0.pages.len(), 3);
    }
}
