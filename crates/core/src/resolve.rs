//! Overlap resolution between padded dish boxes.
//!
//! Each pass scans every unordered pair of dishes. An overlapping pair is
//! split along the axis with the smaller overlap first, then along the other
//! one. Per axis the pair goes through a small state machine:
//!
//! ```text
//! Strict(primary) -> Guarded(primary) -> Strict(other) -> Guarded(other) -> Exhausted
//! ```
//!
//! A strict split keeps both content boxes intact; a guarded split may cut
//! into content but only within the span and coverage limits of
//! [`ResolveParams`]. Every attempt snapshots the pair first and restores it
//! when rejected. Pairs that exhaust all attempts stay overlapping for the
//! pass and are retried on the next one, once their neighbours have moved.
//!
//! After the passes, padding is normalized so that each dish keeps the same
//! margin on all four sides, equal to the smallest margin it had left.

use itertools::Itertools;
use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use crate::dish::DishBox;
use crate::geometry::{Axis, BBox, PageBounds, bbox_overlap_strict, overlap_extents, round_coord};
use crate::params::ResolveParams;

/// Which kind of split resolved a pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitMode {
    Strict,
    Guarded,
}

/// One step of the per-pair state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Attempt {
    Strict(Axis),
    Guarded(Axis),
    Exhausted,
}

impl Attempt {
    fn next(self, primary: Axis) -> Attempt {
        match self {
            Attempt::Strict(axis) => Attempt::Guarded(axis),
            Attempt::Guarded(axis) if axis == primary => Attempt::Strict(primary.other()),
            Attempt::Guarded(_) | Attempt::Exhausted => Attempt::Exhausted,
        }
    }
}

/// Padded boxes of a pair, saved before a split attempt.
#[derive(Clone, Copy, Debug)]
struct Snapshot {
    first: BBox,
    second: BBox,
}

impl Snapshot {
    fn take(first: &DishBox, second: &DishBox) -> Self {
        Self {
            first: first.padded,
            second: second.padded,
        }
    }

    fn restore(self, first: &mut DishBox, second: &mut DishBox) {
        first.padded = self.first;
        second.padded = self.second;
    }
}

/// Summary of one resolver run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Passes executed.
    pub passes: usize,
    /// True when a pass found no overlapping pair.
    pub converged: bool,
    pub strict_splits: usize,
    pub guarded_splits: usize,
    /// Pair visits where every split attempt was rejected.
    pub failed_pairs: usize,
    /// Overlapping pairs left after normalization.
    pub residual_overlaps: usize,
}

/// Resolves overlaps between the padded boxes of `dishes`, in place.
///
/// Dishes are reordered by padded `(top, x0)`.
pub fn resolve_overlaps(
    dishes: &mut [DishBox],
    page: &PageBounds,
    params: &ResolveParams,
) -> ResolveReport {
    dishes.sort_by_key(|d| (OrderedFloat(d.padded.top), OrderedFloat(d.padded.x0)));
    let mut report = ResolveReport::default();

    for pass in 1..=params.max_passes {
        report.passes = pass;
        let mut conflicts = 0;
        let mut changed = false;

        // Every conflicting pair is split within the pass, not only the first.
        for (i, j) in (0..dishes.len()).tuple_combinations() {
            let Some((ox, oy)) = overlap_extents(&dishes[i].padded, &dishes[j].padded) else {
                continue;
            };
            conflicts += 1;
            let primary = if ox < oy { Axis::X } else { Axis::Y };
            let (first, second) = pair_mut(dishes, i, j);
            match split_pair(first, second, primary, page, params) {
                Some(SplitMode::Strict) => {
                    report.strict_splits += 1;
                    changed = true;
                }
                Some(SplitMode::Guarded) => {
                    report.guarded_splits += 1;
                    changed = true;
                }
                None => report.failed_pairs += 1,
            }
        }

        if conflicts == 0 {
            report.converged = true;
            break;
        }
        if !changed {
            debug!(pass, conflicts, "resolver stalled");
            break;
        }
    }

    for dish in dishes.iter_mut() {
        dish.padded = dish.padded.clamp_to(page);
        normalize_padding(dish, page);
    }

    report.residual_overlaps = count_overlaps(dishes);
    if report.residual_overlaps > 0 {
        warn!(
            residual = report.residual_overlaps,
            passes = report.passes,
            "overlap resolution left overlapping dishes"
        );
    }
    debug!(?report, "overlap resolution finished");
    report
}

/// Number of dish pairs whose padded boxes overlap.
pub fn count_overlaps(dishes: &[DishBox]) -> usize {
    dishes
        .iter()
        .tuple_combinations()
        .filter(|(a, b)| bbox_overlap_strict(&a.padded, &b.padded))
        .count()
}

/// Shrinks the padded box so all four margins equal the smallest one.
///
/// Margins that cut into the content count as zero, and edges only ever
/// move inward.
pub fn normalize_padding(dish: &mut DishBox, page: &PageBounds) {
    let pad = dish
        .pads()
        .iter()
        .map(|p| p.max(0.0))
        .fold(f64::INFINITY, f64::min);
    let content = dish.content;
    let padded = &mut dish.padded;

    padded.x0 = padded.x0.max(content.x0 - pad);
    padded.top = padded.top.max(content.top - pad);
    padded.x1 = padded.x1.min(content.x1 + pad);
    padded.bottom = padded.bottom.min(content.bottom + pad);
    padded.x0 = padded.x0.min(padded.x1);
    padded.top = padded.top.min(padded.bottom);

    let clamped = padded.clamp_to(page);
    *padded = BBox::new(
        round_coord(clamped.x0),
        round_coord(clamped.top),
        round_coord(clamped.x1),
        round_coord(clamped.bottom),
    );
}

fn pair_mut(dishes: &mut [DishBox], i: usize, j: usize) -> (&mut DishBox, &mut DishBox) {
    debug_assert!(i < j);
    let (head, tail) = dishes.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Runs the attempt sequence for one overlapping pair.
fn split_pair(
    a: &mut DishBox,
    b: &mut DishBox,
    primary: Axis,
    page: &PageBounds,
    params: &ResolveParams,
) -> Option<SplitMode> {
    let mut attempt = Attempt::Strict(primary);
    loop {
        let (axis, mode) = match attempt {
            Attempt::Strict(axis) => (axis, SplitMode::Strict),
            Attempt::Guarded(axis) => (axis, SplitMode::Guarded),
            Attempt::Exhausted => return None,
        };

        let (first, second) = order_on_axis(a, b, axis);
        let snapshot = Snapshot::take(first, second);
        let accepted = match mode {
            SplitMode::Strict => strict_split(first, second, axis),
            SplitMode::Guarded => guarded_split(first, second, axis, page, params),
        };
        if accepted {
            return Some(mode);
        }
        snapshot.restore(first, second);
        attempt = attempt.next(primary);
    }
}

/// Orders the pair so the first box sits on the low side of `axis`.
fn order_on_axis<'a>(
    a: &'a mut DishBox,
    b: &'a mut DishBox,
    axis: Axis,
) -> (&'a mut DishBox, &'a mut DishBox) {
    let mid = |bbox: &BBox| {
        let (lo, hi) = bbox.span(axis);
        lo + hi
    };
    let key = |d: &DishBox| (OrderedFloat(mid(&d.padded)), OrderedFloat(mid(&d.content)));
    if key(&*b) < key(&*a) { (b, a) } else { (a, b) }
}

/// Midpoint of the overlap between the two padded boxes on `axis`.
fn overlap_midpoint(first: &DishBox, second: &DishBox, axis: Axis) -> f64 {
    let (f_lo, f_hi) = first.padded.span(axis);
    let (s_lo, s_hi) = second.padded.span(axis);
    (f_lo.max(s_lo) + f_hi.min(s_hi)) / 2.0
}

/// Splits at the overlap midpoint, moved into the gap between the two
/// content boxes. Fails when either content box would be cut or already
/// sticks out of its padded box. Edges only move inward.
fn strict_split(first: &mut DishBox, second: &mut DishBox, axis: Axis) -> bool {
    let (_, c1_hi) = first.content.span(axis);
    let (c2_lo, _) = second.content.span(axis);
    let (f_lo, f_hi) = first.padded.span(axis);
    let (s_lo, s_hi) = second.padded.span(axis);

    if c1_hi > c2_lo || c1_hi > f_hi || c2_lo < s_lo {
        return false;
    }

    let boundary = overlap_midpoint(first, second, axis).clamp(c1_hi, c2_lo);
    let first_hi = f_hi.min(boundary);
    let second_lo = s_lo.max(boundary);

    first.padded.set_span(axis, f_lo, first_hi);
    second.padded.set_span(axis, second_lo, s_hi);
    true
}

/// Splits at the overlap midpoint without protecting content, then checks
/// how much of each box survived.
fn guarded_split(
    first: &mut DishBox,
    second: &mut DishBox,
    axis: Axis,
    page: &PageBounds,
    params: &ResolveParams,
) -> bool {
    let mid = overlap_midpoint(first, second, axis);
    let (f_lo, f_hi) = first.padded.span(axis);
    let (s_lo, s_hi) = second.padded.span(axis);
    let pre_first = f_hi - f_lo;
    let pre_second = s_hi - s_lo;

    first.padded.set_span(axis, f_lo, mid.min(f_hi));
    second.padded.set_span(axis, mid.max(s_lo), s_hi);
    first.padded = first.padded.clamp_to(page);
    second.padded = second.padded.clamp_to(page);

    let keeps_enough = |dish: &DishBox, pre_span: f64| {
        let span = dish.padded.extent(axis);
        let content_span = dish.content.extent(axis);
        let coverage = if content_span > 0.0 {
            span / content_span
        } else {
            1.0
        };
        span >= params.min_split_span.max(params.min_split_span_ratio * pre_span)
            && coverage >= params.min_content_coverage
    };

    keeps_enough(&*first, pre_first)
        && keeps_enough(&*second, pre_second)
        && !bbox_overlap_strict(&first.padded, &second.padded)
}
