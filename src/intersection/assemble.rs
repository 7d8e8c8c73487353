use std::collections::VecDeque;

use crate::config::{IntersectionConfig, RELAXED_GAP_FACTOR};
use crate::math::TOLERANCE;

use super::segment::{PointInfo, SegmentInfo};

/// An ordered run of intersection points built by chaining segments
/// end to end.
#[derive(Debug, Clone)]
pub struct Chain {
    points: VecDeque<PointInfo>,
    length2_sum: f64,
}

/// How strictly segment endpoints must agree to be chained.
///
/// Levels are tried in order; a chain only moves to the next level while it
/// is still incomplete at the current one.
const RELAXATION_LEVELS: u8 = 3;

impl Chain {
    fn from_segment(seg: &SegmentInfo) -> Self {
        let mut points = VecDeque::with_capacity(8);
        points.push_back(seg.p1);
        points.push_back(seg.p2);
        Self {
            points,
            length2_sum: seg.length2,
        }
    }

    /// The points in chain order.
    #[must_use]
    pub fn points(&self) -> impl Iterator<Item = &PointInfo> {
        self.points.iter()
    }

    /// Number of points in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the chain holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of the squared lengths of the chained segments.
    #[must_use]
    pub fn length2_sum(&self) -> f64 {
        self.length2_sum
    }

    fn first(&self) -> Option<&PointInfo> {
        self.points.front()
    }

    fn last(&self) -> Option<&PointInfo> {
        self.points.back()
    }

    /// Whether the chain returns to its start point.
    #[must_use]
    pub fn is_closed(&self, config: &IntersectionConfig) -> bool {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => {
                self.points.len() > 2 && first.matches(last, config, true)
            }
            _ => false,
        }
    }

    /// A chain is complete when it closes on itself or both of its open
    /// ends lie on a patch boundary.
    #[must_use]
    pub fn is_complete(&self, config: &IntersectionConfig) -> bool {
        if self.is_closed(config) {
            return true;
        }
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => {
                first.on_patch_boundary() && last.on_patch_boundary()
            }
            _ => false,
        }
    }

    /// Tries to attach `seg` to either end, merging the junction point.
    fn try_attach(&mut self, seg: &SegmentInfo, level: u8, config: &IntersectionConfig) -> bool {
        let (Some(first), Some(last)) = (self.first().copied(), self.last().copied()) else {
            return false;
        };

        let (junction, incoming, at_back) = if ends_match(&last, &seg.p1, level, config) {
            (PointInfo::midpoint(&last, &seg.p1), seg.p2, true)
        } else if ends_match(&last, &seg.p2, level, config) {
            (PointInfo::midpoint(&last, &seg.p2), seg.p1, true)
        } else if ends_match(&first, &seg.p2, level, config) {
            (PointInfo::midpoint(&first, &seg.p2), seg.p1, false)
        } else if ends_match(&first, &seg.p1, level, config) {
            (PointInfo::midpoint(&first, &seg.p1), seg.p2, false)
        } else {
            return false;
        };

        if at_back {
            if let Some(end) = self.points.back_mut() {
                *end = junction;
            }
            self.points.push_back(incoming);
        } else {
            if let Some(end) = self.points.front_mut() {
                *end = junction;
            }
            self.points.push_front(incoming);
        }
        self.length2_sum += seg.length2;
        true
    }

    /// Appends `other` to this chain's back, merging the junction. `other`
    /// must already be oriented so that its front continues this chain.
    fn append(&mut self, mut other: Self) {
        if let (Some(end), Some(start)) = (self.points.back().copied(), other.points.pop_front())
        {
            if let Some(back) = self.points.back_mut() {
                *back = PointInfo::midpoint(&end, &start);
            }
        }
        self.points.extend(other.points);
        self.length2_sum += other.length2_sum;
    }

    fn reverse(&mut self) {
        let reversed: VecDeque<PointInfo> = self.points.iter().rev().copied().collect();
        self.points = reversed;
    }
}

fn ends_match(a: &PointInfo, b: &PointInfo, level: u8, config: &IntersectionConfig) -> bool {
    match level {
        0 => a.matches(b, config, true),
        1 => {
            a.matches(b, config, false)
                && (a.point - b.point).norm() <= RELAXED_GAP_FACTOR * config.distance_tolerance
        }
        _ => a.matches(b, config, false),
    }
}

/// Chains deduplicated segments into intersection curves.
///
/// Segments are consumed greedily from a pool: each chain grows from a seed
/// segment by attaching pool segments at either end, relaxing the endpoint
/// match in stages while the chain stays incomplete. Open chains are then
/// spliced together where their ends meet. Complete chains (closed, or
/// ending on patch boundaries at both ends) are returned; when none exists,
/// the longest fragment stands in so a genuine crossing is never dropped
/// entirely.
#[must_use]
pub fn assemble_chains(segments: &[SegmentInfo], config: &IntersectionConfig) -> Vec<Chain> {
    let dtol2 = config.distance_tolerance2();
    let mut pool: Vec<Option<SegmentInfo>> = segments
        .iter()
        .filter(|s| s.is_main_line && s.length2 > TOLERANCE * TOLERANCE)
        .cloned()
        .map(Some)
        .collect();

    let mut chains: Vec<Chain> = Vec::new();
    loop {
        // Prefer a seed of meaningful length; tiny slivers seed last.
        let seed_idx = pool
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.length2 >= dtol2))
            .or_else(|| pool.iter().position(Option::is_some));
        let Some(seed_idx) = seed_idx else { break };
        let Some(seed) = pool[seed_idx].take() else {
            break;
        };

        let mut chain = Chain::from_segment(&seed);
        for level in 0..RELAXATION_LEVELS {
            loop {
                if chain.is_complete(config) {
                    break;
                }
                let mut extended = false;
                for slot in &mut pool {
                    let attach = match slot {
                        Some(seg) => chain.try_attach(seg, level, config),
                        None => false,
                    };
                    if attach {
                        *slot = None;
                        extended = true;
                    }
                }
                if !extended {
                    break;
                }
            }
            if chain.is_complete(config) {
                break;
            }
        }
        chains.push(chain);
    }

    splice_chains(&mut chains, config);

    let (complete, fragments): (Vec<Chain>, Vec<Chain>) = chains
        .into_iter()
        .partition(|chain| chain.is_complete(config));
    if !complete.is_empty() {
        return complete;
    }
    fragments
        .into_iter()
        .max_by(|a, b| a.length2_sum.total_cmp(&b.length2_sum))
        .into_iter()
        .collect()
}

/// Joins open chains at their free ends, nearest pair first, repeating
/// until no splice remains.
///
/// Only incomplete chains take part, and only their non-boundary ends: an
/// end that already terminates on a patch boundary is where the curve is
/// supposed to stop, so it never welds to another fragment. The junction
/// point is merged by midpoint like any other junction.
fn splice_chains(chains: &mut Vec<Chain>, config: &IntersectionConfig) {
    loop {
        // (i, j, reverse_i, reverse_j, gap) so that i's back meets j's front.
        let mut best: Option<(usize, usize, bool, bool, f64)> = None;
        for i in 0..chains.len() {
            if chains[i].is_complete(config) {
                continue;
            }
            for j in (i + 1)..chains.len() {
                if chains[j].is_complete(config) {
                    continue;
                }
                for (rev_i, end_i) in [(true, chains[i].first()), (false, chains[i].last())] {
                    let Some(end_i) = end_i else { continue };
                    if end_i.on_patch_boundary() {
                        continue;
                    }
                    for (rev_j, end_j) in [(false, chains[j].first()), (true, chains[j].last())]
                    {
                        let Some(end_j) = end_j else { continue };
                        if end_j.on_patch_boundary() {
                            continue;
                        }
                        let gap = (end_i.point - end_j.point).norm();
                        if best.is_none_or(|b| gap < b.4) {
                            best = Some((i, j, rev_i, rev_j, gap));
                        }
                    }
                }
            }
        }

        let Some((i, j, rev_i, rev_j, _)) = best else {
            break;
        };
        let mut other = chains.swap_remove(j);
        if rev_j {
            other.reverse();
        }
        if rev_i {
            chains[i].reverse();
        }
        chains[i].append(other);
    }
}
