use crate::config::{IntersectionConfig, MAX_SUBDIVISION_DEPTH};
use crate::geometry::BezierPatch;

use super::interference::may_interfere;
use super::region::{PatchRegion, RegionArena, RegionKey, RegionShape};
use super::segment::SegmentInfo;
use super::triangle::{intersect_triangles, triangles_for_region};

/// Adaptive subdivision search for raw intersection segments.
///
/// The second surface is subdivided recursively; each of its regions drags
/// along the set of first-surface regions it may still touch (its rivals).
/// First-surface regions live in a memoized arena so sibling branches share
/// subdivision work. Once a region pair is flat and straight-edged on both
/// sides, it is triangulated and the triangles intersected.
struct SearchContext<'a> {
    arena: RegionArena,
    patch_a: &'a BezierPatch,
    patch_b: &'a BezierPatch,
    config: &'a IntersectionConfig,
    segments: Vec<SegmentInfo>,
}

/// Runs the search over both whole patches.
#[must_use]
pub fn collect_segments(
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Vec<SegmentInfo> {
    let mut arena = RegionArena::new();
    let root_a = arena.insert_root(PatchRegion::root(patch_a));
    let mut ctx = SearchContext {
        arena,
        patch_a,
        patch_b,
        config,
        segments: Vec::new(),
    };
    ctx.explore(PatchRegion::root(patch_b), vec![root_a], 0);
    ctx.segments
}

impl SearchContext<'_> {
    fn explore(&mut self, mut b_region: PatchRegion, rivals: Vec<RegionKey>, depth: u32) {
        let rivals: Vec<RegionKey> = rivals
            .into_iter()
            .filter(|&key| may_interfere(self.arena.region(key), &b_region, self.config))
            .collect();
        if rivals.is_empty() {
            return;
        }

        // At the depth cap the region is treated as flat regardless, so the
        // recursion always terminates.
        let shape = if depth >= MAX_SUBDIVISION_DEPTH {
            RegionShape::Rectangular
        } else {
            b_region.shape(self.config)
        };
        match shape {
            RegionShape::Point | RegionShape::Line => {}
            RegionShape::Rectangular => self.collide(&b_region, rivals, depth),
            RegionShape::Bezier | RegionShape::Planar => {
                for child in b_region.subdivide() {
                    self.explore(child, rivals.clone(), depth + 1);
                }
            }
        }
    }

    /// Intersects a flat B region against its rivals, first subdividing any
    /// rival that is not itself flat and straight-edged yet.
    fn collide(&mut self, b_region: &PatchRegion, rivals: Vec<RegionKey>, depth: u32) {
        let mut refined: Vec<RegionKey> = Vec::with_capacity(rivals.len());
        let mut replaced = false;
        for key in rivals {
            let shape = if depth >= MAX_SUBDIVISION_DEPTH {
                RegionShape::Rectangular
            } else {
                self.arena.shape(key, self.config)
            };
            match shape {
                RegionShape::Point | RegionShape::Line => {}
                RegionShape::Rectangular => refined.push(key),
                RegionShape::Bezier | RegionShape::Planar => {
                    replaced = true;
                    for child in self.arena.children(key) {
                        if may_interfere(self.arena.region(child), b_region, self.config) {
                            refined.push(child);
                        }
                    }
                }
            }
        }
        if refined.is_empty() {
            return;
        }
        if replaced {
            self.collide(b_region, refined, depth + 1);
            return;
        }

        let b_triangles = triangles_for_region(b_region, self.config);
        if b_triangles.is_empty() {
            return;
        }
        for key in refined {
            let a_triangles = triangles_for_region(self.arena.region(key), self.config);
            for a_tri in &a_triangles {
                for b_tri in &b_triangles {
                    if let Some(segment) = intersect_triangles(
                        a_tri,
                        b_tri,
                        self.patch_a,
                        self.patch_b,
                        self.config,
                    ) {
                        self.segments.push(segment);
                    }
                }
            }
        }
    }
}
