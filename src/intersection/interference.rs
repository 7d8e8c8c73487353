use crate::config::IntersectionConfig;
use crate::geometry::BezierPatch;

use super::region::PatchRegion;

/// Conservative overlap test between a pair of regions.
///
/// A `false` result proves the regions cannot intersect; `true` only means
/// the pair must be examined further. Two rejection stages run in order:
/// bounding boxes, then a plane-side separation test when one region has
/// already been classified flat.
#[must_use]
pub fn may_interfere(a: &PatchRegion, b: &PatchRegion, config: &IntersectionConfig) -> bool {
    let dtol = config.distance_tolerance;
    if !a.bbox.overlaps_with_tolerance(&b.bbox, dtol) {
        return false;
    }

    // When exactly one side is flat, its fitted plane separates the pair if
    // the other side's whole control grid lies strictly on one side. Frames
    // are only cached for flat regions, so using one here is sound.
    match (a.cached_frame(), b.cached_frame()) {
        (Some(frame), None) => !separated_by_plane(frame, &b.patch, dtol),
        (None, Some(frame)) => !separated_by_plane(frame, &a.patch, dtol),
        _ => true,
    }
}

fn separated_by_plane(
    frame: &super::classify::PlaneFrame,
    patch: &BezierPatch,
    dtol: f64,
) -> bool {
    let mut all_above = true;
    let mut all_below = true;
    for i in 0..patch.nu() {
        for j in 0..patch.nv() {
            let d = frame.signed_distance(&patch.control_point(i, j));
            if d <= dtol {
                all_above = false;
            }
            if d >= -dtol {
                all_below = false;
            }
            if !all_above && !all_below {
                return false;
            }
        }
    }
    true
}
