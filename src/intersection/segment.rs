use crate::config::{IntersectionConfig, PARAM_TOLERANCE_MAX};
use crate::geometry::BezierPatch;
use crate::math::aabb::Aabb;
use crate::math::{Point2, Point3, Vector3, TOLERANCE};

/// An intersection point expressed simultaneously as a 3D coordinate and as
/// parameter pairs on both surfaces, with one tolerance per parameter.
///
/// The parameter tolerances convert the 3D distance tolerance into parameter
/// space through the local tangent length, capped at
/// [`PARAM_TOLERANCE_MAX`].
#[derive(Debug, Clone, Copy)]
pub struct PointInfo {
    pub point: Point3,
    pub au: f64,
    pub av: f64,
    pub bu: f64,
    pub bv: f64,
    pub tol_au: f64,
    pub tol_av: f64,
    pub tol_bu: f64,
    pub tol_bv: f64,
}

impl PointInfo {
    /// Builds a point record, deriving per-parameter tolerances from the
    /// root surfaces' tangent lengths at the point.
    #[must_use]
    pub fn new(
        point: Point3,
        au: f64,
        av: f64,
        bu: f64,
        bv: f64,
        patch_a: &BezierPatch,
        patch_b: &BezierPatch,
        config: &IntersectionConfig,
    ) -> Self {
        let (ta_u, ta_v) = patch_a
            .tangent_vectors(au, av)
            .unwrap_or((Vector3::zeros(), Vector3::zeros()));
        let (tb_u, tb_v) = patch_b
            .tangent_vectors(bu, bv)
            .unwrap_or((Vector3::zeros(), Vector3::zeros()));
        let dtol = config.distance_tolerance;
        Self {
            point,
            au,
            av,
            bu,
            bv,
            tol_au: parameter_tolerance(dtol, &ta_u),
            tol_av: parameter_tolerance(dtol, &ta_v),
            tol_bu: parameter_tolerance(dtol, &tb_u),
            tol_bv: parameter_tolerance(dtol, &tb_v),
        }
    }

    /// Parameters on surface A as a 2D point.
    #[must_use]
    pub fn params_a(&self) -> Point2 {
        Point2::new(self.au, self.av)
    }

    /// Parameters on surface B as a 2D point.
    #[must_use]
    pub fn params_b(&self) -> Point2 {
        Point2::new(self.bu, self.bv)
    }

    /// Whether this is the same intersection point as `other`: all four
    /// parameter gaps within the combined tolerances and, when
    /// `check_distance` is set, the 3D distance within the distance
    /// tolerance.
    #[must_use]
    pub fn matches(&self, other: &Self, config: &IntersectionConfig, check_distance: bool) -> bool {
        // The configured parameter tolerance is the floor; the per-point
        // tolerances widen it where tangents are short.
        let ptol = config.parameter_tolerance;
        (self.au - other.au).abs() <= (self.tol_au + other.tol_au).max(ptol)
            && (self.av - other.av).abs() <= (self.tol_av + other.tol_av).max(ptol)
            && (self.bu - other.bu).abs() <= (self.tol_bu + other.tol_bu).max(ptol)
            && (self.bv - other.bv).abs() <= (self.tol_bv + other.tol_bv).max(ptol)
            && (!check_distance
                || (self.point - other.point).norm() <= config.distance_tolerance)
    }

    /// Midpoint interpolation of two near-duplicate points.
    #[must_use]
    pub fn midpoint(a: &Self, b: &Self) -> Self {
        Self {
            point: Point3::from(a.point.coords.lerp(&b.point.coords, 0.5)),
            au: 0.5 * (a.au + b.au),
            av: 0.5 * (a.av + b.av),
            bu: 0.5 * (a.bu + b.bu),
            bv: 0.5 * (a.bv + b.bv),
            tol_au: 0.5 * (a.tol_au + b.tol_au),
            tol_av: 0.5 * (a.tol_av + b.tol_av),
            tol_bu: 0.5 * (a.tol_bu + b.tol_bu),
            tol_bv: 0.5 * (a.tol_bv + b.tol_bv),
        }
    }

    /// Whether the point sits on a parameter boundary of either patch,
    /// judged with the point's own parameter tolerances.
    #[must_use]
    pub fn on_patch_boundary(&self) -> bool {
        self.au <= self.tol_au
            || self.au >= 1.0 - self.tol_au
            || self.av <= self.tol_av
            || self.av >= 1.0 - self.tol_av
            || self.bu <= self.tol_bu
            || self.bu >= 1.0 - self.tol_bu
            || self.bv <= self.tol_bv
            || self.bv >= 1.0 - self.tol_bv
    }
}

fn parameter_tolerance(dtol: f64, tangent: &Vector3) -> f64 {
    let len = tangent.norm();
    if len < TOLERANCE {
        PARAM_TOLERANCE_MAX
    } else {
        (dtol / len).min(PARAM_TOLERANCE_MAX)
    }
}

/// One raw intersection segment produced by a triangle pair.
#[derive(Debug, Clone)]
pub struct SegmentInfo {
    pub p1: PointInfo,
    pub p2: PointInfo,
    pub bbox: Aabb,
    pub length2: f64,
    /// Deduplication survivor flag. Exactly one of any duplicate pair keeps
    /// it set; only flagged segments reach the assembler.
    pub is_main_line: bool,
}

impl SegmentInfo {
    /// Builds a segment from its two endpoint records.
    #[must_use]
    pub fn new(p1: PointInfo, p2: PointInfo) -> Self {
        let bbox = Aabb::from_points([&p1.point, &p2.point])
            .unwrap_or_else(|| Aabb::new(p1.point, p1.point));
        let length2 = (p2.point - p1.point).norm_squared();
        Self {
            p1,
            p2,
            bbox,
            length2,
            is_main_line: true,
        }
    }
}

/// Clears the `is_main_line` flag on every segment that duplicates a longer
/// one.
///
/// Splitting a region into two triangles along a diagonal makes both
/// triangles reproduce the same curve piece; this pass keeps one copy.
pub fn deduplicate_segments(segments: &mut [SegmentInfo], config: &IntersectionConfig) {
    let n = segments.len();
    for i in 0..n {
        if !segments[i].is_main_line {
            continue;
        }
        for j in (i + 1)..n {
            if !segments[j].is_main_line {
                continue;
            }
            if !is_duplicate_pair(&segments[i], &segments[j], config) {
                continue;
            }
            if segments[i].length2 >= segments[j].length2 {
                segments[j].is_main_line = false;
            } else {
                segments[i].is_main_line = false;
                break;
            }
        }
    }
}

fn is_duplicate_pair(a: &SegmentInfo, b: &SegmentInfo, config: &IntersectionConfig) -> bool {
    if !a.bbox.overlaps_with_tolerance(&b.bbox, config.distance_tolerance) {
        return false;
    }

    let m11 = a.p1.matches(&b.p1, config, true);
    let m12 = a.p1.matches(&b.p2, config, true);
    let m21 = a.p2.matches(&b.p1, config, true);
    let m22 = a.p2.matches(&b.p2, config, true);
    let count = usize::from(m11) + usize::from(m12) + usize::from(m21) + usize::from(m22);

    if count >= 2 {
        return true;
    }
    if count == 0 {
        return false;
    }

    // One endpoint pair coincides; the segments still describe the same
    // curve piece if either leftover endpoint lies on the other segment.
    let (a_free, b_free) = if m11 {
        (&a.p2, &b.p2)
    } else if m12 {
        (&a.p2, &b.p1)
    } else if m21 {
        (&a.p1, &b.p2)
    } else {
        (&a.p1, &b.p1)
    };
    point_on_segment(a_free, b, config) || point_on_segment(b_free, a, config)
}

/// Tests whether the projection of `pt` onto `seg` lands inside the segment
/// in 3D and in both parameter planes.
fn point_on_segment(pt: &PointInfo, seg: &SegmentInfo, config: &IntersectionConfig) -> bool {
    // 3D projection.
    let d3 = seg.p2.point - seg.p1.point;
    let len2_3d = d3.norm_squared();
    if len2_3d < TOLERANCE {
        return false;
    }
    let t3 = (pt.point - seg.p1.point).dot(&d3) / len2_3d;
    let slack3 = config.distance_tolerance / len2_3d.sqrt();
    if t3 < -slack3 || t3 > 1.0 + slack3 {
        return false;
    }

    // Parameter-plane projections, judged with the point's own tolerances.
    in_param_range(
        pt.params_a(),
        seg.p1.params_a(),
        seg.p2.params_a(),
        pt.tol_au.max(pt.tol_av),
    ) && in_param_range(
        pt.params_b(),
        seg.p1.params_b(),
        seg.p2.params_b(),
        pt.tol_bu.max(pt.tol_bv),
    )
}

fn in_param_range(pt: Point2, start: Point2, end: Point2, tol: f64) -> bool {
    let d = end - start;
    let len2 = d.norm_squared();
    if len2 < TOLERANCE * TOLERANCE {
        // Segment has no extent in this parameter plane; nothing to violate.
        return true;
    }
    let t = (pt - start).dot(&d) / len2;
    let slack = tol / len2.sqrt();
    t >= -slack && t <= 1.0 + slack
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn flat_pair() -> (BezierPatch, BezierPatch) {
        let a = BezierPatch::new(vec![
            vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            vec![p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)],
        ])
        .unwrap();
        let b = BezierPatch::new(vec![
            vec![p(0.0, 0.5, -0.5), p(0.0, 0.5, 0.5)],
            vec![p(1.0, 0.5, -0.5), p(1.0, 0.5, 0.5)],
        ])
        .unwrap();
        (a, b)
    }

    fn config() -> IntersectionConfig {
        IntersectionConfig::for_surface_intersection()
    }

    fn point_at(x: f64, a: &BezierPatch, b: &BezierPatch) -> PointInfo {
        PointInfo::new(p(x, 0.5, 0.0), x, 0.5, x, 0.5, a, b, &config())
    }

    #[test]
    fn tolerances_follow_tangent_length() {
        let (a, b) = flat_pair();
        let pi = point_at(0.5, &a, &b);
        // Unit-length patch edges: tol = dtol / |tangent| = 1e-2 / 1.
        assert!((pi.tol_au - 0.01).abs() < 1e-12);
        assert!((pi.tol_av - 0.01).abs() < 1e-12);
    }

    #[test]
    fn tolerance_is_capped() {
        let (_, b) = flat_pair();
        // A tiny patch has tiny tangents; the cap takes over.
        let tiny = BezierPatch::new(vec![
            vec![p(0.0, 0.0, 0.0), p(0.0, 1e-4, 0.0)],
            vec![p(1e-4, 0.0, 0.0), p(1e-4, 1e-4, 0.0)],
        ])
        .unwrap();
        let pi = PointInfo::new(p(0.0, 0.0, 0.0), 0.5, 0.5, 0.5, 0.5, &tiny, &b, &config());
        assert!((pi.tol_au - PARAM_TOLERANCE_MAX).abs() < 1e-12);
    }

    #[test]
    fn boundary_detection() {
        let (a, b) = flat_pair();
        assert!(point_at(0.0, &a, &b).on_patch_boundary());
        assert!(point_at(1.0, &a, &b).on_patch_boundary());
        assert!(!point_at(0.5, &a, &b).on_patch_boundary());
    }

    #[test]
    fn identical_segments_deduplicate_to_one() {
        let (a, b) = flat_pair();
        let s1 = SegmentInfo::new(point_at(0.0, &a, &b), point_at(1.0, &a, &b));
        let s2 = SegmentInfo::new(point_at(0.0, &a, &b), point_at(1.0, &a, &b));
        let mut pool = vec![s1, s2];
        deduplicate_segments(&mut pool, &config());
        let main: Vec<_> = pool.iter().filter(|s| s.is_main_line).collect();
        assert_eq!(main.len(), 1);
    }

    #[test]
    fn reversed_duplicate_is_detected() {
        let (a, b) = flat_pair();
        let s1 = SegmentInfo::new(point_at(0.0, &a, &b), point_at(1.0, &a, &b));
        let s2 = SegmentInfo::new(point_at(1.0, &a, &b), point_at(0.0, &a, &b));
        let mut pool = vec![s1, s2];
        deduplicate_segments(&mut pool, &config());
        assert_eq!(pool.iter().filter(|s| s.is_main_line).count(), 1);
    }

    #[test]
    fn contained_segment_with_shared_endpoint_is_duplicate() {
        let (a, b) = flat_pair();
        // Same start, one segment half as long: 1 endpoint match + the
        // short segment's far endpoint lies on the long one.
        let long = SegmentInfo::new(point_at(0.0, &a, &b), point_at(1.0, &a, &b));
        let short = SegmentInfo::new(point_at(0.0, &a, &b), point_at(0.5, &a, &b));
        let mut pool = vec![long, short];
        deduplicate_segments(&mut pool, &config());
        assert!(pool[0].is_main_line, "longer segment must survive");
        assert!(!pool[1].is_main_line);
    }

    #[test]
    fn disjoint_segments_are_kept() {
        let (a, b) = flat_pair();
        let s1 = SegmentInfo::new(point_at(0.0, &a, &b), point_at(0.3, &a, &b));
        let s2 = SegmentInfo::new(point_at(0.6, &a, &b), point_at(1.0, &a, &b));
        let mut pool = vec![s1, s2];
        deduplicate_segments(&mut pool, &config());
        assert_eq!(pool.iter().filter(|s| s.is_main_line).count(), 2);
    }
}
