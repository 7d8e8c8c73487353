//! Surface-surface intersection.
//!
//! The pipeline: subdivide both patches until flat ([`search`]), intersect
//! triangle pairs into raw segments ([`triangle`]), drop duplicates
//! ([`segment`]), chain segments into curves ([`assemble`]), refine the
//! chained points with Newton-Raphson ([`refine`]) and package the outcome
//! ([`result`]).

pub mod assemble;
pub mod classify;
pub mod interference;
pub mod refine;
pub mod region;
pub mod result;
pub mod search;
pub mod segment;
pub mod triangle;

pub use result::{IntersectionCurve3D, IntersectionPoint3D, IntersectionResult};

use crate::config::IntersectionConfig;
use crate::error::{IntersectionError, Result};
use crate::geometry::BezierPatch;
use crate::math::{Point2, Point3, Vector2, Vector3, TOLERANCE};

use classify::{edge_is_straight, PlaneFrame};
use segment::{PointInfo, SegmentInfo};

/// Computes the intersection set of two Bezier patches.
///
/// Returns one entry per connected component: a polyline curve, or an
/// isolated touch point where the surfaces meet without crossing.
/// Tolerances come from `config`;
/// [`IntersectionConfig::for_surface_intersection`] is the usual choice.
///
/// # Errors
///
/// Returns [`IntersectionError::IndefiniteSolution`] when both patches are
/// planar, lie in the same plane and overlap with positive area: that
/// overlap is a 2D set, not a curve, and the caller decides the fallback.
/// Coplanar patches that only touch along a shared straight edge still
/// yield that edge as a curve.
pub fn surface_surface_intersect(
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Result<Vec<IntersectionResult>> {
    if !patch_a
        .enclosing_box()
        .overlaps_with_tolerance(&patch_b.enclosing_box(), config.distance_tolerance)
    {
        return Ok(Vec::new());
    }
    match coplanar_contact(patch_a, patch_b, config) {
        Some(CoplanarContact::AreaOverlap) => {
            return Err(IntersectionError::IndefiniteSolution(
                "surfaces are planar and coincident over their overlap",
            )
            .into());
        }
        Some(CoplanarContact::SharedEdge(segment)) => {
            let chains = assemble::assemble_chains(&[segment], config);
            return Ok(chains
                .iter()
                .filter_map(|chain| result::build_result(chain, patch_a, patch_b, config))
                .collect());
        }
        Some(CoplanarContact::Separate) => return Ok(Vec::new()),
        None => {}
    }

    let mut segments = search::collect_segments(patch_a, patch_b, config);
    segment::deduplicate_segments(&mut segments, config);
    let chains = assemble::assemble_chains(&segments, config);

    let results = chains
        .iter()
        .filter_map(|chain| result::build_result(chain, patch_a, patch_b, config))
        .collect();
    Ok(results)
}

/// How two coplanar flat patches meet in their common plane.
enum CoplanarContact {
    /// The footprints overlap with positive area; the intersection is a 2D
    /// region.
    AreaOverlap,
    /// The footprints touch along a collinear piece of their boundaries.
    SharedEdge(SegmentInfo),
    /// Same plane, but the footprints stay apart (or touch in at most a
    /// corner point).
    Separate,
}

/// Detects the coplanar special case. `None` means at least one patch is
/// curved or the planes differ; the subdivision pipeline handles those.
fn coplanar_contact(
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Option<CoplanarContact> {
    let dtol = config.distance_tolerance;
    let (Some(frame_a), Some(frame_b)) = (
        PlaneFrame::fit(patch_a, dtol),
        PlaneFrame::fit(patch_b, dtol),
    ) else {
        return None;
    };
    let in_plane = |patch: &BezierPatch, frame: &PlaneFrame| {
        (0..patch.nu()).all(|i| {
            (0..patch.nv())
                .all(|j| frame.signed_distance(&patch.control_point(i, j)).abs() <= dtol)
        })
    };
    let coincident = in_plane(patch_a, &frame_a)
        && in_plane(patch_b, &frame_b)
        && in_plane(patch_b, &frame_a)
        && in_plane(patch_a, &frame_b);
    if !coincident {
        return None;
    }

    let corner_quad = |patch: &BezierPatch| {
        [0, 1, 2, 3].map(|k| frame_a.project(&corner_edge(patch, k).0))
    };
    let qa = corner_quad(patch_a);
    let qb = corner_quad(patch_b);
    if quads_overlap_with_area(&qa, &qb, dtol) {
        return Some(CoplanarContact::AreaOverlap);
    }
    if let Some(segment) = shared_boundary_segment(patch_a, patch_b, config) {
        return Some(CoplanarContact::SharedEdge(segment));
    }
    Some(CoplanarContact::Separate)
}

/// Separating-axis test on the projected corner quadrilaterals. Each quad
/// edge normal is an axis; the footprints overlap with positive area only
/// if the projections overlap by more than `dtol` on every axis.
fn quads_overlap_with_area(qa: &[Point2; 4], qb: &[Point2; 4], dtol: f64) -> bool {
    for quad in [qa, qb] {
        for k in 0..4 {
            let e = quad[(k + 1) % 4] - quad[k];
            let len = e.norm();
            if len < TOLERANCE {
                continue;
            }
            let axis = Vector2::new(-e.y, e.x) / len;
            let (a_lo, a_hi) = project_extent(qa, &axis);
            let (b_lo, b_hi) = project_extent(qb, &axis);
            if a_hi.min(b_hi) - a_lo.max(b_lo) <= dtol {
                return false;
            }
        }
    }
    true
}

fn project_extent(quad: &[Point2; 4], axis: &Vector2) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for q in quad {
        let s = q.coords.dot(axis);
        lo = lo.min(s);
        hi = hi.max(s);
    }
    (lo, hi)
}

/// Corner `k` of the patch footprint (counter-clockwise in parameters) and
/// its parameter coordinates. Edge `k` runs from corner `k` to corner
/// `k + 1`, matching [`BezierPatch::boundary_polygon`] numbering.
fn corner_edge(patch: &BezierPatch, k: usize) -> (Point3, (f64, f64)) {
    let nu = patch.nu();
    let nv = patch.nv();
    match k % 4 {
        0 => (patch.control_point(0, 0), (0.0, 0.0)),
        1 => (patch.control_point(nu - 1, 0), (1.0, 0.0)),
        2 => (patch.control_point(nu - 1, nv - 1), (1.0, 1.0)),
        _ => (patch.control_point(0, nv - 1), (0.0, 1.0)),
    }
}

/// Searches the two boundaries for a collinear overlap longer than the
/// distance tolerance and returns it as a raw segment carrying both
/// parameter preimages. Only straight boundary edges qualify.
fn shared_boundary_segment(
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Option<SegmentInfo> {
    let dtol = config.distance_tolerance;
    for ea in 0..4 {
        let (a0, auv0) = corner_edge(patch_a, ea);
        let (a1, auv1) = corner_edge(patch_a, ea + 1);
        let edge = a1 - a0;
        let len = edge.norm();
        if len <= dtol || !edge_is_straight(&patch_a.boundary_polygon(ea), dtol) {
            continue;
        }
        let dir = edge / len;
        for eb in 0..4 {
            let (b0, buv0) = corner_edge(patch_b, eb);
            let (b1, buv1) = corner_edge(patch_b, eb + 1);
            if distance_to_line(&b0, &a0, &dir) > dtol
                || distance_to_line(&b1, &a0, &dir) > dtol
                || !edge_is_straight(&patch_b.boundary_polygon(eb), dtol)
            {
                continue;
            }
            let tb0 = (b0 - a0).dot(&dir);
            let tb1 = (b1 - a0).dot(&dir);
            let lo = tb0.min(tb1).max(0.0);
            let hi = tb0.max(tb1).min(len);
            if hi - lo <= dtol {
                continue;
            }
            let endpoint = |t: f64| {
                let point = a0 + dir * t;
                let sa = t / len;
                let sb = (t - tb0) / (tb1 - tb0);
                let au = auv0.0 + sa * (auv1.0 - auv0.0);
                let av = auv0.1 + sa * (auv1.1 - auv0.1);
                let bu = buv0.0 + sb * (buv1.0 - buv0.0);
                let bv = buv0.1 + sb * (buv1.1 - buv0.1);
                PointInfo::new(point, au, av, bu, bv, patch_a, patch_b, config)
            };
            return Some(SegmentInfo::new(endpoint(lo), endpoint(hi)));
        }
    }
    None
}

fn distance_to_line(point: &Point3, origin: &Point3, dir: &Vector3) -> f64 {
    let e = point - origin;
    (e - dir * e.dot(dir)).norm()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::aabb::Aabb;
    use crate::math::Point3;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn config() -> IntersectionConfig {
        IntersectionConfig::for_surface_intersection()
    }

    fn ground() -> BezierPatch {
        BezierPatch::new(vec![
            vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            vec![p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0)],
        ])
        .unwrap()
    }

    fn wall() -> BezierPatch {
        BezierPatch::new(vec![
            vec![p(0.0, 0.5, -0.5), p(0.0, 0.5, 0.5)],
            vec![p(1.0, 0.5, -0.5), p(1.0, 0.5, 0.5)],
        ])
        .unwrap()
    }

    /// Biquadratic bump rising to z = 0.25 over the unit square.
    fn dome() -> BezierPatch {
        BezierPatch::new(vec![
            vec![p(0.0, 0.0, 0.0), p(0.0, 0.5, 0.0), p(0.0, 1.0, 0.0)],
            vec![p(0.5, 0.0, 0.0), p(0.5, 0.5, 1.0), p(0.5, 1.0, 0.0)],
            vec![p(1.0, 0.0, 0.0), p(1.0, 0.5, 0.0), p(1.0, 1.0, 0.0)],
        ])
        .unwrap()
    }

    fn shifted(patch: &BezierPatch, dz: f64) -> BezierPatch {
        let points = (0..patch.nu())
            .map(|i| {
                (0..patch.nv())
                    .map(|j| {
                        let c = patch.control_point(i, j);
                        p(c.x, c.y, c.z + dz)
                    })
                    .collect()
            })
            .collect();
        BezierPatch::new(points).unwrap()
    }

    fn curve_points(results: &[IntersectionResult]) -> Vec<Point3> {
        results
            .iter()
            .flat_map(|r| match r {
                IntersectionResult::Curve(c) => c.curve3d().to_vec(),
                IntersectionResult::Point(t) => vec![t.point],
            })
            .collect()
    }

    #[test]
    fn disjoint_patches_return_empty() {
        let far = shifted(&ground(), 10.0);
        let results = surface_surface_intersect(&ground(), &far, &config()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn crossing_planes_give_one_spanning_curve() {
        let results = surface_surface_intersect(&ground(), &wall(), &config()).unwrap();
        assert_eq!(results.len(), 1);
        let IntersectionResult::Curve(curve) = &results[0] else {
            panic!("expected a curve");
        };
        assert!(!curve.is_closed());

        // The curve spans the whole shared edge y = 0.5, z = 0.
        let xs: Vec<f64> = curve.curve3d().iter().map(|q| q.x).collect();
        let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(lo < 0.01 && hi > 0.99);
        for q in curve.curve3d() {
            assert!((q.y - 0.5).abs() < 1e-6);
            assert!(q.z.abs() < 1e-6);
        }
    }

    #[test]
    fn results_lie_on_both_surfaces() {
        let (a, b) = (ground(), dome());
        // Sink the dome so its waist crosses the ground plane.
        let b = shifted(&b, -0.1);
        let cfg = config();
        let results = surface_surface_intersect(&a, &b, &cfg).unwrap();
        assert!(!results.is_empty());

        // Refined points hold `A(uv1) = B(uv2)` to the distance tolerance;
        // the factor 2 covers points Newton leaves unrefined, which carry
        // the flat-triangle approximation error of both patches.
        let limit = 2.0 * cfg.distance_tolerance;
        for r in &results {
            let IntersectionResult::Curve(curve) = r else {
                continue;
            };
            for ((q, uv1), uv2) in curve
                .curve3d()
                .iter()
                .zip(curve.curve2d1())
                .zip(curve.curve2d2())
            {
                let on_a = a.coordinates(uv1.x, uv1.y).unwrap();
                let on_b = b.coordinates(uv2.x, uv2.y).unwrap();
                assert!((on_a - on_b).norm() < limit);
                assert!((on_a - q).norm() < limit);
                assert!((on_b - q).norm() < limit);
            }
        }
    }

    #[test]
    fn interior_crossing_gives_closed_loop() {
        // Plane at z = 0.1 cuts the dome in a loop strictly inside both
        // patches.
        let plane = shifted(&ground(), 0.1);
        let results = surface_surface_intersect(&dome(), &plane, &config()).unwrap();
        assert_eq!(results.len(), 1);
        let IntersectionResult::Curve(curve) = &results[0] else {
            panic!("expected a curve");
        };
        assert!(curve.is_closed());
        assert!(curve.curve3d().len() > 4);
        for q in curve.curve3d() {
            assert!((q.z - 0.1).abs() < 0.02);
        }
    }

    /// Largest distance from any vertex of `from` to the polyline `onto`.
    fn max_deviation_2d(from: &[Point2], onto: &[Point2]) -> f64 {
        from.iter()
            .map(|q| {
                onto.windows(2)
                    .map(|w| {
                        let ab = w[1] - w[0];
                        let len2 = ab.norm_squared();
                        if len2 == 0.0 {
                            return (q - w[0]).norm();
                        }
                        let t = ((q - w[0]).dot(&ab) / len2).clamp(0.0, 1.0);
                        (q - (w[0] + ab * t)).norm()
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .fold(0.0, f64::max)
    }

    #[test]
    fn argument_order_only_swaps_parameter_planes() {
        // Plane z = 0.1 with u running right-to-left, so the two parameter
        // planes are genuinely distinct.
        let plane = BezierPatch::new(vec![
            vec![p(1.0, 0.0, 0.1), p(1.0, 1.0, 0.1)],
            vec![p(0.0, 0.0, 0.1), p(0.0, 1.0, 0.1)],
        ])
        .unwrap();
        let forward = surface_surface_intersect(&dome(), &plane, &config()).unwrap();
        let backward = surface_surface_intersect(&plane, &dome(), &config()).unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        let (IntersectionResult::Curve(cf), IntersectionResult::Curve(cb)) =
            (&forward[0], &backward[0])
        else {
            panic!("expected curves");
        };

        // Basis surfaces swap with the argument order.
        assert_eq!(
            cf.basis_surface1().control_point(1, 1),
            dome().control_point(1, 1)
        );
        assert_eq!(
            cb.basis_surface2().control_point(1, 1),
            dome().control_point(1, 1)
        );
        assert_eq!(
            cf.basis_surface2().control_point(0, 0),
            plane.control_point(0, 0)
        );
        assert_eq!(
            cb.basis_surface1().control_point(0, 0),
            plane.control_point(0, 0)
        );

        // Each parameter-plane image matches its swapped counterpart; the
        // two runs subdivide differently so only polyline proximity is
        // comparable, not the vertex sets. A missed swap would be off by
        // the plane's mirrored u, far beyond this bound.
        assert!(max_deviation_2d(cf.curve2d1(), cb.curve2d2()) < 0.04);
        assert!(max_deviation_2d(cb.curve2d2(), cf.curve2d1()) < 0.04);
        assert!(max_deviation_2d(cf.curve2d2(), cb.curve2d1()) < 0.04);
        assert!(max_deviation_2d(cb.curve2d1(), cf.curve2d2()) < 0.04);

        let bf = Aabb::from_points(&curve_points(&forward)).unwrap();
        let bb = Aabb::from_points(&curve_points(&backward)).unwrap();
        assert!((bf.min - bb.min).norm() < 0.05);
        assert!((bf.max - bb.max).norm() < 0.05);
    }

    #[test]
    fn repeated_runs_agree() {
        let results = surface_surface_intersect(&ground(), &wall(), &config()).unwrap();
        let again = surface_surface_intersect(&ground(), &wall(), &config()).unwrap();
        assert_eq!(results.len(), again.len());
        let (IntersectionResult::Curve(c1), IntersectionResult::Curve(c2)) =
            (&results[0], &again[0])
        else {
            panic!("expected curves");
        };
        assert_eq!(c1.curve3d().len(), c2.curve3d().len());
        for (p1, p2) in c1.curve3d().iter().zip(c2.curve3d()) {
            assert!((p1 - p2).norm() < 1e-12);
        }
    }

    #[test]
    fn coincident_planar_patches_are_indefinite() {
        let a = ground();
        // Same plane, shifted footprint, overlapping over half the square.
        let b = BezierPatch::new(vec![
            vec![p(0.5, 0.0, 0.0), p(0.5, 1.0, 0.0)],
            vec![p(1.5, 0.0, 0.0), p(1.5, 1.0, 0.0)],
        ])
        .unwrap();
        let err = surface_surface_intersect(&a, &b, &config()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::SurfisError::Intersection(
                crate::error::IntersectionError::IndefiniteSolution(_)
            )
        ));
    }

    #[test]
    fn coplanar_patches_sharing_an_edge_yield_that_edge() {
        // Two unit squares in z = 0, side by side, sharing the edge y = 1.
        let a = ground();
        let b = BezierPatch::new(vec![
            vec![p(0.0, 1.0, 0.0), p(0.0, 2.0, 0.0)],
            vec![p(1.0, 1.0, 0.0), p(1.0, 2.0, 0.0)],
        ])
        .unwrap();
        let results = surface_surface_intersect(&a, &b, &config()).unwrap();
        assert_eq!(results.len(), 1);
        let IntersectionResult::Curve(curve) = &results[0] else {
            panic!("expected a curve");
        };

        let pts = curve.curve3d();
        let length: f64 = pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        assert!((length - 1.0).abs() < 1e-2);
        for (q, (uv1, uv2)) in pts
            .iter()
            .zip(curve.curve2d1().iter().zip(curve.curve2d2()))
        {
            assert!((q.y - 1.0).abs() < 1e-6);
            assert!(q.z.abs() < 1e-6);
            // The edge is v = 1 on the first patch and v = 0 on the second.
            assert!((uv1.y - 1.0).abs() < 1e-6);
            assert!(uv2.y.abs() < 1e-6);
        }
    }

    #[test]
    fn coplanar_patches_touching_at_a_corner_return_empty() {
        let a = ground();
        let b = BezierPatch::new(vec![
            vec![p(1.0, 1.0, 0.0), p(1.0, 2.0, 0.0)],
            vec![p(2.0, 1.0, 0.0), p(2.0, 2.0, 0.0)],
        ])
        .unwrap();
        let results = surface_surface_intersect(&a, &b, &config()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn shared_fold_edge_gives_one_straight_curve() {
        // Two flat patches meeting at a right angle along y = 1, z = 0.
        let a = ground();
        let b = BezierPatch::new(vec![
            vec![p(0.0, 1.0, 0.0), p(0.0, 1.0, 1.0)],
            vec![p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0)],
        ])
        .unwrap();
        let results = surface_surface_intersect(&a, &b, &config()).unwrap();
        assert_eq!(results.len(), 1);
        let IntersectionResult::Curve(curve) = &results[0] else {
            panic!("expected a curve");
        };

        let pts = curve.curve3d();
        let first = pts[0];
        let last = pts[pts.len() - 1];
        let length: f64 = pts.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        assert!(((last - first).norm() - 1.0).abs() < 1e-2);
        assert!((length - 1.0).abs() < 1e-2);
        for q in pts {
            assert!((q.y - 1.0).abs() < 1e-2);
            assert!(q.z.abs() < 1e-2);
        }
    }

    #[test]
    fn diagonal_triangle_split_leaves_no_duplicate_pieces() {
        // A flat square is split into 2 triangles internally; the crossing
        // wall must still come back as one clean spanning curve, not a
        // doubled one.
        let results = surface_surface_intersect(&ground(), &wall(), &config()).unwrap();
        assert_eq!(results.len(), 1);
        let IntersectionResult::Curve(curve) = &results[0] else {
            panic!("expected a curve");
        };
        // x values strictly ordered one way: no backtracking over the
        // diagonal crossing at x = 0.5.
        let xs: Vec<f64> = curve.curve3d().iter().map(|q| q.x).collect();
        let ascending = xs.windows(2).all(|w| w[1] > w[0] - 1e-9);
        let descending = xs.windows(2).all(|w| w[1] < w[0] + 1e-9);
        assert!(ascending || descending);
    }

    #[test]
    fn basis_surfaces_are_recorded() {
        let results = surface_surface_intersect(&ground(), &wall(), &config()).unwrap();
        let IntersectionResult::Curve(curve) = &results[0] else {
            panic!("expected a curve");
        };
        assert_eq!(curve.basis_surface1().nu(), ground().nu());
        assert_eq!(curve.basis_surface2().nv(), wall().nv());
    }
}
