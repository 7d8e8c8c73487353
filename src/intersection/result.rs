use crate::config::IntersectionConfig;
use crate::geometry::BezierPatch;
use crate::math::{Point2, Point3};

use super::assemble::Chain;
use super::refine::refine_point;
use super::segment::PointInfo;

/// A polyline intersection curve with its parameter-space images on both
/// surfaces.
#[derive(Debug, Clone)]
pub struct IntersectionCurve3D {
    curve3d: Vec<Point3>,
    curve2d1: Vec<Point2>,
    curve2d2: Vec<Point2>,
    closed: bool,
    basis1: BezierPatch,
    basis2: BezierPatch,
}

impl IntersectionCurve3D {
    /// The curve points in 3D.
    #[must_use]
    pub fn curve3d(&self) -> &[Point3] {
        &self.curve3d
    }

    /// The curve's image in the first surface's parameter plane.
    #[must_use]
    pub fn curve2d1(&self) -> &[Point2] {
        &self.curve2d1
    }

    /// The curve's image in the second surface's parameter plane.
    #[must_use]
    pub fn curve2d2(&self) -> &[Point2] {
        &self.curve2d2
    }

    /// Whether the curve is a closed loop (first and last points coincide).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The first surface the curve lies on.
    #[must_use]
    pub fn basis_surface1(&self) -> &BezierPatch {
        &self.basis1
    }

    /// The second surface the curve lies on.
    #[must_use]
    pub fn basis_surface2(&self) -> &BezierPatch {
        &self.basis2
    }
}

/// An isolated touch point between the surfaces.
#[derive(Debug, Clone, Copy)]
pub struct IntersectionPoint3D {
    pub point: Point3,
    pub uv1: Point2,
    pub uv2: Point2,
}

/// One connected component of the intersection set.
#[derive(Debug, Clone)]
pub enum IntersectionResult {
    Curve(IntersectionCurve3D),
    Point(IntersectionPoint3D),
}

/// Refines a chain's points and packages it as a curve or, when it
/// collapses to a single location, a touch point.
///
/// Interior points get the Newton treatment; the open ends of a boundary-
/// to-boundary chain keep their clipped positions so the curve still spans
/// the patch. Consecutive points closer than the distance tolerance are
/// merged afterwards.
#[must_use]
pub fn build_result(
    chain: &Chain,
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Option<IntersectionResult> {
    let raw: Vec<PointInfo> = chain.points().copied().collect();
    if raw.is_empty() {
        return None;
    }
    let closed = chain.is_closed(config);

    let refined = refine_chain_points(&raw, closed, patch_a, patch_b, config);
    let merged = merge_close_points(refined, closed, config);

    match merged.len() {
        0 => None,
        1 => Some(touch_point(&merged[0])),
        2 if closed || points_coincide(&merged[0], &merged[1], config) => {
            let mid = PointInfo::midpoint(&merged[0], &merged[1]);
            Some(touch_point(&mid))
        }
        _ => {
            let mut curve3d: Vec<Point3> = merged.iter().map(|pi| pi.point).collect();
            let mut curve2d1: Vec<Point2> = merged.iter().map(PointInfo::params_a).collect();
            let mut curve2d2: Vec<Point2> = merged.iter().map(PointInfo::params_b).collect();
            if closed {
                // Re-pin the seam exactly.
                curve3d[0] = *curve3d.last()?;
                curve2d1[0] = *curve2d1.last()?;
                curve2d2[0] = *curve2d2.last()?;
            }
            Some(IntersectionResult::Curve(IntersectionCurve3D {
                curve3d,
                curve2d1,
                curve2d2,
                closed,
                basis1: patch_a.clone(),
                basis2: patch_b.clone(),
            }))
        }
    }
}

fn refine_chain_points(
    raw: &[PointInfo],
    closed: bool,
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Vec<PointInfo> {
    let n = raw.len();
    let mut out = Vec::with_capacity(n);
    for (i, pi) in raw.iter().enumerate() {
        let interior = i > 0 && i < n - 1;
        if !interior && !closed {
            out.push(*pi);
            continue;
        }
        // In a closed chain the seam point wraps to the far neighbors; the
        // duplicate last entry is skipped as a neighbor.
        let prev = if i > 0 {
            Some(&raw[i - 1])
        } else {
            raw.get(n.wrapping_sub(2))
        };
        let next = if i < n - 1 {
            Some(&raw[i + 1])
        } else {
            raw.get(1)
        };
        out.push(refine_point(pi, prev, next, patch_a, patch_b, config));
    }
    if closed && n > 1 {
        out[n - 1] = out[0];
    }
    out
}

fn merge_close_points(
    points: Vec<PointInfo>,
    closed: bool,
    config: &IntersectionConfig,
) -> Vec<PointInfo> {
    let mut out: Vec<PointInfo> = Vec::with_capacity(points.len());
    for pi in points {
        match out.last() {
            Some(last) if points_coincide(last, &pi, config) => {
                let merged = PointInfo::midpoint(last, &pi);
                if let Some(slot) = out.last_mut() {
                    *slot = merged;
                }
            }
            _ => out.push(pi),
        }
    }
    // A closed chain keeps its seam duplicate; only a genuine extra merge
    // between last and first (beyond the seam) collapses.
    if !closed && out.len() >= 3 {
        if let (Some(first), Some(last)) = (out.first().copied(), out.last()) {
            if points_coincide(&first, last, config) && out.len() > 3 {
                out.pop();
            }
        }
    }
    out
}

fn points_coincide(a: &PointInfo, b: &PointInfo, config: &IntersectionConfig) -> bool {
    (a.point - b.point).norm() < config.distance_tolerance
}

fn touch_point(pi: &PointInfo) -> IntersectionResult {
    IntersectionResult::Point(IntersectionPoint3D {
        point: pi.point,
        uv1: pi.params_a(),
        uv2: pi.params_b(),
    })
}
