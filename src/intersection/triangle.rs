use crate::config::IntersectionConfig;
use crate::geometry::BezierPatch;
use crate::math::intersect_3d::{plane_plane_intersect, PlanePairRelation};
use crate::math::{Point2, Point3, Vector2, Vector3, TOLERANCE};

use super::region::PatchRegion;
use super::segment::{PointInfo, SegmentInfo};

/// A triangle corner carrying its root-patch parameters.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceCorner {
    pub point: Point3,
    pub u: f64,
    pub v: f64,
}

/// A planar triangle from a flat region, with a local 2D frame for clipping.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub corners: [SurfaceCorner; 3],
    origin: Point3,
    x_axis: Vector3,
    y_axis: Vector3,
    normal: Vector3,
}

impl Triangle {
    /// Builds a triangle, orienting the local X axis along the longest edge.
    /// Returns `None` for degenerate (near-zero area) corner sets.
    #[must_use]
    pub fn new(corners: [SurfaceCorner; 3]) -> Option<Self> {
        let edges = [
            corners[1].point - corners[0].point,
            corners[2].point - corners[1].point,
            corners[0].point - corners[2].point,
        ];
        let normal = edges[0].cross(&(-edges[2]));
        let area2 = normal.norm();
        if area2 < TOLERANCE {
            return None;
        }
        let normal = normal / area2;

        let longest = (0..3).max_by(|&i, &j| {
            edges[i]
                .norm_squared()
                .total_cmp(&edges[j].norm_squared())
        })?;
        let x_axis = edges[longest].normalize();
        let y_axis = normal.cross(&x_axis);

        Some(Self {
            corners,
            origin: corners[longest].point,
            x_axis,
            y_axis,
            normal,
        })
    }

    /// The triangle's supporting plane as origin and unit normal.
    #[must_use]
    pub fn plane(&self) -> (Point3, Vector3) {
        (self.origin, self.normal)
    }

    fn project(&self, point: &Point3) -> Point2 {
        let e = point - self.origin;
        Point2::new(e.dot(&self.x_axis), e.dot(&self.y_axis))
    }

    /// Clips an in-plane line against the triangle, returning the covered
    /// line-parameter interval with surface parameters interpolated along
    /// the crossed edges. `None` when the line misses the triangle or only
    /// grazes a corner.
    #[must_use]
    pub fn clip_line(&self, line_origin: &Point3, line_dir: &Vector3) -> Option<ClipInterval> {
        let o2 = self.project(line_origin);
        let d2 = Vector2::new(line_dir.dot(&self.x_axis), line_dir.dot(&self.y_axis));
        let d2_len = d2.norm();
        if d2_len < TOLERANCE {
            return None;
        }

        let mut hits: Vec<(f64, (f64, f64))> = Vec::with_capacity(3);
        for k in 0..3 {
            let a = &self.corners[k];
            let b = &self.corners[(k + 1) % 3];
            let a2 = self.project(&a.point);
            let b2 = self.project(&b.point);
            let e2 = b2 - a2;

            let denom = cross_2d(&d2, &e2);
            if denom.abs() < TOLERANCE * d2_len.max(e2.norm()) {
                // Parallel. A collinear edge covers a whole interval and
                // supersedes any point hits.
                let off_a = cross_2d(&(a2 - o2), &d2).abs() / d2_len;
                let off_b = cross_2d(&(b2 - o2), &d2).abs() / d2_len;
                if off_a < TOLERANCE && off_b < TOLERANCE {
                    let ta = (a2 - o2).dot(&d2) / (d2_len * d2_len);
                    let tb = (b2 - o2).dot(&d2) / (d2_len * d2_len);
                    let (t_lo, uv_lo, t_hi, uv_hi) = if ta <= tb {
                        (ta, (a.u, a.v), tb, (b.u, b.v))
                    } else {
                        (tb, (b.u, b.v), ta, (a.u, a.v))
                    };
                    return Some(ClipInterval {
                        t_lo,
                        t_hi,
                        uv_lo,
                        uv_hi,
                    });
                }
                continue;
            }

            let qp = a2 - o2;
            let s = cross_2d(&qp, &d2) / denom;
            if !(-1e-9..=1.0 + 1e-9).contains(&s) {
                continue;
            }
            let t = cross_2d(&qp, &e2) / denom;
            let u = a.u + s * (b.u - a.u);
            let v = a.v + s * (b.v - a.v);
            hits.push((t, (u, v)));
        }

        // Merge corner hits reported by both adjacent edges.
        hits.sort_by(|x, y| x.0.total_cmp(&y.0));
        hits.dedup_by(|x, y| (x.0 - y.0).abs() < TOLERANCE);
        if hits.len() < 2 {
            return None;
        }
        let (t_lo, uv_lo) = hits[0];
        let (t_hi, uv_hi) = hits[hits.len() - 1];
        Some(ClipInterval {
            t_lo,
            t_hi,
            uv_lo,
            uv_hi,
        })
    }
}

fn cross_2d(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// The line-parameter interval covered by one triangle, with the surface
/// parameters at the interval ends.
#[derive(Debug, Clone, Copy)]
pub struct ClipInterval {
    pub t_lo: f64,
    pub t_hi: f64,
    pub uv_lo: (f64, f64),
    pub uv_hi: (f64, f64),
}

impl ClipInterval {
    /// Surface parameters at line parameter `t`, interpolated linearly over
    /// the interval.
    #[must_use]
    pub fn uv_at(&self, t: f64) -> (f64, f64) {
        let span = self.t_hi - self.t_lo;
        if span < TOLERANCE {
            return self.uv_lo;
        }
        let s = ((t - self.t_lo) / span).clamp(0.0, 1.0);
        (
            self.uv_lo.0 + s * (self.uv_hi.0 - self.uv_lo.0),
            self.uv_lo.1 + s * (self.uv_hi.1 - self.uv_lo.1),
        )
    }
}

/// Triangulates a flat region's corner quad.
///
/// Coincident corners are merged first, so a 3-corner (triangular) region
/// yields one triangle, a full quad two, and anything thinner none.
#[must_use]
pub fn triangles_for_region(
    region: &PatchRegion,
    config: &IntersectionConfig,
) -> Vec<Triangle> {
    let patch = &region.patch;
    let nu = patch.nu();
    let nv = patch.nv();
    let params = region.corner_params();
    let corners = [
        (patch.control_point(0, 0), params[0]),
        (patch.control_point(nu - 1, 0), params[1]),
        (patch.control_point(nu - 1, nv - 1), params[2]),
        (patch.control_point(0, nv - 1), params[3]),
    ];

    // Drop corners that coincide with an already-kept one.
    let dtol2 = config.distance_tolerance2();
    let mut distinct: Vec<SurfaceCorner> = Vec::with_capacity(4);
    for (point, (u, v)) in corners {
        let dup = distinct
            .iter()
            .any(|c| (point - c.point).norm_squared() <= dtol2);
        if !dup {
            distinct.push(SurfaceCorner { point, u, v });
        }
    }

    match distinct.len() {
        4 => {
            let mut out = Vec::with_capacity(2);
            if let Some(t) = Triangle::new([distinct[0], distinct[1], distinct[2]]) {
                out.push(t);
            }
            if let Some(t) = Triangle::new([distinct[0], distinct[2], distinct[3]]) {
                out.push(t);
            }
            out
        }
        3 => Triangle::new([distinct[0], distinct[1], distinct[2]])
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Intersects one triangle from each surface, returning the overlapping
/// piece of their plane-plane intersection line as a segment.
///
/// Parallel and coincident triangle planes yield nothing; coincident pieces
/// are recovered through their neighbors' crossings instead.
#[must_use]
pub fn intersect_triangles(
    ta: &Triangle,
    tb: &Triangle,
    patch_a: &BezierPatch,
    patch_b: &BezierPatch,
    config: &IntersectionConfig,
) -> Option<SegmentInfo> {
    let (origin_a, normal_a) = ta.plane();
    let (origin_b, normal_b) = tb.plane();
    let PlanePairRelation::IntersectionLine { origin, direction } =
        plane_plane_intersect(&origin_a, &normal_a, &origin_b, &normal_b)
    else {
        return None;
    };

    let ia = ta.clip_line(&origin, &direction)?;
    let ib = tb.clip_line(&origin, &direction)?;

    let t_lo = ia.t_lo.max(ib.t_lo);
    let t_hi = ia.t_hi.min(ib.t_hi);
    if t_hi - t_lo <= TOLERANCE {
        return None;
    }

    let endpoint = |t: f64| {
        let point = origin + direction * t;
        let (au, av) = ia.uv_at(t);
        let (bu, bv) = ib.uv_at(t);
        PointInfo::new(
            point,
            au.clamp(0.0, 1.0),
            av.clamp(0.0, 1.0),
            bu.clamp(0.0, 1.0),
            bv.clamp(0.0, 1.0),
            patch_a,
            patch_b,
            config,
        )
    };

    Some(SegmentInfo::new(endpoint(t_lo), endpoint(t_hi)))
}
