use crate::config::IntersectionConfig;
use crate::geometry::BezierPatch;
use crate::math::intersect_3d::signed_distance_to_plane;
use crate::math::{Point2, Point3, Vector3, TOLERANCE};

use super::region::RegionShape;

/// Orthonormal reference frame fitted to a region's control grid.
///
/// The origin sits at the `(0, 0)` corner control point; the Z axis is the
/// fitted plane normal. Boundary-edge degeneracy observed while fitting is
/// kept for the straightness tests and for triangulation.
#[derive(Debug, Clone)]
pub struct PlaneFrame {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub z_axis: Vector3,
    /// Whether each boundary edge (numbered as in
    /// [`BezierPatch::boundary_polygon`]) has non-collapsed length.
    pub edge_present: [bool; 4],
    /// Number of non-collapsed boundary edges.
    pub edge_count: usize,
}

impl PlaneFrame {
    /// Fits a frame to the patch's corner-connecting vectors.
    ///
    /// The 4 corner-to-corner vectors are tried first; for regions whose
    /// boundary has mostly collapsed (balloon shapes) the corners' neighbor
    /// control points are used instead. Returns `None` when no two
    /// independent directions exist, i.e. the grid degenerates to a point
    /// or a straight line.
    #[must_use]
    pub fn fit(patch: &BezierPatch, distance_tolerance: f64) -> Option<Self> {
        let nu = patch.nu();
        let nv = patch.nv();
        let dtol2 = distance_tolerance * distance_tolerance;

        let c00 = patch.control_point(0, 0);
        let c10 = patch.control_point(nu - 1, 0);
        let c01 = patch.control_point(0, nv - 1);
        let c11 = patch.control_point(nu - 1, nv - 1);

        // Corner-connecting vectors, one per boundary edge.
        let u0dir = c10 - c00;
        let v1dir = c11 - c10;
        let u1dir = c01 - c11;
        let v0dir = c00 - c01;

        let edge_present = [
            u0dir.norm_squared() > dtol2,
            v1dir.norm_squared() > dtol2,
            u1dir.norm_squared() > dtol2,
            v0dir.norm_squared() > dtol2,
        ];
        let edge_count = edge_present.iter().filter(|&&e| e).count();

        // Candidate spanning directions in priority order: the present edge
        // vectors first, then directions to the corners' neighbor control
        // points (the balloon-shape fallback).
        let mut candidates: Vec<Vector3> = Vec::with_capacity(8);
        if edge_present[0] {
            candidates.push(u0dir);
        }
        if edge_present[3] {
            candidates.push(-v0dir);
        }
        if edge_present[1] {
            candidates.push(v1dir);
        }
        if edge_present[2] {
            candidates.push(-u1dir);
        }
        candidates.push(patch.control_point(1, 0) - c00);
        candidates.push(patch.control_point(0, 1) - c00);
        candidates.push(patch.control_point(nu - 2, nv - 1) - c11);
        candidates.push(patch.control_point(nu - 1, nv - 2) - c11);

        let (x_axis, z_axis) = select_axes(&candidates, dtol2)?;
        let y_axis = z_axis.cross(&x_axis);

        Some(Self {
            origin: c00,
            x_axis,
            y_axis,
            z_axis,
            edge_present,
            edge_count,
        })
    }

    /// Signed distance of `point` from the fitted plane.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        signed_distance_to_plane(point, &self.origin, &self.z_axis)
    }

    /// Projects `point` into the frame's local 2D coordinates.
    #[must_use]
    pub fn project(&self, point: &Point3) -> Point2 {
        let e = point - self.origin;
        Point2::new(e.dot(&self.x_axis), e.dot(&self.y_axis))
    }
}

/// Picks the first usable direction as X and the first later candidate that
/// spans a plane with it, returning `(x_axis, z_axis)` unitized.
fn select_axes(candidates: &[Vector3], dtol2: f64) -> Option<(Vector3, Vector3)> {
    let mut primary: Option<Vector3> = None;
    for dir in candidates {
        let len2 = dir.norm_squared();
        if len2 <= dtol2 {
            continue;
        }
        let unit = dir / len2.sqrt();
        match primary {
            None => primary = Some(unit),
            Some(x) => {
                let normal = x.cross(&unit);
                if normal.norm() > TOLERANCE {
                    return Some((x, normal.normalize()));
                }
            }
        }
    }
    None
}

/// Classifies a region's control grid.
///
/// Returns the shape and, for flat regions, the fitted plane frame (cached
/// by the caller and used by the interference filter and the triangulator).
#[must_use]
pub fn classify_region(
    patch: &BezierPatch,
    config: &IntersectionConfig,
) -> (RegionShape, Option<PlaneFrame>) {
    let dtol = config.distance_tolerance;

    let Some(frame) = PlaneFrame::fit(patch, dtol) else {
        // No two independent directions: every control point sits on a
        // point or a line.
        let c00 = patch.control_point(0, 0);
        let coincident = grid_points(patch).all(|p| (p - c00).norm() <= dtol);
        let shape = if coincident {
            RegionShape::Point
        } else {
            RegionShape::Line
        };
        return (shape, None);
    };

    // Not flat yet: keep subdividing. The frame is not cached for curved
    // regions; the interference plane test is only sound against a region
    // that actually lies in its plane.
    if grid_points(patch).any(|p| frame.signed_distance(&p).abs() > dtol) {
        return (RegionShape::Bezier, None);
    }

    let all_straight = (0..4)
        .filter(|&k| frame.edge_present[k])
        .all(|k| edge_is_straight(&patch.boundary_polygon(k), dtol));

    if !all_straight {
        return (RegionShape::Planar, Some(frame));
    }
    if frame.edge_count < 2 {
        return (RegionShape::Line, Some(frame));
    }
    (RegionShape::Rectangular, Some(frame))
}

fn grid_points(patch: &BezierPatch) -> impl Iterator<Item = Point3> + '_ {
    (0..patch.nu()).flat_map(move |i| (0..patch.nv()).map(move |j| patch.control_point(i, j)))
}

/// Whether the interior points of a boundary control polygon stay within
/// `dtol` of the chord between its endpoints.
pub(crate) fn edge_is_straight(polygon: &[Point3], dtol: f64) -> bool {
    let n = polygon.len();
    let chord = polygon[n - 1] - polygon[0];
    let chord_len = chord.norm();
    if chord_len < TOLERANCE {
        return true;
    }
    let chord_dir = chord / chord_len;
    let dtol2 = dtol * dtol;
    polygon[1..n - 1].iter().all(|p| {
        let e = p - polygon[0];
        let along = e.dot(&chord_dir);
        e.norm_squared() - along * along <= dtol2
    })
}
