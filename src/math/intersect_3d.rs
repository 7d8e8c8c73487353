use super::{Point3, Vector3, TOLERANCE};

/// Relationship between two planes, each given as origin + unit normal.
#[derive(Debug)]
pub enum PlanePairRelation {
    /// Planes intersect along a line.
    IntersectionLine { origin: Point3, direction: Vector3 },
    /// Planes are parallel but not coincident.
    Parallel { distance: f64 },
    /// Planes are the same (coincident).
    Coincident,
}

/// Computes the intersection of two planes.
///
/// Returns an [`IntersectionLine`](PlanePairRelation::IntersectionLine) with a
/// unit-length `direction` when the planes cross, [`Parallel`](PlanePairRelation::Parallel)
/// when they don't, or [`Coincident`](PlanePairRelation::Coincident) when they overlap.
#[must_use]
pub fn plane_plane_intersect(
    origin_a: &Point3,
    normal_a: &Vector3,
    origin_b: &Point3,
    normal_b: &Vector3,
) -> PlanePairRelation {
    let dir = normal_a.cross(normal_b);
    let dir_len = dir.norm();

    if dir_len < TOLERANCE {
        // Normals are (anti-)parallel — planes are parallel or coincident.
        let diff = origin_b - origin_a;
        let dist = diff.dot(normal_a).abs();
        if dist < TOLERANCE {
            PlanePairRelation::Coincident
        } else {
            PlanePairRelation::Parallel { distance: dist }
        }
    } else {
        let dir = dir / dir_len;

        // Find a point on the intersection line.
        // Solve na.dot(p - oa) = 0 AND nb.dot(p - ob) = 0 simultaneously.
        // Write p = oa + s * na + t * nb + u * dir  (u is free, set u = 0).
        let d2 = normal_b.dot(&(origin_b - origin_a));
        let dot_nn = normal_a.dot(normal_b);
        let denom = 1.0 - dot_nn * dot_nn;

        let origin = if denom.abs() < TOLERANCE {
            *origin_a
        } else {
            let s = (-dot_nn * d2) / denom;
            let t = d2 / denom;
            origin_a + normal_a * s + normal_b * t
        };

        PlanePairRelation::IntersectionLine {
            origin,
            direction: dir,
        }
    }
}

/// Signed distance from a point to a plane given as origin + unit normal.
/// Positive = on the normal side, negative = opposite.
#[must_use]
pub fn signed_distance_to_plane(point: &Point3, origin: &Point3, normal: &Vector3) -> f64 {
    let diff = point - origin;
    normal.dot(&diff)
}
