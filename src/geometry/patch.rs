use crate::error::{GeometryError, Result};
use crate::math::aabb::Aabb;
use crate::math::{Point3, Vector3};

use super::bezier;

/// How far outside `[0, 1]` an evaluation parameter may fall before it is an
/// error rather than clamped. Covers round-off from parameter arithmetic in
/// callers (midpoints, interpolation, Newton steps before clamping).
const PARAMETER_SLACK: f64 = 1e-7;

/// A polynomial tensor-product Bezier patch.
///
/// Defined by an `(m+1) x (n+1)` grid of control points; the surface is
///
/// ```text
/// P(u, v) = sum_ij  b[i][j] * B(m,i)(u) * B(n,j)(v)
/// ```
///
/// with Bernstein basis polynomials `B`, and both parameters ranging over
/// `[0, 1]`. The grid is immutable after construction.
#[derive(Debug, Clone)]
pub struct BezierPatch {
    /// `points[i][j]`: `i` runs along U, `j` along V.
    points: Vec<Vec<Point3>>,
}

impl BezierPatch {
    /// Creates a patch from its control-point grid.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Degenerate`] if the grid is ragged or has
    /// fewer than 2 control points in either direction.
    pub fn new(points: Vec<Vec<Point3>>) -> Result<Self> {
        if points.len() < 2 {
            return Err(
                GeometryError::Degenerate("patch needs at least 2 control points in U".into())
                    .into(),
            );
        }
        let nv = points[0].len();
        if nv < 2 {
            return Err(
                GeometryError::Degenerate("patch needs at least 2 control points in V".into())
                    .into(),
            );
        }
        if points.iter().any(|row| row.len() != nv) {
            return Err(GeometryError::Degenerate("ragged control-point grid".into()).into());
        }
        Ok(Self { points })
    }

    /// Number of control points in the U direction.
    #[must_use]
    pub fn nu(&self) -> usize {
        self.points.len()
    }

    /// Number of control points in the V direction.
    #[must_use]
    pub fn nv(&self) -> usize {
        self.points[0].len()
    }

    /// Degree in U.
    #[must_use]
    pub fn u_degree(&self) -> usize {
        self.nu() - 1
    }

    /// Degree in V.
    #[must_use]
    pub fn v_degree(&self) -> usize {
        self.nv() - 1
    }

    /// Control point at grid position `(i, j)`.
    #[must_use]
    pub fn control_point(&self, i: usize, j: usize) -> Point3 {
        self.points[i][j]
    }

    /// Evaluates the surface point at `(u, v)`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ParameterOutOfRange`] if a parameter lies
    /// outside `[0, 1]` beyond round-off slack.
    pub fn coordinates(&self, u: f64, v: f64) -> Result<Point3> {
        let u = check_parameter(u, "u")?;
        let v = check_parameter(v, "v")?;

        // Map the V direction first, then U.
        let row: Vec<Point3> = self
            .points
            .iter()
            .map(|poly| bezier::point_at(poly, v))
            .collect();
        Ok(bezier::point_at(&row, u))
    }

    /// Evaluates the pair of first partial derivatives `(dP/du, dP/dv)`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::ParameterOutOfRange`] if a parameter lies
    /// outside `[0, 1]` beyond round-off slack.
    pub fn tangent_vectors(&self, u: f64, v: f64) -> Result<(Vector3, Vector3)> {
        let u = check_parameter(u, "u")?;
        let v = check_parameter(v, "v")?;

        let mut row = Vec::with_capacity(self.nu());
        let mut row_dv = Vec::with_capacity(self.nu());
        for poly in &self.points {
            let (pt, dv) = bezier::evaluate(poly, v);
            row.push(pt);
            row_dv.push(Point3::from(dv));
        }

        let (_, du) = bezier::evaluate(&row, u);
        let dv = bezier::point_at(&row_dv, u).coords;
        Ok((du, dv))
    }

    /// Splits the patch at `(u_mid, v_mid)` into 4 sub-patches, ordered
    /// `[(u-, v-), (u+, v-), (u-, v+), (u+, v+)]`.
    #[must_use]
    pub fn subdivide(&self, u_mid: f64, v_mid: f64) -> [Self; 4] {
        let (lower_v, upper_v) = self.split_v(v_mid);
        let (p00, p10) = lower_v.split_u(u_mid);
        let (p01, p11) = upper_v.split_u(u_mid);
        [p00, p10, p01, p11]
    }

    /// Bounding box of the control grid. By the convex-hull property it
    /// encloses the whole surface.
    #[must_use]
    pub fn enclosing_box(&self) -> Aabb {
        let corner = self.points[0][0];
        Aabb::from_points(self.points.iter().flatten())
            .unwrap_or_else(|| Aabb::new(corner, corner))
    }

    /// Control polygon of the `nth` boundary edge, walking the boundary
    /// counterclockwise in parameter space:
    /// `0: v=0 (u rising), 1: u=1 (v rising), 2: v=1 (u falling), 3: u=0 (v falling)`.
    #[must_use]
    pub fn boundary_polygon(&self, nth: usize) -> Vec<Point3> {
        let nu = self.nu();
        let nv = self.nv();
        match nth {
            0 => (0..nu).map(|i| self.points[i][0]).collect(),
            1 => (0..nv).map(|j| self.points[nu - 1][j]).collect(),
            2 => (0..nu).map(|i| self.points[nu - 1 - i][nv - 1]).collect(),
            _ => (0..nv).map(|j| self.points[0][nv - 1 - j]).collect(),
        }
    }

    fn split_v(&self, t: f64) -> (Self, Self) {
        let mut lower = Vec::with_capacity(self.nu());
        let mut upper = Vec::with_capacity(self.nu());
        for poly in &self.points {
            let (l, r) = bezier::split(poly, t);
            lower.push(l);
            upper.push(r);
        }
        (Self { points: lower }, Self { points: upper })
    }

    fn split_u(&self, t: f64) -> (Self, Self) {
        let nu = self.nu();
        let nv = self.nv();
        let mut lower = vec![Vec::with_capacity(nv); nu];
        let mut upper = vec![Vec::with_capacity(nv); nu];
        for j in 0..nv {
            let column: Vec<Point3> = (0..nu).map(|i| self.points[i][j]).collect();
            let (l, r) = bezier::split(&column, t);
            for i in 0..nu {
                lower[i].push(l[i]);
                upper[i].push(r[i]);
            }
        }
        (Self { points: lower }, Self { points: upper })
    }
}

fn check_parameter(value: f64, parameter: &'static str) -> Result<f64> {
    if value < -PARAMETER_SLACK || value > 1.0 + PARAMETER_SLACK {
        return Err(GeometryError::ParameterOutOfRange {
            parameter,
            value,
            min: 0.0,
            max: 1.0,
        }
        .into());
    }
    Ok(value.clamp(0.0, 1.0))
}
