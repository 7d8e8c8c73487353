//! De Casteljau primitives on Bezier control polygons.
//!
//! These operate on one row or column of a patch's control grid; the
//! tensor-product evaluation in [`patch`](super::patch) maps one direction
//! first and then the other.

use crate::math::{Point3, Vector3};

/// Evaluates the Bezier curve defined by `polygon` at parameter `t`.
#[must_use]
pub fn point_at(polygon: &[Point3], t: f64) -> Point3 {
    let mut work: Vec<Vector3> = polygon.iter().map(|p| p.coords).collect();
    let n = work.len();
    for level in 1..n {
        for i in 0..n - level {
            work[i] = work[i].lerp(&work[i + 1], t);
        }
    }
    Point3::from(work[0])
}

/// Evaluates point and first derivative at parameter `t`.
///
/// A single-point polygon is a constant curve with zero derivative.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn evaluate(polygon: &[Point3], t: f64) -> (Point3, Vector3) {
    let n = polygon.len();
    if n == 1 {
        return (polygon[0], Vector3::zeros());
    }

    let mut work: Vec<Vector3> = polygon.iter().map(|p| p.coords).collect();
    for level in 1..n - 1 {
        for i in 0..n - level {
            work[i] = work[i].lerp(&work[i + 1], t);
        }
    }

    // Two points of the next-to-last level remain; they carry both the
    // curve point and the hodograph value.
    let degree = (n - 1) as f64;
    let derivative = (work[1] - work[0]) * degree;
    let point = Point3::from(work[0].lerp(&work[1], t));
    (point, derivative)
}

/// Splits the polygon at parameter `t` into the control polygons of the
/// two curve halves. The left polygon ends and the right begins at the
/// curve point for `t`.
#[must_use]
pub fn split(polygon: &[Point3], t: f64) -> (Vec<Point3>, Vec<Point3>) {
    let n = polygon.len();
    let mut work: Vec<Vector3> = polygon.iter().map(|p| p.coords).collect();
    let mut left = Vec::with_capacity(n);
    let mut right = vec![Point3::origin(); n];

    left.push(Point3::from(work[0]));
    right[n - 1] = Point3::from(work[n - 1]);
    for level in 1..n {
        for i in 0..n - level {
            work[i] = work[i].lerp(&work[i + 1], t);
        }
        left.push(Point3::from(work[0]));
        right[n - 1 - level] = Point3::from(work[n - 1 - level]);
    }

    (left, right)
}
