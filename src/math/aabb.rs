use super::Point3;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3,
    /// Maximum corner of the bounding box.
    pub max: Point3,
}

impl Aabb {
    /// Creates a box from explicit corners.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing a set of points.
    ///
    /// Returns `None` for an empty set.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = *first;
        let mut max = *first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Self { min, max })
    }

    /// Smallest box enclosing both boxes.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    /// Tests overlap after padding both boxes by `tolerance` on every axis.
    #[must_use]
    pub fn overlaps_with_tolerance(&self, other: &Self, tolerance: f64) -> bool {
        let pad = 2.0 * tolerance;
        self.min.x <= other.max.x + pad
            && other.min.x <= self.max.x + pad
            && self.min.y <= other.max.y + pad
            && other.min.y <= self.max.y + pad
            && self.min.z <= other.max.z + pad
            && other.min.z <= self.max.z + pad
    }

    /// Tests whether `point` lies inside the box padded by `tolerance`.
    #[must_use]
    pub fn contains_with_tolerance(&self, point: &Point3, tolerance: f64) -> bool {
        point.x >= self.min.x - tolerance
            && point.x <= self.max.x + tolerance
            && point.y >= self.min.y - tolerance
            && point.y <= self.max.y + tolerance
            && point.z >= self.min.z - tolerance
            && point.z <= self.max.z + tolerance
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn from_points_encloses_all() {
        let pts = [p(1.0, -2.0, 3.0), p(-1.0, 5.0, 0.0), p(0.0, 0.0, -4.0)];
        let b = Aabb::from_points(pts.iter()).unwrap();
        assert_eq!(b.min, p(-1.0, -2.0, -4.0));
        assert_eq!(b.max, p(1.0, 5.0, 3.0));
    }

    #[test]
    fn from_points_empty_is_none() {
        let empty: [Point3; 0] = [];
        assert!(Aabb::from_points(empty.iter()).is_none());
    }

    #[test]
    fn union_encloses_both() {
        let a = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        let b = Aabb::new(p(-1.0, 0.5, 0.0), p(0.5, 2.0, 3.0));
        let u = a.union(&b);
        assert_eq!(u.min, p(-1.0, 0.0, 0.0));
        assert_eq!(u.max, p(1.0, 2.0, 3.0));
    }

    #[test]
    fn disjoint_boxes_do_not_overlap() {
        let a = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        let b = Aabb::new(p(5.0, 0.0, 0.0), p(6.0, 1.0, 1.0));
        assert!(!a.overlaps_with_tolerance(&b, 0.01));
    }

    #[test]
    fn touching_boxes_overlap_within_tolerance() {
        let a = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        let b = Aabb::new(p(1.005, 0.0, 0.0), p(2.0, 1.0, 1.0));
        assert!(a.overlaps_with_tolerance(&b, 0.01));
        assert!(!a.overlaps_with_tolerance(&b, 0.001));
    }

    #[test]
    fn contains_respects_tolerance() {
        let b = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0));
        assert!(b.contains_with_tolerance(&p(1.005, 0.5, 0.5), 0.01));
        assert!(!b.contains_with_tolerance(&p(1.05, 0.5, 0.5), 0.01));
    }
}
