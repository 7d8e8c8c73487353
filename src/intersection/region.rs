use slotmap::{new_key_type, SlotMap};

use crate::config::IntersectionConfig;
use crate::geometry::BezierPatch;
use crate::math::aabb::Aabb;

use super::classify::{classify_region, PlaneFrame};

new_key_type! {
    /// Key of a memoized region node in the A-side subdivision tree.
    pub struct RegionKey;
}

/// Shape classification of a subdivided region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionShape {
    /// Not flat within tolerance; must be subdivided further.
    Bezier,
    /// Flat, but at least one boundary edge is still curved.
    Planar,
    /// Flat with straight boundary edges; ready for triangulation.
    /// Includes the 3-edge (triangular) and 2-edge degenerate cases.
    Rectangular,
    /// Degenerates to a straight segment.
    Line,
    /// Degenerates to a single point.
    Point,
}

/// A parameter sub-rectangle of one root patch together with its sub-patch
/// control grid and cached classification data.
#[derive(Debug, Clone)]
pub struct PatchRegion {
    /// Control grid of this region (a genuine Bezier patch over the
    /// sub-rectangle, produced by the root patch's own subdivision).
    pub patch: BezierPatch,
    /// Parameter rectangle on the root patch.
    pub u0: f64,
    pub u1: f64,
    pub v0: f64,
    pub v1: f64,
    /// Control-grid bounding box.
    pub bbox: Aabb,
    shape: Option<RegionShape>,
    frame: Option<PlaneFrame>,
}

impl PatchRegion {
    /// The whole-patch region `[0,1] x [0,1]`.
    #[must_use]
    pub fn root(patch: &BezierPatch) -> Self {
        Self::new(patch.clone(), 0.0, 1.0, 0.0, 1.0)
    }

    fn new(patch: BezierPatch, u0: f64, u1: f64, v0: f64, v1: f64) -> Self {
        let bbox = patch.enclosing_box();
        Self {
            patch,
            u0,
            u1,
            v0,
            v1,
            bbox,
            shape: None,
            frame: None,
        }
    }

    /// Classifies the region, caching the result and (for flat regions)
    /// the fitted plane frame.
    pub fn shape(&mut self, config: &IntersectionConfig) -> RegionShape {
        if let Some(shape) = self.shape {
            return shape;
        }
        let (shape, frame) = classify_region(&self.patch, config);
        self.shape = Some(shape);
        self.frame = frame;
        shape
    }

    /// The classification, if it has been computed.
    #[must_use]
    pub fn cached_shape(&self) -> Option<RegionShape> {
        self.shape
    }

    /// The fitted plane frame, available once a flat region has been
    /// classified.
    #[must_use]
    pub fn cached_frame(&self) -> Option<&PlaneFrame> {
        self.frame.as_ref()
    }

    /// Quarters the region at its parameter midpoints, in the order
    /// `[(u-, v-), (u+, v-), (u-, v+), (u+, v+)]`.
    #[must_use]
    pub fn subdivide(&self) -> [Self; 4] {
        let um = 0.5 * (self.u0 + self.u1);
        let vm = 0.5 * (self.v0 + self.v1);
        let [p00, p10, p01, p11] = self.patch.subdivide(0.5, 0.5);
        [
            Self::new(p00, self.u0, um, self.v0, vm),
            Self::new(p10, um, self.u1, self.v0, vm),
            Self::new(p01, self.u0, um, vm, self.v1),
            Self::new(p11, um, self.u1, vm, self.v1),
        ]
    }

    /// Root-patch parameters of the 4 region corners, counterclockwise from
    /// `(u0, v0)`.
    #[must_use]
    pub fn corner_params(&self) -> [(f64, f64); 4] {
        [
            (self.u0, self.v0),
            (self.u1, self.v0),
            (self.u1, self.v1),
            (self.u0, self.v1),
        ]
    }
}

#[derive(Debug)]
struct RegionNode {
    region: PatchRegion,
    children: Option<[RegionKey; 4]>,
}

/// Arena owning the memoized A-side region tree.
///
/// Children are addressed by key and computed at most once; a sibling search
/// branch asking for the same node's children gets the cached keys back.
/// Nodes are never removed during a top-level intersection call.
#[derive(Debug, Default)]
pub struct RegionArena {
    nodes: SlotMap<RegionKey, RegionNode>,
}

impl RegionArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a root region and returns its key.
    pub fn insert_root(&mut self, region: PatchRegion) -> RegionKey {
        self.nodes.insert(RegionNode {
            region,
            children: None,
        })
    }

    /// Returns the region stored under `key`.
    #[must_use]
    pub fn region(&self, key: RegionKey) -> &PatchRegion {
        &self.nodes[key].region
    }

    /// Classifies the region under `key`, caching the result.
    pub fn shape(&mut self, key: RegionKey, config: &IntersectionConfig) -> RegionShape {
        self.nodes[key].region.shape(config)
    }

    /// Returns the 4 child keys of `key`, subdividing on first request.
    pub fn children(&mut self, key: RegionKey) -> [RegionKey; 4] {
        if let Some(children) = self.nodes[key].children {
            return children;
        }
        let children = self.nodes[key].region.subdivide().map(|child| {
            self.nodes.insert(RegionNode {
                region: child,
                children: None,
            })
        });
        self.nodes[key].children = Some(children);
        children
    }

    /// Number of nodes currently in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn flat_patch() -> BezierPatch {
        BezierPatch::new(vec![
            vec![p(0.0, 0.0, 0.0), p(0.0, 2.0, 0.0)],
            vec![p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0)],
        ])
        .unwrap()
    }

    #[test]
    fn subdivision_splits_parameter_rectangle() {
        let region = PatchRegion::root(&flat_patch());
        let children = region.subdivide();

        assert_eq!(children[0].u0, 0.0);
        assert_eq!(children[0].u1, 0.5);
        assert_eq!(children[3].u0, 0.5);
        assert_eq!(children[3].v0, 0.5);

        // Grandchild parameter rectangles nest.
        let grand = children[3].subdivide();
        assert_eq!(grand[0].u0, 0.5);
        assert_eq!(grand[0].u1, 0.75);
    }

    #[test]
    fn arena_memoizes_children() {
        let mut arena = RegionArena::new();
        let root = arena.insert_root(PatchRegion::root(&flat_patch()));

        let first = arena.children(root);
        let second = arena.children(root);
        assert_eq!(first, second);
        assert_eq!(arena.len(), 5);
    }

    #[test]
    fn classification_is_cached() {
        let config = IntersectionConfig::for_surface_intersection();
        let mut region = PatchRegion::root(&flat_patch());
        assert!(region.cached_shape().is_none());

        let shape = region.shape(&config);
        assert_eq!(shape, RegionShape::Rectangular);
        assert_eq!(region.cached_shape(), Some(shape));
        assert!(region.cached_frame().is_some());
    }
}
