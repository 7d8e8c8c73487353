//! Freeform surface intersection kernel.
//!
//! The crate computes the intersection set of two tensor-product Bezier
//! patches: [`surface_surface_intersect`] returns the connected components
//! as polyline curves with parameter-space images on both surfaces, or as
//! isolated touch points.

pub mod config;
pub mod error;
pub mod geometry;
pub mod intersection;
pub mod math;

pub use config::IntersectionConfig;
pub use error::{Result, SurfisError};
pub use geometry::patch::BezierPatch;
pub use intersection::{
    surface_surface_intersect, IntersectionCurve3D, IntersectionPoint3D, IntersectionResult,
};
