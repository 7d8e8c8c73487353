pub mod bezier;
pub mod patch;

pub use patch::BezierPatch;
