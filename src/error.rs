use thiserror::Error;

/// Top-level error type for the Surfis intersection kernel.
#[derive(Debug, Error)]
pub enum SurfisError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Intersection(#[from] IntersectionError),
}

/// Errors related to geometric construction and evaluation.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("parameter {parameter} = {value} is out of range [{min}, {max}]")]
    ParameterOutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

/// Errors raised by the surface-surface intersection engine.
#[derive(Debug, Error)]
pub enum IntersectionError {
    /// The geometry admits no unique answer (coincident or everywhere-tangent
    /// inputs). The engine refuses to guess; the caller decides the fallback.
    #[error("indefinite solution: {0}")]
    IndefiniteSolution(&'static str),
}

/// Convenience type alias for results using [`SurfisError`].
pub type Result<T> = std::result::Result<T, SurfisError>;
