/// Distance tolerance applied for the duration of one surface-surface
/// intersection call. Looser than the usual modeling tolerance; the
/// subdivision/triangulation approximation cannot honor anything tighter.
pub const SSI_DISTANCE_TOLERANCE: f64 = 1e-2;

/// Upper bound for a per-parameter tolerance derived from a tangent length.
pub const PARAM_TOLERANCE_MAX: f64 = 0.1;

/// Maximum number of half-splits along the two subdivision recursions
/// combined. At the cap a region is treated as flat and triangulated, so
/// near-tangential inputs terminate with a coarse answer instead of
/// recursing without bound.
pub const MAX_SUBDIVISION_DEPTH: u32 = 48;

/// Iteration cap for the Newton-Raphson point refinement.
pub const MAX_NEWTON_ITERATIONS: u32 = 16;

/// Multiplier on the distance tolerance admitted by the first relaxed
/// endpoint-matching level during chain assembly. Empirical stand-in for a
/// running minimum-observed-gap heuristic; chosen so one level of relaxation
/// sits between the strict 3D check and dropping it entirely.
pub const RELAXED_GAP_FACTOR: f64 = 4.0;

/// Tolerance context for one intersection call.
///
/// An explicit value threaded through every call; nothing is stored in
/// process-global state, so concurrent calls with different tolerances do
/// not interfere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionConfig {
    /// Two 3D points closer than this are the same point.
    pub distance_tolerance: f64,
    /// Two parameter values closer than this are the same parameter.
    pub parameter_tolerance: f64,
}

impl IntersectionConfig {
    /// Creates a config with explicit tolerances.
    #[must_use]
    pub fn new(distance_tolerance: f64, parameter_tolerance: f64) -> Self {
        Self {
            distance_tolerance,
            parameter_tolerance,
        }
    }

    /// The configuration the surface-surface engine runs under: the
    /// documented [`SSI_DISTANCE_TOLERANCE`] override with the default
    /// parameter tolerance.
    #[must_use]
    pub fn for_surface_intersection() -> Self {
        Self {
            distance_tolerance: SSI_DISTANCE_TOLERANCE,
            parameter_tolerance: 1e-8,
        }
    }

    /// Squared distance tolerance.
    #[must_use]
    pub fn distance_tolerance2(&self) -> f64 {
        self.distance_tolerance * self.distance_tolerance
    }
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self::for_surface_intersection()
    }
}
