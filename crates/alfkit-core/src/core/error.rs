use thiserror::Error;

/// Failures of the per-geometry transforms.
///
/// Every variant is scoped to one geometry (and, where relevant, one atom);
/// batch callers record it against that geometry and carry on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Topology error: {0}")]
    Topology(String),

    #[error("Degenerate geometry around atom {atom}: {reason}")]
    DegenerateGeometry { atom: usize, reason: &'static str },

    #[error("Feature vector for atom {atom} has {found} components, expected {expected}")]
    DimensionMismatch {
        atom: usize,
        expected: usize,
        found: usize,
    },

    #[error("Geometry does not match the cached topology: {0}")]
    TopologyMismatch(String),

    #[error("Atom index {index} out of range for a geometry of {n_atoms} atoms")]
    AtomIndexOutOfRange { index: usize, n_atoms: usize },

    #[error("Expected {expected} coordinate entries, got {found}")]
    CoordinateCount { expected: usize, found: usize },

    #[error("Unknown element '{0}'")]
    UnknownElement(String),
}
