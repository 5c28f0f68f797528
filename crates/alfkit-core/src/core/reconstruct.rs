//! Inverse of the feature encoder: places every atom in the canonical local frame
//! of one atom.
//!
//! The origin sits at `(0, 0, 0)`, the x-axis atom on `+x` and the xy-plane atom
//! in the `z = 0` half-plane with `y >= 0`; every remaining atom is placed from
//! its `(r, theta, phi)` triplet. Atoms come back in their original order.

use super::alf::SystemAlf;
use super::error::GeometryError;
use super::features::n_features;
use super::models::geometry::Atoms;
use super::models::units::DistanceUnit;
use nalgebra::{DVector, Point3};

/// Cartesian coordinates (Bohr) of the geometry encoded by `features`, as seen
/// from `atom`'s local frame.
///
/// # Errors
///
/// Returns [`GeometryError::DimensionMismatch`] when `features` is not as long as
/// the atom count requires, and [`GeometryError::TopologyMismatch`] when
/// `elements` does not cover every atom of `system_alf`.
pub fn reconstruct<S: AsRef<str>>(
    features: &DVector<f64>,
    system_alf: &SystemAlf,
    atom: usize,
    elements: &[S],
) -> Result<Atoms, GeometryError> {
    let n_atoms = system_alf.n_atoms();
    if elements.len() != n_atoms {
        return Err(GeometryError::TopologyMismatch(format!(
            "{} element symbols for a {n_atoms}-atom frame set",
            elements.len()
        )));
    }
    let expected = n_features(n_atoms);
    if features.len() != expected {
        return Err(GeometryError::DimensionMismatch {
            atom,
            expected,
            found: features.len(),
        });
    }

    let canonical = canonical_positions(features);
    let mut positions = vec![Point3::origin(); n_atoms];
    for (position, original) in canonical
        .into_iter()
        .zip(system_alf.feature_order(atom)?)
    {
        positions[original] = position;
    }

    Atoms::from_positions(elements, &positions, DistanceUnit::Bohr)
}

/// Positions in feature order: origin, x-axis atom, xy-plane atom, then the
/// remaining atoms.
fn canonical_positions(features: &DVector<f64>) -> Vec<Point3<f64>> {
    let mut positions = vec![Point3::origin(), Point3::new(features[0], 0.0, 0.0)];
    if features.len() == 1 {
        return positions;
    }

    let (bond2, angle) = (features[1], features[2]);
    positions.push(Point3::new(bond2 * angle.cos(), bond2 * angle.sin(), 0.0));
    for triplet in features.as_slice()[3..].chunks_exact(3) {
        let (r, theta, phi) = (triplet[0], triplet[1], triplet[2]);
        positions.push(Point3::new(
            r * theta.sin() * phi.cos(),
            r * theta.sin() * phi.sin(),
            r * theta.cos(),
        ));
    }
    positions
}
