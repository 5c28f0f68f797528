//! # Atomic Local Frames
//!
//! Every atom gets a local frame defined by three atoms: itself as the origin, an
//! x-axis atom and an xy-plane atom. Two-atom systems have no xy-plane atom.
//!
//! - [`sequence`] - Frames chosen from atom order alone
//! - [`priority`] - Frames chosen by recursive, mass-weighted (CIP-like) priority over bonds
//!
//! A [`SystemAlf`] is computed once per bonding topology and reused read-only for
//! every frame that shares it.

pub mod priority;
pub mod sequence;

use super::connectivity::ConnectivityMatrix;
use super::error::GeometryError;
use super::models::geometry::Atoms;
use serde::Deserialize;
use tracing::{debug, instrument};

/// The local frame of one atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alf {
    pub origin: usize,
    pub x_axis: usize,
    /// Absent only when the whole system has exactly two atoms.
    pub xy_plane: Option<usize>,
}

impl Alf {
    pub fn new(origin: usize, x_axis: usize, xy_plane: Option<usize>) -> Self {
        Self {
            origin,
            x_axis,
            xy_plane,
        }
    }

    /// `[origin, x_axis, xy_plane]`, omitting a missing xy-plane atom.
    pub fn indices(&self) -> Vec<usize> {
        let mut indices = vec![self.origin, self.x_axis];
        indices.extend(self.xy_plane);
        indices
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.origin == atom || self.x_axis == atom || self.xy_plane == Some(atom)
    }
}

/// Which rule assigns the x-axis and xy-plane atoms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlfMethod {
    #[default]
    Sequence,
    Priority,
}

/// What to do when the priority search ends on an unresolved tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// Take the lowest-index tied candidate and log a warning.
    #[default]
    AcceptFirst,
    /// Fail with [`GeometryError::Topology`].
    Reject,
}

/// Frames for every atom of a system, indexed by atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemAlf {
    alfs: Vec<Alf>,
}

impl SystemAlf {
    /// Validates and wraps a caller-supplied frame list.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Topology`] if there are fewer than two atoms, if
    /// `alfs[i].origin != i`, if any frame repeats an atom, or if the presence of the
    /// xy-plane atom does not match the system size, and
    /// [`GeometryError::AtomIndexOutOfRange`] for indices past the end.
    pub fn from_alfs(alfs: Vec<Alf>) -> Result<Self, GeometryError> {
        let n_atoms = alfs.len();
        if n_atoms < 2 {
            return Err(GeometryError::Topology(format!(
                "a local frame needs at least 2 atoms, got {n_atoms}"
            )));
        }
        for (i, alf) in alfs.iter().enumerate() {
            if alf.origin != i {
                return Err(GeometryError::Topology(format!(
                    "frame at position {i} has origin {}",
                    alf.origin
                )));
            }
            for index in alf.indices() {
                if index >= n_atoms {
                    return Err(GeometryError::AtomIndexOutOfRange { index, n_atoms });
                }
            }
            let distinct = alf.x_axis != alf.origin
                && alf
                    .xy_plane
                    .is_none_or(|xy| xy != alf.origin && xy != alf.x_axis);
            if !distinct {
                return Err(GeometryError::Topology(format!(
                    "frame {alf:?} repeats an atom"
                )));
            }
            if alf.xy_plane.is_none() != (n_atoms == 2) {
                return Err(GeometryError::Topology(format!(
                    "frame {alf:?} must {}have an xy-plane atom in a {n_atoms}-atom system",
                    if n_atoms == 2 { "not " } else { "" }
                )));
            }
        }
        Ok(Self { alfs })
    }

    pub fn n_atoms(&self) -> usize {
        self.alfs.len()
    }

    pub fn as_slice(&self) -> &[Alf] {
        &self.alfs
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alf> {
        self.alfs.iter()
    }

    /// The frame of `atom`.
    pub fn resolve(&self, atom: usize) -> Result<Alf, GeometryError> {
        self.alfs
            .get(atom)
            .copied()
            .ok_or(GeometryError::AtomIndexOutOfRange {
                index: atom,
                n_atoms: self.alfs.len(),
            })
    }

    /// Atoms outside `atom`'s frame, in the fixed (ascending index) order their
    /// `(r, theta, phi)` triplets appear in the feature vector.
    pub fn remaining_atoms(&self, atom: usize) -> Result<Vec<usize>, GeometryError> {
        let alf = self.resolve(atom)?;
        Ok((0..self.alfs.len()).filter(|&i| !alf.contains(i)).collect())
    }

    /// Frame atoms followed by the remaining atoms: the order in which atoms are
    /// laid out in `atom`'s canonical local coordinates.
    pub fn feature_order(&self, atom: usize) -> Result<Vec<usize>, GeometryError> {
        let mut order = self.resolve(atom)?.indices();
        order.extend(self.remaining_atoms(atom)?);
        Ok(order)
    }
}

/// Assigns a local frame to every atom of `atoms`.
///
/// # Errors
///
/// Returns [`GeometryError::Topology`] for systems with fewer than two atoms, or
/// when the priority search cannot find a reference atom (or finds only an
/// ambiguous one under [`AmbiguityPolicy::Reject`]).
#[instrument(skip_all, name = "alf_calculation", fields(n_atoms = atoms.len(), ?method))]
pub fn calculate(
    atoms: &Atoms,
    connectivity: &ConnectivityMatrix,
    method: AlfMethod,
    policy: AmbiguityPolicy,
) -> Result<SystemAlf, GeometryError> {
    let n_atoms = atoms.len();
    if n_atoms < 2 {
        return Err(GeometryError::Topology(format!(
            "a local frame needs at least 2 atoms, got {n_atoms}"
        )));
    }
    if connectivity.n_atoms() != n_atoms {
        return Err(GeometryError::TopologyMismatch(format!(
            "connectivity covers {} atoms, geometry has {n_atoms}",
            connectivity.n_atoms()
        )));
    }

    let alfs = match method {
        AlfMethod::Sequence => sequence::calculate(n_atoms)?,
        AlfMethod::Priority if n_atoms == 2 => sequence::calculate(n_atoms)?,
        AlfMethod::Priority => {
            let masses: Vec<f64> = atoms.iter().map(|a| a.mass()).collect::<Result<_, _>>()?;
            (0..n_atoms)
                .map(|origin| priority::atom_alf(origin, connectivity, &masses, policy))
                .collect::<Result<_, _>>()?
        }
    };

    debug!(?alfs, "Local frames assigned.");
    SystemAlf::from_alfs(alfs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connectivity::{self, ConnectivityMethod};
    use crate::core::models::units::DistanceUnit;

    fn diatomic() -> Atoms {
        Atoms::from_symbols_and_coords(
            &["H", "F"],
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            DistanceUnit::Angstrom,
        )
        .unwrap()
    }

    fn water() -> Atoms {
        Atoms::from_symbols_and_coords(
            &["O", "H", "H"],
            &[[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [-0.24, 0.93, 0.0]],
            DistanceUnit::Angstrom,
        )
        .unwrap()
    }

    fn system_alf(atoms: &Atoms, method: AlfMethod) -> SystemAlf {
        let matrix = connectivity::compute(atoms, &ConnectivityMethod::default()).unwrap();
        calculate(atoms, &matrix, method, AmbiguityPolicy::AcceptFirst).unwrap()
    }

    #[test]
    fn diatomic_frames_have_no_xy_plane_atom() {
        for method in [AlfMethod::Sequence, AlfMethod::Priority] {
            let alf = system_alf(&diatomic(), method);
            assert_eq!(
                alf.as_slice(),
                &[Alf::new(0, 1, None), Alf::new(1, 0, None)]
            );
        }
    }

    #[test]
    fn water_sequence_frames_match_reference() {
        let alf = system_alf(&water(), AlfMethod::Sequence);
        assert_eq!(
            alf.as_slice(),
            &[
                Alf::new(0, 1, Some(2)),
                Alf::new(1, 0, Some(2)),
                Alf::new(2, 0, Some(1))
            ]
        );
    }

    fn methanol() -> Atoms {
        Atoms::from_symbols_and_coords(
            &["C", "O", "H", "H", "H", "H"],
            &[
                [-0.0467, 0.6638, 0.0],
                [-0.0467, -0.7562, 0.0],
                [-1.0859, 0.9733, 0.0],
                [0.4407, 1.0843, 0.8897],
                [0.4407, 1.0843, -0.8897],
                [0.8622, -1.0786, 0.0],
            ],
            DistanceUnit::Angstrom,
        )
        .unwrap()
    }

    #[test]
    fn methanol_priority_frames_follow_neighbour_masses() {
        let alf = system_alf(&methanol(), AlfMethod::Priority);
        assert_eq!(
            alf.as_slice(),
            &[
                Alf::new(0, 1, Some(2)),
                Alf::new(1, 0, Some(5)),
                Alf::new(2, 0, Some(1)),
                Alf::new(3, 0, Some(1)),
                Alf::new(4, 0, Some(1)),
                Alf::new(5, 1, Some(0)),
            ]
        );
        assert_eq!(alf.remaining_atoms(0).unwrap(), vec![3, 4, 5]);
    }

    #[test]
    fn methanol_methyl_hydrogen_tie_is_rejected_on_request() {
        let atoms = methanol();
        let matrix = connectivity::compute(&atoms, &ConnectivityMethod::default()).unwrap();
        let err = calculate(&atoms, &matrix, AlfMethod::Priority, AmbiguityPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, GeometryError::Topology(_)));
    }

    #[test]
    fn single_atom_is_a_topology_error() {
        let atoms =
            Atoms::from_symbols_and_coords(&["He"], &[[0.0, 0.0, 0.0]], DistanceUnit::Angstrom).unwrap();
        let matrix = ConnectivityMatrix::empty(1);
        let err = calculate(&atoms, &matrix, AlfMethod::Sequence, AmbiguityPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, GeometryError::Topology(_)));
    }

    #[test]
    fn mismatched_connectivity_is_rejected() {
        let matrix = ConnectivityMatrix::empty(4);
        let err = calculate(&water(), &matrix, AlfMethod::Sequence, AmbiguityPolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, GeometryError::TopologyMismatch(_)));
    }

    #[test]
    fn from_alfs_validates_frames() {
        assert!(SystemAlf::from_alfs(vec![Alf::new(0, 1, None)]).is_err());
        assert!(
            SystemAlf::from_alfs(vec![
                Alf::new(0, 0, Some(2)),
                Alf::new(1, 0, Some(2)),
                Alf::new(2, 0, Some(1)),
            ])
            .is_err()
        );
        assert!(
            SystemAlf::from_alfs(vec![
                Alf::new(0, 1, Some(3)),
                Alf::new(1, 0, Some(2)),
                Alf::new(2, 0, Some(1)),
            ])
            .is_err()
        );
        assert!(
            SystemAlf::from_alfs(vec![
                Alf::new(0, 1, None),
                Alf::new(1, 0, Some(2)),
                Alf::new(2, 0, Some(1)),
            ])
            .is_err()
        );
        assert!(SystemAlf::from_alfs(vec![Alf::new(1, 0, None), Alf::new(0, 1, None)]).is_err());
    }

    #[test]
    fn feature_order_puts_frame_atoms_first() {
        let alf = SystemAlf::from_alfs(vec![
            Alf::new(0, 1, Some(2)),
            Alf::new(1, 0, Some(2)),
            Alf::new(2, 0, Some(1)),
            Alf::new(3, 2, Some(4)),
            Alf::new(4, 3, Some(5)),
            Alf::new(5, 4, Some(3)),
        ])
        .unwrap();
        assert_eq!(alf.feature_order(3).unwrap(), vec![3, 2, 4, 0, 1, 5]);
        assert_eq!(alf.remaining_atoms(0).unwrap(), vec![3, 4, 5]);
        assert!(alf.resolve(6).is_err());
    }
}
