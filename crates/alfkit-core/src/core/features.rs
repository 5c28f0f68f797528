use super::alf::{Alf, SystemAlf};
use super::error::GeometryError;
use super::frame::RotationMatrix;
use super::models::geometry::Atoms;
use super::utils::geometry::{DEGENERACY_EPS, angle_between, wrap_angle};
use nalgebra::DVector;
use tracing::instrument;

/// Number of features one atom's frame produces in an `n_atoms` system:
/// `3N - 6` for `N >= 3`, a single distance for `N = 2`.
pub fn n_features(n_atoms: usize) -> usize {
    match n_atoms {
        0 | 1 => 0,
        2 => 1,
        n => 3 * n - 6,
    }
}

/// Whether feature `index` is an azimuthal angle, periodic on `2 pi`.
pub fn is_cyclic(index: usize) -> bool {
    index >= 3 && index % 3 == 2
}

/// Indices of every cyclic (phi) component.
pub fn cyclic_features(n_atoms: usize) -> Vec<usize> {
    (0..n_features(n_atoms)).filter(|&i| is_cyclic(i)).collect()
}

/// Human-readable names, one per component:
/// `bond1, bond2, angle1, r3, theta3, phi3, r4, ...`.
pub fn feature_names(n_atoms: usize) -> Vec<String> {
    (0..n_features(n_atoms))
        .map(|i| match i {
            0 => "bond1".to_string(),
            1 => "bond2".to_string(),
            2 => "angle1".to_string(),
            _ => {
                let k = i / 3 + 2;
                match i % 3 {
                    0 => format!("r{k}"),
                    1 => format!("theta{k}"),
                    _ => format!("phi{k}"),
                }
            }
        })
        .collect()
}

/// Feature vector of one atom from an already-built C-matrix.
///
/// `atoms` must be in the unit the features should be expressed in and
/// `remaining` lists the non-frame atoms in feature order.
///
/// # Errors
///
/// Returns [`GeometryError::DegenerateGeometry`] if a non-frame atom sits on the
/// origin, where its polar angle is undefined, and
/// [`GeometryError::DimensionMismatch`] if the produced vector does not have
/// [`n_features`] components.
pub fn encode_with_rotation(
    atoms: &Atoms,
    alf: &Alf,
    rotation: &RotationMatrix,
    remaining: &[usize],
) -> Result<DVector<f64>, GeometryError> {
    let origin = atoms.position(alf.origin)?;
    let to_x = atoms.position(alf.x_axis)? - origin;

    let mut values = Vec::with_capacity(n_features(atoms.len()));
    values.push(to_x.norm());

    if let Some(xy) = alf.xy_plane {
        let to_xy = atoms.position(xy)? - origin;
        values.push(to_xy.norm());
        values.push(angle_between(&to_x, &to_xy));

        for &k in remaining {
            let v = atoms.position(k)? - origin;
            let r = v.norm();
            if r < DEGENERACY_EPS {
                return Err(GeometryError::DegenerateGeometry {
                    atom: alf.origin,
                    reason: "atom coincides with the origin",
                });
            }
            let local = rotation.to_local(&v);
            values.push(r);
            values.push((local.z / r).clamp(-1.0, 1.0).acos());
            values.push(wrap_angle(local.y.atan2(local.x)));
        }
    }

    let expected = n_features(atoms.len());
    if values.len() != expected {
        return Err(GeometryError::DimensionMismatch {
            atom: alf.origin,
            expected,
            found: values.len(),
        });
    }
    Ok(DVector::from_vec(values))
}

/// Checks that `atoms` is a geometry `system_alf` was built for.
pub(crate) fn check_atom_count(atoms: &Atoms, system_alf: &SystemAlf) -> Result<(), GeometryError> {
    if atoms.len() != system_alf.n_atoms() {
        return Err(GeometryError::TopologyMismatch(format!(
            "geometry has {} atoms, frames were built for {}",
            atoms.len(),
            system_alf.n_atoms()
        )));
    }
    Ok(())
}

/// Invariant feature vector of `atom`, distances in Bohr and angles in radians.
///
/// # Errors
///
/// Fails with [`GeometryError::TopologyMismatch`] if `atoms` does not have the atom
/// count `system_alf` was built for, and with
/// [`GeometryError::DegenerateGeometry`] if the frame collapses.
pub fn encode(
    atoms: &Atoms,
    system_alf: &SystemAlf,
    atom: usize,
) -> Result<DVector<f64>, GeometryError> {
    check_atom_count(atoms, system_alf)?;
    let atoms = atoms.to_bohr();
    let alf = system_alf.resolve(atom)?;
    let remaining = system_alf.remaining_atoms(atom)?;

    if alf.xy_plane.is_none() {
        let distance = atoms.distance(alf.origin, alf.x_axis)?;
        if distance < DEGENERACY_EPS {
            return Err(GeometryError::DegenerateGeometry {
                atom,
                reason: "x-axis atom coincides with the origin",
            });
        }
        return Ok(DVector::from_element(1, distance));
    }

    let rotation = RotationMatrix::for_alf(&atoms, &alf)?;
    encode_with_rotation(&atoms, &alf, &rotation, &remaining)
}

/// Feature vectors of every atom, indexed by atom.
#[instrument(skip_all, name = "encode_all", fields(n_atoms = atoms.len()))]
pub fn encode_all(
    atoms: &Atoms,
    system_alf: &SystemAlf,
) -> Result<Vec<DVector<f64>>, GeometryError> {
    (0..atoms.len())
        .map(|atom| encode(atoms, system_alf, atom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::units::{ANGSTROM_TO_BOHR, DistanceUnit};
    use nalgebra::{Isometry3, Translation3, UnitQuaternion};
    use std::f64::consts::PI;

    fn water() -> Atoms {
        Atoms::from_symbols_and_coords(
            &["O", "H", "H"],
            &[[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [-0.24, 0.93, 0.0]],
            DistanceUnit::Angstrom,
        )
        .unwrap()
    }

    fn water_alf() -> SystemAlf {
        SystemAlf::from_alfs(vec![
            Alf::new(0, 1, Some(2)),
            Alf::new(1, 0, Some(2)),
            Alf::new(2, 0, Some(1)),
        ])
        .unwrap()
    }

    fn methanol() -> Atoms {
        Atoms::from_symbols_and_coords(
            &["C", "O", "H", "H", "H", "H"],
            &[
                [-0.0467, 0.6630, 0.0000],
                [-0.0467, -0.7590, 0.0000],
                [-1.0860, 0.9730, 0.0000],
                [0.4480, 1.0620, 0.8890],
                [0.4480, 1.0620, -0.8890],
                [0.8950, -1.0250, 0.0000],
            ],
            DistanceUnit::Angstrom,
        )
        .unwrap()
    }

    fn methanol_alf() -> SystemAlf {
        SystemAlf::from_alfs(vec![
            Alf::new(0, 1, Some(2)),
            Alf::new(1, 0, Some(5)),
            Alf::new(2, 0, Some(1)),
            Alf::new(3, 0, Some(1)),
            Alf::new(4, 0, Some(1)),
            Alf::new(5, 1, Some(0)),
        ])
        .unwrap()
    }

    #[test]
    fn n_features_follows_three_n_minus_six() {
        assert_eq!(n_features(1), 0);
        assert_eq!(n_features(2), 1);
        assert_eq!(n_features(3), 3);
        assert_eq!(n_features(6), 12);
    }

    #[test]
    fn feature_names_and_cyclic_mask_line_up() {
        let names = feature_names(5);
        assert_eq!(
            names,
            vec![
                "bond1", "bond2", "angle1", "r3", "theta3", "phi3", "r4", "theta4", "phi4"
            ]
        );
        let cyclic = cyclic_features(5);
        assert_eq!(cyclic, vec![5, 8]);
        for i in cyclic {
            assert!(names[i].starts_with("phi"));
        }
        assert!(!is_cyclic(2));
    }

    #[test]
    fn diatomic_feature_is_bond_length_in_bohr() {
        let atoms = Atoms::from_symbols_and_coords(
            &["H", "H"],
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            DistanceUnit::Angstrom,
        )
        .unwrap();
        let alf = SystemAlf::from_alfs(vec![Alf::new(0, 1, None), Alf::new(1, 0, None)]).unwrap();
        let f = encode(&atoms, &alf, 0).unwrap();
        assert_eq!(f.len(), 1);
        assert!((f[0] - ANGSTROM_TO_BOHR).abs() < 1e-12);
    }

    #[test]
    fn collocated_diatomic_is_degenerate() {
        let atoms = Atoms::from_symbols_and_coords(
            &["H", "H"],
            &[[0.5, 0.5, 0.5], [0.5, 0.5, 0.5]],
            DistanceUnit::Bohr,
        )
        .unwrap();
        let alf = SystemAlf::from_alfs(vec![Alf::new(0, 1, None), Alf::new(1, 0, None)]).unwrap();
        for atom in 0..2 {
            let err = encode(&atoms, &alf, atom).unwrap_err();
            assert!(
                matches!(err, GeometryError::DegenerateGeometry { atom: a, .. } if a == atom),
                "atom {atom}: {err:?}"
            );
            let err = crate::core::jacobian::build(&atoms, &alf, atom).unwrap_err();
            assert!(matches!(err, GeometryError::DegenerateGeometry { .. }));
        }
    }

    #[test]
    fn non_frame_atom_on_the_origin_is_degenerate() {
        let atoms = Atoms::from_symbols_and_coords(
            &["O", "H", "H", "H"],
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
            ],
            DistanceUnit::Bohr,
        )
        .unwrap();
        let alf = SystemAlf::from_alfs(vec![
            Alf::new(0, 1, Some(2)),
            Alf::new(1, 0, Some(2)),
            Alf::new(2, 0, Some(1)),
            Alf::new(3, 1, Some(2)),
        ])
        .unwrap();
        let err = encode(&atoms, &alf, 0).unwrap_err();
        assert_eq!(
            err,
            GeometryError::DegenerateGeometry {
                atom: 0,
                reason: "atom coincides with the origin"
            }
        );
        assert!(encode(&atoms, &alf, 3).is_err());
        assert!(encode(&atoms, &alf, 1).unwrap().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn water_features_are_two_bonds_and_an_angle() {
        let all = encode_all(&water(), &water_alf()).unwrap();
        for f in &all {
            assert_eq!(f.len(), 3);
        }
        let f0 = &all[0];
        assert!((f0[0] - 0.96 * ANGSTROM_TO_BOHR).abs() < 1e-9);
        let expected_bond2 = (0.24f64.powi(2) + 0.93f64.powi(2)).sqrt() * ANGSTROM_TO_BOHR;
        assert!((f0[1] - expected_bond2).abs() < 1e-9);
        let expected_angle = PI - (0.93f64).atan2(0.24);
        assert!((f0[2] - expected_angle).abs() < 1e-9);
    }

    #[test]
    fn features_are_invariant_under_rigid_motion() {
        let atoms = methanol();
        let alf = methanol_alf();
        let iso = Isometry3::from_parts(
            Translation3::new(3.1, -0.4, 7.2),
            UnitQuaternion::from_euler_angles(1.2, -0.7, 2.9),
        );
        let moved = atoms.transformed(&iso);
        for atom in 0..atoms.len() {
            let a = encode(&atoms, &alf, atom).unwrap();
            let b = encode(&moved, &alf, atom).unwrap();
            assert_eq!(a.len(), 12);
            for i in 0..a.len() {
                let diff = if is_cyclic(i) {
                    wrap_angle(a[i] - b[i])
                } else {
                    a[i] - b[i]
                };
                assert!(diff.abs() < 1e-8, "atom {atom} feature {i}: {diff}");
            }
        }
    }

    #[test]
    fn spherical_components_are_in_range() {
        let atoms = methanol();
        let alf = methanol_alf();
        for f in encode_all(&atoms, &alf).unwrap() {
            for (i, value) in f.iter().enumerate().skip(3) {
                match i % 3 {
                    0 => assert!(*value > 0.0),
                    1 => assert!((0.0..=PI).contains(value)),
                    _ => assert!(*value > -PI && *value <= PI),
                }
            }
        }
    }

    #[test]
    fn wrong_atom_count_is_a_topology_mismatch() {
        let err = encode(&methanol(), &water_alf(), 0).unwrap_err();
        assert!(matches!(err, GeometryError::TopologyMismatch(_)));
    }

    #[test]
    fn wrong_remaining_list_is_a_dimension_mismatch() {
        let atoms = methanol().to_bohr();
        let alf = Alf::new(0, 1, Some(2));
        let rotation = RotationMatrix::for_alf(&atoms, &alf).unwrap();
        let err = encode_with_rotation(&atoms, &alf, &rotation, &[3, 4]).unwrap_err();
        assert_eq!(
            err,
            GeometryError::DimensionMismatch {
                atom: 0,
                expected: 12,
                found: 9
            }
        );
    }
}
