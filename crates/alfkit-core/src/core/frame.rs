use super::alf::Alf;
use super::error::GeometryError;
use super::models::geometry::Atoms;
use super::utils::geometry::DEGENERACY_EPS;
use nalgebra::{Matrix3, Point3, Vector3};

/// Orthonormal 3x3 rotation (the C-matrix) of one atom's local frame.
///
/// Rows 0, 1 and 2 are the local x, y and z unit vectors expressed in the global
/// Cartesian basis, so `C * v` maps a global vector into local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMatrix {
    matrix: Matrix3<f64>,
}

impl RotationMatrix {
    /// Builds the frame from the origin, x-axis and xy-plane positions.
    ///
    /// `atom` only labels the error.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::DegenerateGeometry`] if the x-axis atom sits on the
    /// origin or the xy-plane atom is collinear with the x axis.
    pub fn from_points(
        origin: &Point3<f64>,
        x_point: &Point3<f64>,
        xy_point: &Point3<f64>,
        atom: usize,
    ) -> Result<Self, GeometryError> {
        let a = x_point - origin;
        let b = xy_point - origin;

        let a_sq = a.norm_squared();
        if a_sq.sqrt() < DEGENERACY_EPS {
            return Err(GeometryError::DegenerateGeometry {
                atom,
                reason: "x-axis atom coincides with the origin",
            });
        }
        let row0 = a / a_sq.sqrt();

        let sigma = -a.dot(&b) / a_sq;
        let y_vec = sigma * a + b;
        let y_norm = y_vec.norm();
        if y_norm < DEGENERACY_EPS {
            return Err(GeometryError::DegenerateGeometry {
                atom,
                reason: "xy-plane atom is collinear with the x axis",
            });
        }
        let row1 = y_vec / y_norm;
        let row2 = row0.cross(&row1);

        Ok(Self {
            matrix: Matrix3::from_rows(&[row0.transpose(), row1.transpose(), row2.transpose()]),
        })
    }

    /// C-matrix of the frame `alf` evaluated on `atoms`.
    ///
    /// A two-atom frame has no xy-plane atom; the fixed dummy point
    /// `origin + (x - origin) + (1, 1, 1)` stands in for it. The resulting y and z
    /// axes are valid but carry no chemical meaning.
    pub fn for_alf(atoms: &Atoms, alf: &Alf) -> Result<Self, GeometryError> {
        let origin = atoms.position(alf.origin)?;
        let x_point = atoms.position(alf.x_axis)?;
        let xy_point = match alf.xy_plane {
            Some(xy) => atoms.position(xy)?,
            None => x_point + Vector3::new(1.0, 1.0, 1.0),
        };
        Self::from_points(&origin, &x_point, &xy_point, alf.origin)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Local axis `i` (0 = x, 1 = y, 2 = z) in global coordinates.
    pub fn axis(&self, i: usize) -> Vector3<f64> {
        self.matrix.row(i).transpose()
    }

    pub fn to_local(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.matrix * v
    }

    pub fn to_global(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.matrix.transpose() * v
    }
}

/// Expresses per-atom Cartesian force (or gradient) vectors in a local frame.
pub fn rotate_forces_to_local(
    forces: &[Vector3<f64>],
    rotation: &RotationMatrix,
) -> Vec<Vector3<f64>> {
    forces.iter().map(|f| rotation.to_local(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::units::DistanceUnit;

    const TOLERANCE: f64 = 1e-8;

    fn skewed_triatomic() -> Atoms {
        Atoms::from_symbols_and_coords(
            &["C", "O", "N"],
            &[[0.3, -1.2, 0.8], [1.5, 0.4, -0.2], [-0.7, 0.9, 1.6]],
            DistanceUnit::Bohr,
        )
        .unwrap()
    }

    fn assert_orthonormal(c: &RotationMatrix) {
        for i in 0..3 {
            assert!((c.axis(i).norm() - 1.0).abs() < TOLERANCE);
            for j in (i + 1)..3 {
                assert!(c.axis(i).dot(&c.axis(j)).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn rows_are_orthonormal_and_right_handed() {
        let atoms = skewed_triatomic();
        for alf in [
            Alf::new(0, 1, Some(2)),
            Alf::new(1, 0, Some(2)),
            Alf::new(2, 0, Some(1)),
        ] {
            let c = RotationMatrix::for_alf(&atoms, &alf).unwrap();
            assert_orthonormal(&c);
            assert!((c.matrix().determinant() - 1.0).abs() < TOLERANCE);
        }
    }

    #[test]
    fn x_axis_points_at_x_atom_and_xy_atom_has_positive_local_y() {
        let atoms = skewed_triatomic();
        let c = RotationMatrix::for_alf(&atoms, &Alf::new(0, 1, Some(2))).unwrap();
        let to_x = c.to_local(&atoms.vector_between(0, 1).unwrap());
        assert!(to_x.y.abs() < TOLERANCE && to_x.z.abs() < TOLERANCE && to_x.x > 0.0);
        let to_xy = c.to_local(&atoms.vector_between(0, 2).unwrap());
        assert!(to_xy.z.abs() < TOLERANCE);
        assert!(to_xy.y > 0.0);
    }

    #[test]
    fn to_global_inverts_to_local() {
        let atoms = skewed_triatomic();
        let c = RotationMatrix::for_alf(&atoms, &Alf::new(2, 0, Some(1))).unwrap();
        let v = Vector3::new(0.2, -3.0, 1.4);
        assert!((c.to_global(&c.to_local(&v)) - v).norm() < 1e-12);
    }

    #[test]
    fn diatomic_frame_uses_dummy_point() {
        let atoms = Atoms::from_symbols_and_coords(
            &["H", "H"],
            &[[0.0, 0.0, 0.0], [1.4, 0.0, 0.0]],
            DistanceUnit::Bohr,
        )
        .unwrap();
        let c = RotationMatrix::for_alf(&atoms, &Alf::new(0, 1, None)).unwrap();
        assert_orthonormal(&c);
        assert!((c.axis(0) - Vector3::x()).norm() < TOLERANCE);
        let expected_y = Vector3::new(0.0, 1.0, 1.0).normalize();
        assert!((c.axis(1) - expected_y).norm() < TOLERANCE);
    }

    #[test]
    fn collocated_atoms_are_degenerate() {
        let atoms = Atoms::from_symbols_and_coords(
            &["C", "O", "N"],
            &[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]],
            DistanceUnit::Bohr,
        )
        .unwrap();
        let err = RotationMatrix::for_alf(&atoms, &Alf::new(0, 1, Some(2))).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateGeometry { atom: 0, .. }));
    }

    #[test]
    fn collinear_xy_atom_is_degenerate() {
        let atoms = Atoms::from_symbols_and_coords(
            &["C", "O", "N"],
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.5, 0.0, 0.0]],
            DistanceUnit::Bohr,
        )
        .unwrap();
        assert!(matches!(
            RotationMatrix::for_alf(&atoms, &Alf::new(0, 1, Some(2))),
            Err(GeometryError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn rotated_forces_keep_their_magnitude() {
        let atoms = skewed_triatomic();
        let c = RotationMatrix::for_alf(&atoms, &Alf::new(0, 1, Some(2))).unwrap();
        let forces = vec![Vector3::new(0.1, 0.2, -0.3), Vector3::new(-1.0, 0.0, 0.5)];
        let local = rotate_forces_to_local(&forces, &c);
        for (f, l) in forces.iter().zip(&local) {
            assert!((f.norm() - l.norm()).abs() < 1e-12);
        }
    }
}
