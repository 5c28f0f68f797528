use super::atom::Atom;
use super::units::DistanceUnit;
use crate::core::error::GeometryError;
use nalgebra::{DVector, Isometry3, Point3, Vector3};

/// An ordered, fixed-size geometry snapshot.
///
/// Atom order is semantically meaningful: index `i` names the same physical atom
/// across every frame of a trajectory that shares this topology. All atoms of one
/// geometry carry the same [`DistanceUnit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Atoms {
    atoms: Vec<Atom>,
    unit: DistanceUnit,
}

impl Atoms {
    /// Builds a geometry from element symbols and coordinates in `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::CoordinateCount`] if `symbols` and `coords` differ
    /// in length.
    pub fn from_symbols_and_coords(
        symbols: &[&str],
        coords: &[[f64; 3]],
        unit: DistanceUnit,
    ) -> Result<Self, GeometryError> {
        let positions: Vec<_> = coords.iter().map(|c| Point3::new(c[0], c[1], c[2])).collect();
        Self::from_positions(symbols, &positions, unit)
    }

    /// Builds a geometry from element symbols and positions in `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::CoordinateCount`] if `elements` and `positions`
    /// differ in length.
    pub fn from_positions<S: AsRef<str>>(
        elements: &[S],
        positions: &[Point3<f64>],
        unit: DistanceUnit,
    ) -> Result<Self, GeometryError> {
        check_count(elements.len(), positions.len())?;
        let atoms = elements
            .iter()
            .zip(positions)
            .enumerate()
            .map(|(i, (element, position))| Atom::new(element.as_ref(), *position, unit, i))
            .collect();
        Ok(Self { atoms, unit })
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn unit(&self) -> DistanceUnit {
        self.unit
    }

    pub fn iter(&self) -> impl Iterator<Item = &Atom> {
        self.atoms.iter()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn get(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    /// Like [`Atoms::get`], but reports a missing index as a [`GeometryError`].
    pub fn atom(&self, index: usize) -> Result<&Atom, GeometryError> {
        self.atoms
            .get(index)
            .ok_or(GeometryError::AtomIndexOutOfRange {
                index,
                n_atoms: self.atoms.len(),
            })
    }

    pub fn position(&self, index: usize) -> Result<Point3<f64>, GeometryError> {
        self.atom(index).map(|atom| atom.position)
    }

    pub fn elements(&self) -> Vec<&str> {
        self.atoms.iter().map(|a| a.element.as_str()).collect()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn distance(&self, i: usize, j: usize) -> Result<f64, GeometryError> {
        Ok((self.position(j)? - self.position(i)?).norm())
    }

    pub fn to_unit(&self, unit: DistanceUnit) -> Self {
        if unit == self.unit {
            return self.clone();
        }
        Self {
            atoms: self.atoms.iter().map(|a| a.to_unit(unit)).collect(),
            unit,
        }
    }

    pub fn to_bohr(&self) -> Self {
        self.to_unit(DistanceUnit::Bohr)
    }

    pub fn to_angstrom(&self) -> Self {
        self.to_unit(DistanceUnit::Angstrom)
    }

    /// Returns a copy with the same elements and unit but new positions.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::CoordinateCount`] if `positions` does not have one
    /// entry per atom.
    pub fn with_positions(&self, positions: &[Point3<f64>]) -> Result<Self, GeometryError> {
        check_count(self.atoms.len(), positions.len())?;
        Ok(self.map_positions(|i, _| positions[i]))
    }

    /// Applies a rigid rotation + translation to every position.
    pub fn transformed(&self, isometry: &Isometry3<f64>) -> Self {
        self.map_positions(|_, position| isometry * position)
    }

    fn map_positions(&self, f: impl Fn(usize, Point3<f64>) -> Point3<f64>) -> Self {
        Self {
            atoms: self
                .atoms
                .iter()
                .enumerate()
                .map(|(i, atom)| Atom {
                    position: f(i, atom.position),
                    ..atom.clone()
                })
                .collect(),
            unit: self.unit,
        }
    }

    /// Coordinates flattened as `[x0, y0, z0, x1, y1, z1, ...]`.
    pub fn flat_coordinates(&self) -> DVector<f64> {
        DVector::from_iterator(
            3 * self.atoms.len(),
            self.atoms
                .iter()
                .flat_map(|a| [a.position.x, a.position.y, a.position.z]),
        )
    }

    /// Inverse of [`Atoms::flat_coordinates`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::CoordinateCount`] if `flat` does not hold exactly
    /// `3N` values.
    pub fn with_flat_coordinates(&self, flat: &DVector<f64>) -> Result<Self, GeometryError> {
        check_count(3 * self.atoms.len(), flat.len())?;
        Ok(self.map_positions(|i, _| Point3::new(flat[3 * i], flat[3 * i + 1], flat[3 * i + 2])))
    }

    pub fn vector_between(&self, from: usize, to: usize) -> Result<Vector3<f64>, GeometryError> {
        Ok(self.position(to)? - self.position(from)?)
    }
}

fn check_count(expected: usize, found: usize) -> Result<(), GeometryError> {
    if expected != found {
        return Err(GeometryError::CoordinateCount { expected, found });
    }
    Ok(())
}
