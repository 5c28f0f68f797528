use super::elements::{self, ElementData};
use super::units::DistanceUnit;
use crate::core::error::GeometryError;
use nalgebra::Point3;

/// A single atom of one geometry snapshot.
///
/// `index` is the atom's position in the owning [`super::geometry::Atoms`] and is
/// the key every connectivity, frame and feature structure refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub element: String,
    pub position: Point3<f64>,
    pub unit: DistanceUnit,
    pub index: usize,
}

impl Atom {
    pub fn new(element: &str, position: Point3<f64>, unit: DistanceUnit, index: usize) -> Self {
        Self {
            element: elements::normalize_symbol(element),
            position,
            unit,
            index,
        }
    }

    /// Static element data for this atom.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnknownElement`] if the symbol is not in the element table.
    pub fn element_data(&self) -> Result<&'static ElementData, GeometryError> {
        elements::lookup(&self.element)
            .ok_or_else(|| GeometryError::UnknownElement(self.element.clone()))
    }

    pub fn mass(&self) -> Result<f64, GeometryError> {
        self.element_data().map(|data| data.mass)
    }

    /// Returns a copy expressed in `unit`, with the position rescaled accordingly.
    pub fn to_unit(&self, unit: DistanceUnit) -> Self {
        let factor = self.unit.factor_to(unit);
        Self {
            element: self.element.clone(),
            position: Point3::from(self.position.coords * factor),
            unit,
            index: self.index,
        }
    }
}
