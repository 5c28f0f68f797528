//! # Core Models Module
//!
//! Plain data types describing one geometry snapshot.
//!
//! - [`atom`] - A single atom with element, position, unit tag and index
//! - [`geometry`] - [`geometry::Atoms`], the ordered atom list every other structure indexes into
//! - [`units`] - Distance units and conversion constants
//! - [`elements`] - Static per-element data (mass, covalent radius, valence)
//!
//! ```ignore
//! use alfkit::core::models::{geometry::Atoms, units::DistanceUnit};
//!
//! let water = Atoms::from_symbols_and_coords(
//!     &["O", "H", "H"],
//!     &[[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [-0.24, 0.93, 0.0]],
//!     DistanceUnit::Angstrom,
//! )?;
//! let bohr = water.to_bohr();
//! ```

pub mod atom;
pub mod elements;
pub mod geometry;
pub mod units;
