use super::error::GeometryError;
use super::models::elements::ElementData;
use super::models::geometry::Atoms;
use itertools::Itertools;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_DISTANCE_TOLERANCE: f64 = 1.2;
pub const DEFAULT_MAX_BOND_FACTOR: f64 = 1.5;

/// How bonds are inferred from a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum ConnectivityMethod {
    /// Bond `i-j` iff `|r_i - r_j| < tolerance * (rcov_i + rcov_j)`.
    Distance { tolerance: f64 },
    /// Candidate pairs closer than `max_bond_factor * (rcov_i + rcov_j)` are accepted
    /// shortest first, as long as both endpoints still have free valence.
    Valence {
        #[serde(rename = "max-bond-factor")]
        max_bond_factor: f64,
    },
}

impl Default for ConnectivityMethod {
    fn default() -> Self {
        Self::Distance {
            tolerance: DEFAULT_DISTANCE_TOLERANCE,
        }
    }
}

/// Symmetric boolean adjacency over one geometry's atom indices, false diagonal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityMatrix {
    n_atoms: usize,
    bonded: Vec<bool>,
}

impl ConnectivityMatrix {
    /// An `n x n` matrix with no bonds.
    pub fn empty(n_atoms: usize) -> Self {
        Self {
            n_atoms,
            bonded: vec![false; n_atoms * n_atoms],
        }
    }

    /// Builds a matrix from an explicit bond list. Self-bonds are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::AtomIndexOutOfRange`] if a bond references a missing atom.
    pub fn from_bonds(n_atoms: usize, bonds: &[(usize, usize)]) -> Result<Self, GeometryError> {
        let mut matrix = Self::empty(n_atoms);
        for &(i, j) in bonds {
            for index in [i, j] {
                if index >= n_atoms {
                    return Err(GeometryError::AtomIndexOutOfRange { index, n_atoms });
                }
            }
            if i != j {
                matrix.connect(i, j);
            }
        }
        Ok(matrix)
    }

    fn connect(&mut self, i: usize, j: usize) {
        self.bonded[i * self.n_atoms + j] = true;
        self.bonded[j * self.n_atoms + i] = true;
    }

    pub fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    pub fn is_bonded(&self, i: usize, j: usize) -> bool {
        i < self.n_atoms && j < self.n_atoms && self.bonded[i * self.n_atoms + j]
    }

    /// Bonded neighbours of `i` in ascending index order.
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        if i >= self.n_atoms {
            return Vec::new();
        }
        (0..self.n_atoms)
            .filter(|&j| self.bonded[i * self.n_atoms + j])
            .collect()
    }

    pub fn degree(&self, i: usize) -> usize {
        self.neighbors(i).len()
    }

    /// Every bond once, as `(i, j)` with `i < j`.
    pub fn bonds(&self) -> Vec<(usize, usize)> {
        (0..self.n_atoms)
            .tuple_combinations()
            .filter(|&(i, j)| self.is_bonded(i, j))
            .collect()
    }
}

/// Computes the bonding adjacency of `atoms` with the chosen strategy.
///
/// Distances are compared in Angstroms regardless of the geometry's unit.
/// Isolated atoms simply end up with empty rows.
///
/// # Errors
///
/// Returns [`GeometryError::UnknownElement`] if an atom has no covalent radius.
pub fn compute(
    atoms: &Atoms,
    method: &ConnectivityMethod,
) -> Result<ConnectivityMatrix, GeometryError> {
    let atoms = atoms.to_angstrom();
    let data: Vec<&ElementData> = atoms
        .iter()
        .map(|a| a.element_data())
        .collect::<Result<_, _>>()?;

    let positions = atoms.positions();
    let pair_distance = |i: usize, j: usize| (positions[j] - positions[i]).norm();
    let radius_sum = |i: usize, j: usize| data[i].covalent_radius + data[j].covalent_radius;

    let mut matrix = ConnectivityMatrix::empty(atoms.len());

    match *method {
        ConnectivityMethod::Distance { tolerance } => {
            for (i, j) in (0..atoms.len()).tuple_combinations() {
                if pair_distance(i, j) < tolerance * radius_sum(i, j) {
                    matrix.connect(i, j);
                }
            }
        }
        ConnectivityMethod::Valence { max_bond_factor } => {
            let candidates: Vec<(f64, usize, usize)> = (0..atoms.len())
                .tuple_combinations()
                .map(|(i, j)| (pair_distance(i, j), i, j))
                .filter(|&(d, i, j)| d < max_bond_factor * radius_sum(i, j))
                .sorted_by(|a, b| a.0.total_cmp(&b.0).then((a.1, a.2).cmp(&(b.1, b.2))))
                .collect();

            let mut bond_counts = vec![0usize; atoms.len()];
            for (_, i, j) in candidates {
                if bond_counts[i] < data[i].valence && bond_counts[j] < data[j].valence {
                    matrix.connect(i, j);
                    bond_counts[i] += 1;
                    bond_counts[j] += 1;
                }
            }
        }
    }

    debug!(
        n_atoms = atoms.len(),
        n_bonds = matrix.bonds().len(),
        ?method,
        "Connectivity computed."
    );
    Ok(matrix)
}
