use super::Alf;
use crate::core::error::GeometryError;

/// Frames derived purely from atom order.
///
/// - two atoms: each atom's x-axis is the other atom, no xy-plane atom;
/// - first atom: `(i + 1, i + 2)`;
/// - last atom: `(i - 2, i - 1)`;
/// - any other atom: `(i - 1, i + 1)`.
///
/// The result depends on atom order; it is only stable under the identity relabeling.
pub fn calculate(n_atoms: usize) -> Result<Vec<Alf>, GeometryError> {
    match n_atoms {
        0 | 1 => Err(GeometryError::Topology(format!(
            "a local frame needs at least 2 atoms, got {n_atoms}"
        ))),
        2 => Ok(vec![Alf::new(0, 1, None), Alf::new(1, 0, None)]),
        _ => Ok((0..n_atoms).map(|i| atom_alf(i, n_atoms)).collect()),
    }
}

fn atom_alf(i: usize, n_atoms: usize) -> Alf {
    let last = n_atoms - 1;
    match i {
        0 => Alf::new(0, 1, Some(2)),
        _ if i == last => Alf::new(i, i - 2, Some(i - 1)),
        _ => Alf::new(i, i - 1, Some(i + 1)),
    }
}
