use super::{Alf, AmbiguityPolicy};
use crate::core::connectivity::ConnectivityMatrix;
use crate::core::error::GeometryError;
use std::collections::{BTreeSet, HashSet};
use tracing::{trace, warn};

/// Outcome of ranking a set of candidate reference atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorityPick {
    /// A single candidate has the strictly highest priority.
    Resolved(usize),
    /// The tie never resolved: expanding the search no longer changes any priority.
    /// Holds every tied candidate in ascending index order.
    Ambiguous(Vec<usize>),
}

impl PriorityPick {
    /// Applies `policy`, turning the pick into a single atom index.
    pub fn decide(self, origin: usize, policy: AmbiguityPolicy) -> Result<usize, GeometryError> {
        match self {
            Self::Resolved(atom) => Ok(atom),
            Self::Ambiguous(candidates) => match (policy, candidates.first()) {
                (AmbiguityPolicy::AcceptFirst, Some(&first)) => {
                    warn!(
                        origin,
                        ?candidates,
                        chosen = first,
                        "Unresolved priority tie, taking the first candidate."
                    );
                    Ok(first)
                }
                _ => Err(GeometryError::Topology(format!(
                    "priority tie for atom {origin} between {candidates:?} cannot be resolved"
                ))),
            },
        }
    }
}

/// Summed mass of every atom within `level` bonds of `atom` (the atom itself included).
///
/// Masses are summed in ascending order so that equal atom multisets always
/// produce bit-identical priorities.
pub fn priority_at_level(
    atom: usize,
    level: usize,
    connectivity: &ConnectivityMatrix,
    masses: &[f64],
) -> f64 {
    let mut visited = HashSet::from([atom]);
    let mut frontier = vec![atom];
    for _ in 0..level {
        let next: Vec<usize> = frontier
            .iter()
            .flat_map(|&a| connectivity.neighbors(a))
            .filter(|&n| visited.insert(n))
            .collect();
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    let mut counted: Vec<f64> = visited.into_iter().map(|i| masses[i]).collect();
    counted.sort_by(f64::total_cmp);
    counted.into_iter().sum()
}

/// Ranks `candidates` by [`priority_at_level`], deepening the search while the
/// top priority is shared and the priorities are still changing.
pub fn max_priority(
    candidates: &[usize],
    connectivity: &ConnectivityMatrix,
    masses: &[f64],
) -> Option<PriorityPick> {
    if candidates.len() <= 1 {
        return candidates.first().map(|&c| PriorityPick::Resolved(c));
    }

    let mut previous: Option<Vec<f64>> = None;
    for level in 0.. {
        let priorities: Vec<f64> = candidates
            .iter()
            .map(|&c| priority_at_level(c, level, connectivity, masses))
            .collect();
        let best = priorities.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let tied: Vec<usize> = candidates
            .iter()
            .zip(&priorities)
            .filter(|&(_, &p)| p == best)
            .map(|(&c, _)| c)
            .collect();
        trace!(level, ?candidates, ?priorities, "Priority level evaluated.");

        if tied.len() == 1 {
            return Some(PriorityPick::Resolved(tied[0]));
        }
        if previous.as_ref() == Some(&priorities) {
            let mut tied = tied;
            tied.sort_unstable();
            return Some(PriorityPick::Ambiguous(tied));
        }
        previous = Some(priorities);
    }
    None
}

/// Atoms bonded to `origin`, widening shell by shell until a shell contains an atom
/// not yet in `chosen`. Empty once the connected component is exhausted.
pub fn candidate_set(
    origin: usize,
    chosen: &[usize],
    connectivity: &ConnectivityMatrix,
) -> Vec<usize> {
    let mut visited = BTreeSet::from([origin]);
    let mut frontier = vec![origin];
    while !frontier.is_empty() {
        let shell: BTreeSet<usize> = frontier
            .iter()
            .flat_map(|&a| connectivity.neighbors(a))
            .filter(|n| !visited.contains(n))
            .collect();
        visited.extend(shell.iter().copied());

        let candidates: Vec<usize> = shell
            .iter()
            .copied()
            .filter(|n| !chosen.contains(n))
            .collect();
        if !candidates.is_empty() {
            return candidates;
        }
        frontier = shell.into_iter().collect();
    }
    Vec::new()
}

/// Picks the x-axis atom, then the xy-plane atom, for `origin`.
pub fn atom_alf(
    origin: usize,
    connectivity: &ConnectivityMatrix,
    masses: &[f64],
    policy: AmbiguityPolicy,
) -> Result<Alf, GeometryError> {
    let mut chosen = vec![origin];
    for role in ["x-axis", "xy-plane"] {
        let candidates = candidate_set(origin, &chosen, connectivity);
        let pick = max_priority(&candidates, connectivity, masses).ok_or_else(|| {
            GeometryError::Topology(format!(
                "no {role} atom reachable from atom {origin} through the bond graph"
            ))
        })?;
        chosen.push(pick.decide(origin, policy)?);
    }
    Ok(Alf::new(chosen[0], chosen[1], Some(chosen[2])))
}
