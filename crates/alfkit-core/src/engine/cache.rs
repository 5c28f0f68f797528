use super::config::FeaturizerConfig;
use crate::core::alf::{self, AlfMethod, AmbiguityPolicy, SystemAlf};
use crate::core::connectivity::{self, ConnectivityMatrix, ConnectivityMethod};
use crate::core::error::GeometryError;
use crate::core::models::geometry::Atoms;
use tracing::{debug, info};

/// Bonding and local frames shared by every frame of one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    elements: Vec<String>,
    connectivity: ConnectivityMatrix,
    system_alf: SystemAlf,
}

impl Topology {
    fn compute(
        reference: &Atoms,
        connectivity_method: &ConnectivityMethod,
        alf_method: AlfMethod,
        ambiguity: AmbiguityPolicy,
    ) -> Result<Self, GeometryError> {
        let connectivity = connectivity::compute(reference, connectivity_method)?;
        let system_alf = alf::calculate(reference, &connectivity, alf_method, ambiguity)?;
        Ok(Self {
            elements: reference.elements().into_iter().map(String::from).collect(),
            connectivity,
            system_alf,
        })
    }

    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    pub fn connectivity(&self) -> &ConnectivityMatrix {
        &self.connectivity
    }

    pub fn system_alf(&self) -> &SystemAlf {
        &self.system_alf
    }

    pub fn n_atoms(&self) -> usize {
        self.elements.len()
    }

    /// Cheap per-frame check: same atom count and element sequence.
    pub fn check_frame(&self, atoms: &Atoms) -> Result<(), GeometryError> {
        if atoms.len() != self.n_atoms() {
            return Err(GeometryError::TopologyMismatch(format!(
                "geometry has {} atoms, topology has {}",
                atoms.len(),
                self.n_atoms()
            )));
        }
        if let Some((index, (found, expected))) = atoms
            .elements()
            .into_iter()
            .zip(&self.elements)
            .enumerate()
            .find(|(_, (found, expected))| *found != expected.as_str())
        {
            return Err(GeometryError::TopologyMismatch(format!(
                "atom {index} is {found}, topology expects {expected}"
            )));
        }
        Ok(())
    }
}

/// Per-topology cache of connectivity and local frames.
///
/// Starts empty, is filled once from a reference geometry and is read-only from then
/// on. Presenting a geometry with a different topology is an error and never
/// replaces the cached value.
#[derive(Debug, Clone)]
pub struct AlfCache {
    connectivity_method: ConnectivityMethod,
    alf_method: AlfMethod,
    ambiguity: AmbiguityPolicy,
    topology: Option<Topology>,
}

impl AlfCache {
    pub fn new(config: &FeaturizerConfig) -> Self {
        Self {
            connectivity_method: config.connectivity,
            alf_method: config.alf_method,
            ambiguity: config.ambiguity,
            topology: None,
        }
    }

    /// A cache pre-filled with caller-supplied frames. Connectivity is still derived
    /// from `reference` so later topology checks have something to compare against.
    pub fn with_system_alf(
        config: &FeaturizerConfig,
        reference: &Atoms,
        system_alf: SystemAlf,
    ) -> Result<Self, GeometryError> {
        if system_alf.n_atoms() != reference.len() {
            return Err(GeometryError::TopologyMismatch(format!(
                "frames cover {} atoms, reference geometry has {}",
                system_alf.n_atoms(),
                reference.len()
            )));
        }
        let connectivity = connectivity::compute(reference, &config.connectivity)?;
        let mut cache = Self::new(config);
        cache.topology = Some(Topology {
            elements: reference.elements().into_iter().map(String::from).collect(),
            connectivity,
            system_alf,
        });
        Ok(cache)
    }

    pub fn is_computed(&self) -> bool {
        self.topology.is_some()
    }

    pub fn get(&self) -> Option<&Topology> {
        self.topology.as_ref()
    }

    /// Returns the cached topology, computing it from `reference` on first use.
    ///
    /// # Errors
    ///
    /// [`GeometryError::TopologyMismatch`] if a topology is already cached and
    /// `reference` differs from it in atom count, element sequence or connectivity.
    /// Failures of the first computation are propagated and leave the cache empty.
    pub fn get_or_compute(&mut self, reference: &Atoms) -> Result<&Topology, GeometryError> {
        let topology = match self.topology.take() {
            Some(cached) => match self.ensure_matches(&cached, reference) {
                Ok(()) => cached,
                Err(e) => {
                    self.topology = Some(cached);
                    return Err(e);
                }
            },
            None => {
                let computed = Topology::compute(
                    reference,
                    &self.connectivity_method,
                    self.alf_method,
                    self.ambiguity,
                )?;
                info!(
                    n_atoms = computed.n_atoms(),
                    n_bonds = computed.connectivity.bonds().len(),
                    "Topology computed and cached."
                );
                computed
            }
        };
        Ok(self.topology.insert(topology))
    }

    fn ensure_matches(&self, cached: &Topology, reference: &Atoms) -> Result<(), GeometryError> {
        cached.check_frame(reference)?;
        let connectivity = connectivity::compute(reference, &self.connectivity_method)?;
        if connectivity != cached.connectivity {
            return Err(GeometryError::TopologyMismatch(
                "bonding differs from the cached topology".to_string(),
            ));
        }
        debug!("Reference geometry matches the cached topology.");
        Ok(())
    }
}
