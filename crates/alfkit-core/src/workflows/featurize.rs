use super::resolve_topology;
use crate::core::alf::SystemAlf;
use crate::core::error::GeometryError;
use crate::core::features;
use crate::core::models::geometry::Atoms;
use crate::engine::batch::{self, BatchReport};
use crate::engine::cache::AlfCache;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::DVector;
use tracing::{info, instrument};

/// Feature vectors of every atom of every frame, plus the metadata a regression
/// engine needs to interpret them.
#[derive(Debug, Clone)]
pub struct FeaturizeResult {
    pub system_alf: SystemAlf,
    pub feature_names: Vec<String>,
    pub cyclic_features: Vec<usize>,
    /// Indexed by frame, then by atom.
    pub frames: BatchReport<Vec<DVector<f64>>, GeometryError>,
}

#[instrument(skip_all, name = "featurize_workflow", fields(n_frames = trajectory.len()))]
pub fn run(
    trajectory: &[Atoms],
    cache: &mut AlfCache,
    reporter: &ProgressReporter,
) -> Result<FeaturizeResult, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Topology" });
    let topology = resolve_topology(trajectory, cache)?;
    reporter.report(Progress::PhaseFinish);
    let n_atoms = topology.n_atoms();

    let frames = reporter.phase("Feature Encoding", || {
        batch::run_frames(trajectory, reporter, |_, atoms| {
            topology.check_frame(atoms)?;
            features::encode_all(atoms, topology.system_alf())
        })
    });

    info!(
        n_atoms,
        failed = frames.failure_count(),
        "Featurization finished."
    );
    Ok(FeaturizeResult {
        system_alf: topology.system_alf().clone(),
        feature_names: features::feature_names(n_atoms),
        cyclic_features: features::cyclic_features(n_atoms),
        frames,
    })
}
