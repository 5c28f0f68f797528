use super::resolve_topology;
use crate::core::error::GeometryError;
use crate::core::features;
use crate::core::models::geometry::Atoms;
use crate::core::reconstruct::reconstruct;
use crate::engine::batch::{self, BatchReport};
use crate::engine::cache::AlfCache;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

/// Re-expresses every frame in the canonical local frame of `atom`: `atom` at the
/// origin, its x-axis atom on `+x` and its xy-plane atom in the upper `xy`
/// half-plane. Output geometries are in Bohr.
#[instrument(skip_all, name = "recentre_workflow", fields(atom = atom))]
pub fn run(
    trajectory: &[Atoms],
    atom: usize,
    cache: &mut AlfCache,
    reporter: &ProgressReporter,
) -> Result<BatchReport<Atoms, GeometryError>, EngineError> {
    reporter.report(Progress::PhaseStart { name: "Topology" });
    let topology = resolve_topology(trajectory, cache)?;
    reporter.report(Progress::PhaseFinish);
    let system_alf = topology.system_alf();
    system_alf.resolve(atom)?;

    let frames = reporter.phase("Recentring", || {
        batch::run_frames(trajectory, reporter, |_, atoms| {
            topology.check_frame(atoms)?;
            let features = features::encode(atoms, system_alf, atom)?;
            reconstruct(&features, system_alf, atom, topology.elements())
        })
    });

    info!(failed = frames.failure_count(), "Recentring finished.");
    Ok(frames)
}
