use super::resolve_topology;
use crate::core::error::GeometryError;
use crate::core::jacobian::{self, JacobianCheck, SingularJacobianWarning};
use crate::core::models::geometry::Atoms;
use crate::engine::batch::{self, BatchReport};
use crate::engine::cache::AlfCache;
use crate::engine::config::{AtomSelection, FeaturizerConfig};
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::{DVector, Vector3};
use tracing::{info, instrument, warn};

/// Feature-space forces of one atom in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomForces {
    pub atom: usize,
    pub values: DVector<f64>,
    pub warning: Option<SingularJacobianWarning>,
}

#[derive(Debug, Clone)]
pub struct ForcesResult {
    /// Indexed by frame, then in selection order.
    pub frames: BatchReport<Vec<AtomForces>, GeometryError>,
}

impl ForcesResult {
    /// Every near-singular Gram matrix met during the run, with its frame index.
    pub fn warnings(&self) -> impl Iterator<Item = (usize, &SingularJacobianWarning)> {
        self.frames.successes().flat_map(|(frame, atoms)| {
            atoms
                .iter()
                .filter_map(move |a| a.warning.as_ref().map(|w| (frame, w)))
        })
    }
}

/// Converts each frame's Cartesian forces (N x 3, per Bohr) into feature-space
/// forces for the selected atoms.
#[instrument(skip_all, name = "forces_workflow", fields(n_frames = trajectory.len()))]
pub fn run(
    trajectory: &[Atoms],
    forces: &[Vec<Vector3<f64>>],
    selection: &AtomSelection,
    cache: &mut AlfCache,
    config: &FeaturizerConfig,
    reporter: &ProgressReporter,
) -> Result<ForcesResult, EngineError> {
    config.validate()?;
    if forces.len() != trajectory.len() {
        return Err(EngineError::ForceFrameCount {
            expected: trajectory.len(),
            found: forces.len(),
        });
    }
    reporter.report(Progress::PhaseStart { name: "Topology" });
    let topology = resolve_topology(trajectory, cache)?;
    reporter.report(Progress::PhaseFinish);
    let system_alf = topology.system_alf();
    let atoms_to_convert = selection.resolve(topology.n_atoms());
    for &index in &atoms_to_convert {
        system_alf.resolve(index)?;
    }
    let options = config.pseudo_inverse_options();

    let paired: Vec<(&Atoms, &Vec<Vector3<f64>>)> = trajectory.iter().zip(forces).collect();
    let frames = reporter.phase("Force Conversion", || {
        batch::run_frames(&paired, reporter, |_, (atoms, frame_forces)| {
            topology.check_frame(atoms)?;
            atoms_to_convert
                .iter()
                .map(|&atom| -> Result<AtomForces, GeometryError> {
                    let b_matrix = jacobian::build(atoms, system_alf, atom)?;
                    let converted = jacobian::cartesian_to_feature_forces(
                        &b_matrix,
                        frame_forces,
                        atom,
                        &options,
                    )?;
                    Ok(AtomForces {
                        atom,
                        values: converted.values,
                        warning: converted.warning,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
    });

    let result = ForcesResult { frames };
    let n_warnings = result.warnings().count();
    if n_warnings > 0 {
        warn!(n_warnings, "Some Gram matrices were near-singular.");
    }
    info!(
        failed = result.frames.failure_count(),
        "Force conversion finished."
    );
    Ok(result)
}

/// Checks the analytic B-matrix of every atom of `atoms` against central finite
/// differences, using the step and tolerance from `config`.
#[instrument(skip_all, name = "jacobian_check_workflow")]
pub fn verify(
    atoms: &Atoms,
    cache: &mut AlfCache,
    config: &FeaturizerConfig,
) -> Result<Vec<JacobianCheck>, EngineError> {
    config.validate()?;
    let topology = cache.get_or_compute(atoms)?;
    let checks = (0..atoms.len())
        .map(|atom| {
            jacobian::verify_jacobian(
                atoms,
                topology.system_alf(),
                atom,
                config.finite_difference_step,
                config.jacobian_tolerance,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    for check in checks.iter().filter(|c| !c.passed) {
        warn!(
            atom = check.atom,
            max_abs_error = check.max_abs_error,
            "Analytic Jacobian disagrees with finite differences."
        );
    }
    Ok(checks)
}
