//! # Workflows Module
//!
//! End-to-end pipelines over whole trajectories. Each one resolves the shared
//! topology through an [`crate::engine::cache::AlfCache`] owned by the caller, then
//! runs the per-frame transforms of [`crate::core`] as isolated batch tasks.
//!
//! - [`featurize`] - Per-frame, per-atom invariant feature vectors
//! - [`forces`] - Cartesian forces to feature-space forces, and B-matrix verification
//! - [`recentre`] - A trajectory re-expressed in one atom's canonical local frame

pub mod featurize;
pub mod forces;
pub mod recentre;

use crate::core::models::geometry::Atoms;
use crate::engine::cache::{AlfCache, Topology};
use crate::engine::error::EngineError;

/// Resolves the trajectory's topology from its first frame.
fn resolve_topology<'c>(
    trajectory: &[Atoms],
    cache: &'c mut AlfCache,
) -> Result<&'c Topology, EngineError> {
    let reference = trajectory.first().ok_or(EngineError::EmptyTrajectory)?;
    Ok(cache.get_or_compute(reference)?)
}
