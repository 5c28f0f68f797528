//! Fault-isolated execution of one task per frame.

use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::error::GeometryError;
use std::fmt::Display;
use tracing::warn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of one frame's task, tagged with the frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome<T, E> {
    pub frame: usize,
    pub result: Result<T, E>,
}

/// Outcomes of every frame of a batch, in frame order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport<T, E> {
    outcomes: Vec<FrameOutcome<T, E>>,
}

impl<T, E> BatchReport<T, E> {
    pub fn outcomes(&self) -> &[FrameOutcome<T, E>] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn successes(&self) -> impl Iterator<Item = (usize, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|value| (o.frame, value)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &E)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|error| (o.frame, error)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn into_results(self) -> Vec<Result<T, E>> {
        self.outcomes.into_iter().map(|o| o.result).collect()
    }
}

impl<T> BatchReport<T, GeometryError> {
    /// All values in frame order, or the first failed frame as an
    /// [`EngineError::Frame`].
    pub fn into_all(self) -> Result<Vec<T>, EngineError> {
        self.outcomes
            .into_iter()
            .map(|o| {
                o.result.map_err(|source| EngineError::Frame {
                    frame: o.frame,
                    source,
                })
            })
            .collect()
    }
}

/// Runs `task` on every frame and records each outcome against its frame index.
///
/// A failing frame is logged and reported as [`Progress::FrameFailed`]; the other
/// frames still run. Frames are processed in parallel when the `parallel` feature
/// is enabled, and the report is always in frame order.
pub fn run_frames<I, T, E, F>(
    frames: &[I],
    reporter: &ProgressReporter,
    task: F,
) -> BatchReport<T, E>
where
    I: Sync,
    T: Send,
    E: Send + Display,
    F: Fn(usize, &I) -> Result<T, E> + Send + Sync,
{
    reporter.report(Progress::TaskStart {
        total_steps: frames.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = frames.iter().enumerate();

    #[cfg(feature = "parallel")]
    let iterator = frames.par_iter().enumerate();

    let outcomes: Vec<FrameOutcome<T, E>> = iterator
        .map(|(frame, item)| {
            let result = task(frame, item);
            if let Err(e) = &result {
                warn!(frame, error = %e, "Frame failed; continuing with the remaining frames.");
                reporter.report(Progress::FrameFailed {
                    frame,
                    reason: e.to_string(),
                });
            }
            reporter.report(Progress::TaskIncrement);
            FrameOutcome { frame, result }
        })
        .collect();

    reporter.report(Progress::TaskFinish);
    BatchReport { outcomes }
}
