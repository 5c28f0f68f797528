use super::config::ConfigError;
use crate::core::error::GeometryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Geometry error: {source}")]
    Geometry {
        #[from]
        source: GeometryError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Frame {frame} failed: {source}")]
    Frame { frame: usize, source: GeometryError },

    #[error("Trajectory contains no frames")]
    EmptyTrajectory,

    #[error("Got force arrays for {found} frames, trajectory has {expected}")]
    ForceFrameCount { expected: usize, found: usize },
}
