//! # alfkit Core Library
//!
//! Rotation- and translation-invariant feature construction for machine-learned,
//! per-atom potentials built on atomic local frames (ALFs).
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout:
//!
//! - **[`core`]: The Foundation.** Stateless geometry models and the pure numerical
//!   transforms: connectivity, ALF selection, frame rotations, feature encoding,
//!   the Wilson B-matrix and geometry reconstruction.
//!
//! - **[`engine`]: The Glue.** The per-topology [`engine::cache::AlfCache`],
//!   configuration, progress reporting and fault-isolated batch execution over
//!   independent frames.
//!
//! - **[`workflows`]: The Public API.** End-to-end pipelines over whole
//!   trajectories: featurization, force conversion and re-centring.

pub mod core;
pub mod engine;
pub mod workflows;
