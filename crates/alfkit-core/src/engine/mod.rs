//! # Engine Module
//!
//! Glue between the stateless transforms in [`crate::core`] and whole-trajectory
//! workflows.
//!
//! ## Overview
//!
//! A trajectory shares one bonding topology, so its connectivity and local frames
//! are computed once, from a reference geometry, and then reused read-only for every
//! frame. Frames are independent of each other and are processed as isolated tasks:
//! one degenerate frame is reported against its index and never aborts the rest.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Frame selection, bonding and numerical settings
//! - **Topology Cache** ([`cache`]) - The compute-once, read-only topology of a trajectory
//! - **Batch Execution** ([`batch`]) - Per-frame fault isolation, parallel when enabled
//! - **Progress Monitoring** ([`progress`]) - Optional callback sink for long runs
//! - **Error Handling** ([`error`]) - Engine-level error type

pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod progress;
