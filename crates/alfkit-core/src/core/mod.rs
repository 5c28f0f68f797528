//! # Core Module
//!
//! Stateless building blocks that turn a molecular geometry into invariant
//! per-atom features and move derivatives between feature and Cartesian space.
//!
//! ## Architecture
//!
//! Components are listed leaves first; each depends only on the ones above it.
//!
//! - **Molecular Representation** ([`models`]) - Atoms, geometries, units and element data
//! - **Bonding** ([`connectivity`]) - Adjacency from covalent radii or valence saturation
//! - **Frame Selection** ([`alf`]) - Sequence and mass-priority atomic local frames
//! - **Frame Rotation** ([`frame`]) - Orthonormal C-matrix per atom
//! - **Feature Encoding** ([`features`]) - Internal-coordinate feature vectors
//! - **Derivatives** ([`jacobian`]) - Wilson B-matrix and force conversion
//! - **Inverse Map** ([`reconstruct`]) - Cartesian coordinates from a feature vector
//! - **Kernels** ([`kernel`]) - Composite covariance expressions over feature vectors
//!
//! Every transform here is a pure function of immutable inputs and may be
//! called concurrently from any number of threads.

pub mod alf;
pub mod connectivity;
pub mod error;
pub mod features;
pub mod frame;
pub mod jacobian;
pub mod kernel;
pub mod models;
pub mod reconstruct;
pub(crate) mod utils;
