//! Covariance functions over feature vectors, composed as an expression tree.
//!
//! The regression engine that trains on these kernels lives elsewhere; this module
//! only fixes which dimensions each term sees and how cyclic (phi) components are
//! compared.

use super::features::{cyclic_features, is_cyclic, n_features};
use super::utils::geometry::wrap_angle;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;
use std::ops::{Add, Mul};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("Feature vectors differ in length: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("Active dimension {dim} is out of range for a {len}-component feature vector")]
    DimensionOutOfRange { dim: usize, len: usize },
}

#[inline]
pub fn squared_exponential(sq_dist: f64, variance: f64) -> f64 {
    variance * (-0.5 * sq_dist).exp()
}

#[inline]
pub fn exp_sine_squared(sin_sq_sum: f64, variance: f64, lengthscale: f64) -> f64 {
    variance * (-2.0 * sin_sq_sum / (lengthscale * lengthscale)).exp()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeafKind {
    /// Squared exponential on raw differences.
    Rbf,
    /// Squared exponential on differences wrapped into `(-pi, pi]`.
    CyclicRbf,
    Periodic { period: f64 },
}

/// One covariance function acting on a subset of feature dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelLeaf {
    pub kind: LeafKind,
    pub variance: f64,
    pub lengthscale: f64,
    pub active_dims: Vec<usize>,
}

impl KernelLeaf {
    pub fn new(kind: LeafKind, lengthscale: f64, active_dims: Vec<usize>) -> Self {
        Self {
            kind,
            variance: 1.0,
            lengthscale,
            active_dims,
        }
    }

    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = variance;
        self
    }

    fn evaluate(&self, x: &DVector<f64>, y: &DVector<f64>) -> Result<f64, KernelError> {
        if let Some(&dim) = self.active_dims.iter().find(|&&d| d >= x.len()) {
            return Err(KernelError::DimensionOutOfRange { dim, len: x.len() });
        }
        let diffs = self.active_dims.iter().map(|&d| x[d] - y[d]);

        let value = match self.kind {
            LeafKind::Rbf => {
                let sq: f64 = diffs.map(|d| (d / self.lengthscale).powi(2)).sum();
                squared_exponential(sq, self.variance)
            }
            LeafKind::CyclicRbf => {
                let sq: f64 = diffs
                    .map(|d| (wrap_angle(d) / self.lengthscale).powi(2))
                    .sum();
                squared_exponential(sq, self.variance)
            }
            LeafKind::Periodic { period } => {
                let sin_sq: f64 = diffs.map(|d| (PI * d.abs() / period).sin().powi(2)).sum();
                exp_sine_squared(sin_sq, self.variance, self.lengthscale)
            }
        };
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum KernelExpr {
    Leaf(KernelLeaf),
    Sum(Box<KernelExpr>, Box<KernelExpr>),
    Product(Box<KernelExpr>, Box<KernelExpr>),
}

impl KernelExpr {
    /// `Rbf` over the non-cyclic components times `CyclicRbf` over the phi
    /// components of an `n_atoms` feature vector. Systems without phi components
    /// get the `Rbf` leaf alone.
    pub fn for_features(n_atoms: usize, lengthscale: f64) -> Self {
        let linear: Vec<usize> = (0..n_features(n_atoms)).filter(|&i| !is_cyclic(i)).collect();
        let cyclic = cyclic_features(n_atoms);
        let rbf = KernelExpr::Leaf(KernelLeaf::new(LeafKind::Rbf, lengthscale, linear));
        if cyclic.is_empty() {
            return rbf;
        }
        rbf * KernelExpr::Leaf(KernelLeaf::new(LeafKind::CyclicRbf, lengthscale, cyclic))
    }

    pub fn evaluate(&self, x: &DVector<f64>, y: &DVector<f64>) -> Result<f64, KernelError> {
        if x.len() != y.len() {
            return Err(KernelError::LengthMismatch {
                left: x.len(),
                right: y.len(),
            });
        }
        match self {
            KernelExpr::Leaf(leaf) => leaf.evaluate(x, y),
            KernelExpr::Sum(a, b) => Ok(a.evaluate(x, y)? + b.evaluate(x, y)?),
            KernelExpr::Product(a, b) => Ok(a.evaluate(x, y)? * b.evaluate(x, y)?),
        }
    }

    /// Covariance matrix of `points` against themselves.
    pub fn gram(&self, points: &[DVector<f64>]) -> Result<DMatrix<f64>, KernelError> {
        let n = points.len();
        let mut gram = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let k = self.evaluate(&points[i], &points[j])?;
                gram[(i, j)] = k;
                gram[(j, i)] = k;
            }
        }
        Ok(gram)
    }

    pub fn leaves(&self) -> Vec<&KernelLeaf> {
        match self {
            KernelExpr::Leaf(leaf) => vec![leaf],
            KernelExpr::Sum(a, b) | KernelExpr::Product(a, b) => {
                let mut leaves = a.leaves();
                leaves.extend(b.leaves());
                leaves
            }
        }
    }
}

impl Add for KernelExpr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        KernelExpr::Sum(Box::new(self), Box::new(rhs))
    }
}

impl Mul for KernelExpr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        KernelExpr::Product(Box::new(self), Box::new(rhs))
    }
}
