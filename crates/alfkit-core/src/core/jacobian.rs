//! Wilson B-matrix of the local-frame features and force conversion.
//!
//! Row `i`, column `3j + c` of the B-matrix holds `d feature_i / d x_{j,c}`, where
//! `x_{j,c}` is Cartesian component `c` of atom `j` in Bohr. The matrix is
//! assembled one 3-column block per atom from closed-form partials of the encoder:
//! frame atoms pick up the chain rule through the normalize/cross construction of
//! the C-matrix, every other atom contributes only through its own
//! `(r, theta, phi)` triplet.

use super::alf::{Alf, SystemAlf};
use super::error::GeometryError;
use super::features::{self, check_atom_count, is_cyclic};
use super::models::geometry::Atoms;
use super::utils::geometry::{DEGENERACY_EPS, normalization_jacobian, skew, wrap_angle};
use nalgebra::{DMatrix, DVector, Matrix3, RowVector3, Vector3};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub const DEFAULT_FINITE_DIFFERENCE_STEP: f64 = 1e-6;
pub const DEFAULT_JACOBIAN_TOLERANCE: f64 = 1e-5;
pub const DEFAULT_SINGULAR_WARNING_THRESHOLD: f64 = 1e-10;

/// Local axes of a frame and their derivatives with respect to
/// `a = x_atom - origin` and `b = xy_atom - origin`.
struct FrameDerivatives {
    ex: Vector3<f64>,
    ey: Vector3<f64>,
    ez: Vector3<f64>,
    dex_da: Matrix3<f64>,
    dey_da: Matrix3<f64>,
    dey_db: Matrix3<f64>,
    dez_da: Matrix3<f64>,
    dez_db: Matrix3<f64>,
}

impl FrameDerivatives {
    fn new(a: &Vector3<f64>, b: &Vector3<f64>, atom: usize) -> Result<Self, GeometryError> {
        let a_norm = a.norm();
        if a_norm < DEGENERACY_EPS {
            return Err(GeometryError::DegenerateGeometry {
                atom,
                reason: "x-axis atom coincides with the origin",
            });
        }
        let ex = a / a_norm;
        let dex_da = normalization_jacobian(&ex, a_norm);

        let projector = Matrix3::identity() - ex * ex.transpose();
        let y = projector * b;
        let y_norm = y.norm();
        if y_norm < DEGENERACY_EPS {
            return Err(GeometryError::DegenerateGeometry {
                atom,
                reason: "xy-plane atom is collinear with the x axis",
            });
        }
        let ey = y / y_norm;
        let dy_da = -ex * (dex_da * b).transpose() - ex.dot(b) * dex_da;
        let dy_db = projector;
        let dey_dy = normalization_jacobian(&ey, y_norm);
        let dey_da = dey_dy * dy_da;
        let dey_db = dey_dy * dy_db;

        let ez = ex.cross(&ey);
        let dez_da = -skew(&ey) * dex_da + skew(&ex) * dey_da;
        let dez_db = skew(&ex) * dey_db;

        Ok(Self {
            ex,
            ey,
            ez,
            dex_da,
            dey_da,
            dey_db,
            dez_da,
            dez_db,
        })
    }
}

/// Partials of one feature with respect to the frame vectors and the atom vector.
struct Partials {
    da: RowVector3<f64>,
    db: RowVector3<f64>,
    dv: RowVector3<f64>,
}

impl Default for Partials {
    fn default() -> Self {
        Self {
            da: RowVector3::zeros(),
            db: RowVector3::zeros(),
            dv: RowVector3::zeros(),
        }
    }
}

struct BMatrix {
    matrix: DMatrix<f64>,
}

impl BMatrix {
    fn zeros(n_features: usize, n_atoms: usize) -> Self {
        Self {
            matrix: DMatrix::zeros(n_features, 3 * n_atoms),
        }
    }

    fn add(&mut self, row: usize, atom: usize, block: &RowVector3<f64>) {
        for c in 0..3 {
            self.matrix[(row, 3 * atom + c)] += block[c];
        }
    }

    /// Scatters partials taken with respect to `a = X - O`, `b = Y - O` and
    /// `v = K - O` onto the atom blocks `X`, `Y`, `K` and `O`.
    fn scatter(&mut self, row: usize, alf: &Alf, xy: usize, atom: Option<usize>, p: &Partials) {
        self.add(row, alf.x_axis, &p.da);
        self.add(row, xy, &p.db);
        if let Some(k) = atom {
            self.add(row, k, &p.dv);
        }
        self.add(row, alf.origin, &(-(p.da + p.db + p.dv)));
    }
}

/// Analytic B-matrix (`n_features x 3N`) of `atom`'s features, evaluated on
/// `atoms` converted to Bohr.
///
/// # Errors
///
/// Fails with [`GeometryError::TopologyMismatch`] if `atoms` does not match
/// `system_alf`, and with [`GeometryError::DegenerateGeometry`] if the frame or
/// one of the spherical coordinates is singular.
pub fn build(
    atoms: &Atoms,
    system_alf: &SystemAlf,
    atom: usize,
) -> Result<DMatrix<f64>, GeometryError> {
    check_atom_count(atoms, system_alf)?;
    let atoms = atoms.to_bohr();
    let alf = system_alf.resolve(atom)?;
    let n_atoms = atoms.len();
    let mut b_matrix = BMatrix::zeros(features::n_features(n_atoms), n_atoms);

    let origin = atoms.position(alf.origin)?;
    let a = atoms.position(alf.x_axis)? - origin;
    let a_norm = a.norm();
    if a_norm < DEGENERACY_EPS {
        return Err(GeometryError::DegenerateGeometry {
            atom,
            reason: "x-axis atom coincides with the origin",
        });
    }
    let ua = a / a_norm;

    let Some(xy) = alf.xy_plane else {
        b_matrix.add(0, alf.x_axis, &ua.transpose());
        b_matrix.add(0, alf.origin, &(-ua.transpose()));
        return Ok(b_matrix.matrix);
    };

    let b = atoms.position(xy)? - origin;
    let b_norm = b.norm();
    let ub = b / b_norm;
    let frame = FrameDerivatives::new(&a, &b, atom)?;

    // bond1, bond2
    let bond1 = Partials {
        da: ua.transpose(),
        ..Default::default()
    };
    b_matrix.scatter(0, &alf, xy, None, &bond1);
    let bond2 = Partials {
        db: ub.transpose(),
        ..Default::default()
    };
    b_matrix.scatter(1, &alf, xy, None, &bond2);

    // angle1
    let cos = ua.dot(&ub);
    let sin = ua.cross(&ub).norm();
    if sin < DEGENERACY_EPS {
        return Err(GeometryError::DegenerateGeometry {
            atom,
            reason: "frame angle is 0 or pi",
        });
    }
    let angle = Partials {
        da: ((cos * ua - ub) / (a_norm * sin)).transpose(),
        db: ((cos * ub - ua) / (b_norm * sin)).transpose(),
        ..Default::default()
    };
    b_matrix.scatter(2, &alf, xy, None, &angle);

    for (j, k) in system_alf.remaining_atoms(atom)?.into_iter().enumerate() {
        let row = 3 + 3 * j;
        let v = atoms.position(k)? - origin;
        let r = v.norm();
        let (lx, ly, lz) = (frame.ex.dot(&v), frame.ey.dot(&v), frame.ez.dot(&v));
        let rho_sq = lx * lx + ly * ly;
        if r < DEGENERACY_EPS || rho_sq.sqrt() < DEGENERACY_EPS * r.max(1.0) {
            return Err(GeometryError::DegenerateGeometry {
                atom,
                reason: "atom lies on the local z axis",
            });
        }
        let vt = v.transpose();

        let dr = Partials {
            dv: vt / r,
            ..Default::default()
        };
        b_matrix.scatter(row, &alf, xy, Some(k), &dr);

        // theta = acos(lz / r); d(lz / r) = dlz / r - lz dr / r^2
        let s = rho_sq.sqrt() / r;
        let theta = Partials {
            da: -(vt * frame.dez_da) / (r * s),
            db: -(vt * frame.dez_db) / (r * s),
            dv: -(frame.ez.transpose() / r - lz * vt / r.powi(3)) / s,
        };
        b_matrix.scatter(row + 1, &alf, xy, Some(k), &theta);

        // phi = atan2(ly, lx)
        let dlx_da = vt * frame.dex_da;
        let dly_da = vt * frame.dey_da;
        let dly_db = vt * frame.dey_db;
        let phi = Partials {
            da: (lx * dly_da - ly * dlx_da) / rho_sq,
            db: lx * dly_db / rho_sq,
            dv: (lx * frame.ey.transpose() - ly * frame.ex.transpose()) / rho_sq,
        };
        b_matrix.scatter(row + 2, &alf, xy, Some(k), &phi);
    }

    Ok(b_matrix.matrix)
}

/// Report of one analytic-vs-numerical Jacobian comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct JacobianCheck {
    pub atom: usize,
    pub max_abs_error: f64,
    /// `(feature row, Cartesian column)` of the largest deviation.
    pub worst_entry: Option<(usize, usize)>,
    pub tolerance: f64,
    pub passed: bool,
}

/// Central finite-difference approximation of the B-matrix, in Bohr.
///
/// Differences of cyclic components are wrapped into `(-pi, pi]` so a phi crossing
/// the branch cut does not show up as a `2 pi` jump.
pub fn numerical(
    atoms: &Atoms,
    system_alf: &SystemAlf,
    atom: usize,
    step: f64,
) -> Result<DMatrix<f64>, GeometryError> {
    let atoms = atoms.to_bohr();
    let x0 = atoms.flat_coordinates();
    let n_features = features::n_features(atoms.len());
    let mut numerical = DMatrix::zeros(n_features, x0.len());

    for col in 0..x0.len() {
        let mut plus = x0.clone();
        plus[col] += step;
        let mut minus = x0.clone();
        minus[col] -= step;
        let f_plus = features::encode(&atoms.with_flat_coordinates(&plus)?, system_alf, atom)?;
        let f_minus = features::encode(&atoms.with_flat_coordinates(&minus)?, system_alf, atom)?;
        for row in 0..n_features {
            let delta = f_plus[row] - f_minus[row];
            let delta = if is_cyclic(row) { wrap_angle(delta) } else { delta };
            numerical[(row, col)] = delta / (2.0 * step);
        }
    }
    Ok(numerical)
}

/// Compares [`build`] against [`numerical`] entry by entry.
#[instrument(skip_all, name = "jacobian_verification", fields(atom = atom))]
pub fn verify_jacobian(
    atoms: &Atoms,
    system_alf: &SystemAlf,
    atom: usize,
    step: f64,
    tolerance: f64,
) -> Result<JacobianCheck, GeometryError> {
    let analytic = build(atoms, system_alf, atom)?;
    let numerical = numerical(atoms, system_alf, atom, step)?;

    let mut max_abs_error = 0.0;
    let mut worst_entry = None;
    for row in 0..analytic.nrows() {
        for col in 0..analytic.ncols() {
            let error = (analytic[(row, col)] - numerical[(row, col)]).abs();
            if error > max_abs_error {
                max_abs_error = error;
                worst_entry = Some((row, col));
            }
        }
    }
    let passed = max_abs_error <= tolerance;
    debug!(max_abs_error, passed, "Jacobian verified against finite differences.");
    Ok(JacobianCheck {
        atom,
        max_abs_error,
        worst_entry,
        tolerance,
        passed,
    })
}

/// The Gram matrix `G = B B^T` had (near-)zero singular values; the conversion
/// went through the pseudo-inverse and the result may be ill-conditioned.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "Near-singular Gram matrix for atom {atom}: smallest relative singular value {smallest_relative:.3e}, {discarded} discarded"
)]
pub struct SingularJacobianWarning {
    pub atom: usize,
    pub smallest_relative: f64,
    pub discarded: usize,
    pub singular_values: Vec<f64>,
}

/// Controls the SVD pseudo-inverse of the Gram matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PseudoInverseOptions {
    /// Singular values at or below `cutoff * s_max` are dropped. `None` inverts every
    /// non-zero singular value.
    pub relative_cutoff: Option<f64>,
    /// Relative singular value below which a [`SingularJacobianWarning`] is produced.
    pub warning_threshold: f64,
}

impl Default for PseudoInverseOptions {
    fn default() -> Self {
        Self {
            relative_cutoff: None,
            warning_threshold: DEFAULT_SINGULAR_WARNING_THRESHOLD,
        }
    }
}

/// Feature-space forces plus the conditioning report of the conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureForces {
    pub values: DVector<f64>,
    pub warning: Option<SingularJacobianWarning>,
}

fn pseudo_inverse(
    gram: DMatrix<f64>,
    atom: usize,
    options: &PseudoInverseOptions,
) -> Result<(DMatrix<f64>, Option<SingularJacobianWarning>), GeometryError> {
    let svd = gram.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(GeometryError::DegenerateGeometry {
            atom,
            reason: "singular value decomposition of the Gram matrix failed",
        });
    };
    let singular_values = svd.singular_values;
    let s_max = singular_values.max();
    let threshold = match options.relative_cutoff {
        Some(cutoff) => cutoff * s_max,
        None => 0.0,
    };

    let mut inverse_s = DVector::zeros(singular_values.len());
    let mut discarded = 0;
    for (i, &s) in singular_values.iter().enumerate() {
        if s > threshold {
            inverse_s[i] = 1.0 / s;
        } else {
            discarded += 1;
        }
    }

    let smallest_relative = if s_max > 0.0 {
        singular_values.min() / s_max
    } else {
        0.0
    };
    let warning = (smallest_relative < options.warning_threshold).then(|| {
        let warning = SingularJacobianWarning {
            atom,
            smallest_relative,
            discarded,
            singular_values: singular_values.iter().copied().collect(),
        };
        warn!(%warning, "Gram matrix inverted through its pseudo-inverse.");
        warning
    });

    let pinv = v_t.transpose() * DMatrix::from_diagonal(&inverse_s) * u.transpose();
    Ok((pinv, warning))
}

fn flatten_forces(
    forces: &[Vector3<f64>],
    n_atoms: usize,
    atom: usize,
) -> Result<DVector<f64>, GeometryError> {
    if forces.len() != n_atoms {
        return Err(GeometryError::DimensionMismatch {
            atom,
            expected: n_atoms,
            found: forces.len(),
        });
    }
    Ok(DVector::from_iterator(
        3 * n_atoms,
        forces.iter().flat_map(|f| [f.x, f.y, f.z]),
    ))
}

/// Cartesian forces (N x 3) to feature-space forces: `(B B^T)^+ B f`.
pub fn cartesian_to_feature_forces(
    b_matrix: &DMatrix<f64>,
    forces: &[Vector3<f64>],
    atom: usize,
    options: &PseudoInverseOptions,
) -> Result<FeatureForces, GeometryError> {
    let flat = flatten_forces(forces, b_matrix.ncols() / 3, atom)?;
    let gram = b_matrix * b_matrix.transpose();
    let (gram_inverse, warning) = pseudo_inverse(gram, atom, options)?;
    Ok(FeatureForces {
        values: gram_inverse * (b_matrix * flat),
        warning,
    })
}

/// Feature-space forces back to Cartesian forces (N x 3): `B^T f`.
pub fn feature_to_cartesian_forces(
    b_matrix: &DMatrix<f64>,
    feature_forces: &DVector<f64>,
    atom: usize,
) -> Result<Vec<Vector3<f64>>, GeometryError> {
    if feature_forces.len() != b_matrix.nrows() {
        return Err(GeometryError::DimensionMismatch {
            atom,
            expected: b_matrix.nrows(),
            found: feature_forces.len(),
        });
    }
    let flat = b_matrix.transpose() * feature_forces;
    Ok(flat
        .as_slice()
        .chunks_exact(3)
        .map(|c| Vector3::new(c[0], c[1], c[2]))
        .collect())
}
