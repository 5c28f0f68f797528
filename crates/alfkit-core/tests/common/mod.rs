#![allow(dead_code)]

use alfkit::core::alf::{Alf, SystemAlf};
use alfkit::core::features::is_cyclic;
use alfkit::core::models::geometry::Atoms;
use alfkit::core::models::units::DistanceUnit;
use nalgebra::{DVector, Isometry3, Translation3, UnitQuaternion, Vector3};

pub const TWO_FRAGMENT_ELEMENTS: [&str; 6] = ["O", "H", "H", "O", "H", "H"];
pub const TWO_FRAGMENT_COORDS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.96, 0.0, 0.0],
    [-0.24, 0.93, 0.0],
    [2.1, 1.7, 0.6],
    [2.8, 2.3, 0.9],
    [1.9, 2.2, -0.2],
];

/// Atom 0 of the two-fragment fixture, Bohr and radians.
pub const TWO_FRAGMENT_ATOM0_FEATURES: [f64; 12] = [
    1.8141370796407392,
    1.8150226726051977,
    1.8233506025729562,
    5.23013924937696,
    1.352272479624232,
    0.6805212246672143,
    7.0555399280096385,
    1.3273464384511389,
    0.6876712560387296,
    5.506209256242509,
    1.6394901622592553,
    0.8584387287005677,
];

/// Atom 3 of the two-fragment fixture: frame (3, 2, 4), remaining atoms 0, 1, 5.
pub const TWO_FRAGMENT_ATOM3_FEATURES: [f64; 12] = [
    4.7913036049221205,
    1.832157454076353,
    2.758477483305504,
    5.23013924937696,
    1.6618694511640208,
    -0.3422084108984291,
    4.030746398967977,
    1.6256500996549195,
    -0.6383412703972082,
    1.822385877981558,
    0.4253493753985878,
    0.9788108626145775,
];

pub fn two_fragments() -> Atoms {
    Atoms::from_symbols_and_coords(
        &TWO_FRAGMENT_ELEMENTS,
        &TWO_FRAGMENT_COORDS,
        DistanceUnit::Angstrom,
    )
    .unwrap()
}

pub fn two_fragment_alf() -> SystemAlf {
    SystemAlf::from_alfs(vec![
        Alf::new(0, 1, Some(2)),
        Alf::new(1, 0, Some(2)),
        Alf::new(2, 0, Some(1)),
        Alf::new(3, 2, Some(4)),
        Alf::new(4, 3, Some(5)),
        Alf::new(5, 4, Some(3)),
    ])
    .unwrap()
}

pub fn diatomic() -> Atoms {
    Atoms::from_symbols_and_coords(
        &["H", "F"],
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        DistanceUnit::Angstrom,
    )
    .unwrap()
}

pub fn water() -> Atoms {
    Atoms::from_symbols_and_coords(
        &["O", "H", "H"],
        &[[0.0, 0.0, 0.0], [0.96, 0.0, 0.0], [-0.24, 0.93, 0.0]],
        DistanceUnit::Angstrom,
    )
    .unwrap()
}

pub fn rigid_motion(seed: usize) -> Isometry3<f64> {
    let s = seed as f64;
    Isometry3::from_parts(
        Translation3::new(0.3 * s, -1.1 + 0.2 * s, 2.0 - 0.5 * s),
        UnitQuaternion::from_scaled_axis(Vector3::new(0.4 + 0.1 * s, -0.7, 1.3 - 0.2 * s)),
    )
}

/// Deterministic small-amplitude vibration of `atoms` followed by a rigid motion.
pub fn trajectory(atoms: &Atoms, n_frames: usize) -> Vec<Atoms> {
    (0..n_frames)
        .map(|frame| {
            let positions: Vec<_> = atoms
                .iter()
                .enumerate()
                .map(|(i, atom)| {
                    let phase = (frame * 7 + i * 3) as f64;
                    let shift = Vector3::new(phase.sin(), phase.cos(), (2.0 * phase).sin());
                    atom.position + 0.01 * shift
                })
                .collect();
            atoms
                .with_positions(&positions)
                .unwrap()
                .transformed(&rigid_motion(frame))
        })
        .collect()
}

/// Component-wise comparison; cyclic components are compared modulo `2 pi`.
pub fn assert_features_close(actual: &DVector<f64>, expected: &[f64], tolerance: f64) {
    assert_eq!(actual.len(), expected.len(), "feature vector length");
    for (i, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let mut diff = a - e;
        if is_cyclic(i) {
            diff = diff.sin().atan2(diff.cos());
        }
        assert!(
            diff.abs() < tolerance,
            "component {i}: got {a}, expected {e} (diff {diff:e})"
        );
    }
}
