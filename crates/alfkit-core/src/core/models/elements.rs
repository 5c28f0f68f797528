use phf::{Map, phf_map};

/// Static per-element data used by connectivity and priority ranking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    /// Standard atomic weight in Daltons.
    pub mass: f64,
    /// Single-bond covalent radius in Angstroms.
    pub covalent_radius: f64,
    /// Maximum number of bonds used by valence-saturating connectivity.
    pub valence: usize,
}

const fn element(mass: f64, covalent_radius: f64, valence: usize) -> ElementData {
    ElementData {
        mass,
        covalent_radius,
        valence,
    }
}

static ELEMENTS: Map<&'static str, ElementData> = phf_map! {
    "H" => element(1.008, 0.37, 1),
    "He" => element(4.0026, 0.32, 0),
    "Li" => element(6.94, 1.34, 1),
    "Be" => element(9.0122, 0.90, 2),
    "B" => element(10.81, 0.82, 3),
    "C" => element(12.011, 0.77, 4),
    "N" => element(14.007, 0.75, 3),
    "O" => element(15.999, 0.73, 2),
    "F" => element(18.998, 0.71, 1),
    "Ne" => element(20.180, 0.69, 0),
    "Na" => element(22.990, 1.54, 1),
    "Mg" => element(24.305, 1.30, 2),
    "Al" => element(26.982, 1.18, 3),
    "Si" => element(28.085, 1.11, 4),
    "P" => element(30.974, 1.06, 3),
    "S" => element(32.06, 1.02, 2),
    "Cl" => element(35.45, 0.99, 1),
    "Ar" => element(39.948, 0.97, 0),
    "K" => element(39.098, 1.96, 1),
    "Ca" => element(40.078, 1.74, 2),
    "Sc" => element(44.956, 1.44, 3),
    "Ti" => element(47.867, 1.36, 4),
    "V" => element(50.942, 1.25, 5),
    "Cr" => element(51.996, 1.27, 6),
    "Mn" => element(54.938, 1.39, 7),
    "Fe" => element(55.845, 1.25, 6),
    "Co" => element(58.933, 1.26, 6),
    "Ni" => element(58.693, 1.21, 6),
    "Cu" => element(63.546, 1.38, 4),
    "Zn" => element(65.38, 1.31, 2),
    "Ga" => element(69.723, 1.26, 3),
    "Ge" => element(72.630, 1.22, 4),
    "As" => element(74.922, 1.19, 3),
    "Se" => element(78.971, 1.16, 2),
    "Br" => element(79.904, 1.14, 1),
    "Kr" => element(83.798, 1.10, 0),
    "Ag" => element(107.87, 1.53, 1),
    "I" => element(126.90, 1.33, 1),
    "Au" => element(196.97, 1.44, 1),
};

/// Canonicalizes an element symbol (`" cl "` -> `"Cl"`).
///
/// Trailing digits are stripped so labelled atom types such as `"O1"` or `"H12"`
/// resolve to their element.
pub fn normalize_symbol(symbol: &str) -> String {
    let letters: String = symbol
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let mut chars = letters.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

pub fn lookup(symbol: &str) -> Option<&'static ElementData> {
    ELEMENTS.get(normalize_symbol(symbol).as_str())
}
