use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const BOHR_TO_ANGSTROM: f64 = 0.529177210903;
pub const ANGSTROM_TO_BOHR: f64 = 1.0 / BOHR_TO_ANGSTROM;

/// Length unit attached to a set of Cartesian coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DistanceUnit {
    #[default]
    Angstrom,
    Bohr,
}

impl DistanceUnit {
    /// Multiplicative factor that converts a length in `self` into `target`.
    pub fn factor_to(self, target: DistanceUnit) -> f64 {
        match (self, target) {
            (Self::Angstrom, Self::Bohr) => ANGSTROM_TO_BOHR,
            (Self::Bohr, Self::Angstrom) => BOHR_TO_ANGSTROM,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid distance unit string")]
pub struct ParseDistanceUnitError;

impl FromStr for DistanceUnit {
    type Err = ParseDistanceUnitError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "angstrom" | "angstroms" | "ang" | "a" => Ok(Self::Angstrom),
            "bohr" | "bohrs" | "au" | "a0" => Ok(Self::Bohr),
            _ => Err(ParseDistanceUnitError),
        }
    }
}

impl fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Angstrom => "Angstrom",
                Self::Bohr => "Bohr",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_unit_from_str_parses_valid_strings() {
        assert_eq!("angstrom".parse::<DistanceUnit>().unwrap(), DistanceUnit::Angstrom);
        assert_eq!("Ang".parse::<DistanceUnit>().unwrap(), DistanceUnit::Angstrom);
        assert_eq!("BOHR".parse::<DistanceUnit>().unwrap(), DistanceUnit::Bohr);
        assert_eq!("au".parse::<DistanceUnit>().unwrap(), DistanceUnit::Bohr);
    }

    #[test]
    fn distance_unit_from_str_rejects_invalid_strings() {
        assert!("".parse::<DistanceUnit>().is_err());
        assert!("nanometer".parse::<DistanceUnit>().is_err());
    }

    #[test]
    fn distance_unit_display_outputs_expected_strings() {
        assert_eq!(DistanceUnit::Angstrom.to_string(), "Angstrom");
        assert_eq!(DistanceUnit::Bohr.to_string(), "Bohr");
    }

    #[test]
    fn factor_to_round_trips_to_one() {
        let there = DistanceUnit::Angstrom.factor_to(DistanceUnit::Bohr);
        let back = DistanceUnit::Bohr.factor_to(DistanceUnit::Angstrom);
        assert!((there * back - 1.0).abs() < 1e-15);
        assert_eq!(DistanceUnit::Bohr.factor_to(DistanceUnit::Bohr), 1.0);
    }
}
