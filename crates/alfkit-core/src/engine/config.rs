use crate::core::alf::{AlfMethod, AmbiguityPolicy};
use crate::core::connectivity::ConnectivityMethod;
use crate::core::jacobian::{
    DEFAULT_FINITE_DIFFERENCE_STEP, DEFAULT_JACOBIAN_TOLERANCE,
    DEFAULT_SINGULAR_WARNING_THRESHOLD, PseudoInverseOptions,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid value for '{parameter}': {reason}")]
    Invalid {
        parameter: &'static str,
        reason: String,
    },
}

/// Which atoms a per-atom workflow should process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AtomSelection {
    #[default]
    All,
    List(Vec<usize>),
}

impl AtomSelection {
    pub fn resolve(&self, n_atoms: usize) -> Vec<usize> {
        match self {
            AtomSelection::All => (0..n_atoms).collect(),
            AtomSelection::List(atoms) => atoms.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct FeaturizerConfig {
    pub alf_method: AlfMethod,
    pub connectivity: ConnectivityMethod,
    pub ambiguity: AmbiguityPolicy,
    /// Relative singular-value cutoff for the Gram pseudo-inverse. `None` inverts
    /// every non-zero singular value.
    pub svd_relative_cutoff: Option<f64>,
    pub singular_warning_threshold: f64,
    /// Central-difference step in Bohr.
    pub finite_difference_step: f64,
    pub jacobian_tolerance: f64,
}

impl Default for FeaturizerConfig {
    fn default() -> Self {
        Self {
            alf_method: AlfMethod::default(),
            connectivity: ConnectivityMethod::default(),
            ambiguity: AmbiguityPolicy::default(),
            svd_relative_cutoff: None,
            singular_warning_threshold: DEFAULT_SINGULAR_WARNING_THRESHOLD,
            finite_difference_step: DEFAULT_FINITE_DIFFERENCE_STEP,
            jacobian_tolerance: DEFAULT_JACOBIAN_TOLERANCE,
        }
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        parameter,
        reason: reason.into(),
    }
}

fn require_positive(parameter: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(parameter, format!("must be positive, got {value}")))
    }
}

impl FeaturizerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.connectivity {
            ConnectivityMethod::Distance { tolerance } => {
                require_positive("connectivity.tolerance", tolerance)?
            }
            ConnectivityMethod::Valence { max_bond_factor } => {
                require_positive("connectivity.max-bond-factor", max_bond_factor)?
            }
        }
        if let Some(cutoff) = self.svd_relative_cutoff {
            if !(0.0..1.0).contains(&cutoff) {
                return Err(invalid(
                    "svd-relative-cutoff",
                    format!("must lie in [0, 1), got {cutoff}"),
                ));
            }
        }
        let threshold = self.singular_warning_threshold;
        if threshold.is_nan() || threshold < 0.0 {
            return Err(invalid(
                "singular-warning-threshold",
                format!("must be non-negative, got {threshold}"),
            ));
        }
        require_positive("finite-difference-step", self.finite_difference_step)?;
        require_positive("jacobian-tolerance", self.jacobian_tolerance)
    }

    pub fn pseudo_inverse_options(&self) -> PseudoInverseOptions {
        PseudoInverseOptions {
            relative_cutoff: self.svd_relative_cutoff,
            warning_threshold: self.singular_warning_threshold,
        }
    }
}

#[derive(Default)]
pub struct FeaturizerConfigBuilder {
    alf_method: Option<AlfMethod>,
    connectivity: Option<ConnectivityMethod>,
    ambiguity: Option<AmbiguityPolicy>,
    svd_relative_cutoff: Option<f64>,
    singular_warning_threshold: Option<f64>,
    finite_difference_step: Option<f64>,
    jacobian_tolerance: Option<f64>,
}

impl FeaturizerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alf_method(mut self, method: AlfMethod) -> Self {
        self.alf_method = Some(method);
        self
    }
    pub fn connectivity(mut self, method: ConnectivityMethod) -> Self {
        self.connectivity = Some(method);
        self
    }
    pub fn ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = Some(policy);
        self
    }
    pub fn svd_relative_cutoff(mut self, cutoff: f64) -> Self {
        self.svd_relative_cutoff = Some(cutoff);
        self
    }
    pub fn singular_warning_threshold(mut self, threshold: f64) -> Self {
        self.singular_warning_threshold = Some(threshold);
        self
    }
    pub fn finite_difference_step(mut self, step: f64) -> Self {
        self.finite_difference_step = Some(step);
        self
    }
    pub fn jacobian_tolerance(mut self, tolerance: f64) -> Self {
        self.jacobian_tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> Result<FeaturizerConfig, ConfigError> {
        let defaults = FeaturizerConfig::default();
        let config = FeaturizerConfig {
            alf_method: self.alf_method.unwrap_or(defaults.alf_method),
            connectivity: self.connectivity.unwrap_or(defaults.connectivity),
            ambiguity: self.ambiguity.unwrap_or(defaults.ambiguity),
            svd_relative_cutoff: self.svd_relative_cutoff.or(defaults.svd_relative_cutoff),
            singular_warning_threshold: self
                .singular_warning_threshold
                .unwrap_or(defaults.singular_warning_threshold),
            finite_difference_step: self
                .finite_difference_step
                .unwrap_or(defaults.finite_difference_step),
            jacobian_tolerance: self
                .jacobian_tolerance
                .unwrap_or(defaults.jacobian_tolerance),
        };
        config.validate()?;
        Ok(config)
    }
}
