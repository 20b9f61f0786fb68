//! Feature specification types.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Result, SchemaGuardError};
use crate::path::Path;
use crate::statistics::ValueType;

/// Default drift threshold. An L-infinity distance never exceeds 1.0, so the
/// default never flags drift.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 1.0;

fn default_drift_threshold() -> f64 {
    DEFAULT_DRIFT_THRESHOLD
}

fn is_default_drift_threshold(threshold: &f64) -> bool {
    *threshold == DEFAULT_DRIFT_THRESHOLD
}

/// Declared type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Int,
    Float,
    Bytes,
    Struct,
}

impl FeatureType {
    /// Maps an observed value type to the type a new spec would declare.
    pub fn from_value_type(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Int => FeatureType::Int,
            ValueType::Float => FeatureType::Float,
            ValueType::String | ValueType::Bytes => FeatureType::Bytes,
            ValueType::Struct => FeatureType::Struct,
        }
    }

    /// Checks if observed values of `value_type` conform to this type.
    pub fn accepts(&self, value_type: ValueType) -> bool {
        match self {
            FeatureType::Int => value_type == ValueType::Int,
            FeatureType::Float => value_type.is_numeric(),
            FeatureType::Bytes => matches!(value_type, ValueType::String | ValueType::Bytes),
            FeatureType::Struct => value_type == ValueType::Struct,
        }
    }

    /// Checks if this type holds numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FeatureType::Int | FeatureType::Float)
    }

    /// Returns the string representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Int => "int",
            FeatureType::Float => "float",
            FeatureType::Bytes => "bytes",
            FeatureType::Struct => "struct",
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Constraint describing the legal values of a feature.
///
/// Domains only ever widen as a schema evolves: an enumeration may grow or be
/// promoted to [`Domain::Unconstrained`], a range may grow, and an
/// unconstrained domain stays unconstrained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    /// Ordered set of allowed values
    Enumerated { values: Vec<String> },
    /// Inclusive numeric range
    NumericRange { min: f64, max: f64 },
    /// Any string value
    FreeForm,
    /// No constraint
    #[default]
    Unconstrained,
}

impl Domain {
    /// Creates an enumerated domain from values, keeping first occurrences.
    pub fn enumerated<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let values = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| seen.insert(v.clone()))
            .collect();
        Domain::Enumerated { values }
    }

    /// Creates an inclusive numeric range.
    pub fn range(min: f64, max: f64) -> Self {
        Domain::NumericRange { min, max }
    }

    /// Returns the domain kind as a string.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Domain::Enumerated { .. } => "enumerated",
            Domain::NumericRange { .. } => "numeric_range",
            Domain::FreeForm => "free_form",
            Domain::Unconstrained => "unconstrained",
        }
    }

    /// Enumerated values, if this is an enumeration.
    pub fn values(&self) -> Option<&[String]> {
        match self {
            Domain::Enumerated { values } => Some(values),
            _ => None,
        }
    }

    /// Checks whether a schema may evolve from this domain to `next`.
    pub fn can_transition_to(&self, next: &Domain) -> bool {
        match (self, next) {
            (_, Domain::Unconstrained) => true,
            (Domain::Enumerated { values }, Domain::Enumerated { values: widened }) => {
                values.iter().all(|v| widened.contains(v))
            }
            (Domain::Enumerated { .. }, Domain::FreeForm) => true,
            (Domain::FreeForm, Domain::FreeForm) => true,
            (
                Domain::NumericRange { min, max },
                Domain::NumericRange {
                    min: new_min,
                    max: new_max,
                },
            ) => new_min <= min && new_max >= max,
            _ => false,
        }
    }
}

/// Whether every example must carry the feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Required,
    #[default]
    Optional,
}

/// Allowed number of values per example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueCount {
    pub min: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

impl ValueCount {
    /// Exactly one value per example.
    pub fn single() -> Self {
        Self {
            min: 1,
            max: Some(1),
        }
    }

    /// At least `min` values per example.
    pub fn at_least(min: u64) -> Self {
        Self { min, max: None }
    }
}

/// Expectations for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    #[serde(rename = "type")]
    pub feature_type: FeatureType,
    #[serde(default)]
    pub domain: Domain,
    #[serde(default)]
    pub presence: Presence,
    /// Minimum fraction of examples that must carry the feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ValueCount>,
    /// Environments in which the feature is expected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_environment: Vec<String>,
    /// Environments in which the feature is not expected.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_in_environment: Vec<String>,
    /// Maximum tolerated distance to a baseline distribution.
    #[serde(
        default = "default_drift_threshold",
        skip_serializing_if = "is_default_drift_threshold"
    )]
    pub drift_threshold: f64,
}

impl FeatureSpec {
    /// Creates an optional, unconstrained spec of the given type.
    pub fn new(feature_type: FeatureType) -> Self {
        Self {
            feature_type,
            domain: Domain::Unconstrained,
            presence: Presence::Optional,
            min_fraction: None,
            shape: None,
            in_environment: Vec::new(),
            not_in_environment: Vec::new(),
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
        }
    }

    /// Sets the value domain.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    /// Marks the feature as present in every example.
    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    /// Allows the feature to be missing.
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Sets the minimum fraction of examples that must carry the feature.
    pub fn with_min_fraction(mut self, fraction: f64) -> Self {
        self.min_fraction = Some(fraction);
        self
    }

    /// Sets the expected number of values per example.
    pub fn with_shape(mut self, shape: ValueCount) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Restricts the feature to the given environment (may be called repeatedly).
    pub fn in_environment(mut self, environment: impl Into<String>) -> Self {
        self.in_environment.push(environment.into());
        self
    }

    /// Excludes the feature from the given environment.
    pub fn not_in_environment(mut self, environment: impl Into<String>) -> Self {
        self.not_in_environment.push(environment.into());
        self
    }

    /// Sets the largest drift distance tolerated against a baseline.
    pub fn with_drift_threshold(mut self, threshold: f64) -> Self {
        self.drift_threshold = threshold;
        self
    }

    /// True when the feature is required.
    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Checks whether this spec applies in `environment`.
    ///
    /// Without an environment every spec applies. Otherwise an explicit
    /// inclusion wins, then an explicit exclusion; a spec with a non-empty
    /// inclusion list applies nowhere else, and a spec with neither list
    /// follows the schema's default environments (all environments when
    /// there are none).
    pub fn admits_environment(
        &self,
        environment: Option<&str>,
        default_environments: &[String],
    ) -> bool {
        let Some(environment) = environment else {
            return true;
        };
        if self.in_environment.iter().any(|e| e == environment) {
            return true;
        }
        if self.not_in_environment.iter().any(|e| e == environment) {
            return false;
        }
        if !self.in_environment.is_empty() {
            return false;
        }
        default_environments.is_empty() || default_environments.iter().any(|e| e == environment)
    }

    /// Checks the spec for internal contradictions.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let fail = |msg: String| -> Result<()> {
            Err(SchemaGuardError::schema_consistency(format!(
                "'{path}': {msg}"
            )))
        };

        match &self.domain {
            Domain::Enumerated { values } => {
                if self.feature_type == FeatureType::Struct {
                    return fail("struct features cannot have an enumerated domain".to_string());
                }
                let mut seen = HashSet::new();
                if let Some(dup) = values.iter().find(|v| !seen.insert(v.as_str())) {
                    return fail(format!("duplicate enumerated value '{dup}'"));
                }
            }
            Domain::NumericRange { min, max } => {
                if !self.feature_type.is_numeric() {
                    return fail(format!(
                        "numeric range domain on a {} feature",
                        self.feature_type
                    ));
                }
                if min.is_nan() || max.is_nan() || min > max {
                    return fail(format!("invalid numeric range [{min}, {max}]"));
                }
            }
            Domain::FreeForm => {
                if self.feature_type != FeatureType::Bytes {
                    return fail(format!(
                        "free-form domain on a {} feature",
                        self.feature_type
                    ));
                }
            }
            Domain::Unconstrained => {}
        }

        if let Some(fraction) = self.min_fraction {
            if !(0.0..=1.0).contains(&fraction) {
                return fail(format!("min_fraction {fraction} outside [0, 1]"));
            }
        }

        if let Some(ValueCount { min, max: Some(max) }) = self.shape {
            if min > max {
                return fail(format!("value count minimum {min} above maximum {max}"));
            }
        }

        if !self.drift_threshold.is_finite() || self.drift_threshold < 0.0 {
            return fail(format!("invalid drift threshold {}", self.drift_threshold));
        }

        if let Some(tag) = self
            .in_environment
            .iter()
            .find(|tag| self.not_in_environment.contains(tag))
        {
            return fail(format!("environment '{tag}' is both included and excluded"));
        }

        Ok(())
    }
}
