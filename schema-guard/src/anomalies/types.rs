//! Anomaly report types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, SchemaGuardError};
use crate::path::Path;
use crate::schema::{FeatureSpec, SchemaDefinition};

/// Severity of an anomaly.
///
/// Severities are ordered: `Error > Warning`. When several findings on the
/// same feature merge into one [`Anomaly`], the most severe one wins.
///
/// ```rust
/// use schema_guard::anomalies::Severity;
///
/// assert!(Severity::Error > Severity::Warning);
/// assert!(Severity::Error.is_at_least(Severity::Warning));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth a look, does not block the pipeline
    Warning = 0,
    /// The data does not conform to the schema
    #[default]
    Error = 1,
}

impl Severity {
    /// Returns the string representation of the severity.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Checks if this severity is at least as high as `other`.
    pub fn is_at_least(&self, other: Severity) -> bool {
        *self >= other
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a feature was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyReason {
    NewFeature,
    FeatureMissing,
    LowFractionPresent,
    UnexpectedValues,
    OutOfRangeValues,
    DistributionDrift,
    TypeMismatch,
    ShapeMismatch,
}

impl AnomalyReason {
    /// Human-readable description used in anomaly reports.
    pub fn description(&self) -> &'static str {
        match self {
            AnomalyReason::NewFeature => "new feature observed",
            AnomalyReason::FeatureMissing => "feature missing",
            AnomalyReason::LowFractionPresent => "feature present in too few examples",
            AnomalyReason::UnexpectedValues => "unexpected values observed",
            AnomalyReason::OutOfRangeValues => "out-of-range values observed",
            AnomalyReason::DistributionDrift => "distribution drift above threshold",
            AnomalyReason::TypeMismatch => "unexpected value type",
            AnomalyReason::ShapeMismatch => "unexpected number of values per example",
        }
    }
}

impl fmt::Display for AnomalyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// All findings for one feature path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// The flagged feature
    pub path: Path,
    /// Most severe finding
    pub severity: Severity,
    /// Every reason the feature was flagged for
    pub reasons: BTreeSet<AnomalyReason>,
    /// Findings joined with `"; "`
    pub description: String,
    /// Capped sample of offending observed values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observed: Vec<String>,
    /// What the schema expected, when there is a single expectation to show
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Widened spec under which this feature would no longer be flagged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_spec: Option<FeatureSpec>,
}

impl Anomaly {
    /// Creates an anomaly with a single finding.
    pub fn new(path: Path, severity: Severity, reason: AnomalyReason, detail: Option<String>) -> Self {
        let description = match detail {
            Some(detail) => format!("{}: {detail}", reason.description()),
            None => reason.description().to_string(),
        };
        Self {
            path,
            severity,
            reasons: BTreeSet::from([reason]),
            description,
            observed: Vec::new(),
            expected: None,
            proposed_spec: None,
        }
    }

    /// Adds observed sample values.
    pub fn with_observed<I, S>(mut self, observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observed.extend(observed.into_iter().map(Into::into));
        self
    }

    /// Sets the expected value.
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Sets the proposed spec.
    pub fn with_proposed_spec(mut self, spec: FeatureSpec) -> Self {
        self.proposed_spec = Some(spec);
        self
    }

    /// True when the anomaly was flagged for `reason`.
    pub fn has_reason(&self, reason: AnomalyReason) -> bool {
        self.reasons.contains(&reason)
    }

    /// Folds another finding on the same path into this one, keeping at most
    /// `max_samples` observed values.
    pub(crate) fn merge(&mut self, other: Anomaly, max_samples: usize) {
        self.severity = self.severity.max(other.severity);
        self.reasons.extend(other.reasons);
        if !other.description.is_empty() {
            if !self.description.is_empty() {
                self.description.push_str("; ");
            }
            self.description.push_str(&other.description);
        }
        for value in other.observed {
            if self.observed.len() >= max_samples {
                break;
            }
            if !self.observed.contains(&value) {
                self.observed.push(value);
            }
        }
        // Two expectations would be ambiguous, keep the first.
        if self.expected.is_none() {
            self.expected = other.expected;
        }
        if other.proposed_spec.is_some() {
            self.proposed_spec = other.proposed_spec;
        }
    }
}

/// Result of comparing statistics against a schema.
///
/// Reports are plain data: a report without anomalies means the statistics
/// conform to the schema. Anomalies are never surfaced as errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "ReportDocument", try_from = "ReportDocument")]
pub struct AnomaliesReport {
    anomalies: BTreeMap<Path, Anomaly>,
    data_missing: bool,
    baseline: Option<SchemaDefinition>,
}

impl AnomaliesReport {
    pub(crate) fn new(
        anomalies: BTreeMap<Path, Anomaly>,
        data_missing: bool,
        baseline: SchemaDefinition,
    ) -> Self {
        Self {
            anomalies,
            data_missing,
            baseline: Some(baseline),
        }
    }

    /// True when the statistics contained no examples at all.
    pub fn data_missing(&self) -> bool {
        self.data_missing
    }

    /// The schema the statistics were compared against.
    pub fn baseline(&self) -> Option<&SchemaDefinition> {
        self.baseline.as_ref()
    }

    /// Number of flagged paths.
    pub fn len(&self) -> usize {
        self.anomalies.len()
    }

    /// True when nothing was flagged.
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// The anomaly for `path`.
    pub fn get(&self, path: &Path) -> Option<&Anomaly> {
        self.anomalies.get(path)
    }

    /// Iterates over anomalies in path order.
    pub fn iter(&self) -> impl Iterator<Item = &Anomaly> {
        self.anomalies.values()
    }

    /// Highest severity in the report.
    pub fn max_severity(&self) -> Option<Severity> {
        self.anomalies.values().map(|a| a.severity).max()
    }

    /// True when any anomaly is an error.
    pub fn has_errors(&self) -> bool {
        self.max_severity() == Some(Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Anomaly> {
        self.iter().filter(|a| a.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Anomaly> {
        self.iter().filter(|a| a.severity == Severity::Warning)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReportDocument {
    #[serde(default)]
    anomalies: Vec<Anomaly>,
    #[serde(default)]
    data_missing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    baseline: Option<SchemaDefinition>,
}

impl From<AnomaliesReport> for ReportDocument {
    fn from(report: AnomaliesReport) -> Self {
        Self {
            anomalies: report.anomalies.into_values().collect(),
            data_missing: report.data_missing,
            baseline: report.baseline,
        }
    }
}

impl TryFrom<ReportDocument> for AnomaliesReport {
    type Error = SchemaGuardError;

    fn try_from(document: ReportDocument) -> Result<Self> {
        let mut anomalies = BTreeMap::new();
        for anomaly in document.anomalies {
            let path = anomaly.path.clone();
            if anomalies.insert(path.clone(), anomaly).is_some() {
                return Err(SchemaGuardError::invalid_input(format!(
                    "duplicate anomaly for '{path}'"
                )));
            }
        }
        Ok(Self {
            anomalies,
            data_missing: document.data_missing,
            baseline: document.baseline,
        })
    }
}
