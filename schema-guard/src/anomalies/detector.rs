//! The diff engine comparing a statistics view against a schema.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::anomalies::drift::{DriftMeasure, LInfinityDistance};
use crate::anomalies::types::{AnomaliesReport, Anomaly, AnomalyReason, Severity};
use crate::config::InferenceConfig;
use crate::error::{Result, SchemaGuardError};
use crate::logging::truncate_field;
use crate::path::Path;
use crate::schema::{infer_feature_spec, widen_feature_spec, Domain, FeatureSpec, SchemaDefinition};
use crate::statistics::{FeatureView, StatisticsView};

/// Longest sample value copied into a report.
const MAX_SAMPLE_LENGTH: usize = 128;

/// Compares one statistics view against a schema and collects anomalies.
///
/// A detector is single-use: call [`find_changes`](Self::find_changes) once,
/// then read the result with [`schema_diff`](Self::schema_diff) or
/// [`into_report`](Self::into_report).
///
/// # Example
///
/// ```rust
/// use schema_guard::prelude::*;
///
/// let schema = SchemaDefinition::from_features([(
///     Path::from("age"),
///     FeatureSpec::new(FeatureType::Int).with_domain(Domain::range(0.0, 120.0)),
/// )])?;
/// let stats = DatasetStatistics::new(1000).with_feature(
///     FeatureStatistics::builder("age", ValueType::Int)
///         .present(1000)
///         .numeric_range(0.0, 150.0)
///         .build(),
/// );
/// let view = StatisticsView::builder(&stats).build()?;
///
/// let mut detector = AnomalyDetector::new(&schema);
/// detector.find_changes(&view, None, &InferenceConfig::default())?;
/// let report = detector.schema_diff()?;
///
/// let age = report.get(&Path::from("age")).unwrap();
/// assert!(age.has_reason(AnomalyReason::OutOfRangeValues));
/// assert_eq!(age.observed, vec!["150"]);
/// # Ok::<(), SchemaGuardError>(())
/// ```
pub struct AnomalyDetector {
    schema: SchemaDefinition,
    drift: Box<dyn DriftMeasure>,
    used: bool,
    report: Option<AnomaliesReport>,
}

impl fmt::Debug for AnomalyDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnomalyDetector")
            .field("features", &self.schema.len())
            .field("drift", &self.drift.name())
            .field("used", &self.used)
            .finish()
    }
}

impl AnomalyDetector {
    /// Creates a detector for `schema`, measuring drift with
    /// [`LInfinityDistance`].
    pub fn new(schema: &SchemaDefinition) -> Self {
        Self {
            schema: schema.clone(),
            drift: Box::new(LInfinityDistance),
            used: false,
            report: None,
        }
    }

    /// Replaces the drift measure.
    pub fn with_drift_measure(mut self, drift: Box<dyn DriftMeasure>) -> Self {
        self.drift = drift;
        self
    }

    /// Compares `view` against the schema.
    ///
    /// Visits every path in the schema or the view, restricted to
    /// `feature_subset` when given.
    ///
    /// # Errors
    ///
    /// - [`SchemaGuardError::InvalidState`] when the detector was already used.
    /// - [`SchemaGuardError::InvalidInput`] when a feature carries non-finite
    ///   or inverted numeric statistics.
    #[instrument(skip_all, fields(
        features = self.schema.len(),
        environment = ?view.environment(),
        drift = self.drift.name()
    ))]
    pub fn find_changes(
        &mut self,
        view: &StatisticsView<'_>,
        feature_subset: Option<&BTreeSet<Path>>,
        config: &InferenceConfig,
    ) -> Result<()> {
        if self.used {
            return Err(SchemaGuardError::invalid_state(
                "find_changes has already been called on this detector",
            ));
        }
        self.used = true;

        if view.examples_count() <= 0.0 {
            warn!("Statistics contain no examples, reporting data as missing");
            self.report = Some(AnomaliesReport::new(
                BTreeMap::new(),
                true,
                self.schema.clone(),
            ));
            return Ok(());
        }

        let mut paths: BTreeSet<&Path> = BTreeSet::new();
        for path in self.schema.paths() {
            paths.insert(path);
        }
        for path in view.paths() {
            paths.insert(path);
        }
        if let Some(subset) = feature_subset {
            paths.retain(|path| subset.contains(*path));
        }

        let mut anomalies = BTreeMap::new();
        for path in paths {
            let feature = view.get_feature(path);
            let anomaly = match (self.schema.feature(path), feature) {
                (None, Some(feature)) => {
                    check_numeric_statistics(&feature)?;
                    Some(new_feature(&feature, config))
                }
                (Some(spec), feature) => {
                    if !self.schema.admits(spec, view.environment()) {
                        debug!(path = %path, "Spec does not apply in this environment, skipping");
                        continue;
                    }
                    if let Some(feature) = &feature {
                        check_numeric_statistics(feature)?;
                    }
                    match feature {
                        Some(feature) if feature.num_present() > 0.0 => {
                            self.check_feature(spec, &feature, config)
                        }
                        _ => missing_feature(path, spec),
                    }
                }
                (None, None) => None,
            };

            if let Some(anomaly) = anomaly {
                debug!(
                    path = %path,
                    severity = %anomaly.severity,
                    description = %anomaly.description,
                    "Anomaly detected"
                );
                anomalies.insert(path.clone(), anomaly);
            }
        }

        let report = AnomaliesReport::new(anomalies, false, self.schema.clone());
        info!(
            anomalies = report.len(),
            errors = report.errors().count(),
            warnings = report.warnings().count(),
            "Anomaly detection complete"
        );
        self.report = Some(report);
        Ok(())
    }

    /// The report produced by [`find_changes`](Self::find_changes).
    pub fn schema_diff(&self) -> Result<&AnomaliesReport> {
        self.report.as_ref().ok_or_else(|| {
            SchemaGuardError::invalid_state("schema_diff called before find_changes succeeded")
        })
    }

    /// Consumes the detector and returns its report.
    pub fn into_report(self) -> Result<AnomaliesReport> {
        self.report.ok_or_else(|| {
            SchemaGuardError::invalid_state("into_report called before find_changes succeeded")
        })
    }

    fn check_feature(
        &self,
        spec: &FeatureSpec,
        feature: &FeatureView<'_>,
        config: &InferenceConfig,
    ) -> Option<Anomaly> {
        let path = feature.path();
        let mut findings = Vec::new();

        if spec.is_required() && feature.num_missing() > 0.0 {
            findings.push(
                Anomaly::new(
                    path.clone(),
                    Severity::Error,
                    AnomalyReason::LowFractionPresent,
                    Some(format!("missing in {} examples", feature.num_missing())),
                )
                .with_expected("required"),
            );
        }
        if let (Some(min_fraction), Some(fraction)) = (spec.min_fraction, feature.fraction_present()) {
            if fraction < min_fraction {
                findings.push(
                    Anomaly::new(
                        path.clone(),
                        Severity::Error,
                        AnomalyReason::LowFractionPresent,
                        Some(format!("present in {fraction:.4} of examples")),
                    )
                    .with_expected(format!("at least {min_fraction}")),
                );
            }
        }

        if let (Some(expected), Some(shape)) = (spec.shape, feature.shape()) {
            let too_few = shape.min_num_values < expected.min;
            let too_many = expected.max.map_or(false, |max| shape.max_num_values > max);
            if too_few || too_many {
                let expected = match expected.max {
                    Some(max) => format!("[{}, {max}] values per example", expected.min),
                    None => format!("at least {} values per example", expected.min),
                };
                findings.push(
                    Anomaly::new(
                        path.clone(),
                        Severity::Error,
                        AnomalyReason::ShapeMismatch,
                        Some(format!(
                            "observed [{}, {}]",
                            shape.min_num_values, shape.max_num_values
                        )),
                    )
                    .with_expected(expected),
                );
            }
        }

        if !spec.feature_type.accepts(feature.value_type()) {
            findings.push(
                Anomaly::new(
                    path.clone(),
                    Severity::Error,
                    AnomalyReason::TypeMismatch,
                    Some(format!("observed {}", feature.value_type())),
                )
                .with_expected(spec.feature_type.as_str()),
            );
        } else {
            findings.extend(check_domain(spec, feature, config));
            findings.extend(self.check_drift(spec, feature));
        }

        let mut findings = findings.into_iter();
        let mut anomaly = findings.next()?;
        for finding in findings {
            anomaly.merge(finding, config.max_samples);
        }
        if let Ok(Some(proposed)) = widen_feature_spec(spec, feature, config) {
            anomaly = anomaly.with_proposed_spec(proposed);
        }
        Some(anomaly)
    }

    fn check_drift(&self, spec: &FeatureSpec, feature: &FeatureView<'_>) -> Option<Anomaly> {
        let (kind, worst) = feature
            .baselines()
            .filter_map(|(kind, baseline)| {
                self.drift
                    .distance(feature, &baseline)
                    .map(|distance| (kind, distance))
            })
            .max_by(|a, b| a.1.distance.total_cmp(&b.1.distance))?;

        debug!(
            path = %feature.path(),
            baseline = %kind,
            distance = worst.distance,
            threshold = spec.drift_threshold,
            "Measured drift"
        );
        if worst.distance <= spec.drift_threshold {
            return None;
        }
        Some(
            Anomaly::new(
                feature.path().clone(),
                Severity::Error,
                AnomalyReason::DistributionDrift,
                Some(format!(
                    "{} distance {:.4} to {kind} statistics",
                    self.drift.name(),
                    worst.distance
                )),
            )
            .with_observed(
                worst
                    .value
                    .map(|value| truncate_field(&value, MAX_SAMPLE_LENGTH)),
            )
            .with_expected(format!("at most {}", spec.drift_threshold)),
        )
    }
}

fn new_feature(feature: &FeatureView<'_>, config: &InferenceConfig) -> Anomaly {
    let spec = infer_feature_spec(feature, config);
    let severity = if config.new_features_are_warnings {
        Severity::Warning
    } else {
        Severity::Error
    };
    Anomaly::new(
        feature.path().clone(),
        severity,
        AnomalyReason::NewFeature,
        Some(format!(
            "{} feature with {} domain",
            spec.feature_type,
            spec.domain.kind_name()
        )),
    )
    .with_proposed_spec(spec)
}

fn missing_feature(path: &Path, spec: &FeatureSpec) -> Option<Anomaly> {
    if !spec.is_required() {
        return None;
    }
    Some(
        Anomaly::new(path.clone(), Severity::Error, AnomalyReason::FeatureMissing, None)
            .with_expected("required")
            .with_proposed_spec(spec.clone().optional()),
    )
}

fn check_domain(
    spec: &FeatureSpec,
    feature: &FeatureView<'_>,
    config: &InferenceConfig,
) -> Option<Anomaly> {
    match &spec.domain {
        Domain::Enumerated { values } => {
            let mut unexpected: Vec<&str> = Vec::new();
            for (value, _) in feature.frequencies() {
                if !values.iter().any(|v| v == value) && !unexpected.contains(&value) {
                    unexpected.push(value);
                }
            }
            if unexpected.is_empty() {
                return None;
            }
            let sample: Vec<String> = unexpected
                .iter()
                .take(config.max_samples)
                .map(|value| truncate_field(value, MAX_SAMPLE_LENGTH))
                .collect();
            let mut detail = sample
                .iter()
                .map(|value| format!("'{value}'"))
                .collect::<Vec<_>>()
                .join(", ");
            if unexpected.len() > sample.len() {
                detail.push_str(&format!(" and {} more", unexpected.len() - sample.len()));
            }
            Some(
                Anomaly::new(
                    feature.path().clone(),
                    Severity::Error,
                    AnomalyReason::UnexpectedValues,
                    Some(detail),
                )
                .with_observed(sample),
            )
        }
        Domain::NumericRange { min, max } => {
            let numeric = feature.numeric()?;
            let mut offending = Vec::new();
            if numeric.min < *min {
                offending.push(numeric.min.to_string());
            }
            if numeric.max > *max {
                offending.push(numeric.max.to_string());
            }
            if offending.is_empty() {
                return None;
            }
            Some(
                Anomaly::new(
                    feature.path().clone(),
                    Severity::Error,
                    AnomalyReason::OutOfRangeValues,
                    Some(format!("observed [{}, {}]", numeric.min, numeric.max)),
                )
                .with_observed(offending)
                .with_expected(format!("[{min}, {max}]")),
            )
        }
        Domain::FreeForm | Domain::Unconstrained => None,
    }
}

fn check_numeric_statistics(feature: &FeatureView<'_>) -> Result<()> {
    match feature.numeric() {
        Some(numeric)
            if !numeric.min.is_finite() || !numeric.max.is_finite() || numeric.min > numeric.max =>
        {
            Err(SchemaGuardError::invalid_input(format!(
                "'{}': malformed numeric statistics (min {}, max {})",
                feature.path(),
                numeric.min,
                numeric.max
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FeatureType, ValueCount};
    use crate::statistics::{DatasetStatistics, FeatureStatistics, ValueType};

    fn detect(
        schema: &SchemaDefinition,
        view: &StatisticsView<'_>,
        config: &InferenceConfig,
    ) -> AnomaliesReport {
        let mut detector = AnomalyDetector::new(schema);
        detector.find_changes(view, None, config).unwrap();
        detector.into_report().unwrap()
    }

    fn age_schema() -> SchemaDefinition {
        SchemaDefinition::from_features([(
            Path::from("age"),
            FeatureSpec::new(FeatureType::Int)
                .required()
                .with_domain(Domain::range(0.0, 120.0)),
        )])
        .unwrap()
    }

    fn age_stats(min: f64, max: f64) -> DatasetStatistics {
        DatasetStatistics::new(1000).with_feature(
            FeatureStatistics::builder("age", ValueType::Int)
                .present(1000)
                .numeric_range(min, max)
                .build(),
        )
    }

    #[test]
    fn test_out_of_range_values() {
        let stats = age_stats(0.0, 150.0);
        let view = StatisticsView::builder(&stats).build().unwrap();
        let report = detect(&age_schema(), &view, &InferenceConfig::default());

        assert_eq!(report.len(), 1);
        let age = report.get(&Path::from("age")).unwrap();
        assert_eq!(age.severity, Severity::Error);
        assert_eq!(
            age.reasons,
            BTreeSet::from([AnomalyReason::OutOfRangeValues])
        );
        assert!(age.description.contains("out-of-range values observed"));
        assert_eq!(age.observed, vec!["150"]);
        assert_eq!(age.expected.as_deref(), Some("[0, 120]"));
        assert_eq!(
            age.proposed_spec.as_ref().unwrap().domain,
            Domain::range(0.0, 150.0)
        );
        assert_eq!(report.baseline(), Some(&age_schema()));
    }

    #[test]
    fn test_conforming_statistics_yield_empty_report() {
        let stats = age_stats(3.0, 99.0);
        let view = StatisticsView::builder(&stats).build().unwrap();
        let report = detect(&age_schema(), &view, &InferenceConfig::default());
        assert!(report.is_empty());
        assert!(!report.data_missing());
    }

    #[test]
    fn test_zero_examples_reports_data_missing() {
        let stats = DatasetStatistics::new(0);
        let view = StatisticsView::builder(&stats).build().unwrap();
        let report = detect(&age_schema(), &view, &InferenceConfig::default());
        assert!(report.data_missing());
        assert!(report.is_empty());
        assert_eq!(report.baseline(), Some(&age_schema()));
    }

    #[test]
    fn test_detector_is_single_use() {
        let stats = age_stats(0.0, 10.0);
        let view = StatisticsView::builder(&stats).build().unwrap();
        let mut detector = AnomalyDetector::new(&age_schema());

        assert!(matches!(
            detector.schema_diff(),
            Err(SchemaGuardError::InvalidState(_))
        ));
        detector
            .find_changes(&view, None, &InferenceConfig::default())
            .unwrap();
        assert!(matches!(
            detector.find_changes(&view, None, &InferenceConfig::default()),
            Err(SchemaGuardError::InvalidState(_))
        ));
        assert!(detector.schema_diff().is_ok());
    }

    #[test]
    fn test_missing_required_feature() {
        let stats = DatasetStatistics::new(10).with_feature(
            FeatureStatistics::builder("other", ValueType::Int)
                .present(10)
                .build(),
        );
        let view = StatisticsView::builder(&stats).build().unwrap();
        let subset = BTreeSet::from([Path::from("age")]);

        let mut detector = AnomalyDetector::new(&age_schema());
        detector
            .find_changes(&view, Some(&subset), &InferenceConfig::default())
            .unwrap();
        let report = detector.schema_diff().unwrap();

        assert_eq!(report.len(), 1);
        let age = report.get(&Path::from("age")).unwrap();
        assert!(age.has_reason(AnomalyReason::FeatureMissing));
        assert!(!age.proposed_spec.as_ref().unwrap().is_required());
    }

    #[test]
    fn test_environment_excluded_spec_is_skipped() {
        let schema = SchemaDefinition::from_features([(
            Path::from("label"),
            FeatureSpec::new(FeatureType::Int)
                .required()
                .not_in_environment("SERVING"),
        )])
        .unwrap();
        let stats = DatasetStatistics::new(10);
        let stats = stats.with_feature(
            FeatureStatistics::builder("other", ValueType::Int)
                .present(10)
                .build(),
        );
        let subset = BTreeSet::from([Path::from("label")]);

        let serving = StatisticsView::builder(&stats)
            .environment("SERVING")
            .build()
            .unwrap();
        let mut detector = AnomalyDetector::new(&schema);
        detector
            .find_changes(&serving, Some(&subset), &InferenceConfig::default())
            .unwrap();
        assert!(detector.schema_diff().unwrap().is_empty());

        let training = StatisticsView::builder(&stats)
            .environment("TRAINING")
            .build()
            .unwrap();
        let mut detector = AnomalyDetector::new(&schema);
        detector
            .find_changes(&training, Some(&subset), &InferenceConfig::default())
            .unwrap();
        assert!(detector
            .schema_diff()
            .unwrap()
            .get(&Path::from("label"))
            .unwrap()
            .has_reason(AnomalyReason::FeatureMissing));
    }

    #[test]
    fn test_new_feature_severity_follows_config() {
        let stats = age_stats(1.0, 2.0).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(1000)
                .value("red", 1000)
                .build(),
        );
        let view = StatisticsView::builder(&stats).build().unwrap();

        let strict = detect(&age_schema(), &view, &InferenceConfig::default());
        let lenient = detect(
            &age_schema(),
            &view,
            &InferenceConfig::builder().new_features_are_warnings(true).build(),
        );

        let color = Path::from("color");
        assert_eq!(strict.get(&color).unwrap().severity, Severity::Error);
        assert_eq!(lenient.get(&color).unwrap().severity, Severity::Warning);
        assert_eq!(
            strict.get(&color).unwrap().proposed_spec.as_ref().unwrap().domain,
            Domain::enumerated(["red"])
        );
    }

    #[test]
    fn test_unexpected_values_are_sampled() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes).with_domain(Domain::enumerated(["red"])),
        )])
        .unwrap();
        let mut builder = FeatureStatistics::builder("color", ValueType::String).present(100);
        for i in 0..5 {
            builder = builder.value(format!("shade-{i}"), 10);
        }
        let stats = DatasetStatistics::new(100).with_feature(builder.value("red", 50).build());
        let view = StatisticsView::builder(&stats).build().unwrap();

        let config = InferenceConfig::builder().max_samples(2).build();
        let report = detect(&schema, &view, &config);
        let color = report.get(&Path::from("color")).unwrap();
        assert!(color.has_reason(AnomalyReason::UnexpectedValues));
        assert_eq!(color.observed, vec!["shade-0", "shade-1"]);
        assert!(color.description.ends_with("and 3 more"));
    }

    #[test]
    fn test_findings_merge_into_one_anomaly() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes)
                .required()
                .with_shape(ValueCount::single())
                .with_domain(Domain::enumerated(["red"])),
        )])
        .unwrap();
        let stats = DatasetStatistics::new(100).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(90)
                .missing(10)
                .shape(1, 3)
                .value("blue", 90)
                .build(),
        );
        let view = StatisticsView::builder(&stats).build().unwrap();
        let report = detect(&schema, &view, &InferenceConfig::default());

        assert_eq!(report.len(), 1);
        let color = report.get(&Path::from("color")).unwrap();
        assert_eq!(
            color.reasons,
            BTreeSet::from([
                AnomalyReason::LowFractionPresent,
                AnomalyReason::UnexpectedValues,
                AnomalyReason::ShapeMismatch,
            ])
        );
        assert_eq!(color.description.matches("; ").count(), 2);
        let proposed = color.proposed_spec.as_ref().unwrap();
        assert!(!proposed.is_required());
        assert_eq!(proposed.domain, Domain::enumerated(["red", "blue"]));
    }

    #[test]
    fn test_type_mismatch_skips_domain_checks() {
        let stats = DatasetStatistics::new(10).with_feature(
            FeatureStatistics::builder("age", ValueType::String)
                .present(10)
                .value("old", 10)
                .build(),
        );
        let view = StatisticsView::builder(&stats).build().unwrap();
        let report = detect(&age_schema(), &view, &InferenceConfig::default());

        let age = report.get(&Path::from("age")).unwrap();
        assert_eq!(age.reasons, BTreeSet::from([AnomalyReason::TypeMismatch]));
        assert_eq!(age.expected.as_deref(), Some("int"));
        assert!(age.proposed_spec.is_none());
    }

    #[test]
    fn test_drift_against_previous() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes).with_drift_threshold(0.1),
        )])
        .unwrap();
        let current = DatasetStatistics::new(100).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(100)
                .value("red", 90)
                .value("blue", 10)
                .build(),
        );
        let previous = DatasetStatistics::new(100).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(100)
                .value("red", 50)
                .value("blue", 50)
                .build(),
        );
        let view = StatisticsView::builder(&current)
            .previous(StatisticsView::builder(&previous).build().unwrap())
            .build()
            .unwrap();

        let report = detect(&schema, &view, &InferenceConfig::default());
        let color = report.get(&Path::from("color")).unwrap();
        assert!(color.has_reason(AnomalyReason::DistributionDrift));
        assert!(color.description.contains("previous"));

        let relaxed = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes),
        )])
        .unwrap();
        assert!(detect(&relaxed, &view, &InferenceConfig::default()).is_empty());
    }

    #[test]
    fn test_malformed_numeric_statistics() {
        let stats = age_stats(10.0, 1.0);
        let view = StatisticsView::builder(&stats).build().unwrap();
        let mut detector = AnomalyDetector::new(&age_schema());
        let err = detector
            .find_changes(&view, None, &InferenceConfig::default())
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_malformed_numeric_statistics_ignored_outside_environment() {
        let schema = SchemaDefinition::from_features([(
            Path::from("age"),
            FeatureSpec::new(FeatureType::Int).not_in_environment("SERVING"),
        )])
        .unwrap();
        let stats = age_stats(10.0, 1.0);
        let view = StatisticsView::builder(&stats)
            .environment("SERVING")
            .build()
            .unwrap();
        assert!(detect(&schema, &view, &InferenceConfig::default()).is_empty());
    }

    fn weighted_colors(buckets: &[(&str, u64, f64)]) -> DatasetStatistics {
        let mut builder = FeatureStatistics::builder("color", ValueType::String).present(100);
        for (value, count, weight) in buckets {
            builder = builder.weighted_value(*value, *count, *weight);
        }
        DatasetStatistics::new(100)
            .with_weighted_examples(50.0)
            .with_feature(builder.build())
    }

    #[test]
    fn test_weighted_presence_without_weighted_counts() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes).required(),
        )])
        .unwrap();
        let stats = weighted_colors(&[("red", 100, 50.0)]);
        let view = StatisticsView::builder(&stats)
            .weighted(true)
            .build()
            .unwrap();
        assert!(detect(&schema, &view, &InferenceConfig::default()).is_empty());
    }

    #[test]
    fn test_weighted_presence_uses_weighted_missing() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes).required(),
        )])
        .unwrap();
        let stats = DatasetStatistics::new(100)
            .with_weighted_examples(50.0)
            .with_feature(
                FeatureStatistics::builder("color", ValueType::String)
                    .present(100)
                    .weighted_presence(45.0, 5.0)
                    .weighted_value("red", 100, 45.0)
                    .build(),
            );
        let view = StatisticsView::builder(&stats)
            .weighted(true)
            .build()
            .unwrap();
        let report = detect(&schema, &view, &InferenceConfig::default());
        let color = report.get(&Path::from("color")).unwrap();
        assert_eq!(
            color.reasons,
            BTreeSet::from([AnomalyReason::LowFractionPresent])
        );
        assert!(color.description.contains("missing in 5 examples"));
    }

    #[test]
    fn test_weighted_enumerated_domain() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes).with_domain(Domain::enumerated(["red"])),
        )])
        .unwrap();
        let stats = weighted_colors(&[("red", 60, 40.0), ("blue", 40, 10.0)]);
        let view = StatisticsView::builder(&stats)
            .weighted(true)
            .build()
            .unwrap();
        let report = detect(&schema, &view, &InferenceConfig::default());
        let color = report.get(&Path::from("color")).unwrap();
        assert!(color.has_reason(AnomalyReason::UnexpectedValues));
        assert_eq!(color.observed, vec!["blue"]);
        assert_eq!(
            color.proposed_spec.as_ref().unwrap().domain,
            Domain::enumerated(["red", "blue"])
        );
    }

    #[test]
    fn test_weighted_drift_against_unweighted_previous() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes).with_drift_threshold(0.1),
        )])
        .unwrap();
        let current = weighted_colors(&[("red", 50, 45.0), ("blue", 50, 5.0)]);
        let previous = DatasetStatistics::new(100).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(100)
                .value("red", 50)
                .value("blue", 50)
                .build(),
        );

        let weighted = StatisticsView::builder(&current)
            .weighted(true)
            .previous(
                StatisticsView::builder(&previous)
                    .weighted(true)
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let report = detect(&schema, &weighted, &InferenceConfig::default());
        let color = report.get(&Path::from("color")).unwrap();
        assert_eq!(
            color.reasons,
            BTreeSet::from([AnomalyReason::DistributionDrift])
        );
        assert!(color.description.contains("previous"));

        // The raw bucket counts match the baseline exactly.
        let unweighted = StatisticsView::builder(&current)
            .previous(StatisticsView::builder(&previous).build().unwrap())
            .build()
            .unwrap();
        assert!(detect(&schema, &unweighted, &InferenceConfig::default()).is_empty());
    }
}
