//! Schema inference and evolution from observed statistics.
//!
//! New features get a spec inferred from their statistics. Existing features
//! only ever widen: enumerations grow until they cross the enum threshold and
//! are then permanently unconstrained, ranges stretch to cover observed values,
//! required features relax to optional when missing values appear, and integer
//! features promote to float when floats are observed.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::InferenceConfig;
use crate::error::{Result, SchemaGuardError};
use crate::path::Path;
use crate::schema::definition::{ensure_transition, SchemaDefinition};
use crate::schema::types::{Domain, FeatureSpec, FeatureType, Presence, ValueCount};
use crate::statistics::{FeatureView, StatisticsView, ValueType};

impl SchemaDefinition {
    /// Infers or evolves feature specs from `view` and returns the new schema.
    ///
    /// Visits `path_subset` when given (paths the view does not carry are
    /// ignored), otherwise every path in the view. With an environment tag on
    /// the view, existing specs that do not apply in that environment are left
    /// untouched. `self` is never modified.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaGuardError::InvalidInput`] when observed values cannot
    /// be reconciled with an existing spec, e.g. strings observed for a
    /// feature with a numeric range domain.
    ///
    /// # Example
    ///
    /// ```rust
    /// use schema_guard::prelude::*;
    ///
    /// let stats = DatasetStatistics::new(100).with_feature(
    ///     FeatureStatistics::builder("color", ValueType::String)
    ///         .present(100)
    ///         .value("red", 50)
    ///         .value("green", 30)
    ///         .value("blue", 20)
    ///         .build(),
    /// );
    /// let view = StatisticsView::builder(&stats).build()?;
    /// let schema = SchemaDefinition::new().update(&view, &InferenceConfig::default(), None)?;
    ///
    /// let color = schema.feature(&Path::from("color")).unwrap();
    /// assert_eq!(color.domain, Domain::enumerated(["red", "green", "blue"]));
    /// assert!(color.is_required());
    /// # Ok::<(), SchemaGuardError>(())
    /// ```
    #[instrument(skip_all, fields(features = self.len(), environment = ?view.environment()))]
    pub fn update(
        &self,
        view: &StatisticsView<'_>,
        config: &InferenceConfig,
        path_subset: Option<&BTreeSet<Path>>,
    ) -> Result<SchemaDefinition> {
        let mut features = self.features.clone();
        let mut added = 0usize;
        let mut widened = 0usize;

        let visited: Vec<&Path> = match path_subset {
            Some(subset) => subset.iter().filter(|p| view.contains(p)).collect(),
            None => view.paths().collect(),
        };

        for path in visited {
            let Some(feature) = view.get_feature(path) else {
                continue;
            };

            match features.get(path) {
                None => {
                    let spec = infer_feature_spec(&feature, config);
                    debug!(
                        path = %path,
                        feature_type = %spec.feature_type,
                        domain = spec.domain.kind_name(),
                        "Inferred new feature spec"
                    );
                    features.insert(path.clone(), Arc::new(spec));
                    added += 1;
                }
                Some(existing) => {
                    if !self.admits(existing, view.environment()) {
                        debug!(path = %path, "Spec does not apply in this environment, skipping");
                        continue;
                    }
                    if let Some(spec) = widen_feature_spec(existing, &feature, config)? {
                        ensure_transition(path, existing, &spec)?;
                        debug!(
                            path = %path,
                            domain = spec.domain.kind_name(),
                            "Widened feature spec"
                        );
                        features.insert(path.clone(), Arc::new(spec));
                        widened += 1;
                    }
                }
            }
        }

        info!(added, widened, total = features.len(), "Schema update complete");

        Ok(SchemaDefinition {
            features,
            default_environments: self.default_environments.clone(),
        })
    }
}

/// Infers a spec for a feature the schema has never seen.
pub(crate) fn infer_feature_spec(feature: &FeatureView<'_>, config: &InferenceConfig) -> FeatureSpec {
    let presence = if feature.num_missing() <= 0.0 && feature.num_present() > 0.0 {
        Presence::Required
    } else {
        Presence::Optional
    };

    let shape = feature.shape().and_then(|shape| {
        if shape.min_num_values == 1 && shape.max_num_values == 1 {
            Some(ValueCount::single())
        } else if shape.min_num_values >= 1 {
            Some(ValueCount::at_least(1))
        } else {
            None
        }
    });

    FeatureSpec {
        presence,
        shape,
        domain: infer_domain(feature, config),
        ..FeatureSpec::new(FeatureType::from_value_type(feature.value_type()))
    }
}

fn infer_domain(feature: &FeatureView<'_>, config: &InferenceConfig) -> Domain {
    if feature.value_type() == ValueType::Struct {
        return Domain::Unconstrained;
    }
    match feature.histogram() {
        Some(histogram)
            if !histogram.buckets.is_empty()
                && histogram.is_complete()
                && histogram.distinct_count() <= config.enum_threshold as u64 =>
        {
            Domain::Enumerated {
                values: values_by_frequency(feature),
            }
        }
        _ => Domain::Unconstrained,
    }
}

/// Distinct observed values, most frequent first. Ties keep producer order.
fn values_by_frequency(feature: &FeatureView<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut frequencies: Vec<(&str, f64)> = feature
        .frequencies()
        .into_iter()
        .filter(|(value, _)| seen.insert(*value))
        .collect();
    frequencies.sort_by(|a, b| b.1.total_cmp(&a.1));
    frequencies
        .into_iter()
        .map(|(value, _)| value.to_string())
        .collect()
}

/// Widens `spec` to accept what `feature` shows. Returns `None` when the spec
/// already accepts the observation.
pub(crate) fn widen_feature_spec(
    spec: &FeatureSpec,
    feature: &FeatureView<'_>,
    config: &InferenceConfig,
) -> Result<Option<FeatureSpec>> {
    let mut next = spec.clone();
    let path = feature.path();
    let observed = feature.value_type();

    if !spec.feature_type.accepts(observed) {
        next.feature_type = promote_type(path, spec, observed)?;
    }

    match &spec.domain {
        Domain::Enumerated { values } => {
            if let Some(histogram) = feature.histogram() {
                let mut merged = values.clone();
                let mut known: HashSet<String> = values.iter().cloned().collect();
                for value in values_by_frequency(feature) {
                    if known.insert(value.clone()) {
                        merged.push(value);
                    }
                }
                let threshold = config.enum_threshold;
                if merged.len() > threshold || histogram.distinct_count() > threshold as u64 {
                    debug!(
                        path = %path,
                        distinct = merged.len(),
                        threshold,
                        "Enumeration exceeds threshold, promoting to unconstrained"
                    );
                    next.domain = Domain::Unconstrained;
                } else {
                    next.domain = Domain::Enumerated { values: merged };
                }
            }
        }
        Domain::NumericRange { min, max } => {
            if let Some(numeric) = feature.numeric() {
                next.domain = Domain::NumericRange {
                    min: min.min(numeric.min),
                    max: max.max(numeric.max),
                };
            }
        }
        Domain::FreeForm | Domain::Unconstrained => {}
    }

    if spec.presence == Presence::Required && feature.num_missing() > 0.0 {
        next.presence = Presence::Optional;
    }
    if let (Some(min_fraction), Some(observed)) = (spec.min_fraction, feature.fraction_present()) {
        if observed < min_fraction {
            next.min_fraction = Some(observed);
        }
    }

    if let (Some(expected), Some(shape)) = (spec.shape, feature.shape()) {
        next.shape = Some(ValueCount {
            min: expected.min.min(shape.min_num_values),
            max: expected.max.map(|max| max.max(shape.max_num_values)),
        });
    }

    Ok(if next == *spec { None } else { Some(next) })
}

/// Promotes a declared type along int -> float -> bytes so that it accepts
/// `observed`, or fails when no widening exists.
fn promote_type(path: &Path, spec: &FeatureSpec, observed: ValueType) -> Result<FeatureType> {
    let numeric_range = matches!(spec.domain, Domain::NumericRange { .. });
    match (spec.feature_type, observed) {
        (FeatureType::Int, ValueType::Float) => Ok(FeatureType::Float),
        (FeatureType::Int | FeatureType::Float, ValueType::String | ValueType::Bytes)
            if !numeric_range =>
        {
            Ok(FeatureType::Bytes)
        }
        (declared, observed) => Err(SchemaGuardError::invalid_input(format!(
            "'{path}': observed {observed} values cannot be reconciled with a {declared} feature \
             with a {} domain",
            spec.domain.kind_name()
        ))),
    }
}
