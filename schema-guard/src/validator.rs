//! Entry points for pipelines: infer, update and validate in one call.
//!
//! These functions pick the weighting mode from the statistics, build the
//! [`StatisticsView`]s and drive [`SchemaDefinition::update`] or an
//! [`AnomalyDetector`]. The `_json` variants accept and return serialized
//! payloads; an empty string stands for an absent optional payload.

use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

use crate::anomalies::{AnomaliesReport, AnomalyDetector};
use crate::config::{InferenceConfig, ValidationConfig};
use crate::error::{Result, SchemaGuardError};
use crate::path::Path;
use crate::schema::SchemaDefinition;
use crate::statistics::{DatasetStatistics, StatisticsView};

/// Paths a validation run is restricted to.
pub type FeaturesNeeded = BTreeSet<Path>;

/// The inference configuration used when none is given.
pub fn default_inference_config() -> InferenceConfig {
    InferenceConfig::default()
}

/// Infers a schema from scratch.
///
/// `max_string_domain_size` is the enum threshold: discrete features with more
/// distinct values get an unconstrained domain.
#[instrument(skip(statistics), fields(features = statistics.features.len()))]
pub fn infer_schema(
    statistics: &DatasetStatistics,
    max_string_domain_size: usize,
) -> Result<SchemaDefinition> {
    let config = InferenceConfig::builder()
        .enum_threshold(max_string_domain_size)
        .build();
    update_schema(&config, &SchemaDefinition::new(), statistics, None, None)
}

/// Evolves `schema` to accept `statistics`.
#[instrument(skip(config, schema, statistics, paths_to_consider))]
pub fn update_schema(
    config: &InferenceConfig,
    schema: &SchemaDefinition,
    statistics: &DatasetStatistics,
    paths_to_consider: Option<&BTreeSet<Path>>,
    environment: Option<&str>,
) -> Result<SchemaDefinition> {
    let weighted = StatisticsView::weighted_statistics_exist(statistics);
    debug!(weighted, "Building statistics view for update");
    let view = StatisticsView::builder(statistics)
        .weighted(weighted)
        .maybe_environment(environment)
        .build()?;
    schema.update(&view, config, paths_to_consider)
}

/// Compares `statistics` against `schema`, optionally checking drift against
/// previous and serving statistics.
///
/// Weighting is detected from `statistics` and applied to the baselines too;
/// a baseline without weights is read through its raw counts. Statistics with
/// no examples short-circuit to a data-missing report before any baseline is
/// looked at.
#[instrument(skip(statistics, schema, previous, serving, features_needed, validation_config))]
pub fn validate_feature_statistics(
    statistics: &DatasetStatistics,
    schema: &SchemaDefinition,
    environment: Option<&str>,
    previous: Option<&DatasetStatistics>,
    serving: Option<&DatasetStatistics>,
    features_needed: Option<&FeaturesNeeded>,
    validation_config: &ValidationConfig,
) -> Result<AnomaliesReport> {
    let config = InferenceConfig::builder()
        .new_features_are_warnings(validation_config.new_features_are_warnings)
        .build();
    let weighted = StatisticsView::weighted_statistics_exist(statistics);

    let primary = StatisticsView::builder(statistics)
        .weighted(weighted)
        .maybe_environment(environment)
        .build()?;
    let view = if primary.examples_count() <= 0.0 {
        debug!("No examples, skipping baselines");
        primary
    } else {
        StatisticsView::new(
            statistics,
            weighted,
            environment.map(str::to_string),
            baseline_view(previous, weighted, environment)?,
            baseline_view(serving, weighted, environment)?,
        )?
    };

    let mut detector = AnomalyDetector::new(schema);
    detector.find_changes(&view, features_needed, &config)?;
    let report = detector.into_report()?;
    info!(
        anomalies = report.len(),
        data_missing = report.data_missing(),
        "Validated feature statistics"
    );
    Ok(report)
}

/// [`infer_schema`] over a JSON statistics payload, returning a JSON schema.
pub fn infer_schema_json(statistics: &str, max_string_domain_size: usize) -> Result<String> {
    let statistics: DatasetStatistics = parse(statistics, "statistics")?;
    let schema = infer_schema(&statistics, max_string_domain_size)?;
    Ok(serde_json::to_string(&schema)?)
}

/// [`update_schema`] over JSON payloads. An empty `environment` means none.
pub fn update_schema_json(
    config: &InferenceConfig,
    schema: &str,
    statistics: &str,
    environment: &str,
) -> Result<String> {
    let schema: SchemaDefinition = parse(schema, "schema")?;
    let statistics: DatasetStatistics = parse(statistics, "statistics")?;
    let updated = update_schema(config, &schema, &statistics, None, non_empty(environment))?;
    Ok(serde_json::to_string(&updated)?)
}

/// [`validate_feature_statistics`] over JSON payloads, with the default
/// validation config and no feature restriction. Empty `environment`,
/// `previous` or `serving` strings mean absent.
pub fn validate_feature_statistics_json(
    statistics: &str,
    schema: &str,
    environment: &str,
    previous: &str,
    serving: &str,
) -> Result<String> {
    let schema: SchemaDefinition = parse(schema, "schema")?;
    let statistics: DatasetStatistics = parse(statistics, "statistics")?;
    let previous: Option<DatasetStatistics> = parse_optional(previous, "previous statistics")?;
    let serving: Option<DatasetStatistics> = parse_optional(serving, "serving statistics")?;

    let report = validate_feature_statistics(
        &statistics,
        &schema,
        non_empty(environment),
        previous.as_ref(),
        serving.as_ref(),
        None,
        &ValidationConfig::default(),
    )?;
    Ok(serde_json::to_string(&report)?)
}

/// Validation as a service boundary, so callers can substitute a fake.
pub trait FeatureStatisticsValidator: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn validate_feature_statistics(
        &self,
        statistics: &DatasetStatistics,
        schema: &SchemaDefinition,
        environment: Option<&str>,
        previous: Option<&DatasetStatistics>,
        serving: Option<&DatasetStatistics>,
        features_needed: Option<&FeaturesNeeded>,
        validation_config: &ValidationConfig,
    ) -> Result<AnomaliesReport>;

    fn update_schema(
        &self,
        config: &InferenceConfig,
        schema: &SchemaDefinition,
        statistics: &DatasetStatistics,
        paths_to_consider: Option<&BTreeSet<Path>>,
        environment: Option<&str>,
    ) -> Result<SchemaDefinition>;
}

/// Delegates to the free functions in this module.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFeatureStatisticsValidator;

impl FeatureStatisticsValidator for DefaultFeatureStatisticsValidator {
    fn validate_feature_statistics(
        &self,
        statistics: &DatasetStatistics,
        schema: &SchemaDefinition,
        environment: Option<&str>,
        previous: Option<&DatasetStatistics>,
        serving: Option<&DatasetStatistics>,
        features_needed: Option<&FeaturesNeeded>,
        validation_config: &ValidationConfig,
    ) -> Result<AnomaliesReport> {
        validate_feature_statistics(
            statistics,
            schema,
            environment,
            previous,
            serving,
            features_needed,
            validation_config,
        )
    }

    fn update_schema(
        &self,
        config: &InferenceConfig,
        schema: &SchemaDefinition,
        statistics: &DatasetStatistics,
        paths_to_consider: Option<&BTreeSet<Path>>,
        environment: Option<&str>,
    ) -> Result<SchemaDefinition> {
        update_schema(config, schema, statistics, paths_to_consider, environment)
    }
}

fn baseline_view<'a>(
    snapshot: Option<&'a DatasetStatistics>,
    weighted: bool,
    environment: Option<&str>,
) -> Result<Option<StatisticsView<'a>>> {
    snapshot
        .map(|snapshot| {
            StatisticsView::builder(snapshot)
                .weighted(weighted)
                .maybe_environment(environment)
                .build()
        })
        .transpose()
}

fn parse<T: DeserializeOwned>(payload: &str, kind: &str) -> Result<T> {
    serde_json::from_str(payload).map_err(|e| SchemaGuardError::input_parse(kind, e.to_string()))
}

fn parse_optional<T: DeserializeOwned>(payload: &str, kind: &str) -> Result<Option<T>> {
    if payload.is_empty() {
        Ok(None)
    } else {
        parse(payload, kind).map(Some)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}
