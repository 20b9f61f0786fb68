//! Prelude for commonly used types and traits in schema-guard.

pub use crate::anomalies::{
    AnomaliesReport, Anomaly, AnomalyDetector, AnomalyReason, DriftMeasure, Severity,
};
pub use crate::config::{InferenceConfig, ValidationConfig};
pub use crate::error::{Result, SchemaGuardError};
pub use crate::path::Path;
pub use crate::schema::{Domain, FeatureSpec, FeatureType, Presence, SchemaDefinition};
pub use crate::statistics::{DatasetStatistics, FeatureStatistics, StatisticsView, ValueType};
pub use crate::validator::{FeatureStatisticsValidator, FeaturesNeeded};
