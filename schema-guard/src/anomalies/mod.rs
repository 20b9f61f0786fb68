//! Anomaly detection: comparing statistics against a schema.
//!
//! An [`AnomalyDetector`] walks every path in the schema and the statistics
//! view and reports, per path, a single [`Anomaly`] merging everything found
//! there. Drift against previous or serving statistics is measured through the
//! [`DriftMeasure`] trait, with [`LInfinityDistance`] as the default.

mod detector;
mod drift;
mod types;

pub use detector::AnomalyDetector;
pub use drift::{DriftDistance, DriftMeasure, LInfinityDistance};
pub use types::{AnomaliesReport, Anomaly, AnomalyReason, Severity};
