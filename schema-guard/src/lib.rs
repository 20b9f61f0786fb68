//! # schema-guard
//!
//! Schema inference and anomaly detection over pre-aggregated dataset
//! statistics, in the style of TensorFlow Data Validation.
//!
//! A pipeline computes [`DatasetStatistics`](statistics::DatasetStatistics)
//! for each run: per-feature presence counts, value histograms and numeric
//! ranges. schema-guard turns those into a [`SchemaDefinition`] describing
//! what the data should look like, evolves that schema as new data arrives,
//! and reports where a new run breaks it.
//!
//! ## Quick Start
//!
//! ```rust
//! use schema_guard::prelude::*;
//! use schema_guard::validator::{infer_schema, validate_feature_statistics};
//!
//! let training = DatasetStatistics::new(100).with_feature(
//!     FeatureStatistics::builder("color", ValueType::String)
//!         .present(100)
//!         .value("red", 50)
//!         .value("green", 30)
//!         .value("blue", 20)
//!         .build(),
//! );
//! let schema = infer_schema(&training, 400)?;
//!
//! let serving = DatasetStatistics::new(10).with_feature(
//!     FeatureStatistics::builder("color", ValueType::String)
//!         .present(10)
//!         .value("red", 9)
//!         .value("purple", 1)
//!         .build(),
//! );
//! let report = validate_feature_statistics(
//!     &serving,
//!     &schema,
//!     Some("SERVING"),
//!     None,
//!     None,
//!     None,
//!     &ValidationConfig::default(),
//! )?;
//!
//! let color = report.get(&Path::from("color")).unwrap();
//! assert!(color.has_reason(AnomalyReason::UnexpectedValues));
//! assert_eq!(color.observed, vec!["purple"]);
//! # Ok::<(), SchemaGuardError>(())
//! ```
//!
//! ## Architecture
//!
//! - **`statistics`**: snapshot types and [`StatisticsView`](statistics::StatisticsView),
//!   which adds a weighting mode, an environment tag and optional previous and
//!   serving baselines
//! - **`schema`**: feature specs, domains and schema evolution
//! - **`anomalies`**: the diff engine and drift measures
//! - **`validator`**: one-call entry points, including JSON payload variants
//! - **`logging`**: subscriber setup for applications
//!
//! Everything is synchronous. Schemas share specs through `Arc`, so deriving a
//! new schema never copies or mutates the one it was derived from.

pub mod anomalies;
pub mod config;
pub mod error;
pub mod logging;
pub mod path;
pub mod prelude;
pub mod schema;
pub mod statistics;
pub mod validator;

pub use config::{InferenceConfig, ValidationConfig, DEFAULT_ENUM_THRESHOLD, DEFAULT_MAX_SAMPLES};
pub use error::{Result, SchemaGuardError};
pub use path::Path;
pub use schema::SchemaDefinition;
