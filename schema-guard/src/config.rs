//! Configuration for schema inference and validation.

use serde::{Deserialize, Serialize};

/// Default maximum number of distinct values for an enumerated domain.
pub const DEFAULT_ENUM_THRESHOLD: usize = 400;

/// Default cap on the number of sample values carried by an anomaly.
pub const DEFAULT_MAX_SAMPLES: usize = 10;

/// Configuration shared by schema inference and anomaly detection.
///
/// ```rust
/// use schema_guard::InferenceConfig;
///
/// let config = InferenceConfig::builder()
///     .enum_threshold(20)
///     .new_features_are_warnings(true)
///     .build();
/// assert_eq!(config.enum_threshold, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Maximum distinct-value count for a domain to be enumerated (default: 400)
    pub enum_threshold: usize,
    /// Report previously unseen features as warnings instead of errors (default: false)
    pub new_features_are_warnings: bool,
    /// Maximum number of sample values attached to one anomaly (default: 10)
    pub max_samples: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enum_threshold: DEFAULT_ENUM_THRESHOLD,
            new_features_are_warnings: false,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl InferenceConfig {
    /// Create a builder for custom configuration
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }
}

/// Builder for [`InferenceConfig`]
#[derive(Debug, Default)]
pub struct InferenceConfigBuilder {
    config: InferenceConfig,
}

impl InferenceConfigBuilder {
    /// Set the enumerated-domain threshold
    pub fn enum_threshold(mut self, threshold: usize) -> Self {
        self.config.enum_threshold = threshold;
        self
    }

    /// Set whether new features are reported as warnings
    pub fn new_features_are_warnings(mut self, warnings: bool) -> Self {
        self.config.new_features_are_warnings = warnings;
        self
    }

    /// Set the per-anomaly sample cap (at least 1)
    pub fn max_samples(mut self, max: usize) -> Self {
        self.config.max_samples = max.max(1);
        self
    }

    /// Build the configuration
    pub fn build(self) -> InferenceConfig {
        self.config
    }
}

/// Validation options accepted by the validator facade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Report previously unseen features as warnings instead of errors
    pub new_features_are_warnings: bool,
}
