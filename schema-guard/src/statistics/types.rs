//! Pre-aggregated dataset statistics.
//!
//! These types describe one observation point (a training run, a serving run,
//! a prior run). They are produced upstream and arrive already aggregated;
//! nothing in this crate scans raw data.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::path::Path;

/// Dominant observed value type of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Integer values
    Int,
    /// Floating point values
    Float,
    /// UTF-8 string values
    String,
    /// Raw byte values
    Bytes,
    /// Nested records
    Struct,
}

impl ValueType {
    /// Returns the string representation of the value type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::Bytes => "bytes",
            ValueType::Struct => "struct",
        }
    }

    /// Checks if values of this type are numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Int | ValueType::Float)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Frequency of one distinct value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFrequency {
    /// The value, rendered as a string.
    pub value: String,
    /// Number of examples carrying the value.
    pub count: u64,
    /// Sum of example weights carrying the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_count: Option<f64>,
}

impl ValueFrequency {
    /// Returns the weighted or unweighted frequency. Weighted lookups fall back
    /// to the raw count when the producer did not record a weight.
    pub fn frequency(&self, weighted: bool) -> f64 {
        if weighted {
            self.weighted_count.unwrap_or(self.count as f64)
        } else {
            self.count as f64
        }
    }
}

/// Distinct-value frequency histogram for discrete features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueHistogram {
    /// Total number of distinct values, when known. The buckets may list fewer
    /// values than this (a top-k histogram).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<u64>,
    /// Buckets in producer order.
    pub buckets: Vec<ValueFrequency>,
}

impl ValueHistogram {
    /// Number of distinct values observed.
    pub fn distinct_count(&self) -> u64 {
        let listed = self.buckets.len() as u64;
        self.unique.map_or(listed, |unique| unique.max(listed))
    }

    /// True when every distinct value is listed in the buckets.
    pub fn is_complete(&self) -> bool {
        self.buckets.len() as u64 >= self.distinct_count()
    }

    /// Sum of all bucket frequencies.
    pub fn total(&self, weighted: bool) -> f64 {
        self.buckets.iter().map(|b| b.frequency(weighted)).sum()
    }
}

/// Numeric summary for int and float features.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericStatistics {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Mean of the observed values.
    #[serde(default)]
    pub mean: f64,
    /// Standard deviation of the observed values.
    #[serde(default)]
    pub std_dev: f64,
}

impl NumericStatistics {
    /// Creates a summary covering `[min, max]`.
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            mean: (min + max) / 2.0,
            std_dev: 0.0,
        }
    }
}

/// Number of values per example.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeStatistics {
    /// Fewest values seen in one example.
    pub min_num_values: u64,
    /// Most values seen in one example.
    pub max_num_values: u64,
    /// Average values per example.
    #[serde(default)]
    pub avg_num_values: f64,
}

/// Aggregated observation of one feature in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    /// Path identifying the feature.
    pub path: Path,
    /// Dominant observed value type.
    pub value_type: ValueType,
    /// Number of examples carrying the feature.
    pub num_non_missing: u64,
    /// Number of examples lacking the feature.
    pub num_missing: u64,
    /// Weighted counterpart of `num_non_missing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_num_non_missing: Option<f64>,
    /// Weighted counterpart of `num_missing`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_num_missing: Option<f64>,
    /// Values-per-example statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeStatistics>,
    /// Distinct-value histogram (discrete features).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<ValueHistogram>,
    /// Numeric range and moments (numeric features).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericStatistics>,
    /// Average value length (string and bytes features).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_length: Option<f64>,
}

impl FeatureStatistics {
    /// Creates a builder for a feature at `path` with the given value type.
    pub fn builder(path: impl Into<Path>, value_type: ValueType) -> FeatureStatisticsBuilder {
        FeatureStatisticsBuilder {
            stats: FeatureStatistics {
                path: path.into(),
                value_type,
                num_non_missing: 0,
                num_missing: 0,
                weighted_num_non_missing: None,
                weighted_num_missing: None,
                shape: None,
                histogram: None,
                numeric: None,
                avg_length: None,
            },
        }
    }
}

/// Builder for [`FeatureStatistics`].
#[derive(Debug, Clone)]
pub struct FeatureStatisticsBuilder {
    stats: FeatureStatistics,
}

impl FeatureStatisticsBuilder {
    /// Sets the number of examples carrying the feature.
    pub fn present(mut self, count: u64) -> Self {
        self.stats.num_non_missing = count;
        self
    }

    /// Sets the number of examples lacking the feature.
    pub fn missing(mut self, count: u64) -> Self {
        self.stats.num_missing = count;
        self
    }

    /// Sets weighted presence counts.
    pub fn weighted_presence(mut self, non_missing: f64, missing: f64) -> Self {
        self.stats.weighted_num_non_missing = Some(non_missing);
        self.stats.weighted_num_missing = Some(missing);
        self
    }

    /// Sets the values-per-example range.
    pub fn shape(mut self, min_num_values: u64, max_num_values: u64) -> Self {
        self.stats.shape = Some(ShapeStatistics {
            min_num_values,
            max_num_values,
            avg_num_values: (min_num_values + max_num_values) as f64 / 2.0,
        });
        self
    }

    /// Appends a histogram bucket.
    pub fn value(self, value: impl Into<String>, count: u64) -> Self {
        self.push_bucket(ValueFrequency {
            value: value.into(),
            count,
            weighted_count: None,
        })
    }

    /// Appends a histogram bucket with a weighted frequency.
    pub fn weighted_value(self, value: impl Into<String>, count: u64, weighted: f64) -> Self {
        self.push_bucket(ValueFrequency {
            value: value.into(),
            count,
            weighted_count: Some(weighted),
        })
    }

    /// Sets the total distinct-value count, which may exceed the listed buckets.
    pub fn unique(mut self, unique: u64) -> Self {
        self.stats
            .histogram
            .get_or_insert_with(ValueHistogram::default)
            .unique = Some(unique);
        self
    }

    /// Sets the observed numeric range.
    pub fn numeric_range(mut self, min: f64, max: f64) -> Self {
        self.stats.numeric = Some(NumericStatistics::range(min, max));
        self
    }

    /// Sets the numeric summary.
    pub fn numeric(mut self, numeric: NumericStatistics) -> Self {
        self.stats.numeric = Some(numeric);
        self
    }

    /// Sets the average value length.
    pub fn avg_length(mut self, avg_length: f64) -> Self {
        self.stats.avg_length = Some(avg_length);
        self
    }

    /// Builds the statistics.
    pub fn build(self) -> FeatureStatistics {
        self.stats
    }

    fn push_bucket(mut self, bucket: ValueFrequency) -> Self {
        self.stats
            .histogram
            .get_or_insert_with(ValueHistogram::default)
            .buckets
            .push(bucket);
        self
    }
}

/// Statistics for one dataset observation point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetStatistics {
    /// Number of examples in the dataset.
    pub num_examples: u64,
    /// Sum of example weights, when the dataset is weighted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_num_examples: Option<f64>,
    /// Per-feature statistics in producer order.
    #[serde(default)]
    pub features: Vec<FeatureStatistics>,
}

impl DatasetStatistics {
    /// Creates an empty snapshot with the given example count.
    pub fn new(num_examples: u64) -> Self {
        Self {
            num_examples,
            weighted_num_examples: None,
            features: Vec::new(),
        }
    }

    /// Sets the weighted example count.
    pub fn with_weighted_examples(mut self, weighted: f64) -> Self {
        self.weighted_num_examples = Some(weighted);
        self
    }

    /// Appends feature statistics.
    pub fn with_feature(mut self, feature: FeatureStatistics) -> Self {
        self.features.push(feature);
        self
    }

    /// Returns the first feature with the given path.
    pub fn feature(&self, path: &Path) -> Option<&FeatureStatistics> {
        self.features.iter().find(|f| &f.path == path)
    }
}
