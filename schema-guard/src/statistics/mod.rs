//! Statistics snapshots and the view used to query them.

mod types;
mod view;

pub use types::{
    DatasetStatistics, FeatureStatistics, FeatureStatisticsBuilder, NumericStatistics,
    ShapeStatistics, ValueFrequency, ValueHistogram, ValueType,
};
pub use view::{BaselineKind, Baselines, FeatureView, StatisticsView, StatisticsViewBuilder};
