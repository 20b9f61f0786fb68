//! Distribution distance measures used for drift detection.

use std::collections::BTreeMap;

use crate::statistics::FeatureView;

/// Distance between two feature distributions.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftDistance {
    /// The distance, in `[0, 1]` for normalized histograms
    pub distance: f64,
    /// Value responsible for the distance, when the measure can name one
    pub value: Option<String>,
}

/// Measures how far a feature's current distribution is from a baseline.
///
/// Implementations return `None` when the two observations cannot be
/// compared, for example when either side lacks a histogram.
pub trait DriftMeasure: Send + Sync {
    /// Name used in logs and anomaly descriptions.
    fn name(&self) -> &str;

    fn distance(&self, current: &FeatureView<'_>, baseline: &FeatureView<'_>) -> Option<DriftDistance>;
}

/// Largest absolute difference in normalized frequency of any single value.
///
/// Both histograms are normalized to sum to one; values seen on only one side
/// count as frequency zero on the other.
#[derive(Debug, Clone, Copy, Default)]
pub struct LInfinityDistance;

impl DriftMeasure for LInfinityDistance {
    fn name(&self) -> &str {
        "l_infinity"
    }

    fn distance(&self, current: &FeatureView<'_>, baseline: &FeatureView<'_>) -> Option<DriftDistance> {
        let current = normalized(current)?;
        let baseline = normalized(baseline)?;

        let mut worst: Option<DriftDistance> = None;
        let values = current.keys().chain(baseline.keys());
        for value in values {
            let diff = (current.get(value).copied().unwrap_or(0.0)
                - baseline.get(value).copied().unwrap_or(0.0))
            .abs();
            if worst.as_ref().map_or(true, |w| diff > w.distance) {
                worst = Some(DriftDistance {
                    distance: diff,
                    value: Some((*value).to_string()),
                });
            }
        }
        worst
    }
}

fn normalized<'v>(feature: &FeatureView<'v>) -> Option<BTreeMap<&'v str, f64>> {
    let mut totals: BTreeMap<&'v str, f64> = BTreeMap::new();
    for (value, frequency) in feature.frequencies() {
        *totals.entry(value).or_insert(0.0) += frequency;
    }
    let sum: f64 = totals.values().sum();
    if totals.is_empty() || !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    for frequency in totals.values_mut() {
        *frequency /= sum;
    }
    Some(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;
    use crate::statistics::{DatasetStatistics, FeatureStatistics, StatisticsView, ValueType};

    fn snapshot(values: &[(&str, u64)]) -> DatasetStatistics {
        let mut builder = FeatureStatistics::builder("color", ValueType::String).present(10);
        for (value, count) in values {
            builder = builder.value(*value, *count);
        }
        DatasetStatistics::new(10).with_feature(builder.build())
    }

    #[test]
    fn test_identical_distributions_have_zero_distance() {
        let current = snapshot(&[("red", 5), ("blue", 5)]);
        let baseline = snapshot(&[("blue", 50), ("red", 50)]);
        let current = StatisticsView::builder(&current).build().unwrap();
        let baseline = StatisticsView::builder(&baseline).build().unwrap();
        let path = Path::from("color");

        let distance = LInfinityDistance
            .distance(
                &current.get_feature(&path).unwrap(),
                &baseline.get_feature(&path).unwrap(),
            )
            .unwrap();
        assert_eq!(distance.distance, 0.0);
    }

    #[test]
    fn test_distance_names_the_worst_value() {
        let current = snapshot(&[("red", 9), ("blue", 1)]);
        let baseline = snapshot(&[("red", 5), ("blue", 3), ("green", 2)]);
        let current = StatisticsView::builder(&current).build().unwrap();
        let baseline = StatisticsView::builder(&baseline).build().unwrap();
        let path = Path::from("color");

        let distance = LInfinityDistance
            .distance(
                &current.get_feature(&path).unwrap(),
                &baseline.get_feature(&path).unwrap(),
            )
            .unwrap();
        assert!((distance.distance - 0.4).abs() < 1e-9);
        assert_eq!(distance.value.as_deref(), Some("red"));
    }

    #[test]
    fn test_missing_histogram_is_not_comparable() {
        let current = snapshot(&[("red", 1)]);
        let baseline = DatasetStatistics::new(10).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(10)
                .build(),
        );
        let current = StatisticsView::builder(&current).build().unwrap();
        let baseline = StatisticsView::builder(&baseline).build().unwrap();
        let path = Path::from("color");

        assert!(LInfinityDistance
            .distance(
                &current.get_feature(&path).unwrap(),
                &baseline.get_feature(&path).unwrap(),
            )
            .is_none());
    }
}
