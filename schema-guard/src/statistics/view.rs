//! Read-only query surface over one or more statistics snapshots.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::{Result, SchemaGuardError};
use crate::path::Path;
use crate::statistics::types::{
    DatasetStatistics, FeatureStatistics, NumericStatistics, ShapeStatistics, ValueHistogram,
    ValueType,
};

/// Which baseline a comparison is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaselineKind {
    /// A prior run of the same pipeline
    Previous,
    /// Statistics collected at serving time
    Serving,
}

impl BaselineKind {
    /// Returns the string representation of the baseline kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineKind::Previous => "previous",
            BaselineKind::Serving => "serving",
        }
    }
}

impl fmt::Display for BaselineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Baseline snapshots linked to a [`StatisticsView`].
#[derive(Debug)]
pub enum Baselines<'a> {
    NoBaseline,
    PreviousOnly(Box<StatisticsView<'a>>),
    ServingOnly(Box<StatisticsView<'a>>),
    Both {
        previous: Box<StatisticsView<'a>>,
        serving: Box<StatisticsView<'a>>,
    },
}

impl<'a> Baselines<'a> {
    /// Builds the variant matching the given optional views.
    pub fn from_options(
        previous: Option<StatisticsView<'a>>,
        serving: Option<StatisticsView<'a>>,
    ) -> Self {
        match (previous, serving) {
            (None, None) => Baselines::NoBaseline,
            (Some(previous), None) => Baselines::PreviousOnly(Box::new(previous)),
            (None, Some(serving)) => Baselines::ServingOnly(Box::new(serving)),
            (Some(previous), Some(serving)) => Baselines::Both {
                previous: Box::new(previous),
                serving: Box::new(serving),
            },
        }
    }

    /// Returns the previous-run view, if linked.
    pub fn previous(&self) -> Option<&StatisticsView<'a>> {
        match self {
            Baselines::PreviousOnly(previous) | Baselines::Both { previous, .. } => Some(previous),
            _ => None,
        }
    }

    /// Returns the serving view, if linked.
    pub fn serving(&self) -> Option<&StatisticsView<'a>> {
        match self {
            Baselines::ServingOnly(serving) | Baselines::Both { serving, .. } => Some(serving),
            _ => None,
        }
    }

    /// True when no baseline is linked.
    pub fn is_empty(&self) -> bool {
        matches!(self, Baselines::NoBaseline)
    }

    /// Iterates over the linked baselines, previous first.
    pub fn iter(&self) -> impl Iterator<Item = (BaselineKind, &StatisticsView<'a>)> {
        self.previous()
            .map(|view| (BaselineKind::Previous, view))
            .into_iter()
            .chain(self.serving().map(|view| (BaselineKind::Serving, view)))
    }
}

/// Normalized, read-only view over a primary statistics snapshot and its
/// optional baselines.
///
/// The view abstracts weighted vs unweighted counting: every count it reports
/// follows the weighting mode chosen at construction.
///
/// # Example
///
/// ```rust
/// use schema_guard::statistics::{DatasetStatistics, FeatureStatistics, StatisticsView, ValueType};
///
/// let current = DatasetStatistics::new(100).with_feature(
///     FeatureStatistics::builder("color", ValueType::String)
///         .present(100)
///         .value("red", 60)
///         .value("blue", 40)
///         .build(),
/// );
/// let previous = DatasetStatistics::new(80);
///
/// let view = StatisticsView::builder(&current)
///     .previous(StatisticsView::builder(&previous).build()?)
///     .build()?;
/// assert_eq!(view.examples_count(), 100.0);
/// assert!(view.baselines().previous().is_some());
/// # Ok::<(), schema_guard::SchemaGuardError>(())
/// ```
#[derive(Debug)]
pub struct StatisticsView<'a> {
    primary: &'a DatasetStatistics,
    weighted: bool,
    environment: Option<String>,
    baselines: Baselines<'a>,
    index: HashMap<Path, usize>,
}

impl<'a> StatisticsView<'a> {
    /// Creates a builder over the given primary snapshot.
    pub fn builder(primary: &'a DatasetStatistics) -> StatisticsViewBuilder<'a> {
        StatisticsViewBuilder {
            primary,
            weighted: false,
            environment: None,
            previous: None,
            serving: None,
        }
    }

    /// Creates a view from all of its parts at once.
    pub fn new(
        primary: &'a DatasetStatistics,
        weighted: bool,
        environment: Option<String>,
        previous: Option<StatisticsView<'a>>,
        serving: Option<StatisticsView<'a>>,
    ) -> Result<Self> {
        StatisticsViewBuilder {
            primary,
            weighted,
            environment,
            previous,
            serving,
        }
        .build()
    }

    /// True when the snapshot carries weighted example counts. Callers use
    /// this to choose the weighting mode before building a view.
    pub fn weighted_statistics_exist(snapshot: &DatasetStatistics) -> bool {
        snapshot.weighted_num_examples.map_or(false, |w| w > 0.0)
    }

    /// Effective number of examples, weighted or unweighted per mode. Weighted
    /// lookups fall back to the raw count when the snapshot has no weights.
    pub fn examples_count(&self) -> f64 {
        if self.weighted {
            self.primary
                .weighted_num_examples
                .unwrap_or(self.primary.num_examples as f64)
        } else {
            self.primary.num_examples as f64
        }
    }

    /// True when counts are weighted.
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// The active environment tag, if any.
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    /// Linked baseline views.
    pub fn baselines(&self) -> &Baselines<'a> {
        &self.baselines
    }

    /// The underlying primary snapshot.
    pub fn snapshot(&self) -> &'a DatasetStatistics {
        self.primary
    }

    /// Number of features in the primary snapshot.
    pub fn len(&self) -> usize {
        self.primary.features.len()
    }

    /// True when the primary snapshot has no features.
    pub fn is_empty(&self) -> bool {
        self.primary.features.is_empty()
    }

    /// True when the primary snapshot has a feature at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    /// Feature paths in snapshot order.
    pub fn paths(&self) -> impl Iterator<Item = &'a Path> + '_ {
        self.primary.features.iter().map(|f| &f.path)
    }

    /// Returns the feature at `path`, merged with the same path in any linked
    /// baseline.
    pub fn get_feature(&self, path: &Path) -> Option<FeatureView<'_>> {
        let stats = self.lookup(path)?;
        Some(self.feature_view(stats))
    }

    /// Iterates over all features in snapshot order. The iterator borrows the
    /// view and can be restarted by calling this method again.
    pub fn features(&self) -> impl Iterator<Item = FeatureView<'_>> + '_ {
        self.primary
            .features
            .iter()
            .map(move |stats| self.feature_view(stats))
    }

    fn lookup(&self, path: &Path) -> Option<&'a FeatureStatistics> {
        self.index.get(path).map(|&i| &self.primary.features[i])
    }

    fn feature_view<'v>(&'v self, stats: &'v FeatureStatistics) -> FeatureView<'v> {
        let baseline = |view: Option<&'v StatisticsView<'a>>| -> Option<&'v FeatureStatistics> {
            view.and_then(|v| v.lookup(&stats.path))
        };
        FeatureView {
            stats,
            weighted: self.weighted,
            previous: baseline(self.baselines.previous()),
            serving: baseline(self.baselines.serving()),
        }
    }
}

/// Builder for [`StatisticsView`].
pub struct StatisticsViewBuilder<'a> {
    primary: &'a DatasetStatistics,
    weighted: bool,
    environment: Option<String>,
    previous: Option<StatisticsView<'a>>,
    serving: Option<StatisticsView<'a>>,
}

impl<'a> StatisticsViewBuilder<'a> {
    /// Use weighted counts.
    pub fn weighted(mut self, weighted: bool) -> Self {
        self.weighted = weighted;
        self
    }

    /// Sets the active environment tag.
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets or clears the active environment tag.
    pub fn maybe_environment(mut self, environment: Option<&str>) -> Self {
        self.environment = environment.map(str::to_string);
        self
    }

    /// Links a previous-run baseline.
    pub fn previous(mut self, previous: StatisticsView<'a>) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Links a serving baseline.
    pub fn serving(mut self, serving: StatisticsView<'a>) -> Self {
        self.serving = Some(serving);
        self
    }

    /// Builds the view, indexing the primary snapshot by path.
    ///
    /// Fails when the snapshot lists a path twice. Weighting never fails: a
    /// weighted view over a snapshot, or a baseline, without weights reads
    /// the raw counts instead.
    pub fn build(self) -> Result<StatisticsView<'a>> {
        let mut index = HashMap::with_capacity(self.primary.features.len());
        for (i, feature) in self.primary.features.iter().enumerate() {
            if index.insert(feature.path.clone(), i).is_some() {
                return Err(SchemaGuardError::statistics_inconsistency(format!(
                    "duplicate feature path '{}' in snapshot",
                    feature.path
                )));
            }
        }

        debug!(
            features = index.len(),
            weighted = self.weighted,
            environment = ?self.environment,
            has_previous = self.previous.is_some(),
            has_serving = self.serving.is_some(),
            "Built statistics view"
        );

        Ok(StatisticsView {
            primary: self.primary,
            weighted: self.weighted,
            environment: self.environment,
            baselines: Baselines::from_options(self.previous, self.serving),
            index,
        })
    }
}

/// One feature as seen through a [`StatisticsView`], together with the same
/// feature in any linked baseline.
#[derive(Debug, Clone, Copy)]
pub struct FeatureView<'v> {
    stats: &'v FeatureStatistics,
    weighted: bool,
    previous: Option<&'v FeatureStatistics>,
    serving: Option<&'v FeatureStatistics>,
}

impl<'v> FeatureView<'v> {
    /// The feature path.
    pub fn path(&self) -> &'v Path {
        &self.stats.path
    }

    /// The dominant observed value type.
    pub fn value_type(&self) -> ValueType {
        self.stats.value_type
    }

    /// The raw statistics behind this view.
    pub fn statistics(&self) -> &'v FeatureStatistics {
        self.stats
    }

    /// True when counts are weighted.
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Number of examples carrying the feature. Weighted lookups fall back to
    /// the raw count when the producer did not record a weight.
    pub fn num_present(&self) -> f64 {
        if self.weighted {
            self.stats
                .weighted_num_non_missing
                .unwrap_or(self.stats.num_non_missing as f64)
        } else {
            self.stats.num_non_missing as f64
        }
    }

    /// Number of examples lacking the feature.
    pub fn num_missing(&self) -> f64 {
        if self.weighted {
            self.stats
                .weighted_num_missing
                .unwrap_or(self.stats.num_missing as f64)
        } else {
            self.stats.num_missing as f64
        }
    }

    /// Fraction of examples carrying the feature, if any example was counted.
    pub fn fraction_present(&self) -> Option<f64> {
        let total = self.num_present() + self.num_missing();
        if total > 0.0 {
            Some(self.num_present() / total)
        } else {
            None
        }
    }

    /// The distinct-value histogram, if recorded.
    pub fn histogram(&self) -> Option<&'v ValueHistogram> {
        self.stats.histogram.as_ref()
    }

    /// Histogram values with their mode-aware frequencies, in producer order.
    pub fn frequencies(&self) -> Vec<(&'v str, f64)> {
        let weighted = self.weighted;
        self.histogram()
            .map(|h| {
                h.buckets
                    .iter()
                    .map(|b| (b.value.as_str(), b.frequency(weighted)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The numeric summary, if recorded.
    pub fn numeric(&self) -> Option<&'v NumericStatistics> {
        self.stats.numeric.as_ref()
    }

    /// Values-per-example statistics, if recorded.
    pub fn shape(&self) -> Option<&'v ShapeStatistics> {
        self.stats.shape.as_ref()
    }

    /// The same feature in the previous-run baseline.
    pub fn previous(&self) -> Option<FeatureView<'v>> {
        self.previous.map(|stats| self.detached(stats))
    }

    /// The same feature in the serving baseline.
    pub fn serving(&self) -> Option<FeatureView<'v>> {
        self.serving.map(|stats| self.detached(stats))
    }

    /// Iterates over the baseline counterparts that exist, previous first.
    pub fn baselines(&self) -> impl Iterator<Item = (BaselineKind, FeatureView<'v>)> {
        self.previous()
            .map(|view| (BaselineKind::Previous, view))
            .into_iter()
            .chain(self.serving().map(|view| (BaselineKind::Serving, view)))
    }

    fn detached(&self, stats: &'v FeatureStatistics) -> FeatureView<'v> {
        FeatureView {
            stats,
            weighted: self.weighted,
            previous: None,
            serving: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color(present: u64, missing: u64) -> FeatureStatistics {
        FeatureStatistics::builder("color", ValueType::String)
            .present(present)
            .missing(missing)
            .weighted_presence(present as f64 * 2.0, missing as f64 * 2.0)
            .value("red", present)
            .build()
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let snapshot = DatasetStatistics::new(10)
            .with_feature(color(10, 0))
            .with_feature(color(5, 5));
        let err = StatisticsView::builder(&snapshot).build().unwrap_err();
        assert!(matches!(err, SchemaGuardError::StatisticsInconsistency(_)));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_weighted_counts() {
        let snapshot = DatasetStatistics::new(10)
            .with_weighted_examples(20.0)
            .with_feature(color(8, 2));
        assert!(StatisticsView::weighted_statistics_exist(&snapshot));

        let view = StatisticsView::builder(&snapshot)
            .weighted(true)
            .build()
            .unwrap();
        assert_eq!(view.examples_count(), 20.0);
        let feature = view.get_feature(&Path::from("color")).unwrap();
        assert_eq!(feature.num_present(), 16.0);
        assert_eq!(feature.num_missing(), 4.0);
        assert_eq!(feature.fraction_present(), Some(0.8));
    }

    #[test]
    fn test_weighted_view_without_weights_reads_raw_counts() {
        let snapshot = DatasetStatistics::new(10).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(7)
                .missing(3)
                .build(),
        );
        assert!(!StatisticsView::weighted_statistics_exist(&snapshot));

        let view = StatisticsView::builder(&snapshot)
            .weighted(true)
            .build()
            .unwrap();
        assert_eq!(view.examples_count(), 10.0);
        let feature = view.get_feature(&Path::from("color")).unwrap();
        assert_eq!(feature.num_present(), 7.0);
        assert_eq!(feature.num_missing(), 3.0);
    }

    #[test]
    fn test_unweighted_baseline_under_weighted_view() {
        let current = DatasetStatistics::new(10)
            .with_weighted_examples(20.0)
            .with_feature(color(10, 0));
        let previous = DatasetStatistics::new(10).with_feature(
            FeatureStatistics::builder("color", ValueType::String)
                .present(6)
                .missing(4)
                .value("red", 6)
                .build(),
        );
        let previous_view = StatisticsView::builder(&previous)
            .weighted(true)
            .build()
            .unwrap();
        let view = StatisticsView::builder(&current)
            .weighted(true)
            .previous(previous_view)
            .build()
            .unwrap();

        let feature = view.get_feature(&Path::from("color")).unwrap();
        assert_eq!(feature.num_present(), 20.0);
        let previous = feature.previous().unwrap();
        assert_eq!(previous.num_present(), 6.0);
        assert_eq!(previous.frequencies(), vec![("red", 6.0)]);
    }

    #[test]
    fn test_feature_merges_baselines() {
        let current = DatasetStatistics::new(10).with_feature(color(10, 0));
        let previous = DatasetStatistics::new(10).with_feature(color(9, 1));
        let serving = DatasetStatistics::new(10);

        let view = StatisticsView::new(
            &current,
            false,
            Some("SERVING".to_string()),
            Some(StatisticsView::builder(&previous).build().unwrap()),
            Some(StatisticsView::builder(&serving).build().unwrap()),
        )
        .unwrap();

        assert!(matches!(view.baselines(), Baselines::Both { .. }));
        assert_eq!(view.environment(), Some("SERVING"));

        let feature = view.get_feature(&Path::from("color")).unwrap();
        assert_eq!(feature.previous().unwrap().num_missing(), 1.0);
        assert!(feature.serving().is_none());
        assert_eq!(feature.baselines().count(), 1);
    }

    #[test]
    fn test_iteration_keeps_snapshot_order() {
        let snapshot = DatasetStatistics::new(1)
            .with_feature(FeatureStatistics::builder("zeta", ValueType::Int).build())
            .with_feature(FeatureStatistics::builder("alpha", ValueType::Int).build());
        let view = StatisticsView::builder(&snapshot).build().unwrap();

        let first: Vec<String> = view.features().map(|f| f.path().to_string()).collect();
        let second: Vec<String> = view.features().map(|f| f.path().to_string()).collect();
        assert_eq!(first, vec!["zeta", "alpha"]);
        assert_eq!(first, second);
    }
}
