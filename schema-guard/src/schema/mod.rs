//! Schema model and its evolution from observed statistics.

mod definition;
mod types;
mod update;

pub use definition::SchemaDefinition;
pub use types::{
    Domain, FeatureSpec, FeatureType, Presence, ValueCount, DEFAULT_DRIFT_THRESHOLD,
};

pub(crate) use update::{infer_feature_spec, widen_feature_spec};
