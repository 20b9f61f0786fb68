//! Schema definition: a validated mapping from feature path to spec.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, SchemaGuardError};
use crate::path::Path;
use crate::schema::types::FeatureSpec;

/// Mapping from [`Path`] to [`FeatureSpec`], plus the schema's default
/// environments.
///
/// A `SchemaDefinition` is immutable. Evolving it (see
/// [`SchemaDefinition::update`] and [`SchemaDefinition::with_feature`]) returns
/// a new value; specs are shared through `Arc`, so clones are cheap and a prior
/// schema can be read concurrently while a new one is being derived from it.
///
/// # Example
///
/// ```rust
/// use schema_guard::schema::{Domain, FeatureSpec, FeatureType, SchemaDefinition};
/// use schema_guard::Path;
///
/// let schema = SchemaDefinition::from_features([(
///     Path::from("age"),
///     FeatureSpec::new(FeatureType::Int)
///         .required()
///         .with_domain(Domain::range(0.0, 120.0)),
/// )])?;
/// assert!(schema.feature(&Path::from("age")).unwrap().is_required());
/// # Ok::<(), schema_guard::SchemaGuardError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "SchemaDocument", try_from = "SchemaDocument")]
pub struct SchemaDefinition {
    pub(crate) features: BTreeMap<Path, Arc<FeatureSpec>>,
    pub(crate) default_environments: Vec<String>,
}

impl SchemaDefinition {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a schema from path/spec pairs, rejecting duplicate paths and
    /// contradictory specs.
    pub fn from_features<I>(features: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Path, FeatureSpec)>,
    {
        let mut map = BTreeMap::new();
        for (path, spec) in features {
            spec.validate(&path)?;
            if map.contains_key(&path) {
                return Err(SchemaGuardError::schema_consistency(format!(
                    "duplicate feature path '{path}'"
                )));
            }
            map.insert(path, Arc::new(spec));
        }
        Ok(Self {
            features: map,
            default_environments: Vec::new(),
        })
    }

    /// Returns a copy of this schema with the given default environments.
    pub fn with_default_environments<I, S>(&self, environments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut default_environments: Vec<String> = Vec::new();
        for environment in environments {
            let environment = environment.into();
            if environment.is_empty() {
                return Err(SchemaGuardError::schema_consistency(
                    "default environment names must not be empty",
                ));
            }
            if !default_environments.contains(&environment) {
                default_environments.push(environment);
            }
        }
        Ok(Self {
            features: self.features.clone(),
            default_environments,
        })
    }

    /// Returns a copy of this schema with `spec` at `path`.
    ///
    /// Replacing an existing spec is only allowed along a widening domain
    /// transition (for example an enumeration growing or becoming
    /// unconstrained); narrowing fails with a schema consistency error.
    pub fn with_feature(&self, path: Path, spec: FeatureSpec) -> Result<Self> {
        spec.validate(&path)?;
        if let Some(existing) = self.features.get(&path) {
            ensure_transition(&path, existing, &spec)?;
        }
        let mut features = self.features.clone();
        features.insert(path, Arc::new(spec));
        Ok(Self {
            features,
            default_environments: self.default_environments.clone(),
        })
    }

    /// Returns the spec at `path`.
    pub fn feature(&self, path: &Path) -> Option<&FeatureSpec> {
        self.features.get(path).map(Arc::as_ref)
    }

    /// Iterates over all specs in path order.
    pub fn features(&self) -> impl Iterator<Item = (&Path, &FeatureSpec)> {
        self.features.iter().map(|(path, spec)| (path, spec.as_ref()))
    }

    /// Iterates over all paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.features.keys()
    }

    /// True when the schema has a spec at `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.features.contains_key(path)
    }

    /// Number of specs.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when the schema has no specs.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Environments a spec without explicit environment lists belongs to.
    pub fn default_environments(&self) -> &[String] {
        &self.default_environments
    }

    /// Checks whether `spec` applies in `environment` under this schema's
    /// default environments.
    pub fn admits(&self, spec: &FeatureSpec, environment: Option<&str>) -> bool {
        spec.admits_environment(environment, &self.default_environments)
    }
}

/// Rejects a spec replacement that would narrow the domain.
pub(crate) fn ensure_transition(path: &Path, from: &FeatureSpec, to: &FeatureSpec) -> Result<()> {
    if from.domain.can_transition_to(&to.domain) {
        Ok(())
    } else {
        Err(SchemaGuardError::schema_consistency(format!(
            "'{path}': domain cannot change from {} to {}",
            from.domain.kind_name(),
            to.domain.kind_name()
        )))
    }
}

/// Serialized form of a schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SchemaDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    default_environments: Vec<String>,
    #[serde(default)]
    features: Vec<FeatureEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeatureEntry {
    path: Path,
    #[serde(flatten)]
    spec: FeatureSpec,
}

impl From<SchemaDefinition> for SchemaDocument {
    fn from(schema: SchemaDefinition) -> Self {
        Self {
            default_environments: schema.default_environments,
            features: schema
                .features
                .into_iter()
                .map(|(path, spec)| FeatureEntry {
                    path,
                    spec: Arc::try_unwrap(spec).unwrap_or_else(|shared| (*shared).clone()),
                })
                .collect(),
        }
    }
}

impl TryFrom<SchemaDocument> for SchemaDefinition {
    type Error = SchemaGuardError;

    fn try_from(document: SchemaDocument) -> Result<Self> {
        SchemaDefinition::from_features(
            document
                .features
                .into_iter()
                .map(|entry| (entry.path, entry.spec)),
        )?
        .with_default_environments(document.default_environments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Domain, FeatureType};

    fn color_spec() -> FeatureSpec {
        FeatureSpec::new(FeatureType::Bytes).with_domain(Domain::enumerated(["red", "blue"]))
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let err = SchemaDefinition::from_features([
            (Path::from("color"), color_spec()),
            (Path::from("color"), color_spec()),
        ])
        .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn test_with_feature_is_functional() {
        let original = SchemaDefinition::from_features([(Path::from("color"), color_spec())]).unwrap();
        let widened = original
            .with_feature(
                Path::from("color"),
                FeatureSpec::new(FeatureType::Bytes)
                    .with_domain(Domain::enumerated(["red", "blue", "green"])),
            )
            .unwrap();

        assert_eq!(
            original.feature(&Path::from("color")).unwrap().domain,
            Domain::enumerated(["red", "blue"])
        );
        assert_eq!(
            widened.feature(&Path::from("color")).unwrap().domain.values().unwrap().len(),
            3
        );
    }

    #[test]
    fn test_with_feature_rejects_narrowing() {
        let schema = SchemaDefinition::from_features([(
            Path::from("color"),
            FeatureSpec::new(FeatureType::Bytes),
        )])
        .unwrap();
        let err = schema
            .with_feature(Path::from("color"), color_spec())
            .unwrap_err();
        assert!(err.is_invalid_schema());
    }

    #[test]
    fn test_json_round_trip_keeps_environments() {
        let schema = SchemaDefinition::from_features([
            (Path::from("label"), FeatureSpec::new(FeatureType::Int).not_in_environment("SERVING")),
            (Path::from("color"), color_spec()),
        ])
        .unwrap()
        .with_default_environments(["TRAINING", "SERVING"])
        .unwrap();

        let json = serde_json::to_string(&schema).unwrap();
        let back: SchemaDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.default_environments(), &["TRAINING", "SERVING"]);
    }

    #[test]
    fn test_json_rejects_duplicates() {
        let json = r#"{"features": [
            {"path": ["a"], "type": "int"},
            {"path": ["a"], "type": "float"}
        ]}"#;
        assert!(serde_json::from_str::<SchemaDefinition>(json).is_err());
    }
}
