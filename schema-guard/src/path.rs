//! Feature paths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered sequence of field-name steps identifying a feature, possibly nested
/// inside structured records.
///
/// Paths serialize as a JSON array of steps and display as a dotted string.
///
/// ```rust
/// use schema_guard::Path;
///
/// let path = Path::parse("user.address.zip");
/// assert_eq!(path.steps(), &["user", "address", "zip"]);
/// assert_eq!(path.to_string(), "user.address.zip");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    /// Creates a path from its steps.
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(steps.into_iter().map(Into::into).collect())
    }

    /// Parses a dotted path such as `"a.b"`. Empty steps are dropped.
    pub fn parse(dotted: &str) -> Self {
        Self::new(dotted.split('.').filter(|step| !step.is_empty()))
    }

    /// Returns the steps of this path.
    pub fn steps(&self) -> &[String] {
        &self.0
    }

    /// Returns true if the path has no steps.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `step` appended.
    pub fn child(&self, step: impl Into<String>) -> Self {
        let mut steps = self.0.clone();
        steps.push(step.into());
        Self(steps)
    }

    /// Returns the path without its last step, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl From<&str> for Path {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<Vec<String>> for Path {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}
