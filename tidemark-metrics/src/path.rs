//! Metric paths.

use std::fmt;

/// A dot-separated metric path, e.g. `"api.requests.total"`.
///
/// Paths are the primary registry key; two paths are equal when their
/// segment sequences are equal, however they were built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricPath {
    segments: Vec<String>,
}

impl MetricPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MetricPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// A child path with one more segment.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        MetricPath { segments }
    }
}

impl From<&str> for MetricPath {
    fn from(path: &str) -> Self {
        MetricPath {
            segments: path
                .split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl From<String> for MetricPath {
    fn from(path: String) -> Self {
        MetricPath::from(path.as_str())
    }
}

impl fmt::Display for MetricPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
