#![forbid(unsafe_code)]

//! Slash-separated addresses into nested groups.
//!
//! `"address/street"` names the `street` control of the `address` group.
//! Empty segments are dropped, so `"/a//b/"` and `"a/b"` are the same path
//! and `""` is the empty path (the node itself).

use std::fmt;
use std::str::FromStr;

/// A parsed lookup path for [`Node::find`](crate::Node::find).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<String>,
}

impl NodePath {
    /// Build a path from individual segments. Empty segments are dropped;
    /// segments are not split further.
    pub fn from_segments<S: AsRef<str>>(segments: impl IntoIterator<Item = S>) -> Self {
        Self {
            segments: segments
                .into_iter()
                .filter(|s| !s.as_ref().is_empty())
                .map(|s| s.as_ref().to_owned())
                .collect(),
        }
    }

    /// Parse a slash-separated path.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        Self::from_segments(path.split('/'))
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Path extended by one segment.
    #[must_use]
    pub fn join(&self, segment: &str) -> Self {
        Self::from_segments(self.segments.iter().map(String::as_str).chain([segment]))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for NodePath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for NodePath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&String> for NodePath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<&[&str]> for NodePath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments)
    }
}

impl<const N: usize> From<[&str; N]> for NodePath {
    fn from(segments: [&str; N]) -> Self {
        Self::from_segments(segments)
    }
}

impl From<Vec<String>> for NodePath {
    fn from(segments: Vec<String>) -> Self {
        Self::from_segments(segments)
    }
}

impl From<&NodePath> for NodePath {
    fn from(path: &NodePath) -> Self {
        path.clone()
    }
}
