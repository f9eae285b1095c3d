//! Type definitions for paths.

use std::fmt;

/// A step in a path.
///
/// Either an object key or an array index. On the wire a key is a JSON string
/// and an index is a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathStep {
    Key(String),
    Index(usize),
}

/// A path from the root of a tree. The empty path is the root.
pub type Path = Vec<PathStep>;

impl PathStep {
    /// Returns the key if this step addresses an object property.
    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathStep::Key(k) => Some(k),
            PathStep::Index(_) => None,
        }
    }

    /// Returns the index if this step addresses an array element.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathStep::Key(_) => None,
            PathStep::Index(i) => Some(*i),
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, PathStep::Index(_))
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Key(k) => f.write_str(k),
            PathStep::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for PathStep {
    fn from(key: &str) -> Self {
        PathStep::Key(key.to_string())
    }
}

impl From<String> for PathStep {
    fn from(key: String) -> Self {
        PathStep::Key(key)
    }
}

impl From<usize> for PathStep {
    fn from(index: usize) -> Self {
        PathStep::Index(index)
    }
}

/// Builds a path from anything convertible into steps.
///
/// ```
/// use tree_duplex_path::{path, PathStep};
///
/// let p = path(["items".into(), PathStep::Index(2)]);
/// assert_eq!(p, vec![PathStep::Key("items".into()), PathStep::Index(2)]);
/// ```
pub fn path<I, S>(steps: I) -> Path
where
    I: IntoIterator<Item = S>,
    S: Into<PathStep>,
{
    steps.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_accessors() {
        let key = PathStep::from("foo");
        let idx = PathStep::from(3usize);
        assert_eq!(key.as_key(), Some("foo"));
        assert_eq!(key.as_index(), None);
        assert_eq!(idx.as_index(), Some(3));
        assert!(idx.is_index());
        assert!(!key.is_index());
    }

    #[test]
    fn step_display() {
        assert_eq!(PathStep::Key("a/b".into()).to_string(), "a/b");
        assert_eq!(PathStep::Index(12).to_string(), "12");
    }

    #[test]
    fn path_builder_mixes_steps() {
        let p = path([PathStep::from("a"), PathStep::from(0usize)]);
        assert_eq!(p.len(), 2);
        assert!(p[1].is_index());
    }
}
