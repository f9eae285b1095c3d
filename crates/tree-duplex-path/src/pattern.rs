//! Path patterns with wildcard steps.
//!
//! A pattern selects every concrete path of the same length whose steps equal
//! the pattern's literal steps, with `*` accepting any step. This is how a
//! caller says "the `tags` array inside every element of `items`":
//! `/items/*/tags`.

use std::fmt;

use crate::types::{Path, PathStep};
use crate::{escape_component, is_valid_index, parse_json_pointer};

/// A single step of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternStep {
    Step(PathStep),
    Any,
}

/// A path whose steps may be wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PathPattern {
    steps: Vec<PatternStep>,
}

impl PathPattern {
    /// The pattern matching only the root path.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(steps: Vec<PatternStep>) -> Self {
        Self { steps }
    }

    /// Parses a JSON Pointer in which a bare `*` component is a wildcard.
    /// Like [`parse_json_pointer`], a missing leading `/` is tolerated.
    ///
    /// ```
    /// use tree_duplex_path::{PathPattern, PathStep};
    ///
    /// let pattern = PathPattern::parse("/items/*/tags");
    /// assert!(pattern.matches(&[
    ///     PathStep::Key("items".into()),
    ///     PathStep::Index(4),
    ///     PathStep::Key("tags".into()),
    /// ]));
    /// ```
    pub fn parse(pointer: &str) -> Self {
        // `*` must be told apart from an escaped literal, so look at the raw
        // components before unescaping.
        let raw: Vec<&str> = if pointer.is_empty() {
            Vec::new()
        } else {
            pointer.strip_prefix('/').unwrap_or(pointer).split('/').collect()
        };
        let parsed = parse_json_pointer(pointer);
        let steps = raw
            .iter()
            .zip(parsed)
            .map(|(raw, step)| {
                if *raw == "*" {
                    PatternStep::Any
                } else {
                    PatternStep::Step(step)
                }
            })
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[PatternStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Exact-length match; wildcards accept any step. A numeric literal
    /// matches both the array index and the object key of the same spelling.
    pub fn matches(&self, path: &[PathStep]) -> bool {
        if self.steps.len() != path.len() {
            return false;
        }
        self.steps.iter().zip(path).all(|(pattern, step)| match pattern {
            PatternStep::Any => true,
            PatternStep::Step(s) => step_matches(s, step),
        })
    }
}

fn step_matches(literal: &PathStep, step: &PathStep) -> bool {
    match (literal, step) {
        (PathStep::Key(k), PathStep::Index(i)) | (PathStep::Index(i), PathStep::Key(k)) => {
            is_valid_index(k) && k.parse::<usize>().ok() == Some(*i)
        }
        _ => literal == step,
    }
}

impl From<Path> for PathPattern {
    fn from(path: Path) -> Self {
        Self {
            steps: path.into_iter().map(PatternStep::Step).collect(),
        }
    }
}

impl From<&str> for PathPattern {
    fn from(pointer: &str) -> Self {
        Self::parse(pointer)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            f.write_str("/")?;
            match step {
                PatternStep::Any => f.write_str("*")?,
                PatternStep::Step(s) => f.write_str(&escape_component(&s.to_string()))?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PathStep {
        PathStep::Key(k.into())
    }

    #[test]
    fn root_matches_only_root() {
        let pattern = PathPattern::root();
        assert!(pattern.matches(&[]));
        assert!(!pattern.matches(&[key("a")]));
    }

    #[test]
    fn literal_steps_must_be_equal() {
        let pattern = PathPattern::parse("/items");
        assert!(pattern.matches(&[key("items")]));
        assert!(!pattern.matches(&[key("other")]));
        assert!(!pattern.matches(&[key("items"), PathStep::Index(0)]));
    }

    #[test]
    fn wildcard_accepts_any_index() {
        let pattern = PathPattern::parse("/*/children");
        assert!(pattern.matches(&[PathStep::Index(0), key("children")]));
        assert!(pattern.matches(&[PathStep::Index(17), key("children")]));
        assert!(!pattern.matches(&[PathStep::Index(17), key("parent")]));
    }

    #[test]
    fn numeric_literals_match_indices_and_keys() {
        let pattern = PathPattern::parse("/list/2");
        assert!(pattern.matches(&[key("list"), PathStep::Index(2)]));
        assert!(pattern.matches(&[key("list"), key("2")]));
        assert!(!pattern.matches(&[key("list"), key("02")]));
        assert!(!pattern.matches(&[key("list"), PathStep::Index(3)]));

        let years = PathPattern::from(vec![key("years"), key("2024")]);
        assert!(years.matches(&[key("years"), PathStep::Index(2024)]));
    }

    #[test]
    fn leading_slash_is_optional() {
        assert_eq!(PathPattern::parse("todos"), PathPattern::parse("/todos"));
        assert_eq!(PathPattern::parse("items/*"), PathPattern::parse("/items/*"));
        let pattern = PathPattern::parse("é/x");
        assert!(pattern.matches(&[key("é"), key("x")]));
    }

    #[test]
    fn display_round_trips() {
        let pattern = PathPattern::parse("/items/*/a~1b");
        assert_eq!(pattern.to_string(), "/items/*/a~1b");
    }

    #[test]
    fn from_concrete_path() {
        let pattern = PathPattern::from(vec![key("a"), PathStep::Index(1)]);
        assert!(pattern.matches(&[key("a"), PathStep::Index(1)]));
        assert_eq!(pattern.len(), 2);
    }
}
