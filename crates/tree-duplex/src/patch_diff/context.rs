//! Array contexts: which property identifies the elements of which array.

use std::cell::RefCell;
use std::sync::Arc;

use tree_duplex_path::{PathPattern, PathStep};

use crate::value::Value;

/// Identity of an array element, taken from its key property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ItemKey {
    Text(Arc<str>),
    /// Any non-string key, by its JSON text.
    Json(String),
}

impl ItemKey {
    /// Reads `key` off an object `item`. Scalars are their own key; arrays
    /// and objects lacking the property have no identity.
    pub fn of(item: &Value, key: &str) -> Option<ItemKey> {
        let id = match item {
            Value::Object(_) => item.get_key(key)?,
            Value::Array(_) => return None,
            scalar => scalar,
        };
        match id {
            Value::String(s) => Some(ItemKey::Text(s.clone())),
            other => Some(ItemKey::Json(other.to_string())),
        }
    }
}

#[derive(Debug)]
struct KeyCache {
    source: Value,
    keys: Vec<Option<ItemKey>>,
}

/// Declares that arrays at paths matching `pattern` are matched by the
/// element property `key` when diffed.
#[derive(Debug)]
pub struct ArrayContext {
    pattern: PathPattern,
    key: String,
    cache: RefCell<Option<KeyCache>>,
}

impl ArrayContext {
    pub fn new(pattern: impl Into<PathPattern>, key: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            key: key.into(),
            cache: RefCell::new(None),
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn matches(&self, path: &[PathStep]) -> bool {
        self.pattern.matches(path)
    }

    /// Keys of `items`. The keys of the last array passed to
    /// [`ArrayContext::remember`] are reused when `array` is that same array.
    pub(crate) fn keys_of(&self, array: &Value) -> Vec<Option<ItemKey>> {
        if let Some(cache) = self.cache.borrow().as_ref() {
            if cache.source.same(array) {
                return cache.keys.clone();
            }
        }
        self.compute(array)
    }

    /// Remembers the keys of `array`, which is the next diff's old side.
    pub(crate) fn remember(&self, array: &Value, keys: Vec<Option<ItemKey>>) {
        *self.cache.borrow_mut() = Some(KeyCache {
            source: array.clone(),
            keys,
        });
    }

    pub(crate) fn compute(&self, array: &Value) -> Vec<Option<ItemKey>> {
        array
            .as_array()
            .unwrap_or_default()
            .iter()
            .map(|item| ItemKey::of(item, &self.key))
            .collect()
    }
}

impl Clone for ArrayContext {
    fn clone(&self) -> Self {
        Self::new(self.pattern.clone(), self.key.clone())
    }
}

/// The set of array contexts a diff consults.
#[derive(Debug, Clone, Default)]
pub struct ArrayContexts {
    contexts: Vec<ArrayContext>,
}

impl ArrayContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`ArrayContexts::push`].
    ///
    /// ```
    /// use tree_duplex::patch_diff::ArrayContexts;
    ///
    /// let contexts = ArrayContexts::new()
    ///     .with("/todos", "id")
    ///     .with("/boards/*/cards", "uuid");
    /// assert_eq!(contexts.len(), 2);
    /// ```
    pub fn with(mut self, pattern: impl Into<PathPattern>, key: impl Into<String>) -> Self {
        self.push(ArrayContext::new(pattern, key));
        self
    }

    pub fn push(&mut self, context: ArrayContext) {
        self.contexts.push(context);
    }

    /// First context whose pattern matches `path`.
    pub fn find(&self, path: &[PathStep]) -> Option<&ArrayContext> {
        self.contexts.iter().find(|c| c.matches(path))
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl FromIterator<ArrayContext> for ArrayContexts {
    fn from_iter<I: IntoIterator<Item = ArrayContext>>(iter: I) -> Self {
        Self {
            contexts: iter.into_iter().collect(),
        }
    }
}
