//! Shared, immutable JSON-shaped values.
//!
//! Arrays and objects live behind an [`Arc`], so cloning a [`Value`] is cheap
//! and two clones of the same container are the *same* container:
//! [`Value::same`] is the reference-identity test the diff engine
//! short-circuits on and the patch applier preserves.
//!
//! Containers are copy-on-write. Mutating a shared container through
//! [`Value::object_mut`] / [`Value::array_mut`] clones it first, and the copy
//! is stamped with a fresh [`Revision`], so holders of the old value never
//! observe the change and the copy always reports a newer revision.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Number;
use tree_duplex_path::PathStep;

use crate::revision::{Revision, RevisionCell, Revisioned};

/// Ordered object map.
pub type Map = IndexMap<String, Value>;

/// A container body plus its revision stamp.
#[derive(Debug)]
pub struct Container<T> {
    items: T,
    revision: RevisionCell,
}

impl<T> Container<T> {
    pub fn new(items: T) -> Self {
        Self {
            items,
            revision: RevisionCell::new(),
        }
    }

    pub fn with_revision(items: T, revision: Revision) -> Self {
        Self {
            items,
            revision: RevisionCell::with(revision),
        }
    }

    pub fn revision(&self) -> Revision {
        self.revision.get()
    }

    pub fn set_revision(&self, revision: Revision) {
        self.revision.set(revision);
    }

    pub fn into_inner(self) -> T {
        self.items
    }
}

impl<T> Deref for Container<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.items
    }
}

impl<T> DerefMut for Container<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.items
    }
}

impl<T: Clone> Clone for Container<T> {
    fn clone(&self) -> Self {
        // `RevisionCell::clone` allocates a new revision.
        Self {
            items: self.items.clone(),
            revision: self.revision.clone(),
        }
    }
}

impl<T: PartialEq> PartialEq for Container<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

/// A JSON-shaped value with shared containers.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Container<Vec<Value>>>),
    Object(Arc<Container<Map>>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(Container::new(items)))
    }

    pub fn object(map: Map) -> Self {
        Value::Object(Arc::new(Container::new(map)))
    }

    pub fn string(s: &str) -> Self {
        Value::String(Arc::from(s))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Arrays and objects.
    pub fn is_container(&self) -> bool {
        self.is_array() || self.is_object()
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(&***map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Copy-on-write access to an array body.
    pub fn array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(&mut **Arc::make_mut(items)),
            _ => None,
        }
    }

    /// Copy-on-write access to an object body.
    pub fn object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Object(map) => Some(&mut **Arc::make_mut(map)),
            _ => None,
        }
    }

    /// A new container holding the same entries, stamped with a fresh
    /// revision. Scalars are returned as they are.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Array(items) => Value::Array(Arc::new((**items).clone())),
            Value::Object(map) => Value::Object(Arc::new((**map).clone())),
            other => other.clone(),
        }
    }

    /// Reference identity for containers, value equality for scalars.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                false
            }
            _ => self == other,
        }
    }

    /// Address of the shared container, usable as a side-table key while the
    /// value is alive. Scalars have no identity.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(Arc::as_ptr(items) as *const () as usize),
            Value::Object(map) => Some(Arc::as_ptr(map) as *const () as usize),
            _ => None,
        }
    }

    /// Looks up a single step. Keys that are canonical indices address array
    /// elements, and indices address object properties by their decimal name.
    pub fn get(&self, step: &PathStep) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(&*object_key(step)),
            Value::Array(items) => array_index(step).and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    pub fn get_path(&self, path: &[PathStep]) -> Option<&Value> {
        path.iter().try_fold(self, |current, step| current.get(step))
    }

    /// Copy-on-write navigation to a single step.
    pub fn get_mut(&mut self, step: &PathStep) -> Option<&mut Value> {
        match self {
            Value::Object(_) => {
                let key = object_key(step).into_owned();
                self.object_mut()?.get_mut(&key)
            }
            Value::Array(_) => {
                let idx = array_index(step)?;
                self.array_mut()?.get_mut(idx)
            }
            _ => None,
        }
    }

    /// Copy-on-write navigation along a path. Every container on the way is
    /// unshared, so only call this once the path is known to resolve.
    pub fn get_path_mut(&mut self, path: &[PathStep]) -> Option<&mut Value> {
        let mut current = self;
        for step in path {
            current = current.get_mut(step)?;
        }
        Some(current)
    }

    /// Number of direct children; zero for scalars.
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes to a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::from(self)
    }
}

/// Resolves a step against an array.
pub(crate) fn array_index(step: &PathStep) -> Option<usize> {
    match step {
        PathStep::Index(i) => Some(*i),
        PathStep::Key(k) if tree_duplex_path::is_valid_index(k) => k.parse().ok(),
        PathStep::Key(_) => None,
    }
}

/// Resolves a step against an object.
pub(crate) fn object_key(step: &PathStep) -> std::borrow::Cow<'_, str> {
    match step {
        PathStep::Key(k) => std::borrow::Cow::Borrowed(k.as_str()),
        PathStep::Index(i) => std::borrow::Cow::Owned(i.to_string()),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => {
                // Key order does not matter.
                Arc::ptr_eq(a, b)
                    || (a.len() == b.len()
                        && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v == w)))
            }
            _ => false,
        }
    }
}

impl Revisioned for Value {
    fn revision(&self) -> Option<Revision> {
        match self {
            Value::Array(items) => Some(items.revision()),
            Value::Object(map) => Some(map.revision()),
            _ => None,
        }
    }

    fn set_revision(&self, revision: Revision) -> bool {
        match self {
            Value::Array(items) => items.set_revision(revision),
            Value::Object(map) => map.set_revision(revision),
            _ => return false,
        }
        true
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

// ── Conversions ───────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(Arc::from(s)),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::object(map)
    }
}
