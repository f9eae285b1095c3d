//! Revisioned mutable wrappers.
//!
//! A [`MutableStore`] owns wrapper nodes around shared container values. Each
//! node keeps the container it currently stands for (its *original*), a
//! revision, and the listeners to notify when it changes. Reading a container
//! property through [`MutableStore::get`] wraps it lazily as a child node with
//! the parent registered as a listener, so a change anywhere below a node
//! bubbles up: every ancestor gets a fresh revision and its original is
//! rebuilt to reference the changed child.
//!
//! Originals are [`Value`]s, so every mutation is copy-on-write. Snapshots
//! handed out by [`MutableStore::freeze`] (or earlier originals) are never
//! changed after the fact, and sub-trees that were not touched keep their
//! identity from one snapshot to the next.
//!
//! There is exactly one node per original container. Wrapping a container
//! that already has a node returns that node.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};
use tree_duplex_path::PathStep;

use crate::revision::{next_revision, Revision, Revisioned};
use crate::value::{array_index, object_key, Value};

// ── Identifiers & errors ──────────────────────────────────────────────────

/// Handle of a node in a [`MutableStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle of a registered listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutableError {
    #[error("only arrays and objects can be wrapped")]
    NotContainer,
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("node {0} is not an array")]
    NotArray(NodeId),
    #[error("'{key}' does not address an element of node {node}")]
    InvalidKey { node: NodeId, key: String },
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

// ── Entries & inputs ──────────────────────────────────────────────────────

/// What a property read yields: a wrapped container or a plain scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Node(NodeId),
    Value(Value),
}

impl Entry {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Entry::Node(id) => Some(*id),
            Entry::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Entry::Node(_) => None,
            Entry::Value(v) => Some(v),
        }
    }
}

/// What a property write accepts. A node is stored as its current original.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Node(NodeId),
    Value(Value),
}

impl From<Value> for Input {
    fn from(v: Value) -> Self {
        Input::Value(v)
    }
}

impl From<NodeId> for Input {
    fn from(id: NodeId) -> Self {
        Input::Node(id)
    }
}

impl From<Entry> for Input {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Node(id) => Input::Node(id),
            Entry::Value(v) => Input::Value(v),
        }
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────────

enum Listener {
    Parent(NodeId),
    Callback(Box<dyn FnMut()>),
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::Parent(id) => f.debug_tuple("Parent").field(id).finish(),
            Listener::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

#[derive(Debug)]
struct Node {
    revision: Revision,
    original: Value,
    listeners: Vec<(ListenerId, Listener)>,
    /// Wrapped children by property name (decimal index for arrays).
    children: HashMap<String, NodeId>,
    frozen: Option<Value>,
}

impl Node {
    fn has_parent(&self, parent: NodeId) -> bool {
        self.listeners
            .iter()
            .any(|(_, l)| matches!(l, Listener::Parent(p) if *p == parent))
    }

    fn remove_parent(&mut self, parent: NodeId) {
        self.listeners
            .retain(|(_, l)| !matches!(l, Listener::Parent(p) if *p == parent));
    }
}

/// Arena of mutable wrapper nodes.
#[derive(Debug, Default)]
pub struct MutableStore {
    nodes: HashMap<NodeId, Node>,
    /// Original container identity → node.
    by_original: HashMap<usize, NodeId>,
    next_node: u64,
    next_listener: u64,
}

type Result<T> = std::result::Result<T, MutableError>;

impl MutableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a container. Returns the existing node if `value` is already the
    /// original of one.
    pub fn wrap(&mut self, value: Value) -> Result<NodeId> {
        let identity = value.identity().ok_or(MutableError::NotContainer)?;
        if let Some(&id) = self.by_original.get(&identity) {
            return Ok(id);
        }
        self.next_node += 1;
        let id = NodeId(self.next_node);
        let revision = value.revision().unwrap_or_else(next_revision);
        self.nodes.insert(
            id,
            Node {
                revision,
                original: value,
                listeners: Vec::new(),
                children: HashMap::new(),
                frozen: None,
            },
        );
        self.by_original.insert(identity, id);
        trace!(node = %id, "wrapped container");
        Ok(id)
    }

    /// The node currently wrapping `value`, if any.
    pub fn node_of(&self, value: &Value) -> Option<NodeId> {
        value
            .identity()
            .and_then(|identity| self.by_original.get(&identity).copied())
    }

    pub fn is_mutable(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(MutableError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(MutableError::UnknownNode(id))
    }

    // ── Meta operations ───────────────────────────────────────────────────

    pub fn is_array(&self, id: NodeId) -> Result<bool> {
        Ok(self.node(id)?.original.is_array())
    }

    pub fn revision(&self, id: NodeId) -> Result<Revision> {
        Ok(self.node(id)?.revision)
    }

    pub fn set_revision(&mut self, id: NodeId, revision: Revision) -> Result<()> {
        let node = self.node_mut(id)?;
        node.revision = revision;
        node.frozen = None;
        Ok(())
    }

    /// The container the node currently stands for.
    pub fn original(&self, id: NodeId) -> Result<Value> {
        Ok(self.node(id)?.original.clone())
    }

    /// Points the node at another container. Cached children are detached.
    pub fn set_original(&mut self, id: NodeId, value: Value) -> Result<()> {
        let identity = value.identity().ok_or(MutableError::NotContainer)?;
        if let Some(&other) = self.by_original.get(&identity) {
            if other != id {
                debug!(node = %id, other = %other, "container already wrapped by another node");
            }
        }
        let children: Vec<NodeId> = {
            let node = self.node_mut(id)?;
            node.children.drain().map(|(_, child)| child).collect()
        };
        for child in children {
            self.unlink(id, child);
        }
        let node = self.node_mut(id)?;
        let previous = node.original.identity();
        node.original = value;
        self.notify(id, previous);
        Ok(())
    }

    /// Registers a callback run after every change of the node (or of any
    /// node below it).
    pub fn add_listener(&mut self, id: NodeId, callback: impl FnMut() + 'static) -> Result<ListenerId> {
        self.node(id)?;
        let listener = self.next_listener_id();
        self.node_mut(id)?
            .listeners
            .push((listener, Listener::Callback(Box::new(callback))));
        Ok(listener)
    }

    pub fn remove_listener(&mut self, id: NodeId, listener: ListenerId) -> Result<bool> {
        let node = self.node_mut(id)?;
        let before = node.listeners.len();
        node.listeners.retain(|(l, _)| *l != listener);
        Ok(node.listeners.len() != before)
    }

    fn next_listener_id(&mut self) -> ListenerId {
        self.next_listener += 1;
        ListenerId(self.next_listener)
    }

    // ── Property access ───────────────────────────────────────────────────

    /// Reads a property. Containers come back wrapped, as the same child node
    /// on every read.
    pub fn get(&mut self, id: NodeId, key: impl Into<PathStep>) -> Result<Option<Entry>> {
        let step = key.into();
        let node = self.node(id)?;
        let Some(value) = node.original.get(&step).cloned() else {
            return Ok(None);
        };
        let name = canonical_name(&node.original, &step);
        if let Some(&child) = node.children.get(&name) {
            return Ok(Some(Entry::Node(child)));
        }
        if !value.is_container() {
            return Ok(Some(Entry::Value(value)));
        }
        let child = self.wrap(value)?;
        self.attach(id, child, name);
        Ok(Some(Entry::Node(child)))
    }

    /// Writes a property. Setting the index one past the end of an array
    /// appends.
    pub fn set(&mut self, id: NodeId, key: impl Into<PathStep>, input: impl Into<Input>) -> Result<()> {
        let step = key.into();
        let (value, attached) = self.resolve(input.into())?;
        let node = self.node(id)?;
        let index = match &node.original {
            Value::Array(items) => {
                let index = array_index(&step).ok_or_else(|| MutableError::InvalidKey {
                    node: id,
                    key: step.to_string(),
                })?;
                if index > items.len() {
                    return Err(MutableError::IndexOutOfBounds {
                        index,
                        len: items.len(),
                    });
                }
                Some(index)
            }
            _ => None,
        };
        let name = canonical_name(&node.original, &step);
        if node.children.get(&name) != attached.as_ref() {
            self.detach(id, &name);
        }

        let node = self.node_mut(id)?;
        let previous = node.original.identity();
        match index {
            Some(i) => {
                if let Some(items) = node.original.array_mut() {
                    if i == items.len() {
                        items.push(value);
                    } else {
                        items[i] = value;
                    }
                }
            }
            None => {
                if let Some(map) = node.original.object_mut() {
                    map.insert(name.clone(), value);
                }
            }
        }
        if let Some(child) = attached {
            self.attach(id, child, name);
        }
        self.notify(id, previous);
        Ok(())
    }

    /// Deletes a property. Array elements become `null` (the array keeps its
    /// length). Returns whether anything was there.
    pub fn delete(&mut self, id: NodeId, key: impl Into<PathStep>) -> Result<bool> {
        let step = key.into();
        let node = self.node(id)?;
        if node.original.get(&step).is_none() {
            return Ok(false);
        }
        let name = canonical_name(&node.original, &step);
        self.detach(id, &name);

        let node = self.node_mut(id)?;
        let previous = node.original.identity();
        if node.original.is_array() {
            let index = array_index(&step).unwrap_or(usize::MAX);
            if let Some(slot) = node.original.array_mut().and_then(|items| items.get_mut(index)) {
                *slot = Value::Null;
            }
        } else if let Some(map) = node.original.object_mut() {
            map.shift_remove(&name);
        }
        self.notify(id, previous);
        Ok(true)
    }

    fn resolve(&self, input: Input) -> Result<(Value, Option<NodeId>)> {
        match input {
            Input::Node(id) => Ok((self.node(id)?.original.clone(), Some(id))),
            Input::Value(v) => Ok((v, None)),
        }
    }

    // ── Array mutation ────────────────────────────────────────────────────

    /// Length of an array node.
    pub fn length(&self, id: NodeId) -> Result<usize> {
        match &self.node(id)?.original {
            Value::Array(items) => Ok(items.len()),
            _ => Err(MutableError::NotArray(id)),
        }
    }

    /// Appends items, returning the new length.
    pub fn push(&mut self, id: NodeId, items: impl IntoIterator<Item = Input>) -> Result<usize> {
        let len = self.length(id)?;
        self.splice(id, len, 0, items.into_iter().collect())?;
        self.length(id)
    }

    pub fn pop(&mut self, id: NodeId) -> Result<Option<Value>> {
        let len = self.length(id)?;
        if len == 0 {
            return Ok(None);
        }
        Ok(self.splice(id, len - 1, 1, Vec::new())?.pop())
    }

    pub fn insert(&mut self, id: NodeId, index: usize, input: impl Into<Input>) -> Result<()> {
        let len = self.length(id)?;
        if index > len {
            return Err(MutableError::IndexOutOfBounds { index, len });
        }
        self.splice(id, index, 0, vec![input.into()])?;
        Ok(())
    }

    pub fn remove_at(&mut self, id: NodeId, index: usize) -> Result<Value> {
        let len = self.length(id)?;
        if index >= len {
            return Err(MutableError::IndexOutOfBounds { index, len });
        }
        let mut removed = self.splice(id, index, 1, Vec::new())?;
        Ok(removed.pop().unwrap_or_default())
    }

    pub fn clear(&mut self, id: NodeId) -> Result<()> {
        let len = self.length(id)?;
        self.splice(id, 0, len, Vec::new())?;
        Ok(())
    }

    /// Removes `delete_count` elements at `start` and inserts `items` in
    /// their place. `start` and `delete_count` are clamped to the array.
    /// Returns the removed elements as plain values.
    pub fn splice(
        &mut self,
        id: NodeId,
        start: usize,
        delete_count: usize,
        items: Vec<Input>,
    ) -> Result<Vec<Value>> {
        let len = self.length(id)?;
        let start = start.min(len);
        let end = start + delete_count.min(len - start);
        let mut values = Vec::with_capacity(items.len());
        let mut attached = Vec::new();
        for (k, input) in items.into_iter().enumerate() {
            let (value, node) = self.resolve(input)?;
            if let Some(node) = node {
                attached.push((start + k, node));
            }
            values.push(value);
        }
        if start == end && values.is_empty() {
            return Ok(Vec::new());
        }
        let inserted = values.len();

        let node = self.node_mut(id)?;
        let previous = node.original.identity();
        let removed: Vec<Value> = match node.original.array_mut() {
            Some(elements) => elements.splice(start..end, values).collect(),
            None => return Err(MutableError::NotArray(id)),
        };
        let dropped = remap_children(&mut node.children, |i| {
            if i < start {
                Some(i)
            } else if i < end {
                None
            } else {
                Some(i - (end - start) + inserted)
            }
        });
        // Incoming nodes are cached first so that one moved within this
        // array is still linked when its old slot is unlinked.
        for (i, child) in attached {
            self.attach(id, child, i.to_string());
        }
        for child in dropped {
            self.unlink(id, child);
        }
        self.notify(id, previous);
        Ok(removed)
    }

    pub fn reverse(&mut self, id: NodeId) -> Result<()> {
        let len = self.length(id)?;
        if len < 2 {
            return Ok(());
        }
        let node = self.node_mut(id)?;
        let previous = node.original.identity();
        if let Some(items) = node.original.array_mut() {
            items.reverse();
        }
        remap_children(&mut node.children, |i| Some(len - 1 - i));
        self.notify(id, previous);
        Ok(())
    }

    // ── Array derivation ──────────────────────────────────────────────────

    fn elements(&mut self, id: NodeId) -> Result<Vec<(Entry, Value)>> {
        let len = self.length(id)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let entry = self.get(id, i)?.unwrap_or(Entry::Value(Value::Null));
            let value = match &entry {
                Entry::Node(child) => self.original(*child)?,
                Entry::Value(v) => v.clone(),
            };
            out.push((entry, value));
        }
        Ok(out)
    }

    /// New array node of `f` applied to every element.
    pub fn map(&mut self, id: NodeId, mut f: impl FnMut(Entry, &Value) -> Input) -> Result<NodeId> {
        let mut items = Vec::new();
        for (entry, value) in self.elements(id)? {
            let input = f(entry, &value);
            items.push(self.resolve(input)?.0);
        }
        self.wrap(Value::array(items))
    }

    /// New array node of the elements `keep` accepts. Kept containers are
    /// shared with the source, so they stay the same nodes.
    pub fn filter(&mut self, id: NodeId, mut keep: impl FnMut(&Entry, &Value) -> bool) -> Result<NodeId> {
        let items = self
            .elements(id)?
            .into_iter()
            .filter(|(entry, value)| keep(entry, value))
            .map(|(_, value)| value)
            .collect();
        self.wrap(Value::array(items))
    }

    pub fn flat_map(&mut self, id: NodeId, mut f: impl FnMut(Entry, &Value) -> Vec<Input>) -> Result<NodeId> {
        let mut items = Vec::new();
        for (entry, value) in self.elements(id)? {
            for input in f(entry, &value) {
                items.push(self.resolve(input)?.0);
            }
        }
        self.wrap(Value::array(items))
    }

    /// New array node with nested arrays flattened `depth` levels deep.
    pub fn flat(&mut self, id: NodeId, depth: usize) -> Result<NodeId> {
        let original = self.original(id)?;
        let source = original.as_array().ok_or(MutableError::NotArray(id))?;
        let mut items = Vec::new();
        flatten_into(&mut items, source, depth);
        self.wrap(Value::array(items))
    }

    // ── Change propagation ────────────────────────────────────────────────

    /// Marks the node changed without touching its content.
    pub fn changed(&mut self, id: NodeId) -> Result<Revision> {
        let previous = self.node(id)?.original.identity();
        self.notify(id, previous);
        self.revision(id)
    }

    /// Bumps `id` and every ancestor once, syncs each ancestor's original to
    /// the changed child, then runs callbacks.
    fn notify(&mut self, id: NodeId, previous: Option<usize>) {
        let mut queue = VecDeque::from([(id, previous)]);
        let mut seen = HashSet::new();
        let mut callbacks = Vec::new();
        while let Some((node_id, previous)) = queue.pop_front() {
            if !seen.insert(node_id) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&node_id) else {
                continue;
            };
            node.revision = next_revision();
            node.frozen = None;
            trace!(node = %node_id, revision = %node.revision, "node changed");
            let current = node.original.clone();
            let mut parents = Vec::new();
            for (listener, kind) in &node.listeners {
                match kind {
                    Listener::Parent(p) => parents.push(*p),
                    Listener::Callback(_) => callbacks.push((node_id, *listener)),
                }
            }

            let moved = previous != current.identity();
            if moved {
                if let Some(prev) = previous {
                    if self.by_original.get(&prev) == Some(&node_id) {
                        self.by_original.remove(&prev);
                    }
                }
                if let Some(cur) = current.identity() {
                    self.by_original.insert(cur, node_id);
                }
            }
            for parent in parents {
                let Some(parent_node) = self.nodes.get_mut(&parent) else {
                    continue;
                };
                let before = parent_node.original.identity();
                if let (true, Some(prev)) = (moved, previous) {
                    replace_entries(&mut parent_node.original, prev, &current);
                }
                queue.push_back((parent, before));
            }
        }

        for (node_id, listener) in callbacks {
            let callback = self
                .nodes
                .get_mut(&node_id)
                .and_then(|n| n.listeners.iter_mut().find(|(l, _)| *l == listener));
            if let Some((_, Listener::Callback(f))) = callback {
                f();
            }
        }
    }

    // ── Snapshots ─────────────────────────────────────────────────────────

    /// Plain snapshot of the node, stamped with the node's revision. Cached
    /// until the next change, and unchanged children come back as the same
    /// containers as in the previous snapshot.
    pub fn freeze(&mut self, id: NodeId) -> Result<Value> {
        let node = self.node(id)?;
        if let Some(frozen) = &node.frozen {
            return Ok(frozen.clone());
        }
        let children: Vec<NodeId> = node.children.values().copied().collect();
        for child in children {
            self.freeze(child)?;
        }
        let node = self.node_mut(id)?;
        let snapshot = node.original.clone();
        snapshot.set_revision(node.revision);
        node.frozen = Some(snapshot.clone());
        Ok(snapshot)
    }

    // ── Lifetime ──────────────────────────────────────────────────────────

    /// Drops a node, its parents' references to it, and every child that is
    /// left without listeners.
    pub fn release(&mut self, id: NodeId) -> Result<()> {
        let parents: Vec<NodeId> = self
            .node(id)?
            .listeners
            .iter()
            .filter_map(|(_, l)| match l {
                Listener::Parent(p) => Some(*p),
                Listener::Callback(_) => None,
            })
            .collect();
        for parent in parents {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.retain(|_, child| *child != id);
            }
        }
        self.drop_node(id);
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, name: String) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.insert(name, child);
        }
        let listener = self.next_listener_id();
        if let Some(node) = self.nodes.get_mut(&child) {
            if !node.has_parent(parent) {
                node.listeners.push((listener, Listener::Parent(parent)));
            }
        }
    }

    fn detach(&mut self, parent: NodeId, name: &str) {
        let child = self
            .nodes
            .get_mut(&parent)
            .and_then(|node| node.children.remove(name));
        if let Some(child) = child {
            self.unlink(parent, child);
        }
    }

    /// Forgets `parent` as a listener of `child` unless `parent` still caches
    /// it under another name.
    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        let still_cached = self
            .nodes
            .get(&parent)
            .is_some_and(|node| node.children.values().any(|c| *c == child));
        if still_cached {
            return;
        }
        let Some(node) = self.nodes.get_mut(&child) else {
            return;
        };
        node.remove_parent(parent);
        if node.listeners.is_empty() {
            self.drop_node(child);
        }
    }

    fn drop_node(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.remove(&id) else {
                continue;
            };
            if let Some(identity) = node.original.identity() {
                if self.by_original.get(&identity) == Some(&id) {
                    self.by_original.remove(&identity);
                }
            }
            debug!(node = %id, "released node");
            for child in node.children.into_values() {
                if let Some(child_node) = self.nodes.get_mut(&child) {
                    child_node.remove_parent(id);
                    if child_node.listeners.is_empty() {
                        stack.push(child);
                    }
                }
            }
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────

/// Child cache name for `step`: decimal index for arrays, key for objects.
fn canonical_name(container: &Value, step: &PathStep) -> String {
    match (container, array_index(step)) {
        (Value::Array(_), Some(i)) => i.to_string(),
        _ => object_key(step).into_owned(),
    }
}

/// Renumbers array children; those mapped to `None` are returned.
fn remap_children(children: &mut HashMap<String, NodeId>, f: impl Fn(usize) -> Option<usize>) -> Vec<NodeId> {
    let mut dropped = Vec::new();
    for (name, child) in std::mem::take(children) {
        match name.parse::<usize>().ok().and_then(&f) {
            Some(i) => {
                children.insert(i.to_string(), child);
            }
            None => dropped.push(child),
        }
    }
    dropped
}

/// Points every entry of `container` that is the container `previous` at
/// `current` instead.
fn replace_entries(container: &mut Value, previous: usize, current: &Value) {
    let hit = |v: &Value| v.identity() == Some(previous);
    let found = match &*container {
        Value::Array(items) => items.iter().any(hit),
        Value::Object(map) => map.values().any(hit),
        _ => false,
    };
    if !found {
        return;
    }
    if let Some(items) = container.array_mut() {
        for item in items.iter_mut() {
            if hit(item) {
                *item = current.clone();
            }
        }
    } else if let Some(map) = container.object_mut() {
        for value in map.values_mut() {
            if hit(value) {
                *value = current.clone();
            }
        }
    }
}

fn flatten_into(out: &mut Vec<Value>, items: &[Value], depth: usize) {
    for item in items {
        match item.as_array() {
            Some(inner) if depth > 0 => flatten_into(out, inner, depth - 1),
            _ => out.push(item.clone()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
