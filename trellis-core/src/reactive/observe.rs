//! Observable Value Graphs
//!
//! [`observe`] turns a JSON object or array into a reactive graph. Every
//! property and array slot gets its own dependency cell, created the first
//! time it is read inside a reactive context. Each container also has an
//! iteration cell that changes whenever keys are added or removed, so code
//! that walks a container re-runs on structural changes.
//!
//! Nested containers are wrapped lazily, on the first [`Observable::child`]
//! call or tracked read ([`Observable::get`], [`Observable::snapshot`]). Once
//! wrapped, the same handle is
//! returned on every access.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::rc::Rc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::cell::Dep;
use super::context::ReactiveContext;
use crate::error::{InvalidInput, Result};

/// Addresses one slot of an observable container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl From<&str> for Key {
    fn from(field: &str) -> Self {
        Key::Field(field.to_owned())
    }
}

impl From<String> for Key {
    fn from(field: String) -> Self {
        Key::Field(field)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(field) => write!(f, "{field:?}"),
            Key::Index(index) => write!(f, "[{index}]"),
        }
    }
}

enum Entry {
    Raw(Value),
    Observed(Observable),
}

impl Entry {
    fn to_value(&self) -> Value {
        match self {
            Entry::Raw(value) => value.clone(),
            Entry::Observed(child) => child.to_value(),
        }
    }

    /// Wrap a raw container in place and hand out its handle.
    fn observed(&mut self) -> Option<Observable> {
        match self {
            Entry::Observed(child) => Some(child.clone()),
            Entry::Raw(value) if value.is_object() || value.is_array() => {
                let child = Observable::wrap(value.take())?;
                *self = Entry::Observed(child.clone());
                Some(child)
            }
            Entry::Raw(_) => None,
        }
    }
}

/// What a tracked read of one slot found.
enum Slot {
    Nested(Observable),
    Plain(Value),
}

enum Shape {
    Object(IndexMap<String, Entry>),
    Array(Vec<Entry>),
}

struct Node {
    shape: RefCell<Shape>,
    cells: RefCell<HashMap<Key, Rc<Dep>>>,

    /// Changes whenever a key is added or removed.
    iterate: Dep,
}

/// A reactive handle to a JSON object or array.
///
/// Cloning the handle is cheap and yields the same underlying graph.
#[derive(Clone)]
pub struct Observable {
    node: Rc<Node>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A key of the wrong kind for the container it was used on.
fn key_mismatch(key: &Key) -> InvalidInput {
    match key {
        Key::Field(_) => InvalidInput::KeyKind { expected: "index" },
        Key::Index(_) => InvalidInput::KeyKind { expected: "field" },
    }
}

impl Observable {
    /// Wrap a container. Scalars yield `None`.
    fn wrap(value: Value) -> Option<Self> {
        let shape = match value {
            Value::Object(map) => Shape::Object(
                map.into_iter()
                    .map(|(field, value)| (field, Entry::Raw(value)))
                    .collect(),
            ),
            Value::Array(items) => Shape::Array(items.into_iter().map(Entry::Raw).collect()),
            _ => return None,
        };
        Some(Self {
            node: Rc::new(Node {
                shape: RefCell::new(shape),
                cells: RefCell::new(HashMap::new()),
                iterate: Dep::new(),
            }),
        })
    }

    fn track_key(&self, key: &Key) {
        if !ReactiveContext::is_active() {
            return;
        }
        let dep = {
            let mut cells = self.node.cells.borrow_mut();
            Rc::clone(cells.entry(key.clone()).or_insert_with(|| Rc::new(Dep::new())))
        };
        dep.track();
    }

    fn trigger_keys(&self, keys: impl IntoIterator<Item = Key>) {
        let deps: Vec<Rc<Dep>> = {
            let cells = self.node.cells.borrow();
            keys.into_iter()
                .filter_map(|key| cells.get(&key).cloned())
                .collect()
        };
        for dep in deps {
            dep.trigger();
        }
    }

    fn with_entry<R>(&self, key: &Key, f: impl FnOnce(&mut Entry) -> Option<R>) -> Option<R> {
        let mut shape = self.node.shape.borrow_mut();
        match (&mut *shape, key) {
            (Shape::Object(map), Key::Field(field)) => f(map.get_mut(field)?),
            (Shape::Array(items), Key::Index(index)) => f(items.get_mut(*index)?),
            _ => None,
        }
    }

    fn with_array<R>(&self, f: impl FnOnce(&mut Vec<Entry>) -> R) -> Result<R> {
        match &mut *self.node.shape.borrow_mut() {
            Shape::Array(items) => Ok(f(items)),
            Shape::Object(_) => Err(InvalidInput::KeyKind { expected: "field" }.into()),
        }
    }

    /// Read the value stored under `key`, tracking the slot.
    ///
    /// Nested containers are returned as plain values. Inside a reactive
    /// context they are read through [`snapshot`](Observable::snapshot), so
    /// writes made through a child handle re-run the reader.
    pub fn get(&self, key: impl Into<Key>) -> Option<Value> {
        let key = key.into();
        self.track_key(&key);
        if ReactiveContext::is_active() {
            let slot = self.with_entry(&key, |entry| {
                Some(match entry.observed() {
                    Some(child) => Slot::Nested(child),
                    None => Slot::Plain(entry.to_value()),
                })
            })?;
            return Some(match slot {
                Slot::Nested(child) => child.snapshot(),
                Slot::Plain(value) => value,
            });
        }
        match (&*self.node.shape.borrow(), &key) {
            (Shape::Object(map), Key::Field(field)) => map.get(field).map(Entry::to_value),
            (Shape::Array(items), Key::Index(index)) => items.get(*index).map(Entry::to_value),
            _ => None,
        }
    }

    /// Observable handle for a nested container, tracking the slot.
    ///
    /// Returns `None` when the slot is missing or holds a scalar.
    pub fn child(&self, key: impl Into<Key>) -> Option<Observable> {
        let key = key.into();
        self.track_key(&key);
        self.with_entry(&key, Entry::observed)
    }

    /// Write `value` under `key`. Returns whether anything changed.
    ///
    /// Writing a value equal to the current one is a no-op. On arrays,
    /// `index == len` appends.
    pub fn set(&self, key: impl Into<Key>, value: Value) -> Result<bool> {
        let key = key.into();
        let added = {
            let mut shape = self.node.shape.borrow_mut();
            match (&mut *shape, &key) {
                (Shape::Object(map), Key::Field(field)) => match map.get_mut(field) {
                    Some(entry) if entry.to_value() == value => return Ok(false),
                    Some(entry) => {
                        *entry = Entry::Raw(value);
                        false
                    }
                    None => {
                        map.insert(field.clone(), Entry::Raw(value));
                        true
                    }
                },
                (Shape::Array(items), Key::Index(index)) => {
                    let len = items.len();
                    match items.get_mut(*index) {
                        Some(entry) if entry.to_value() == value => return Ok(false),
                        Some(entry) => {
                            *entry = Entry::Raw(value);
                            false
                        }
                        None if *index == len => {
                            items.push(Entry::Raw(value));
                            true
                        }
                        None => {
                            return Err(InvalidInput::IndexOutOfBounds { index: *index, len }.into())
                        }
                    }
                }
                _ => return Err(key_mismatch(&key).into()),
            }
        };

        tracing::trace!(%key, added, "observable write");
        self.trigger_keys([key]);
        if added {
            self.node.iterate.trigger();
        }
        Ok(true)
    }

    /// Remove the slot under `key`, returning its value.
    ///
    /// Removing an array element shifts every later element down.
    pub fn remove(&self, key: impl Into<Key>) -> Result<Option<Value>> {
        let key = key.into();
        let (removed, affected) = {
            let mut shape = self.node.shape.borrow_mut();
            match (&mut *shape, &key) {
                (Shape::Object(map), Key::Field(field)) => {
                    (map.shift_remove(field).map(|e| e.to_value()), vec![key.clone()])
                }
                (Shape::Array(items), Key::Index(index)) => {
                    let len = items.len();
                    if *index >= len {
                        return Ok(None);
                    }
                    let removed = items.remove(*index).to_value();
                    (Some(removed), (*index..len).map(Key::Index).collect())
                }
                _ => return Err(key_mismatch(&key).into()),
            }
        };

        if removed.is_some() {
            self.trigger_keys(affected);
            self.node.iterate.trigger();
        }
        Ok(removed)
    }

    /// Number of keys or elements. Tracks the iteration cell.
    pub fn len(&self) -> usize {
        self.node.iterate.track();
        match &*self.node.shape.borrow() {
            Shape::Object(map) => map.len(),
            Shape::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in insertion order (objects) or index order (arrays).
    pub fn keys(&self) -> Vec<Key> {
        self.node.iterate.track();
        match &*self.node.shape.borrow() {
            Shape::Object(map) => map.keys().cloned().map(Key::Field).collect(),
            Shape::Array(items) => (0..items.len()).map(Key::Index).collect(),
        }
    }

    /// Append to an array.
    pub fn push(&self, value: Value) -> Result<()> {
        let index = self.with_array(|items| {
            items.push(Entry::Raw(value));
            items.len() - 1
        })?;
        self.trigger_keys([Key::Index(index)]);
        self.node.iterate.trigger();
        Ok(())
    }

    /// Remove the last element of an array.
    pub fn pop(&self) -> Result<Option<Value>> {
        let popped = self.with_array(|items| {
            let value = items.pop()?.to_value();
            Some((items.len(), value))
        })?;
        let Some((index, value)) = popped else {
            return Ok(None);
        };
        self.trigger_keys([Key::Index(index)]);
        self.node.iterate.trigger();
        Ok(Some(value))
    }

    /// Insert into an array at `index`, shifting later elements up.
    pub fn insert(&self, index: usize, value: Value) -> Result<()> {
        let len = self.with_array(|items| {
            let len = items.len();
            if index <= len {
                items.insert(index, Entry::Raw(value));
            }
            len
        })?;
        if index > len {
            return Err(InvalidInput::IndexOutOfBounds { index, len }.into());
        }
        self.trigger_keys((index..=len).map(Key::Index));
        self.node.iterate.trigger();
        Ok(())
    }

    /// Deep copy of the whole graph, tracking every slot along the way.
    ///
    /// Inside a reactive context nested containers are wrapped so their
    /// slots can be tracked too. Outside one this equals [`to_value`].
    ///
    /// [`to_value`]: Observable::to_value
    pub fn snapshot(&self) -> Value {
        if !ReactiveContext::is_active() {
            return self.to_value();
        }
        self.node.iterate.track();

        let children: Vec<(Key, Option<Observable>, Value)> = {
            let mut shape = self.node.shape.borrow_mut();
            match &mut *shape {
                Shape::Object(map) => map
                    .iter_mut()
                    .map(|(field, entry)| {
                        let child = entry.observed();
                        let raw = if child.is_some() { Value::Null } else { entry.to_value() };
                        (Key::Field(field.clone()), child, raw)
                    })
                    .collect(),
                Shape::Array(items) => items
                    .iter_mut()
                    .enumerate()
                    .map(|(index, entry)| {
                        let child = entry.observed();
                        let raw = if child.is_some() { Value::Null } else { entry.to_value() };
                        (Key::Index(index), child, raw)
                    })
                    .collect(),
            }
        };

        let is_object = matches!(&*self.node.shape.borrow(), Shape::Object(_));
        let mut object = Map::new();
        let mut array = Vec::new();
        for (key, child, raw) in children {
            self.track_key(&key);
            let value = match child {
                Some(child) => child.snapshot(),
                None => raw,
            };
            match key {
                Key::Field(field) => {
                    object.insert(field, value);
                }
                Key::Index(_) => array.push(value),
            }
        }

        if is_object {
            Value::Object(object)
        } else {
            Value::Array(array)
        }
    }

    /// Deep copy of the whole graph without tracking anything.
    pub fn to_value(&self) -> Value {
        match &*self.node.shape.borrow() {
            Shape::Object(map) => Value::Object(
                map.iter()
                    .map(|(field, entry)| (field.clone(), entry.to_value()))
                    .collect(),
            ),
            Shape::Array(items) => Value::Array(items.iter().map(Entry::to_value).collect()),
        }
    }

    /// Convert the current contents into a typed value. Untracked.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_value())
            .map_err(|err| InvalidInput::Serialize(err.to_string()).into())
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Observable) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Whether this container is an array.
    pub fn is_array(&self) -> bool {
        matches!(&*self.node.shape.borrow(), Shape::Array(_))
    }
}

impl PartialEq for Observable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Observable {}

impl Debug for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&self.to_value()).finish()
    }
}

/// Anything [`observe`] accepts.
pub trait IntoObservable {
    fn into_observable(self) -> Result<Observable>;
}

impl IntoObservable for Value {
    fn into_observable(self) -> Result<Observable> {
        let kind = kind_of(&self);
        Observable::wrap(self).ok_or_else(|| InvalidInput::NotAContainer { kind }.into())
    }
}

impl IntoObservable for Observable {
    fn into_observable(self) -> Result<Observable> {
        Ok(self)
    }
}

impl IntoObservable for &Observable {
    fn into_observable(self) -> Result<Observable> {
        Ok(self.clone())
    }
}

/// Make a JSON container observable.
///
/// Observing an existing [`Observable`] returns the same graph. Scalars are
/// rejected with [`InvalidInput::NotAContainer`].
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use trellis_core::observe;
///
/// let state = observe(json!({ "count": 1 })).unwrap();
/// assert!(state.set("count", json!(2)).unwrap());
/// assert!(!state.set("count", json!(2)).unwrap());
/// assert_eq!(state.get("count"), Some(json!(2)));
///
/// assert!(observe(json!(3)).is_err());
/// ```
pub fn observe(value: impl IntoObservable) -> Result<Observable> {
    value.into_observable()
}

/// Serialize `value` and observe the result.
pub fn observe_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Observable> {
    let value = serde_json::to_value(value).map_err(|err| InvalidInput::Serialize(err.to_string()))?;
    observe(value)
}
