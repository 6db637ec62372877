use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("an item with the identifier {0} already exists")]
    DuplicateIdentifier(String),
    #[error("invalid item: {0}")]
    InvalidItem(String),
    #[error("invalid seed data: {0}")]
    InvalidData(String),
}

/// Returns the textual form of an identifier, so `1` and `"1"` address the same item.
pub(crate) fn identifier_to_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An ordered list of JSON objects, each carrying a unique identifier field.
#[derive(Debug, Clone)]
pub struct Collection {
    identifier_name: String,
    items: Vec<Map<String, Value>>,
}

impl Collection {
    pub fn new(identifier_name: &str) -> Self {
        Self {
            identifier_name: identifier_name.to_string(),
            items: Vec::new(),
        }
    }

    pub fn with_items(identifier_name: &str, items: Vec<Value>) -> Result<Self, Error> {
        let mut collection = Self::new(identifier_name);
        for item in items {
            collection.add_one(item)?;
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_all(&self) -> Vec<Value> {
        self.items.iter().cloned().map(Value::Object).collect()
    }

    pub fn get_one(&self, id: &str) -> Option<Value> {
        self.position(id)
            .map(|idx| Value::Object(self.items[idx].clone()))
    }

    /// Adds an item. Items without an identifier get the next numeric one.
    pub fn add_one(&mut self, item: Value) -> Result<Value, Error> {
        let mut item = match item {
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidItem(format!(
                    "expected a JSON object but got {}",
                    other
                )))
            }
        };

        match item.get(&self.identifier_name) {
            None | Some(Value::Null) => {
                let next_id = self.next_id()?;
                item.insert(self.identifier_name.clone(), next_id);
            }
            Some(id) => {
                let id = identifier_to_string(id).ok_or_else(|| {
                    Error::InvalidItem(format!(
                        "identifier '{}' must be a string or a number",
                        self.identifier_name
                    ))
                })?;
                if self.position(&id).is_some() {
                    return Err(Error::DuplicateIdentifier(id));
                }
            }
        }

        self.items.push(item.clone());
        Ok(Value::Object(item))
    }

    /// Shallow-merges `patch` into the item. The identifier never changes.
    pub fn update_one(&mut self, id: &str, patch: Value) -> Result<Option<Value>, Error> {
        let patch = into_object(patch)?;

        let idx = match self.position(id) {
            None => return Ok(None),
            Some(idx) => idx,
        };

        let item = &mut self.items[idx];
        for (key, value) in patch {
            if key != self.identifier_name {
                item.insert(key, value);
            }
        }

        Ok(Some(Value::Object(item.clone())))
    }

    pub fn remove_one(&mut self, id: &str) -> Option<Value> {
        self.position(id)
            .map(|idx| Value::Object(self.items.remove(idx)))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| {
            item.get(&self.identifier_name)
                .and_then(identifier_to_string)
                .map_or(false, |item_id| item_id == id)
        })
    }

    fn next_id(&self) -> Result<Value, Error> {
        let max = self
            .items
            .iter()
            .filter_map(|item| item.get(&self.identifier_name))
            .filter_map(Value::as_i64)
            .max();

        match max {
            None => Ok(Value::from(0)),
            Some(max) => max.checked_add(1).map(Value::from).ok_or_else(|| {
                Error::InvalidItem(format!(
                    "cannot generate an identifier after {}",
                    max
                ))
            }),
        }
    }
}

fn into_object(value: Value) -> Result<Map<String, Value>, Error> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::InvalidItem(format!(
            "expected a JSON object but got {}",
            other
        ))),
    }
}

pub struct RestState {
    identifier_name: String,
    pub collections: BTreeMap<String, Collection>,
    pub singles: BTreeMap<String, Map<String, Value>>,
}

impl RestState {
    pub fn new(identifier_name: &str) -> Self {
        RestState {
            identifier_name: identifier_name.to_string(),
            collections: BTreeMap::new(),
            singles: BTreeMap::new(),
        }
    }
}

pub(crate) trait StateManager {
    fn has_collection(&self, name: &str) -> bool;
    fn has_single(&self, name: &str) -> bool;

    fn add_collection(&self, name: &str, items: Vec<Value>) -> Result<(), Error>;
    fn get_all(&self, name: &str) -> Option<Vec<Value>>;
    fn get_one(&self, name: &str, id: &str) -> Option<Value>;
    fn add_one(&self, name: &str, item: Value) -> Result<Value, Error>;
    fn update_one(&self, name: &str, id: &str, patch: Value) -> Result<Option<Value>, Error>;
    fn remove_one(&self, name: &str, id: &str) -> Option<Value>;

    fn add_single(&self, name: &str, value: Value) -> Result<(), Error>;
    fn get_single(&self, name: &str) -> Option<Value>;
    fn update_single(&self, name: &str, patch: Value) -> Result<Option<Value>, Error>;
}

pub struct RestStateManager {
    identifier_name: String,
    state: Mutex<RestState>,
}

impl RestStateManager {
    pub fn new(identifier_name: &str) -> Self {
        Self {
            identifier_name: identifier_name.to_string(),
            state: Mutex::new(RestState::new(identifier_name)),
        }
    }

    /// Seeds the state from a JSON object: arrays become collections, objects become
    /// single resources.
    pub fn from_data(identifier_name: &str, data: Option<&Value>) -> Result<Self, Error> {
        let manager = Self::new(identifier_name);

        let data = match data {
            None | Some(Value::Null) => return Ok(manager),
            Some(Value::Object(data)) => data,
            Some(other) => {
                return Err(Error::InvalidData(format!(
                    "expected a JSON object but got {}",
                    other
                )))
            }
        };

        for (name, value) in data {
            match value {
                Value::Array(items) => manager.add_collection(name, items.clone())?,
                Value::Object(_) => manager.add_single(name, value.clone())?,
                other => {
                    return Err(Error::InvalidData(format!(
                        "'{}' must be an array or an object but is {}",
                        name, other
                    )))
                }
            }
        }

        Ok(manager)
    }

    pub fn identifier_name(&self) -> &str {
        &self.identifier_name
    }

    fn lock(&self) -> MutexGuard<'_, RestState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateManager for RestStateManager {
    fn has_collection(&self, name: &str) -> bool {
        self.lock().collections.contains_key(name)
    }

    fn has_single(&self, name: &str) -> bool {
        self.lock().singles.contains_key(name)
    }

    fn add_collection(&self, name: &str, items: Vec<Value>) -> Result<(), Error> {
        let mut state = self.lock();
        let collection = Collection::with_items(&state.identifier_name, items)?;
        state.collections.insert(name.to_string(), collection);
        Ok(())
    }

    fn get_all(&self, name: &str) -> Option<Vec<Value>> {
        self.lock().collections.get(name).map(Collection::get_all)
    }

    fn get_one(&self, name: &str, id: &str) -> Option<Value> {
        self.lock()
            .collections
            .get(name)
            .and_then(|c| c.get_one(id))
    }

    fn add_one(&self, name: &str, item: Value) -> Result<Value, Error> {
        let mut state = self.lock();
        let identifier_name = state.identifier_name.clone();
        state
            .collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(&identifier_name))
            .add_one(item)
    }

    fn update_one(&self, name: &str, id: &str, patch: Value) -> Result<Option<Value>, Error> {
        match self.lock().collections.get_mut(name) {
            None => Ok(None),
            Some(collection) => collection.update_one(id, patch),
        }
    }

    fn remove_one(&self, name: &str, id: &str) -> Option<Value> {
        self.lock()
            .collections
            .get_mut(name)
            .and_then(|c| c.remove_one(id))
    }

    fn add_single(&self, name: &str, value: Value) -> Result<(), Error> {
        let value = into_object(value)?;
        self.lock().singles.insert(name.to_string(), value);
        Ok(())
    }

    fn get_single(&self, name: &str) -> Option<Value> {
        self.lock().singles.get(name).cloned().map(Value::Object)
    }

    fn update_single(&self, name: &str, patch: Value) -> Result<Option<Value>, Error> {
        let patch = into_object(patch)?;
        let mut state = self.lock();

        let single = match state.singles.get_mut(name) {
            None => return Ok(None),
            Some(single) => single,
        };

        for (key, value) in patch {
            single.insert(key, value);
        }

        Ok(Some(Value::Object(single.clone())))
    }
}
