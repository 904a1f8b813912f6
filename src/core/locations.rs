//! Location id to display name lookup, loaded once per job

use std::collections::HashMap;

/// Resolves a location id to its name
pub trait LocationLookup: Send + Sync {
    fn location_name(&self, id: i64) -> Option<&str>;
}

/// In-memory snapshot of all location names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationNames {
    names: HashMap<i64, String>,
}

impl LocationNames {
    pub fn new(names: HashMap<i64, String>) -> Self {
        Self { names }
    }

    pub fn insert(&mut self, id: i64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(i64, String)> for LocationNames {
    fn from_iter<T: IntoIterator<Item = (i64, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl LocationLookup for LocationNames {
    fn location_name(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}
