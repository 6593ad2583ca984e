use crate::Error;
use serde::Serialize;
use serde_json::{to_value, Value};
use std::collections::HashMap;

/// Provides storage for data that templates can be rendered against.
pub struct Store {
    data: HashMap<String, Value>,
}

impl Store {
    /// Create a new Store.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    /// Insert the value into the Store.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    pub fn insert<S, T>(&mut self, key: S, value: T) -> Result<(), Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        let serialized = to_value(value)
            .map_err(|err| Error::render(format!("unserializable value: {err}")))?;
        self.data.insert(key.into(), serialized);

        Ok(())
    }

    /// Insert the value into the Store.
    ///
    /// # Panics
    ///
    /// Will panic if the serialization fails.
    #[inline]
    pub fn insert_must<S, T>(&mut self, key: S, value: T)
    where
        S: Into<String>,
        T: Serialize,
    {
        self.data.insert(key.into(), to_value(value).unwrap());
    }

    /// Insert the value into the Store.
    ///
    /// Returns the Store, so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails.
    pub fn with<S, T>(mut self, key: S, value: T) -> Result<Self, Error>
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert(key, value)?;
        Ok(self)
    }

    /// Insert the value into the Store.
    ///
    /// Returns the Store, so additional methods may be chained.
    ///
    /// # Panics
    ///
    /// Will panic if the serialization fails.
    #[inline]
    pub fn with_must<S, T>(mut self, key: S, value: T) -> Self
    where
        S: Into<String>,
        T: Serialize,
    {
        self.insert_must(key, value);
        self
    }

    /// Get the value of the given key, if any.
    #[inline]
    pub fn get(&self, index: &str) -> Option<&Value> {
        self.data.get(index)
    }

    /// Iterate over the key/value pairs in the Store.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::Store;

    #[test]
    fn test_insert() {
        let mut store = Store::new();
        store.insert_must("one", "two");

        assert!(store
            .get("one")
            .is_some_and(|t| t.as_str().unwrap() == "two"));
    }

    #[test]
    fn test_insert_fluent() {
        assert!(Store::new()
            .with_must("three", "four")
            .get("three")
            .is_some_and(|t| t.as_str().unwrap() == "four"))
    }
}
