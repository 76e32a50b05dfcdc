use std::collections::HashMap;

use super::FieldValue;

/// One stored document: its backend-assigned id plus the loosely typed payload
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.to_owned(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Tries `keys` in order and renders the first present, non-empty value
    pub fn first_non_empty(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.get(key))
            .find(|value| !value.is_empty())
            .map(ToString::to_string)
    }
}
