//! Parameter classification
//!
//! A method sees one parameter map: its own parameters followed by the
//! document's global ones. Method-local definitions win on name collision.
//! Classifiers report names in their argument form, with dashes replaced by
//! underscores, which is what callers pass.

use crate::schema::JsonSchema;
use indexmap::IndexMap;

/// Underscore form of a wire parameter name
pub fn argument_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Merged view over method-local and global parameter definitions
#[derive(Debug, Clone)]
pub struct Parameters<'a> {
    map: IndexMap<&'a str, &'a JsonSchema>,
}

impl<'a> Parameters<'a> {
    pub fn merge(
        method: &'a IndexMap<String, JsonSchema>,
        global: &'a IndexMap<String, JsonSchema>,
    ) -> Self {
        let mut map: IndexMap<&'a str, &'a JsonSchema> = method
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
            .collect();
        for (name, schema) in global {
            map.entry(name.as_str()).or_insert(schema);
        }
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Schema for a wire name
    pub fn get(&self, name: &str) -> Option<&'a JsonSchema> {
        self.map.get(name).copied()
    }

    /// Wire names with their schemas, method-local first
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a JsonSchema)> + '_ {
        self.map.iter().map(|(name, schema)| (*name, *schema))
    }

    /// Map a caller key to its declared wire name.
    ///
    /// An exact match wins, so callers may also pass the dashed form.
    pub fn wire_name(&self, key: &str) -> Option<&'a str> {
        if let Some((name, _)) = self.map.get_key_value(key) {
            return Some(*name);
        }
        self.map
            .keys()
            .find(|name| name.contains('-') && argument_name(name) == key)
            .copied()
    }

    /// Whether `key` names a declared parameter, in either form
    pub fn contains(&self, key: &str) -> bool {
        self.wire_name(key).is_some()
    }

    fn select(&self, pred: impl Fn(&JsonSchema) -> bool) -> Vec<String> {
        self.map
            .iter()
            .filter(|(_, schema)| pred(schema))
            .map(|(name, _)| argument_name(name))
            .collect()
    }

    pub fn required(&self) -> Vec<String> {
        self.select(|s| s.is_required())
    }

    pub fn optional(&self) -> Vec<String> {
        self.select(|s| !s.is_required())
    }

    pub fn path(&self) -> Vec<String> {
        self.select(|s| s.is_path())
    }

    pub fn query(&self) -> Vec<String> {
        self.select(|s| s.is_query())
    }

    pub fn required_query(&self) -> Vec<String> {
        self.select(|s| s.is_query() && s.is_required())
    }

    pub fn optional_query(&self) -> Vec<String> {
        self.select(|s| s.is_query() && !s.is_required())
    }
}
