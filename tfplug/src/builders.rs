use crate::types::{Dynamic, DynamicValue};
use std::collections::HashMap;

/// Builds a state object one attribute at a time.
///
/// `from_state` starts from an existing object (usually the planned state) so
/// values the API does not echo back are carried over. Optional setters write
/// null for `None`.
pub struct StateBuilder {
    values: HashMap<String, Dynamic>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    pub fn from_state(state: &DynamicValue) -> Self {
        let values = match &state.value {
            Dynamic::Map(m) => m.clone(),
            _ => HashMap::new(),
        };
        Self { values }
    }

    pub fn string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values
            .insert(key.into(), Dynamic::String(value.into()));
        self
    }

    pub fn bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.values.insert(key.into(), Dynamic::Bool(value));
        self
    }

    pub fn number(mut self, key: impl Into<String>, value: f64) -> Self {
        self.values.insert(key.into(), Dynamic::Number(value));
        self
    }

    pub fn int(self, key: impl Into<String>, value: i64) -> Self {
        self.number(key, value as f64)
    }

    pub fn opt_string(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        self.values
            .insert(key.into(), value.map(|v| Dynamic::String(v.into())).into());
        self
    }

    pub fn opt_bool(mut self, key: impl Into<String>, value: Option<bool>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn opt_int(mut self, key: impl Into<String>, value: Option<i64>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn string_list(mut self, key: impl Into<String>, values: &[String]) -> Self {
        let items = values.iter().cloned().map(Dynamic::String).collect();
        self.values.insert(key.into(), Dynamic::List(items));
        self
    }

    pub fn int_list(mut self, key: impl Into<String>, values: &[i64]) -> Self {
        let items = values.iter().map(|v| Dynamic::Number(*v as f64)).collect();
        self.values.insert(key.into(), Dynamic::List(items));
        self
    }

    /// Any value, for attributes of dynamic type.
    pub fn value(mut self, key: impl Into<String>, value: Dynamic) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    pub fn map(mut self, key: impl Into<String>, value: HashMap<String, Dynamic>) -> Self {
        self.values.insert(key.into(), Dynamic::Map(value));
        self
    }

    pub fn build(self) -> DynamicValue {
        DynamicValue::new(Dynamic::Map(self.values))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    #[test]
    fn state_builder_sets_values() {
        let state = StateBuilder::new()
            .int("id", 42)
            .string("name", "Sales")
            .opt_int("folder_id", None)
            .string_list("slugs", &["a".to_string()])
            .build();

        assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 42);
        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "Sales");
        assert!(state.is_null_at(&AttributePath::new("folder_id")));
        assert_eq!(
            state.get_string_list(&AttributePath::new("slugs")).unwrap(),
            vec!["a".to_string()]
        );
    }

    #[test]
    fn from_state_overlays_values() {
        let planned = StateBuilder::new()
            .string("name", "planned")
            .bool("locked", true)
            .build();

        let state = StateBuilder::from_state(&planned)
            .string("name", "from api")
            .build();

        assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "from api");
        assert!(state.get_bool(&AttributePath::new("locked")).unwrap());
    }

    #[test]
    fn value_and_map_store_nested_values() {
        let state = StateBuilder::new()
            .value("payload", Dynamic::List(vec![Dynamic::from(1.0)]))
            .map("position", HashMap::from([("x".to_string(), Dynamic::from(4.0))]))
            .build();

        assert_eq!(
            state.get(&AttributePath::new("payload")),
            Some(&Dynamic::List(vec![Dynamic::Number(1.0)]))
        );
        assert_eq!(state.get_i64(&AttributePath::new("position").key("x")).unwrap(), 4);
    }
}
