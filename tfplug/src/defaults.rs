//! Default value providers for attributes
//!
//! Defaults are applied during planning when an optional attribute is null in
//! configuration. `AttributeBuilder::default` marks the attribute computed so
//! Terraform accepts the provider-chosen value.

use crate::schema::{Default, DefaultRequest, DefaultResponse};
use crate::types::{Dynamic, DynamicValue};

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    /// Create a new static default provider with the given value
    pub fn create(value: Dynamic) -> Box<dyn Default> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Box<dyn Default> {
        Self::create(Dynamic::List(values))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: DynamicValue::new(self.value.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributePath;

    fn resolve(default: Box<dyn Default>) -> Dynamic {
        default
            .default_value(DefaultRequest {
                path: AttributePath::new("attr"),
            })
            .value
            .value
    }

    #[test]
    fn static_defaults() {
        assert_eq!(
            resolve(StaticDefault::string("Managed via Terraform")),
            Dynamic::String("Managed via Terraform".to_string())
        );
        assert_eq!(resolve(StaticDefault::number(604800.0)), Dynamic::Number(604800.0));
        assert_eq!(resolve(StaticDefault::bool(false)), Dynamic::Bool(false));
        assert_eq!(resolve(StaticDefault::list(vec![])), Dynamic::List(vec![]));
    }

    #[test]
    fn description_names_value() {
        assert!(StaticDefault::bool(true).description().contains("true"));
    }
}
