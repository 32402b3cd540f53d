//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining resource and data source
//! schemas, including attribute types, validation, defaults and plan modifiers.

use crate::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>),               // Ordered, allows duplicates
    Set(Box<AttributeType>),                // Unordered, no duplicates
    Map(Box<AttributeType>),                // String keys only
    Object(HashMap<String, AttributeType>), // Fixed structure
    /// Any type, chosen per value by the configuration
    Dynamic,
}

impl AttributeType {
    /// cty type constraint as Terraform expects it in `Schema.Attribute.type`.
    pub fn to_cty_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(inner) => json!(["list", inner.to_cty_json()]),
            AttributeType::Set(inner) => json!(["set", inner.to_cty_json()]),
            AttributeType::Map(inner) => json!(["map", inner.to_cty_json()]),
            AttributeType::Object(fields) => {
                // Sorted so the encoded schema is stable across calls
                let ordered: BTreeMap<&String, Value> =
                    fields.iter().map(|(k, v)| (k, v.to_cty_json())).collect();
                json!(["object", ordered])
            }
            AttributeType::Dynamic => json!("dynamic"),
        }
    }

    /// True when values of this type carry a type tag on the wire somewhere.
    pub fn has_dynamic(&self) -> bool {
        match self {
            AttributeType::Dynamic => true,
            AttributeType::List(inner) | AttributeType::Set(inner) | AttributeType::Map(inner) => {
                inner.has_dynamic()
            }
            AttributeType::Object(fields) => fields.values().any(AttributeType::has_dynamic),
            _ => false,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_cty_json().to_string().into_bytes()
    }
}

/// Schema is returned by providers/resources/data sources
/// Version is used for state migration
#[derive(Debug, Clone)]
pub struct Schema {
    pub version: i64, // Increment when schema changes require migration
    pub block: Block, // Root block containing all attributes
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.block.attributes.iter().find(|a| a.name == name)
    }
}

/// Block represents a configuration block
#[derive(Debug, Clone)]
pub struct Block {
    pub version: i64,
    pub attributes: Vec<Attribute>,
    pub description: String,
    pub description_kind: StringKind,
    pub deprecated: bool,
}

impl Block {
    /// Shapes a value into a state object for this block: every attribute is
    /// present (null when absent), unknown attributes are dropped and nothing
    /// unknown remains.
    pub fn normalize_state(&self, value: Dynamic) -> Dynamic {
        let mut source = match value {
            Dynamic::Map(m) => m,
            _ => HashMap::new(),
        };

        let normalized = self
            .attributes
            .iter()
            .map(|attr| {
                let v = source
                    .remove(&attr.name)
                    .unwrap_or(Dynamic::Null)
                    .unknowns_to_null();
                (attr.name.clone(), v)
            })
            .collect();

        Dynamic::Map(normalized)
    }

    /// Runs attribute validators against a configuration. Null and unknown
    /// values are skipped; Terraform reports missing required attributes.
    pub fn validate_config(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for attr in &self.attributes {
            let path = AttributePath::new(&attr.name);
            if !config.is_set(&path) {
                continue;
            }
            for validator in &attr.validators {
                let response = validator.validate(ValidatorRequest {
                    config_value: config.clone(),
                    path: path.clone(),
                });
                diagnostics.extend(response.diagnostics);
            }
        }

        diagnostics
    }
}

impl Block {
    /// Terraform sends a value of a dynamic attribute as a `[type, value]`
    /// pair with the type as cty JSON. Replaces each pair with its value.
    pub fn from_wire(&self, value: DynamicValue) -> DynamicValue {
        let Dynamic::Map(mut entries) = value.value else {
            return value;
        };
        for attr in self.attributes.iter().filter(|a| a.r#type.has_dynamic()) {
            if let Some(v) = entries.remove(&attr.name) {
                let unwrapped = walk_dynamic(&attr.r#type.to_cty_json(), v, unwrap_pair);
                entries.insert(attr.name.clone(), unwrapped);
            }
        }
        DynamicValue::new(Dynamic::Map(entries))
    }

    /// Inverse of [`Block::from_wire`]. A value equal to one found in
    /// `sources` (wire values from the request) keeps that value's type, so a
    /// configured `tolist([1])` is not echoed back as a tuple. Anything else
    /// gets the type implied by the value itself.
    pub fn to_wire(&self, value: &DynamicValue, sources: &[&DynamicValue]) -> DynamicValue {
        let Dynamic::Map(entries) = &value.value else {
            return value.clone();
        };
        let mut wired = entries.clone();
        for attr in self.attributes.iter().filter(|a| a.r#type.has_dynamic()) {
            let Some(v) = wired.remove(&attr.name) else {
                continue;
            };
            let path = AttributePath::new(&attr.name);
            let candidates: Vec<&Dynamic> = sources.iter().filter_map(|s| s.get(&path)).collect();
            wired.insert(
                attr.name.clone(),
                wrap_dynamic(&attr.r#type.to_cty_json(), v, &candidates),
            );
        }
        DynamicValue::new(Dynamic::Map(wired))
    }

    /// Stored JSON state keeps dynamic values as `{"value": .., "type": ..}`.
    /// Rewrites those into the pair form [`Block::from_wire`] reads.
    pub fn json_state_to_wire(&self, value: DynamicValue) -> DynamicValue {
        let Dynamic::Map(mut entries) = value.value else {
            return value;
        };
        for attr in self.attributes.iter().filter(|a| a.r#type.has_dynamic()) {
            if let Some(v) = entries.remove(&attr.name) {
                let wired = walk_dynamic(&attr.r#type.to_cty_json(), v, envelope_to_pair);
                entries.insert(attr.name.clone(), wired);
            }
        }
        DynamicValue::new(Dynamic::Map(entries))
    }
}

/// Applies `at_dynamic` at every position `ty` declares as `"dynamic"`.
/// Null and unknown values are never tagged and pass through untouched.
fn walk_dynamic(ty: &Value, value: Dynamic, at_dynamic: fn(Dynamic) -> Dynamic) -> Dynamic {
    if value.is_null() || value.is_unknown() {
        return value;
    }
    match ty {
        Value::String(s) if s == "dynamic" => at_dynamic(value),
        Value::Array(parts) => match (parts.first().and_then(Value::as_str), parts.get(1), value) {
            (Some("list" | "set"), Some(elem), Dynamic::List(items)) => Dynamic::List(
                items
                    .into_iter()
                    .map(|item| walk_dynamic(elem, item, at_dynamic))
                    .collect(),
            ),
            (Some("tuple"), Some(Value::Array(elems)), Dynamic::List(items)) => Dynamic::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| match elems.get(i) {
                        Some(elem) => walk_dynamic(elem, item, at_dynamic),
                        None => item,
                    })
                    .collect(),
            ),
            (Some("map"), Some(elem), Dynamic::Map(entries)) => Dynamic::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, walk_dynamic(elem, v, at_dynamic)))
                    .collect(),
            ),
            (Some("object"), Some(Value::Object(fields)), Dynamic::Map(entries)) => Dynamic::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        let v = match fields.get(&k) {
                            Some(field) => walk_dynamic(field, v, at_dynamic),
                            None => v,
                        };
                        (k, v)
                    })
                    .collect(),
            ),
            (_, _, value) => value,
        },
        _ => value,
    }
}

/// Splits a `[type, value]` pair, parsing the type.
fn split_pair(value: &Dynamic) -> Option<(Value, &Dynamic)> {
    match value {
        Dynamic::List(items) if items.len() == 2 => {
            let ty = serde_json::from_str(items[0].as_str()?).ok()?;
            Some((ty, &items[1]))
        }
        _ => None,
    }
}

fn unwrap_pair(value: Dynamic) -> Dynamic {
    let Some(ty) = split_pair(&value).map(|(ty, _)| ty) else {
        return value;
    };
    match value {
        Dynamic::List(mut items) => match items.pop() {
            Some(inner) => walk_dynamic(&ty, inner, unwrap_pair),
            None => Dynamic::Null,
        },
        other => other,
    }
}

fn envelope_to_pair(value: Dynamic) -> Dynamic {
    let Dynamic::Map(mut entries) = value else {
        return value;
    };
    if !(entries.contains_key("type") && entries.contains_key("value")) {
        return Dynamic::Map(entries);
    }
    let inner = entries.remove("value").unwrap_or(Dynamic::Null);
    let Some(Ok(ty_json)) = entries.remove("type").map(|ty| ty.to_json()) else {
        return Dynamic::Null;
    };
    let inner = walk_dynamic(&ty_json, inner, envelope_to_pair);
    Dynamic::List(vec![Dynamic::String(ty_json.to_string()), inner])
}

fn wrap_dynamic(ty: &Value, value: Dynamic, sources: &[&Dynamic]) -> Dynamic {
    if value.is_null() || value.is_unknown() {
        return value;
    }
    match ty {
        Value::String(s) if s == "dynamic" => {
            let matched = sources.iter().filter_map(|s| split_pair(s)).find(|(t, inner)| {
                walk_dynamic(t, (*inner).clone(), unwrap_pair) == value
            });
            let (value_type, inner_sources) = match matched {
                Some((t, inner)) => (t, vec![inner]),
                None => (value.implied_type(), Vec::new()),
            };
            let inner = wrap_dynamic(&value_type, value, &inner_sources);
            Dynamic::List(vec![Dynamic::String(value_type.to_string()), inner])
        }
        Value::Array(parts) => match (parts.first().and_then(Value::as_str), parts.get(1), value) {
            (Some(kind @ ("list" | "set" | "tuple")), Some(elem), Dynamic::List(items)) => {
                Dynamic::List(
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| {
                            let elem_type = match (kind, elem) {
                                ("tuple", Value::Array(elems)) => elems.get(i),
                                ("tuple", _) => None,
                                _ => Some(elem),
                            };
                            let nested: Vec<&Dynamic> = sources
                                .iter()
                                .filter_map(|s| match s {
                                    Dynamic::List(l) => l.get(i),
                                    _ => None,
                                })
                                .collect();
                            match elem_type {
                                Some(t) => wrap_dynamic(t, item, &nested),
                                None => item,
                            }
                        })
                        .collect(),
                )
            }
            (Some(kind @ ("map" | "object")), Some(elem), Dynamic::Map(entries)) => Dynamic::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        let field_type = match (kind, elem) {
                            ("object", Value::Object(fields)) => fields.get(&k),
                            ("object", _) => None,
                            _ => Some(elem),
                        };
                        let nested: Vec<&Dynamic> = sources
                            .iter()
                            .filter_map(|s| match s {
                                Dynamic::Map(m) => m.get(&k),
                                _ => None,
                            })
                            .collect();
                        let v = match field_type {
                            Some(t) => wrap_dynamic(t, v, &nested),
                            None => v,
                        };
                        (k, v)
                    })
                    .collect(),
            ),
            (_, _, value) => value,
        },
        _ => value,
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn Default>>,
    pub deprecated: bool,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("description", &self.description)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .field("deprecated", &self.deprecated)
            .finish()
    }
}

/// StringKind represents the format of string values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StringKind {
    Plain,
    Markdown,
}

/// Validator performs validation on attribute values during planning
/// Implement this for custom validation logic
pub trait Validator: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Perform validation
    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse;
}

/// Request for validators
pub struct ValidatorRequest {
    pub config_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from validators
pub struct ValidatorResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// PlanModifier modifies planned values during planning
/// Common uses: RequiresReplace, UseStateForUnknown
pub trait PlanModifier: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Modify the planned value
    fn modify(&self, request: PlanModifierRequest) -> PlanModifierResponse;
}

/// Request for plan modifiers. Values are the attribute's own value, not the
/// whole object; `state_value` is null when the resource is being created.
pub struct PlanModifierRequest {
    pub config_value: DynamicValue,
    pub state_value: DynamicValue,
    pub plan_value: DynamicValue,
    pub path: AttributePath,
}

/// Response from plan modifiers
pub struct PlanModifierResponse {
    pub plan_value: DynamicValue,
    pub requires_replace: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Default provides default values for optional attributes
/// Called when attribute is not set in configuration
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// Request for default values
pub struct DefaultRequest {
    pub path: AttributePath,
}

/// Response with default value
pub struct DefaultResponse {
    pub value: DynamicValue,
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
                deprecated: false,
            },
        }
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    /// Mark as optional
    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    /// Mark as computed
    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.attribute.deprecated = true;
        self
    }

    /// Add validator
    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    /// Add plan modifier
    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Set default. Attributes with a default are also computed, otherwise
    /// Terraform rejects the planned value.
    pub fn default(mut self, default: Box<dyn Default>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        self.attribute.computed = true;
        self
    }

    /// Finalize the attribute
    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
/// ALWAYS use this for consistency
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self {
            schema: Schema {
                version: 0,
                block: Block {
                    version: 0,
                    attributes: Vec::new(),
                    description: String::new(),
                    description_kind: StringKind::Plain,
                    deprecated: false,
                },
            },
        }
    }

    /// Set schema version
    pub fn version(mut self, version: i64) -> Self {
        self.schema.version = version;
        self.schema.block.version = version;
        self
    }

    /// Add attribute
    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.block.attributes.push(attr);
        self
    }

    /// Set description
    pub fn description(mut self, desc: &str) -> Self {
        self.schema.block.description = desc.to_string();
        self
    }

    /// Set description kind
    pub fn description_kind(mut self, kind: StringKind) -> Self {
        self.schema.block.description_kind = kind;
        self
    }

    /// Mark as deprecated
    pub fn deprecated(mut self) -> Self {
        self.schema.block.deprecated = true;
        self
    }

    /// Finalize the schema
    pub fn build(self) -> Schema {
        self.schema
    }
}

impl std::default::Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
