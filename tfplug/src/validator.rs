//! Built-in attribute validators
//!
//! Validators only see known, non-null values; `Block::validate_config` skips
//! everything else before calling them.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic};
use regex::Regex;

fn value_at<'a>(request: &'a ValidatorRequest) -> Option<&'a Dynamic> {
    request.config_value.get(&request.path)
}

/// Accepts only strings from a fixed set.
pub struct StringOneOf {
    allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create(allowed: Vec<&str>) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.into_iter().map(String::from).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = value_at(&request).and_then(Dynamic::as_str) {
            if !self.allowed.iter().any(|a| a == s) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value Match",
                        format!(
                            "Attribute {} value must be one of: [\"{}\"], got: \"{}\"",
                            request.path,
                            self.allowed.join("\" \""),
                            s
                        ),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Requires a string to match a regular expression.
/// An invalid pattern is reported as a diagnostic on every validation.
pub struct StringRegex {
    pattern: std::result::Result<Regex, regex::Error>,
    message: String,
}

impl StringRegex {
    pub fn create(pattern: &str, message: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern: Regex::new(pattern),
            message: message.to_string(),
        })
    }
}

impl Validator for StringRegex {
    fn description(&self) -> String {
        self.message.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        let pattern = match &self.pattern {
            Ok(p) => p,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Invalid Validator Pattern",
                    format!("Attribute {} has an invalid pattern: {}", request.path, e),
                ));
                return ValidatorResponse { diagnostics };
            }
        };
        if let Some(s) = value_at(&request).and_then(Dynamic::as_str) {
            if !pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value Match",
                        format!("Attribute {} {}, got: {}", request.path, self.message, s),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Requires a string to hold a parseable JSON document.
pub struct StringIsJson;

impl StringIsJson {
    pub fn create() -> Box<dyn Validator> {
        Box::new(Self)
    }
}

impl Validator for StringIsJson {
    fn description(&self) -> String {
        "value must be valid JSON".to_string()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(s) = value_at(&request).and_then(Dynamic::as_str) {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(s) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid JSON",
                        format!("Attribute {} must be valid JSON: {}", request.path, e),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Lower bound for numeric attributes.
pub struct NumberAtLeast {
    min: f64,
}

impl NumberAtLeast {
    pub fn create(min: f64) -> Box<dyn Validator> {
        Box::new(Self { min })
    }
}

impl Validator for NumberAtLeast {
    fn description(&self) -> String {
        format!("value must be at least {}", self.min)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Some(n) = value_at(&request).and_then(Dynamic::as_f64) {
            if n < self.min {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value",
                        format!("Attribute {} must be at least {}, got: {}", request.path, self.min, n),
                    )
                    .with_attribute(request.path.clone()),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Rejects the attribute when any of the named root attributes is also set.
/// Unknown values count as set, so conflicts surface during plan.
pub struct ConflictsWith {
    others: Vec<String>,
}

impl ConflictsWith {
    pub fn create(others: Vec<&str>) -> Box<dyn Validator> {
        Box::new(Self {
            others: others.into_iter().map(String::from).collect(),
        })
    }
}

impl Validator for ConflictsWith {
    fn description(&self) -> String {
        format!("cannot be combined with: {}", self.others.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let diagnostics = self
            .others
            .iter()
            .filter(|other| !request.config_value.is_null_at(&AttributePath::new(other)))
            .map(|other| {
                Diagnostic::error(
                    "Invalid Attribute Combination",
                    format!(
                        "Attribute \"{}\" cannot be specified when \"{}\" is specified",
                        other, request.path
                    ),
                )
                .with_attribute(request.path.clone())
            })
            .collect();
        ValidatorResponse { diagnostics }
    }
}

/// Requires the named root attributes whenever this attribute is set.
pub struct AlsoRequires {
    required: Vec<String>,
}

impl AlsoRequires {
    pub fn create(required: Vec<&str>) -> Box<dyn Validator> {
        Box::new(Self {
            required: required.into_iter().map(String::from).collect(),
        })
    }
}

impl Validator for AlsoRequires {
    fn description(&self) -> String {
        format!("also requires: {}", self.required.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let diagnostics = self
            .required
            .iter()
            .filter(|name| request.config_value.is_null_at(&AttributePath::new(name)))
            .map(|name| {
                Diagnostic::error(
                    "Invalid Attribute Combination",
                    format!(
                        "Attribute \"{}\" must be specified when \"{}\" is specified",
                        name, request.path
                    ),
                )
                .with_attribute(request.path.clone())
            })
            .collect();
        ValidatorResponse { diagnostics }
    }
}
