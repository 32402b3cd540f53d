//! Data source implementations

pub mod agent;
pub mod global_resource;
pub mod story;

pub use agent::AgentDataSource;
pub use global_resource::GlobalResourceDataSource;
pub use story::StoryDataSource;

use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

/// Every data source looks its object up by the numeric Tines id.
pub(crate) fn id_attribute(description: &str) -> Attribute {
    AttributeBuilder::new("id", AttributeType::Number)
        .description(description)
        .required()
        .build()
}

pub(crate) fn lookup_id(config: &DynamicValue) -> Result<i64, Diagnostic> {
    config.get_i64(&AttributePath::new("id")).map_err(|e| {
        Diagnostic::error("Missing ID", format!("A numeric id is required: {}", e))
            .with_attribute(AttributePath::new("id"))
    })
}

/// Diagnostic for a failed lookup. Unlike resources, a 404 is an error here.
pub(crate) fn read_error(label: &str, id: i64, err: &crate::api::TinesError) -> Diagnostic {
    Diagnostic::error(
        format!("Unable to Read Tines {}", label),
        format!("Could not read {} {}: {}", label, id, err),
    )
}
