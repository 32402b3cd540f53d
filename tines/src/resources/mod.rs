//! Resource implementations

pub mod agent;
pub mod annotation;
pub mod credential;
pub mod folder;
pub mod global_resource;
pub mod note;
pub mod story;
pub mod team;
pub mod tines_resource;

pub use agent::AgentResource;
pub use annotation::AnnotationResource;
pub use credential::CredentialResource;
pub use folder::FolderResource;
pub use global_resource::GlobalResourceResource;
pub use note::NoteResource;
pub use story::StoryResource;
pub use team::TeamResource;
pub use tines_resource::TinesResource;

use crate::api::TinesError;
use serde_json::Value;
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

// Accessors for known, non-null attribute values. Null, unknown and
// mistyped values all read as `None`.

pub(crate) fn string_attr(value: &DynamicValue, name: &str) -> Option<String> {
    value.get_string(&AttributePath::new(name)).ok()
}

pub(crate) fn i64_attr(value: &DynamicValue, name: &str) -> Option<i64> {
    value.get_i64(&AttributePath::new(name)).ok()
}

pub(crate) fn bool_attr(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_bool(&AttributePath::new(name)).ok()
}

pub(crate) fn string_list_attr(value: &DynamicValue, name: &str) -> Option<Vec<String>> {
    value.get_string_list(&AttributePath::new(name)).ok()
}

pub(crate) fn i64_list_attr(value: &DynamicValue, name: &str) -> Option<Vec<i64>> {
    value.get_i64_list(&AttributePath::new(name)).ok()
}

/// Render a JSON value for state, keeping `previous` when it already encodes
/// the same document so whitespace and key order never show up as drift.
pub(crate) fn json_state_string(previous: Option<String>, current: &Value) -> String {
    if let Some(previous) = previous {
        if serde_json::from_str::<Value>(&previous).is_ok_and(|v| &v == current) {
            return previous;
        }
    }
    current.to_string()
}

/// The Tines id stored in state, or a diagnostic naming the resource.
pub(crate) fn state_id(state: &DynamicValue, label: &str) -> Result<i64, Diagnostic> {
    i64_attr(state, "id").ok_or_else(|| {
        Diagnostic::error(
            format!("Missing {} ID", label),
            format!("The {} ID was not found in state", label),
        )
        .with_attribute(AttributePath::new("id"))
    })
}

/// Diagnostic for a failed create/update/delete call.
pub(crate) fn api_error(summary: &str, action: &str, err: &TinesError) -> Diagnostic {
    Diagnostic::error(
        summary,
        format!("Could not {}, unexpected error: {}", action, err),
    )
}

/// Diagnostic for a failed refresh that was not a 404.
pub(crate) fn refresh_error(err: &TinesError) -> Diagnostic {
    Diagnostic::error(
        "Unable to Refresh Resource",
        format!(
            "An unexpected error occurred while attempting to refresh resource state. \
             Please retry the operation or report this issue to the provider developers.\n\n\
             HTTP Error: {}",
            err
        ),
    )
}


#[cfg(test)]
pub(crate) mod test_support {
    use crate::api::Client;
    use crate::TinesProviderData;
    use std::any::Any;
    use std::sync::Arc;
    use tfplug::context::Context;
    use tfplug::resource::{
        ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
        ReadResourceRequest, ResourceWithConfigure, UpdateResourceRequest,
    };
    use tfplug::types::{ClientCapabilities, DynamicValue};

    pub fn provider_data(url: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let client = Client::new(url, "test-token", "0.0.0-test").unwrap();
        Some(Arc::new(TinesProviderData::new(client)))
    }

    pub async fn configured<R: ResourceWithConfigure + Default>(url: &str) -> R {
        let mut resource = R::default();
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: provider_data(url),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    pub fn create_request(type_name: &str, planned: DynamicValue) -> CreateResourceRequest {
        CreateResourceRequest {
            type_name: type_name.to_string(),
            config: planned.clone(),
            planned_state: planned,
            planned_private: vec![],
            provider_meta: None,
        }
    }

    pub fn read_request(type_name: &str, current: DynamicValue) -> ReadResourceRequest {
        ReadResourceRequest {
            type_name: type_name.to_string(),
            current_state: current,
            private: vec![],
            provider_meta: None,
            client_capabilities: ClientCapabilities::default(),
        }
    }

    pub fn update_request(
        type_name: &str,
        prior: DynamicValue,
        planned: DynamicValue,
    ) -> UpdateResourceRequest {
        UpdateResourceRequest {
            type_name: type_name.to_string(),
            prior_state: prior,
            config: planned.clone(),
            planned_state: planned,
            planned_private: vec![],
            provider_meta: None,
        }
    }

    pub fn delete_request(type_name: &str, prior: DynamicValue) -> DeleteResourceRequest {
        DeleteResourceRequest {
            type_name: type_name.to_string(),
            prior_state: prior,
            planned_private: vec![],
            provider_meta: None,
        }
    }
}
