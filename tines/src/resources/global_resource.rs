//! Global resource implementation
//!
//! The older counterpart of `tines_resource`: same endpoint, but the value is
//! stored verbatim as a string.

use async_trait::async_trait;
use serde_json::Value;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::DynamicValue;
use tfplug::validator::StringOneOf;
use tfplug::StateBuilder;

use super::{
    api_error, i64_attr, json_state_string, refresh_error, state_id, string_attr,
};
use crate::api::resources::Resource as ApiResource;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_global_resource";

#[derive(Default)]
pub struct GlobalResourceResource {
    provider_data: Option<TinesProviderData>,
}

impl GlobalResourceResource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Text form of a resource value: strings as-is, anything else as JSON.
pub(crate) fn value_text(previous: Option<String>, value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => json_state_string(previous, other),
    }
}

fn plan_to_resource(planned: &DynamicValue) -> ApiResource {
    ApiResource {
        name: string_attr(planned, "name"),
        value_type: string_attr(planned, "value_type"),
        value: string_attr(planned, "value").map(Value::String),
        team_id: i64_attr(planned, "team_id"),
        folder_id: i64_attr(planned, "folder_id"),
        read_access: string_attr(planned, "read_access"),
        ..Default::default()
    }
}

fn resource_to_state(base: &DynamicValue, resource: &ApiResource) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base)
        .opt_int("id", resource.id)
        .opt_string("slug", resource.slug.clone());

    if let Some(name) = &resource.name {
        builder = builder.string("name", name.clone());
    }
    if let Some(value_type) = &resource.value_type {
        builder = builder.string("value_type", value_type.clone());
    }
    if let Some(value) = &resource.value {
        builder = builder.string("value", value_text(string_attr(base, "value"), value));
    }
    if let Some(team_id) = resource.team_id {
        builder = builder.int("team_id", team_id);
    }
    if let Some(folder_id) = resource.folder_id {
        builder = builder.int("folder_id", folder_id);
    }
    if let Some(read_access) = &resource.read_access {
        builder = builder.string("read_access", read_access.clone());
    }

    builder.build()
}

#[async_trait]
impl Resource for GlobalResourceResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manages a Tines global resource. Prefer tines_resource for new configurations.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value_type", AttributeType::String)
                    .description("Either text or json.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("team_id", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("folder_id", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("read_access", AttributeType::String)
                    .optional()
                    .validator(StringOneOf::create(vec!["TEAM", "GLOBAL", "SPECIFIC_TEAMS"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build();

        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let resource = plan_to_resource(&request.planned_state);
        match provider_data.client.resources().create(&resource).await {
            Ok(created) => CreateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .opt_int("id", created.id)
                    .opt_string("slug", created.slug)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![api_error(
                    "Error Creating Tines Global Resource",
                    "create global resource",
                    &e,
                )],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![not_configured()],
                private: request.private,
            };
        };

        let id = match state_id(&request.current_state, "Global Resource") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.resources().get(id).await {
            Ok(resource) => ReadResourceResponse {
                new_state: Some(resource_to_state(&request.current_state, &resource)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Global resource no longer exists, removing from state");
                ReadResourceResponse {
                    new_state: None,
                    diagnostics: vec![],
                    private: request.private,
                }
            }
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![refresh_error(&e)],
                private: request.private,
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let id = match state_id(&request.prior_state, "Global Resource") {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let resource = plan_to_resource(&request.planned_state);
        match provider_data.client.resources().update(id, &resource).await {
            Ok(updated) => UpdateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .int("id", id)
                    .opt_string("slug", updated.slug)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![api_error(
                    "Error Updating Tines Global Resource",
                    "update global resource",
                    &e,
                )],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Global Resource") {
            Ok(id) => match provider_data.client.resources().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error(
                    "Error Deleting Tines Global Resource",
                    "delete global resource",
                    &e,
                )],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for GlobalResourceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match TinesProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = data;
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{configured, create_request, read_request};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::{AttributePath, Dynamic};

    fn state(values: &[(&str, Dynamic)]) -> DynamicValue {
        let mut state = DynamicValue::object();
        for (name, value) in values {
            state
                .set_value(&AttributePath::new(name), value.clone())
                .unwrap();
        }
        state
    }

    #[test]
    fn value_text_unwraps_strings() {
        assert_eq!(value_text(None, &json!("plain")), "plain");
        assert_eq!(value_text(None, &json!({"a": 1})), "{\"a\":1}");
        assert_eq!(
            value_text(Some("{ \"a\": 1 }".to_string()), &json!({"a": 1})),
            "{ \"a\": 1 }"
        );
    }

    #[tokio::test]
    async fn create_sends_value_as_string() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/global_resources")
            .match_body(Matcher::Json(json!({
                "name": "webhook_secret",
                "value_type": "text",
                "value": "s3cr3t"
            })))
            .with_status(201)
            .with_body(r#"{"id": 21, "slug": "webhook_secret"}"#)
            .create_async()
            .await;

        let resource: GlobalResourceResource = configured(&server.url()).await;
        let plan = state(&[
            ("name", Dynamic::from("webhook_secret")),
            ("value_type", Dynamic::from("text")),
            ("value", Dynamic::from("s3cr3t")),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("slug")).unwrap(),
            "webhook_secret"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_removes_missing_global_resource() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/global_resources/21")
            .with_status(404)
            .create_async()
            .await;

        let resource: GlobalResourceResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                read_request(TYPE_NAME, state(&[("id", Dynamic::Number(21.0))])),
            )
            .await;

        assert!(response.new_state.is_none());
    }
}
