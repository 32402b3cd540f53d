//! Tines Resource implementation
//!
//! `value`, `test_value` and `test_resource` are dynamic attributes: whatever
//! the configuration holds (a string, a number, a tuple, an object) is sent to
//! the API as the matching JSON value.

use async_trait::async_trait;
use serde_json::Value;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_int_id;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{AlsoRequires, StringOneOf};
use tfplug::StateBuilder;

use super::{
    api_error, bool_attr, i64_attr, refresh_error, state_id, string_attr, string_list_attr,
};
use crate::api::resources::Resource as ApiResource;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_resource";

const DEFAULT_DESCRIPTION: &str = "Managed via Terraform";

#[derive(Default)]
pub struct TinesResource {
    provider_data: Option<TinesProviderData>,
}

impl TinesResource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// JSON form of a dynamic attribute. Null and absent attributes give `None`.
fn dynamic_attr(value: &DynamicValue, name: &str) -> Result<Option<Value>, Diagnostic> {
    match value.get(&AttributePath::new(name)) {
        None | Some(Dynamic::Null) => Ok(None),
        Some(v) => v.to_json().map(Some).map_err(|_| {
            Diagnostic::error(
                "Dynamic value is unknown",
                format!("Attribute \"{}\" is not known yet and cannot be sent to Tines", name),
            )
            .with_attribute(AttributePath::new(name))
        }),
    }
}

/// Maps a value returned by the API back to a dynamic attribute. Tines may
/// echo a value as JSON text, so a string is read both as the JSON it holds
/// and as itself; `previous` wins when it matches either reading.
fn value_from_api(api: &Value, previous: Option<&Dynamic>) -> Dynamic {
    let readings = match api {
        Value::String(text) => {
            let decoded = serde_json::from_str(text).unwrap_or_else(|_| api.clone());
            vec![Dynamic::from_json(decoded), Dynamic::String(text.clone())]
        }
        other => vec![Dynamic::from_json(other.clone())],
    };
    match previous {
        Some(previous) if readings.contains(previous) => previous.clone(),
        _ => readings.into_iter().next().unwrap_or(Dynamic::Null),
    }
}

fn resource_to_state(base: &DynamicValue, resource: &ApiResource) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base)
        .opt_int("id", resource.id)
        .opt_string("name", resource.name.clone())
        .opt_string("description", resource.description.clone())
        .opt_int("folder_id", resource.folder_id)
        .opt_int("user_id", resource.user_id)
        .opt_string("read_access", resource.read_access.clone())
        .string_list(
            "shared_team_slugs",
            resource.shared_team_slugs.as_deref().unwrap_or_default(),
        )
        .opt_string("slug", resource.slug.clone())
        .opt_bool("test_resource_enabled", resource.test_resource_enabled)
        .value(
            "test_resource",
            resource
                .test_resource
                .as_ref()
                .map_or(Dynamic::Null, |v| value_from_api(v, None)),
        )
        .int_list(
            "referencing_action_ids",
            resource.referencing_action_ids.as_deref().unwrap_or_default(),
        )
        .opt_string("created_at", resource.created_at.clone())
        .opt_string("updated_at", resource.updated_at.clone());

    if let Some(team_id) = resource.team_id {
        builder = builder.int("team_id", team_id);
    }
    if let Some(value) = &resource.value {
        let previous = base.get(&AttributePath::new("value"));
        builder = builder.value("value", value_from_api(value, previous));
    }

    builder.build()
}

#[async_trait]
impl Resource for TinesResource {
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
            .description("Manages a Tines Resource, a reusable value that actions reference.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("The Tines-generated identifier for this resource.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the resource.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("A user-defined description of the resource.")
                    .optional()
                    .computed()
                    .default(StaticDefault::string(DEFAULT_DESCRIPTION))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::Dynamic)
                    .description("The value of the resource: a string, number, list or object.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("team_id", AttributeType::Number)
                    .description("The ID of the team that owns the resource.")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("folder_id", AttributeType::Number)
                    .description("The ID of the folder the resource is stored in.")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_id", AttributeType::Number)
                    .description("ID of the resource creator.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("read_access", AttributeType::String)
                    .description("Which teams can read the resource (TEAM, GLOBAL, SPECIFIC_TEAMS).")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .validator(StringOneOf::create(vec!["TEAM", "GLOBAL", "SPECIFIC_TEAMS"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "shared_team_slugs",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Slugs of the teams the resource is shared with when read_access is SPECIFIC_TEAMS.")
                .optional()
                .computed()
                .validator(AlsoRequires::create(vec!["read_access"]))
                .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("An underscored representation of the resource name.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("test_resource_enabled", AttributeType::Bool)
                    .description("Whether a separate test value is used when stories run in test mode.")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("test_resource", AttributeType::Dynamic)
                    .description("The test resource as returned by Tines.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("test_value", AttributeType::Dynamic)
                    .description("The value used when stories run in test mode.")
                    .optional()
                    .validator(AlsoRequires::create(vec!["test_resource_enabled"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("is_test", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("live_resource_id", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "referencing_action_ids",
                    AttributeType::List(Box::new(AttributeType::Number)),
                )
                .description("IDs of the actions that reference this resource.")
                .computed()
                .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("updated_at", AttributeType::String)
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
        tracing::info!("Creating Tines Resource");

        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let planned = &request.planned_state;
        let (value, test_value) = match (dynamic_attr(planned, "value"), dynamic_attr(planned, "test_value")) {
            (Ok(value), Ok(test_value)) => (value, test_value),
            (Err(diag), _) | (_, Err(diag)) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let test_resource_enabled = bool_attr(planned, "test_resource_enabled");
        let new_resource = ApiResource {
            name: string_attr(planned, "name"),
            description: string_attr(planned, "description"),
            team_id: i64_attr(planned, "team_id"),
            value,
            folder_id: i64_attr(planned, "folder_id"),
            read_access: string_attr(planned, "read_access"),
            shared_team_slugs: string_list_attr(planned, "shared_team_slugs"),
            test_resource_enabled,
            ..Default::default()
        };

        let api = provider_data.client.resources();
        let mut created = match api.create(&new_resource).await {
            Ok(resource) => resource,
            Err(e) => {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    private: vec![],
                    diagnostics: vec![api_error(
                        "Error Creating Tines Resource",
                        "create resource",
                        &e,
                    )],
                }
            }
        };

        if test_resource_enabled.is_some() || test_value.is_some() {
            let id = created.id.unwrap_or_default();
            let test_update = ApiResource {
                is_test: Some(true),
                test_resource_enabled,
                value: test_value,
                ..Default::default()
            };
            match api.update(id, &test_update).await {
                Ok(updated) => {
                    // The test write answers with the test copy; the live value
                    // the rest of the state describes is the one just created.
                    created.test_resource_enabled = updated.test_resource_enabled;
                    created.test_resource = updated.test_resource.or(created.test_resource);
                }
                Err(e) => {
                    return CreateResourceResponse {
                        new_state: resource_to_state(planned, &created),
                        private: vec![],
                        diagnostics: vec![api_error(
                            "Error Adding Test Tines Resource",
                            "add test resource",
                            &e,
                        )],
                    }
                }
            }
        }

        CreateResourceResponse {
            new_state: resource_to_state(planned, &created),
            private: vec![],
            diagnostics: vec![],
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

        let id = match state_id(&request.current_state, "Tines Resource") {
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
                tracing::info!(id, "Tines Resource no longer exists, removing from state");
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
        tracing::info!("Updating Tines Resource");

        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let planned = &request.planned_state;
        let result = match (
            state_id(&request.prior_state, "Tines Resource"),
            dynamic_attr(planned, "value"),
        ) {
            (Ok(id), Ok(value)) => {
                // Fields left out of the body keep their old values in Tines
                let update = ApiResource {
                    name: string_attr(planned, "name"),
                    description: string_attr(planned, "description"),
                    value,
                    folder_id: i64_attr(planned, "folder_id"),
                    read_access: string_attr(planned, "read_access"),
                    shared_team_slugs: string_list_attr(planned, "shared_team_slugs"),
                    test_resource_enabled: bool_attr(planned, "test_resource_enabled"),
                    ..Default::default()
                };
                provider_data
                    .client
                    .resources()
                    .update(id, &update)
                    .await
                    .map_err(|e| api_error("Error Updating Tines Resource", "update resource", &e))
            }
            (Err(diag), _) | (_, Err(diag)) => Err(diag),
        };

        match result {
            Ok(resource) => UpdateResourceResponse {
                new_state: resource_to_state(planned, &resource),
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::info!("Deleting Tines Resource");

        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Tines Resource") {
            Ok(id) => match provider_data.client.resources().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error(
                    "Error Deleting Tines Resource",
                    "delete resource",
                    &e,
                )],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for TinesResource {
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

#[async_trait]
impl ResourceWithImportState for TinesResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        tracing::info!(id = %request.id, "Importing Tines Resource");
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_int_id(
            &ctx,
            AttributePath::new("id"),
            "the Tines Resource",
            &request,
            &mut response,
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::test_support::{
        configured, create_request, delete_request, read_request, update_request,
    };
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::collections::HashMap;

    fn resource_body(value: Value) -> String {
        json!({
            "id": 9,
            "name": "allowlist",
            "value": value,
            "value_type": "json",
            "description": "Managed via Terraform",
            "team_id": 3,
            "folder_id": null,
            "user_id": 7,
            "read_access": "TEAM",
            "shared_team_slugs": [],
            "slug": "allowlist",
            "test_resource_enabled": false,
            "referencing_action_ids": [101, 102],
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
        .to_string()
    }

    fn state(values: &[(&str, Dynamic)]) -> DynamicValue {
        let mut state = DynamicValue::object();
        for (name, value) in values {
            state
                .set_value(&AttributePath::new(name), value.clone())
                .unwrap();
        }
        state
    }

    #[tokio::test]
    async fn create_sends_plain_string_value() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/global_resources")
            .match_body(Matcher::Json(json!({
                "name": "allowlist",
                "description": "Managed via Terraform",
                "team_id": 3,
                "value": "example string"
            })))
            .with_status(201)
            .with_body(resource_body(json!("example string")))
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let plan = state(&[
            ("name", Dynamic::from("allowlist")),
            ("description", Dynamic::from("Managed via Terraform")),
            ("team_id", Dynamic::Number(3.0)),
            ("value", Dynamic::from("example string")),
            ("folder_id", Dynamic::Unknown),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let new_state = response.new_state;
        assert_eq!(new_state.get_i64(&AttributePath::new("id")).unwrap(), 9);
        assert_eq!(
            new_state.get_string(&AttributePath::new("value")).unwrap(),
            "example string"
        );
        assert_eq!(
            new_state
                .get_i64_list(&AttributePath::new("referencing_action_ids"))
                .unwrap(),
            vec![101, 102]
        );
        assert!(new_state.is_null_at(&AttributePath::new("folder_id")));
        assert!(new_state.is_null_at(&AttributePath::new("test_resource")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_sends_number_and_tuple_values() {
        let mut server = Server::new_async().await;
        let number = server
            .mock("POST", "/api/v1/global_resources")
            .match_body(Matcher::PartialJson(json!({"value": 42})))
            .with_status(201)
            .with_body(resource_body(json!(42)))
            .create_async()
            .await;
        let tuple = server
            .mock("POST", "/api/v1/global_resources")
            .match_body(Matcher::PartialJson(json!({"value": [1, 2, 3]})))
            .with_status(201)
            .with_body(resource_body(json!([1, 2, 3])))
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let numbers = Dynamic::List(vec![
            Dynamic::Number(1.0),
            Dynamic::Number(2.0),
            Dynamic::Number(3.0),
        ]);
        for value in [Dynamic::Number(42.0), numbers] {
            let plan = state(&[
                ("name", Dynamic::from("allowlist")),
                ("team_id", Dynamic::Number(3.0)),
                ("value", value.clone()),
            ]);
            let response = resource
                .create(Context::new(), create_request(TYPE_NAME, plan))
                .await;

            assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
            assert_eq!(response.new_state.get(&AttributePath::new("value")), Some(&value));
        }
        number.assert_async().await;
        tuple.assert_async().await;
    }

    #[tokio::test]
    async fn create_with_test_value_writes_test_copy() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api/v1/global_resources")
            .match_body(Matcher::PartialJson(json!({"test_resource_enabled": true})))
            .with_status(201)
            .with_body(resource_body(json!("live")))
            .create_async()
            .await;
        let test_write = server
            .mock("PUT", "/api/v1/global_resources/9")
            .match_body(Matcher::Json(json!({
                "is_test": true,
                "test_resource_enabled": true,
                "value": {"mode": "test"}
            })))
            .with_body(
                json!({"id": 10, "value": {"mode": "test"}, "test_resource_enabled": true, "test_resource": {"value": "test"}})
                    .to_string(),
            )
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let plan = state(&[
            ("name", Dynamic::from("allowlist")),
            ("team_id", Dynamic::Number(3.0)),
            ("value", Dynamic::from("live")),
            ("test_resource_enabled", Dynamic::Bool(true)),
            (
                "test_value",
                Dynamic::Map(HashMap::from([("mode".to_string(), Dynamic::from("test"))])),
            ),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let new_state = response.new_state;
        assert_eq!(new_state.get_i64(&AttributePath::new("id")).unwrap(), 9);
        assert!(new_state
            .get_bool(&AttributePath::new("test_resource_enabled"))
            .unwrap());
        assert_eq!(
            new_state.get_string(&AttributePath::new("value")).unwrap(),
            "live"
        );
        assert_eq!(
            new_state
                .get_string(&AttributePath::new("test_resource").key("value"))
                .unwrap(),
            "test"
        );
        create.assert_async().await;
        test_write.assert_async().await;
    }

    #[tokio::test]
    async fn failed_test_write_keeps_created_resource() {
        let mut server = Server::new_async().await;
        let _create = server
            .mock("POST", "/api/v1/global_resources")
            .with_status(201)
            .with_body(resource_body(json!("live")))
            .create_async()
            .await;
        let _test_write = server
            .mock("PUT", "/api/v1/global_resources/9")
            .with_status(422)
            .with_body(r#"{"errors":[{"message":"value","details":"invalid"}]}"#)
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let plan = state(&[
            ("name", Dynamic::from("allowlist")),
            ("team_id", Dynamic::Number(3.0)),
            ("value", Dynamic::from("live")),
            ("test_resource_enabled", Dynamic::Bool(true)),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "Error Adding Test Tines Resource"
        );
        assert_eq!(
            response.new_state.get_i64(&AttributePath::new("id")).unwrap(),
            9
        );
    }

    #[tokio::test]
    async fn create_rejects_unknown_value() {
        let server = Server::new_async().await;
        let resource: TinesResource = configured(&server.url()).await;
        let plan = state(&[
            ("name", Dynamic::from("allowlist")),
            ("team_id", Dynamic::Number(3.0)),
            ("value", Dynamic::List(vec![Dynamic::from("a"), Dynamic::Unknown])),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Dynamic value is unknown");
        assert!(response.new_state.is_null());
    }

    #[tokio::test]
    async fn read_refreshes_changed_value() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/global_resources/9")
            .with_body(resource_body(json!({"enabled": false})))
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let current = state(&[
            ("id", Dynamic::Number(9.0)),
            (
                "value",
                Dynamic::Map(HashMap::from([("enabled".to_string(), Dynamic::Bool(true))])),
            ),
        ]);

        let response = resource
            .read(Context::new(), read_request(TYPE_NAME, current))
            .await;

        let new_state = response.new_state.unwrap();
        assert!(!new_state
            .get_bool(&AttributePath::new("value").key("enabled"))
            .unwrap());
        assert_eq!(new_state.get_i64(&AttributePath::new("team_id")).unwrap(), 3);
    }

    #[tokio::test]
    async fn read_maps_json_text_back_without_drift() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/global_resources/9")
            .with_body(resource_body(json!("[1,2,3]")))
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let tuple = Dynamic::List(vec![
            Dynamic::Number(1.0),
            Dynamic::Number(2.0),
            Dynamic::Number(3.0),
        ]);
        for previous in [tuple.clone(), Dynamic::from("[1,2,3]")] {
            let current = state(&[("id", Dynamic::Number(9.0)), ("value", previous.clone())]);
            let response = resource
                .read(Context::new(), read_request(TYPE_NAME, current))
                .await;

            let new_state = response.new_state.unwrap();
            assert_eq!(new_state.get(&AttributePath::new("value")), Some(&previous));
        }

        // Imported state has nothing to compare against and takes the decoded value
        let imported = state(&[("id", Dynamic::Number(9.0))]);
        let response = resource
            .read(Context::new(), read_request(TYPE_NAME, imported))
            .await;
        assert_eq!(
            response.new_state.unwrap().get(&AttributePath::new("value")),
            Some(&tuple)
        );
    }

    #[test]
    fn api_string_that_is_not_json_stays_a_string() {
        assert_eq!(
            value_from_api(&json!("example string"), None),
            Dynamic::from("example string")
        );
        assert_eq!(value_from_api(&json!(7), None), Dynamic::Number(7.0));
    }

    #[tokio::test]
    async fn read_removes_missing_resource() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/global_resources/9")
            .with_status(404)
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let response = resource
            .read(
                Context::new(),
                read_request(TYPE_NAME, state(&[("id", Dynamic::Number(9.0))])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn update_sends_every_configured_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/v1/global_resources/9")
            .match_body(Matcher::Json(json!({
                "name": "renamed",
                "description": "Blocked domains",
                "value": 5,
                "folder_id": 4,
                "read_access": "SPECIFIC_TEAMS",
                "shared_team_slugs": ["blue"],
                "test_resource_enabled": false
            })))
            .with_body(resource_body(json!(5)))
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let prior = state(&[
            ("id", Dynamic::Number(9.0)),
            ("name", Dynamic::from("allowlist")),
            ("value", Dynamic::Number(4.0)),
        ]);
        let plan = state(&[
            ("id", Dynamic::Number(9.0)),
            ("name", Dynamic::from("renamed")),
            ("description", Dynamic::from("Blocked domains")),
            ("value", Dynamic::Number(5.0)),
            ("folder_id", Dynamic::Number(4.0)),
            ("read_access", Dynamic::from("SPECIFIC_TEAMS")),
            ("shared_team_slugs", Dynamic::List(vec![Dynamic::from("blue")])),
            ("test_resource_enabled", Dynamic::Bool(false)),
        ]);

        let response = resource
            .update(Context::new(), update_request(TYPE_NAME, prior, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            response.new_state.get_i64(&AttributePath::new("value")).unwrap(),
            5
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_calls_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v1/global_resources/9")
            .with_status(204)
            .create_async()
            .await;

        let resource: TinesResource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                delete_request(TYPE_NAME, state(&[("id", Dynamic::Number(9.0))])),
            )
            .await;

        assert!(response.diagnostics.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn import_rejects_non_numeric_id() {
        let resource = TinesResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "allowlist".to_string(),
                    client_capabilities: Default::default(),
                },
            )
            .await;

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics[0].summary, "Import Error");
        assert!(response.diagnostics[0]
            .detail
            .starts_with("Could not determine the ID of the Tines Resource"));
    }

    #[tokio::test]
    async fn schema_requires_read_access_for_shared_slugs() {
        let schema = TinesResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;
        let config = state(&[
            ("name", Dynamic::from("allowlist")),
            ("value", Dynamic::from("1")),
            ("team_id", Dynamic::Number(3.0)),
            (
                "shared_team_slugs",
                Dynamic::List(vec![Dynamic::from("blue")]),
            ),
        ]);
        let diagnostics = schema.block.validate_config(&config);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.contains("read_access"));
    }

    #[tokio::test]
    async fn schema_accepts_any_value_type() {
        let schema = TinesResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;
        for name in ["value", "test_value", "test_resource"] {
            assert_eq!(
                schema.attribute(name).map(|a| &a.r#type),
                Some(&AttributeType::Dynamic)
            );
        }

        for value in [
            Dynamic::from("example string"),
            Dynamic::Number(42.0),
            Dynamic::List(vec![Dynamic::Number(1.0), Dynamic::from("two")]),
        ] {
            let config = state(&[
                ("name", Dynamic::from("allowlist")),
                ("team_id", Dynamic::Number(3.0)),
                ("value", value),
            ]);
            assert!(schema.block.validate_config(&config).is_empty());
        }
    }
}
