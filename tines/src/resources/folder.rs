//! Folder resource implementation

use async_trait::async_trait;
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

use super::{api_error, i64_attr, refresh_error, state_id, string_attr};
use crate::api::folders::Folder;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_folder";

#[derive(Default)]
pub struct FolderResource {
    provider_data: Option<TinesProviderData>,
}

impl FolderResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plan_to_folder(planned: &DynamicValue) -> Folder {
    Folder {
        name: string_attr(planned, "name"),
        content_type: string_attr(planned, "content_type"),
        team_id: i64_attr(planned, "team_id"),
        ..Default::default()
    }
}

fn folder_to_state(base: &DynamicValue, folder: &Folder) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base)
        .opt_int("id", folder.id)
        .opt_int("size", folder.size);
    if let Some(name) = &folder.name {
        builder = builder.string("name", name.clone());
    }
    if let Some(content_type) = &folder.content_type {
        builder = builder.string("content_type", content_type.clone());
    }
    if let Some(team_id) = folder.team_id {
        builder = builder.int("team_id", team_id);
    }
    builder.build()
}

#[async_trait]
impl Resource for FolderResource {
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
            .description("Manages a Tines folder.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The folder name.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content_type", AttributeType::String)
                    .description("What the folder holds: STORY, CREDENTIAL or RESOURCE.")
                    .optional()
                    .validator(StringOneOf::create(vec!["STORY", "CREDENTIAL", "RESOURCE"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("team_id", AttributeType::Number)
                    .description("The ID of the team that owns the folder.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Number of items in the folder.")
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

        let folder = plan_to_folder(&request.planned_state);
        match provider_data.client.folders().create(&folder).await {
            Ok(created) => CreateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .opt_int("id", created.id)
                    .opt_int("size", created.size)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![api_error("Error Creating Tines Folder", "create folder", &e)],
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

        let id = match state_id(&request.current_state, "Folder") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.folders().get(id).await {
            Ok(folder) => ReadResourceResponse {
                new_state: Some(folder_to_state(&request.current_state, &folder)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Folder no longer exists, removing from state");
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

        let id = match state_id(&request.prior_state, "Folder") {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let folder = plan_to_folder(&request.planned_state);
        match provider_data.client.folders().update(id, &folder).await {
            Ok(updated) => UpdateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .int("id", id)
                    .opt_int("size", updated.size)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![api_error("Error Updating Tines Folder", "update folder", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Folder") {
            Ok(id) => match provider_data.client.folders().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Error Deleting Tines Folder", "delete folder", &e)],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for FolderResource {
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
    use crate::resources::test_support::{configured, create_request, update_request};
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

    #[tokio::test]
    async fn create_records_id_and_size() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/folders")
            .match_body(Matcher::Json(json!({
                "name": "Detections",
                "content_type": "STORY",
                "team_id": 3
            })))
            .with_status(201)
            .with_body(r#"{"id": 4, "name": "Detections", "content_type": "STORY", "team_id": 3, "size": 0}"#)
            .create_async()
            .await;

        let resource: FolderResource = configured(&server.url()).await;
        let plan = state(&[
            ("name", Dynamic::from("Detections")),
            ("content_type", Dynamic::from("STORY")),
            ("team_id", Dynamic::Number(3.0)),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.get_i64(&AttributePath::new("id")).unwrap(), 4);
        assert_eq!(response.new_state.get_i64(&AttributePath::new("size")).unwrap(), 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_failure_keeps_prior_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/v1/folders/4")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let resource: FolderResource = configured(&server.url()).await;
        let prior = state(&[("id", Dynamic::Number(4.0)), ("name", Dynamic::from("a"))]);
        let plan = state(&[("id", Dynamic::Number(4.0)), ("name", Dynamic::from("b"))]);

        let response = resource
            .update(Context::new(), update_request(TYPE_NAME, prior.clone(), plan))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Error Updating Tines Folder");
        assert_eq!(response.new_state, prior);
    }
}
