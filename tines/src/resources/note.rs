//! Diagram note resource implementation
//!
//! `position` is free-form: JSON when it parses, otherwise sent as text.

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
use tfplug::StateBuilder;

use super::global_resource::value_text;
use super::{api_error, i64_attr, refresh_error, state_id, string_attr};
use crate::api::notes::Note;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_note";

#[derive(Default)]
pub struct NoteResource {
    provider_data: Option<TinesProviderData>,
}

impl NoteResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plan_to_note(planned: &DynamicValue) -> Note {
    Note {
        story_id: i64_attr(planned, "story_id"),
        content: string_attr(planned, "content"),
        position: string_attr(planned, "position")
            .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw))),
        ..Default::default()
    }
}

fn note_to_state(base: &DynamicValue, note: &Note) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base).opt_int("id", note.id);
    if let Some(story_id) = note.story_id {
        builder = builder.int("story_id", story_id);
    }
    if let Some(content) = &note.content {
        builder = builder.string("content", content.clone());
    }
    if let Some(position) = &note.position {
        builder = builder.string(
            "position",
            value_text(string_attr(base, "position"), position),
        );
    }
    builder.build()
}

#[async_trait]
impl Resource for NoteResource {
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
            .description("Manages a note on a Tines story diagram.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("story_id", AttributeType::Number)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("content", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("position", AttributeType::String)
                    .description("Diagram coordinates as a JSON object, e.g. {\"x\": 0, \"y\": 0}.")
                    .optional()
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

        let note = plan_to_note(&request.planned_state);
        match provider_data.client.notes().create(&note).await {
            Ok(created) => CreateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .opt_int("id", created.id)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![api_error("Error Creating Tines Note", "create note", &e)],
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

        let id = match state_id(&request.current_state, "Note") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.notes().get(id).await {
            Ok(note) => ReadResourceResponse {
                new_state: Some(note_to_state(&request.current_state, &note)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Note no longer exists, removing from state");
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

        let id = match state_id(&request.prior_state, "Note") {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let note = plan_to_note(&request.planned_state);
        match provider_data.client.notes().update(id, &note).await {
            Ok(_) => UpdateResourceResponse {
                new_state: StateBuilder::from_state(&request.planned_state)
                    .int("id", id)
                    .build(),
                private: vec![],
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![api_error("Error Updating Tines Note", "update note", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Note") {
            Ok(id) => match provider_data.client.notes().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Error Deleting Tines Note", "delete note", &e)],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for NoteResource {
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
    use crate::resources::test_support::{configured, create_request, delete_request};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::types::AttributePath;

    #[test]
    fn position_falls_back_to_text() {
        let plan = StateBuilder::new().string("position", "top-left").build();
        assert_eq!(plan_to_note(&plan).position, Some(json!("top-left")));

        let plan = StateBuilder::new().string("position", "{\"x\": 1}").build();
        assert_eq!(plan_to_note(&plan).position, Some(json!({"x": 1})));
    }

    #[tokio::test]
    async fn create_posts_to_diagram_notes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/diagram_notes")
            .match_body(Matcher::Json(json!({
                "story_id": 42,
                "content": "Escalate to on-call",
                "position": {"x": 0, "y": 80}
            })))
            .with_status(201)
            .with_body(r#"{"id": 8}"#)
            .create_async()
            .await;

        let resource: NoteResource = configured(&server.url()).await;
        let plan = StateBuilder::new()
            .int("story_id", 42)
            .string("content", "Escalate to on-call")
            .string("position", "{\"x\": 0, \"y\": 80}")
            .build();

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(response.new_state.get_i64(&AttributePath::new("id")).unwrap(), 8);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_reports_not_found_as_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v1/diagram_notes/8")
            .with_status(404)
            .create_async()
            .await;

        let resource: NoteResource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                delete_request(TYPE_NAME, StateBuilder::new().int("id", 8).build()),
            )
            .await;

        assert_eq!(response.diagnostics[0].summary, "Error Deleting Tines Note");
    }
}
