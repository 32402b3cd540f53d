//! Annotation resource implementation

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
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
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::StateBuilder;

use super::{api_error, i64_attr, refresh_error, state_id, string_attr};
use crate::api::annotations::Annotation;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_annotation";

#[derive(Default)]
pub struct AnnotationResource {
    provider_data: Option<TinesProviderData>,
}

impl AnnotationResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plan_to_annotation(planned: &DynamicValue) -> Annotation {
    let position = planned
        .get_map(&AttributePath::new("position"))
        .ok()
        .map(|entries| {
            entries
                .into_iter()
                .filter_map(|(key, value)| value.as_f64().map(|v| (key, v as i64)))
                .collect::<BTreeMap<String, i64>>()
        });

    Annotation {
        story_id: i64_attr(planned, "story_id"),
        content: string_attr(planned, "content"),
        position,
        ..Default::default()
    }
}

fn annotation_to_state(base: &DynamicValue, annotation: &Annotation) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base).opt_int("id", annotation.id);
    if let Some(story_id) = annotation.story_id {
        builder = builder.int("story_id", story_id);
    }
    if let Some(content) = &annotation.content {
        builder = builder.string("content", content.clone());
    }
    if let Some(position) = &annotation.position {
        let position: HashMap<String, Dynamic> = position
            .iter()
            .map(|(key, value)| (key.clone(), Dynamic::Number(*value as f64)))
            .collect();
        builder = builder.map("position", position);
    }
    builder.build()
}

#[async_trait]
impl Resource for AnnotationResource {
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
            .description("Manages an annotation on a Tines story diagram.")
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
                    .description("Markdown content of the annotation.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "position",
                    AttributeType::Map(Box::new(AttributeType::Number)),
                )
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

        let annotation = plan_to_annotation(&request.planned_state);
        match provider_data.client.annotations().create(&annotation).await {
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
                diagnostics: vec![api_error(
                    "Error Creating Tines Annotation",
                    "create annotation",
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

        let id = match state_id(&request.current_state, "Annotation") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.annotations().get(id).await {
            Ok(annotation) => ReadResourceResponse {
                new_state: Some(annotation_to_state(&request.current_state, &annotation)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Annotation no longer exists, removing from state");
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

        let id = match state_id(&request.prior_state, "Annotation") {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let annotation = plan_to_annotation(&request.planned_state);
        match provider_data
            .client
            .annotations()
            .update(id, &annotation)
            .await
        {
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
                diagnostics: vec![api_error(
                    "Error Updating Tines Annotation",
                    "update annotation",
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

        let diagnostics = match state_id(&request.prior_state, "Annotation") {
            Ok(id) => match provider_data.client.annotations().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error(
                    "Error Deleting Tines Annotation",
                    "delete annotation",
                    &e,
                )],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for AnnotationResource {
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
