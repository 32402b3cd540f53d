//! Agent (story action) resource implementation

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{NumberAtLeast, StringIsJson};
use tfplug::StateBuilder;

use super::{
    api_error, bool_attr, i64_attr, i64_list_attr, json_state_string, refresh_error, state_id,
    string_attr,
};
use crate::api::agents::Agent;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_agent";

/// One week, in seconds
pub const DEFAULT_KEEP_EVENTS_FOR: i64 = 604_800;

#[derive(Default)]
pub struct AgentResource {
    provider_data: Option<TinesProviderData>,
}

impl AgentResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn plan_to_agent(planned: &DynamicValue) -> Result<Agent, Diagnostic> {
    let options = match string_attr(planned, "agent_options") {
        Some(raw) => Some(serde_json::from_str::<Value>(&raw).map_err(|e| {
            Diagnostic::error(
                "Invalid JSON",
                format!("Attribute \"agent_options\" is not valid JSON: {}", e),
            )
            .with_attribute(AttributePath::new("agent_options"))
        })?),
        None => None,
    };

    let position = planned
        .get_map(&AttributePath::new("position"))
        .ok()
        .map(|entries| {
            entries
                .into_iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key, Value::from(v))))
                .collect::<Map<String, Value>>()
        });

    Ok(Agent {
        name: string_attr(planned, "name"),
        agent_type: string_attr(planned, "agent_type"),
        story_id: i64_attr(planned, "story_id"),
        keep_events_for: i64_attr(planned, "keep_events_for"),
        disabled: bool_attr(planned, "disabled"),
        monitor_failures: bool_attr(planned, "monitor_failures"),
        monitor_all_events: bool_attr(planned, "monitor_all_events"),
        source_ids: i64_list_attr(planned, "source_ids"),
        receiver_ids: i64_list_attr(planned, "receiver_ids"),
        options,
        position,
        ..Default::default()
    })
}

/// Positions come back as numbers; state holds them as strings.
fn position_to_state(position: &Map<String, Value>) -> HashMap<String, Dynamic> {
    position
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), Dynamic::String(text))
        })
        .collect()
}

fn agent_to_state(base: &DynamicValue, agent: &Agent) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base)
        .opt_int("id", agent.id)
        .opt_string("guid", agent.guid.clone())
        .opt_int("user_id", agent.user_id)
        .opt_int("keep_events_for", agent.keep_events_for);

    if let Some(name) = &agent.name {
        builder = builder.string("name", name.clone());
    }
    if let Some(agent_type) = &agent.agent_type {
        builder = builder.string("agent_type", agent_type.clone());
    }
    if let Some(story_id) = agent.story_id {
        builder = builder.int("story_id", story_id);
    }
    if let Some(options) = &agent.options {
        builder = builder.string(
            "agent_options",
            json_state_string(string_attr(base, "agent_options"), options),
        );
    }
    if let Some(position) = &agent.position {
        builder = builder.map("position", position_to_state(position));
    }
    for (name, flag) in [
        ("disabled", agent.disabled),
        ("monitor_failures", agent.monitor_failures),
        ("monitor_all_events", agent.monitor_all_events),
    ] {
        if let Some(flag) = flag {
            builder = builder.bool(name, flag);
        }
    }
    if let Some(source_ids) = &agent.source_ids {
        builder = builder.int_list("source_ids", source_ids);
    }
    if let Some(receiver_ids) = &agent.receiver_ids {
        builder = builder.int_list("receiver_ids", receiver_ids);
    }

    builder.build()
}

/// Record what Tines assigned on create or update, keeping the planned values.
fn computed_from(planned: &DynamicValue, agent: &Agent) -> DynamicValue {
    StateBuilder::from_state(planned)
        .opt_int("id", agent.id)
        .opt_string("guid", agent.guid.clone())
        .opt_int("user_id", agent.user_id)
        .build()
}

#[async_trait]
impl Resource for AgentResource {
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
            .description("Manages a single action within a Tines story.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("guid", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_id", AttributeType::Number)
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
                AttributeBuilder::new("name", AttributeType::String)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("agent_type", AttributeType::String)
                    .description("The action type, e.g. Agents::HTTPRequestAgent.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("agent_options", AttributeType::String)
                    .description("The action options as a JSON-encoded string.")
                    .optional()
                    .validator(StringIsJson::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("keep_events_for", AttributeType::Number)
                    .description("Event retention period in seconds.")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(DEFAULT_KEEP_EVENTS_FOR as f64))
                    .validator(NumberAtLeast::create(0.0))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disabled", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("monitor_failures", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("monitor_all_events", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "position",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                .description("Diagram coordinates, keyed x and y.")
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "source_ids",
                    AttributeType::List(Box::new(AttributeType::Number)),
                )
                .optional()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "receiver_ids",
                    AttributeType::List(Box::new(AttributeType::Number)),
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

        let result = match plan_to_agent(&request.planned_state) {
            Ok(agent) => provider_data
                .client
                .agents()
                .create(&agent)
                .await
                .map_err(|e| api_error("Error Creating Tines Agent", "create agent", &e)),
            Err(diag) => Err(diag),
        };

        match result {
            Ok(created) => CreateResourceResponse {
                new_state: computed_from(&request.planned_state, &created),
                private: vec![],
                diagnostics: vec![],
            },
            Err(diag) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![diag],
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

        let id = match state_id(&request.current_state, "Agent") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.agents().get(id).await {
            Ok(agent) => ReadResourceResponse {
                new_state: Some(agent_to_state(&request.current_state, &agent)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Agent no longer exists, removing from state");
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

        let result = match (
            state_id(&request.prior_state, "Agent"),
            plan_to_agent(&request.planned_state),
        ) {
            (Ok(id), Ok(agent)) => provider_data
                .client
                .agents()
                .update(id, &agent)
                .await
                .map_err(|e| api_error("Error Updating Tines Agent", "update agent", &e)),
            (Err(diag), _) | (_, Err(diag)) => Err(diag),
        };

        match result {
            Ok(updated) => UpdateResourceResponse {
                new_state: computed_from(&request.planned_state, &updated),
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
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Agent") {
            Ok(id) => match provider_data.client.agents().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Error Deleting Tines Agent", "delete agent", &e)],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for AgentResource {
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
