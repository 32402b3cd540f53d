//! Story resource implementation
//!
//! A story is managed either from an exported story JSON document (`data`),
//! which is pushed through the import endpoint, or from individual settings
//! sent through the regular create and update endpoints.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_int_id;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, ResourceWithUpgradeState, UpdateResourceRequest,
    UpdateResourceResponse, UpgradeResourceStateRequest, UpgradeResourceStateResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{AlsoRequires, ConflictsWith, StringOneOf};
use tfplug::StateBuilder;

use super::{
    api_error, bool_attr, i64_attr, i64_list_attr, refresh_error, state_id, string_attr,
    string_list_attr,
};
use crate::api::stories::{Story, StoryImportRequest, IMPORT_MODE_VERSION_REPLACE};
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_story";

const DESCRIPTION: &str = "A Tines Story resource can be managed either via a Story JSON export file, \
or by setting configuration values on the resource. We recommend managing Stories via JSON export \
files if you rely on Terraform to manage change control for storyboard content. Otherwise, if you \
use Tines' built-in Change Control feature, we recommend only enforcing configuration values via Terraform.";

const DEPRECATED_CREDENTIAL: &str = "Value will be overridden by the value set in the provider credentials. This field will be removed in a future version.";

/// Settings the create endpoint ignores; they need a follow-up update.
const UPDATE_ONLY_ATTRIBUTES: [&str; 7] = [
    "change_control_enabled",
    "send_to_story_access",
    "send_to_story_access_source",
    "send_to_story_enabled",
    "send_to_story_skill_use_requires_confirmation",
    "shared_team_slugs",
    "locked",
];

#[derive(Default)]
pub struct StoryResource {
    provider_data: Option<TinesProviderData>,
}

impl StoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import an exported story document. Used by both create and update.
    async fn import_story(
        &self,
        provider_data: &TinesProviderData,
        planned: &DynamicValue,
    ) -> Result<Story, Diagnostic> {
        let raw = string_attr(planned, "data").unwrap_or_default();
        let request = build_import_request(&raw, planned)?;

        provider_data
            .client
            .stories()
            .import(&request)
            .await
            .map_err(|e| api_error("Error Importing Tines Story", "import story", &e))
    }

    async fn create_story(
        &self,
        provider_data: &TinesProviderData,
        planned: &DynamicValue,
    ) -> Result<Story, Diagnostic> {
        let new_story = Story {
            team_id: i64_attr(planned, "team_id"),
            name: string_attr(planned, "name"),
            description: string_attr(planned, "description"),
            keep_events_for: i64_attr(planned, "keep_events_for"),
            folder_id: i64_attr(planned, "folder_id"),
            tags: string_list_attr(planned, "tags"),
            disabled: bool_attr(planned, "disabled"),
            priority: bool_attr(planned, "priority"),
            ..Default::default()
        };

        let story = provider_data
            .client
            .stories()
            .create(&new_story)
            .await
            .map_err(|e| api_error("Error Creating Tines Story", "create story", &e))?;

        let requires_update = UPDATE_ONLY_ATTRIBUTES
            .iter()
            .any(|name| planned.is_set(&AttributePath::new(name)));
        if !requires_update {
            return Ok(story);
        }

        tracing::info!(
            "Some fields present require an additional update to the Story for the values to be set, running Story Update."
        );
        let id = story.id.unwrap_or_default();
        let update = Story {
            change_control_enabled: bool_attr(planned, "change_control_enabled"),
            send_to_story_access: string_attr(planned, "send_to_story_access"),
            send_to_story_access_source: string_attr(planned, "send_to_story_access_source"),
            send_to_story_enabled: bool_attr(planned, "send_to_story_enabled"),
            send_to_story_skill_use_requires_confirmation: bool_attr(
                planned,
                "send_to_story_skill_use_requires_confirmation",
            ),
            shared_team_slugs: string_list_attr(planned, "shared_team_slugs"),
            locked: bool_attr(planned, "locked"),
            ..Default::default()
        };

        provider_data
            .client
            .stories()
            .update(id, &update)
            .await
            .map_err(|e| api_error("Error Updating Tines Story", "update story", &e))
    }
}

/// Parse an exported story and build the import body.
fn build_import_request(
    raw: &str,
    planned: &DynamicValue,
) -> Result<StoryImportRequest, Diagnostic> {
    let data: Map<String, Value> = serde_json::from_str(raw)
        .map_err(|e| Diagnostic::error("Invalid JSON in file", e.to_string()))?;

    let new_name = match data.get("name") {
        Some(Value::String(name)) => name.clone(),
        _ => {
            return Err(Diagnostic::error(
                "Invalid string",
                "The 'name' field in the imported story must be a string",
            ))
        }
    };

    Ok(StoryImportRequest {
        new_name,
        data,
        team_id: i64_attr(planned, "team_id").unwrap_or_default(),
        folder_id: i64_attr(planned, "folder_id"),
        mode: IMPORT_MODE_VERSION_REPLACE.to_string(),
    })
}

/// Settings sent by a plain update.
fn story_from_plan(planned: &DynamicValue) -> Story {
    Story {
        name: string_attr(planned, "name"),
        description: string_attr(planned, "description"),
        keep_events_for: i64_attr(planned, "keep_events_for"),
        disabled: bool_attr(planned, "disabled"),
        locked: bool_attr(planned, "locked"),
        priority: bool_attr(planned, "priority"),
        send_to_story_enabled: bool_attr(planned, "send_to_story_enabled"),
        send_to_story_access_source: string_attr(planned, "send_to_story_access_source"),
        send_to_story_access: string_attr(planned, "send_to_story_access"),
        shared_team_slugs: string_list_attr(planned, "shared_team_slugs"),
        send_to_story_skill_use_requires_confirmation: bool_attr(
            planned,
            "send_to_story_skill_use_requires_confirmation",
        ),
        entry_agent_id: i64_attr(planned, "entry_agent_id"),
        exit_agents: i64_list_attr(planned, "exit_agents"),
        team_id: i64_attr(planned, "team_id"),
        folder_id: i64_attr(planned, "folder_id"),
        ..Default::default()
    }
}

/// Merge an API story into `base`, keeping the attributes the API does not
/// return (data and the deprecated credentials).
fn story_to_state(base: &DynamicValue, story: &Story) -> DynamicValue {
    let mut builder = StateBuilder::from_state(base)
        .opt_int("id", story.id)
        .opt_string("name", story.name.clone())
        .opt_int("user_id", story.user_id)
        .opt_string("description", story.description.clone())
        .opt_int("keep_events_for", story.keep_events_for)
        .opt_bool("disabled", story.disabled)
        .opt_bool("priority", story.priority)
        .opt_bool("send_to_story_enabled", story.send_to_story_enabled)
        .opt_string(
            "send_to_story_access_source",
            story.send_to_story_access_source.clone(),
        )
        .opt_string("send_to_story_access", story.send_to_story_access.clone())
        .opt_bool(
            "send_to_story_skill_use_requires_confirmation",
            story.send_to_story_skill_use_requires_confirmation,
        )
        .string_list(
            "shared_team_slugs",
            story.shared_team_slugs.as_deref().unwrap_or_default(),
        )
        .opt_int("entry_agent_id", story.entry_agent_id)
        .int_list("exit_agents", story.exit_agents.as_deref().unwrap_or_default())
        .string_list("tags", story.tags.as_deref().unwrap_or_default())
        .opt_string("guid", story.guid.clone())
        .opt_string("slug", story.slug.clone())
        .opt_string("created_at", story.created_at.clone())
        .opt_string("edited_at", story.edited_at.clone())
        .opt_string("mode", story.mode.clone())
        .opt_int("folder_id", story.folder_id)
        .opt_bool("published", story.published)
        .opt_bool("change_control_enabled", story.change_control_enabled)
        .opt_bool("locked", story.locked)
        .int_list("owners", story.owners.as_deref().unwrap_or_default())
        .string("last_updated", chrono::Utc::now().to_rfc3339());

    if let Some(team_id) = story.team_id {
        builder = builder.int("team_id", team_id);
    }

    builder.build()
}

fn conflicts_with_data() -> Box<dyn tfplug::schema::Validator> {
    ConflictsWith::create(vec!["data"])
}

#[async_trait]
impl Resource for StoryResource {
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
            .version(1)
            .description(DESCRIPTION)
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .description("The Tines-generated identifier for this story.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("data", AttributeType::String)
                    .description("A local JSON file containing an exported Tines story. Setting this value can only be combined with the team_id and folder_id attributes.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tines_api_token", AttributeType::String)
                    .description(DEPRECATED_CREDENTIAL)
                    .optional()
                    .sensitive()
                    .deprecated()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tenant_url", AttributeType::String)
                    .description(DEPRECATED_CREDENTIAL)
                    .optional()
                    .deprecated()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("team_id", AttributeType::Number)
                    .description("The ID of the team that this story belongs to.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("folder_id", AttributeType::Number)
                    .description("The ID of the folder where this story should be organized. The folder ID must belong to the associated team that owns this story.")
                    .optional()
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The name of the Tines story.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_id", AttributeType::Number)
                    .description("ID of the story creator.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("A user-defined description of the story.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("keep_events_for", AttributeType::Number)
                    .description("Defined event retention period in seconds.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disabled", AttributeType::Bool)
                    .description("Boolean flag indicating whether the story is disabled from running.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("priority", AttributeType::Bool)
                    .description("Boolean flag indicating whether story runs with high priority.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("send_to_story_enabled", AttributeType::Bool)
                    .description("Boolean flag indicating if Send to Story is enabled. Deprecated: set send_to_story_access_source instead.")
                    .optional()
                    .computed()
                    .deprecated()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("send_to_story_access_source", AttributeType::String)
                    .description("Valid values are STS, STS_AND_WORKBENCH, WORKBENCH or OFF indicating where the Send to Story can be used.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .validator(StringOneOf::create(vec![
                        "STS",
                        "STS_AND_WORKBENCH",
                        "WORKBENCH",
                        "OFF",
                    ]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("send_to_story_access", AttributeType::String)
                    .description("Controls who is allowed to send to this story (TEAM, GLOBAL, SPECIFIC_TEAMS). default: TEAM.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .validator(StringOneOf::create(vec!["TEAM", "GLOBAL", "SPECIFIC_TEAMS"]))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "send_to_story_skill_use_requires_confirmation",
                    AttributeType::Bool,
                )
                .description("Boolean flag indicating whether Workbench should ask for confirmation before running this story.")
                .optional()
                .computed()
                .validator(conflicts_with_data())
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "shared_team_slugs",
                    AttributeType::List(Box::new(AttributeType::String)),
                )
                .description("Array of team slugs that can send to this story. Required to set send_to_story_access to SPECIFIC_TEAMS.")
                .optional()
                .computed()
                .validator(conflicts_with_data())
                .validator(AlsoRequires::create(vec!["send_to_story_access"]))
                .build(),
            )
            .attribute(
                AttributeBuilder::new("entry_agent_id", AttributeType::Number)
                    .description("The ID of the entry action for this story (action must be of type Webhook).")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "exit_agents",
                    AttributeType::List(Box::new(AttributeType::Number)),
                )
                .description("An Array of IDs describing exit actions for this story (actions must be message-only mode event transformation).")
                .optional()
                .computed()
                .validator(conflicts_with_data())
                .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::List(Box::new(AttributeType::String)))
                    .description("An array of tag names to apply to the story.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("guid", AttributeType::String)
                    .description("The globally unique identifier of the story.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .description("An underscored representation of the story name.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("created_at", AttributeType::String)
                    .description("ISO 8601 Timestamp representing date and time the story was created.")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("edited_at", AttributeType::String)
                    .description("ISO 8601 Timestamp representing date and time the story was last logically updated.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("mode", AttributeType::String)
                    .description("The mode of the story (LIVE or TEST).")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("published", AttributeType::Bool)
                    .description("Boolean flag indicating whether the story is published.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("change_control_enabled", AttributeType::Bool)
                    .description("Boolean flag indicating if change control is enabled.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("locked", AttributeType::Bool)
                    .description("Boolean flag indicating whether the story is locked, preventing edits.")
                    .optional()
                    .computed()
                    .validator(conflicts_with_data())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("owners", AttributeType::List(Box::new(AttributeType::Number)))
                    .description("List of user IDs that are listed as owners on the story.")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("last_updated", AttributeType::String)
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
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];

        if bool_attr(&request.config, "send_to_story_enabled") == Some(true) {
            for required in ["entry_agent_id", "exit_agents"] {
                if request.config.is_null_at(&AttributePath::new(required)) {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid Attribute Combination",
                            format!(
                                "Attribute \"{}\" must be specified when \"send_to_story_enabled\" is true",
                                required
                            ),
                        )
                        .with_attribute(AttributePath::new("send_to_story_enabled")),
                    );
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        tracing::info!("Creating Story");

        let Some(provider_data) = &self.provider_data else {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let planned = &request.planned_state;
        let result = if planned.is_set(&AttributePath::new("data")) {
            tracing::info!("Exported Story payload detected, using the Import strategy");
            self.import_story(provider_data, planned).await
        } else {
            tracing::info!("No exported Story payload detected, using the Create strategy");
            self.create_story(provider_data, planned).await
        };

        match result {
            Ok(story) => CreateResourceResponse {
                new_state: story_to_state(planned, &story),
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

        let id = match state_id(&request.current_state, "Story") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.stories().get(id).await {
            Ok(story) => ReadResourceResponse {
                new_state: Some(story_to_state(&request.current_state, &story)),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Story no longer exists, removing from state");
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
        tracing::info!("Updating Story");

        let Some(provider_data) = &self.provider_data else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                private: vec![],
                diagnostics: vec![not_configured()],
            };
        };

        let planned = &request.planned_state;
        let data_path = AttributePath::new("data");
        let data_changed = planned.is_set(&data_path)
            && string_attr(planned, "data") != string_attr(&request.prior_state, "data");

        let result = if data_changed {
            tracing::info!("Exported Story payload detected, using the Import strategy");
            self.import_story(provider_data, planned).await
        } else {
            match state_id(&request.prior_state, "Story") {
                Ok(id) => provider_data
                    .client
                    .stories()
                    .update(id, &story_from_plan(planned))
                    .await
                    .map_err(|e| api_error("Error Updating Tines Story", "update story", &e)),
                Err(diag) => Err(diag),
            }
        };

        match result {
            Ok(story) => UpdateResourceResponse {
                new_state: story_to_state(planned, &story),
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

        let id = match state_id(&request.prior_state, "Story") {
            Ok(id) => id,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };

        let diagnostics = match provider_data.client.stories().delete(id).await {
            Ok(()) => vec![],
            Err(e) => vec![api_error("Error Deleting Tines Story", "delete story", &e)],
        };

        DeleteResourceResponse { diagnostics }
    }

    fn as_upgrade_state(&self) -> Option<&dyn ResourceWithUpgradeState> {
        Some(self)
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for StoryResource {
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
impl ResourceWithUpgradeState for StoryResource {
    /// Version 0 only tracked an exported story plus per-resource credentials.
    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        if request.version != 0 {
            return UpgradeResourceStateResponse {
                upgraded_state: DynamicValue::null(),
                diagnostics: vec![Diagnostic::error(
                    "Unable to Upgrade Resource State",
                    format!(
                        "No upgrade path from tines_story schema version {}",
                        request.version
                    ),
                )],
            };
        }

        let prior = match request.raw_state.json.as_deref().map(DynamicValue::decode_json) {
            Some(Ok(prior)) => prior,
            Some(Err(e)) => {
                return UpgradeResourceStateResponse {
                    upgraded_state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error(
                        "Unable to Upgrade Resource State",
                        format!("Prior state could not be decoded: {}", e),
                    )],
                }
            }
            None => {
                return UpgradeResourceStateResponse {
                    upgraded_state: DynamicValue::null(),
                    diagnostics: vec![Diagnostic::error(
                        "Unable to Upgrade Resource State",
                        "Prior state has no JSON representation",
                    )],
                }
            }
        };

        let upgraded = StateBuilder::new()
            .opt_int("id", i64_attr(&prior, "id"))
            .opt_string("data", string_attr(&prior, "data"))
            .opt_string("tines_api_token", string_attr(&prior, "tines_api_token"))
            .opt_string("tenant_url", string_attr(&prior, "tenant_url"))
            .opt_int("folder_id", i64_attr(&prior, "folder_id"))
            .build();

        UpgradeResourceStateResponse {
            upgraded_state: upgraded,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithImportState for StoryResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        tracing::info!(id = %request.id, "Importing Story");
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_int_id(
            &ctx,
            AttributePath::new("id"),
            "the Tines Story",
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
    use tfplug::types::{Dynamic, RawState};

    const STORY_BODY: &str = r#"{
        "id": 42,
        "name": "Phishing triage",
        "user_id": 7,
        "description": "Handles reported emails",
        "keep_events_for": 604800,
        "disabled": false,
        "priority": false,
        "send_to_story_enabled": false,
        "send_to_story_access_source": "OFF",
        "send_to_story_access": "TEAM",
        "send_to_story_skill_use_requires_confirmation": true,
        "shared_team_slugs": [],
        "entry_agent_id": null,
        "exit_agents": [],
        "team_id": 3,
        "tags": ["email"],
        "guid": "abc123",
        "slug": "phishing_triage",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-02T00:00:00Z",
        "edited_at": "2024-01-02T00:00:00Z",
        "mode": "LIVE",
        "folder_id": 11,
        "published": true,
        "change_control_enabled": false,
        "locked": false,
        "owners": [7]
    }"#;

    fn planned(values: &[(&str, Dynamic)]) -> DynamicValue {
        let mut state = DynamicValue::object();
        for (name, value) in values {
            state
                .set_value(&AttributePath::new(name), value.clone())
                .unwrap();
        }
        state
    }

    #[test]
    fn import_request_requires_valid_json() {
        let plan = planned(&[("team_id", Dynamic::Number(3.0))]);
        let diag = build_import_request("{not json", &plan).unwrap_err();
        assert_eq!(diag.summary, "Invalid JSON in file");
    }

    #[test]
    fn import_request_requires_string_name() {
        let plan = planned(&[("team_id", Dynamic::Number(3.0))]);
        let diag = build_import_request(r#"{"name": 5}"#, &plan).unwrap_err();
        assert_eq!(diag.summary, "Invalid string");
        assert_eq!(
            diag.detail,
            "The 'name' field in the imported story must be a string"
        );
    }

    #[tokio::test]
    async fn create_with_data_uses_import_endpoint() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/stories/import")
            .match_body(Matcher::Json(json!({
                "new_name": "Phishing triage",
                "data": {"name": "Phishing triage", "agents": []},
                "team_id": 3,
                "mode": "versionReplace"
            })))
            .with_body(STORY_BODY)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let plan = planned(&[
            (
                "data",
                Dynamic::from(r#"{"name": "Phishing triage", "agents": []}"#),
            ),
            ("team_id", Dynamic::Number(3.0)),
            ("folder_id", Dynamic::Unknown),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.new_state;
        assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 42);
        assert_eq!(state.get_i64(&AttributePath::new("folder_id")).unwrap(), 11);
        assert!(state.get_string(&AttributePath::new("data")).is_ok());
        assert!(state.is_set(&AttributePath::new("last_updated")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_without_data_follows_up_with_update() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api/v1/stories")
            .match_body(Matcher::Json(json!({"team_id": 3, "name": "Phishing triage"})))
            .with_status(201)
            .with_body(STORY_BODY)
            .create_async()
            .await;
        let update = server
            .mock("PUT", "/api/v1/stories/42")
            .match_body(Matcher::Json(json!({"locked": true})))
            .with_body(STORY_BODY.replace("\"locked\": false", "\"locked\": true"))
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let plan = planned(&[
            ("team_id", Dynamic::Number(3.0)),
            ("name", Dynamic::from("Phishing triage")),
            ("locked", Dynamic::Bool(true)),
            ("description", Dynamic::Unknown),
        ]);

        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert!(response
            .new_state
            .get_bool(&AttributePath::new("locked"))
            .unwrap());
        create.assert_async().await;
        update.assert_async().await;
    }

    #[tokio::test]
    async fn create_failure_reports_diagnostic() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/stories")
            .with_status(422)
            .with_body(r#"{"errors":[{"message":"team","details":"must exist"}]}"#)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let plan = planned(&[("team_id", Dynamic::Number(99.0))]);
        let response = resource
            .create(Context::new(), create_request(TYPE_NAME, plan))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Error Creating Tines Story");
        assert!(response.diagnostics[0].detail.contains("team: must exist"));
        assert!(response.new_state.is_null());
    }

    #[tokio::test]
    async fn read_removes_missing_story() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/stories/42")
            .with_status(404)
            .with_body(r#"{"errors":[{"message":"Not Found","details":""}]}"#)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let current = planned(&[("id", Dynamic::Number(42.0))]);
        let response = resource
            .read(Context::new(), read_request(TYPE_NAME, current))
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn read_server_error_keeps_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/stories/42")
            .with_status(500)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let current = planned(&[("id", Dynamic::Number(42.0))]);
        let response = resource
            .read(Context::new(), read_request(TYPE_NAME, current.clone()))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Unable to Refresh Resource");
        assert_eq!(response.new_state, Some(current));
    }

    #[tokio::test]
    async fn update_with_unchanged_data_uses_put() {
        let mut server = Server::new_async().await;
        let import = server
            .mock("POST", "/api/v1/stories/import")
            .expect(0)
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/api/v1/stories/42")
            .with_body(STORY_BODY)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let data = Dynamic::from(r#"{"name": "Phishing triage"}"#);
        let prior = planned(&[
            ("id", Dynamic::Number(42.0)),
            ("data", data.clone()),
            ("team_id", Dynamic::Number(3.0)),
        ]);
        let plan = prior.clone();

        let response = resource
            .update(Context::new(), update_request(TYPE_NAME, prior, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        import.assert_async().await;
        put.assert_async().await;
    }

    #[tokio::test]
    async fn update_with_changed_data_reimports() {
        let mut server = Server::new_async().await;
        let import = server
            .mock("POST", "/api/v1/stories/import")
            .match_body(Matcher::PartialJson(json!({"new_name": "Renamed", "folder_id": 11})))
            .with_body(STORY_BODY)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let prior = planned(&[
            ("id", Dynamic::Number(42.0)),
            ("data", Dynamic::from(r#"{"name": "Phishing triage"}"#)),
            ("team_id", Dynamic::Number(3.0)),
            ("folder_id", Dynamic::Number(11.0)),
        ]);
        let mut plan = prior.clone();
        plan.set_string(&AttributePath::new("data"), r#"{"name": "Renamed"}"#.to_string())
            .unwrap();

        let response = resource
            .update(Context::new(), update_request(TYPE_NAME, prior, plan))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        import.assert_async().await;
    }

    #[tokio::test]
    async fn delete_reports_api_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v1/stories/42")
            .with_status(403)
            .with_body(r#"[{"message":"Forbidden","details":"not an owner"}]"#)
            .create_async()
            .await;

        let resource: StoryResource = configured(&server.url()).await;
        let prior = planned(&[("id", Dynamic::Number(42.0))]);
        let response = resource
            .delete(Context::new(), delete_request(TYPE_NAME, prior))
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Error Deleting Tines Story");
        assert!(response.diagnostics[0].detail.contains("Forbidden: not an owner"));
    }

    #[tokio::test]
    async fn unconfigured_resource_reports_diagnostic() {
        let resource = StoryResource::new();
        let response = resource
            .delete(
                Context::new(),
                delete_request(TYPE_NAME, planned(&[("id", Dynamic::Number(1.0))])),
            )
            .await;
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }

    #[tokio::test]
    async fn validate_requires_agents_when_send_to_story_enabled() {
        let resource = StoryResource::new();
        let config = planned(&[
            ("team_id", Dynamic::Number(3.0)),
            ("send_to_story_enabled", Dynamic::Bool(true)),
            ("entry_agent_id", Dynamic::Number(5.0)),
        ]);
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config,
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("exit_agents"));
    }

    #[tokio::test]
    async fn schema_rejects_settings_combined_with_data() {
        let resource = StoryResource::new();
        let schema = resource
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;
        let config = planned(&[
            ("data", Dynamic::from("{}")),
            ("team_id", Dynamic::Number(3.0)),
            ("name", Dynamic::from("Alerts")),
        ]);
        let diagnostics = schema.block.validate_config(&config);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some(AttributePath::new("name")));
    }

    #[tokio::test]
    async fn upgrade_from_v0_keeps_tracked_fields() {
        let resource = StoryResource::new();
        let raw = json!({
            "id": 42,
            "data": "{\"name\":\"Alerts\"}",
            "tines_api_token": "token",
            "tenant_url": "https://example.tines.com",
            "team_id": 3,
            "folder_id": null
        });
        let response = resource
            .upgrade_state(
                Context::new(),
                UpgradeResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    version: 0,
                    raw_state: RawState {
                        json: Some(serde_json::to_vec(&raw).unwrap()),
                        flatmap: None,
                    },
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = response.upgraded_state;
        assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 42);
        assert_eq!(
            state.get_string(&AttributePath::new("tenant_url")).unwrap(),
            "https://example.tines.com"
        );
        assert!(state.is_null_at(&AttributePath::new("team_id")));
        assert!(state.is_null_at(&AttributePath::new("folder_id")));
    }

    #[tokio::test]
    async fn import_parses_numeric_id() {
        let resource = StoryResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "42".to_string(),
                    client_capabilities: Default::default(),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.imported_resources[0]
                .state
                .get_i64(&AttributePath::new("id"))
                .unwrap(),
            42
        );
    }
}
