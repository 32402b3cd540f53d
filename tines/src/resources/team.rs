//! Team resource implementation

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
use tfplug::StateBuilder;

use super::{api_error, refresh_error, state_id, string_attr};
use crate::api::teams::Team;
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_team";

#[derive(Default)]
pub struct TeamResource {
    provider_data: Option<TinesProviderData>,
}

impl TeamResource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Resource for TeamResource {
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
            .description("Manages a Tines team.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::Number)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The team name.")
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

        let team = Team {
            name: string_attr(&request.planned_state, "name"),
            ..Default::default()
        };
        match provider_data.client.teams().create(&team).await {
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
                diagnostics: vec![api_error("Error Creating Tines Team", "create team", &e)],
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

        let id = match state_id(&request.current_state, "Team") {
            Ok(id) => id,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics: vec![diag],
                    private: request.private,
                }
            }
        };

        match provider_data.client.teams().get(id).await {
            Ok(team) => ReadResourceResponse {
                new_state: Some(
                    StateBuilder::from_state(&request.current_state)
                        .opt_int("id", team.id)
                        .opt_string("name", team.name)
                        .build(),
                ),
                diagnostics: vec![],
                private: request.private,
            },
            Err(e) if e.is_not_found() => {
                tracing::info!(id, "Team no longer exists, removing from state");
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

        let id = match state_id(&request.prior_state, "Team") {
            Ok(id) => id,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    private: vec![],
                    diagnostics: vec![diag],
                }
            }
        };

        let team = Team {
            name: string_attr(&request.planned_state, "name"),
            ..Default::default()
        };
        match provider_data.client.teams().update(id, &team).await {
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
                diagnostics: vec![api_error("Error Updating Tines Team", "update team", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return DeleteResourceResponse {
                diagnostics: vec![not_configured()],
            };
        };

        let diagnostics = match state_id(&request.prior_state, "Team") {
            Ok(id) => match provider_data.client.teams().delete(id).await {
                Ok(()) => vec![],
                Err(e) => vec![api_error("Error Deleting Tines Team", "delete team", &e)],
            },
            Err(diag) => vec![diag],
        };

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TeamResource {
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
