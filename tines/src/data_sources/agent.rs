//! Agent data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::StateBuilder;

use super::{id_attribute, lookup_id, read_error};
use crate::provider_data::not_configured;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_agent";

#[derive(Default)]
pub struct AgentDataSource {
    provider_data: Option<TinesProviderData>,
}

impl AgentDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for AgentDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let computed = |name: &str, attr_type: AttributeType| {
            AttributeBuilder::new(name, attr_type).computed().build()
        };
        let id_list = || AttributeType::List(Box::new(AttributeType::Number));

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a Tines action by ID")
            .attribute(id_attribute("The action ID"))
            .attribute(computed("name", AttributeType::String))
            .attribute(computed("agent_type", AttributeType::String))
            .attribute(computed("story_id", AttributeType::Number))
            .attribute(
                AttributeBuilder::new("agent_options", AttributeType::String)
                    .description("The action options, JSON-encoded")
                    .computed()
                    .build(),
            )
            .attribute(computed("guid", AttributeType::String))
            .attribute(computed("user_id", AttributeType::Number))
            .attribute(computed("keep_events_for", AttributeType::Number))
            .attribute(computed("disabled", AttributeType::Bool))
            .attribute(computed("source_ids", id_list()))
            .attribute(computed("receiver_ids", id_list()))
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse::default()
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(provider_data) = &self.provider_data else {
            return ReadDataSourceResponse::error(not_configured());
        };

        let id = match lookup_id(&request.config) {
            Ok(id) => id,
            Err(diag) => return ReadDataSourceResponse::error(diag),
        };

        tracing::debug!(id, "Reading agent data source");
        match provider_data.client.agents().get(id).await {
            Ok(agent) => ReadDataSourceResponse::ok(
                StateBuilder::from_state(&request.config)
                    .opt_string("name", agent.name)
                    .opt_string("agent_type", agent.agent_type)
                    .opt_int("story_id", agent.story_id)
                    .opt_string("agent_options", agent.options.map(|o| o.to_string()))
                    .opt_string("guid", agent.guid)
                    .opt_int("user_id", agent.user_id)
                    .opt_int("keep_events_for", agent.keep_events_for)
                    .opt_bool("disabled", agent.disabled)
                    .int_list("source_ids", &agent.source_ids.unwrap_or_default())
                    .int_list("receiver_ids", &agent.receiver_ids.unwrap_or_default())
                    .build(),
            ),
            Err(e) => ReadDataSourceResponse::error(read_error("Agent", id, &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AgentDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match TinesProviderData::from_any(request.provider_data) {
            Ok(data) => {
                self.provider_data = data;
                ConfigureDataSourceResponse::default()
            }
            Err(diag) => ConfigureDataSourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}
