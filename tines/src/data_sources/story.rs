//! Story data source implementation

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

pub const TYPE_NAME: &str = "tines_story";

#[derive(Default)]
pub struct StoryDataSource {
    provider_data: Option<TinesProviderData>,
}

impl StoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for StoryDataSource {
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

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a Tines story by ID")
            .attribute(id_attribute("The story ID"))
            .attribute(computed("name", AttributeType::String))
            .attribute(computed("user_id", AttributeType::Number))
            .attribute(computed("description", AttributeType::String))
            .attribute(computed("guid", AttributeType::String))
            .attribute(computed("team_id", AttributeType::Number))
            .attribute(computed("folder_id", AttributeType::Number))
            .attribute(computed("disabled", AttributeType::Bool))
            .attribute(computed("priority", AttributeType::Bool))
            .attribute(computed("keep_events_for", AttributeType::Number))
            .attribute(computed("entry_agent_id", AttributeType::Number))
            .attribute(computed("send_to_story_enabled", AttributeType::Bool))
            .attribute(computed("created_at", AttributeType::String))
            .attribute(computed("updated_at", AttributeType::String))
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

        tracing::debug!(id, "Reading story data source");
        match provider_data.client.stories().get(id).await {
            Ok(story) => ReadDataSourceResponse::ok(
                StateBuilder::from_state(&request.config)
                    .opt_string("name", story.name)
                    .opt_int("user_id", story.user_id)
                    .opt_string("description", story.description)
                    .opt_string("guid", story.guid)
                    .opt_int("team_id", story.team_id)
                    .opt_int("folder_id", story.folder_id)
                    .opt_bool("disabled", story.disabled)
                    .opt_bool("priority", story.priority)
                    .opt_int("keep_events_for", story.keep_events_for)
                    .opt_int("entry_agent_id", story.entry_agent_id)
                    .opt_bool("send_to_story_enabled", story.send_to_story_enabled)
                    .opt_string("created_at", story.created_at)
                    .opt_string("updated_at", story.updated_at)
                    .build(),
            ),
            Err(e) => ReadDataSourceResponse::error(read_error("Story", id, &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for StoryDataSource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sources::test_support::{configured, read_request};
    use mockito::Server;
    use tfplug::types::AttributePath;

    #[tokio::test]
    async fn read_maps_story_fields() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/stories/42")
            .with_body(
                r#"{"id": 42, "name": "Phishing triage", "team_id": 3, "priority": true,
                    "keep_events_for": 86400, "guid": "abc", "created_at": "2024-01-01T00:00:00Z"}"#,
            )
            .create_async()
            .await;

        let data_source: StoryDataSource = configured(&server.url()).await;
        let response = data_source
            .read(Context::new(), read_request(TYPE_NAME, Some(42)))
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = response.state;
        assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 42);
        assert_eq!(
            state.get_string(&AttributePath::new("name")).unwrap(),
            "Phishing triage"
        );
        assert!(state.get_bool(&AttributePath::new("priority")).unwrap());
        assert!(state.is_null_at(&AttributePath::new("folder_id")));
    }

    #[tokio::test]
    async fn missing_story_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/stories/42")
            .with_status(404)
            .create_async()
            .await;

        let data_source: StoryDataSource = configured(&server.url()).await;
        let response = data_source
            .read(Context::new(), read_request(TYPE_NAME, Some(42)))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Unable to Read Tines Story");
    }

    #[tokio::test]
    async fn missing_id_is_an_error() {
        let server = Server::new_async().await;
        let data_source: StoryDataSource = configured(&server.url()).await;
        let response = data_source
            .read(Context::new(), read_request(TYPE_NAME, None))
            .await;

        assert_eq!(response.diagnostics[0].summary, "Missing ID");
    }
}
