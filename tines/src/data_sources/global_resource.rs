//! Global resource data source implementation

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
use crate::resources::global_resource::value_text;
use crate::TinesProviderData;

pub const TYPE_NAME: &str = "tines_global_resource";

#[derive(Default)]
pub struct GlobalResourceDataSource {
    provider_data: Option<TinesProviderData>,
}

impl GlobalResourceDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for GlobalResourceDataSource {
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
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Looks up a Tines global resource by ID")
            .attribute(id_attribute("The resource ID"))
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value", AttributeType::String)
                    .description("Text values as-is, structured values JSON-encoded")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("value_type", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("read_access", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("team_id", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("folder_id", AttributeType::Number)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("slug", AttributeType::String)
                    .computed()
                    .build(),
            )
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

        tracing::debug!(id, "Reading global resource data source");
        match provider_data.client.resources().get(id).await {
            Ok(resource) => ReadDataSourceResponse::ok(
                StateBuilder::from_state(&request.config)
                    .opt_string("name", resource.name)
                    .opt_string(
                    "value",
                    resource.value.as_ref().map(|v| value_text(None, v)),
                )
                    .opt_string("value_type", resource.value_type)
                    .opt_string("read_access", resource.read_access)
                    .opt_int("team_id", resource.team_id)
                    .opt_int("folder_id", resource.folder_id)
                    .opt_string("slug", resource.slug)
                    .build(),
            ),
            Err(e) => ReadDataSourceResponse::error(read_error("Global Resource", id, &e)),
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for GlobalResourceDataSource {
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
