pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::TinesProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{has_errors, AttributePath, Diagnostic, ServerCapabilities};
use tfplug::validator::StringRegex;

pub const TENANT_ENV: &str = "TINES_TENANT";
pub const API_KEY_ENV: &str = "TINES_API_KEY";

/// Version reported to the Tines API in `x-tines-client-version`
pub const PROVIDER_VERSION: &str = env!("CARGO_PKG_VERSION");

const TENANT_PATTERN: &str = r"^https:\/\/[a-zA-Z0-9-\.]+\.[a-zA-Z0-9-]+\.[a-zA-Z0-9-]+$";

pub struct TinesProvider {
    version: String,
}

impl Default for TinesProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TinesProvider {
    pub fn new() -> Self {
        Self::with_version(PROVIDER_VERSION)
    }

    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

#[async_trait]
impl Provider for TinesProvider {
    fn type_name(&self) -> &str {
        "tines"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        let schema = SchemaBuilder::new()
            .description("Manages stories, resources and credentials in a Tines tenant")
            .attribute(
                AttributeBuilder::new("tenant", AttributeType::String)
                    .description("If this value is not set in the configuration, you must set the TINES_TENANT environment variable instead.")
                    .optional()
                    .validator(StringRegex::create(
                        TENANT_PATTERN,
                        "must be a valid hostname in the format https://example.tines.com",
                    ))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("api_key", AttributeType::String)
                    .description("If this value is not set in the configuration, you must set the TINES_API_KEY environment variable instead.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build();

        ProviderSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::info!("Configuring Tines client");

        let mut diagnostics = vec![];
        let tenant_path = AttributePath::new("tenant");
        let api_key_path = AttributePath::new("api_key");

        if request.config.is_unknown_at(&tenant_path) {
            diagnostics.push(
                Diagnostic::error(
                    "Unknown Tines Tenant",
                    "The provider cannot create the Tines API client as there is an unknown configuration value for the Tines tenant",
                )
                .with_attribute(tenant_path.clone()),
            );
        }
        if request.config.is_unknown_at(&api_key_path) {
            diagnostics.push(
                Diagnostic::error(
                    "Unknown Tines API Key",
                    "The provider cannot create the Tines API client as there is an unknown configuration value for the Tines API key",
                )
                .with_attribute(api_key_path.clone()),
            );
        }
        if has_errors(&diagnostics) {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        }

        // Environment first, explicit configuration wins
        let tenant = request
            .config
            .get_string(&tenant_path)
            .ok()
            .or_else(|| std::env::var(TENANT_ENV).ok())
            .unwrap_or_default();
        let api_key = request
            .config
            .get_string(&api_key_path)
            .ok()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default();

        if tenant.is_empty() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Tines Tenant",
                    "The provider cannot create the Tines API client as the Tines tenant URL is missing",
                )
                .with_attribute(tenant_path),
            );
        }
        if api_key.is_empty() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing Tines API Key",
                    "The provider cannot create the Tines API client as the Tines API key is missing",
                )
                .with_attribute(api_key_path),
            );
        }
        if has_errors(&diagnostics) {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        }

        match api::Client::new(&tenant, &api_key, &self.version) {
            Ok(client) => {
                tracing::info!(tenant = %tenant, "Configured Tines client");
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(TinesProviderData::new(client))),
                }
            }
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Unable to Create Tines API Client",
                    format!(
                        "An unexpected error occurred when creating the Tines API client. \
                         If the error is not clear, please contact the provider developers.\n\n\
                         Tines Client Error: {}",
                        e
                    ),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        // Attribute validators cover the tenant format; presence is only
        // known at configure time because of the environment fallback.
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();

        factories.insert(
            resources::story::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::StoryResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            resources::tines_resource::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::TinesResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            resources::credential::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::CredentialResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            resources::folder::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::FolderResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            resources::team::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::TeamResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            resources::global_resource::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::GlobalResourceResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            resources::agent::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::AgentResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            resources::annotation::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::AnnotationResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            resources::note::TYPE_NAME.to_string(),
            Box::new(|| Box::new(resources::NoteResource::new()) as Box<dyn ResourceWithConfigure>),
        );

        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();

        factories.insert(
            data_sources::story::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::StoryDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories.insert(
            data_sources::agent::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::AgentDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories.insert(
            data_sources::global_resource::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::GlobalResourceDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );

        factories
    }
}
