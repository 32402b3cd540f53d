//! gRPC service implementation of the Terraform plugin protocol
//!
//! Resources and data sources are created on demand from the provider's
//! factories, configured with the stored provider data, and dropped when the
//! RPC completes. Only `ConfigureProvider` takes the provider write lock.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::plan_modifier::values_equal;
use crate::proto::{self, attribute_path, diagnostic, get_metadata};
use crate::proto::{
    apply_resource_change, configure_provider, get_functions, get_provider_schema,
    import_resource_state, plan_resource_change, read_data_source, read_resource, stop_provider,
    upgrade_resource_state, validate_data_resource_config, validate_provider_config,
    validate_resource_config,
};
use crate::provider::{
    ConfigureProviderRequest, DataSourceFactory, Provider, ProviderMetaSchemaRequest,
    ProviderMetadataRequest, ProviderSchemaRequest, ResourceFactory, StopProviderRequest,
    ValidateProviderConfigRequest,
};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ReadResourceRequest, ResourceSchemaRequest,
    ResourceWithConfigure, UpdateResourceRequest, UpgradeResourceStateRequest,
    ValidateResourceConfigRequest,
};
use crate::schema::{self, DefaultRequest, PlanModifierRequest, Schema};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Diagnostic,
    DiagnosticSeverity, DynamicValue, RawState,
};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type ProviderData = Option<Arc<dyn Any + Send + Sync>>;

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<ProviderData>>,
    resources: HashMap<String, ResourceFactory>,
    data_sources: HashMap<String, DataSourceFactory>,
    ctx: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    /// Factories are collected once here; providers register a fixed set of
    /// resource and data source types.
    pub fn new(provider: P) -> Self {
        let resources = provider.resources();
        let data_sources = provider.data_sources();

        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            resources,
            data_sources,
            ctx: Context::new(),
        }
    }

    /// Root context shared by every RPC. Cancelled by `StopProvider`.
    pub fn context(&self) -> Context {
        self.ctx.clone()
    }

    fn new_resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = self.resources.get(type_name).ok_or_else(|| {
            vec![Diagnostic::error(
                "Unknown resource type",
                format!("The provider does not support resource type {}", type_name),
            )]
        })?;
        Ok(factory())
    }

    async fn configured_resource(
        &self,
        type_name: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Box<dyn ResourceWithConfigure>> {
        let mut resource = match self.new_resource(type_name) {
            Ok(resource) => resource,
            Err(diags) => {
                diagnostics.extend(diags);
                return None;
            }
        };

        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(self.ctx.clone(), ConfigureResourceRequest { provider_data })
            .await;
        let failed = has_errors(&response.diagnostics);
        diagnostics.extend(response.diagnostics);

        (!failed).then_some(resource)
    }

    async fn configured_data_source(
        &self,
        type_name: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Box<dyn DataSourceWithConfigure>> {
        let Some(factory) = self.data_sources.get(type_name) else {
            diagnostics.push(Diagnostic::error(
                "Unknown data source type",
                format!("The provider does not support data source type {}", type_name),
            ));
            return None;
        };

        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(self.ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;
        let failed = has_errors(&response.diagnostics);
        diagnostics.extend(response.diagnostics);

        (!failed).then_some(data_source)
    }

    async fn resource_schema(&self, resource: &dyn ResourceWithConfigure) -> (Schema, Vec<Diagnostic>) {
        let response = resource.schema(self.ctx.clone(), ResourceSchemaRequest).await;
        (response.schema, response.diagnostics)
    }
}

fn stopped() -> Diagnostic {
    Diagnostic::error(
        "Provider stopped",
        "The operation was cancelled because Terraform asked the provider to stop.",
    )
}

#[tonic::async_trait]
impl<P: Provider + 'static> proto::ProviderService for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<get_metadata::Request>,
    ) -> std::result::Result<Response<get_metadata::Response>, Status> {
        let provider = self.provider.read().await;
        let metadata = provider
            .metadata(self.ctx.clone(), ProviderMetadataRequest)
            .await;

        let resources = self
            .resources
            .keys()
            .map(|name| get_metadata::ResourceMetadata {
                type_name: name.clone(),
            })
            .collect();
        let data_sources = self
            .data_sources
            .keys()
            .map(|name| get_metadata::DataSourceMetadata {
                type_name: name.clone(),
            })
            .collect();

        Ok(Response::new(get_metadata::Response {
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
            diagnostics: vec![],
            data_sources,
            resources,
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<get_provider_schema::Request>,
    ) -> std::result::Result<Response<get_provider_schema::Response>, Status> {
        let mut diagnostics = Vec::new();

        let provider = self.provider.read().await;
        let provider_schema = provider
            .schema(self.ctx.clone(), ProviderSchemaRequest)
            .await;
        diagnostics.extend(provider_schema.diagnostics);
        let meta_schema = provider
            .meta_schema(self.ctx.clone(), ProviderMetaSchemaRequest)
            .await;
        diagnostics.extend(meta_schema.diagnostics);
        let metadata = provider
            .metadata(self.ctx.clone(), ProviderMetadataRequest)
            .await;
        drop(provider);

        let mut resource_schemas = HashMap::new();
        for (name, factory) in &self.resources {
            let resource = factory();
            let (schema, diags) = self.resource_schema(resource.as_ref()).await;
            diagnostics.extend(diags);
            resource_schemas.insert(name.clone(), schema_to_proto(&schema));
        }

        let mut data_source_schemas = HashMap::new();
        for (name, factory) in &self.data_sources {
            let data_source = factory();
            let response = data_source
                .schema(self.ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(name.clone(), schema_to_proto(&response.schema));
        }

        tracing::debug!(
            resources = resource_schemas.len(),
            data_sources = data_source_schemas.len(),
            "serving provider schema"
        );

        Ok(Response::new(get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema.schema)),
            resource_schemas,
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: meta_schema.schema.as_ref().map(schema_to_proto),
            server_capabilities: Some(server_capabilities_to_proto(
                &metadata.server_capabilities,
            )),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<validate_provider_config::Request>,
    ) -> std::result::Result<Response<validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;

        let provider = self.provider.read().await;
        let schema = provider
            .schema(self.ctx.clone(), ProviderSchemaRequest)
            .await;
        let mut diagnostics = schema.diagnostics;
        let config = schema.schema.block.from_wire(config);
        diagnostics.extend(schema.schema.block.validate_config(&config));

        let response = provider
            .validate(self.ctx.clone(), ValidateProviderConfigRequest { config })
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<validate_resource_config::Request>,
    ) -> std::result::Result<Response<validate_resource_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;

        let resource = match self.new_resource(&req.type_name) {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(validate_resource_config::Response {
                    diagnostics: diagnostics_to_proto(diagnostics),
                }))
            }
        };

        let (schema, mut diagnostics) = self.resource_schema(resource.as_ref()).await;
        let config = schema.block.from_wire(config);
        diagnostics.extend(schema.block.validate_config(&config));

        let response = resource
            .validate(
                self.ctx.clone(),
                ValidateResourceConfigRequest {
                    type_name: req.type_name,
                    config,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<validate_data_resource_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;

        let Some(factory) = self.data_sources.get(&req.type_name) else {
            return Ok(Response::new(validate_data_resource_config::Response {
                diagnostics: diagnostics_to_proto(vec![Diagnostic::error(
                    "Unknown data source type",
                    format!(
                        "The provider does not support data source type {}",
                        req.type_name
                    ),
                )]),
            }));
        };

        let data_source = factory();
        let schema = data_source
            .schema(self.ctx.clone(), DataSourceSchemaRequest)
            .await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(schema.schema.block.validate_config(&config));

        let response = data_source
            .validate(
                self.ctx.clone(),
                ValidateDataSourceConfigRequest {
                    type_name: req.type_name,
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<upgrade_resource_state::Request>,
    ) -> std::result::Result<Response<upgrade_resource_state::Response>, Status> {
        let req = request.into_inner();
        let raw = req.raw_state.unwrap_or_default();
        let raw_state = RawState {
            json: (!raw.json.is_empty()).then_some(raw.json),
            flatmap: (!raw.flatmap.is_empty()).then_some(raw.flatmap),
        };

        let resource = match self.new_resource(&req.type_name) {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(upgrade_resource_state::Response {
                    upgraded_state: None,
                    diagnostics: diagnostics_to_proto(diagnostics),
                }))
            }
        };
        let (schema, mut diagnostics) = self.resource_schema(resource.as_ref()).await;

        tracing::debug!(
            type_name = %req.type_name,
            from = req.version,
            to = schema.version,
            "upgrading resource state"
        );

        let mut stored = None;
        let upgraded = if req.version != schema.version {
            match resource.as_upgrade_state() {
                Some(upgrader) => {
                    let response = upgrader
                        .upgrade_state(
                            self.ctx.clone(),
                            UpgradeResourceStateRequest {
                                type_name: req.type_name.clone(),
                                version: req.version,
                                raw_state,
                            },
                        )
                        .await;
                    diagnostics.extend(response.diagnostics);
                    Some(response.upgraded_state)
                }
                None => {
                    diagnostics.push(Diagnostic::error(
                        "Unable to Upgrade Resource State",
                        format!(
                            "Resource type {} has no upgrade from schema version {} to {}",
                            req.type_name, req.version, schema.version
                        ),
                    ));
                    None
                }
            }
        } else {
            match decode_raw_state(&raw_state) {
                Ok(state) => {
                    let wired = schema.block.json_state_to_wire(state);
                    let plain = schema.block.from_wire(wired.clone());
                    stored = Some(wired);
                    Some(plain)
                }
                Err(diag) => {
                    diagnostics.push(diag);
                    None
                }
            }
        };

        let upgraded_state = match upgraded {
            Some(state) if !has_errors(&diagnostics) => {
                let sources: Vec<&DynamicValue> = stored.iter().collect();
                let state = schema.block.to_wire(&normalize(&schema, state), &sources);
                Some(encode_dynamic_value(&state)?)
            }
            _ => None,
        };

        Ok(Response::new(upgrade_resource_state::Response {
            upgraded_state,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<configure_provider::Request>,
    ) -> std::result::Result<Response<configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;

        tracing::info!(terraform_version = %req.terraform_version, "configuring provider");

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(
                self.ctx.clone(),
                ConfigureProviderRequest {
                    terraform_version: req.terraform_version,
                    config,
                    client_capabilities: client_capabilities_from_proto(req.client_capabilities),
                },
            )
            .await;
        drop(provider);

        if response.provider_data.is_some() {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<read_resource::Request>,
    ) -> std::result::Result<Response<read_resource::Response>, Status> {
        let req = request.into_inner();
        let current_state = decode_dynamic_value(req.current_state)?;
        let mut diagnostics = Vec::new();

        if current_state.is_null() {
            return Ok(Response::new(read_resource::Response {
                new_state: Some(encode_dynamic_value(&current_state)?),
                diagnostics: vec![],
                private: req.private,
            }));
        }

        let Some(resource) = self
            .configured_resource(&req.type_name, &mut diagnostics)
            .await
        else {
            return Ok(Response::new(read_resource::Response {
                new_state: Some(encode_dynamic_value(&current_state)?),
                diagnostics: diagnostics_to_proto(diagnostics),
                private: req.private,
            }));
        };
        let (schema, schema_diags) = self.resource_schema(resource.as_ref()).await;
        diagnostics.extend(schema_diags);

        let read = ReadResourceRequest {
            type_name: req.type_name.clone(),
            current_state: schema.block.from_wire(current_state.clone()),
            private: req.private.clone(),
            provider_meta: decode_optional(req.provider_meta)?,
            client_capabilities: client_capabilities_from_proto(req.client_capabilities),
        };

        let (new_state, private) = match self.ctx.run(resource.read(self.ctx.clone(), read)).await {
            Some(response) => {
                diagnostics.extend(response.diagnostics);
                match response.new_state {
                    Some(state) => (
                        schema
                            .block
                            .to_wire(&normalize(&schema, state), &[&current_state]),
                        response.private,
                    ),
                    None => {
                        tracing::info!(type_name = %req.type_name, "resource no longer exists, removing from state");
                        (DynamicValue::null(), Vec::new())
                    }
                }
            }
            None => {
                diagnostics.push(stopped());
                (current_state, req.private)
            }
        };

        Ok(Response::new(read_resource::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<plan_resource_change::Request>,
    ) -> std::result::Result<Response<plan_resource_change::Response>, Status> {
        let req = request.into_inner();
        let prior_state = decode_dynamic_value(req.prior_state)?;
        let proposed = decode_dynamic_value(req.proposed_new_state)?;
        let config = decode_dynamic_value(req.config)?;

        if proposed.is_null() {
            return Ok(Response::new(plan_resource_change::Response {
                planned_state: Some(encode_dynamic_value(&proposed)?),
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
            }));
        }

        let resource = match self.new_resource(&req.type_name) {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(plan_resource_change::Response {
                    planned_state: None,
                    requires_replace: vec![],
                    planned_private: req.prior_private,
                    diagnostics: diagnostics_to_proto(diagnostics),
                    legacy_type_system: false,
                }))
            }
        };
        let (schema, mut diagnostics) = self.resource_schema(resource.as_ref()).await;

        let block = &schema.block;
        let plan = plan_change(
            &schema,
            &block.from_wire(prior_state.clone()),
            block.from_wire(proposed.clone()),
            &block.from_wire(config.clone()),
        );
        diagnostics.extend(plan.diagnostics);
        let planned_state = block.to_wire(&plan.planned_state, &[&proposed, &prior_state, &config]);

        Ok(Response::new(plan_resource_change::Response {
            planned_state: Some(encode_dynamic_value(&planned_state)?),
            requires_replace: plan.requires_replace.iter().map(path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<apply_resource_change::Request>,
    ) -> std::result::Result<Response<apply_resource_change::Response>, Status> {
        let req = request.into_inner();
        let wire_prior = decode_dynamic_value(req.prior_state)?;
        let wire_planned = decode_dynamic_value(req.planned_state)?;
        let wire_config = decode_dynamic_value(req.config)?;
        let provider_meta = decode_optional(req.provider_meta)?;
        let mut diagnostics = Vec::new();

        let Some(resource) = self
            .configured_resource(&req.type_name, &mut diagnostics)
            .await
        else {
            return Ok(Response::new(apply_resource_change::Response {
                new_state: Some(encode_dynamic_value(&wire_prior)?),
                private: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
                legacy_type_system: false,
            }));
        };
        let (schema, schema_diags) = self.resource_schema(resource.as_ref()).await;
        diagnostics.extend(schema_diags);
        let prior_state = schema.block.from_wire(wire_prior.clone());
        let planned_state = schema.block.from_wire(wire_planned.clone());
        let config = schema.block.from_wire(wire_config.clone());

        let ctx = self.ctx.clone();
        let (new_state, private) = if planned_state.is_null() {
            tracing::info!(type_name = %req.type_name, "deleting resource");
            let delete = DeleteResourceRequest {
                type_name: req.type_name.clone(),
                prior_state: prior_state.clone(),
                planned_private: req.planned_private,
                provider_meta,
            };
            match self.ctx.run(resource.delete(ctx.clone(), delete)).await {
                Some(response) => {
                    let failed = has_errors(&response.diagnostics);
                    diagnostics.extend(response.diagnostics);
                    if failed {
                        (prior_state, vec![])
                    } else {
                        (DynamicValue::null(), vec![])
                    }
                }
                None => {
                    diagnostics.push(stopped());
                    (prior_state, vec![])
                }
            }
        } else if prior_state.is_null() {
            tracing::info!(type_name = %req.type_name, "creating resource");
            let create = CreateResourceRequest {
                type_name: req.type_name.clone(),
                planned_state,
                config,
                planned_private: req.planned_private,
                provider_meta,
            };
            match self.ctx.run(resource.create(ctx.clone(), create)).await {
                Some(response) => {
                    diagnostics.extend(response.diagnostics);
                    (finalize_state(&schema, response.new_state), response.private)
                }
                None => {
                    diagnostics.push(stopped());
                    (DynamicValue::null(), vec![])
                }
            }
        } else {
            tracing::info!(type_name = %req.type_name, "updating resource");
            let update = UpdateResourceRequest {
                type_name: req.type_name.clone(),
                prior_state: prior_state.clone(),
                planned_state,
                config,
                planned_private: req.planned_private,
                provider_meta,
            };
            match self.ctx.run(resource.update(ctx.clone(), update)).await {
                Some(response) => {
                    diagnostics.extend(response.diagnostics);
                    let state = if response.new_state.is_null() {
                        prior_state
                    } else {
                        finalize_state(&schema, response.new_state)
                    };
                    (state, response.private)
                }
                None => {
                    diagnostics.push(stopped());
                    (prior_state, vec![])
                }
            }
        };

        let new_state = schema
            .block
            .to_wire(&new_state, &[&wire_planned, &wire_prior, &wire_config]);

        Ok(Response::new(apply_resource_change::Response {
            new_state: Some(encode_dynamic_value(&new_state)?),
            private,
            diagnostics: diagnostics_to_proto(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<import_resource_state::Request>,
    ) -> std::result::Result<Response<import_resource_state::Response>, Status> {
        let req = request.into_inner();
        let mut diagnostics = Vec::new();

        let Some(resource) = self
            .configured_resource(&req.type_name, &mut diagnostics)
            .await
        else {
            return Ok(Response::new(import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
            }));
        };

        let Some(importer) = resource.as_import_state() else {
            diagnostics.push(Diagnostic::error(
                "Resource Import Not Implemented",
                format!("Resource type {} does not support import", req.type_name),
            ));
            return Ok(Response::new(import_resource_state::Response {
                imported_resources: vec![],
                diagnostics: diagnostics_to_proto(diagnostics),
            }));
        };
        let (schema, schema_diags) = self.resource_schema(resource.as_ref()).await;
        diagnostics.extend(schema_diags);

        tracing::info!(type_name = %req.type_name, id = %req.id, "importing resource");

        let import = ImportResourceStateRequest {
            type_name: req.type_name,
            id: req.id,
            client_capabilities: client_capabilities_from_proto(req.client_capabilities),
        };

        let mut imported_resources = Vec::new();
        match self
            .ctx
            .run(importer.import_state(self.ctx.clone(), import))
            .await
        {
            Some(response) => {
                diagnostics.extend(response.diagnostics);
                for imported in response.imported_resources {
                    let state = schema
                        .block
                        .to_wire(&normalize(&schema, imported.state), &[]);
                    imported_resources.push(import_resource_state::ImportedResource {
                        type_name: imported.type_name,
                        state: Some(encode_dynamic_value(&state)?),
                        private: imported.private,
                    });
                }
            }
            None => diagnostics.push(stopped()),
        }

        Ok(Response::new(import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<read_data_source::Request>,
    ) -> std::result::Result<Response<read_data_source::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;
        let mut diagnostics = Vec::new();

        let Some(data_source) = self
            .configured_data_source(&req.type_name, &mut diagnostics)
            .await
        else {
            return Ok(Response::new(read_data_source::Response {
                state: None,
                diagnostics: diagnostics_to_proto(diagnostics),
            }));
        };

        let schema = data_source
            .schema(self.ctx.clone(), DataSourceSchemaRequest)
            .await;
        diagnostics.extend(schema.diagnostics);

        let read = ReadDataSourceRequest {
            type_name: req.type_name,
            config: schema.schema.block.from_wire(config.clone()),
            provider_meta: decode_optional(req.provider_meta)?,
            client_capabilities: client_capabilities_from_proto(req.client_capabilities),
        };

        let state = match self.ctx.run(data_source.read(self.ctx.clone(), read)).await {
            Some(response) => {
                diagnostics.extend(response.diagnostics);
                let state = finalize_state(&schema.schema, response.state);
                Some(schema.schema.block.to_wire(&state, &[&config]))
            }
            None => {
                diagnostics.push(stopped());
                None
            }
        };

        Ok(Response::new(read_data_source::Response {
            state: state.as_ref().map(encode_dynamic_value).transpose()?,
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<get_functions::Request>,
    ) -> std::result::Result<Response<get_functions::Response>, Status> {
        Ok(Response::new(get_functions::Response {
            diagnostics: vec![],
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<stop_provider::Request>,
    ) -> std::result::Result<Response<stop_provider::Response>, Status> {
        tracing::info!("stop requested, cancelling in-flight operations");

        let response = {
            let provider = self.provider.read().await;
            provider.stop(self.ctx.clone(), StopProviderRequest).await
        };
        self.ctx.cancel();

        Ok(Response::new(stop_provider::Response {
            error: response.error.unwrap_or_default(),
        }))
    }
}

/// Result of planning a create or update.
pub(crate) struct PlannedChange {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<AttributePath>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Computes the planned state for a create or update.
///
/// Defaults fill optional+computed attributes left null in configuration.
/// When the resource is new or anything changed, computed attributes left
/// null in configuration become unknown. On update, attribute plan modifiers
/// then run and may restore prior values or demand replacement.
pub(crate) fn plan_change(
    schema: &Schema,
    prior_state: &DynamicValue,
    proposed: DynamicValue,
    config: &DynamicValue,
) -> PlannedChange {
    let mut planned = proposed;
    let mut diagnostics = Vec::new();
    let mut requires_replace = Vec::new();
    let creating = prior_state.is_null();

    let config_null = |path: &AttributePath| config.is_null_at(path) && !config.is_unknown_at(path);

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        if let Some(default) = &attr.default {
            if config_null(&path) {
                let value = default.default_value(DefaultRequest { path: path.clone() });
                push_set_error(&mut diagnostics, &path, planned.set_value(&path, value.value.value));
            }
        }
    }

    let changed = creating || !values_equal(&planned.value, &prior_state.value);
    if changed {
        for attr in &schema.block.attributes {
            let path = AttributePath::new(&attr.name);
            if attr.computed && attr.default.is_none() && config_null(&path) {
                push_set_error(&mut diagnostics, &path, planned.mark_unknown(&path));
            }
        }
    }

    if !creating {
        for attr in &schema.block.attributes {
            if attr.plan_modifiers.is_empty() {
                continue;
            }
            let path = AttributePath::new(&attr.name);
            let attribute_value = |value: &DynamicValue| {
                DynamicValue::new(value.get(&path).cloned().unwrap_or(crate::types::Dynamic::Null))
            };

            let config_value = attribute_value(config);
            let state_value = attribute_value(prior_state);
            let mut plan_value = attribute_value(&planned);

            for modifier in &attr.plan_modifiers {
                let response = modifier.modify(PlanModifierRequest {
                    config_value: config_value.clone(),
                    state_value: state_value.clone(),
                    plan_value,
                    path: path.clone(),
                });
                plan_value = response.plan_value;
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !requires_replace.contains(&path) {
                    requires_replace.push(path.clone());
                }
            }

            push_set_error(&mut diagnostics, &path, planned.set_value(&path, plan_value.value));
        }
    }

    PlannedChange {
        planned_state: planned,
        requires_replace,
        diagnostics,
    }
}

fn push_set_error(diagnostics: &mut Vec<Diagnostic>, path: &AttributePath, result: crate::Result<()>) {
    if let Err(e) = result {
        diagnostics.push(
            Diagnostic::error("Unable to plan attribute", e.to_string()).with_attribute(path.clone()),
        );
    }
}

fn normalize(schema: &Schema, state: DynamicValue) -> DynamicValue {
    DynamicValue::new(schema.block.normalize_state(state.value))
}

/// Null stays null (nothing was created); anything else is normalized.
fn finalize_state(schema: &Schema, state: DynamicValue) -> DynamicValue {
    if state.is_null() {
        state
    } else {
        normalize(schema, state)
    }
}

fn decode_raw_state(raw: &RawState) -> std::result::Result<DynamicValue, Diagnostic> {
    match (&raw.json, &raw.flatmap) {
        (Some(json), _) => DynamicValue::decode_json(json)
            .map_err(|e| Diagnostic::error("Unable to Read Previously Saved State", e.to_string())),
        (None, Some(_)) => Err(Diagnostic::error(
            "Unable to Read Previously Saved State",
            "Flatmap state from Terraform 0.11 and earlier is not supported",
        )),
        (None, None) => Ok(DynamicValue::null()),
    }
}

fn decode_dynamic_value(
    value: Option<proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack)
    } else {
        DynamicValue::decode_json(&value.json)
    };
    decoded.map_err(|e| Status::invalid_argument(e.to_string()))
}

fn decode_optional(
    value: Option<proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Status> {
    value.map(|v| decode_dynamic_value(Some(v))).transpose()
}

fn encode_dynamic_value(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = value
        .encode_msgpack()
        .map_err(|e| Status::internal(e.to_string()))?;
    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn client_capabilities_from_proto(caps: Option<proto::ClientCapabilities>) -> ClientCapabilities {
    caps.map(|c| ClientCapabilities {
        deferral_allowed: c.deferral_allowed,
        write_only_attributes_allowed: c.write_only_attributes_allowed,
    })
    .unwrap_or_default()
}

fn server_capabilities_to_proto(
    caps: &crate::types::ServerCapabilities,
) -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: caps.plan_destroy,
        get_provider_schema_optional: caps.get_provider_schema_optional,
        move_resource_state: caps.move_resource_state,
    }
}

fn path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use attribute_path::step::Selector;

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| attribute_path::Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| proto::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail,
            attribute: d.attribute.as_ref().map(path_to_proto),
        })
        .collect()
}

fn string_kind(kind: schema::StringKind) -> i32 {
    match kind {
        schema::StringKind::Plain => proto::StringKind::Plain as i32,
        schema::StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    let block = &schema.block;
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: block.version,
            attributes: block
                .attributes
                .iter()
                .map(|attr| proto::schema::Attribute {
                    name: attr.name.clone(),
                    r#type: attr.r#type.encode(),
                    nested_type: None,
                    description: attr.description.clone(),
                    required: attr.required,
                    optional: attr.optional,
                    computed: attr.computed,
                    sensitive: attr.sensitive,
                    description_kind: string_kind(block.description_kind),
                    deprecated: attr.deprecated,
                    write_only: false,
                })
                .collect(),
            block_types: vec![],
            description: block.description.clone(),
            description_kind: string_kind(block.description_kind),
            deprecated: block.deprecated,
        }),
    }
}
