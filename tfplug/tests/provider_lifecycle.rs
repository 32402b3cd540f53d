//! End-to-end tests driving a provider through the gRPC service surface

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tokio::time::sleep;

use tfplug::context::Context;
use tfplug::grpc::GrpcProviderServer;
use tfplug::import::import_state_passthrough_int_id;
use tfplug::proto::{self, ProviderService};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue, ServerCapabilities};
use tfplug::validator::StringOneOf;
use tfplug::StateBuilder;
use tonic::Request;

// Track concurrent operations
#[derive(Default)]
struct OperationStats {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    total: AtomicUsize,
}

impl OperationStats {
    fn start(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn end(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct WidgetProvider {
    stats: Arc<OperationStats>,
}

#[async_trait]
impl Provider for WidgetProvider {
    fn type_name(&self) -> &str {
        "widget"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "widget".to_string(),
            server_capabilities: ServerCapabilities::default(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("mode", AttributeType::String)
                        .optional()
                        .validator(StringOneOf::create(vec!["fast", "slow"]))
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::clone(&self.stats) as Arc<dyn std::any::Any + Send + Sync>),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: vec![],
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "widget_item".to_string(),
            Box::new(|| Box::new(Item::default()) as Box<dyn ResourceWithConfigure>),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        HashMap::new()
    }
}

#[derive(Default)]
struct Item {
    stats: Option<Arc<OperationStats>>,
}

fn item_schema() -> Schema {
    SchemaBuilder::new()
        .version(1)
        .attribute(
            AttributeBuilder::new("id", AttributeType::Number)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("label", AttributeType::String)
                .required()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for Item {
    fn type_name(&self) -> &str {
        "widget_item"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: "widget_item".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: item_schema(),
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
        let Some(stats) = &self.stats else {
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                private: vec![],
                diagnostics: vec![Diagnostic::error("Provider not configured", "")],
            };
        };

        stats.start();
        sleep(Duration::from_millis(25)).await;
        stats.end();

        let label = request
            .planned_state
            .get_string(&AttributePath::new("label"))
            .unwrap();
        CreateResourceResponse {
            new_state: StateBuilder::new()
                .int("id", stats.total.load(Ordering::SeqCst) as i64)
                .string("label", label)
                .build(),
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        ReadResourceResponse {
            new_state: Some(request.current_state),
            diagnostics: vec![],
            private: vec![],
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        UpdateResourceResponse {
            new_state: request.planned_state,
            private: vec![],
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, _request: DeleteResourceRequest) -> DeleteResourceResponse {
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    fn as_upgrade_state(&self) -> Option<&dyn ResourceWithUpgradeState> {
        Some(self)
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for Item {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        self.stats = request
            .provider_data
            .and_then(|data| data.downcast::<OperationStats>().ok());
        ConfigureResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithUpgradeState for Item {
    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        // v0 stored the label as "name"
        let old = DynamicValue::decode_json(&request.raw_state.json.unwrap_or_default()).unwrap();
        let upgraded = StateBuilder::new()
            .opt_int("id", old.get_i64(&AttributePath::new("id")).ok())
            .opt_string("label", old.get_string(&AttributePath::new("name")).ok())
            .build();
        UpgradeResourceStateResponse {
            upgraded_state: upgraded,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithImportState for Item {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_int_id(&ctx, AttributePath::new("id"), "the item", &request, &mut response);
        response
    }
}

fn wire(value: &DynamicValue) -> Option<proto::DynamicValue> {
    Some(proto::DynamicValue {
        msgpack: value.encode_msgpack().unwrap(),
        json: vec![],
    })
}

fn unwire(value: Option<proto::DynamicValue>) -> DynamicValue {
    DynamicValue::decode_msgpack(&value.unwrap().msgpack).unwrap()
}

async fn configured_server(stats: Arc<OperationStats>) -> Arc<GrpcProviderServer<WidgetProvider>> {
    let server = GrpcProviderServer::new(WidgetProvider { stats });
    tokio_test::assert_ok!(
        server
            .configure_provider(Request::new(proto::configure_provider::Request {
                terraform_version: "1.9.0".to_string(),
                config: wire(&DynamicValue::object()),
                client_capabilities: None,
            }))
            .await
    );
    Arc::new(server)
}

fn create_request(label: &str) -> proto::apply_resource_change::Request {
    let planned = StateBuilder::new()
        .string("label", label)
        .build();
    let mut planned = planned;
    planned.mark_unknown(&AttributePath::new("id")).unwrap();

    proto::apply_resource_change::Request {
        type_name: "widget_item".to_string(),
        prior_state: wire(&DynamicValue::null()),
        planned_state: wire(&planned),
        config: wire(&planned),
        planned_private: vec![],
        provider_meta: None,
    }
}

#[tokio::test]
async fn concurrent_applies_run_in_parallel() {
    let stats = Arc::new(OperationStats::default());
    let server = configured_server(Arc::clone(&stats)).await;

    let mut handles = vec![];
    for i in 0..8 {
        let server = Arc::clone(&server);
        handles.push(task::spawn(async move {
            server
                .apply_resource_change(Request::new(create_request(&format!("item-{i}"))))
                .await
                .unwrap()
                .into_inner()
        }));
    }

    for handle in handles {
        let response = handle.await.unwrap();
        assert!(response.diagnostics.is_empty());
        let state = unwire(response.new_state);
        assert!(state.get_i64(&AttributePath::new("id")).is_ok());
    }

    assert_eq!(stats.total.load(Ordering::SeqCst), 8);
    assert!(stats.max_in_flight.load(Ordering::SeqCst) > 1);
}

#[tokio::test]
async fn unconfigured_provider_reports_diagnostic() {
    let server = GrpcProviderServer::new(WidgetProvider {
        stats: Arc::new(OperationStats::default()),
    });

    let response = server
        .apply_resource_change(Request::new(create_request("lonely")))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    assert!(unwire(response.new_state).is_null());
}

#[tokio::test]
async fn provider_config_validators_run() {
    let server = configured_server(Arc::new(OperationStats::default())).await;
    let config = StateBuilder::new().string("mode", "warp").build();

    let response = server
        .validate_provider_config(Request::new(proto::validate_provider_config::Request {
            config: wire(&config),
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Invalid Attribute Value Match");
}

#[tokio::test]
async fn old_state_is_upgraded_through_resource_hook() {
    let server = configured_server(Arc::new(OperationStats::default())).await;

    let response = server
        .upgrade_resource_state(Request::new(proto::upgrade_resource_state::Request {
            type_name: "widget_item".to_string(),
            version: 0,
            raw_state: Some(proto::RawState {
                json: br#"{"id":9,"name":"legacy"}"#.to_vec(),
                flatmap: HashMap::new(),
            }),
        }))
        .await
        .unwrap()
        .into_inner();

    assert!(response.diagnostics.is_empty());
    let state = unwire(response.upgraded_state);
    assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 9);
    assert_eq!(state.get_string(&AttributePath::new("label")).unwrap(), "legacy");
}

#[tokio::test]
async fn import_produces_normalized_state() {
    let server = configured_server(Arc::new(OperationStats::default())).await;

    let response = server
        .import_resource_state(Request::new(proto::import_resource_state::Request {
            type_name: "widget_item".to_string(),
            id: "77".to_string(),
            client_capabilities: None,
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.imported_resources.len(), 1);
    let state = unwire(response.imported_resources[0].state.clone());
    assert_eq!(state.get_i64(&AttributePath::new("id")).unwrap(), 77);
    assert_eq!(state.get(&AttributePath::new("label")), Some(&Dynamic::Null));
}
