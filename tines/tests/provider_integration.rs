//! End-to-end flows through the provider factories against a mock tenant

use mockito::{Matcher, Server};
use serde_json::json;
use serial_test::serial;
use std::any::Any;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::provider::{ConfigureProviderRequest, Provider};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, ReadResourceRequest, ResourceWithConfigure,
};
use tfplug::types::{AttributePath, ClientCapabilities, Dynamic, DynamicValue};
use tines::{TinesProvider, API_KEY_ENV, TENANT_ENV};

async fn configure_provider(url: &str) -> Option<Arc<dyn Any + Send + Sync>> {
    std::env::remove_var(TENANT_ENV);
    std::env::remove_var(API_KEY_ENV);

    let mut config = DynamicValue::object();
    config
        .set_string(&AttributePath::new("tenant"), url.to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("api_key"), "integration-key".to_string())
        .unwrap();

    let mut provider = TinesProvider::with_version("9.9.9");
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    response.provider_data
}

async fn resource_from_factory(
    type_name: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> Box<dyn ResourceWithConfigure> {
    let factories = TinesProvider::new().resources();
    let factory = factories.get(type_name).unwrap();
    let mut resource = factory();
    let response = resource
        .configure(Context::new(), ConfigureResourceRequest { provider_data })
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn story_import_then_refresh_after_deletion() {
    let mut server = Server::new_async().await;

    let import = server
        .mock("POST", "/api/v1/stories/import")
        .match_header("x-user-token", "integration-key")
        .match_header("x-tines-client-version", "tines-terraform-provider-9.9.9")
        .match_body(Matcher::Json(json!({
            "new_name": "Alert enrichment",
            "data": {"name": "Alert enrichment", "agents": [], "links": []},
            "team_id": 3,
            "folder_id": 8,
            "mode": "versionReplace"
        })))
        .with_body(
            json!({
                "id": 501,
                "name": "Alert enrichment",
                "team_id": 3,
                "folder_id": 8,
                "guid": "e1b2",
                "tags": [],
                "owners": [1]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let gone = server
        .mock("GET", "/api/v1/stories/501")
        .with_status(404)
        .with_body(r#"{"errors":[{"message":"Story not found","details":""}]}"#)
        .create_async()
        .await;

    let provider_data = configure_provider(&server.url()).await;
    let story = resource_from_factory("tines_story", provider_data).await;

    let mut planned = DynamicValue::object();
    planned
        .set_string(
            &AttributePath::new("data"),
            r#"{"name": "Alert enrichment", "agents": [], "links": []}"#.to_string(),
        )
        .unwrap();
    planned.set_number(&AttributePath::new("team_id"), 3.0).unwrap();
    planned.set_number(&AttributePath::new("folder_id"), 8.0).unwrap();
    planned
        .set_value(&AttributePath::new("id"), Dynamic::Unknown)
        .unwrap();

    let created = story
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "tines_story".to_string(),
                config: planned.clone(),
                planned_state: planned,
                planned_private: vec![],
                provider_meta: None,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    assert_eq!(
        created.new_state.get_i64(&AttributePath::new("id")).unwrap(),
        501
    );
    assert_eq!(
        created
            .new_state
            .get_i64_list(&AttributePath::new("owners"))
            .unwrap(),
        vec![1]
    );

    let refreshed = story
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "tines_story".to_string(),
                current_state: created.new_state,
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;
    assert!(refreshed.diagnostics.is_empty());
    assert!(refreshed.new_state.is_none());

    import.assert_async().await;
    gone.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn data_source_reads_through_provider_client() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/v1/global_resources/21")
        .with_body(r#"{"id": 21, "name": "webhook_secret", "value": "s3cr3t", "value_type": "text"}"#)
        .create_async()
        .await;

    let provider_data = configure_provider(&server.url()).await;
    let factories = TinesProvider::new().data_sources();
    let mut data_source = factories.get("tines_global_resource").unwrap()();
    let configured = data_source
        .configure(Context::new(), ConfigureDataSourceRequest { provider_data })
        .await;
    assert!(configured.diagnostics.is_empty());

    let mut config = DynamicValue::object();
    config.set_number(&AttributePath::new("id"), 21.0).unwrap();
    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "tines_global_resource".to_string(),
                config,
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    assert_eq!(
        response.state.get_string(&AttributePath::new("value")).unwrap(),
        "s3cr3t"
    );
}

#[tokio::test]
#[serial]
async fn unconfigured_factory_resource_reports_diagnostic() {
    let story = resource_from_factory("tines_resource", None).await;
    let response = story
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "tines_resource".to_string(),
                current_state: DynamicValue::object(),
                private: vec![],
                provider_meta: None,
                client_capabilities: ClientCapabilities::default(),
            },
        )
        .await;

    assert_eq!(response.diagnostics[0].summary, "Provider not configured");
}
