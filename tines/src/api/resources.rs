//! Tines Resource API implementation
//!
//! Tines calls these "resources" in the UI and "global resources" in the REST
//! paths. Both the `tines_resource` and the legacy `tines_global_resource`
//! Terraform types are backed by this endpoint.

use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// String, number, array or object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_team_slugs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_resource_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_resource: Option<Value>,
    /// On update, selects whether the test or the live value is written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_test: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_resource_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencing_action_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

pub struct ResourcesApi<'a> {
    client: &'a Client,
}

impl<'a> ResourcesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, resource: &Resource) -> Result<Resource, TinesError> {
        self.client.post("/api/v1/global_resources", resource).await
    }

    pub async fn get(&self, id: i64) -> Result<Resource, TinesError> {
        self.client
            .get(&format!("/api/v1/global_resources/{}", id))
            .await
    }

    pub async fn update(&self, id: i64, resource: &Resource) -> Result<Resource, TinesError> {
        self.client
            .put(&format!("/api/v1/global_resources/{}", id), resource)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/global_resources/{}", id))
            .await?;
        Ok(())
    }
}
