//! Story API implementation

use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Import mode that replaces the current story version in place
pub const IMPORT_MODE_VERSION_REPLACE: &str = "versionReplace";

/// A Tines story. Every field is optional so the same type serves as a
/// sparse create/update body and as the API response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Story {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_events_for: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_to_story_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_to_story_access_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_to_story_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_to_story_skill_use_requires_confirmation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared_team_slugs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_agent_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_agents: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_control_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<Vec<i64>>,
}

/// Request body for POST /api/v1/stories/import
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryImportRequest {
    pub new_name: String,
    pub data: Map<String, Value>,
    pub team_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    pub mode: String,
}

/// Stories API
pub struct StoriesApi<'a> {
    client: &'a Client,
}

impl<'a> StoriesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Import an exported story, replacing the current version if one exists
    pub async fn import(&self, request: &StoryImportRequest) -> Result<Story, TinesError> {
        self.client.post("/api/v1/stories/import", request).await
    }

    pub async fn create(&self, story: &Story) -> Result<Story, TinesError> {
        self.client.post("/api/v1/stories", story).await
    }

    pub async fn get(&self, id: i64) -> Result<Story, TinesError> {
        self.client.get(&format!("/api/v1/stories/{}", id)).await
    }

    pub async fn update(&self, id: i64, story: &Story) -> Result<Story, TinesError> {
        self.client
            .put(&format!("/api/v1/stories/{}", id), story)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/stories/{}", id))
            .await?;
        Ok(())
    }
}
