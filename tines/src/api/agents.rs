//! Agent (story action) API implementation

use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fully qualified agent class, e.g. `Agents::HTTPRequestAgent`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_events_for: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_failures: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_all_events: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Value>,
}

pub struct AgentsApi<'a> {
    client: &'a Client,
}

impl<'a> AgentsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, agent: &Agent) -> Result<Agent, TinesError> {
        self.client.post("/api/v1/agents", agent).await
    }

    pub async fn get(&self, id: i64) -> Result<Agent, TinesError> {
        self.client.get(&format!("/api/v1/agents/{}", id)).await
    }

    pub async fn update(&self, id: i64, agent: &Agent) -> Result<Agent, TinesError> {
        self.client
            .put(&format!("/api/v1/agents/{}", id), agent)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/agents/{}", id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn agent_type_uses_type_key() {
        let agent = Agent {
            agent_type: Some("Agents::EventTransformationAgent".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&agent).unwrap(),
            json!({"type": "Agents::EventTransformationAgent"})
        );

        let agent: Agent = serde_json::from_value(json!({
            "id": 5,
            "type": "Agents::HTTPRequestAgent",
            "options": {"url": "https://example.com"},
            "position": {"x": 10, "y": 20}
        }))
        .unwrap();
        assert_eq!(agent.agent_type.as_deref(), Some("Agents::HTTPRequestAgent"));
        assert_eq!(agent.position.unwrap()["x"], 10);
    }
}
