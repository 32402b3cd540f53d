use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

pub struct TeamsApi<'a> {
    client: &'a Client,
}

impl<'a> TeamsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, team: &Team) -> Result<Team, TinesError> {
        self.client.post("/api/v1/teams", team).await
    }

    pub async fn get(&self, id: i64) -> Result<Team, TinesError> {
        self.client.get(&format!("/api/v1/teams/{}", id)).await
    }

    pub async fn update(&self, id: i64, team: &Team) -> Result<Team, TinesError> {
        self.client.put(&format!("/api/v1/teams/{}", id), team).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/teams/{}", id))
            .await?;
        Ok(())
    }
}
