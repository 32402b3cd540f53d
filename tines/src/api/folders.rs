use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the folder holds, e.g. STORY, CREDENTIAL or RESOURCE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

pub struct FoldersApi<'a> {
    client: &'a Client,
}

impl<'a> FoldersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, folder: &Folder) -> Result<Folder, TinesError> {
        self.client.post("/api/v1/folders", folder).await
    }

    pub async fn get(&self, id: i64) -> Result<Folder, TinesError> {
        self.client.get(&format!("/api/v1/folders/{}", id)).await
    }

    pub async fn update(&self, id: i64, folder: &Folder) -> Result<Folder, TinesError> {
        self.client
            .put(&format!("/api/v1/folders/{}", id), folder)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/folders/{}", id))
            .await?;
        Ok(())
    }
}
