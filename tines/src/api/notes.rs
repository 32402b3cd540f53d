//! Diagram note API implementation

use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Note {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Value>,
}

pub struct NotesApi<'a> {
    client: &'a Client,
}

impl<'a> NotesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, note: &Note) -> Result<Note, TinesError> {
        self.client.post("/api/v1/diagram_notes", note).await
    }

    pub async fn get(&self, id: i64) -> Result<Note, TinesError> {
        self.client
            .get(&format!("/api/v1/diagram_notes/{}", id))
            .await
    }

    pub async fn update(&self, id: i64, note: &Note) -> Result<Note, TinesError> {
        self.client
            .put(&format!("/api/v1/diagram_notes/{}", id), note)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/diagram_notes/{}", id))
            .await?;
        Ok(())
    }
}
