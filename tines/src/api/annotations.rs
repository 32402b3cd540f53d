use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Diagram coordinates, usually `x` and `y`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<BTreeMap<String, i64>>,
}

pub struct AnnotationsApi<'a> {
    client: &'a Client,
}

impl<'a> AnnotationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, annotation: &Annotation) -> Result<Annotation, TinesError> {
        self.client.post("/api/v1/annotations", annotation).await
    }

    pub async fn get(&self, id: i64) -> Result<Annotation, TinesError> {
        self.client
            .get(&format!("/api/v1/annotations/{}", id))
            .await
    }

    pub async fn update(&self, id: i64, annotation: &Annotation) -> Result<Annotation, TinesError> {
        self.client
            .put(&format!("/api/v1/annotations/{}", id), annotation)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/annotations/{}", id))
            .await?;
        Ok(())
    }
}
