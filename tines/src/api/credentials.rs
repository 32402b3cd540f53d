//! Credential API implementation

use super::error::TinesError;
use crate::api::Client;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

/// A Tines credential. Secret fields are write-only; the API leaves them
/// out of responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Credential {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_access: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    // JWT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_auto_generate_time_claims: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_private_key: Option<String>,

    // OAuth
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth_grant_type: Option<String>,

    // AWS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_authentication_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_assumed_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_assumed_role_external_id: Option<String>,

    // HTTP request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_request_options: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_request_location_of_token: Option<String>,

    // mTLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtls_client_certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtls_client_private_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtls_root_certificate: Option<String>,
}

pub struct CredentialsApi<'a> {
    client: &'a Client,
}

impl<'a> CredentialsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, credential: &Credential) -> Result<Credential, TinesError> {
        self.client.post("/api/v1/user_credentials", credential).await
    }

    pub async fn get(&self, id: i64) -> Result<Credential, TinesError> {
        self.client
            .get(&format!("/api/v1/user_credentials/{}", id))
            .await
    }

    pub async fn update(&self, id: i64, credential: &Credential) -> Result<Credential, TinesError> {
        self.client
            .put(&format!("/api/v1/user_credentials/{}", id), credential)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), TinesError> {
        let _: IgnoredAny = self
            .client
            .delete(&format!("/api/v1/user_credentials/{}", id))
            .await?;
        Ok(())
    }
}
