use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use super::error::{
    parse_error_messages, ErrorType, TinesError, ERR_DO_REQUEST, ERR_EMPTY_API_KEY,
    ERR_EMPTY_TENANT, ERR_PARSE, ERR_READ_BODY, ERR_UNMARSHAL,
};

const CLIENT_USER_AGENT: &str = "tines-terraform-client";
const CLIENT_VERSION_HEADER: &str = "x-tines-client-version";
const USER_TOKEN_HEADER: &str = "x-user-token";

/// Tines API client. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    tenant_url: String,
    api_key: String,
    provider_version: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tenant_url", &self.inner.tenant_url)
            .field("provider_version", &self.inner.provider_version)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new API client. The tenant URL is only parsed when a request
    /// is made, so a malformed tenant surfaces as a request error.
    pub fn new(tenant: &str, api_key: &str, provider_version: &str) -> Result<Self, TinesError> {
        if tenant.is_empty() {
            return Err(TinesError::new(
                ErrorType::Authentication,
                "host error",
                ERR_EMPTY_TENANT,
            ));
        }
        if api_key.is_empty() {
            return Err(TinesError::new(
                ErrorType::Authentication,
                "credential error",
                ERR_EMPTY_API_KEY,
            ));
        }

        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| TinesError::new(ErrorType::Request, ERR_DO_REQUEST, e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                tenant_url: tenant.to_string(),
                api_key: api_key.to_string(),
                provider_version: provider_version.to_string(),
            }),
        })
    }

    pub fn tenant_url(&self) -> &str {
        &self.inner.tenant_url
    }

    #[cfg(test)]
    pub(crate) fn shares_connection_with(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Execute a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, TinesError> {
        let body = self.request::<()>(Method::GET, path, None).await?;
        decode(&body)
    }

    /// Execute a POST request with a JSON body
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TinesError> {
        let body = self.request(Method::POST, path, Some(body)).await?;
        decode(&body)
    }

    /// Execute a PUT request with a JSON body
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TinesError> {
        let body = self.request(Method::PUT, path, Some(body)).await?;
        decode(&body)
    }

    /// Execute a DELETE request. Most callers decode into `IgnoredAny`.
    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, TinesError> {
        let body = self.request::<()>(Method::DELETE, path, None).await?;
        decode(&body)
    }

    /// Stories API operations
    pub fn stories(&self) -> super::stories::StoriesApi<'_> {
        super::stories::StoriesApi::new(self)
    }

    /// Tines Resources (`/global_resources`) operations
    pub fn resources(&self) -> super::resources::ResourcesApi<'_> {
        super::resources::ResourcesApi::new(self)
    }

    /// Credentials API operations
    pub fn credentials(&self) -> super::credentials::CredentialsApi<'_> {
        super::credentials::CredentialsApi::new(self)
    }

    /// Folders API operations
    pub fn folders(&self) -> super::folders::FoldersApi<'_> {
        super::folders::FoldersApi::new(self)
    }

    /// Teams API operations
    pub fn teams(&self) -> super::teams::TeamsApi<'_> {
        super::teams::TeamsApi::new(self)
    }

    /// Agents (actions) API operations
    pub fn agents(&self) -> super::agents::AgentsApi<'_> {
        super::agents::AgentsApi::new(self)
    }

    /// Annotations API operations
    pub fn annotations(&self) -> super::annotations::AnnotationsApi<'_> {
        super::annotations::AnnotationsApi::new(self)
    }

    /// Diagram notes API operations
    pub fn notes(&self) -> super::notes::NotesApi<'_> {
        super::notes::NotesApi::new(self)
    }

    fn url_for(&self, path: &str) -> Result<Url, TinesError> {
        let tenant = Url::parse(&self.inner.tenant_url)
            .map_err(|e| TinesError::new(ErrorType::Request, ERR_PARSE, e.to_string()))?;

        let joined = format!(
            "{}/{}",
            tenant.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TinesError::new(ErrorType::Request, ERR_PARSE, e.to_string()))
    }

    /// Send a request and return the raw body of a 2xx response.
    async fn request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Vec<u8>, TinesError> {
        let url = self.url_for(path)?;

        tracing::debug!("{} request to: {}", method, url);

        let mut builder = self
            .inner
            .http_client
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(
                CLIENT_VERSION_HEADER,
                format!("tines-terraform-provider-{}", self.inner.provider_version),
            )
            .header(USER_TOKEN_HEADER, &self.inner.api_key);

        if let Some(body) = body {
            let payload = serde_json::to_vec(body)
                .map_err(|e| TinesError::new(ErrorType::Request, ERR_DO_REQUEST, e.to_string()))?;
            builder = builder.body(payload);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TinesError::new(ErrorType::Request, ERR_DO_REQUEST, e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            TinesError::new(ErrorType::Server, ERR_READ_BODY, e.to_string()).with_status(status)
        })?;

        let error_type = match status {
            500..=u16::MAX => Some(ErrorType::Server),
            400..=499 => Some(ErrorType::Request),
            _ => None,
        };

        if let Some(error_type) = error_type {
            tracing::error!(
                "API error response ({} {}): {}",
                method,
                status,
                String::from_utf8_lossy(&bytes)
            );
            return Err(TinesError {
                error_type,
                status_code: Some(status),
                errors: parse_error_messages(&bytes),
            });
        }

        Ok(bytes.to_vec())
    }
}

/// Decode a response body. Empty bodies decode as JSON `null`, which suits
/// `()`, `Option<_>`, `serde_json::Value` and `IgnoredAny`.
fn decode<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, TinesError> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|e| {
        tracing::error!(
            "Failed to deserialize response: {}, body: {}",
            e,
            String::from_utf8_lossy(body)
        );
        TinesError::new(ErrorType::Request, ERR_UNMARSHAL, e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorMessage;
    use mockito::{Matcher, Server};
    use serde_json::{json, Value};

    #[test]
    fn new_rejects_empty_tenant() {
        let err = Client::new("", "key", "0.1.0").unwrap_err();
        assert_eq!(err.error_type, ErrorType::Authentication);
        assert_eq!(err.errors[0].message, "host error");
        assert_eq!(err.errors[0].details, ERR_EMPTY_TENANT);
    }

    #[test]
    fn new_rejects_empty_api_key() {
        let err = Client::new("https://example.tines.com", "", "0.1.0").unwrap_err();
        assert_eq!(err.error_type, ErrorType::Authentication);
        assert_eq!(err.errors[0].message, "credential error");
        assert_eq!(err.errors[0].details, ERR_EMPTY_API_KEY);
    }

    #[test]
    fn url_join_never_doubles_slashes() {
        let client = Client::new("https://example.tines.com/", "key", "0.1.0").unwrap();
        let url = client.url_for("/api/v1/stories/1").unwrap();
        assert_eq!(url.as_str(), "https://example.tines.com/api/v1/stories/1");

        let client = Client::new("https://example.tines.com", "key", "0.1.0").unwrap();
        let url = client.url_for("api/v1/teams").unwrap();
        assert_eq!(url.as_str(), "https://example.tines.com/api/v1/teams");
    }

    #[tokio::test]
    async fn unparseable_tenant_is_a_request_error() {
        let client = Client::new("not a url", "key", "0.1.0").unwrap();
        let err = client.get::<Value>("/api/v1/teams/1").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Request);
        assert_eq!(err.errors[0].message, ERR_PARSE);
        assert_eq!(err.status_code, None);
    }

    #[tokio::test]
    async fn sends_tines_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/teams/1")
            .match_header("content-type", "application/json")
            .match_header("accept", "application/json")
            .match_header("user-agent", "tines-terraform-client")
            .match_header("x-tines-client-version", "tines-terraform-provider-1.2.3")
            .match_header("x-user-token", "secret")
            .with_body(r#"{"id":1,"name":"Security"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", "1.2.3").unwrap();
        let team: Value = client.get("/api/v1/teams/1").await.unwrap();
        assert_eq!(team["name"], "Security");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn posts_json_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/teams")
            .match_body(Matcher::Json(json!({"name": "Ops"})))
            .with_status(201)
            .with_body(r#"{"id":9,"name":"Ops"}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", "1.2.3").unwrap();
        let team: Value = client
            .post("/api/v1/teams", &json!({"name": "Ops"}))
            .await
            .unwrap();
        assert_eq!(team["id"], 9);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn maps_4xx_to_request_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/stories/3")
            .with_status(404)
            .with_body(r#"{"errors":[{"message":"Not Found","details":"no story"}]}"#)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", "1.2.3").unwrap();
        let err = client.get::<Value>("/api/v1/stories/3").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Request);
        assert_eq!(err.status_code, Some(404));
        assert!(err.is_not_found());
        assert_eq!(err.errors, vec![ErrorMessage::new("Not Found", "no story")]);
    }

    #[tokio::test]
    async fn maps_5xx_to_server_error_with_raw_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", "/api/v1/stories/3")
            .with_status(502)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", "1.2.3").unwrap();
        let err = client
            .put::<Value, _>("/api/v1/stories/3", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.error_type, ErrorType::Server);
        assert_eq!(err.status_code, Some(502));
        assert_eq!(
            err.to_string(),
            "1 error(s) occurred: message: upstream unavailable"
        );
    }

    #[tokio::test]
    async fn empty_delete_body_is_accepted() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v1/folders/4")
            .with_status(204)
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", "1.2.3").unwrap();
        let result: Result<(), _> = client.delete("/api/v1/folders/4").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn malformed_json_is_an_unmarshal_error() {
        #[derive(Debug, Deserialize)]
        struct Team {
            #[allow(dead_code)]
            id: i64,
        }

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/teams/1")
            .with_body("{not json")
            .create_async()
            .await;

        let client = Client::new(&server.url(), "secret", "1.2.3").unwrap();
        let err = client.get::<Team>("/api/v1/teams/1").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Request);
        assert_eq!(err.errors[0].message, ERR_UNMARSHAL);
    }

    #[tokio::test]
    async fn connection_failure_is_a_request_error() {
        let client = Client::new("http://127.0.0.1:1", "secret", "1.2.3").unwrap();
        let err = client.get::<Value>("/api/v1/teams").await.unwrap_err();
        assert_eq!(err.error_type, ErrorType::Request);
        assert_eq!(err.errors[0].message, ERR_DO_REQUEST);
    }
}
