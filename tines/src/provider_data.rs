//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

/// Clones share one HTTP connection pool through `Client`.
#[derive(Clone)]
pub struct TinesProviderData {
    pub client: Client,
}

impl TinesProviderData {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Recover provider data handed to a resource or data source `configure`.
    ///
    /// `None` is not an error: Terraform configures resources before the
    /// provider during validation.
    pub fn from_any(
        provider_data: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Option<Self>, Diagnostic> {
        let Some(data) = provider_data else {
            return Ok(None);
        };

        match data.downcast_ref::<TinesProviderData>() {
            Some(data) => Ok(Some(data.clone())),
            None => Err(Diagnostic::error(
                "Invalid provider data",
                "Expected TinesProviderData. Please report this issue to the provider developers.",
            )),
        }
    }
}

/// Diagnostic for CRUD calls made before the provider was configured
pub fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_any_accepts_missing_data() {
        assert!(TinesProviderData::from_any(None).unwrap().is_none());
    }

    #[test]
    fn from_any_downcasts_provider_data() {
        let client = Client::new("https://example.tines.com", "key", "test").unwrap();
        let data: Arc<dyn Any + Send + Sync> = Arc::new(TinesProviderData::new(client));
        let recovered = TinesProviderData::from_any(Some(data)).unwrap().unwrap();
        assert_eq!(recovered.client.tenant_url(), "https://example.tines.com");
    }

    #[test]
    fn recovered_data_shares_the_configured_client() {
        let client = Client::new("https://example.tines.com", "key", "test").unwrap();
        let data = Arc::new(TinesProviderData::new(client));
        let shared: Arc<dyn Any + Send + Sync> = data.clone();

        let recovered = TinesProviderData::from_any(Some(shared)).unwrap().unwrap();
        assert!(recovered.client.shares_connection_with(&data.client));
    }

    #[test]
    fn from_any_rejects_other_types() {
        let data: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        let diag = TinesProviderData::from_any(Some(data)).err().unwrap();
        assert_eq!(diag.summary, "Invalid provider data");
    }
}
